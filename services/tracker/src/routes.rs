//! Tracker service routes

use std::path::Path;

use axum::{
    Json, Router,
    extract::State,
    http::{HeaderValue, Method, StatusCode, header},
    middleware,
    response::IntoResponse,
    routing::{delete, get, patch, post},
};
use serde_json::json;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    services::{ServeDir, ServeFile},
    trace::TraceLayer,
};
use tracing::{info, warn};

use crate::{config::AppConfig, middleware::session_middleware, state::AppState};

pub mod auth;
pub mod cards;
pub mod comments;
pub mod uploads;

/// Create the router for the tracker service
pub fn create_router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/config", get(auth::public_config))
        .route("/auth/me", get(auth::me))
        .route("/auth/telegram", post(auth::telegram_login))
        .route("/auth/logout", post(auth::logout))
        .route("/cards", get(cards::list_cards).post(cards::create_card))
        .route("/cards/:id", get(cards::get_card).delete(cards::delete_card))
        .route("/cards/:id/status", patch(cards::update_status))
        .route("/cards/:id/vote", post(cards::vote))
        .route(
            "/cards/:id/comments",
            get(comments::list_comments).post(comments::create_comment),
        )
        .route("/comments/:id", delete(comments::delete_comment))
        .merge(uploads::router())
        .layer(middleware::from_fn_with_state(
            state.clone(),
            session_middleware,
        ));

    let mut app = Router::new()
        .route("/health", get(health_check))
        .nest("/api", api_routes);

    let static_dir = Path::new(&state.config.static_dir);
    if static_dir.is_dir() {
        info!("Serving frontend from {}", static_dir.display());
        let index = ServeFile::new(static_dir.join("index.html"));
        app = app.fallback_service(ServeDir::new(static_dir).fallback(index));
    }

    app.layer(TraceLayer::new_for_http())
        .layer(cors_layer(&state.config))
        .with_state(state)
}

/// CORS for the configured browser origins, with cookies allowed
fn cors_layer(config: &AppConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .cors_origins()
        .into_iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE])
        .allow_credentials(true)
}

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let database = common::database::health_check(&state.db_pool)
        .await
        .unwrap_or(false);

    let status = if database {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        Json(json!({
            "status": if database { "ok" } else { "degraded" },
            "service": "tracker",
            "database": database,
        })),
    )
}
