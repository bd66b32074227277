//! Login, logout and session introspection

use axum::{Json, extract::State};
use axum_extra::extract::cookie::CookieJar;
use chrono::Utc;
use serde_json::{Value, json};
use tracing::{info, warn};

use crate::{
    auth::TelegramAuthData,
    error::{ApiError, ApiResult},
    extract::{ApiJson, AuthUser},
    middleware::{removal_cookie, session_cookie},
    models::{PublicConfig, User},
    state::AppState,
};

/// Settings the login widget needs
pub async fn public_config(State(state): State<AppState>) -> Json<PublicConfig> {
    Json(PublicConfig {
        bot_username: state.config.bot_username.clone(),
    })
}

/// Current user with the admin flag
pub async fn me(AuthUser(user): AuthUser) -> Json<User> {
    Json(user)
}

/// Verify a Telegram login assertion and open a session
pub async fn telegram_login(
    State(state): State<AppState>,
    jar: CookieJar,
    ApiJson(data): ApiJson<TelegramAuthData>,
) -> ApiResult<(CookieJar, Json<Value>)> {
    state.verifier.verify(&data, Utc::now()).map_err(|e| {
        warn!("Rejected Telegram login for user {}: {}", data.id, e);
        ApiError::Unauthorized("Invalid authorization data")
    })?;

    let auth_date = data
        .auth_time()
        .ok_or_else(|| ApiError::BadRequest("Invalid auth_date".to_string()))?;
    let is_admin = state.admin_policy.is_admin(data.id);

    let user = state
        .user_repository
        .upsert(&data.into_user(auth_date, is_admin))
        .await?;

    info!("User {} logged in (admin: {})", user.id, user.is_admin);

    let jar = jar.add(session_cookie(user.id, state.config.cookie_secure));
    Ok((jar, Json(json!({ "ok": true }))))
}

/// Drop the session cookie
pub async fn logout(jar: CookieJar) -> (CookieJar, Json<Value>) {
    (jar.remove(removal_cookie()), Json(json!({ "ok": true })))
}
