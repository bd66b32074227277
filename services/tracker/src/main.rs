use std::{path::Path, sync::Arc};

use anyhow::Result;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use common::database::{DatabaseConfig, health_check, init_pool, run_migrations};
use tracker::{
    AppState,
    config::AppConfig,
    media::{ObjectStore, S3Storage},
    routes,
};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("Starting tracker service");

    let config = AppConfig::from_env()?;
    if config.bot_token.is_empty() {
        warn!("BOT_TOKEN is not set; logins will fail and notifications are disabled");
    }

    // Initialize database connection pool
    let db_config = DatabaseConfig::from_env()?;
    let pool = init_pool(&db_config).await?;

    // Check database connectivity
    if health_check(&pool).await? {
        info!("Database connection successful");
    } else {
        anyhow::bail!("Failed to connect to database");
    }

    run_migrations(&pool, Path::new(&config.migrations_dir)).await?;

    let object_store: Option<Arc<dyn ObjectStore>> = match config.s3() {
        Some(s3) => {
            info!("Object storage enabled for bucket {}", s3.bucket);
            Some(Arc::new(S3Storage::new(&s3).await))
        }
        None => {
            warn!("S3_BUCKET is not set; file uploads are disabled");
            None
        }
    };

    let address = config.bind_address();
    let app = routes::create_router(AppState::new(pool, config, object_store));

    // Start the web server
    let listener = TcpListener::bind(&address).await?;
    info!("Tracker service listening on {}", address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Tracker service stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
