//! Service configuration loaded from the environment

use serde::Deserialize;

/// Runtime settings for the tracker service
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub bot_token: String,
    pub bot_username: String,
    /// Comma separated Telegram user ids
    pub admin_ids: String,
    pub app_url: String,
    pub cookie_secure: bool,
    /// Comma separated list of allowed browser origins
    pub cors_origins: String,
    pub static_dir: String,
    pub migrations_dir: String,
    pub imgbb_api_key: String,
    pub s3_bucket: String,
    pub s3_region: String,
    pub s3_endpoint: String,
    pub s3_access_key_id: String,
    pub s3_secret_access_key: String,
    pub s3_public_url: String,
    pub telegram_api_url: String,
}

/// Object storage settings, present only when a bucket is configured
#[derive(Debug, Clone, PartialEq)]
pub struct S3Config {
    pub bucket: String,
    pub region: String,
    pub endpoint: Option<String>,
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    pub public_url: Option<String>,
}

impl AppConfig {
    /// Create a new AppConfig from environment variables
    ///
    /// # Environment Variables
    /// - `HOST` (default: "0.0.0.0"), `PORT` (default: 8080)
    /// - `BOT_TOKEN`, `BOT_USERNAME`: Telegram bot credentials
    /// - `ADMIN_IDS`: comma separated admin user ids
    /// - `APP_URL`: public URL used in notification links
    /// - `COOKIE_SECURE` (default: false)
    /// - `CORS_ORIGINS` (default: "http://localhost:5173,http://localhost:3000")
    /// - `STATIC_DIR` (default: "./web/dist"), `MIGRATIONS_DIR` (default: "./migrations")
    /// - `IMGBB_API_KEY`: legacy image host key
    /// - `S3_BUCKET`, `S3_REGION` (default: "us-east-1"), `S3_ENDPOINT`,
    ///   `S3_ACCESS_KEY_ID`, `S3_SECRET_ACCESS_KEY`, `S3_PUBLIC_URL`
    /// - `TELEGRAM_API_URL` (default: "https://api.telegram.org")
    pub fn from_env() -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .set_default("host", "0.0.0.0")?
            .set_default("port", 8080)?
            .set_default("bot_token", "")?
            .set_default("bot_username", "")?
            .set_default("admin_ids", "")?
            .set_default("app_url", "")?
            .set_default("cookie_secure", false)?
            .set_default("cors_origins", "http://localhost:5173,http://localhost:3000")?
            .set_default("static_dir", "./web/dist")?
            .set_default("migrations_dir", "./migrations")?
            .set_default("imgbb_api_key", "")?
            .set_default("s3_bucket", "")?
            .set_default("s3_region", "us-east-1")?
            .set_default("s3_endpoint", "")?
            .set_default("s3_access_key_id", "")?
            .set_default("s3_secret_access_key", "")?
            .set_default("s3_public_url", "")?
            .set_default("telegram_api_url", "https://api.telegram.org")?
            .add_source(config::Environment::default())
            .build()?
            .try_deserialize()
    }

    /// Admin ids parsed from `ADMIN_IDS`
    pub fn admin_ids(&self) -> Vec<i64> {
        parse_admin_ids(&self.admin_ids)
    }

    pub fn cors_origins(&self) -> Vec<String> {
        split_list(&self.cors_origins)
            .map(|origin| origin.trim_end_matches('/').to_string())
            .collect()
    }

    /// Public application URL without a trailing slash, if configured
    pub fn app_url(&self) -> Option<String> {
        non_empty(&self.app_url).map(|url| url.trim_end_matches('/').to_string())
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn s3(&self) -> Option<S3Config> {
        let bucket = non_empty(&self.s3_bucket)?;

        Some(S3Config {
            bucket: bucket.to_string(),
            region: non_empty(&self.s3_region).unwrap_or("us-east-1").to_string(),
            endpoint: non_empty(&self.s3_endpoint).map(str::to_string),
            access_key_id: non_empty(&self.s3_access_key_id).map(str::to_string),
            secret_access_key: non_empty(&self.s3_secret_access_key).map(str::to_string),
            public_url: non_empty(&self.s3_public_url)
                .map(|url| url.trim_end_matches('/').to_string()),
        })
    }

    pub fn imgbb_api_key(&self) -> Option<String> {
        non_empty(&self.imgbb_api_key).map(str::to_string)
    }
}

/// Parse a comma separated id list, skipping entries that are not integers
pub fn parse_admin_ids(raw: &str) -> Vec<i64> {
    split_list(raw)
        .filter_map(|entry| match entry.parse::<i64>() {
            Ok(id) => Some(id),
            Err(_) => {
                tracing::warn!("Ignoring invalid admin id: {}", entry);
                None
            }
        })
        .collect()
}

fn split_list(raw: &str) -> impl Iterator<Item = &str> {
    raw.split(',').map(str::trim).filter(|entry| !entry.is_empty())
}

fn non_empty(value: &str) -> Option<&str> {
    let value = value.trim();
    (!value.is_empty()).then_some(value)
}
