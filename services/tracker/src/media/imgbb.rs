//! ImgBB image host client

use anyhow::{Context, bail};
use base64::{Engine, engine::general_purpose::STANDARD};
use reqwest::multipart::Form;
use serde::Deserialize;

pub const DEFAULT_API_URL: &str = "https://api.imgbb.com/1/upload";

#[derive(Debug, Deserialize)]
struct UploadResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    status: Option<u16>,
    data: Option<UploadData>,
}

#[derive(Debug, Deserialize)]
struct UploadData {
    url: String,
}

/// Client for the ImgBB upload API
#[derive(Clone)]
pub struct ImgBbClient {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
}

impl ImgBbClient {
    pub fn new(api_key: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url: DEFAULT_API_URL.to_string(),
            api_key,
        }
    }

    /// Upload image bytes and return the hosted URL
    pub async fn upload(&self, image: &[u8]) -> anyhow::Result<String> {
        let form = Form::new()
            .text("key", self.api_key.clone())
            .text("image", STANDARD.encode(image));

        let body = self
            .client
            .post(&self.api_url)
            .multipart(form)
            .send()
            .await
            .context("Failed to reach image host")?
            .text()
            .await
            .context("Failed to read image host response")?;

        hosted_url(&body)
    }
}

fn hosted_url(body: &str) -> anyhow::Result<String> {
    let response: UploadResponse =
        serde_json::from_str(body).context("Failed to parse image host response")?;

    match response {
        UploadResponse {
            success: true,
            data: Some(data),
            ..
        } => Ok(data.url),
        UploadResponse { status, .. } => {
            bail!("Image host rejected upload with status {:?}", status)
        }
    }
}
