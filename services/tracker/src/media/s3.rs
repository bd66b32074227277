//! S3-compatible object storage backend

use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_s3::{Client, config::Credentials, primitives::ByteStream};

use crate::{config::S3Config, media::ObjectStore};

/// Object store backed by an S3 bucket
pub struct S3Storage {
    client: Client,
    bucket: String,
    public_url: Option<String>,
}

impl S3Storage {
    /// Create a new S3 storage backend. Static credentials and a custom
    /// endpoint are optional; without them the default AWS chain is used.
    pub async fn new(config: &S3Config) -> Self {
        let mut loader =
            aws_config::defaults(BehaviorVersion::latest()).region(Region::new(config.region.clone()));

        if let (Some(access_key_id), Some(secret_access_key)) =
            (&config.access_key_id, &config.secret_access_key)
        {
            loader = loader.credentials_provider(Credentials::new(
                access_key_id,
                secret_access_key,
                None,
                None,
                "tracker",
            ));
        }

        let sdk_config = loader.load().await;
        let mut builder = aws_sdk_s3::config::Builder::from(&sdk_config);

        if let Some(endpoint) = &config.endpoint {
            builder = builder.endpoint_url(endpoint).force_path_style(true);
        }

        Self {
            client: Client::from_conf(builder.build()),
            bucket: config.bucket.clone(),
            public_url: config.public_url.clone(),
        }
    }
}

#[async_trait]
impl ObjectStore for S3Storage {
    async fn put(&self, key: &str, data: Vec<u8>, content_type: &str) -> anyhow::Result<()> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(data))
            .content_type(content_type)
            .send()
            .await?;

        Ok(())
    }

    fn public_url(&self, key: &str) -> String {
        object_url(self.public_url.as_deref(), &self.bucket, key)
    }
}

/// Public URL of `key`: under the configured base, or the bucket's default host
pub fn object_url(public_url: Option<&str>, bucket: &str, key: &str) -> String {
    match public_url {
        Some(base) => format!("{}/{}", base.trim_end_matches('/'), key),
        None => format!("https://{}.s3.amazonaws.com/{}", bucket, key),
    }
}
