use anyhow::{Context, anyhow};
use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::config::{Credentials, Region};
use aws_sdk_s3::Client;
use aws_sdk_s3::primitives::ByteStream;
use uuid::Uuid;

use super::{ensure_within_limit, join_url, validate_key};
use crate::application::ports::asset_transport::{AssetTransport, TransportError, UploadedAsset};
use crate::bootstrap::config::Config;
use crate::domain::images::ImageFile;

pub struct S3AssetTransport {
    client: Client,
    bucket: String,
    prefix: String,
    public_base_url: Option<String>,
    max_bytes: usize,
}

impl S3AssetTransport {
    pub async fn new(cfg: &Config) -> anyhow::Result<Self> {
        let bucket = cfg
            .s3_bucket
            .clone()
            .context("S3 bucket must be configured when using the s3 transport")?;
        let client = s3_client(cfg).await;
        ensure_bucket(&client, &bucket).await?;

        // Without a CDN in front, objects are addressed on the endpoint itself.
        let public_base_url = cfg.public_base_url.clone().or_else(|| {
            cfg.s3_endpoint
                .as_deref()
                .map(|e| format!("{}/{}", e.trim_end_matches('/'), bucket))
        });

        Ok(Self {
            client,
            bucket,
            prefix: cfg.s3_prefix.clone(),
            public_base_url,
            max_bytes: cfg.upload_max_bytes,
        })
    }

    fn object_key(&self, key: &str) -> String {
        object_key(&self.prefix, key)
    }
}

fn object_key(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{prefix}/{key}")
    }
}

fn new_key(file: &ImageFile) -> String {
    let id = Uuid::new_v4().simple().to_string();
    match file.extension() {
        ext if ext.is_empty() => id,
        ext => format!("{id}.{ext}"),
    }
}

#[async_trait]
impl AssetTransport for S3AssetTransport {
    async fn upload(&self, file: &ImageFile) -> Result<UploadedAsset, TransportError> {
        ensure_within_limit(file, self.max_bytes)?;
        let key = new_key(file);
        let object = self.object_key(&key);
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&object)
            .content_type(file.mime())
            .body(ByteStream::from(file.bytes.clone()))
            .send()
            .await
            .map_err(|e| TransportError::Network(format!("failed to upload object {object}: {e}")))?;
        let url = join_url(self.public_base_url.as_deref(), &object);
        Ok(UploadedAsset { url, key })
    }

    async fn delete(&self, key: &str) -> Result<(), TransportError> {
        validate_key(key)?;
        let object = self.object_key(key);
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(&object)
            .send()
            .await
            .with_context(|| format!("failed to delete object {object}"))?;
        Ok(())
    }
}

/// Client for the configured region/endpoint. Static credentials win over
/// the default provider chain when both halves are present.
async fn s3_client(cfg: &Config) -> Client {
    let mut loader = aws_config::defaults(BehaviorVersion::latest());
    if let Some(region) = cfg.s3_region.clone() {
        loader = loader.region(Region::new(region));
    }
    let shared = loader.load().await;

    let static_creds = cfg
        .s3_access_key
        .clone()
        .zip(cfg.s3_secret_key.clone())
        .map(|(access, secret)| Credentials::new(access, secret, None, None, "workbench-static"));

    let mut builder =
        aws_sdk_s3::config::Builder::from(&shared).force_path_style(cfg.s3_use_path_style);
    builder.set_endpoint_url(cfg.s3_endpoint.clone());
    if let Some(creds) = static_creds {
        builder = builder.credentials_provider(creds);
    }
    Client::from_conf(builder.build())
}

/// Creates the bucket on first use; a bucket that already exists is fine.
async fn ensure_bucket(client: &Client, bucket: &str) -> anyhow::Result<()> {
    let head = client.head_bucket().bucket(bucket).send().await;
    match head {
        Ok(_) => return Ok(()),
        Err(err) if err.as_service_error().is_some_and(|e| e.is_not_found()) => {}
        Err(err) => return Err(anyhow!("cannot reach bucket {bucket}: {err}")),
    }

    match client.create_bucket().bucket(bucket).send().await {
        Ok(_) => {
            tracing::info!(bucket, "s3_bucket_created");
            Ok(())
        }
        Err(err)
            if err.as_service_error().is_some_and(|e| {
                e.is_bucket_already_owned_by_you() || e.is_bucket_already_exists()
            }) =>
        {
            Ok(())
        }
        Err(err) => Err(anyhow!("cannot create bucket {bucket}: {err}")),
    }
}
