use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;

use super::{ensure_within_limit, validate_key};
use crate::application::ports::asset_transport::{AssetTransport, TransportError, UploadedAsset};
use crate::domain::images::{ImageFile, storage_key};

/// Talks to the application's file API: `POST /api/files` (multipart) and
/// `DELETE /api/files/{key}`.
pub struct HttpAssetTransport {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
    max_bytes: usize,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    url: String,
    #[serde(default)]
    key: Option<String>,
}

impl HttpAssetTransport {
    pub fn new(base_url: &str, token: Option<String>, max_bytes: usize) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
            max_bytes,
        }
    }

    fn absolute(&self, url: &str) -> String {
        if url.starts_with('/') {
            format!("{}{}", self.base_url, url)
        } else {
            url.to_string()
        }
    }

    fn authorize(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(t) => req.bearer_auth(t),
            None => req,
        }
    }
}

async fn rejected(resp: reqwest::Response) -> TransportError {
    let status = resp.status().as_u16();
    let message = resp.text().await.unwrap_or_default();
    TransportError::Rejected { status, message }
}

#[async_trait]
impl AssetTransport for HttpAssetTransport {
    async fn upload(&self, file: &ImageFile) -> Result<UploadedAsset, TransportError> {
        ensure_within_limit(file, self.max_bytes)?;
        let part = Part::bytes(file.bytes.clone())
            .file_name(file.file_name.clone())
            .mime_str(&file.mime())
            .map_err(|e| TransportError::Other(anyhow::anyhow!("invalid content type: {e}")))?;
        let form = Form::new().part("file", part);

        let req = self
            .client
            .post(format!("{}/api/files", self.base_url))
            .multipart(form);
        let resp = self
            .authorize(req)
            .send()
            .await
            .map_err(|e| TransportError::Network(e.to_string()))?;
        if !resp.status().is_success() {
            let err = rejected(resp).await;
            tracing::warn!(error = %err, file = %file.file_name, "http_asset_upload_rejected");
            return Err(err);
        }
        let body: UploadResponse = resp
            .json()
            .await
            .map_err(|e| TransportError::InvalidResponse(e.to_string()))?;

        let url = self.absolute(&body.url);
        let key = body
            .key
            .filter(|k| !k.is_empty())
            .or_else(|| storage_key(&url))
            .ok_or_else(|| TransportError::InvalidResponse(format!("no storage key in {url}")))?;
        Ok(UploadedAsset { url, key })
    }

    async fn delete(&self, key: &str) -> Result<(), TransportError> {
        validate_key(key)?;
        let req = self.client.delete(format!(
            "{}/api/files/{}",
            self.base_url,
            urlencoding::encode(key)
        ));
        let resp = self
            .authorize(req)
            .send()
            .await
            .map_err(|e| TransportError::Network(e.to_string()))?;
        if resp.status().is_success() || resp.status() == reqwest::StatusCode::NOT_FOUND {
            Ok(())
        } else {
            Err(rejected(resp).await)
        }
    }
}
