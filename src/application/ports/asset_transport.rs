use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::images::ImageFile;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadedAsset {
    pub url: String,
    pub key: String,
}

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("upload rejected ({status}): {message}")]
    Rejected { status: u16, message: String },
    #[error("network error: {0}")]
    Network(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid response: {0}")]
    InvalidResponse(String),
    #[error("file too large: {size} bytes (limit {limit})")]
    TooLarge { size: usize, limit: usize },
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Remote object store holding uploaded images.
#[async_trait]
pub trait AssetTransport: Send + Sync {
    async fn upload(&self, file: &ImageFile) -> Result<UploadedAsset, TransportError>;
    async fn delete(&self, key: &str) -> Result<(), TransportError>;
}
