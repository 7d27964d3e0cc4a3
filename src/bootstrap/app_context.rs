use std::sync::Arc;

use crate::application::ports::asset_transport::AssetTransport;
use crate::application::services::document::DocumentCommitter;
use crate::application::services::reconciliation::ImageUploadManager;
use crate::bootstrap::config::{Config, TransportBackend};
use crate::infrastructure::transport::{HttpAssetTransport, LocalAssetTransport, S3AssetTransport};

#[derive(Clone)]
pub struct AppContext {
    pub cfg: Config,
    transport: Arc<dyn AssetTransport>,
}

impl AppContext {
    pub async fn new(cfg: Config) -> anyhow::Result<Self> {
        let transport: Arc<dyn AssetTransport> = match cfg.transport_backend {
            TransportBackend::Http => {
                let base = cfg
                    .asset_api_url
                    .as_deref()
                    .ok_or_else(|| anyhow::anyhow!("ASSET_API_URL is not configured"))?;
                Arc::new(HttpAssetTransport::new(
                    base,
                    cfg.asset_api_token.clone(),
                    cfg.upload_max_bytes,
                ))
            }
            TransportBackend::S3 => Arc::new(S3AssetTransport::new(&cfg).await?),
            TransportBackend::Local => Arc::new(LocalAssetTransport::new(
                &cfg.uploads_dir,
                cfg.public_base_url.clone(),
                cfg.upload_max_bytes,
            )),
        };
        tracing::info!(backend = ?cfg.transport_backend, "asset_transport_ready");
        Ok(Self::with_transport(cfg, transport))
    }

    pub fn with_transport(cfg: Config, transport: Arc<dyn AssetTransport>) -> Self {
        Self { cfg, transport }
    }

    pub fn transport(&self) -> Arc<dyn AssetTransport> {
        self.transport.clone()
    }

    /// A fresh manager for one document; drop or detach it when the document closes.
    pub fn image_manager(&self) -> ImageUploadManager {
        ImageUploadManager::new(self.transport.clone())
    }

    pub fn committer(&self, text: impl Into<String>) -> DocumentCommitter {
        DocumentCommitter::new(text, self.cfg.reference_style)
    }
}
