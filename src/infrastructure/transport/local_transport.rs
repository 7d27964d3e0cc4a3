use std::io::ErrorKind;
use std::path::PathBuf;

use async_trait::async_trait;
use sha2::{Digest, Sha256};

use super::{ensure_within_limit, join_url, validate_key};
use crate::application::ports::asset_transport::{AssetTransport, TransportError, UploadedAsset};
use crate::domain::images::ImageFile;

/// Stores images in a local directory under content-addressed names, so
/// identical bytes always map to the same key.
pub struct LocalAssetTransport {
    root: PathBuf,
    public_base_url: Option<String>,
    max_bytes: usize,
}

impl LocalAssetTransport {
    pub fn new(root: impl Into<PathBuf>, public_base_url: Option<String>, max_bytes: usize) -> Self {
        Self {
            root: root.into(),
            public_base_url,
            max_bytes,
        }
    }

    pub fn root(&self) -> &PathBuf {
        &self.root
    }

    fn key_for(file: &ImageFile) -> String {
        let mut hasher = Sha256::new();
        hasher.update(&file.bytes);
        let digest = hasher.finalize();
        let hash = digest
            .iter()
            .take(16)
            .map(|b| format!("{b:02x}"))
            .collect::<String>();
        match file.extension() {
            ext if ext.is_empty() => hash,
            ext => format!("{hash}.{ext}"),
        }
    }
}

#[async_trait]
impl AssetTransport for LocalAssetTransport {
    async fn upload(&self, file: &ImageFile) -> Result<UploadedAsset, TransportError> {
        ensure_within_limit(file, self.max_bytes)?;
        let key = Self::key_for(file);
        tokio::fs::create_dir_all(&self.root).await?;
        let path = self.root.join(&key);
        tokio::fs::write(&path, &file.bytes).await.map_err(|err| {
            tracing::error!(error = ?err, path = %path.display(), "local_asset_write_failed");
            err
        })?;
        let url = join_url(self.public_base_url.as_deref(), &format!("uploads/{key}"));
        Ok(UploadedAsset { url, key })
    }

    async fn delete(&self, key: &str) -> Result<(), TransportError> {
        validate_key(key)?;
        match tokio::fs::remove_file(self.root.join(key)).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;
    use crate::domain::images::storage_key;

    #[tokio::test]
    async fn same_bytes_same_key() {
        let temp = TempDir::new().unwrap();
        let t = LocalAssetTransport::new(
            temp.path().join("uploads"),
            Some("https://cdn.example.com".into()),
            1024,
        );
        let a = t.upload(&ImageFile::new("a.PNG", vec![1, 2, 3])).await.unwrap();
        let b = t.upload(&ImageFile::new("b.png", vec![1, 2, 3])).await.unwrap();
        assert_eq!(a.key, b.key);
        assert!(a.key.ends_with(".png"));
        assert_eq!(storage_key(&a.url), Some(a.key.clone()));
        assert!(t.root().join(&a.key).exists());

        let c = t.upload(&ImageFile::new("a.png", vec![9])).await.unwrap();
        assert_ne!(a.key, c.key);
    }

    #[tokio::test]
    async fn relative_url_without_public_base() {
        let temp = TempDir::new().unwrap();
        let t = LocalAssetTransport::new(temp.path(), None, 1024);
        let a = t.upload(&ImageFile::new("noext", vec![5])).await.unwrap();
        assert_eq!(a.url, format!("/uploads/{}", a.key));
        assert_eq!(a.key.len(), 32);
    }

    #[tokio::test]
    async fn delete_is_idempotent_and_guarded() {
        let temp = TempDir::new().unwrap();
        let t = LocalAssetTransport::new(temp.path(), None, 1024);
        let a = t.upload(&ImageFile::new("a.png", vec![1])).await.unwrap();
        t.delete(&a.key).await.unwrap();
        assert!(!temp.path().join(&a.key).exists());
        t.delete(&a.key).await.unwrap();
        assert!(t.delete("../outside.png").await.is_err());
    }

    #[tokio::test]
    async fn oversize_upload_is_rejected() {
        let temp = TempDir::new().unwrap();
        let t = LocalAssetTransport::new(temp.path(), None, 2);
        let err = t
            .upload(&ImageFile::new("a.png", vec![1, 2, 3]))
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::TooLarge { .. }));
    }
}
