use std::collections::HashSet;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::Semaphore;

use crate::application::ports::asset_transport::{AssetTransport, TransportError, UploadedAsset};
use crate::domain::images::ImageFile;

/// In-memory transport: serves `https://cdn.test/{file_name}` and records deletions.
#[derive(Default)]
pub(crate) struct RecordingTransport {
    failing: HashSet<String>,
    fail_deletes: bool,
    gate: Option<Arc<Semaphore>>,
    uploads: AtomicUsize,
    delete_attempts: AtomicUsize,
    deleted: Mutex<Vec<String>>,
}

impl RecordingTransport {
    pub(crate) fn failing_on(file_name: &str) -> Self {
        Self {
            failing: HashSet::from([file_name.to_string()]),
            ..Self::default()
        }
    }

    pub(crate) fn failing_deletes() -> Self {
        Self {
            fail_deletes: true,
            ..Self::default()
        }
    }

    /// Uploads block until a permit is added to [`Self::gate`].
    pub(crate) fn gated() -> Self {
        Self {
            gate: Some(Arc::new(Semaphore::new(0))),
            ..Self::default()
        }
    }

    pub(crate) fn gate(&self) -> Arc<Semaphore> {
        self.gate.clone().expect("transport is not gated")
    }

    pub(crate) fn upload_count(&self) -> usize {
        self.uploads.load(Ordering::SeqCst)
    }

    pub(crate) fn delete_attempts(&self) -> usize {
        self.delete_attempts.load(Ordering::SeqCst)
    }

    pub(crate) fn deleted(&self) -> Vec<String> {
        self.deleted.lock().unwrap().clone()
    }
}

#[async_trait]
impl AssetTransport for RecordingTransport {
    async fn upload(&self, file: &ImageFile) -> Result<UploadedAsset, TransportError> {
        self.uploads.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.gate {
            let permit = gate
                .acquire()
                .await
                .map_err(|e| TransportError::Network(e.to_string()))?;
            permit.forget();
        }
        if self.failing.contains(&file.file_name) {
            return Err(TransportError::Rejected {
                status: 500,
                message: format!("cannot store {}", file.file_name),
            });
        }
        Ok(UploadedAsset {
            url: format!("https://cdn.test/{}", file.file_name),
            key: file.file_name.clone(),
        })
    }

    async fn delete(&self, key: &str) -> Result<(), TransportError> {
        self.delete_attempts.fetch_add(1, Ordering::SeqCst);
        if self.fail_deletes {
            return Err(TransportError::Network("connection reset".into()));
        }
        self.deleted.lock().unwrap().push(key.to_string());
        Ok(())
    }
}
