use std::sync::Arc;

use serde::Serialize;

use super::{ImageUploadManager, Inner, lock};
use crate::application::ports::asset_transport::TransportError;
use crate::domain::images::{ImageFile, Tag, storage_key};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// The tag is not (or no longer) in the document.
    UnknownTag,
    /// Another upload or batch is in flight.
    Busy,
    /// The manager was torn down while the upload was in flight.
    Detached,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadOutcome {
    Resolved {
        url: String,
        /// Key of the superseded asset scheduled for deletion.
        replaced: Option<String>,
    },
    Skipped(SkipReason),
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchReport {
    pub attempted: usize,
    pub resolved: Vec<(Tag, String)>,
    pub failed: Vec<(Tag, String)>,
    pub skipped: Vec<(Tag, SkipReason)>,
}

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("upload for {tag} failed: {source}")]
    Transport {
        tag: Tag,
        #[source]
        source: TransportError,
    },
    #[error("some uploads failed ({} of {})", .report.failed.len(), .report.attempted)]
    BatchIncomplete { report: BatchReport },
}

/// Marks one tag as the active upload until dropped.
struct ActiveUpload {
    inner: Arc<Inner>,
    tag: Tag,
    epoch: u64,
    ticket: u64,
}

impl Drop for ActiveUpload {
    fn drop(&mut self) {
        let mut state = lock(&self.inner.state);
        if state.epoch == self.epoch
            && state.task.ticket == self.ticket
            && state.task.active.as_ref() == Some(&self.tag)
        {
            state.task.active = None;
        }
    }
}

/// Holds the batch flag for the duration of `upload_all`.
struct BatchGuard {
    inner: Arc<Inner>,
    epoch: u64,
    ticket: u64,
}

impl Drop for BatchGuard {
    fn drop(&mut self) {
        let mut state = lock(&self.inner.state);
        if state.epoch == self.epoch && state.task.batch_ticket == self.ticket {
            state.task.batch = false;
        }
    }
}

impl ImageUploadManager {
    /// Uploads `file` for `tag` and resolves the tag to the returned URL.
    ///
    /// Precondition violations (unknown tag, another upload in flight) are
    /// reported as [`UploadOutcome::Skipped`], not as errors. On transport
    /// failure the previous resolution is kept and the tag shows an error.
    pub async fn upload_single(
        &self,
        tag: &Tag,
        file: ImageFile,
    ) -> Result<UploadOutcome, EngineError> {
        match self.begin_upload(tag, false) {
            Ok(active) => self.run_upload(active, file).await,
            Err(reason) => {
                tracing::debug!(tag = %tag, reason = ?reason, "image_upload_skipped");
                Ok(UploadOutcome::Skipped(reason))
            }
        }
    }

    /// Uploads one file per pending tag, pairing both lists by position.
    ///
    /// Pairings run one after another; a failure does not stop the rest.
    /// If any pairing failed the whole report comes back inside
    /// [`EngineError::BatchIncomplete`], successful pairings stay resolved.
    pub async fn upload_all(&self, files: Vec<ImageFile>) -> Result<BatchReport, EngineError> {
        let (pending, _batch) = {
            let mut state = self.state();
            if state.task.active.is_some() || state.task.batch {
                tracing::debug!("image_batch_skipped_busy");
                return Ok(BatchReport::default());
            }
            let pending = state.assignments.unresolved();
            if pending.is_empty() {
                return Ok(BatchReport::default());
            }
            state.task.batch = true;
            state.task.batch_ticket = state.task.batch_ticket.wrapping_add(1);
            let guard = BatchGuard {
                inner: self.inner.clone(),
                epoch: state.epoch,
                ticket: state.task.batch_ticket,
            };
            (pending, guard)
        };

        let mut report = BatchReport::default();
        for (tag, file) in pending.into_iter().zip(files) {
            report.attempted += 1;
            let outcome = match self.begin_upload(&tag, true) {
                Ok(active) => self.run_upload(active, file).await,
                Err(reason) => Ok(UploadOutcome::Skipped(reason)),
            };
            match outcome {
                Ok(UploadOutcome::Resolved { url, .. }) => report.resolved.push((tag, url)),
                Ok(UploadOutcome::Skipped(reason)) => report.skipped.push((tag, reason)),
                Err(err) => report.failed.push((tag, err.to_string())),
            }
        }

        if report.failed.is_empty() {
            tracing::info!(
                resolved = report.resolved.len(),
                skipped = report.skipped.len(),
                "image_batch_completed"
            );
            Ok(report)
        } else {
            tracing::warn!(
                failed = report.failed.len(),
                attempted = report.attempted,
                "image_batch_incomplete"
            );
            Err(EngineError::BatchIncomplete { report })
        }
    }

    fn begin_upload(&self, tag: &Tag, within_batch: bool) -> Result<ActiveUpload, SkipReason> {
        let mut state = self.state();
        if !state.assignments.contains(tag) {
            return Err(SkipReason::UnknownTag);
        }
        if state.task.active.is_some() || (state.task.batch && !within_batch) {
            return Err(SkipReason::Busy);
        }
        state.task.active = Some(tag.clone());
        state.task.ticket = state.task.ticket.wrapping_add(1);
        Ok(ActiveUpload {
            inner: self.inner.clone(),
            tag: tag.clone(),
            epoch: state.epoch,
            ticket: state.task.ticket,
        })
    }

    async fn run_upload(
        &self,
        active: ActiveUpload,
        file: ImageFile,
    ) -> Result<UploadOutcome, EngineError> {
        let tag = active.tag.clone();
        let result = self.inner.transport.upload(&file).await;

        let mut state = self.state();
        if state.epoch != active.epoch {
            drop(state);
            tracing::debug!(tag = %tag, "image_upload_settled_after_detach");
            return Ok(UploadOutcome::Skipped(SkipReason::Detached));
        }
        state.task.active = None;

        let asset = match result {
            Ok(asset) => asset,
            Err(err) => {
                state.errors.insert(tag.clone(), err.to_string());
                drop(state);
                tracing::warn!(tag = %tag, error = ?err, "image_upload_failed");
                return Err(EngineError::Transport { tag, source: err });
            }
        };

        if !state.assignments.contains(&tag) {
            drop(state);
            tracing::debug!(tag = %tag, url = %asset.url, "image_upload_tag_gone");
            return Ok(UploadOutcome::Skipped(SkipReason::UnknownTag));
        }
        let previous = state.assignments.resolve(&tag, asset.url.clone());
        state.errors.remove(&tag);

        // The superseded asset survives while any other tag still points at it.
        let new_key = storage_key(&asset.url).unwrap_or_else(|| asset.key.clone());
        let replaced = previous
            .as_deref()
            .and_then(storage_key)
            .filter(|old_key| *old_key != new_key)
            .filter(|old_key| {
                !state.assignments.iter().any(|(other, url)| {
                    other != &tag && url.and_then(storage_key).as_deref() == Some(old_key.as_str())
                })
            });
        drop(state);

        if let Some(old_key) = &replaced {
            self.schedule_deletion(old_key.clone());
        }
        tracing::info!(tag = %tag, url = %asset.url, "image_upload_resolved");
        Ok(UploadOutcome::Resolved {
            url: asset.url,
            replaced,
        })
    }

    /// Fire-and-forget removal of a superseded asset; failures are only logged.
    fn schedule_deletion(&self, key: String) {
        let transport = self.inner.transport.clone();
        let handle = tokio::spawn(async move {
            match transport.delete(&key).await {
                Ok(()) => tracing::debug!(key = %key, "image_asset_deleted"),
                Err(err) => tracing::warn!(key = %key, error = ?err, "image_asset_delete_failed"),
            }
        });
        let mut deletions = lock(&self.inner.deletions);
        deletions.retain(|h| !h.is_finished());
        deletions.push(handle);
    }
}
