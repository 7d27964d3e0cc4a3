//! Keeps the image placeholders of a document in sync with uploaded assets.
//!
//! [`ImageUploadManager`] owns the tag to URL assignments for one document.
//! The host pushes every edit through [`ImageUploadManager::on_document_changed`];
//! user actions (single upload, batch upload, drag and drop) mutate the
//! assignments through the manager's operations. No lock is ever held across
//! a transport call, so the manager can be cloned into spawned tasks.

mod drag;
mod upload;

#[cfg(test)]
pub(crate) mod testing;

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use serde::Serialize;
use tokio::task::JoinHandle;

use crate::application::ports::asset_transport::AssetTransport;
use crate::domain::images::{AssignmentMap, Tag, extract_tags};

pub use drag::DragState;
pub use upload::{BatchReport, EngineError, SkipReason, UploadOutcome};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "message", rename_all = "snake_case")]
pub enum TagStatus {
    Idle,
    Loading,
    Success,
    Error(String),
}

#[derive(Debug, Clone, Serialize)]
pub struct TagRow {
    pub tag: Tag,
    pub url: Option<String>,
    pub status: TagStatus,
}

/// Read model of the manager at one point in time.
#[derive(Debug, Clone, Serialize)]
pub struct ManagerSnapshot {
    pub rows: Vec<TagRow>,
    pub pending_count: usize,
    pub can_commit: bool,
    pub uploading: Option<Tag>,
    pub batch: bool,
    pub drag: DragState,
}

#[derive(Debug, Default)]
pub(crate) struct UploadTask {
    pub(crate) active: Option<Tag>,
    pub(crate) batch: bool,
    // Identifies the current single upload / batch so a stale guard never
    // clears a newer task.
    pub(crate) ticket: u64,
    pub(crate) batch_ticket: u64,
}

#[derive(Debug, Default)]
pub(crate) struct ManagerState {
    pub(crate) epoch: u64,
    pub(crate) assignments: AssignmentMap,
    pub(crate) last_tags: Vec<Tag>,
    pub(crate) task: UploadTask,
    pub(crate) errors: HashMap<Tag, String>,
    pub(crate) drag: DragState,
}

impl ManagerState {
    fn status(&self, tag: &Tag) -> TagStatus {
        if self.task.active.as_ref() == Some(tag) {
            TagStatus::Loading
        } else if let Some(message) = self.errors.get(tag) {
            TagStatus::Error(message.clone())
        } else if self.assignments.is_resolved(tag) {
            TagStatus::Success
        } else {
            TagStatus::Idle
        }
    }
}

pub(crate) struct Inner {
    pub(crate) transport: Arc<dyn AssetTransport>,
    pub(crate) state: Mutex<ManagerState>,
    pub(crate) deletions: Mutex<Vec<JoinHandle<()>>>,
}

#[derive(Clone)]
pub struct ImageUploadManager {
    inner: Arc<Inner>,
}

impl ImageUploadManager {
    pub fn new(transport: Arc<dyn AssetTransport>) -> Self {
        Self {
            inner: Arc::new(Inner {
                transport,
                state: Mutex::new(ManagerState::default()),
                deletions: Mutex::new(Vec::new()),
            }),
        }
    }

    pub(crate) fn state(&self) -> MutexGuard<'_, ManagerState> {
        lock(&self.inner.state)
    }

    /// Feeds the latest document text. Returns `false` when the placeholder
    /// set did not change and reconciliation was skipped.
    pub fn on_document_changed(&self, text: &str) -> bool {
        let tags = extract_tags(text);
        if self.state().last_tags == tags {
            return false;
        }
        self.reconcile(&tags);
        true
    }

    /// Makes the assignment key set equal `tags`, keeping resolutions of
    /// surviving tags. Pruned tags are forgotten entirely; their assets are
    /// not deleted.
    pub fn reconcile(&self, tags: &[Tag]) {
        let mut state = self.state();
        let pruned = state.assignments.reconcile(tags);
        for tag in &pruned {
            state.errors.remove(tag);
        }
        let drag_stale = [&state.drag.dragged, &state.drag.hovered]
            .into_iter()
            .flatten()
            .any(|t| !state.assignments.contains(t));
        if drag_stale {
            state.drag = DragState::default();
        }
        state.last_tags = tags.to_vec();
        tracing::debug!(
            tags = tags.len(),
            pruned = pruned.len(),
            pending = state.assignments.pending_count(),
            "image_tags_reconciled"
        );
    }

    pub fn pending_count(&self) -> usize {
        self.state().assignments.pending_count()
    }

    pub fn can_commit(&self) -> bool {
        self.state().assignments.can_commit()
    }

    pub fn status(&self, tag: &Tag) -> TagStatus {
        self.state().status(tag)
    }

    pub fn resolved_url(&self, tag: &Tag) -> Option<String> {
        self.state().assignments.get(tag).map(str::to_string)
    }

    /// Copy of the current assignments, for the document committer.
    pub fn assignments(&self) -> AssignmentMap {
        self.state().assignments.clone()
    }

    pub fn snapshot(&self) -> ManagerSnapshot {
        let state = self.state();
        let rows = state
            .assignments
            .display_order()
            .iter()
            .map(|tag| TagRow {
                tag: tag.clone(),
                url: state.assignments.get(tag).map(str::to_string),
                status: state.status(tag),
            })
            .collect();
        ManagerSnapshot {
            rows,
            pending_count: state.assignments.pending_count(),
            can_commit: state.assignments.can_commit(),
            uploading: state.task.active.clone(),
            batch: state.task.batch,
            drag: state.drag.clone(),
        }
    }

    /// Tears the manager down for its document. Uploads still in flight
    /// settle into nothing.
    pub fn detach(&self) {
        let mut state = self.state();
        let epoch = state.epoch.wrapping_add(1);
        *state = ManagerState {
            epoch,
            ..ManagerState::default()
        };
        tracing::debug!(epoch, "image_manager_detached");
    }

    /// Waits for every scheduled deletion of superseded assets.
    pub async fn flush_deletions(&self) {
        let handles: Vec<JoinHandle<()>> = std::mem::take(&mut *lock(&self.inner.deletions));
        for handle in handles {
            if let Err(err) = handle.await {
                tracing::warn!(error = ?err, "image_delete_task_failed");
            }
        }
    }
}

pub(crate) fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
