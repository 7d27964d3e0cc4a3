use std::path::{Path, PathBuf};

use anyhow::Context;

use crate::application::services::document::{DocumentCommitter, ReferenceStyle};
use crate::application::services::reconciliation::{EngineError, ImageUploadManager};
use crate::domain::images::{ImageFile, Tag};

pub struct PublishDocument<'a> {
    pub manager: &'a ImageUploadManager,
    pub style: ReferenceStyle,
}

#[derive(Debug)]
pub struct PublishReport {
    pub text: String,
    pub applied: bool,
    pub resolved: Vec<(Tag, String)>,
    pub failed: Vec<(Tag, String)>,
    pub pending: Vec<Tag>,
}

impl PublishDocument<'_> {
    /// Reads the document and images from disk, then publishes.
    pub async fn execute_paths(
        &self,
        document: &Path,
        images: &[PathBuf],
    ) -> anyhow::Result<PublishReport> {
        let text = tokio::fs::read_to_string(document)
            .await
            .with_context(|| format!("read document {}", document.display()))?;
        let mut files = Vec::with_capacity(images.len());
        for path in images {
            let file = ImageFile::read(path)
                .await
                .with_context(|| format!("read image {}", path.display()))?;
            files.push(file);
        }
        self.execute(text, files).await
    }

    /// Uploads `files` for the pending placeholders of `text` and rewrites
    /// the placeholders once every one of them is resolved.
    pub async fn execute(&self, text: String, files: Vec<ImageFile>) -> anyhow::Result<PublishReport> {
        self.manager.on_document_changed(&text);
        let batch = match self.manager.upload_all(files).await {
            Ok(report) => report,
            Err(EngineError::BatchIncomplete { report }) => report,
            Err(err) => return Err(err.into()),
        };

        let assignments = self.manager.assignments();
        let mut committer = DocumentCommitter::new(text, self.style);
        let applied = assignments.can_commit() && committer.commit(&assignments);
        if !applied {
            tracing::info!(
                pending = assignments.pending_count(),
                failed = batch.failed.len(),
                "document_not_committed"
            );
        }
        Ok(PublishReport {
            text: committer.into_text(),
            applied,
            resolved: batch.resolved,
            failed: batch.failed,
            pending: assignments.unresolved(),
        })
    }
}
