use serde::Serialize;

use super::ImageUploadManager;
use crate::domain::images::Tag;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DragState {
    pub dragged: Option<Tag>,
    pub hovered: Option<Tag>,
}

impl ImageUploadManager {
    /// Starts dragging `tag`. Only resolved tags, or the tag currently being
    /// uploaded, can be picked up.
    pub fn start_drag(&self, tag: &Tag) -> bool {
        let mut state = self.state();
        let draggable = state.assignments.is_resolved(tag) || state.task.active.as_ref() == Some(tag);
        if !draggable {
            return false;
        }
        state.drag = DragState {
            dragged: Some(tag.clone()),
            hovered: None,
        };
        true
    }

    pub fn drag_over(&self, tag: &Tag) {
        let mut state = self.state();
        if state.drag.dragged.as_ref() != Some(tag) && state.assignments.contains(tag) {
            state.drag.hovered = Some(tag.clone());
        }
    }

    /// Drops the dragged tag onto `target`, exchanging their assets.
    ///
    /// Drag state is cleared whatever happens. Dropping onto itself, with
    /// nothing dragged, or onto/from a tag with an upload in flight leaves
    /// the assignments untouched.
    pub fn drop_on(&self, target: &Tag) -> bool {
        let mut state = self.state();
        let source = std::mem::take(&mut state.drag).dragged;
        let Some(source) = source else {
            return false;
        };
        if &source == target {
            return false;
        }
        let uploading = state.task.active.as_ref();
        if uploading == Some(&source) || uploading == Some(target) {
            tracing::debug!(source = %source, target = %target, "image_drop_during_upload_ignored");
            return false;
        }
        let swapped = state.assignments.exchange(&source, target);
        if swapped {
            tracing::debug!(source = %source, target = %target, "image_assignments_exchanged");
        }
        swapped
    }

    pub fn drag_end(&self) {
        self.state().drag = DragState::default();
    }

    pub fn drag_leave(&self) {
        self.state().drag = DragState::default();
    }

    pub fn drag_state(&self) -> DragState {
        self.state().drag.clone()
    }
}
