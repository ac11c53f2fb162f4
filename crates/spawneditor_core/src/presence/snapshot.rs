//! Derived presence payload.

use crate::model::Document;
use serde::Serialize;

/// Read-only summary of document state pushed to the external presence
/// service.
///
/// Holds only derived values, never a reference into the live document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PresenceSnapshot {
    pub document_name: String,
    pub dirty: bool,
    pub entry_count: usize,
}

impl PresenceSnapshot {
    /// Derives the snapshot from current document state.
    pub fn of(document: &Document) -> Self {
        Self {
            document_name: document.name().to_string(),
            dirty: document.is_dirty(),
            entry_count: document.entry_count(),
        }
    }

    /// Activity details line shown by the presence service.
    pub fn detail_line(&self) -> String {
        if self.dirty {
            format!("Editing {} (unsaved)", self.document_name)
        } else {
            format!("Editing {}", self.document_name)
        }
    }

    /// Activity state line shown below the details.
    pub fn state_line(&self) -> String {
        if self.entry_count == 1 {
            "1 spawn".to_string()
        } else {
            format!("{} spawns", self.entry_count)
        }
    }
}
