//! Reversible edit command records.
//!
//! # Responsibility
//! - Describe caller intent (`EditCommand`) separately from the applied,
//!   reversible history record (`AppliedCommand`).
//!
//! # Invariants
//! - An `AppliedCommand` is immutable once constructed and captures
//!   before/after values by value, never a live reference into the document.
//! - `apply_inverse(apply_forward(d)) == d` field for field, including entry
//!   revision counters.

use crate::edit::engine::EditError;
use crate::model::{Document, EntryId, MetaValue, Position, SpawnEntry};
use std::collections::BTreeMap;

/// Caller intent for one atomic edit.
#[derive(Debug, Clone, PartialEq)]
pub enum EditCommand {
    AddEntry {
        category: String,
        position: Position,
        metadata: BTreeMap<String, MetaValue>,
    },
    RemoveEntry {
        id: EntryId,
    },
    SetCategory {
        id: EntryId,
        category: String,
    },
    SetPosition {
        id: EntryId,
        position: Position,
    },
    /// `value: None` removes the key.
    SetMetadata {
        id: EntryId,
        key: String,
        value: Option<MetaValue>,
    },
}

impl EditCommand {
    pub fn add_entry(category: impl Into<String>, position: Position) -> Self {
        Self::AddEntry {
            category: category.into(),
            position,
            metadata: BTreeMap::new(),
        }
    }

    pub fn remove_entry(id: EntryId) -> Self {
        Self::RemoveEntry { id }
    }

    pub fn set_category(id: EntryId, category: impl Into<String>) -> Self {
        Self::SetCategory {
            id,
            category: category.into(),
        }
    }

    pub fn set_position(id: EntryId, position: Position) -> Self {
        Self::SetPosition { id, position }
    }

    pub fn set_metadata(id: EntryId, key: impl Into<String>, value: impl Into<MetaValue>) -> Self {
        Self::SetMetadata {
            id,
            key: key.into(),
            value: Some(value.into()),
        }
    }

    pub fn remove_metadata(id: EntryId, key: impl Into<String>) -> Self {
        Self::SetMetadata {
            id,
            key: key.into(),
            value: None,
        }
    }

    /// Short command kind tag for log events.
    pub(crate) fn kind(&self) -> &'static str {
        match self {
            Self::AddEntry { .. } => "add_entry",
            Self::RemoveEntry { .. } => "remove_entry",
            Self::SetCategory { .. } => "set_category",
            Self::SetPosition { .. } => "set_position",
            Self::SetMetadata { .. } => "set_metadata",
        }
    }
}

/// Captured single-field change with its inverse value.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum FieldChange {
    Category {
        before: String,
        after: String,
    },
    Position {
        before: Position,
        after: Position,
    },
    Metadata {
        key: String,
        before: Option<MetaValue>,
        after: Option<MetaValue>,
    },
}

/// Applied, reversible history record.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum AppliedCommand {
    Added {
        entry: SpawnEntry,
    },
    Removed {
        entry: SpawnEntry,
        index: usize,
    },
    FieldChanged {
        id: EntryId,
        change: FieldChange,
        prior_revision: u64,
    },
}

impl AppliedCommand {
    /// Resolves caller intent against the current document, capturing the
    /// values needed to reverse the edit. Nothing is mutated here.
    pub(crate) fn resolve(document: &Document, command: &EditCommand) -> Result<Self, EditError> {
        match command {
            EditCommand::AddEntry {
                category,
                position,
                metadata,
            } => {
                let mut entry = SpawnEntry::new(category.clone(), *position);
                entry.metadata = metadata.clone();
                Ok(Self::Added { entry })
            }
            EditCommand::RemoveEntry { id } => {
                let entry = require(document, id)?.clone();
                let index = document
                    .entries()
                    .position(|candidate| candidate.id == entry.id)
                    .ok_or(EditError::Inconsistent("entry lookup lost its index"))?;
                Ok(Self::Removed { entry, index })
            }
            EditCommand::SetCategory { id, category } => {
                let entry = require(document, id)?;
                Ok(Self::FieldChanged {
                    id: id.clone(),
                    change: FieldChange::Category {
                        before: entry.category.clone(),
                        after: category.clone(),
                    },
                    prior_revision: entry.revision,
                })
            }
            EditCommand::SetPosition { id, position } => {
                let entry = require(document, id)?;
                Ok(Self::FieldChanged {
                    id: id.clone(),
                    change: FieldChange::Position {
                        before: entry.position,
                        after: *position,
                    },
                    prior_revision: entry.revision,
                })
            }
            EditCommand::SetMetadata { id, key, value } => {
                let entry = require(document, id)?;
                Ok(Self::FieldChanged {
                    id: id.clone(),
                    change: FieldChange::Metadata {
                        key: key.clone(),
                        before: entry.metadata_value(key).cloned(),
                        after: value.clone(),
                    },
                    prior_revision: entry.revision,
                })
            }
        }
    }

    /// Id of the entry this command touches.
    pub(crate) fn entry_id(&self) -> &EntryId {
        match self {
            Self::Added { entry } | Self::Removed { entry, .. } => &entry.id,
            Self::FieldChanged { id, .. } => id,
        }
    }

    pub(crate) fn apply_forward(&self, document: &mut Document) -> Result<(), EditError> {
        match self {
            Self::Added { entry } => {
                if document.contains(&entry.id) {
                    return Err(EditError::Inconsistent("entry id already present on add"));
                }
                document.push_entry(entry.clone());
                Ok(())
            }
            Self::Removed { entry, .. } => {
                document
                    .remove_entry(&entry.id)
                    .ok_or(EditError::Inconsistent("entry vanished before removal"))?;
                Ok(())
            }
            Self::FieldChanged {
                id,
                change,
                prior_revision,
            } => {
                let entry = document
                    .entry_mut(id)
                    .ok_or(EditError::Inconsistent("edited entry vanished"))?;
                change.apply_after(entry);
                entry.revision = prior_revision + 1;
                Ok(())
            }
        }
    }

    pub(crate) fn apply_inverse(&self, document: &mut Document) -> Result<(), EditError> {
        match self {
            Self::Added { entry } => {
                document
                    .remove_entry(&entry.id)
                    .ok_or(EditError::Inconsistent("added entry vanished before undo"))?;
                Ok(())
            }
            Self::Removed { entry, index } => {
                if document.contains(&entry.id) {
                    return Err(EditError::Inconsistent("entry id already present on undo"));
                }
                document.insert_entry(*index, entry.clone());
                Ok(())
            }
            Self::FieldChanged {
                id,
                change,
                prior_revision,
            } => {
                let entry = document
                    .entry_mut(id)
                    .ok_or(EditError::Inconsistent("edited entry vanished"))?;
                change.apply_before(entry);
                entry.revision = *prior_revision;
                Ok(())
            }
        }
    }
}

impl FieldChange {
    fn apply_after(&self, entry: &mut SpawnEntry) {
        match self {
            Self::Category { after, .. } => entry.category = after.clone(),
            Self::Position { after, .. } => entry.position = *after,
            Self::Metadata { key, after, .. } => match after {
                Some(value) => {
                    entry.metadata.insert(key.clone(), value.clone());
                }
                None => {
                    entry.metadata.remove(key);
                }
            },
        }
    }

    fn apply_before(&self, entry: &mut SpawnEntry) {
        match self {
            Self::Category { before, .. } => entry.category = before.clone(),
            Self::Position { before, .. } => entry.position = *before,
            Self::Metadata { key, before, .. } => match before {
                Some(value) => {
                    entry.metadata.insert(key.clone(), value.clone());
                }
                None => {
                    entry.metadata.remove(key);
                }
            },
        }
    }
}

fn require<'doc>(document: &'doc Document, id: &EntryId) -> Result<&'doc SpawnEntry, EditError> {
    document
        .get_entry(id)
        .ok_or_else(|| EditError::NotFound(id.clone()))
}
