//! Command/edit engine: validate-then-commit mutations with undo/redo.
//!
//! # Responsibility
//! - Funnel every document mutation through one exclusive scope.
//! - Keep the undo/redo history and guarantee atomic rollback when
//!   validation rejects an edit.
//! - Push presence snapshots to the registered observer when committed state
//!   changes them.
//!
//! # Invariants
//! - Exactly one command is in flight per document; execute/undo/redo, reads
//!   and save all serialize on the same lock.
//! - A rejected edit leaves the document (entry fields, revision counters,
//!   dirty flag) exactly as it was before the call.
//! - Executing a new command clears the redo stack.

use crate::edit::command::{AppliedCommand, EditCommand};
use crate::io;
use crate::model::{Document, EntryId, SpawnEntry};
use crate::presence::PresenceSnapshot;
use crate::schema::{self, SchemaConfig, ValidationReport};
use log::{debug, error, warn};
use once_cell::sync::OnceCell;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Result alias for engine operations.
pub type EditResult<T> = Result<T, EditError>;

/// Edit-layer error taxonomy.
#[derive(Debug)]
pub enum EditError {
    /// The referenced entry does not exist. Recoverable.
    NotFound(EntryId),
    /// The edit produced a document the schema rejects; it was rolled back.
    Validation(ValidationReport),
    /// Internal invariant breach; the history no longer matches the document.
    Inconsistent(&'static str),
}

impl Display for EditError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound(id) => write!(f, "entry not found: {id}"),
            Self::Validation(report) => write!(f, "edit rejected: {report}"),
            Self::Inconsistent(details) => write!(f, "inconsistent edit state: {details}"),
        }
    }
}

impl Error for EditError {}

/// Outcome of an undo/redo request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryOutcome {
    /// A history entry was applied.
    Applied,
    /// Nothing to undo/redo. A no-op condition, not an error.
    HistoryEmpty,
}

/// Receives derived presence snapshots after committed state changes.
///
/// Implementations must not call back into the engine and must return
/// promptly; the engine invokes them while holding its exclusive scope.
pub trait DocumentObserver: Send + Sync {
    fn document_changed(&self, snapshot: PresenceSnapshot);
}

struct EngineState {
    document: Document,
    schema: SchemaConfig,
    undo: Vec<AppliedCommand>,
    redo: Vec<AppliedCommand>,
    last_pushed: Option<PresenceSnapshot>,
}

/// Command engine owning one document and its history.
pub struct EditEngine {
    state: Mutex<EngineState>,
    observer: OnceCell<Arc<dyn DocumentObserver>>,
}

impl EditEngine {
    pub fn new(document: Document, schema: SchemaConfig) -> Self {
        Self {
            state: Mutex::new(EngineState {
                document,
                schema,
                undo: Vec::new(),
                redo: Vec::new(),
                last_pushed: None,
            }),
            observer: OnceCell::new(),
        }
    }

    /// Registers the presence observer and pushes the current snapshot.
    ///
    /// Only the first registration wins; later calls are ignored with a
    /// warning.
    pub fn set_observer(&self, observer: Arc<dyn DocumentObserver>) {
        if self.observer.set(observer).is_err() {
            warn!("event=observer_rejected module=edit status=ignored reason=already_registered");
            return;
        }
        let mut state = self.lock_state();
        self.push_presence(&mut state);
    }

    /// Replaces the schema rules used to validate subsequent commands.
    ///
    /// Does not re-check the current document; the next execute/redo runs
    /// against the new rules.
    pub fn set_schema(&self, schema: SchemaConfig) {
        self.lock_state().schema = schema;
    }

    pub fn schema(&self) -> SchemaConfig {
        self.lock_state().schema.clone()
    }

    /// Applies one command: forward mutation, validation, commit.
    ///
    /// On a validation failure the mutation is rolled back atomically, the
    /// history is left untouched and `EditError::Validation` is returned.
    /// On success the command is pushed onto the undo stack, the redo stack
    /// is cleared and the id of the affected entry is returned.
    pub fn execute(&self, command: EditCommand) -> EditResult<EntryId> {
        let mut state = self.lock_state();
        let was_dirty = state.document.is_dirty();

        let applied = AppliedCommand::resolve(&state.document, &command)?;
        applied.apply_forward(&mut state.document)?;
        state.document.mark_dirty();

        let report = schema::validate(&state.document, &state.schema);
        if !report.is_valid() {
            applied.apply_inverse(&mut state.document)?;
            if !was_dirty {
                state.document.mark_clean();
            }
            warn!(
                "event=edit_rejected module=edit status=rolled_back kind={} entry={} violations={}",
                command.kind(),
                applied.entry_id(),
                report.violations().len()
            );
            return Err(EditError::Validation(report));
        }

        let id = applied.entry_id().clone();
        debug!(
            "event=edit_applied module=edit status=ok kind={} entry={}",
            command.kind(),
            id
        );
        state.undo.push(applied);
        state.redo.clear();
        self.push_presence(&mut state);
        Ok(id)
    }

    /// Reverses the most recent committed command.
    ///
    /// Undo restores a previously valid state by construction and is not
    /// re-validated; debug builds re-check defensively.
    pub fn undo(&self) -> EditResult<HistoryOutcome> {
        let mut state = self.lock_state();
        let Some(applied) = state.undo.pop() else {
            return Ok(HistoryOutcome::HistoryEmpty);
        };

        applied.apply_inverse(&mut state.document)?;
        state.document.mark_dirty();

        if cfg!(debug_assertions) {
            let report = schema::validate(&state.document, &state.schema);
            if !report.is_valid() {
                error!(
                    "event=undo_inconsistent module=edit status=error violations={}",
                    report.violations().len()
                );
                debug_assert!(report.is_valid(), "undo restored an invalid document: {report}");
            }
        }

        debug!(
            "event=edit_undone module=edit status=ok entry={}",
            applied.entry_id()
        );
        state.redo.push(applied);
        self.push_presence(&mut state);
        Ok(HistoryOutcome::Applied)
    }

    /// Re-applies the most recently undone command.
    ///
    /// The forward mutation is re-validated: schema rules may have changed
    /// since the undo. On a violation the command is rolled back, discarded
    /// from the redo stack and `EditError::Validation` is returned.
    pub fn redo(&self) -> EditResult<HistoryOutcome> {
        let mut state = self.lock_state();
        let Some(applied) = state.redo.pop() else {
            return Ok(HistoryOutcome::HistoryEmpty);
        };

        let was_dirty = state.document.is_dirty();
        applied.apply_forward(&mut state.document)?;
        state.document.mark_dirty();

        let report = schema::validate(&state.document, &state.schema);
        if !report.is_valid() {
            applied.apply_inverse(&mut state.document)?;
            if !was_dirty {
                state.document.mark_clean();
            }
            warn!(
                "event=redo_rejected module=edit status=discarded entry={} violations={}",
                applied.entry_id(),
                report.violations().len()
            );
            return Err(EditError::Validation(report));
        }

        debug!(
            "event=edit_redone module=edit status=ok entry={}",
            applied.entry_id()
        );
        state.undo.push(applied);
        self.push_presence(&mut state);
        Ok(HistoryOutcome::Applied)
    }

    /// Runs a closure against the document under the exclusive scope.
    pub fn read<R>(&self, f: impl FnOnce(&Document) -> R) -> R {
        let state = self.lock_state();
        f(&state.document)
    }

    /// Copies one entry out of the document.
    pub fn get_entry(&self, id: &EntryId) -> EditResult<SpawnEntry> {
        self.read(|document| {
            document
                .get_entry(id)
                .cloned()
                .ok_or_else(|| EditError::NotFound(id.clone()))
        })
    }

    pub fn is_dirty(&self) -> bool {
        self.read(Document::is_dirty)
    }

    pub fn entry_count(&self) -> usize {
        self.read(Document::entry_count)
    }

    pub fn undo_depth(&self) -> usize {
        self.lock_state().undo.len()
    }

    pub fn redo_depth(&self) -> usize {
        self.lock_state().redo.len()
    }

    /// Serializes the document canonically and clears the dirty flag.
    ///
    /// Acquires the same exclusive scope as commands: a save always observes
    /// a consistent, non-mid-mutation document.
    pub fn save_to_string(&self) -> String {
        let mut state = self.lock_state();
        let text = io::save_document(&state.document);
        state.document.mark_clean();
        debug!(
            "event=document_serialized module=edit status=ok entries={} bytes={}",
            state.document.entry_count(),
            text.len()
        );
        self.push_presence(&mut state);
        text
    }

    fn lock_state(&self) -> MutexGuard<'_, EngineState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Hands the derived snapshot to the observer when it changed.
    fn push_presence(&self, state: &mut EngineState) {
        let snapshot = PresenceSnapshot::of(&state.document);
        if state.last_pushed.as_ref() == Some(&snapshot) {
            return;
        }
        state.last_pushed = Some(snapshot.clone());
        if let Some(observer) = self.observer.get() {
            observer.document_changed(snapshot);
        }
    }
}
