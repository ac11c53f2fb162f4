//! Editor session use-case facade.
//!
//! # Responsibility
//! - Provide the open/edit/save/close lifecycle the GUI calls.
//! - Own file IO around the text codec, with structured open/save events.
//! - Wire the presence bridge to the edit engine.
//!
//! # Invariants
//! - The session never decides prompt UX: a close on a dirty document is
//!   refused with `SessionError::UnsavedChanges` and the GUI chooses.
//! - Save and load observe the same exclusive scope as commands.

use crate::edit::{DocumentObserver, EditCommand, EditEngine, EditError, HistoryOutcome};
use crate::io::{self, ParseError};
use crate::model::{Document, EntryId, SpawnEntry};
use crate::presence::PresenceBridge;
use crate::schema::{SchemaConfig, Violation};
use log::{error, info};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

/// Result alias for session operations.
pub type SessionResult<T> = Result<T, SessionError>;

/// Session-layer error taxonomy.
#[derive(Debug)]
pub enum SessionError {
    /// Reading or writing the document file failed.
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    /// The persisted text is structurally malformed; nothing was loaded.
    Parse(ParseError),
    /// An engine operation failed.
    Edit(EditError),
    /// The document has committed, unsaved edits; the caller must confirm.
    UnsavedChanges,
}

impl Display for SessionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "file operation failed for `{}`: {source}", path.display())
            }
            Self::Parse(err) => write!(f, "{err}"),
            Self::Edit(err) => write!(f, "{err}"),
            Self::UnsavedChanges => f.write_str("document has unsaved changes"),
        }
    }
}

impl Error for SessionError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Parse(err) => Some(err),
            Self::Edit(err) => Some(err),
            Self::UnsavedChanges => None,
        }
    }
}

impl From<ParseError> for SessionError {
    fn from(value: ParseError) -> Self {
        Self::Parse(value)
    }
}

impl From<EditError> for SessionError {
    fn from(value: EditError) -> Self {
        Self::Edit(value)
    }
}

/// One open spawn configuration and its edit history.
pub struct EditorSession {
    engine: EditEngine,
    presence: Option<Arc<PresenceBridge>>,
}

impl std::fmt::Debug for EditorSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EditorSession")
            .field("presence", &self.presence.is_some())
            .finish_non_exhaustive()
    }
}

impl EditorSession {
    /// Creates a session around a new, empty document.
    pub fn create(name: impl Into<String>, schema: SchemaConfig) -> Self {
        let document = Document::new(name);
        info!(
            "event=document_new module=service status=ok name={}",
            document.name()
        );
        Self {
            engine: EditEngine::new(document, schema),
            presence: None,
        }
    }

    /// Opens a session from persisted text.
    ///
    /// Validation violations are returned as warnings; the document still
    /// loads and the caller decides whether to hold edits until it is fixed.
    pub fn open_text(
        name: impl Into<String>,
        text: &str,
        schema: SchemaConfig,
    ) -> SessionResult<(Self, Vec<Violation>)> {
        let loaded = io::load_document(&name.into(), text, &schema)?;
        let session = Self {
            engine: EditEngine::new(loaded.document, schema),
            presence: None,
        };
        Ok((session, loaded.warnings))
    }

    /// Opens a session from a file on disk.
    pub fn open_path(path: impl AsRef<Path>, schema: SchemaConfig) -> SessionResult<(Self, Vec<Violation>)> {
        let path = path.as_ref();
        let started_at = Instant::now();
        info!(
            "event=document_open module=service status=start path={}",
            path.display()
        );

        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(err) => {
                error!(
                    "event=document_open module=service status=error path={} duration_ms={} error={}",
                    path.display(),
                    started_at.elapsed().as_millis(),
                    err
                );
                return Err(SessionError::Io {
                    path: path.to_path_buf(),
                    source: err,
                });
            }
        };

        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        let opened = Self::open_text(name, &text, schema);
        match &opened {
            Ok((_, warnings)) => info!(
                "event=document_open module=service status=ok path={} duration_ms={} warnings={}",
                path.display(),
                started_at.elapsed().as_millis(),
                warnings.len()
            ),
            Err(err) => error!(
                "event=document_open module=service status=error path={} duration_ms={} error={}",
                path.display(),
                started_at.elapsed().as_millis(),
                err
            ),
        }
        opened
    }

    /// Registers the presence bridge as the engine's observer and pushes the
    /// initial snapshot.
    pub fn attach_presence(&mut self, bridge: Arc<PresenceBridge>) {
        self.engine
            .set_observer(Arc::clone(&bridge) as Arc<dyn DocumentObserver>);
        self.presence = Some(bridge);
    }

    pub fn engine(&self) -> &EditEngine {
        &self.engine
    }

    pub fn execute(&self, command: EditCommand) -> Result<EntryId, EditError> {
        self.engine.execute(command)
    }

    pub fn undo(&self) -> Result<HistoryOutcome, EditError> {
        self.engine.undo()
    }

    pub fn redo(&self) -> Result<HistoryOutcome, EditError> {
        self.engine.redo()
    }

    pub fn get_entry(&self, id: &EntryId) -> Result<SpawnEntry, EditError> {
        self.engine.get_entry(id)
    }

    pub fn is_dirty(&self) -> bool {
        self.engine.is_dirty()
    }

    /// Serializes the document canonically and clears the dirty flag.
    pub fn save_to_string(&self) -> String {
        self.engine.save_to_string()
    }

    /// Writes the canonical document text to disk.
    pub fn save_to_path(&self, path: impl AsRef<Path>) -> SessionResult<()> {
        let path = path.as_ref();
        let started_at = Instant::now();
        let text = self.engine.save_to_string();

        match std::fs::write(path, &text) {
            Ok(()) => {
                info!(
                    "event=document_save module=service status=ok path={} duration_ms={} bytes={}",
                    path.display(),
                    started_at.elapsed().as_millis(),
                    text.len()
                );
                Ok(())
            }
            Err(err) => {
                error!(
                    "event=document_save module=service status=error path={} duration_ms={} error={}",
                    path.display(),
                    started_at.elapsed().as_millis(),
                    err
                );
                Err(SessionError::Io {
                    path: path.to_path_buf(),
                    source: err,
                })
            }
        }
    }

    /// Checks the session may be closed without losing edits.
    ///
    /// Returns `SessionError::UnsavedChanges` when the dirty flag is set;
    /// the GUI owns the save/discard prompt and either saves first or calls
    /// [`EditorSession::close_discarding`].
    pub fn close(&self) -> SessionResult<()> {
        if self.engine.is_dirty() {
            return Err(SessionError::UnsavedChanges);
        }
        info!("event=document_close module=service status=ok discarded=false");
        Ok(())
    }

    /// Closes the session, discarding unsaved edits and pending history.
    pub fn close_discarding(self) {
        info!(
            "event=document_close module=service status=ok discarded={}",
            self.engine.is_dirty()
        );
    }
}
