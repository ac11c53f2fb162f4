//! Core document engine for the spawn editor.
//! This crate is the single source of truth for spawn-document invariants.

pub mod edit;
pub mod io;
pub mod logging;
pub mod model;
pub mod presence;
pub mod schema;
pub mod service;

pub use edit::{DocumentObserver, EditCommand, EditEngine, EditError, EditResult, HistoryOutcome};
pub use io::{load_document, save_document, LoadedDocument, ParseError, ParseResult};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::{Direction, Document, EntryId, MetaValue, Position, SpawnEntry};
pub use presence::{
    BridgeConfig, LogPresenceTransport, PresenceBridge, PresenceSendError, PresenceSnapshot,
    PresenceState, PresenceTransport,
};
pub use schema::{
    validate, AxisBounds, CategoryRule, PositionBounds, SchemaConfig, ValidationReport, Violation,
};
pub use service::{EditorSession, SessionError, SessionResult};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
