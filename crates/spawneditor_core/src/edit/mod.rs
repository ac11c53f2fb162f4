//! Edit engine: reversible commands, history and the exclusive edit scope.

mod command;
mod engine;

pub use command::EditCommand;
pub use engine::{DocumentObserver, EditEngine, EditError, EditResult, HistoryOutcome};
