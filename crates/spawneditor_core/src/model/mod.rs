//! Domain model for spawn configuration documents.
//!
//! # Responsibility
//! - Define the canonical data structures shared by the validator, the edit
//!   engine and the serializer.
//!
//! # Invariants
//! - Every entry is identified by a stable `EntryId`.
//! - The document is the sole owner of its entries; history and observers
//!   hold copies, never references into it.

pub mod document;
pub mod entry;

pub use document::Document;
pub use entry::{Direction, EntryId, MetaValue, Position, SpawnEntry, DIRECTION_KEY};
