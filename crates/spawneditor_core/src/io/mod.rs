//! Persisted-text codec entry points and parse error taxonomy.
//!
//! # Responsibility
//! - Convert between spawn documents and their persisted JSON text form.
//! - Reject structurally malformed input with location information; no
//!   partial document is ever produced.
//!
//! # Invariants
//! - `save_document` is deterministic: identical document state yields
//!   byte-identical output.
//! - `load_document(save_document(d))` equals `d` in every entry field and
//!   in order.

use std::error::Error;
use std::fmt::{Display, Formatter};

mod json_store;

pub use json_store::{load_document, save_document, LoadedDocument};

/// Result alias for load operations.
pub type ParseResult<T> = Result<T, ParseError>;

/// Malformed persisted text. The operation aborts; nothing is loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// The text is not valid JSON.
    Syntax {
        line: usize,
        column: usize,
        message: String,
    },
    /// The JSON root is not the expected array of spawn objects.
    UnexpectedRoot { found: &'static str },
    /// One spawn object is missing or mistypes a required field.
    Entry { index: usize, reason: String },
}

impl Display for ParseError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Syntax {
                line,
                column,
                message,
            } => write!(f, "invalid JSON at line {line}, column {column}: {message}"),
            Self::UnexpectedRoot { found } => {
                write!(f, "expected a top-level array of spawn objects, found {found}")
            }
            Self::Entry { index, reason } => write!(f, "entry #{index}: {reason}"),
        }
    }
}

impl Error for ParseError {}
