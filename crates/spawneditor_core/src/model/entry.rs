//! Spawn entry domain model.
//!
//! # Responsibility
//! - Define the canonical spawn record shared by the edit engine, the
//!   validator and the serializer.
//! - Keep typed field values (position, category, scalar metadata) in one
//!   place.
//!
//! # Invariants
//! - `id` is stable and never reused for another entry.
//! - `revision` grows by exactly one per committed mutation of this entry and
//!   is restored verbatim by undo.
//! - `extra` carries persisted fields this editor does not model; they must
//!   round-trip untouched.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Metadata key that carries an entry facing, when present.
pub const DIRECTION_KEY: &str = "direction";

/// Stable identifier for one spawn entry.
///
/// Entries created in the editor mint a UUID-backed id; documents loaded from
/// disk keep whatever non-empty id the file carried.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntryId(String);

impl EntryId {
    /// Mints a fresh identifier for an entry created in the editor.
    pub fn random() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Wraps an identifier read from a persisted document.
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Display for EntryId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EntryId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Map coordinate triple: the tile a spawn sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Position {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl Position {
    pub fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// Same x/y column regardless of plane.
    pub fn matches_column(&self, other: Position) -> bool {
        self.x == other.x && self.y == other.y
    }
}

impl Display for Position {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "x={}, y={}, z={}", self.x, self.y, self.z)
    }
}

/// Facing assigned to a spawn, stored under the `direction` metadata key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    North,
    NorthEast,
    East,
    SouthEast,
    South,
    SouthWest,
    West,
    NorthWest,
    None,
}

impl Direction {
    /// Parses a facing label leniently.
    ///
    /// Accepts canonical labels (`NORTH_EAST`), compass abbreviations (`ne`)
    /// and historical spellings (`North-East`, `STATIONARY`); case, dashes,
    /// underscores and spaces are ignored. Returns `None` for unrecognized
    /// input.
    pub fn parse_label(raw: &str) -> Option<Self> {
        let key: String = raw
            .trim()
            .chars()
            .filter(|c| !matches!(c, '-' | '_' | ' '))
            .collect::<String>()
            .to_ascii_uppercase();

        match key.as_str() {
            "N" | "NORTH" => Some(Self::North),
            "NE" | "NORTHEAST" => Some(Self::NorthEast),
            "E" | "EAST" => Some(Self::East),
            "SE" | "SOUTHEAST" => Some(Self::SouthEast),
            "S" | "SOUTH" => Some(Self::South),
            "SW" | "SOUTHWEST" => Some(Self::SouthWest),
            "W" | "WEST" => Some(Self::West),
            "NW" | "NORTHWEST" => Some(Self::NorthWest),
            "NONE" | "STATIONARY" => Some(Self::None),
            _ => Option::None,
        }
    }

    /// Canonical persisted label.
    pub fn as_label(&self) -> &'static str {
        match self {
            Self::North => "NORTH",
            Self::NorthEast => "NORTH_EAST",
            Self::East => "EAST",
            Self::SouthEast => "SOUTH_EAST",
            Self::South => "SOUTH",
            Self::SouthWest => "SOUTH_WEST",
            Self::West => "WEST",
            Self::NorthWest => "NORTH_WEST",
            Self::None => "NONE",
        }
    }
}

/// Scalar metadata value attached to an entry.
///
/// Untagged on the wire: plain JSON booleans, integers, floats and strings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetaValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl MetaValue {
    /// Human-readable type name used in violation messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Bool(_) => "boolean",
            Self::Int(_) => "integer",
            Self::Float(_) => "float",
            Self::Text(_) => "string",
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(value) => Some(value),
            _ => None,
        }
    }
}

impl From<bool> for MetaValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for MetaValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<f64> for MetaValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<&str> for MetaValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for MetaValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

/// One editable spawn record within a document.
#[derive(Debug, Clone, PartialEq)]
pub struct SpawnEntry {
    /// Stable global id used for lookups, history records and persistence.
    pub id: EntryId,
    /// Named category (NPC name, object class, ...).
    pub category: String,
    /// Tile the spawn occupies.
    pub position: Position,
    /// Open-ended scalar metadata (`walk_radius`, `aggressive`, `direction`, ...).
    pub metadata: BTreeMap<String, MetaValue>,
    /// Persisted fields this editor does not model, preserved on save.
    pub extra: BTreeMap<String, Value>,
    /// Committed-mutation counter for this entry.
    pub revision: u64,
}

impl SpawnEntry {
    /// Creates an entry with a freshly minted id.
    pub fn new(category: impl Into<String>, position: Position) -> Self {
        Self::with_id(EntryId::random(), category, position)
    }

    /// Creates an entry with a caller-provided stable id.
    ///
    /// Used by load paths where identity already exists in the file.
    pub fn with_id(id: EntryId, category: impl Into<String>, position: Position) -> Self {
        Self {
            id,
            category: category.into(),
            position,
            metadata: BTreeMap::new(),
            extra: BTreeMap::new(),
            revision: 0,
        }
    }

    pub fn is_at(&self, position: Position) -> bool {
        self.position == position
    }

    pub fn metadata_value(&self, key: &str) -> Option<&MetaValue> {
        self.metadata.get(key)
    }

    /// Facing parsed from the `direction` metadata key, when present and valid.
    pub fn direction(&self) -> Option<Direction> {
        self.metadata_value(DIRECTION_KEY)
            .and_then(MetaValue::as_text)
            .and_then(Direction::parse_label)
    }
}
