//! JSON text codec for spawn documents.
//!
//! # Responsibility
//! - Parse persisted spawn files into documents, preserving fields this
//!   editor does not model.
//! - Render documents back to canonical, diff-friendly text.
//!
//! # Invariants
//! - Output key order is fixed: `id`, `category`, `tile` (`x`, `y`, `z`),
//!   `metadata` (sorted keys, omitted when empty), then unknown fields in
//!   sorted order.
//! - Parsing never produces a partial document; the first structural problem
//!   aborts the load.

use crate::io::{ParseError, ParseResult};
use crate::model::{Document, EntryId, MetaValue, Position, SpawnEntry};
use crate::schema::{self, SchemaConfig, Violation};
use log::{info, warn};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// A parsed document plus the load-time validation warnings.
///
/// Violations do not block the load; the caller decides whether to hold
/// edits until they are fixed.
#[derive(Debug)]
pub struct LoadedDocument {
    pub document: Document,
    pub warnings: Vec<Violation>,
}

/// Parses persisted spawn text into a document.
pub fn load_document(name: &str, text: &str, schema: &SchemaConfig) -> ParseResult<LoadedDocument> {
    let root: Value = serde_json::from_str(text).map_err(|err| ParseError::Syntax {
        line: err.line(),
        column: err.column(),
        message: strip_position_suffix(err.to_string()),
    })?;

    let items = match root {
        Value::Array(items) => items,
        other => {
            return Err(ParseError::UnexpectedRoot {
                found: json_type_name(&other),
            });
        }
    };

    let mut document = Document::new(name);
    for (index, item) in items.into_iter().enumerate() {
        let entry = parse_entry(index, item)?;
        document.push_entry(entry);
    }

    let warnings = schema::validate(&document, schema).into_violations();
    if warnings.is_empty() {
        info!(
            "event=document_loaded module=io status=ok name={} entries={}",
            document.name(),
            document.entry_count()
        );
    } else {
        warn!(
            "event=document_loaded module=io status=flagged name={} entries={} warnings={}",
            document.name(),
            document.entry_count(),
            warnings.len()
        );
    }

    Ok(LoadedDocument { document, warnings })
}

/// Renders a document to canonical persisted text.
///
/// Deterministic: the same document state always yields byte-identical
/// output.
pub fn save_document(document: &Document) -> String {
    if document.is_empty() {
        return "[]\n".to_string();
    }

    let mut out = String::from("[\n");
    let count = document.entry_count();
    for (index, entry) in document.entries().enumerate() {
        render_entry(&mut out, entry);
        if index + 1 < count {
            out.push(',');
        }
        out.push('\n');
    }
    out.push_str("]\n");
    out
}

fn parse_entry(index: usize, item: Value) -> ParseResult<SpawnEntry> {
    let mut map = match item {
        Value::Object(map) => map,
        other => {
            return Err(entry_error(
                index,
                format!("expected a spawn object, found {}", json_type_name(&other)),
            ));
        }
    };

    let id = require_string(index, &mut map, "id")?;
    let category = require_string(index, &mut map, "category")?;
    let position = parse_tile(index, &mut map)?;

    let mut metadata = BTreeMap::new();
    if let Some(value) = map.remove("metadata") {
        let meta_map = match value {
            Value::Object(map) => map,
            other => {
                return Err(entry_error(
                    index,
                    format!(
                        "field `metadata` must be an object, found {}",
                        json_type_name(&other)
                    ),
                ));
            }
        };
        for (key, raw) in meta_map {
            let scalar = serde_json::from_value::<MetaValue>(raw).map_err(|_| {
                entry_error(index, format!("metadata value for `{key}` must be a scalar"))
            })?;
            metadata.insert(key, scalar);
        }
    }

    let mut entry = SpawnEntry::with_id(EntryId::new(id), category, position);
    entry.metadata = metadata;
    entry.extra = map.into_iter().collect();
    Ok(entry)
}

fn parse_tile(index: usize, map: &mut Map<String, Value>) -> ParseResult<Position> {
    let Some(tile) = map.remove("tile") else {
        return Err(entry_error(index, "missing required field `tile`".to_string()));
    };
    let tile_map = match tile {
        Value::Object(map) => map,
        other => {
            return Err(entry_error(
                index,
                format!("field `tile` must be an object, found {}", json_type_name(&other)),
            ));
        }
    };

    for key in tile_map.keys() {
        if !matches!(key.as_str(), "x" | "y" | "z") {
            return Err(entry_error(
                index,
                format!("field `tile` has unsupported key `{key}`"),
            ));
        }
    }

    Ok(Position {
        x: require_coordinate(index, &tile_map, "x")?,
        y: require_coordinate(index, &tile_map, "y")?,
        z: require_coordinate(index, &tile_map, "z")?,
    })
}

fn require_coordinate(
    index: usize,
    tile: &Map<String, Value>,
    axis: &'static str,
) -> ParseResult<i32> {
    match tile.get(axis) {
        Some(Value::Number(number)) => number
            .as_i64()
            .and_then(|value| i32::try_from(value).ok())
            .ok_or_else(|| {
                entry_error(index, format!("`tile.{axis}` is out of coordinate range"))
            }),
        Some(other) => Err(entry_error(
            index,
            format!("`tile.{axis}` must be an integer, found {}", json_type_name(other)),
        )),
        None => Err(entry_error(
            index,
            format!("missing required field `tile.{axis}`"),
        )),
    }
}

fn require_string(
    index: usize,
    map: &mut Map<String, Value>,
    field: &'static str,
) -> ParseResult<String> {
    match map.remove(field) {
        Some(Value::String(value)) => Ok(value),
        Some(other) => Err(entry_error(
            index,
            format!("field `{field}` must be a string, found {}", json_type_name(&other)),
        )),
        None => Err(entry_error(index, format!("missing required field `{field}`"))),
    }
}

fn entry_error(index: usize, reason: String) -> ParseError {
    ParseError::Entry { index, reason }
}

fn render_entry(out: &mut String, entry: &SpawnEntry) {
    let mut fields: Vec<String> = Vec::with_capacity(4 + entry.extra.len());
    fields.push(format!("    \"id\": {}", json_string(entry.id.as_str())));
    fields.push(format!("    \"category\": {}", json_string(&entry.category)));
    fields.push(format!(
        "    \"tile\": {{\n      \"x\": {},\n      \"y\": {},\n      \"z\": {}\n    }}",
        entry.position.x, entry.position.y, entry.position.z
    ));

    if !entry.metadata.is_empty() {
        let mut block = String::from("    \"metadata\": {\n");
        let last = entry.metadata.len();
        for (position, (key, value)) in entry.metadata.iter().enumerate() {
            block.push_str("      ");
            block.push_str(&json_string(key));
            block.push_str(": ");
            block.push_str(&render_meta(value));
            if position + 1 < last {
                block.push(',');
            }
            block.push('\n');
        }
        block.push_str("    }");
        fields.push(block);
    }

    for (key, value) in &entry.extra {
        fields.push(format!("    {}: {}", json_string(key), render_value(value, 4)));
    }

    out.push_str("  {\n");
    out.push_str(&fields.join(",\n"));
    out.push_str("\n  }");
}

fn render_meta(value: &MetaValue) -> String {
    match value {
        MetaValue::Bool(value) => value.to_string(),
        MetaValue::Int(value) => value.to_string(),
        MetaValue::Float(value) => Value::from(*value).to_string(),
        MetaValue::Text(value) => json_string(value),
    }
}

/// Pretty-renders one preserved unknown value at the given indent depth.
fn render_value(value: &Value, indent: usize) -> String {
    match value {
        Value::Array(items) if items.is_empty() => "[]".to_string(),
        Value::Object(map) if map.is_empty() => "{}".to_string(),
        Value::Array(items) => {
            let inner = " ".repeat(indent + 2);
            let rendered: Vec<String> = items
                .iter()
                .map(|item| format!("{inner}{}", render_value(item, indent + 2)))
                .collect();
            format!("[\n{}\n{}]", rendered.join(",\n"), " ".repeat(indent))
        }
        Value::Object(map) => {
            let inner = " ".repeat(indent + 2);
            let rendered: Vec<String> = map
                .iter()
                .map(|(key, item)| {
                    format!("{inner}{}: {}", json_string(key), render_value(item, indent + 2))
                })
                .collect();
            format!("{{\n{}\n{}}}", rendered.join(",\n"), " ".repeat(indent))
        }
        scalar => scalar.to_string(),
    }
}

fn json_string(raw: &str) -> String {
    Value::String(raw.to_string()).to_string()
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn strip_position_suffix(mut message: String) -> String {
    if let Some(at) = message.rfind(" at line ") {
        message.truncate(at);
    }
    message
}
