//! Spawn schema rules and document validation.
//!
//! # Responsibility
//! - Describe what a conformant spawn document looks like (`SchemaConfig`).
//! - Check a document against those rules without mutating it.
//!
//! # Invariants
//! - `validate` is pure: no side effects, never fails on malformed data.
//! - Violations are reported in a deterministic order: entry order first,
//!   then field order within the entry.

use crate::model::{Direction, Document, EntryId, MetaValue, DIRECTION_KEY};
use regex::Regex;
use serde::Serialize;
use std::collections::{BTreeSet, HashSet};
use std::fmt::{Display, Formatter};

/// Inclusive bounds for one coordinate axis. Default: unconstrained.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AxisBounds {
    pub min: Option<i32>,
    pub max: Option<i32>,
}

impl AxisBounds {
    pub fn closed(min: i32, max: i32) -> Self {
        Self {
            min: Some(min),
            max: Some(max),
        }
    }

    pub fn contains(&self, value: i32) -> bool {
        self.min.map_or(true, |min| value >= min) && self.max.map_or(true, |max| value <= max)
    }

    fn describe(&self) -> String {
        let min = self.min.map_or("-inf".to_string(), |v| v.to_string());
        let max = self.max.map_or("+inf".to_string(), |v| v.to_string());
        format!("[{min}, {max}]")
    }
}

/// Per-axis coordinate bounds for entry positions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PositionBounds {
    pub x: AxisBounds,
    pub y: AxisBounds,
    pub z: AxisBounds,
}

/// Category conformance rule. Default: any non-empty string.
#[derive(Debug, Clone, Default)]
pub struct CategoryRule {
    /// When set, categories must be members of this set.
    pub allowed: Option<BTreeSet<String>>,
    /// When set, categories must match this pattern.
    pub pattern: Option<Regex>,
}

impl CategoryRule {
    /// Restricts categories to an explicit allowed set.
    pub fn allowing<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            allowed: Some(values.into_iter().map(Into::into).collect()),
            pattern: None,
        }
    }

    /// Restricts categories to a regular-expression pattern.
    pub fn with_pattern(pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            allowed: None,
            pattern: Some(Regex::new(pattern)?),
        })
    }
}

/// Document conformance rules, tunable per deployment.
#[derive(Debug, Clone, Default)]
pub struct SchemaConfig {
    pub bounds: PositionBounds,
    pub categories: CategoryRule,
}

/// One schema violation, addressed to an entry field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Violation {
    pub entry_id: EntryId,
    pub field: String,
    pub reason: String,
}

impl Violation {
    fn new(entry_id: &EntryId, field: &str, reason: impl Into<String>) -> Self {
        Self {
            entry_id: entry_id.clone(),
            field: field.to_string(),
            reason: reason.into(),
        }
    }
}

impl Display for Violation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "entry `{}` field `{}`: {}",
            self.entry_id, self.field, self.reason
        )
    }
}

/// Outcome of one validation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    violations: Vec<Violation>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.violations.is_empty()
    }

    pub fn violations(&self) -> &[Violation] {
        &self.violations
    }

    pub fn into_violations(self) -> Vec<Violation> {
        self.violations
    }
}

impl Display for ValidationReport {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if self.violations.is_empty() {
            return f.write_str("document is valid");
        }
        write!(f, "{} violation(s)", self.violations.len())?;
        for violation in &self.violations {
            write!(f, "; {violation}")?;
        }
        Ok(())
    }
}

/// Checks one document against the configured schema rules.
pub fn validate(document: &Document, config: &SchemaConfig) -> ValidationReport {
    let mut violations = Vec::new();
    let mut seen_ids: HashSet<&EntryId> = HashSet::new();

    for entry in document.entries() {
        if entry.id.is_empty() {
            violations.push(Violation::new(&entry.id, "id", "entry id is empty"));
        } else if !seen_ids.insert(&entry.id) {
            violations.push(Violation::new(&entry.id, "id", "duplicate entry id"));
        }

        check_category(&entry.id, &entry.category, &config.categories, &mut violations);

        check_axis(&entry.id, "tile.x", entry.position.x, config.bounds.x, &mut violations);
        check_axis(&entry.id, "tile.y", entry.position.y, config.bounds.y, &mut violations);
        check_axis(&entry.id, "tile.z", entry.position.z, config.bounds.z, &mut violations);

        if let Some(value) = entry.metadata_value(DIRECTION_KEY) {
            check_direction(&entry.id, value, &mut violations);
        }
    }

    ValidationReport { violations }
}

fn check_category(
    id: &EntryId,
    category: &str,
    rule: &CategoryRule,
    violations: &mut Vec<Violation>,
) {
    if category.trim().is_empty() {
        violations.push(Violation::new(id, "category", "category is empty"));
        return;
    }

    if let Some(allowed) = &rule.allowed {
        if !allowed.contains(category) {
            violations.push(Violation::new(
                id,
                "category",
                format!("category `{category}` is not in the allowed set"),
            ));
        }
    }

    if let Some(pattern) = &rule.pattern {
        if !pattern.is_match(category) {
            violations.push(Violation::new(
                id,
                "category",
                format!("category `{category}` does not match pattern `{pattern}`"),
            ));
        }
    }
}

fn check_axis(
    id: &EntryId,
    field: &str,
    value: i32,
    bounds: AxisBounds,
    violations: &mut Vec<Violation>,
) {
    if !bounds.contains(value) {
        violations.push(Violation::new(
            id,
            field,
            format!("{value} is outside bounds {}", bounds.describe()),
        ));
    }
}

fn check_direction(id: &EntryId, value: &MetaValue, violations: &mut Vec<Violation>) {
    let field = format!("metadata.{DIRECTION_KEY}");
    match value.as_text() {
        Some(label) => {
            if Direction::parse_label(label).is_none() {
                violations.push(Violation::new(
                    id,
                    &field,
                    format!("`{label}` is not a recognized facing"),
                ));
            }
        }
        None => violations.push(Violation::new(
            id,
            &field,
            format!("facing must be a string, got a {}", value.type_name()),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::{validate, AxisBounds, CategoryRule, PositionBounds, SchemaConfig};
    use crate::model::{Document, EntryId, MetaValue, Position, SpawnEntry};

    fn document_with(entries: Vec<SpawnEntry>) -> Document {
        let mut document = Document::new("spawns.json");
        for entry in entries {
            document.push_entry(entry);
        }
        document
    }

    fn entry(id: &str, category: &str, position: Position) -> SpawnEntry {
        SpawnEntry::with_id(EntryId::from(id), category, position)
    }

    #[test]
    fn default_config_accepts_any_non_empty_category() {
        let document = document_with(vec![
            entry("a", "goblin", Position::new(1, 2, 0)),
            entry("b", "weird name with spaces", Position::new(-4, 9, 3)),
        ]);
        let report = validate(&document, &SchemaConfig::default());
        assert!(report.is_valid(), "unexpected: {report}");
    }

    #[test]
    fn empty_category_and_empty_id_are_rejected() {
        let document = document_with(vec![entry("", "  ", Position::new(0, 0, 0))]);
        let report = validate(&document, &SchemaConfig::default());
        let fields: Vec<&str> = report
            .violations()
            .iter()
            .map(|v| v.field.as_str())
            .collect();
        assert_eq!(fields, ["id", "category"]);
    }

    #[test]
    fn duplicate_ids_are_reported_once_per_repeat() {
        let document = document_with(vec![
            entry("a", "goblin", Position::new(1, 1, 0)),
            entry("a", "orc", Position::new(2, 2, 0)),
            entry("a", "troll", Position::new(3, 3, 0)),
        ]);
        let report = validate(&document, &SchemaConfig::default());
        assert_eq!(report.violations().len(), 2);
        assert!(report
            .violations()
            .iter()
            .all(|v| v.reason == "duplicate entry id"));
    }

    #[test]
    fn coordinate_bounds_are_checked_per_axis() {
        let config = SchemaConfig {
            bounds: PositionBounds {
                x: AxisBounds::closed(0, 4095),
                y: AxisBounds::closed(0, 4095),
                z: AxisBounds::closed(0, 3),
            },
            ..SchemaConfig::default()
        };

        let document = document_with(vec![entry("a", "goblin", Position::new(-1, 99, 7))]);
        let report = validate(&document, &config);
        let fields: Vec<&str> = report
            .violations()
            .iter()
            .map(|v| v.field.as_str())
            .collect();
        assert_eq!(fields, ["tile.x", "tile.z"]);
    }

    #[test]
    fn allowed_set_and_pattern_restrict_categories() {
        let allowed = SchemaConfig {
            categories: CategoryRule::allowing(["goblin", "orc"]),
            ..SchemaConfig::default()
        };
        let document = document_with(vec![entry("a", "troll", Position::new(0, 0, 0))]);
        let report = validate(&document, &allowed);
        assert_eq!(report.violations().len(), 1);
        assert!(report.violations()[0].reason.contains("allowed set"));

        let patterned = SchemaConfig {
            categories: CategoryRule::with_pattern("^[a-z_]+$").unwrap(),
            ..SchemaConfig::default()
        };
        let document = document_with(vec![entry("a", "Goblin King", Position::new(0, 0, 0))]);
        let report = validate(&document, &patterned);
        assert_eq!(report.violations().len(), 1);
        assert!(report.violations()[0].reason.contains("pattern"));
    }

    #[test]
    fn direction_metadata_must_be_a_known_facing() {
        let mut bad_label = entry("a", "goblin", Position::new(0, 0, 0));
        bad_label
            .metadata
            .insert("direction".to_string(), MetaValue::from("upward"));
        let mut bad_type = entry("b", "goblin", Position::new(0, 0, 0));
        bad_type
            .metadata
            .insert("direction".to_string(), MetaValue::Int(4));
        let mut good = entry("c", "goblin", Position::new(0, 0, 0));
        good.metadata
            .insert("direction".to_string(), MetaValue::from("north-east"));

        let document = document_with(vec![bad_label, bad_type, good]);
        let report = validate(&document, &SchemaConfig::default());
        assert_eq!(report.violations().len(), 2);
        assert!(report.violations()[0].reason.contains("recognized facing"));
        assert!(report.violations()[1].reason.contains("must be a string"));
    }
}
