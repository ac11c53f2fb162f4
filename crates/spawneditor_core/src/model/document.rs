//! Document aggregate.
//!
//! # Responsibility
//! - Own the ordered spawn entry collection of one open configuration.
//! - Track the dirty flag (committed edits since last save/load).
//!
//! # Invariants
//! - Iteration order equals insertion order and is stable across mutations of
//!   other entries.
//! - Entry ids are unique; the edit engine and the validator enforce it.
//! - All mutations flow through the edit engine; this type exposes no public
//!   mutators for entry content.

use crate::model::entry::{EntryId, Position, SpawnEntry};

/// Root aggregate for one open spawn configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    name: String,
    entries: Vec<SpawnEntry>,
    dirty: bool,
}

impl Document {
    /// Creates an empty, clean document.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entries: Vec::new(),
            dirty: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// True iff committed edits exist since the last save or load.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in stable insertion order.
    pub fn entries(&self) -> impl Iterator<Item = &SpawnEntry> {
        self.entries.iter()
    }

    pub fn contains(&self, id: &EntryId) -> bool {
        self.entries.iter().any(|entry| &entry.id == id)
    }

    pub fn get_entry(&self, id: &EntryId) -> Option<&SpawnEntry> {
        self.entries.iter().find(|entry| &entry.id == id)
    }

    /// First entry on exactly this tile.
    pub fn find_at(&self, position: Position) -> Option<&SpawnEntry> {
        self.entries.iter().find(|entry| entry.is_at(position))
    }

    /// Best entry for a tile pick: exact tile first, then same x/y column on
    /// any plane.
    pub fn find_best_at(&self, position: Position) -> Option<&SpawnEntry> {
        self.find_at(position).or_else(|| {
            self.entries
                .iter()
                .find(|entry| entry.position.matches_column(position))
        })
    }

    pub(crate) fn entry_mut(&mut self, id: &EntryId) -> Option<&mut SpawnEntry> {
        self.entries.iter_mut().find(|entry| &entry.id == id)
    }

    pub(crate) fn push_entry(&mut self, entry: SpawnEntry) {
        self.entries.push(entry);
    }

    pub(crate) fn insert_entry(&mut self, index: usize, entry: SpawnEntry) {
        let index = index.min(self.entries.len());
        self.entries.insert(index, entry);
    }

    /// Removes an entry by id, returning it together with its position in the
    /// insertion order.
    pub(crate) fn remove_entry(&mut self, id: &EntryId) -> Option<(usize, SpawnEntry)> {
        let index = self.entries.iter().position(|entry| &entry.id == id)?;
        Some((index, self.entries.remove(index)))
    }

    pub(crate) fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub(crate) fn mark_clean(&mut self) {
        self.dirty = false;
    }
}

#[cfg(test)]
mod tests {
    use super::Document;
    use crate::model::entry::{Position, SpawnEntry};

    #[test]
    fn new_document_is_clean_and_empty() {
        let document = Document::new("spawns.json");
        assert_eq!(document.name(), "spawns.json");
        assert!(!document.is_dirty());
        assert!(document.is_empty());
    }

    #[test]
    fn iteration_keeps_insertion_order() {
        let mut document = Document::new("spawns.json");
        let first = SpawnEntry::new("goblin", Position::new(1, 1, 0));
        let second = SpawnEntry::new("orc", Position::new(2, 2, 0));
        let third = SpawnEntry::new("troll", Position::new(3, 3, 0));
        document.push_entry(first.clone());
        document.push_entry(second.clone());
        document.push_entry(third.clone());

        let categories: Vec<&str> = document
            .entries()
            .map(|entry| entry.category.as_str())
            .collect();
        assert_eq!(categories, ["goblin", "orc", "troll"]);

        document.remove_entry(&second.id).unwrap();
        let categories: Vec<&str> = document
            .entries()
            .map(|entry| entry.category.as_str())
            .collect();
        assert_eq!(categories, ["goblin", "troll"]);
    }

    #[test]
    fn find_best_at_prefers_exact_tile_then_column() {
        let mut document = Document::new("spawns.json");
        let ground = SpawnEntry::new("chest", Position::new(5, 5, 0));
        let upstairs = SpawnEntry::new("guard", Position::new(5, 5, 1));
        document.push_entry(ground.clone());
        document.push_entry(upstairs.clone());

        let exact = document.find_best_at(Position::new(5, 5, 1)).unwrap();
        assert_eq!(exact.id, upstairs.id);

        let fallback = document.find_best_at(Position::new(5, 5, 2)).unwrap();
        assert_eq!(fallback.id, ground.id);

        assert!(document.find_best_at(Position::new(9, 9, 0)).is_none());
    }

    #[test]
    fn remove_returns_index_and_entry() {
        let mut document = Document::new("spawns.json");
        let a = SpawnEntry::new("a", Position::new(0, 0, 0));
        let b = SpawnEntry::new("b", Position::new(1, 0, 0));
        document.push_entry(a);
        document.push_entry(b.clone());

        let (index, removed) = document.remove_entry(&b.id).unwrap();
        assert_eq!(index, 1);
        assert_eq!(removed.category, "b");
        assert!(document.remove_entry(&b.id).is_none());
    }
}
