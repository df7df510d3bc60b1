//! Ordered, id-unique record collections.

use crate::id::EntityId;
use crate::record::Record;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// An ordered sequence of records of one kind.
///
/// Insertion order is the default iteration order. Ids are unique; the
/// store checks this before pushing and `dedupe` restores it after loading
/// a hand-edited document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Collection<T> {
    records: Vec<T>,
}

impl<T> Default for Collection<T> {
    fn default() -> Self {
        Self {
            records: Vec::new(),
        }
    }
}

impl<T: Record> Collection<T> {
    /// Create an empty collection.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Iterate in insertion order.
    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.records.iter()
    }

    /// Borrow the records as a slice.
    pub fn as_slice(&self) -> &[T] {
        &self.records
    }

    /// Get a record by id.
    pub fn get(&self, id: &EntityId) -> Option<&T> {
        self.records.iter().find(|r| r.id() == id)
    }

    /// Get a mutable record by id.
    pub(crate) fn get_mut(&mut self, id: &EntityId) -> Option<&mut T> {
        self.records.iter_mut().find(|r| r.id() == id)
    }

    pub fn contains(&self, id: &EntityId) -> bool {
        self.get(id).is_some()
    }

    /// Append a record. The caller guarantees the id is unused.
    pub(crate) fn push(&mut self, record: T) {
        debug_assert!(!self.contains(record.id()));
        self.records.push(record);
    }

    /// Remove a record by id, keeping the order of the rest.
    pub(crate) fn remove(&mut self, id: &EntityId) -> Option<T> {
        let index = self.records.iter().position(|r| r.id() == id)?;
        Some(self.records.remove(index))
    }

    /// Keep only records matching `keep`. Returns how many were dropped.
    pub(crate) fn retain(&mut self, keep: impl FnMut(&T) -> bool) -> usize {
        let before = self.records.len();
        self.records.retain(keep);
        before - self.records.len()
    }

    /// Apply `f` to every record. Returns how many reported a change.
    pub(crate) fn update_each(&mut self, mut f: impl FnMut(&mut T) -> bool) -> usize {
        let mut changed = 0;
        for record in &mut self.records {
            if f(record) {
                changed += 1;
            }
        }
        changed
    }

    /// Drop records whose id already appeared earlier. Returns the dropped ids.
    pub(crate) fn dedupe(&mut self) -> Vec<EntityId> {
        let mut seen = HashSet::new();
        let mut dropped = Vec::new();
        self.records.retain(|r| {
            if seen.insert(r.id().clone()) {
                true
            } else {
                dropped.push(r.id().clone());
                false
            }
        });
        dropped
    }
}

impl<'a, T> IntoIterator for &'a Collection<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

impl<T: Record> FromIterator<T> for Collection<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut collection = Collection::new();
        collection.records.extend(iter);
        collection.dedupe();
        collection
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::Campaign;
    use chrono::NaiveDate;

    fn campaign(id: &str, name: &str) -> Campaign {
        let date = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
        Campaign {
            id: EntityId::from(id),
            name: name.to_string(),
            description: String::new(),
            created: Some(date),
            last_modified: Some(date),
        }
    }

    #[test]
    fn test_insertion_order_preserved_across_removal() {
        let mut collection: Collection<Campaign> = ["a", "b", "c"]
            .into_iter()
            .map(|id| campaign(id, id))
            .collect();
        collection.remove(&EntityId::from("b"));
        let ids: Vec<_> = collection.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "c"]);
    }

    #[test]
    fn test_remove_missing_is_none() {
        let mut collection: Collection<Campaign> = Collection::new();
        assert!(collection.remove(&EntityId::from("ghost")).is_none());
    }

    #[test]
    fn test_dedupe_keeps_first() {
        let mut collection = Collection {
            records: vec![
                campaign("c1", "First"),
                campaign("c2", "Second"),
                campaign("c1", "Duplicate"),
            ],
        };
        let dropped = collection.dedupe();
        assert_eq!(dropped, vec![EntityId::from("c1")]);
        assert_eq!(collection.len(), 2);
        assert_eq!(collection.get(&EntityId::from("c1")).unwrap().name, "First");
    }

    #[test]
    fn test_serializes_as_plain_array() {
        let collection: Collection<Campaign> = std::iter::once(campaign("c1", "Phandelver")).collect();
        let json = serde_json::to_value(&collection).unwrap();
        assert!(json.is_array());
        assert_eq!(json[0]["name"], "Phandelver");
    }
}
