//! Testing utilities for the chronicle store.
//!
//! This module provides tools for integration testing:
//! - `TestHarness` wrapping a store over a `MemorySlot`
//! - Assertion helpers for verifying store contents

use crate::config::StoreConfig;
use crate::id::EntityId;
use crate::persist::{Document, MemorySlot};
use crate::store::{Store, Stored};
use crate::world::{CampaignDraft, CharacterDraft, LocationDraft};

/// Test harness holding a store and the slot it writes to.
pub struct TestHarness {
    /// The store under test.
    pub store: Store,
    /// Shared handle to the store's storage.
    pub slot: MemorySlot,
}

impl TestHarness {
    /// Create a harness loaded with the example dataset.
    pub fn new() -> Self {
        Self::open(MemorySlot::new(), StoreConfig::default())
    }

    /// Create a harness with one empty campaign selected.
    pub fn empty() -> Self {
        let mut harness = Self::open(MemorySlot::new(), StoreConfig::new().without_seed());
        let campaign = harness
            .store
            .create(CampaignDraft::new("Test Campaign"))
            .expect("campaign draft is valid");
        harness
            .store
            .select_scope(Some(&campaign.id))
            .expect("campaign was just created");
        harness
    }

    /// Create a harness whose storage already holds `contents`.
    pub fn with_contents(contents: impl Into<String>) -> Self {
        Self::open(MemorySlot::with_contents(contents), StoreConfig::default())
    }

    /// Create a harness over an existing slot.
    pub fn open(slot: MemorySlot, config: StoreConfig) -> Self {
        let store = Store::open(slot.clone(), config);
        Self { store, slot }
    }

    /// Open a second store from the same storage, as after a restart.
    pub fn reopen(&self) -> Store {
        Store::open(self.slot.clone(), self.store.config().clone())
    }

    /// The document as last written to storage.
    pub fn persisted(&self) -> Option<Document> {
        self.slot
            .contents()
            .and_then(|text| Document::parse(&text).ok())
    }

    /// The id of the selected campaign.
    pub fn scope(&self) -> EntityId {
        self.store
            .current_scope()
            .cloned()
            .expect("harness has a selected campaign")
    }

    /// Create a character in the current scope and return its id.
    pub fn add_character(&mut self, name: &str) -> EntityId {
        self.store
            .create(CharacterDraft::new(name))
            .expect("character draft is valid")
            .id
    }

    /// Create a location in the current scope and return its id.
    pub fn add_location(&mut self, name: &str, parent: Option<&EntityId>) -> EntityId {
        let mut draft = LocationDraft::new(name);
        draft.parent = parent.cloned();
        self.store
            .create(draft)
            .expect("location draft is valid")
            .id
    }

    /// Display names of the visible records of one kind, in order.
    pub fn names<T: Stored>(&self) -> Vec<String> {
        self.store
            .query::<T>()
            .iter()
            .map(|r| r.display_name().to_string())
            .collect()
    }

    /// Check if a record exists in any scope.
    pub fn has<T: Stored>(&self, id: &EntityId) -> bool {
        self.store.get::<T>(id).is_some()
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Assertion Helpers
// ============================================================================

/// Assert that a record exists.
#[track_caller]
pub fn assert_exists<T: Stored>(harness: &TestHarness, id: &str) {
    assert!(
        harness.has::<T>(&EntityId::from(id)),
        "Expected {id} to exist in {}",
        T::COLLECTION
    );
}

/// Assert that a record does NOT exist.
#[track_caller]
pub fn assert_missing<T: Stored>(harness: &TestHarness, id: &str) {
    assert!(
        !harness.has::<T>(&EntityId::from(id)),
        "Expected {id} to NOT exist in {}",
        T::COLLECTION
    );
}

/// Assert the number of visible records of one kind.
#[track_caller]
pub fn assert_count<T: Stored>(harness: &TestHarness, expected: usize) {
    let actual = harness.store.query::<T>().count();
    assert_eq!(
        actual,
        expected,
        "Expected {expected} {} in scope, got {actual}",
        T::COLLECTION
    );
}

/// Assert that storage holds exactly the in-memory document.
#[track_caller]
pub fn assert_persisted(harness: &TestHarness) {
    assert_eq!(
        harness.persisted().as_ref(),
        Some(harness.store.document()),
        "Expected storage to match the in-memory document"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::{Character, Location};

    #[test]
    fn test_harness_seeded() {
        let harness = TestHarness::new();
        assert_eq!(
            harness.names::<Character>(),
            vec!["Gundren Rockseeker", "Sildar Hallwinter"]
        );
        assert_exists::<Location>(&harness, "location_3");
        assert_persisted(&harness);
    }

    #[test]
    fn test_harness_empty() {
        let mut harness = TestHarness::empty();
        assert_count::<Character>(&harness, 0);

        let id = harness.add_character("Toblen");
        assert_exists::<Character>(&harness, id.as_str());
        assert_count::<Character>(&harness, 1);
        assert_persisted(&harness);
    }

    #[test]
    fn test_reopen_sees_writes() {
        let mut harness = TestHarness::new();
        let id = harness.add_character("Halia Thornton");
        let reopened = harness.reopen();
        assert!(reopened.get::<Character>(&id).is_some());
    }
}
