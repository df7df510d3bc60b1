//! The normalized store.
//!
//! A `Store` owns one `Document` (all collections plus the selected
//! campaign), mints ids, applies the cascade table on removal and writes the
//! whole document to its storage slot after every mutation.

use crate::cascade::{CascadeAction, CascadeTable};
use crate::collection::Collection;
use crate::config::StoreConfig;
use crate::error::{PersistError, StoreError};
use crate::id::{EntityId, IdMinter};
use crate::persist::{Document, FileSlot, StorageSlot};
use crate::record::{CollectionName, Draft, EntityRef, Patch, Record};
use crate::relationship::{Relationship, RelationshipKind};
use crate::seed::seed_document;
use crate::view::{build_forest, Forest, Query};
use crate::world::{Campaign, Character, Item, Location, Note};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

/// Records the store keeps in a `Document` collection.
pub trait Stored: Record {
    fn collection(doc: &Document) -> &Collection<Self>;
    fn collection_mut(doc: &mut Document) -> &mut Collection<Self>;
    fn entity_ref(&self) -> EntityRef<'_>;
}

macro_rules! stored {
    ($($ty:ty => $field:ident, $variant:ident;)*) => {
        $(
            impl Stored for $ty {
                fn collection(doc: &Document) -> &Collection<Self> {
                    &doc.$field
                }

                fn collection_mut(doc: &mut Document) -> &mut Collection<Self> {
                    &mut doc.$field
                }

                fn entity_ref(&self) -> EntityRef<'_> {
                    EntityRef::$variant(self)
                }
            }
        )*
    };
}

stored! {
    Campaign => campaigns, Campaign;
    Character => characters, Character;
    Location => locations, Location;
    Item => items, Item;
    Note => notes, Note;
    Relationship => relationships, Relationship;
}

/// Collection operations the cascade table needs without knowing the type.
trait DynCollection {
    fn find(&self, id: &EntityId) -> Option<EntityRef<'_>>;
    fn count_referencing(&self, field: &str, target: &EntityId) -> usize;
    fn remove_referencing(&mut self, field: &str, target: &EntityId) -> usize;
    fn clear_references(&mut self, field: &str, target: &EntityId) -> usize;
}

impl<T: Stored> DynCollection for Collection<T> {
    fn find(&self, id: &EntityId) -> Option<EntityRef<'_>> {
        self.get(id).map(|r| r.entity_ref())
    }

    fn count_referencing(&self, field: &str, target: &EntityId) -> usize {
        self.iter()
            .filter(|r| r.references_id(field, target))
            .count()
    }

    fn remove_referencing(&mut self, field: &str, target: &EntityId) -> usize {
        self.retain(|r| !r.references_id(field, target))
    }

    fn clear_references(&mut self, field: &str, target: &EntityId) -> usize {
        self.update_each(|r| r.clear_reference(field, target))
    }
}

fn dyn_collection(data: &Document, name: CollectionName) -> &dyn DynCollection {
    match name {
        CollectionName::Campaigns => &data.campaigns,
        CollectionName::Characters => &data.characters,
        CollectionName::Locations => &data.locations,
        CollectionName::Items => &data.items,
        CollectionName::Notes => &data.notes,
        CollectionName::Relationships => &data.relationships,
    }
}

fn dyn_collection_mut(data: &mut Document, name: CollectionName) -> &mut dyn DynCollection {
    match name {
        CollectionName::Campaigns => &mut data.campaigns,
        CollectionName::Characters => &mut data.characters,
        CollectionName::Locations => &mut data.locations,
        CollectionName::Items => &mut data.items,
        CollectionName::Notes => &mut data.notes,
        CollectionName::Relationships => &mut data.relationships,
    }
}

/// Order in which `resolve_reference` searches collections.
const RESOLVE_ORDER: [CollectionName; 6] = [
    CollectionName::Characters,
    CollectionName::Locations,
    CollectionName::Items,
    CollectionName::Notes,
    CollectionName::Relationships,
    CollectionName::Campaigns,
];

/// How the store's contents were obtained at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    /// Read from storage.
    Loaded,
    /// Storage was empty; the example dataset was loaded.
    Seeded,
    /// Storage was empty and seeding is disabled.
    Empty,
    /// Storage could not be read or parsed and was replaced.
    Recovered { reason: String },
}

/// Record counts within the current scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct ScopeStats {
    pub characters: usize,
    pub locations: usize,
    pub items: usize,
    pub notes: usize,
    pub relationships: usize,
}

/// Kind of entry in the activity feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityKind {
    Note,
    Character,
}

/// One entry in the activity feed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Activity {
    pub kind: ActivityKind,
    pub id: EntityId,
    pub title: String,
    /// Only notes carry a time.
    pub at: Option<DateTime<Utc>>,
}

/// Notes and characters contributing to the activity feed.
const ACTIVITY_PER_KIND: usize = 3;

/// The normalized store.
pub struct Store {
    data: Document,
    slot: Box<dyn StorageSlot>,
    config: StoreConfig,
    cascades: CascadeTable,
    minter: IdMinter,
    last_write_error: Option<PersistError>,
    load_outcome: LoadOutcome,
}

impl Store {
    /// Open a store backed by `slot`.
    ///
    /// An empty slot is seeded (unless disabled). Unreadable contents are
    /// backed up through the slot, then replaced by the fallback dataset.
    /// Opening never fails; write problems show up in `last_write_error`.
    pub fn open(slot: impl StorageSlot + 'static, config: StoreConfig) -> Self {
        let mut slot: Box<dyn StorageSlot> = Box::new(slot);
        let fallback = |config: &StoreConfig| {
            if config.seed_on_empty {
                (seed_document(), LoadOutcome::Seeded)
            } else {
                (Document::default(), LoadOutcome::Empty)
            }
        };

        let (data, outcome) = match slot.read() {
            Ok(Some(text)) => match Document::parse(&text) {
                Ok(doc) => (doc, LoadOutcome::Loaded),
                Err(e) => {
                    warn!(slot = %slot.describe(), error = %e, "Stored document is unreadable, starting over");
                    if let Err(backup_err) = slot.backup(&text) {
                        warn!(error = %backup_err, "Failed to back up unreadable document");
                    }
                    let (doc, _) = fallback(&config);
                    (doc, LoadOutcome::Recovered { reason: e.to_string() })
                }
            },
            Ok(None) => fallback(&config),
            Err(e) => {
                warn!(slot = %slot.describe(), error = %e, "Failed to read stored document, starting over");
                let (doc, _) = fallback(&config);
                (doc, LoadOutcome::Recovered { reason: e.to_string() })
            }
        };

        info!(
            slot = %slot.describe(),
            outcome = ?outcome,
            campaigns = data.campaigns.len(),
            "Opened store"
        );

        let mut store = Self::assemble(data, slot, config, outcome);
        if store.load_outcome != LoadOutcome::Loaded {
            store.persist();
        }
        store
    }

    /// Open the JSON file named by `config.data_path`.
    pub fn open_file(config: StoreConfig) -> Self {
        let slot = FileSlot::new(config.data_path.clone());
        Self::open(slot, config)
    }

    /// Wrap an existing document without reading or writing `slot`.
    pub fn with_document(data: Document, slot: impl StorageSlot + 'static, config: StoreConfig) -> Self {
        Self::assemble(data, Box::new(slot), config, LoadOutcome::Loaded)
    }

    fn assemble(
        data: Document,
        slot: Box<dyn StorageSlot>,
        config: StoreConfig,
        load_outcome: LoadOutcome,
    ) -> Self {
        Self {
            data,
            slot,
            minter: IdMinter::new(config.id_scheme),
            config,
            cascades: CascadeTable::default(),
            last_write_error: None,
            load_outcome,
        }
    }

    /// Replace the cascade table.
    pub fn with_cascades(mut self, cascades: CascadeTable) -> Self {
        self.cascades = cascades;
        self
    }

    pub fn cascades(&self) -> &CascadeTable {
        &self.cascades
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub fn load_outcome(&self) -> &LoadOutcome {
        &self.load_outcome
    }

    /// The full document, across all scopes.
    pub fn document(&self) -> &Document {
        &self.data
    }

    // ========================================================================
    // Mutations
    // ========================================================================

    /// Create a record from `draft` and return it with its new id.
    ///
    /// Scoped drafts without a campaign are placed in the current scope.
    pub fn create<D>(&mut self, mut draft: D) -> Result<D::Record, StoreError>
    where
        D: Draft,
        D::Record: Stored,
    {
        if D::Record::SCOPED && draft.scope().is_none() {
            if let Some(scope) = &self.data.current_campaign {
                draft.set_scope(scope.clone());
            }
        }
        let scope = draft.scope().cloned();
        draft.prepare(&self.data, scope.as_ref());

        let existing = D::Record::collection(&self.data);
        let id = self
            .minter
            .mint(D::Record::ID_PREFIX, |id| existing.contains(id));
        let record = draft.build(id, Utc::now())?;

        D::Record::collection_mut(&mut self.data).push(record.clone());
        debug!(collection = %D::Record::COLLECTION, id = %record.id(), "Created record");
        self.persist();
        Ok(record)
    }

    /// Merge `patch` into the record with `id` and return the result.
    ///
    /// On a validation error the record is left unchanged.
    pub fn update<P>(&mut self, id: &EntityId, mut patch: P) -> Result<P::Record, StoreError>
    where
        P: Patch,
        P::Record: Stored,
    {
        let current = P::Record::collection(&self.data)
            .get(id)
            .ok_or_else(|| StoreError::NotFound {
                collection: P::Record::COLLECTION,
                id: id.clone(),
            })?;
        patch.prepare(&self.data, current);
        let mut updated = current.clone();
        patch.apply(&mut updated, Utc::now())?;

        if let Some(slot) = P::Record::collection_mut(&mut self.data).get_mut(id) {
            *slot = updated.clone();
        }
        debug!(collection = %P::Record::COLLECTION, id = %id, "Updated record");
        self.persist();
        Ok(updated)
    }

    /// Remove the record with `id`, applying the cascade table.
    ///
    /// Returns the removed record, or `None` (without writing) when no such
    /// record exists.
    pub fn remove<T: Stored>(&mut self, id: &EntityId) -> Result<Option<T>, StoreError> {
        if !T::collection(&self.data).contains(id) {
            return Ok(None);
        }

        for rule in self.cascades.rules_for(T::COLLECTION) {
            if rule.action == CascadeAction::Reject
                && dyn_collection(&self.data, rule.child).count_referencing(rule.field, id) > 0
            {
                return Err(StoreError::Referenced {
                    collection: T::COLLECTION,
                    id: id.clone(),
                    child: rule.child,
                    field: rule.field,
                });
            }
        }

        let removed = T::collection_mut(&mut self.data).remove(id);

        for rule in self.cascades.rules_for(T::COLLECTION) {
            let child = dyn_collection_mut(&mut self.data, rule.child);
            let affected = match rule.action {
                CascadeAction::Delete => child.remove_referencing(rule.field, id),
                CascadeAction::Nullify => child.clear_references(rule.field, id),
                CascadeAction::Reject => 0,
            };
            if affected > 0 {
                debug!(
                    child = %rule.child,
                    field = rule.field,
                    action = ?rule.action,
                    affected,
                    "Applied cascade"
                );
            }
        }

        if self.data.current_campaign.as_ref() == Some(id) && T::COLLECTION == CollectionName::Campaigns {
            self.data.current_campaign = None;
        }

        debug!(collection = %T::COLLECTION, id = %id, "Removed record");
        self.persist();
        Ok(removed)
    }

    /// Remove a campaign and every record scoped to it.
    pub fn remove_campaign(&mut self, id: &EntityId) -> Result<Option<Campaign>, StoreError> {
        self.remove::<Campaign>(id)
    }

    /// Select the campaign every scoped view is filtered by.
    pub fn select_scope(&mut self, scope: Option<&EntityId>) -> Result<(), StoreError> {
        if let Some(id) = scope {
            if !self.data.campaigns.contains(id) {
                return Err(StoreError::NotFound {
                    collection: CollectionName::Campaigns,
                    id: id.clone(),
                });
            }
        }
        self.data.current_campaign = scope.cloned();
        info!(scope = ?self.data.current_campaign, "Selected campaign");
        self.persist();
        Ok(())
    }

    // ========================================================================
    // Persistence
    // ========================================================================

    fn write_document(&mut self) -> Result<(), PersistError> {
        let text = self.data.to_json()?;
        self.slot.write(&text)
    }

    fn persist(&mut self) {
        match self.write_document() {
            Ok(()) => self.last_write_error = None,
            Err(e) => {
                warn!(slot = %self.slot.describe(), error = %e, "Failed to save; changes may not be saved");
                self.last_write_error = Some(e);
            }
        }
    }

    /// The most recent write failure, cleared by the next successful write.
    pub fn last_write_error(&self) -> Option<&PersistError> {
        self.last_write_error.as_ref()
    }

    /// Write the document now, handing any failure to the caller.
    pub fn flush(&mut self) -> Result<(), StoreError> {
        self.persist();
        match self.last_write_error.take() {
            Some(e) => Err(e.into()),
            None => Ok(()),
        }
    }

    /// The document as pretty-printed JSON.
    pub fn export_json(&self) -> Result<String, StoreError> {
        Ok(self.data.to_json()?)
    }

    // ========================================================================
    // Lookups and views
    // ========================================================================

    /// Query one collection within the current scope.
    pub fn query<T: Stored>(&self) -> Query<'_, T> {
        Query::new(
            T::collection(&self.data).as_slice(),
            self.data.current_campaign.as_ref(),
        )
    }

    /// Look up a record by id, in any scope.
    pub fn get<T: Stored>(&self, id: &EntityId) -> Option<&T> {
        T::collection(&self.data).get(id)
    }

    /// Find a record of any kind by id.
    pub fn resolve_reference(&self, id: &EntityId) -> Option<EntityRef<'_>> {
        RESOLVE_ORDER
            .iter()
            .find_map(|name| dyn_collection(&self.data, *name).find(id))
    }

    /// Label for a reference, or the fallback label when it dangles.
    pub fn display_name(&self, id: &EntityId) -> &str {
        self.resolve_reference(id)
            .map(|r| r.display_name())
            .unwrap_or(self.config.fallback_label.as_str())
    }

    pub fn current_scope(&self) -> Option<&EntityId> {
        self.data.current_campaign.as_ref()
    }

    /// The selected campaign, if it still exists.
    pub fn current_campaign(&self) -> Option<&Campaign> {
        self.current_scope().and_then(|id| self.data.campaigns.get(id))
    }

    /// Record counts within the current scope.
    pub fn stats(&self) -> ScopeStats {
        ScopeStats {
            characters: self.query::<Character>().count(),
            locations: self.query::<Location>().count(),
            items: self.query::<Item>().count(),
            notes: self.query::<Note>().count(),
            relationships: self.query::<Relationship>().count(),
        }
    }

    /// Notes in the current scope, newest first.
    pub fn recent_notes(&self, limit: usize) -> Vec<&Note> {
        self.query::<Note>().newest_first().iter().take(limit).collect()
    }

    /// The dashboard feed: the newest notes, then the latest characters.
    pub fn recent_activity(&self, limit: usize) -> Vec<Activity> {
        let notes = self.recent_notes(ACTIVITY_PER_KIND).into_iter().map(|n| Activity {
            kind: ActivityKind::Note,
            id: n.id.clone(),
            title: format!("Note added: {}", n.title),
            at: Some(n.timestamp),
        });

        let characters = self.query::<Character>().to_vec();
        let skip = characters.len().saturating_sub(ACTIVITY_PER_KIND);
        let characters = characters.into_iter().skip(skip).map(|c| Activity {
            kind: ActivityKind::Character,
            id: c.id.clone(),
            title: format!("Character added: {}", c.name),
            at: None,
        });

        notes.chain(characters).take(limit).collect()
    }

    /// Ids of in-scope characters, locations and items named in `text`.
    pub fn link_entities(&self, text: &str) -> Vec<EntityId> {
        self.data.link_entities(self.current_scope(), text)
    }

    /// Direct children of a location, found by scanning.
    pub fn children_of(&self, id: &EntityId) -> Vec<&Location> {
        let parent = id.clone();
        self.query::<Location>()
            .filter(move |l| l.parent.as_ref() == Some(&parent))
            .to_vec()
    }

    /// The location hierarchy of the current scope.
    ///
    /// With a search, only matching locations are placed; a match whose
    /// parent did not match becomes a root.
    pub fn location_tree(&self, search: &str) -> Forest<'_, Location> {
        let locations = self.query::<Location>().search(search).to_vec();
        build_forest(&locations, |l| l.parent.as_ref())
    }

    /// Relationships in the current scope with `id` at either end.
    pub fn relationships_of(&self, id: &EntityId) -> Vec<&Relationship> {
        let id = id.clone();
        self.query::<Relationship>()
            .filter(move |r| r.involves(&id))
            .to_vec()
    }

    /// The catalogue of relationship kinds.
    pub fn relationship_types() -> &'static [RelationshipKind] {
        &RelationshipKind::ALL
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cascade::CascadeRule;
    use crate::persist::MemorySlot;
    use crate::relationship::RelationshipDraft;
    use crate::world::{CharacterDraft, CharacterPatch, ItemDraft, LocationDraft, NoteDraft};

    fn seeded() -> (Store, MemorySlot) {
        let slot = MemorySlot::new();
        let store = Store::open(slot.clone(), StoreConfig::default());
        (store, slot)
    }

    fn id(s: &str) -> EntityId {
        EntityId::from(s)
    }

    #[test]
    fn test_open_empty_slot_seeds_and_persists() {
        let (store, slot) = seeded();
        assert_eq!(store.load_outcome(), &LoadOutcome::Seeded);
        assert_eq!(store.current_scope(), Some(&id("campaign_1")));
        assert_eq!(slot.write_count(), 1);
    }

    #[test]
    fn test_create_applies_current_scope() {
        let (mut store, _slot) = seeded();
        let character = store.create(CharacterDraft::new("Toblen Stonehill")).unwrap();
        assert_eq!(character.campaign_id, id("campaign_1"));
        assert!(character.id.as_str().starts_with("char_"));
        assert!(store.get::<Character>(&character.id).is_some());
    }

    #[test]
    fn test_create_without_scope_fails_validation() {
        let slot = MemorySlot::new();
        let mut store = Store::open(slot, StoreConfig::new().without_seed());
        let err = store.create(CharacterDraft::new("Nobody")).unwrap_err();
        assert!(matches!(err, StoreError::Validation { field: "campaignId", .. }));
        assert!(store.document().characters.is_empty());
    }

    #[test]
    fn test_update_missing_is_not_found() {
        let (mut store, _slot) = seeded();
        let err = store
            .update(&id("char_404"), CharacterPatch::default())
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
    }

    #[test]
    fn test_failed_update_leaves_record_untouched() {
        let (mut store, _slot) = seeded();
        let before = store.get::<Character>(&id("char_1")).cloned();
        let err = store
            .update(
                &id("char_1"),
                CharacterPatch {
                    class: Some("Wizard".to_string()),
                    name: Some(String::new()),
                    ..Default::default()
                },
            )
            .unwrap_err();
        assert!(matches!(err, StoreError::Validation { field: "name", .. }));
        assert_eq!(store.get::<Character>(&id("char_1")).cloned(), before);
    }

    #[test]
    fn test_remove_character_cascades() {
        let (mut store, _slot) = seeded();
        let removed = store.remove::<Character>(&id("char_1")).unwrap();
        assert!(removed.is_some());

        // Both seeded relationships start at char_1
        assert!(store.document().relationships.is_empty());
        let map = store.get::<Item>(&id("item_1")).unwrap();
        assert_eq!(map.owner, None);
        let note = store.get::<Note>(&id("note_1")).unwrap();
        assert!(!note.linked_entities.contains(&id("char_1")));
        assert!(note.linked_entities.contains(&id("char_2")));
    }

    #[test]
    fn test_remove_location_nullifies_children() {
        let (mut store, _slot) = seeded();
        store.remove::<Location>(&id("location_1")).unwrap();

        assert_eq!(store.get::<Location>(&id("location_3")).unwrap().parent, None);
        assert_eq!(store.get::<Character>(&id("char_2")).unwrap().location, None);
        assert_eq!(store.get::<Item>(&id("item_1")).unwrap().location, None);
        // rel_2 pointed at the location, rel_1 did not
        assert!(store.get::<Relationship>(&id("rel_1")).is_some());
        assert!(store.get::<Relationship>(&id("rel_2")).is_none());
    }

    #[test]
    fn test_remove_missing_is_noop() {
        let (mut store, slot) = seeded();
        let writes = slot.write_count();
        assert!(store.remove::<Item>(&id("item_404")).unwrap().is_none());
        assert_eq!(slot.write_count(), writes);
    }

    #[test]
    fn test_reject_rule_blocks_removal() {
        let (store, _slot) = seeded();
        let mut store = store.with_cascades(CascadeTable::default().with_rule(CascadeRule::new(
            CollectionName::Characters,
            CollectionName::Items,
            "owner",
            CascadeAction::Reject,
        )));

        let err = store.remove::<Character>(&id("char_1")).unwrap_err();
        assert!(matches!(
            err,
            StoreError::Referenced {
                child: CollectionName::Items,
                ..
            }
        ));
        assert_eq!(err.kind(), crate::error::ErrorKind::Validation);
        // Nothing was touched
        assert!(store.get::<Character>(&id("char_1")).is_some());
        assert_eq!(store.document().relationships.len(), 2);
    }

    #[test]
    fn test_remove_campaign_clears_scope() {
        let (mut store, _slot) = seeded();
        store.remove_campaign(&id("campaign_1")).unwrap();

        let doc = store.document();
        assert!(doc.campaigns.is_empty());
        assert!(doc.characters.is_empty());
        assert!(doc.locations.is_empty());
        assert!(doc.items.is_empty());
        assert!(doc.notes.is_empty());
        assert!(doc.relationships.is_empty());
        assert_eq!(store.current_scope(), None);
    }

    #[test]
    fn test_select_unknown_scope() {
        let (mut store, _slot) = seeded();
        let err = store.select_scope(Some(&id("campaign_9"))).unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
        assert_eq!(store.current_scope(), Some(&id("campaign_1")));

        store.select_scope(None).unwrap();
        assert_eq!(store.stats(), ScopeStats::default());
    }

    #[test]
    fn test_resolve_and_display_name() {
        let (store, _slot) = seeded();
        assert_eq!(store.display_name(&id("char_2")), "Sildar Hallwinter");
        assert_eq!(store.display_name(&id("location_1")), "Neverwinter");
        assert_eq!(store.display_name(&id("campaign_1")), "The Lost Mines of Phandelver");
        assert_eq!(store.display_name(&id("ghost")), "Unknown");
        assert_eq!(store.display_name(&id("rel_2")), "Located In");
        assert!(matches!(
            store.resolve_reference(&id("item_1")),
            Some(EntityRef::Item(_))
        ));
    }

    #[test]
    fn test_stats() {
        let (store, _slot) = seeded();
        assert_eq!(
            store.stats(),
            ScopeStats {
                characters: 2,
                locations: 3,
                items: 1,
                notes: 1,
                relationships: 2,
            }
        );
    }

    #[test]
    fn test_note_links_from_content() {
        let (mut store, _slot) = seeded();
        let note = store
            .create(NoteDraft::new("Session 2", "Gundren's Map was stolen near Neverwinter"))
            .unwrap();
        assert_eq!(note.linked_entities, vec![id("location_1"), id("item_1")]);

        let explicit = store
            .create(NoteDraft::new("Aside", "Neverwinter").with_links(vec![id("char_2")]))
            .unwrap();
        assert_eq!(explicit.linked_entities, vec![id("char_2")]);
    }

    #[test]
    fn test_recent_activity() {
        let (mut store, _slot) = seeded();
        for name in ["Toblen", "Daran", "Qelline"] {
            store.create(CharacterDraft::new(name)).unwrap();
        }
        let feed = store.recent_activity(5);
        let titles: Vec<_> = feed.iter().map(|a| a.title.as_str()).collect();
        assert_eq!(
            titles,
            vec![
                "Note added: Session 1 - The Journey Begins",
                "Character added: Toblen",
                "Character added: Daran",
                "Character added: Qelline",
            ]
        );
        assert_eq!(store.recent_activity(2).len(), 2);
    }

    #[test]
    fn test_children_and_tree() {
        let (mut store, _slot) = seeded();
        let dock = store
            .create(LocationDraft::new("Dock Ward").with_parent("location_1"))
            .unwrap();
        let children: Vec<_> = store
            .children_of(&id("location_1"))
            .into_iter()
            .map(|l| l.id.clone())
            .collect();
        assert_eq!(children, vec![id("location_3"), dock.id]);

        let tree = store.location_tree("");
        assert_eq!(tree.roots.len(), 1);
        assert_eq!(tree.len(), 4);

        let filtered = store.location_tree("tavern");
        assert_eq!(filtered.roots.len(), 1);
        assert_eq!(filtered.roots[0].record.name, "The Moonstone Mask");
    }

    #[test]
    fn test_relationships_of() {
        let (mut store, _slot) = seeded();
        let item = store.create(ItemDraft::new("Glasstaff's Staff").magical()).unwrap();
        store
            .create(RelationshipDraft::new("char_2", item.id.clone(), RelationshipKind::Owns))
            .unwrap();
        assert_eq!(store.relationships_of(&id("char_2")).len(), 2);
        assert_eq!(store.relationships_of(&item.id).len(), 1);
    }

    #[test]
    fn test_write_failure_keeps_mutation() {
        let (mut store, slot) = seeded();
        slot.set_fail_writes(true);
        let character = store.create(CharacterDraft::new("Halia Thornton")).unwrap();
        assert!(store.get::<Character>(&character.id).is_some());
        assert!(store.last_write_error().is_some());

        slot.set_fail_writes(false);
        store.flush().unwrap();
        assert!(store.last_write_error().is_none());
    }
}
