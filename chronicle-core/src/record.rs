//! The shared record abstraction.
//!
//! Every collection holds one concrete record type. The `Record` trait is
//! usually derived with `#[derive(Record)]`, which reads the `#[record(..)]`
//! field annotations to find the id, scope, display and foreign-key fields.

use crate::error::StoreError;
use crate::id::EntityId;
use crate::persist::Document;
use crate::relationship::Relationship;
use crate::world::{Campaign, Character, Item, Location, Note};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// Names of the collections in a store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CollectionName {
    Campaigns,
    Characters,
    Locations,
    Items,
    Notes,
    Relationships,
}

impl CollectionName {
    /// All collections, in document order.
    pub const ALL: [CollectionName; 6] = [
        CollectionName::Campaigns,
        CollectionName::Characters,
        CollectionName::Locations,
        CollectionName::Items,
        CollectionName::Notes,
        CollectionName::Relationships,
    ];

    /// Get the document key for this collection.
    pub fn as_str(&self) -> &'static str {
        match self {
            CollectionName::Campaigns => "campaigns",
            CollectionName::Characters => "characters",
            CollectionName::Locations => "locations",
            CollectionName::Items => "items",
            CollectionName::Notes => "notes",
            CollectionName::Relationships => "relationships",
        }
    }
}

impl fmt::Display for CollectionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CollectionName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_lowercase();
        CollectionName::ALL
            .into_iter()
            .find(|name| {
                let key = name.as_str();
                lower == key || lower == key.trim_end_matches('s')
            })
            .ok_or_else(|| format!("unknown collection '{s}'"))
    }
}

/// A record stored in one collection.
pub trait Record: Clone + fmt::Debug + Serialize + DeserializeOwned {
    /// The collection holding records of this type.
    const COLLECTION: CollectionName;

    /// Prefix for minted ids.
    const ID_PREFIX: &'static str;

    /// Whether records belong to a campaign scope.
    const SCOPED: bool;

    /// The record's id. Immutable once assigned.
    fn id(&self) -> &EntityId;

    /// The owning campaign, for scoped records.
    fn scope(&self) -> Option<&EntityId>;

    /// Label used when this record is shown as a reference.
    fn display_name(&self) -> &str;

    /// The categorical field matched by type filters.
    fn category(&self) -> Option<&str>;

    /// Text fields covered by search.
    fn search_fields(&self) -> Vec<&str>;

    /// Foreign keys as `(field, id)` pairs, including the scope.
    fn references(&self) -> Vec<(&'static str, &EntityId)>;

    /// Clear an optional or list-valued foreign key pointing at `target`.
    ///
    /// Returns true when the record changed.
    fn clear_reference(&mut self, field: &str, target: &EntityId) -> bool;

    /// Case-insensitive substring match over the search fields.
    fn matches_text(&self, query: &str) -> bool {
        let needle = query.to_lowercase();
        self.search_fields()
            .iter()
            .any(|field| field.to_lowercase().contains(&needle))
    }

    /// Check whether `field` references `target`.
    fn references_id(&self, field: &str, target: &EntityId) -> bool {
        self.references()
            .iter()
            .any(|(name, id)| *name == field && *id == target)
    }
}

/// Records with a creation instant, for recency views.
pub trait Timestamped {
    fn timestamp(&self) -> DateTime<Utc>;
}

/// Input to `create`: a record without its id.
pub trait Draft {
    type Record: Record;

    /// The scope the caller supplied, if any.
    fn scope(&self) -> Option<&EntityId>;

    /// Assign the scope (called when the caller left it empty).
    fn set_scope(&mut self, scope: EntityId);

    /// Fill derived fields from the current store contents.
    fn prepare(&mut self, _data: &Document, _scope: Option<&EntityId>) {}

    /// Validate and build the record with its freshly minted id.
    fn build(self, id: EntityId, now: DateTime<Utc>) -> Result<Self::Record, StoreError>;
}

/// Input to `update`: only the fields present are changed.
pub trait Patch {
    type Record: Record;

    /// Fill derived fields from the current store contents.
    fn prepare(&mut self, _data: &Document, _record: &Self::Record) {}

    /// Merge into `record`. On error the caller discards the partial result.
    fn apply(self, record: &mut Self::Record, now: DateTime<Utc>) -> Result<(), StoreError>;
}

/// A borrowed record of any kind, as returned by cross-collection lookups.
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(untagged)]
pub enum EntityRef<'a> {
    Campaign(&'a Campaign),
    Character(&'a Character),
    Location(&'a Location),
    Item(&'a Item),
    Note(&'a Note),
    Relationship(&'a Relationship),
}

impl<'a> EntityRef<'a> {
    /// The collection the record lives in.
    pub fn collection(&self) -> CollectionName {
        match self {
            EntityRef::Campaign(_) => CollectionName::Campaigns,
            EntityRef::Character(_) => CollectionName::Characters,
            EntityRef::Location(_) => CollectionName::Locations,
            EntityRef::Item(_) => CollectionName::Items,
            EntityRef::Note(_) => CollectionName::Notes,
            EntityRef::Relationship(_) => CollectionName::Relationships,
        }
    }

    /// The record's id.
    pub fn id(&self) -> &'a EntityId {
        match *self {
            EntityRef::Campaign(r) => r.id(),
            EntityRef::Character(r) => r.id(),
            EntityRef::Location(r) => r.id(),
            EntityRef::Item(r) => r.id(),
            EntityRef::Note(r) => r.id(),
            EntityRef::Relationship(r) => r.id(),
        }
    }

    /// The record's display label.
    pub fn display_name(&self) -> &'a str {
        match *self {
            EntityRef::Campaign(r) => r.display_name(),
            EntityRef::Character(r) => r.display_name(),
            EntityRef::Location(r) => r.display_name(),
            EntityRef::Item(r) => r.display_name(),
            EntityRef::Note(r) => r.display_name(),
            EntityRef::Relationship(r) => r.display_name(),
        }
    }
}
