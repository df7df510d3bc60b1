//! Campaign records: campaigns and the characters, locations, items and
//! notes that belong to them.

use crate::error::StoreError;
use crate::id::EntityId;
use crate::persist::Document;
use crate::record::{CollectionName, Draft, Patch, Timestamped};
use crate::Record;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Check that a required text field is non-blank.
pub(crate) fn required(
    value: String,
    collection: CollectionName,
    field: &'static str,
) -> Result<String, StoreError> {
    if value.trim().is_empty() {
        return Err(StoreError::missing(collection, field));
    }
    Ok(value)
}

/// Overwrite `slot` when the patch carries a value.
pub(crate) fn merge<T>(slot: &mut T, value: Option<T>) {
    if let Some(value) = value {
        *slot = value;
    }
}

/// Read `null` the same as a missing field.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Split a comma-separated tag list, dropping blanks.
pub fn split_tags(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(|t| t.trim())
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

// ============================================================================
// Campaign
// ============================================================================

/// A campaign: the scope every other record belongs to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Record)]
#[serde(rename_all = "camelCase")]
#[record(collection = Campaigns, prefix = "campaign")]
pub struct Campaign {
    #[record(id)]
    pub id: EntityId,
    #[record(display, search)]
    pub name: String,
    #[serde(default)]
    #[record(search)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<NaiveDate>,
}

/// Fields for creating a campaign.
#[derive(Debug, Clone, Default)]
pub struct CampaignDraft {
    pub name: String,
    pub description: String,
}

impl CampaignDraft {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

impl Draft for CampaignDraft {
    type Record = Campaign;

    fn scope(&self) -> Option<&EntityId> {
        None
    }

    fn set_scope(&mut self, _scope: EntityId) {}

    fn build(self, id: EntityId, now: DateTime<Utc>) -> Result<Campaign, StoreError> {
        let today = now.date_naive();
        Ok(Campaign {
            id,
            name: required(self.name, Campaign::COLLECTION, "name")?,
            description: self.description,
            created: Some(today),
            last_modified: Some(today),
        })
    }
}

/// Partial update for a campaign.
#[derive(Debug, Clone, Default)]
pub struct CampaignPatch {
    pub name: Option<String>,
    pub description: Option<String>,
}

impl Patch for CampaignPatch {
    type Record = Campaign;

    fn apply(self, record: &mut Campaign, now: DateTime<Utc>) -> Result<(), StoreError> {
        if let Some(name) = self.name {
            record.name = required(name, Campaign::COLLECTION, "name")?;
        }
        merge(&mut record.description, self.description);
        record.last_modified = Some(now.date_naive());
        Ok(())
    }
}

// ============================================================================
// Character
// ============================================================================

/// A player or non-player character.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Record)]
#[serde(rename_all = "camelCase")]
#[record(collection = Characters, prefix = "char")]
pub struct Character {
    #[record(id)]
    pub id: EntityId,
    #[record(display, search)]
    pub name: String,
    /// PC, NPC, Villain...
    #[serde(rename = "type", default)]
    #[record(category)]
    pub kind: String,
    #[serde(default)]
    pub race: String,
    #[serde(default)]
    pub class: String,
    /// Where the character currently is.
    #[serde(default)]
    #[record(reference)]
    pub location: Option<EntityId>,
    #[serde(default)]
    #[record(search)]
    pub description: String,
    #[serde(default)]
    #[record(search)]
    pub tags: Vec<String>,
    #[serde(default)]
    #[record(scope)]
    pub campaign_id: EntityId,
}

/// Fields for creating a character.
#[derive(Debug, Clone, Default)]
pub struct CharacterDraft {
    pub name: String,
    pub kind: String,
    pub race: String,
    pub class: String,
    pub location: Option<EntityId>,
    pub description: String,
    pub tags: Vec<String>,
    pub campaign_id: Option<EntityId>,
}

impl CharacterDraft {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: "NPC".to_string(),
            ..Default::default()
        }
    }

    pub fn with_kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = kind.into();
        self
    }

    pub fn with_race(mut self, race: impl Into<String>) -> Self {
        self.race = race.into();
        self
    }

    pub fn with_class(mut self, class: impl Into<String>) -> Self {
        self.class = class.into();
        self
    }

    pub fn with_location(mut self, location: impl Into<EntityId>) -> Self {
        self.location = Some(location.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn in_campaign(mut self, campaign_id: impl Into<EntityId>) -> Self {
        self.campaign_id = Some(campaign_id.into());
        self
    }
}

impl Draft for CharacterDraft {
    type Record = Character;

    fn scope(&self) -> Option<&EntityId> {
        self.campaign_id.as_ref()
    }

    fn set_scope(&mut self, scope: EntityId) {
        self.campaign_id = Some(scope);
    }

    fn build(self, id: EntityId, _now: DateTime<Utc>) -> Result<Character, StoreError> {
        let campaign_id = self
            .campaign_id
            .ok_or_else(|| StoreError::missing(Character::COLLECTION, "campaignId"))?;
        Ok(Character {
            id,
            name: required(self.name, Character::COLLECTION, "name")?,
            kind: self.kind,
            race: self.race,
            class: self.class,
            location: self.location,
            description: self.description,
            tags: self.tags,
            campaign_id,
        })
    }
}

/// Partial update for a character.
#[derive(Debug, Clone, Default)]
pub struct CharacterPatch {
    pub name: Option<String>,
    pub kind: Option<String>,
    pub race: Option<String>,
    pub class: Option<String>,
    /// `Some(None)` clears the location.
    pub location: Option<Option<EntityId>>,
    pub description: Option<String>,
    pub tags: Option<Vec<String>>,
}

impl Patch for CharacterPatch {
    type Record = Character;

    fn apply(self, record: &mut Character, _now: DateTime<Utc>) -> Result<(), StoreError> {
        if let Some(name) = self.name {
            record.name = required(name, Character::COLLECTION, "name")?;
        }
        merge(&mut record.kind, self.kind);
        merge(&mut record.race, self.race);
        merge(&mut record.class, self.class);
        merge(&mut record.location, self.location);
        merge(&mut record.description, self.description);
        merge(&mut record.tags, self.tags);
        Ok(())
    }
}

// ============================================================================
// Location
// ============================================================================

/// A place. Locations nest through `parent`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Record)]
#[serde(rename_all = "camelCase")]
#[record(collection = Locations, prefix = "location")]
pub struct Location {
    #[record(id)]
    pub id: EntityId,
    #[record(display, search)]
    pub name: String,
    /// City, Region, Tavern...
    #[serde(rename = "type", default)]
    #[record(category)]
    pub kind: String,
    #[serde(default)]
    #[record(reference)]
    pub parent: Option<EntityId>,
    #[serde(default)]
    #[record(search)]
    pub description: String,
    #[serde(default)]
    #[record(search)]
    pub tags: Vec<String>,
    #[serde(default)]
    #[record(scope)]
    pub campaign_id: EntityId,
}

/// Fields for creating a location.
#[derive(Debug, Clone, Default)]
pub struct LocationDraft {
    pub name: String,
    pub kind: String,
    pub parent: Option<EntityId>,
    pub description: String,
    pub tags: Vec<String>,
    pub campaign_id: Option<EntityId>,
}

impl LocationDraft {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = kind.into();
        self
    }

    pub fn with_parent(mut self, parent: impl Into<EntityId>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn in_campaign(mut self, campaign_id: impl Into<EntityId>) -> Self {
        self.campaign_id = Some(campaign_id.into());
        self
    }
}

fn check_parent(id: &EntityId, parent: Option<&EntityId>) -> Result<(), StoreError> {
    if parent == Some(id) {
        return Err(StoreError::invalid(
            Location::COLLECTION,
            "parent",
            "cannot be the location itself",
        ));
    }
    Ok(())
}

impl Draft for LocationDraft {
    type Record = Location;

    fn scope(&self) -> Option<&EntityId> {
        self.campaign_id.as_ref()
    }

    fn set_scope(&mut self, scope: EntityId) {
        self.campaign_id = Some(scope);
    }

    fn build(self, id: EntityId, _now: DateTime<Utc>) -> Result<Location, StoreError> {
        check_parent(&id, self.parent.as_ref())?;
        let campaign_id = self
            .campaign_id
            .ok_or_else(|| StoreError::missing(Location::COLLECTION, "campaignId"))?;
        Ok(Location {
            id,
            name: required(self.name, Location::COLLECTION, "name")?,
            kind: self.kind,
            parent: self.parent,
            description: self.description,
            tags: self.tags,
            campaign_id,
        })
    }
}

/// Partial update for a location.
#[derive(Debug, Clone, Default)]
pub struct LocationPatch {
    pub name: Option<String>,
    pub kind: Option<String>,
    /// `Some(None)` makes the location a root.
    pub parent: Option<Option<EntityId>>,
    pub description: Option<String>,
    pub tags: Option<Vec<String>>,
}

impl Patch for LocationPatch {
    type Record = Location;

    fn apply(self, record: &mut Location, _now: DateTime<Utc>) -> Result<(), StoreError> {
        if let Some(parent) = &self.parent {
            check_parent(&record.id, parent.as_ref())?;
        }
        if let Some(name) = self.name {
            record.name = required(name, Location::COLLECTION, "name")?;
        }
        merge(&mut record.kind, self.kind);
        merge(&mut record.parent, self.parent);
        merge(&mut record.description, self.description);
        merge(&mut record.tags, self.tags);
        Ok(())
    }
}

// ============================================================================
// Item
// ============================================================================

/// An object, possibly owned by a character or kept at a location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Record)]
#[serde(rename_all = "camelCase")]
#[record(collection = Items, prefix = "item")]
pub struct Item {
    #[record(id)]
    pub id: EntityId,
    #[record(display, search)]
    pub name: String,
    #[serde(rename = "type", default)]
    #[record(category)]
    pub kind: String,
    #[serde(default)]
    #[record(reference)]
    pub owner: Option<EntityId>,
    #[serde(default)]
    #[record(reference)]
    pub location: Option<EntityId>,
    #[serde(default)]
    #[record(search)]
    pub description: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub magical: bool,
    #[serde(default)]
    #[record(search)]
    pub tags: Vec<String>,
    #[serde(default)]
    #[record(scope)]
    pub campaign_id: EntityId,
}

/// Fields for creating an item.
#[derive(Debug, Clone, Default)]
pub struct ItemDraft {
    pub name: String,
    pub kind: String,
    pub owner: Option<EntityId>,
    pub location: Option<EntityId>,
    pub description: String,
    pub magical: bool,
    pub tags: Vec<String>,
    pub campaign_id: Option<EntityId>,
}

impl ItemDraft {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = kind.into();
        self
    }

    pub fn with_owner(mut self, owner: impl Into<EntityId>) -> Self {
        self.owner = Some(owner.into());
        self
    }

    pub fn with_location(mut self, location: impl Into<EntityId>) -> Self {
        self.location = Some(location.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn magical(mut self) -> Self {
        self.magical = true;
        self
    }

    pub fn in_campaign(mut self, campaign_id: impl Into<EntityId>) -> Self {
        self.campaign_id = Some(campaign_id.into());
        self
    }
}

impl Draft for ItemDraft {
    type Record = Item;

    fn scope(&self) -> Option<&EntityId> {
        self.campaign_id.as_ref()
    }

    fn set_scope(&mut self, scope: EntityId) {
        self.campaign_id = Some(scope);
    }

    fn build(self, id: EntityId, _now: DateTime<Utc>) -> Result<Item, StoreError> {
        let campaign_id = self
            .campaign_id
            .ok_or_else(|| StoreError::missing(Item::COLLECTION, "campaignId"))?;
        Ok(Item {
            id,
            name: required(self.name, Item::COLLECTION, "name")?,
            kind: self.kind,
            owner: self.owner,
            location: self.location,
            description: self.description,
            magical: self.magical,
            tags: self.tags,
            campaign_id,
        })
    }
}

/// Partial update for an item.
#[derive(Debug, Clone, Default)]
pub struct ItemPatch {
    pub name: Option<String>,
    pub kind: Option<String>,
    pub owner: Option<Option<EntityId>>,
    pub location: Option<Option<EntityId>>,
    pub description: Option<String>,
    pub magical: Option<bool>,
    pub tags: Option<Vec<String>>,
}

impl Patch for ItemPatch {
    type Record = Item;

    fn apply(self, record: &mut Item, _now: DateTime<Utc>) -> Result<(), StoreError> {
        if let Some(name) = self.name {
            record.name = required(name, Item::COLLECTION, "name")?;
        }
        merge(&mut record.kind, self.kind);
        merge(&mut record.owner, self.owner);
        merge(&mut record.location, self.location);
        merge(&mut record.description, self.description);
        merge(&mut record.magical, self.magical);
        merge(&mut record.tags, self.tags);
        Ok(())
    }
}

// ============================================================================
// Note
// ============================================================================

/// A session note. Mentions of known names are linked automatically.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Record)]
#[serde(rename_all = "camelCase")]
#[record(collection = Notes, prefix = "note")]
pub struct Note {
    #[record(id)]
    pub id: EntityId,
    #[record(display, search)]
    pub title: String,
    #[serde(default)]
    #[record(search)]
    pub content: String,
    /// When the note was written.
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<DateTime<Utc>>,
    #[serde(default)]
    #[record(search)]
    pub tags: Vec<String>,
    #[serde(default)]
    #[record(reference)]
    pub linked_entities: Vec<EntityId>,
    #[serde(default)]
    #[record(scope)]
    pub campaign_id: EntityId,
}

impl Timestamped for Note {
    fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}

/// Fields for creating a note.
#[derive(Debug, Clone, Default)]
pub struct NoteDraft {
    pub title: String,
    pub content: String,
    pub tags: Vec<String>,
    /// Leave empty to link every known name mentioned in the content.
    pub linked_entities: Option<Vec<EntityId>>,
    /// Defaults to the creation instant.
    pub timestamp: Option<DateTime<Utc>>,
    pub campaign_id: Option<EntityId>,
}

impl NoteDraft {
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
            ..Default::default()
        }
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_links(mut self, links: Vec<EntityId>) -> Self {
        self.linked_entities = Some(links);
        self
    }

    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    pub fn in_campaign(mut self, campaign_id: impl Into<EntityId>) -> Self {
        self.campaign_id = Some(campaign_id.into());
        self
    }
}

impl Draft for NoteDraft {
    type Record = Note;

    fn scope(&self) -> Option<&EntityId> {
        self.campaign_id.as_ref()
    }

    fn set_scope(&mut self, scope: EntityId) {
        self.campaign_id = Some(scope);
    }

    fn prepare(&mut self, data: &Document, scope: Option<&EntityId>) {
        if self.linked_entities.is_none() {
            self.linked_entities = Some(data.link_entities(scope, &self.content));
        }
    }

    fn build(self, id: EntityId, now: DateTime<Utc>) -> Result<Note, StoreError> {
        let campaign_id = self
            .campaign_id
            .ok_or_else(|| StoreError::missing(Note::COLLECTION, "campaignId"))?;
        Ok(Note {
            id,
            title: required(self.title, Note::COLLECTION, "title")?,
            content: self.content,
            timestamp: self.timestamp.unwrap_or(now),
            last_modified: None,
            tags: self.tags,
            linked_entities: self.linked_entities.unwrap_or_default(),
            campaign_id,
        })
    }
}

/// Partial update for a note. Any update refreshes `last_modified`.
#[derive(Debug, Clone, Default)]
pub struct NotePatch {
    pub title: Option<String>,
    pub content: Option<String>,
    pub tags: Option<Vec<String>>,
    /// Leave empty to re-link from new content.
    pub linked_entities: Option<Vec<EntityId>>,
}

impl Patch for NotePatch {
    type Record = Note;

    fn prepare(&mut self, data: &Document, record: &Note) {
        if self.linked_entities.is_none() {
            if let Some(content) = &self.content {
                self.linked_entities = Some(data.link_entities(record.scope(), content));
            }
        }
    }

    fn apply(self, record: &mut Note, now: DateTime<Utc>) -> Result<(), StoreError> {
        if let Some(title) = self.title {
            record.title = required(title, Note::COLLECTION, "title")?;
        }
        merge(&mut record.content, self.content);
        merge(&mut record.tags, self.tags);
        merge(&mut record.linked_entities, self.linked_entities);
        record.last_modified = Some(now);
        Ok(())
    }
}
