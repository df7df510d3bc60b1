//! Relationships between characters, locations and items.

use crate::error::StoreError;
use crate::id::EntityId;
use crate::record::{Draft, Patch};
use crate::world::merge;
use crate::Record;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

/// Highest relationship strength.
pub const MAX_STRENGTH: u8 = 10;

/// Types of relationships between records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RelationshipKind {
    Ally,
    Enemy,
    Neutral,
    Mentor,
    Rival,
    Family,
    LocatedIn,
    Contains,
    Owns,
}

impl RelationshipKind {
    /// Every kind, in catalogue order.
    pub const ALL: [RelationshipKind; 9] = [
        RelationshipKind::Ally,
        RelationshipKind::Enemy,
        RelationshipKind::Neutral,
        RelationshipKind::Mentor,
        RelationshipKind::Rival,
        RelationshipKind::Family,
        RelationshipKind::LocatedIn,
        RelationshipKind::Contains,
        RelationshipKind::Owns,
    ];

    /// Get the stored identifier.
    pub fn as_str(&self) -> &'static str {
        match self {
            RelationshipKind::Ally => "ally",
            RelationshipKind::Enemy => "enemy",
            RelationshipKind::Neutral => "neutral",
            RelationshipKind::Mentor => "mentor",
            RelationshipKind::Rival => "rival",
            RelationshipKind::Family => "family",
            RelationshipKind::LocatedIn => "located-in",
            RelationshipKind::Contains => "contains",
            RelationshipKind::Owns => "owns",
        }
    }

    /// Get the display label.
    pub fn label(&self) -> &'static str {
        match self {
            RelationshipKind::Ally => "Ally",
            RelationshipKind::Enemy => "Enemy",
            RelationshipKind::Neutral => "Neutral",
            RelationshipKind::Mentor => "Mentor",
            RelationshipKind::Rival => "Rival",
            RelationshipKind::Family => "Family",
            RelationshipKind::LocatedIn => "Located In",
            RelationshipKind::Contains => "Contains",
            RelationshipKind::Owns => "Owns",
        }
    }

    /// Get the inverse relationship kind (if applicable).
    pub fn inverse(&self) -> Option<RelationshipKind> {
        match self {
            RelationshipKind::LocatedIn => Some(RelationshipKind::Contains),
            RelationshipKind::Contains => Some(RelationshipKind::LocatedIn),
            // Symmetric relationships
            RelationshipKind::Ally
            | RelationshipKind::Enemy
            | RelationshipKind::Neutral
            | RelationshipKind::Rival
            | RelationshipKind::Family => Some(*self),
            // One-directional relationships
            RelationshipKind::Mentor | RelationshipKind::Owns => None,
        }
    }
}

impl AsRef<str> for RelationshipKind {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for RelationshipKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for RelationshipKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase().replace([' ', '_'], "-");
        RelationshipKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == wanted)
            .ok_or_else(|| format!("unknown relationship type '{s}'"))
    }
}

fn default_strength() -> u8 {
    5
}

/// Missing, `null` or out-of-range strengths load as the default.
fn lenient_strength<'de, D>(deserializer: D) -> Result<u8, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value
        .as_ref()
        .and_then(serde_json::Value::as_u64)
        .and_then(|n| u8::try_from(n).ok())
        .filter(|n| *n <= MAX_STRENGTH)
        .unwrap_or_else(default_strength))
}

/// A directed relationship between two records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Record)]
#[serde(rename_all = "camelCase")]
#[record(collection = Relationships, prefix = "rel")]
pub struct Relationship {
    #[record(id)]
    pub id: EntityId,
    #[record(reference)]
    pub from: EntityId,
    #[record(reference)]
    pub to: EntityId,
    #[serde(rename = "type")]
    #[record(display = "label", category)]
    pub kind: RelationshipKind,
    /// 0 (barely) to 10 (unbreakable).
    #[serde(default = "default_strength", deserialize_with = "lenient_strength")]
    pub strength: u8,
    #[serde(default)]
    #[record(search)]
    pub description: String,
    #[serde(default)]
    #[record(scope)]
    pub campaign_id: EntityId,
}

impl Relationship {
    /// Check if this relationship involves a specific record.
    pub fn involves(&self, id: &EntityId) -> bool {
        self.from == *id || self.to == *id
    }

    /// Get the other end of the relationship.
    pub fn other(&self, id: &EntityId) -> Option<&EntityId> {
        if self.from == *id {
            Some(&self.to)
        } else if self.to == *id {
            Some(&self.from)
        } else {
            None
        }
    }

    /// The kind as seen from `id`'s end.
    pub fn kind_from(&self, id: &EntityId) -> Option<RelationshipKind> {
        if self.from == *id {
            Some(self.kind)
        } else if self.to == *id {
            self.kind.inverse()
        } else {
            None
        }
    }
}

fn check_strength(strength: u8) -> Result<u8, StoreError> {
    if strength > MAX_STRENGTH {
        return Err(StoreError::invalid(
            Relationship::COLLECTION,
            "strength",
            format!("must be between 0 and {MAX_STRENGTH}"),
        ));
    }
    Ok(strength)
}

fn check_endpoint(id: EntityId, field: &'static str) -> Result<EntityId, StoreError> {
    if id.is_empty() {
        return Err(StoreError::missing(Relationship::COLLECTION, field));
    }
    Ok(id)
}

/// Fields for creating a relationship.
#[derive(Debug, Clone)]
pub struct RelationshipDraft {
    pub from: EntityId,
    pub to: EntityId,
    pub kind: RelationshipKind,
    pub strength: u8,
    pub description: String,
    pub campaign_id: Option<EntityId>,
}

impl RelationshipDraft {
    pub fn new(from: impl Into<EntityId>, to: impl Into<EntityId>, kind: RelationshipKind) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            kind,
            strength: default_strength(),
            description: String::new(),
            campaign_id: None,
        }
    }

    pub fn with_strength(mut self, strength: u8) -> Self {
        self.strength = strength;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn in_campaign(mut self, campaign_id: impl Into<EntityId>) -> Self {
        self.campaign_id = Some(campaign_id.into());
        self
    }
}

impl Draft for RelationshipDraft {
    type Record = Relationship;

    fn scope(&self) -> Option<&EntityId> {
        self.campaign_id.as_ref()
    }

    fn set_scope(&mut self, scope: EntityId) {
        self.campaign_id = Some(scope);
    }

    fn build(self, id: EntityId, _now: DateTime<Utc>) -> Result<Relationship, StoreError> {
        let campaign_id = self
            .campaign_id
            .ok_or_else(|| StoreError::missing(Relationship::COLLECTION, "campaignId"))?;
        Ok(Relationship {
            id,
            from: check_endpoint(self.from, "from")?,
            to: check_endpoint(self.to, "to")?,
            kind: self.kind,
            strength: check_strength(self.strength)?,
            description: self.description,
            campaign_id,
        })
    }
}

/// Partial update for a relationship.
#[derive(Debug, Clone, Default)]
pub struct RelationshipPatch {
    pub from: Option<EntityId>,
    pub to: Option<EntityId>,
    pub kind: Option<RelationshipKind>,
    pub strength: Option<u8>,
    pub description: Option<String>,
}

impl Patch for RelationshipPatch {
    type Record = Relationship;

    fn apply(self, record: &mut Relationship, _now: DateTime<Utc>) -> Result<(), StoreError> {
        if let Some(from) = self.from {
            record.from = check_endpoint(from, "from")?;
        }
        if let Some(to) = self.to {
            record.to = check_endpoint(to, "to")?;
        }
        if let Some(strength) = self.strength {
            record.strength = check_strength(strength)?;
        }
        merge(&mut record.kind, self.kind);
        merge(&mut record.description, self.description);
        Ok(())
    }
}
