//! Turning `key=value` arguments into drafts and patches.
//!
//! Keys are matched loosely (`campaignId`, `campaign_id` and `campaign-id`
//! are the same key). Bare words form the display field: the name, or a
//! note's title. In patches an empty value clears a nullable field:
//! `parent=` makes a location a root.

use anyhow::{anyhow, bail, Context, Result};
use chronicle_core::world::split_tags;
use chronicle_core::{
    CampaignDraft, CampaignPatch, CharacterDraft, CharacterPatch, EntityId, ItemDraft, ItemPatch,
    LocationDraft, LocationPatch, NoteDraft, NotePatch, RelationshipDraft, RelationshipKind,
    RelationshipPatch,
};
use std::collections::BTreeMap;

/// Parsed command arguments.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Fields {
    values: BTreeMap<String, String>,
    bare: Vec<String>,
}

fn normalize(key: &str) -> String {
    key.chars()
        .filter(|c| *c != '_' && *c != '-')
        .flat_map(char::to_lowercase)
        .collect()
}

impl Fields {
    /// Split tokens into `key=value` pairs and bare words.
    pub fn parse(tokens: &[String]) -> Self {
        let mut fields = Fields::default();
        for token in tokens {
            match token.split_once('=') {
                Some((key, value)) if !key.is_empty() => {
                    fields.values.insert(normalize(key), value.trim().to_string());
                }
                _ => fields.bare.push(token.clone()),
            }
        }
        fields
    }

    /// Look up a value without consuming it.
    pub fn peek(&self, key: &str) -> Option<&str> {
        self.values.get(&normalize(key)).map(String::as_str)
    }

    fn take(&mut self, key: &str) -> Option<String> {
        self.values.remove(&normalize(key))
    }

    /// The display field: `key=...` if given, else the bare words.
    fn take_label(&mut self, key: &str) -> Option<String> {
        self.take(key).or_else(|| {
            let joined = self.bare.join(" ");
            self.bare.clear();
            (!joined.is_empty()).then_some(joined)
        })
    }

    fn take_id(&mut self, key: &str) -> Option<EntityId> {
        self.take(key)
            .filter(|v| !v.is_empty())
            .map(EntityId::from)
    }

    /// `Some(None)` when the value is empty or `none`.
    fn take_nullable(&mut self, key: &str) -> Option<Option<EntityId>> {
        self.take(key).map(|v| {
            if v.is_empty() || v.eq_ignore_ascii_case("none") {
                None
            } else {
                Some(EntityId::from(v))
            }
        })
    }

    fn take_tags(&mut self) -> Option<Vec<String>> {
        self.take("tags").map(|v| split_tags(&v))
    }

    fn take_ids(&mut self, key: &str) -> Option<Vec<EntityId>> {
        self.take(key)
            .map(|v| split_tags(&v).into_iter().map(EntityId::from).collect())
    }

    fn take_bool(&mut self, key: &str) -> Result<Option<bool>> {
        self.take(key)
            .map(|v| match v.to_lowercase().as_str() {
                "" | "yes" | "true" | "1" | "y" => Ok(true),
                "no" | "false" | "0" | "n" => Ok(false),
                other => Err(anyhow!("{key} must be yes or no, got '{other}'")),
            })
            .transpose()
    }

    fn take_strength(&mut self) -> Result<Option<u8>> {
        self.take("strength")
            .map(|v| {
                v.parse::<u8>()
                    .with_context(|| format!("strength must be a number from 0 to 10, got '{v}'"))
            })
            .transpose()
    }

    fn take_kind(&mut self) -> Result<Option<RelationshipKind>> {
        self.take("type")
            .map(|v| v.parse::<RelationshipKind>().map_err(|e| anyhow!(e)))
            .transpose()
    }

    /// Fail if any argument was not used.
    fn finish(self) -> Result<()> {
        if let Some(key) = self.values.keys().next() {
            bail!("unknown field '{key}'");
        }
        if !self.bare.is_empty() {
            bail!("unexpected argument '{}'", self.bare.join(" "));
        }
        Ok(())
    }
}

// ============================================================================
// Drafts
// ============================================================================

pub fn campaign_draft(mut fields: Fields) -> Result<CampaignDraft> {
    let draft = CampaignDraft {
        name: fields.take_label("name").unwrap_or_default(),
        description: fields.take("description").unwrap_or_default(),
    };
    fields.finish()?;
    Ok(draft)
}

pub fn character_draft(mut fields: Fields) -> Result<CharacterDraft> {
    let mut draft = CharacterDraft::new(fields.take_label("name").unwrap_or_default());
    if let Some(kind) = fields.take("type") {
        draft.kind = kind;
    }
    draft.race = fields.take("race").unwrap_or_default();
    draft.class = fields.take("class").unwrap_or_default();
    draft.location = fields.take_id("location");
    draft.description = fields.take("description").unwrap_or_default();
    draft.tags = fields.take_tags().unwrap_or_default();
    draft.campaign_id = fields.take_id("campaignId");
    fields.finish()?;
    Ok(draft)
}

pub fn location_draft(mut fields: Fields) -> Result<LocationDraft> {
    let draft = LocationDraft {
        name: fields.take_label("name").unwrap_or_default(),
        kind: fields.take("type").unwrap_or_default(),
        parent: fields.take_id("parent"),
        description: fields.take("description").unwrap_or_default(),
        tags: fields.take_tags().unwrap_or_default(),
        campaign_id: fields.take_id("campaignId"),
    };
    fields.finish()?;
    Ok(draft)
}

pub fn item_draft(mut fields: Fields) -> Result<ItemDraft> {
    let draft = ItemDraft {
        name: fields.take_label("name").unwrap_or_default(),
        kind: fields.take("type").unwrap_or_default(),
        owner: fields.take_id("owner"),
        location: fields.take_id("location"),
        description: fields.take("description").unwrap_or_default(),
        magical: fields.take_bool("magical")?.unwrap_or(false),
        tags: fields.take_tags().unwrap_or_default(),
        campaign_id: fields.take_id("campaignId"),
    };
    fields.finish()?;
    Ok(draft)
}

pub fn note_draft(mut fields: Fields) -> Result<NoteDraft> {
    let draft = NoteDraft {
        title: fields.take_label("title").unwrap_or_default(),
        content: fields.take("content").unwrap_or_default(),
        tags: fields.take_tags().unwrap_or_default(),
        linked_entities: fields.take_ids("links"),
        timestamp: None,
        campaign_id: fields.take_id("campaignId"),
    };
    fields.finish()?;
    Ok(draft)
}

pub fn relationship_draft(mut fields: Fields) -> Result<RelationshipDraft> {
    let from = fields.take_id("from").context("from= is required")?;
    let to = fields.take_id("to").context("to= is required")?;
    let kind = fields.take_kind()?.context("type= is required")?;

    let mut draft = RelationshipDraft::new(from, to, kind);
    if let Some(strength) = fields.take_strength()? {
        draft.strength = strength;
    }
    draft.description = fields.take("description").unwrap_or_default();
    draft.campaign_id = fields.take_id("campaignId");
    fields.finish()?;
    Ok(draft)
}

// ============================================================================
// Patches
// ============================================================================

pub fn campaign_patch(mut fields: Fields) -> Result<CampaignPatch> {
    let patch = CampaignPatch {
        name: fields.take_label("name"),
        description: fields.take("description"),
    };
    fields.finish()?;
    Ok(patch)
}

pub fn character_patch(mut fields: Fields) -> Result<CharacterPatch> {
    let patch = CharacterPatch {
        name: fields.take_label("name"),
        kind: fields.take("type"),
        race: fields.take("race"),
        class: fields.take("class"),
        location: fields.take_nullable("location"),
        description: fields.take("description"),
        tags: fields.take_tags(),
    };
    fields.finish()?;
    Ok(patch)
}

pub fn location_patch(mut fields: Fields) -> Result<LocationPatch> {
    let patch = LocationPatch {
        name: fields.take_label("name"),
        kind: fields.take("type"),
        parent: fields.take_nullable("parent"),
        description: fields.take("description"),
        tags: fields.take_tags(),
    };
    fields.finish()?;
    Ok(patch)
}

pub fn item_patch(mut fields: Fields) -> Result<ItemPatch> {
    let patch = ItemPatch {
        name: fields.take_label("name"),
        kind: fields.take("type"),
        owner: fields.take_nullable("owner"),
        location: fields.take_nullable("location"),
        description: fields.take("description"),
        magical: fields.take_bool("magical")?,
        tags: fields.take_tags(),
    };
    fields.finish()?;
    Ok(patch)
}

pub fn note_patch(mut fields: Fields) -> Result<NotePatch> {
    let patch = NotePatch {
        title: fields.take_label("title"),
        content: fields.take("content"),
        tags: fields.take_tags(),
        linked_entities: fields.take_ids("links"),
    };
    fields.finish()?;
    Ok(patch)
}

pub fn relationship_patch(mut fields: Fields) -> Result<RelationshipPatch> {
    let patch = RelationshipPatch {
        from: fields.take_id("from"),
        to: fields.take_id("to"),
        kind: fields.take_kind()?,
        strength: fields.take_strength()?,
        description: fields.take("description"),
    };
    fields.finish()?;
    Ok(patch)
}
