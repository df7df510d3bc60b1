//! The example dataset loaded when no persisted document exists.

use crate::collection::Collection;
use crate::id::EntityId;
use crate::persist::{Document, DOCUMENT_VERSION};
use crate::relationship::{Relationship, RelationshipKind};
use crate::world::{Campaign, Character, Item, Location, Note};
use chrono::{NaiveDate, TimeZone, Utc};

/// Id of the seeded campaign, selected as the current scope.
pub const SEED_CAMPAIGN: &str = "campaign_1";

fn id(s: &str) -> EntityId {
    EntityId::from(s)
}

fn tags(list: &[&str]) -> Vec<String> {
    list.iter().map(|t| t.to_string()).collect()
}

fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap_or_default()
}

/// Build the "Lost Mines of Phandelver" example document.
pub fn seed_document() -> Document {
    let scope = id(SEED_CAMPAIGN);

    let campaigns = Collection::from_iter([Campaign {
        id: scope.clone(),
        name: "The Lost Mines of Phandelver".to_string(),
        description: "A classic starter adventure in the Sword Coast".to_string(),
        created: Some(date(2024, 1, 15)),
        last_modified: Some(date(2024, 7, 6)),
    }]);

    let characters = Collection::from_iter([
        Character {
            id: id("char_1"),
            name: "Gundren Rockseeker".to_string(),
            kind: "NPC".to_string(),
            race: "Dwarf".to_string(),
            class: "Merchant".to_string(),
            location: Some(id("location_1")),
            description: "A dwarven merchant seeking to reclaim his family's lost mine".to_string(),
            tags: tags(&["important", "quest-giver", "dwarf"]),
            campaign_id: scope.clone(),
        },
        Character {
            id: id("char_2"),
            name: "Sildar Hallwinter".to_string(),
            kind: "NPC".to_string(),
            race: "Human".to_string(),
            class: "Noble/Fighter".to_string(),
            location: Some(id("location_1")),
            description: "A human lord and agent of the Lords' Alliance".to_string(),
            tags: tags(&["alliance", "noble", "fighter"]),
            campaign_id: scope.clone(),
        },
    ]);

    let locations = Collection::from_iter([
        Location {
            id: id("location_1"),
            name: "Neverwinter".to_string(),
            kind: "City".to_string(),
            parent: Some(id("location_2")),
            description: "A large port city on the Sword Coast".to_string(),
            tags: tags(&["major-city", "port", "sword-coast"]),
            campaign_id: scope.clone(),
        },
        Location {
            id: id("location_2"),
            name: "Sword Coast".to_string(),
            kind: "Region".to_string(),
            parent: None,
            description: "The western coast of Faerûn".to_string(),
            tags: tags(&["region", "faerun"]),
            campaign_id: scope.clone(),
        },
        Location {
            id: id("location_3"),
            name: "The Moonstone Mask".to_string(),
            kind: "Tavern".to_string(),
            parent: Some(id("location_1")),
            description: "A popular tavern in Neverwinter's dock district".to_string(),
            tags: tags(&["tavern", "dock-district"]),
            campaign_id: scope.clone(),
        },
    ]);

    let items = Collection::from_iter([Item {
        id: id("item_1"),
        name: "Gundren's Map".to_string(),
        kind: "Map".to_string(),
        owner: Some(id("char_1")),
        location: Some(id("location_1")),
        description: "A hand-drawn map showing the location of the Lost Mine of Phandelver"
            .to_string(),
        magical: false,
        tags: tags(&["important", "quest-item", "map"]),
        campaign_id: scope.clone(),
    }]);

    let relationships = Collection::from_iter([
        Relationship {
            id: id("rel_1"),
            from: id("char_1"),
            to: id("char_2"),
            kind: RelationshipKind::Ally,
            strength: 8,
            description: "Business partners and friends".to_string(),
            campaign_id: scope.clone(),
        },
        Relationship {
            id: id("rel_2"),
            from: id("char_1"),
            to: id("location_1"),
            kind: RelationshipKind::LocatedIn,
            strength: 10,
            description: "Currently residing in Neverwinter".to_string(),
            campaign_id: scope.clone(),
        },
    ]);

    let notes = Collection::from_iter([Note {
        id: id("note_1"),
        title: "Session 1 - The Journey Begins".to_string(),
        content: "The party met Gundren Rockseeker in Neverwinter. He hired them to escort a \
                  wagon to Phandalin while he and Sildar Hallwinter rode ahead. The wagon \
                  contained mining supplies and unknown cargo."
            .to_string(),
        timestamp: Utc
            .with_ymd_and_hms(2024, 7, 1, 19, 0, 0)
            .single()
            .unwrap_or_default(),
        last_modified: None,
        tags: tags(&["session-notes", "phandalin", "beginning"]),
        linked_entities: vec![id("char_1"), id("char_2"), id("location_1")],
        campaign_id: scope.clone(),
    }]);

    Document {
        version: DOCUMENT_VERSION,
        campaigns,
        characters,
        locations,
        items,
        notes,
        relationships,
        current_campaign: Some(scope),
    }
}
