//! Campaign chronicle store.
//!
//! This crate provides:
//! - Typed record collections (campaigns, characters, locations, items,
//!   notes, relationships) with stable ids
//! - A normalized store with merge updates and declarative delete cascades
//! - Scoped, lazily evaluated views: search, type filters, recency, trees
//! - JSON persistence with self-healing startup
//!
//! # Quick Start
//!
//! ```no_run
//! use chronicle_core::{CharacterDraft, Character, Store, StoreConfig};
//!
//! let mut store = Store::open_file(StoreConfig::new().with_data_path("campaign.json"));
//!
//! let toblen = store
//!     .create(CharacterDraft::new("Toblen Stonehill").with_race("Human"))
//!     .expect("valid character");
//!
//! for character in store.query::<Character>().search("stone").iter() {
//!     println!("{} ({})", character.name, store.display_name(&toblen.id));
//! }
//! ```

// The derive expands to `::chronicle_core::...` paths.
extern crate self as chronicle_core;

pub mod cascade;
pub mod collection;
pub mod config;
pub mod error;
pub mod id;
pub mod persist;
pub mod record;
pub mod relationship;
pub mod seed;
pub mod store;
pub mod testing;
pub mod view;
pub mod world;

// Trait and derive share a name, like serde's.
pub use chronicle_macros::Record;
pub use record::Record;

// Primary public API
pub use cascade::{CascadeAction, CascadeRule, CascadeTable};
pub use collection::Collection;
pub use config::{ConfigError, StoreConfig};
pub use error::{ErrorKind, PersistError, StoreError};
pub use id::{EntityId, IdScheme};
pub use persist::{Document, FileSlot, MemorySlot, StorageSlot};
pub use record::{CollectionName, Draft, EntityRef, Patch, Timestamped};
pub use relationship::{Relationship, RelationshipDraft, RelationshipKind, RelationshipPatch};
pub use store::{Activity, ActivityKind, LoadOutcome, ScopeStats, Store, Stored};
pub use testing::TestHarness;
pub use view::{Forest, Query, TreeNode};
pub use world::{
    Campaign, CampaignDraft, CampaignPatch, Character, CharacterDraft, CharacterPatch, Item,
    ItemDraft, ItemPatch, Location, LocationDraft, LocationPatch, Note, NoteDraft, NotePatch,
};
