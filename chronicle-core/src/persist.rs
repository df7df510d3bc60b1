//! Persistence of the store document.
//!
//! The whole store is one JSON document written to a `StorageSlot` after
//! every mutation. `FileSlot` keeps it on disk; `MemorySlot` keeps it in a
//! shared buffer for tests.

use crate::collection::Collection;
use crate::error::PersistError;
use crate::id::EntityId;
use crate::record::Record;
use crate::relationship::Relationship;
use crate::world::{Campaign, Character, Item, Location, Note};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::warn;

/// Current document version.
pub const DOCUMENT_VERSION: u32 = 1;

fn default_version() -> u32 {
    DOCUMENT_VERSION
}

/// The persisted form of a store: every collection plus the selected scope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Document {
    /// Documents written before versioning load as version 1.
    #[serde(default = "default_version")]
    pub version: u32,
    pub campaigns: Collection<Campaign>,
    pub characters: Collection<Character>,
    pub locations: Collection<Location>,
    pub items: Collection<Item>,
    pub notes: Collection<Note>,
    pub relationships: Collection<Relationship>,
    pub current_campaign: Option<EntityId>,
}

impl Default for Document {
    fn default() -> Self {
        Self {
            version: DOCUMENT_VERSION,
            campaigns: Collection::new(),
            characters: Collection::new(),
            locations: Collection::new(),
            items: Collection::new(),
            notes: Collection::new(),
            relationships: Collection::new(),
            current_campaign: None,
        }
    }
}

impl Document {
    /// Parse a persisted document.
    ///
    /// Newer versions are refused. Duplicate ids (from hand edits) are
    /// dropped, keeping the first occurrence.
    pub fn parse(text: &str) -> Result<Self, PersistError> {
        let mut doc: Document = serde_json::from_str(text)?;
        if doc.version > DOCUMENT_VERSION {
            return Err(PersistError::UnsupportedVersion {
                supported: DOCUMENT_VERSION,
                found: doc.version,
            });
        }
        doc.version = DOCUMENT_VERSION;

        let dropped: Vec<EntityId> = [
            doc.campaigns.dedupe(),
            doc.characters.dedupe(),
            doc.locations.dedupe(),
            doc.items.dedupe(),
            doc.notes.dedupe(),
            doc.relationships.dedupe(),
        ]
        .concat();
        if !dropped.is_empty() {
            warn!(count = dropped.len(), ids = ?dropped, "Dropped records with duplicate ids");
        }

        Ok(doc)
    }

    /// Serialize as pretty-printed JSON.
    pub fn to_json(&self) -> Result<String, PersistError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Ids of characters, locations and items in `scope` whose name appears
    /// in `text`, ignoring case.
    pub fn link_entities(&self, scope: Option<&EntityId>, text: &str) -> Vec<EntityId> {
        let Some(scope) = scope else {
            return Vec::new();
        };
        let haystack = text.to_lowercase();
        let mentioned = |record: &dyn Mentionable| {
            record.scope_id() == scope
                && !record.name().trim().is_empty()
                && haystack.contains(&record.name().to_lowercase())
        };

        let characters = self.characters.iter().map(|r| r as &dyn Mentionable);
        let locations = self.locations.iter().map(|r| r as &dyn Mentionable);
        let items = self.items.iter().map(|r| r as &dyn Mentionable);

        characters
            .chain(locations)
            .chain(items)
            .filter(|r| mentioned(*r))
            .map(|r| r.entity_id().clone())
            .collect()
    }
}

/// Records a note can mention by name.
trait Mentionable {
    fn entity_id(&self) -> &EntityId;
    fn scope_id(&self) -> &EntityId;
    fn name(&self) -> &str;
}

macro_rules! mentionable {
    ($($ty:ty),*) => {
        $(
            impl Mentionable for $ty {
                fn entity_id(&self) -> &EntityId {
                    &self.id
                }
                fn scope_id(&self) -> &EntityId {
                    &self.campaign_id
                }
                fn name(&self) -> &str {
                    self.display_name()
                }
            }
        )*
    };
}

mentionable!(Character, Location, Item);

// ============================================================================
// Storage slots
// ============================================================================

/// A durable place holding one serialized document.
pub trait StorageSlot: Send {
    /// Read the stored text. `None` when nothing has been stored yet.
    fn read(&self) -> Result<Option<String>, PersistError>;

    /// Replace the stored text.
    fn write(&mut self, contents: &str) -> Result<(), PersistError>;

    /// Keep a copy of unreadable contents before they are overwritten.
    fn backup(&mut self, _contents: &str) -> Result<(), PersistError> {
        Ok(())
    }

    /// Human-readable location, for logs.
    fn describe(&self) -> String;
}

/// A JSON file on disk.
#[derive(Debug, Clone)]
pub struct FileSlot {
    path: PathBuf,
}

impl FileSlot {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Path used for the copy of an unreadable document.
    pub fn backup_path(&self) -> PathBuf {
        let mut name = self.path.as_os_str().to_owned();
        name.push(".corrupt");
        PathBuf::from(name)
    }

    fn directory(&self) -> &Path {
        match self.path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        }
    }
}

impl StorageSlot for FileSlot {
    fn read(&self) -> Result<Option<String>, PersistError> {
        match std::fs::read_to_string(&self.path) {
            Ok(text) if text.trim().is_empty() => Ok(None),
            Ok(text) => Ok(Some(text)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Write to a temp file beside the target, then rename it into place.
    fn write(&mut self, contents: &str) -> Result<(), PersistError> {
        let dir = self.directory();
        std::fs::create_dir_all(dir)?;

        let mut temp = tempfile::NamedTempFile::new_in(dir)?;
        temp.write_all(contents.as_bytes())?;
        temp.as_file().sync_all()?;
        temp.persist(&self.path).map_err(|e| PersistError::Io(e.error))?;
        Ok(())
    }

    fn backup(&mut self, contents: &str) -> Result<(), PersistError> {
        std::fs::write(self.backup_path(), contents)?;
        Ok(())
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

#[derive(Debug, Default)]
struct MemoryState {
    contents: Option<String>,
    fail_writes: bool,
    write_count: usize,
    backups: Vec<String>,
}

/// An in-memory slot. Clones share the same buffer.
#[derive(Debug, Clone, Default)]
pub struct MemorySlot {
    state: Arc<Mutex<MemoryState>>,
}

impl MemorySlot {
    /// An empty slot.
    pub fn new() -> Self {
        Self::default()
    }

    /// A slot already holding `contents`.
    pub fn with_contents(contents: impl Into<String>) -> Self {
        let slot = Self::new();
        slot.lock().contents = Some(contents.into());
        slot
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// The stored text.
    pub fn contents(&self) -> Option<String> {
        self.lock().contents.clone()
    }

    /// Make subsequent writes fail (or succeed again).
    pub fn set_fail_writes(&self, fail: bool) {
        self.lock().fail_writes = fail;
    }

    /// Number of successful writes.
    pub fn write_count(&self) -> usize {
        self.lock().write_count
    }

    /// Unreadable documents that were backed up.
    pub fn backups(&self) -> Vec<String> {
        self.lock().backups.clone()
    }
}

impl StorageSlot for MemorySlot {
    fn read(&self) -> Result<Option<String>, PersistError> {
        Ok(self.lock().contents.clone())
    }

    fn write(&mut self, contents: &str) -> Result<(), PersistError> {
        let mut state = self.lock();
        if state.fail_writes {
            return Err(PersistError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                "storage quota exceeded",
            )));
        }
        state.contents = Some(contents.to_string());
        state.write_count += 1;
        Ok(())
    }

    fn backup(&mut self, contents: &str) -> Result<(), PersistError> {
        self.lock().backups.push(contents.to_string());
        Ok(())
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::seed::seed_document;

    #[test]
    fn test_missing_version_loads_as_current() {
        let doc = Document::parse(r#"{"campaigns": [], "currentCampaign": null}"#).unwrap();
        assert_eq!(doc.version, DOCUMENT_VERSION);
        assert!(doc.characters.is_empty());
    }

    #[test]
    fn test_newer_version_rejected() {
        let err = Document::parse(r#"{"version": 99}"#).unwrap_err();
        assert!(matches!(
            err,
            PersistError::UnsupportedVersion { found: 99, .. }
        ));
    }

    #[test]
    fn test_garbage_rejected() {
        assert!(matches!(
            Document::parse("{not json"),
            Err(PersistError::Json(_))
        ));
    }

    #[test]
    fn test_document_round_trip() {
        let doc = seed_document();
        let text = doc.to_json().unwrap();
        assert!(text.contains("\"currentCampaign\": \"campaign_1\""));
        assert_eq!(Document::parse(&text).unwrap(), doc);
    }

    #[test]
    fn test_parse_drops_duplicate_ids() {
        let text = r#"{
            "campaigns": [
                {"id": "c1", "name": "A", "created": "2024-01-15", "lastModified": "2024-01-15"},
                {"id": "c1", "name": "B", "created": "2024-01-15", "lastModified": "2024-01-15"}
            ]
        }"#;
        let doc = Document::parse(text).unwrap();
        assert_eq!(doc.campaigns.len(), 1);
        assert_eq!(doc.campaigns.iter().next().unwrap().name, "A");
    }

    #[test]
    fn test_link_entities_is_scoped_and_case_insensitive() {
        let doc = seed_document();
        let scope = EntityId::from("campaign_1");
        let links = doc.link_entities(Some(&scope), "we met SILDAR HALLWINTER in neverwinter");
        assert_eq!(
            links,
            vec![EntityId::from("char_2"), EntityId::from("location_1")]
        );

        let other = EntityId::from("campaign_2");
        assert!(doc.link_entities(Some(&other), "Sildar Hallwinter").is_empty());
        assert!(doc.link_entities(None, "Sildar Hallwinter").is_empty());
    }

    #[test]
    fn test_memory_slot_shares_state() {
        let slot = MemorySlot::new();
        let mut handle = slot.clone();
        handle.write("{}").unwrap();
        assert_eq!(slot.contents().as_deref(), Some("{}"));
        assert_eq!(slot.write_count(), 1);

        slot.set_fail_writes(true);
        assert!(handle.write("[]").is_err());
        assert_eq!(slot.contents().as_deref(), Some("{}"));
    }

    #[test]
    fn test_file_slot_write_and_read() {
        let dir = tempfile::tempdir().unwrap();
        let mut slot = FileSlot::new(dir.path().join("nested").join("data.json"));
        assert_eq!(slot.read().unwrap(), None);

        slot.write("{\"version\": 1}").unwrap();
        assert_eq!(slot.read().unwrap().as_deref(), Some("{\"version\": 1}"));

        slot.write("{}").unwrap();
        assert_eq!(slot.read().unwrap().as_deref(), Some("{}"));
    }

    #[test]
    fn test_file_slot_backup_path() {
        let slot = FileSlot::new("/tmp/chronicle.json");
        assert_eq!(slot.backup_path(), PathBuf::from("/tmp/chronicle.json.corrupt"));
    }
}
