//! Persistence: file slots, round trips, self-healing startup and write
//! failures.

use chronicle_core::testing::{assert_persisted, TestHarness};
use chronicle_core::{
    Campaign, Character, CharacterDraft, Document, EntityId, ErrorKind, FileSlot, Item,
    LoadOutcome, MemorySlot, PersistError, Relationship, Store, StoreConfig, StoreError,
};
use tempfile::TempDir;

fn file_config(dir: &TempDir) -> StoreConfig {
    StoreConfig::new().with_data_path(dir.path().join("chronicle.json"))
}

#[test]
fn test_first_open_seeds_file() {
    let dir = TempDir::new().expect("Failed to create temp directory");
    let config = file_config(&dir);

    let store = Store::open_file(config.clone());
    assert_eq!(store.load_outcome(), &LoadOutcome::Seeded);
    assert!(config.data_path.exists(), "Data file should exist after seeding");

    let text = std::fs::read_to_string(&config.data_path).unwrap();
    assert_eq!(&Document::parse(&text).unwrap(), store.document());
}

#[test]
fn test_file_round_trip_preserves_order_and_content() {
    let dir = TempDir::new().expect("Failed to create temp directory");
    let config = file_config(&dir);

    let mut store = Store::open_file(config.clone());
    store.create(CharacterDraft::new("Toblen Stonehill")).unwrap();
    store.create(CharacterDraft::new("Daran Edermath")).unwrap();
    store
        .remove::<Character>(&EntityId::from("char_1"))
        .unwrap();
    let expected = store.document().clone();
    drop(store);

    let reopened = Store::open_file(config);
    assert_eq!(reopened.load_outcome(), &LoadOutcome::Loaded);
    assert_eq!(reopened.document(), &expected);

    let names: Vec<_> = reopened
        .query::<Character>()
        .iter()
        .map(|c| c.name.as_str())
        .collect();
    assert_eq!(names, vec!["Sildar Hallwinter", "Toblen Stonehill", "Daran Edermath"]);
}

#[test]
fn test_export_round_trip() {
    let harness = TestHarness::new();
    let json = harness.store.export_json().unwrap();
    assert_eq!(&Document::parse(&json).unwrap(), harness.store.document());
    assert!(json.contains("\"version\": 1"));
}

#[test]
fn test_corrupt_file_is_backed_up_and_replaced() {
    let dir = TempDir::new().expect("Failed to create temp directory");
    let config = file_config(&dir);
    std::fs::write(&config.data_path, "{\"campaigns\": [oops").unwrap();

    let store = Store::open_file(config.clone());
    assert!(matches!(store.load_outcome(), LoadOutcome::Recovered { .. }));
    assert_eq!(store.document().characters.len(), 2);

    let backup = FileSlot::new(&config.data_path).backup_path();
    assert_eq!(
        std::fs::read_to_string(backup).unwrap(),
        "{\"campaigns\": [oops"
    );

    // The replacement was written immediately
    let text = std::fs::read_to_string(&config.data_path).unwrap();
    assert!(Document::parse(&text).is_ok());
}

#[test]
fn test_corrupt_memory_slot_self_heals() {
    let harness = TestHarness::with_contents("not json at all");
    assert!(matches!(
        harness.store.load_outcome(),
        LoadOutcome::Recovered { .. }
    ));
    assert_eq!(harness.slot.backups(), vec!["not json at all".to_string()]);
    assert_persisted(&harness);
}

#[test]
fn test_newer_version_treated_as_unreadable() {
    let harness = TestHarness::with_contents(r#"{"version": 7, "campaigns": []}"#);
    match harness.store.load_outcome() {
        LoadOutcome::Recovered { reason } => assert!(reason.contains('7')),
        other => panic!("Expected recovery, got {other:?}"),
    }
}

#[test]
fn test_unversioned_document_loads() {
    let harness = TestHarness::with_contents(
        r#"{
            "campaigns": [
                {"id": "campaign_1", "name": "Phandelver", "created": "2024-01-15", "lastModified": "2024-07-06"}
            ],
            "characters": [
                {
                    "id": "char_1",
                    "name": "Gundren Rockseeker",
                    "type": "NPC",
                    "relationships": ["char_2"],
                    "campaignId": "campaign_1"
                }
            ],
            "currentCampaign": "campaign_1"
        }"#,
    );
    assert_eq!(harness.store.load_outcome(), &LoadOutcome::Loaded);
    assert_eq!(harness.names::<Character>(), vec!["Gundren Rockseeker"]);
}

#[test]
fn test_sparse_records_load_without_recovery() {
    let harness = TestHarness::with_contents(
        r#"{
            "campaigns": [{"id": "c9", "name": "Homebrew"}],
            "characters": [
                {"id": "char_9", "name": "Wandering Bard"},
                {"id": "char_10", "name": "Ilvara", "campaignId": "c9"}
            ],
            "items": [
                {"id": "item_9", "name": "Lute", "magical": null, "campaignId": "c9"}
            ],
            "relationships": [
                {"id": "rel_9", "from": "char_10", "to": "item_9", "type": "owns", "strength": null, "campaignId": "c9"},
                {"id": "rel_10", "from": "char_10", "to": "char_9", "type": "rival", "strength": 99, "campaignId": "c9"}
            ],
            "currentCampaign": "c9"
        }"#,
    );
    assert_eq!(harness.store.load_outcome(), &LoadOutcome::Loaded);

    let campaign = harness.store.get::<Campaign>(&EntityId::from("c9")).unwrap();
    assert_eq!(campaign.created, None);
    assert_eq!(campaign.last_modified, None);

    // No campaignId: kept, but outside every scope
    let stray = harness.store.get::<Character>(&EntityId::from("char_9")).unwrap();
    assert!(stray.campaign_id.is_empty());
    assert_eq!(harness.names::<Character>(), vec!["Ilvara"]);

    assert!(!harness.store.get::<Item>(&EntityId::from("item_9")).unwrap().magical);
    let strengths: Vec<u8> = harness
        .store
        .query::<Relationship>()
        .iter()
        .map(|r| r.strength)
        .collect();
    assert_eq!(strengths, vec![5, 5]);
}

#[test]
fn test_sparse_campaign_survives_round_trip() {
    let harness = TestHarness::with_contents(r#"{"campaigns": [{"id": "c9", "name": "Homebrew"}]}"#);
    let json = harness.store.export_json().unwrap();
    assert!(!json.contains("\"created\""));
    assert_eq!(&Document::parse(&json).unwrap(), harness.store.document());
}

#[test]
fn test_empty_slot_without_seed() {
    let slot = MemorySlot::new();
    let store = Store::open(slot.clone(), StoreConfig::new().without_seed());
    assert_eq!(store.load_outcome(), &LoadOutcome::Empty);
    assert!(store.document().campaigns.is_empty());
    assert_eq!(store.current_scope(), None);
}

#[test]
fn test_write_failure_is_reported_not_fatal() {
    let mut harness = TestHarness::new();
    let writes = harness.slot.write_count();
    harness.slot.set_fail_writes(true);

    let character = harness
        .store
        .create(CharacterDraft::new("Nundro Rockseeker"))
        .unwrap();
    assert!(harness.has::<Character>(&character.id));
    assert!(matches!(
        harness.store.last_write_error(),
        Some(PersistError::Io(_))
    ));
    assert_eq!(harness.slot.write_count(), writes);

    harness.slot.set_fail_writes(false);
    harness
        .store
        .create(CharacterDraft::new("Tharden Rockseeker"))
        .unwrap();
    assert!(harness.store.last_write_error().is_none());
    assert_persisted(&harness);
}

#[test]
fn test_flush_surfaces_write_error() {
    let mut harness = TestHarness::new();
    harness.slot.set_fail_writes(true);

    let err = harness.store.flush().unwrap_err();
    assert!(matches!(err, StoreError::Persistence(_)));
    assert_eq!(err.kind(), ErrorKind::Persistence);
    assert_eq!(err.user_message(), "Changes may not be saved.");
}
