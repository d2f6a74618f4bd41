//! Sync detection and write/delete façade tests.
//!
//! Run with: cargo test --test sync_tests

use std::sync::Arc;

use readstore::{
    InMemoryPayloadStore, JsonFileStore, Manifest, ManifestRegistry, MemoryRecord, Payload,
    PayloadStore, ProjectionConfig, ProjectionController, Value,
};

fn article_registry() -> ManifestRegistry {
    ManifestRegistry::new().with(
        "Article",
        Manifest::new().bare("ID").flag("Title", true).flag("Teaser", false),
    )
}

fn memory_controller() -> (ProjectionController, Arc<InMemoryPayloadStore>) {
    let store = Arc::new(InMemoryPayloadStore::new());
    let controller =
        ProjectionController::new(ProjectionConfig::default(), article_registry(), store.clone());
    (controller, store)
}

fn article(title: &str) -> MemoryRecord {
    MemoryRecord::new("Article", title)
        .field("ID", "article-1")
        .field("Title", title)
}

#[test]
fn test_in_sync_after_write_until_record_changes() {
    let (mut controller, _store) = memory_controller();
    let record = article("Hello");

    assert!(!controller.is_in_sync(&record).unwrap());
    assert!(controller.write_to_store(&record).unwrap());
    assert!(controller.is_in_sync(&record).unwrap());

    let changed = article("Hello again");
    assert!(!controller.is_in_sync(&changed).unwrap());
}

#[test]
fn test_write_is_idempotent() {
    let (mut controller, store) = memory_controller();
    let record = article("Hello");

    assert!(controller.write_to_store(&record).unwrap());
    let first = store.read("article-1").checksum();

    assert!(controller.write_to_store(&record).unwrap());
    let second = store.read("article-1").checksum();

    assert_eq!(first, second);
}

#[test]
fn test_validation_errors_block_the_write() {
    let (mut controller, store) = memory_controller();
    let incomplete = MemoryRecord::new("Article", "Draft").field("ID", "article-1");

    assert!(!controller.write_to_store(&incomplete).unwrap());
    assert!(store.read("article-1").is_empty());
    assert_eq!(
        controller.validation_errors(),
        &["\"Title\" is required for Article \"Draft\"".to_string()]
    );

    // Fixing the record unblocks the write.
    let fixed = article("Draft");
    assert!(controller.write_to_store(&fixed).unwrap());
    assert!(controller.validation_errors().is_empty());
}

#[test]
fn test_sync_check_ignores_missing_required_data() {
    let (mut controller, _store) = memory_controller();
    let incomplete = MemoryRecord::new("Article", "Draft").field("ID", "article-1");

    // Must neither fail nor populate the error channel.
    assert!(!controller.is_in_sync(&incomplete).unwrap());
    assert!(controller.validation_errors().is_empty());
}

#[test]
fn test_sync_check_does_not_clobber_write_errors() {
    let (mut controller, _store) = memory_controller();
    let incomplete = MemoryRecord::new("Article", "Draft").field("ID", "article-1");

    assert!(!controller.write_to_store(&incomplete).unwrap());
    let errors = controller.validation_errors().to_vec();

    controller.is_in_sync(&incomplete).unwrap();
    assert_eq!(controller.validation_errors(), errors.as_slice());
}

#[test]
fn test_checksum_is_insensitive_to_stored_key_order() {
    let (mut controller, store) = memory_controller();
    let record = article("Hello");
    assert!(controller.write_to_store(&record).unwrap());

    // Rewrite the stored document with the same content in another order.
    let stored = store.read("article-1");
    let reordered: Payload = stored
        .iter()
        .rev()
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();
    store.write("article-1", &reordered).unwrap();

    assert!(controller.is_in_sync(&record).unwrap());
}

#[test]
fn test_numeric_strings_stay_in_sync_through_the_file_store() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(JsonFileStore::new(dir.path()).unwrap());
    let registry = ManifestRegistry::new()
        .with("Counter", Manifest::new().bare("ID").flag("Count", true));
    let mut controller = ProjectionController::new(ProjectionConfig::default(), registry, store);

    // The source field holds a numeric-looking string; the file store
    // persists it as a JSON number. Both sides must checksum alike.
    let record = MemoryRecord::new("Counter", "c")
        .field("ID", "counter-1")
        .field("Count", "42");

    assert!(controller.write_to_store(&record).unwrap());
    assert!(controller.is_in_sync(&record).unwrap());
}

#[test]
fn test_store_key_fallback_namespaces_unkeyed_records() {
    let (mut controller, store) = memory_controller();
    let unkeyed = MemoryRecord::new("Article", "Hello")
        .field("ID", "")
        .field("Title", "Hello");

    assert!(controller.write_to_store(&unkeyed).unwrap());
    assert!(!store.read("ID").is_empty());
}

#[test]
fn test_remove_uses_the_raw_key_without_fallback() {
    let (mut controller, store) = memory_controller();
    let unkeyed = MemoryRecord::new("Article", "Hello")
        .field("ID", "")
        .field("Title", "Hello");

    assert!(controller.write_to_store(&unkeyed).unwrap());
    // Delete keys off the raw (empty) attribute value, so the payload
    // written under the fallback key survives. Intentional asymmetry.
    controller.remove_from_store(&unkeyed).unwrap();
    assert!(!store.read("ID").is_empty());
}

#[test]
fn test_remove_then_read_is_empty() {
    let (mut controller, store) = memory_controller();
    let record = article("Hello");

    assert!(controller.write_to_store(&record).unwrap());
    controller.remove_from_store(&record).unwrap();
    assert!(store.read("article-1").is_empty());

    // Removing again is not an error.
    controller.remove_from_store(&record).unwrap();
}

#[test]
fn test_written_payload_uses_transformed_keys() {
    let (mut controller, store) = memory_controller();
    let record = article("Hello");

    assert!(controller.write_to_store(&record).unwrap());
    let stored = store.read("article-1");
    assert_eq!(stored.get("id"), Some(&Value::Text("article-1".into())));
    assert_eq!(stored.get("title"), Some(&Value::Text("Hello".into())));
    assert!(stored.contains_key("teaser"));
}
