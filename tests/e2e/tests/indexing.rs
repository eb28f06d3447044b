//! Store/update/delete keep the module table and CMI index consistent
//! (spec §4.3, §4.5, §8 literal scenarios "store and find by keyword",
//! "module pin", "update re-embeds", "delete purges CMI").

use fedmem_core::cmi::SearchOptions;
use fedmem_core::module::UpdateRequest;
use fedmem_core::models::Metadata;
use fedmem_e2e_tests::harness::TestBackend;
use serde_json::json;

#[tokio::test]
async fn store_then_find_by_keyword() {
    let backend = TestBackend::new();
    backend
        .pipeline
        .store("t1", "the authentication bug causes a crash on login", Metadata::new(), None)
        .await
        .unwrap();

    let results = backend.pipeline.search("t1", "authentication crash", Default::default()).await.unwrap();
    assert!(!results.is_empty());
}

#[tokio::test]
async fn explicit_module_id_pins_routing() {
    let backend = TestBackend::new();
    // Content with no technical vocabulary at all, explicitly pinned to
    // "creative" — keyword-voting alone would have fallen back to "personal".
    let id = backend
        .pipeline
        .store("t1", "a short poem about the sea at dusk", Metadata::new(), Some("creative".to_string()))
        .await
        .unwrap();

    let record = backend.pipeline.get("t1", "creative", id).await.unwrap();
    assert!(record.is_some());

    let options = SearchOptions { modules: Some(vec!["creative".to_string()]), ..Default::default() };
    let results = backend.pipeline.search("t1", "sea at dusk", options).await.unwrap();
    assert!(results.iter().any(|r| r.module_id == "creative" && r.memory_id == id));
}

#[tokio::test]
async fn update_changes_content_and_reembeds() {
    let backend = TestBackend::new();
    let id = backend
        .pipeline
        .store("t1", "meeting with John about the roadmap", Metadata::new(), Some("work".to_string()))
        .await
        .unwrap();

    let before = backend.pipeline.search("t1", "roadmap meeting", Default::default()).await.unwrap();
    assert!(before.iter().any(|r| r.memory_id == id));

    let updated = backend
        .pipeline
        .update(
            "t1",
            "work",
            id,
            UpdateRequest { content: Some("rescheduled the roadmap meeting to Friday".to_string()), metadata: None },
        )
        .await
        .unwrap();
    assert!(updated);

    let record = backend.pipeline.get("t1", "work", id).await.unwrap().unwrap();
    assert_eq!(record.content, "rescheduled the roadmap meeting to Friday");

    let after = backend.pipeline.search("t1", "rescheduled Friday", Default::default()).await.unwrap();
    assert!(after.iter().any(|r| r.memory_id == id));
}

#[tokio::test]
async fn update_replaces_metadata_wholesale() {
    let backend = TestBackend::new();
    let mut metadata = Metadata::new();
    metadata.set("tags", json!(["one", "two"]));
    let id = backend.pipeline.store("t1", "a note with tags", metadata, Some("personal".to_string())).await.unwrap();

    let mut replacement = Metadata::new();
    replacement.set("tags", json!(["three"]));
    backend
        .pipeline
        .update("t1", "personal", id, UpdateRequest { content: None, metadata: Some(replacement) })
        .await
        .unwrap();

    let record = backend.pipeline.get("t1", "personal", id).await.unwrap().unwrap();
    assert_eq!(record.metadata.string_list("tags"), vec!["three".to_string()]);
}

#[tokio::test]
async fn delete_removes_from_module_table_and_search() {
    let backend = TestBackend::new();
    let id = backend
        .pipeline
        .store("t1", "a memory that will be deleted", Metadata::new(), Some("personal".to_string()))
        .await
        .unwrap();

    let deleted = backend.pipeline.delete("t1", "personal", id).await.unwrap();
    assert!(deleted);

    let record = backend.pipeline.get("t1", "personal", id).await.unwrap();
    assert!(record.is_none());

    let results = backend.pipeline.search("t1", "memory that will be deleted", Default::default()).await.unwrap();
    assert!(!results.iter().any(|r| r.memory_id == id));

    // Deleting again is a no-op, not an error.
    let deleted_again = backend.pipeline.delete("t1", "personal", id).await.unwrap();
    assert!(!deleted_again);
}
