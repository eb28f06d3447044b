//! Federated search ranking and dedup (spec §4.2 searchMemories steps 5-6):
//! results rank by similarity × importance, and a memory that could be
//! reached through more than one routed module still appears once.

use fedmem_core::models::Metadata;
use fedmem_e2e_tests::harness::TestBackend;
use serde_json::json;

#[tokio::test]
async fn higher_importance_outranks_lower_importance_at_similar_relevance() {
    let backend = TestBackend::new();

    let mut low = Metadata::new();
    low.set("importance", json!(0.1));
    backend
        .pipeline
        .store("t1", "quarterly roadmap planning meeting notes", low, Some("work".to_string()))
        .await
        .unwrap();

    let mut high = Metadata::new();
    high.set("importance", json!(0.95));
    let high_id = backend
        .pipeline
        .store("t1", "quarterly roadmap planning meeting notes", high, Some("work".to_string()))
        .await
        .unwrap();

    let results = backend.pipeline.search("t1", "quarterly roadmap planning", Default::default()).await.unwrap();
    assert!(results.len() >= 2);
    assert_eq!(results[0].memory_id, high_id);
    assert!(results[0].importance > results[1].importance);
}

#[tokio::test]
async fn each_memory_appears_at_most_once_per_search() {
    let backend = TestBackend::new();
    let id = backend
        .pipeline
        .store("t1", "a memory reachable through more than one routing signal", Metadata::new(), Some("work".to_string()))
        .await
        .unwrap();

    let results = backend
        .pipeline
        .search("t1", "memory reachable through more than one routing signal", Default::default())
        .await
        .unwrap();

    let occurrences = results.iter().filter(|r| r.memory_id == id).count();
    assert_eq!(occurrences, 1);
}

#[tokio::test]
async fn min_score_filters_out_weak_matches() {
    let backend = TestBackend::new();
    backend.pipeline.store("t1", "completely unrelated content about gardening", Metadata::new(), Some("personal".to_string())).await.unwrap();

    let options = fedmem_core::cmi::SearchOptions { min_score: 0.999, ..Default::default() };
    let results = backend.pipeline.search("t1", "quantum computing architecture", options).await.unwrap();
    assert!(results.is_empty());
}
