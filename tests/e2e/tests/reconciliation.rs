//! Background reconciliation (spec §4.5 Open Questions: "continuous
//! reconciliation"): backfills module rows missing from the CMI and purges
//! CMI rows whose module row is gone.

use fedmem_core::models::Metadata;
use fedmem_e2e_tests::harness::TestBackend;

#[tokio::test]
async fn backfills_a_memory_missing_from_the_cmi() {
    let backend = TestBackend::new();
    let id = backend
        .pipeline
        .store("t1", "a memory whose CMI row got lost", Metadata::new(), Some("personal".to_string()))
        .await
        .unwrap();

    // Simulate an index failure that left the module row intact but the
    // CMI row missing.
    backend.cmi.cmi_table().delete("t1", "personal", id).await.unwrap();
    let results_before = backend.pipeline.search("t1", "memory whose CMI row", Default::default()).await.unwrap();
    assert!(!results_before.iter().any(|r| r.memory_id == id));

    let report = backend.reconcile_once().await;
    assert_eq!(report.backfilled, 1);
    assert_eq!(report.purged, 0);

    let results_after = backend.pipeline.search("t1", "memory whose CMI row", Default::default()).await.unwrap();
    assert!(results_after.iter().any(|r| r.memory_id == id));
}

#[tokio::test]
async fn purges_a_cmi_row_whose_module_row_is_gone() {
    let backend = TestBackend::new();
    let id = backend
        .pipeline
        .store("t1", "a memory that will be force-deleted from its module table", Metadata::new(), Some("personal".to_string()))
        .await
        .unwrap();

    // Force-delete straight from the module table, bypassing the pipeline
    // so the CMI row is left behind (an orphan).
    let module = backend.registry.get("personal").unwrap();
    module.delete("t1", id).await.unwrap();

    let report = backend.reconcile_once().await;
    assert_eq!(report.purged, 1);
    assert_eq!(report.backfilled, 0);

    let entry = backend.cmi.cmi_table().get("t1", "personal", id).await.unwrap();
    assert!(entry.is_none());
}

#[tokio::test]
async fn reconciling_an_already_consistent_tenant_is_a_no_op() {
    let backend = TestBackend::new();
    backend.pipeline.store("t1", "a normal memory", Metadata::new(), Some("personal".to_string())).await.unwrap();

    let report = backend.reconcile_once().await;
    assert_eq!(report.backfilled, 0);
    assert_eq!(report.purged, 0);
}
