//! Change notifier fan-out (spec §4.6 / §6 "Subscriber transport"):
//! per-tenant topics, multiple subscribers each get every event, tenants
//! never see each other's events, and shutdown is a terminal broadcast.

use fedmem_core::models::Metadata;
use fedmem_core::notifier::ChangeEvent;
use fedmem_e2e_tests::harness::TestBackend;

#[tokio::test]
async fn subscribers_receive_create_update_delete_events() {
    let backend = TestBackend::new();
    let mut rx = backend.notifier.subscribe("t1");

    let id = backend.pipeline.store("t1", "a memory to watch", Metadata::new(), Some("personal".to_string())).await.unwrap();
    match rx.recv().await.unwrap() {
        ChangeEvent::MemoryCreated { module_id, memory_id, .. } => {
            assert_eq!(module_id, "personal");
            assert_eq!(memory_id, id);
        }
        other => panic!("expected MemoryCreated, got {other:?}"),
    }

    backend
        .pipeline
        .update(
            "t1",
            "personal",
            id,
            fedmem_core::module::UpdateRequest { content: Some("updated content".to_string()), metadata: None },
        )
        .await
        .unwrap();
    assert!(matches!(rx.recv().await.unwrap(), ChangeEvent::MemoryUpdated { .. }));

    backend.pipeline.delete("t1", "personal", id).await.unwrap();
    assert!(matches!(rx.recv().await.unwrap(), ChangeEvent::MemoryDeleted { .. }));
}

#[tokio::test]
async fn multiple_subscribers_on_same_tenant_all_see_the_event() {
    let backend = TestBackend::new();
    let mut rx1 = backend.notifier.subscribe("t1");
    let mut rx2 = backend.notifier.subscribe("t1");

    backend.pipeline.store("t1", "fan-out check", Metadata::new(), Some("personal".to_string())).await.unwrap();

    assert!(matches!(rx1.recv().await.unwrap(), ChangeEvent::MemoryCreated { .. }));
    assert!(matches!(rx2.recv().await.unwrap(), ChangeEvent::MemoryCreated { .. }));
}

#[tokio::test]
async fn events_do_not_cross_tenant_topics() {
    let backend = TestBackend::new();
    let mut rx_a = backend.notifier.subscribe("tenant-a");
    let rx_b = backend.notifier.subscribe("tenant-b");

    backend.pipeline.store("tenant-a", "a only", Metadata::new(), Some("personal".to_string())).await.unwrap();

    assert!(matches!(rx_a.recv().await.unwrap(), ChangeEvent::MemoryCreated { .. }));
    assert_eq!(backend.notifier.subscriber_count("tenant-b"), 1);
    drop(rx_b);
}

#[tokio::test]
async fn shutdown_broadcasts_a_terminal_event_to_every_tenant() {
    let backend = TestBackend::new();
    let mut rx_a = backend.notifier.subscribe("tenant-a");
    let mut rx_b = backend.notifier.subscribe("tenant-b");

    backend.notifier.shutdown();

    assert!(matches!(rx_a.recv().await.unwrap(), ChangeEvent::ServerShutdown { .. }));
    assert!(matches!(rx_b.recv().await.unwrap(), ChangeEvent::ServerShutdown { .. }));
}
