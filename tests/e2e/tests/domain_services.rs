//! Domain services (spec §4.4): Project/Task with dependency edges and
//! subtasks, and Person/Household/Ministry/Attendance with a per-module
//! custom-field registry — both stateless wrappers over the generic
//! memory substrate.

use fedmem_core::domain::people::{CustomFieldDefinition, CustomFieldType};
use fedmem_core::FedMemError;
use fedmem_e2e_tests::harness::TestBackend;

#[tokio::test]
async fn project_task_and_dependency_lifecycle() {
    let backend = TestBackend::new();
    let project_id = backend.projects.create_project("t1", "Website Relaunch", "Rebuild the marketing site").await.unwrap();

    let design_task = backend.projects.create_task("t1", project_id, "Design mockups", "").await.unwrap();
    let build_task = backend.projects.create_task("t1", project_id, "Build pages", "").await.unwrap();

    let tasks = backend.projects.list_tasks("t1", project_id).await.unwrap();
    assert_eq!(tasks.len(), 2);

    let updated = backend.projects.add_subtask("t1", build_task, "Wire up the header").await.unwrap();
    assert!(updated);
    let build_row = backend.projects.get_task("t1", build_task).await.unwrap().unwrap();
    assert_eq!(build_row.metadata.string_list("subtasks"), vec!["Wire up the header".to_string()]);

    let relationship = backend.projects.add_dependency("t1", build_task, design_task).await.unwrap();
    assert_eq!(relationship.kind, "depends_on");

    let deps = backend.projects.dependencies("t1", build_task).await.unwrap();
    assert_eq!(deps.len(), 1);
    assert_eq!(deps[0].target.memory_id, design_task);
}

#[tokio::test]
async fn household_backfills_household_id_onto_members() {
    let backend = TestBackend::new();
    let alice = backend.people.create_person("t1", "Alice", None).await.unwrap();
    let bob = backend.people.create_person("t1", "Bob", None).await.unwrap();

    let household_id = backend.people.create_household("t1", "The Smiths", &[alice, bob]).await.unwrap();

    let alice_row = backend.people.get_person("t1", alice).await.unwrap().unwrap();
    assert_eq!(alice_row.metadata.get("household_id").and_then(|v| v.as_str()), Some(household_id.to_string().as_str()));
}

#[tokio::test]
async fn assigning_the_same_ministry_twice_is_idempotent() {
    let backend = TestBackend::new();
    let person = backend.people.create_person("t1", "Carol", None).await.unwrap();

    backend.people.assign_ministry("t1", person, "worship").await.unwrap();
    backend.people.assign_ministry("t1", person, "worship").await.unwrap();

    let row = backend.people.get_person("t1", person).await.unwrap().unwrap();
    assert_eq!(row.metadata.string_list("ministries"), vec!["worship".to_string()]);
}

#[tokio::test]
async fn attendance_events_are_queryable_by_person() {
    let backend = TestBackend::new();
    let person = backend.people.create_person("t1", "Dana", None).await.unwrap();

    backend.people.record_attendance("t1", person, "sunday_service", chrono::Utc::now()).await.unwrap();
    backend.people.record_attendance("t1", person, "bible_study", chrono::Utc::now()).await.unwrap();

    let events = backend.people.attendance_for_person("t1", person).await.unwrap();
    assert_eq!(events.len(), 2);
}

#[tokio::test]
async fn custom_field_is_validated_against_its_registered_definition() {
    let backend = TestBackend::new();
    let person = backend.people.create_person("t1", "Eli", None).await.unwrap();

    backend
        .people
        .register_custom_field(
            "t1",
            "people",
            CustomFieldDefinition {
                key: "shirt_size".to_string(),
                field_type: CustomFieldType::Enum,
                required: false,
                enum_options: Some(vec!["S".to_string(), "M".to_string(), "L".to_string()]),
                min: None,
                max: None,
                regex: None,
            },
        )
        .await
        .unwrap();

    let ok = backend.people.set_custom_field("t1", "people", person, "shirt_size", serde_json::json!("M")).await.unwrap();
    assert!(ok);

    let err = backend
        .people
        .set_custom_field("t1", "people", person, "shirt_size", serde_json::json!("XXL"))
        .await
        .unwrap_err();
    assert!(matches!(err, FedMemError::Invalid(_)));

    let row = backend.people.get_person("t1", person).await.unwrap().unwrap();
    assert_eq!(row.metadata.get("people.shirt_size").and_then(|v| v.as_str()), Some("M"));
}

#[tokio::test]
async fn setting_an_unregistered_custom_field_is_rejected() {
    let backend = TestBackend::new();
    let person = backend.people.create_person("t1", "Fay", None).await.unwrap();

    let err = backend
        .people
        .set_custom_field("t1", "people", person, "favorite_color", serde_json::json!("blue"))
        .await
        .unwrap_err();
    assert!(matches!(err, FedMemError::Invalid(_)));
}
