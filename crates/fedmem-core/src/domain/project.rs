//! Project-management domain service (spec §4.4): Projects and Tasks with
//! parent/child by `project_id`, dependency edges via CMI relationships,
//! subtask lists held as an array inside a Task's own metadata.

use crate::error::Result;
use crate::models::{MemoryRecord, Metadata, MemoryRef, Relationship};
use crate::module::{EntityField, ImportanceWeights, ModuleConfig, ProcessingPolicy, SignalLexicon, UpdateRequest};
use crate::pipeline::WritePipeline;
use crate::storage::MetadataFilter;
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

pub const PROJECTS_MODULE_ID: &str = "projects";

/// Registered with `ModuleRegistry::register` at startup alongside the six
/// built-in domains — no new `Module` impl required.
pub fn module_config() -> ModuleConfig {
    ModuleConfig {
        id: PROJECTS_MODULE_ID.to_string(),
        display_name: "Projects".to_string(),
        description: "Projects and tasks managed by the project-management domain service.".to_string(),
        searchable_fields: vec!["type".to_string(), "project_id".to_string(), "status".to_string()],
        policy: ProcessingPolicy {
            default_type: "project".to_string(),
            taxonomy: vec![],
            entity_fields: vec![EntityField::Deadlines, EntityField::ActionItems],
            lexicon: SignalLexicon::generic(),
            importance_weights: ImportanceWeights::default(),
        },
    }
}

/// A domain object's own memory id doubles as its domain id (Open Question:
/// spec §4.4 never says the two must differ, and a synthetic second id
/// would just be a copy the pipeline has to keep in sync).
pub struct ProjectService {
    pipeline: Arc<WritePipeline>,
}

impl ProjectService {
    pub fn new(pipeline: Arc<WritePipeline>) -> Self {
        Self { pipeline }
    }

    pub async fn create_project(&self, tenant_id: &str, name: &str, description: &str) -> Result<Uuid> {
        let mut metadata = Metadata::new();
        metadata.set("type", json!("project"));
        metadata.set("name", json!(name));
        metadata.set("status", json!("active"));
        let content = format!("Project: {name}\n{description}");
        self.pipeline.store(tenant_id, &content, metadata, Some(PROJECTS_MODULE_ID.to_string())).await
    }

    pub async fn get_project(&self, tenant_id: &str, project_id: Uuid) -> Result<Option<MemoryRecord>> {
        let row = self.pipeline.get(tenant_id, PROJECTS_MODULE_ID, project_id).await?;
        Ok(row.filter(|r| r.metadata.type_tag() == Some("project")))
    }

    pub async fn list_projects(&self, tenant_id: &str) -> Result<Vec<MemoryRecord>> {
        let module = self.pipeline.registry().get(PROJECTS_MODULE_ID)?;
        module.search_by_metadata(tenant_id, &[MetadataFilter::new("type", json!("project"))]).await
    }

    pub async fn create_task(&self, tenant_id: &str, project_id: Uuid, title: &str, description: &str) -> Result<Uuid> {
        let mut metadata = Metadata::new();
        metadata.set("type", json!("task"));
        metadata.set("project_id", json!(project_id.to_string()));
        metadata.set("title", json!(title));
        metadata.set("status", json!("open"));
        metadata.set("subtasks", json!(Vec::<String>::new()));
        let content = format!("Task: {title}\n{description}");
        self.pipeline.store(tenant_id, &content, metadata, Some(PROJECTS_MODULE_ID.to_string())).await
    }

    pub async fn get_task(&self, tenant_id: &str, task_id: Uuid) -> Result<Option<MemoryRecord>> {
        let row = self.pipeline.get(tenant_id, PROJECTS_MODULE_ID, task_id).await?;
        Ok(row.filter(|r| r.metadata.type_tag() == Some("task")))
    }

    pub async fn list_tasks(&self, tenant_id: &str, project_id: Uuid) -> Result<Vec<MemoryRecord>> {
        let module = self.pipeline.registry().get(PROJECTS_MODULE_ID)?;
        module
            .search_by_metadata(
                tenant_id,
                &[
                    MetadataFilter::new("type", json!("task")),
                    MetadataFilter::new("project_id", json!(project_id.to_string())),
                ],
            )
            .await
    }

    /// Appends to the task's `subtasks` array rather than replacing it —
    /// metadata on `update` replaces wholesale, so the current list is read
    /// back first.
    pub async fn add_subtask(&self, tenant_id: &str, task_id: Uuid, subtask_title: &str) -> Result<bool> {
        let Some(row) = self.get_task(tenant_id, task_id).await? else {
            return Ok(false);
        };
        let mut metadata = row.metadata;
        let mut subtasks = metadata.string_list("subtasks");
        subtasks.push(subtask_title.to_string());
        metadata.set("subtasks", json!(subtasks));
        let request = UpdateRequest { content: None, metadata: Some(metadata) };
        self.pipeline.update(tenant_id, PROJECTS_MODULE_ID, task_id, request).await
    }

    pub async fn add_dependency(&self, tenant_id: &str, from_task: Uuid, to_task: Uuid) -> Result<Relationship> {
        self.pipeline
            .cmi()
            .create_relationship(
                tenant_id,
                MemoryRef { module_id: PROJECTS_MODULE_ID.to_string(), memory_id: from_task },
                MemoryRef { module_id: PROJECTS_MODULE_ID.to_string(), memory_id: to_task },
                "depends_on",
                1.0,
                Metadata::new(),
            )
            .await
    }

    pub async fn dependencies(&self, tenant_id: &str, task_id: Uuid) -> Result<Vec<Relationship>> {
        let related = self.pipeline.cmi().get_related_memories(tenant_id, PROJECTS_MODULE_ID, task_id).await?;
        Ok(related.into_iter().filter(|r| r.kind == "depends_on").collect())
    }
}
