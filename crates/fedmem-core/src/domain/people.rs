//! People/CRM domain service (spec §4.4): Person, Household, Ministry
//! assignment, Attendance events, and module-scoped custom fields.
//!
//! Custom-field definitions live in a singleton registry memory per module
//! named `custom_fields_<module>`; a write against a defined field is
//! validated (type, required, enum, min/max, regex) before the value is
//! stored under the namespaced key `<module>.<fieldKey>` on the owning
//! entity, keeping per-module custom namespaces disjoint.

use crate::error::{FedMemError, Result};
use crate::models::{MemoryRecord, Metadata};
use crate::module::{ImportanceWeights, ModuleConfig, ProcessingPolicy, SignalLexicon, UpdateRequest};
use crate::pipeline::WritePipeline;
use crate::storage::MetadataFilter;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use uuid::Uuid;

pub const PEOPLE_MODULE_ID: &str = "people";

pub fn module_config() -> ModuleConfig {
    ModuleConfig {
        id: PEOPLE_MODULE_ID.to_string(),
        display_name: "People".to_string(),
        description: "Person, Household, Ministry and Attendance records managed by the people/CRM domain service.".to_string(),
        searchable_fields: vec!["type".to_string(), "household_id".to_string(), "person_id".to_string()],
        policy: ProcessingPolicy {
            default_type: "person".to_string(),
            taxonomy: vec![],
            entity_fields: vec![],
            lexicon: SignalLexicon::generic(),
            importance_weights: ImportanceWeights::default(),
        },
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CustomFieldType {
    String,
    Number,
    Boolean,
    Enum,
}

/// One field's validation rule inside a module's custom-field registry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomFieldDefinition {
    pub key: String,
    pub field_type: CustomFieldType,
    pub required: bool,
    pub enum_options: Option<Vec<String>>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub regex: Option<String>,
}

fn registry_memory_name(module_id: &str) -> String {
    format!("custom_fields_{}", module_id)
}

pub struct PeopleService {
    pipeline: Arc<WritePipeline>,
}

impl PeopleService {
    pub fn new(pipeline: Arc<WritePipeline>) -> Self {
        Self { pipeline }
    }

    pub async fn create_person(&self, tenant_id: &str, name: &str, household_id: Option<Uuid>) -> Result<Uuid> {
        let mut metadata = Metadata::new();
        metadata.set("type", json!("person"));
        metadata.set("name", json!(name));
        metadata.set("ministries", json!(Vec::<String>::new()));
        if let Some(household_id) = household_id {
            metadata.set("household_id", json!(household_id.to_string()));
        }
        let content = format!("Person: {name}");
        self.pipeline.store(tenant_id, &content, metadata, Some(PEOPLE_MODULE_ID.to_string())).await
    }

    pub async fn get_person(&self, tenant_id: &str, person_id: Uuid) -> Result<Option<MemoryRecord>> {
        let row = self.pipeline.get(tenant_id, PEOPLE_MODULE_ID, person_id).await?;
        Ok(row.filter(|r| r.metadata.type_tag() == Some("person")))
    }

    pub async fn create_household(&self, tenant_id: &str, name: &str, member_ids: &[Uuid]) -> Result<Uuid> {
        let mut metadata = Metadata::new();
        metadata.set("type", json!("household"));
        metadata.set("name", json!(name));
        metadata.set("members", json!(member_ids.iter().map(Uuid::to_string).collect::<Vec<_>>()));
        let content = format!("Household: {name}");
        let household_id = self.pipeline.store(tenant_id, &content, metadata, Some(PEOPLE_MODULE_ID.to_string())).await?;
        for member_id in member_ids {
            if let Some(person) = self.get_person(tenant_id, *member_id).await? {
                let mut metadata = person.metadata;
                metadata.set("household_id", json!(household_id.to_string()));
                let request = UpdateRequest { content: None, metadata: Some(metadata) };
                self.pipeline.update(tenant_id, PEOPLE_MODULE_ID, *member_id, request).await?;
            }
        }
        Ok(household_id)
    }

    pub async fn assign_ministry(&self, tenant_id: &str, person_id: Uuid, ministry: &str) -> Result<bool> {
        let Some(row) = self.get_person(tenant_id, person_id).await? else {
            return Ok(false);
        };
        let mut metadata = row.metadata;
        let mut ministries = metadata.string_list("ministries");
        if !ministries.iter().any(|m| m == ministry) {
            ministries.push(ministry.to_string());
        }
        metadata.set("ministries", json!(ministries));
        let request = UpdateRequest { content: None, metadata: Some(metadata) };
        self.pipeline.update(tenant_id, PEOPLE_MODULE_ID, person_id, request).await
    }

    pub async fn record_attendance(&self, tenant_id: &str, person_id: Uuid, event_name: &str, occurred_at: chrono::DateTime<chrono::Utc>) -> Result<Uuid> {
        let mut metadata = Metadata::new();
        metadata.set("type", json!("attendance"));
        metadata.set("person_id", json!(person_id.to_string()));
        metadata.set("event", json!(event_name));
        metadata.set("occurred_at", json!(occurred_at.to_rfc3339()));
        let content = format!("Attendance: {event_name} on {}", occurred_at.to_rfc3339());
        self.pipeline.store(tenant_id, &content, metadata, Some(PEOPLE_MODULE_ID.to_string())).await
    }

    pub async fn attendance_for_person(&self, tenant_id: &str, person_id: Uuid) -> Result<Vec<MemoryRecord>> {
        let module = self.pipeline.registry().get(PEOPLE_MODULE_ID)?;
        module
            .search_by_metadata(
                tenant_id,
                &[
                    MetadataFilter::new("type", json!("attendance")),
                    MetadataFilter::new("person_id", json!(person_id.to_string())),
                ],
            )
            .await
    }

    /// Registers or replaces one field's definition in `module_id`'s custom
    /// field registry. The registry is a singleton memory found by
    /// `searchByMetadata({type:"custom_field_registry", module_id})`.
    pub async fn register_custom_field(&self, tenant_id: &str, module_id: &str, definition: CustomFieldDefinition) -> Result<()> {
        let registry_name = registry_memory_name(module_id);
        let module = self.pipeline.registry().get(PEOPLE_MODULE_ID)?;
        let existing = module
            .search_by_metadata(
                tenant_id,
                &[MetadataFilter::new("type", json!("custom_field_registry")), MetadataFilter::new("registry_name", json!(registry_name))],
            )
            .await?;

        let mut fields = existing.first().map(|r| load_fields(&r.metadata)).unwrap_or_default();
        fields.retain(|f| f.key != definition.key);
        fields.push(definition);

        let mut metadata = Metadata::new();
        metadata.set("type", json!("custom_field_registry"));
        metadata.set("registry_name", json!(registry_name));
        metadata.set("module_id", json!(module_id));
        metadata.set("fields", serde_json::to_value(&fields).unwrap_or(Value::Array(vec![])));

        match existing.into_iter().next() {
            Some(row) => {
                let request = UpdateRequest { content: None, metadata: Some(metadata) };
                self.pipeline.update(tenant_id, PEOPLE_MODULE_ID, row.id, request).await?;
            }
            None => {
                let content = format!("Custom field registry for {module_id}");
                self.pipeline.store(tenant_id, &content, metadata, Some(PEOPLE_MODULE_ID.to_string())).await?;
            }
        }
        Ok(())
    }

    async fn field_definition(&self, tenant_id: &str, module_id: &str, field_key: &str) -> Result<Option<CustomFieldDefinition>> {
        let registry_name = registry_memory_name(module_id);
        let module = self.pipeline.registry().get(PEOPLE_MODULE_ID)?;
        let rows = module
            .search_by_metadata(
                tenant_id,
                &[MetadataFilter::new("type", json!("custom_field_registry")), MetadataFilter::new("registry_name", json!(registry_name))],
            )
            .await?;
        Ok(rows
            .first()
            .map(|r| load_fields(&r.metadata))
            .unwrap_or_default()
            .into_iter()
            .find(|f| f.key == field_key))
    }

    /// Validates `value` against `module_id`'s registered definition for
    /// `field_key`, then stores it as `<module_id>.<field_key>` on the
    /// owning entity (which lives in the `people` module, e.g. a Person or
    /// Household row).
    pub async fn set_custom_field(&self, tenant_id: &str, module_id: &str, entity_id: Uuid, field_key: &str, value: Value) -> Result<bool> {
        let definition = self
            .field_definition(tenant_id, module_id, field_key)
            .await?
            .ok_or_else(|| FedMemError::Invalid(format!("no custom field '{}' registered for module '{}'", field_key, module_id)))?;
        validate_custom_field_value(&definition, &value)?;

        let Some(row) = self.pipeline.get(tenant_id, PEOPLE_MODULE_ID, entity_id).await? else {
            return Ok(false);
        };
        let mut metadata = row.metadata;
        metadata.set(&format!("{}.{}", module_id, field_key), value);
        let request = UpdateRequest { content: None, metadata: Some(metadata) };
        self.pipeline.update(tenant_id, PEOPLE_MODULE_ID, entity_id, request).await
    }
}

fn load_fields(metadata: &Metadata) -> Vec<CustomFieldDefinition> {
    metadata
        .get("fields")
        .cloned()
        .and_then(|v| serde_json::from_value(v).ok())
        .unwrap_or_default()
}

fn validate_custom_field_value(def: &CustomFieldDefinition, value: &Value) -> Result<()> {
    if value.is_null() {
        if def.required {
            return Err(FedMemError::Invalid(format!("field '{}' is required", def.key)));
        }
        return Ok(());
    }

    match def.field_type {
        CustomFieldType::String => {
            let Some(s) = value.as_str() else {
                return Err(FedMemError::Invalid(format!("field '{}' must be a string", def.key)));
            };
            if let Some(pattern) = &def.regex {
                let re = Regex::new(pattern).map_err(|e| FedMemError::Invalid(format!("invalid regex for field '{}': {}", def.key, e)))?;
                if !re.is_match(s) {
                    return Err(FedMemError::Invalid(format!("field '{}' does not match required pattern", def.key)));
                }
            }
        }
        CustomFieldType::Number => {
            let Some(n) = value.as_f64() else {
                return Err(FedMemError::Invalid(format!("field '{}' must be a number", def.key)));
            };
            if let Some(min) = def.min {
                if n < min {
                    return Err(FedMemError::Invalid(format!("field '{}' below minimum {}", def.key, min)));
                }
            }
            if let Some(max) = def.max {
                if n > max {
                    return Err(FedMemError::Invalid(format!("field '{}' above maximum {}", def.key, max)));
                }
            }
        }
        CustomFieldType::Boolean => {
            if value.as_bool().is_none() {
                return Err(FedMemError::Invalid(format!("field '{}' must be a boolean", def.key)));
            }
        }
        CustomFieldType::Enum => {
            let Some(s) = value.as_str() else {
                return Err(FedMemError::Invalid(format!("field '{}' must be a string enum value", def.key)));
            };
            let options = def.enum_options.as_deref().unwrap_or(&[]);
            if !options.iter().any(|o| o == s) {
                return Err(FedMemError::Invalid(format!("field '{}' must be one of {:?}", def.key, options)));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cmi::Cmi;
    use crate::config::Config;
    use crate::embeddings::{DeterministicEmbeddingProvider, EmbeddingProvider};
    use crate::module::ModuleRegistry;
    use crate::notifier::ChangeNotifier;
    use crate::pipeline::TenantDirectory;
    use crate::storage::sqlite::SqliteVectorStore;
    use dashmap::DashSet;

    fn service() -> PeopleService {
        let store = SqliteVectorStore::open_in_memory().unwrap();
        let config = Config::default();
        let cmi = Arc::new(Cmi::new(Arc::new(store.cmi_table()), Arc::new(store.relationship_table()), &config));
        let registry = Arc::new(ModuleRegistry::new(store));
        registry.register_builtins().unwrap();
        registry.register(module_config()).unwrap();
        let provider: Arc<dyn EmbeddingProvider> = Arc::new(DeterministicEmbeddingProvider::new(&config));
        let notifier = Arc::new(ChangeNotifier::new());
        let tenants: TenantDirectory = Arc::new(DashSet::new());
        let pipeline = Arc::new(WritePipeline::new(registry, cmi, provider, notifier, tenants, config));
        PeopleService::new(pipeline)
    }

    #[tokio::test]
    async fn create_household_backfills_member_household_id() {
        let svc = service();
        let alice = svc.create_person("t1", "Alice", None).await.unwrap();
        let household = svc.create_household("t1", "The Smiths", &[alice]).await.unwrap();
        let person = svc.get_person("t1", alice).await.unwrap().unwrap();
        assert_eq!(person.metadata.get("household_id").and_then(|v| v.as_str()), Some(household.to_string().as_str()));
    }

    #[tokio::test]
    async fn assign_ministry_is_idempotent() {
        let svc = service();
        let alice = svc.create_person("t1", "Alice", None).await.unwrap();
        assert!(svc.assign_ministry("t1", alice, "Worship").await.unwrap());
        assert!(svc.assign_ministry("t1", alice, "Worship").await.unwrap());
        let person = svc.get_person("t1", alice).await.unwrap().unwrap();
        assert_eq!(person.metadata.string_list("ministries"), vec!["Worship"]);
    }

    #[tokio::test]
    async fn attendance_is_filtered_by_person() {
        let svc = service();
        let alice = svc.create_person("t1", "Alice", None).await.unwrap();
        let bob = svc.create_person("t1", "Bob", None).await.unwrap();
        svc.record_attendance("t1", alice, "Sunday Service", chrono::Utc::now()).await.unwrap();
        svc.record_attendance("t1", bob, "Sunday Service", chrono::Utc::now()).await.unwrap();
        let alice_attendance = svc.attendance_for_person("t1", alice).await.unwrap();
        assert_eq!(alice_attendance.len(), 1);
    }

    #[tokio::test]
    async fn custom_field_validates_enum_before_storing() {
        let svc = service();
        let alice = svc.create_person("t1", "Alice", None).await.unwrap();
        svc.register_custom_field(
            "t1",
            "communication",
            CustomFieldDefinition {
                key: "contact_pref".to_string(),
                field_type: CustomFieldType::Enum,
                required: false,
                enum_options: Some(vec!["email".to_string(), "phone".to_string()]),
                min: None,
                max: None,
                regex: None,
            },
        )
        .await
        .unwrap();

        let err = svc.set_custom_field("t1", "communication", alice, "contact_pref", json!("carrier_pigeon")).await.unwrap_err();
        assert!(matches!(err, FedMemError::Invalid(_)));

        assert!(svc.set_custom_field("t1", "communication", alice, "contact_pref", json!("email")).await.unwrap());
        let person = svc.get_person("t1", alice).await.unwrap().unwrap();
        assert_eq!(person.metadata.get("communication.contact_pref"), Some(&json!("email")));
    }

    #[tokio::test]
    async fn custom_field_unregistered_key_is_rejected() {
        let svc = service();
        let alice = svc.create_person("t1", "Alice", None).await.unwrap();
        let err = svc.set_custom_field("t1", "communication", alice, "nope", json!("x")).await.unwrap_err();
        assert!(matches!(err, FedMemError::Invalid(_)));
    }
}
