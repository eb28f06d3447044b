//! C8 — Tool surface: a fixed name→schema RPC registry exposed over HTTP
//! (spec §6 "Agent tool surface"). Implemented the way the teacher
//! hand-rolls its MCP surface — a small dispatch table keyed by tool name,
//! `serde_json::Value` payloads — rather than pulling in a protocol SDK
//! neither crate otherwise needs.

use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::Json;
use chrono::{DateTime, Utc};
use fedmem_core::cmi::{SearchOptions, SearchResult};
use fedmem_core::domain::people::{CustomFieldDefinition, CustomFieldType};
use fedmem_core::models::{MemoryRecord, MemoryRef, Metadata, Relationship};
use fedmem_core::module::UpdateRequest;
use fedmem_core::FedMemError;
use serde::Serialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::error_response::ApiError;
use crate::state::{authenticate, AppState};

/// One entry in the fixed name→schema registry (spec §6). `input_schema` is
/// advertised to callers via `GET /tools`; validation of the actual request
/// body happens in each handler rather than through a generic JSON-schema
/// validator, matching the teacher's hand-rolled dispatch style.
#[derive(Debug, Clone, Serialize)]
pub struct ToolSchema {
    pub name: &'static str,
    pub description: &'static str,
    pub input_schema: Value,
}

fn schema(fields: &[(&str, &str)]) -> Value {
    let props: serde_json::Map<String, Value> = fields
        .iter()
        .map(|(k, v)| (k.to_string(), json!({ "type": v })))
        .collect();
    json!({ "type": "object", "properties": props })
}

pub fn registry() -> Vec<ToolSchema> {
    vec![
        ToolSchema {
            name: "memory/store",
            description: "Store a new memory, auto-routing to a module unless moduleId is given.",
            input_schema: schema(&[("content", "string"), ("metadata", "object"), ("moduleId", "string")]),
        },
        ToolSchema {
            name: "memory/search",
            description: "Federated semantic search across modules (CMI routing + per-module dispatch).",
            input_schema: schema(&[("query", "string"), ("modules", "array"), ("limit", "integer"), ("minScore", "number")]),
        },
        ToolSchema {
            name: "memory/retrieve",
            description: "Fetch one memory by (moduleId, id); increments its access counter.",
            input_schema: schema(&[("id", "string"), ("moduleId", "string")]),
        },
        ToolSchema {
            name: "memory/update",
            description: "Replace content and/or metadata on a memory; re-embeds and re-indexes if content changes.",
            input_schema: schema(&[("id", "string"), ("moduleId", "string"), ("content", "string"), ("metadata", "object")]),
        },
        ToolSchema {
            name: "memory/delete",
            description: "Delete a memory and its CMI index row / relationships.",
            input_schema: schema(&[("id", "string"), ("moduleId", "string")]),
        },
        ToolSchema {
            name: "memory/listModules",
            description: "List every registered module id.",
            input_schema: schema(&[]),
        },
        ToolSchema {
            name: "project/create",
            description: "Create a Project.",
            input_schema: schema(&[("name", "string"), ("description", "string")]),
        },
        ToolSchema {
            name: "project/get",
            description: "Read a Project by id.",
            input_schema: schema(&[("id", "string")]),
        },
        ToolSchema {
            name: "project/list",
            description: "List every Project.",
            input_schema: schema(&[]),
        },
        ToolSchema {
            name: "project/createTask",
            description: "Create a Task under a Project.",
            input_schema: schema(&[("projectId", "string"), ("title", "string"), ("description", "string")]),
        },
        ToolSchema {
            name: "project/getTask",
            description: "Read a Task by id.",
            input_schema: schema(&[("id", "string")]),
        },
        ToolSchema {
            name: "project/listTasks",
            description: "List every Task under a Project.",
            input_schema: schema(&[("projectId", "string")]),
        },
        ToolSchema {
            name: "project/addSubtask",
            description: "Append a subtask title to a Task's subtask list.",
            input_schema: schema(&[("taskId", "string"), ("title", "string")]),
        },
        ToolSchema {
            name: "project/addDependency",
            description: "Create a depends_on relationship between two Tasks.",
            input_schema: schema(&[("fromTaskId", "string"), ("toTaskId", "string")]),
        },
        ToolSchema {
            name: "project/dependencies",
            description: "List a Task's depends_on relationships.",
            input_schema: schema(&[("taskId", "string")]),
        },
        ToolSchema {
            name: "person/create",
            description: "Create a Person.",
            input_schema: schema(&[("name", "string"), ("householdId", "string")]),
        },
        ToolSchema {
            name: "person/get",
            description: "Read a Person by id.",
            input_schema: schema(&[("id", "string")]),
        },
        ToolSchema {
            name: "person/createHousehold",
            description: "Create a Household and back-fill householdId onto its members.",
            input_schema: schema(&[("name", "string"), ("memberIds", "array")]),
        },
        ToolSchema {
            name: "person/assignMinistry",
            description: "Idempotently add a ministry assignment to a Person.",
            input_schema: schema(&[("personId", "string"), ("ministry", "string")]),
        },
        ToolSchema {
            name: "person/recordAttendance",
            description: "Record an Attendance event for a Person.",
            input_schema: schema(&[("personId", "string"), ("event", "string"), ("occurredAt", "string")]),
        },
        ToolSchema {
            name: "person/attendance",
            description: "List Attendance events for a Person.",
            input_schema: schema(&[("personId", "string")]),
        },
        ToolSchema {
            name: "person/registerCustomField",
            description: "Register (or replace) a custom-field definition for a module.",
            input_schema: schema(&[("moduleId", "string"), ("field", "object")]),
        },
        ToolSchema {
            name: "person/setCustomField",
            description: "Validate and store a custom-field value on a Person/Household.",
            input_schema: schema(&[("moduleId", "string"), ("entityId", "string"), ("key", "string"), ("value", "object")]),
        },
        ToolSchema {
            name: "relationship/create",
            description: "Create a typed, weighted relationship between two memories.",
            input_schema: schema(&[
                ("sourceModuleId", "string"),
                ("sourceId", "string"),
                ("targetModuleId", "string"),
                ("targetId", "string"),
                ("kind", "string"),
                ("strength", "number"),
                ("metadata", "object"),
            ]),
        },
        ToolSchema {
            name: "relationship/related",
            description: "List relationships touching a memory, from either endpoint.",
            input_schema: schema(&[("moduleId", "string"), ("id", "string")]),
        },
    ]
}

pub async fn list_tools(State(_state): State<AppState>) -> Json<Value> {
    Json(json!({ "tools": registry() }))
}

pub async fn invoke_tool(
    State(state): State<AppState>,
    Path(name): Path<String>,
    headers: HeaderMap,
    body: axum::body::Bytes,
) -> Result<Json<Value>, ApiError> {
    let tenant_id = authenticate(&state, &headers, None).await?;
    let params: Value = if body.is_empty() {
        json!({})
    } else {
        serde_json::from_slice(&body).map_err(|e| ApiError(FedMemError::Invalid(format!("malformed JSON body: {e}"))))?
    };
    let result = dispatch(&state, &tenant_id, &name, params).await?;
    Ok(Json(result))
}

fn str_field(params: &Value, key: &str) -> Result<String, ApiError> {
    params
        .get(key)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| ApiError(FedMemError::Invalid(format!("missing field '{key}'"))))
}

fn opt_str_field(params: &Value, key: &str) -> Option<String> {
    params.get(key).and_then(Value::as_str).map(str::to_string)
}

fn uuid_field(params: &Value, key: &str) -> Result<Uuid, ApiError> {
    let raw = str_field(params, key)?;
    Uuid::parse_str(&raw).map_err(|_| ApiError(FedMemError::Invalid(format!("field '{key}' is not a uuid"))))
}

fn opt_uuid_field(params: &Value, key: &str) -> Result<Option<Uuid>, ApiError> {
    match params.get(key).and_then(Value::as_str) {
        Some(raw) => Uuid::parse_str(raw)
            .map(Some)
            .map_err(|_| ApiError(FedMemError::Invalid(format!("field '{key}' is not a uuid")))),
        None => Ok(None),
    }
}

fn memory_view(record: MemoryRecord) -> Value {
    json!({
        "id": record.id,
        "content": record.content,
        "metadata": record.metadata.0,
        "accessCount": record.access_count,
        "lastAccess": record.last_access,
        "createdAt": record.created_at,
        "updatedAt": record.updated_at,
    })
}

fn search_result_view(r: &SearchResult) -> Value {
    json!({
        "moduleId": r.module_id,
        "memoryId": r.memory_id,
        "similarity": r.similarity,
        "title": r.title,
        "summary": r.summary,
        "importance": r.importance,
    })
}

fn relationship_view(r: &Relationship) -> Value {
    json!({
        "id": r.id,
        "source": { "moduleId": r.source.module_id, "memoryId": r.source.memory_id },
        "target": { "moduleId": r.target.module_id, "memoryId": r.target.memory_id },
        "kind": r.kind,
        "strength": r.strength,
        "metadata": r.metadata.0,
    })
}

async fn dispatch(state: &AppState, tenant_id: &str, name: &str, params: Value) -> Result<Value, ApiError> {
    match name {
        "memory/store" => {
            let content = str_field(&params, "content")?;
            let metadata = params.get("metadata").cloned().map(Metadata).unwrap_or_default();
            let module_id = opt_str_field(&params, "moduleId");
            let id = state.pipeline.store(tenant_id, &content, metadata, module_id).await?;
            Ok(json!({ "id": id }))
        }
        "memory/search" => {
            let query = str_field(&params, "query")?;
            let modules = params
                .get("modules")
                .and_then(Value::as_array)
                .map(|arr| arr.iter().filter_map(|v| v.as_str().map(str::to_string)).collect());
            let limit = params.get("limit").and_then(Value::as_u64).unwrap_or(10) as usize;
            let min_score = params.get("minScore").and_then(Value::as_f64).unwrap_or(0.0) as f32;
            let options = SearchOptions { modules, limit, min_score };
            let results = state.pipeline.search(tenant_id, &query, options).await?;
            Ok(json!({ "results": results.iter().map(search_result_view).collect::<Vec<_>>() }))
        }
        "memory/retrieve" => {
            let id = uuid_field(&params, "id")?;
            let module_id = str_field(&params, "moduleId")?;
            let record = state.pipeline.get(tenant_id, &module_id, id).await?;
            Ok(json!({ "memory": record.map(memory_view) }))
        }
        "memory/update" => {
            let id = uuid_field(&params, "id")?;
            let module_id = str_field(&params, "moduleId")?;
            let request = UpdateRequest {
                content: opt_str_field(&params, "content"),
                metadata: params.get("metadata").cloned().map(Metadata),
            };
            let updated = state.pipeline.update(tenant_id, &module_id, id, request).await?;
            Ok(json!({ "updated": updated }))
        }
        "memory/delete" => {
            let id = uuid_field(&params, "id")?;
            let module_id = str_field(&params, "moduleId")?;
            let deleted = state.pipeline.delete(tenant_id, &module_id, id).await?;
            Ok(json!({ "deleted": deleted }))
        }
        "memory/listModules" => Ok(json!({ "modules": state.pipeline.registry().module_ids() })),

        "project/create" => {
            let name = str_field(&params, "name")?;
            let description = opt_str_field(&params, "description").unwrap_or_default();
            let id = state.projects.create_project(tenant_id, &name, &description).await?;
            Ok(json!({ "id": id }))
        }
        "project/get" => {
            let id = uuid_field(&params, "id")?;
            let record = state.projects.get_project(tenant_id, id).await?;
            Ok(json!({ "project": record.map(memory_view) }))
        }
        "project/list" => {
            let records = state.projects.list_projects(tenant_id).await?;
            Ok(json!({ "projects": records.into_iter().map(memory_view).collect::<Vec<_>>() }))
        }
        "project/createTask" => {
            let project_id = uuid_field(&params, "projectId")?;
            let title = str_field(&params, "title")?;
            let description = opt_str_field(&params, "description").unwrap_or_default();
            let id = state.projects.create_task(tenant_id, project_id, &title, &description).await?;
            Ok(json!({ "id": id }))
        }
        "project/getTask" => {
            let id = uuid_field(&params, "id")?;
            let record = state.projects.get_task(tenant_id, id).await?;
            Ok(json!({ "task": record.map(memory_view) }))
        }
        "project/listTasks" => {
            let project_id = uuid_field(&params, "projectId")?;
            let records = state.projects.list_tasks(tenant_id, project_id).await?;
            Ok(json!({ "tasks": records.into_iter().map(memory_view).collect::<Vec<_>>() }))
        }
        "project/addSubtask" => {
            let task_id = uuid_field(&params, "taskId")?;
            let title = str_field(&params, "title")?;
            let updated = state.projects.add_subtask(tenant_id, task_id, &title).await?;
            Ok(json!({ "updated": updated }))
        }
        "project/addDependency" => {
            let from_task = uuid_field(&params, "fromTaskId")?;
            let to_task = uuid_field(&params, "toTaskId")?;
            let relationship = state.projects.add_dependency(tenant_id, from_task, to_task).await?;
            Ok(json!({ "relationship": relationship_view(&relationship) }))
        }
        "project/dependencies" => {
            let task_id = uuid_field(&params, "taskId")?;
            let deps = state.projects.dependencies(tenant_id, task_id).await?;
            Ok(json!({ "dependencies": deps.iter().map(relationship_view).collect::<Vec<_>>() }))
        }

        "person/create" => {
            let name = str_field(&params, "name")?;
            let household_id = opt_uuid_field(&params, "householdId")?;
            let id = state.people.create_person(tenant_id, &name, household_id).await?;
            Ok(json!({ "id": id }))
        }
        "person/get" => {
            let id = uuid_field(&params, "id")?;
            let record = state.people.get_person(tenant_id, id).await?;
            Ok(json!({ "person": record.map(memory_view) }))
        }
        "person/createHousehold" => {
            let name = str_field(&params, "name")?;
            let member_ids: Vec<Uuid> = params
                .get("memberIds")
                .and_then(Value::as_array)
                .map(|arr| arr.iter().filter_map(|v| v.as_str().and_then(|s| Uuid::parse_str(s).ok())).collect())
                .unwrap_or_default();
            let id = state.people.create_household(tenant_id, &name, &member_ids).await?;
            Ok(json!({ "id": id }))
        }
        "person/assignMinistry" => {
            let person_id = uuid_field(&params, "personId")?;
            let ministry = str_field(&params, "ministry")?;
            let updated = state.people.assign_ministry(tenant_id, person_id, &ministry).await?;
            Ok(json!({ "updated": updated }))
        }
        "person/recordAttendance" => {
            let person_id = uuid_field(&params, "personId")?;
            let event = str_field(&params, "event")?;
            let occurred_at = opt_str_field(&params, "occurredAt")
                .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
                .map(|dt| dt.with_timezone(&Utc))
                .unwrap_or_else(Utc::now);
            let id = state.people.record_attendance(tenant_id, person_id, &event, occurred_at).await?;
            Ok(json!({ "id": id }))
        }
        "person/attendance" => {
            let person_id = uuid_field(&params, "personId")?;
            let events = state.people.attendance_for_person(tenant_id, person_id).await?;
            Ok(json!({ "events": events.into_iter().map(memory_view).collect::<Vec<_>>() }))
        }
        "person/registerCustomField" => {
            let module_id = str_field(&params, "moduleId")?;
            let field = params.get("field").cloned().ok_or_else(|| ApiError(FedMemError::Invalid("missing field 'field'".to_string())))?;
            let definition: CustomFieldDefinition = parse_custom_field_definition(&field)?;
            state.people.register_custom_field(tenant_id, &module_id, definition).await?;
            Ok(json!({ "ok": true }))
        }
        "person/setCustomField" => {
            let module_id = str_field(&params, "moduleId")?;
            let entity_id = uuid_field(&params, "entityId")?;
            let key = str_field(&params, "key")?;
            let value = params.get("value").cloned().unwrap_or(Value::Null);
            let updated = state.people.set_custom_field(tenant_id, &module_id, entity_id, &key, value).await?;
            Ok(json!({ "updated": updated }))
        }

        "relationship/create" => {
            let source = MemoryRef { module_id: str_field(&params, "sourceModuleId")?, memory_id: uuid_field(&params, "sourceId")? };
            let target = MemoryRef { module_id: str_field(&params, "targetModuleId")?, memory_id: uuid_field(&params, "targetId")? };
            let kind = str_field(&params, "kind")?;
            let strength = params.get("strength").and_then(Value::as_f64).unwrap_or(1.0) as f32;
            let metadata = params.get("metadata").cloned().map(Metadata).unwrap_or_default();
            let relationship = state.pipeline.cmi().create_relationship(tenant_id, source, target, &kind, strength, metadata).await?;
            Ok(json!({ "relationship": relationship_view(&relationship) }))
        }
        "relationship/related" => {
            let module_id = str_field(&params, "moduleId")?;
            let id = uuid_field(&params, "id")?;
            let related = state.pipeline.cmi().get_related_memories(tenant_id, &module_id, id).await?;
            Ok(json!({ "relationships": related.iter().map(relationship_view).collect::<Vec<_>>() }))
        }

        other => Err(ApiError(FedMemError::Invalid(format!("unknown tool '{other}'")))),
    }
}

fn parse_custom_field_definition(value: &Value) -> Result<CustomFieldDefinition, ApiError> {
    let key = value
        .get("key")
        .and_then(Value::as_str)
        .ok_or_else(|| ApiError(FedMemError::Invalid("custom field definition missing 'key'".to_string())))?
        .to_string();
    let field_type = match value.get("fieldType").and_then(Value::as_str) {
        Some("string") => CustomFieldType::String,
        Some("number") => CustomFieldType::Number,
        Some("boolean") => CustomFieldType::Boolean,
        Some("enum") => CustomFieldType::Enum,
        _ => return Err(ApiError(FedMemError::Invalid("custom field definition has unknown 'fieldType'".to_string()))),
    };
    let required = value.get("required").and_then(Value::as_bool).unwrap_or(false);
    let enum_options = value
        .get("enumOptions")
        .and_then(Value::as_array)
        .map(|arr| arr.iter().filter_map(|v| v.as_str().map(str::to_string)).collect());
    let min = value.get("min").and_then(Value::as_f64);
    let max = value.get("max").and_then(Value::as_f64);
    let regex = value.get("regex").and_then(Value::as_str).map(str::to_string);
    Ok(CustomFieldDefinition { key, field_type, required, enum_options, min, max, regex })
}
