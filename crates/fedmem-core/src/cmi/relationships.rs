//! Thin helpers over `RelationshipTable` (spec §4.2 createRelationship /
//! getRelatedMemories). Validation (`source != target`, strength clamp)
//! lives on `Relationship::new`; this module only wires tenant-scoped calls.

use crate::error::Result;
use crate::models::{MemoryRef, Metadata, Relationship};
use crate::storage::RelationshipTable;
use std::sync::Arc;
use uuid::Uuid;

pub async fn create_relationship(
    table: &Arc<dyn RelationshipTable>,
    tenant_id: &str,
    source: MemoryRef,
    target: MemoryRef,
    kind: &str,
    strength: f32,
    metadata: Metadata,
) -> Result<Relationship> {
    let rel = Relationship::new(tenant_id, source, target, kind, strength, metadata)?;
    table.create(&rel).await?;
    Ok(rel)
}

/// Bidirectional lookup, descending strength with stable id tie-break
/// (spec §4.2: "Strength ordering descending; tie-break stable by id").
pub async fn get_related_memories(
    table: &Arc<dyn RelationshipTable>,
    tenant_id: &str,
    module_id: &str,
    memory_id: Uuid,
) -> Result<Vec<Relationship>> {
    table.get_related(tenant_id, module_id, memory_id).await
}

/// Cascading delete on either endpoint; idempotent (spec §3 invariant d).
pub async fn delete_touching(
    table: &Arc<dyn RelationshipTable>,
    tenant_id: &str,
    module_id: &str,
    memory_id: Uuid,
) -> Result<u64> {
    table.delete_touching(tenant_id, module_id, memory_id).await
}
