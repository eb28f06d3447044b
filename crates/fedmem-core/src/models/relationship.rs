//! Memory relationship: a typed, weighted edge between two memories,
//! possibly across modules (spec §3).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryRef {
    pub module_id: String,
    pub memory_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Relationship {
    pub id: Uuid,
    pub tenant_id: String,
    pub source: MemoryRef,
    pub target: MemoryRef,
    /// Open taxonomy: `similar`, `depends_on`, `refines`, `contradicts`, ...
    pub kind: String,
    pub strength: f32,
    pub metadata: crate::models::Metadata,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Relationship {
    pub fn new(
        tenant_id: impl Into<String>,
        source: MemoryRef,
        target: MemoryRef,
        kind: impl Into<String>,
        strength: f32,
        metadata: crate::models::Metadata,
    ) -> Result<Self, crate::error::FedMemError> {
        if source == target {
            return Err(crate::error::FedMemError::Invalid(
                "relationship source and target must differ".to_string(),
            ));
        }
        let now = Utc::now();
        Ok(Self {
            id: Uuid::new_v4(),
            tenant_id: tenant_id.into(),
            source,
            target,
            kind: kind.into(),
            strength: strength.clamp(0.0, 1.0),
            metadata,
            created_at: now,
            updated_at: now,
        })
    }

    /// True if `endpoint` is either the source or target — relationship
    /// lookups are bidirectional (spec §4.2).
    pub fn touches(&self, endpoint: &MemoryRef) -> bool {
        &self.source == endpoint || &self.target == endpoint
    }
}
