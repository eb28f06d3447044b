//! Memory and CMI index entry records (spec §3).

use super::Metadata;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A memory row as stored inside a single module's table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryRecord {
    pub id: Uuid,
    pub tenant_id: String,
    pub content: String,
    /// Full (d_full) L2-normalized embedding.
    pub embedding: Vec<f32>,
    pub metadata: Metadata,
    pub access_count: u64,
    pub last_access: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl MemoryRecord {
    pub fn new(tenant_id: impl Into<String>, content: String, embedding: Vec<f32>, metadata: Metadata) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            tenant_id: tenant_id.into(),
            content,
            embedding,
            metadata,
            access_count: 0,
            last_access: now,
            created_at: now,
            updated_at: now,
        }
    }
}

/// A row in the Central Memory Index (spec §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CmiEntry {
    pub id: Uuid,
    pub tenant_id: String,
    pub module_id: String,
    pub remote_memory_id: Uuid,
    /// Compressed (d_route) L2-normalized embedding.
    pub routing_embedding: Vec<f32>,
    pub title: String,
    pub summary: String,
    pub keywords: Vec<String>,
    pub categories: Vec<String>,
    pub importance: f32,
    pub access_count: u64,
    pub last_access: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CmiEntry {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        tenant_id: impl Into<String>,
        module_id: impl Into<String>,
        remote_memory_id: Uuid,
        routing_embedding: Vec<f32>,
        title: String,
        summary: String,
        keywords: Vec<String>,
        categories: Vec<String>,
        importance: f32,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            tenant_id: tenant_id.into(),
            module_id: module_id.into(),
            remote_memory_id,
            routing_embedding,
            title,
            summary,
            keywords,
            categories,
            importance: importance.clamp(0.0, 1.0),
            access_count: 0,
            last_access: now,
            created_at: now,
            updated_at: now,
        }
    }
}
