//! C2 — Vector store contract (spec §6).
//!
//! Per spec §1 the vector-capable relational store is an external
//! collaborator; only its contract is specified here as three traits.
//! `sqlite` supplies a reference implementation backed by `rusqlite` so the
//! rest of the crate is runnable and testable without a real Postgres +
//! pgvector deployment.

mod migrations;
pub mod sqlite;

use crate::error::Result;
use crate::models::{CmiEntry, MemoryRecord, Relationship};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use uuid::Uuid;

/// An equality or containment predicate against a dotted metadata path
/// (spec §4.1 "Filters are equality or containment predicates").
#[derive(Debug, Clone)]
pub struct MetadataFilter {
    pub path: String,
    pub expected: Value,
}

impl MetadataFilter {
    pub fn new(path: impl Into<String>, expected: Value) -> Self {
        Self {
            path: path.into(),
            expected,
        }
    }
}

/// A memory row paired with its similarity score against a query embedding.
#[derive(Debug, Clone)]
pub struct ScoredMemory {
    pub record: MemoryRecord,
    pub score: f32,
}

#[derive(Debug, Clone, Default)]
pub struct ModuleStats {
    pub total: u64,
    pub total_bytes: u64,
    pub last_access: Option<DateTime<Utc>>,
    pub top_categories: Vec<(String, u64)>,
    pub avg_access_count: f64,
}

/// Owns one module's homogeneous table (spec §6 per-module table shape).
#[async_trait]
pub trait ModuleTable: Send + Sync {
    async fn insert(&self, record: &MemoryRecord) -> Result<()>;

    async fn get(&self, tenant_id: &str, memory_id: Uuid) -> Result<Option<MemoryRecord>>;

    /// Replace content/embedding/metadata. `None` fields are left untouched.
    /// Metadata, when provided, *replaces* rather than merges (spec §4.1).
    async fn update(
        &self,
        tenant_id: &str,
        memory_id: Uuid,
        content: Option<String>,
        embedding: Option<Vec<f32>>,
        metadata: Option<crate::models::Metadata>,
    ) -> Result<bool>;

    async fn delete(&self, tenant_id: &str, memory_id: Uuid) -> Result<bool>;

    async fn increment_access(&self, tenant_id: &str, memory_id: Uuid, by: u64) -> Result<()>;

    async fn search_by_embedding(
        &self,
        tenant_id: &str,
        query: &[f32],
        limit: usize,
        min_score: f32,
        filters: &[MetadataFilter],
    ) -> Result<Vec<ScoredMemory>>;

    async fn search_by_metadata(
        &self,
        tenant_id: &str,
        criteria: &[MetadataFilter],
    ) -> Result<Vec<MemoryRecord>>;

    async fn stats(&self, tenant_id: &str) -> Result<ModuleStats>;

    /// All live memory ids for a tenant, used by the reconciliation job.
    async fn list_ids(&self, tenant_id: &str) -> Result<Vec<Uuid>>;
}

/// Owns the Central Memory Index (spec §6 CMI table).
#[async_trait]
pub trait CmiTable: Send + Sync {
    /// Upsert keyed by `(module_id, remote_memory_id)`; idempotent on retry
    /// (spec §4.2 `indexMemory` is idempotent).
    async fn upsert(&self, entry: &CmiEntry) -> Result<()>;

    async fn delete(&self, tenant_id: &str, module_id: &str, memory_id: Uuid) -> Result<()>;

    async fn get(&self, tenant_id: &str, module_id: &str, memory_id: Uuid) -> Result<Option<CmiEntry>>;

    /// All index rows for a tenant, used by routing and reconciliation.
    async fn all_for_tenant(&self, tenant_id: &str) -> Result<Vec<CmiEntry>>;

    async fn increment_access(&self, tenant_id: &str, module_id: &str, memory_id: Uuid, by: u64) -> Result<()>;

    /// Ids indexed for a given module, used to detect orphan CMI rows during
    /// reconciliation (module row absent).
    async fn list_module_memory_ids(&self, tenant_id: &str, module_id: &str) -> Result<Vec<Uuid>>;
}

/// Owns the relationship graph (spec §3 Memory Relationship).
#[async_trait]
pub trait RelationshipTable: Send + Sync {
    /// Fails with `Conflict` if `(source, target, kind)` already exists.
    async fn create(&self, rel: &Relationship) -> Result<()>;

    /// Delete every relationship touching `endpoint` (source or target),
    /// returning the number removed. Used for cascading deletes.
    async fn delete_touching(
        &self,
        tenant_id: &str,
        module_id: &str,
        memory_id: Uuid,
    ) -> Result<u64>;

    async fn get_related(
        &self,
        tenant_id: &str,
        module_id: &str,
        memory_id: Uuid,
    ) -> Result<Vec<Relationship>>;
}
