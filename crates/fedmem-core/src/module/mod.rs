//! C3 — Module (spec §4.1).
//!
//! The teacher's class-based module hierarchy with virtual methods becomes
//! one interface (`Module`) plus a configuration record (`ModuleConfig`);
//! concrete modules are `ModuleConfig` + `ProcessingPolicy` values rather
//! than subtypes (Design Notes §9).

pub mod contract;
pub mod processing;
pub mod registry;

mod communication;
mod creative;
mod learning;
mod personal;
mod technical;
mod work;

pub use contract::{ProcessedMetadata, UpdateRequest};
pub use processing::{auto_computed_keys, EntityField, ImportanceWeights, ProcessingPolicy, SignalLexicon};
pub use registry::ModuleRegistry;

pub use communication::config as communication_config;
pub use creative::config as creative_config;
pub use learning::config as learning_config;
pub use personal::config as personal_config;
pub use technical::config as technical_config;
pub use work::config as work_config;

use crate::embeddings::{Dimension, EmbeddingProvider};
use crate::error::{FedMemError, Result};
use crate::models::{MemoryRecord, Metadata};
use crate::storage::{MetadataFilter, ModuleStats, ModuleTable, ScoredMemory};
use async_trait::async_trait;
use std::sync::Arc;
use uuid::Uuid;

/// Static configuration for one module: identity plus its processing
/// policy. Concrete modules (`technical`, `personal`, ...) are values of
/// this type, not distinct Rust types.
#[derive(Debug, Clone)]
pub struct ModuleConfig {
    pub id: String,
    pub display_name: String,
    pub description: String,
    pub searchable_fields: Vec<String>,
    pub policy: ProcessingPolicy,
}

/// The public contract every module satisfies (spec §4.1). All operations
/// are tenant-scoped.
#[async_trait]
pub trait Module: Send + Sync {
    fn id(&self) -> &str;

    fn config(&self) -> &ModuleConfig;

    /// Runs `processMetadata`, embeds `title || summary || content` via
    /// `provider`, and persists one row. Fails with `Invalid` on empty
    /// content; embedding failure leaves no row written.
    async fn store(
        &self,
        provider: &dyn EmbeddingProvider,
        tenant_id: &str,
        content: &str,
        user_metadata: Metadata,
    ) -> Result<(Uuid, ProcessedMetadata)>;

    /// Increments the access counter iff the row is found.
    async fn get(&self, tenant_id: &str, memory_id: Uuid) -> Result<Option<MemoryRecord>>;

    /// If `content` changes, re-embeds and re-runs `processMetadata`. Returns
    /// the reprocessed metadata when the row existed, so the pipeline can
    /// decide whether to re-index in CMI.
    async fn update(
        &self,
        provider: &dyn EmbeddingProvider,
        tenant_id: &str,
        memory_id: Uuid,
        request: UpdateRequest,
    ) -> Result<Option<ProcessedMetadata>>;

    async fn delete(&self, tenant_id: &str, memory_id: Uuid) -> Result<bool>;

    async fn search_by_embedding(
        &self,
        tenant_id: &str,
        query: &[f32],
        limit: usize,
        min_score: f32,
        filters: &[MetadataFilter],
    ) -> Result<Vec<ScoredMemory>>;

    async fn search_by_metadata(&self, tenant_id: &str, criteria: &[MetadataFilter]) -> Result<Vec<MemoryRecord>>;

    async fn stats(&self, tenant_id: &str) -> Result<ModuleStats>;

    async fn list_ids(&self, tenant_id: &str) -> Result<Vec<Uuid>>;

    async fn increment_access(&self, tenant_id: &str, memory_id: Uuid, by: u64) -> Result<()>;

    /// Fetches a row without incrementing its access counter. Used
    /// internally by the reconciliation job, which must not count as a
    /// caller-facing read (spec §3: "Access counters are incremented only
    /// by successful search/get operations").
    async fn peek(&self, tenant_id: &str, memory_id: Uuid) -> Result<Option<MemoryRecord>>;
}

/// Generic `Module` implementation parameterized by a `ModuleConfig` value
/// (holding the `ProcessingPolicy`) plus a `ModuleTable` handle.
pub struct GenericModule {
    config: ModuleConfig,
    table: Arc<dyn ModuleTable>,
}

impl GenericModule {
    pub fn new(config: ModuleConfig, table: Arc<dyn ModuleTable>) -> Self {
        Self { config, table }
    }
}

const MAX_CONTENT_BYTES: usize = 64 * 1024;

#[async_trait]
impl Module for GenericModule {
    fn id(&self) -> &str {
        &self.config.id
    }

    fn config(&self) -> &ModuleConfig {
        &self.config
    }

    async fn store(
        &self,
        provider: &dyn EmbeddingProvider,
        tenant_id: &str,
        content: &str,
        user_metadata: Metadata,
    ) -> Result<(Uuid, ProcessedMetadata)> {
        if content.trim().is_empty() {
            return Err(FedMemError::Invalid("content must not be empty".to_string()));
        }
        if content.len() > MAX_CONTENT_BYTES {
            return Err(FedMemError::Invalid(format!(
                "content exceeds {} bytes",
                MAX_CONTENT_BYTES
            )));
        }

        let processed = processing::process_metadata(content, user_metadata, &self.config.policy);
        let embed_input = format!("{} {} {}", processed.title, processed.summary, content);
        let embedding = provider.embed(&embed_input, Dimension::Full).await?;

        let record = MemoryRecord::new(tenant_id, content.to_string(), embedding, processed.metadata.clone());
        self.table.insert(&record).await?;
        Ok((record.id, processed))
    }

    async fn get(&self, tenant_id: &str, memory_id: Uuid) -> Result<Option<MemoryRecord>> {
        let found = self.table.get(tenant_id, memory_id).await?;
        if found.is_some() {
            self.table.increment_access(tenant_id, memory_id, 1).await?;
        }
        Ok(found)
    }

    async fn update(
        &self,
        provider: &dyn EmbeddingProvider,
        tenant_id: &str,
        memory_id: Uuid,
        request: UpdateRequest,
    ) -> Result<Option<ProcessedMetadata>> {
        let Some(existing) = self.table.get(tenant_id, memory_id).await? else {
            return Ok(None);
        };

        let new_content = request.content.clone().unwrap_or_else(|| existing.content.clone());
        if new_content.trim().is_empty() {
            return Err(FedMemError::Invalid("content must not be empty".to_string()));
        }

        let base_metadata = match request.metadata.clone() {
            Some(m) => m,
            None => {
                let mut m = existing.metadata.clone();
                if request.content.is_some() {
                    // Content changed but the caller didn't replace metadata:
                    // drop the previous auto-computed fields so they are
                    // re-derived from the new content instead of staying
                    // stuck at the old text's values (`fill_if_absent` can't
                    // tell a stale auto-field from a caller-supplied one).
                    for key in auto_computed_keys() {
                        m.remove(key);
                    }
                }
                m
            }
        };
        let processed = processing::process_metadata(&new_content, base_metadata, &self.config.policy);

        let new_embedding = if request.content.is_some() {
            let embed_input = format!("{} {} {}", processed.title, processed.summary, new_content);
            Some(provider.embed(&embed_input, Dimension::Full).await?)
        } else {
            None
        };

        let updated = self
            .table
            .update(
                tenant_id,
                memory_id,
                request.content.clone(),
                new_embedding,
                Some(processed.metadata.clone()),
            )
            .await?;
        if !updated {
            return Ok(None);
        }
        Ok(Some(processed))
    }

    async fn delete(&self, tenant_id: &str, memory_id: Uuid) -> Result<bool> {
        self.table.delete(tenant_id, memory_id).await
    }

    async fn search_by_embedding(
        &self,
        tenant_id: &str,
        query: &[f32],
        limit: usize,
        min_score: f32,
        filters: &[MetadataFilter],
    ) -> Result<Vec<ScoredMemory>> {
        self.table
            .search_by_embedding(tenant_id, query, limit, min_score, filters)
            .await
    }

    async fn search_by_metadata(&self, tenant_id: &str, criteria: &[MetadataFilter]) -> Result<Vec<MemoryRecord>> {
        self.table.search_by_metadata(tenant_id, criteria).await
    }

    async fn stats(&self, tenant_id: &str) -> Result<ModuleStats> {
        self.table.stats(tenant_id).await
    }

    async fn list_ids(&self, tenant_id: &str) -> Result<Vec<Uuid>> {
        self.table.list_ids(tenant_id).await
    }

    async fn increment_access(&self, tenant_id: &str, memory_id: Uuid, by: u64) -> Result<()> {
        self.table.increment_access(tenant_id, memory_id, by).await
    }

    async fn peek(&self, tenant_id: &str, memory_id: Uuid) -> Result<Option<MemoryRecord>> {
        self.table.get(tenant_id, memory_id).await
    }
}
