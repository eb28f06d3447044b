//! C5 — Write Pipeline (spec §4.3, §4.5).
//!
//! Coordinates embedding + module-store + CMI-index for each write and
//! keeps the two indexes eventually consistent under partial failure.

pub mod reconcile;
pub mod retry;

pub use reconcile::{ReconciliationJob, ReconciliationReport, TenantDirectory};

use crate::cmi::{self, Cmi, SearchOptions, SearchResult};
use crate::config::Config;
use crate::embeddings::EmbeddingProvider;
use crate::error::{FedMemError, Result};
use crate::models::MemoryRecord;
use crate::module::{ModuleRegistry, UpdateRequest};
use crate::notifier::{ChangeEvent, ChangeNotifier};
use std::sync::Arc;
use uuid::Uuid;

pub struct WritePipeline {
    registry: Arc<ModuleRegistry>,
    cmi: Arc<Cmi>,
    provider: Arc<dyn EmbeddingProvider>,
    notifier: Arc<ChangeNotifier>,
    tenants: TenantDirectory,
    config: Config,
}

impl WritePipeline {
    pub fn new(
        registry: Arc<ModuleRegistry>,
        cmi: Arc<Cmi>,
        provider: Arc<dyn EmbeddingProvider>,
        notifier: Arc<ChangeNotifier>,
        tenants: TenantDirectory,
        config: Config,
    ) -> Self {
        Self {
            registry,
            cmi,
            provider,
            notifier,
            tenants,
            config,
        }
    }

    pub fn tenants(&self) -> &TenantDirectory {
        &self.tenants
    }

    pub fn registry(&self) -> &Arc<ModuleRegistry> {
        &self.registry
    }

    pub fn cmi(&self) -> &Arc<Cmi> {
        &self.cmi
    }

    /// The eight-step store algorithm of spec §4.3. Steps 1-5 (module
    /// determination, module load, `processMetadata`, full embedding,
    /// persist) happen inside `Module::store`; here we add CMI indexing
    /// (step 6, with best-effort retry on failure) and the change event
    /// (step 7).
    pub async fn store(
        &self,
        tenant_id: &str,
        content: &str,
        metadata: crate::models::Metadata,
        module_id: Option<String>,
    ) -> Result<Uuid> {
        let module_id = module_id.unwrap_or_else(|| cmi::determine_module(content, &self.registry));
        let module = self.registry.get(&module_id)?;

        let (memory_id, processed) = module.store(self.provider.as_ref(), tenant_id, content, metadata).await?;
        self.tenants.insert(tenant_id.to_string());

        if let Err(e) = self
            .cmi
            .index_memory(tenant_id, &module_id, memory_id, content, &processed, self.provider.as_ref())
            .await
        {
            tracing::warn!(error = %e, %tenant_id, %module_id, %memory_id, "CMI index failed on store, scheduling retry");
            self.spawn_index_retry(tenant_id.to_string(), module_id.clone(), memory_id, content.to_string(), processed);
        }

        self.notifier.publish(tenant_id, ChangeEvent::memory_created(&module_id, memory_id));
        Ok(memory_id)
    }

    pub async fn get(&self, tenant_id: &str, module_id: &str, memory_id: Uuid) -> Result<Option<MemoryRecord>> {
        let module = self.registry.get(module_id)?;
        module.get(tenant_id, memory_id).await
    }

    /// Module commits first; CMI is re-upserted if content or metadata
    /// changed (spec §4.5 Update).
    pub async fn update(
        &self,
        tenant_id: &str,
        module_id: &str,
        memory_id: Uuid,
        request: UpdateRequest,
    ) -> Result<bool> {
        if request.is_noop() {
            return Ok(self.get(tenant_id, module_id, memory_id).await?.is_some());
        }
        let module = self.registry.get(module_id)?;
        let content_changed = request.content.is_some();
        let Some(processed) = module.update(self.provider.as_ref(), tenant_id, memory_id, request).await? else {
            return Ok(false);
        };
        self.tenants.insert(tenant_id.to_string());

        let record = module
            .peek(tenant_id, memory_id)
            .await?
            .ok_or_else(|| FedMemError::Internal("row vanished immediately after update".to_string()))?;

        if let Err(e) = self
            .cmi
            .index_memory(tenant_id, module_id, memory_id, &record.content, &processed, self.provider.as_ref())
            .await
        {
            tracing::warn!(error = %e, %tenant_id, %module_id, %memory_id, "CMI re-index failed on update, scheduling retry");
            self.spawn_index_retry(tenant_id.to_string(), module_id.to_string(), memory_id, record.content.clone(), processed);
        }

        let _ = content_changed; // re-embedding itself already happened inside Module::update
        self.notifier.publish(tenant_id, ChangeEvent::memory_updated(module_id, memory_id));
        Ok(true)
    }

    /// CMI delete first, then module delete, so a deleted memory becomes
    /// unreachable via federated search before the module row is gone
    /// (spec §4.5 Delete).
    pub async fn delete(&self, tenant_id: &str, module_id: &str, memory_id: Uuid) -> Result<bool> {
        self.cmi.delete_memory(tenant_id, module_id, memory_id).await?;
        let module = self.registry.get(module_id)?;
        let deleted = module.delete(tenant_id, memory_id).await?;
        if deleted {
            self.notifier.publish(tenant_id, ChangeEvent::memory_deleted(module_id, memory_id));
        }
        Ok(deleted)
    }

    pub async fn search(&self, tenant_id: &str, query: &str, options: SearchOptions) -> Result<Vec<SearchResult>> {
        self.cmi
            .search_memories(tenant_id, query, options, &self.registry, self.provider.as_ref(), &self.config)
            .await
    }

    /// Deletes every module row, CMI row, and relationship row for a
    /// tenant. Spec §3 Lifecycle mentions tenant-scoped purge but §4 never
    /// names the operation; a multi-tenant store without one is incomplete
    /// regardless.
    pub async fn purge_tenant(&self, tenant_id: &str) -> Result<u64> {
        let mut purged = 0u64;
        for module_id in self.registry.module_ids() {
            let module = self.registry.get(&module_id)?;
            let ids = module.list_ids(tenant_id).await?;
            for memory_id in ids {
                if self.delete(tenant_id, &module_id, memory_id).await? {
                    purged += 1;
                }
            }
        }
        self.tenants.remove(tenant_id);
        Ok(purged)
    }

    fn spawn_index_retry(
        &self,
        tenant_id: String,
        module_id: String,
        memory_id: Uuid,
        content: String,
        processed: crate::module::ProcessedMetadata,
    ) {
        let cmi = self.cmi.clone();
        let provider = self.provider.clone();
        let horizon = self.config.reconciliation_horizon;
        tokio::spawn(async move {
            let result = retry::retry_with_backoff(horizon, || {
                let cmi = cmi.clone();
                let provider = provider.clone();
                let tenant_id = tenant_id.clone();
                let module_id = module_id.clone();
                let content = content.clone();
                let processed = processed.clone();
                async move { cmi.index_memory(&tenant_id, &module_id, memory_id, &content, &processed, provider.as_ref()).await }
            })
            .await;
            if let Err(e) = result {
                tracing::error!(error = %e, %tenant_id, %module_id, %memory_id, "compensating CMI reindex exhausted retry horizon");
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::embeddings::DeterministicEmbeddingProvider;
    use crate::models::Metadata;
    use crate::storage::sqlite::SqliteVectorStore;
    use dashmap::DashSet;

    fn harness() -> WritePipeline {
        let store = SqliteVectorStore::open_in_memory().unwrap();
        let config = Config::default();
        let cmi = Arc::new(Cmi::new(Arc::new(store.cmi_table()), Arc::new(store.relationship_table()), &config));
        let registry = Arc::new(ModuleRegistry::new(store));
        registry.register_builtins().unwrap();
        let provider: Arc<dyn EmbeddingProvider> = Arc::new(DeterministicEmbeddingProvider::new(&config));
        let notifier = Arc::new(ChangeNotifier::new());
        let tenants: TenantDirectory = Arc::new(DashSet::new());
        WritePipeline::new(registry, cmi, provider, notifier, tenants, config)
    }

    #[tokio::test]
    async fn store_then_get_round_trips() {
        let pipeline = harness();
        let id = pipeline
            .store("t1", "function foo() { return 1 }", Metadata::new(), Some("technical".to_string()))
            .await
            .unwrap();
        let fetched = pipeline.get("t1", "technical", id).await.unwrap().unwrap();
        assert_eq!(fetched.content, "function foo() { return 1 }");
    }

    #[tokio::test]
    async fn store_indexes_memory_for_federated_search() {
        let pipeline = harness();
        pipeline
            .store("t1", "function foo() { return 1 }", Metadata::new(), Some("technical".to_string()))
            .await
            .unwrap();
        let results = pipeline
            .search("t1", "foo", SearchOptions { modules: Some(vec!["technical".to_string()]), limit: 5, min_score: -1.0 })
            .await
            .unwrap();
        assert_eq!(results.len(), 1);
    }

    #[tokio::test]
    async fn delete_then_get_is_not_found_and_search_is_empty() {
        let pipeline = harness();
        let id = pipeline
            .store("t1", "a meeting with John about CRM", Metadata::new(), Some("work".to_string()))
            .await
            .unwrap();
        assert!(pipeline.delete("t1", "work", id).await.unwrap());
        assert!(pipeline.get("t1", "work", id).await.unwrap().is_none());
        let results = pipeline
            .search("t1", "CRM", SearchOptions { modules: Some(vec!["work".to_string()]), limit: 5, min_score: -1.0 })
            .await
            .unwrap();
        assert!(results.iter().all(|r| r.memory_id != id));
    }

    #[tokio::test]
    async fn cross_tenant_isolation_on_get() {
        let pipeline = harness();
        let id = pipeline.store("tenantB", "secret", Metadata::new(), Some("personal".to_string())).await.unwrap();
        assert!(pipeline.get("tenantA", "personal", id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn update_reembeds_and_changes_ranking() {
        let pipeline = harness();
        let m1 = pipeline
            .store("t1", "Had a meeting with John at 3pm about the CRM project", Metadata::new(), Some("work".to_string()))
            .await
            .unwrap();
        pipeline
            .store("t1", "function foo() { return 1 }", Metadata::new(), Some("technical".to_string()))
            .await
            .unwrap();

        let updated = pipeline
            .update(
                "t1",
                "work",
                m1,
                UpdateRequest { content: Some("Rescheduled meeting with John to Friday".to_string()), metadata: None },
            )
            .await
            .unwrap();
        assert!(updated);

        let results = pipeline
            .search("t1", "Friday meeting", SearchOptions { modules: Some(vec!["work".to_string()]), limit: 5, min_score: -1.0 })
            .await
            .unwrap();
        assert_eq!(results[0].memory_id, m1);
    }

    #[tokio::test]
    async fn purge_tenant_removes_every_row() {
        let pipeline = harness();
        pipeline.store("t1", "first memory", Metadata::new(), Some("personal".to_string())).await.unwrap();
        pipeline.store("t1", "second memory", Metadata::new(), Some("personal".to_string())).await.unwrap();
        let purged = pipeline.purge_tenant("t1").await.unwrap();
        assert_eq!(purged, 2);
        let results = pipeline
            .search("t1", "memory", SearchOptions { modules: Some(vec!["personal".to_string()]), limit: 10, min_score: -1.0 })
            .await
            .unwrap();
        assert!(results.is_empty());
    }
}
