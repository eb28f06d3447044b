//! Continuous reconciliation (spec §4.5, Open Questions: "this spec
//! mandates continuous"). Walks each tenant's module tables against the
//! CMI, back-filling missing rows and purging orphans, on a fixed
//! interval — grounded in the teacher's `tokio::spawn` interval-loop
//! pattern in `dashboard/websocket.rs`'s heartbeat task, generalized from a
//! heartbeat emitter to a reconciliation sweep.

use crate::cmi::Cmi;
use crate::embeddings::EmbeddingProvider;
use crate::error::Result;
use crate::module::{ModuleRegistry, ProcessedMetadata};
use dashmap::DashSet;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// Process-wide set of tenants seen so far, reconstructed as writes land
/// (spec §6: "All other state ... is process memory and reconstructed on
/// restart").
pub type TenantDirectory = Arc<DashSet<String>>;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconciliationReport {
    pub backfilled: u64,
    pub purged: u64,
}

pub struct ReconciliationJob {
    registry: Arc<ModuleRegistry>,
    cmi: Arc<Cmi>,
    provider: Arc<dyn EmbeddingProvider>,
    tenants: TenantDirectory,
    interval: Duration,
}

impl ReconciliationJob {
    pub fn new(
        registry: Arc<ModuleRegistry>,
        cmi: Arc<Cmi>,
        provider: Arc<dyn EmbeddingProvider>,
        tenants: TenantDirectory,
        interval: Duration,
    ) -> Self {
        Self {
            registry,
            cmi,
            provider,
            tenants,
            interval,
        }
    }

    /// One sweep over every known tenant.
    pub async fn run_once(&self) -> ReconciliationReport {
        let mut total = ReconciliationReport::default();
        let tenant_ids: Vec<String> = self.tenants.iter().map(|t| t.clone()).collect();
        for tenant_id in tenant_ids {
            match self.reconcile_tenant(&tenant_id).await {
                Ok(report) => {
                    total.backfilled += report.backfilled;
                    total.purged += report.purged;
                }
                Err(e) => {
                    tracing::warn!(error = %e, %tenant_id, "reconciliation sweep failed for tenant");
                }
            }
        }
        total
    }

    /// Back-fills missing CMI rows and purges orphans for one tenant
    /// across every registered module.
    pub async fn reconcile_tenant(&self, tenant_id: &str) -> Result<ReconciliationReport> {
        let mut report = ReconciliationReport::default();

        for module_id in self.registry.module_ids() {
            let module = self.registry.get(&module_id)?;
            let live_ids: HashSet<Uuid> = module.list_ids(tenant_id).await?.into_iter().collect();
            let indexed_ids: HashSet<Uuid> = self
                .cmi
                .cmi_table()
                .list_module_memory_ids(tenant_id, &module_id)
                .await?
                .into_iter()
                .collect();

            for missing_id in live_ids.difference(&indexed_ids) {
                if let Some(record) = module.peek(tenant_id, *missing_id).await? {
                    let processed = processed_from_record(&record.metadata);
                    self.cmi
                        .index_memory(tenant_id, &module_id, *missing_id, &record.content, &processed, self.provider.as_ref())
                        .await?;
                    report.backfilled += 1;
                }
            }

            for orphan_id in indexed_ids.difference(&live_ids) {
                self.cmi.delete_memory(tenant_id, &module_id, *orphan_id).await?;
                report.purged += 1;
            }
        }

        Ok(report)
    }

    /// Spawns the continuous sweep loop. The returned handle can be
    /// `.abort()`ed on shutdown.
    pub fn spawn(self: Arc<Self>) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.interval);
            loop {
                ticker.tick().await;
                let report = self.run_once().await;
                if report.backfilled > 0 || report.purged > 0 {
                    tracing::info!(backfilled = report.backfilled, purged = report.purged, "reconciliation sweep complete");
                }
            }
        })
    }
}

fn processed_from_record(metadata: &crate::models::Metadata) -> ProcessedMetadata {
    ProcessedMetadata {
        metadata: metadata.clone(),
        title: metadata.get("title").and_then(|v| v.as_str()).unwrap_or_default().to_string(),
        summary: metadata.get("summary").and_then(|v| v.as_str()).unwrap_or_default().to_string(),
        keywords: metadata.string_list("keywords"),
        categories: metadata.categories(),
        importance: metadata.get("importance").and_then(|v| v.as_f64()).unwrap_or(0.5) as f32,
    }
}
