//! Batched access-count increments (spec §9 Open Questions: "an implementer
//! may batch them"). Coalesces repeated increments for the same
//! `(module_id, memory_id)` over a short window before flushing, instead of
//! one write per read.

use dashmap::DashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use uuid::Uuid;

use crate::storage::CmiTable;

#[derive(Debug, Clone, Copy)]
struct Pending {
    count: u64,
    first_seen: Instant,
}

/// Accumulates increments per `(tenant, module, memory)` and flushes any
/// entry that has aged past `window`. Flushing is fire-and-forget from the
/// caller's perspective, matching the access-count update's best-effort
/// nature (spec §4.2 failure policy).
pub struct AccessCounter {
    window: Duration,
    pending: DashMap<(String, String, Uuid), Pending>,
}

impl AccessCounter {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            pending: DashMap::new(),
        }
    }

    pub fn record(&self, tenant_id: &str, module_id: &str, memory_id: Uuid) {
        let key = (tenant_id.to_string(), module_id.to_string(), memory_id);
        self.pending
            .entry(key)
            .and_modify(|p| p.count += 1)
            .or_insert(Pending {
                count: 1,
                first_seen: Instant::now(),
            });
    }

    /// Flushes every entry older than `window`, calling `cmi_table.increment_access`
    /// for each. Failures are logged and swallowed (spec §4.2: "access-count
    /// update failure is logged and swallowed").
    pub async fn flush_aged(&self, cmi_table: &Arc<dyn CmiTable>) {
        let now = Instant::now();
        let due: Vec<(String, String, Uuid, u64)> = self
            .pending
            .iter()
            .filter(|entry| now.duration_since(entry.value().first_seen) >= self.window)
            .map(|entry| {
                let (tenant, module, memory) = entry.key().clone();
                (tenant, module, memory, entry.value().count)
            })
            .collect();

        for (tenant_id, module_id, memory_id, count) in due {
            self.pending.remove(&(tenant_id.clone(), module_id.clone(), memory_id));
            if let Err(e) = cmi_table.increment_access(&tenant_id, &module_id, memory_id, count).await {
                tracing::warn!(error = %e, %tenant_id, %module_id, %memory_id, "access-count flush failed, swallowing");
            }
        }
    }

    #[cfg(test)]
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }
}
