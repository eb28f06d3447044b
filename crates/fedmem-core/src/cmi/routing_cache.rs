//! Per-entry-TTL routing cache keyed by `(tenant, normalized query)`
//! (spec §3 Routing Decision: "Cache key is (tenant, normalized query).
//! TTL: 5 minutes. Invalidated on any write to CMI for that tenant.").
//!
//! A concurrent map with per-entry TTL, no locks on the hot path beyond the
//! map's own striping (Design Notes §9).

use dashmap::DashMap;
use std::time::{Duration, Instant};

use super::RoutingDecision;

struct CacheEntry {
    decisions: Vec<RoutingDecision>,
    expires_at: Instant,
}

pub struct RoutingCache {
    ttl: Duration,
    entries: DashMap<(String, String), CacheEntry>,
}

fn normalize(query: &str) -> String {
    query.trim().to_lowercase()
}

impl RoutingCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: DashMap::new(),
        }
    }

    pub fn get(&self, tenant_id: &str, query: &str) -> Option<Vec<RoutingDecision>> {
        let key = (tenant_id.to_string(), normalize(query));
        let entry = self.entries.get(&key)?;
        if entry.expires_at < Instant::now() {
            drop(entry);
            self.entries.remove(&key);
            return None;
        }
        Some(entry.decisions.clone())
    }

    pub fn put(&self, tenant_id: &str, query: &str, decisions: Vec<RoutingDecision>) {
        let key = (tenant_id.to_string(), normalize(query));
        self.entries.insert(
            key,
            CacheEntry {
                decisions,
                expires_at: Instant::now() + self.ttl,
            },
        );
    }

    /// Invalidates every cached routing decision for `tenant_id` — called on
    /// any CMI write for that tenant (spec §3).
    pub fn invalidate_tenant(&self, tenant_id: &str) {
        self.entries.retain(|(tenant, _), _| tenant != tenant_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decision() -> Vec<RoutingDecision> {
        vec![RoutingDecision {
            module_id: "technical".to_string(),
            confidence: 0.9,
            matched_keywords: vec!["bug".to_string()],
        }]
    }

    #[test]
    fn put_then_get_returns_cached_value() {
        let cache = RoutingCache::new(Duration::from_secs(300));
        cache.put("t1", "Find Bugs", decision());
        assert!(cache.get("t1", "find bugs").is_some());
    }

    #[test]
    fn expired_entry_returns_none() {
        let cache = RoutingCache::new(Duration::from_millis(1));
        cache.put("t1", "query", decision());
        std::thread::sleep(Duration::from_millis(20));
        assert!(cache.get("t1", "query").is_none());
    }

    #[test]
    fn invalidate_tenant_clears_only_that_tenant() {
        let cache = RoutingCache::new(Duration::from_secs(300));
        cache.put("t1", "query", decision());
        cache.put("t2", "query", decision());
        cache.invalidate_tenant("t1");
        assert!(cache.get("t1", "query").is_none());
        assert!(cache.get("t2", "query").is_some());
    }
}
