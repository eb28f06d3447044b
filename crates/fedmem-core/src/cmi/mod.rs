//! C4 — Central Memory Index (spec §4.2).
//!
//! Owns the routing index, decides which modules to probe for a query,
//! executes federated search, merges/ranks/dedupes, and maintains the
//! relationship graph.

pub mod access_counter;
pub mod relationships;
pub mod routing_cache;

pub use access_counter::AccessCounter;
pub use routing_cache::RoutingCache;

use crate::config::Config;
use crate::embeddings::{cosine_similarity, Dimension, EmbeddingProvider};
use crate::error::Result;
use crate::models::{CmiEntry, MemoryRef, Metadata, Relationship};
use crate::module::{Module, ModuleRegistry, ProcessedMetadata};
use crate::storage::{CmiTable, RelationshipTable};
use std::cmp::Ordering;
use std::collections::HashSet;
use std::sync::Arc;
use uuid::Uuid;

/// One module's contribution to a routed query (spec §3 Routing Decision).
#[derive(Debug, Clone, PartialEq)]
pub struct RoutingDecision {
    pub module_id: String,
    pub confidence: f32,
    pub matched_keywords: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct SearchOptions {
    pub modules: Option<Vec<String>>,
    pub limit: usize,
    pub min_score: f32,
}

/// One row of a federated search result (spec §4.2 searchMemories).
#[derive(Debug, Clone)]
pub struct SearchResult {
    pub module_id: String,
    pub memory_id: Uuid,
    pub similarity: f32,
    pub title: String,
    pub summary: String,
    pub importance: f32,
}

const SEARCH_PADDING: usize = 2;

pub struct Cmi {
    cmi_table: Arc<dyn CmiTable>,
    relationship_table: Arc<dyn RelationshipTable>,
    routing_cache: RoutingCache,
    access_counter: AccessCounter,
}

impl Cmi {
    pub fn new(cmi_table: Arc<dyn CmiTable>, relationship_table: Arc<dyn RelationshipTable>, config: &Config) -> Self {
        Self {
            cmi_table,
            relationship_table,
            routing_cache: RoutingCache::new(config.routing_cache_ttl),
            access_counter: AccessCounter::new(config.access_count_batch_window),
        }
    }

    pub fn cmi_table(&self) -> &Arc<dyn CmiTable> {
        &self.cmi_table
    }

    pub fn relationship_table(&self) -> &Arc<dyn RelationshipTable> {
        &self.relationship_table
    }

    pub fn access_counter(&self) -> &AccessCounter {
        &self.access_counter
    }

    /// Spawns the continuous background flush of batched access-count
    /// increments (spec §9 Open Questions: "an implementer may batch
    /// them"), ticking at the same window the counter coalesces on. The
    /// returned handle can be `.abort()`ed on shutdown.
    pub fn spawn_access_counter_flush(self: Arc<Self>, window: std::time::Duration) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(window);
            loop {
                ticker.tick().await;
                self.access_counter.flush_aged(&self.cmi_table).await;
            }
        })
    }

    /// Computes the routing embedding and upserts the index row keyed by
    /// `(module_id, memory_id)`. Idempotent on retry.
    pub async fn index_memory(
        &self,
        tenant_id: &str,
        module_id: &str,
        memory_id: Uuid,
        content: &str,
        processed: &ProcessedMetadata,
        provider: &dyn EmbeddingProvider,
    ) -> Result<()> {
        let embed_input = format!("{} {} {}", processed.title, processed.summary, content);
        let routing_embedding = provider.embed(&embed_input, Dimension::Route).await?;
        let entry = CmiEntry::new(
            tenant_id,
            module_id,
            memory_id,
            routing_embedding,
            processed.title.clone(),
            processed.summary.clone(),
            processed.keywords.clone(),
            processed.categories.clone(),
            processed.importance,
        );
        self.cmi_table.upsert(&entry).await?;
        self.routing_cache.invalidate_tenant(tenant_id);
        Ok(())
    }

    /// The seven-step routing algorithm of spec §4.2.
    pub async fn route_query(
        &self,
        tenant_id: &str,
        query: &str,
        provider: &dyn EmbeddingProvider,
        config: &Config,
        top_k: usize,
    ) -> Result<Vec<RoutingDecision>> {
        // 1. cache check
        if let Some(cached) = self.routing_cache.get(tenant_id, query) {
            return Ok(cached);
        }

        // 2. routing embedding of the query
        let query_embedding = provider.embed(query, Dimension::Route).await?;

        // 3. per-row cosine + keyword containment
        let rows = self.cmi_table.all_for_tenant(tenant_id).await?;
        let query_lower = query.to_lowercase();

        struct Contribution {
            module_id: String,
            cosine: f32,
            matched: Vec<String>,
        }
        let mut contributions = Vec::new();
        for row in &rows {
            let cosine = cosine_similarity(&row.routing_embedding, &query_embedding);
            let matched: Vec<String> = row
                .keywords
                .iter()
                .filter(|kw| query_lower.contains(&kw.to_lowercase()))
                .cloned()
                .collect();

            // 4. contributes iff cosine >= threshold OR any keyword match
            if cosine >= config.route_confidence_threshold || !matched.is_empty() {
                contributions.push(Contribution {
                    module_id: row.module_id.clone(),
                    cosine,
                    matched,
                });
            }
        }

        // 5. per-module aggregation: mean cosine, deduplicated keyword union
        let mut by_module: std::collections::HashMap<String, (f32, usize, HashSet<String>)> =
            std::collections::HashMap::new();
        for c in contributions {
            let entry = by_module.entry(c.module_id).or_insert((0.0, 0, HashSet::new()));
            entry.0 += c.cosine;
            entry.1 += 1;
            entry.2.extend(c.matched);
        }

        let mut decisions: Vec<RoutingDecision> = by_module
            .into_iter()
            .map(|(module_id, (sum_cosine, count, keywords))| {
                let mut matched_keywords: Vec<String> = keywords.into_iter().collect();
                matched_keywords.sort();
                RoutingDecision {
                    module_id,
                    confidence: if count > 0 { sum_cosine / count as f32 } else { 0.0 },
                    matched_keywords,
                }
            })
            .collect();

        // 6. top_k by confidence desc, tie-break by module id
        decisions.sort_by(|a, b| {
            b.confidence
                .partial_cmp(&a.confidence)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.module_id.cmp(&b.module_id))
        });
        decisions.truncate(top_k);

        // 7. cache with 5-minute TTL
        self.routing_cache.put(tenant_id, query, decisions.clone());
        Ok(decisions)
    }

    /// The eight-step federated search algorithm of spec §4.2.
    pub async fn search_memories(
        &self,
        tenant_id: &str,
        query: &str,
        options: SearchOptions,
        registry: &ModuleRegistry,
        provider: &dyn EmbeddingProvider,
        config: &Config,
    ) -> Result<Vec<SearchResult>> {
        let limit = if options.limit == 0 { 10 } else { options.limit };

        // 1. explicit modules, or route, degrading to probe-all on empty routing
        let modules: Vec<String> = match options.modules {
            Some(explicit) if !explicit.is_empty() => explicit,
            _ => {
                let routed = self.route_query(tenant_id, query, provider, config, 3).await?;
                if routed.is_empty() {
                    registry.module_ids()
                } else {
                    routed.into_iter().map(|d| d.module_id).collect()
                }
            }
        };
        if modules.is_empty() {
            return Ok(Vec::new());
        }

        // 2. single query embedding (full dimension)
        let query_embedding = provider.embed(query, Dimension::Full).await?;

        // 3. parallel per-module dispatch, bounded by ceil(limit/n)+padding
        let n_modules = modules.len().max(1);
        let per_module_limit = limit.div_ceil(n_modules) + SEARCH_PADDING;

        let mut handles = Vec::with_capacity(modules.len());
        for module_id in &modules {
            let module: Option<Arc<dyn Module>> = registry.get(module_id).ok();
            let Some(module) = module else { continue };
            let tenant_id = tenant_id.to_string();
            let query_embedding = query_embedding.clone();
            let min_score = options.min_score;
            let module_id = module_id.clone();
            handles.push(tokio::spawn(async move {
                let result = module
                    .search_by_embedding(&tenant_id, &query_embedding, per_module_limit, min_score, &[])
                    .await;
                (module_id, result)
            }));
        }

        // 4. collect successes, log-and-skip failures
        let joined = futures::future::join_all(handles).await;
        let mut raw_results: Vec<(String, f32, Uuid, Metadata, chrono::DateTime<chrono::Utc>)> = Vec::new();
        for outcome in joined {
            let (module_id, result) = match outcome {
                Ok(pair) => pair,
                Err(e) => {
                    tracing::warn!(error = %e, "module search task panicked, skipping");
                    continue;
                }
            };
            match result {
                Ok(scored) => {
                    for s in scored {
                        raw_results.push((module_id.clone(), s.score, s.record.id, s.record.metadata, s.record.last_access));
                    }
                }
                Err(e) => {
                    tracing::warn!(error = %e, %module_id, "in-module search failed, skipping");
                }
            }
        }

        // 5. rank by similarity * importance, then last-access recency
        raw_results.sort_by(|a, b| {
            let importance_a = a.3.get("importance").and_then(|v| v.as_f64()).unwrap_or(0.5) as f32;
            let importance_b = b.3.get("importance").and_then(|v| v.as_f64()).unwrap_or(0.5) as f32;
            let rank_a = a.1 * importance_a;
            let rank_b = b.1 * importance_b;
            rank_b
                .partial_cmp(&rank_a)
                .unwrap_or(Ordering::Equal)
                .then_with(|| b.4.cmp(&a.4))
        });

        // 6. dedup by (module_id, memory_id), first occurrence wins
        let mut seen = HashSet::new();
        let mut deduped = Vec::new();
        for row in raw_results {
            let key = (row.0.clone(), row.2);
            if seen.insert(key) {
                deduped.push(row);
            }
        }

        // 7. truncate to limit
        deduped.truncate(limit);

        // 8. fire-and-forget access-count increments
        for (module_id, _, memory_id, _, _) in &deduped {
            self.access_counter.record(tenant_id, module_id, *memory_id);
        }

        Ok(deduped
            .into_iter()
            .map(|(module_id, similarity, memory_id, metadata, _)| SearchResult {
                title: metadata.get("title").and_then(|v| v.as_str()).unwrap_or_default().to_string(),
                summary: metadata.get("summary").and_then(|v| v.as_str()).unwrap_or_default().to_string(),
                importance: metadata.get("importance").and_then(|v| v.as_f64()).unwrap_or(0.5) as f32,
                module_id,
                memory_id,
                similarity,
            })
            .collect())
    }

    pub async fn create_relationship(
        &self,
        tenant_id: &str,
        source: MemoryRef,
        target: MemoryRef,
        kind: &str,
        strength: f32,
        metadata: Metadata,
    ) -> Result<Relationship> {
        relationships::create_relationship(&self.relationship_table, tenant_id, source, target, kind, strength, metadata).await
    }

    pub async fn get_related_memories(&self, tenant_id: &str, module_id: &str, memory_id: Uuid) -> Result<Vec<Relationship>> {
        relationships::get_related_memories(&self.relationship_table, tenant_id, module_id, memory_id).await
    }

    /// Removes relationships first (cascade either side), then the index
    /// row. Idempotent.
    pub async fn delete_memory(&self, tenant_id: &str, module_id: &str, memory_id: Uuid) -> Result<()> {
        relationships::delete_touching(&self.relationship_table, tenant_id, module_id, memory_id).await?;
        self.cmi_table.delete(tenant_id, module_id, memory_id).await?;
        self.routing_cache.invalidate_tenant(tenant_id);
        Ok(())
    }
}

/// Keyword-voting module determination for writes where the caller did not
/// pick a module; `personal` is the canonical fallback (spec §4.2, Design
/// Notes §9 Open Questions).
pub fn determine_module(content: &str, registry: &ModuleRegistry) -> String {
    let lower = content.to_lowercase();
    let mut best: Option<(String, usize)> = None;
    for module_id in registry.module_ids() {
        let Ok(module) = registry.get(&module_id) else { continue };
        let score: usize = module
            .config()
            .policy
            .taxonomy
            .iter()
            .map(|(_, keywords)| keywords.iter().map(|kw| lower.matches(kw.as_str()).count()).sum::<usize>())
            .sum();
        if score == 0 {
            continue;
        }
        if best.as_ref().map(|(_, best_score)| score > *best_score).unwrap_or(true) {
            best = Some((module_id, score));
        }
    }
    best.map(|(id, _)| id).unwrap_or_else(|| "personal".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::DeterministicEmbeddingProvider;
    use crate::models::MemoryRef;
    use crate::storage::sqlite::SqliteVectorStore;

    fn cmi_with_store() -> (Cmi, SqliteVectorStore, Config) {
        let store = SqliteVectorStore::open_in_memory().unwrap();
        let config = Config::default();
        let cmi = Cmi::new(Arc::new(store.cmi_table()), Arc::new(store.relationship_table()), &config);
        (cmi, store, config)
    }

    #[tokio::test]
    async fn index_memory_then_route_query_finds_it() {
        let (cmi, _store, config) = cmi_with_store();
        let provider = DeterministicEmbeddingProvider::new(&config);
        let processed = ProcessedMetadata {
            metadata: Metadata::new(),
            title: "bug report".to_string(),
            summary: "a crash happened".to_string(),
            keywords: vec!["bug".to_string(), "crash".to_string()],
            categories: vec!["bug".to_string()],
            importance: 0.8,
        };
        let memory_id = Uuid::new_v4();
        cmi.index_memory("t1", "technical", memory_id, "a crash happened in prod", &processed, &provider)
            .await
            .unwrap();

        let decisions = cmi.route_query("t1", "bug crash", &provider, &config, 3).await.unwrap();
        assert!(decisions.iter().any(|d| d.module_id == "technical"));
    }

    #[tokio::test]
    async fn route_query_is_cached_on_second_call() {
        let (cmi, _store, config) = cmi_with_store();
        let provider = DeterministicEmbeddingProvider::new(&config);
        let first = cmi.route_query("t1", "hello world", &provider, &config, 3).await.unwrap();
        let second = cmi.route_query("t1", "hello world", &provider, &config, 3).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn delete_memory_removes_relationships_and_index_row() {
        let (cmi, _store, config) = cmi_with_store();
        let provider = DeterministicEmbeddingProvider::new(&config);
        let processed = ProcessedMetadata {
            metadata: Metadata::new(),
            title: "t".into(),
            summary: "s".into(),
            keywords: vec![],
            categories: vec![],
            importance: 0.5,
        };
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        cmi.index_memory("t1", "technical", a, "content a", &processed, &provider).await.unwrap();
        cmi.index_memory("t1", "work", b, "content b", &processed, &provider).await.unwrap();
        cmi.create_relationship(
            "t1",
            MemoryRef { module_id: "technical".into(), memory_id: a },
            MemoryRef { module_id: "work".into(), memory_id: b },
            "similar",
            0.9,
            Metadata::new(),
        )
        .await
        .unwrap();

        cmi.delete_memory("t1", "technical", a).await.unwrap();
        assert!(cmi.get_related_memories("t1", "work", b).await.unwrap().is_empty());
        assert!(cmi.cmi_table.get("t1", "technical", a).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn determine_module_falls_back_to_personal() {
        let store = SqliteVectorStore::open_in_memory().unwrap();
        let registry = ModuleRegistry::new(store);
        registry.register_builtins().unwrap();
        let module_id = determine_module("nothing identifiable here at all", &registry);
        assert_eq!(module_id, "personal");
    }

    #[tokio::test]
    async fn determine_module_picks_highest_scoring_taxonomy() {
        let store = SqliteVectorStore::open_in_memory().unwrap();
        let registry = ModuleRegistry::new(store);
        registry.register_builtins().unwrap();
        let module_id = determine_module("a critical bug crashed with an error", &registry);
        assert_eq!(module_id, "technical");
    }

    #[tokio::test]
    async fn search_memories_dedupes_and_respects_limit() {
        let (cmi, store, config) = cmi_with_store();
        let registry = ModuleRegistry::new(store);
        registry.register_builtins().unwrap();
        let provider = DeterministicEmbeddingProvider::new(&config);

        let technical = registry.get("technical").unwrap();
        for i in 0..5 {
            technical
                .store(&provider, "t1", &format!("bug number {} crashed", i), Metadata::new())
                .await
                .unwrap();
        }

        let options = SearchOptions {
            modules: Some(vec!["technical".to_string()]),
            limit: 3,
            min_score: -1.0,
        };
        let results = cmi.search_memories("t1", "bug crash", options, &registry, &provider, &config).await.unwrap();
        assert!(results.len() <= 3);
        let mut seen = HashSet::new();
        for r in &results {
            assert!(seen.insert((r.module_id.clone(), r.memory_id)));
        }
    }
}
