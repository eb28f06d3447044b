//! Reference `ModuleTable` / `CmiTable` / `RelationshipTable` implementation
//! backed by a single `rusqlite::Connection` behind a `Mutex`, in the same
//! shape as the teacher's `storage/sqlite.rs`: `params!`-based prepared
//! statements, `OptionalExtension` for get-or-none, cosine scoring done in
//! Rust rather than relying on a native vector column.

use super::migrations::{
    blob_to_embedding, embedding_to_blob, ensure_cmi_table, ensure_module_table,
    ensure_relationship_table, module_table_name,
};
use super::{CmiTable, MetadataFilter, ModuleStats, ModuleTable, RelationshipTable, ScoredMemory};
use crate::embeddings::cosine_similarity;
use crate::error::{FedMemError, Result};
use crate::models::{CmiEntry, MemoryRecord, Metadata, Relationship};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

/// Shared handle to the reference SQLite backend. Cheaply clonable; every
/// `ModuleTable`/`CmiTable`/`RelationshipTable` handed out shares the same
/// underlying connection, matching the single-writer-per-tenant model of
/// spec §5 (row-level locking is approximated here by a single mutex).
#[derive(Clone)]
pub struct SqliteVectorStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteVectorStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path).map_err(FedMemError::from)?;
        ensure_cmi_table(&conn).map_err(FedMemError::from)?;
        ensure_relationship_table(&conn).map_err(FedMemError::from)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(FedMemError::from)?;
        ensure_cmi_table(&conn).map_err(FedMemError::from)?;
        ensure_relationship_table(&conn).map_err(FedMemError::from)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Returns a `ModuleTable` handle for `module_id`, creating its backing
    /// table on first use (load-on-demand, per spec §4.3 step 2).
    pub fn module_table(&self, module_id: &str) -> Result<SqliteModuleTable> {
        let conn = self.conn.lock().expect("sqlite mutex poisoned");
        ensure_module_table(&conn, module_id).map_err(FedMemError::from)?;
        drop(conn);
        Ok(SqliteModuleTable {
            conn: self.conn.clone(),
            module_id: module_id.to_string(),
            table: module_table_name(module_id),
        })
    }

    pub fn cmi_table(&self) -> SqliteCmiTable {
        SqliteCmiTable {
            conn: self.conn.clone(),
        }
    }

    pub fn relationship_table(&self) -> SqliteRelationshipTable {
        SqliteRelationshipTable {
            conn: self.conn.clone(),
        }
    }
}

fn parse_ts(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

fn row_to_record(
    id: String,
    tenant_id: String,
    content: String,
    embedding: Vec<u8>,
    metadata: String,
    access_count: i64,
    last_access: String,
    created_at: String,
    updated_at: String,
) -> MemoryRecord {
    MemoryRecord {
        id: Uuid::parse_str(&id).unwrap_or_else(|_| Uuid::nil()),
        tenant_id,
        content,
        embedding: blob_to_embedding(&embedding),
        metadata: Metadata::from_json_str(&metadata),
        access_count: access_count.max(0) as u64,
        last_access: parse_ts(&last_access),
        created_at: parse_ts(&created_at),
        updated_at: parse_ts(&updated_at),
    }
}

fn passes_filters(record: &MemoryRecord, filters: &[MetadataFilter]) -> bool {
    filters
        .iter()
        .all(|f| record.metadata.matches_path(&f.path, &f.expected))
}

// ============================================================================
// MODULE TABLE
// ============================================================================

pub struct SqliteModuleTable {
    conn: Arc<Mutex<Connection>>,
    #[allow(dead_code)]
    module_id: String,
    table: String,
}

#[async_trait]
impl ModuleTable for SqliteModuleTable {
    async fn insert(&self, record: &MemoryRecord) -> Result<()> {
        let conn = self.conn.lock().expect("sqlite mutex poisoned");
        conn.execute(
            &format!(
                "INSERT INTO {} (id, tenant_id, content, embedding, metadata, access_count, last_access, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                self.table
            ),
            params![
                record.id.to_string(),
                record.tenant_id,
                record.content,
                embedding_to_blob(&record.embedding),
                record.metadata.to_json_string(),
                record.access_count as i64,
                record.last_access.to_rfc3339(),
                record.created_at.to_rfc3339(),
                record.updated_at.to_rfc3339(),
            ],
        )
        .map_err(FedMemError::from)?;
        Ok(())
    }

    async fn get(&self, tenant_id: &str, memory_id: Uuid) -> Result<Option<MemoryRecord>> {
        let conn = self.conn.lock().expect("sqlite mutex poisoned");
        let row = conn
            .query_row(
                &format!(
                    "SELECT id, tenant_id, content, embedding, metadata, access_count, last_access, created_at, updated_at
                     FROM {} WHERE tenant_id = ?1 AND id = ?2",
                    self.table
                ),
                params![tenant_id, memory_id.to_string()],
                |r| {
                    Ok(row_to_record(
                        r.get(0)?,
                        r.get(1)?,
                        r.get(2)?,
                        r.get(3)?,
                        r.get(4)?,
                        r.get(5)?,
                        r.get(6)?,
                        r.get(7)?,
                        r.get(8)?,
                    ))
                },
            )
            .optional()
            .map_err(FedMemError::from)?;
        Ok(row)
    }

    async fn update(
        &self,
        tenant_id: &str,
        memory_id: Uuid,
        content: Option<String>,
        embedding: Option<Vec<f32>>,
        metadata: Option<Metadata>,
    ) -> Result<bool> {
        let conn = self.conn.lock().expect("sqlite mutex poisoned");
        let existing = conn
            .query_row(
                &format!(
                    "SELECT content, embedding, metadata FROM {} WHERE tenant_id = ?1 AND id = ?2",
                    self.table
                ),
                params![tenant_id, memory_id.to_string()],
                |r| {
                    let content: String = r.get(0)?;
                    let embedding: Vec<u8> = r.get(1)?;
                    let metadata: String = r.get(2)?;
                    Ok((content, embedding, metadata))
                },
            )
            .optional()
            .map_err(FedMemError::from)?;
        let Some((old_content, old_embedding, old_metadata)) = existing else {
            return Ok(false);
        };
        let new_content = content.unwrap_or(old_content);
        let new_embedding = embedding.map(|e| embedding_to_blob(&e)).unwrap_or(old_embedding);
        let new_metadata = metadata.map(|m| m.to_json_string()).unwrap_or(old_metadata);
        let updated = conn
            .execute(
                &format!(
                    "UPDATE {} SET content = ?1, embedding = ?2, metadata = ?3, updated_at = ?4
                     WHERE tenant_id = ?5 AND id = ?6",
                    self.table
                ),
                params![
                    new_content,
                    new_embedding,
                    new_metadata,
                    Utc::now().to_rfc3339(),
                    tenant_id,
                    memory_id.to_string(),
                ],
            )
            .map_err(FedMemError::from)?;
        Ok(updated > 0)
    }

    async fn delete(&self, tenant_id: &str, memory_id: Uuid) -> Result<bool> {
        let conn = self.conn.lock().expect("sqlite mutex poisoned");
        let deleted = conn
            .execute(
                &format!("DELETE FROM {} WHERE tenant_id = ?1 AND id = ?2", self.table),
                params![tenant_id, memory_id.to_string()],
            )
            .map_err(FedMemError::from)?;
        Ok(deleted > 0)
    }

    async fn increment_access(&self, tenant_id: &str, memory_id: Uuid, by: u64) -> Result<()> {
        let conn = self.conn.lock().expect("sqlite mutex poisoned");
        conn.execute(
            &format!(
                "UPDATE {} SET access_count = access_count + ?1, last_access = ?2
                 WHERE tenant_id = ?3 AND id = ?4",
                self.table
            ),
            params![by as i64, Utc::now().to_rfc3339(), tenant_id, memory_id.to_string()],
        )
        .map_err(FedMemError::from)?;
        Ok(())
    }

    async fn search_by_embedding(
        &self,
        tenant_id: &str,
        query: &[f32],
        limit: usize,
        min_score: f32,
        filters: &[MetadataFilter],
    ) -> Result<Vec<ScoredMemory>> {
        let conn = self.conn.lock().expect("sqlite mutex poisoned");
        let mut stmt = conn
            .prepare(&format!(
                "SELECT id, tenant_id, content, embedding, metadata, access_count, last_access, created_at, updated_at
                 FROM {} WHERE tenant_id = ?1",
                self.table
            ))
            .map_err(FedMemError::from)?;
        let rows = stmt
            .query_map(params![tenant_id], |r| {
                Ok(row_to_record(
                    r.get(0)?, r.get(1)?, r.get(2)?, r.get(3)?, r.get(4)?, r.get(5)?, r.get(6)?, r.get(7)?, r.get(8)?,
                ))
            })
            .map_err(FedMemError::from)?;

        let mut scored: Vec<ScoredMemory> = Vec::new();
        for row in rows {
            let record = row.map_err(FedMemError::from)?;
            if !passes_filters(&record, filters) {
                continue;
            }
            let score = cosine_similarity(&record.embedding, query);
            if score >= min_score {
                scored.push(ScoredMemory { record, score });
            }
        }

        // score desc, then access_count desc, then last_access desc (spec §4.1).
        scored.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| b.record.access_count.cmp(&a.record.access_count))
                .then_with(|| b.record.last_access.cmp(&a.record.last_access))
        });
        scored.truncate(limit);
        Ok(scored)
    }

    async fn search_by_metadata(
        &self,
        tenant_id: &str,
        criteria: &[MetadataFilter],
    ) -> Result<Vec<MemoryRecord>> {
        let conn = self.conn.lock().expect("sqlite mutex poisoned");
        let mut stmt = conn
            .prepare(&format!(
                "SELECT id, tenant_id, content, embedding, metadata, access_count, last_access, created_at, updated_at
                 FROM {} WHERE tenant_id = ?1",
                self.table
            ))
            .map_err(FedMemError::from)?;
        let rows = stmt
            .query_map(params![tenant_id], |r| {
                Ok(row_to_record(
                    r.get(0)?, r.get(1)?, r.get(2)?, r.get(3)?, r.get(4)?, r.get(5)?, r.get(6)?, r.get(7)?, r.get(8)?,
                ))
            })
            .map_err(FedMemError::from)?;
        let mut out = Vec::new();
        for row in rows {
            let record = row.map_err(FedMemError::from)?;
            if passes_filters(&record, criteria) {
                out.push(record);
            }
        }
        out.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(out)
    }

    async fn stats(&self, tenant_id: &str) -> Result<ModuleStats> {
        let conn = self.conn.lock().expect("sqlite mutex poisoned");
        let mut stmt = conn
            .prepare(&format!(
                "SELECT content, metadata, access_count, last_access FROM {} WHERE tenant_id = ?1",
                self.table
            ))
            .map_err(FedMemError::from)?;
        let rows = stmt
            .query_map(params![tenant_id], |r| {
                let content: String = r.get(0)?;
                let metadata: String = r.get(1)?;
                let access_count: i64 = r.get(2)?;
                let last_access: String = r.get(3)?;
                Ok((content, metadata, access_count, last_access))
            })
            .map_err(FedMemError::from)?;

        let mut total = 0u64;
        let mut total_bytes = 0u64;
        let mut last_access: Option<DateTime<Utc>> = None;
        let mut category_counts: HashMap<String, u64> = HashMap::new();
        let mut access_sum = 0u64;

        for row in rows {
            let (content, metadata, access_count, last_access_str) = row.map_err(FedMemError::from)?;
            total += 1;
            total_bytes += content.len() as u64 + metadata.len() as u64;
            access_sum += access_count.max(0) as u64;
            let ts = parse_ts(&last_access_str);
            last_access = Some(last_access.map_or(ts, |cur| cur.max(ts)));
            for cat in Metadata::from_json_str(&metadata).categories() {
                *category_counts.entry(cat).or_insert(0) += 1;
            }
        }

        let mut top_categories: Vec<(String, u64)> = category_counts.into_iter().collect();
        top_categories.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        top_categories.truncate(10);

        Ok(ModuleStats {
            total,
            total_bytes,
            last_access,
            top_categories,
            avg_access_count: if total > 0 { access_sum as f64 / total as f64 } else { 0.0 },
        })
    }

    async fn list_ids(&self, tenant_id: &str) -> Result<Vec<Uuid>> {
        let conn = self.conn.lock().expect("sqlite mutex poisoned");
        let mut stmt = conn
            .prepare(&format!("SELECT id FROM {} WHERE tenant_id = ?1", self.table))
            .map_err(FedMemError::from)?;
        let rows = stmt
            .query_map(params![tenant_id], |r| r.get::<_, String>(0))
            .map_err(FedMemError::from)?;
        let mut out = Vec::new();
        for row in rows {
            let s = row.map_err(FedMemError::from)?;
            if let Ok(id) = Uuid::parse_str(&s) {
                out.push(id);
            }
        }
        Ok(out)
    }
}

// ============================================================================
// CMI TABLE
// ============================================================================

pub struct SqliteCmiTable {
    conn: Arc<Mutex<Connection>>,
}

fn row_to_cmi_entry(
    id: String,
    tenant_id: String,
    module_id: String,
    remote_memory_id: String,
    routing_embedding: Vec<u8>,
    title: String,
    summary: String,
    keywords: String,
    categories: String,
    importance: f64,
    access_count: i64,
    last_access: String,
    created_at: String,
    updated_at: String,
) -> CmiEntry {
    CmiEntry {
        id: Uuid::parse_str(&id).unwrap_or_else(|_| Uuid::nil()),
        tenant_id,
        module_id,
        remote_memory_id: Uuid::parse_str(&remote_memory_id).unwrap_or_else(|_| Uuid::nil()),
        routing_embedding: blob_to_embedding(&routing_embedding),
        title,
        summary,
        keywords: serde_json::from_str(&keywords).unwrap_or_default(),
        categories: serde_json::from_str(&categories).unwrap_or_default(),
        importance: importance as f32,
        access_count: access_count.max(0) as u64,
        last_access: parse_ts(&last_access),
        created_at: parse_ts(&created_at),
        updated_at: parse_ts(&updated_at),
    }
}

#[async_trait]
impl CmiTable for SqliteCmiTable {
    async fn upsert(&self, entry: &CmiEntry) -> Result<()> {
        let conn = self.conn.lock().expect("sqlite mutex poisoned");
        conn.execute(
            "INSERT INTO cmi_index
                (id, tenant_id, module_id, remote_memory_id, routing_embedding, title, summary, keywords, categories, importance, access_count, last_access, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
             ON CONFLICT(module_id, remote_memory_id) DO UPDATE SET
                routing_embedding = excluded.routing_embedding,
                title = excluded.title,
                summary = excluded.summary,
                keywords = excluded.keywords,
                categories = excluded.categories,
                importance = excluded.importance,
                updated_at = excluded.updated_at",
            params![
                entry.id.to_string(),
                entry.tenant_id,
                entry.module_id,
                entry.remote_memory_id.to_string(),
                embedding_to_blob(&entry.routing_embedding),
                entry.title,
                entry.summary,
                serde_json::to_string(&entry.keywords).unwrap_or_default(),
                serde_json::to_string(&entry.categories).unwrap_or_default(),
                entry.importance as f64,
                entry.access_count as i64,
                entry.last_access.to_rfc3339(),
                entry.created_at.to_rfc3339(),
                entry.updated_at.to_rfc3339(),
            ],
        )
        .map_err(FedMemError::from)?;
        Ok(())
    }

    async fn delete(&self, tenant_id: &str, module_id: &str, memory_id: Uuid) -> Result<()> {
        let conn = self.conn.lock().expect("sqlite mutex poisoned");
        conn.execute(
            "DELETE FROM cmi_index WHERE tenant_id = ?1 AND module_id = ?2 AND remote_memory_id = ?3",
            params![tenant_id, module_id, memory_id.to_string()],
        )
        .map_err(FedMemError::from)?;
        Ok(())
    }

    async fn get(&self, tenant_id: &str, module_id: &str, memory_id: Uuid) -> Result<Option<CmiEntry>> {
        let conn = self.conn.lock().expect("sqlite mutex poisoned");
        let row = conn
            .query_row(
                "SELECT id, tenant_id, module_id, remote_memory_id, routing_embedding, title, summary, keywords, categories, importance, access_count, last_access, created_at, updated_at
                 FROM cmi_index WHERE tenant_id = ?1 AND module_id = ?2 AND remote_memory_id = ?3",
                params![tenant_id, module_id, memory_id.to_string()],
                |r| {
                    Ok(row_to_cmi_entry(
                        r.get(0)?, r.get(1)?, r.get(2)?, r.get(3)?, r.get(4)?, r.get(5)?, r.get(6)?,
                        r.get(7)?, r.get(8)?, r.get(9)?, r.get(10)?, r.get(11)?, r.get(12)?, r.get(13)?,
                    ))
                },
            )
            .optional()
            .map_err(FedMemError::from)?;
        Ok(row)
    }

    async fn all_for_tenant(&self, tenant_id: &str) -> Result<Vec<CmiEntry>> {
        let conn = self.conn.lock().expect("sqlite mutex poisoned");
        let mut stmt = conn
            .prepare(
                "SELECT id, tenant_id, module_id, remote_memory_id, routing_embedding, title, summary, keywords, categories, importance, access_count, last_access, created_at, updated_at
                 FROM cmi_index WHERE tenant_id = ?1",
            )
            .map_err(FedMemError::from)?;
        let rows = stmt
            .query_map(params![tenant_id], |r| {
                Ok(row_to_cmi_entry(
                    r.get(0)?, r.get(1)?, r.get(2)?, r.get(3)?, r.get(4)?, r.get(5)?, r.get(6)?,
                    r.get(7)?, r.get(8)?, r.get(9)?, r.get(10)?, r.get(11)?, r.get(12)?, r.get(13)?,
                ))
            })
            .map_err(FedMemError::from)?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row.map_err(FedMemError::from)?);
        }
        Ok(out)
    }

    async fn increment_access(&self, tenant_id: &str, module_id: &str, memory_id: Uuid, by: u64) -> Result<()> {
        let conn = self.conn.lock().expect("sqlite mutex poisoned");
        conn.execute(
            "UPDATE cmi_index SET access_count = access_count + ?1, last_access = ?2
             WHERE tenant_id = ?3 AND module_id = ?4 AND remote_memory_id = ?5",
            params![by as i64, Utc::now().to_rfc3339(), tenant_id, module_id, memory_id.to_string()],
        )
        .map_err(FedMemError::from)?;
        Ok(())
    }

    async fn list_module_memory_ids(&self, tenant_id: &str, module_id: &str) -> Result<Vec<Uuid>> {
        let conn = self.conn.lock().expect("sqlite mutex poisoned");
        let mut stmt = conn
            .prepare("SELECT remote_memory_id FROM cmi_index WHERE tenant_id = ?1 AND module_id = ?2")
            .map_err(FedMemError::from)?;
        let rows = stmt
            .query_map(params![tenant_id, module_id], |r| r.get::<_, String>(0))
            .map_err(FedMemError::from)?;
        let mut out = Vec::new();
        for row in rows {
            let s = row.map_err(FedMemError::from)?;
            if let Ok(id) = Uuid::parse_str(&s) {
                out.push(id);
            }
        }
        Ok(out)
    }
}

// ============================================================================
// RELATIONSHIP TABLE
// ============================================================================

pub struct SqliteRelationshipTable {
    conn: Arc<Mutex<Connection>>,
}

#[async_trait]
impl RelationshipTable for SqliteRelationshipTable {
    async fn create(&self, rel: &Relationship) -> Result<()> {
        let conn = self.conn.lock().expect("sqlite mutex poisoned");
        let result = conn.execute(
            "INSERT INTO relationships
                (id, tenant_id, source_module, source_memory_id, target_module, target_memory_id, kind, strength, metadata, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                rel.id.to_string(),
                rel.tenant_id,
                rel.source.module_id,
                rel.source.memory_id.to_string(),
                rel.target.module_id,
                rel.target.memory_id.to_string(),
                rel.kind,
                rel.strength as f64,
                rel.metadata.to_json_string(),
                rel.created_at.to_rfc3339(),
                rel.updated_at.to_rfc3339(),
            ],
        );
        match result {
            Ok(_) => Ok(()),
            Err(rusqlite::Error::SqliteFailure(e, _)) if e.code == rusqlite::ErrorCode::ConstraintViolation => {
                Err(FedMemError::Conflict(format!(
                    "relationship ({}, {}, {}) already exists",
                    rel.source.memory_id, rel.target.memory_id, rel.kind
                )))
            }
            Err(e) => Err(FedMemError::from(e)),
        }
    }

    async fn delete_touching(&self, tenant_id: &str, module_id: &str, memory_id: Uuid) -> Result<u64> {
        let conn = self.conn.lock().expect("sqlite mutex poisoned");
        let id_str = memory_id.to_string();
        let deleted = conn
            .execute(
                "DELETE FROM relationships WHERE tenant_id = ?1 AND
                 ((source_module = ?2 AND source_memory_id = ?3) OR (target_module = ?2 AND target_memory_id = ?3))",
                params![tenant_id, module_id, id_str],
            )
            .map_err(FedMemError::from)?;
        Ok(deleted as u64)
    }

    async fn get_related(&self, tenant_id: &str, module_id: &str, memory_id: Uuid) -> Result<Vec<Relationship>> {
        let conn = self.conn.lock().expect("sqlite mutex poisoned");
        let id_str = memory_id.to_string();
        let mut stmt = conn
            .prepare(
                "SELECT id, tenant_id, source_module, source_memory_id, target_module, target_memory_id, kind, strength, metadata, created_at, updated_at
                 FROM relationships WHERE tenant_id = ?1 AND
                 ((source_module = ?2 AND source_memory_id = ?3) OR (target_module = ?2 AND target_memory_id = ?3))
                 ORDER BY strength DESC, id ASC",
            )
            .map_err(FedMemError::from)?;
        let rows = stmt
            .query_map(params![tenant_id, module_id, id_str], |r| {
                let id: String = r.get(0)?;
                let tenant_id: String = r.get(1)?;
                let source_module: String = r.get(2)?;
                let source_memory_id: String = r.get(3)?;
                let target_module: String = r.get(4)?;
                let target_memory_id: String = r.get(5)?;
                let kind: String = r.get(6)?;
                let strength: f64 = r.get(7)?;
                let metadata: String = r.get(8)?;
                let created_at: String = r.get(9)?;
                let updated_at: String = r.get(10)?;
                Ok((
                    id, tenant_id, source_module, source_memory_id, target_module, target_memory_id,
                    kind, strength, metadata, created_at, updated_at,
                ))
            })
            .map_err(FedMemError::from)?;

        let mut out = Vec::new();
        for row in rows {
            let (id, tenant_id, source_module, source_memory_id, target_module, target_memory_id, kind, strength, metadata, created_at, updated_at) =
                row.map_err(FedMemError::from)?;
            out.push(Relationship {
                id: Uuid::parse_str(&id).unwrap_or_else(|_| Uuid::nil()),
                tenant_id,
                source: crate::models::MemoryRef {
                    module_id: source_module,
                    memory_id: Uuid::parse_str(&source_memory_id).unwrap_or_else(|_| Uuid::nil()),
                },
                target: crate::models::MemoryRef {
                    module_id: target_module,
                    memory_id: Uuid::parse_str(&target_memory_id).unwrap_or_else(|_| Uuid::nil()),
                },
                kind,
                strength: strength as f32,
                metadata: Metadata::from_json_str(&metadata),
                created_at: parse_ts(&created_at),
                updated_at: parse_ts(&updated_at),
            });
        }
        Ok(out)
    }
}
