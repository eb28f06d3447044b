//! Schema creation for the reference SQLite backend.
//!
//! Mirrors the per-module table shape of spec §6. Embeddings are stored as
//! little-endian `f32` BLOBs (no native vector column type in SQLite); the
//! query layer deserializes and scores them in Rust.

use rusqlite::Connection;

pub fn module_table_name(module_id: &str) -> String {
    format!("module_{}", module_id.replace(['-', ' '], "_"))
}

pub fn ensure_module_table(conn: &Connection, module_id: &str) -> rusqlite::Result<()> {
    let table = module_table_name(module_id);
    conn.execute_batch(&format!(
        "CREATE TABLE IF NOT EXISTS {table} (
            id TEXT PRIMARY KEY,
            tenant_id TEXT NOT NULL,
            content TEXT NOT NULL,
            embedding BLOB NOT NULL,
            metadata TEXT NOT NULL,
            access_count INTEGER NOT NULL DEFAULT 0,
            last_access TEXT NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_{table}_tenant ON {table}(tenant_id);",
    ))
}

pub fn ensure_cmi_table(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS cmi_index (
            id TEXT PRIMARY KEY,
            tenant_id TEXT NOT NULL,
            module_id TEXT NOT NULL,
            remote_memory_id TEXT NOT NULL,
            routing_embedding BLOB NOT NULL,
            title TEXT NOT NULL,
            summary TEXT NOT NULL,
            keywords TEXT NOT NULL,
            categories TEXT NOT NULL,
            importance REAL NOT NULL,
            access_count INTEGER NOT NULL DEFAULT 0,
            last_access TEXT NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            UNIQUE(module_id, remote_memory_id)
        );
        CREATE INDEX IF NOT EXISTS idx_cmi_tenant ON cmi_index(tenant_id);",
    )
}

pub fn ensure_relationship_table(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS relationships (
            id TEXT PRIMARY KEY,
            tenant_id TEXT NOT NULL,
            source_module TEXT NOT NULL,
            source_memory_id TEXT NOT NULL,
            target_module TEXT NOT NULL,
            target_memory_id TEXT NOT NULL,
            kind TEXT NOT NULL,
            strength REAL NOT NULL,
            metadata TEXT NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            UNIQUE(source_module, source_memory_id, target_module, target_memory_id, kind)
        );
        CREATE INDEX IF NOT EXISTS idx_rel_tenant ON relationships(tenant_id);
        CREATE INDEX IF NOT EXISTS idx_rel_source ON relationships(source_module, source_memory_id);
        CREATE INDEX IF NOT EXISTS idx_rel_target ON relationships(target_module, target_memory_id);",
    )
}

pub fn embedding_to_blob(v: &[f32]) -> Vec<u8> {
    let mut out = Vec::with_capacity(v.len() * 4);
    for x in v {
        out.extend_from_slice(&x.to_le_bytes());
    }
    out
}

pub fn blob_to_embedding(b: &[u8]) -> Vec<f32> {
    b.chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect()
}
