//! SQL DDL for all mnemos tables.
//!
//! Defines the `memories`, `memory_log`, and `schema_meta` tables. All DDL uses
//! `IF NOT EXISTS` for idempotent initialization. There is no vector index:
//! search is a linear scan over the active candidate set.

use rusqlite::Connection;

/// All schema DDL statements for the core tables.
const SCHEMA_SQL: &str = r#"
-- Core memory storage
CREATE TABLE IF NOT EXISTS memories (
    id TEXT PRIMARY KEY,
    agent_handle TEXT,
    path_scope TEXT,
    content TEXT NOT NULL,
    category TEXT NOT NULL CHECK(category IN ('preference','fact','correction','pattern')),
    embedding BLOB,
    source_session_id TEXT,
    source_message_id TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    last_accessed_at TEXT,
    access_count INTEGER NOT NULL DEFAULT 0,
    confidence REAL NOT NULL DEFAULT 1.0 CHECK(confidence >= 0.0 AND confidence <= 1.0),
    supersedes_id TEXT,
    superseded_by_id TEXT,
    supersede_reason TEXT,
    status TEXT NOT NULL DEFAULT 'active'
        CHECK(status IN ('active','superseded','archived','forgotten')),
    CHECK((status = 'superseded') = (superseded_by_id IS NOT NULL))
);

CREATE INDEX IF NOT EXISTS idx_memories_status ON memories(status);
CREATE INDEX IF NOT EXISTS idx_memories_agent ON memories(agent_handle);
CREATE INDEX IF NOT EXISTS idx_memories_path ON memories(path_scope);
CREATE INDEX IF NOT EXISTS idx_memories_supersedes ON memories(supersedes_id);

-- Audit log
CREATE TABLE IF NOT EXISTS memory_log (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    operation TEXT NOT NULL CHECK(operation IN ('create','update','supersede','archive','forget','clear','delete','embed')),
    memory_id TEXT NOT NULL,
    details TEXT,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_memory_log_memory ON memory_log(memory_id);

-- Schema metadata
CREATE TABLE IF NOT EXISTS schema_meta (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);
"#;

/// Initialize all schema tables. Idempotent (uses IF NOT EXISTS).
pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(SCHEMA_SQL)?;

    // Set initial schema version if not already present
    conn.execute(
        "INSERT OR IGNORE INTO schema_meta (key, value) VALUES ('schema_version', '1')",
        [],
    )?;

    Ok(())
}
