//! SQLite implementation of [`MemoryRepository`].
//!
//! One connection behind a `Mutex`; every write runs in a transaction together
//! with its `memory_log` audit row. Embeddings are stored as the packed
//! little-endian bytes produced by [`crate::vector::serialize`].

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::Serialize;

use crate::error::{MemoryError, Result};
use crate::memory::repository::{ListOptions, MemoryRepository};
use crate::memory::types::{Memory, Status};
use crate::vector;

const MEMORY_COLUMNS: &str = "id, agent_handle, path_scope, content, category, embedding, \
     source_session_id, source_message_id, created_at, updated_at, last_accessed_at, \
     access_count, confidence, supersedes_id, superseded_by_id, supersede_reason, status";

/// One row of the audit log.
#[derive(Debug, Clone, Serialize)]
pub struct LogEntry {
    pub operation: String,
    pub memory_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
    pub created_at: String,
}

pub struct SqliteRepository {
    conn: Mutex<Connection>,
}

impl SqliteRepository {
    /// Open (or create) a database file.
    pub fn open(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        Ok(Self::from_connection(super::open_database(path)?))
    }

    /// Fresh in-memory database, mainly for tests.
    pub fn in_memory() -> anyhow::Result<Self> {
        Ok(Self::from_connection(super::open_memory_database()?))
    }

    /// Wrap an already-initialized connection.
    pub fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| anyhow::anyhow!("db lock poisoned: {e}").into())
    }

    /// Audit entries for one memory, oldest first.
    pub fn audit_log(&self, memory_id: &str) -> Result<Vec<LogEntry>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT operation, memory_id, details, created_at \
             FROM memory_log WHERE memory_id = ?1 ORDER BY id",
        )?;
        let rows = stmt
            .query_map(params![memory_id], |row| {
                let details: Option<String> = row.get(2)?;
                Ok(LogEntry {
                    operation: row.get(0)?,
                    memory_id: row.get(1)?,
                    details: details.and_then(|s| serde_json::from_str(&s).ok()),
                    created_at: row.get(3)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    /// Identifier of the embedder whose vectors are stored here, if recorded.
    pub fn embedding_model(&self) -> Result<Option<String>> {
        let conn = self.conn()?;
        Ok(super::migrations::get_embedding_model(&conn)?)
    }

    pub fn set_embedding_model(&self, model: &str) -> Result<()> {
        let conn = self.conn()?;
        super::migrations::set_embedding_model(&conn, model)?;
        Ok(())
    }

    fn query_memories(&self, sql: &str, params: impl rusqlite::Params) -> Result<Vec<Memory>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt
            .query_map(params, memory_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    /// Why a conditional status update touched no rows.
    fn explain_no_rows(conn: &Connection, id: &str) -> MemoryError {
        let status: rusqlite::Result<Option<String>> = conn
            .query_row("SELECT status FROM memories WHERE id = ?1", params![id], |row| row.get(0))
            .optional();
        match status {
            Ok(Some(status)) => match status.parse::<Status>() {
                Ok(status) => MemoryError::NotActive {
                    id: id.to_string(),
                    status,
                },
                Err(reason) => MemoryError::Corrupt {
                    id: id.to_string(),
                    reason,
                },
            },
            Ok(None) => MemoryError::NotFound(id.to_string()),
            Err(e) => e.into(),
        }
    }
}

fn now() -> String {
    chrono::Utc::now().to_rfc3339()
}

fn memory_from_row(row: &Row<'_>) -> rusqlite::Result<Memory> {
    let category: String = row.get(4)?;
    let status: String = row.get(16)?;
    let embedding: Option<Vec<u8>> = row.get(5)?;

    Ok(Memory {
        id: row.get(0)?,
        agent_handle: row.get(1)?,
        path_scope: row.get(2)?,
        content: row.get(3)?,
        category: category.parse().map_err(|e: String| conversion_error(4, e))?,
        embedding: embedding.map(|bytes| vector::deserialize(&bytes)),
        source_session_id: row.get(6)?,
        source_message_id: row.get(7)?,
        created_at: row.get(8)?,
        updated_at: row.get(9)?,
        last_accessed_at: row.get(10)?,
        access_count: row.get(11)?,
        confidence: row.get(12)?,
        supersedes_id: row.get(13)?,
        superseded_by_id: row.get(14)?,
        supersede_reason: row.get(15)?,
        status: status.parse().map_err(|e: String| conversion_error(16, e))?,
    })
}

fn conversion_error(column: usize, message: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(column, Type::Text, message.into())
}

/// Write an entry to the memory_log audit table.
fn write_audit_log(
    conn: &Connection,
    operation: &str,
    memory_id: &str,
    details: Option<&serde_json::Value>,
) -> Result<()> {
    let details_json = details.map(|d| d.to_string());
    conn.execute(
        "INSERT INTO memory_log (operation, memory_id, details, created_at) VALUES (?1, ?2, ?3, ?4)",
        params![operation, memory_id, details_json, now()],
    )?;
    Ok(())
}

impl MemoryRepository for SqliteRepository {
    fn insert(&self, memory: &Memory) -> Result<()> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        let embedding = memory.embedding.as_deref().map(vector::serialize);

        tx.execute(
            &format!(
                "INSERT INTO memories ({MEMORY_COLUMNS}) VALUES \
                 (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)"
            ),
            params![
                memory.id,
                memory.agent_handle,
                memory.path_scope,
                memory.content,
                memory.category.as_str(),
                embedding,
                memory.source_session_id,
                memory.source_message_id,
                memory.created_at,
                memory.updated_at,
                memory.last_accessed_at,
                memory.access_count,
                memory.confidence,
                memory.supersedes_id,
                memory.superseded_by_id,
                memory.supersede_reason,
                memory.status.as_str(),
            ],
        )?;

        let details = memory
            .supersedes_id
            .as_ref()
            .map(|old| serde_json::json!({ "supersedes": old }));
        write_audit_log(&tx, "create", &memory.id, details.as_ref())?;
        tx.commit()?;
        Ok(())
    }

    fn update(&self, memory: &Memory) -> Result<()> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        let embedding = memory.embedding.as_deref().map(vector::serialize);

        let rows = tx.execute(
            "UPDATE memories SET agent_handle = ?1, path_scope = ?2, content = ?3, category = ?4, \
             embedding = ?5, source_session_id = ?6, source_message_id = ?7, confidence = ?8, \
             updated_at = ?9 WHERE id = ?10",
            params![
                memory.agent_handle,
                memory.path_scope,
                memory.content,
                memory.category.as_str(),
                embedding,
                memory.source_session_id,
                memory.source_message_id,
                memory.confidence,
                memory.updated_at,
                memory.id,
            ],
        )?;
        if rows == 0 {
            return Err(MemoryError::NotFound(memory.id.clone()));
        }

        write_audit_log(&tx, "update", &memory.id, None)?;
        tx.commit()?;
        Ok(())
    }

    fn mark_superseded(&self, old_id: &str, new_id: &str, reason: &str) -> Result<()> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        let rows = tx.execute(
            "UPDATE memories SET status = 'superseded', superseded_by_id = ?1, \
             supersede_reason = ?2, updated_at = ?3 WHERE id = ?4 AND status = 'active'",
            params![new_id, reason, now(), old_id],
        )?;
        if rows == 0 {
            return Err(Self::explain_no_rows(&tx, old_id));
        }

        write_audit_log(
            &tx,
            "supersede",
            old_id,
            Some(&serde_json::json!({ "superseded_by": new_id, "reason": reason })),
        )?;
        tx.commit()?;
        Ok(())
    }

    fn soft_delete(&self, id: &str) -> Result<()> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        let status: Option<String> = tx
            .query_row("SELECT status FROM memories WHERE id = ?1", params![id], |row| {
                row.get(0)
            })
            .optional()?;
        match status.as_deref() {
            None => return Err(MemoryError::NotFound(id.to_string())),
            // Keep the supersession pair intact; the record is already out of the active set.
            Some("superseded") => return Ok(()),
            Some(_) => {}
        }

        tx.execute(
            "UPDATE memories SET status = 'forgotten', updated_at = ?1 WHERE id = ?2",
            params![now(), id],
        )?;
        write_audit_log(&tx, "forget", id, None)?;
        tx.commit()?;
        Ok(())
    }

    fn archive(&self, id: &str) -> Result<()> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        let rows = tx.execute(
            "UPDATE memories SET status = 'archived', updated_at = ?1 \
             WHERE id = ?2 AND status = 'active'",
            params![now(), id],
        )?;
        if rows == 0 {
            return Err(Self::explain_no_rows(&tx, id));
        }

        write_audit_log(&tx, "archive", id, None)?;
        tx.commit()?;
        Ok(())
    }

    fn soft_delete_scope(&self, agent_handle: Option<&str>) -> Result<usize> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        let rows = tx.execute(
            "UPDATE memories SET status = 'forgotten', updated_at = ?1 \
             WHERE status = 'active' AND (?2 IS NULL OR agent_handle = ?2)",
            params![now(), agent_handle],
        )?;

        write_audit_log(
            &tx,
            "clear",
            agent_handle.unwrap_or("*"),
            Some(&serde_json::json!({ "forgotten": rows })),
        )?;
        tx.commit()?;
        Ok(rows)
    }

    fn hard_delete(&self, id: &str) -> Result<()> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        let rows = tx.execute("DELETE FROM memories WHERE id = ?1", params![id])?;
        if rows == 0 {
            return Err(MemoryError::NotFound(id.to_string()));
        }

        write_audit_log(&tx, "delete", id, None)?;
        tx.commit()?;
        Ok(())
    }

    fn fetch(&self, id: &str) -> Result<Option<Memory>> {
        let conn = self.conn()?;
        let memory = conn
            .query_row(
                &format!("SELECT {MEMORY_COLUMNS} FROM memories WHERE id = ?1"),
                params![id],
                memory_from_row,
            )
            .optional()?;
        Ok(memory)
    }

    fn fetch_active_by_prefix(&self, prefix: &str) -> Result<Vec<Memory>> {
        self.query_memories(
            &format!(
                "SELECT {MEMORY_COLUMNS} FROM memories \
                 WHERE status = 'active' AND substr(id, 1, length(?1)) = ?1 ORDER BY id"
            ),
            params![prefix],
        )
    }

    fn search_candidates(
        &self,
        agent_handle: Option<&str>,
        path_scope: Option<&str>,
    ) -> Result<Vec<Memory>> {
        self.query_memories(
            &format!(
                "SELECT {MEMORY_COLUMNS} FROM memories WHERE status = 'active' \
                 AND (?1 IS NULL OR agent_handle = ?1) AND (?2 IS NULL OR path_scope = ?2)"
            ),
            params![agent_handle, path_scope],
        )
    }

    fn list(&self, options: &ListOptions) -> Result<Vec<Memory>> {
        self.query_memories(
            &format!(
                "SELECT {MEMORY_COLUMNS} FROM memories \
                 WHERE (?1 IS NULL OR agent_handle = ?1) AND (?2 OR status = 'active') \
                 ORDER BY created_at DESC, id DESC LIMIT ?3 OFFSET ?4"
            ),
            params![
                options.agent_handle,
                options.include_inactive,
                options.limit as i64,
                options.offset as i64,
            ],
        )
    }

    fn count(&self, agent_handle: Option<&str>) -> Result<usize> {
        let conn = self.conn()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM memories WHERE status = 'active' \
             AND (?1 IS NULL OR agent_handle = ?1)",
            params![agent_handle],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    fn touch_access(&self, ids: &[&str], accessed_at: &str) -> Result<()> {
        if ids.is_empty() {
            return Ok(());
        }
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "UPDATE memories SET access_count = access_count + 1, last_accessed_at = ?1 \
                 WHERE id = ?2",
            )?;
            for id in ids {
                stmt.execute(params![accessed_at, id])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn set_embedding(&self, id: &str, embedding: &[f32]) -> Result<()> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        let rows = tx.execute(
            "UPDATE memories SET embedding = ?1 WHERE id = ?2",
            params![vector::serialize(embedding), id],
        )?;
        if rows == 0 {
            return Err(MemoryError::NotFound(id.to_string()));
        }

        write_audit_log(
            &tx,
            "embed",
            id,
            Some(&serde_json::json!({ "dimension": embedding.len() })),
        )?;
        tx.commit()?;
        Ok(())
    }

    fn missing_embeddings(&self, limit: usize) -> Result<Vec<Memory>> {
        self.query_memories(
            &format!(
                "SELECT {MEMORY_COLUMNS} FROM memories \
                 WHERE status = 'active' AND embedding IS NULL \
                 ORDER BY created_at, id LIMIT ?1"
            ),
            params![limit as i64],
        )
    }
}
