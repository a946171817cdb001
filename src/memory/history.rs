//! Append-only change ledger.
//!
//! Every store mutation appends exactly one [`HistoryEntry`] inside the same
//! transaction as the mutation itself. Entries are never updated or deleted,
//! and they carry no foreign key: the ledger outlives the memories it
//! describes.

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use crate::error::{HindsightError, Result};
use crate::memory::types::{HistoryEntry, HistoryOp};

/// Append an entry for `memory_id`. Call with the mutation's transaction so
/// the entry commits or rolls back together with it.
pub fn append(
    conn: &Connection,
    memory_id: &str,
    operation: HistoryOp,
    snapshot: &serde_json::Value,
) -> Result<HistoryEntry> {
    let entry = HistoryEntry {
        id: Uuid::new_v4().to_string(),
        memory_id: memory_id.to_string(),
        operation,
        content_snapshot: snapshot.clone(),
        created_at: Utc::now().to_rfc3339(),
    };

    conn.execute(
        "INSERT INTO memory_history (id, memory_id, operation, content_snapshot, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            entry.id,
            entry.memory_id,
            entry.operation.as_str(),
            entry.content_snapshot.to_string(),
            entry.created_at
        ],
    )?;

    Ok(entry)
}

/// All entries for a memory, newest first.
pub fn list_for(conn: &Connection, memory_id: &str) -> Result<Vec<HistoryEntry>> {
    let mut stmt = conn.prepare(
        "SELECT id, memory_id, operation, content_snapshot, created_at
         FROM memory_history
         WHERE memory_id = ?1
         ORDER BY created_at DESC, rowid DESC",
    )?;

    let rows = stmt.query_map(params![memory_id], |row| HistoryEntry::from_row(row))?;

    let mut entries = Vec::new();
    for row in rows {
        entries.push(row?);
    }
    Ok(entries)
}

/// Fetch one entry, requiring that it belongs to `memory_id`.
pub fn get(conn: &Connection, history_id: &str, memory_id: &str) -> Result<HistoryEntry> {
    let entry = conn
        .query_row(
            "SELECT id, memory_id, operation, content_snapshot, created_at
             FROM memory_history
             WHERE id = ?1 AND memory_id = ?2",
            params![history_id, memory_id],
            |row| HistoryEntry::from_row(row),
        )
        .optional()?;

    entry.ok_or_else(|| {
        HindsightError::not_found(format!("history entry {history_id} for memory {memory_id}"))
    })
}
