use rusqlite::{params, Connection};
use serde::Serialize;
use std::collections::HashMap;
use std::path::Path;

use crate::error::Result;

/// Per-owner store statistics.
#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub total_memories: u64,
    pub live_memories: u64,
    pub snapshot_memories: u64,
    pub by_type: HashMap<String, u64>,
    pub total_contents: u64,
    pub by_content_type: HashMap<String, u64>,
    pub history_entries: u64,
    pub db_size_bytes: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub oldest_memory: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub newest_memory: Option<String>,
}

/// Compute statistics for one owner.
///
/// `db_path` is used for file size calculation; pass None for in-memory
/// databases. History rows whose memory was deleted carry no owner and are
/// not counted here.
pub fn memory_stats(
    conn: &Connection,
    owner_id: &str,
    db_path: Option<&Path>,
) -> Result<StatsResponse> {
    let (total, live, snapshots) = count_memories(conn, owner_id)?;
    let by_type = count_by_type(conn, owner_id)?;
    let (total_contents, by_content_type) = count_contents(conn, owner_id)?;
    let history_entries = count_history(conn, owner_id)?;
    let (oldest, newest) = memory_time_range(conn, owner_id)?;

    let db_size_bytes = db_path
        .and_then(|p| std::fs::metadata(p).ok())
        .map(|m| m.len())
        .unwrap_or(0);

    Ok(StatsResponse {
        total_memories: total,
        live_memories: live,
        snapshot_memories: snapshots,
        by_type,
        total_contents,
        by_content_type,
        history_entries,
        db_size_bytes,
        oldest_memory: oldest,
        newest_memory: newest,
    })
}

/// Total, live (non-snapshot), and snapshot counts.
fn count_memories(conn: &Connection, owner_id: &str) -> Result<(u64, u64, u64)> {
    let total: i64 = conn.query_row(
        "SELECT COUNT(*) FROM memories WHERE owner_id = ?1",
        params![owner_id],
        |row| row.get(0),
    )?;
    let snapshots: i64 = conn.query_row(
        "SELECT COUNT(*) FROM memories WHERE owner_id = ?1 AND memory_type = 'snapshot'",
        params![owner_id],
        |row| row.get(0),
    )?;
    let live = total - snapshots;
    Ok((total as u64, live as u64, snapshots as u64))
}

/// Per-type counts, pre-seeded so every type appears even at zero.
fn count_by_type(conn: &Connection, owner_id: &str) -> Result<HashMap<String, u64>> {
    let mut map = HashMap::new();
    for t in &["personal_trait", "project", "knowledge", "snapshot", "episodic"] {
        map.insert(t.to_string(), 0);
    }

    let mut stmt = conn.prepare(
        "SELECT memory_type, COUNT(*) FROM memories WHERE owner_id = ?1 GROUP BY memory_type",
    )?;
    let rows: Vec<(String, i64)> = stmt
        .query_map(params![owner_id], |row| Ok((row.get(0)?, row.get(1)?)))?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    for (t, count) in rows {
        map.insert(t, count as u64);
    }
    Ok(map)
}

/// Content total and count by content type.
fn count_contents(conn: &Connection, owner_id: &str) -> Result<(u64, HashMap<String, u64>)> {
    let mut map = HashMap::new();
    for t in &["text", "pdf", "image", "code", "conversation", "snapshot"] {
        map.insert(t.to_string(), 0);
    }

    let mut stmt = conn.prepare(
        "SELECT c.content_type, COUNT(*)
         FROM memory_contents c
         JOIN memories m ON m.id = c.memory_id
         WHERE m.owner_id = ?1
         GROUP BY c.content_type",
    )?;
    let rows: Vec<(String, i64)> = stmt
        .query_map(params![owner_id], |row| Ok((row.get(0)?, row.get(1)?)))?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let mut total = 0u64;
    for (t, count) in rows {
        total += count as u64;
        map.insert(t, count as u64);
    }
    Ok((total, map))
}

/// History entries attributable to the owner's live memories.
fn count_history(conn: &Connection, owner_id: &str) -> Result<u64> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*)
         FROM memory_history h
         JOIN memories m ON m.id = h.memory_id
         WHERE m.owner_id = ?1",
        params![owner_id],
        |row| row.get(0),
    )?;
    Ok(count as u64)
}

/// Oldest and newest memory timestamps for the owner.
fn memory_time_range(
    conn: &Connection,
    owner_id: &str,
) -> Result<(Option<String>, Option<String>)> {
    let (oldest, newest): (Option<String>, Option<String>) = conn.query_row(
        "SELECT MIN(created_at), MAX(created_at) FROM memories WHERE owner_id = ?1",
        params![owner_id],
        |row| Ok((row.get(0)?, row.get(1)?)),
    )?;
    Ok((oldest, newest))
}
