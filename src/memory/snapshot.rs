//! Whole-store export into a snapshot memory, and restore from one.
//!
//! A snapshot is an ordinary `memories` row of type `snapshot` holding a
//! single `snapshot` content whose text is the JSON capture of every
//! non-snapshot memory the owner has, each with its contents. Neither the
//! container nor the payload is ever vector-indexed, and neither capture nor
//! restore writes history entries: snapshot containers are write-once and
//! not rollback targets.

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{HindsightError, Result};
use crate::memory::store;
use crate::memory::types::{ContentType, Memory, MemoryContent, MemoryType, Metadata};

/// One captured memory inside a snapshot payload. The ids and timestamps
/// are the values at capture time, kept for audit; restore creates fresh
/// rows and does not reuse them.
#[derive(Debug, Serialize, Deserialize)]
struct CapturedMemory {
    id: String,
    name: String,
    description: Option<String>,
    memory_type: MemoryType,
    created_at: String,
    updated_at: String,
    #[serde(default)]
    contents: Vec<CapturedContent>,
}

#[derive(Debug, Serialize, Deserialize)]
struct CapturedContent {
    id: String,
    content: String,
    content_type: ContentType,
    #[serde(default)]
    metadata: Metadata,
    created_at: String,
}

/// What a restore did, for post-commit index reconciliation.
#[derive(Debug)]
pub struct RestoreOutcome {
    /// The recreated memories, in payload order.
    pub restored: Vec<Memory>,
    /// Memories that were deleted; their index entries must be dropped.
    pub dropped_memory_ids: Vec<String>,
    /// Every recreated content row. Snapshot payloads among them must not
    /// be re-indexed.
    pub recreated: Vec<MemoryContent>,
}

/// Serialize the owner's non-snapshot memories into a new snapshot memory.
///
/// `name` defaults to `Snapshot-YYYYMMDD-HHMMSS`.
pub fn create_snapshot(
    conn: &mut Connection,
    owner_id: &str,
    name: Option<String>,
) -> Result<Memory> {
    let now = Utc::now();
    let now_str = now.to_rfc3339();
    let name = name.unwrap_or_else(|| format!("Snapshot-{}", now.format("%Y%m%d-%H%M%S")));

    let tx = conn.transaction()?;

    // 1. Capture the live graph
    let captured = capture_memories(&tx, owner_id)?;
    let payload = serde_json::to_string(&captured)?;

    // 2. The container
    let memory = Memory {
        id: Uuid::new_v4().to_string(),
        owner_id: owner_id.to_string(),
        name,
        description: Some(format!("Snapshot created at {now_str}")),
        memory_type: MemoryType::Snapshot,
        created_at: now_str.clone(),
        updated_at: now_str.clone(),
    };
    store::insert_memory_row(&tx, &memory)?;

    // 3. The payload as its single content
    let mut metadata = Metadata::new();
    metadata.insert("created_at".to_string(), serde_json::json!(now_str));
    let content = MemoryContent {
        id: Uuid::new_v4().to_string(),
        memory_id: memory.id.clone(),
        content: payload,
        content_type: ContentType::Snapshot,
        metadata,
        created_at: now_str,
    };
    store::insert_content_row(&tx, &content)?;

    tx.commit()?;

    tracing::info!(
        snapshot_id = %memory.id,
        owner = owner_id,
        memories = captured.len(),
        "snapshot created"
    );
    Ok(memory)
}

/// Replace the owner's live graph with the contents of a snapshot.
///
/// The delete of the current graph and the recreation from the payload run
/// in one transaction: either the whole restore lands or none of it does.
/// Recreated rows get fresh ids and timestamps; the captured originals stay
/// in the payload for audit.
pub fn restore_snapshot(
    conn: &mut Connection,
    owner_id: &str,
    snapshot_memory_id: &str,
) -> Result<RestoreOutcome> {
    let tx = conn.transaction()?;

    // 1. Resolve the container; a non-snapshot id is indistinguishable from
    //    a missing one
    let snapshot = tx
        .query_row(
            "SELECT id, owner_id, name, description, memory_type, created_at, updated_at
             FROM memories
             WHERE id = ?1 AND owner_id = ?2 AND memory_type = 'snapshot'",
            params![snapshot_memory_id, owner_id],
            |row| Memory::from_row(row),
        )
        .optional()?;
    let snapshot = snapshot
        .ok_or_else(|| HindsightError::not_found(format!("snapshot {snapshot_memory_id}")))?;

    // 2. Its payload
    let payload: Option<String> = tx
        .query_row(
            "SELECT content FROM memory_contents
             WHERE memory_id = ?1 AND content_type = 'snapshot'",
            params![snapshot.id],
            |row| row.get(0),
        )
        .optional()?;
    let payload = payload.ok_or_else(|| {
        HindsightError::not_found(format!("snapshot content for {snapshot_memory_id}"))
    })?;

    // 3. Parse before touching anything
    let captured: Vec<CapturedMemory> = serde_json::from_str(&payload)
        .map_err(|e| HindsightError::InvalidSnapshot(e.to_string()))?;

    // 4. Drop the live graph (snapshot containers stay)
    let mut stmt = tx.prepare(
        "SELECT id FROM memories WHERE owner_id = ?1 AND memory_type != 'snapshot'",
    )?;
    let dropped_memory_ids = stmt
        .query_map(params![owner_id], |row| row.get::<_, String>(0))?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    drop(stmt);

    for memory_id in &dropped_memory_ids {
        tx.execute("DELETE FROM memories WHERE id = ?1", params![memory_id])?;
    }

    // 5. Recreate from the payload under fresh ids
    let now = Utc::now().to_rfc3339();
    let mut restored = Vec::with_capacity(captured.len());
    let mut recreated = Vec::new();

    for captured_memory in captured {
        let memory = Memory {
            id: Uuid::new_v4().to_string(),
            owner_id: owner_id.to_string(),
            name: captured_memory.name,
            description: captured_memory.description,
            memory_type: captured_memory.memory_type,
            created_at: now.clone(),
            updated_at: now.clone(),
        };
        store::insert_memory_row(&tx, &memory)?;

        for captured_content in captured_memory.contents {
            let content = MemoryContent {
                id: Uuid::new_v4().to_string(),
                memory_id: memory.id.clone(),
                content: captured_content.content,
                content_type: captured_content.content_type,
                metadata: captured_content.metadata,
                created_at: now.clone(),
            };
            store::insert_content_row(&tx, &content)?;
            recreated.push(content);
        }

        restored.push(memory);
    }

    tx.commit()?;

    tracing::info!(
        snapshot_id = %snapshot.id,
        owner = owner_id,
        dropped = dropped_memory_ids.len(),
        restored = restored.len(),
        "snapshot restored"
    );

    Ok(RestoreOutcome {
        restored,
        dropped_memory_ids,
        recreated,
    })
}

/// Capture every non-snapshot memory of the owner, with contents, in
/// creation order.
fn capture_memories(conn: &Connection, owner_id: &str) -> Result<Vec<CapturedMemory>> {
    let mut memories_stmt = conn.prepare(
        "SELECT id, owner_id, name, description, memory_type, created_at, updated_at
         FROM memories
         WHERE owner_id = ?1 AND memory_type != 'snapshot'
         ORDER BY created_at, rowid",
    )?;
    let memories = memories_stmt
        .query_map(params![owner_id], |row| Memory::from_row(row))?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let mut contents_stmt = conn.prepare(
        "SELECT id, memory_id, content, content_type, metadata, created_at
         FROM memory_contents WHERE memory_id = ?1
         ORDER BY created_at, rowid",
    )?;

    let mut captured = Vec::with_capacity(memories.len());
    for memory in memories {
        let contents = contents_stmt
            .query_map(params![memory.id], |row| MemoryContent::from_row(row))?
            .collect::<std::result::Result<Vec<_>, _>>()?
            .into_iter()
            .map(|c| CapturedContent {
                id: c.id,
                content: c.content,
                content_type: c.content_type,
                metadata: c.metadata,
                created_at: c.created_at,
            })
            .collect();

        captured.push(CapturedMemory {
            id: memory.id,
            name: memory.name,
            description: memory.description,
            memory_type: memory.memory_type,
            created_at: memory.created_at,
            updated_at: memory.updated_at,
            contents,
        });
    }
    Ok(captured)
}
