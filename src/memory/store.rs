//! Write and read path for memories and their contents.
//!
//! Every mutation runs inside a transaction that ends with its history
//! append, so the store and the ledger commit or fail together. Index
//! updates are NOT performed here: callers (the service layer) apply them
//! after the transaction commits, where a failure can be tolerated without
//! un-committing the mutation.

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use crate::error::{HindsightError, Result};
use crate::memory::history;
use crate::memory::types::{
    CreateMemory, HistoryOp, Memory, MemoryContent, MemoryType, NewContent, UpdateMemory,
};

/// Create a memory container and its `create` history entry.
///
/// Snapshot-typed memories cannot be created here; they are produced only by
/// the snapshot manager.
pub fn create_memory(conn: &mut Connection, owner_id: &str, req: CreateMemory) -> Result<Memory> {
    if req.memory_type == MemoryType::Snapshot {
        return Err(HindsightError::invalid_op(
            "snapshot memories are created by snapshot export, not directly",
        ));
    }

    let now = Utc::now().to_rfc3339();
    let memory = Memory {
        id: Uuid::new_v4().to_string(),
        owner_id: owner_id.to_string(),
        name: req.name,
        description: req.description,
        memory_type: req.memory_type,
        created_at: now.clone(),
        updated_at: now,
    };

    let tx = conn.transaction()?;

    // 1. Insert the row
    insert_memory_row(&tx, &memory)?;

    // 2. Ledger entry with the full object
    history::append(&tx, &memory.id, HistoryOp::Create, &serde_json::to_value(&memory)?)?;

    tx.commit()?;

    tracing::debug!(memory_id = %memory.id, owner = owner_id, "memory created");
    Ok(memory)
}

/// Fetch a memory, scoped by owner. A row under a different owner is
/// indistinguishable from a missing one.
pub fn get_memory(conn: &Connection, owner_id: &str, memory_id: &str) -> Result<Memory> {
    let memory = conn
        .query_row(
            "SELECT id, owner_id, name, description, memory_type, created_at, updated_at
             FROM memories WHERE id = ?1 AND owner_id = ?2",
            params![memory_id, owner_id],
            |row| Memory::from_row(row),
        )
        .optional()?;

    memory.ok_or_else(|| HindsightError::not_found(format!("memory {memory_id}")))
}

/// All memories belonging to an owner, oldest first.
pub fn list_memories(conn: &Connection, owner_id: &str) -> Result<Vec<Memory>> {
    let mut stmt = conn.prepare(
        "SELECT id, owner_id, name, description, memory_type, created_at, updated_at
         FROM memories WHERE owner_id = ?1
         ORDER BY created_at, rowid",
    )?;

    let rows = stmt.query_map(params![owner_id], |row| Memory::from_row(row))?;

    let mut memories = Vec::new();
    for row in rows {
        memories.push(row?);
    }
    Ok(memories)
}

/// All content items of a memory, oldest first. Fails `NotFound` when the
/// memory itself is missing or foreign.
pub fn list_contents(
    conn: &Connection,
    owner_id: &str,
    memory_id: &str,
) -> Result<Vec<MemoryContent>> {
    get_memory(conn, owner_id, memory_id)?;

    let mut stmt = conn.prepare(
        "SELECT id, memory_id, content, content_type, metadata, created_at
         FROM memory_contents WHERE memory_id = ?1
         ORDER BY created_at, rowid",
    )?;

    let rows = stmt.query_map(params![memory_id], |row| MemoryContent::from_row(row))?;

    let mut contents = Vec::new();
    for row in rows {
        contents.push(row?);
    }
    Ok(contents)
}

/// Apply the provided fields, leave the rest untouched, refresh `updated_at`,
/// and append an `update` entry holding both the old and the new object.
pub fn update_memory(
    conn: &mut Connection,
    owner_id: &str,
    memory_id: &str,
    changes: UpdateMemory,
) -> Result<Memory> {
    if changes.memory_type == Some(MemoryType::Snapshot) {
        return Err(HindsightError::invalid_op(
            "a memory cannot be converted into a snapshot",
        ));
    }

    let tx = conn.transaction()?;

    // 1. Load the current state
    let old = get_memory(&tx, owner_id, memory_id)?;
    if old.memory_type == MemoryType::Snapshot {
        return Err(HindsightError::invalid_op("snapshot memories are read-only"));
    }

    // 2. Merge the provided fields
    let mut updated = old.clone();
    if let Some(name) = changes.name {
        updated.name = name;
    }
    if let Some(description) = changes.description {
        updated.description = Some(description);
    }
    if let Some(memory_type) = changes.memory_type {
        updated.memory_type = memory_type;
    }
    updated.updated_at = Utc::now().to_rfc3339();

    // 3. Write the row
    tx.execute(
        "UPDATE memories SET name = ?1, description = ?2, memory_type = ?3, updated_at = ?4
         WHERE id = ?5",
        params![
            updated.name,
            updated.description,
            updated.memory_type.as_str(),
            updated.updated_at,
            updated.id
        ],
    )?;

    // 4. Ledger entry with before and after
    history::append(
        &tx,
        memory_id,
        HistoryOp::Update,
        &serde_json::json!({
            "old": serde_json::to_value(&old)?,
            "new": serde_json::to_value(&updated)?,
        }),
    )?;

    tx.commit()?;
    Ok(updated)
}

/// Delete a memory; its contents cascade away with it. The `delete` entry
/// holding the full memory object is the audit artifact of what was removed.
///
/// Returns the deleted memory so the caller can drop its index entries.
pub fn delete_memory(conn: &mut Connection, owner_id: &str, memory_id: &str) -> Result<Memory> {
    let tx = conn.transaction()?;

    // 1. Load for the snapshot document
    let memory = get_memory(&tx, owner_id, memory_id)?;

    // 2. Ledger entry first, then the row. The entry has no FK and survives.
    history::append(&tx, memory_id, HistoryOp::Delete, &serde_json::to_value(&memory)?)?;

    // 3. Delete the row; memory_contents cascade
    tx.execute("DELETE FROM memories WHERE id = ?1", params![memory_id])?;

    tx.commit()?;

    tracing::debug!(memory_id, owner = owner_id, "memory deleted");
    Ok(memory)
}

/// Add a content item, refresh the memory's `updated_at`, and append an
/// `add_content` entry with the full content object.
///
/// Returns the content so the caller can index it (snapshot payloads are
/// never indexed).
pub fn add_content(
    conn: &mut Connection,
    owner_id: &str,
    memory_id: &str,
    new: NewContent,
) -> Result<MemoryContent> {
    let tx = conn.transaction()?;

    // 1. The target must exist and be writable
    let memory = get_memory(&tx, owner_id, memory_id)?;
    if memory.memory_type == MemoryType::Snapshot {
        return Err(HindsightError::invalid_op("snapshot memories are read-only"));
    }

    let now = Utc::now().to_rfc3339();
    let content = MemoryContent {
        id: Uuid::new_v4().to_string(),
        memory_id: memory_id.to_string(),
        content: new.content,
        content_type: new.content_type,
        metadata: new.metadata,
        created_at: now.clone(),
    };

    // 2. Insert the row
    insert_content_row(&tx, &content)?;

    // 3. Content changes touch the parent
    touch_memory(&tx, memory_id, &now)?;

    // 4. Ledger entry with the full object
    history::append(&tx, memory_id, HistoryOp::AddContent, &serde_json::to_value(&content)?)?;

    tx.commit()?;
    Ok(content)
}

/// Delete a content item and append a `delete_content` entry carrying the
/// full content object, from which a rollback can recreate it.
///
/// Returns the deleted content so the caller can drop its index entry.
pub fn delete_content(
    conn: &mut Connection,
    owner_id: &str,
    memory_id: &str,
    content_id: &str,
) -> Result<MemoryContent> {
    let tx = conn.transaction()?;

    // 1. The target must exist and be writable
    let memory = get_memory(&tx, owner_id, memory_id)?;
    if memory.memory_type == MemoryType::Snapshot {
        return Err(HindsightError::invalid_op("snapshot memories are read-only"));
    }

    // 2. Load the row for the snapshot document
    let content = get_content(&tx, memory_id, content_id)?;

    // 3. Delete it
    tx.execute("DELETE FROM memory_contents WHERE id = ?1", params![content_id])?;

    // 4. Ledger entry with the full object
    history::append(
        &tx,
        memory_id,
        HistoryOp::DeleteContent,
        &serde_json::to_value(&content)?,
    )?;

    tx.commit()?;
    Ok(content)
}

/// Fetch one content item, requiring that it belongs to `memory_id`.
pub(crate) fn get_content(
    conn: &Connection,
    memory_id: &str,
    content_id: &str,
) -> Result<MemoryContent> {
    let content = conn
        .query_row(
            "SELECT id, memory_id, content, content_type, metadata, created_at
             FROM memory_contents WHERE id = ?1 AND memory_id = ?2",
            params![content_id, memory_id],
            |row| MemoryContent::from_row(row),
        )
        .optional()?;

    content.ok_or_else(|| HindsightError::not_found(format!("content {content_id}")))
}

/// Insert a content row verbatim, preserving its id and timestamps. Used by
/// the normal write path and by rollback/restore recreation.
pub(crate) fn insert_content_row(conn: &Connection, content: &MemoryContent) -> Result<()> {
    let metadata_json = if content.metadata.is_empty() {
        None
    } else {
        Some(serde_json::to_string(&content.metadata)?)
    };

    conn.execute(
        "INSERT INTO memory_contents (id, memory_id, content, content_type, metadata, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            content.id,
            content.memory_id,
            content.content,
            content.content_type.as_str(),
            metadata_json,
            content.created_at
        ],
    )?;
    Ok(())
}

/// Refresh a memory's `updated_at`.
pub(crate) fn touch_memory(conn: &Connection, memory_id: &str, now: &str) -> Result<()> {
    conn.execute(
        "UPDATE memories SET updated_at = ?1 WHERE id = ?2",
        params![now, memory_id],
    )?;
    Ok(())
}

/// Insert a memory row verbatim. Used by the normal write path and by
/// snapshot restore.
pub(crate) fn insert_memory_row(conn: &Connection, memory: &Memory) -> Result<()> {
    conn.execute(
        "INSERT INTO memories (id, owner_id, name, description, memory_type, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            memory.id,
            memory.owner_id,
            memory.name,
            memory.description,
            memory.memory_type.as_str(),
            memory.created_at,
            memory.updated_at
        ],
    )?;
    Ok(())
}
