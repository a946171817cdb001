//! Inverse application of history entries.
//!
//! [`rollback`] resolves a ledger entry and undoes it against the store:
//! an `update` restores the captured fields, an `add_content` removes the
//! content again, a `delete_content` recreates it under its original id and
//! timestamp. Creations, deletions, and rollbacks themselves cannot be
//! rolled back. Content-level branches are idempotent: undoing work that is
//! already undone succeeds as a no-op.
//!
//! The mutation and the `rollback` ledger entry it appends commit in one
//! transaction; index work is returned to the caller for after the commit.

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};

use crate::error::{HindsightError, Result};
use crate::memory::history;
use crate::memory::store;
use crate::memory::types::{HistoryEntry, HistoryOp, Memory, MemoryContent};

/// What a successful rollback did to the store.
#[derive(Debug)]
pub enum UndoneChange {
    /// Memory fields restored in place; the index is unaffected.
    RestoredFields,
    /// An `add_content` was undone. Holds the removed content id, or `None`
    /// when the content was already gone.
    RemovedContent(Option<String>),
    /// A `delete_content` was undone. Holds the recreated content for
    /// re-indexing, or `None` when a row with that id already existed.
    RecreatedContent(Option<MemoryContent>),
}

#[derive(Debug)]
pub struct RollbackOutcome {
    /// The `rollback` ledger entry this operation appended.
    pub entry: HistoryEntry,
    pub change: UndoneChange,
}

/// Roll back one history entry of `memory_id`.
pub fn rollback(
    conn: &mut Connection,
    owner_id: &str,
    memory_id: &str,
    history_id: &str,
) -> Result<RollbackOutcome> {
    let tx = conn.transaction()?;

    // 1. The memory must exist under this owner
    let memory = store::get_memory(&tx, owner_id, memory_id)?;

    // 2. The entry must exist and belong to it
    let entry = history::get(&tx, history_id, memory_id)?;

    // 3. Undo by operation
    let change = match entry.operation {
        HistoryOp::Create => {
            return Err(HindsightError::invalid_op(
                "a create cannot be rolled back; delete the memory instead",
            ))
        }
        HistoryOp::Update => {
            undo_update(&tx, &memory, &entry)?;
            UndoneChange::RestoredFields
        }
        HistoryOp::AddContent => UndoneChange::RemovedContent(undo_add_content(&tx, &entry)?),
        HistoryOp::DeleteContent => {
            UndoneChange::RecreatedContent(undo_delete_content(&tx, memory_id, &entry)?)
        }
        HistoryOp::Delete => {
            return Err(HindsightError::invalid_op(
                "a memory deletion cannot be rolled back",
            ))
        }
        HistoryOp::Rollback => {
            return Err(HindsightError::invalid_op("a rollback cannot be rolled back"))
        }
    };

    // 4. The rollback appends its own ledger entry
    let rollback_entry = history::append(
        &tx,
        memory_id,
        HistoryOp::Rollback,
        &serde_json::json!({
            "rolled_back_to": entry.id,
            "original_operation": entry.operation.as_str(),
        }),
    )?;

    tx.commit()?;

    tracing::debug!(
        memory_id,
        rolled_back_to = %entry.id,
        operation = %entry.operation,
        "rollback applied"
    );

    Ok(RollbackOutcome {
        entry: rollback_entry,
        change,
    })
}

/// Restore the fields captured in the entry's `old` object. Fields absent
/// from it keep their current value, mirroring the partial-update write
/// path. `updated_at` always refreshes.
fn undo_update(conn: &Connection, memory: &Memory, entry: &HistoryEntry) -> Result<()> {
    let empty = serde_json::Map::new();
    let old = entry
        .content_snapshot
        .get("old")
        .and_then(|v| v.as_object())
        .unwrap_or(&empty);

    let mut restored = memory.clone();
    if let Some(name) = old.get("name").and_then(|v| v.as_str()) {
        restored.name = name.to_string();
    }
    if let Some(description) = old.get("description") {
        // an explicit null restores "no description"
        restored.description = description.as_str().map(str::to_string);
    }
    if let Some(memory_type) = old
        .get("memory_type")
        .and_then(|v| v.as_str())
        .and_then(|s| s.parse().ok())
    {
        restored.memory_type = memory_type;
    }
    restored.updated_at = Utc::now().to_rfc3339();

    conn.execute(
        "UPDATE memories SET name = ?1, description = ?2, memory_type = ?3, updated_at = ?4
         WHERE id = ?5",
        params![
            restored.name,
            restored.description,
            restored.memory_type.as_str(),
            restored.updated_at,
            restored.id
        ],
    )?;
    Ok(())
}

/// Remove the content the entry added. Already gone is a successful no-op.
fn undo_add_content(conn: &Connection, entry: &HistoryEntry) -> Result<Option<String>> {
    let content_id = match entry.content_snapshot.get("id").and_then(|v| v.as_str()) {
        Some(id) => id.to_string(),
        None => return Ok(None),
    };

    let removed = conn.execute(
        "DELETE FROM memory_contents WHERE id = ?1",
        params![content_id],
    )?;

    if removed == 0 {
        tracing::debug!(content_id, "content already removed; rollback is a no-op");
        return Ok(None);
    }
    Ok(Some(content_id))
}

/// Recreate the content the entry deleted, preserving its original id and
/// `created_at`. An existing row with that id makes this a successful no-op.
fn undo_delete_content(
    conn: &Connection,
    memory_id: &str,
    entry: &HistoryEntry,
) -> Result<Option<MemoryContent>> {
    let mut content: MemoryContent = serde_json::from_value(entry.content_snapshot.clone())?;
    content.memory_id = memory_id.to_string();

    let exists = conn
        .query_row(
            "SELECT 1 FROM memory_contents WHERE id = ?1",
            params![content.id],
            |_| Ok(()),
        )
        .optional()?
        .is_some();

    if exists {
        tracing::debug!(content_id = %content.id, "content already present; rollback is a no-op");
        return Ok(None);
    }

    store::insert_content_row(conn, &content)?;
    Ok(Some(content))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::types::{ContentType, CreateMemory, Metadata, MemoryType, NewContent, UpdateMemory};
    use serde_json::json;

    fn test_db() -> Connection {
        crate::db::open_memory_database().unwrap()
    }

    fn make_memory(conn: &mut Connection) -> Memory {
        store::create_memory(
            conn,
            "u1",
            CreateMemory {
                name: "original".to_string(),
                description: Some("first draft".to_string()),
                memory_type: MemoryType::Project,
            },
        )
        .unwrap()
    }

    fn add_text(conn: &mut Connection, memory_id: &str, text: &str) -> MemoryContent {
        store::add_content(
            conn,
            "u1",
            memory_id,
            NewContent {
                content: text.to_string(),
                content_type: ContentType::Text,
                metadata: Metadata::new(),
            },
        )
        .unwrap()
    }

    fn latest_entry(conn: &Connection, memory_id: &str) -> HistoryEntry {
        history::list_for(conn, memory_id).unwrap().remove(0)
    }

    #[test]
    fn update_rollback_restores_old_fields() {
        let mut conn = test_db();
        let memory = make_memory(&mut conn);

        store::update_memory(
            &mut conn,
            "u1",
            &memory.id,
            UpdateMemory {
                name: Some("renamed".to_string()),
                description: Some("second draft".to_string()),
                ..Default::default()
            },
        )
        .unwrap();
        let update_entry = latest_entry(&conn, &memory.id);

        let outcome = rollback(&mut conn, "u1", &memory.id, &update_entry.id).unwrap();
        assert!(matches!(outcome.change, UndoneChange::RestoredFields));

        let restored = store::get_memory(&conn, "u1", &memory.id).unwrap();
        assert_eq!(restored.name, "original");
        assert_eq!(restored.description.as_deref(), Some("first draft"));
    }

    #[test]
    fn update_rollback_restores_only_captured_fields() {
        let mut conn = test_db();
        let memory = make_memory(&mut conn);

        store::update_memory(
            &mut conn,
            "u1",
            &memory.id,
            UpdateMemory {
                description: Some("current description".to_string()),
                ..Default::default()
            },
        )
        .unwrap();

        // A synthetic entry whose old object only captured the name.
        let entry = history::append(
            &conn,
            &memory.id,
            HistoryOp::Update,
            &json!({"old": {"name": "from-partial-snapshot"}, "new": {}}),
        )
        .unwrap();

        rollback(&mut conn, "u1", &memory.id, &entry.id).unwrap();

        let after = store::get_memory(&conn, "u1", &memory.id).unwrap();
        assert_eq!(after.name, "from-partial-snapshot");
        // description was absent from old, so the current value stays
        assert_eq!(after.description.as_deref(), Some("current description"));
    }

    #[test]
    fn add_content_rollback_removes_row_and_is_idempotent() {
        let mut conn = test_db();
        let memory = make_memory(&mut conn);
        let content = add_text(&mut conn, &memory.id, "to be undone");
        let add_entry = latest_entry(&conn, &memory.id);

        let first = rollback(&mut conn, "u1", &memory.id, &add_entry.id).unwrap();
        match first.change {
            UndoneChange::RemovedContent(Some(id)) => assert_eq!(id, content.id),
            other => panic!("unexpected change: {other:?}"),
        }
        assert!(store::list_contents(&conn, "u1", &memory.id).unwrap().is_empty());

        // Rolling back the same entry again succeeds without touching anything
        let second = rollback(&mut conn, "u1", &memory.id, &add_entry.id).unwrap();
        assert!(matches!(second.change, UndoneChange::RemovedContent(None)));
    }

    #[test]
    fn delete_content_rollback_recreates_original_row() {
        let mut conn = test_db();
        let memory = make_memory(&mut conn);
        let content = add_text(&mut conn, &memory.id, "deleted then restored");

        store::delete_content(&mut conn, "u1", &memory.id, &content.id).unwrap();
        let delete_entry = latest_entry(&conn, &memory.id);

        let outcome = rollback(&mut conn, "u1", &memory.id, &delete_entry.id).unwrap();
        let recreated = match outcome.change {
            UndoneChange::RecreatedContent(Some(c)) => c,
            other => panic!("unexpected change: {other:?}"),
        };
        assert_eq!(recreated.id, content.id);
        assert_eq!(recreated.created_at, content.created_at);

        let contents = store::list_contents(&conn, "u1", &memory.id).unwrap();
        assert_eq!(contents.len(), 1);
        assert_eq!(contents[0].id, content.id);
        assert_eq!(contents[0].created_at, content.created_at);

        // The content exists again, so a second rollback skips recreation
        let second = rollback(&mut conn, "u1", &memory.id, &delete_entry.id).unwrap();
        assert!(matches!(second.change, UndoneChange::RecreatedContent(None)));
    }

    #[test]
    fn create_delete_and_rollback_entries_are_rejected() {
        let mut conn = test_db();
        let memory = make_memory(&mut conn);
        let create_entry = latest_entry(&conn, &memory.id);

        let err = rollback(&mut conn, "u1", &memory.id, &create_entry.id).unwrap_err();
        assert!(matches!(err, HindsightError::InvalidOperation(_)));

        // Produce a rollback entry, then try to roll it back
        add_text(&mut conn, &memory.id, "x");
        let add_entry = latest_entry(&conn, &memory.id);
        let outcome = rollback(&mut conn, "u1", &memory.id, &add_entry.id).unwrap();
        let err = rollback(&mut conn, "u1", &memory.id, &outcome.entry.id).unwrap_err();
        assert!(matches!(err, HindsightError::InvalidOperation(_)));

        // A delete entry on another memory
        let doomed = store::create_memory(
            &mut conn,
            "u1",
            CreateMemory {
                name: "doomed".to_string(),
                description: None,
                memory_type: MemoryType::Knowledge,
            },
        )
        .unwrap();
        store::delete_memory(&mut conn, "u1", &doomed.id).unwrap();
        let delete_entry = latest_entry(&conn, &doomed.id);
        let err = rollback(&mut conn, "u1", &doomed.id, &delete_entry.id).unwrap_err();
        // the memory row is gone, so the owner-scoped resolve fails first
        assert!(matches!(err, HindsightError::NotFound(_)));
        assert_eq!(delete_entry.operation, HistoryOp::Delete);
    }

    #[test]
    fn every_rollback_appends_its_own_entry() {
        let mut conn = test_db();
        let memory = make_memory(&mut conn);
        add_text(&mut conn, &memory.id, "x");
        let add_entry = latest_entry(&conn, &memory.id);

        let outcome = rollback(&mut conn, "u1", &memory.id, &add_entry.id).unwrap();

        let newest = latest_entry(&conn, &memory.id);
        assert_eq!(newest.id, outcome.entry.id);
        assert_eq!(newest.operation, HistoryOp::Rollback);
        assert_eq!(newest.content_snapshot["rolled_back_to"], json!(add_entry.id));
        assert_eq!(newest.content_snapshot["original_operation"], json!("add_content"));
    }

    #[test]
    fn foreign_owner_cannot_roll_back() {
        let mut conn = test_db();
        let memory = make_memory(&mut conn);
        add_text(&mut conn, &memory.id, "x");
        let add_entry = latest_entry(&conn, &memory.id);

        let err = rollback(&mut conn, "u2", &memory.id, &add_entry.id).unwrap_err();
        assert!(matches!(err, HindsightError::NotFound(_)));
    }
}
