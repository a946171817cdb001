//! SQL DDL for the relational tables.
//!
//! Defines `memories`, `memory_contents`, `memory_history`, and
//! `schema_meta`. All DDL uses `IF NOT EXISTS` for idempotent
//! initialization. The vector/keyword index tables are owned by the index
//! adapter and created there, not here.

use rusqlite::Connection;

/// All schema DDL statements for the core tables.
const SCHEMA_SQL: &str = r#"
-- Owner-scoped memory containers
CREATE TABLE IF NOT EXISTS memories (
    id TEXT PRIMARY KEY,
    owner_id TEXT NOT NULL,
    name TEXT NOT NULL,
    description TEXT,
    memory_type TEXT NOT NULL CHECK(memory_type IN ('personal_trait','project','knowledge','snapshot','episodic')),
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_memories_owner ON memories(owner_id);
CREATE INDEX IF NOT EXISTS idx_memories_owner_type ON memories(owner_id, memory_type);

-- Content items inside a memory; rows disappear with their memory
CREATE TABLE IF NOT EXISTS memory_contents (
    id TEXT PRIMARY KEY,
    memory_id TEXT NOT NULL REFERENCES memories(id) ON DELETE CASCADE,
    content TEXT NOT NULL,
    content_type TEXT NOT NULL CHECK(content_type IN ('text','pdf','image','code','conversation','snapshot')),
    metadata TEXT,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_contents_memory ON memory_contents(memory_id);

-- Append-only change ledger. Deliberately no FK to memories: entries
-- outlive the rows they describe.
CREATE TABLE IF NOT EXISTS memory_history (
    id TEXT PRIMARY KEY,
    memory_id TEXT NOT NULL,
    operation TEXT NOT NULL CHECK(operation IN ('create','update','add_content','delete_content','delete','rollback')),
    content_snapshot TEXT NOT NULL,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_history_memory ON memory_history(memory_id, created_at);

-- Schema metadata
CREATE TABLE IF NOT EXISTS schema_meta (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);
"#;

/// Initialize all relational tables. Idempotent (uses IF NOT EXISTS).
pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(SCHEMA_SQL)?;

    // First open writes version 1; migrations move it forward from there
    conn.execute(
        "INSERT OR IGNORE INTO schema_meta (key, value) VALUES ('schema_version', '1')",
        [],
    )?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_creates_all_tables() {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();

        let tables: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<Result<Vec<_>, _>>()
            .unwrap();

        assert!(tables.contains(&"memories".to_string()));
        assert!(tables.contains(&"memory_contents".to_string()));
        assert!(tables.contains(&"memory_history".to_string()));
        assert!(tables.contains(&"schema_meta".to_string()));
    }

    #[test]
    fn schema_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        init_schema(&conn).unwrap(); // second call should not error
    }

    #[test]
    fn history_rows_survive_memory_delete() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("PRAGMA foreign_keys = ON;").unwrap();
        init_schema(&conn).unwrap();

        conn.execute(
            "INSERT INTO memories (id, owner_id, name, memory_type, created_at, updated_at)
             VALUES ('m1', 'u1', 'work', 'project', '2026-01-01T00:00:00Z', '2026-01-01T00:00:00Z')",
            [],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO memory_contents (id, memory_id, content, content_type, created_at)
             VALUES ('c1', 'm1', 'note', 'text', '2026-01-01T00:00:00Z')",
            [],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO memory_history (id, memory_id, operation, content_snapshot, created_at)
             VALUES ('h1', 'm1', 'create', '{}', '2026-01-01T00:00:00Z')",
            [],
        )
        .unwrap();

        conn.execute("DELETE FROM memories WHERE id = 'm1'", []).unwrap();

        // contents cascade, history does not
        let contents: i64 = conn
            .query_row("SELECT COUNT(*) FROM memory_contents", [], |r| r.get(0))
            .unwrap();
        let history: i64 = conn
            .query_row("SELECT COUNT(*) FROM memory_history", [], |r| r.get(0))
            .unwrap();
        assert_eq!(contents, 0);
        assert_eq!(history, 1);
    }
}
