pub mod migrations;
pub mod schema;

use anyhow::{Context, Result};
use rusqlite::Connection;
use sqlite_vec::sqlite3_vec_init;
use std::path::Path;
use std::sync::Once;
use std::time::Duration;

static REGISTER_VEC: Once = Once::new();

/// Make the sqlite-vec extension available to every connection opened after
/// this call. Idempotent.
pub fn load_sqlite_vec() {
    REGISTER_VEC.call_once(|| unsafe {
        rusqlite::ffi::sqlite3_auto_extension(Some(std::mem::transmute(
            sqlite3_vec_init as *const (),
        )));
    });
}

/// Open (or create) the store at `path` with the vector extension loaded,
/// pragmas applied, and the schema migrated to current.
pub fn open_database(path: impl AsRef<Path>) -> Result<Connection> {
    let path = path.as_ref();

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory {}", parent.display()))?;
    }

    load_sqlite_vec();

    let mut conn = Connection::open(path)
        .with_context(|| format!("failed to open database at {}", path.display()))?;

    // WAL so readers are not blocked while the CLI writes
    conn.pragma_update(None, "journal_mode", "WAL")?;
    conn.pragma_update(None, "foreign_keys", "ON")?;
    conn.busy_timeout(Duration::from_secs(5))?;

    schema::init_schema(&conn).context("failed to initialize schema")?;
    migrations::run_migrations(&mut conn).context("failed to run migrations")?;

    tracing::info!(path = %path.display(), "store opened");
    Ok(conn)
}

/// In-memory store for unit tests, fully migrated.
#[cfg(test)]
pub fn open_memory_database() -> Result<Connection> {
    load_sqlite_vec();
    let mut conn = Connection::open_in_memory().context("failed to open in-memory database")?;
    conn.pragma_update(None, "foreign_keys", "ON")?;
    schema::init_schema(&conn).context("failed to initialize schema")?;
    migrations::run_migrations(&mut conn).context("failed to run migrations")?;
    Ok(conn)
}

/// Snapshot of database health, produced by [`check_database_health`].
#[derive(Debug)]
pub struct HealthReport {
    pub schema_version: u32,
    pub sqlite_vec_version: String,
    pub embedding_model: Option<String>,
    pub memory_count: i64,
    pub content_count: i64,
    pub history_count: i64,
    /// Row counts for the adapter-owned index tables. `None` when the
    /// adapter has never initialized them on this database.
    pub index_vec_count: Option<i64>,
    pub index_fts_count: Option<i64>,
    pub integrity_ok: bool,
    pub integrity_details: String,
}

/// Run integrity and consistency diagnostics against an open database.
pub fn check_database_health(conn: &Connection) -> crate::error::Result<HealthReport> {
    let schema_version = migrations::get_schema_version(conn)?;
    let sqlite_vec_version: String = conn.query_row("SELECT vec_version()", [], |r| r.get(0))?;
    let embedding_model = migrations::get_embedding_model(conn)?;

    let memory_count: i64 = conn.query_row("SELECT COUNT(*) FROM memories", [], |r| r.get(0))?;
    let content_count: i64 =
        conn.query_row("SELECT COUNT(*) FROM memory_contents", [], |r| r.get(0))?;
    let history_count: i64 =
        conn.query_row("SELECT COUNT(*) FROM memory_history", [], |r| r.get(0))?;

    let index_vec_count = conn
        .query_row("SELECT COUNT(*) FROM contents_vec", [], |r| r.get(0))
        .ok();
    let index_fts_count = conn
        .query_row("SELECT COUNT(*) FROM contents_fts", [], |r| r.get(0))
        .ok();

    let integrity_details: String =
        conn.query_row("PRAGMA integrity_check", [], |r| r.get(0))?;
    let integrity_ok = integrity_details == "ok";

    Ok(HealthReport {
        schema_version,
        sqlite_vec_version,
        embedding_model,
        memory_count,
        content_count,
        history_count,
        index_vec_count,
        index_fts_count,
        integrity_ok,
        integrity_details,
    })
}
