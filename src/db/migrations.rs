//! Schema version bookkeeping and forward migrations.
//!
//! The `schema_meta` table carries two rows this module owns: the
//! `schema_version` a store was last opened with (seeded at 1 by
//! [`init_schema`](crate::db::schema::init_schema)) and the `embedding_model`
//! its vector index was built with. [`run_migrations`] replays every step
//! past the stored version, committing each step together with its version
//! bump.

use rusqlite::{Connection, OptionalExtension, Transaction};

/// Schema version this build reads and writes.
pub const CURRENT_SCHEMA_VERSION: u32 = 2;

/// One forward step, keyed by the version it upgrades the store to.
type Step = (u32, fn(&Transaction<'_>) -> rusqlite::Result<()>);

/// Ascending by target version.
const STEPS: &[Step] = &[(2, seed_embedding_model)];

fn read_meta(conn: &Connection, key: &str) -> rusqlite::Result<Option<String>> {
    conn.query_row("SELECT value FROM schema_meta WHERE key = ?1", [key], |row| {
        row.get(0)
    })
    .optional()
}

fn write_meta(conn: &Connection, key: &str, value: &str) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO schema_meta (key, value) VALUES (?1, ?2)
         ON CONFLICT(key) DO UPDATE SET value = excluded.value",
        [key, value],
    )?;
    Ok(())
}

/// Stored schema version. A store without one reads as 0 and replays every
/// step.
pub fn get_schema_version(conn: &Connection) -> rusqlite::Result<u32> {
    let raw = read_meta(conn, "schema_version")?;
    Ok(raw.and_then(|v| v.parse().ok()).unwrap_or(0))
}

/// Embedding model the index was last built with, if one was ever recorded.
pub fn get_embedding_model(conn: &Connection) -> rusqlite::Result<Option<String>> {
    read_meta(conn, "embedding_model")
}

/// Record the embedding model after a rebuild of the index.
pub fn set_embedding_model(conn: &Connection, model: &str) -> rusqlite::Result<()> {
    write_meta(conn, "embedding_model", model)
}

/// Bring the store up to [`CURRENT_SCHEMA_VERSION`], one committed step at a
/// time. A store that is already current is left untouched.
pub fn run_migrations(conn: &mut Connection) -> rusqlite::Result<()> {
    let mut at = get_schema_version(conn)?;
    if at >= CURRENT_SCHEMA_VERSION {
        tracing::debug!(schema_version = at, "schema is current");
        return Ok(());
    }

    for &(target, step) in STEPS {
        if target <= at {
            continue;
        }
        tracing::info!(from = at, to = target, "applying schema migration");
        let tx = conn.transaction()?;
        step(&tx)?;
        write_meta(&tx, "schema_version", &target.to_string())?;
        tx.commit()?;
        at = target;
    }

    Ok(())
}

/// 1 -> 2: record which embedding model the vector index is built with.
/// `OR IGNORE` keeps a value written by an earlier `reindex` intact.
fn seed_embedding_model(tx: &Transaction<'_>) -> rusqlite::Result<()> {
    tx.execute(
        "INSERT OR IGNORE INTO schema_meta (key, value) VALUES ('embedding_model', 'nomic-embed-text')",
        [],
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unmigrated_db() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        crate::db::schema::init_schema(&conn).unwrap();
        conn
    }

    #[test]
    fn fresh_store_reports_version_1() {
        let conn = unmigrated_db();
        assert_eq!(get_schema_version(&conn).unwrap(), 1);
        assert_eq!(get_embedding_model(&conn).unwrap(), None);
    }

    #[test]
    fn migrations_reach_the_current_version() {
        let mut conn = unmigrated_db();
        run_migrations(&mut conn).unwrap();
        assert_eq!(get_schema_version(&conn).unwrap(), CURRENT_SCHEMA_VERSION);
    }

    #[test]
    fn first_step_seeds_the_default_embedding_model() {
        let mut conn = unmigrated_db();
        run_migrations(&mut conn).unwrap();
        assert_eq!(
            get_embedding_model(&conn).unwrap().as_deref(),
            Some("nomic-embed-text")
        );
    }

    #[test]
    fn a_model_recorded_before_migrating_is_kept() {
        let mut conn = unmigrated_db();
        set_embedding_model(&conn, "mxbai-embed-large").unwrap();

        run_migrations(&mut conn).unwrap();

        assert_eq!(
            get_embedding_model(&conn).unwrap().as_deref(),
            Some("mxbai-embed-large")
        );
    }

    #[test]
    fn rerunning_migrations_changes_nothing() {
        let mut conn = unmigrated_db();
        run_migrations(&mut conn).unwrap();
        run_migrations(&mut conn).unwrap();
        assert_eq!(get_schema_version(&conn).unwrap(), CURRENT_SCHEMA_VERSION);
    }

    #[test]
    fn recorded_model_can_be_replaced() {
        let mut conn = unmigrated_db();
        run_migrations(&mut conn).unwrap();

        set_embedding_model(&conn, "mxbai-embed-large").unwrap();
        assert_eq!(
            get_embedding_model(&conn).unwrap().as_deref(),
            Some("mxbai-embed-large")
        );
    }

    #[test]
    fn step_table_ends_at_the_current_version() {
        assert_eq!(STEPS.last().map(|&(v, _)| v), Some(CURRENT_SCHEMA_VERSION));
    }
}
