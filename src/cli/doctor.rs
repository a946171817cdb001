//! CLI `doctor` command — store diagnostics and recovery hints.

use anyhow::{Context, Result};

use crate::config::HindsightConfig;
use crate::db;

/// Open the store, run the health checks, and print the findings.
pub fn doctor(config: &HindsightConfig) -> Result<()> {
    let db_path = config.resolved_db_path();

    if !db_path.exists() {
        println!("No database at {} yet.", db_path.display());
        println!("The first `hindsight create` will make one.");
        return Ok(());
    }

    let size = std::fs::metadata(&db_path).map(|m| m.len()).unwrap_or(0);
    let conn =
        db::open_database(&db_path).context("failed to open database (may be corrupt)")?;
    let report = db::check_database_health(&conn).context("health check failed")?;

    println!("Health: {}", db_path.display());
    println!("{}", "=".repeat(50));
    println!("  File size:       {}", super::human_size(size));
    println!("  Schema version:  {}", report.schema_version);
    println!("  sqlite-vec:      v{}", report.sqlite_vec_version);
    if report.integrity_ok {
        println!("  Integrity:       ok");
    } else {
        println!("  Integrity:       FAILED ({})", report.integrity_details);
    }
    println!();

    println!("Rows:");
    println!("  Memories:        {}", report.memory_count);
    println!("  Contents:        {}", report.content_count);
    println!("  History:         {}", report.history_count);
    match (report.index_vec_count, report.index_fts_count) {
        (Some(vec_rows), Some(fts_rows)) => {
            println!("  Vector index:    {vec_rows}");
            println!("  Keyword index:   {fts_rows}");
        }
        _ => println!("  Index:           not built yet (first write or reindex creates it)"),
    }
    println!();

    println!("Embedding model:");
    println!(
        "  Recorded:        {}",
        report.embedding_model.as_deref().unwrap_or("(none)")
    );
    println!("  Configured:      {}", config.embedding.model);
    match report.embedding_model.as_deref() {
        Some(recorded) if recorded != config.embedding.model => {
            println!("  WARNING: vectors were built with a different model.");
            println!("  Run `hindsight reindex` to rebuild them.");
        }
        _ => {}
    }

    if !report.integrity_ok {
        println!();
        println!("The database file is damaged. Restore it from a backup, or start");
        println!("fresh and rebuild from a snapshot:");
        println!("  hindsight restore <snapshot-id>");
    }

    Ok(())
}
