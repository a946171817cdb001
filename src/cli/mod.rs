//! Terminal command handlers.
//!
//! Each handler takes the loaded config plus parsed arguments, assembles
//! what it needs, and prints a human-readable report. Handlers whose
//! service call may invoke the embedding backend run it on the blocking
//! pool; the rest run inline.

pub mod contents;
pub mod doctor;
pub mod episodic;
pub mod history;
pub mod memories;
pub mod reindex;
pub mod search;
pub mod snapshot;
pub mod stats;

use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};

use crate::config::HindsightConfig;
use crate::db;
use crate::embedding;
use crate::index::sqlite_vec::SqliteVecIndex;
use crate::llm;
use crate::service::MemoryService;

/// Assemble a [`MemoryService`] over the configured database and backends.
pub fn build_service(config: &HindsightConfig) -> Result<MemoryService> {
    let conn = db::open_database(config.resolved_db_path()).context("failed to open database")?;
    let db = Arc::new(Mutex::new(conn));

    let embedder = embedding::create_embedder(&config.embedding)
        .context("failed to create embedding provider")?;
    let index = SqliteVecIndex::new(Arc::clone(&db), Arc::from(embedder))
        .context("failed to initialize index tables")?;

    let generator = llm::create_generator(&config.generation)
        .context("failed to create generation provider")?;

    Ok(MemoryService::new(
        db,
        Arc::new(index),
        Arc::from(generator),
        Arc::new(config.clone()),
    ))
}

/// Flatten content to a single display line, truncated at 120 chars.
pub(crate) fn preview(content: &str) -> String {
    const MAX_CHARS: usize = 120;
    let flat = content.replace('\n', " ");
    if flat.chars().count() <= MAX_CHARS {
        flat
    } else {
        let cut: String = flat.chars().take(MAX_CHARS).collect();
        format!("{cut}...")
    }
}

/// Approximate file size for display.
pub(crate) fn human_size(bytes: u64) -> String {
    match bytes {
        b if b < 1 << 10 => format!("{b} B"),
        b if b < 1 << 20 => format!("{:.1} KB", b as f64 / 1024.0),
        b => format!("{:.1} MB", b as f64 / (1024.0 * 1024.0)),
    }
}
