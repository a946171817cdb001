//! CLI `reindex` command — rebuild index entries from stored contents.

use std::sync::Arc;

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};

use crate::config::HindsightConfig;
use crate::db;

/// Rebuild the vector and keyword index from the relational store.
///
/// With a memory id, rebuilds that memory only. Without one, rebuilds every
/// memory of the owner and records the configured embedding model.
pub async fn reindex(config: &HindsightConfig, owner: &str, memory_id: Option<&str>) -> Result<()> {
    if let Some(memory_id) = memory_id {
        let config_arg = config.clone();
        let owner_arg = owner.to_string();
        let memory_arg = memory_id.to_string();
        let upserted = tokio::task::spawn_blocking(move || -> Result<usize> {
            let service = super::build_service(&config_arg)?;
            Ok(service.reindex(&owner_arg, &memory_arg)?)
        })
        .await
        .context("reindex task failed")??;

        println!("Reindexed {upserted} content entries for memory {memory_id}.");
        return Ok(());
    }

    let service = Arc::new(super::build_service(config)?);
    let memories = service.list_memories(owner)?;
    if memories.is_empty() {
        println!("No memories to reindex.");
        return Ok(());
    }

    println!(
        "Reindexing {} memories with model '{}'...",
        memories.len(),
        config.embedding.model
    );

    let pb = ProgressBar::new(memories.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("  {bar:40.cyan/blue} {pos}/{len} ({eta})")
            .expect("valid template")
            .progress_chars("##-"),
    );

    let mut upserted = 0;
    for memory in &memories {
        let service = Arc::clone(&service);
        let owner_arg = owner.to_string();
        let memory_arg = memory.id.clone();
        upserted += tokio::task::spawn_blocking(move || service.reindex(&owner_arg, &memory_arg))
            .await
            .context("reindex task failed")??;
        pb.inc(1);
    }
    pb.finish_and_clear();

    // Record which model produced the vectors
    let conn = db::open_database(config.resolved_db_path())?;
    db::migrations::set_embedding_model(&conn, &config.embedding.model)?;

    println!(
        "Reindexed {upserted} content entries across {} memories with model '{}'.",
        memories.len(),
        config.embedding.model
    );
    Ok(())
}
