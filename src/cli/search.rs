//! Terminal search commands.

use anyhow::{Context, Result};

use crate::config::HindsightConfig;
use crate::memory::search::SearchResult;

/// Vector search within one memory.
pub async fn search(
    config: &HindsightConfig,
    owner: &str,
    memory_id: &str,
    query: &str,
    limit: Option<usize>,
) -> Result<()> {
    let config = config.clone();
    let owner = owner.to_string();
    let memory_id = memory_id.to_string();
    let query_arg = query.to_string();
    let results = tokio::task::spawn_blocking(move || -> Result<Vec<SearchResult>> {
        let service = super::build_service(&config)?;
        Ok(service.search(&owner, &memory_id, &query_arg, limit)?)
    })
    .await
    .context("search task failed")??;

    print_results(&results, "similarity");
    Ok(())
}

/// Hybrid vector + keyword recall within one memory.
pub async fn recall(
    config: &HindsightConfig,
    owner: &str,
    memory_id: &str,
    query: &str,
    alpha: Option<f64>,
    limit: Option<usize>,
) -> Result<()> {
    let config = config.clone();
    let owner = owner.to_string();
    let memory_id = memory_id.to_string();
    let query_arg = query.to_string();
    let results = tokio::task::spawn_blocking(move || -> Result<Vec<SearchResult>> {
        let service = super::build_service(&config)?;
        Ok(service.recall(&owner, &memory_id, &query_arg, alpha, limit)?)
    })
    .await
    .context("recall task failed")??;

    print_results(&results, "score");
    Ok(())
}

fn print_results(results: &[SearchResult], score_label: &str) {
    if results.is_empty() {
        println!("No results found.");
        return;
    }

    println!("Found {} result(s)\n", results.len());

    for (i, result) in results.iter().enumerate() {
        println!(
            "  {}. [{}] {} ({}: {:.4})",
            i + 1,
            result.content_type.as_str(),
            result.content_id,
            score_label,
            result.similarity,
        );
        println!("     {}", super::preview(&result.content));
        println!();
    }
}
