//! History ledger commands.

use anyhow::{Context, Result};

use crate::config::HindsightConfig;
use crate::memory::rollback::UndoneChange;

/// Print the change ledger for a memory, newest first.
pub fn history(config: &HindsightConfig, owner: &str, memory_id: &str) -> Result<()> {
    let service = super::build_service(config)?;
    let entries = service.list_history(owner, memory_id)?;

    println!("History for memory {memory_id}:");
    for entry in &entries {
        println!(
            "  {}  {:<14} {}",
            entry.created_at,
            entry.operation.as_str(),
            entry.id
        );
    }
    Ok(())
}

/// Undo one ledger entry. Undoing a content deletion re-embeds the content,
/// so the service call runs on the blocking pool.
pub async fn rollback(
    config: &HindsightConfig,
    owner: &str,
    memory_id: &str,
    history_id: &str,
) -> Result<()> {
    let config = config.clone();
    let owner = owner.to_string();
    let memory_id = memory_id.to_string();
    let history_arg = history_id.to_string();
    let outcome = tokio::task::spawn_blocking(move || -> Result<_> {
        let service = super::build_service(&config)?;
        Ok(service.rollback(&owner, &memory_id, &history_arg)?)
    })
    .await
    .context("rollback task failed")??;

    println!("Rolled back entry {history_id}");
    match outcome.change {
        UndoneChange::RestoredFields => println!("  Memory fields restored."),
        UndoneChange::RemovedContent(Some(content_id)) => {
            println!("  Content {content_id} removed.");
        }
        UndoneChange::RemovedContent(None) => {
            println!("  Content was already gone; nothing to remove.");
        }
        UndoneChange::RecreatedContent(Some(content)) => {
            println!("  Content {} recreated.", content.id);
        }
        UndoneChange::RecreatedContent(None) => {
            println!("  Content already present; nothing to recreate.");
        }
    }
    Ok(())
}
