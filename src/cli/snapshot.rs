//! Snapshot commands.

use std::io::Write;

use anyhow::{bail, Context, Result};

use crate::config::HindsightConfig;

/// Capture all live memories into a snapshot.
pub fn snapshot(config: &HindsightConfig, owner: &str, name: Option<&str>) -> Result<()> {
    let service = super::build_service(config)?;
    let memory = service.create_snapshot(owner, name.map(str::to_string))?;
    println!("Created snapshot {} ({})", memory.id, memory.name);
    Ok(())
}

/// Replace the owner's live memories with a snapshot's captured state,
/// after confirmation. Restored contents are re-embedded, so the service
/// call runs on the blocking pool.
pub async fn restore(config: &HindsightConfig, owner: &str, snapshot_id: &str) -> Result<()> {
    println!("WARNING: This will permanently delete ALL live memories for {owner}");
    println!("and recreate the state captured in snapshot {snapshot_id}.");
    print!("\nType YES to confirm: ");
    std::io::stdout().flush()?;

    let mut input = String::new();
    std::io::stdin().read_line(&mut input)?;
    if input.trim() != "YES" {
        bail!("restore cancelled");
    }

    let config = config.clone();
    let owner_arg = owner.to_string();
    let snapshot_arg = snapshot_id.to_string();
    let outcome = tokio::task::spawn_blocking(move || -> Result<_> {
        let service = super::build_service(&config)?;
        Ok(service.restore_snapshot(&owner_arg, &snapshot_arg)?)
    })
    .await
    .context("restore task failed")??;

    println!("Restore complete:");
    println!("  Memories dropped:   {}", outcome.dropped_memory_ids.len());
    println!("  Memories restored:  {}", outcome.restored.len());
    println!("  Contents recreated: {}", outcome.recreated.len());

    if !outcome.restored.is_empty() {
        println!();
        println!("Restored memories (new ids):");
        for m in &outcome.restored {
            println!("  {}  {}", m.id, m.name);
        }
    }
    Ok(())
}
