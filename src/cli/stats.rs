//! CLI `stats` command — per-owner usage summary.

use anyhow::Result;

use crate::config::HindsightConfig;

/// Print counts for one owner's memories, contents, and history.
pub fn stats(config: &HindsightConfig, owner: &str) -> Result<()> {
    let db_path = config.resolved_db_path();
    let conn = crate::db::open_database(&db_path)?;

    let report = crate::memory::stats::memory_stats(&conn, owner, Some(&db_path))?;

    println!("Stats for {owner}");
    println!("{}", "=".repeat(50));
    println!(
        "  Memories:    {} ({} live, {} snapshots)",
        report.total_memories, report.live_memories, report.snapshot_memories
    );
    println!("  Contents:    {}", report.total_contents);
    println!("  History:     {}", report.history_entries);
    println!("  Store size:  {}", super::human_size(report.db_size_bytes));
    println!();

    println!("Memories by type:");
    for t in &["personal_trait", "project", "knowledge", "episodic", "snapshot"] {
        let count = report.by_type.get(*t).copied().unwrap_or(0);
        println!("  {t:<16} {count}");
    }
    println!();

    println!("Contents by type:");
    for t in &["text", "pdf", "image", "code", "conversation", "snapshot"] {
        let count = report.by_content_type.get(*t).copied().unwrap_or(0);
        println!("  {t:<16} {count}");
    }

    if let (Some(oldest), Some(newest)) = (&report.oldest_memory, &report.newest_memory) {
        println!();
        println!("  Oldest:      {oldest}");
        println!("  Newest:      {newest}");
    }

    Ok(())
}
