//! Content entry commands.

use anyhow::{anyhow, Context, Result};

use crate::config::HindsightConfig;
use crate::memory::types::{ContentType, Metadata, NewContent};

/// Add a content entry to a memory. The index upsert embeds the content,
/// so the service call runs on the blocking pool.
pub async fn add(
    config: &HindsightConfig,
    owner: &str,
    memory_id: &str,
    content: &str,
    content_type: &str,
    metadata: Option<&str>,
) -> Result<()> {
    let content_type = content_type.parse::<ContentType>().map_err(|e| anyhow!(e))?;
    let metadata: Metadata = match metadata {
        Some(raw) => serde_json::from_str(raw).context("metadata must be a JSON object")?,
        None => Metadata::new(),
    };

    let config = config.clone();
    let owner = owner.to_string();
    let memory_id = memory_id.to_string();
    let content = content.to_string();
    let stored = tokio::task::spawn_blocking(move || -> Result<_> {
        let service = super::build_service(&config)?;
        Ok(service.add_content(
            &owner,
            &memory_id,
            NewContent {
                content,
                content_type,
                metadata,
            },
        )?)
    })
    .await
    .context("add task failed")??;

    println!("Added content {} to memory {}", stored.id, stored.memory_id);
    println!(
        "  [{}] {}",
        stored.content_type.as_str(),
        super::preview(&stored.content)
    );
    Ok(())
}

/// Remove one content entry.
pub fn remove(
    config: &HindsightConfig,
    owner: &str,
    memory_id: &str,
    content_id: &str,
) -> Result<()> {
    let service = super::build_service(config)?;
    let content = service.delete_content(owner, memory_id, content_id)?;
    println!(
        "Removed content {} ({})",
        content.id,
        content.content_type.as_str()
    );
    Ok(())
}
