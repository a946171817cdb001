//! Memory CRUD commands.

use anyhow::{anyhow, Result};

use crate::config::HindsightConfig;
use crate::memory::types::{CreateMemory, MemoryType, UpdateMemory};

/// Create a memory and print its id.
pub fn create(
    config: &HindsightConfig,
    owner: &str,
    name: &str,
    memory_type: &str,
    description: Option<&str>,
) -> Result<()> {
    let memory_type = memory_type.parse::<MemoryType>().map_err(|e| anyhow!(e))?;
    let service = super::build_service(config)?;

    let memory = service.create_memory(
        owner,
        CreateMemory {
            name: name.to_string(),
            description: description.map(str::to_string),
            memory_type,
        },
    )?;

    println!("Created memory {}", memory.id);
    println!("  Name:        {}", memory.name);
    println!("  Type:        {}", memory.memory_type.as_str());
    if let Some(ref description) = memory.description {
        println!("  Description: {description}");
    }
    Ok(())
}

/// List the owner's memories, oldest first.
pub fn list(config: &HindsightConfig, owner: &str) -> Result<()> {
    let service = super::build_service(config)?;
    let memories = service.list_memories(owner)?;

    if memories.is_empty() {
        println!("No memories found for {owner}.");
        return Ok(());
    }

    println!("Memories for {owner}:");
    for m in &memories {
        println!("  {}  [{:<14}] {}", m.id, m.memory_type.as_str(), m.name);
    }
    Ok(())
}

/// Show one memory with its contents.
pub fn show(config: &HindsightConfig, owner: &str, memory_id: &str) -> Result<()> {
    let service = super::build_service(config)?;
    let memory = service.get_memory(owner, memory_id)?;
    let contents = service.list_contents(owner, memory_id)?;

    println!("Memory: {}", memory.id);
    println!("{}", "=".repeat(50));
    println!("  Name:        {}", memory.name);
    println!("  Type:        {}", memory.memory_type.as_str());
    if let Some(ref description) = memory.description {
        println!("  Description: {description}");
    }
    println!("  Owner:       {}", memory.owner_id);
    println!("  Created:     {}", memory.created_at);
    println!("  Updated:     {}", memory.updated_at);
    println!();

    if contents.is_empty() {
        println!("No contents.");
        return Ok(());
    }

    println!("Contents ({}):", contents.len());
    for (i, c) in contents.iter().enumerate() {
        println!("  {}. [{}] {}", i + 1, c.content_type.as_str(), c.id);
        println!("     {}", super::preview(&c.content));
        if !c.metadata.is_empty() {
            println!("     metadata: {}", serde_json::to_string(&c.metadata)?);
        }
    }
    Ok(())
}

/// Update name, description, or type.
pub fn update(
    config: &HindsightConfig,
    owner: &str,
    memory_id: &str,
    name: Option<&str>,
    description: Option<&str>,
    memory_type: Option<&str>,
) -> Result<()> {
    let memory_type = memory_type
        .map(|t| t.parse::<MemoryType>())
        .transpose()
        .map_err(|e| anyhow!(e))?;
    let service = super::build_service(config)?;

    let memory = service.update_memory(
        owner,
        memory_id,
        UpdateMemory {
            name: name.map(str::to_string),
            description: description.map(str::to_string),
            memory_type,
        },
    )?;

    println!("Updated memory {}", memory.id);
    println!("  Name:        {}", memory.name);
    println!("  Type:        {}", memory.memory_type.as_str());
    if let Some(ref description) = memory.description {
        println!("  Description: {description}");
    }
    Ok(())
}

/// Delete a memory, its contents, and its index entries.
pub fn delete(config: &HindsightConfig, owner: &str, memory_id: &str) -> Result<()> {
    let service = super::build_service(config)?;
    let memory = service.delete_memory(owner, memory_id)?;
    println!("Deleted memory {} ({})", memory.id, memory.name);
    Ok(())
}
