//! Conversation reflection commands.

use std::path::Path;

use anyhow::{Context, Result};

use crate::config::HindsightConfig;
use crate::reflection::{self, ReflectionOutcome};
use crate::session::ChatMessage;

/// Load a transcript file: a JSON array of `{"role", "content"}` objects.
fn load_transcript(path: &Path) -> Result<Vec<ChatMessage>> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read transcript file: {}", path.display()))?;
    let messages: Vec<ChatMessage> =
        serde_json::from_str(&json).context("failed to parse transcript JSON")?;
    anyhow::ensure!(!messages.is_empty(), "transcript is empty");
    Ok(messages)
}

/// Reflect over a transcript and store it in the target memory.
pub async fn remember(
    config: &HindsightConfig,
    owner: &str,
    memory_id: &str,
    transcript: &Path,
) -> Result<()> {
    let messages = load_transcript(transcript)?;
    let service = super::build_service(config)?;

    let content = service
        .remember_conversation(owner, memory_id, &messages)
        .await?;

    println!("Stored conversation as content {}", content.id);
    if let Some(summary) = content.metadata.get("conversation_summary") {
        println!("  Summary: {}", summary.as_str().unwrap_or_default());
    }
    if let Some(error) = content.metadata.get("error") {
        println!(
            "  Note: reflection did not parse ({}); the raw reply was kept in the metadata.",
            error.as_str().unwrap_or_default()
        );
    }
    Ok(())
}

/// Run reflection over a transcript without storing anything.
pub async fn reflect(config: &HindsightConfig, transcript: &Path) -> Result<()> {
    let messages = load_transcript(transcript)?;
    let generator = crate::llm::create_generator(&config.generation)
        .context("failed to create generation provider")?;

    let transcript_text = reflection::format_transcript(&messages);
    match reflection::reflect(generator.as_ref(), &transcript_text).await? {
        ReflectionOutcome::Parsed(r) => {
            println!("Reflection:");
            println!("  Tags:    {}", r.context_tags.join(", "));
            println!("  Summary: {}", r.conversation_summary);
            println!("  Worked:  {}", r.what_worked);
            println!("  Avoid:   {}", r.what_to_avoid);
        }
        ReflectionOutcome::Unparsed { error, raw } => {
            println!("Reflection did not parse: {error}");
            println!();
            println!("Raw reply:");
            println!("{raw}");
        }
    }
    Ok(())
}
