mod cli;
mod config;
mod db;
mod embedding;
mod error;
mod index;
mod llm;
mod memory;
mod reflection;
mod service;
mod session;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "hindsight",
    version,
    about = "Versioned memory store for LLM applications"
)]
struct Cli {
    /// Owner whose memories to operate on (defaults to the configured owner)
    #[arg(long, global = true)]
    owner: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create a memory
    Create {
        /// Human-readable name
        name: String,
        /// Memory type: personal_trait, project, knowledge, or episodic
        #[arg(long, default_value = "knowledge")]
        memory_type: String,
        /// Optional free-form description
        #[arg(long)]
        description: Option<String>,
    },
    /// List memories
    List,
    /// Show a memory and its contents
    Show { memory_id: String },
    /// Update a memory's name, description, or type
    Update {
        memory_id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        description: Option<String>,
        /// New memory type: personal_trait, project, knowledge, or episodic
        #[arg(long)]
        memory_type: Option<String>,
    },
    /// Delete a memory, its contents, and its index entries
    Delete { memory_id: String },
    /// Add a content entry to a memory
    Add {
        memory_id: String,
        /// The content text
        content: String,
        /// Content type: text, pdf, image, code, or conversation
        #[arg(long, default_value = "text")]
        content_type: String,
        /// Metadata as a JSON object
        #[arg(long)]
        metadata: Option<String>,
    },
    /// Remove a content entry from a memory
    RemoveContent {
        memory_id: String,
        content_id: String,
    },
    /// Show the change ledger for a memory
    History { memory_id: String },
    /// Undo one history entry
    Rollback {
        memory_id: String,
        history_id: String,
    },
    /// Vector search within a memory
    Search {
        memory_id: String,
        query: String,
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Hybrid vector + keyword recall within a memory
    Recall {
        memory_id: String,
        query: String,
        /// Vector weight between 0 and 1
        #[arg(long)]
        alpha: Option<f64>,
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Reflect over a conversation transcript and store it in a memory
    Remember {
        memory_id: String,
        /// Path to a JSON transcript: an array of {"role", "content"} objects
        transcript: PathBuf,
    },
    /// Run reflection over a transcript without storing anything
    Reflect {
        /// Path to a JSON transcript: an array of {"role", "content"} objects
        transcript: PathBuf,
    },
    /// Capture all live memories into a snapshot
    Snapshot {
        /// Snapshot name (defaults to a timestamped one)
        #[arg(long)]
        name: Option<String>,
    },
    /// Replace live memories with a snapshot's captured state
    Restore { snapshot_id: String },
    /// Rebuild index entries from stored contents
    Reindex {
        /// Memory to rebuild; omit to reindex every memory
        memory_id: Option<String>,
    },
    /// Show memory statistics
    Stats,
    /// Run database diagnostics
    Doctor,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = config::HindsightConfig::load()?;

    // Tracing goes to stderr so stdout stays clean for command output.
    // RUST_LOG overrides the configured level when set.
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let owner = cli
        .owner
        .unwrap_or_else(|| config.storage.default_owner.clone());

    match cli.command {
        Command::Create {
            name,
            memory_type,
            description,
        } => {
            cli::memories::create(&config, &owner, &name, &memory_type, description.as_deref())?;
        }
        Command::List => cli::memories::list(&config, &owner)?,
        Command::Show { memory_id } => cli::memories::show(&config, &owner, &memory_id)?,
        Command::Update {
            memory_id,
            name,
            description,
            memory_type,
        } => {
            cli::memories::update(
                &config,
                &owner,
                &memory_id,
                name.as_deref(),
                description.as_deref(),
                memory_type.as_deref(),
            )?;
        }
        Command::Delete { memory_id } => cli::memories::delete(&config, &owner, &memory_id)?,
        Command::Add {
            memory_id,
            content,
            content_type,
            metadata,
        } => {
            cli::contents::add(
                &config,
                &owner,
                &memory_id,
                &content,
                &content_type,
                metadata.as_deref(),
            )
            .await?;
        }
        Command::RemoveContent {
            memory_id,
            content_id,
        } => {
            cli::contents::remove(&config, &owner, &memory_id, &content_id)?;
        }
        Command::History { memory_id } => cli::history::history(&config, &owner, &memory_id)?,
        Command::Rollback {
            memory_id,
            history_id,
        } => {
            cli::history::rollback(&config, &owner, &memory_id, &history_id).await?;
        }
        Command::Search {
            memory_id,
            query,
            limit,
        } => {
            cli::search::search(&config, &owner, &memory_id, &query, limit).await?;
        }
        Command::Recall {
            memory_id,
            query,
            alpha,
            limit,
        } => {
            cli::search::recall(&config, &owner, &memory_id, &query, alpha, limit).await?;
        }
        Command::Remember {
            memory_id,
            transcript,
        } => {
            cli::episodic::remember(&config, &owner, &memory_id, &transcript).await?;
        }
        Command::Reflect { transcript } => cli::episodic::reflect(&config, &transcript).await?,
        Command::Snapshot { name } => cli::snapshot::snapshot(&config, &owner, name.as_deref())?,
        Command::Restore { snapshot_id } => {
            cli::snapshot::restore(&config, &owner, &snapshot_id).await?;
        }
        Command::Reindex { memory_id } => {
            cli::reindex::reindex(&config, &owner, memory_id.as_deref()).await?;
        }
        Command::Stats => cli::stats::stats(&config, &owner)?,
        Command::Doctor => cli::doctor::doctor(&config)?,
    }

    Ok(())
}
