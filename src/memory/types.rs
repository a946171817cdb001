//! Core domain type definitions.
//!
//! Defines [`Memory`] (an owner-scoped container), [`MemoryContent`] (a typed
//! content item), [`HistoryEntry`] (one row of the append-only change
//! ledger), and the request structs the store operations take.

use serde::{Deserialize, Serialize};

/// Schemaless content metadata: string keys to JSON values.
pub type Metadata = serde_json::Map<String, serde_json::Value>;

/// Category of a memory container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemoryType {
    /// Durable facts about the user themselves.
    PersonalTrait,
    /// Material tied to a specific ongoing project.
    Project,
    /// General reference knowledge.
    Knowledge,
    /// Write-once container holding a whole-store export.
    Snapshot,
    /// Conversation reflections and session-derived records.
    Episodic,
}

impl MemoryType {
    /// The string stored in the `memory_type` column.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PersonalTrait => "personal_trait",
            Self::Project => "project",
            Self::Knowledge => "knowledge",
            Self::Snapshot => "snapshot",
            Self::Episodic => "episodic",
        }
    }
}

impl std::fmt::Display for MemoryType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for MemoryType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "personal_trait" => Ok(Self::PersonalTrait),
            "project" => Ok(Self::Project),
            "knowledge" => Ok(Self::Knowledge),
            "snapshot" => Ok(Self::Snapshot),
            "episodic" => Ok(Self::Episodic),
            _ => Err(format!("unknown memory type: {s}")),
        }
    }
}

/// Kind of payload a content item carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentType {
    Text,
    Pdf,
    Image,
    Code,
    /// A formatted conversation transcript, usually with reflection metadata.
    Conversation,
    /// A whole-store export payload. Never vector-indexed.
    Snapshot,
}

impl ContentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Pdf => "pdf",
            Self::Image => "image",
            Self::Code => "code",
            Self::Conversation => "conversation",
            Self::Snapshot => "snapshot",
        }
    }
}

impl std::fmt::Display for ContentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ContentType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "text" => Ok(Self::Text),
            "pdf" => Ok(Self::Pdf),
            "image" => Ok(Self::Image),
            "code" => Ok(Self::Code),
            "conversation" => Ok(Self::Conversation),
            "snapshot" => Ok(Self::Snapshot),
            _ => Err(format!("unknown content type: {s}")),
        }
    }
}

/// Operation recorded by a history entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HistoryOp {
    Create,
    Update,
    AddContent,
    DeleteContent,
    Delete,
    Rollback,
}

impl HistoryOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::AddContent => "add_content",
            Self::DeleteContent => "delete_content",
            Self::Delete => "delete",
            Self::Rollback => "rollback",
        }
    }
}

impl std::fmt::Display for HistoryOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for HistoryOp {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "create" => Ok(Self::Create),
            "update" => Ok(Self::Update),
            "add_content" => Ok(Self::AddContent),
            "delete_content" => Ok(Self::DeleteContent),
            "delete" => Ok(Self::Delete),
            "rollback" => Ok(Self::Rollback),
            _ => Err(format!("unknown history operation: {s}")),
        }
    }
}

/// A memory container, matching the `memories` table schema.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Memory {
    /// UUID v4 primary key.
    pub id: String,
    /// Owning user. Every read and write is scoped by this.
    pub owner_id: String,
    pub name: String,
    pub description: Option<String>,
    pub memory_type: MemoryType,
    /// RFC 3339 creation timestamp.
    pub created_at: String,
    /// RFC 3339 last-modification timestamp. Refreshed by updates and by
    /// content additions.
    pub updated_at: String,
}

/// A content item inside a memory, matching the `memory_contents` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryContent {
    /// UUID v4 primary key. Preserved across delete_content rollback.
    pub id: String,
    pub memory_id: String,
    pub content: String,
    pub content_type: ContentType,
    #[serde(default)]
    pub metadata: Metadata,
    /// RFC 3339 creation timestamp. Preserved across delete_content rollback.
    pub created_at: String,
}

impl MemoryContent {
    /// Snapshot payloads never enter the vector index.
    pub fn is_indexable(&self) -> bool {
        self.content_type != ContentType::Snapshot
    }
}

/// One row of the append-only change ledger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// UUID v4 primary key.
    pub id: String,
    /// The memory this entry describes. No FK: the entry outlives the row.
    pub memory_id: String,
    pub operation: HistoryOp,
    /// JSON document sufficient to undo the operation. Shape depends on
    /// `operation`; see the store and rollback modules.
    pub content_snapshot: serde_json::Value,
    /// RFC 3339 timestamp of the mutation.
    pub created_at: String,
}

/// Fields for [`crate::memory::store::create_memory`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateMemory {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub memory_type: MemoryType,
}

/// Partial update for [`crate::memory::store::update_memory`]. `None` fields
/// are left untouched; `updated_at` refreshes regardless.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateMemory {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub memory_type: Option<MemoryType>,
}

/// Fields for [`crate::memory::store::add_content`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewContent {
    pub content: String,
    pub content_type: ContentType,
    #[serde(default)]
    pub metadata: Metadata,
}

/// Map a text column holding an enum string through its `FromStr`.
pub(crate) fn parse_enum_col<T>(idx: usize, raw: String) -> rusqlite::Result<T>
where
    T: std::str::FromStr<Err = String>,
{
    raw.parse().map_err(|e: String| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, e.into())
    })
}

impl Memory {
    /// Row mapper for `SELECT id, owner_id, name, description, memory_type,
    /// created_at, updated_at` in that column order.
    pub(crate) fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Memory {
            id: row.get(0)?,
            owner_id: row.get(1)?,
            name: row.get(2)?,
            description: row.get(3)?,
            memory_type: parse_enum_col(4, row.get::<_, String>(4)?)?,
            created_at: row.get(5)?,
            updated_at: row.get(6)?,
        })
    }
}

impl MemoryContent {
    /// Row mapper for `SELECT id, memory_id, content, content_type, metadata,
    /// created_at` in that column order.
    pub(crate) fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        let metadata_json: Option<String> = row.get(4)?;
        let metadata = match metadata_json {
            Some(raw) => serde_json::from_str(&raw).map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(
                    4,
                    rusqlite::types::Type::Text,
                    Box::new(e),
                )
            })?,
            None => Metadata::new(),
        };
        Ok(MemoryContent {
            id: row.get(0)?,
            memory_id: row.get(1)?,
            content: row.get(2)?,
            content_type: parse_enum_col(3, row.get::<_, String>(3)?)?,
            metadata,
            created_at: row.get(5)?,
        })
    }
}

impl HistoryEntry {
    /// Row mapper for `SELECT id, memory_id, operation, content_snapshot,
    /// created_at` in that column order.
    pub(crate) fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        let snapshot_json: String = row.get(3)?;
        let content_snapshot = serde_json::from_str(&snapshot_json).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(3, rusqlite::types::Type::Text, Box::new(e))
        })?;
        Ok(HistoryEntry {
            id: row.get(0)?,
            memory_id: row.get(1)?,
            operation: parse_enum_col(2, row.get::<_, String>(2)?)?,
            content_snapshot,
            created_at: row.get(4)?,
        })
    }
}
