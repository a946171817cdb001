#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rusqlite::Connection;

use hindsight::config::HindsightConfig;
use hindsight::db;
use hindsight::embedding::{Embedder, EmbeddingError};
use hindsight::index::sqlite_vec::SqliteVecIndex;
use hindsight::llm::{GenerationError, TextGenerator};
use hindsight::memory::types::{
    ContentType, CreateMemory, Memory, MemoryType, Metadata, NewContent,
};
use hindsight::service::MemoryService;

/// A reply in the shape the reflection parser expects.
pub const REFLECTION_REPLY: &str = r#"{
    "context_tags": ["storage", "retrieval"],
    "conversation_summary": "Walked through storing and finding notes",
    "what_worked": "Concrete examples",
    "what_to_avoid": "Unscoped questions"
}"#;

/// Open a fresh in-memory database with schema and migrations applied.
pub fn test_db() -> Connection {
    db::load_sqlite_vec();
    let mut conn = Connection::open_in_memory().unwrap();
    conn.pragma_update(None, "foreign_keys", "ON").unwrap();
    db::schema::init_schema(&conn).unwrap();
    db::migrations::run_migrations(&mut conn).unwrap();
    conn
}

/// Deterministic 8-dim embedder: a unit spike chosen by the first byte of
/// the text, so texts starting with different letters are orthogonal.
pub struct SpikeEmbedder;

impl Embedder for SpikeEmbedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let spike = (*text.as_bytes().first().unwrap_or(&0) as usize) % 8;
        let mut v = vec![0.0f32; 8];
        v[spike] = 1.0;
        Ok(v)
    }

    fn dimensions(&self) -> usize {
        8
    }
}

/// Generator that always returns the same canned reply.
pub struct CannedGenerator(pub &'static str);

#[async_trait]
impl TextGenerator for CannedGenerator {
    async fn generate(&self, _: &str, _: &str) -> Result<String, GenerationError> {
        Ok(self.0.to_string())
    }
}

/// Build a service over a fresh in-memory database.
pub fn test_service() -> MemoryService {
    service_on(Arc::new(Mutex::new(test_db())))
}

/// Build a service over a shared connection, so tests can also query the
/// underlying tables directly.
pub fn service_on(db: Arc<Mutex<Connection>>) -> MemoryService {
    let index = SqliteVecIndex::new(Arc::clone(&db), Arc::new(SpikeEmbedder)).unwrap();
    MemoryService::new(
        db,
        Arc::new(index),
        Arc::new(CannedGenerator(REFLECTION_REPLY)),
        Arc::new(HindsightConfig::default()),
    )
}

/// Create a knowledge memory through the service.
pub fn create_memory(service: &MemoryService, owner: &str, name: &str) -> Memory {
    service
        .create_memory(
            owner,
            CreateMemory {
                name: name.to_string(),
                description: None,
                memory_type: MemoryType::Knowledge,
            },
        )
        .unwrap()
}

/// Plain text content with empty metadata.
pub fn text_content(content: &str) -> NewContent {
    NewContent {
        content: content.to_string(),
        content_type: ContentType::Text,
        metadata: Metadata::new(),
    }
}
