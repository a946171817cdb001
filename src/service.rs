//! Orchestration over the store, ledger, index, and generation seams.
//!
//! [`MemoryService`] owns the shared connection and the adapter handles.
//! Every mutation runs as lock, transaction, unlock, then index sync: the
//! relational commit is authoritative, and a failed index call on a write
//! path is logged and left for [`MemoryService::reindex`] to repair. Read
//! paths surface index failures to the caller. The service never holds the
//! connection lock across an index call; the embedded adapter locks the same
//! connection internally.

use std::sync::{Arc, Mutex, MutexGuard};

use rusqlite::Connection;

use crate::config::HindsightConfig;
use crate::db::{self, HealthReport};
use crate::error::{HindsightError, Result};
use crate::index::{IndexResult, VectorIndex};
use crate::llm::TextGenerator;
use crate::memory::history;
use crate::memory::rollback::{self, RollbackOutcome, UndoneChange};
use crate::memory::search::{self, SearchResult};
use crate::memory::snapshot::{self, RestoreOutcome};
use crate::memory::stats::{self, StatsResponse};
use crate::memory::store;
use crate::memory::types::{
    ContentType, CreateMemory, HistoryEntry, Memory, MemoryContent, NewContent, UpdateMemory,
};
use crate::reflection::{self, ReflectionOutcome};
use crate::session::{ChatMessage, SessionStore};

pub struct MemoryService {
    db: Arc<Mutex<Connection>>,
    index: Arc<dyn VectorIndex>,
    generator: Arc<dyn TextGenerator>,
    sessions: SessionStore,
    config: Arc<HindsightConfig>,
}

impl MemoryService {
    pub fn new(
        db: Arc<Mutex<Connection>>,
        index: Arc<dyn VectorIndex>,
        generator: Arc<dyn TextGenerator>,
        config: Arc<HindsightConfig>,
    ) -> Self {
        Self {
            db,
            index,
            generator,
            sessions: SessionStore::new(),
            config,
        }
    }

    fn lock_db(&self) -> Result<MutexGuard<'_, Connection>> {
        self.db.lock().map_err(|_| HindsightError::LockPoisoned)
    }

    fn log_index_failure(operation: &str, result: IndexResult<()>) {
        if let Err(e) = result {
            tracing::warn!(
                operation,
                error = %e,
                "index sync failed; run reindex to converge"
            );
        }
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    pub fn config(&self) -> &HindsightConfig {
        &self.config
    }

    // Memory CRUD

    pub fn create_memory(&self, owner_id: &str, req: CreateMemory) -> Result<Memory> {
        let mut conn = self.lock_db()?;
        store::create_memory(&mut conn, owner_id, req)
    }

    pub fn get_memory(&self, owner_id: &str, memory_id: &str) -> Result<Memory> {
        let conn = self.lock_db()?;
        store::get_memory(&conn, owner_id, memory_id)
    }

    pub fn list_memories(&self, owner_id: &str) -> Result<Vec<Memory>> {
        let conn = self.lock_db()?;
        store::list_memories(&conn, owner_id)
    }

    pub fn update_memory(
        &self,
        owner_id: &str,
        memory_id: &str,
        req: UpdateMemory,
    ) -> Result<Memory> {
        let mut conn = self.lock_db()?;
        store::update_memory(&mut conn, owner_id, memory_id, req)
    }

    pub fn delete_memory(&self, owner_id: &str, memory_id: &str) -> Result<Memory> {
        let memory = {
            let mut conn = self.lock_db()?;
            store::delete_memory(&mut conn, owner_id, memory_id)?
        };
        Self::log_index_failure("delete_memory", self.index.delete_all(&memory.id));
        Ok(memory)
    }

    // Contents

    pub fn list_contents(&self, owner_id: &str, memory_id: &str) -> Result<Vec<MemoryContent>> {
        let conn = self.lock_db()?;
        store::list_contents(&conn, owner_id, memory_id)
    }

    pub fn add_content(
        &self,
        owner_id: &str,
        memory_id: &str,
        req: NewContent,
    ) -> Result<MemoryContent> {
        let content = {
            let mut conn = self.lock_db()?;
            store::add_content(&mut conn, owner_id, memory_id, req)?
        };
        if content.is_indexable() {
            Self::log_index_failure(
                "add_content",
                self.index.upsert(
                    &content.memory_id,
                    &content.id,
                    &content.content,
                    &content.metadata,
                ),
            );
        }
        Ok(content)
    }

    pub fn delete_content(
        &self,
        owner_id: &str,
        memory_id: &str,
        content_id: &str,
    ) -> Result<MemoryContent> {
        let content = {
            let mut conn = self.lock_db()?;
            store::delete_content(&mut conn, owner_id, memory_id, content_id)?
        };
        Self::log_index_failure("delete_content", self.index.delete(&content.id));
        Ok(content)
    }

    // History and rollback

    pub fn list_history(&self, owner_id: &str, memory_id: &str) -> Result<Vec<HistoryEntry>> {
        let conn = self.lock_db()?;
        store::get_memory(&conn, owner_id, memory_id)?;
        history::list_for(&conn, memory_id)
    }

    pub fn rollback(
        &self,
        owner_id: &str,
        memory_id: &str,
        history_id: &str,
    ) -> Result<RollbackOutcome> {
        let outcome = {
            let mut conn = self.lock_db()?;
            rollback::rollback(&mut conn, owner_id, memory_id, history_id)?
        };
        match &outcome.change {
            UndoneChange::RemovedContent(Some(content_id)) => {
                Self::log_index_failure("rollback", self.index.delete(content_id));
            }
            UndoneChange::RecreatedContent(Some(content)) if content.is_indexable() => {
                Self::log_index_failure(
                    "rollback",
                    self.index.upsert(
                        &content.memory_id,
                        &content.id,
                        &content.content,
                        &content.metadata,
                    ),
                );
            }
            _ => {}
        }
        Ok(outcome)
    }

    // Snapshots

    pub fn create_snapshot(&self, owner_id: &str, name: Option<String>) -> Result<Memory> {
        let mut conn = self.lock_db()?;
        snapshot::create_snapshot(&mut conn, owner_id, name)
    }

    pub fn restore_snapshot(
        &self,
        owner_id: &str,
        snapshot_id: &str,
    ) -> Result<RestoreOutcome> {
        let outcome = {
            let mut conn = self.lock_db()?;
            snapshot::restore_snapshot(&mut conn, owner_id, snapshot_id)?
        };
        for memory_id in &outcome.dropped_memory_ids {
            Self::log_index_failure("restore_snapshot", self.index.delete_all(memory_id));
        }
        for content in outcome.recreated.iter().filter(|c| c.is_indexable()) {
            Self::log_index_failure(
                "restore_snapshot",
                self.index.upsert(
                    &content.memory_id,
                    &content.id,
                    &content.content,
                    &content.metadata,
                ),
            );
        }
        Ok(outcome)
    }

    // Retrieval

    /// Vector search within one memory, enriched with the stored contents.
    pub fn search(
        &self,
        owner_id: &str,
        memory_id: &str,
        query: &str,
        limit: Option<usize>,
    ) -> Result<Vec<SearchResult>> {
        let limit = limit.unwrap_or(self.config.retrieval.search_limit);
        {
            let conn = self.lock_db()?;
            store::get_memory(&conn, owner_id, memory_id)?;
        }
        let hits = self.index.search(memory_id, query, limit)?;
        let scored = search::hits_to_scored(&hits);
        let conn = self.lock_db()?;
        search::join_contents(&conn, memory_id, &scored)
    }

    /// Hybrid vector + keyword recall within one memory.
    pub fn recall(
        &self,
        owner_id: &str,
        memory_id: &str,
        query: &str,
        alpha: Option<f64>,
        limit: Option<usize>,
    ) -> Result<Vec<SearchResult>> {
        let alpha = alpha.unwrap_or(self.config.retrieval.hybrid_alpha);
        let limit = limit.unwrap_or(self.config.retrieval.recall_limit);
        let candidates = self.config.retrieval.recall_candidates;
        {
            let conn = self.lock_db()?;
            store::get_memory(&conn, owner_id, memory_id)?;
        }
        let vector = self.index.search(memory_id, query, candidates)?;
        let keyword = self.index.keyword_search(memory_id, query, candidates)?;
        let mut fused = search::hybrid_merge(&vector, &keyword, alpha);
        fused.truncate(limit);
        let scored = search::fused_to_scored(&fused);
        let conn = self.lock_db()?;
        search::join_contents(&conn, memory_id, &scored)
    }

    /// Drop and rebuild all index entries for one memory. Unlike the write
    /// paths, failures here are surfaced: the caller asked for the repair.
    pub fn reindex(&self, owner_id: &str, memory_id: &str) -> Result<usize> {
        let contents = {
            let conn = self.lock_db()?;
            store::list_contents(&conn, owner_id, memory_id)?
        };
        self.index.delete_all(memory_id)?;
        let mut upserted = 0;
        for content in contents.iter().filter(|c| c.is_indexable()) {
            self.index.upsert(
                &content.memory_id,
                &content.id,
                &content.content,
                &content.metadata,
            )?;
            upserted += 1;
        }
        tracing::info!(memory_id, upserted, "reindex complete");
        Ok(upserted)
    }

    // Reflection

    /// Distill a transcript into a structured reflection.
    pub async fn reflect(&self, messages: &[ChatMessage]) -> Result<ReflectionOutcome> {
        let transcript = reflection::format_transcript(messages);
        reflection::reflect(self.generator.as_ref(), &transcript).await
    }

    /// Reflect over a conversation and store the transcript as a
    /// `conversation` content whose metadata carries the reflection fields
    /// (or the error-tagged raw reply when the model's output did not parse).
    pub async fn remember_conversation(
        &self,
        owner_id: &str,
        memory_id: &str,
        messages: &[ChatMessage],
    ) -> Result<MemoryContent> {
        let transcript = reflection::format_transcript(messages);
        let outcome = reflection::reflect(self.generator.as_ref(), &transcript).await?;
        let metadata = outcome.to_metadata();

        let content = {
            let mut conn = self.lock_db()?;
            store::add_content(
                &mut conn,
                owner_id,
                memory_id,
                NewContent {
                    content: transcript,
                    content_type: ContentType::Conversation,
                    metadata,
                },
            )?
        };
        Self::log_index_failure(
            "remember_conversation",
            self.index.upsert(
                &content.memory_id,
                &content.id,
                &content.content,
                &content.metadata,
            ),
        );
        Ok(content)
    }

    // Diagnostics

    pub fn stats(&self, owner_id: &str) -> Result<StatsResponse> {
        let conn = self.lock_db()?;
        let db_path = self.config.resolved_db_path();
        stats::memory_stats(&conn, owner_id, Some(&db_path))
    }

    pub fn health(&self) -> Result<HealthReport> {
        let conn = self.lock_db()?;
        db::check_database_health(&conn)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::{Embedder, EmbeddingError};
    use crate::index::sqlite_vec::SqliteVecIndex;
    use crate::index::IndexError;
    use crate::index::IndexHit;
    use crate::llm::GenerationError;
    use crate::memory::types::{Metadata, MemoryType};
    use async_trait::async_trait;

    const REFLECTION_REPLY: &str = r#"{
        "context_tags": ["integration", "memory_store"],
        "conversation_summary": "Walked through storing notes",
        "what_worked": "Short examples",
        "what_to_avoid": "Long detours"
    }"#;

    /// Deterministic 8-dim embedder: a single spike selected by the first
    /// byte of the text, so texts starting with different letters are
    /// orthogonal.
    struct SpikeEmbedder;

    impl Embedder for SpikeEmbedder {
        fn embed(&self, text: &str) -> std::result::Result<Vec<f32>, EmbeddingError> {
            let spike = (*text.as_bytes().first().unwrap_or(&0) as usize) % 8;
            let mut v = vec![0.0f32; 8];
            v[spike] = 1.0;
            Ok(v)
        }

        fn dimensions(&self) -> usize {
            8
        }
    }

    struct CannedGenerator(&'static str);

    #[async_trait]
    impl TextGenerator for CannedGenerator {
        async fn generate(
            &self,
            _: &str,
            _: &str,
        ) -> std::result::Result<String, GenerationError> {
            Ok(self.0.to_string())
        }
    }

    /// Index stub whose every method fails, for write-path tolerance tests.
    struct FailingIndex;

    impl VectorIndex for FailingIndex {
        fn upsert(&self, _: &str, _: &str, _: &str, _: &Metadata) -> IndexResult<()> {
            Err(IndexError::LockPoisoned)
        }
        fn delete(&self, _: &str) -> IndexResult<()> {
            Err(IndexError::LockPoisoned)
        }
        fn delete_all(&self, _: &str) -> IndexResult<()> {
            Err(IndexError::LockPoisoned)
        }
        fn search(&self, _: &str, _: &str, _: usize) -> IndexResult<Vec<IndexHit>> {
            Err(IndexError::LockPoisoned)
        }
        fn keyword_search(&self, _: &str, _: &str, _: usize) -> IndexResult<Vec<String>> {
            Err(IndexError::LockPoisoned)
        }
    }

    fn shared_db() -> Arc<Mutex<Connection>> {
        Arc::new(Mutex::new(crate::db::open_memory_database().unwrap()))
    }

    fn service_on(db: Arc<Mutex<Connection>>) -> MemoryService {
        let index = Arc::new(SqliteVecIndex::new(db.clone(), Arc::new(SpikeEmbedder)).unwrap());
        MemoryService::new(
            db,
            index,
            Arc::new(CannedGenerator(REFLECTION_REPLY)),
            Arc::new(HindsightConfig::default()),
        )
    }

    fn failing_service_on(db: Arc<Mutex<Connection>>) -> MemoryService {
        MemoryService::new(
            db,
            Arc::new(FailingIndex),
            Arc::new(CannedGenerator(REFLECTION_REPLY)),
            Arc::new(HindsightConfig::default()),
        )
    }

    fn knowledge_memory(service: &MemoryService, owner: &str, name: &str) -> Memory {
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

    fn text_content(content: &str) -> NewContent {
        NewContent {
            content: content.to_string(),
            content_type: ContentType::Text,
            metadata: Metadata::new(),
        }
    }

    fn vec_rows(db: &Arc<Mutex<Connection>>) -> i64 {
        let conn = db.lock().unwrap();
        conn.query_row("SELECT COUNT(*) FROM contents_vec", [], |r| r.get(0))
            .unwrap()
    }

    #[test]
    fn add_content_is_searchable() {
        let db = shared_db();
        let service = service_on(db);
        let memory = knowledge_memory(&service, "u1", "notes");
        service
            .add_content("u1", &memory.id, text_content("apple pie recipe"))
            .unwrap();

        let results = service
            .search("u1", &memory.id, "apple crumble", None)
            .unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].content, "apple pie recipe");
        assert!(results[0].similarity > 0.99);
    }

    #[test]
    fn snapshot_typed_content_is_not_indexed() {
        let db = shared_db();
        let service = service_on(db.clone());
        let memory = knowledge_memory(&service, "u1", "notes");
        service
            .add_content(
                "u1",
                &memory.id,
                NewContent {
                    content: "apple payload".to_string(),
                    content_type: ContentType::Snapshot,
                    metadata: Metadata::new(),
                },
            )
            .unwrap();

        assert_eq!(vec_rows(&db), 0);
    }

    #[test]
    fn index_failure_does_not_fail_the_write() {
        let db = shared_db();
        let service = failing_service_on(db);
        let memory = knowledge_memory(&service, "u1", "notes");

        let content = service
            .add_content("u1", &memory.id, text_content("apple pie recipe"))
            .unwrap();
        // the row committed even though the index rejected the upsert
        let contents = service.list_contents("u1", &memory.id).unwrap();
        assert_eq!(contents.len(), 1);
        assert_eq!(contents[0].id, content.id);
    }

    #[test]
    fn reindex_converges_after_index_failures() {
        let db = shared_db();
        // create the adapter tables up front so both services share them
        let healthy = service_on(db.clone());
        let broken = failing_service_on(db.clone());

        let memory = knowledge_memory(&broken, "u1", "notes");
        broken
            .add_content("u1", &memory.id, text_content("apple pie recipe"))
            .unwrap();
        assert_eq!(vec_rows(&db), 0);

        let upserted = healthy.reindex("u1", &memory.id).unwrap();
        assert_eq!(upserted, 1);
        let results = healthy.search("u1", &memory.id, "apple", None).unwrap();
        assert_eq!(results.len(), 1);
    }

    #[test]
    fn delete_memory_drops_its_index_entries() {
        let db = shared_db();
        let service = service_on(db.clone());
        let memory = knowledge_memory(&service, "u1", "notes");
        service
            .add_content("u1", &memory.id, text_content("apple pie recipe"))
            .unwrap();
        assert_eq!(vec_rows(&db), 1);

        service.delete_memory("u1", &memory.id).unwrap();
        assert_eq!(vec_rows(&db), 0);
    }

    #[test]
    fn rollback_of_add_content_removes_index_entry() {
        let db = shared_db();
        let service = service_on(db.clone());
        let memory = knowledge_memory(&service, "u1", "notes");
        service
            .add_content("u1", &memory.id, text_content("apple pie recipe"))
            .unwrap();

        let entries = service.list_history("u1", &memory.id).unwrap();
        let add_entry = entries
            .iter()
            .find(|e| e.operation == crate::memory::types::HistoryOp::AddContent)
            .unwrap();

        service.rollback("u1", &memory.id, &add_entry.id).unwrap();
        assert_eq!(vec_rows(&db), 0);
        assert!(service.list_contents("u1", &memory.id).unwrap().is_empty());

        // rolling the same entry back again is a no-op
        service.rollback("u1", &memory.id, &add_entry.id).unwrap();
        assert_eq!(vec_rows(&db), 0);
    }

    #[test]
    fn rollback_of_delete_content_reindexes_the_content() {
        let db = shared_db();
        let service = service_on(db.clone());
        let memory = knowledge_memory(&service, "u1", "notes");
        let content = service
            .add_content("u1", &memory.id, text_content("apple pie recipe"))
            .unwrap();
        service
            .delete_content("u1", &memory.id, &content.id)
            .unwrap();
        assert_eq!(vec_rows(&db), 0);

        let entries = service.list_history("u1", &memory.id).unwrap();
        let delete_entry = entries
            .iter()
            .find(|e| e.operation == crate::memory::types::HistoryOp::DeleteContent)
            .unwrap();
        service.rollback("u1", &memory.id, &delete_entry.id).unwrap();

        let results = service.search("u1", &memory.id, "apple", None).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].content_id, content.id);
    }

    #[test]
    fn restore_snapshot_rebuilds_the_index() {
        let db = shared_db();
        let service = service_on(db.clone());
        let memory = knowledge_memory(&service, "u1", "notes");
        service
            .add_content("u1", &memory.id, text_content("apple pie recipe"))
            .unwrap();
        let snap = service.create_snapshot("u1", None).unwrap();

        service.delete_memory("u1", &memory.id).unwrap();
        assert_eq!(vec_rows(&db), 0);

        let outcome = service.restore_snapshot("u1", &snap.id).unwrap();
        assert_eq!(outcome.restored.len(), 1);
        assert_eq!(vec_rows(&db), 1);

        let restored_id = &outcome.restored[0].id;
        let results = service.search("u1", restored_id, "apple", None).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].content, "apple pie recipe");
    }

    #[test]
    fn recall_fuses_vector_and_keyword_rankings() {
        let db = shared_db();
        let service = service_on(db);
        let memory = knowledge_memory(&service, "u1", "recipes");
        service
            .add_content("u1", &memory.id, text_content("apple pie recipe"))
            .unwrap();
        service
            .add_content("u1", &memory.id, text_content("grape tart recipe"))
            .unwrap();

        // "grape" spikes on g for the vector leg and keyword-matches the
        // grape content only
        let results = service
            .recall("u1", &memory.id, "grape", None, Some(1))
            .unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].content, "grape tart recipe");
    }

    #[tokio::test]
    async fn remember_conversation_stores_reflected_transcript() {
        let db = shared_db();
        let service = service_on(db);
        let memory = knowledge_memory(&service, "u1", "episodes");

        let messages = vec![
            ChatMessage::new("system", "be helpful"),
            ChatMessage::new("user", "how do I store notes?"),
            ChatMessage::new("assistant", "use a memory per topic"),
        ];
        let content = service
            .remember_conversation("u1", &memory.id, &messages)
            .await
            .unwrap();

        assert_eq!(content.content_type, ContentType::Conversation);
        assert!(content.content.starts_with("USER: how do I store notes?"));
        assert_eq!(
            content.metadata["context_tags"],
            serde_json::json!(["integration", "memory_store"])
        );

        // the transcript is reachable through search
        let results = service
            .search("u1", &memory.id, "USER: how", None)
            .unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].content_id, content.id);
    }

    #[test]
    fn search_on_broken_index_is_an_error() {
        let db = shared_db();
        let service = failing_service_on(db);
        let memory = knowledge_memory(&service, "u1", "notes");

        let err = service.search("u1", &memory.id, "apple", None).unwrap_err();
        assert!(matches!(err, HindsightError::IndexSync(_)));
    }

    #[test]
    fn health_reports_counts() {
        let db = shared_db();
        let service = service_on(db);
        let memory = knowledge_memory(&service, "u1", "notes");
        service
            .add_content("u1", &memory.id, text_content("apple pie recipe"))
            .unwrap();

        let report = service.health().unwrap();
        assert!(report.integrity_ok);
        assert_eq!(report.memory_count, 1);
        assert_eq!(report.content_count, 1);
        assert_eq!(report.index_vec_count, Some(1));
    }
}
