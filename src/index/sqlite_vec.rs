//! Embedded index over sqlite-vec (`vec0`) and FTS5.
//!
//! Owns two virtual tables on the shared database: `contents_vec`,
//! partitioned by memory id with cosine distance, and `contents_fts`, a
//! standalone FTS5 table for BM25 rank. Neither carries foreign keys; a
//! pointer to a deleted content is tolerated and skipped by readers.
//!
//! The adapter takes its own handle on the connection mutex. Callers must
//! not invoke it while holding a store transaction on the same connection.

use std::sync::{Arc, Mutex};

use rusqlite::{params, Connection};

use super::{IndexError, IndexHit, IndexResult, VectorIndex};
use crate::embedding::Embedder;
use crate::memory::types::Metadata;

pub struct SqliteVecIndex {
    db: Arc<Mutex<Connection>>,
    embedder: Arc<dyn Embedder>,
}

impl SqliteVecIndex {
    /// Create the adapter and its tables. The vector column width comes from
    /// the embedder, so a model change needs a reindex into fresh tables.
    pub fn new(db: Arc<Mutex<Connection>>, embedder: Arc<dyn Embedder>) -> IndexResult<Self> {
        let dims = embedder.dimensions();
        {
            let conn = db.lock().map_err(|_| IndexError::LockPoisoned)?;
            conn.execute_batch(&format!(
                "CREATE VIRTUAL TABLE IF NOT EXISTS contents_vec USING vec0(
                    content_id TEXT PRIMARY KEY,
                    memory_id TEXT PARTITION KEY,
                    embedding FLOAT[{dims}] distance_metric=cosine
                );
                CREATE VIRTUAL TABLE IF NOT EXISTS contents_fts USING fts5(
                    content,
                    content_id UNINDEXED,
                    memory_id UNINDEXED
                );"
            ))?;
        }
        Ok(Self { db, embedder })
    }

    fn lock(&self) -> IndexResult<std::sync::MutexGuard<'_, Connection>> {
        self.db.lock().map_err(|_| IndexError::LockPoisoned)
    }
}

impl VectorIndex for SqliteVecIndex {
    fn upsert(
        &self,
        memory_id: &str,
        content_id: &str,
        text: &str,
        _metadata: &Metadata,
    ) -> IndexResult<()> {
        // Embed before taking the lock; the provider may do slow HTTP I/O.
        let embedding = self.embedder.embed(text)?;

        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        // Delete-then-insert gives upsert semantics on both virtual tables.
        tx.execute(
            "DELETE FROM contents_vec WHERE content_id = ?1",
            params![content_id],
        )?;
        tx.execute(
            "DELETE FROM contents_fts WHERE content_id = ?1",
            params![content_id],
        )?;
        tx.execute(
            "INSERT INTO contents_vec (content_id, memory_id, embedding) VALUES (?1, ?2, ?3)",
            params![content_id, memory_id, embedding_to_bytes(&embedding)],
        )?;
        tx.execute(
            "INSERT INTO contents_fts (content, content_id, memory_id) VALUES (?1, ?2, ?3)",
            params![text, content_id, memory_id],
        )?;

        tx.commit()?;
        Ok(())
    }

    fn delete(&self, content_id: &str) -> IndexResult<()> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        tx.execute(
            "DELETE FROM contents_vec WHERE content_id = ?1",
            params![content_id],
        )?;
        tx.execute(
            "DELETE FROM contents_fts WHERE content_id = ?1",
            params![content_id],
        )?;
        tx.commit()?;
        Ok(())
    }

    fn delete_all(&self, memory_id: &str) -> IndexResult<()> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        tx.execute(
            "DELETE FROM contents_vec WHERE memory_id = ?1",
            params![memory_id],
        )?;
        tx.execute(
            "DELETE FROM contents_fts WHERE memory_id = ?1",
            params![memory_id],
        )?;
        tx.commit()?;
        Ok(())
    }

    fn search(&self, memory_id: &str, query: &str, limit: usize) -> IndexResult<Vec<IndexHit>> {
        let embedding = self.embedder.embed(query)?;

        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT content_id, distance FROM contents_vec \
             WHERE embedding MATCH ?1 AND memory_id = ?2 \
             ORDER BY distance LIMIT ?3",
        )?;
        let hits = stmt
            .query_map(
                params![embedding_to_bytes(&embedding), memory_id, limit as i64],
                |row| {
                    let distance: f64 = row.get(1)?;
                    Ok(IndexHit {
                        content_id: row.get(0)?,
                        similarity: 1.0 - distance,
                    })
                },
            )?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(hits)
    }

    fn keyword_search(
        &self,
        memory_id: &str,
        query: &str,
        limit: usize,
    ) -> IndexResult<Vec<String>> {
        let escaped = escape_fts_query(query);
        if escaped.is_empty() {
            return Ok(Vec::new());
        }

        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT content_id FROM contents_fts \
             WHERE contents_fts MATCH ?1 AND memory_id = ?2 \
             ORDER BY rank LIMIT ?3",
        )?;
        let ids = stmt
            .query_map(params![escaped, memory_id, limit as i64], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(ids)
    }
}

/// sqlite-vec takes vectors as raw little-endian f32 bytes.
fn embedding_to_bytes(embedding: &[f32]) -> &[u8] {
    unsafe {
        std::slice::from_raw_parts(
            embedding.as_ptr() as *const u8,
            embedding.len() * std::mem::size_of::<f32>(),
        )
    }
}

/// Quote each term so user punctuation cannot break FTS5 MATCH syntax.
///
/// Whitespace-delimited words become quoted terms joined by spaces, which
/// FTS5 combines with implicit AND.
fn escape_fts_query(query: &str) -> String {
    query
        .split_whitespace()
        .map(|word| {
            let clean = word.replace('"', "");
            format!("\"{clean}\"")
        })
        .filter(|w| w != "\"\"")
        .collect::<Vec<_>>()
        .join(" ")
}
