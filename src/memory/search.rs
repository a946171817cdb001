//! Retrieval over indexed contents.
//!
//! Pure pieces of the read path: [`hybrid_merge`] fuses vector and keyword
//! rankings into one list, and [`join_contents`] resolves ranked content ids
//! back to stored rows, silently skipping ids the index still holds but the
//! store no longer does. The service layer sequences these around the index
//! adapter calls.

use std::collections::HashMap;

use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;

use crate::error::Result;
use crate::index::IndexHit;
use crate::memory::types::{ContentType, Metadata};

/// One retrieval result, joined back to the stored content.
#[derive(Debug, Clone, Serialize)]
pub struct SearchResult {
    pub content_id: String,
    pub content: String,
    pub content_type: ContentType,
    pub metadata: Metadata,
    /// For plain vector search: `1 − cosine distance`. For hybrid recall:
    /// the fused score.
    pub similarity: f64,
}

/// A fused ranking entry produced by [`hybrid_merge`].
#[derive(Debug, Clone, PartialEq)]
pub struct FusedHit {
    pub content_id: String,
    pub score: f64,
}

/// Merge vector and keyword rankings.
///
/// Each id scores `alpha * similarity` if present in the vector results plus
/// `(1 − alpha) * (rank + 1) / keyword_len` if present in the keyword results
/// (rank 0 = best keyword hit). The union is sorted by score, descending;
/// ties keep vector order first, then keyword order, via the stable sort.
/// Empty inputs produce an empty ranking.
pub fn hybrid_merge(vector: &[IndexHit], keyword: &[String], alpha: f64) -> Vec<FusedHit> {
    let mut order: Vec<String> = Vec::new();
    let mut scores: HashMap<String, f64> = HashMap::new();

    for hit in vector {
        if scores
            .insert(hit.content_id.clone(), alpha * hit.similarity)
            .is_none()
        {
            order.push(hit.content_id.clone());
        }
    }

    if !keyword.is_empty() {
        let total = keyword.len() as f64;
        for (rank, id) in keyword.iter().enumerate() {
            let contribution = (1.0 - alpha) * ((rank + 1) as f64 / total);
            match scores.get_mut(id) {
                Some(score) => *score += contribution,
                None => {
                    scores.insert(id.clone(), contribution);
                    order.push(id.clone());
                }
            }
        }
    }

    let mut fused: Vec<FusedHit> = order
        .into_iter()
        .map(|content_id| {
            let score = scores[&content_id];
            FusedHit { content_id, score }
        })
        .collect();

    fused.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    fused
}

/// Resolve `(content_id, score)` pairs to stored contents, preserving order.
///
/// Ids without a matching row are stale index pointers and are dropped.
pub fn join_contents(
    conn: &Connection,
    memory_id: &str,
    scored: &[(String, f64)],
) -> Result<Vec<SearchResult>> {
    let mut stmt = conn.prepare(
        "SELECT id, memory_id, content, content_type, metadata, created_at
         FROM memory_contents WHERE id = ?1 AND memory_id = ?2",
    )?;

    let mut results = Vec::with_capacity(scored.len());
    for (content_id, score) in scored {
        let row = stmt
            .query_row(params![content_id, memory_id], |row| {
                crate::memory::types::MemoryContent::from_row(row)
            })
            .optional()?;

        match row {
            Some(content) => results.push(SearchResult {
                content_id: content.id,
                content: content.content,
                content_type: content.content_type,
                metadata: content.metadata,
                similarity: *score,
            }),
            None => {
                tracing::debug!(content_id, "skipping stale index hit");
            }
        }
    }
    Ok(results)
}

/// Convenience adapter from vector hits to the scored-pair form.
pub fn hits_to_scored(hits: &[IndexHit]) -> Vec<(String, f64)> {
    hits.iter()
        .map(|h| (h.content_id.clone(), h.similarity))
        .collect()
}

/// Convenience adapter from fused hits to the scored-pair form.
pub fn fused_to_scored(fused: &[FusedHit]) -> Vec<(String, f64)> {
    fused.iter().map(|f| (f.content_id.clone(), f.score)).collect()
}
