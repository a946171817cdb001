//! Versioned, owner-scoped memory for LLM applications.
//!
//! Hindsight keeps each user's memories in SQLite, records every change in
//! an append-only history ledger, and exposes the stored contents through
//! hybrid vector + keyword retrieval. Memories come in five types:
//!
//! | Type | Purpose | Mutable |
//! |------|---------|---------|
//! | **Personal trait** | Preferences, habits, facts about the owner | Yes |
//! | **Project** | Ongoing work and its running context | Yes |
//! | **Knowledge** | Reference material, notes, documents | Yes |
//! | **Episodic** | Reflected conversation records | Yes |
//! | **Snapshot** | Point-in-time capture of all live memories | No |
//!
//! # Architecture
//!
//! - **Storage**: a single SQLite file; FTS5 carries the keyword index and
//!   [sqlite-vec](https://github.com/asg017/sqlite-vec) the vectors
//! - **Embeddings**: Ollama or OpenAI-compatible HTTP endpoints
//! - **Retrieval**: per-memory vector search, plus a hybrid mode that
//!   merges vector and keyword rankings under a configurable weight
//! - **History**: every mutation appends a ledger entry; entries can be
//!   rolled back one at a time, and rollbacks are themselves logged
//! - **Reflection**: conversation transcripts are distilled into small
//!   structured records via a chat-completions backend
//!
//! # Modules
//!
//! - [`config`] — TOML file + environment variable configuration
//! - [`db`] — connection setup, schema DDL, migrations, health checks
//! - [`embedding`] — Text-to-vector embedding via HTTP providers
//! - [`index`] — Vector/keyword index over memory contents
//! - [`llm`] — Text generation seam used by reflection
//! - [`memory`] — Core engine: store, history, rollback, snapshots, search, stats
//! - [`reflection`] — Transcript formatting and reflection parsing
//! - [`service`] — Orchestration layer tying the store and the index together
//! - [`session`] — In-process per-owner conversation buffers

pub mod config;
pub mod db;
pub mod embedding;
pub mod error;
pub mod index;
pub mod llm;
pub mod memory;
pub mod reflection;
pub mod service;
pub mod session;
