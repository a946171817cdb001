//! Per-user conversation sessions.
//!
//! Conversation turns accumulate in an in-process registry keyed by owner
//! id. Each owner gets an independent lock, so concurrent turns for
//! different owners never contend and turns for the same owner cannot
//! interleave.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};

use crate::error::{HindsightError, Result};

/// One conversation turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
        }
    }
}

/// Message history for one owner.
#[derive(Debug, Default)]
pub struct Session {
    messages: Vec<ChatMessage>,
}

impl Session {
    pub fn append(&mut self, message: ChatMessage) {
        self.messages.push(message);
    }

    /// The last `n` messages, oldest first.
    pub fn recent_window(&self, n: usize) -> &[ChatMessage] {
        let start = self.messages.len().saturating_sub(n);
        &self.messages[start..]
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

/// Registry of per-owner sessions.
#[derive(Default)]
pub struct SessionStore {
    sessions: Mutex<HashMap<String, Arc<Mutex<Session>>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch or create the session handle for an owner. The registry lock is
    /// held only for the lookup; callers lock the returned handle.
    pub fn session(&self, owner_id: &str) -> Result<Arc<Mutex<Session>>> {
        let mut sessions = self
            .sessions
            .lock()
            .map_err(|_| HindsightError::LockPoisoned)?;
        Ok(sessions
            .entry(owner_id.to_string())
            .or_default()
            .clone())
    }

    /// Clear an owner's history without creating a session for them.
    pub fn clear(&self, owner_id: &str) -> Result<()> {
        let sessions = self
            .sessions
            .lock()
            .map_err(|_| HindsightError::LockPoisoned)?;
        if let Some(handle) = sessions.get(owner_id) {
            let mut session = handle.lock().map_err(|_| HindsightError::LockPoisoned)?;
            session.clear();
        }
        Ok(())
    }
}
