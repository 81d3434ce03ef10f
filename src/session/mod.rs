//! Session management
//!
//! A chat session owns the conversation history and the mood log for one
//! user. It is created at session start, handed by reference to every
//! interaction handler, and cleared when the session ends or sits idle past
//! the manager's timeout. Sessions live in memory only.
use crate::error::{MedibotError, Result};
use crate::mood::MoodHistory;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

pub const GREETING: &str =
    "👋 Hello! I'm **MediBot**. Ask me any medical question based on my knowledge base.";

/// Session status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    /// Session is accepting interactions
    Active,
    /// Session has ended and its history was cleared
    Ended,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

/// A chat session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatSession {
    /// Unique session identifier
    pub id: Uuid,

    /// When the session was started
    pub started_at: DateTime<Utc>,

    /// Last interaction, used for idle expiry
    pub last_seen: DateTime<Utc>,

    /// When the session ended (if applicable)
    pub ended_at: Option<DateTime<Utc>>,

    /// Current session status
    pub status: SessionStatus,

    /// Conversation so far, oldest first
    pub messages: Vec<ChatMessage>,

    /// Moods logged during this session
    pub moods: MoodHistory,
}

impl ChatSession {
    /// Start a session seeded with the assistant greeting
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            started_at: now,
            last_seen: now,
            ended_at: None,
            status: SessionStatus::Active,
            messages: vec![ChatMessage {
                role: Role::Assistant,
                content: GREETING.to_string(),
            }],
            moods: MoodHistory::new(),
        }
    }

    pub fn touch(&mut self) {
        self.last_seen = Utc::now();
    }

    pub fn idle_for(&self, now: DateTime<Utc>) -> Duration {
        now - self.last_seen
    }

    pub fn push_user(&mut self, content: impl Into<String>) {
        self.messages.push(ChatMessage {
            role: Role::User,
            content: content.into(),
        });
    }

    pub fn push_assistant(&mut self, content: impl Into<String>) {
        self.messages.push(ChatMessage {
            role: Role::Assistant,
            content: content.into(),
        });
    }

    /// End the session, dropping its history
    pub fn end(&mut self) {
        self.messages.clear();
        self.moods.clear();
        self.ended_at = Some(Utc::now());
        self.status = SessionStatus::Ended;
    }

    /// Get session duration
    pub fn duration(&self) -> chrono::Duration {
        let end = self.ended_at.unwrap_or_else(Utc::now);
        end - self.started_at
    }
}

impl Default for ChatSession {
    fn default() -> Self {
        Self::new()
    }
}

/// In-memory registry of live sessions
#[derive(Debug, Default)]
pub struct SessionManager {
    sessions: HashMap<Uuid, ChatSession>,
    /// Sessions idle longer than this are treated as ended
    idle_timeout: Option<Duration>,
}

impl SessionManager {
    /// Create a new session manager; sessions never expire
    pub fn new() -> Self {
        Self::default()
    }

    /// Expire sessions that see no interaction for `secs` seconds
    pub fn with_idle_timeout(mut self, secs: u64) -> Self {
        let secs = i64::try_from(secs).unwrap_or(i64::MAX).min(i64::MAX / 1000);
        self.idle_timeout = Some(Duration::seconds(secs));
        self
    }

    /// Create and start a new session
    pub fn create_session(&mut self) -> &ChatSession {
        self.expire_idle(Utc::now());

        let session = ChatSession::new();
        let id = session.id;
        tracing::info!(session = %id, "Session started");
        self.sessions.entry(id).or_insert(session)
    }

    fn is_expired(&self, session: &ChatSession, now: DateTime<Utc>) -> bool {
        self.idle_timeout
            .is_some_and(|timeout| session.idle_for(now) > timeout)
    }

    pub fn get(&self, id: &Uuid) -> Result<&ChatSession> {
        self.sessions
            .get(id)
            .filter(|session| !self.is_expired(session, Utc::now()))
            .ok_or_else(|| MedibotError::SessionNotFound { id: id.to_string() })
    }

    /// Mutable access counts as an interaction and refreshes `last_seen`
    pub fn get_mut(&mut self, id: &Uuid) -> Result<&mut ChatSession> {
        let expired = self
            .sessions
            .get(id)
            .is_some_and(|session| self.is_expired(session, Utc::now()));
        if expired {
            self.drop_session(id);
        }

        let session = self
            .sessions
            .get_mut(id)
            .ok_or_else(|| MedibotError::SessionNotFound { id: id.to_string() })?;
        session.touch();
        Ok(session)
    }

    /// End every session idle past the timeout as of `now`.
    /// Returns how many were dropped.
    pub fn expire_idle(&mut self, now: DateTime<Utc>) -> usize {
        let expired: Vec<Uuid> = self
            .sessions
            .values()
            .filter(|session| self.is_expired(session, now))
            .map(|session| session.id)
            .collect();

        for id in &expired {
            self.drop_session(id);
        }
        if !expired.is_empty() {
            tracing::info!(count = expired.len(), "Expired idle sessions");
        }
        expired.len()
    }

    fn drop_session(&mut self, id: &Uuid) {
        if let Some(mut session) = self.sessions.remove(id) {
            session.end();
            tracing::debug!(session = %id, "Idle session dropped");
        }
    }

    /// End a session and forget it
    pub fn end_session(&mut self, id: &Uuid) -> Result<ChatSession> {
        let mut session = self
            .sessions
            .remove(id)
            .ok_or_else(|| MedibotError::SessionNotFound { id: id.to_string() })?;
        session.end();
        tracing::info!(
            session = %id,
            duration_secs = session.duration().num_seconds(),
            "Session ended"
        );
        Ok(session)
    }

    /// All live sessions, newest first
    pub fn list(&self) -> Vec<&ChatSession> {
        let mut sessions: Vec<&ChatSession> = self.sessions.values().collect();
        sessions.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        sessions
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
