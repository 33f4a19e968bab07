//! In-memory tracker for running social-attention tests.
//!
//! Frames arrive every few hundred milliseconds, so look-time totals are
//! accumulated here and only the final score is written back in one update.
//! Individual frames are mirrored to the database by the caller.
//!
//! Entries are swept on every insert: unfinished tests after
//! [`MAX_LIFETIME_SECS`], finished ones after [`FINISHED_RETENTION_SECS`].

use std::collections::HashMap;

use cortexa_core::error::CoreError;
use cortexa_core::social_attention::{GazeSide, LookTimes};
use cortexa_core::types::{DbId, Timestamp};
use serde::Serialize;
use tokio::sync::RwLock;

/// An abandoned test is dropped this long after it started.
pub const MAX_LIFETIME_SECS: i64 = 60 * 60;

/// A finished test stays around this long for late `/finish` retries.
pub const FINISHED_RETENTION_SECS: i64 = 5 * 60;

/// One gaze sample as reported back in the result timeline.
#[derive(Debug, Clone, Serialize)]
pub struct FrameLog {
    pub side: &'static str,
    pub timestamp: i64,
}

#[derive(Debug, Clone)]
pub struct LiveSession {
    pub session_id: String,
    pub student_id: DbId,
    pub teacher_id: Option<DbId>,
    pub started_at: Timestamp,
    pub finished_at: Option<Timestamp>,
    pub times: LookTimes,
    pub frames: Vec<FrameLog>,
}

impl LiveSession {
    pub fn new(session_id: String, student_id: DbId, teacher_id: Option<DbId>) -> Self {
        Self {
            session_id,
            student_id,
            teacher_id,
            started_at: chrono::Utc::now(),
            finished_at: None,
            times: LookTimes::default(),
            frames: Vec::new(),
        }
    }

    pub fn is_active(&self) -> bool {
        self.finished_at.is_none()
    }

    fn is_expired(&self, now: Timestamp) -> bool {
        let (since, limit) = match self.finished_at {
            Some(finished) => (finished, FINISHED_RETENTION_SECS),
            None => (self.started_at, MAX_LIFETIME_SECS),
        };
        now - since > chrono::Duration::seconds(limit)
    }
}

#[derive(Debug, Default)]
pub struct LiveSessions {
    sessions: RwLock<HashMap<String, LiveSession>>,
}

impl LiveSessions {
    pub async fn insert(&self, session: LiveSession) {
        let mut sessions = self.sessions.write().await;
        let swept = Self::sweep(&mut sessions, chrono::Utc::now());
        if swept > 0 {
            tracing::debug!(swept, "Evicted expired social attention sessions");
        }
        sessions.insert(session.session_id.clone(), session);
    }

    /// Drop every expired entry and return how many went.
    pub async fn evict_expired(&self, now: Timestamp) -> usize {
        Self::sweep(&mut *self.sessions.write().await, now)
    }

    fn sweep(sessions: &mut HashMap<String, LiveSession>, now: Timestamp) -> usize {
        let before = sessions.len();
        sessions.retain(|_, s| !s.is_expired(now));
        before - sessions.len()
    }

    /// Credit one frame to an active session.
    pub async fn record_frame(
        &self,
        session_id: &str,
        side: GazeSide,
        timestamp: i64,
    ) -> Result<(), CoreError> {
        let mut sessions = self.sessions.write().await;
        let session = sessions
            .get_mut(session_id)
            .filter(|s| s.is_active())
            .ok_or_else(|| CoreError::Forbidden("Active session not found".into()))?;
        session.times.record(side);
        session.frames.push(FrameLog {
            side: side.as_str(),
            timestamp,
        });
        Ok(())
    }

    /// Close the session and return a copy of its final state.
    ///
    /// Finishing twice returns the state captured by the first call.
    pub async fn finish(&self, session_id: &str) -> Result<LiveSession, CoreError> {
        let mut sessions = self.sessions.write().await;
        let session = sessions
            .get_mut(session_id)
            .ok_or_else(|| CoreError::Missing("Session not found".into()))?;
        if session.finished_at.is_none() {
            session.finished_at = Some(chrono::Utc::now());
        }
        Ok(session.clone())
    }

    pub async fn remove(&self, session_id: &str) -> Option<LiveSession> {
        self.sessions.write().await.remove(session_id)
    }

    pub async fn count(&self) -> usize {
        self.sessions.read().await.len()
    }
}
