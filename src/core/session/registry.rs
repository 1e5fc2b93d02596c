//! Session registry.
//!
//! Process-wide map from session id to live [`Session`]. Lookups share a read
//! lock; insertions and removals take the write lock. The lock is held only
//! for the map operation itself, never while a session's engine is working.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use super::types::{Session, SessionId, SessionPhase};

/// Concurrent session store.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: RwLock<HashMap<SessionId, Arc<Session>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a session. An existing entry under the same id is replaced
    /// and closed.
    pub async fn add_session(&self, id: SessionId, session: Arc<Session>) {
        let previous = self.sessions.write().await.insert(id.clone(), session);
        if let Some(previous) = previous {
            warn!(session_id = %id, "Session id collision; replacing existing session");
            previous.close();
        }
        info!(session_id = %id, "Session created");
    }

    /// Look up a live session.
    pub async fn get_session(&self, id: &str) -> Option<Arc<Session>> {
        self.sessions.read().await.get(id).cloned()
    }

    /// Remove and close a session. Returns the removed session, or `None` if
    /// it was already gone.
    pub async fn remove_session(&self, id: &str) -> Option<Arc<Session>> {
        let mut sessions = self.sessions.write().await;
        let removed = sessions.remove(id)?;
        removed.close();
        drop(sessions);

        info!(session_id = %id, "Session removed");
        Some(removed)
    }

    pub async fn contains(&self, id: &str) -> bool {
        self.sessions.read().await.contains_key(id)
    }

    /// Number of live sessions.
    pub async fn count(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Snapshot of the live session ids.
    pub async fn ids(&self) -> Vec<SessionId> {
        self.sessions.read().await.keys().cloned().collect()
    }

    /// Whether the session exists and has completed its handshake. Does not
    /// wait for a request in flight on that session.
    pub async fn is_ready(&self, id: &str) -> bool {
        self.get_session(id)
            .await
            .is_some_and(|session| session.phase() == SessionPhase::Ready)
    }

    /// Evict sessions idle for longer than `max_idle`. Sessions with a
    /// request in flight are kept. Returns the number evicted.
    pub async fn sweep_idle(&self, max_idle: Duration) -> usize {
        let Some(cutoff) = chrono::Duration::from_std(max_idle)
            .ok()
            .and_then(|idle| chrono::Utc::now().checked_sub_signed(idle))
        else {
            return 0;
        };

        let mut sessions = self.sessions.write().await;
        let expired: Vec<SessionId> = sessions
            .iter()
            .filter(|(_, s)| s.last_activity_at() < cutoff && !s.is_busy())
            .map(|(id, _)| id.clone())
            .collect();

        for id in &expired {
            if let Some(session) = sessions.remove(id) {
                session.close();
                info!(session_id = %id, "Idle session evicted");
            }
        }
        drop(sessions);

        if !expired.is_empty() {
            debug!(evicted = expired.len(), "Idle sweep finished");
        }
        expired.len()
    }

    /// Close and remove every session.
    pub async fn close_all(&self) -> usize {
        let drained: Vec<(SessionId, Arc<Session>)> =
            self.sessions.write().await.drain().collect();
        for (_, session) in &drained {
            session.close();
        }
        info!(session_count = drained.len(), "All sessions closed");
        drained.len()
    }
}
