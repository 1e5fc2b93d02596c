//! Session identifiers and the per-session record held by the registry.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, OnceLock};
use tokio::sync::{Mutex, MutexGuard, watch};
use uuid::Uuid;

use super::engine::{ClientInfo, Handshake, ProtocolEngine};

/// Opaque session identifier (random UUID v4).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// Generate a fresh identifier.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for SessionId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for SessionId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl Borrow<str> for SessionId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Lifecycle phase of a session as seen from outside.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    /// Registered, handshake not completed.
    Uninitialized,
    /// Handshake completed; tools may be called.
    Ready,
    /// Closed; no further requests are served.
    Closed,
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionPhase::Uninitialized => write!(f, "uninitialized"),
            SessionPhase::Ready => write!(f, "ready"),
            SessionPhase::Closed => write!(f, "closed"),
        }
    }
}

/// Snapshot of a session (serializable for the status endpoint).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStatus {
    pub session_id: SessionId,
    pub state: SessionPhase,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub protocol_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_info: Option<ClientInfo>,
    pub created_at: DateTime<Utc>,
    pub last_activity_at: DateTime<Utc>,
}

/// A live session: one protocol engine plus bookkeeping.
///
/// The engine sits behind an async mutex, so requests for the same session
/// run one at a time in arrival order while other sessions proceed. Status
/// reads go through the handshake the engine publishes and never wait on
/// that mutex.
#[derive(Debug)]
pub struct Session {
    id: SessionId,
    created_at: DateTime<Utc>,
    last_activity_ms: AtomicI64,
    handshake: Arc<OnceLock<Handshake>>,
    engine: Mutex<ProtocolEngine>,
    closed: watch::Sender<bool>,
}

impl Session {
    pub fn new(id: SessionId, engine: ProtocolEngine) -> Self {
        let now = Utc::now();
        let (closed, _) = watch::channel(false);
        Self {
            id,
            created_at: now,
            last_activity_ms: AtomicI64::new(now.timestamp_millis()),
            handshake: engine.published_handshake(),
            engine: Mutex::new(engine),
            closed,
        }
    }

    pub fn id(&self) -> &SessionId {
        &self.id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn last_activity_at(&self) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(self.last_activity_ms.load(Ordering::Relaxed))
            .unwrap_or(self.created_at)
    }

    /// Record activity now.
    pub fn touch(&self) {
        self.last_activity_ms
            .fetch_max(Utc::now().timestamp_millis(), Ordering::Relaxed);
    }

    /// Wait for exclusive access to the engine.
    pub async fn lock_engine(&self) -> MutexGuard<'_, ProtocolEngine> {
        self.engine.lock().await
    }

    /// Whether a request is currently being processed.
    pub fn is_busy(&self) -> bool {
        self.engine.try_lock().is_err()
    }

    /// Mark the session closed. Returns `true` only for the call that
    /// actually closed it.
    pub fn close(&self) -> bool {
        !self.closed.send_replace(true)
    }

    pub fn is_closed(&self) -> bool {
        *self.closed.borrow()
    }

    /// Resolves once the session is closed.
    pub async fn closed(&self) {
        let mut rx = self.closed.subscribe();
        // The sender lives as long as `self`, so this only returns on close.
        let _ = rx.wait_for(|closed| *closed).await;
    }

    /// Current status.
    pub fn status(&self) -> SessionStatus {
        let phase = self.phase();
        let handshake = self.handshake.get().filter(|_| phase == SessionPhase::Ready);

        SessionStatus {
            session_id: self.id.clone(),
            state: phase,
            protocol_version: handshake.map(|h| h.protocol_version.clone()),
            client_info: handshake.map(|h| h.client_info.clone()),
            created_at: self.created_at,
            last_activity_at: self.last_activity_at(),
        }
    }

    pub fn phase(&self) -> SessionPhase {
        if self.is_closed() {
            SessionPhase::Closed
        } else if self.handshake.get().is_some() {
            SessionPhase::Ready
        } else {
            SessionPhase::Uninitialized
        }
    }
}
