//! Session layer.
//!
//! A session binds one [`ProtocolEngine`] to an identifier carried in the
//! `mcp-session-id` header. The [`SessionRegistry`] owns every live session
//! and is the only state shared between concurrent requests.

pub mod engine;
mod error;
mod registry;
mod types;

pub use engine::{
    ClientInfo, EngineState, Handshake, LATEST_PROTOCOL_VERSION, ProtocolEngine,
    SUPPORTED_PROTOCOL_VERSIONS, ServerIdentity,
};
pub use error::SessionError;
pub use registry::SessionRegistry;
pub use types::{Session, SessionId, SessionPhase, SessionStatus};

/// Header carrying the session identifier on every request after the
/// handshake.
pub const SESSION_HEADER: &str = "mcp-session-id";
