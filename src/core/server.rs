//! MCP server: shared identity, configuration and tool set.
//!
//! The server itself holds no per-client state. Every session gets its own
//! [`ProtocolEngine`] built by [`McpServer::create_engine`], sharing the
//! server identity and tool registry behind `Arc`s.

use std::sync::Arc;

use super::config::Config;
use super::error::Result;
use super::session::{ProtocolEngine, ServerIdentity, SessionId};
use crate::domains::tools::ToolRegistry;

/// The main MCP server handle.
///
/// Cheap to clone; the transport keeps one copy per listener.
#[derive(Clone)]
pub struct McpServer {
    /// Server configuration.
    config: Arc<Config>,

    /// Name, version and instructions sent in the handshake.
    identity: Arc<ServerIdentity>,

    /// Tools available to every session.
    tools: Arc<ToolRegistry>,
}

impl McpServer {
    /// Create a new MCP server with the default tool set.
    pub fn new(config: Config) -> Result<Self> {
        let tools = ToolRegistry::with_default_tools(&config)?;
        Ok(Self::with_registry(config, Arc::new(tools)))
    }

    /// Create a server around an existing tool registry.
    pub fn with_registry(config: Config, tools: Arc<ToolRegistry>) -> Self {
        let identity = Arc::new(ServerIdentity::from(&config.server));
        Self {
            config: Arc::new(config),
            identity,
            tools,
        }
    }

    /// Build a fresh protocol engine for one session.
    pub fn create_engine(&self, session_id: Option<SessionId>) -> ProtocolEngine {
        ProtocolEngine::new(session_id, self.identity.clone(), self.tools.clone())
    }

    /// Get the server name.
    pub fn name(&self) -> &str {
        &self.identity.name
    }

    /// Get the server version.
    pub fn version(&self) -> &str {
        &self.identity.version
    }

    /// Get the server configuration.
    pub fn config(&self) -> &Arc<Config> {
        &self.config
    }

    /// Get the shared tool registry.
    pub fn tools(&self) -> &Arc<ToolRegistry> {
        &self.tools
    }
}
