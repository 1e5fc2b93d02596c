//! Tool handler trait and invocation context.
//!
//! Every tool the server exposes implements [`ToolHandler`]. The protocol
//! engine validates arguments against [`ToolHandler::contract`] before
//! calling [`ToolHandler::invoke`], so handlers can deserialize their
//! arguments without re-checking shapes.

use rmcp::model::{CallToolResult, JsonObject, Tool};
use serde_json::{Map, Value};
use std::sync::Arc;

use super::contract::InputContract;
use super::error::ToolError;
use crate::core::session::SessionId;

/// Per-call context handed to a tool.
#[derive(Debug, Clone, Default)]
pub struct ToolContext {
    /// Session that issued the call, used to correlate side effects on
    /// external services.
    pub session_id: Option<SessionId>,
}

impl ToolContext {
    /// Context for a call made inside `session_id`.
    pub fn for_session(session_id: SessionId) -> Self {
        Self {
            session_id: Some(session_id),
        }
    }
}

/// Trait for implementing tool handlers.
#[async_trait::async_trait]
pub trait ToolHandler: Send + Sync {
    /// Get the name of this tool.
    fn name(&self) -> &str;

    /// Get the description of this tool.
    fn description(&self) -> &str;

    /// JSON Schema of the arguments, generated from the parameter type.
    fn input_schema(&self) -> Arc<JsonObject>;

    /// Argument contract derived from [`ToolHandler::input_schema`].
    fn contract(&self) -> &InputContract;

    /// Execute the tool with already validated arguments.
    ///
    /// An `Err` is a domain failure; it is reported to the client as tool
    /// output and leaves the session usable.
    async fn invoke(
        &self,
        arguments: Map<String, Value>,
        context: &ToolContext,
    ) -> Result<CallToolResult, ToolError>;

    /// Create a Tool model for this tool (metadata).
    fn to_tool(&self) -> Tool {
        Tool {
            name: self.name().to_string().into(),
            description: Some(self.description().to_string().into()),
            input_schema: self.input_schema(),
            annotations: None,
            output_schema: None,
            icons: None,
            meta: None,
            title: None,
        }
    }
}
