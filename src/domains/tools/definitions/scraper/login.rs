//! Tokopedia login status tool.
//!
//! The scraping backend keeps one browser profile per MCP session. This tool
//! asks whether the profile bound to the calling session is logged in.

use rmcp::handler::server::tool::cached_schema_for_type;
use rmcp::model::{CallToolResult, Content, JsonObject};
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{info, instrument};

use super::client::ScraperClient;
use crate::domains::tools::contract::InputContract;
use crate::domains::tools::error::ToolError;
use crate::domains::tools::handlers::{ToolContext, ToolHandler};

/// The login check takes no arguments; the session comes from the context.
#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
pub struct CheckTokopediaLoginParams {}

/// Tokopedia login status tool.
pub struct CheckTokopediaLoginTool {
    client: Arc<ScraperClient>,
    schema: Arc<JsonObject>,
    contract: InputContract,
}

impl CheckTokopediaLoginTool {
    /// Tool name as registered in MCP.
    pub const NAME: &'static str = "check_tokopedia_login";

    /// Tool description shown to clients.
    pub const DESCRIPTION: &'static str = "Check whether the scraping backend holds an authenticated Tokopedia browser session for the current MCP session.";

    pub fn new(client: Arc<ScraperClient>) -> Self {
        let schema = cached_schema_for_type::<CheckTokopediaLoginParams>();
        let contract = InputContract::from_schema(&schema);
        Self {
            client,
            schema,
            contract,
        }
    }
}

#[async_trait::async_trait]
impl ToolHandler for CheckTokopediaLoginTool {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn description(&self) -> &str {
        Self::DESCRIPTION
    }

    fn input_schema(&self) -> Arc<JsonObject> {
        self.schema.clone()
    }

    fn contract(&self) -> &InputContract {
        &self.contract
    }

    #[instrument(skip_all, fields(session_id = ?context.session_id))]
    async fn invoke(
        &self,
        _arguments: Map<String, Value>,
        context: &ToolContext,
    ) -> Result<CallToolResult, ToolError> {
        let session_id = context.session_id.as_ref().ok_or_else(|| {
            ToolError::execution_failed("Login status requires an active MCP session")
        })?;

        let authenticated = self.client.check_login(session_id).await.map_err(|e| {
            ToolError::execution_failed(format!("Error checking Tokopedia login: {e}"))
        })?;
        info!(authenticated, "Tokopedia login status checked");

        let text = if authenticated {
            "Tokopedia login is active for this session."
        } else {
            "Tokopedia login is not active for this session. Log in through the scraper service first."
        };
        Ok(CallToolResult::success(vec![Content::text(text)]))
    }
}
