//! Tokopedia product search tool.
//!
//! Forwards a keyword to the scraping backend and formats the listings it
//! returns. Backend failures are reported as tool output.

use rmcp::handler::server::tool::cached_schema_for_type;
use rmcp::model::{CallToolResult, Content, JsonObject};
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::fmt::Write as _;
use std::sync::Arc;
use tracing::{info, instrument};

use super::client::{Product, ScraperClient, display_value};
use crate::domains::tools::contract::InputContract;
use crate::domains::tools::error::ToolError;
use crate::domains::tools::handlers::{ToolContext, ToolHandler};

/// Parameters for the product search tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct ScrapeTokopediaParams {
    #[schemars(description = "Product keyword to search for")]
    #[schemars(length(min = 1))]
    pub keyword: String,
}

/// Tokopedia product search tool.
pub struct ScrapeTokopediaTool {
    client: Arc<ScraperClient>,
    schema: Arc<JsonObject>,
    contract: InputContract,
}

impl ScrapeTokopediaTool {
    /// Tool name as registered in MCP.
    pub const NAME: &'static str = "scrape_tokopedia";

    /// Tool description shown to clients.
    pub const DESCRIPTION: &'static str = "Scrape product listings from Tokopedia based on a keyword search. Returns a list of products with titles, prices, images, links, ratings, and store information.";

    pub fn new(client: Arc<ScraperClient>) -> Self {
        let schema = cached_schema_for_type::<ScrapeTokopediaParams>();
        let contract = InputContract::from_schema(&schema);
        Self {
            client,
            schema,
            contract,
        }
    }
}

/// Format the product list returned to the client.
pub fn format_products(keyword: &str, products: &[Product]) -> String {
    let mut text = format!(
        "Found {} products for keyword \"{}\":\n\n",
        products.len(),
        keyword
    );

    if products.is_empty() {
        text.push_str("No products found for this keyword.");
        return text;
    }

    for (index, product) in products.iter().enumerate() {
        let _ = writeln!(text, "{}. **{}**", index + 1, product.title);
        let _ = writeln!(text, "   Price: {}", display_value(&product.price));
        if let Some(rating) = product.rating.as_ref().filter(|r| !r.is_null()) {
            let _ = writeln!(text, "   Rating: {}", display_value(rating));
        }
        if let Some(store) = &product.store {
            let _ = writeln!(text, "   Store: {store}");
        }
        let _ = writeln!(text, "   Link: {}", product.link);
        let _ = writeln!(text, "   Image: {}\n", product.image);
    }

    text
}

#[async_trait::async_trait]
impl ToolHandler for ScrapeTokopediaTool {
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
        arguments: Map<String, Value>,
        context: &ToolContext,
    ) -> Result<CallToolResult, ToolError> {
        let params: ScrapeTokopediaParams = serde_json::from_value(Value::Object(arguments))
            .map_err(|e| ToolError::invalid_arguments(e.to_string()))?;

        let products = self
            .client
            .search_products(&params.keyword, context.session_id.as_ref())
            .await
            .map_err(|e| {
                ToolError::execution_failed(format!(
                    "Error scraping Tokopedia for keyword \"{}\": {}",
                    params.keyword, e
                ))
            })?;

        info!(
            keyword = %params.keyword,
            total_found = products.len(),
            "Scrape Tokopedia completed"
        );

        Ok(CallToolResult::success(vec![Content::text(format_products(
            &params.keyword,
            &products,
        ))]))
    }
}
