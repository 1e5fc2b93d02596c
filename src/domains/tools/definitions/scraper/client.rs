//! HTTP client for the scraping backend.
//!
//! The backend owns browser automation and HTML extraction; this client only
//! issues GET requests and decodes the JSON it returns. Calls made on behalf
//! of a session forward the session id in the `mcp-session-id` header so the
//! backend can associate its browser state with that session.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info, instrument};

use crate::core::config::ScraperConfig;
use crate::core::session::{SESSION_HEADER, SessionId};
use crate::domains::tools::error::ToolError;

/// A product listing as returned by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub title: String,
    /// Raw price; the backend sends either a formatted string or a number.
    pub price: Value,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub link: String,
    #[serde(default)]
    pub rating: Option<Value>,
    #[serde(default)]
    pub store: Option<String>,
}

/// Response of the product search endpoint. The backend also echoes
/// `source` and `keyword`; only the listings are used.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductSearchResponse {
    #[serde(default)]
    pub results: Option<Vec<Product>>,
}

#[derive(Debug, Deserialize)]
struct AuthStatus {
    authenticated: bool,
}

/// Client for the scraping backend.
#[derive(Debug, Clone)]
pub struct ScraperClient {
    http: reqwest::Client,
    base_url: String,
}

impl ScraperClient {
    /// Build a client from configuration.
    pub fn new(config: &ScraperConfig) -> Result<Self, ToolError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ToolError::internal(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Search Tokopedia products for `keyword`.
    #[instrument(skip(self))]
    pub async fn search_products(
        &self,
        keyword: &str,
        session_id: Option<&SessionId>,
    ) -> Result<Vec<Product>, ToolError> {
        let query = serde_urlencoded::to_string([("keyword", keyword)])
            .map_err(|e| ToolError::invalid_arguments(e.to_string()))?;
        let url = format!("{}/scraper/tokopedia?{}", self.base_url, query);

        info!("Making request to scraper service: {}", url);
        let data: ProductSearchResponse = self.get_json(&url, session_id).await?;
        let products = data.results.unwrap_or_default();
        debug!(count = products.len(), "Scraper returned products");

        Ok(products)
    }

    /// Ask the backend whether it holds a logged-in browser for this session.
    #[instrument(skip(self))]
    pub async fn check_login(&self, session_id: &SessionId) -> Result<bool, ToolError> {
        let url = format!("{}/auth/check-cookies", self.base_url);
        let status: AuthStatus = self.get_json(&url, Some(session_id)).await?;
        Ok(status.authenticated)
    }

    async fn get_json<T>(&self, url: &str, session_id: Option<&SessionId>) -> Result<T, ToolError>
    where
        T: for<'de> Deserialize<'de>,
    {
        let mut request = self.http.get(url).header("Accept", "application/json");
        if let Some(id) = session_id {
            request = request.header(SESSION_HEADER, id.as_str());
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ToolError::upstream(format!("HTTP error! status: {}", status.as_u16())));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| ToolError::upstream(format!("Invalid response body: {e}")))
    }
}

/// Render a JSON scalar for display.
pub fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
