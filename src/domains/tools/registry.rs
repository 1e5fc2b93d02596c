//! Tool Registry - central registration and lookup for all tools.
//!
//! The registry is built once at startup and shared (read-only) by every
//! session's protocol engine.

use std::collections::BTreeMap;
use std::sync::Arc;

use rmcp::model::Tool;
use tracing::{debug, info};

use super::definitions::{CalculatorTool, CheckTokopediaLoginTool, ScrapeTokopediaTool, ScraperClient};
use super::error::ToolError;
use super::handlers::ToolHandler;
use crate::core::config::Config;

// ============================================================================
// Tool Registry
// ============================================================================

/// Tool registry - maps unique tool names to their handlers.
#[derive(Default)]
pub struct ToolRegistry {
    tools: BTreeMap<String, Arc<dyn ToolHandler>>,
}

impl ToolRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry with every built-in tool.
    pub fn with_default_tools(config: &Config) -> Result<Self, ToolError> {
        let scraper = Arc::new(ScraperClient::new(&config.scraper)?);

        let mut registry = Self::new();
        registry.register(CalculatorTool::new())?;
        registry.register(ScrapeTokopediaTool::new(scraper.clone()))?;
        registry.register(CheckTokopediaLoginTool::new(scraper))?;

        info!(tools = ?registry.tool_names(), "Tools registered");
        Ok(registry)
    }

    /// Register a tool. Names must be unique.
    pub fn register<T>(&mut self, tool: T) -> Result<(), ToolError>
    where
        T: ToolHandler + 'static,
    {
        let name = tool.name().to_string();
        if self.tools.contains_key(&name) {
            return Err(ToolError::DuplicateName(name));
        }
        debug!(tool = %name, "Registering tool");
        self.tools.insert(name, Arc::new(tool));
        Ok(())
    }

    /// Look up a tool by name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn ToolHandler>> {
        self.tools.get(name).cloned()
    }

    /// Get all tool names, sorted.
    pub fn tool_names(&self) -> Vec<&str> {
        self.tools.keys().map(String::as_str).collect()
    }

    /// Get all tools as Tool models (metadata).
    pub fn list_tools(&self) -> Vec<Tool> {
        self.tools.values().map(|t| t.to_tool()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_tool_names() {
        let registry = ToolRegistry::with_default_tools(&Config::default()).unwrap();
        let names = registry.tool_names();
        assert_eq!(names, vec!["calculator", "check_tokopedia_login", "scrape_tokopedia"]);
    }

    #[test]
    fn test_registry_rejects_duplicates() {
        let mut registry = ToolRegistry::new();
        registry.register(CalculatorTool::new()).unwrap();
        let err = registry.register(CalculatorTool::new()).unwrap_err();
        assert!(matches!(err, ToolError::DuplicateName(name) if name == "calculator"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_registry_lookup_unknown() {
        let registry = ToolRegistry::new();
        assert!(registry.is_empty());
        assert!(registry.get("unknown").is_none());
    }

    #[test]
    fn test_list_tools_carries_schema() {
        let mut registry = ToolRegistry::new();
        registry.register(CalculatorTool::new()).unwrap();
        let tools = registry.list_tools();
        assert_eq!(tools.len(), 1);
        assert_eq!(tools[0].name, "calculator");
        assert!(tools[0].input_schema.contains_key("properties"));
    }
}
