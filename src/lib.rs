//! Tokopedia MCP Server Library
//!
//! A Model Context Protocol (MCP) server that multiplexes many client
//! sessions over one HTTP listener. Each session owns its own protocol
//! engine; tools are shared.
//!
//! # Architecture
//!
//! - **core**: configuration, errors, the JSON-RPC envelope, sessions and
//!   the HTTP transport
//! - **domains**: business logic organized by bounded contexts
//!   - **tools**: the calculator and the Tokopedia scraping tools
//!
//! # Example
//!
//! ```rust,no_run
//! use tokopedia_mcp_server::core::{Config, McpServer, TransportService};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::from_env();
//!     let server = McpServer::new(config.clone())?;
//!     TransportService::new(config.transport).run(server).await?;
//!     Ok(())
//! }
//! ```

pub mod core;
pub mod domains;

// Re-export commonly used types for convenience
pub use core::{Config, Error, McpServer, Result};
