//! Tools domain module.
//!
//! This module handles all tool-related functionality for the MCP server.
//! Tools are executable functions that can be called by MCP clients to perform
//! specific actions or computations.
//!
//! ## Architecture
//!
//! - `definitions/` - Individual tool implementations (one file per tool)
//! - `contract.rs` - Argument contracts read from the generated schemas
//! - `handlers.rs` - The `ToolHandler` trait every tool implements
//! - `registry.rs` - Central tool registry shared by all sessions
//! - `error.rs` - Tool-specific error types
//!
//! ## Adding a New Tool
//!
//! 1. Create a new file in `definitions/` (e.g., `my_tool.rs`)
//! 2. Derive `JsonSchema` on its parameters and implement `ToolHandler`
//! 3. Export in `definitions/mod.rs`
//! 4. Register in `ToolRegistry::with_default_tools`

pub mod contract;
pub mod definitions;
mod error;
mod handlers;
mod registry;

pub use contract::{ContractViolation, FieldKind, FieldSpec, InputContract};
pub use error::ToolError;
pub use handlers::{ToolContext, ToolHandler};
pub use registry::ToolRegistry;
