//! Transport layer for the MCP server.
//!
//! A single HTTP listener multiplexes every client session. The
//! [`SessionRouter`] decides, per request, whether to resume a session,
//! bootstrap a new one or reject the request; [`http`] maps those outcomes
//! onto HTTP.

mod config;
mod error;
pub mod http;
pub mod router;
mod service;

pub use config::HttpConfig;
pub use error::{TransportError, TransportResult};
pub use router::{RouteOutcome, SessionRouter};
pub use service::TransportService;
