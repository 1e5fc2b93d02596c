//! Transport service - owns the listener configuration and runs the server.

use tracing::info;

use super::config::HttpConfig;
use super::http::HttpTransport;
use crate::core::{McpServer, Result};

/// Transport service - manages the transport layer for the MCP server.
pub struct TransportService {
    config: HttpConfig,
}

impl TransportService {
    /// Create a new transport service with the given configuration.
    pub fn new(config: HttpConfig) -> Self {
        Self { config }
    }

    /// Create a transport service from environment variables.
    pub fn from_env() -> Self {
        Self::new(HttpConfig::from_env())
    }

    /// Get the transport configuration.
    pub fn config(&self) -> &HttpConfig {
        &self.config
    }

    /// Start the transport with the given MCP server.
    ///
    /// This method blocks until the transport is shut down.
    pub async fn run(self, server: McpServer) -> Result<()> {
        info!("Starting transport: {}", self.config.description());
        HttpTransport::new(self.config).run(server).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Config, Error};
    use crate::core::transport::TransportError;

    #[tokio::test]
    async fn test_port_in_use_is_transport_error() {
        let taken = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = taken.local_addr().unwrap().port();
        let config = HttpConfig {
            host: "127.0.0.1".to_string(),
            port,
            ..HttpConfig::default()
        };

        let server = McpServer::new(Config::default()).unwrap();
        let err = TransportService::new(config).run(server).await.unwrap_err();
        assert!(matches!(
            err,
            Error::Transport(TransportError::BindError { .. })
        ));
        assert!(err.to_string().contains(&format!("127.0.0.1:{port}")));
    }
}
