//! Configuration management for the MCP server.
//!
//! This module provides a centralized configuration structure that can be
//! populated from environment variables, a `.env` file, or defaults.

use super::transport::HttpConfig;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{info, warn};

/// Main configuration structure for the MCP server.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Server identification and metadata.
    pub server: ServerConfig,

    /// Logging configuration.
    pub logging: LoggingConfig,

    /// HTTP transport configuration.
    pub transport: HttpConfig,

    /// Session lifecycle configuration.
    pub sessions: SessionsConfig,

    /// Scraping backend configuration.
    pub scraper: ScraperConfig,
}

/// Server identification configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// The name of the server as reported to clients.
    pub name: String,

    /// The version of the server.
    pub version: String,

    /// Instructions sent to clients in the initialize result.
    pub instructions: String,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "trace").
    pub level: String,

    /// Log every inbound HTTP request at info level.
    pub log_requests: bool,
}

/// Session lifecycle configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionsConfig {
    /// Evict sessions idle for longer than this many seconds.
    /// `None` keeps sessions until they are explicitly closed.
    pub idle_timeout_secs: Option<u64>,

    /// How often the idle sweep runs.
    pub sweep_interval_secs: u64,
}

/// Scraping backend configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScraperConfig {
    /// Base URL of the scraping service.
    pub base_url: String,

    /// Per-request timeout for backend calls.
    pub timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            name: "tokopedia-mcp-server".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            instructions: "This server provides a calculator and Tokopedia product scraping tools."
                .to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            log_requests: false,
        }
    }
}

impl Default for SessionsConfig {
    fn default() -> Self {
        Self {
            idle_timeout_secs: None,
            sweep_interval_secs: 60,
        }
    }
}

impl SessionsConfig {
    /// Idle timeout as a duration, when the sweep is enabled.
    pub fn idle_timeout(&self) -> Option<Duration> {
        self.idle_timeout_secs.map(Duration::from_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs.max(1))
    }
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:4004".to_string(),
            timeout_secs: 30,
        }
    }
}

impl Config {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from environment variables.
    ///
    /// Environment variables are expected to be prefixed with `MCP_`.
    /// For example: `MCP_SERVER_NAME`, `MCP_LOG_LEVEL`.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let mut config = Self::default();

        if let Ok(name) = std::env::var("MCP_SERVER_NAME") {
            config.server.name = name;
        }

        if let Ok(version) = std::env::var("MCP_SERVER_VERSION") {
            config.server.version = version;
        }

        if let Ok(level) = std::env::var("MCP_LOG_LEVEL") {
            config.logging.level = level;
        }

        if let Ok(flag) = std::env::var("MCP_LOG_REQUESTS") {
            config.logging.log_requests = parse_flag(&flag);
        }

        // Load transport configuration from environment
        config.transport = HttpConfig::from_env();

        if let Some(secs) = env_u64("MCP_SESSION_IDLE_TIMEOUT_SECS") {
            config.sessions.idle_timeout_secs = Some(secs);
            info!("Idle session sweep enabled: {}s", secs);
        }

        if let Some(secs) = env_u64("MCP_SESSION_SWEEP_INTERVAL_SECS") {
            config.sessions.sweep_interval_secs = secs;
        }

        if let Ok(base_url) = std::env::var("MCP_SCRAPER_BASE_URL") {
            config.scraper.base_url = base_url;
        } else {
            warn!(
                "MCP_SCRAPER_BASE_URL not set - using default scraper backend at {}",
                config.scraper.base_url
            );
        }

        if let Some(secs) = env_u64("MCP_SCRAPER_TIMEOUT_SECS") {
            config.scraper.timeout_secs = secs;
        }

        config
    }
}

/// Read a numeric environment variable, ignoring unparseable values.
pub(crate) fn env_u64(key: &str) -> Option<u64> {
    let raw = std::env::var(key).ok()?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!("Ignoring {}={:?}: not a non-negative integer", key, raw);
            None
        }
    }
}

/// `false`/`0` disable, anything else enables.
pub(crate) fn parse_flag(value: &str) -> bool {
    let value = value.trim().to_lowercase();
    value != "false" && value != "0"
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::Mutex;

    // Mutex to ensure env var tests run serially
    pub(crate) static ENV_TEST_LOCK: Mutex<()> = Mutex::new(());

    const VARS: &[&str] = &[
        "MCP_SERVER_NAME",
        "MCP_SESSION_IDLE_TIMEOUT_SECS",
        "MCP_SCRAPER_BASE_URL",
        "MCP_SCRAPER_TIMEOUT_SECS",
    ];

    fn clear_vars() {
        for var in VARS {
            unsafe {
                std::env::remove_var(var);
            }
        }
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.server.name, "tokopedia-mcp-server");
        assert_eq!(config.scraper.base_url, "http://localhost:4004");
        assert!(config.sessions.idle_timeout().is_none());
        assert_eq!(config.transport.rpc_path, "/mcp");
    }

    #[test]
    fn test_overrides_from_env() {
        let _lock = ENV_TEST_LOCK.lock().unwrap();
        clear_vars();
        unsafe {
            std::env::set_var("MCP_SERVER_NAME", "custom");
            std::env::set_var("MCP_SESSION_IDLE_TIMEOUT_SECS", "900");
            std::env::set_var("MCP_SCRAPER_BASE_URL", "http://scraper:4004");
        }
        let config = Config::from_env();
        assert_eq!(config.server.name, "custom");
        assert_eq!(config.sessions.idle_timeout(), Some(Duration::from_secs(900)));
        assert_eq!(config.scraper.base_url, "http://scraper:4004");
        clear_vars();
    }

    #[test]
    fn test_invalid_number_is_ignored() {
        let _lock = ENV_TEST_LOCK.lock().unwrap();
        clear_vars();
        unsafe {
            std::env::set_var("MCP_SCRAPER_TIMEOUT_SECS", "soon");
        }
        let config = Config::from_env();
        assert_eq!(config.scraper.timeout_secs, 30);
        clear_vars();
    }

    #[test]
    fn test_parse_flag() {
        assert!(parse_flag("true"));
        assert!(parse_flag("1"));
        assert!(!parse_flag("FALSE"));
        assert!(!parse_flag("0"));
    }
}
