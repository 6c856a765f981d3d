//! # Server Configuration
//!
//! Resolved from `RPC_REST_*` environment variables.

use rpc_rest_core::{AppError, AppResult, HandlerConfig};

/// Bind address used when `RPC_REST_BIND` is unset.
pub const DEFAULT_BIND: &str = "127.0.0.1:8080";

/// Everything the server binary needs to start.
#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    /// `host:port` to listen on.
    pub bind: String,
    /// Adapter settings.
    pub handler: HandlerConfig,
    /// Start and immediately stop.
    pub oneshot: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: DEFAULT_BIND.to_string(),
            handler: HandlerConfig::default(),
            oneshot: false,
        }
    }
}

impl ServerConfig {
    /// Reads the process environment.
    pub fn from_env() -> AppResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads settings through `lookup`, which returns the value of a variable.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> AppResult<Self> {
        let mut config = Self::default();

        if let Some(bind) = lookup("RPC_REST_BIND") {
            config.bind = bind;
        }
        if let Some(endpoint) = lookup("RPC_REST_ENDPOINT") {
            config.handler = config.handler.with_endpoint(endpoint);
        }
        if let Some(raw) = lookup("RPC_REST_MAX_BODY") {
            let max = raw.trim().parse::<usize>().map_err(|e| {
                AppError::Config(format!("RPC_REST_MAX_BODY must be a byte count: {}", e))
            })?;
            config.handler = config.handler.with_max_body_size(max);
        }
        config.oneshot = lookup("RPC_REST_ONESHOT").is_some();

        Ok(config)
    }

    /// Base URL advertised in the generated document.
    pub fn base_url(&self) -> String {
        format!(
            "http://{}{}",
            self.bind,
            self.handler.endpoint.as_deref().unwrap_or("")
        )
    }
}
