//! # Adapter Configuration
//!
//! Settings shared by every transport binding of the REST adapter.

use serde::{Deserialize, Serialize};

/// Default cap on request body size, in bytes.
pub const DEFAULT_MAX_BODY_SIZE: usize = 100_000;

/// Configuration for an [`OpenApiHandler`](crate::adapter::OpenApiHandler).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HandlerConfig {
    /// Prefix stripped from request paths before lookup, e.g. `/api`.
    pub endpoint: Option<String>,
    /// Maximum number of body bytes read per request.
    pub max_body_size: usize,
}

impl Default for HandlerConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            max_body_size: DEFAULT_MAX_BODY_SIZE,
        }
    }
}

impl HandlerConfig {
    /// Sets the endpoint prefix. Empty and `/` mean no prefix.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        let endpoint = endpoint.into();
        let trimmed = endpoint.trim_matches('/');
        self.endpoint = if trimmed.is_empty() {
            None
        } else {
            Some(format!("/{}", trimmed))
        };
        self
    }

    /// Sets the body size cap.
    pub fn with_max_body_size(mut self, max_body_size: usize) -> Self {
        self.max_body_size = max_body_size;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = HandlerConfig::default();
        assert_eq!(config.endpoint, None);
        assert_eq!(config.max_body_size, 100_000);
    }

    #[test]
    fn test_deserialize_partial() {
        let config: HandlerConfig = serde_json::from_str(r#"{"endpoint":"/api"}"#).unwrap();
        assert_eq!(config.endpoint.as_deref(), Some("/api"));
        assert_eq!(config.max_body_size, DEFAULT_MAX_BODY_SIZE);
    }

    #[test]
    fn test_endpoint_is_normalized() {
        assert_eq!(
            HandlerConfig::default().with_endpoint("api/v1/").endpoint.as_deref(),
            Some("/api/v1")
        );
        assert_eq!(HandlerConfig::default().with_endpoint("/").endpoint, None);
    }
}
