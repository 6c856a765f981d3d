#![deny(missing_docs)]

//! # CLI Errors
//!
//! Error types for the CLI crate.

use derive_more::{Display, From};
use rpc_rest_core::AppError;

/// Main error enum for CLI operations.
#[derive(Debug, Display, From)]
pub enum CliError {
    /// IO Error wrapper.
    #[display("IO Error: {}", _0)]
    Io(std::io::Error),

    /// Router or document generation failure.
    #[display("{}", _0)]
    App(AppError),

    /// JSON rendering failure.
    #[display("JSON Error: {}", _0)]
    Json(serde_json::Error),

    /// YAML rendering failure.
    #[display("YAML Error: {}", _0)]
    Yaml(serde_yaml::Error),

    /// General failure message.
    #[display("Operation failed: {}", _0)]
    General(String),
}

/// `General(String)` has no `source()`, so the trait is implemented by hand.
impl std::error::Error for CliError {}

/// Result type alias.
pub type CliResult<T> = Result<T, CliError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_error_is_displayed_verbatim() {
        let err = CliError::from(AppError::Config("[query.a] - bad".to_string()));
        assert_eq!(
            err.to_string(),
            "Configuration Error: [query.a] - bad"
        );
    }
}
