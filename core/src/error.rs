//! # Error Handling
//!
//! Provides the `AppError` enum used for configuration and document generation
//! failures across the workspace. Per-request failures travel as
//! [`RpcError`](crate::procedure::RpcError) instead.

use crate::procedure::ProcedureKind;
use derive_more::{Display, From};
use std::fmt;

/// The Global Error Enum.
///
/// Note: String errors default to `General`.
#[derive(Debug, Display, From)]
pub enum AppError {
    /// Wrapper for standard IO errors.
    #[display("IO Error: {_0}")]
    Io(std::io::Error),

    /// Wrapper for JSON (de)serialization errors.
    #[display("JSON Error: {_0}")]
    Json(serde_json::Error),

    /// A procedure or route declaration that cannot be exposed over REST.
    /// Must be created explicitly.
    #[from(ignore)]
    #[display("Configuration Error: {_0}")]
    Config(String),

    /// Generic errors.
    #[display("General Error: {_0}")]
    General(String),
}

impl AppError {
    /// A configuration error attributed to a procedure, rendered as
    /// `[<kind>.<path>] - <reason>`.
    pub fn procedure(kind: ProcedureKind, path: &str, reason: impl fmt::Display) -> Self {
        AppError::Config(format!("[{}.{}] - {}", kind, path, reason))
    }
}

/// Manual implementation of the standard Error trait.
impl std::error::Error for AppError {}

/// Helper type alias for Result using AppError.
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_string_conversion() {
        let msg = String::from("something wrong");
        let app_err: AppError = msg.into();
        match app_err {
            AppError::General(s) => assert_eq!(s, "something wrong"),
            _ => panic!("String should convert to AppError::General"),
        }
    }

    #[test]
    fn test_json_conversion() {
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let app_err: AppError = json_err.into();
        assert!(matches!(app_err, AppError::Json(_)));
    }

    #[test]
    fn test_config_manual_creation() {
        let app_err = AppError::Config("duplicate route".into());
        assert_eq!(format!("{}", app_err), "Configuration Error: duplicate route");
    }

    #[test]
    fn test_procedure_error_format() {
        let app_err = AppError::procedure(ProcedureKind::Mutation, "users.create", "bad input");
        assert_eq!(
            app_err.to_string(),
            "Configuration Error: [mutation.users.create] - bad input"
        );
    }
}
