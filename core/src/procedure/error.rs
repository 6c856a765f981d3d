//! # Procedure Errors
//!
//! The error taxonomy shared by procedures and the REST adapter. Every failure
//! that reaches a client is normalized into an [`RpcError`].

use crate::schema::ValidationError;
use derive_more::Display;
use http::StatusCode;
use serde::{Deserialize, Serialize};
use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;

/// Taxonomy code carried by every [`RpcError`].
///
/// Serialized as its `SCREAMING_SNAKE_CASE` name on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// The request body could not be read or parsed.
    ParseError,
    /// The input was rejected, usually by schema validation.
    BadRequest,
    /// Unexpected failure inside the server.
    InternalServerError,
    /// Missing or invalid credentials.
    Unauthorized,
    /// Authenticated but not allowed.
    Forbidden,
    /// No procedure matches the request.
    NotFound,
    /// The HTTP method is not supported by the procedure.
    MethodNotSupported,
    /// The procedure did not complete in time.
    Timeout,
    /// The request conflicts with the current state.
    Conflict,
    /// A precondition on the request was not met.
    PreconditionFailed,
    /// The request body exceeded the configured cap.
    PayloadTooLarge,
    /// The input was well-formed but semantically invalid.
    UnprocessableContent,
    /// The caller is being rate limited.
    TooManyRequests,
    /// The client went away before the response was produced.
    ClientClosedRequest,
    /// The procedure exists but is not implemented.
    NotImplemented,
}

impl ErrorCode {
    /// Returns the wire name of the code.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::ParseError => "PARSE_ERROR",
            ErrorCode::BadRequest => "BAD_REQUEST",
            ErrorCode::InternalServerError => "INTERNAL_SERVER_ERROR",
            ErrorCode::Unauthorized => "UNAUTHORIZED",
            ErrorCode::Forbidden => "FORBIDDEN",
            ErrorCode::NotFound => "NOT_FOUND",
            ErrorCode::MethodNotSupported => "METHOD_NOT_SUPPORTED",
            ErrorCode::Timeout => "TIMEOUT",
            ErrorCode::Conflict => "CONFLICT",
            ErrorCode::PreconditionFailed => "PRECONDITION_FAILED",
            ErrorCode::PayloadTooLarge => "PAYLOAD_TOO_LARGE",
            ErrorCode::UnprocessableContent => "UNPROCESSABLE_CONTENT",
            ErrorCode::TooManyRequests => "TOO_MANY_REQUESTS",
            ErrorCode::ClientClosedRequest => "CLIENT_CLOSED_REQUEST",
            ErrorCode::NotImplemented => "NOT_IMPLEMENTED",
        }
    }

    /// Default HTTP status for the code, used whenever no response-metadata
    /// hook overrides it.
    pub fn http_status(&self) -> StatusCode {
        match self {
            ErrorCode::ParseError | ErrorCode::BadRequest => StatusCode::BAD_REQUEST,
            ErrorCode::NotFound => StatusCode::NOT_FOUND,
            ErrorCode::Unauthorized => StatusCode::UNAUTHORIZED,
            ErrorCode::Forbidden => StatusCode::FORBIDDEN,
            ErrorCode::MethodNotSupported => StatusCode::METHOD_NOT_ALLOWED,
            ErrorCode::Timeout => StatusCode::REQUEST_TIMEOUT,
            ErrorCode::Conflict => StatusCode::CONFLICT,
            ErrorCode::PreconditionFailed => StatusCode::PRECONDITION_FAILED,
            ErrorCode::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            ErrorCode::UnprocessableContent => StatusCode::UNPROCESSABLE_ENTITY,
            ErrorCode::TooManyRequests => StatusCode::TOO_MANY_REQUESTS,
            // 499 is a registered-by-convention code; `from_u16` only rejects values outside 100..=999.
            ErrorCode::ClientClosedRequest => {
                StatusCode::from_u16(499).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
            }
            ErrorCode::NotImplemented => StatusCode::NOT_IMPLEMENTED,
            ErrorCode::InternalServerError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Shared, downcastable error cause.
pub type ErrorCause = Arc<dyn StdError + Send + Sync + 'static>;

/// The normalized error record produced by procedures and the adapter.
#[derive(Debug, Clone, Display)]
#[display("{code}: {message}")]
pub struct RpcError {
    code: ErrorCode,
    message: String,
    cause: Option<ErrorCause>,
}

impl RpcError {
    /// Creates an error with a code and message.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            cause: None,
        }
    }

    /// Attaches the underlying cause.
    pub fn with_cause(mut self, cause: impl StdError + Send + Sync + 'static) -> Self {
        self.cause = Some(Arc::new(cause));
        self
    }

    /// `NOT_FOUND` with the given message.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::NotFound, message)
    }

    /// `BAD_REQUEST` with the given message.
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::BadRequest, message)
    }

    /// `UNAUTHORIZED` with the given message.
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Unauthorized, message)
    }

    /// `FORBIDDEN` with the given message.
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Forbidden, message)
    }

    /// `CONFLICT` with the given message.
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Conflict, message)
    }

    /// `INTERNAL_SERVER_ERROR` with the given message.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalServerError, message)
    }

    /// Normalizes a foreign error into `INTERNAL_SERVER_ERROR`, keeping its
    /// message and the error itself as cause.
    pub fn from_unknown(err: impl StdError + Send + Sync + 'static) -> Self {
        Self::internal(err.to_string()).with_cause(err)
    }

    /// Taxonomy code.
    pub fn code(&self) -> ErrorCode {
        self.code
    }

    /// Human message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Underlying cause, if any.
    pub fn cause(&self) -> Option<&(dyn StdError + Send + Sync + 'static)> {
        self.cause.as_deref()
    }

    /// The schema validation failure behind this error.
    ///
    /// Only `BAD_REQUEST` errors whose cause is a [`ValidationError`] qualify.
    pub fn validation_error(&self) -> Option<&ValidationError> {
        if self.code != ErrorCode::BadRequest {
            return None;
        }
        self.cause()?.downcast_ref::<ValidationError>()
    }
}

impl StdError for RpcError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.cause
            .as_deref()
            .map(|cause| cause as &(dyn StdError + 'static))
    }
}

impl From<ValidationError> for RpcError {
    fn from(err: ValidationError) -> Self {
        Self::bad_request(err.to_string()).with_cause(err)
    }
}
