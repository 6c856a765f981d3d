//! # Responses
//!
//! Wire shapes produced by the handler.

use crate::procedure::ErrorCode;
use crate::schema::Issue;
use bytes::Bytes;
use http::header::CONTENT_TYPE;
use http::{HeaderMap, HeaderValue, StatusCode};
use serde::{Deserialize, Serialize};

/// The response produced by the handler.
pub type OpenApiResponse = http::Response<Bytes>;

/// Message used when neither a formatter nor the error supplies one.
pub const FALLBACK_MESSAGE: &str = "An error occurred";

/// Message used for schema validation failures.
pub const VALIDATION_MESSAGE: &str = "Input validation failed";

/// JSON body of every error response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Display message.
    pub message: String,
    /// Taxonomy code.
    pub code: ErrorCode,
    /// Validation issues; only for schema validation failures.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issues: Option<Vec<Issue>>,
}

/// `204 No Content` with an empty body.
pub fn no_content() -> OpenApiResponse {
    let mut res = OpenApiResponse::new(Bytes::new());
    *res.status_mut() = StatusCode::NO_CONTENT;
    res
}

/// A JSON response; `content-type` is forced to `application/json`.
pub fn json_response(status: StatusCode, mut headers: HeaderMap, body: Bytes) -> OpenApiResponse {
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    let mut res = OpenApiResponse::new(body);
    *res.status_mut() = status;
    *res.headers_mut() = headers;
    res
}

/// The last-resort `500` used when shaping itself failed.
pub fn internal_error_fallback() -> OpenApiResponse {
    json_response(
        StatusCode::INTERNAL_SERVER_ERROR,
        HeaderMap::new(),
        Bytes::from_static(br#"{"message":"An error occurred","code":"INTERNAL_SERVER_ERROR"}"#),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_error_body_omits_missing_issues() {
        let body = ErrorBody {
            message: "Not found".into(),
            code: ErrorCode::NotFound,
            issues: None,
        };
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            json!({"message": "Not found", "code": "NOT_FOUND"})
        );
    }

    #[test]
    fn test_json_response_forces_content_type() {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("text/html"));
        headers.insert("x-extra", HeaderValue::from_static("1"));
        let res = json_response(StatusCode::CREATED, headers, Bytes::from_static(b"{}"));
        assert_eq!(res.status(), StatusCode::CREATED);
        assert_eq!(res.headers()[CONTENT_TYPE], "application/json");
        assert_eq!(res.headers()["x-extra"], "1");
    }

    #[test]
    fn test_fallback_body_is_valid_error_body() {
        let res = internal_error_fallback();
        let body: ErrorBody = serde_json::from_slice(res.body()).unwrap();
        assert_eq!(body.code, ErrorCode::InternalServerError);
        assert_eq!(body.message, FALLBACK_MESSAGE);
    }
}
