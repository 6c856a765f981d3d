//! # OpenAPI Metadata
//!
//! Annotations that expose a procedure as a REST endpoint.

use crate::schema::Schema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// HTTP methods a procedure can be mounted on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OpenApiMethod {
    /// `GET`
    Get,
    /// `POST`
    Post,
    /// `PATCH`
    Patch,
    /// `PUT`
    Put,
    /// `DELETE`
    Delete,
}

impl OpenApiMethod {
    /// Upper-case method name.
    pub fn as_str(&self) -> &'static str {
        match self {
            OpenApiMethod::Get => "GET",
            OpenApiMethod::Post => "POST",
            OpenApiMethod::Patch => "PATCH",
            OpenApiMethod::Put => "PUT",
            OpenApiMethod::Delete => "DELETE",
        }
    }

    /// Lower-case key used in an OpenAPI path item.
    pub fn path_item_key(&self) -> &'static str {
        match self {
            OpenApiMethod::Get => "get",
            OpenApiMethod::Post => "post",
            OpenApiMethod::Patch => "patch",
            OpenApiMethod::Put => "put",
            OpenApiMethod::Delete => "delete",
        }
    }

    /// `GET` and `DELETE` read their input from the URL; the rest from the body.
    pub fn accepts_request_body(&self) -> bool {
        !matches!(self, OpenApiMethod::Get | OpenApiMethod::Delete)
    }

    /// Maps an HTTP method; `None` for methods that never route to a procedure.
    pub fn from_http(method: &http::Method) -> Option<Self> {
        match *method {
            http::Method::GET => Some(OpenApiMethod::Get),
            http::Method::POST => Some(OpenApiMethod::Post),
            http::Method::PATCH => Some(OpenApiMethod::Patch),
            http::Method::PUT => Some(OpenApiMethod::Put),
            http::Method::DELETE => Some(OpenApiMethod::Delete),
            _ => None,
        }
    }
}

impl fmt::Display for OpenApiMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A documented header (request parameter or response header).
#[derive(Debug, Clone, PartialEq)]
pub struct HeaderParameter {
    /// Header name.
    pub name: String,
    /// Description.
    pub description: Option<String>,
    /// Whether the header must be present.
    pub required: bool,
    /// Value schema.
    pub schema: Schema,
}

impl HeaderParameter {
    /// A string header.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            required: false,
            schema: Schema::string(),
        }
    }

    /// Sets the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Marks the header required.
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Replaces the value schema.
    pub fn with_schema(mut self, schema: Schema) -> Self {
        self.schema = schema;
        self
    }
}

/// Request/response examples rendered into the document.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct OpenApiExample {
    /// Example input object.
    pub request: Option<Value>,
    /// Example output.
    pub response: Option<Value>,
}

/// REST exposure of a single procedure.
#[derive(Debug, Clone, PartialEq)]
pub struct OpenApiMeta {
    /// HTTP method.
    pub method: OpenApiMethod,
    /// Path template, e.g. `/users/{id}`.
    pub path: String,
    /// Disabled procedures are neither routed nor documented.
    pub enabled: bool,
    /// Operation summary.
    pub summary: Option<String>,
    /// Operation description.
    pub description: Option<String>,
    /// Operation tags.
    pub tags: Vec<String>,
    /// Adds the document's security requirements to the operation.
    pub protect: bool,
    /// Marks the operation deprecated.
    pub deprecated: bool,
    /// Request body media types. Defaults to `application/json`.
    pub content_types: Vec<String>,
    /// Documented request headers.
    pub headers: Vec<HeaderParameter>,
    /// Documented response headers.
    pub response_headers: Vec<HeaderParameter>,
    /// Examples.
    pub example: Option<OpenApiExample>,
}

impl OpenApiMeta {
    /// Creates metadata with required fields.
    pub fn new(method: OpenApiMethod, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            enabled: true,
            summary: None,
            description: None,
            tags: Vec::new(),
            protect: false,
            deprecated: false,
            content_types: vec!["application/json".to_string()],
            headers: Vec::new(),
            response_headers: Vec::new(),
            example: None,
        }
    }

    /// `GET path`
    pub fn get(path: impl Into<String>) -> Self {
        Self::new(OpenApiMethod::Get, path)
    }

    /// `POST path`
    pub fn post(path: impl Into<String>) -> Self {
        Self::new(OpenApiMethod::Post, path)
    }

    /// `PATCH path`
    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(OpenApiMethod::Patch, path)
    }

    /// `PUT path`
    pub fn put(path: impl Into<String>) -> Self {
        Self::new(OpenApiMethod::Put, path)
    }

    /// `DELETE path`
    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(OpenApiMethod::Delete, path)
    }

    /// Sets the summary.
    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = Some(summary.into());
        self
    }

    /// Sets the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Appends a tag.
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    /// Requires authentication in the document.
    pub fn protected(mut self) -> Self {
        self.protect = true;
        self
    }

    /// Marks the operation deprecated.
    pub fn deprecated(mut self) -> Self {
        self.deprecated = true;
        self
    }

    /// Hides the procedure from routing and documentation.
    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    /// Replaces the request body media types.
    pub fn with_content_types<I, S>(mut self, content_types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.content_types = content_types.into_iter().map(Into::into).collect();
        self
    }

    /// Documents a request header.
    pub fn with_header(mut self, header: HeaderParameter) -> Self {
        self.headers.push(header);
        self
    }

    /// Documents a response header.
    pub fn with_response_header(mut self, header: HeaderParameter) -> Self {
        self.response_headers.push(header);
        self
    }

    /// Sets the examples.
    pub fn with_example(mut self, request: Option<Value>, response: Option<Value>) -> Self {
        self.example = Some(OpenApiExample { request, response });
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_body_acceptance() {
        assert!(!OpenApiMethod::Get.accepts_request_body());
        assert!(!OpenApiMethod::Delete.accepts_request_body());
        assert!(OpenApiMethod::Post.accepts_request_body());
        assert!(OpenApiMethod::Patch.accepts_request_body());
        assert!(OpenApiMethod::Put.accepts_request_body());
    }

    #[test]
    fn test_from_http() {
        assert_eq!(
            OpenApiMethod::from_http(&http::Method::PATCH),
            Some(OpenApiMethod::Patch)
        );
        assert_eq!(OpenApiMethod::from_http(&http::Method::HEAD), None);
        assert_eq!(OpenApiMethod::from_http(&http::Method::OPTIONS), None);
    }

    #[test]
    fn test_meta_defaults() {
        let meta = OpenApiMeta::get("/users").with_tag("users");
        assert!(meta.enabled);
        assert_eq!(meta.content_types, vec!["application/json"]);
        assert_eq!(meta.tags, vec!["users"]);
    }
}
