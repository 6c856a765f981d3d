//! # Requests
//!
//! The transport-neutral request seen by the adapter.

use super::body::RequestBody;
use http::header::CONTENT_TYPE;
use http::{HeaderMap, Method, Uri};
use url::form_urlencoded;

/// Method, URI and headers of an inbound request.
#[derive(Debug, Clone)]
pub struct RequestHead {
    /// HTTP method.
    pub method: Method,
    /// Request target (path and query).
    pub uri: Uri,
    /// Request headers.
    pub headers: HeaderMap,
}

impl RequestHead {
    /// A head without headers.
    pub fn new(method: Method, uri: Uri) -> Self {
        Self {
            method,
            uri,
            headers: HeaderMap::new(),
        }
    }

    /// Request path, without the query string.
    pub fn path(&self) -> &str {
        self.uri.path()
    }

    /// The `content-type` media type, lower-cased and without parameters.
    pub fn media_type(&self) -> Option<String> {
        let raw = self.headers.get(CONTENT_TYPE)?.to_str().ok()?;
        let essence = raw.split(';').next().unwrap_or_default().trim();
        if essence.is_empty() {
            None
        } else {
            Some(essence.to_ascii_lowercase())
        }
    }

    /// Decoded query pairs in order of appearance, repeats included.
    pub fn query_pairs(&self) -> Vec<(String, String)> {
        self.uri
            .query()
            .map(|query| {
                form_urlencoded::parse(query.as_bytes())
                    .into_owned()
                    .collect()
            })
            .unwrap_or_default()
    }
}

impl From<http::request::Parts> for RequestHead {
    fn from(parts: http::request::Parts) -> Self {
        Self {
            method: parts.method,
            uri: parts.uri,
            headers: parts.headers,
        }
    }
}

/// A request handed to [`OpenApiHandler::handle`](super::OpenApiHandler::handle).
#[derive(Debug)]
pub struct OpenApiRequest {
    /// Method, URI and headers.
    pub head: RequestHead,
    /// Unread body.
    pub body: RequestBody,
}

impl OpenApiRequest {
    /// Pairs a head with a body.
    pub fn new(head: RequestHead, body: impl Into<RequestBody>) -> Self {
        Self {
            head,
            body: body.into(),
        }
    }
}

impl<B: Into<RequestBody>> From<http::Request<B>> for OpenApiRequest {
    fn from(req: http::Request<B>) -> Self {
        let (parts, body) = req.into_parts();
        Self::new(parts.into(), body)
    }
}
