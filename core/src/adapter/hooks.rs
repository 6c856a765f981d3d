//! # Hooks
//!
//! Collaborators injected into the handler:
//! - **ContextFactory**: builds the per-request context, may set response headers.
//! - **ResponseMetaHook**: overrides status and headers of a response.
//! - **OnErrorHook**: observes failed requests.

use super::request::RequestHead;
use crate::procedure::{ProcedureKind, RpcError};
use async_trait::async_trait;
use http::{HeaderMap, StatusCode};
use serde_json::Value;
use std::sync::Arc;

/// Creates the request-scoped context, exactly once per routed request.
#[async_trait]
pub trait ContextFactory<Ctx: Send + 'static>: Send + Sync {
    /// Builds the context. Headers written to `response_headers` are sent on
    /// success and on failure.
    async fn create_context(
        &self,
        head: &RequestHead,
        response_headers: &mut HeaderMap,
    ) -> Result<Ctx, RpcError>;
}

#[async_trait]
impl<Ctx, F> ContextFactory<Ctx> for F
where
    Ctx: Send + 'static,
    F: Fn(&RequestHead, &mut HeaderMap) -> Result<Ctx, RpcError> + Send + Sync,
{
    async fn create_context(
        &self,
        head: &RequestHead,
        response_headers: &mut HeaderMap,
    ) -> Result<Ctx, RpcError> {
        self(head, response_headers)
    }
}

/// What the response-metadata hook sees.
#[derive(Debug)]
pub struct ResponseMetaInput<'a, Ctx> {
    /// Kind of the resolved procedure, if any.
    pub kind: Option<ProcedureKind>,
    /// Dotted path of the resolved procedure; empty when none resolved.
    pub paths: Vec<&'a str>,
    /// Context, when it was created.
    pub ctx: Option<&'a Ctx>,
    /// Procedure output on success.
    pub data: Option<&'a Value>,
    /// The error on failure.
    pub errors: &'a [RpcError],
}

/// Status and header overrides returned by the response-metadata hook.
#[derive(Debug, Clone, Default)]
pub struct ResponseMeta {
    /// Replaces the default status.
    pub status: Option<StatusCode>,
    /// Added on top of the context factory's headers.
    pub headers: HeaderMap,
}

impl ResponseMeta {
    /// Overrides the status.
    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = Some(status);
        self
    }

    /// Adds a header.
    pub fn with_header(mut self, name: http::HeaderName, value: http::HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }
}

/// Response-metadata hook.
pub type ResponseMetaHook<Ctx> =
    Arc<dyn for<'a> Fn(ResponseMetaInput<'a, Ctx>) -> Option<ResponseMeta> + Send + Sync>;

/// What the error hook sees.
#[derive(Debug)]
pub struct OnErrorInput<'a, Ctx> {
    /// The normalized error.
    pub error: &'a RpcError,
    /// Kind of the resolved procedure, if any.
    pub kind: Option<ProcedureKind>,
    /// Dotted path of the resolved procedure, if any.
    pub path: Option<&'a str>,
    /// Input as far as it was built.
    pub input: Option<&'a Value>,
    /// Context, when it was created.
    pub ctx: Option<&'a Ctx>,
    /// The request.
    pub req: &'a RequestHead,
}

/// Error observer. Its outcome never affects the response.
pub type OnErrorHook<Ctx> = Arc<dyn for<'a> Fn(OnErrorInput<'a, Ctx>) + Send + Sync>;
