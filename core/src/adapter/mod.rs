#![deny(missing_docs)]

//! # REST Adapter
//!
//! Serves procedures as REST endpoints:
//!
//! - **path**: route templates and path normalization.
//! - **index**: the `(method, path) -> procedure` table.
//! - **request** / **body**: the transport-neutral request.
//! - **input**: merges path, query and body into the procedure input.
//! - **hooks**: context factory, response metadata and error observer.
//! - **response**: wire shapes of success and error responses.
//!
//! [`OpenApiHandler::handle`] runs the pipeline
//! resolve -> build input -> create context -> invoke -> shape.

pub mod body;
pub mod hooks;
pub mod index;
pub mod input;
pub mod path;
pub mod request;
pub mod response;

pub use body::{BodyContent, BodyReadError, BodyStream, RequestBody};
pub use hooks::{
    ContextFactory, OnErrorHook, OnErrorInput, ResponseMeta, ResponseMetaHook, ResponseMetaInput,
};
pub use index::{IndexEntry, ProcedureIndex, Resolved};
pub use input::build_input;
pub use path::{normalize_path, PathInput, PathPattern};
pub use request::{OpenApiRequest, RequestHead};
pub use response::{ErrorBody, OpenApiResponse};

use crate::config::HandlerConfig;
use crate::error::{AppError, AppResult};
use crate::procedure::{format_error, ErrorFormatter, ProcedureKind, Router, RpcError};
use bytes::Bytes;
use http::{HeaderMap, Method, StatusCode};
use response::{internal_error_fallback, json_response, no_content};
use serde_json::Value;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

/// Serves the procedures of a router over HTTP.
///
/// Built once; `handle` only reads shared state and can be called concurrently.
pub struct OpenApiHandler<Ctx: Send + 'static> {
    index: ProcedureIndex<Ctx>,
    config: HandlerConfig,
    create_context: Arc<dyn ContextFactory<Ctx>>,
    response_meta: Option<ResponseMetaHook<Ctx>>,
    on_error: Option<OnErrorHook<Ctx>>,
    error_formatter: Option<ErrorFormatter<Ctx>>,
}

impl<Ctx: Send + 'static> fmt::Debug for OpenApiHandler<Ctx> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenApiHandler")
            .field("index", &self.index)
            .field("config", &self.config)
            .field("response_meta", &self.response_meta.is_some())
            .field("on_error", &self.on_error.is_some())
            .finish_non_exhaustive()
    }
}

/// Builder for [`OpenApiHandler`].
pub struct OpenApiHandlerBuilder<Ctx: Send + 'static> {
    config: HandlerConfig,
    create_context: Option<Arc<dyn ContextFactory<Ctx>>>,
    response_meta: Option<ResponseMetaHook<Ctx>>,
    on_error: Option<OnErrorHook<Ctx>>,
}

impl<Ctx: Send + 'static> fmt::Debug for OpenApiHandlerBuilder<Ctx> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenApiHandlerBuilder")
            .field("config", &self.config)
            .field("create_context", &self.create_context.is_some())
            .finish_non_exhaustive()
    }
}

impl<Ctx: Send + 'static> Default for OpenApiHandlerBuilder<Ctx> {
    fn default() -> Self {
        Self {
            config: HandlerConfig::default(),
            create_context: None,
            response_meta: None,
            on_error: None,
        }
    }
}

impl<Ctx: Send + 'static> OpenApiHandlerBuilder<Ctx> {
    /// Replaces the whole configuration.
    pub fn config(mut self, config: HandlerConfig) -> Self {
        self.config = config;
        self
    }

    /// Mounts the handler under a path prefix.
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.config = self.config.with_endpoint(endpoint);
        self
    }

    /// Caps the request body size.
    pub fn max_body_size(mut self, max_body_size: usize) -> Self {
        self.config = self.config.with_max_body_size(max_body_size);
        self
    }

    /// Installs the context factory.
    pub fn create_context(mut self, factory: impl ContextFactory<Ctx> + 'static) -> Self {
        self.create_context = Some(Arc::new(factory));
        self
    }

    /// Uses `Ctx::default()` as the context of every request.
    pub fn default_context(self) -> Self
    where
        Ctx: Default,
    {
        self.create_context(|_: &RequestHead, _: &mut HeaderMap| Ok::<_, RpcError>(Ctx::default()))
    }

    /// Installs the response-metadata hook.
    pub fn response_meta<F>(mut self, hook: F) -> Self
    where
        F: for<'a> Fn(ResponseMetaInput<'a, Ctx>) -> Option<ResponseMeta> + Send + Sync + 'static,
    {
        self.response_meta = Some(Arc::new(hook));
        self
    }

    /// Installs the error observer.
    pub fn on_error<F>(mut self, hook: F) -> Self
    where
        F: for<'a> Fn(OnErrorInput<'a, Ctx>) + Send + Sync + 'static,
    {
        self.on_error = Some(Arc::new(hook));
        self
    }

    /// Indexes `router` and finishes the handler.
    pub fn build(self, router: &Router<Ctx>) -> AppResult<OpenApiHandler<Ctx>> {
        let create_context = self.create_context.ok_or_else(|| {
            AppError::Config("A context factory is required (see `default_context`)".into())
        })?;
        let mut config = self.config;
        if let Some(endpoint) = config.endpoint.take() {
            config = config.with_endpoint(endpoint);
        }
        let index = ProcedureIndex::build(router)?;
        tracing::info!(
            procedures = index.len(),
            endpoint = config.endpoint.as_deref().unwrap_or("/"),
            "REST handler ready"
        );
        Ok(OpenApiHandler {
            index,
            config,
            create_context,
            response_meta: self.response_meta,
            on_error: self.on_error,
            error_formatter: router.error_formatter().cloned(),
        })
    }
}

/// Everything computed so far for one request.
struct RequestState<'a, Ctx> {
    entry: Option<&'a IndexEntry<Ctx>>,
    input: Option<Value>,
    ctx: Option<Ctx>,
    headers: HeaderMap,
}

impl<Ctx> RequestState<'_, Ctx> {
    fn kind(&self) -> Option<ProcedureKind> {
        self.entry.map(|entry| entry.procedure().kind())
    }

    fn path(&self) -> Option<&str> {
        self.entry.map(|entry| entry.path())
    }
}

impl<Ctx: Clone + Send + 'static> OpenApiHandler<Ctx> {
    /// Starts a builder.
    pub fn builder() -> OpenApiHandlerBuilder<Ctx> {
        OpenApiHandlerBuilder::default()
    }

    /// The routing table.
    pub fn index(&self) -> &ProcedureIndex<Ctx> {
        &self.index
    }

    /// The effective configuration.
    pub fn config(&self) -> &HandlerConfig {
        &self.config
    }

    /// Serves one request. Never fails: every error becomes a JSON error response.
    pub async fn handle(&self, req: OpenApiRequest) -> OpenApiResponse {
        let OpenApiRequest { head, body } = req;
        if head.method == Method::HEAD {
            return no_content();
        }

        let mut state = RequestState {
            entry: None,
            input: None,
            ctx: None,
            headers: HeaderMap::new(),
        };
        match self.run(&head, body, &mut state).await {
            Ok(data) => self.respond(&head, state, data),
            Err(error) => self.respond_error(error, &head, state),
        }
    }

    async fn run<'a>(
        &'a self,
        head: &RequestHead,
        body: RequestBody,
        state: &mut RequestState<'a, Ctx>,
    ) -> Result<Value, RpcError> {
        let normalized = normalize_path(head.path());
        let resolved = self
            .route_path(&normalized)
            .and_then(|path| self.index.lookup(&head.method, path))
            .ok_or_else(|| RpcError::not_found("Not found"))?;
        let entry = resolved.entry;
        state.entry = Some(entry);
        tracing::debug!(
            procedure = entry.path(),
            method = %head.method,
            path = %normalized,
            "resolved procedure"
        );

        state.input = build_input(
            entry.input_schema(),
            entry.method(),
            &resolved.path_input,
            head,
            body,
            self.config.max_body_size,
        )
        .await?;
        tracing::debug!(procedure = entry.path(), has_input = state.input.is_some(), "built input");

        let ctx = self
            .create_context
            .create_context(head, &mut state.headers)
            .await?;
        state.ctx = Some(ctx.clone());

        entry.call(ctx, state.input.clone()).await
    }

    /// Strips the endpoint prefix; `None` when the path lies outside it.
    fn route_path<'p>(&self, path: &'p str) -> Option<&'p str> {
        let Some(prefix) = self.config.endpoint.as_deref() else {
            return Some(path);
        };
        let rest = path.strip_prefix(prefix)?;
        if rest.is_empty() || rest.starts_with('/') {
            Some(rest)
        } else {
            None
        }
    }

    fn respond(&self, head: &RequestHead, state: RequestState<'_, Ctx>, data: Value) -> OpenApiResponse {
        let meta = match self.response_meta.as_ref() {
            None => None,
            Some(hook) => {
                let input = ResponseMetaInput {
                    kind: state.kind(),
                    paths: state.path().into_iter().collect(),
                    ctx: state.ctx.as_ref(),
                    data: Some(&data),
                    errors: &[],
                };
                match catch_unwind(AssertUnwindSafe(|| hook(input))) {
                    Ok(meta) => meta,
                    Err(_) => {
                        let error = RpcError::internal("Response metadata hook panicked");
                        return self.respond_error(error, head, state);
                    }
                }
            }
        };

        let body = match serde_json::to_vec(&data) {
            Ok(body) => body,
            Err(e) => {
                let error = RpcError::internal("Failed to serialize response").with_cause(e);
                return self.respond_error(error, head, state);
            }
        };

        let (status, headers) = apply_meta(meta, StatusCode::OK, state.headers);
        tracing::debug!(procedure = ?state.entry.map(|e| e.path()), status = status.as_u16(), "request succeeded");
        json_response(status, headers, Bytes::from(body))
    }

    fn respond_error(
        &self,
        error: RpcError,
        head: &RequestHead,
        state: RequestState<'_, Ctx>,
    ) -> OpenApiResponse {
        let status = error.code().http_status();
        if status.is_server_error() {
            tracing::error!(code = %error.code(), procedure = ?state.path(), error = %error, "request failed");
        } else {
            tracing::warn!(code = %error.code(), procedure = ?state.path(), message = error.message(), "request rejected");
        }

        if let Some(hook) = self.on_error.as_ref() {
            let input = OnErrorInput {
                error: &error,
                kind: state.kind(),
                path: state.path(),
                input: state.input.as_ref(),
                ctx: state.ctx.as_ref(),
                req: head,
            };
            if catch_unwind(AssertUnwindSafe(|| hook(input))).is_err() {
                tracing::error!(code = %error.code(), "error hook panicked");
            }
        }

        match catch_unwind(AssertUnwindSafe(|| self.error_response(&error, state))) {
            Ok(response) => response,
            Err(_) => {
                tracing::error!(code = %error.code(), "error shaping panicked");
                internal_error_fallback()
            }
        }
    }

    fn error_response(&self, error: &RpcError, state: RequestState<'_, Ctx>) -> OpenApiResponse {
        let meta = self.response_meta.as_ref().and_then(|hook| {
            hook(ResponseMetaInput {
                kind: state.kind(),
                paths: state.path().into_iter().collect(),
                ctx: state.ctx.as_ref(),
                data: None,
                errors: std::slice::from_ref(error),
            })
        });

        let body = match error.validation_error() {
            Some(validation) => ErrorBody {
                message: response::VALIDATION_MESSAGE.to_string(),
                code: error.code(),
                issues: Some(validation.issues().to_vec()),
            },
            None => ErrorBody {
                message: self.display_message(error, state.ctx.as_ref()),
                code: error.code(),
                issues: None,
            },
        };
        let Ok(bytes) = serde_json::to_vec(&body) else {
            return internal_error_fallback();
        };

        let (status, headers) = apply_meta(meta, error.code().http_status(), state.headers);
        json_response(status, headers, Bytes::from(bytes))
    }

    /// Formatter message, then the error's own message, then a fixed fallback.
    fn display_message(&self, error: &RpcError, ctx: Option<&Ctx>) -> String {
        format_error(self.error_formatter.as_ref(), error, ctx)
            .or_else(|| Some(error.message().to_string()).filter(|m| !m.is_empty()))
            .unwrap_or_else(|| response::FALLBACK_MESSAGE.to_string())
    }
}

/// Applies a metadata override: its status replaces `status`, its headers
/// replace same-named entries of `headers`.
fn apply_meta(
    meta: Option<ResponseMeta>,
    status: StatusCode,
    mut headers: HeaderMap,
) -> (StatusCode, HeaderMap) {
    let Some(meta) = meta else {
        return (status, headers);
    };
    for name in meta.headers.keys() {
        headers.remove(name);
    }
    for (name, value) in meta.headers.iter() {
        headers.append(name.clone(), value.clone());
    }
    (meta.status.unwrap_or(status), headers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::procedure::{ErrorCode, OpenApiMeta, Procedure};
    use crate::schema::Schema;
    use http::header::CONTENT_TYPE;
    use http::{HeaderValue, Uri};
    use serde_json::json;
    use std::sync::Mutex;

    fn router() -> Router<()> {
        Router::new()
            .procedure(
                "ping",
                Procedure::query()
                    .meta(OpenApiMeta::get("/ping"))
                    .handler(|_ctx, (): ()| async move { Ok(json!({"pong": true})) }),
            )
            .procedure(
                "fail",
                Procedure::mutation()
                    .meta(OpenApiMeta::post("/fail"))
                    .input(Schema::object([("n", Schema::number())]))
                    .handler(|_ctx, _input: Value| async move {
                        Err::<Value, _>(RpcError::new(ErrorCode::Conflict, ""))
                    }),
            )
    }

    fn request(method: Method, uri: &'static str, body: &'static str) -> OpenApiRequest {
        let mut head = RequestHead::new(method, Uri::from_static(uri));
        head.headers
            .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        OpenApiRequest::new(head, body)
    }

    fn body(res: &OpenApiResponse) -> Value {
        serde_json::from_slice(res.body()).unwrap()
    }

    #[test]
    fn test_build_requires_context_factory() {
        let err = OpenApiHandler::<()>::builder().build(&router()).unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }

    #[tokio::test]
    async fn test_endpoint_prefix_is_stripped() {
        let handler = OpenApiHandler::builder()
            .default_context()
            .endpoint("api")
            .build(&router())
            .unwrap();

        let res = handler.handle(request(Method::GET, "/api/ping", "")).await;
        assert_eq!(res.status(), StatusCode::OK);

        let res = handler.handle(request(Method::GET, "/ping", "")).await;
        assert_eq!(res.status(), StatusCode::NOT_FOUND);

        let res = handler.handle(request(Method::GET, "/apiping", "")).await;
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_empty_message_falls_back() {
        let handler = OpenApiHandler::builder()
            .default_context()
            .build(&router())
            .unwrap();
        let res = handler
            .handle(request(Method::POST, "/fail", r#"{"n":1}"#))
            .await;
        assert_eq!(res.status(), StatusCode::CONFLICT);
        assert_eq!(
            body(&res),
            json!({"message": "An error occurred", "code": "CONFLICT"})
        );
    }

    #[tokio::test]
    async fn test_formatter_message_wins() {
        let router = router().with_error_formatter(|err, _| Some(format!("formatted {}", err.code())));
        let handler = OpenApiHandler::builder()
            .default_context()
            .build(&router)
            .unwrap();
        let res = handler.handle(request(Method::GET, "/missing", "")).await;
        assert_eq!(body(&res)["message"], "formatted NOT_FOUND");
    }

    #[tokio::test]
    async fn test_declining_formatter_keeps_error_message() {
        let router = router().with_error_formatter(|_, _| None);
        let handler = OpenApiHandler::builder()
            .default_context()
            .build(&router)
            .unwrap();
        let res = handler.handle(request(Method::GET, "/missing", "")).await;
        assert_eq!(body(&res)["message"], "Not found");
    }

    #[tokio::test]
    async fn test_panicking_hooks_degrade_to_500() {
        let handler = OpenApiHandler::<()>::builder()
            .default_context()
            .on_error(|_| panic!("observer exploded"))
            .response_meta(|_| panic!("meta exploded"))
            .build(&router())
            .unwrap();
        let res = handler.handle(request(Method::GET, "/ping", "")).await;
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body(&res)["code"], "INTERNAL_SERVER_ERROR");
    }

    #[tokio::test]
    async fn test_error_hook_sees_progress() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let handler = OpenApiHandler::<()>::builder()
            .default_context()
            .on_error(move |info: OnErrorInput<'_, ()>| {
                sink.lock().unwrap().push((
                    info.error.code(),
                    ProcedureKind::label(info.kind),
                    info.path.map(str::to_string),
                    info.input.cloned(),
                    info.ctx.is_some(),
                ));
            })
            .build(&router())
            .unwrap();

        handler.handle(request(Method::GET, "/missing", "")).await;
        handler.handle(request(Method::POST, "/fail", "{")).await;
        handler
            .handle(request(Method::POST, "/fail", r#"{"n":"x"}"#))
            .await;

        let seen = seen.lock().unwrap();
        assert_eq!(
            *seen,
            vec![
                (ErrorCode::NotFound, "unknown", None, None, false),
                (ErrorCode::ParseError, "mutation", Some("fail".to_string()), None, false),
                (
                    ErrorCode::BadRequest,
                    "mutation",
                    Some("fail".to_string()),
                    Some(json!({"n": "x"})),
                    true
                ),
            ]
        );
    }
}
