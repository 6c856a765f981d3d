//! # Procedure Index
//!
//! The lookup table from `(HTTP method, path)` to a registered procedure,
//! built once from a [`Router`] and read-only afterwards.

use super::path::{split_segments, PathInput, PathPattern};
use crate::error::{AppError, AppResult};
use crate::procedure::{OpenApiMethod, Procedure, Router, RpcError};
use crate::schema::{CompiledSchema, Schema};
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

/// A routable procedure.
pub struct IndexEntry<Ctx> {
    path: String,
    method: OpenApiMethod,
    pattern: PathPattern,
    procedure: Arc<Procedure<Ctx>>,
    input: CompiledSchema,
}

impl<Ctx> fmt::Debug for IndexEntry<Ctx> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IndexEntry")
            .field("path", &self.path)
            .field("method", &self.method)
            .field("pattern", &self.pattern.template())
            .finish_non_exhaustive()
    }
}

impl<Ctx> IndexEntry<Ctx> {
    /// Dotted procedure path.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// HTTP method the procedure is mounted on.
    pub fn method(&self) -> OpenApiMethod {
        self.method
    }

    /// Compiled route template.
    pub fn pattern(&self) -> &PathPattern {
        &self.pattern
    }

    /// The registered procedure.
    pub fn procedure(&self) -> &Procedure<Ctx> {
        &self.procedure
    }

    /// The coerced input schema derived when the index was built.
    pub fn input_schema(&self) -> &Schema {
        self.input.schema()
    }

    /// Validates `input` against the compiled coerced schema and runs the procedure.
    pub async fn call(&self, ctx: Ctx, input: Option<Value>) -> Result<Value, RpcError> {
        let parsed = self.input.parse(input)?;
        self.procedure
            .invoke(ctx, parsed.unwrap_or(Value::Null))
            .await
    }
}

/// The outcome of a successful lookup.
#[derive(Debug)]
pub struct Resolved<'a, Ctx> {
    /// Matching entry.
    pub entry: &'a IndexEntry<Ctx>,
    /// Captured path parameters.
    pub path_input: PathInput,
}

/// Immutable `(method, path) -> procedure` table.
pub struct ProcedureIndex<Ctx> {
    entries: Vec<IndexEntry<Ctx>>,
    by_method: HashMap<OpenApiMethod, Vec<usize>>,
}

impl<Ctx> fmt::Debug for ProcedureIndex<Ctx> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProcedureIndex")
            .field("entries", &self.entries)
            .finish()
    }
}

impl<Ctx> ProcedureIndex<Ctx> {
    /// Indexes every exposed procedure of `router`, in registration order.
    ///
    /// Two procedures on the same method whose templates match the same paths
    /// are rejected.
    pub fn build(router: &Router<Ctx>) -> AppResult<Self> {
        let mut entries = Vec::new();
        let mut by_method: HashMap<OpenApiMethod, Vec<usize>> = HashMap::new();
        let mut seen = HashSet::new();

        for (path, procedure, meta) in router.openapi_procedures() {
            let pattern = PathPattern::parse(&meta.path).map_err(|err| match err {
                AppError::Config(reason) => {
                    AppError::procedure(procedure.kind(), path, reason)
                }
                other => other,
            })?;
            let template = pattern.template();
            if !seen.insert((meta.method, pattern.shape())) {
                return Err(AppError::procedure(
                    procedure.kind(),
                    path,
                    format!(
                        "Duplicate procedure defined for route {} {}",
                        meta.method, template
                    ),
                ));
            }

            let input = procedure
                .input()
                .with_coercion()
                .compile()
                .map_err(|err| match err {
                    AppError::Config(reason) => AppError::procedure(procedure.kind(), path, reason),
                    other => other,
                })?;

            tracing::debug!(procedure = %path, method = %meta.method, route = %template, "indexed procedure");
            by_method
                .entry(meta.method)
                .or_default()
                .push(entries.len());
            entries.push(IndexEntry {
                path: path.to_string(),
                method: meta.method,
                pattern,
                procedure: Arc::clone(procedure),
                input,
            });
        }

        Ok(Self { entries, by_method })
    }

    /// Finds the first entry registered for `method` whose pattern matches `path`.
    ///
    /// `path` is normalized first. Methods that never route (e.g. `OPTIONS`)
    /// yield `None`.
    pub fn lookup(&self, method: &http::Method, path: &str) -> Option<Resolved<'_, Ctx>> {
        let method = OpenApiMethod::from_http(method)?;
        let segments = split_segments(path);
        self.by_method.get(&method)?.iter().find_map(|&position| {
            let entry = &self.entries[position];
            entry
                .pattern
                .matches(&segments)
                .map(|path_input| Resolved { entry, path_input })
        })
    }

    /// Entries in registration order.
    pub fn entries(&self) -> &[IndexEntry<Ctx>] {
        &self.entries
    }

    /// Number of routable procedures.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when nothing is routable.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::procedure::{ErrorCode, OpenApiMeta};
    use serde_json::json;

    fn echo(meta: OpenApiMeta, input: Schema) -> Procedure<()> {
        Procedure::query()
            .meta(meta)
            .input(input)
            .handler(|_ctx, input: Value| async move { Ok(input) })
    }

    fn router() -> Router<()> {
        Router::new()
            .procedure("users.list", echo(OpenApiMeta::get("/users"), Schema::Object(Default::default())))
            .procedure(
                "users.get",
                echo(
                    OpenApiMeta::get("/users/{id}"),
                    Schema::object([("id", Schema::integer())]),
                ),
            )
            .procedure(
                "users.posts",
                echo(
                    OpenApiMeta::get("/users/{id}/posts/{postId}"),
                    Schema::object([("id", Schema::string()), ("postId", Schema::string())]),
                ),
            )
            .procedure(
                "users.me",
                echo(OpenApiMeta::get("/users/me"), Schema::Void),
            )
            .procedure(
                "hidden",
                echo(OpenApiMeta::get("/hidden").disabled(), Schema::Void),
            )
    }

    #[test]
    fn test_lookup_extracts_path_input() {
        let index = ProcedureIndex::build(&router()).unwrap();
        let resolved = index
            .lookup(&http::Method::GET, "/users/7/posts/abc")
            .unwrap();
        assert_eq!(resolved.entry.path(), "users.posts");
        assert_eq!(resolved.path_input.len(), 2);
        assert_eq!(resolved.path_input["id"], "7");
        assert_eq!(resolved.path_input["postId"], "abc");
    }

    #[test]
    fn test_lookup_normalizes_slashes() {
        let index = ProcedureIndex::build(&router()).unwrap();
        assert_eq!(
            index
                .lookup(&http::Method::GET, "//users/")
                .unwrap()
                .entry
                .path(),
            "users.list"
        );
    }

    #[test]
    fn test_first_registered_match_wins() {
        let index = ProcedureIndex::build(&router()).unwrap();
        // `/users/{id}` was registered before `/users/me`.
        let resolved = index.lookup(&http::Method::GET, "/users/me").unwrap();
        assert_eq!(resolved.entry.path(), "users.get");
    }

    #[test]
    fn test_unknown_method_or_path() {
        let index = ProcedureIndex::build(&router()).unwrap();
        assert!(index.lookup(&http::Method::POST, "/users").is_none());
        assert!(index.lookup(&http::Method::GET, "/nope").is_none());
        assert!(index.lookup(&http::Method::OPTIONS, "/users").is_none());
        assert!(index.lookup(&http::Method::GET, "/hidden").is_none());
        assert_eq!(index.len(), 4);
    }

    #[test]
    fn test_duplicate_route_rejected() {
        let router = Router::new()
            .procedure("a", echo(OpenApiMeta::get("/users/{id}"), Schema::Void))
            .procedure("b", echo(OpenApiMeta::get("/users/:key/"), Schema::Void));
        let err = ProcedureIndex::build(&router).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Configuration Error: [query.b] - Duplicate procedure defined for route GET /users/{key}"
        );
    }

    #[test]
    fn test_same_template_different_methods() {
        let router = Router::new()
            .procedure("a", echo(OpenApiMeta::get("/items"), Schema::Void))
            .procedure("b", echo(OpenApiMeta::delete("/items"), Schema::Void));
        assert_eq!(ProcedureIndex::build(&router).unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_call_uses_coerced_schema() {
        let index = ProcedureIndex::build(&router()).unwrap();
        let resolved = index.lookup(&http::Method::GET, "/users/5").unwrap();
        let out = resolved
            .entry
            .call((), Some(json!({"id": "5"})))
            .await
            .unwrap();
        assert_eq!(out, json!({"id": 5}));

        let err = resolved
            .entry
            .call((), Some(json!({"id": "five"})))
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::BadRequest);
        assert!(err.validation_error().is_some());
    }
}
