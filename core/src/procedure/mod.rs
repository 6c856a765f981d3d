#![deny(missing_docs)]

//! # Procedures
//!
//! - **meta**: REST exposure annotations (`OpenApiMeta`).
//! - **router**: the registry mapping dotted paths to procedures.
//! - **error**: the error taxonomy (`RpcError`, `ErrorCode`).
//!
//! A procedure is a typed handler erased once, at registration, into a callable
//! over `serde_json::Value`.

pub mod error;
pub mod meta;
pub mod router;

pub use error::{ErrorCause, ErrorCode, RpcError};
pub use meta::{HeaderParameter, OpenApiExample, OpenApiMeta, OpenApiMethod};
pub use router::{format_error, ErrorFormatter, Router};

use crate::schema::Schema;
use futures::future::BoxFuture;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;

/// Read or write classification of a procedure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcedureKind {
    /// Side-effect free; input from path and query.
    Query,
    /// Mutating; input from path and body.
    Mutation,
}

impl ProcedureKind {
    /// Lower-case name.
    pub fn as_str(&self) -> &'static str {
        match self {
            ProcedureKind::Query => "query",
            ProcedureKind::Mutation => "mutation",
        }
    }

    /// Name for an optional kind; `unknown` when no procedure resolved.
    pub fn label(kind: Option<ProcedureKind>) -> &'static str {
        kind.map_or("unknown", |k| k.as_str())
    }
}

impl fmt::Display for ProcedureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Future returned by an erased procedure call.
pub type ProcedureFuture = BoxFuture<'static, Result<Value, RpcError>>;

type ErasedHandler<Ctx> = Arc<dyn Fn(Ctx, Value) -> ProcedureFuture + Send + Sync>;

/// A registered unit of server logic.
pub struct Procedure<Ctx> {
    kind: ProcedureKind,
    meta: Option<OpenApiMeta>,
    input: Schema,
    output: Schema,
    handler: ErasedHandler<Ctx>,
}

impl<Ctx> Clone for Procedure<Ctx> {
    fn clone(&self) -> Self {
        Self {
            kind: self.kind,
            meta: self.meta.clone(),
            input: self.input.clone(),
            output: self.output.clone(),
            handler: Arc::clone(&self.handler),
        }
    }
}

impl<Ctx> fmt::Debug for Procedure<Ctx> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Procedure")
            .field("kind", &self.kind)
            .field("meta", &self.meta)
            .field("input", &self.input)
            .field("output", &self.output)
            .finish_non_exhaustive()
    }
}

impl<Ctx: Send + 'static> Procedure<Ctx> {
    /// Starts a read-only procedure.
    pub fn query() -> ProcedureBuilder<Ctx> {
        ProcedureBuilder::new(ProcedureKind::Query)
    }

    /// Starts a mutating procedure.
    pub fn mutation() -> ProcedureBuilder<Ctx> {
        ProcedureBuilder::new(ProcedureKind::Mutation)
    }
}

impl<Ctx> Procedure<Ctx> {
    /// Read/write classification.
    pub fn kind(&self) -> ProcedureKind {
        self.kind
    }

    /// REST annotation, if any (enabled or not).
    pub fn meta(&self) -> Option<&OpenApiMeta> {
        self.meta.as_ref()
    }

    /// REST annotation, only when the procedure is exposed.
    pub fn openapi(&self) -> Option<&OpenApiMeta> {
        self.meta.as_ref().filter(|meta| meta.enabled)
    }

    /// Input schema as declared.
    pub fn input(&self) -> &Schema {
        &self.input
    }

    /// Output schema as declared.
    pub fn output(&self) -> &Schema {
        &self.output
    }

    /// Runs the handler with an already-validated input.
    pub fn invoke(&self, ctx: Ctx, input: Value) -> ProcedureFuture {
        (self.handler)(ctx, input)
    }
}

/// Builder returned by [`Procedure::query`] and [`Procedure::mutation`].
pub struct ProcedureBuilder<Ctx> {
    kind: ProcedureKind,
    meta: Option<OpenApiMeta>,
    input: Schema,
    output: Schema,
    _ctx: PhantomData<fn(Ctx)>,
}

impl<Ctx> fmt::Debug for ProcedureBuilder<Ctx> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProcedureBuilder")
            .field("kind", &self.kind)
            .field("meta", &self.meta)
            .finish_non_exhaustive()
    }
}

impl<Ctx: Send + 'static> ProcedureBuilder<Ctx> {
    fn new(kind: ProcedureKind) -> Self {
        Self {
            kind,
            meta: None,
            input: Schema::Void,
            output: Schema::Unknown,
            _ctx: PhantomData,
        }
    }

    /// Exposes the procedure over REST.
    pub fn meta(mut self, meta: OpenApiMeta) -> Self {
        self.meta = Some(meta);
        self
    }

    /// Declares the input schema. Defaults to [`Schema::Void`].
    pub fn input(mut self, schema: Schema) -> Self {
        self.input = schema;
        self
    }

    /// Declares the output schema. Defaults to [`Schema::Unknown`].
    pub fn output(mut self, schema: Schema) -> Self {
        self.output = schema;
        self
    }

    /// Finishes the procedure with a typed handler.
    ///
    /// The validated input is deserialized into `I` (`()` for void input); the
    /// handler's output is serialized back to JSON.
    pub fn handler<I, O, F, Fut>(self, f: F) -> Procedure<Ctx>
    where
        I: DeserializeOwned + Send + 'static,
        O: Serialize + Send + 'static,
        F: Fn(Ctx, I) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<O, RpcError>> + Send + 'static,
    {
        let f = Arc::new(f);
        let handler: ErasedHandler<Ctx> = Arc::new(move |ctx, raw| {
            let f = Arc::clone(&f);
            Box::pin(async move {
                let input: I = serde_json::from_value(raw)
                    .map_err(|e| RpcError::bad_request(e.to_string()).with_cause(e))?;
                let output = f(ctx, input).await?;
                serde_json::to_value(output).map_err(|e| {
                    RpcError::internal("Failed to serialize procedure output").with_cause(e)
                })
            })
        });

        Procedure {
            kind: self.kind,
            meta: self.meta,
            input: self.input,
            output: self.output,
            handler,
        }
    }
}
