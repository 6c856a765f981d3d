#![deny(missing_docs)]

//! # RPC REST Core
//!
//! Serves typed RPC procedures as REST endpoints and documents them as OpenAPI.

/// Shared error types.
pub mod error;

/// Adapter configuration.
pub mod config;

/// Procedure definitions and the router.
pub mod procedure;

/// Input/output schema model.
pub mod schema;

/// Request-to-procedure pipeline.
pub mod adapter;

/// OpenAPI document generation.
pub mod openapi;

pub use adapter::{
    ContextFactory, ErrorBody, OnErrorInput, OpenApiHandler, OpenApiHandlerBuilder,
    OpenApiRequest, OpenApiResponse, RequestBody, RequestHead, ResponseMeta, ResponseMetaInput,
};
pub use config::{HandlerConfig, DEFAULT_MAX_BODY_SIZE};
pub use error::{AppError, AppResult};
pub use openapi::{generate_openapi_document, GenerateOpenApiDocumentOptions};
pub use procedure::{
    ErrorCode, HeaderParameter, OpenApiMeta, OpenApiMethod, Procedure, ProcedureKind, Router,
    RpcError,
};
pub use schema::{CompiledSchema, Issue, Schema, ValidationError};
