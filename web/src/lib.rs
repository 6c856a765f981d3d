#![deny(missing_docs)]

//! # RPC REST Web Library
//!
//! Actix-web binding of the REST adapter, the demo procedures and the
//! server wiring shared by the binary and its tests.

use actix_web::{web, HttpResponse, Responder};
use rpc_rest_core::{
    generate_openapi_document, AppResult, GenerateOpenApiDocumentOptions, OpenApiHandler,
};
use serde_json::Value;

/// Mounting an `OpenApiHandler` on actix-web.
pub mod adapter;

/// Environment-driven server settings.
pub mod config;

/// In-memory demo procedures.
pub mod demo;

/// Subscriber setup.
pub mod logging;

use config::ServerConfig;
use demo::{demo_router, DemoContext, DemoContextFactory};

/// Path the generated document is served from.
pub const OPENAPI_JSON_PATH: &str = "/openapi.json";

/// Shared state cloned into every actix worker.
#[derive(Debug, Clone)]
pub struct AppState {
    handler: web::Data<OpenApiHandler<DemoContext>>,
    document: web::Data<Value>,
}

impl AppState {
    /// Builds the handler and renders the document for the demo router.
    pub fn new(config: &ServerConfig) -> AppResult<Self> {
        let router = demo_router();
        let handler = OpenApiHandler::builder()
            .config(config.handler.clone())
            .create_context(DemoContextFactory::new())
            .build(&router)?;

        let options = GenerateOpenApiDocumentOptions::new(
            "RPC REST demo",
            env!("CARGO_PKG_VERSION"),
            config.base_url(),
        )
        .with_description("Demo procedures exposed as REST endpoints")
        .with_tag("greeting")
        .with_tag("users");
        let document = generate_openapi_document(&router, &options)?;

        Ok(Self {
            handler: web::Data::new(handler),
            document: web::Data::new(document),
        })
    }

    /// Registers `GET /openapi.json` and the adapter as default service.
    pub fn configure(self) -> impl FnOnce(&mut web::ServiceConfig) {
        move |app| {
            app.app_data(self.document)
                .route(OPENAPI_JSON_PATH, web::get().to(openapi_json));
            adapter::configure(self.handler)(app);
        }
    }
}

async fn openapi_json(document: web::Data<Value>) -> impl Responder {
    HttpResponse::Ok().json(document.get_ref())
}
