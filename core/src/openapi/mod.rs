#![deny(missing_docs)]

//! # OpenAPI Document Generator
//!
//! Renders the REST surface of a [`Router`] as an OpenAPI 3.0.3 document.
//! Only procedures with enabled [`OpenApiMeta`](crate::procedure::OpenApiMeta)
//! appear in the document, mirroring what the adapter routes.

pub mod paths;

use crate::error::AppResult;
use crate::procedure::Router;
use crate::schema::Schema;
use indexmap::IndexMap;
use serde_json::{json, Map, Value};

/// Version string written to the `openapi` field.
pub const OPENAPI_VERSION: &str = "3.0.3";

/// Document-level metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerateOpenApiDocumentOptions {
    /// `info.title`
    pub title: String,
    /// `info.description`
    pub description: Option<String>,
    /// `info.version`
    pub version: String,
    /// URL of the single server entry.
    pub base_url: String,
    /// `externalDocs.url`
    pub docs_url: Option<String>,
    /// Top-level tag names, in order.
    pub tags: Vec<String>,
    /// `components.securitySchemes`; protected operations require every scheme.
    pub security_schemes: IndexMap<String, Value>,
}

impl GenerateOpenApiDocumentOptions {
    /// Options with the required fields and a bearer `Authorization` scheme.
    pub fn new(
        title: impl Into<String>,
        version: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Self {
        let mut security_schemes = IndexMap::new();
        security_schemes.insert(
            "Authorization".to_string(),
            json!({ "type": "http", "scheme": "bearer" }),
        );
        Self {
            title: title.into(),
            description: None,
            version: version.into(),
            base_url: base_url.into(),
            docs_url: None,
            tags: Vec::new(),
            security_schemes,
        }
    }

    /// Sets the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Sets the external documentation URL.
    pub fn with_docs_url(mut self, docs_url: impl Into<String>) -> Self {
        self.docs_url = Some(docs_url.into());
        self
    }

    /// Appends a top-level tag.
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    /// Replaces the security schemes.
    pub fn with_security_schemes(mut self, schemes: IndexMap<String, Value>) -> Self {
        self.security_schemes = schemes;
        self
    }
}

/// Generates the OpenAPI document for every exposed procedure of `router`.
///
/// Fails with a configuration error on routes the adapter could not serve
/// faithfully (duplicates, non-object inputs, unusable parameters).
pub fn generate_openapi_document<Ctx>(
    router: &Router<Ctx>,
    options: &GenerateOpenApiDocumentOptions,
) -> AppResult<Value> {
    let scheme_names = options.security_schemes.keys().cloned().collect::<Vec<_>>();
    let paths = paths::paths_object(router, &scheme_names)?;

    let mut info = Map::new();
    info.insert("title".to_string(), json!(options.title));
    if let Some(description) = &options.description {
        info.insert("description".to_string(), json!(description));
    }
    info.insert("version".to_string(), json!(options.version));

    let mut doc = Map::new();
    doc.insert("openapi".to_string(), json!(OPENAPI_VERSION));
    doc.insert("info".to_string(), Value::Object(info));
    doc.insert("servers".to_string(), json!([{ "url": options.base_url }]));
    doc.insert("paths".to_string(), Value::Object(paths));
    doc.insert(
        "components".to_string(),
        json!({
            "securitySchemes": options.security_schemes,
            "responses": {
                "error": {
                    "description": "Error response",
                    "content": {
                        "application/json": { "schema": error_schema().to_openapi_schema() }
                    }
                }
            }
        }),
    );
    if !options.tags.is_empty() {
        let tags = options
            .tags
            .iter()
            .map(|name| json!({ "name": name }))
            .collect::<Vec<_>>();
        doc.insert("tags".to_string(), Value::Array(tags));
    }
    if let Some(url) = &options.docs_url {
        doc.insert("externalDocs".to_string(), json!({ "url": url }));
    }

    Ok(Value::Object(doc))
}

/// Shape of every error body.
pub fn error_schema() -> Schema {
    Schema::object([
        ("message", Schema::string()),
        ("code", Schema::string()),
        (
            "issues",
            Schema::array(Schema::object([("message", Schema::string())])).optional(),
        ),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_empty_router_document() {
        let router: Router<()> = Router::new();
        let options = GenerateOpenApiDocumentOptions::new("Demo", "1.0.0", "http://localhost:8080")
            .with_description("A demo")
            .with_docs_url("https://example.com/docs")
            .with_tag("users");
        let doc = generate_openapi_document(&router, &options).unwrap();

        assert_eq!(doc["openapi"], "3.0.3");
        assert_eq!(
            doc["info"],
            json!({"title": "Demo", "description": "A demo", "version": "1.0.0"})
        );
        assert_eq!(doc["servers"], json!([{"url": "http://localhost:8080"}]));
        assert_eq!(doc["paths"], json!({}));
        assert_eq!(
            doc["components"]["securitySchemes"],
            json!({"Authorization": {"type": "http", "scheme": "bearer"}})
        );
        assert_eq!(doc["tags"], json!([{"name": "users"}]));
        assert_eq!(doc["externalDocs"], json!({"url": "https://example.com/docs"}));
    }

    #[test]
    fn test_error_response_component() {
        let router: Router<()> = Router::new();
        let options = GenerateOpenApiDocumentOptions::new("Demo", "1.0.0", "/");
        let doc = generate_openapi_document(&router, &options).unwrap();
        let schema = &doc["components"]["responses"]["error"]["content"]["application/json"]["schema"];
        assert_eq!(schema["required"], json!(["message", "code"]));
        assert_eq!(schema["properties"]["issues"]["type"], "array");
        assert!(doc.get("tags").is_none());
        assert!(doc.get("externalDocs").is_none());
    }
}
