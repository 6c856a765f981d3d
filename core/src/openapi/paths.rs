//! # Paths Object
//!
//! One operation per exposed procedure, keyed by route template and method.

use crate::adapter::PathPattern;
use crate::error::{AppError, AppResult};
use crate::procedure::{HeaderParameter, OpenApiMeta, Procedure, ProcedureKind, Router};
use crate::schema::{ObjectSchema, Schema};
use serde_json::{json, Map, Value};
use std::collections::HashSet;

/// Builds the `paths` object of the document.
pub fn paths_object<Ctx>(router: &Router<Ctx>, scheme_names: &[String]) -> AppResult<Map<String, Value>> {
    let mut paths = Map::new();
    let mut seen = HashSet::new();

    for (path, procedure, meta) in router.openapi_procedures() {
        let fail = |reason: String| AppError::procedure(procedure.kind(), path, reason);

        let pattern = PathPattern::parse(&meta.path).map_err(|err| match err {
            AppError::Config(reason) => fail(reason),
            other => other,
        })?;
        let template = pattern.template();
        let method = meta.method.path_item_key();

        if !seen.insert((meta.method, pattern.shape())) {
            return Err(fail(format!(
                "Duplicate procedure defined for route {} {}",
                meta.method, template
            )));
        }

        let operation = operation(path, procedure, meta, &pattern, scheme_names)
            .map_err(fail)?;
        let item = paths
            .entry(template)
            .or_insert_with(|| Value::Object(Map::new()));
        if let Value::Object(item) = item {
            item.insert(method.to_string(), operation);
        }
    }

    Ok(paths)
}

fn operation<Ctx>(
    path: &str,
    procedure: &Procedure<Ctx>,
    meta: &OpenApiMeta,
    pattern: &PathPattern,
    scheme_names: &[String],
) -> Result<Value, String> {
    if meta.content_types.is_empty() {
        return Err("At least one content type must be specified".to_string());
    }

    let path_params = pattern.parameters().collect::<Vec<_>>();
    let request_example = meta.example.as_ref().and_then(|e| e.request.as_ref());

    let mut parameters = meta.headers.iter().map(header_parameter).collect::<Vec<_>>();
    let mut request_body = None;

    let input = procedure.input();
    if input.is_void_like() {
        if let Some(param) = path_params.first() {
            return Err(missing_path_key(param));
        }
    } else {
        let object = input
            .as_object()
            .ok_or_else(|| "Input parser must be an object schema".to_string())?;
        if let Some(param) = path_params.iter().find(|p| object.get(p).is_none()) {
            return Err(missing_path_key(param));
        }

        for (key, field) in &object.fields {
            let in_path = path_params.contains(&key.as_str());
            if !in_path && meta.method.accepts_request_body() {
                continue;
            }
            if !(field.is_string_like() || field.is_coercible()) {
                return Err(format!(
                    "Input parser key: \"{}\" must be a string, number, boolean or date schema",
                    key
                ));
            }
            parameters.push(query_or_path_parameter(key, field, in_path, request_example));
        }

        if meta.method.accepts_request_body() {
            let body = object.omit(path_params.iter().copied());
            if !body.fields.is_empty() {
                request_body = Some(request_body_object(
                    input,
                    &body,
                    &meta.content_types,
                    request_example,
                    &path_params,
                ));
            }
        }
    }

    let mut op = Map::new();
    op.insert("operationId".to_string(), json!(path.replace('.', "-")));
    if let Some(summary) = &meta.summary {
        op.insert("summary".to_string(), json!(summary));
    }
    if let Some(description) = &meta.description {
        op.insert("description".to_string(), json!(description));
    }
    op.insert("tags".to_string(), json!(meta.tags));
    if meta.protect {
        let security = scheme_names
            .iter()
            .map(|name| json!({ name.as_str(): [] }))
            .collect::<Vec<_>>();
        op.insert("security".to_string(), Value::Array(security));
    }
    op.insert("parameters".to_string(), Value::Array(parameters));
    if let Some(body) = request_body {
        op.insert("requestBody".to_string(), body);
    }
    op.insert("responses".to_string(), responses(procedure, meta));
    if meta.deprecated {
        op.insert("deprecated".to_string(), json!(true));
    }
    Ok(Value::Object(op))
}

fn missing_path_key(param: &str) -> String {
    format!("Input parser expects key from path: \"{}\"", param)
}

fn header_parameter(header: &HeaderParameter) -> Value {
    let mut param = Map::new();
    param.insert("name".to_string(), json!(header.name));
    param.insert("in".to_string(), json!("header"));
    if let Some(description) = &header.description {
        param.insert("description".to_string(), json!(description));
    }
    param.insert("required".to_string(), json!(header.required));
    param.insert("schema".to_string(), header.schema.to_openapi_schema());
    Value::Object(param)
}

fn query_or_path_parameter(
    key: &str,
    field: &Schema,
    in_path: bool,
    example: Option<&Value>,
) -> Value {
    let mut param = Map::new();
    param.insert("name".to_string(), json!(key));
    param.insert("in".to_string(), json!(if in_path { "path" } else { "query" }));
    param.insert("required".to_string(), json!(in_path || !field.is_optional()));
    param.insert("schema".to_string(), field.to_openapi_schema());
    if let Some(description) = field.description() {
        param.insert("description".to_string(), json!(description));
    }
    if let Some(value) = example.and_then(|e| e.get(key)) {
        param.insert("example".to_string(), value.clone());
    }
    Value::Object(param)
}

fn request_body_object(
    input: &Schema,
    body: &ObjectSchema,
    content_types: &[String],
    example: Option<&Value>,
    path_params: &[&str],
) -> Value {
    let schema = Schema::Object(body.clone()).to_openapi_schema();
    let example = example.map(|example| match example {
        Value::Object(map) => Value::Object(
            map.iter()
                .filter(|(k, _)| !path_params.contains(&k.as_str()))
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        ),
        other => other.clone(),
    });

    let mut content = Map::new();
    for content_type in content_types {
        let mut media = Map::new();
        media.insert("schema".to_string(), schema.clone());
        if let Some(example) = &example {
            media.insert("example".to_string(), example.clone());
        }
        content.insert(content_type.clone(), Value::Object(media));
    }

    json!({
        "required": !input.is_optional(),
        "content": content,
    })
}

fn responses<Ctx>(procedure: &Procedure<Ctx>, meta: &OpenApiMeta) -> Value {
    let mut media = Map::new();
    media.insert("schema".to_string(), procedure.output().to_openapi_schema());
    if let Some(example) = meta.example.as_ref().and_then(|e| e.response.as_ref()) {
        media.insert("example".to_string(), example.clone());
    }

    let mut success = Map::new();
    success.insert("description".to_string(), json!("Successful response"));
    if !meta.response_headers.is_empty() {
        let headers = meta
            .response_headers
            .iter()
            .map(|header| {
                let mut value = Map::new();
                if let Some(description) = &header.description {
                    value.insert("description".to_string(), json!(description));
                }
                value.insert("required".to_string(), json!(header.required));
                value.insert("schema".to_string(), header.schema.to_openapi_schema());
                (header.name.clone(), Value::Object(value))
            })
            .collect::<Map<_, _>>();
        success.insert("headers".to_string(), Value::Object(headers));
    }
    success.insert(
        "content".to_string(),
        json!({ "application/json": Value::Object(media) }),
    );

    json!({
        "200": Value::Object(success),
        "default": { "$ref": "#/components/responses/error" }
    })
}

/// Lists `(METHOD, template, procedure path, kind)` for every exposed procedure.
pub fn route_table<Ctx>(router: &Router<Ctx>) -> AppResult<Vec<(String, String, String, ProcedureKind)>> {
    router
        .openapi_procedures()
        .map(|(path, procedure, meta)| {
            PathPattern::parse(&meta.path).map(|pattern| {
                (
                    meta.method.to_string(),
                    pattern.template(),
                    path.to_string(),
                    procedure.kind(),
                )
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::procedure::{OpenApiMeta, Procedure};
    use pretty_assertions::assert_eq;

    fn proc_with(meta: OpenApiMeta, input: Schema) -> Procedure<()> {
        Procedure::mutation()
            .meta(meta)
            .input(input)
            .handler(|_ctx, _input: Value| async move { Ok(()) })
    }

    fn error_of(router: Router<()>) -> String {
        paths_object(&router, &[]).unwrap_err().to_string()
    }

    #[test]
    fn test_non_object_input_rejected() {
        let router = Router::new().procedure(
            "echo",
            proc_with(OpenApiMeta::post("/echo"), Schema::string()),
        );
        assert_eq!(
            error_of(router),
            "Configuration Error: [mutation.echo] - Input parser must be an object schema"
        );
    }

    #[test]
    fn test_missing_path_key_rejected() {
        let router = Router::new().procedure(
            "users.get",
            proc_with(
                OpenApiMeta::get("/users/{id}"),
                Schema::object([("name", Schema::string())]),
            ),
        );
        assert_eq!(
            error_of(router),
            "Configuration Error: [mutation.users.get] - Input parser expects key from path: \"id\""
        );
    }

    #[test]
    fn test_non_scalar_query_field_rejected() {
        let router = Router::new().procedure(
            "search",
            proc_with(
                OpenApiMeta::get("/search"),
                Schema::object([("tags", Schema::array(Schema::string()))]),
            ),
        );
        assert_eq!(
            error_of(router),
            "Configuration Error: [mutation.search] - Input parser key: \"tags\" must be a string, number, boolean or date schema"
        );
    }

    #[test]
    fn test_body_fields_may_be_any_shape() {
        let router = Router::new().procedure(
            "tag",
            proc_with(
                OpenApiMeta::post("/items/{id}/tags"),
                Schema::object([
                    ("id", Schema::integer()),
                    ("tags", Schema::array(Schema::string())),
                ]),
            ),
        );
        let paths = paths_object(&router, &[]).unwrap();
        let op = &paths["/items/{id}/tags"]["post"];
        assert_eq!(op["parameters"][0]["in"], "path");
        assert_eq!(op["parameters"].as_array().unwrap().len(), 1);
        assert_eq!(
            op["requestBody"]["content"]["application/json"]["schema"]["properties"],
            json!({"tags": {"type": "array", "items": {"type": "string"}}})
        );
    }

    #[test]
    fn test_empty_content_types_rejected() {
        let router = Router::new().procedure(
            "a",
            proc_with(OpenApiMeta::post("/a").with_content_types(Vec::<String>::new()), Schema::Void),
        );
        assert_eq!(
            error_of(router),
            "Configuration Error: [mutation.a] - At least one content type must be specified"
        );
    }

    #[test]
    fn test_route_table() {
        let router = Router::new()
            .procedure("a", proc_with(OpenApiMeta::put("/a/:id"), Schema::Void))
            .procedure("b", proc_with(OpenApiMeta::get("/b").disabled(), Schema::Void));
        assert_eq!(
            route_table(&router).unwrap(),
            vec![(
                "PUT".to_string(),
                "/a/{id}".to_string(),
                "a".to_string(),
                ProcedureKind::Mutation
            )]
        );
    }
}
