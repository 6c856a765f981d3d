//! # OpenAPI Rendering
//!
//! Converts a [`Schema`] into an OpenAPI 3.0 schema object.

use super::Schema;
use serde_json::{json, Map, Value};

impl Schema {
    /// Renders the schema as an OpenAPI 3.0 schema object.
    pub fn to_openapi_schema(&self) -> Value {
        match self {
            Schema::Void | Schema::Unknown => json!({}),
            Schema::String { format } => {
                let mut obj = Map::new();
                obj.insert("type".to_string(), json!("string"));
                if let Some(format) = format {
                    obj.insert("format".to_string(), json!(format));
                }
                Value::Object(obj)
            }
            Schema::Number { .. } => json!({ "type": "number" }),
            Schema::Integer { .. } => json!({ "type": "integer" }),
            Schema::Boolean { .. } => json!({ "type": "boolean" }),
            Schema::Date { .. } => json!({ "type": "string", "format": "date-time" }),
            Schema::Enum(values) => json!({ "type": "string", "enum": values }),
            Schema::Literal(value) => {
                let mut obj = Map::new();
                if let Some(ty) = json_type(value) {
                    obj.insert("type".to_string(), json!(ty));
                }
                obj.insert("enum".to_string(), json!([value]));
                Value::Object(obj)
            }
            Schema::Array(items) => json!({ "type": "array", "items": items.to_openapi_schema() }),
            Schema::Object(obj) => {
                let mut properties = Map::new();
                let mut required = Vec::new();
                for (name, field) in &obj.fields {
                    properties.insert(name.clone(), field.to_openapi_schema());
                    if !field.is_optional() {
                        required.push(json!(name));
                    }
                }
                let mut out = Map::new();
                out.insert("type".to_string(), json!("object"));
                out.insert("properties".to_string(), Value::Object(properties));
                if !required.is_empty() {
                    out.insert("required".to_string(), Value::Array(required));
                }
                out.insert("additionalProperties".to_string(), json!(false));
                Value::Object(out)
            }
            Schema::Optional(inner) => inner.to_openapi_schema(),
            Schema::Nullable(inner) => with_keyword(inner.to_openapi_schema(), "nullable", json!(true)),
            Schema::Default { inner, value } => {
                with_keyword(inner.to_openapi_schema(), "default", value.clone())
            }
            Schema::Described { inner, description } => {
                with_keyword(inner.to_openapi_schema(), "description", json!(description))
            }
        }
    }
}

fn with_keyword(schema: Value, key: &str, value: Value) -> Value {
    match schema {
        Value::Object(mut obj) => {
            obj.insert(key.to_string(), value);
            Value::Object(obj)
        }
        other => other,
    }
}

fn json_type(value: &Value) -> Option<&'static str> {
    match value {
        Value::String(_) => Some("string"),
        Value::Number(n) if n.is_f64() => Some("number"),
        Value::Number(_) => Some("integer"),
        Value::Bool(_) => Some("boolean"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_object_schema() {
        let schema = Schema::object([
            ("id", Schema::string().with_format("uuid")),
            ("age", Schema::integer().optional().describe("Age in years")),
            ("createdAt", Schema::date()),
            ("role", Schema::enumeration(["admin"]).with_default("admin")),
            ("bio", Schema::string().nullable()),
        ]);
        assert_eq!(
            schema.to_openapi_schema(),
            json!({
                "type": "object",
                "properties": {
                    "id": { "type": "string", "format": "uuid" },
                    "age": { "type": "integer", "description": "Age in years" },
                    "createdAt": { "type": "string", "format": "date-time" },
                    "role": { "type": "string", "enum": ["admin"], "default": "admin" },
                    "bio": { "type": "string", "nullable": true }
                },
                "required": ["id", "createdAt", "bio"],
                "additionalProperties": false
            })
        );
    }

    #[test]
    fn test_array_and_literal() {
        let schema = Schema::array(Schema::literal("ok"));
        assert_eq!(
            schema.to_openapi_schema(),
            json!({ "type": "array", "items": { "type": "string", "enum": ["ok"] } })
        );
    }
}
