//! # Validation
//!
//! Parses wire values against a [`Schema`], collecting every failure as an
//! [`Issue`]. A preparation pass strips unknown object keys, applies defaults
//! and coerces flagged scalars. The prepared value is then checked by a
//! `jsonschema` validator compiled once from the schema's OpenAPI rendering.

use super::{ObjectSchema, Schema};
use crate::error::{AppError, AppResult};
use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use jsonschema::{error::ValidationErrorKind, paths::PathChunk, Draft, JSONSchema};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Number, Value};
use std::fmt;

/// Classification of a single validation failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueCode {
    /// The value has the wrong JSON type (or is missing).
    InvalidType,
    /// The value does not equal the expected literal.
    InvalidLiteral,
    /// The string is not one of the allowed values.
    InvalidEnumValue,
    /// The string is not a valid date.
    InvalidDate,
}

/// One step into a nested value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PathSegment {
    /// Array position.
    Index(usize),
    /// Object key.
    Key(String),
}

/// A structured validation failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Issue {
    /// Failure class.
    pub code: IssueCode,
    /// What the schema wanted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected: Option<String>,
    /// What the input carried.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub received: Option<String>,
    /// Location of the failing value.
    pub path: Vec<PathSegment>,
    /// Human readable message.
    pub message: String,
}

/// Raised when a value does not satisfy its schema.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    issues: Vec<Issue>,
}

impl ValidationError {
    /// All collected issues, in discovery order.
    pub fn issues(&self) -> &[Issue] {
        &self.issues
    }

    /// Consumes the error, returning its issues.
    pub fn into_issues(self) -> Vec<Issue> {
        self.issues
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered = self
            .issues
            .iter()
            .map(|issue| {
                if issue.path.is_empty() {
                    issue.message.clone()
                } else {
                    format!("{}: {}", render_path(&issue.path), issue.message)
                }
            })
            .collect::<Vec<_>>();
        write!(f, "{}", rendered.join("; "))
    }
}

impl std::error::Error for ValidationError {}

fn render_path(path: &[PathSegment]) -> String {
    path.iter()
        .map(|segment| match segment {
            PathSegment::Index(i) => i.to_string(),
            PathSegment::Key(k) => k.clone(),
        })
        .collect::<Vec<_>>()
        .join(".")
}

impl Schema {
    /// Compiles the schema into a reusable validator.
    ///
    /// The OpenAPI rendering is adapted for a Draft 4 `jsonschema` validator:
    /// `nullable` becomes a `null` type member, and `format` and
    /// `additionalProperties` are dropped because dates and unknown keys are
    /// handled while preparing the value.
    pub fn compile(&self) -> AppResult<CompiledSchema> {
        let document = draft4_document(self.to_openapi_schema());
        let validator = JSONSchema::options()
            .with_draft(Draft::Draft4)
            .compile(&document)
            .map_err(|err| AppError::Config(format!("Invalid schema: {}", err)))?;
        Ok(CompiledSchema {
            schema: self.clone(),
            validator,
        })
    }
}

/// A [`Schema`] together with its compiled validator.
pub struct CompiledSchema {
    schema: Schema,
    validator: JSONSchema,
}

impl fmt::Debug for CompiledSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledSchema")
            .field("schema", &self.schema)
            .finish_non_exhaustive()
    }
}

impl CompiledSchema {
    /// The schema this validator was compiled from.
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Validates `value` (`None` means absent) and returns the normalized value.
    ///
    /// The result is `None` only when the schema accepts absence and nothing
    /// (not even a default) was supplied. Issues are ordered by field
    /// declaration order.
    pub fn parse(&self, value: Option<Value>) -> Result<Option<Value>, ValidationError> {
        let mut prep = Prepare::default();
        let prepared = match value {
            Some(value) => Some(prep.present(&self.schema, value)),
            None => {
                let filled = prep.absent(&self.schema);
                if filled.is_none() && !self.schema.is_optional() {
                    prep.required(&self.schema);
                }
                filled
            }
        };

        let mut issues = prep.issues;
        if let Some(instance) = &prepared {
            if let Err(errors) = self.validator.validate(instance) {
                issues.extend(errors.filter_map(|err| to_issue(&self.schema, &err)));
            }
        }
        if issues.is_empty() {
            return Ok(prepared);
        }
        issues.sort_by_key(|issue| field_order(&self.schema, &issue.path));
        Err(ValidationError { issues })
    }
}

/// Strips unknown keys, fills defaults and coerces flagged scalars.
///
/// Only failures the validator cannot see are recorded here: values given to
/// a void schema, unparseable dates and an absent root.
#[derive(Default)]
struct Prepare {
    path: Vec<PathSegment>,
    issues: Vec<Issue>,
}

impl Prepare {
    fn present(&mut self, schema: &Schema, value: Value) -> Value {
        match (schema, value) {
            (Schema::Nullable(_), Value::Null) => Value::Null,
            (
                Schema::Optional(inner)
                | Schema::Nullable(inner)
                | Schema::Default { inner, .. }
                | Schema::Described { inner, .. },
                value,
            ) => self.present(inner, value),
            (Schema::Void, value) => {
                self.push(
                    IssueCode::InvalidType,
                    Some("void".into()),
                    Some(received_name(None, &value).into()),
                    format!("Expected void, received {}", received_name(None, &value)),
                );
                value
            }
            (Schema::Number { coerce: true }, Value::String(s)) => match coerce_number(&s) {
                Some(n) => Value::Number(n),
                None => Value::String(s),
            },
            (Schema::Integer { coerce }, value) => coerce_integer(value, *coerce),
            (Schema::Boolean { coerce: true }, Value::String(s)) => match s.as_str() {
                "true" => Value::Bool(true),
                "false" => Value::Bool(false),
                _ => Value::String(s),
            },
            (Schema::Date { coerce }, Value::String(s)) => match parse_date(&s, *coerce) {
                Some(normalized) => Value::String(normalized),
                None => {
                    self.push(IssueCode::InvalidDate, None, None, "Invalid date".into());
                    Value::String(s)
                }
            },
            (Schema::Array(items), Value::Array(values)) => Value::Array(
                values
                    .into_iter()
                    .enumerate()
                    .map(|(i, item)| {
                        self.path.push(PathSegment::Index(i));
                        let out = self.present(items, item);
                        self.path.pop();
                        out
                    })
                    .collect(),
            ),
            (Schema::Object(obj), Value::Object(map)) => Value::Object(self.object(obj, map)),
            (_, value) => value,
        }
    }

    /// The nearest default of an absent value, prepared like a present one.
    fn absent(&mut self, schema: &Schema) -> Option<Value> {
        match schema {
            Schema::Default { inner, value } => Some(self.present(inner, value.clone())),
            Schema::Nullable(inner) | Schema::Described { inner, .. } => self.absent(inner),
            _ => None,
        }
    }

    fn object(&mut self, obj: &ObjectSchema, mut map: Map<String, Value>) -> Map<String, Value> {
        let mut out = Map::new();
        for (name, field) in &obj.fields {
            self.path.push(PathSegment::Key(name.clone()));
            let prepared = match map.remove(name) {
                Some(value) => Some(self.present(field, value)),
                None => self.absent(field),
            };
            self.path.pop();
            if let Some(value) = prepared {
                out.insert(name.clone(), value);
            }
        }
        out
    }

    fn required(&mut self, schema: &Schema) {
        self.push(
            IssueCode::InvalidType,
            Some(type_name(schema)),
            Some("undefined".into()),
            "Required".into(),
        );
    }

    fn push(
        &mut self,
        code: IssueCode,
        expected: Option<String>,
        received: Option<String>,
        message: String,
    ) {
        self.issues.push(Issue {
            code,
            expected,
            received,
            path: self.path.clone(),
            message,
        });
    }
}

fn draft4_document(schema: Value) -> Value {
    let Value::Object(mut obj) = schema else {
        return schema;
    };
    obj.remove("format");
    obj.remove("additionalProperties");
    if obj.remove("nullable") == Some(Value::Bool(true)) {
        if let Some(ty) = obj.get_mut("type") {
            let single = ty.take();
            *ty = json!([single, "null"]);
        }
        if let Some(Value::Array(options)) = obj.get_mut("enum") {
            options.push(Value::Null);
        }
    }
    if let Some(Value::Object(properties)) = obj.get_mut("properties") {
        for property in properties.values_mut() {
            *property = draft4_document(property.take());
        }
    }
    if let Some(items) = obj.get_mut("items") {
        *items = draft4_document(items.take());
    }
    Value::Object(obj)
}

/// Maps a `jsonschema` error onto an [`Issue`].
///
/// Type errors on literals and enum errors on non-strings are dropped, since
/// the sibling error already describes the failure.
fn to_issue(schema: &Schema, err: &jsonschema::ValidationError<'_>) -> Option<Issue> {
    let mut path = err
        .instance_path
        .iter()
        .map(|chunk| match chunk {
            PathChunk::Property(key) => PathSegment::Key(key.to_string()),
            PathChunk::Index(i) => PathSegment::Index(*i),
            PathChunk::Keyword(keyword) => PathSegment::Key((*keyword).to_string()),
        })
        .collect::<Vec<_>>();
    let node = schema_at(schema, &path);
    let leaf = node.map(Schema::unwrap);
    let instance: &Value = &err.instance;

    match &err.kind {
        ValidationErrorKind::Required { property } => {
            let name = property.as_str()?.to_string();
            let expected = leaf
                .and_then(Schema::as_object)
                .and_then(|obj| obj.fields.get(&name))
                .map_or_else(|| "unknown".to_string(), type_name);
            path.push(PathSegment::Key(name));
            Some(Issue {
                code: IssueCode::InvalidType,
                expected: Some(expected),
                received: Some("undefined".into()),
                path,
                message: "Required".into(),
            })
        }
        ValidationErrorKind::Type { .. } => {
            if let Some(Schema::Literal(_)) = leaf {
                return None;
            }
            let expected = match leaf {
                Some(Schema::Enum(options)) => enum_options(options),
                Some(other) => type_name(other),
                None => "unknown".into(),
            };
            let received = received_name(leaf, instance);
            Some(Issue {
                code: IssueCode::InvalidType,
                message: format!("Expected {}, received {}", expected, received),
                expected: Some(expected),
                received: Some(received.into()),
                path,
            })
        }
        ValidationErrorKind::Enum { .. } => match (leaf, instance) {
            (Some(Schema::Literal(expected)), _) => Some(Issue {
                code: IssueCode::InvalidLiteral,
                expected: Some(expected.to_string()),
                received: None,
                path,
                message: format!("Invalid literal value, expected {}", expected),
            }),
            (Some(Schema::Enum(options)), Value::String(s)) => Some(Issue {
                code: IssueCode::InvalidEnumValue,
                expected: None,
                received: None,
                path,
                message: format!(
                    "Invalid enum value. Expected {}, received '{}'",
                    enum_options(options),
                    s
                ),
            }),
            (Some(Schema::Enum(_)), _) => None,
            _ => Some(fallback_issue(path, err)),
        },
        _ => Some(fallback_issue(path, err)),
    }
}

fn fallback_issue(path: Vec<PathSegment>, err: &jsonschema::ValidationError<'_>) -> Issue {
    Issue {
        code: IssueCode::InvalidType,
        expected: None,
        received: None,
        path,
        message: err.to_string(),
    }
}

fn schema_at<'s>(schema: &'s Schema, path: &[PathSegment]) -> Option<&'s Schema> {
    path.iter()
        .try_fold(schema, |node, segment| match (node.unwrap(), segment) {
            (Schema::Object(obj), PathSegment::Key(key)) => obj.fields.get(key),
            (Schema::Array(items), PathSegment::Index(_)) => Some(&**items),
            _ => None,
        })
}

/// Sort key placing issues in field declaration order, then array order.
fn field_order(schema: &Schema, path: &[PathSegment]) -> Vec<usize> {
    let mut node = Some(schema);
    path.iter()
        .map(|segment| {
            let (position, next) = match (node.map(Schema::unwrap), segment) {
                (Some(Schema::Object(obj)), PathSegment::Key(key)) => match obj.fields.get_full(key) {
                    Some((i, _, field)) => (i, Some(field)),
                    None => (usize::MAX, None),
                },
                (Some(Schema::Array(items)), PathSegment::Index(i)) => (*i, Some(&**items)),
                (_, PathSegment::Index(i)) => (*i, None),
                _ => (usize::MAX, None),
            };
            node = next;
            position
        })
        .collect()
}

fn enum_options(options: &[String]) -> String {
    options
        .iter()
        .map(|o| format!("'{}'", o))
        .collect::<Vec<_>>()
        .join(" | ")
}

fn type_name(schema: &Schema) -> String {
    match schema.unwrap() {
        Schema::String { .. } | Schema::Enum(_) => "string".into(),
        Schema::Number { .. } => "number".into(),
        Schema::Integer { .. } => "integer".into(),
        Schema::Boolean { .. } => "boolean".into(),
        Schema::Date { .. } => "date".into(),
        Schema::Literal(v) => v.to_string(),
        Schema::Array(_) => "array".into(),
        Schema::Object(_) => "object".into(),
        Schema::Void => "void".into(),
        _ => "unknown".into(),
    }
}

/// Name of the received value. Strings left over by a failed numeric
/// coercion read as `nan`, and fractional numbers given to an integer as
/// `float`.
fn received_name(leaf: Option<&Schema>, value: &Value) -> &'static str {
    match (leaf, value) {
        (
            Some(Schema::Number { coerce: true } | Schema::Integer { coerce: true }),
            Value::String(_),
        ) => "nan",
        (Some(Schema::Integer { .. }), Value::Number(_)) => "float",
        (_, Value::Null) => "null",
        (_, Value::Bool(_)) => "boolean",
        (_, Value::Number(_)) => "number",
        (_, Value::String(_)) => "string",
        (_, Value::Array(_)) => "array",
        (_, Value::Object(_)) => "object",
    }
}

fn coerce_number(raw: &str) -> Option<Number> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Ok(i) = trimmed.parse::<i64>() {
        return Some(Number::from(i));
    }
    if let Ok(u) = trimmed.parse::<u64>() {
        return Some(Number::from(u));
    }
    trimmed.parse::<f64>().ok().and_then(Number::from_f64)
}

fn coerce_integer(value: Value, coerce: bool) -> Value {
    let number = match value {
        Value::Number(n) => n,
        Value::String(s) if coerce => match coerce_number(&s) {
            Some(n) => n,
            None => return Value::String(s),
        },
        other => return other,
    };
    Value::Number(integral(number))
}

/// Rewrites an integral float (`5.0`, `1e2`) as an integer `Number`.
///
/// Fractional and out-of-range values are returned unchanged.
fn integral(n: Number) -> Number {
    match n.as_f64() {
        Some(f) if n.is_f64() && f.fract() == 0.0 => {
            if f >= i64::MIN as f64 && f < i64::MAX as f64 {
                Number::from(f as i64)
            } else if f >= 0.0 && f < u64::MAX as f64 {
                Number::from(f as u64)
            } else {
                n
            }
        }
        _ => n,
    }
}

fn parse_date(raw: &str, coerce: bool) -> Option<String> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(if coerce {
            dt.with_timezone(&Utc)
                .to_rfc3339_opts(SecondsFormat::Millis, true)
        } else {
            raw.to_string()
        });
    }
    if !coerce {
        return None;
    }
    let date = NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").ok()?;
    let midnight = date.and_hms_opt(0, 0, 0)?.and_utc();
    Some(midnight.to_rfc3339_opts(SecondsFormat::Millis, true))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parse(schema: &Schema, value: Value) -> Result<Option<Value>, ValidationError> {
        schema.compile().unwrap().parse(Some(value))
    }

    fn user_schema() -> Schema {
        Schema::object([
            ("id", Schema::integer()),
            ("name", Schema::string()),
            ("role", Schema::enumeration(["admin", "member"]).with_default("member")),
            ("nickname", Schema::string().optional()),
        ])
    }

    #[test]
    fn test_object_strips_unknown_and_applies_default() {
        let out = parse(&user_schema(), json!({"id": 1, "name": "Ada", "extra": true})).unwrap();
        assert_eq!(out, Some(json!({"id": 1, "name": "Ada", "role": "member"})));
    }

    #[test]
    fn test_missing_required_field_reports_required() {
        let err = parse(&user_schema(), json!({"id": 1})).unwrap_err();
        assert_eq!(err.issues().len(), 1);
        let issue = &err.issues()[0];
        assert_eq!(issue.code, IssueCode::InvalidType);
        assert_eq!(issue.message, "Required");
        assert_eq!(issue.path, vec![PathSegment::Key("name".into())]);
        assert_eq!(issue.expected.as_deref(), Some("string"));
        assert_eq!(issue.received.as_deref(), Some("undefined"));
    }

    #[test]
    fn test_absent_root() {
        let err = Schema::number().compile().unwrap().parse(None).unwrap_err();
        assert_eq!(err.issues()[0].message, "Required");
        assert!(err.issues()[0].path.is_empty());

        let defaulted = Schema::number().with_default(3).compile().unwrap();
        assert_eq!(defaulted.parse(None).unwrap(), Some(json!(3)));
    }

    #[test]
    fn test_uncoerced_number_rejects_string() {
        let err = parse(&Schema::number(), json!("5")).unwrap_err();
        assert_eq!(err.issues()[0].message, "Expected number, received string");
    }

    #[test]
    fn test_coerced_scalars() {
        let schema = Schema::object([
            ("n", Schema::number()),
            ("i", Schema::integer()),
            ("b", Schema::boolean()),
            ("d", Schema::date()),
        ])
        .with_coercion();
        let out = parse(&schema, json!({"n": "1.5", "i": "42", "b": "false", "d": "2024-03-01"}))
            .unwrap();
        assert_eq!(
            out,
            Some(json!({"n": 1.5, "i": 42, "b": false, "d": "2024-03-01T00:00:00.000Z"}))
        );
    }

    #[test]
    fn test_coerced_integer_rejects_fraction_and_garbage() {
        let schema = Schema::object([("i", Schema::integer())]).with_coercion();
        let err = parse(&schema, json!({"i": "4.2"})).unwrap_err();
        assert_eq!(err.issues()[0].message, "Expected integer, received float");

        let err = parse(&schema, json!({"i": "abc"})).unwrap_err();
        assert_eq!(err.issues()[0].message, "Expected integer, received nan");
    }

    #[test]
    fn test_integral_floats_become_integers() {
        let schema = Schema::object([("i", Schema::integer())]).with_coercion();
        for raw in ["5.0", "1e2", " 7 "] {
            let out = parse(&schema, json!({ "i": raw })).unwrap().unwrap();
            assert!(out["i"].is_i64(), "{} -> {}", raw, out);
        }
        assert_eq!(parse(&schema, json!({"i": "1e2"})).unwrap(), Some(json!({"i": 100})));

        // JSON bodies are not coerced, but an integral float is still an integer.
        let out = parse(&Schema::integer(), json!(5.0)).unwrap().unwrap();
        assert!(out.is_i64());
        assert_eq!(out, json!(5));

        let err = parse(&Schema::integer(), json!(5.5)).unwrap_err();
        assert_eq!(err.issues()[0].message, "Expected integer, received float");
    }

    #[test]
    fn test_invalid_date() {
        let schema = Schema::object([("d", Schema::date())]);
        let err = parse(&schema, json!({"d": "yesterday"})).unwrap_err();
        assert_eq!(err.issues().len(), 1);
        assert_eq!(err.issues()[0].code, IssueCode::InvalidDate);
        assert_eq!(err.issues()[0].path, vec![PathSegment::Key("d".into())]);
    }

    #[test]
    fn test_invalid_enum_value() {
        let err = parse(&Schema::enumeration(["a", "b"]), json!("c")).unwrap_err();
        assert_eq!(err.issues()[0].code, IssueCode::InvalidEnumValue);
        assert_eq!(
            err.issues()[0].message,
            "Invalid enum value. Expected 'a' | 'b', received 'c'"
        );

        let err = parse(&Schema::enumeration(["a", "b"]), json!(1)).unwrap_err();
        assert_eq!(err.issues().len(), 1);
        assert_eq!(err.issues()[0].message, "Expected 'a' | 'b', received number");
    }

    #[test]
    fn test_invalid_literal() {
        let err = parse(&Schema::literal("ok"), json!(false)).unwrap_err();
        assert_eq!(err.issues().len(), 1);
        assert_eq!(err.issues()[0].code, IssueCode::InvalidLiteral);
        assert_eq!(err.issues()[0].message, "Invalid literal value, expected \"ok\"");
    }

    #[test]
    fn test_array_paths_and_multiple_issues() {
        let schema = Schema::object([("tags", Schema::array(Schema::string()))]);
        let err = parse(&schema, json!({"tags": ["ok", 1, false]})).unwrap_err();
        let paths = err
            .issues()
            .iter()
            .map(|i| i.path.clone())
            .collect::<Vec<_>>();
        assert_eq!(
            paths,
            vec![
                vec![PathSegment::Key("tags".into()), PathSegment::Index(1)],
                vec![PathSegment::Key("tags".into()), PathSegment::Index(2)],
            ]
        );
        assert_eq!(err.to_string(), "tags.1: Expected string, received number; tags.2: Expected string, received boolean");
    }

    #[test]
    fn test_issues_follow_field_order() {
        let schema = Schema::object([
            ("a", Schema::string()),
            ("b", Schema::string()),
            ("c", Schema::number()),
        ]);
        let err = parse(&schema, json!({"c": "x", "b": 1})).unwrap_err();
        let messages = err
            .issues()
            .iter()
            .map(|i| (i.path.clone(), i.message.as_str()))
            .collect::<Vec<_>>();
        assert_eq!(
            messages,
            vec![
                (vec![PathSegment::Key("a".into())], "Required"),
                (vec![PathSegment::Key("b".into())], "Expected string, received number"),
                (vec![PathSegment::Key("c".into())], "Expected number, received string"),
            ]
        );
    }

    #[test]
    fn test_nested_objects_are_stripped() {
        let schema = Schema::object([(
            "owner",
            Schema::object([("name", Schema::string())]),
        )]);
        let out = parse(&schema, json!({"owner": {"name": "Ada", "age": 3}})).unwrap();
        assert_eq!(out, Some(json!({"owner": {"name": "Ada"}})));
    }

    #[test]
    fn test_void_and_nullable() {
        let void = Schema::Void.compile().unwrap();
        assert_eq!(void.parse(None).unwrap(), None);
        assert!(void.parse(Some(json!({}))).is_err());
        assert_eq!(
            parse(&Schema::string().nullable(), Value::Null).unwrap(),
            Some(Value::Null)
        );
        assert_eq!(
            parse(&Schema::enumeration(["a"]).nullable(), Value::Null).unwrap(),
            Some(Value::Null)
        );
        assert!(parse(&Schema::string(), Value::Null).is_err());
    }

    #[test]
    fn test_formats_are_not_enforced() {
        let schema = Schema::string().with_format("email");
        assert_eq!(parse(&schema, json!("nope")).unwrap(), Some(json!("nope")));
    }

    #[test]
    fn test_issue_wire_shape() {
        let err = parse(&Schema::object([("id", Schema::number())]), json!({"id": "x"}))
            .unwrap_err();
        let json = serde_json::to_value(err.issues()).unwrap();
        assert_eq!(
            json,
            json!([{
                "code": "invalid_type",
                "expected": "number",
                "received": "string",
                "path": ["id"],
                "message": "Expected number, received string"
            }])
        );
    }
}
