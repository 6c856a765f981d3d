#![deny(missing_docs)]

//! # Schema Model
//!
//! Describes the shape of procedure inputs and outputs.
//! The same description drives three things:
//! - **validate**: coercing wire values and checking them with a compiled
//!   `jsonschema` validator before a procedure runs.
//! - **openapi**: rendering OpenAPI 3.0 schema objects for the document generator.
//! - coercion: [`Schema::with_coercion`] derives the copy used for REST input.

pub mod openapi;
pub mod validate;

pub use validate::{CompiledSchema, Issue, IssueCode, PathSegment, ValidationError};

use indexmap::IndexMap;
use serde_json::Value;

/// A schema node.
///
/// Scalars that can be derived from a string carry a `coerce` flag. The flag is
/// never set on shared definitions at request time; see [`Schema::with_coercion`].
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Schema {
    /// Accepts only the absence of a value.
    #[default]
    Void,
    /// Accepts anything.
    Unknown,
    /// A string, optionally annotated with a format (e.g. `email`, `uuid`).
    String {
        /// OpenAPI `format` hint.
        format: Option<String>,
    },
    /// Any JSON number.
    Number {
        /// Convert numeric strings before validation.
        coerce: bool,
    },
    /// A JSON number without a fractional part.
    Integer {
        /// Convert integral strings before validation.
        coerce: bool,
    },
    /// A JSON boolean.
    Boolean {
        /// Convert `"true"` / `"false"` before validation.
        coerce: bool,
    },
    /// An RFC 3339 date-time string.
    Date {
        /// Accept bare dates and normalize to RFC 3339.
        coerce: bool,
    },
    /// One of a fixed set of strings.
    Enum(Vec<String>),
    /// Exactly this value.
    Literal(Value),
    /// A homogeneous array.
    Array(Box<Schema>),
    /// An object with known fields; unknown keys are stripped.
    Object(ObjectSchema),
    /// The value may be absent.
    Optional(Box<Schema>),
    /// The value may be `null`.
    Nullable(Box<Schema>),
    /// Absent values are replaced by `value`.
    Default {
        /// Wrapped schema.
        inner: Box<Schema>,
        /// Value used when the input is absent.
        value: Value,
    },
    /// Documentation carried into the OpenAPI document.
    Described {
        /// Wrapped schema.
        inner: Box<Schema>,
        /// Human readable description.
        description: String,
    },
}

/// Fields of an object schema, in declaration order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ObjectSchema {
    /// Field name to field schema.
    pub fields: IndexMap<String, Schema>,
}

impl ObjectSchema {
    /// Returns the schema of a field.
    pub fn get(&self, name: &str) -> Option<&Schema> {
        self.fields.get(name)
    }

    /// Returns a copy without the named fields.
    pub fn omit<'a>(&self, names: impl IntoIterator<Item = &'a str>) -> ObjectSchema {
        let mut fields = self.fields.clone();
        for name in names {
            fields.shift_remove(name);
        }
        ObjectSchema { fields }
    }
}

impl Schema {
    /// A plain string.
    pub fn string() -> Self {
        Schema::String { format: None }
    }

    /// A number.
    pub fn number() -> Self {
        Schema::Number { coerce: false }
    }

    /// An integer.
    pub fn integer() -> Self {
        Schema::Integer { coerce: false }
    }

    /// A boolean.
    pub fn boolean() -> Self {
        Schema::Boolean { coerce: false }
    }

    /// A date-time.
    pub fn date() -> Self {
        Schema::Date { coerce: false }
    }

    /// One of the given strings.
    pub fn enumeration<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Schema::Enum(values.into_iter().map(Into::into).collect())
    }

    /// Exactly the given value.
    pub fn literal(value: impl Into<Value>) -> Self {
        Schema::Literal(value.into())
    }

    /// An array of `items`.
    pub fn array(items: Schema) -> Self {
        Schema::Array(Box::new(items))
    }

    /// An object with the given fields.
    pub fn object<I, K>(fields: I) -> Self
    where
        I: IntoIterator<Item = (K, Schema)>,
        K: Into<String>,
    {
        Schema::Object(ObjectSchema {
            fields: fields.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        })
    }

    /// Marks the schema optional.
    pub fn optional(self) -> Self {
        Schema::Optional(Box::new(self))
    }

    /// Marks the schema nullable.
    pub fn nullable(self) -> Self {
        Schema::Nullable(Box::new(self))
    }

    /// Supplies a default used when the value is absent.
    pub fn with_default(self, value: impl Into<Value>) -> Self {
        Schema::Default {
            inner: Box::new(self),
            value: value.into(),
        }
    }

    /// Attaches a description.
    pub fn describe(self, description: impl Into<String>) -> Self {
        Schema::Described {
            inner: Box::new(self),
            description: description.into(),
        }
    }

    /// Sets the format of a string schema. Other schemas are returned unchanged.
    pub fn with_format(self, format: impl Into<String>) -> Self {
        match self {
            Schema::String { .. } => Schema::String {
                format: Some(format.into()),
            },
            other => other,
        }
    }

    /// Peels `Optional`, `Nullable`, `Default` and `Described` wrappers.
    pub fn unwrap(&self) -> &Schema {
        match self {
            Schema::Optional(inner) | Schema::Nullable(inner) => inner.unwrap(),
            Schema::Default { inner, .. } | Schema::Described { inner, .. } => inner.unwrap(),
            leaf => leaf,
        }
    }

    /// The nearest description found while peeling wrappers.
    pub fn description(&self) -> Option<&str> {
        match self {
            Schema::Described { description, .. } => Some(description),
            Schema::Optional(inner) | Schema::Nullable(inner) => inner.description(),
            Schema::Default { inner, .. } => inner.description(),
            _ => None,
        }
    }

    /// True when the schema accepts an absent value.
    pub fn is_optional(&self) -> bool {
        match self {
            Schema::Optional(_) | Schema::Default { .. } | Schema::Void | Schema::Unknown => true,
            Schema::Nullable(inner) | Schema::Described { inner, .. } => inner.is_optional(),
            _ => false,
        }
    }

    /// True when the schema is structurally "no input".
    pub fn is_void_like(&self) -> bool {
        matches!(self.unwrap(), Schema::Void)
    }

    /// The object definition, once wrappers are peeled.
    pub fn as_object(&self) -> Option<&ObjectSchema> {
        match self.unwrap() {
            Schema::Object(obj) => Some(obj),
            _ => None,
        }
    }

    /// True for leaves that are carried as strings on the wire.
    pub fn is_string_like(&self) -> bool {
        match self.unwrap() {
            Schema::String { .. } | Schema::Enum(_) => true,
            Schema::Literal(value) => value.is_string(),
            _ => false,
        }
    }

    /// True for leaves that can be derived from a string.
    pub fn is_coercible(&self) -> bool {
        matches!(
            self.unwrap(),
            Schema::Number { .. }
                | Schema::Integer { .. }
                | Schema::Boolean { .. }
                | Schema::Date { .. }
        )
    }

    /// Derives the copy used for REST input.
    ///
    /// Every top-level object field whose leaf is coercible gets `coerce = true`.
    /// Nested objects are left untouched. The receiver is not modified.
    pub fn with_coercion(&self) -> Schema {
        self.map_leaf(&|leaf| match leaf {
            Schema::Object(obj) => Schema::Object(ObjectSchema {
                fields: obj
                    .fields
                    .iter()
                    .map(|(name, field)| (name.clone(), field.map_leaf(&coerce_scalar)))
                    .collect(),
            }),
            other => other.clone(),
        })
    }

    /// Rebuilds the wrapper chain around `f(leaf)`.
    fn map_leaf(&self, f: &dyn Fn(&Schema) -> Schema) -> Schema {
        match self {
            Schema::Optional(inner) => Schema::Optional(Box::new(inner.map_leaf(f))),
            Schema::Nullable(inner) => Schema::Nullable(Box::new(inner.map_leaf(f))),
            Schema::Default { inner, value } => Schema::Default {
                inner: Box::new(inner.map_leaf(f)),
                value: value.clone(),
            },
            Schema::Described { inner, description } => Schema::Described {
                inner: Box::new(inner.map_leaf(f)),
                description: description.clone(),
            },
            leaf => f(leaf),
        }
    }
}

fn coerce_scalar(leaf: &Schema) -> Schema {
    match leaf {
        Schema::Number { .. } => Schema::Number { coerce: true },
        Schema::Integer { .. } => Schema::Integer { coerce: true },
        Schema::Boolean { .. } => Schema::Boolean { coerce: true },
        Schema::Date { .. } => Schema::Date { coerce: true },
        other => other.clone(),
    }
}
