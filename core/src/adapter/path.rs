//! # Path Patterns
//!
//! Normalization of request paths and compiled route templates with named
//! parameter slots (`/users/{id}` or `/users/:id`).

use crate::error::{AppError, AppResult};
use indexmap::IndexMap;
use regex::Regex;
use std::sync::OnceLock;

/// Parameter name to raw (undecoded) segment value.
pub type PathInput = IndexMap<String, String>;

/// Collapses repeated slashes, drops the trailing slash and ensures a leading one.
///
/// `"//users//5/"` becomes `"/users/5"`; the empty path becomes `"/"`.
pub fn normalize_path(path: &str) -> String {
    let segments = split_segments(path);
    format!("/{}", segments.join("/"))
}

/// Non-empty segments of a path.
pub fn split_segments(path: &str) -> Vec<&str> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Param(String),
}

/// A route template compiled into fixed segments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathPattern {
    segments: Vec<Segment>,
}

impl PathPattern {
    /// Compiles a template. Fails on malformed or repeated parameter names.
    pub fn parse(path: &str) -> AppResult<Self> {
        static PARAM_RE: OnceLock<Regex> = OnceLock::new();
        let param_re = PARAM_RE
            .get_or_init(|| Regex::new(r"^(?:\{(\w+)\}|:(\w+))$").expect("Invalid regex constant"));

        let mut segments = Vec::new();
        for raw in split_segments(path) {
            if let Some(caps) = param_re.captures(raw) {
                let name = caps
                    .get(1)
                    .or_else(|| caps.get(2))
                    .map(|m| m.as_str().to_string())
                    .unwrap_or_default();
                if segments.contains(&Segment::Param(name.clone())) {
                    return Err(AppError::Config(format!(
                        "Path \"{}\" declares parameter \"{}\" more than once",
                        path, name
                    )));
                }
                segments.push(Segment::Param(name));
            } else if raw.contains(['{', '}']) || raw.starts_with(':') {
                return Err(AppError::Config(format!(
                    "Path \"{}\" has a malformed parameter segment \"{}\"",
                    path, raw
                )));
            } else {
                segments.push(Segment::Literal(raw.to_string()));
            }
        }
        Ok(Self { segments })
    }

    /// Normalized template with `{name}` parameter slots.
    pub fn template(&self) -> String {
        let parts = self
            .segments
            .iter()
            .map(|segment| match segment {
                Segment::Literal(lit) => lit.clone(),
                Segment::Param(name) => format!("{{{}}}", name),
            })
            .collect::<Vec<_>>();
        format!("/{}", parts.join("/"))
    }

    /// Template with parameter names erased. Two patterns with the same shape
    /// match exactly the same paths.
    pub fn shape(&self) -> String {
        let parts = self
            .segments
            .iter()
            .map(|segment| match segment {
                Segment::Literal(lit) => lit.as_str(),
                Segment::Param(_) => "{}",
            })
            .collect::<Vec<_>>();
        format!("/{}", parts.join("/"))
    }

    /// Parameter names in template order.
    pub fn parameters(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|segment| match segment {
            Segment::Param(name) => Some(name.as_str()),
            Segment::Literal(_) => None,
        })
    }

    /// Number of segments.
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// True for the root template `/`.
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Matches already-split request segments.
    ///
    /// Literals compare case-sensitively; parameters capture the raw segment.
    pub fn matches(&self, segments: &[&str]) -> Option<PathInput> {
        if segments.len() != self.segments.len() {
            return None;
        }
        let mut input = PathInput::new();
        for (pattern, actual) in self.segments.iter().zip(segments) {
            match pattern {
                Segment::Literal(lit) if lit == actual => {}
                Segment::Literal(_) => return None,
                Segment::Param(name) => {
                    input.insert(name.clone(), (*actual).to_string());
                }
            }
        }
        Some(input)
    }
}
