//! # Procedure Router
//!
//! An ordered registry from dotted procedure path (`users.get`) to procedure.

use super::{OpenApiMeta, Procedure, RpcError};
use indexmap::IndexMap;
use std::fmt;
use std::sync::Arc;

/// Produces the display message for an error, given the context if one was created.
pub type ErrorFormatter<Ctx> = Arc<dyn Fn(&RpcError, Option<&Ctx>) -> Option<String> + Send + Sync>;

/// The procedure registry.
pub struct Router<Ctx> {
    procedures: IndexMap<String, Arc<Procedure<Ctx>>>,
    error_formatter: Option<ErrorFormatter<Ctx>>,
}

impl<Ctx> Default for Router<Ctx> {
    fn default() -> Self {
        Self {
            procedures: IndexMap::new(),
            error_formatter: None,
        }
    }
}

impl<Ctx> fmt::Debug for Router<Ctx> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Router")
            .field("procedures", &self.procedures.keys().collect::<Vec<_>>())
            .field("error_formatter", &self.error_formatter.is_some())
            .finish()
    }
}

impl<Ctx> Router<Ctx> {
    /// An empty router.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a procedure under `path`.
    ///
    /// A later registration under the same path replaces the earlier one.
    pub fn procedure(mut self, path: impl Into<String>, procedure: Procedure<Ctx>) -> Self {
        let path = path.into();
        if self
            .procedures
            .insert(path.clone(), Arc::new(procedure))
            .is_some()
        {
            tracing::warn!(procedure = %path, "procedure registered twice; keeping the latest");
        }
        self
    }

    /// Nests every procedure of `other` under `prefix.`.
    ///
    /// The nested router's error formatter is dropped; the outer one applies.
    pub fn merge(mut self, prefix: &str, other: Router<Ctx>) -> Self {
        for (path, procedure) in other.procedures {
            let full = if prefix.is_empty() {
                path
            } else {
                format!("{}.{}", prefix, path)
            };
            if self.procedures.insert(full.clone(), procedure).is_some() {
                tracing::warn!(procedure = %full, "procedure registered twice; keeping the latest");
            }
        }
        self
    }

    /// Installs the formatter that yields display messages for errors.
    pub fn with_error_formatter<F>(mut self, formatter: F) -> Self
    where
        F: Fn(&RpcError, Option<&Ctx>) -> Option<String> + Send + Sync + 'static,
    {
        self.error_formatter = Some(Arc::new(formatter));
        self
    }

    /// Looks up a procedure by dotted path.
    pub fn get(&self, path: &str) -> Option<&Arc<Procedure<Ctx>>> {
        self.procedures.get(path)
    }

    /// All procedures in registration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Arc<Procedure<Ctx>>)> {
        self.procedures.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Procedures exposed over REST, in registration order.
    pub fn openapi_procedures(
        &self,
    ) -> impl Iterator<Item = (&str, &Arc<Procedure<Ctx>>, &OpenApiMeta)> {
        self.iter()
            .filter_map(|(path, procedure)| procedure.openapi().map(|meta| (path, procedure, meta)))
    }

    /// Number of registered procedures.
    pub fn len(&self) -> usize {
        self.procedures.len()
    }

    /// True when nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.procedures.is_empty()
    }

    /// The installed error formatter.
    pub fn error_formatter(&self) -> Option<&ErrorFormatter<Ctx>> {
        self.error_formatter.as_ref()
    }
}

/// The display message `formatter` produces for `error`, if one is installed.
pub fn format_error<Ctx>(
    formatter: Option<&ErrorFormatter<Ctx>>,
    error: &RpcError,
    ctx: Option<&Ctx>,
) -> Option<String> {
    formatter.and_then(|formatter| formatter(error, ctx))
}
