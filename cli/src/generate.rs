#![deny(missing_docs)]

//! # Generate Command
//!
//! Writes the OpenAPI document of the demo router to disk. The output format
//! follows the file extension: `.yaml`/`.yml` emit YAML, anything else JSON.

use crate::error::{CliError, CliResult};
use rpc_rest_core::{generate_openapi_document, GenerateOpenApiDocumentOptions, Router};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};

/// Arguments for the generate command.
#[derive(clap::Args, Debug, Clone)]
pub struct GenerateArgs {
    /// Output path for the document (e.g. docs/openapi.yaml).
    #[clap(long, short, default_value = "openapi.json")]
    pub output: PathBuf,

    /// `info.title` of the document.
    #[clap(long, env = "RPC_REST_TITLE", default_value = "RPC REST demo")]
    pub title: String,

    /// `info.description` of the document.
    #[clap(long, env = "RPC_REST_DESCRIPTION")]
    pub description: Option<String>,

    /// `info.version` of the document.
    #[clap(long, env = "RPC_REST_DOC_VERSION", default_value = "1.0.0")]
    pub version: String,

    /// URL of the single server entry.
    #[clap(long, env = "RPC_REST_BASE_URL", default_value = "http://127.0.0.1:8080")]
    pub base_url: String,

    /// URL of external documentation.
    #[clap(long, env = "RPC_REST_DOCS_URL")]
    pub docs_url: Option<String>,

    /// Top-level tag; repeat for several.
    #[clap(long = "tag", env = "RPC_REST_TAGS", value_delimiter = ',')]
    pub tags: Vec<String>,
}

impl GenerateArgs {
    fn options(&self) -> GenerateOpenApiDocumentOptions {
        let mut options =
            GenerateOpenApiDocumentOptions::new(&self.title, &self.version, &self.base_url);
        if let Some(description) = &self.description {
            options = options.with_description(description);
        }
        if let Some(docs_url) = &self.docs_url {
            options = options.with_docs_url(docs_url);
        }
        for tag in &self.tags {
            options = options.with_tag(tag);
        }
        options
    }
}

/// Document encodings selected by output extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Pretty-printed JSON.
    Json,
    /// YAML.
    Yaml,
}

impl OutputFormat {
    /// Picks the format for `path`.
    pub fn for_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml") => {
                OutputFormat::Yaml
            }
            _ => OutputFormat::Json,
        }
    }

    /// Encodes the document.
    pub fn render(self, document: &Value) -> CliResult<String> {
        match self {
            OutputFormat::Json => {
                let mut out = serde_json::to_string_pretty(document)?;
                out.push('\n');
                Ok(out)
            }
            OutputFormat::Yaml => Ok(serde_yaml::to_string(document)?),
        }
    }
}

/// Executes the generation.
///
/// # Arguments
///
/// * `args` - Command arguments.
/// * `router` - The procedures to document.
pub fn execute<Ctx>(args: &GenerateArgs, router: &Router<Ctx>) -> CliResult<()> {
    let document = generate_openapi_document(router, &args.options())?;
    let format = OutputFormat::for_path(&args.output);
    let rendered = format.render(&document)?;

    if let Some(parent) = args.output.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| {
            CliError::General(format!("Failed to create output dir {:?}: {}", parent, e))
        })?;
    }
    fs::write(&args.output, rendered)?;

    tracing::debug!(path = ?args.output, ?format, "Document written");
    println!("Generated OpenAPI document at {:?}", args.output);
    Ok(())
}
