#![deny(missing_docs)]

//! # Routes Command
//!
//! Prints the REST route table the adapter would serve.

use crate::error::CliResult;
use rpc_rest_core::openapi::paths::route_table;
use rpc_rest_core::Router;

/// Arguments for the routes command.
#[derive(clap::Args, Debug, Clone)]
pub struct RoutesArgs {
    /// Prefix shown in front of every template (e.g. `/api`).
    #[clap(long, env = "RPC_REST_ENDPOINT", default_value = "")]
    pub endpoint: String,
}

/// Renders one line per exposed procedure: method, template, path and kind.
pub fn render<Ctx>(args: &RoutesArgs, router: &Router<Ctx>) -> CliResult<String> {
    let prefix = args.endpoint.trim_end_matches('/');
    let rows = route_table(router)?
        .into_iter()
        .map(|(method, template, path, kind)| {
            let template = match (prefix.is_empty(), template.as_str()) {
                (true, _) => template,
                (false, "/") => prefix.to_string(),
                (false, _) => format!("{}{}", prefix, template),
            };
            (method, template, path, kind)
        })
        .collect::<Vec<_>>();

    let width = rows.iter().map(|(_, t, _, _)| t.len()).max().unwrap_or(0);
    let mut out = String::new();
    for (method, template, path, kind) in rows {
        out.push_str(&format!(
            "{:<7}{:<width$}  {} ({})\n",
            method,
            template,
            path,
            kind,
            width = width
        ));
    }
    Ok(out)
}

/// Executes the listing.
pub fn execute<Ctx>(args: &RoutesArgs, router: &Router<Ctx>) -> CliResult<()> {
    print!("{}", render(args, router)?);
    Ok(())
}
