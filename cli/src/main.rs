#![deny(missing_docs)]

//! # RPC REST CLI
//!
//! Command Line Interface for the REST adapter.
//!
//! Supported Commands:
//! - `generate`: Writes the OpenAPI document (JSON or YAML).
//! - `routes`: Lists the method and path of every exposed procedure.

use clap::{Parser, Subcommand};
use rpc_rest_web::{demo::demo_router, logging};

use crate::error::CliResult;

mod error;
mod generate;
mod routes;

#[derive(Parser, Debug)]
#[clap(author, about = "RPC procedures as REST endpoints")]
struct Cli {
    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Generate the OpenAPI document of the demo router.
    Generate(generate::GenerateArgs),
    /// Print the REST route table of the demo router.
    Routes(routes::RoutesArgs),
}

fn main() -> CliResult<()> {
    logging::init();
    let cli = Cli::parse();
    let router = demo_router();

    match &cli.command {
        Commands::Generate(args) => generate::execute(args, &router)?,
        Commands::Routes(args) => routes::execute(args, &router)?,
    }

    Ok(())
}
