//! dataform-compiler CLI
//!
//! Usage: dataform-compiler <COMMAND>
//!
//! Commands:
//!   compile  Compile a project into its dependency graph
//!   parse    Print the blocks extracted from one SQL-template file

mod cli;
mod commands;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands};

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Compile {
            dir,
            vars,
            default_database,
            default_schema,
            default_location,
            database_suffix,
            schema_suffix,
            table_prefix,
        } => {
            let overrides = dataform_compiler::ProjectConfigOverride {
                default_database,
                default_schema,
                default_location,
                database_suffix,
                schema_suffix,
                table_prefix,
                vars: vars.into_iter().collect(),
                ..Default::default()
            };
            commands::compile::cmd_compile(&dir, overrides, cli.json)
        }
        Commands::Parse { file } => commands::parse::cmd_parse(&file, cli.json),
    }
}

/// `RUST_LOG` wins over `-v`; logs go to stderr
fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
