use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Compiler for SQL workflow projects
#[derive(Parser, Debug)]
#[command(name = "dataform-compiler")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Print machine-readable JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Compile a project into its dependency graph (exits non-zero on errors)
    Compile {
        /// Project root containing workflow_settings.yaml
        #[arg(default_value = ".")]
        dir: PathBuf,

        /// Project variables (key=value, comma separated)
        #[arg(long, value_delimiter = ',', value_parser = parse_var)]
        vars: Vec<(String, String)>,

        /// Override the default database (project)
        #[arg(long)]
        default_database: Option<String>,

        /// Override the default schema (dataset)
        #[arg(long)]
        default_schema: Option<String>,

        /// Override the default location
        #[arg(long)]
        default_location: Option<String>,

        /// Suffix appended to the default database
        #[arg(long)]
        database_suffix: Option<String>,

        /// Suffix appended to the default schema
        #[arg(long)]
        schema_suffix: Option<String>,

        /// Prefix prepended to every action name except declarations
        #[arg(long)]
        table_prefix: Option<String>,
    },

    /// Print the blocks extracted from one SQL-template file (debugging)
    Parse {
        /// Path to a .sqlx file
        file: PathBuf,
    },
}

fn parse_var(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("expected key=value, got '{}'", raw)),
    }
}
