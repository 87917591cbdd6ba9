//! CLI argument definitions using clap
//!
//! Commands:
//! - ghg-api serve [--config <path>]
//! - ghg-api query [--config <path>] [--method <verb>] <route>
//! - ghg-api explain [--config <path>] [--body <json>] <endpoint>

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// ghg-api - Query service for the greenhouse-gas facility dataset
#[derive(Parser, Debug)]
#[command(name = "ghg-api")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start the HTTP server
    Serve {
        /// Path to configuration file; environment variables override it
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Answer one request read from stdin and exit
    Query {
        /// Path to configuration file; environment variables override it
        #[arg(long)]
        config: Option<PathBuf>,

        /// HTTP method of the request
        #[arg(long, default_value = "POST")]
        method: String,

        /// Route, e.g. /api/list/sectors
        route: String,
    },

    /// Print the query plans an endpoint would run
    Explain {
        /// Path to configuration file; environment variables override it
        #[arg(long)]
        config: Option<PathBuf>,

        /// Report body as JSON
        #[arg(long, default_value = "{}")]
        body: String,

        /// Endpoint name, e.g. bar-level2 or export-all-years
        endpoint: String,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
