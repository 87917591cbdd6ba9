//! CLI module for ghg-api
//!
//! Provides command-line interface for:
//! - serve: Run the HTTP server
//! - query: Answer one request from stdin through the full router
//! - explain: Print the query plans of an endpoint

mod args;
mod commands;
mod errors;
mod io;

pub use args::{Cli, Command};
pub use commands::{
    dispatch, explain, explain_plans, load_config, query, read_config_file, run, run_command, serve,
};
pub use errors::{CliError, CliErrorCode, CliResult};
pub use io::{read_body, write_output};
