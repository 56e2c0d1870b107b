//! CLI module for tabsight
//!
//! Provides command-line interface for:
//! - run: analyze a table and write run artifacts
//! - profile: write the data profile only
//! - explain: show the planned queries without running them
//! - describe / policies: inspect the policy registry

mod args;
mod commands;
mod config;
mod errors;
mod io;

pub use args::{Cli, Command};
pub use commands::{describe, execute, explain, policies, profile, run, run_analysis};
pub use config::Config;
pub use errors::{CliError, CliErrorCode, CliResult, Severity as CliSeverity};
pub use io::{error_envelope, response_envelope, write_error, write_response};
