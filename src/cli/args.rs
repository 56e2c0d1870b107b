//! CLI argument definitions using clap
//!
//! Commands:
//! - tabsight run --config <path>
//! - tabsight profile --config <path>
//! - tabsight explain --config <path>
//! - tabsight describe --policy <name>
//! - tabsight policies

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::observability::Severity;

/// tabsight - deterministic, policy-driven analysis of tabular data
#[derive(Parser, Debug)]
#[command(name = "tabsight")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Minimum severity of log lines written to stderr
    #[arg(long, global = true, default_value = "info")]
    pub log_level: Severity,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Analyze the configured table and write all run artifacts
    Run {
        /// Path to configuration file
        #[arg(long, default_value = "./tabsight.json")]
        config: PathBuf,
    },

    /// Profile the configured table and write data_profile.json
    Profile {
        /// Path to configuration file
        #[arg(long, default_value = "./tabsight.json")]
        config: PathBuf,
    },

    /// Show the queries the selected policy would run, without running them
    Explain {
        /// Path to configuration file
        #[arg(long, default_value = "./tabsight.json")]
        config: PathBuf,
    },

    /// Print the descriptor of a registered policy
    Describe {
        /// Policy name
        #[arg(long)]
        policy: String,
    },

    /// List registered policies
    Policies,
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
