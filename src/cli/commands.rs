//! CLI command definitions using clap.
//!
//! - plan: dry-run a plan (text, JSON, or a JSON file) through the lane queue
//! - lanes: show the configured lanes

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// laneq - lane-scoped task queue and plan orchestrator
#[derive(Parser, Debug)]
#[command(name = "laneq")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Optional config file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Check if verbose mode is enabled
    pub fn is_verbose(&self) -> bool {
        self.verbose
    }
}

/// Main subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Execute a plan in dry-run mode (each step echoes its input)
    Plan {
        /// Free-text requirement, a JSON object with a `plan` field, or a path with --file
        input: String,

        /// Session id passed to every step
        #[arg(short, long, default_value = "cli")]
        session: String,

        /// Treat INPUT as a path to read the plan from
        #[arg(short, long)]
        file: bool,
    },

    /// List configured lanes
    Lanes,
}
