//! CLI module for laneq - command-line interface and subcommands.

pub mod commands;

pub use commands::Cli;
