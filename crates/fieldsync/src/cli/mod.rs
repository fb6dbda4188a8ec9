//! Command-line interface for fieldsync.
//!
//! This module provides the CLI structure for the `fieldsync` binary.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub use commands::{
    CollectionArg, ConfigCommand, DeleteCommand, DistributionTypeArg, ListCommand, OutputFormat,
    RecordKindArg, ResetCommand, SaveCommand, StatusCommand,
};

/// fieldsync - Offline-first field data collection
///
/// Stores MILDA distributions, medicine distributions and GPS photos locally
/// and pushes them to the central document store on demand.
#[derive(Debug, Parser)]
#[command(name = "fieldsync")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to custom configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// The command to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Show connectivity and pending document counts
    Status(StatusCommand),

    /// Probe the remote store
    Connect,

    /// Push every unsynced document
    Sync,

    /// List stored documents
    List(ListCommand),

    /// Save a record from a JSON file
    Save(SaveCommand),

    /// Delete one stored document
    Delete(DeleteCommand),

    /// Remove all local data
    Reset(ResetCommand),

    /// View or validate configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

impl Cli {
    /// Get the verbosity level based on flags.
    #[must_use]
    pub fn verbosity(&self) -> crate::logging::Verbosity {
        if self.quiet {
            crate::logging::Verbosity::Quiet
        } else {
            match self.verbose {
                0 => crate::logging::Verbosity::Normal,
                1 => crate::logging::Verbosity::Verbose,
                _ => crate::logging::Verbosity::Trace,
            }
        }
    }
}
