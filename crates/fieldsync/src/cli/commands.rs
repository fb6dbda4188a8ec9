//! CLI command definitions.
//!
//! This module defines the structure of all CLI subcommands.

use std::path::PathBuf;

use clap::{Args, Subcommand, ValueEnum};

use crate::document::{Collection, TypeTag};

/// Status command arguments.
#[derive(Debug, Args)]
pub struct StatusCommand {
    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// List command arguments.
#[derive(Debug, Args)]
pub struct ListCommand {
    /// Collection to list
    #[arg(value_enum)]
    pub collection: CollectionArg,

    /// Only show distributions of this kind
    #[arg(short = 't', long = "type", value_enum)]
    pub type_tag: Option<DistributionTypeArg>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub format: OutputFormat,
}

/// Save command arguments.
#[derive(Debug, Args)]
pub struct SaveCommand {
    /// Kind of record in the payload file
    #[arg(value_enum)]
    pub kind: RecordKindArg,

    /// JSON file holding the record fields
    #[arg(short, long, value_name = "PAYLOAD")]
    pub file: PathBuf,
}

/// Delete command arguments.
#[derive(Debug, Args)]
pub struct DeleteCommand {
    /// Collection holding the document
    #[arg(value_enum)]
    pub collection: CollectionArg,

    /// Document id
    pub id: String,
}

/// Reset command arguments.
#[derive(Debug, Args)]
pub struct ResetCommand {
    /// Skip confirmation prompt
    #[arg(short, long)]
    pub yes: bool,
}

/// Configuration commands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Show the configuration file path
    Path,

    /// Validate configuration
    Validate {
        /// Path to configuration file to validate
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
}

/// Collection argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum CollectionArg {
    /// MILDA and medicine distributions
    Distributions,
    /// GPS photos
    GpsPhotos,
}

impl From<CollectionArg> for Collection {
    fn from(arg: CollectionArg) -> Self {
        match arg {
            CollectionArg::Distributions => Self::Distributions,
            CollectionArg::GpsPhotos => Self::GpsPhotos,
        }
    }
}

/// Distribution kind argument for filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DistributionTypeArg {
    /// MILDA net distributions
    Milda,
    /// Medicine distributions
    Medicine,
}

impl From<DistributionTypeArg> for TypeTag {
    fn from(arg: DistributionTypeArg) -> Self {
        match arg {
            DistributionTypeArg::Milda => Self::Milda,
            DistributionTypeArg::Medicine => Self::Medicine,
        }
    }
}

/// Record kind argument for saving.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RecordKindArg {
    /// MILDA net distribution
    Milda,
    /// Medicine distribution
    Medicine,
    /// GPS photo
    GpsPhoto,
}

impl From<RecordKindArg> for TypeTag {
    fn from(arg: RecordKindArg) -> Self {
        match arg {
            RecordKindArg::Milda => Self::Milda,
            RecordKindArg::Medicine => Self::Medicine,
            RecordKindArg::GpsPhoto => Self::GpsPhoto,
        }
    }
}

/// Output format for commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Plain text output
    #[default]
    Plain,
    /// Formatted table
    Table,
    /// JSON output
    Json,
}
