//! Command-line interface for incident-report.
//!
//! This module provides the CLI structure and command handlers for the
//! `increp` binary.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub use commands::{
    parse_value, ConfigCommand, ImageLoadedCommand, JsonFlag, MarkCommand, OptionsCommand,
    PageCommand, RemoveUploadCommand, ResetCommand, SchemaCommand, SelectCommand, SetCommand,
    ShowCommand, UploadCommand, DEFAULT_MULTI_SELECT_FIELD,
};

/// increp - Fill in an incident report from the command line
///
/// Every edit is saved locally as soon as it is made, so a report can be
/// built up over several invocations.
#[derive(Debug, Parser)]
#[command(name = "increp")]
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
    /// Render a page
    Page(PageCommand),

    /// Print the report, or one field of it
    Show(ShowCommand),

    /// Set a field
    Set(SetCommand),

    /// Choose options in a multi-select field
    Select(SelectCommand),

    /// List a multi-select field's options
    Options(OptionsCommand),

    /// Mark the injury location on the body diagram
    Mark(MarkCommand),

    /// Report the rendered size of the body diagram
    ImageLoaded(ImageLoadedCommand),

    /// Add incident images
    Upload(UploadCommand),

    /// Remove an incident image
    RemoveUpload(RemoveUploadCommand),

    /// List conditional fields and whether they are shown
    Visibility(JsonFlag),

    /// Check the report against the form schema
    Validate(JsonFlag),

    /// Submit the report
    Submit,

    /// Clear the report
    Reset(ResetCommand),

    /// Print the form schema
    Schema(SchemaCommand),

    /// View configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

impl Cli {
    /// Get the verbosity level based on flags.
    #[must_use]
    pub fn verbosity(&self) -> crate::logging::Verbosity {
        crate::logging::Verbosity::from_flags(self.quiet, self.verbose)
    }
}
