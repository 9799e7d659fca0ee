//! CLI command definitions.
//!
//! This module defines the structure of all CLI subcommands.

use std::path::PathBuf;

use clap::{Args, Subcommand};
use serde_json::Value;

/// Field edited by `select` and listed by `options` when none is given.
pub const DEFAULT_MULTI_SELECT_FIELD: &str = "additional.selectedOptions";

/// Page command arguments.
#[derive(Debug, Args)]
pub struct PageCommand {
    /// Page path to render
    #[arg(default_value = "/reporting-form")]
    pub path: String,
}

/// Show command arguments.
#[derive(Debug, Args)]
pub struct ShowCommand {
    /// Dotted field path (whole document when omitted)
    pub path: Option<String>,
}

/// Set command arguments.
#[derive(Debug, Args)]
pub struct SetCommand {
    /// Dotted field path, e.g. `incidents.site_name`
    pub path: String,

    /// New value; parsed as JSON, otherwise taken as a string
    pub value: String,
}

impl SetCommand {
    /// The value to store.
    #[must_use]
    pub fn parsed_value(&self) -> Value {
        parse_value(&self.value)
    }
}

/// Select command arguments.
#[derive(Debug, Args)]
pub struct SelectCommand {
    /// Options to select, in order
    pub values: Vec<String>,

    /// Multi-select field to edit
    #[arg(short, long, default_value = DEFAULT_MULTI_SELECT_FIELD)]
    pub field: String,
}

/// Options command arguments.
#[derive(Debug, Args)]
pub struct OptionsCommand {
    /// Field whose options to list
    #[arg(default_value = DEFAULT_MULTI_SELECT_FIELD)]
    pub field: String,
}

/// Mark command arguments: a click on the body diagram.
#[derive(Debug, Args)]
pub struct MarkCommand {
    /// Click x in client coordinates
    #[arg(long, allow_negative_numbers = true)]
    pub client_x: f64,

    /// Click y in client coordinates
    #[arg(long, allow_negative_numbers = true)]
    pub client_y: f64,

    /// Image box left edge
    #[arg(long, default_value = "0", allow_negative_numbers = true)]
    pub left: f64,

    /// Image box top edge
    #[arg(long, default_value = "0", allow_negative_numbers = true)]
    pub top: f64,

    /// Image box width
    #[arg(long)]
    pub width: f64,

    /// Image box height
    #[arg(long)]
    pub height: f64,
}

/// Image-loaded command arguments.
#[derive(Debug, Args)]
pub struct ImageLoadedCommand {
    /// Rendered image width
    pub width: f64,

    /// Rendered image height
    pub height: f64,
}

/// Upload command arguments.
#[derive(Debug, Args)]
pub struct UploadCommand {
    /// Image files to add
    pub files: Vec<PathBuf>,
}

/// Remove-upload command arguments.
#[derive(Debug, Args)]
pub struct RemoveUploadCommand {
    /// Position of the image in the upload list
    pub index: usize,
}

/// Output switch shared by reporting commands.
#[derive(Debug, Args)]
pub struct JsonFlag {
    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Reset command arguments.
#[derive(Debug, Args)]
pub struct ResetCommand {
    /// Skip confirmation
    #[arg(short, long)]
    pub yes: bool,
}

/// Schema command arguments.
#[derive(Debug, Args)]
pub struct SchemaCommand {
    /// Print the UI schema for the current document instead
    #[arg(long)]
    pub ui: bool,
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

/// Parse a command-line value as JSON, falling back to a plain string.
#[must_use]
pub fn parse_value(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_value_json() {
        assert_eq!(parse_value("42"), json!(42));
        assert_eq!(parse_value("true"), json!(true));
        assert_eq!(parse_value("[\"a\"]"), json!(["a"]));
        assert_eq!(parse_value("null"), Value::Null);
    }

    #[test]
    fn test_parse_value_falls_back_to_string() {
        assert_eq!(parse_value("North Yard"), json!("North Yard"));
        assert_eq!(parse_value("2024-01-15"), json!("2024-01-15"));
        assert_eq!(parse_value("\"quoted\""), json!("quoted"));
    }

    #[test]
    fn test_set_command_parsed_value() {
        let cmd = SetCommand {
            path: "injuredPersons.shift_schedule".to_string(),
            value: "true".to_string(),
        };
        assert_eq!(cmd.parsed_value(), json!(true));
    }

    #[test]
    fn test_mark_command_debug() {
        let cmd = MarkCommand {
            client_x: 10.0,
            client_y: 20.0,
            left: 0.0,
            top: 0.0,
            width: 100.0,
            height: 200.0,
        };
        let debug_str = format!("{cmd:?}");
        assert!(debug_str.contains("client_x"));
    }

    #[test]
    fn test_config_command_debug() {
        let cmd = ConfigCommand::Show { json: true };
        let debug_str = format!("{cmd:?}");
        assert!(debug_str.contains("Show"));
    }
}
