//! `increp` - CLI for incident-report
//!
//! This binary drives the report form from the command line: each command
//! loads the saved report, applies one change or query, and saves it again.

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use std::path::PathBuf;

use clap::Parser;

use incident_report::cli::{
    Cli, Command, ConfigCommand, MarkCommand, OptionsCommand, SchemaCommand, SelectCommand,
};
use incident_report::pages::{self, LandingPage, Route};
use incident_report::schema::reporting_form_schema;
use incident_report::upload::{FileSource, PathFileSource, SelectionOutcome};
use incident_report::{init_logging, BoundingRect, Config, FormState, SqliteStore};

type CliResult = Result<(), Box<dyn std::error::Error>>;

#[tokio::main(flavor = "current_thread")]
async fn main() -> CliResult {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    init_logging(cli.verbosity());

    // Load configuration
    let config = Config::load_from(cli.config.clone())?;

    // These don't touch the saved report
    let command = match cli.command {
        Command::Config(config_cmd) => return handle_config(&config, config_cmd),
        Command::Schema(SchemaCommand { ui: false }) => return handle_schema(),
        other => other,
    };

    let db_path = config.database_path();
    let store = SqliteStore::open(&db_path).map_err(|e| {
        if e.is_storage_error() {
            format!("Cannot open report database {}: {e}", db_path.display())
        } else {
            e.to_string()
        }
    })?;
    let mut form = FormState::open(store, &config)?;

    match command {
        Command::Page(cmd) => handle_page(&form, &cmd.path),
        Command::Show(cmd) => {
            let value = match cmd.path.as_deref() {
                Some(path) => form.get().get(path).cloned().unwrap_or_default(),
                None => form.get().to_value(),
            };
            println!("{}", serde_json::to_string_pretty(&value)?);
            Ok(())
        }
        Command::Set(cmd) => {
            form.set_field(&cmd.path, cmd.parsed_value())?;
            println!("Saved {}", cmd.path);
            Ok(())
        }
        Command::Select(cmd) => handle_select(&mut form, &cmd),
        Command::Options(cmd) => handle_options(&form, &cmd),
        Command::Mark(cmd) => handle_mark(&mut form, &cmd),
        Command::ImageLoaded(cmd) => {
            form.image_loaded(cmd.width, cmd.height);
            match form.diagram().overlay_percent() {
                Some(overlay) => println!(
                    "Marker at {:.1}% left, {:.1}% top",
                    overlay.left, overlay.top
                ),
                None => println!("No marker placed"),
            }
            Ok(())
        }
        Command::Upload(cmd) => handle_upload(&mut form, &cmd.files).await,
        Command::RemoveUpload(cmd) => {
            match form.remove_upload(cmd.index)? {
                Some(removed) => println!("Removed {}", removed.name),
                None => println!("No image at position {}", cmd.index),
            }
            Ok(())
        }
        Command::Visibility(flag) => handle_visibility(&form, flag.json),
        Command::Validate(flag) => handle_validate(&form, flag.json),
        Command::Submit => {
            let receipt = form.submit();
            println!("Form submitted");
            if !receipt.errors.is_empty() {
                println!("({} validation issue(s) logged)", receipt.errors.len());
            }
            Ok(())
        }
        Command::Reset(cmd) => {
            if cmd.yes {
                form.reset()?;
                println!("Report cleared.");
            } else {
                println!("This will clear the saved report.");
                println!("Use --yes to confirm.");
            }
            Ok(())
        }
        Command::Schema(_) => {
            println!("{}", serde_json::to_string_pretty(&form.ui_schema())?);
            Ok(())
        }
        Command::Config(_) => Ok(()),
    }
}

fn handle_page(form: &FormState<SqliteStore>, path: &str) -> CliResult {
    match Route::from_path(path) {
        Some(Route::Landing) => print!("{}", LandingPage::default().render()),
        Some(Route::ReportForm) => {
            print!("{}", pages::render_form(form));
            if let Some(saved) = form.store().updated_at(form.key())? {
                println!("Last saved {}", saved.format("%Y-%m-%d %H:%M:%S UTC"));
            }
        }
        None => return Err(format!("No page at {path}").into()),
    }
    Ok(())
}

fn handle_select(form: &mut FormState<SqliteStore>, cmd: &SelectCommand) -> CliResult {
    form.select_options(&cmd.field, &cmd.values)?;
    println!("Selected {} option(s) in {}", cmd.values.len(), cmd.field);
    Ok(())
}

fn handle_options(form: &FormState<SqliteStore>, cmd: &OptionsCommand) -> CliResult {
    let widget = form.multi_select(&cmd.field)?;
    let selected = widget.selected(form.get().get(&cmd.field));
    for option in widget.options() {
        let mark = if selected.contains(&option) { "x" } else { " " };
        println!("[{mark}] {}", option.label);
    }
    Ok(())
}

fn handle_mark(form: &mut FormState<SqliteStore>, cmd: &MarkCommand) -> CliResult {
    let rect = BoundingRect {
        left: cmd.left,
        top: cmd.top,
        width: cmd.width,
        height: cmd.height,
    };
    let position = form.click_diagram(cmd.client_x, cmd.client_y, rect)?;
    println!("Injury Location Selected: X: {}, Y: {}", position.x, position.y);
    if let Some(overlay) = form.diagram().overlay_percent() {
        println!(
            "Marker at {:.1}% left, {:.1}% top",
            overlay.left, overlay.top
        );
    }
    Ok(())
}

async fn handle_upload(form: &mut FormState<SqliteStore>, files: &[PathBuf]) -> CliResult {
    let mut batch: Vec<Box<dyn FileSource>> = Vec::with_capacity(files.len());
    for path in files {
        let source = PathFileSource::probe(path)
            .await
            .map_err(|e| format!("Failed to read \"{}\": {e}", path.display()))?;
        batch.push(Box::new(source));
    }

    match form.upload(&batch).await? {
        SelectionOutcome::Empty => println!("No files selected"),
        SelectionOutcome::Added(_) => {
            if let Some(summary) = form.uploads().summary() {
                println!("{summary}");
            }
        }
        SelectionOutcome::Rejected(_) | SelectionOutcome::ReadFailed(_) => {
            if let Some(error) = form.uploads().error() {
                eprintln!("{error}");
            }
        }
    }
    Ok(())
}

fn handle_visibility(form: &FormState<SqliteStore>, json: bool) -> CliResult {
    let shown = form.visible_conditional_fields();
    let hidden = form.hidden_fields();
    if json {
        let report = serde_json::json!({ "shown": shown, "hidden": hidden });
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        for path in &shown {
            println!("shown   {path}");
        }
        for path in &hidden {
            println!("hidden  {path}");
        }
    }
    Ok(())
}

fn handle_validate(form: &FormState<SqliteStore>, json: bool) -> CliResult {
    let errors = form.validate();
    if json {
        let items: Vec<_> = errors
            .iter()
            .map(|e| serde_json::json!({ "path": e.path, "message": e.message }))
            .collect();
        println!("{}", serde_json::to_string_pretty(&items)?);
    } else if errors.is_empty() {
        println!("Report is valid.");
    } else {
        for error in &errors {
            println!("{error}");
        }
    }
    Ok(())
}

fn handle_schema() -> CliResult {
    let schema = reporting_form_schema().to_json_schema();
    println!("{}", serde_json::to_string_pretty(&schema)?);
    Ok(())
}

fn handle_config(config: &Config, cmd: ConfigCommand) -> CliResult {
    match cmd {
        ConfigCommand::Show { json } => {
            if json {
                println!("{}", serde_json::to_string_pretty(config)?);
            } else {
                println!("Current Configuration");
                println!("=====================");
                println!();
                println!("[Storage]");
                println!("  Database path:      {}", config.database_path().display());
                println!("  Key:                {}", config.storage.key);
                println!();
                println!("[Upload]");
                println!("  Max file size:      {} bytes", config.upload.max_file_size_bytes);
                println!(
                    "  Accepted types:     {}",
                    config.upload.accepted_types.join(", ")
                );
                println!();
                println!("[Diagram]");
                println!("  Image URL:          {}", config.diagram.image_url);
            }
        }
        ConfigCommand::Path => {
            println!("{}", Config::default_config_path().display());
        }
        ConfigCommand::Validate { file } => {
            let path = file.unwrap_or_else(Config::default_config_path);
            println!("Validating configuration: {}", path.display());
            match Config::load_from(Some(path)) {
                Ok(_) => println!("Configuration is valid."),
                Err(e) => println!("Configuration error: {e}"),
            }
        }
    }
    Ok(())
}
