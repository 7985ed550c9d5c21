//! CLI Application logic
//!
//! Contains the command-line interface implementation.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};

use docfill_core::{inspect_bytes, render_to_file, DataMap};

#[derive(Parser)]
#[command(name = "docfill")]
#[command(author, version, about = "Fill DOCX templates from JSON data", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render a DOCX template against a JSON data file
    Render {
        /// Input DOCX template
        template: PathBuf,

        /// JSON data file (top-level object)
        #[arg(short, long)]
        data: PathBuf,

        /// Output DOCX file (defaults to <template stem>-rendered.docx)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// List the markers a template contains, per content part
    Inspect {
        /// Input DOCX template
        template: PathBuf,
    },
}

/// Run the CLI application
///
/// This is the main entry point for the command-line interface.
/// It parses arguments and dispatches to the appropriate command.
pub fn run_cli() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Render {
            template,
            data,
            output,
        } => {
            render_command(&template, &data, output.as_deref())?;
        }
        Commands::Inspect { template } => {
            inspect_command(&template)?;
        }
    }

    Ok(())
}

/// Render `template` against the JSON object in `data_path`
pub fn render_command(template: &Path, data_path: &Path, output: Option<&Path>) -> Result<()> {
    let data = load_data(data_path)?;

    let output = match output {
        Some(path) => path.to_path_buf(),
        None => default_output_path(template),
    };

    render_to_file(template, &data, &output)
        .with_context(|| format!("Failed to render template: {}", template.display()))?;

    println!("Rendered: {}", output.display());
    Ok(())
}

/// Print the markers found in each content part of `template`
pub fn inspect_command(template: &Path) -> Result<()> {
    let bytes = fs::read(template)
        .with_context(|| format!("Failed to read template: {}", template.display()))?;
    let report = inspect_bytes(&bytes)
        .with_context(|| format!("Failed to inspect template: {}", template.display()))?;

    for (part, scan) in report {
        println!("{part}:");
        if scan.scalars.is_empty() && scan.repeats.is_empty() {
            println!("  (no markers)");
            continue;
        }
        for name in &scan.scalars {
            println!("  scalar  ${{{name}}}");
        }
        for name in &scan.repeats {
            println!("  repeat  #{name}[...]");
        }
    }

    Ok(())
}

fn load_data(path: &Path) -> Result<DataMap> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read data file: {}", path.display()))?;
    let value: serde_json::Value = serde_json::from_str(&text)
        .with_context(|| format!("Invalid JSON in data file: {}", path.display()))?;

    match value {
        serde_json::Value::Object(map) => Ok(map),
        _ => bail!(
            "Data file must contain a JSON object at the top level: {}",
            path.display()
        ),
    }
}

fn default_output_path(template: &Path) -> PathBuf {
    let stem = template
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    template.with_file_name(format!("{stem}-rendered.docx"))
}
