//! docfill CLI - Command-line interface library
//!
//! This library provides the CLI functionality for docfill:
//! - Render: fill a DOCX template from a JSON data file
//! - Inspect: list the markers a template contains
//!
//! # Binary Usage
//!
//! ```bash
//! # Render a template
//! docfill render invoice.docx --data order.json --output invoice-final.docx
//!
//! # List the markers a template expects
//! docfill inspect invoice.docx
//! ```

pub mod app;

// Re-export main entry point and commands
pub use app::{inspect_command, render_command, run_cli};
