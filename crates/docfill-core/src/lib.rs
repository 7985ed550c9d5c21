//! # docfill-core
//!
//! DOCX template rendering: fill placeholders and repeat structural blocks in
//! a hand-authored Word document, driven by a JSON data object. The output
//! keeps the template's visual formatting; the content comes from the data.
//!
//! Template authors use two visible conventions:
//!
//! - `${name}` in *highlighted* text: replaced with the scalar value of
//!   `name`. The value may embed a literal `\n` token to force line breaks.
//! - `#name[` ... `]` as plain text on sibling paragraphs (or rows): the
//!   content between the delimiters is cloned once per element of the array
//!   `name`, and each clone is rendered against that element's fields.
//!   Repeats nest; an inner closing delimiter carries one extra dot per
//!   level (`].`, `]..`).
//!
//! Markers that do not resolve (missing name, wrong shape, malformed text)
//! are left in the output verbatim; only container-level failures are errors.
//!
//! ## Example
//!
//! ```no_run
//! use docfill_core::render_file;
//! use serde_json::json;
//!
//! let data = json!({
//!     "customer": "ACME Corp",
//!     "lines": [
//!         {"item": "Widget", "qty": 3},
//!         {"item": "Gadget", "qty": 1},
//!     ],
//! });
//! let rendered = render_file("invoice-template.docx", data.as_object().unwrap())?;
//! std::fs::write("invoice.docx", rendered)?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod archive;
pub mod error;
pub mod node;
pub mod render;
pub mod transform;
pub mod value;

pub use archive::OoxmlArchive;
pub use error::{RenderError, Result};
pub use node::{Element, XmlNode};
pub use render::{inspect_bytes, render_bytes, render_file, render_to_file};
pub use transform::{expand_repeats, scan_markers, substitute_scalars, MarkerScan};
pub use value::DataMap;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
