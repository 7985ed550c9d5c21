//! Render orchestrator
//!
//! Ties the pieces together: unpack the template archive, run repetition
//! expansion then scalar substitution over every content part (body, headers,
//! footers) against the root data mapping, and repack. The input bytes are
//! copied into the in-memory archive up front, so concurrent renders of the
//! same template never share state.

use std::io::Cursor;
use std::path::Path;

use crate::archive::{OoxmlArchive, DOCUMENT_PART};
use crate::error::{RenderError, Result};
use crate::node::{parse_part, serialize_part, Element};
use crate::transform::{expand_repeats, scan_markers, substitute_scalars, MarkerScan};
use crate::value::DataMap;

/// Render a template from bytes, returning the rendered document bytes
pub fn render_bytes(template: &[u8], data: &DataMap) -> Result<Vec<u8>> {
    let mut archive = OoxmlArchive::from_reader(Cursor::new(template))?;

    for part in archive.content_parts() {
        let xml = archive
            .get(&part)
            .ok_or_else(|| RenderError::MissingFile(part.clone()))?;
        let mut root = parse_part(xml)?;

        {
            let target = part_target(&part, &mut root)?;
            expand_repeats(target, data, "");
            substitute_scalars(target, data);
        }

        archive.set(part, serialize_part(&root)?);
    }

    archive.to_bytes()
}

/// Render a template file, returning the rendered bytes
pub fn render_file<P: AsRef<Path>>(template_path: P, data: &DataMap) -> Result<Vec<u8>> {
    let template = std::fs::read(template_path)?;
    render_bytes(&template, data)
}

/// Render a template file and write the result to `output_path`
///
/// Parent directories of the output path are created if missing.
pub fn render_to_file<P: AsRef<Path>, Q: AsRef<Path>>(
    template_path: P,
    data: &DataMap,
    output_path: Q,
) -> Result<()> {
    let rendered = render_file(template_path, data)?;
    if let Some(parent) = output_path.as_ref().parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    std::fs::write(output_path, rendered)?;
    Ok(())
}

/// Markers found in a template, per content part
pub fn inspect_bytes(template: &[u8]) -> Result<Vec<(String, MarkerScan)>> {
    let archive = OoxmlArchive::from_reader(Cursor::new(template))?;
    let mut report = Vec::new();

    for part in archive.content_parts() {
        let xml = archive
            .get(&part)
            .ok_or_else(|| RenderError::MissingFile(part.clone()))?;
        let mut root = parse_part(xml)?;
        let target = part_target(&part, &mut root)?;
        report.push((part, scan_markers(target)));
    }

    Ok(report)
}

/// The element the passes run against for a given part
///
/// For the main document that is the `w:body` element; header and footer
/// parts are processed from their root (`w:hdr` / `w:ftr`).
fn part_target<'a>(part: &str, root: &'a mut Element) -> Result<&'a mut Element> {
    if part == DOCUMENT_PART {
        root.find_child_mut("body").ok_or_else(|| {
            RenderError::InvalidStructure("document.xml has no w:body".to_string())
        })
    } else {
        Ok(root)
    }
}
