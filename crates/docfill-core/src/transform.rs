//! The two template passes: scalar substitution and repetition expansion
//!
//! Template authors mark two kinds of regions with visible text conventions:
//!
//! - **Scalar placeholders**: `${name}`, carried by one or more *highlighted*
//!   runs (Word splits typed text across runs freely, so a single placeholder
//!   may arrive as `${`, `na`, `me}` in three runs).
//! - **Repetition markers**: a sibling whose text starts with `#name[` opens a
//!   region, and the next sibling whose text ends with `]` closes it. The
//!   siblings in between form the template range, cloned once per row of the
//!   array `name` in the data.
//!
//! Repetition nests: each level of expansion deepens a "layer" qualifier by
//! one `.`, and an inner marker's closing tag must carry that suffix (`].`,
//! `]..`, ...) so delimiters of different depths never cross-match after a
//! range containing inner markers has been cloned.
//!
//! Unresolvable markers are not errors: a placeholder whose name is missing
//! from the data, or a repetition over a key that is absent or not an array,
//! is left in the output verbatim.

use std::sync::OnceLock;

use regex::Regex;

use crate::node::{Element, XmlNode};
use crate::value::{as_rows, row_mapping, scalar_text, DataMap};

fn scalar_re() -> &'static Regex {
    static SCALAR_RE: OnceLock<Regex> = OnceLock::new();
    SCALAR_RE.get_or_init(|| Regex::new(r"\$\{(\w+)\}").unwrap())
}

fn repeat_name_re() -> &'static Regex {
    static REPEAT_RE: OnceLock<Regex> = OnceLock::new();
    REPEAT_RE.get_or_init(|| Regex::new(r"#(\w+)\[").unwrap())
}

// =============================================================================
// Scalar substitution
// =============================================================================

/// Outcome of matching one accumulated pool of highlighted runs
enum PoolOutcome {
    /// The pool text contains `${name}` and `name` is present in the data
    Matched(String),
    /// No placeholder, or the name is absent; leave the runs untouched
    Unmatched,
}

fn match_pool(pool_text: &str, data: &DataMap) -> PoolOutcome {
    match scalar_re().captures(pool_text) {
        Some(caps) => {
            let name = &caps[1];
            if data.contains_key(name) {
                PoolOutcome::Matched(name.to_string())
            } else {
                PoolOutcome::Unmatched
            }
        }
        None => PoolOutcome::Unmatched,
    }
}

/// One resolved placeholder, recorded during the scan and applied afterwards
struct PoolEdit {
    /// Path of the first run of the pool; rewritten in place
    first: Vec<usize>,
    /// Value lines (split on the literal two-character token `\n`)
    lines: Vec<String>,
    /// Paths of the remaining runs of the pool; removed entirely
    remove: Vec<Vec<usize>>,
}

/// Replace every `${name}` carried by highlighted runs under `root`
///
/// The scan snapshots highlighted run paths and texts up front, then applies
/// all edits afterwards: first-run rewrites never shift sibling indices, and
/// removals are applied in reverse document order, so no path goes stale.
pub fn substitute_scalars(root: &mut Element, data: &DataMap) {
    let mut runs: Vec<(Vec<usize>, String)> = Vec::new();
    collect_highlighted_runs(root, &mut Vec::new(), &mut runs);

    let mut edits: Vec<PoolEdit> = Vec::new();
    let mut pool: Vec<usize> = Vec::new(); // indices into `runs`
    let mut pool_text = String::new();

    for (idx, (_, text)) in runs.iter().enumerate() {
        if text.starts_with('$') {
            pool.clear();
            pool.push(idx);
            pool_text = text.clone();
        } else {
            pool_text.push_str(text);
            pool.push(idx);
        }

        if text.ends_with('}') {
            if let PoolOutcome::Matched(name) = match_pool(&pool_text, data) {
                let value_text = scalar_text(&data[&name]);
                edits.push(PoolEdit {
                    first: runs[pool[0]].0.clone(),
                    lines: split_literal_newlines(&value_text),
                    remove: pool[1..].iter().map(|&i| runs[i].0.clone()).collect(),
                });
                pool.clear();
                pool_text.clear();
            }
        }
    }

    for edit in &edits {
        if let Some(run) = root.descendant_mut(&edit.first) {
            run.clear_run_text();
            run.clear_highlight();
            for (i, line) in edit.lines.iter().enumerate() {
                if i > 0 {
                    run.append_run_break();
                }
                run.append_run_text(line);
            }
        }
    }

    let mut removals: Vec<&Vec<usize>> = edits.iter().flat_map(|e| &e.remove).collect();
    removals.sort();
    for path in removals.into_iter().rev() {
        root.remove_descendant(path);
    }
}

/// Split on the literal backslash-n token, not an actual newline
///
/// Data authors embed `\n` in JSON string values as `\\n`; the placeholder
/// value therefore carries the two characters `\` `n` where a break belongs.
fn split_literal_newlines(text: &str) -> Vec<String> {
    text.split(r"\n").map(str::to_string).collect()
}

/// Highlighted runs under `el` (excluding `el` itself), in document order
fn collect_highlighted_runs(
    el: &Element,
    path: &mut Vec<usize>,
    out: &mut Vec<(Vec<usize>, String)>,
) {
    for (i, child) in el.children.iter().enumerate() {
        let XmlNode::Element(inner) = child else {
            continue;
        };
        path.push(i);
        if inner.is_highlighted_run() {
            out.push((path.clone(), inner.inner_text()));
        } else {
            collect_highlighted_runs(inner, path, out);
        }
        path.pop();
    }
}

// =============================================================================
// Repetition expansion
// =============================================================================

/// Outcome of a closed repetition marker
enum MarkerOutcome {
    /// Named array found in the data; clone the range once per row
    Expand(String),
    /// Malformed body, name absent, or value not a sequence; emit verbatim
    Skip,
}

fn classify_marker(match_text: &str, closing: &str, data: &DataMap) -> MarkerOutcome {
    // Body sits between the opening `#` and the *last* `]<layer>`, mirroring
    // the greedy match of the original; the name is the body up to the first
    // `[`, so an inner marker's own delimiters never leak into the name.
    let Some(hash) = match_text.find('#') else {
        return MarkerOutcome::Skip;
    };
    let Some(end) = match_text.rfind(closing) else {
        return MarkerOutcome::Skip;
    };
    let Some(body) = match_text.get(hash + 1..end) else {
        return MarkerOutcome::Skip;
    };
    let Some(bracket) = body.find('[') else {
        return MarkerOutcome::Skip;
    };
    let name = &body[..bracket];

    match data.get(name).and_then(as_rows) {
        Some(_) => MarkerOutcome::Expand(name.to_string()),
        None => MarkerOutcome::Skip,
    }
}

/// Expand every repetition marker among `el`'s direct children
///
/// `layer` is the nesting qualifier: empty at the top level, one more `.` per
/// expansion level. A marker closes only on a child whose text ends with
/// `]<layer>`, so clones produced at one depth cannot close markers belonging
/// to another.
///
/// The child list is rebuilt into a fresh buffer rather than mutated in
/// place, so no index arithmetic survives from the scan.
pub fn expand_repeats(el: &mut Element, data: &DataMap, layer: &str) {
    let closing = format!("]{layer}");
    let children = std::mem::take(&mut el.children);
    let mut out: Vec<XmlNode> = Vec::with_capacity(children.len());

    // Region buffered since the current opening marker (opener included)
    let mut pending: Vec<XmlNode> = Vec::new();
    let mut match_text = String::new();
    let mut open = false;

    for mut child in children {
        let text = child.inner_text();

        if text.starts_with('#') {
            // Most recent opener wins; an earlier unclosed region is kept
            // verbatim
            out.append(&mut pending);
            match_text.clear();
            match_text.push_str(&text);
            open = true;
            pending.push(child);
        } else if !open {
            // Markers not rooted at this level may live one level deeper
            if text.contains('#') {
                if let XmlNode::Element(ref mut inner) = child {
                    for grandchild in inner.children.iter_mut() {
                        if let XmlNode::Element(g) = grandchild {
                            expand_repeats(g, data, layer);
                        }
                    }
                }
            }
            out.push(child);
            continue;
        } else {
            match_text.push_str(&text);
            pending.push(child);
        }

        if text.ends_with(&closing) {
            match classify_marker(&match_text, &closing, data) {
                MarkerOutcome::Expand(name) => {
                    // rows checked by classify_marker
                    let rows = as_rows(&data[&name]).unwrap_or_default();
                    // Drop the opening and closing delimiters; what remains
                    // is the template range (empty if opener == closer)
                    let range_end = pending.len().saturating_sub(1).max(1);
                    let template: Vec<XmlNode> =
                        pending.drain(1..range_end).collect();
                    pending.clear();

                    for row in rows {
                        let cols = row_mapping(row);
                        let deeper = format!("{layer}.");
                        for node in &template {
                            let mut clone = node.clone();
                            if let XmlNode::Element(ref mut cel) = clone {
                                expand_repeats(cel, &cols, &deeper);
                                substitute_scalars(cel, &cols);
                            }
                            out.push(clone);
                        }
                    }
                }
                MarkerOutcome::Skip => {
                    out.append(&mut pending);
                }
            }
            open = false;
            match_text.clear();
        }
    }

    // Unclosed marker region: left in place, unresolved
    out.append(&mut pending);
    el.children = out;
}

// =============================================================================
// Marker scanning (template inspection)
// =============================================================================

/// Markers found in one content subtree
#[derive(Debug, Default, PartialEq)]
pub struct MarkerScan {
    /// Scalar placeholder names, in document order, deduplicated
    pub scalars: Vec<String>,
    /// Repetition array names, in document order, deduplicated
    pub repeats: Vec<String>,
}

/// List the markers a subtree contains, without rendering anything
///
/// Scalars are detected over the same highlighted-run pools the substitution
/// pass uses; repetitions by their `#name[` openers anywhere in the text.
pub fn scan_markers(root: &Element) -> MarkerScan {
    let mut scan = MarkerScan::default();

    let mut runs: Vec<(Vec<usize>, String)> = Vec::new();
    collect_highlighted_runs(root, &mut Vec::new(), &mut runs);

    let mut pool_text = String::new();
    for (_, text) in &runs {
        if text.starts_with('$') {
            pool_text = text.clone();
        } else {
            pool_text.push_str(text);
        }
        if text.ends_with('}') {
            for caps in scalar_re().captures_iter(&pool_text) {
                push_unique(&mut scan.scalars, &caps[1]);
            }
            pool_text.clear();
        }
    }

    for caps in repeat_name_re().captures_iter(&root.inner_text()) {
        push_unique(&mut scan.repeats, &caps[1]);
    }

    scan
}

fn push_unique(names: &mut Vec<String>, name: &str) {
    if !names.iter().any(|n| n == name) {
        names.push(name.to_string());
    }
}
