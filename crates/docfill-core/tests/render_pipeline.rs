//! End-to-end rendering tests against in-memory DOCX fixtures

use std::io::{Cursor, Write};

use serde_json::{json, Value};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use docfill_core::node::parse_part;
use docfill_core::{render_bytes, DataMap, OoxmlArchive};

/// Build a minimal DOCX whose body contains the given block XML
fn docx_with_body(body_xml: &str) -> Vec<u8> {
    let mut buffer = Cursor::new(Vec::new());
    let mut zip = ZipWriter::new(&mut buffer);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);

    zip.start_file("[Content_Types].xml", options).unwrap();
    zip.write_all(br#"<?xml version="1.0" encoding="UTF-8"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
  <Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>
  <Default Extension="xml" ContentType="application/xml"/>
  <Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/>
</Types>"#).unwrap();

    zip.start_file("_rels/.rels", options).unwrap();
    zip.write_all(br#"<?xml version="1.0" encoding="UTF-8"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
  <Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/>
</Relationships>"#).unwrap();

    zip.start_file("word/document.xml", options).unwrap();
    zip.write_all(
        format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>{body_xml}</w:body></w:document>"#
        )
        .as_bytes(),
    )
    .unwrap();

    zip.finish().unwrap();
    buffer.into_inner()
}

fn data(value: Value) -> DataMap {
    value.as_object().unwrap().clone()
}

fn rendered_document_xml(rendered: &[u8]) -> String {
    let archive = OoxmlArchive::from_reader(Cursor::new(rendered.to_vec())).unwrap();
    String::from_utf8(archive.document_xml().unwrap().to_vec()).unwrap()
}

fn body_text(document_xml: &str) -> String {
    parse_part(document_xml.as_bytes()).unwrap().inner_text()
}

fn hilite_para(text: &str) -> String {
    format!(
        r#"<w:p><w:r><w:rPr><w:highlight w:val="yellow"/></w:rPr><w:t>{text}</w:t></w:r></w:p>"#
    )
}

fn plain_para(text: &str) -> String {
    format!("<w:p><w:r><w:t>{text}</w:t></w:r></w:p>")
}

#[test]
fn scalar_substitution_with_line_breaks() {
    let template = docx_with_body(&hilite_para("${addr}"));
    let rendered = render_bytes(&template, &data(json!({"addr": r"a\nb"}))).unwrap();

    let doc = rendered_document_xml(&rendered);
    assert!(doc.contains(r#"<w:t xml:space="preserve">a</w:t>"#));
    assert!(doc.contains("<w:br/>"));
    assert!(doc.contains(r#"<w:t xml:space="preserve">b</w:t>"#));
    assert!(!doc.contains("highlight"));
    assert!(!doc.contains("${addr}"));
}

#[test]
fn scalar_absent_name_leaves_template_content() {
    let template = docx_with_body(&hilite_para("${missing}"));
    let rendered = render_bytes(&template, &data(json!({"present": 1}))).unwrap();

    let doc = rendered_document_xml(&rendered);
    assert!(doc.contains("${missing}"));
    assert!(doc.contains("highlight"));
}

#[test]
fn repetition_produces_one_range_clone_per_row() {
    let body = format!(
        "{}{}{}{}",
        plain_para("#rows["),
        format!("{}{}", hilite_para("${v}"), plain_para("tail")),
        plain_para("]"),
        plain_para("after")
    );
    let template = docx_with_body(&body);
    let rendered = render_bytes(
        &template,
        &data(json!({"rows": [{"v": "1"}, {"v": "2"}, {"v": "3"}]})),
    )
    .unwrap();

    let doc = rendered_document_xml(&rendered);
    let root = parse_part(doc.as_bytes()).unwrap();
    let paragraphs = root.find_child("body").unwrap().child_elements().count();
    // 3 rows x range length 2, plus the trailing unrelated paragraph
    assert_eq!(paragraphs, 7);
    assert_eq!(body_text(&doc), "1tail2tail3tailafter");
    assert!(!doc.contains("#rows["));
}

#[test]
fn repetition_absent_key_is_stable() {
    let body = format!(
        "{}{}{}",
        plain_para("#rows["),
        hilite_para("${v}"),
        plain_para("]")
    );
    let template = docx_with_body(&body);

    let rendered = render_bytes(&template, &data(json!({"unrelated": []}))).unwrap();
    let doc = rendered_document_xml(&rendered);
    assert!(doc.contains("#rows["));
    assert!(doc.contains("${v}"));
    assert_eq!(body_text(&doc), "#rows[${v}]");
}

#[test]
fn nested_repetition_keeps_inner_rows_per_outer_clone() {
    let inner_table = format!(
        "<w:tbl><w:tr><w:tc>{}</w:tc></w:tr><w:tr><w:tc>{}</w:tc></w:tr><w:tr><w:tc>{}</w:tc></w:tr></w:tbl>",
        plain_para("#items["),
        hilite_para("${item}"),
        plain_para("].")
    );
    let body = format!(
        "{}{}{}{}",
        plain_para("#groups["),
        hilite_para("${label}"),
        inner_table,
        plain_para("]")
    );
    let template = docx_with_body(&body);
    let rendered = render_bytes(
        &template,
        &data(json!({
            "groups": [
                {"label": "A", "items": [{"item": "a1"}, {"item": "a2"}]},
                {"label": "B", "items": [{"item": "b1"}]}
            ]
        })),
    )
    .unwrap();

    let doc = rendered_document_xml(&rendered);
    assert_eq!(body_text(&doc), "Aa1a2Bb1");

    let root = parse_part(doc.as_bytes()).unwrap();
    let body_el = root.find_child("body").unwrap();
    let row_counts: Vec<usize> = body_el
        .child_elements()
        .filter(|el| el.local_name() == "tbl")
        .map(|tbl| tbl.child_elements().count())
        .collect();
    assert_eq!(row_counts, vec![2, 1]);
}

#[test]
fn markerless_template_round_trips() {
    let body = format!(
        "{}{}",
        plain_para("Just a document."),
        r#"<w:p><w:pPr><w:pStyle w:val="Heading1"/></w:pPr><w:r><w:rPr><w:b/></w:rPr><w:t xml:space="preserve"> spaced </w:t></w:r></w:p>"#
    );
    let template = docx_with_body(&body);
    let rendered = render_bytes(&template, &data(json!({"anything": "x"}))).unwrap();

    let before = OoxmlArchive::from_reader(Cursor::new(template.clone())).unwrap();
    let after = OoxmlArchive::from_reader(Cursor::new(rendered)).unwrap();

    // Structural equivalence: same tree, modulo re-serialization
    let tree_before = parse_part(before.document_xml().unwrap()).unwrap();
    let tree_after = parse_part(after.document_xml().unwrap()).unwrap();
    assert_eq!(tree_before, tree_after);

    // Untouched parts survive byte-for-byte
    assert_eq!(before.get("_rels/.rels"), after.get("_rels/.rels"));
}

#[test]
fn template_bytes_are_not_mutated() {
    let template = docx_with_body(&hilite_para("${x}"));
    let copy = template.clone();
    let _ = render_bytes(&template, &data(json!({"x": "y"}))).unwrap();
    assert_eq!(template, copy);
}
