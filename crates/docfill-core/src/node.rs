//! Generic mutable XML tree for OOXML content parts
//!
//! The template passes rewrite arbitrary WordprocessingML markup: they clone
//! sibling ranges, splice clones back in, and rewrite runs in place. A typed
//! document model would lose everything it does not understand, so the
//! renderer works on a lossless generic tree instead: every element, attribute
//! and text node of the part survives a parse/serialize round trip verbatim
//! (modulo re-serialization artifacts such as `<a></a>` becoming `<a/>`).
//!
//! The tree also carries the few WordprocessingML-aware helpers the passes
//! need: detecting a highlighted run (`w:r` whose `w:rPr` contains
//! `w:highlight`), stripping the highlight, and editing a run's text content.

use quick_xml::events::{BytesDecl, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};

use crate::error::{RenderError, Result};

/// A node in the parsed content tree
#[derive(Debug, Clone, PartialEq)]
pub enum XmlNode {
    /// An element with a name, attributes and ordered children
    Element(Element),
    /// Literal character data (already unescaped)
    Text(String),
    /// An XML comment (raw content between `<!--` and `-->`)
    Comment(String),
}

/// An XML element
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Element {
    /// Qualified name as written in the source, e.g. `w:p`
    pub name: String,
    /// Attributes in source order (qualified name, unescaped value)
    pub attrs: Vec<(String, String)>,
    /// Ordered children; order is the unit of document layout
    pub children: Vec<XmlNode>,
}

impl XmlNode {
    /// Flattened text of this node and all descendants, in document order
    pub fn inner_text(&self) -> String {
        match self {
            XmlNode::Element(el) => el.inner_text(),
            XmlNode::Text(t) => t.clone(),
            XmlNode::Comment(_) => String::new(),
        }
    }

    /// The contained element, if this node is one
    pub fn as_element(&self) -> Option<&Element> {
        match self {
            XmlNode::Element(el) => Some(el),
            _ => None,
        }
    }

    /// Mutable access to the contained element, if this node is one
    pub fn as_element_mut(&mut self) -> Option<&mut Element> {
        match self {
            XmlNode::Element(el) => Some(el),
            _ => None,
        }
    }
}

impl Element {
    /// Create an empty element with the given qualified name
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attrs: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Element name without its namespace prefix
    pub fn local_name(&self) -> &str {
        match self.name.split_once(':') {
            Some((_, local)) => local,
            None => &self.name,
        }
    }

    /// Flattened text of all descendants
    pub fn inner_text(&self) -> String {
        let mut out = String::new();
        collect_text(self, &mut out);
        out
    }

    /// Child elements (skipping text and comment nodes)
    pub fn child_elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(XmlNode::as_element)
    }

    /// First child element with the given local name
    pub fn find_child(&self, local: &str) -> Option<&Element> {
        self.child_elements().find(|el| el.local_name() == local)
    }

    /// First child element with the given local name, mutable
    pub fn find_child_mut(&mut self, local: &str) -> Option<&mut Element> {
        self.children
            .iter_mut()
            .filter_map(XmlNode::as_element_mut)
            .find(|el| el.local_name() == local)
    }

    /// Navigate to a descendant element by child-index path
    ///
    /// Each path step indexes into `children`; every step must land on an
    /// element. An empty path is the element itself.
    pub fn descendant_mut(&mut self, path: &[usize]) -> Option<&mut Element> {
        let mut cur = self;
        for &idx in path {
            cur = cur.children.get_mut(idx)?.as_element_mut()?;
        }
        Some(cur)
    }

    /// Remove the node addressed by a non-empty child-index path
    ///
    /// Sibling indices after the removed node shift down; callers removing
    /// several nodes must apply paths in reverse document order.
    pub fn remove_descendant(&mut self, path: &[usize]) -> Option<XmlNode> {
        let (&last, parent_path) = path.split_last()?;
        let parent = self.descendant_mut(parent_path)?;
        if last < parent.children.len() {
            Some(parent.children.remove(last))
        } else {
            None
        }
    }

    // =========================================================================
    // WordprocessingML run helpers
    // =========================================================================

    /// Whether this element is a run (`w:r`) marked with a text highlight
    ///
    /// Template authors flag placeholder runs by highlighting them in Word;
    /// the flag lives in the run properties as `w:rPr/w:highlight`.
    pub fn is_highlighted_run(&self) -> bool {
        self.local_name() == "r"
            && self
                .find_child("rPr")
                .is_some_and(|rpr| rpr.find_child("highlight").is_some())
    }

    /// Remove the highlight flag from this run's properties
    pub fn clear_highlight(&mut self) {
        if let Some(rpr) = self.find_child_mut("rPr") {
            rpr.children.retain(|child| {
                !matches!(child, XmlNode::Element(el) if el.local_name() == "highlight")
            });
        }
    }

    /// Remove all text children (`w:t`) of this run
    pub fn clear_run_text(&mut self) {
        self.children
            .retain(|child| !matches!(child, XmlNode::Element(el) if el.local_name() == "t"));
    }

    /// Append a `w:t` with the given content
    ///
    /// `xml:space="preserve"` keeps leading and trailing whitespace intact,
    /// which Word otherwise trims.
    pub fn append_run_text(&mut self, text: &str) {
        let mut t = Element::new("w:t");
        t.attrs.push(("xml:space".to_string(), "preserve".to_string()));
        t.children.push(XmlNode::Text(text.to_string()));
        self.children.push(XmlNode::Element(t));
    }

    /// Append a line break (`w:br`)
    pub fn append_run_break(&mut self) {
        self.children.push(XmlNode::Element(Element::new("w:br")));
    }
}

fn collect_text(el: &Element, out: &mut String) {
    for child in &el.children {
        match child {
            XmlNode::Element(inner) => collect_text(inner, out),
            XmlNode::Text(t) => out.push_str(t),
            XmlNode::Comment(_) => {}
        }
    }
}

/// Parse an OOXML part into its root element
///
/// The XML declaration and anything outside the root element are dropped;
/// [`serialize_part`] re-emits a standard declaration.
pub fn parse_part(xml: &[u8]) -> Result<Element> {
    let mut reader = Reader::from_reader(xml);
    // Preserve whitespace in runs
    reader.config_mut().trim_text(false);

    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => {
                stack.push(element_from_start(e));
            }
            Ok(Event::Empty(ref e)) => {
                let el = element_from_start(e);
                attach(&mut stack, &mut root, XmlNode::Element(el));
            }
            Ok(Event::End(_)) => {
                let el = stack.pop().ok_or_else(|| {
                    RenderError::InvalidStructure("unbalanced closing tag".to_string())
                })?;
                attach(&mut stack, &mut root, XmlNode::Element(el));
            }
            Ok(Event::Text(ref e)) => {
                let text = e.unescape()?;
                if let Some(parent) = stack.last_mut() {
                    parent.children.push(XmlNode::Text(text.into_owned()));
                }
            }
            Ok(Event::CData(ref e)) => {
                let text = String::from_utf8_lossy(e).into_owned();
                if let Some(parent) = stack.last_mut() {
                    parent.children.push(XmlNode::Text(text));
                }
            }
            Ok(Event::Comment(ref e)) => {
                let text = String::from_utf8_lossy(e).into_owned();
                if let Some(parent) = stack.last_mut() {
                    parent.children.push(XmlNode::Comment(text));
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(RenderError::Xml(e)),
            // Declaration, processing instructions and DOCTYPE carry no
            // content the passes can touch
            Ok(_) => {}
        }
        buf.clear();
    }

    root.ok_or_else(|| RenderError::InvalidStructure("no root element".to_string()))
}

fn element_from_start(e: &BytesStart) -> Element {
    let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
    let attrs = e
        .attributes()
        .filter_map(|a| a.ok())
        .filter_map(|a| {
            let key = String::from_utf8_lossy(a.key.as_ref()).into_owned();
            let value = a.unescape_value().ok()?.into_owned();
            Some((key, value))
        })
        .collect();
    Element {
        name,
        attrs,
        children: Vec::new(),
    }
}

fn attach(stack: &mut Vec<Element>, root: &mut Option<Element>, node: XmlNode) {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(node);
    } else if root.is_none() {
        if let XmlNode::Element(el) = node {
            *root = Some(el);
        }
    }
}

/// Serialize a part back to bytes, with a standard XML declaration
pub fn serialize_part(root: &Element) -> Result<Vec<u8>> {
    let mut writer = Writer::new(std::io::Cursor::new(Vec::new()));
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), Some("yes"))))?;
    write_element(&mut writer, root)?;
    Ok(writer.into_inner().into_inner())
}

fn write_element<W: std::io::Write>(writer: &mut Writer<W>, el: &Element) -> Result<()> {
    let mut start = BytesStart::new(el.name.as_str());
    for (key, value) in &el.attrs {
        start.push_attribute((key.as_str(), value.as_str()));
    }

    if el.children.is_empty() {
        writer.write_event(Event::Empty(start))?;
        return Ok(());
    }

    writer.write_event(Event::Start(start))?;
    for child in &el.children {
        match child {
            XmlNode::Element(inner) => write_element(writer, inner)?,
            XmlNode::Text(t) => writer.write_event(Event::Text(BytesText::new(t)))?,
            XmlNode::Comment(c) => {
                writer.write_event(Event::Comment(BytesText::from_escaped(c.as_str())))?
            }
        }
    }
    writer.write_event(Event::End(quick_xml::events::BytesEnd::new(el.name.as_str())))?;
    Ok(())
}
