//! Minimal XML element tree used by the header codec
//!
//! The header is small (a few kilobytes at most), so it is parsed into a tree
//! with the quick-xml pull parser and mapped onto the typed model afterwards.
//! Elements the model does not know about are kept as [`Element`] values so
//! they can be written back unchanged.
//!
//! Character data is kept verbatim. The only text dropped on parse is
//! whitespace between the children of an element that holds no other text,
//! which is layout and not content.

use std::collections::BTreeSet;
use std::io::Write;

use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use serde::{Deserialize, Serialize};

use super::HeaderError;

/// A node inside an [`Element`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Node {
    /// Nested element
    Element(Element),
    /// Character data (already unescaped)
    Text(String),
}

/// A generic XML element with attributes and ordered children
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Element {
    /// Qualified element name as written in the document
    pub name: String,
    /// Attributes in document order
    pub attributes: Vec<(String, String)>,
    /// Child nodes in document order
    pub children: Vec<Node>,
}

impl Element {
    /// Create an empty element
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Create an element holding a single text node
    pub fn with_text(name: impl Into<String>, text: impl Into<String>) -> Self {
        let mut element = Self::new(name);
        let text = text.into();
        if !text.is_empty() {
            element.children.push(Node::Text(text));
        }
        element
    }

    /// Append a child element
    pub fn push(&mut self, child: Element) {
        self.children.push(Node::Element(child));
    }

    /// Append a child element holding `text`
    pub fn push_text(&mut self, name: &str, text: impl Into<String>) {
        self.push(Element::with_text(name, text));
    }

    /// Append a text child only when `value` is present
    pub fn push_opt<T: ToString>(&mut self, name: &str, value: Option<&T>) {
        if let Some(v) = value {
            self.push_text(name, v.to_string());
        }
    }

    /// Look up an attribute value by its qualified name
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Iterate over child elements, skipping text
    pub fn elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|n| match n {
            Node::Element(e) => Some(e),
            Node::Text(_) => None,
        })
    }

    /// Iterate over child elements with the given local name
    pub fn elements_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Element> {
        self.elements().filter(move |e| e.local_name() == name)
    }

    /// Concatenated text content of the direct children
    pub fn text(&self) -> String {
        let mut out = String::new();
        for child in &self.children {
            if let Node::Text(t) = child {
                out.push_str(t);
            }
        }
        out
    }

    /// Element name with any namespace prefix removed
    pub fn local_name(&self) -> &str {
        match self.name.rsplit_once(':') {
            Some((_, local)) => local,
            None => &self.name,
        }
    }

    /// True when the element has at least one child element
    pub fn has_element_children(&self) -> bool {
        self.elements().next().is_some()
    }

    /// True when the element interleaves child elements with non-blank text
    pub fn is_mixed(&self) -> bool {
        self.has_element_children()
            && self.children.iter().any(|n| match n {
                Node::Text(t) => !is_blank(t),
                Node::Element(_) => false,
            })
    }

    /// Namespace prefixes used in this subtree with no declaration in scope
    ///
    /// The reserved `xml` and `xmlns` prefixes never need declaring.
    pub fn undeclared_prefixes(&self) -> BTreeSet<String> {
        let mut out = BTreeSet::new();
        collect_undeclared(self, &mut Vec::new(), &mut out);
        out
    }

    /// Remove whitespace-only text between child elements
    fn drop_layout_text(&mut self) {
        if self.has_element_children() && !self.is_mixed() {
            self.children.retain(|n| matches!(n, Node::Element(_)));
        }
    }
}

fn collect_undeclared<'a>(
    element: &'a Element,
    scope: &mut Vec<&'a str>,
    out: &mut BTreeSet<String>,
) {
    let mark = scope.len();
    scope.extend(
        element
            .attributes
            .iter()
            .filter_map(|(key, _)| key.strip_prefix("xmlns:")),
    );

    let names = std::iter::once(element.name.as_str())
        .chain(element.attributes.iter().map(|(key, _)| key.as_str()));
    for name in names {
        if let Some((prefix, _)) = name.split_once(':') {
            if prefix != "xml" && prefix != "xmlns" && !scope.contains(&prefix) {
                out.insert(prefix.to_string());
            }
        }
    }

    for child in element.elements() {
        collect_undeclared(child, scope, out);
    }
    scope.truncate(mark);
}

fn is_blank(text: &str) -> bool {
    text.chars().all(|c| matches!(c, ' ' | '\t' | '\n' | '\r'))
}

/// Parse a complete document and return its root element
pub fn parse_document(text: &str) -> Result<Element, HeaderError> {
    let mut reader = Reader::from_str(text);

    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;

    loop {
        match reader.read_event()? {
            Event::Start(ref e) => {
                if root.is_some() && stack.is_empty() {
                    return Err(HeaderError::malformed("multiple root elements"));
                }
                stack.push(element_from_start(e)?);
            }
            Event::Empty(ref e) => {
                let element = element_from_start(e)?;
                attach(&mut stack, &mut root, element)?;
            }
            Event::End(_) => {
                let mut element = stack
                    .pop()
                    .ok_or_else(|| HeaderError::malformed("unbalanced end tag"))?;
                element.drop_layout_text();
                attach(&mut stack, &mut root, element)?;
            }
            Event::Text(ref e) => {
                let text = e.unescape()?;
                push_text(&mut stack, &text)?;
            }
            Event::CData(e) => {
                let raw = e.into_inner();
                let text = std::str::from_utf8(&raw)?;
                push_text(&mut stack, text)?;
            }
            Event::Eof => break,
            // Declarations, comments, processing instructions, doctype
            _ => {}
        }
    }

    if let Some(open) = stack.last() {
        return Err(HeaderError::malformed(format!(
            "document ended inside <{}>",
            open.name
        )));
    }

    root.ok_or_else(|| HeaderError::malformed("document has no root element"))
}

fn element_from_start(e: &BytesStart) -> Result<Element, HeaderError> {
    let name = std::str::from_utf8(e.name().as_ref())?.to_string();
    let mut attributes = Vec::new();
    for attr in e.attributes() {
        let attr = attr?;
        let key = std::str::from_utf8(attr.key.as_ref())?.to_string();
        let value = attr.unescape_value()?.into_owned();
        attributes.push((key, value));
    }
    Ok(Element {
        name,
        attributes,
        children: Vec::new(),
    })
}

fn attach(
    stack: &mut [Element],
    root: &mut Option<Element>,
    element: Element,
) -> Result<(), HeaderError> {
    match stack.last_mut() {
        Some(parent) => {
            parent.push(element);
            Ok(())
        }
        None if root.is_some() => Err(HeaderError::malformed("multiple root elements")),
        None => {
            *root = Some(element);
            Ok(())
        }
    }
}

fn push_text(stack: &mut [Element], text: &str) -> Result<(), HeaderError> {
    if text.is_empty() {
        return Ok(());
    }
    let parent = match stack.last_mut() {
        Some(parent) => parent,
        None if is_blank(text) => return Ok(()),
        None => {
            return Err(HeaderError::malformed(
                "character data outside the root element",
            ))
        }
    };
    match parent.children.last_mut() {
        Some(Node::Text(prev)) => prev.push_str(text),
        _ => parent.children.push(Node::Text(text.to_string())),
    }
    Ok(())
}

/// Write an element and its subtree
///
/// Mixed content is written without indentation so its text survives a
/// round trip unchanged.
pub fn write_element<W: Write>(writer: &mut Writer<W>, element: &Element) -> Result<(), HeaderError> {
    if element.is_mixed() {
        let mut plain = Writer::new(Vec::new());
        write_tree(&mut plain, element)?;
        writer.write_indent().map_err(write_error)?;
        return writer
            .get_mut()
            .write_all(&plain.into_inner())
            .map_err(write_error);
    }
    write_tree(writer, element)
}

fn write_tree<W: Write>(writer: &mut Writer<W>, element: &Element) -> Result<(), HeaderError> {
    if !is_valid_name(&element.name) {
        return Err(HeaderError::encoding(format!(
            "invalid element name: {:?}",
            element.name
        )));
    }

    let mut start = BytesStart::new(element.name.as_str());
    for (key, value) in &element.attributes {
        if !is_valid_name(key) {
            return Err(HeaderError::encoding(format!(
                "invalid attribute name {:?} on <{}>",
                key, element.name
            )));
        }
        start.push_attribute((key.as_str(), value.as_str()));
    }

    if element.children.is_empty() {
        return emit(writer, Event::Empty(start));
    }

    emit(writer, Event::Start(start))?;
    for child in &element.children {
        match child {
            Node::Element(e) => write_element(writer, e)?,
            Node::Text(t) => emit(writer, Event::Text(BytesText::new(t)))?,
        }
    }
    emit(writer, Event::End(BytesEnd::new(element.name.as_str())))
}

pub(crate) fn emit<W: Write>(writer: &mut Writer<W>, event: Event<'_>) -> Result<(), HeaderError> {
    writer.write_event(event).map_err(write_error)
}

fn write_error(e: impl std::fmt::Display) -> HeaderError {
    HeaderError::encoding(format!("XML write error: {}", e))
}

/// Check an XML name (element or attribute) against a simplified NameStartChar/NameChar rule
fn is_valid_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_alphabetic() || c == '_' || c == ':' => {}
        _ => return false,
    }
    chars.all(|c| c.is_alphanumeric() || matches!(c, '_' | ':' | '-' | '.'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_nested_tree() {
        let root = parse_document(
            r#"<?xml version="1.0"?>
            <a x="1"><b>hello</b><c/><b>world</b></a>"#,
        )
        .unwrap();

        assert_eq!(root.name, "a");
        assert_eq!(root.attribute("x"), Some("1"));
        let texts: Vec<_> = root.elements_named("b").map(|e| e.text()).collect();
        assert_eq!(texts, vec!["hello", "world"]);
        assert_eq!(root.elements().count(), 3);
    }

    #[test]
    fn test_parse_unescapes_text_and_cdata() {
        let root = parse_document("<a><b>1 &lt; 2</b><c><![CDATA[<raw>]]></c></a>").unwrap();
        assert_eq!(root.elements_named("b").next().unwrap().text(), "1 < 2");
        assert_eq!(root.elements_named("c").next().unwrap().text(), "<raw>");
    }

    #[test]
    fn test_rejects_mismatched_tags() {
        assert!(parse_document("<a><b></a>").is_err());
    }

    #[test]
    fn test_rejects_unclosed_root() {
        assert!(parse_document("<a><b>x</b>").is_err());
    }

    #[test]
    fn test_rejects_multiple_roots() {
        assert!(parse_document("<a/><b/>").is_err());
    }

    #[test]
    fn test_rejects_empty_document() {
        assert!(parse_document("   ").is_err());
    }

    #[test]
    fn test_local_name_strips_prefix() {
        let e = Element::new("ns:thing");
        assert_eq!(e.local_name(), "thing");
    }

    #[test]
    fn test_write_rejects_invalid_name() {
        let mut writer = Writer::new(Vec::new());
        let err = write_element(&mut writer, &Element::new("1bad")).unwrap_err();
        assert!(matches!(err, HeaderError::EncodingError(_)));
    }

    #[test]
    fn test_write_then_parse() {
        let mut root = Element::new("root");
        root.attributes.push(("kind".to_string(), "a&b".to_string()));
        root.push_text("leaf", "x < y");
        root.push(Element::new("empty"));

        let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
        write_element(&mut writer, &root).unwrap();
        let text = String::from_utf8(writer.into_inner()).unwrap();

        let parsed = parse_document(&text).unwrap();
        assert_eq!(parsed, root);
    }

    #[test]
    fn test_undeclared_prefixes_respect_scope() {
        let root = parse_document(
            r#"<v:a xmlns:w="urn:w"><w:b/><v:c xmlns:v="urn:v"/><u:d xml:lang="en"/></v:a>"#,
        )
        .unwrap();
        let prefixes: Vec<_> = root.undeclared_prefixes().into_iter().collect();
        assert_eq!(prefixes, vec!["u", "v"]);
    }

    #[test]
    fn test_parse_keeps_leaf_text_verbatim() {
        let root = parse_document("<a>\n  <b>  padded \n</b>\n  <c> </c>\n</a>").unwrap();
        assert_eq!(root.children.len(), 2);
        assert_eq!(root.elements_named("b").next().unwrap().text(), "  padded \n");
        assert_eq!(root.elements_named("c").next().unwrap().text(), " ");
    }

    #[test]
    fn test_parse_keeps_mixed_content() {
        let root = parse_document("<a>one <b>two</b>\n three </a>").unwrap();
        assert!(root.is_mixed());
        assert_eq!(
            root.children,
            vec![
                Node::Text("one ".to_string()),
                Node::Element(Element::with_text("b", "two")),
                Node::Text("\n three ".to_string()),
            ]
        );
    }

    #[test]
    fn test_indented_write_preserves_mixed_content() {
        let mut mixed = Element::new("note");
        mixed.children.push(Node::Text("  lead ".to_string()));
        mixed.push(Element::new("br"));
        mixed.push_text("em", " x ");
        mixed.children.push(Node::Text("tail\n".to_string()));

        let mut root = Element::new("root");
        root.push_text("leaf", " spaced ");
        root.push(mixed);
        root.push(Element::new("after"));

        let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
        write_element(&mut writer, &root).unwrap();
        let text = String::from_utf8(writer.into_inner()).unwrap();

        assert_eq!(parse_document(&text).unwrap(), root);
    }
}
