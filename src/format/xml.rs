// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-FlowGen-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of FlowGen and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::borrow::Cow;

use roxmltree::{Node, NodeType, ParsingOptions};

pub use crate::model::DocumentError;
use crate::model::{Document, Element, Fragment, NodeData, NodeId};

/// Synthetic root used to parse several sibling elements as one document.
const FRAGMENT_WRAPPER: &str = "flowgen-fragment";

fn parsing_options() -> ParsingOptions {
    ParsingOptions { allow_dtd: true, ..ParsingOptions::default() }
}

/// Parses a complete diagram document.
///
/// The text before and after the root element (XML declaration, trailing newline) is kept
/// verbatim. Duplicate `id` attributes make the document malformed. Ids are unique across the
/// whole file, so a multi-page document whose pages each restate cells `0`/`1` is rejected.
pub fn parse_document(text: &str) -> Result<Document, DocumentError> {
    let parsed = roxmltree::Document::parse_with_options(text, parsing_options())
        .map_err(|err| DocumentError::Malformed { message: err.to_string() })?;
    let root = parsed.root_element();

    let mut doc = Document::new(convert_element(root));
    let range = root.range();
    doc.set_prolog(&text[..range.start]);
    doc.set_epilog(&text[range.end..]);

    let root_node = doc.root();
    append_children(&mut doc, root_node, root).map_err(|err| match err {
        DocumentError::DuplicateId { id } => DocumentError::Malformed {
            message: format!("duplicate element id '{id}' (ids must be unique across all pages)"),
        },
        other => other,
    })?;
    Ok(doc)
}

/// Parses a sequence of sibling elements (a change-set body).
///
/// Text and comments between the top-level elements are dropped; nested text is kept.
pub fn parse_fragments(text: &str) -> Result<Vec<Fragment>, DocumentError> {
    let wrapped = format!("<{FRAGMENT_WRAPPER}>{text}</{FRAGMENT_WRAPPER}>");
    let parsed = roxmltree::Document::parse_with_options(&wrapped, parsing_options())
        .map_err(|err| DocumentError::Malformed { message: err.to_string() })?;
    Ok(parsed.root_element().children().filter(Node::is_element).map(convert_fragment).collect())
}

fn qualified_name(node: Node<'_, '_>, name: &str, namespace: Option<&str>) -> String {
    match namespace.and_then(|uri| node.lookup_prefix(uri)) {
        Some(prefix) if !prefix.is_empty() => format!("{prefix}:{name}"),
        _ => name.to_owned(),
    }
}

fn convert_element(node: Node<'_, '_>) -> Element {
    let tag = node.tag_name();
    let mut element = Element::new(qualified_name(node, tag.name(), tag.namespace()));
    for attr in node.attributes() {
        element.set_attribute(qualified_name(node, attr.name(), attr.namespace()), attr.value());
    }
    element
}

fn convert_data(node: Node<'_, '_>) -> Option<NodeData> {
    match node.node_type() {
        NodeType::Element => Some(NodeData::Element(convert_element(node))),
        NodeType::Text => Some(NodeData::Text(node.text().unwrap_or_default().to_owned())),
        NodeType::Comment => Some(NodeData::Comment(node.text().unwrap_or_default().to_owned())),
        NodeType::PI | NodeType::Root => None,
    }
}

fn append_children(
    doc: &mut Document,
    parent: NodeId,
    node: Node<'_, '_>,
) -> Result<(), DocumentError> {
    for child in node.children() {
        let Some(data) = convert_data(child) else {
            continue;
        };
        let child_id = doc.append_child(parent, data)?;
        if child.is_element() {
            append_children(doc, child_id, child)?;
        }
    }
    Ok(())
}

fn convert_fragment(node: Node<'_, '_>) -> Fragment {
    let children = node
        .children()
        .filter_map(|child| match convert_data(child)? {
            NodeData::Element(_) => Some(convert_fragment(child)),
            NodeData::Text(text) => Some(Fragment::text(text)),
            NodeData::Comment(text) => Some(Fragment::comment(text)),
        })
        .collect();
    Fragment::element(convert_element(node), children)
}

/// Serializes the whole document, prolog and epilog included.
pub fn serialize_document(doc: &Document) -> String {
    let mut out = String::with_capacity(doc.element_count() * 64);
    out.push_str(doc.prolog());
    write_node(doc, doc.root(), &mut out);
    out.push_str(doc.epilog());
    out
}

/// Serializes one subtree of `doc` exactly as it appears inside the full document.
pub fn serialize_node(doc: &Document, node: NodeId) -> String {
    let mut out = String::new();
    write_node(doc, node, &mut out);
    out
}

pub fn serialize_fragment(fragment: &Fragment) -> String {
    let mut out = String::new();
    write_fragment(fragment, &mut out);
    out
}

fn write_node(doc: &Document, node: NodeId, out: &mut String) {
    let Some(data) = doc.node(node) else {
        return;
    };
    let children = doc.children(node);
    match data {
        NodeData::Element(element) => {
            write_start_tag(element, out);
            if children.is_empty() {
                out.push_str("/>");
                return;
            }
            out.push('>');
            for child in children {
                write_node(doc, *child, out);
            }
            write_end_tag(element, out);
        }
        NodeData::Text(text) => out.push_str(&escape_text(text)),
        NodeData::Comment(text) => write_comment(text, out),
    }
}

fn write_fragment(fragment: &Fragment, out: &mut String) {
    match fragment.data() {
        NodeData::Element(element) => {
            write_start_tag(element, out);
            if fragment.children().is_empty() {
                out.push_str("/>");
                return;
            }
            out.push('>');
            for child in fragment.children() {
                write_fragment(child, out);
            }
            write_end_tag(element, out);
        }
        NodeData::Text(text) => out.push_str(&escape_text(text)),
        NodeData::Comment(text) => write_comment(text, out),
    }
}

/// Writes `<name a="b"` without the closing bracket.
pub(crate) fn write_start_tag(element: &Element, out: &mut String) {
    out.push('<');
    out.push_str(element.name());
    for attr in element.attributes() {
        out.push(' ');
        out.push_str(&attr.name);
        out.push_str("=\"");
        out.push_str(&escape_attribute(&attr.value));
        out.push('"');
    }
}

fn write_end_tag(element: &Element, out: &mut String) {
    out.push_str("</");
    out.push_str(element.name());
    out.push('>');
}

fn write_comment(text: &str, out: &mut String) {
    out.push_str("<!--");
    out.push_str(text);
    out.push_str("-->");
}

pub(crate) fn escape_attribute(value: &str) -> Cow<'_, str> {
    if !value.contains(['&', '<', '>', '"', '\n', '\r', '\t']) {
        return Cow::Borrowed(value);
    }
    let mut out = String::with_capacity(value.len() + 16);
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\n' => out.push_str("&#xa;"),
            '\r' => out.push_str("&#xd;"),
            '\t' => out.push_str("&#x9;"),
            _ => out.push(ch),
        }
    }
    Cow::Owned(out)
}

pub(crate) fn escape_text(value: &str) -> Cow<'_, str> {
    if !value.contains(['&', '<', '>']) {
        return Cow::Borrowed(value);
    }
    let mut out = String::with_capacity(value.len() + 16);
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(ch),
        }
    }
    Cow::Owned(out)
}
