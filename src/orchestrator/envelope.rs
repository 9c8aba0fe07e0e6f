// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-FlowGen-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of FlowGen and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Canonical envelope for generated documents: `mxfile > diagram > mxGraphModel > root`.

use crate::format::xml::{parse_document, serialize_document};
use crate::model::{Document, DocumentError, Element, Fragment, NodeId};

/// Parses a generated document and re-serializes it inside the canonical envelope.
///
/// Accepts a full `mxfile` or any inner level (`diagram`, `mxGraphModel`, `root`); missing
/// layers are added, each page gets an id, and every `root` starts with the two bookkeeping
/// cells `0` and `1`.
pub fn normalize_envelope(text: &str) -> Result<String, DocumentError> {
    let doc = parse_document(text)?;
    let root_name = doc.element(doc.root()).map(|element| element.name().to_owned()).unwrap_or_default();

    let mut doc = match root_name.as_str() {
        "mxfile" => doc,
        "diagram" => rewrap(doc, &[])?,
        "mxGraphModel" => rewrap(doc, &[page_element()])?,
        "root" => rewrap(doc, &[Element::new("mxGraphModel"), page_element()])?,
        other => {
            return Err(DocumentError::Malformed {
                message: format!("unexpected document element <{other}>"),
            })
        }
    };

    complete_pages(&mut doc)?;
    Ok(serialize_document(&doc))
}

fn page_element() -> Element {
    Element::new("diagram")
        .with_attribute("id", uuid::Uuid::new_v4().to_string())
        .with_attribute("name", "Page-1")
}

/// Moves the whole tree under `layers` (innermost first) and a fresh `mxfile`.
fn rewrap(doc: Document, layers: &[Element]) -> Result<Document, DocumentError> {
    let prolog = doc.prolog().to_owned();
    let inner = doc.into_fragment();
    let wrapped = layers
        .iter()
        .cloned()
        .fold(inner, |inner, layer| Fragment::element(layer, vec![inner]));

    let mut out = Document::new(Element::new("mxfile"));
    let root = out.root();
    out.insert_fragment(root, 0, &wrapped)?;
    out.set_prolog(prolog);
    Ok(out)
}

fn children_named(doc: &Document, parent: NodeId, name: &str) -> Vec<NodeId> {
    doc.element_children(parent)
        .filter(|child| doc.element(*child).is_some_and(|element| element.name() == name))
        .collect()
}

fn complete_pages(doc: &mut Document) -> Result<(), DocumentError> {
    let file = doc.root();

    for model in children_named(doc, file, "mxGraphModel") {
        doc.wrap(model, page_element())?;
    }
    if children_named(doc, file, "diagram").is_empty() {
        let empty = Document::empty().into_fragment();
        for page in empty.children() {
            doc.insert_fragment(file, usize::MAX, page)?;
        }
        return Ok(());
    }

    for page in children_named(doc, file, "diagram") {
        if doc.element(page).and_then(Element::id).is_none() {
            doc.set_attribute(page, "id", uuid::Uuid::new_v4().to_string())?;
        }
        for cells in children_named(doc, page, "root") {
            doc.wrap(cells, Element::new("mxGraphModel"))?;
        }
        for model in children_named(doc, page, "mxGraphModel") {
            let roots = children_named(doc, model, "root");
            let cells = match roots.first() {
                Some(cells) => *cells,
                None => doc.insert_fragment(model, usize::MAX, &Fragment::element(Element::new("root"), Vec::new()))?,
            };
            ensure_base_cells(doc, cells)?;
        }
    }
    Ok(())
}

fn ensure_base_cells(doc: &mut Document, cells: NodeId) -> Result<(), DocumentError> {
    if !doc.contains_id("0") {
        let zero = Element::new("mxCell").with_attribute("id", "0");
        doc.insert_fragment(cells, 0, &Fragment::element(zero, Vec::new()))?;
    }
    if !doc.contains_id("1") {
        let after_zero = doc
            .find_by_id("0")
            .filter(|zero| doc.parent(*zero) == Some(cells))
            .and_then(|zero| doc.index_in_parent(zero))
            .map_or(0, |index| index + 1);
        let layer = Element::new("mxCell").with_attribute("id", "1").with_attribute("parent", "0");
        doc.insert_fragment(cells, after_zero, &Fragment::element(layer, Vec::new()))?;
    }
    Ok(())
}
