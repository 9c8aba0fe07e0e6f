// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-FlowGen-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of FlowGen and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::collections::{HashMap, HashSet};

/// Tag names that carry positional data for their parent cell.
pub const GEOMETRY_TAGS: &[&str] = &["mxGeometry", "mxPoint", "mxRectangle", "Array"];

const CONTAINER_TAGS: &[&str] = &["mxfile", "diagram", "mxGraphModel", "root", "UserObject", "object"];

/// Handle to a node stored in a [`Document`] arena.
///
/// Handles are only meaningful for the document that produced them and become stale once the
/// node is detached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: String,
    pub value: String,
}

/// Coarse classification of an element, derived from its tag and cell flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementKind {
    /// `mxCell` with `vertex="1"`.
    Vertex,
    /// `mxCell` with `edge="1"`; carries `source`/`target`.
    Edge,
    /// Structural wrappers and the bookkeeping cells `0`/`1`.
    Container,
    /// `mxGeometry` and the point/array children it owns.
    Geometry,
    Other,
}

/// A tag plus its attributes, in source order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    name: String,
    attributes: Vec<Attribute>,
}

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), attributes: Vec::new() }
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_attribute(name, value);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.iter().find(|attr| attr.name == name).map(|attr| attr.value.as_str())
    }

    /// Overwrites an existing attribute in place (keeping its position) or appends a new one.
    pub fn set_attribute(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.attributes.iter_mut().find(|attr| attr.name == name) {
            Some(existing) => existing.value = value,
            None => self.attributes.push(Attribute { name, value }),
        }
    }

    pub fn id(&self) -> Option<&str> {
        self.attribute("id")
    }

    pub fn kind(&self) -> ElementKind {
        if GEOMETRY_TAGS.contains(&self.name.as_str()) {
            return ElementKind::Geometry;
        }
        if self.name == "mxCell" {
            if self.attribute("edge") == Some("1") {
                return ElementKind::Edge;
            }
            if self.attribute("vertex") == Some("1") {
                return ElementKind::Vertex;
            }
            return ElementKind::Container;
        }
        if CONTAINER_TAGS.contains(&self.name.as_str()) {
            return ElementKind::Container;
        }
        ElementKind::Other
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeData {
    Element(Element),
    Text(String),
    Comment(String),
}

impl NodeData {
    pub fn as_element(&self) -> Option<&Element> {
        match self {
            Self::Element(element) => Some(element),
            Self::Text(_) | Self::Comment(_) => None,
        }
    }
}

/// An owned subtree that does not belong to any document.
///
/// Change-sets carry their replacement elements as fragments; the merge engine materializes
/// them into the target document with [`Document::insert_fragment`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fragment {
    data: NodeData,
    children: Vec<Fragment>,
}

impl Fragment {
    pub fn element(element: Element, children: Vec<Fragment>) -> Self {
        Self { data: NodeData::Element(element), children }
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self { data: NodeData::Text(text.into()), children: Vec::new() }
    }

    pub fn comment(text: impl Into<String>) -> Self {
        Self { data: NodeData::Comment(text.into()), children: Vec::new() }
    }

    pub fn data(&self) -> &NodeData {
        &self.data
    }

    pub fn as_element(&self) -> Option<&Element> {
        self.data.as_element()
    }

    pub fn children(&self) -> &[Fragment] {
        &self.children
    }

    pub fn id(&self) -> Option<&str> {
        self.as_element().and_then(Element::id)
    }

    /// Every `id` in the subtree, pre-order, duplicates included.
    pub fn ids(&self) -> Vec<&str> {
        let mut out = Vec::new();
        let mut stack = vec![self];
        while let Some(fragment) = stack.pop() {
            if let Some(id) = fragment.id() {
                out.push(id);
            }
            stack.extend(fragment.children.iter().rev());
        }
        out
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DocumentError {
    #[error("malformed document: {message}")]
    Malformed { message: String },
    #[error("duplicate element id '{id}'")]
    DuplicateId { id: String },
    #[error("node is not a live element of this document")]
    InvalidNode,
}

#[derive(Debug, Clone)]
struct Slot {
    data: NodeData,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// Arena-backed diagram tree.
///
/// Parent links and the id index are maintained by every structural mutation, so
/// `parent`/`find_by_id` are O(1). A document is parsed fresh for each request and dropped after
/// serialization; nothing shares it across requests.
#[derive(Debug, Clone)]
pub struct Document {
    slots: Vec<Option<Slot>>,
    root: NodeId,
    ids: HashMap<String, NodeId>,
    prolog: String,
    epilog: String,
}

impl Document {
    pub fn new(root: Element) -> Self {
        let mut ids = HashMap::new();
        if let Some(id) = root.id() {
            ids.insert(id.to_owned(), NodeId(0));
        }
        Self {
            slots: vec![Some(Slot { data: NodeData::Element(root), parent: None, children: Vec::new() })],
            root: NodeId(0),
            ids,
            prolog: String::new(),
            epilog: String::new(),
        }
    }

    /// The minimal envelope: one page holding the two bookkeeping cells.
    pub fn empty() -> Self {
        Self::empty_with_diagram_id(uuid::Uuid::new_v4().to_string())
    }

    pub fn empty_with_diagram_id(diagram_id: impl Into<String>) -> Self {
        let mut doc = Self::new(Element::new("mxfile"));
        let root = doc.root();
        let page = Element::new("diagram").with_attribute("id", diagram_id).with_attribute("name", "Page-1");
        let cells = Fragment::element(
            page,
            vec![Fragment::element(
                Element::new("mxGraphModel"),
                vec![Fragment::element(
                    Element::new("root"),
                    vec![
                        Fragment::element(Element::new("mxCell").with_attribute("id", "0"), Vec::new()),
                        Fragment::element(
                            Element::new("mxCell").with_attribute("id", "1").with_attribute("parent", "0"),
                            Vec::new(),
                        ),
                    ],
                )],
            )],
        );
        // A fresh document has no ids besides the ones inserted here.
        if doc.insert_fragment(root, 0, &cells).is_err() {
            tracing::error!("empty envelope ids collided with a fresh document");
        }
        doc
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Text preceding the root element (XML declaration, doctype, whitespace).
    pub fn prolog(&self) -> &str {
        &self.prolog
    }

    pub fn set_prolog(&mut self, prolog: impl Into<String>) {
        self.prolog = prolog.into();
    }

    /// Text following the root element.
    pub fn epilog(&self) -> &str {
        &self.epilog
    }

    pub fn set_epilog(&mut self, epilog: impl Into<String>) {
        self.epilog = epilog.into();
    }

    fn slot(&self, node: NodeId) -> Option<&Slot> {
        self.slots.get(node.0).and_then(Option::as_ref)
    }

    fn slot_mut(&mut self, node: NodeId) -> Option<&mut Slot> {
        self.slots.get_mut(node.0).and_then(Option::as_mut)
    }

    pub fn node(&self, node: NodeId) -> Option<&NodeData> {
        self.slot(node).map(|slot| &slot.data)
    }

    pub fn element(&self, node: NodeId) -> Option<&Element> {
        self.node(node).and_then(NodeData::as_element)
    }

    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.slot(node).and_then(|slot| slot.parent)
    }

    pub fn children(&self, node: NodeId) -> &[NodeId] {
        self.slot(node).map(|slot| slot.children.as_slice()).unwrap_or(&[])
    }

    pub fn element_children(&self, node: NodeId) -> impl DoubleEndedIterator<Item = NodeId> + '_ {
        self.children(node).iter().copied().filter(move |child| self.element(*child).is_some())
    }

    pub fn find_by_id(&self, id: &str) -> Option<NodeId> {
        self.ids.get(id).copied()
    }

    pub fn contains_id(&self, id: &str) -> bool {
        self.ids.contains_key(id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.ids.keys().map(String::as_str)
    }

    /// Number of ancestor hops to the document root (root = 0).
    pub fn depth(&self, node: NodeId) -> usize {
        let mut depth = 0;
        let mut current = node;
        while let Some(parent) = self.parent(current) {
            depth += 1;
            current = parent;
        }
        depth
    }

    pub fn index_in_parent(&self, node: NodeId) -> Option<usize> {
        let parent = self.parent(node)?;
        self.children(parent).iter().position(|child| *child == node)
    }

    pub fn is_ancestor_or_self(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(candidate) = current {
            if candidate == ancestor {
                return true;
            }
            current = self.parent(candidate);
        }
        false
    }

    /// Pre-order traversal starting at (and including) `node`.
    pub fn descendants(&self, node: NodeId) -> Descendants<'_> {
        let stack = if self.slot(node).is_some() { vec![node] } else { Vec::new() };
        Descendants { doc: self, stack }
    }

    pub fn elements(&self) -> impl Iterator<Item = (NodeId, &Element)> {
        self.descendants(self.root).filter_map(|node| self.element(node).map(|element| (node, element)))
    }

    pub fn element_count(&self) -> usize {
        self.elements().count()
    }

    pub fn first_element_named(&self, from: NodeId, name: &str) -> Option<NodeId> {
        self.descendants(from).find(|node| self.element(*node).is_some_and(|element| element.name() == name))
    }

    /// The container new cells are appended to: the `root` element of the first graph model.
    ///
    /// Falls back to the graph model itself, then to the document root, for documents that do
    /// not follow the page envelope.
    pub fn default_container(&self) -> NodeId {
        let Some(model) = self.first_element_named(self.root, "mxGraphModel") else {
            return self.root;
        };
        self.element_children(model)
            .find(|child| self.element(*child).is_some_and(|element| element.name() == "root"))
            .unwrap_or(model)
    }

    /// Smallest integer id strictly greater than every numeric id in use (at least `2`, since
    /// draw.io reserves `0` and `1`).
    pub fn next_numeric_id(&self) -> u64 {
        self.ids
            .keys()
            .filter_map(|id| id.parse::<u64>().ok())
            .max()
            .map_or(2, |max| max.saturating_add(1).max(2))
    }

    /// Appends a new child under `parent` (parser entry point).
    pub fn append_child(&mut self, parent: NodeId, data: NodeData) -> Result<NodeId, DocumentError> {
        if self.element(parent).is_none() {
            return Err(DocumentError::InvalidNode);
        }
        if let Some(id) = data.as_element().and_then(Element::id) {
            if self.ids.contains_key(id) {
                return Err(DocumentError::DuplicateId { id: id.to_owned() });
            }
        }
        let node = NodeId(self.slots.len());
        if let Some(id) = data.as_element().and_then(Element::id) {
            self.ids.insert(id.to_owned(), node);
        }
        self.slots.push(Some(Slot { data, parent: Some(parent), children: Vec::new() }));
        if let Some(slot) = self.slot_mut(parent) {
            slot.children.push(node);
        }
        Ok(node)
    }

    /// Removes `node` and its subtree, returning them as an owned fragment.
    ///
    /// The document root cannot be detached.
    pub fn detach(&mut self, node: NodeId) -> Option<Fragment> {
        let parent = self.parent(node)?;
        if let Some(slot) = self.slot_mut(parent) {
            slot.children.retain(|child| *child != node);
        }
        Some(self.take_subtree(node))
    }

    /// Sets an attribute on an element node. Changing `id` re-keys the index and fails when the
    /// new id is taken by another node.
    pub fn set_attribute(
        &mut self,
        node: NodeId,
        name: &str,
        value: impl Into<String>,
    ) -> Result<(), DocumentError> {
        let value = value.into();
        let old_id = self.element(node).ok_or(DocumentError::InvalidNode)?.id().map(str::to_owned);
        if name == "id" {
            if let Some(holder) = self.ids.get(&value) {
                if *holder != node {
                    return Err(DocumentError::DuplicateId { id: value });
                }
            }
            if let Some(old) = old_id {
                self.ids.remove(&old);
            }
            self.ids.insert(value.clone(), node);
        }
        if let Some(Slot { data: NodeData::Element(element), .. }) = self.slot_mut(node) {
            element.set_attribute(name, value);
        }
        Ok(())
    }

    /// Consumes the document, returning the root element and its subtree.
    pub fn into_fragment(mut self) -> Fragment {
        let root = self.root;
        self.take_subtree(root)
    }

    fn take_subtree(&mut self, node: NodeId) -> Fragment {
        let Some(slot) = self.slots.get_mut(node.0).and_then(Option::take) else {
            return Fragment::text(String::new());
        };
        if let Some(id) = slot.data.as_element().and_then(Element::id) {
            if self.ids.get(id) == Some(&node) {
                self.ids.remove(id);
            }
        }
        let children = slot.children.iter().map(|child| self.take_subtree(*child)).collect();
        Fragment { data: slot.data, children }
    }

    /// Materializes `fragment` as the child of `parent` at `index` (clamped to the child count).
    ///
    /// Fails without touching the document when the fragment repeats an id internally or uses
    /// an id that already exists.
    pub fn insert_fragment(
        &mut self,
        parent: NodeId,
        index: usize,
        fragment: &Fragment,
    ) -> Result<NodeId, DocumentError> {
        if self.element(parent).is_none() {
            return Err(DocumentError::InvalidNode);
        }
        let mut seen = HashSet::new();
        for id in fragment.ids() {
            if self.ids.contains_key(id) || !seen.insert(id) {
                return Err(DocumentError::DuplicateId { id: id.to_owned() });
            }
        }

        let node = self.materialize(parent, fragment);
        if let Some(slot) = self.slot_mut(parent) {
            let index = index.min(slot.children.len());
            slot.children.insert(index, node);
        }
        Ok(node)
    }

    fn materialize(&mut self, parent: NodeId, fragment: &Fragment) -> NodeId {
        let node = NodeId(self.slots.len());
        if let Some(id) = fragment.id() {
            self.ids.insert(id.to_owned(), node);
        }
        self.slots.push(Some(Slot { data: fragment.data.clone(), parent: Some(parent), children: Vec::new() }));
        let children = fragment.children.iter().map(|child| self.materialize(node, child)).collect();
        if let Some(slot) = self.slot_mut(node) {
            slot.children = children;
        }
        node
    }

    /// Inserts `wrapper` where `node` sits and moves `node` underneath it.
    pub fn wrap(&mut self, node: NodeId, wrapper: Element) -> Result<NodeId, DocumentError> {
        let parent = self.parent(node).ok_or(DocumentError::InvalidNode)?;
        let index = self.index_in_parent(node).ok_or(DocumentError::InvalidNode)?;
        if let Some(id) = wrapper.id() {
            if self.ids.contains_key(id) {
                return Err(DocumentError::DuplicateId { id: id.to_owned() });
            }
        }

        let wrapper_node = NodeId(self.slots.len());
        if let Some(id) = wrapper.id() {
            self.ids.insert(id.to_owned(), wrapper_node);
        }
        self.slots.push(Some(Slot {
            data: NodeData::Element(wrapper),
            parent: Some(parent),
            children: vec![node],
        }));
        if let Some(slot) = self.slot_mut(parent) {
            slot.children[index] = wrapper_node;
        }
        if let Some(slot) = self.slot_mut(node) {
            slot.parent = Some(wrapper_node);
        }
        Ok(wrapper_node)
    }
}

pub struct Descendants<'a> {
    doc: &'a Document,
    stack: Vec<NodeId>,
}

impl Iterator for Descendants<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let node = self.stack.pop()?;
        self.stack.extend(self.doc.children(node).iter().rev());
        Some(node)
    }
}

#[cfg(test)]
mod tests {
    use super::{Document, DocumentError, Element, ElementKind, Fragment, NodeData, NodeId};

    fn cell(id: &str) -> Fragment {
        Fragment::element(
            Element::new("mxCell").with_attribute("id", id).with_attribute("vertex", "1"),
            vec![Fragment::element(Element::new("mxGeometry").with_attribute("as", "geometry"), Vec::new())],
        )
    }

    #[test]
    fn empty_document_has_page_envelope_and_bookkeeping_cells() {
        let doc = Document::empty_with_diagram_id("page-1");
        let container = doc.default_container();
        assert_eq!(doc.element(container).map(Element::name), Some("root"));
        assert_eq!(doc.depth(container), 3);
        assert!(doc.contains_id("0"));
        assert!(doc.contains_id("1"));
        assert!(doc.contains_id("page-1"));
        assert_eq!(doc.next_numeric_id(), 2);
    }

    #[test]
    fn insert_then_detach_keeps_parent_links_and_index() {
        let mut doc = Document::empty_with_diagram_id("p");
        let container = doc.default_container();
        let node = doc.insert_fragment(container, usize::MAX, &cell("7")).expect("insert");

        assert_eq!(doc.parent(node), Some(container));
        assert_eq!(doc.index_in_parent(node), Some(2));
        assert_eq!(doc.find_by_id("7"), Some(node));
        assert_eq!(doc.next_numeric_id(), 8);

        let detached = doc.detach(node).expect("detach");
        assert_eq!(detached.id(), Some("7"));
        assert_eq!(detached.children().len(), 1);
        assert!(!doc.contains_id("7"));
        assert_eq!(doc.children(container).len(), 2);
    }

    #[test]
    fn insert_rejects_colliding_ids_without_mutation() {
        let mut doc = Document::empty_with_diagram_id("p");
        let container = doc.default_container();
        let before = doc.children(container).len();

        let err = doc.insert_fragment(container, 0, &cell("1")).unwrap_err();
        assert_eq!(err, DocumentError::DuplicateId { id: "1".to_owned() });
        assert_eq!(doc.children(container).len(), before);

        let twice = Fragment::element(Element::new("group"), vec![cell("9"), cell("9")]);
        doc.insert_fragment(container, 0, &twice).unwrap_err();
        assert!(!doc.contains_id("9"));
    }

    #[test]
    fn into_fragment_keeps_the_whole_tree() {
        let doc = Document::empty_with_diagram_id("p");
        let fragment = doc.into_fragment();
        assert_eq!(fragment.as_element().map(Element::name), Some("mxfile"));
        assert_eq!(fragment.ids(), ["p", "0", "1"]);
    }

    #[test]
    fn renaming_an_id_rekeys_the_index() {
        let mut doc = Document::empty_with_diagram_id("p");
        let page = doc.find_by_id("p").expect("page");
        doc.set_attribute(page, "id", "page-2").expect("rename");
        assert!(doc.find_by_id("p").is_none());
        assert_eq!(doc.find_by_id("page-2"), Some(page));

        let err = doc.set_attribute(page, "id", "0").unwrap_err();
        assert_eq!(err, DocumentError::DuplicateId { id: "0".to_owned() });
    }

    #[test]
    fn root_cannot_be_detached() {
        let mut doc = Document::empty_with_diagram_id("p");
        let root = doc.root();
        assert!(doc.detach(root).is_none());
    }

    #[test]
    fn wrap_moves_node_under_new_parent_in_place() {
        let mut doc = Document::new(Element::new("mxfile"));
        let root = doc.root();
        let model = doc.append_child(root, NodeData::Element(Element::new("mxGraphModel"))).expect("append");

        let page = doc.wrap(model, Element::new("diagram").with_attribute("id", "pg")).expect("wrap");
        assert_eq!(doc.children(root), &[page]);
        assert_eq!(doc.parent(model), Some(page));
        assert_eq!(doc.depth(model), 2);
        assert_eq!(doc.find_by_id("pg"), Some(page));
    }

    #[test]
    fn element_children_walk_both_ways() {
        let mut doc = Document::empty_with_diagram_id("p");
        let container = doc.default_container();
        doc.append_child(container, NodeData::Text("\n".to_owned())).expect("append");
        doc.insert_fragment(container, usize::MAX, &cell("5")).expect("insert");

        let id_of = |node: NodeId| doc.element(node).and_then(Element::id).map(str::to_owned);
        let forward: Vec<_> = doc.element_children(container).filter_map(id_of).collect();
        let backward: Vec<_> = doc.element_children(container).rev().filter_map(id_of).collect();
        assert_eq!(forward, ["0", "1", "5"]);
        assert_eq!(backward, ["5", "1", "0"]);
    }

    #[test]
    fn element_kind_follows_cell_flags() {
        let edge = Element::new("mxCell").with_attribute("edge", "1");
        let vertex = Element::new("mxCell").with_attribute("vertex", "1");
        assert_eq!(edge.kind(), ElementKind::Edge);
        assert_eq!(vertex.kind(), ElementKind::Vertex);
        assert_eq!(Element::new("mxCell").kind(), ElementKind::Container);
        assert_eq!(Element::new("mxPoint").kind(), ElementKind::Geometry);
        assert_eq!(Element::new("foo").kind(), ElementKind::Other);
    }

    #[test]
    fn set_attribute_keeps_position() {
        let mut element = Element::new("mxCell").with_attribute("id", "2").with_attribute("value", "A");
        element.set_attribute("id", "3");
        let names: Vec<_> = element.attributes().iter().map(|attr| attr.name.as_str()).collect();
        assert_eq!(names, ["id", "value"]);
        assert_eq!(element.id(), Some("3"));
    }
}
