// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-FlowGen-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of FlowGen and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Character-budgeted projections of a document.
//!
//! [`extract`] renders the elements between two depths as indented XML so a model sees the cells
//! it may edit without the whole file. [`outline`] renders the logical graph (nodes and
//! connections) instead of markup.

use std::collections::{HashMap, HashSet};

use crate::format::xml::{escape_text, write_start_tag};
use crate::model::{CellInfo, CellKind, Document, NodeData, NodeId};

/// Below this share of the budget, adaptive extraction widens the depth range.
pub const ADAPTIVE_FILL_RATIO: f64 = 0.7;

/// Appended when a projection was cut at the character budget.
pub const ELLIPSIS: &str = "...";

#[derive(Debug, Clone, PartialEq)]
pub struct ExtractOptions {
    pub start_depth: usize,
    pub end_depth: usize,
    /// Budget in characters (not bytes).
    pub max_chars: usize,
    pub adaptive: bool,
    pub fill_ratio: f64,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            start_depth: 4,
            end_depth: 10,
            max_chars: 5000,
            adaptive: true,
            fill_ratio: ADAPTIVE_FILL_RATIO,
        }
    }
}

/// Renders every element with depth in `[start_depth, end_depth]` as an indented XML block.
///
/// Blocks are emitted level by level; an element already shown inside an ancestor's block is
/// skipped. The result is at most `max_chars` characters plus [`ELLIPSIS`].
pub fn extract(doc: &Document, options: &ExtractOptions) -> String {
    let mut end_depth = options.end_depth.max(options.start_depth);
    let mut projection = project(doc, options, end_depth);

    if options.adaptive {
        let threshold = options.max_chars as f64 * options.fill_ratio;
        while !projection.truncated
            && projection.has_deeper
            && (projection.chars as f64) < threshold
        {
            end_depth += 1;
            projection = project(doc, options, end_depth);
        }
        if end_depth != options.end_depth {
            tracing::debug!(
                requested = options.end_depth,
                effective = end_depth,
                "widened extraction depth"
            );
        }
    }

    tracing::debug!(
        chars = projection.chars,
        truncated = projection.truncated,
        "extracted document view"
    );
    projection.finish()
}

struct Projection {
    writer: BudgetWriter,
    chars: usize,
    truncated: bool,
    has_deeper: bool,
}

impl Projection {
    fn finish(self) -> String {
        self.writer.finish()
    }
}

fn project(doc: &Document, options: &ExtractOptions, end_depth: usize) -> Projection {
    let mut levels: Vec<Vec<NodeId>> = Vec::new();
    let mut stack = vec![(doc.root(), 0usize)];
    while let Some((node, depth)) = stack.pop() {
        if depth > end_depth {
            continue;
        }
        if depth >= options.start_depth && doc.element(node).is_some() {
            let level = depth - options.start_depth;
            if levels.len() <= level {
                levels.resize_with(level + 1, Vec::new);
            }
            levels[level].push(node);
        }
        stack.extend(doc.element_children(node).map(|child| (child, depth + 1)).rev());
    }

    let mut block = BlockRenderer {
        doc,
        start_depth: options.start_depth,
        end_depth,
        writer: BudgetWriter::new(options.max_chars),
        rendered: HashSet::new(),
        has_deeper: false,
    };
    'levels: for level in &levels {
        for &node in level {
            if block.rendered.contains(&node) {
                continue;
            }
            block.render(node, options.start_depth);
            if block.writer.exhausted {
                break 'levels;
            }
        }
    }

    let chars = block.writer.chars;
    let truncated = block.writer.exhausted;
    Projection { writer: block.writer, chars, truncated, has_deeper: block.has_deeper }
}

struct BlockRenderer<'a> {
    doc: &'a Document,
    start_depth: usize,
    end_depth: usize,
    writer: BudgetWriter,
    rendered: HashSet<NodeId>,
    has_deeper: bool,
}

impl BlockRenderer<'_> {
    fn indent(&self, depth: usize) -> String {
        "  ".repeat(depth.saturating_sub(self.start_depth))
    }

    fn render(&mut self, node: NodeId, depth: usize) {
        let doc = self.doc;
        let Some(element) = doc.element(node) else {
            return;
        };
        self.rendered.insert(node);

        let mut children = Vec::new();
        for &child in doc.children(node) {
            match doc.node(child) {
                Some(NodeData::Element(_)) if depth < self.end_depth => children.push(child),
                Some(NodeData::Element(_)) => self.has_deeper = true,
                Some(NodeData::Text(text)) if !text.trim().is_empty() => children.push(child),
                _ => {}
            }
        }

        let indent = self.indent(depth);
        let mut open = indent.clone();
        write_start_tag(element, &mut open);
        if children.is_empty() {
            open.push_str("/>");
            self.writer.line(&open);
            return;
        }
        open.push('>');
        self.writer.line(&open);

        for child in children {
            if self.writer.exhausted {
                return;
            }
            match doc.node(child) {
                Some(NodeData::Text(text)) => {
                    let line = format!("{}{}", self.indent(depth + 1), escape_text(text.trim()));
                    self.writer.line(&line);
                }
                Some(NodeData::Element(_)) => self.render(child, depth + 1),
                _ => {}
            }
        }
        let close = format!("{indent}</{}>", element.name());
        self.writer.line(&close);
    }
}

/// Accumulates newline-joined lines and hard-cuts at the character budget.
#[derive(Debug)]
struct BudgetWriter {
    out: String,
    chars: usize,
    max_chars: usize,
    exhausted: bool,
}

impl BudgetWriter {
    fn new(max_chars: usize) -> Self {
        Self { out: String::new(), chars: 0, max_chars, exhausted: false }
    }

    fn line(&mut self, line: &str) {
        if self.chars > 0 {
            self.push("\n");
        }
        self.push(line);
    }

    fn push(&mut self, text: &str) {
        if self.exhausted {
            return;
        }
        let remaining = self.max_chars - self.chars;
        let len = text.chars().count();
        if len <= remaining {
            self.out.push_str(text);
            self.chars += len;
            return;
        }
        let cut = text.char_indices().nth(remaining).map_or(text.len(), |(index, _)| index);
        self.out.push_str(&text[..cut]);
        self.chars += remaining;
        self.exhausted = true;
    }

    fn finish(mut self) -> String {
        if self.exhausted {
            self.out.push_str(ELLIPSIS);
        }
        self.out
    }
}

/// Logical view of the diagram: vertices nested under their parent cells, then connections.
pub fn outline(doc: &Document, max_chars: usize) -> String {
    let cells = doc.cells();
    let by_id: HashMap<&str, &CellInfo> = cells.iter().map(|cell| (cell.id.as_str(), cell)).collect();
    let mut writer = BudgetWriter::new(max_chars);

    for cell in cells.iter().filter(|cell| cell.kind == CellKind::Vertex) {
        let nesting = vertex_nesting(cell, &by_id);
        let line = format!(
            "{}node: {} (id: {})",
            "  ".repeat(nesting),
            display_value(cell),
            cell.id
        );
        writer.line(&line);
        if writer.exhausted {
            return writer.finish();
        }
    }

    let edges: Vec<&CellInfo> = cells.iter().filter(|cell| cell.kind == CellKind::Edge).collect();
    if !edges.is_empty() {
        writer.line("connections:");
    }
    for edge in edges {
        let endpoint = |id: Option<&str>| match id {
            Some(id) => by_id.get(id).map_or_else(|| id.to_owned(), |cell| display_value(cell)),
            None => "?".to_owned(),
        };
        let mut line = format!(
            "{} -> {}",
            endpoint(edge.source.as_deref()),
            endpoint(edge.target.as_deref())
        );
        if !edge.value.is_empty() {
            line.push(' ');
            line.push_str(&edge.value);
        }
        writer.line(&line);
        if writer.exhausted {
            break;
        }
    }
    writer.finish()
}

fn display_value(cell: &CellInfo) -> String {
    if cell.value.trim().is_empty() {
        cell.id.clone()
    } else {
        cell.value.trim().to_owned()
    }
}

/// Number of vertex ancestors in the `parent` attribute chain.
fn vertex_nesting(cell: &CellInfo, by_id: &HashMap<&str, &CellInfo>) -> usize {
    let mut nesting = 0;
    let mut seen = HashSet::from([cell.id.as_str()]);
    let mut parent = cell.parent.as_deref();
    while let Some(id) = parent {
        let Some(ancestor) = by_id.get(id) else {
            break;
        };
        if ancestor.kind != CellKind::Vertex || !seen.insert(id) {
            break;
        }
        nesting += 1;
        parent = ancestor.parent.as_deref();
    }
    nesting
}
