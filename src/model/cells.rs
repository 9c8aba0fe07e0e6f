// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-FlowGen-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of FlowGen and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use super::document::{Document, ElementKind, NodeId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellKind {
    Vertex,
    Edge,
}

/// Geometry attributes of a cell, kept as the raw attribute strings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CellGeometry {
    pub x: Option<String>,
    pub y: Option<String>,
    pub width: Option<String>,
    pub height: Option<String>,
    pub relative: bool,
}

/// Flat view of one vertex or edge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellInfo {
    pub node: NodeId,
    pub id: String,
    pub kind: CellKind,
    pub value: String,
    pub style: String,
    pub parent: Option<String>,
    pub source: Option<String>,
    pub target: Option<String>,
    pub geometry: Option<CellGeometry>,
}

impl Document {
    /// All vertices and edges in document order.
    ///
    /// Cells without an id are skipped; they cannot be referenced by edges or change-sets.
    pub fn cells(&self) -> Vec<CellInfo> {
        let mut cells = Vec::new();
        for (node, element) in self.elements() {
            let kind = match element.kind() {
                ElementKind::Vertex => CellKind::Vertex,
                ElementKind::Edge => CellKind::Edge,
                _ => continue,
            };
            let Some(id) = element.id() else {
                continue;
            };
            let geometry = self
                .element_children(node)
                .filter_map(|child| self.element(child))
                .find(|child| child.name() == "mxGeometry")
                .map(|geometry| CellGeometry {
                    x: geometry.attribute("x").map(ToOwned::to_owned),
                    y: geometry.attribute("y").map(ToOwned::to_owned),
                    width: geometry.attribute("width").map(ToOwned::to_owned),
                    height: geometry.attribute("height").map(ToOwned::to_owned),
                    relative: geometry.attribute("relative") == Some("1"),
                });

            cells.push(CellInfo {
                node,
                id: id.to_owned(),
                kind,
                value: element.attribute("value").unwrap_or_default().to_owned(),
                style: element.attribute("style").unwrap_or_default().to_owned(),
                parent: element.attribute("parent").map(ToOwned::to_owned),
                source: element.attribute("source").map(ToOwned::to_owned),
                target: element.attribute("target").map(ToOwned::to_owned),
                geometry,
            });
        }
        cells
    }
}
