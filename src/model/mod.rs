// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-FlowGen-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of FlowGen and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Core document model.
//!
//! A draw.io file is an `mxfile` envelope holding pages (`diagram`), each with a graph model
//! whose `root` lists the cells. The model keeps the whole tree, including whitespace text and
//! comments, so untouched regions serialize back unchanged.

pub mod cells;
pub mod document;
#[cfg(test)]
pub(crate) mod fixtures;
pub mod ids;

pub use cells::{CellGeometry, CellInfo, CellKind};
pub use document::{
    Attribute, Descendants, Document, DocumentError, Element, ElementKind, Fragment, NodeData,
    NodeId, GEOMETRY_TAGS,
};
pub use ids::{CellId, DiagramId, Id, IdError};
