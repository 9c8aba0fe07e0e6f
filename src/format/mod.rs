// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-FlowGen-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of FlowGen and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Diagram format parsing/export.
//!
//! The only wire format is the draw.io `mxfile` XML dialect. Parsing goes through `roxmltree`;
//! serialization is hand-written so untouched regions come back byte-for-byte.

pub mod xml;

pub use xml::{parse_document, parse_fragments, serialize_document, serialize_fragment, serialize_node};
