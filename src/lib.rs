// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-FlowGen-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of FlowGen and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! FlowGen: AI-assisted editing of draw.io diagrams.
//!
//! The core is an incremental patch engine. A large document is projected into a bounded
//! excerpt ([`extract`]), the model answers with a change-set ([`patch`]) and the change-set is
//! merged into a fresh parse of the original ([`ops`]), leaving every untouched byte in place.
//! [`orchestrator`] ties these together with a model client ([`llm`]); [`server`] exposes them
//! over HTTP.

pub mod config;
pub mod diagnostic;
pub mod extract;
pub mod format;
pub mod llm;
pub mod model;
pub mod ops;
pub mod orchestrator;
pub mod patch;
pub mod server;
pub mod store;
