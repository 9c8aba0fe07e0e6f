// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-FlowGen-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of FlowGen and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! HTTP surface.
//!
//! A thin axum layer over the orchestrator and the diagram store. Generation failures are
//! reported in the body (`success: false`), not as HTTP errors.

mod routes;
pub mod types;

pub use routes::{router, ApiError, AppState};
