// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-FlowGen-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of FlowGen and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::fmt;

use schemars::JsonSchema;
use serde::Serialize;

/// Non-fatal findings collected while parsing a model reply and merging it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, JsonSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Diagnostic {
    /// The reply carried no fenced code block of the expected language.
    NoFencedBlock,
    RepairApplied { repair: String },
    DroppedElement { tag: String, reason: String },
    /// An operation was skipped; the rest of the change-set still applied.
    OperationFailure { id: String, reason: String },
    DanglingReference { edge_id: String, attribute: String, missing_id: String },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoFencedBlock => write!(f, "reply contained no fenced xml block"),
            Self::RepairApplied { repair } => write!(f, "repaired change-set: {repair}"),
            Self::DroppedElement { tag, reason } => write!(f, "dropped <{tag}>: {reason}"),
            Self::OperationFailure { id, reason } => {
                write!(f, "operation on '{id}' skipped: {reason}")
            }
            Self::DanglingReference { edge_id, attribute, missing_id } => {
                write!(f, "edge '{edge_id}' {attribute} references missing id '{missing_id}'")
            }
        }
    }
}
