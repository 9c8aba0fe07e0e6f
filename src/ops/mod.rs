// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-FlowGen-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of FlowGen and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Mutation operations for diagram documents.
//!
//! A change-set is applied in two phases: every deletion first, then every upsert in order.
//! Individual operations may fail (id collisions, attempts to replace the document root); those
//! are recorded as diagnostics and the remaining operations still apply.

use schemars::JsonSchema;
use serde::Serialize;

use crate::diagnostic::Diagnostic;
use crate::format::xml::{parse_document, serialize_document, DocumentError};
use crate::model::{CellId, CellKind, Document, Fragment};
use crate::patch::ChangeSet;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Op {
    /// Removes the element and its subtree; a no-op when the id is unknown.
    Delete { id: CellId },
    /// Replaces the element in place when the id exists, otherwise appends it to the default
    /// container.
    Upsert { id: CellId, element: Fragment },
}

impl Op {
    pub fn id(&self) -> &CellId {
        match self {
            Self::Delete { id } | Self::Upsert { id, .. } => id,
        }
    }
}

/// Outcome of [`apply_ops`]; serialized as-is on the HTTP surface.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, JsonSchema)]
pub struct MergeResult {
    pub success: bool,
    pub message: String,
    pub replaced_count: usize,
    pub added_count: usize,
    pub deleted_count: usize,
    pub added_ids: Vec<String>,
    pub deleted_ids: Vec<String>,
    pub diagnostics: Vec<Diagnostic>,
}

#[derive(Debug, Default)]
struct MergeBuilder {
    replaced: Vec<String>,
    added: Vec<String>,
    deleted: Vec<String>,
    diagnostics: Vec<Diagnostic>,
    failures: usize,
}

impl MergeBuilder {
    fn record_replaced(&mut self, id: &CellId) {
        self.replaced.push(id.to_string());
    }

    fn record_added(&mut self, id: &CellId) {
        self.added.push(id.to_string());
    }

    fn record_deleted(&mut self, id: &CellId) {
        self.deleted.push(id.to_string());
    }

    fn record_failure(&mut self, id: &CellId, reason: impl Into<String>) {
        let reason = reason.into();
        tracing::warn!(id = %id, %reason, "skipping operation");
        self.failures += 1;
        self.diagnostics.push(Diagnostic::OperationFailure { id: id.to_string(), reason });
    }

    fn finish(self, op_count: usize) -> MergeResult {
        let applied = self.replaced.len() + self.added.len() + self.deleted.len();
        let mut message = format!(
            "replaced {}, added {}, deleted {} element(s)",
            self.replaced.len(),
            self.added.len(),
            self.deleted.len()
        );
        if self.failures > 0 {
            message.push_str(&format!("; skipped {} operation(s)", self.failures));
        }

        MergeResult {
            success: op_count == 0 || applied > 0 || self.failures == 0,
            message,
            replaced_count: self.replaced.len(),
            added_count: self.added.len(),
            deleted_count: self.deleted.len(),
            added_ids: self.added,
            deleted_ids: self.deleted,
            diagnostics: self.diagnostics,
        }
    }
}

/// Applies `ops` to `doc`: deletions first, then upserts in their given order.
pub fn apply_ops(doc: &mut Document, ops: &[Op]) -> MergeResult {
    let mut builder = MergeBuilder::default();

    for op in ops {
        if let Op::Delete { id } = op {
            apply_delete(doc, id, &mut builder);
        }
    }
    for op in ops {
        if let Op::Upsert { id, element } = op {
            apply_upsert(doc, id, element, &mut builder);
        }
    }
    check_edge_references(doc, &mut builder);

    let result = builder.finish(ops.len());
    tracing::debug!(message = %result.message, success = result.success, "applied change-set");
    result
}

/// New document text plus the merge report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Merged {
    pub content: String,
    pub result: MergeResult,
}

/// Parses `original` fresh, applies the change-set and serializes the outcome.
///
/// Fails only when `original` itself is malformed; problems in the change-set end up in
/// [`MergeResult::diagnostics`].
pub fn merge_document(original: &str, change_set: &ChangeSet) -> Result<Merged, DocumentError> {
    let mut doc = parse_document(original)?;
    let mut result = apply_ops(&mut doc, &change_set.ops);
    if !change_set.diagnostics.is_empty() {
        let mut diagnostics = change_set.diagnostics.clone();
        diagnostics.append(&mut result.diagnostics);
        result.diagnostics = diagnostics;
    }
    Ok(Merged { content: serialize_document(&doc), result })
}

// Per-op application and post-merge checks.
include!("ops_impl.rs");
