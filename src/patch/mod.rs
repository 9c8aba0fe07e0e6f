// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-FlowGen-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of FlowGen and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Turns a model reply into a change-set.
//!
//! The reply is expected to carry one fenced ```` ```xml ```` block listing the elements to
//! upsert, plus `<delete id="..."/>` markers. Parsing is strict first; when that fails a bounded
//! repair pass runs and the parse is retried exactly once.

pub mod repair;

use std::sync::OnceLock;

use regex::Regex;

use crate::diagnostic::Diagnostic;
use crate::format::xml::parse_fragments;
use crate::model::{CellId, ElementKind, Fragment};
use crate::ops::Op;

/// Longest slice of the offending input kept on [`ChangeSetError::Unparsable`].
pub const EXCERPT_CHARS: usize = 200;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    /// Deletions first, then upserts; each group in reply order.
    pub ops: Vec<Op>,
    pub diagnostics: Vec<Diagnostic>,
}

impl ChangeSet {
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn upsert_count(&self) -> usize {
        self.ops.iter().filter(|op| matches!(op, Op::Upsert { .. })).count()
    }

    pub fn delete_count(&self) -> usize {
        self.ops.iter().filter(|op| matches!(op, Op::Delete { .. })).count()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChangeSetError {
    #[error("change-set is not well-formed xml: {reason}")]
    Unparsable { reason: String, excerpt: String },
    #[error("reply has no fenced xml block")]
    MissingBlock,
    #[error("fenced xml block lists no operations")]
    Empty,
}

fn fence_pattern() -> &'static Regex {
    static FENCE: OnceLock<Regex> = OnceLock::new();
    FENCE.get_or_init(|| {
        Regex::new(r"```([\w+.-]*)[^\S\n]*\r?\n?([\s\S]*?)\s*```").expect("static pattern compiles")
    })
}

fn delete_pattern() -> &'static Regex {
    static DELETE: OnceLock<Regex> = OnceLock::new();
    DELETE.get_or_init(|| {
        Regex::new(r#"<delete\s+id\s*=\s*(?:"([^"]*)"|'([^']*)')\s*(?:/>|>\s*</delete\s*>)"#)
            .expect("static pattern compiles")
    })
}

fn declaration_pattern() -> &'static Regex {
    static DECLARATION: OnceLock<Regex> = OnceLock::new();
    DECLARATION.get_or_init(|| Regex::new(r"<\?xml[^>]*\?>").expect("static pattern compiles"))
}

/// Body of the first fenced block tagged `lang`, trimmed. Blocks in other languages are
/// skipped.
pub fn extract_fenced_block<'a>(reply: &'a str, lang: &str) -> Option<&'a str> {
    fence_pattern()
        .captures_iter(reply)
        .find(|caps| caps.get(1).is_some_and(|tag| tag.as_str().eq_ignore_ascii_case(lang)))
        .and_then(|caps| caps.get(2))
        .map(|body| body.as_str().trim())
}

/// Parses a full model reply.
///
/// A reply without a fenced `xml` block is not an error: it yields an empty change-set with a
/// [`Diagnostic::NoFencedBlock`].
pub fn parse_change_set(reply: &str) -> Result<ChangeSet, ChangeSetError> {
    let Some(body) = extract_fenced_block(reply, "xml") else {
        tracing::warn!(reply_chars = reply.chars().count(), "model reply has no fenced xml block");
        return Ok(ChangeSet { ops: Vec::new(), diagnostics: vec![Diagnostic::NoFencedBlock] });
    };
    parse_change_set_body(body)
}

/// Parses the content of a fenced block (delete markers plus sibling elements).
pub fn parse_change_set_body(body: &str) -> Result<ChangeSet, ChangeSetError> {
    let mut change_set = ChangeSet::default();

    for caps in delete_pattern().captures_iter(body) {
        let raw = caps.get(1).or_else(|| caps.get(2)).map_or("", |m| m.as_str());
        match CellId::new(raw.trim()) {
            Ok(id) => change_set.ops.push(Op::Delete { id }),
            Err(err) => change_set.diagnostics.push(Diagnostic::DroppedElement {
                tag: "delete".to_owned(),
                reason: err.to_string(),
            }),
        }
    }

    let cleaned = delete_pattern().replace_all(body, "");
    let cleaned = declaration_pattern().replace_all(&cleaned, "");

    let fragments = match parse_fragments(&cleaned) {
        Ok(fragments) => fragments,
        Err(first) => {
            let repaired = repair::repair(&cleaned);
            if repaired.repairs.is_empty() {
                return Err(unparsable(first.to_string(), &cleaned));
            }
            for applied in &repaired.repairs {
                tracing::warn!(repair = %applied, "repairing change-set");
                change_set.diagnostics.push(Diagnostic::RepairApplied { repair: applied.to_string() });
            }
            parse_fragments(&repaired.text)
                .map_err(|err| unparsable(err.to_string(), &repaired.text))?
        }
    };

    for fragment in fragments {
        collect_upserts(fragment, &mut change_set);
    }

    tracing::debug!(
        upserts = change_set.upsert_count(),
        deletes = change_set.delete_count(),
        diagnostics = change_set.diagnostics.len(),
        "parsed change-set"
    );
    Ok(change_set)
}

fn unparsable(reason: String, input: &str) -> ChangeSetError {
    let excerpt = input.trim().chars().take(EXCERPT_CHARS).collect();
    ChangeSetError::Unparsable { reason, excerpt }
}

/// Top-level elements become upserts. Id-less envelope wrappers (a model that echoes a whole
/// `<mxfile>` or `<root>`) are unwrapped so their cells still apply.
fn collect_upserts(fragment: Fragment, change_set: &mut ChangeSet) {
    let Some(element) = fragment.as_element() else {
        return;
    };
    let tag = element.name().to_owned();
    let id = element.id().map(CellId::new);
    let unwrap = element.kind() == ElementKind::Container && !fragment.children().is_empty();

    match id {
        Some(Ok(id)) => change_set.ops.push(Op::Upsert { id, element: fragment }),
        Some(Err(err)) => {
            tracing::warn!(%tag, error = %err, "dropping element with invalid id");
            change_set.diagnostics.push(Diagnostic::DroppedElement { tag, reason: err.to_string() });
        }
        None if unwrap => {
            for child in fragment.children() {
                collect_upserts(child.clone(), change_set);
            }
        }
        None => {
            tracing::warn!(%tag, "dropping element without id");
            change_set.diagnostics.push(Diagnostic::DroppedElement {
                tag,
                reason: "element has no id".to_owned(),
            });
        }
    }
}

#[cfg(test)]
mod tests;
