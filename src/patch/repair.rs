// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-FlowGen-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of FlowGen and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::fmt;
use std::ops::Range;
use std::sync::OnceLock;

use regex::Regex;

use crate::model::GEOMETRY_TAGS;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Repair {
    /// `<mxGeometry ...>` without a matching close became `<mxGeometry .../>`.
    SelfClosed { tag: String },
    /// A closing tag with no opener was removed.
    StrippedOrphanClose { tag: String },
    EscapedAmpersands { count: usize },
}

impl fmt::Display for Repair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SelfClosed { tag } => write!(f, "self-closed unterminated <{tag}>"),
            Self::StrippedOrphanClose { tag } => write!(f, "removed orphan </{tag}>"),
            Self::EscapedAmpersands { count } => write!(f, "escaped {count} bare '&'"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Repaired {
    pub text: String,
    pub repairs: Vec<Repair>,
}

struct Edit {
    range: Range<usize>,
    replacement: &'static str,
}

struct OpenTag<'a> {
    name: &'a str,
    /// Byte offset of the closing `>`.
    gt: usize,
}

fn close_unterminated(open: OpenTag<'_>, edits: &mut Vec<Edit>, repairs: &mut Vec<Repair>) {
    if GEOMETRY_TAGS.contains(&open.name) {
        edits.push(Edit { range: open.gt..open.gt + 1, replacement: "/>" });
        repairs.push(Repair::SelfClosed { tag: open.name.to_owned() });
    }
}

fn static_pattern(cell: &'static OnceLock<Regex>, pattern: &str) -> &'static Regex {
    cell.get_or_init(|| Regex::new(pattern).expect("static pattern compiles"))
}

fn tag_pattern() -> &'static Regex {
    static TAG: OnceLock<Regex> = OnceLock::new();
    static_pattern(&TAG, r#"<(/?)([A-Za-z_][\w:.\-]*)((?:[^>"']|"[^"]*"|'[^']*')*)>"#)
}

fn opaque_pattern() -> &'static Regex {
    static OPAQUE: OnceLock<Regex> = OnceLock::new();
    static_pattern(&OPAQUE, r"<!--[\s\S]*?-->|<!\[CDATA\[[\s\S]*?\]\]>")
}

fn entity_pattern() -> &'static Regex {
    static ENTITY: OnceLock<Regex> = OnceLock::new();
    static_pattern(&ENTITY, r"^&(?:[A-Za-z][A-Za-z0-9]*|#[0-9]+|#x[0-9A-Fa-f]+);")
}

/// Applies the bounded set of fixes for common model mistakes.
///
/// Only three things are touched: geometry-like openings that are never closed, closing tags
/// that have no opener, and `&` that does not start an entity. Anything else is left for the
/// parser to reject.
pub fn repair(text: &str) -> Repaired {
    let opaque: Vec<Range<usize>> = opaque_pattern().find_iter(text).map(|m| m.range()).collect();
    let in_opaque = |offset: usize| opaque.iter().any(|range| range.contains(&offset));

    let mut edits = Vec::new();
    let mut repairs = Vec::new();
    let mut stack: Vec<OpenTag<'_>> = Vec::new();

    for caps in tag_pattern().captures_iter(text) {
        let Some(whole) = caps.get(0) else {
            continue;
        };
        if in_opaque(whole.start()) {
            continue;
        }
        let closing = caps.get(1).is_some_and(|m| !m.as_str().is_empty());
        let name = caps.get(2).map_or("", |m| m.as_str());
        let rest = caps.get(3).map_or("", |m| m.as_str());

        if !closing {
            if !rest.trim_end().ends_with('/') {
                stack.push(OpenTag { name, gt: whole.end() - 1 });
            }
            continue;
        }

        match stack.iter().rposition(|open| open.name == name) {
            Some(position) => {
                let unterminated: Vec<_> = stack.drain(position + 1..).collect();
                for open in unterminated.into_iter().rev() {
                    close_unterminated(open, &mut edits, &mut repairs);
                }
                stack.pop();
            }
            None => {
                edits.push(Edit { range: whole.range(), replacement: "" });
                repairs.push(Repair::StrippedOrphanClose { tag: name.to_owned() });
            }
        }
    }
    while let Some(open) = stack.pop() {
        close_unterminated(open, &mut edits, &mut repairs);
    }

    let mut ampersands = 0;
    for (offset, _) in text.match_indices('&') {
        if in_opaque(offset) || entity_pattern().is_match(&text[offset..]) {
            continue;
        }
        edits.push(Edit { range: offset..offset + 1, replacement: "&amp;" });
        ampersands += 1;
    }
    if ampersands > 0 {
        repairs.push(Repair::EscapedAmpersands { count: ampersands });
    }

    edits.sort_by_key(|edit| edit.range.start);
    let mut out = String::with_capacity(text.len() + edits.len() * 4);
    let mut cursor = 0;
    for edit in edits {
        out.push_str(&text[cursor..edit.range.start]);
        out.push_str(edit.replacement);
        cursor = edit.range.end;
    }
    out.push_str(&text[cursor..]);

    Repaired { text: out, repairs }
}
