// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-FlowGen-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of FlowGen and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::fmt::Write as _;
use std::ops::Range;

pub const ANALYSIS_LABEL: &str = "[ANALYSIS]";
pub const DIAGRAM_LABEL: &str = "[DIAGRAM]";

/// Asks for a complete document between `<mxfile>` markers, preceded by an analysis.
pub fn full_document_prompt(diagram_type: &str, instruction: &str, current: Option<&str>) -> String {
    let current = current.map(str::trim).filter(|text| !text.is_empty()).unwrap_or("(none)");
    let mut prompt = String::new();
    let _ = writeln!(prompt, "You are a diagram assistant that writes draw.io documents.");
    let _ = writeln!(prompt, "Create or revise a {diagram_type} diagram for this request:");
    let _ = writeln!(prompt);
    let _ = writeln!(prompt, "{}", instruction.trim());
    let _ = writeln!(prompt);
    let _ = writeln!(prompt, "Current diagram:");
    let _ = writeln!(prompt, "{current}");
    let _ = writeln!(prompt);
    let _ = writeln!(prompt, "Answer in exactly this layout:");
    let _ = writeln!(prompt, "{ANALYSIS_LABEL}");
    let _ = writeln!(prompt, "A short explanation of the diagram.");
    let _ = writeln!(prompt);
    let _ = writeln!(prompt, "{DIAGRAM_LABEL}");
    let _ = writeln!(prompt, "<mxfile>");
    let _ = writeln!(prompt, "  <diagram id=\"...\" name=\"Page-1\">");
    let _ = writeln!(prompt, "    <mxGraphModel><root>...</root></mxGraphModel>");
    let _ = writeln!(prompt, "  </diagram>");
    let _ = writeln!(prompt, "</mxfile>");
    let _ = writeln!(prompt);
    let _ = writeln!(
        prompt,
        "Every cell needs a unique id and an mxGeometry child. Do not wrap the document in a code fence."
    );
    prompt
}

/// Asks for the elements to change, as a fenced `xml` block, against an excerpt of the document.
pub fn change_prompt(diagram_type: &str, instruction: &str, excerpt: &str, next_id: u64) -> String {
    let mut prompt = String::new();
    let _ = writeln!(prompt, "You edit draw.io XML for a {diagram_type} diagram.");
    let _ = writeln!(prompt, "Request:");
    let _ = writeln!(prompt, "{}", instruction.trim());
    let _ = writeln!(prompt);
    let _ = writeln!(prompt, "Relevant part of the current document:");
    let _ = writeln!(prompt, "```xml");
    let _ = writeln!(prompt, "{}", excerpt.trim_end());
    let _ = writeln!(prompt, "```");
    let _ = writeln!(prompt);
    let _ = writeln!(prompt, "Rules:");
    let _ = writeln!(prompt, "1. Keep the id of every existing element unless you delete it.");
    let _ = writeln!(
        prompt,
        "2. To modify an element, output it again with all of its child elements."
    );
    let _ = writeln!(
        prompt,
        "3. New elements (edges included) need new ids; use numbers starting at {next_id}."
    );
    let _ = writeln!(prompt, "4. To delete an element, output <delete id=\"ELEMENT_ID\"/>.");
    let _ = writeln!(prompt, "5. Leave out every element that does not change.");
    let _ = writeln!(
        prompt,
        "6. Put all output elements in one block that starts with ```xml and ends with ```."
    );
    let _ = writeln!(prompt);
    let _ = writeln!(prompt, "Briefly explain the change before the block.");
    prompt
}

/// The reply minus the given fragment spans and section labels, trimmed.
pub fn narrative(reply: &str, fragments: &[Range<usize>]) -> String {
    let mut spans: Vec<Range<usize>> = fragments
        .iter()
        .filter(|span| span.start <= span.end && span.end <= reply.len())
        .filter(|span| reply.is_char_boundary(span.start) && reply.is_char_boundary(span.end))
        .cloned()
        .collect();
    spans.sort_by_key(|span| span.start);

    let mut out = String::new();
    let mut cursor = 0;
    for span in spans {
        if span.start > cursor {
            out.push_str(&reply[cursor..span.start]);
        }
        cursor = cursor.max(span.end);
    }
    out.push_str(&reply[cursor.min(reply.len())..]);

    let out = out.replace(ANALYSIS_LABEL, "").replace(DIAGRAM_LABEL, "");
    out.trim().to_owned()
}
