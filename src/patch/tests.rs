// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-FlowGen-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of FlowGen and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use rstest::rstest;

use super::{extract_fenced_block, parse_change_set, parse_change_set_body, ChangeSetError, EXCERPT_CHARS};
use crate::diagnostic::Diagnostic;
use crate::format::xml::serialize_fragment;
use crate::ops::Op;

fn op_ids(ops: &[Op]) -> Vec<(&'static str, String)> {
    ops.iter()
        .map(|op| match op {
            Op::Delete { id } => ("delete", id.to_string()),
            Op::Upsert { id, .. } => ("upsert", id.to_string()),
        })
        .collect()
}

#[test]
fn fenced_block_is_located_and_trimmed() {
    let reply = "Here you go:\n```xml\n  <mxCell id=\"2\"/>\n```\nDone.";
    assert_eq!(extract_fenced_block(reply, "xml"), Some("<mxCell id=\"2\"/>"));
    assert_eq!(extract_fenced_block(reply, "json"), None);
}

#[test]
fn first_fenced_block_wins() {
    let reply = "```xml\n<a id=\"1\"/>\n```\ntext\n```xml\n<b id=\"2\"/>\n```";
    assert_eq!(extract_fenced_block(reply, "xml"), Some("<a id=\"1\"/>"));
}

#[test]
fn blocks_in_other_languages_are_skipped() {
    let reply = "Context:\n```python\nprint('x')\n```\nChange:\n```XML\n<mxCell id=\"2\"/>\n```";
    assert_eq!(extract_fenced_block(reply, "xml"), Some("<mxCell id=\"2\"/>"));
    assert_eq!(extract_fenced_block(reply, "python"), Some("print('x')"));
    assert_eq!(extract_fenced_block("```\nplain\n```", "xml"), None);
}

#[rstest]
#[case("xml")]
#[case("c++")]
#[case("x.y")]
fn language_tags_are_matched_literally(#[case] lang: &str) {
    let reply = format!("```{lang}\nbody\n```");
    assert_eq!(extract_fenced_block(&reply, lang), Some("body"));
    assert_eq!(extract_fenced_block(&reply, "xm"), None);
}

#[test]
fn reply_without_block_yields_empty_change_set() {
    let change_set = parse_change_set("I could not find anything to change.").expect("soft failure");
    assert!(change_set.is_empty());
    assert_eq!(change_set.diagnostics, [Diagnostic::NoFencedBlock]);
}

#[test]
fn upserts_and_deletes_are_collected() {
    let reply = r#"Renamed A and removed the edge.
```xml
<mxCell id="2" value="Z" style="rounded=1;" vertex="1" parent="1">
  <mxGeometry x="40" y="40" width="120" height="60" as="geometry"/>
</mxCell>
<delete id="4"/>
<mxCell id="5" value="C" vertex="1" parent="1"><mxGeometry as="geometry"/></mxCell>
```"#;
    let change_set = parse_change_set(reply).expect("parse");
    assert_eq!(
        op_ids(&change_set.ops),
        [("delete", "4".to_owned()), ("upsert", "2".to_owned()), ("upsert", "5".to_owned())]
    );
    assert!(change_set.diagnostics.is_empty());

    let Op::Upsert { element, .. } = &change_set.ops[1] else {
        panic!("expected upsert");
    };
    assert!(serialize_fragment(element).contains(r#"<mxGeometry x="40" y="40""#));
}

#[rstest]
#[case(r#"<delete id="7"/>"#)]
#[case(r#"<delete id='7'/>"#)]
#[case(r#"<delete  id = "7" />"#)]
#[case(r#"<delete id="7"></delete>"#)]
fn delete_markers_tolerate_spacing_and_quotes(#[case] marker: &str) {
    let change_set = parse_change_set_body(marker).expect("parse");
    assert_eq!(op_ids(&change_set.ops), [("delete", "7".to_owned())]);
}

#[test]
fn elements_without_id_are_dropped_with_diagnostic() {
    let change_set =
        parse_change_set_body(r#"<mxCell value="orphan" vertex="1"/><mxCell id="3" vertex="1"/>"#)
            .expect("parse");
    assert_eq!(op_ids(&change_set.ops), [("upsert", "3".to_owned())]);
    assert_eq!(
        change_set.diagnostics,
        [Diagnostic::DroppedElement { tag: "mxCell".to_owned(), reason: "element has no id".to_owned() }]
    );
}

#[test]
fn unterminated_geometry_is_repaired() {
    let body = r#"<mxCell id="2" value="A" vertex="1" parent="1"><mxGeometry x="1" as="geometry"></mxCell>"#;
    let change_set = parse_change_set_body(body).expect("repaired");
    assert_eq!(op_ids(&change_set.ops), [("upsert", "2".to_owned())]);
    assert!(matches!(change_set.diagnostics.as_slice(), [Diagnostic::RepairApplied { .. }]));

    let Op::Upsert { element, .. } = &change_set.ops[0] else {
        panic!("expected upsert");
    };
    assert_eq!(
        serialize_fragment(element),
        r#"<mxCell id="2" value="A" vertex="1" parent="1"><mxGeometry x="1" as="geometry"/></mxCell>"#
    );
}

#[test]
fn orphan_geometry_close_is_repaired() {
    let body = r#"<mxCell id="2" vertex="1"><mxGeometry as="geometry"/></mxGeometry></mxCell>"#;
    let change_set = parse_change_set_body(body).expect("repaired");
    assert_eq!(op_ids(&change_set.ops), [("upsert", "2".to_owned())]);
}

#[test]
fn unrepairable_input_reports_reason_and_excerpt() {
    let body = format!(r#"<mxCell id="2" vertex="1"><object id="3"></mxCell>{}"#, "x".repeat(500));
    let err = parse_change_set_body(&body).unwrap_err();
    let ChangeSetError::Unparsable { reason, excerpt } = err else {
        panic!("expected an unparsable change-set, got {err:?}");
    };
    assert!(!reason.is_empty());
    assert!(excerpt.starts_with(r#"<mxCell id="2""#));
    assert_eq!(excerpt.chars().count(), EXCERPT_CHARS);
}

#[test]
fn echoed_envelope_is_unwrapped_into_cells() {
    let body = r#"<?xml version="1.0"?>
<root>
  <mxCell id="2" value="A" vertex="1" parent="1"/>
  <mxCell id="6" value="B" vertex="1" parent="1"/>
</root>"#;
    let change_set = parse_change_set_body(body).expect("parse");
    assert_eq!(op_ids(&change_set.ops), [("upsert", "2".to_owned()), ("upsert", "6".to_owned())]);
}

#[test]
fn empty_block_is_an_empty_change_set() {
    let change_set = parse_change_set("```xml\n```").expect("parse");
    assert!(change_set.is_empty());
    assert!(change_set.diagnostics.is_empty());
}
