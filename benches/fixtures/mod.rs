// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-FlowGen-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of FlowGen and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

#![allow(dead_code)]

// Shared deterministic benchmark fixtures (no RNG).

use flowgen::ops::MergeResult;

fn ascii_repeat_to_len(prefix: &str, fill: char, target_len: usize) -> String {
    let mut out = String::with_capacity(target_len.max(prefix.len()));
    out.push_str(prefix);
    while out.len() < target_len {
        out.push(fill);
    }
    out
}

pub fn checksum_merge_result(result: &MergeResult) -> u64 {
    let mut acc = 0u64;
    acc = acc.wrapping_mul(131).wrapping_add(result.replaced_count as u64);
    acc = acc.wrapping_mul(131).wrapping_add(result.added_count as u64);
    acc = acc.wrapping_mul(131).wrapping_add(result.deleted_count as u64);
    acc = acc.wrapping_mul(131).wrapping_add(result.diagnostics.len() as u64);
    acc
}

pub mod drawio {
    use super::ascii_repeat_to_len;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Params {
        pub lanes: usize,
        pub vertices_per_lane: usize,
        pub label_len: usize,
    }

    impl Params {
        pub const fn new(lanes: usize, vertices_per_lane: usize, label_len: usize) -> Self {
            Self { lanes, vertices_per_lane, label_len }
        }

        pub const fn vertex_count(self) -> usize {
            self.lanes * self.vertices_per_lane
        }
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum Case {
        Small,
        Medium,
        LargeLongLabels,
    }

    impl Case {
        pub const fn id(self) -> &'static str {
            match self {
                Self::Small => "small",
                Self::Medium => "medium",
                Self::LargeLongLabels => "large_long_labels",
            }
        }

        pub const fn params(self) -> Params {
            match self {
                Self::Small => Params::new(2, 10, 12),
                Self::Medium => Params::new(6, 40, 16),
                Self::LargeLongLabels => Params::new(12, 120, 64),
            }
        }
    }

    pub fn lane_id(lane: usize) -> String {
        format!("lane-{lane:02}")
    }

    /// Numeric id of vertex `idx` in `lane`; edges take the following id.
    pub fn vertex_id(params: Params, lane: usize, idx: usize) -> usize {
        2 + (lane * params.vertices_per_lane + idx) * 2
    }

    /// Swimlanes of vertices, each chained to its predecessor by an edge.
    ///
    /// Written in the serializer's own style, so parsing and serializing the result is the
    /// identity.
    pub fn document(params: Params) -> String {
        let mut out = String::with_capacity(params.vertex_count() * 420);
        out.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
        out.push_str("<mxfile host=\"flowgen-bench\">\n  <diagram id=\"bench\" name=\"Page-1\">\n    <mxGraphModel dx=\"1434\" dy=\"782\" grid=\"1\" gridSize=\"10\">\n      <root>\n        <mxCell id=\"0\"/>\n        <mxCell id=\"1\" parent=\"0\"/>\n");

        for lane in 0..params.lanes {
            let lane_id = lane_id(lane);
            let lane_height = 200;
            out.push_str(&format!(
                "        <mxCell id=\"{lane_id}\" value=\"Lane {lane}\" style=\"swimlane;horizontal=0;html=1;\" vertex=\"1\" parent=\"1\">\n          <mxGeometry x=\"20\" y=\"{}\" width=\"{}\" height=\"{lane_height}\" as=\"geometry\"/>\n        </mxCell>\n",
                20 + lane * (lane_height + 20),
                params.vertices_per_lane * 160 + 40
            ));
            for idx in 0..params.vertices_per_lane {
                let id = vertex_id(params, lane, idx);
                let label = ascii_repeat_to_len(&format!("Step {lane}.{idx} "), 'x', params.label_len);
                out.push_str(&format!(
                    "        <mxCell id=\"{id}\" value=\"{label}\" style=\"rounded=1;whiteSpace=wrap;html=1;\" vertex=\"1\" parent=\"{lane_id}\">\n          <mxGeometry x=\"{}\" y=\"60\" width=\"120\" height=\"60\" as=\"geometry\"/>\n        </mxCell>\n",
                    40 + idx * 160
                ));
                if idx > 0 {
                    out.push_str(&format!(
                        "        <mxCell id=\"{}\" value=\"\" style=\"endArrow=classic;html=1;\" edge=\"1\" parent=\"1\" source=\"{}\" target=\"{id}\">\n          <mxGeometry relative=\"1\" as=\"geometry\"/>\n        </mxCell>\n",
                        id + 1,
                        id - 2
                    ));
                }
            }
        }

        out.push_str("      </root>\n    </mxGraphModel>\n  </diagram>\n</mxfile>\n");
        out
    }

    pub fn fixture(case: Case) -> String {
        document(case.params())
    }

    /// Model-style reply that renames `renames` vertices, adds `additions` new ones and deletes
    /// the edge behind every other renamed vertex.
    pub fn change_reply(params: Params, renames: usize, additions: usize) -> String {
        let mut body = String::new();
        let total = params.vertex_count();
        let next_id = vertex_id(params, params.lanes, 0);

        for n in 0..renames.min(total) {
            let (lane, idx) = (n % params.lanes, (n / params.lanes) % params.vertices_per_lane);
            let id = vertex_id(params, lane, idx);
            if n % 2 == 1 && idx > 0 {
                body.push_str(&format!("<delete id=\"{}\"/>\n", id + 1));
            }
            body.push_str(&format!(
                "<mxCell id=\"{id}\" value=\"Renamed {n}\" style=\"rounded=1;whiteSpace=wrap;html=1;fillColor=#dae8fc;\" vertex=\"1\" parent=\"{}\">\n  <mxGeometry x=\"{}\" y=\"60\" width=\"120\" height=\"60\" as=\"geometry\"/>\n</mxCell>\n",
                lane_id(lane),
                40 + idx * 160
            ));
        }
        for n in 0..additions {
            body.push_str(&format!(
                "<mxCell id=\"{}\" value=\"Added {n}\" style=\"shape=note;html=1;\" vertex=\"1\" parent=\"1\">\n  <mxGeometry x=\"{}\" y=\"{}\" width=\"100\" height=\"60\" as=\"geometry\"/>\n</mxCell>\n",
                next_id + n,
                40 + (n % 10) * 120,
                40 + (n / 10) * 80
            ));
        }

        format!("Updated the diagram.\n\n```xml\n{body}```\n")
    }
}
