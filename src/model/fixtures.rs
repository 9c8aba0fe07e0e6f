// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-FlowGen-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of FlowGen and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

/// Two vertices joined by one edge.
pub(crate) const RENAME_SCENARIO: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<mxfile host="flowgen">
  <diagram id="page-1" name="Page-1">
    <mxGraphModel dx="1422" dy="794" grid="1" gridSize="10">
      <root>
        <mxCell id="0"/>
        <mxCell id="1" parent="0"/>
        <mxCell id="2" value="A" style="rounded=1;whiteSpace=wrap;html=1;" vertex="1" parent="1">
          <mxGeometry x="40" y="40" width="120" height="60" as="geometry"/>
        </mxCell>
        <mxCell id="3" value="B" style="rounded=0;whiteSpace=wrap;html=1;" vertex="1" parent="1">
          <mxGeometry x="40" y="160" width="120" height="60" as="geometry"/>
        </mxCell>
        <mxCell id="4" value="" style="endArrow=classic;html=1;" edge="1" parent="1" source="2" target="3">
          <mxGeometry relative="1" as="geometry"/>
        </mxCell>
      </root>
    </mxGraphModel>
  </diagram>
</mxfile>
"#;

/// A grouped pipeline with a waypoint edge, escaped labels and a comment.
pub(crate) const GROUPED_PIPELINE: &str = r#"<mxfile host="flowgen" version="22.0.0">
  <diagram id="pipeline" name="Pipeline">
    <mxGraphModel dx="800" dy="600" grid="1">
      <root>
        <mxCell id="0"/>
        <mxCell id="1" parent="0"/>
        <!-- ingestion stage -->
        <mxCell id="10" value="Stage &amp; Load" style="group" vertex="1" parent="1">
          <mxGeometry x="20" y="20" width="300" height="200" as="geometry"/>
        </mxCell>
        <mxCell id="11" value="&lt;b&gt;Fetch&lt;/b&gt;" style="rounded=1;html=1;" vertex="1" parent="10">
          <mxGeometry x="10" y="10" width="100" height="40" as="geometry"/>
        </mxCell>
        <mxCell id="12" value="Parse" style="rounded=1;html=1;" vertex="1" parent="10">
          <mxGeometry x="10" y="120" width="100" height="40" as="geometry"/>
        </mxCell>
        <mxCell id="13" value="Store" style="shape=cylinder;html=1;" vertex="1" parent="1">
          <mxGeometry x="400" y="120" width="80" height="80" as="geometry"/>
        </mxCell>
        <mxCell id="20" value="" style="edgeStyle=orthogonalEdgeStyle;html=1;" edge="1" parent="1" source="11" target="12">
          <mxGeometry relative="1" as="geometry"/>
        </mxCell>
        <mxCell id="21" value="persist" style="edgeStyle=orthogonalEdgeStyle;html=1;" edge="1" parent="1" source="12" target="13">
          <mxGeometry relative="1" as="geometry">
            <Array as="points">
              <mxPoint x="360" y="160"/>
            </Array>
          </mxGeometry>
        </mxCell>
      </root>
    </mxGraphModel>
  </diagram>
</mxfile>"#;
