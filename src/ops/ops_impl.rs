// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-FlowGen-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of FlowGen and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

/// Delete/upsert implementation helpers used by `apply_ops`.
/// Keeps `ops::mod` focused on public op types and orchestration.
fn apply_delete(doc: &mut Document, id: &CellId, builder: &mut MergeBuilder) {
    let Some(node) = doc.find_by_id(id.as_str()) else {
        return;
    };
    if doc.detach(node).is_some() {
        builder.record_deleted(id);
    } else {
        builder.record_failure(id, "the document root cannot be deleted");
    }
}

fn apply_upsert(doc: &mut Document, id: &CellId, element: &Fragment, builder: &mut MergeBuilder) {
    if element.id() != Some(id.as_str()) {
        builder.record_failure(id, "element id does not match the operation id");
        return;
    }

    let Some(existing) = doc.find_by_id(id.as_str()) else {
        let container = doc.default_container();
        match doc.insert_fragment(container, usize::MAX, element) {
            Ok(_) => builder.record_added(id),
            Err(err) => builder.record_failure(id, err.to_string()),
        }
        return;
    };

    let (Some(parent), Some(index)) = (doc.parent(existing), doc.index_in_parent(existing)) else {
        builder.record_failure(id, "the document root cannot be replaced");
        return;
    };

    // Ids inside the old subtree are released by the replacement; any other reuse collides.
    let clash = element.ids().into_iter().find(|candidate| {
        doc.find_by_id(candidate).is_some_and(|node| !doc.is_ancestor_or_self(existing, node))
    });
    if let Some(clash) = clash {
        builder.record_failure(id, format!("id '{clash}' is already used elsewhere in the document"));
        return;
    }

    let Some(previous) = doc.detach(existing) else {
        builder.record_failure(id, DocumentError::InvalidNode.to_string());
        return;
    };
    match doc.insert_fragment(parent, index, element) {
        Ok(_) => builder.record_replaced(id),
        Err(err) => {
            if let Err(restore) = doc.insert_fragment(parent, index, &previous) {
                tracing::error!(id = %id, error = %restore, "failed to restore replaced element");
            }
            builder.record_failure(id, err.to_string());
        }
    }
}

fn check_edge_references(doc: &Document, builder: &mut MergeBuilder) {
    for cell in doc.cells().into_iter().filter(|cell| cell.kind == CellKind::Edge) {
        for (attribute, reference) in [("source", &cell.source), ("target", &cell.target)] {
            let Some(reference) = reference else {
                continue;
            };
            if doc.contains_id(reference) {
                continue;
            }
            tracing::warn!(
                edge = %cell.id,
                attribute,
                missing = %reference,
                "edge references a missing element"
            );
            builder.diagnostics.push(Diagnostic::DanglingReference {
                edge_id: cell.id.clone(),
                attribute: attribute.to_owned(),
                missing_id: reference.clone(),
            });
        }
    }
}
