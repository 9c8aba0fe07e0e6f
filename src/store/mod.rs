// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-FlowGen-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of FlowGen and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! In-memory diagram store.
//!
//! Documents are kept as text keyed by a generated [`DiagramId`]. Nothing is persisted; the
//! store lives as long as the server process. The lock is never held across a model call.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::model::DiagramId;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagramRecord {
    pub id: DiagramId,
    pub diagram_type: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("diagram '{id}' not found")]
    NotFound { id: DiagramId },
}

/// Changes applied by [`DiagramStore::update`]; `None` keeps the stored value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiagramUpdate {
    pub diagram_type: Option<String>,
    pub content: Option<String>,
}

#[derive(Debug, Default)]
pub struct DiagramStore {
    diagrams: RwLock<HashMap<DiagramId, DiagramRecord>>,
}

impl DiagramStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn create(&self, diagram_type: impl Into<String>, content: impl Into<String>) -> DiagramRecord {
        let now = Utc::now();
        let record = DiagramRecord {
            id: DiagramId::random(),
            diagram_type: diagram_type.into(),
            content: content.into(),
            created_at: now,
            updated_at: now,
        };
        self.diagrams.write().await.insert(record.id.clone(), record.clone());
        tracing::debug!(id = %record.id, "created diagram");
        record
    }

    pub async fn get(&self, id: &DiagramId) -> Result<DiagramRecord, StoreError> {
        self.diagrams
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound { id: id.clone() })
    }

    pub async fn update(&self, id: &DiagramId, update: DiagramUpdate) -> Result<DiagramRecord, StoreError> {
        let mut diagrams = self.diagrams.write().await;
        let record = diagrams.get_mut(id).ok_or_else(|| StoreError::NotFound { id: id.clone() })?;
        if let Some(diagram_type) = update.diagram_type {
            record.diagram_type = diagram_type;
        }
        if let Some(content) = update.content {
            record.content = content;
        }
        record.updated_at = Utc::now().max(record.created_at);
        tracing::debug!(id = %id, "updated diagram");
        Ok(record.clone())
    }

    pub async fn delete(&self, id: &DiagramId) -> Result<DiagramRecord, StoreError> {
        let removed = self.diagrams.write().await.remove(id);
        let record = removed.ok_or_else(|| StoreError::NotFound { id: id.clone() })?;
        tracing::debug!(id = %id, "deleted diagram");
        Ok(record)
    }

    /// Updates `id` when it is given and known, otherwise creates a new record.
    pub async fn save(&self, id: Option<&DiagramId>, diagram_type: &str, content: &str) -> DiagramRecord {
        if let Some(id) = id {
            let update =
                DiagramUpdate { diagram_type: Some(diagram_type.to_owned()), content: Some(content.to_owned()) };
            if let Ok(record) = self.update(id, update).await {
                return record;
            }
            tracing::debug!(id = %id, "unknown diagram id, creating a new record");
        }
        self.create(diagram_type, content).await
    }

    pub async fn len(&self) -> usize {
        self.diagrams.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
