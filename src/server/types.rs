// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-FlowGen-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of FlowGen and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::llm::{ModelReply, TokenUsage};
use crate::orchestrator::GenerateRequest;
use crate::store::DiagramRecord;

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct WelcomeResponse {
    pub name: String,
    pub version: String,
    pub api: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct HealthResponse {
    pub status: String,
    pub model: String,
    pub diagrams: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct GenerateDiagramRequest {
    #[serde(rename = "type")]
    pub diagram_type: String,
    pub user_prompt: String,
    #[serde(default)]
    pub current_drawio: Option<String>,
    #[serde(default)]
    pub full_regeneration: bool,
    /// Stored diagram to update with a successful result.
    #[serde(default)]
    pub diagram_id: Option<String>,
}

impl GenerateDiagramRequest {
    pub fn to_generate_request(&self) -> GenerateRequest {
        GenerateRequest {
            diagram_type: self.diagram_type.clone(),
            instruction: self.user_prompt.clone(),
            existing_document: self.current_drawio.clone(),
            full_regeneration: self.full_regeneration,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct GenerateDiagramResponse {
    pub analysis: String,
    pub content: String,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diagram: Option<DiagramInfo>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ChatRequest {
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ChatResponse {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<TokenUsage>,
}

impl From<ModelReply> for ChatResponse {
    fn from(reply: ModelReply) -> Self {
        Self {
            message: reply.text,
            reasoning: Some(reply.reasoning).filter(|reasoning| !reasoning.is_empty()),
            usage: reply.usage,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct DiagramInfo {
    pub id: String,
    #[serde(rename = "type")]
    pub diagram_type: String,
    pub content: String,
    /// RFC 3339.
    pub created_at: String,
    pub updated_at: String,
}

impl From<DiagramRecord> for DiagramInfo {
    fn from(record: DiagramRecord) -> Self {
        Self {
            id: record.id.into_string(),
            diagram_type: record.diagram_type,
            content: record.content,
            created_at: record.created_at.to_rfc3339(),
            updated_at: record.updated_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CreateDiagramRequest {
    #[serde(rename = "type")]
    pub diagram_type: String,
    /// Defaults to an empty one-page document.
    #[serde(default)]
    pub content: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct UpdateDiagramRequest {
    #[serde(default, rename = "type")]
    pub diagram_type: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct DeleteDiagramResponse {
    pub id: String,
    pub deleted: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct OutlineResponse {
    pub id: String,
    pub outline: String,
    pub vertices: usize,
    pub edges: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ErrorBody {
    pub error: String,
}
