// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-FlowGen-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of FlowGen and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Request orchestration: extraction, model call, change-set parsing and merge.
//!
//! Two modes exist. Without an existing document (or when a full regeneration is requested) the
//! model writes a complete `mxfile`, which is re-parsed and normalized. Otherwise the model sees
//! a depth-bounded excerpt and answers with a change-set that is merged into the original.
//!
//! Errors on the caller's document are fatal. Everything that goes wrong in model output
//! degrades to `success: false` with the best document available.

pub mod chat;
pub mod envelope;
pub mod markers;
pub mod prompt;
pub mod stream;

use std::sync::Arc;
use std::time::Duration;

use schemars::JsonSchema;
use serde::Serialize;

use crate::diagnostic::Diagnostic;
use crate::extract::{extract, ExtractOptions};
use crate::format::xml::parse_document;
use crate::llm::{ModelClient, ModelError, ModelReply};
use crate::model::DocumentError;
use crate::ops::merge_document;
use crate::patch::{self, ChangeSet, ChangeSetError};

use self::envelope::normalize_envelope;
use self::markers::{MarkerPair, MarkerScanner};

pub use stream::StreamEvent;

pub const DEFAULT_MAX_ATTEMPTS: usize = 2;
pub const DEFAULT_MODEL_TIMEOUT: Duration = Duration::from_secs(300);

#[derive(Debug, Clone, PartialEq)]
pub struct OrchestratorConfig {
    pub extract: ExtractOptions,
    /// Model calls per non-streamed request when replies carry no usable output.
    pub max_attempts: usize,
    /// Bound on one model call (the whole reply when streaming).
    pub model_timeout: Duration,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            extract: ExtractOptions::default(),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            model_timeout: DEFAULT_MODEL_TIMEOUT,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenerateRequest {
    pub diagram_type: String,
    pub instruction: String,
    pub existing_document: Option<String>,
    pub full_regeneration: bool,
}

impl GenerateRequest {
    pub fn new(diagram_type: impl Into<String>, instruction: impl Into<String>) -> Self {
        Self { diagram_type: diagram_type.into(), instruction: instruction.into(), ..Self::default() }
    }

    pub fn with_document(mut self, document: impl Into<String>) -> Self {
        self.existing_document = Some(document.into());
        self
    }

    /// Whether the model writes a whole document instead of a change-set.
    pub fn is_full_document(&self) -> bool {
        self.full_regeneration || self.existing().is_none()
    }

    fn existing(&self) -> Option<&str> {
        self.existing_document.as_deref().filter(|text| !text.trim().is_empty())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, JsonSchema)]
pub struct GenerateResponse {
    pub analysis: String,
    pub content: String,
    pub success: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GenerateError {
    /// The caller's document could not be parsed.
    #[error("existing document is malformed: {0}")]
    Malformed(#[from] DocumentError),
    #[error("model reply contains no complete <mxfile> document")]
    IncompleteGeneration,
    #[error("generated document is not usable: {reason}")]
    InvalidGeneration { reason: String },
    #[error("model reply yielded no usable change-set: {0}")]
    Unparsable(#[from] ChangeSetError),
    #[error(transparent)]
    Model(#[from] ModelError),
}

impl GenerateError {
    /// Unusable model output; worth another model call.
    fn is_retryable(&self) -> bool {
        matches!(self, Self::IncompleteGeneration | Self::InvalidGeneration { .. } | Self::Unparsable(_))
    }
}

/// Prompt plus what the reply is checked against.
#[derive(Debug, Clone)]
struct Plan {
    prompt: String,
    /// The caller's document in incremental mode.
    original: Option<String>,
}

impl Plan {
    fn markers(&self) -> MarkerPair {
        match self.original {
            Some(_) => MarkerPair::fence("xml"),
            None => MarkerPair::tag("mxfile"),
        }
    }
}

pub struct Orchestrator<M: ModelClient + ?Sized> {
    model: Arc<M>,
    config: OrchestratorConfig,
}

impl<M: ModelClient + ?Sized> Clone for Orchestrator<M> {
    fn clone(&self) -> Self {
        Self { model: Arc::clone(&self.model), config: self.config.clone() }
    }
}

impl<M: ModelClient + ?Sized> Orchestrator<M> {
    pub fn new(model: Arc<M>, config: OrchestratorConfig) -> Self {
        Self { model, config }
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// Runs one request; failures become `success: false` responses.
    ///
    /// `content` on failure is the caller's document (or empty), so a client never loses what
    /// it sent.
    pub async fn generate(&self, request: &GenerateRequest) -> GenerateResponse {
        match self.try_generate(request).await {
            Ok(response) => {
                tracing::info!(
                    success = response.success,
                    content_chars = response.content.len(),
                    "generation finished"
                );
                response
            }
            Err(err) => {
                match &err {
                    GenerateError::Malformed(_) => tracing::error!(%err, "generation failed"),
                    _ => tracing::warn!(%err, "generation failed"),
                }
                GenerateResponse {
                    analysis: err.to_string(),
                    content: request.existing_document.clone().unwrap_or_default(),
                    success: false,
                }
            }
        }
    }

    pub async fn try_generate(&self, request: &GenerateRequest) -> Result<GenerateResponse, GenerateError> {
        let plan = self.plan(request)?;
        let mut attempt = 1;
        loop {
            let reply = self.complete(&plan.prompt).await?;
            let outcome = match &plan.original {
                Some(original) => merge_reply(original, &reply.text),
                None => full_document_from_reply(&reply.text),
            };
            match outcome {
                Err(err) if err.is_retryable() && attempt < self.config.max_attempts => {
                    tracing::warn!(attempt, %err, "model reply unusable, retrying");
                    attempt += 1;
                }
                outcome => return outcome,
            }
        }
    }

    fn plan(&self, request: &GenerateRequest) -> Result<Plan, GenerateError> {
        if request.is_full_document() {
            let prompt =
                prompt::full_document_prompt(&request.diagram_type, &request.instruction, request.existing());
            return Ok(Plan { prompt, original: None });
        }

        let original = request.existing().unwrap_or_default();
        let doc = parse_document(original)?;
        let excerpt = extract(&doc, &self.config.extract);
        tracing::debug!(
            elements = doc.element_count(),
            excerpt_chars = excerpt.chars().count(),
            "extracted excerpt"
        );
        let prompt = prompt::change_prompt(
            &request.diagram_type,
            &request.instruction,
            &excerpt,
            doc.next_numeric_id(),
        );
        Ok(Plan { prompt, original: Some(original.to_owned()) })
    }

    async fn complete(&self, prompt: &str) -> Result<ModelReply, ModelError> {
        tracing::debug!(prompt_chars = prompt.chars().count(), "calling model");
        match tokio::time::timeout(self.config.model_timeout, self.model.complete(prompt)).await {
            Ok(reply) => reply,
            Err(_) => Err(ModelError::Timeout(self.config.model_timeout)),
        }
    }
}

/// Full mode: the first complete `<mxfile>` fragment, normalized.
fn full_document_from_reply(reply: &str) -> Result<GenerateResponse, GenerateError> {
    let mut scanner = MarkerScanner::new(MarkerPair::tag("mxfile"));
    let fragments = scanner.push(reply);
    if let Some(partial) = scanner.finish() {
        tracing::warn!(partial_chars = partial.len(), "discarding unterminated document");
    }
    let fragment = fragments.into_iter().next().ok_or(GenerateError::IncompleteGeneration)?;
    let content = normalize_envelope(&fragment.text)
        .map_err(|err| GenerateError::InvalidGeneration { reason: err.to_string() })?;

    let analysis = prompt::narrative(reply, &[fragment.span]);
    let analysis = if analysis.is_empty() { "generated a new diagram".to_owned() } else { analysis };
    Ok(GenerateResponse { analysis, content, success: true })
}

/// Incremental mode: change-set from the reply, merged into `original`.
fn merge_reply(original: &str, reply: &str) -> Result<GenerateResponse, GenerateError> {
    let change_set = usable_change_set(reply)?;
    let spans: Vec<_> = MarkerScanner::new(MarkerPair::fence("xml"))
        .push(reply)
        .into_iter()
        .map(|fragment| fragment.span)
        .collect();
    Ok(apply_change_set(original, &change_set, prompt::narrative(reply, &spans))?)
}

/// A change-set with at least one operation.
fn usable_change_set(reply: &str) -> Result<ChangeSet, ChangeSetError> {
    let change_set = patch::parse_change_set(reply)?;
    if change_set.diagnostics.contains(&Diagnostic::NoFencedBlock) {
        return Err(ChangeSetError::MissingBlock);
    }
    if change_set.is_empty() {
        return Err(ChangeSetError::Empty);
    }
    Ok(change_set)
}

fn apply_change_set(
    original: &str,
    change_set: &ChangeSet,
    narrative: String,
) -> Result<GenerateResponse, DocumentError> {
    let merged = merge_document(original, change_set)?;
    tracing::info!(
        replaced = merged.result.replaced_count,
        added = merged.result.added_count,
        deleted = merged.result.deleted_count,
        diagnostics = merged.result.diagnostics.len(),
        "merged change-set"
    );
    let analysis = if narrative.is_empty() { merged.result.message.clone() } else { narrative };
    Ok(GenerateResponse { analysis, content: merged.content, success: merged.result.success })
}
