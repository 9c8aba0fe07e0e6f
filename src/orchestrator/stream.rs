// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-FlowGen-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of FlowGen and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Streamed generation.
//!
//! A spawned task drives the model stream and feeds a bounded channel. Dropping the returned
//! stream closes the channel; the task notices and drops the in-flight model call. Only the
//! first complete fragment of a reply is applied.

use std::future::Future;

use futures::stream::BoxStream;
use futures::StreamExt;
use schemars::JsonSchema;
use serde::Serialize;
use tokio::sync::mpsc;
use tokio::time::{timeout_at, Instant};

use super::{
    apply_change_set, prompt, GenerateError, GenerateRequest, GenerateResponse, Orchestrator, Plan,
};
use crate::llm::{ModelClient, ModelError, TokenUsage};
use crate::orchestrator::envelope::normalize_envelope;
use crate::orchestrator::markers::{MarkedFragment, MarkerScanner};
use crate::patch::{parse_change_set_body, ChangeSetError};

const CHANNEL_CAPACITY: usize = 32;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, JsonSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    Reasoning { text: String },
    /// Narrative preceding the diagram.
    Analysis { text: String },
    /// Plain chat reply text, as it arrives.
    Text { text: String },
    Diagram { content: String },
    Usage { usage: TokenUsage },
    Final { success: bool, analysis: String, content: String },
    Error { message: String },
}

impl StreamEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Reasoning { .. } => "reasoning",
            Self::Analysis { .. } => "analysis",
            Self::Text { .. } => "text",
            Self::Diagram { .. } => "diagram",
            Self::Usage { .. } => "usage",
            Self::Final { .. } => "final",
            Self::Error { .. } => "error",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Final { .. } | Self::Error { .. })
    }

    /// `data: <json>\n\n`
    pub fn to_sse_frame(&self) -> String {
        match serde_json::to_string(self) {
            Ok(json) => format!("data: {json}\n\n"),
            Err(err) => {
                tracing::error!(%err, event = self.name(), "could not encode stream event");
                "data: {\"type\":\"error\",\"message\":\"could not encode event\"}\n\n".to_owned()
            }
        }
    }
}

impl From<GenerateResponse> for StreamEvent {
    fn from(response: GenerateResponse) -> Self {
        Self::Final { success: response.success, analysis: response.analysis, content: response.content }
    }
}

pub(super) type Sender = mpsc::Sender<StreamEvent>;
pub(super) type Closed = mpsc::error::SendError<StreamEvent>;

impl<M: ModelClient + ?Sized + 'static> Orchestrator<M> {
    /// Streams one request as events, ending with exactly one `Final` or `Error`.
    ///
    /// Must be called within a tokio runtime.
    pub fn generate_streaming(&self, request: GenerateRequest) -> BoxStream<'static, StreamEvent> {
        let orchestrator = self.clone();
        spawn_driver(move |tx| async move { orchestrator.drive(&request, &tx).await })
    }

    async fn drive(&self, request: &GenerateRequest, tx: &Sender) -> Result<(), Closed> {
        let plan = match self.plan(request) {
            Ok(plan) => plan,
            Err(err) => {
                tracing::error!(%err, "streamed generation failed");
                return tx.send(StreamEvent::Error { message: err.to_string() }).await;
            }
        };

        let timeout = self.config.model_timeout;
        let deadline = Instant::now() + timeout;
        tracing::debug!(prompt_chars = plan.prompt.chars().count(), "streaming model");
        let mut deltas = match timeout_at(deadline, self.model.stream(&plan.prompt)).await {
            Ok(Ok(deltas)) => deltas,
            Ok(Err(err)) => return model_failed(tx, err).await,
            Err(_) => return model_failed(tx, ModelError::Timeout(timeout)).await,
        };

        let mut scanner = MarkerScanner::new(plan.markers());
        let mut reply = String::new();
        let mut applied: Option<(MarkedFragment, GenerateResponse)> = None;

        loop {
            let delta = match timeout_at(deadline, deltas.next()).await {
                Ok(Some(Ok(delta))) => delta,
                Ok(Some(Err(err))) => return model_failed(tx, err).await,
                Ok(None) => break,
                Err(_) => return model_failed(tx, ModelError::Timeout(timeout)).await,
            };

            if !delta.reasoning.is_empty() {
                tx.send(StreamEvent::Reasoning { text: delta.reasoning }).await?;
            }
            if !delta.text.is_empty() {
                reply.push_str(&delta.text);
                for fragment in scanner.push(&delta.text) {
                    if applied.is_some() {
                        tracing::debug!(span = ?fragment.span, "ignoring additional fragment");
                        continue;
                    }
                    let response = match apply_fragment(&plan, &fragment) {
                        Ok(response) => response,
                        Err(err @ GenerateError::InvalidGeneration { .. }) => {
                            tracing::warn!(%err, "streamed document unusable");
                            return tx.send(StreamEvent::Error { message: err.to_string() }).await;
                        }
                        Err(err) => {
                            tracing::warn!(%err, "streamed change-set unusable");
                            GenerateResponse {
                                analysis: err.to_string(),
                                content: plan.original.clone().unwrap_or_default(),
                                success: false,
                            }
                        }
                    };
                    let analysis = prompt::narrative(&reply, std::slice::from_ref(&fragment.span));
                    if !analysis.is_empty() {
                        tx.send(StreamEvent::Analysis { text: analysis }).await?;
                    }
                    if response.success {
                        tx.send(StreamEvent::Diagram { content: response.content.clone() }).await?;
                    }
                    applied = Some((fragment, response));
                }
            }
            if let Some(usage) = delta.usage {
                tx.send(StreamEvent::Usage { usage }).await?;
            }
        }

        if let Some(partial) = scanner.finish() {
            tracing::warn!(partial_chars = partial.len(), "discarding unterminated fragment");
        }

        let last = match applied {
            Some((fragment, mut response)) => {
                let narrative = prompt::narrative(&reply, std::slice::from_ref(&fragment.span));
                if response.success && !narrative.is_empty() {
                    response.analysis = narrative;
                }
                tracing::info!(success = response.success, "streamed generation finished");
                StreamEvent::from(response)
            }
            None => match &plan.original {
                None => {
                    let err = GenerateError::IncompleteGeneration;
                    tracing::warn!(%err, "streamed generation failed");
                    StreamEvent::Error { message: err.to_string() }
                }
                Some(original) => {
                    let err = GenerateError::from(ChangeSetError::MissingBlock);
                    tracing::warn!(%err, "streamed reply carried no change-set");
                    StreamEvent::Final { success: false, analysis: err.to_string(), content: original.clone() }
                }
            },
        };
        tx.send(last).await
    }
}

/// Runs `drive` on its own task and hands back the receiving end as a stream. The task is
/// dropped, mid-await, as soon as the consumer drops the stream.
pub(super) fn spawn_driver<F, Fut>(drive: F) -> BoxStream<'static, StreamEvent>
where
    F: FnOnce(Sender) -> Fut + Send + 'static,
    Fut: Future<Output = Result<(), Closed>> + Send + 'static,
{
    let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
    let watcher = tx.clone();
    tokio::spawn(async move {
        tokio::select! {
            _ = watcher.closed() => tracing::debug!("stream consumer went away"),
            outcome = drive(tx) => {
                if outcome.is_err() {
                    tracing::debug!("stream consumer went away");
                }
            }
        }
    });
    futures::stream::unfold(rx, |mut rx| async move { rx.recv().await.map(|event| (event, rx)) }).boxed()
}

pub(super) async fn model_failed(tx: &Sender, err: ModelError) -> Result<(), Closed> {
    tracing::warn!(%err, "model stream failed");
    tx.send(StreamEvent::Error { message: err.to_string() }).await
}

fn apply_fragment(plan: &Plan, fragment: &MarkedFragment) -> Result<GenerateResponse, GenerateError> {
    match &plan.original {
        None => {
            let content = normalize_envelope(&fragment.text)
                .map_err(|err| GenerateError::InvalidGeneration { reason: err.to_string() })?;
            Ok(GenerateResponse { analysis: "generated a new diagram".to_owned(), content, success: true })
        }
        Some(original) => {
            let change_set = parse_change_set_body(fragment.inner())?;
            if change_set.is_empty() {
                return Err(ChangeSetError::Empty.into());
            }
            Ok(apply_change_set(original, &change_set, String::new())?)
        }
    }
}
