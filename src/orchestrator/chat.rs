// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-FlowGen-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of FlowGen and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Free-form chat with the configured model. No document is involved; the message is the
//! prompt.

use futures::stream::BoxStream;
use futures::StreamExt;
use tokio::time::{timeout_at, Instant};

use super::stream::{model_failed, spawn_driver, Closed, Sender};
use super::{Orchestrator, StreamEvent};
use crate::llm::{ModelClient, ModelError, ModelReply};

impl<M: ModelClient + ?Sized> Orchestrator<M> {
    /// One complete chat reply, bounded by the model timeout.
    pub async fn chat(&self, message: &str) -> Result<ModelReply, ModelError> {
        let reply = self.complete(message).await;
        match &reply {
            Ok(reply) => tracing::info!(reply_chars = reply.text.chars().count(), "chat finished"),
            Err(err) => tracing::warn!(%err, "chat failed"),
        }
        reply
    }
}

impl<M: ModelClient + ?Sized + 'static> Orchestrator<M> {
    /// Streams a chat reply as `reasoning`/`text`/`usage` events, then `Final` with the whole
    /// text or a single `Error`.
    ///
    /// Must be called within a tokio runtime.
    pub fn chat_streaming(&self, message: String) -> BoxStream<'static, StreamEvent> {
        let orchestrator = self.clone();
        spawn_driver(move |tx| async move { orchestrator.drive_chat(&message, &tx).await })
    }

    async fn drive_chat(&self, message: &str, tx: &Sender) -> Result<(), Closed> {
        let timeout = self.config.model_timeout;
        let deadline = Instant::now() + timeout;
        let mut deltas = match timeout_at(deadline, self.model.stream(message)).await {
            Ok(Ok(deltas)) => deltas,
            Ok(Err(err)) => return model_failed(tx, err).await,
            Err(_) => return model_failed(tx, ModelError::Timeout(timeout)).await,
        };

        let mut reply = String::new();
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
                tx.send(StreamEvent::Text { text: delta.text }).await?;
            }
            if let Some(usage) = delta.usage {
                tx.send(StreamEvent::Usage { usage }).await?;
            }
        }

        tracing::info!(reply_chars = reply.chars().count(), "streamed chat finished");
        tx.send(StreamEvent::Final { success: true, analysis: String::new(), content: reply }).await
    }
}
