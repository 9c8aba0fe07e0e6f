// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-FlowGen-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of FlowGen and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Language-model clients.
//!
//! The orchestrator only sees [`ModelClient`]. [`openai::OpenAiClient`] talks to any
//! OpenAI-compatible chat-completions endpoint; [`scripted::ScriptedModel`] replays canned replies
//! for tests and the `--demo` server.

pub mod openai;
pub mod scripted;

use std::time::Duration;

use futures::future::BoxFuture;
use futures::stream::BoxStream;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

pub use openai::OpenAiClient;
pub use scripted::ScriptedModel;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct TokenUsage {
    #[serde(default)]
    pub prompt_tokens: u64,
    #[serde(default)]
    pub completion_tokens: u64,
    #[serde(default)]
    pub total_tokens: u64,
}

/// A complete (non-streamed) reply.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModelReply {
    pub text: String,
    /// Chain-of-thought text from reasoning models; empty for everything else.
    pub reasoning: String,
    pub usage: Option<TokenUsage>,
}

impl ModelReply {
    pub fn text(text: impl Into<String>) -> Self {
        Self { text: text.into(), ..Self::default() }
    }
}

/// One increment of a streamed reply. Any field may be empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModelDelta {
    pub text: String,
    pub reasoning: String,
    pub usage: Option<TokenUsage>,
}

impl ModelDelta {
    pub fn is_empty(&self) -> bool {
        self.text.is_empty() && self.reasoning.is_empty() && self.usage.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ModelError {
    #[error("model request failed: {0}")]
    Transport(String),
    #[error("model endpoint returned status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("could not decode model response: {0}")]
    Decode(String),
    #[error("model call timed out after {0:?}")]
    Timeout(Duration),
    /// A scripted model ran out of replies.
    #[error("no more scripted replies")]
    Exhausted,
}

pub type DeltaStream = BoxStream<'static, Result<ModelDelta, ModelError>>;

/// A chat model that accepts a single user prompt.
pub trait ModelClient: Send + Sync {
    fn complete<'a>(&'a self, prompt: &'a str) -> BoxFuture<'a, Result<ModelReply, ModelError>>;

    /// Starts a streamed completion. Errors before the first byte are returned directly; later
    /// failures arrive as `Err` items.
    fn stream<'a>(&'a self, prompt: &'a str) -> BoxFuture<'a, Result<DeltaStream, ModelError>>;
}

/// Vendor family, resolved once from the model name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Provider {
    DeepSeek,
    Glm,
    OpenAiCompatible,
}

impl Provider {
    pub fn from_model_name(model_name: &str) -> Self {
        let name = model_name.trim().to_ascii_lowercase();
        if name.starts_with("deepseek") {
            Self::DeepSeek
        } else if name.starts_with("glm") {
            Self::Glm
        } else {
            Self::OpenAiCompatible
        }
    }

    pub fn default_base_url(self) -> &'static str {
        match self {
            Self::DeepSeek => "https://api.deepseek.com",
            Self::Glm => "https://open.bigmodel.cn/api/paas/v4",
            Self::OpenAiCompatible => "https://api.openai.com/v1",
        }
    }

    /// Whether streamed deltas carry a separate `reasoning_content` channel.
    pub fn emits_reasoning(self) -> bool {
        matches!(self, Self::DeepSeek)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelClientConfig {
    pub api_key: String,
    pub base_url: String,
    pub model_name: String,
}

impl ModelClientConfig {
    /// Config for `model_name` using the provider's default endpoint.
    pub fn for_model(api_key: impl Into<String>, model_name: impl Into<String>) -> Self {
        let model_name = model_name.into();
        let base_url = Provider::from_model_name(&model_name).default_base_url().to_owned();
        Self { api_key: api_key.into(), base_url, model_name }
    }

    pub fn provider(&self) -> Provider {
        Provider::from_model_name(&self.model_name)
    }
}
