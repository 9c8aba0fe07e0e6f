// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-FlowGen-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of FlowGen and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::collections::VecDeque;
use std::time::Duration;

use futures::future::BoxFuture;
use futures::{FutureExt, StreamExt};
use serde::{Deserialize, Serialize};

use super::{
    DeltaStream, ModelClient, ModelClientConfig, ModelDelta, ModelError, ModelReply, Provider,
    TokenUsage,
};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct StreamOptions {
    include_usage: bool,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 1],
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    stream_options: Option<StreamOptions>,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ResponseChoice>,
    usage: Option<TokenUsage>,
}

#[derive(Deserialize)]
struct ResponseChoice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: Option<String>,
    reasoning_content: Option<String>,
}

#[derive(Deserialize)]
struct ChatChunk {
    #[serde(default)]
    choices: Vec<ChunkChoice>,
    usage: Option<TokenUsage>,
}

#[derive(Deserialize)]
struct ChunkChoice {
    #[serde(default)]
    delta: ChunkDelta,
}

#[derive(Default, Deserialize)]
struct ChunkDelta {
    content: Option<String>,
    reasoning_content: Option<String>,
}

/// Client for OpenAI-compatible `/chat/completions` endpoints (DeepSeek, GLM, OpenAI, ...).
#[derive(Debug, Clone)]
pub struct OpenAiClient {
    http: reqwest::Client,
    config: ModelClientConfig,
    provider: Provider,
    timeout: Duration,
}

impl OpenAiClient {
    /// `timeout` bounds single-shot completions; streamed calls are bounded by the caller.
    pub fn new(config: ModelClientConfig, timeout: Duration) -> Result<Self, ModelError> {
        let http = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|err| ModelError::Transport(err.to_string()))?;
        let provider = config.provider();
        Ok(Self { http, config, provider, timeout })
    }

    pub fn provider(&self) -> Provider {
        self.provider
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'))
    }

    fn request<'a>(&'a self, prompt: &'a str, stream: bool) -> ChatRequest<'a> {
        ChatRequest {
            model: &self.config.model_name,
            messages: [ChatMessage { role: "user", content: prompt }],
            stream,
            stream_options: stream.then_some(StreamOptions { include_usage: true }),
        }
    }

    fn transport_error(&self, err: reqwest::Error) -> ModelError {
        if err.is_timeout() {
            ModelError::Timeout(self.timeout)
        } else {
            ModelError::Transport(err.to_string())
        }
    }

    async fn send(
        &self,
        body: &ChatRequest<'_>,
        timeout: Option<Duration>,
    ) -> Result<reqwest::Response, ModelError> {
        let mut request =
            self.http.post(self.endpoint()).bearer_auth(&self.config.api_key).json(body);
        if let Some(timeout) = timeout {
            request = request.timeout(timeout);
        }
        let response = request.send().await.map_err(|err| self.transport_error(err))?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ModelError::Status { status: status.as_u16(), body });
        }
        Ok(response)
    }

    async fn complete_inner(&self, prompt: &str) -> Result<ModelReply, ModelError> {
        let body = self.request(prompt, false);
        tracing::debug!(
            model = %self.config.model_name,
            prompt_chars = prompt.chars().count(),
            "calling model"
        );
        let response = self.send(&body, Some(self.timeout)).await?;
        let chat: ChatResponse = response.json().await.map_err(|err| {
            if err.is_timeout() {
                ModelError::Timeout(self.timeout)
            } else {
                ModelError::Decode(err.to_string())
            }
        })?;
        let message = chat
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message)
            .ok_or_else(|| ModelError::Decode("response has no choices".to_owned()))?;
        Ok(ModelReply {
            text: message.content.unwrap_or_default(),
            reasoning: message.reasoning_content.unwrap_or_default(),
            usage: chat.usage,
        })
    }

    async fn stream_inner(&self, prompt: &str) -> Result<DeltaStream, ModelError> {
        let body = self.request(prompt, true);
        tracing::debug!(
            model = %self.config.model_name,
            prompt_chars = prompt.chars().count(),
            "streaming model"
        );
        let response = self.send(&body, None).await?;

        let state = StreamState {
            bytes: response.bytes_stream().boxed(),
            decoder: SseDecoder::default(),
            pending: VecDeque::new(),
            done: false,
        };
        let deltas = futures::stream::unfold(state, |mut state| async move {
            loop {
                if let Some(item) = state.pending.pop_front() {
                    return Some((item, state));
                }
                if state.done {
                    return None;
                }
                match state.bytes.next().await {
                    Some(Ok(chunk)) => {
                        for event in state.decoder.push(&chunk) {
                            match event {
                                SseEvent::Done => {
                                    state.done = true;
                                    break;
                                }
                                SseEvent::Data(payload) => {
                                    if let Some(delta) = decode_chunk(&payload).transpose() {
                                        state.pending.push_back(delta);
                                    }
                                }
                            }
                        }
                    }
                    Some(Err(err)) => {
                        state.done = true;
                        state.pending.push_back(Err(ModelError::Transport(err.to_string())));
                    }
                    None => state.done = true,
                }
            }
        });
        Ok(deltas.boxed())
    }
}

impl ModelClient for OpenAiClient {
    fn complete<'a>(&'a self, prompt: &'a str) -> BoxFuture<'a, Result<ModelReply, ModelError>> {
        self.complete_inner(prompt).boxed()
    }

    fn stream<'a>(&'a self, prompt: &'a str) -> BoxFuture<'a, Result<DeltaStream, ModelError>> {
        self.stream_inner(prompt).boxed()
    }
}

struct StreamState<S> {
    bytes: S,
    decoder: SseDecoder,
    pending: VecDeque<Result<ModelDelta, ModelError>>,
    done: bool,
}

/// Decodes one `data:` payload; `Ok(None)` for chunks that carry nothing.
fn decode_chunk(payload: &str) -> Result<Option<ModelDelta>, ModelError> {
    let chunk: ChatChunk = serde_json::from_str(payload).map_err(|err| ModelError::Decode(err.to_string()))?;
    let delta = chunk.choices.into_iter().next().map(|choice| choice.delta).unwrap_or_default();
    let delta = ModelDelta {
        text: delta.content.unwrap_or_default(),
        reasoning: delta.reasoning_content.unwrap_or_default(),
        usage: chunk.usage,
    };
    Ok((!delta.is_empty()).then_some(delta))
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum SseEvent {
    Data(String),
    Done,
}

/// Incremental server-sent-events framing: bytes in, complete `data:` payloads out.
#[derive(Debug, Default)]
struct SseDecoder {
    buffer: Vec<u8>,
}

impl SseDecoder {
    fn push(&mut self, bytes: &[u8]) -> Vec<SseEvent> {
        self.buffer.extend(bytes.iter().copied().filter(|byte| *byte != b'\r'));

        let mut events = Vec::new();
        while let Some(end) = self.buffer.windows(2).position(|window| window == b"\n\n") {
            let block: Vec<u8> = self.buffer.drain(..end + 2).collect();
            let block = String::from_utf8_lossy(&block);
            let data: Vec<&str> = block
                .lines()
                .filter_map(|line| line.strip_prefix("data:"))
                .map(|value| value.strip_prefix(' ').unwrap_or(value))
                .collect();
            if data.is_empty() {
                continue;
            }
            let payload = data.join("\n");
            if payload.trim() == "[DONE]" {
                events.push(SseEvent::Done);
            } else {
                events.push(SseEvent::Data(payload));
            }
        }
        events
    }
}
