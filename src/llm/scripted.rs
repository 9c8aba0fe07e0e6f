// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-FlowGen-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of FlowGen and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use futures::future::BoxFuture;
use futures::{FutureExt, StreamExt};

use super::{DeltaStream, ModelClient, ModelDelta, ModelError, ModelReply};

/// Produces a reply for prompts that find the script empty.
pub type Responder = Arc<dyn Fn(&str) -> String + Send + Sync>;

#[derive(Debug, Clone)]
enum Step {
    Reply(ModelReply),
    Fail(ModelError),
    /// Never answers; used to exercise timeouts.
    Stall,
}

/// In-process model that replays queued replies in order.
///
/// Streams split each reply into deltas of `chunk_chars` characters (reasoning first, then text,
/// then usage), optionally sleeping between deltas.
pub struct ScriptedModel {
    steps: Mutex<VecDeque<Step>>,
    prompts: Mutex<Vec<String>>,
    responder: Option<Responder>,
    chunk_chars: usize,
    delta_delay: Duration,
}

impl Default for ScriptedModel {
    fn default() -> Self {
        Self {
            steps: Mutex::new(VecDeque::new()),
            prompts: Mutex::new(Vec::new()),
            responder: None,
            chunk_chars: 16,
            delta_delay: Duration::ZERO,
        }
    }
}

impl ScriptedModel {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(self, step: Step) -> Self {
        self.steps.lock().unwrap_or_else(PoisonError::into_inner).push_back(step);
        self
    }

    pub fn reply(self, text: impl Into<String>) -> Self {
        self.push(Step::Reply(ModelReply::text(text)))
    }

    pub fn reply_with(self, reply: ModelReply) -> Self {
        self.push(Step::Reply(reply))
    }

    pub fn fail(self, err: ModelError) -> Self {
        self.push(Step::Fail(err))
    }

    pub fn stall(self) -> Self {
        self.push(Step::Stall)
    }

    pub fn responder(mut self, responder: impl Fn(&str) -> String + Send + Sync + 'static) -> Self {
        self.responder = Some(Arc::new(responder));
        self
    }

    pub fn chunk_chars(mut self, chunk_chars: usize) -> Self {
        self.chunk_chars = chunk_chars.max(1);
        self
    }

    pub fn delta_delay(mut self, delay: Duration) -> Self {
        self.delta_delay = delay;
        self
    }

    /// Prompts received so far, oldest first.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn remaining(&self) -> usize {
        self.steps.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    fn next_step(&self, prompt: &str) -> Step {
        self.prompts.lock().unwrap_or_else(PoisonError::into_inner).push(prompt.to_owned());
        let scripted = self.steps.lock().unwrap_or_else(PoisonError::into_inner).pop_front();
        match (scripted, &self.responder) {
            (Some(step), _) => step,
            (None, Some(responder)) => Step::Reply(ModelReply::text(responder(prompt))),
            (None, None) => Step::Fail(ModelError::Exhausted),
        }
    }

    fn deltas(&self, reply: ModelReply) -> DeltaStream {
        let mut deltas: Vec<ModelDelta> = Vec::new();
        for reasoning in chunk_text(&reply.reasoning, self.chunk_chars) {
            deltas.push(ModelDelta { reasoning, ..ModelDelta::default() });
        }
        for text in chunk_text(&reply.text, self.chunk_chars) {
            deltas.push(ModelDelta { text, ..ModelDelta::default() });
        }
        if let Some(usage) = reply.usage {
            deltas.push(ModelDelta { usage: Some(usage), ..ModelDelta::default() });
        }

        let delay = self.delta_delay;
        futures::stream::iter(deltas)
            .then(move |delta| async move {
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                Ok(delta)
            })
            .boxed()
    }
}

impl ScriptedModel {
    /// Model for `--demo`: draws a two-step flow for new documents and appends one note cell to
    /// existing ones.
    pub fn demo() -> Self {
        Self::new().chunk_chars(8).responder(demo_reply)
    }
}

const DEMO_DOCUMENT: &str = r#"<mxfile host="flowgen"><diagram id="demo" name="Page-1"><mxGraphModel><root><mxCell id="0"/><mxCell id="1" parent="0"/><mxCell id="2" value="Request" style="rounded=1;whiteSpace=wrap;html=1;" vertex="1" parent="1"><mxGeometry x="40" y="40" width="120" height="60" as="geometry"/></mxCell><mxCell id="3" value="Response" style="rounded=1;whiteSpace=wrap;html=1;" vertex="1" parent="1"><mxGeometry x="40" y="160" width="120" height="60" as="geometry"/></mxCell><mxCell id="4" value="" style="endArrow=classic;html=1;" edge="1" parent="1" source="2" target="3"><mxGeometry relative="1" as="geometry"/></mxCell></root></mxGraphModel></diagram></mxfile>"#;

fn demo_reply(prompt: &str) -> String {
    let next_id = prompt
        .split("starting at ")
        .nth(1)
        .map(|rest| rest.chars().take_while(char::is_ascii_digit).collect::<String>())
        .filter(|digits| !digits.is_empty());
    match next_id {
        None => format!("[ANALYSIS]\nA request flowing into a response.\n\n[DIAGRAM]\n{DEMO_DOCUMENT}"),
        Some(id) => format!(
            "Added a note for the request.\n\n```xml\n<mxCell id=\"{id}\" value=\"Note\" style=\"shape=note;whiteSpace=wrap;html=1;\" vertex=\"1\" parent=\"1\">\n  <mxGeometry x=\"240\" y=\"40\" width=\"100\" height=\"60\" as=\"geometry\"/>\n</mxCell>\n```"
        ),
    }
}

fn chunk_text(text: &str, chunk_chars: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    chars.chunks(chunk_chars.max(1)).map(|chunk| chunk.iter().collect()).collect()
}

impl ModelClient for ScriptedModel {
    fn complete<'a>(&'a self, prompt: &'a str) -> BoxFuture<'a, Result<ModelReply, ModelError>> {
        let step = self.next_step(prompt);
        async move {
            match step {
                Step::Reply(reply) => Ok(reply),
                Step::Fail(err) => Err(err),
                Step::Stall => futures::future::pending().await,
            }
        }
        .boxed()
    }

    fn stream<'a>(&'a self, prompt: &'a str) -> BoxFuture<'a, Result<DeltaStream, ModelError>> {
        let step = self.next_step(prompt);
        let result = match step {
            Step::Reply(reply) => Ok(self.deltas(reply)),
            Step::Fail(err) => Err(err),
            Step::Stall => Ok(futures::stream::pending().boxed()),
        };
        futures::future::ready(result).boxed()
    }
}
