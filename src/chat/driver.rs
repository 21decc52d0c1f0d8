//! Streamed chat-completion requests.
//!
//! A request is sent once and its server-sent events are decoded lazily into [`Delta`]s.

use crate::error::{ChatlineError, Result};
use crate::turn::Turn;
use async_openai::types::ChatCompletionTool;
use async_trait::async_trait;
use eventsource_stream::Eventsource;
use futures::{Stream, StreamExt};
use reqwest::header::{ACCEPT, AUTHORIZATION};
use serde::{Deserialize, Serialize};
use std::pin::Pin;
use tracing::{debug, instrument, trace, warn};

/// Sentinel data marking the end of a stream.
const DONE_SENTINEL: &str = "[DONE]";

/// How the model phrased a tool request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallStyle {
    /// `tool_calls` entries with ids.
    Tool,
    /// A single legacy `function_call`.
    Function,
}

/// Piece of a tool call spread across stream events.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolCallFragment {
    pub index: usize,
    pub id: Option<String>,
    pub name: Option<String>,
    pub arguments: Option<String>,
    pub style: CallStyle,
}

/// One incremental fragment of a streamed answer.
#[derive(Debug, Clone, PartialEq)]
pub enum Delta {
    Content(String),
    ToolCall(ToolCallFragment),
}

/// Ordered, forward-only sequence of deltas from one request.
pub type DeltaStream = Pin<Box<dyn Stream<Item = Result<Delta>> + Send>>;

/// Something that can answer a request context with a delta stream.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Send the context with the offered tools and return the streamed answer.
    async fn send(&self, context: &[Turn], tools: &[ChatCompletionTool]) -> Result<DeltaStream>;
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [Turn],
    stream: bool,
    #[serde(skip_serializing_if = "no_tools")]
    tools: &'a [ChatCompletionTool],
}

fn no_tools(tools: &&[ChatCompletionTool]) -> bool {
    tools.is_empty()
}

#[derive(Debug, Deserialize)]
struct ChatStreamChunk {
    #[serde(default)]
    choices: Vec<StreamChoice>,
    #[serde(default)]
    error: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    #[serde(default)]
    delta: StreamDelta,
}

#[derive(Debug, Default, Deserialize)]
struct StreamDelta {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<ToolCallChunk>>,
    #[serde(default)]
    function_call: Option<FunctionCallChunk>,
}

#[derive(Debug, Deserialize)]
struct ToolCallChunk {
    #[serde(default)]
    index: usize,
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    function: Option<FunctionCallChunk>,
}

#[derive(Debug, Deserialize)]
struct FunctionCallChunk {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    arguments: Option<String>,
}

/// Decode one event payload into zero or more deltas.
///
/// Chunks carrying neither non-empty content nor a tool-call fragment yield nothing.
pub fn decode_event(raw: &str) -> Result<Vec<Delta>> {
    let chunk: ChatStreamChunk = serde_json::from_str(raw).map_err(|e| ChatlineError::Decode {
        message: e.to_string(),
        raw: raw.to_string(),
    })?;

    if let Some(error) = chunk.error {
        let message = error
            .get("message")
            .and_then(|m| m.as_str())
            .map(str::to_string)
            .unwrap_or_else(|| error.to_string());
        return Err(ChatlineError::Decode {
            message: format!("API error: {}", message),
            raw: raw.to_string(),
        });
    }

    let mut deltas = Vec::new();
    for choice in chunk.choices {
        let delta = choice.delta;

        if let Some(calls) = delta.tool_calls {
            for call in calls {
                let (name, arguments) = call
                    .function
                    .map(|f| (f.name, f.arguments))
                    .unwrap_or_default();
                deltas.push(Delta::ToolCall(ToolCallFragment {
                    index: call.index,
                    id: call.id,
                    name,
                    arguments,
                    style: CallStyle::Tool,
                }));
            }
        }

        if let Some(call) = delta.function_call {
            deltas.push(Delta::ToolCall(ToolCallFragment {
                index: 0,
                id: None,
                name: call.name,
                arguments: call.arguments,
                style: CallStyle::Function,
            }));
        }

        // An empty string says nothing about whether a tool call follows.
        if let Some(content) = delta.content.filter(|c| !c.is_empty()) {
            deltas.push(Delta::Content(content));
        }
    }
    Ok(deltas)
}

/// Streaming client for an OpenAI-compatible chat-completions endpoint.
pub struct OpenAIChat {
    http: reqwest::Client,
    api_base: String,
    api_key: String,
    model: String,
}

impl OpenAIChat {
    pub fn new(http: reqwest::Client, api_base: &str, api_key: &str, model: &str) -> Self {
        Self {
            http,
            api_base: api_base.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
        }
    }

    /// Model identifier sent with every request.
    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.api_base)
    }
}

#[async_trait]
impl ChatBackend for OpenAIChat {
    #[instrument(skip(self, context, tools), fields(model = %self.model, turns = context.len()))]
    async fn send(&self, context: &[Turn], tools: &[ChatCompletionTool]) -> Result<DeltaStream> {
        let request = ChatRequest {
            model: &self.model,
            messages: context,
            stream: true,
            tools,
        };

        let response = self
            .http
            .post(self.endpoint())
            .header(AUTHORIZATION, format!("Bearer {}", self.api_key))
            .header(ACCEPT, "text/event-stream")
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(ChatlineError::Api { status, body });
        }

        debug!("Streaming response from {}", self.endpoint());
        let mut events = response.bytes_stream().eventsource();

        let deltas = async_stream::try_stream! {
            let mut finished = false;
            while let Some(event) = events.next().await {
                let event = event.map_err(|e| ChatlineError::Decode {
                    message: format!("SSE stream error: {}", e),
                    raw: String::new(),
                })?;

                trace!("SSE data: {}", event.data);
                if event.data.trim() == DONE_SENTINEL {
                    finished = true;
                    break;
                }

                for delta in decode_event(&event.data)? {
                    yield delta;
                }
            }
            if !finished {
                warn!("Response stream closed without a completion sentinel");
            }
        };

        Ok(Box::pin(deltas))
    }
}
