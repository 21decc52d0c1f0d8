//! Tool-call resolution over streamed answers.
//!
//! Each backend call is classified by its first delta: content is streamed straight to the
//! sink, while a tool call is buffered to the end of the stream, executed, and answered with
//! a new backend call carrying the results.

use super::driver::{CallStyle, ChatBackend, Delta, ToolCallFragment};
use super::session::ExchangeSink;
use crate::error::{ChatlineError, Result};
use crate::tools::ToolRegistry;
use crate::turn::{FunctionCall, ToolCallRequest, Turn};
use futures::StreamExt;
use std::collections::BTreeMap;
use tracing::{debug, info, instrument, trace, warn};

/// Default cap on tool rounds per exchange.
pub const DEFAULT_MAX_TOOL_ROUNDS: usize = 5;

/// Where the resolver is within one backend call.
///
/// The stream ending outside `ToolCallDetected` is the done state: the answer is complete and
/// the resolution is returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolverState {
    AwaitingFirstDelta,
    Streaming,
    ToolCallDetected,
}

/// Record of a tool call made during an exchange.
#[derive(Debug, Clone)]
pub struct ToolCallRecord {
    /// Name of the tool called.
    pub name: String,
    /// JSON arguments passed to the tool.
    pub arguments: String,
    /// Result handed back to the model.
    pub result: String,
}

impl std::fmt::Display for ToolCallRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}({})", self.name, self.arguments)
    }
}

/// Outcome of a resolved exchange.
#[derive(Debug)]
pub struct Resolution {
    /// The final answer, exactly as streamed to the sink.
    pub answer: String,
    /// Every tool call executed, in order.
    pub tool_calls: Vec<ToolCallRecord>,
    /// Number of tool rounds used.
    pub rounds: usize,
}

#[derive(Debug, Default)]
struct PendingCall {
    id: Option<String>,
    name: String,
    arguments: String,
}

/// Accumulates tool-call fragments per slot until the stream ends.
#[derive(Debug, Default)]
struct ToolCallBuffer {
    style: Option<CallStyle>,
    slots: BTreeMap<usize, PendingCall>,
}

impl ToolCallBuffer {
    fn push(&mut self, fragment: ToolCallFragment) {
        match self.style {
            None => self.style = Some(fragment.style),
            Some(style) if style != fragment.style => {
                warn!("Mixed tool call styles in one response, keeping {:?}", style);
            }
            Some(_) => {}
        }

        let slot = self.slots.entry(fragment.index).or_default();
        if let Some(id) = fragment.id.filter(|id| !id.is_empty()) {
            slot.id = Some(id);
        }
        if let Some(name) = fragment.name {
            slot.name.push_str(&name);
        }
        if let Some(arguments) = fragment.arguments {
            slot.arguments.push_str(&arguments);
        }
    }

    /// Complete the buffered calls in slot order. Missing ids become `call_<round>_<index>`.
    fn finish(self, round: usize) -> Result<(CallStyle, Vec<ToolCallRequest>)> {
        let style = self.style.unwrap_or(CallStyle::Tool);
        let calls = self
            .slots
            .into_iter()
            .map(|(index, call)| {
                if call.name.is_empty() {
                    return Err(ChatlineError::Decode {
                        message: format!("Tool call in slot {} has no name", index),
                        raw: call.arguments,
                    });
                }
                let id = call
                    .id
                    .unwrap_or_else(|| format!("call_{}_{}", round, index));
                Ok(ToolCallRequest::new(id, call.name, call.arguments))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok((style, calls))
    }
}

/// Drives backend calls until the model produces an answer instead of a tool call.
pub struct Resolver<'a, B: ChatBackend + ?Sized> {
    backend: &'a B,
    tools: &'a ToolRegistry,
    max_tool_rounds: usize,
}

impl<'a, B: ChatBackend + ?Sized> Resolver<'a, B> {
    pub fn new(backend: &'a B, tools: &'a ToolRegistry) -> Self {
        Self {
            backend,
            tools,
            max_tool_rounds: DEFAULT_MAX_TOOL_ROUNDS,
        }
    }

    /// Set maximum tool rounds for one exchange.
    pub fn with_max_tool_rounds(mut self, max: usize) -> Self {
        self.max_tool_rounds = max;
        self
    }

    /// Resolve the context into a final answer, growing it with tool-call turns as needed.
    #[instrument(skip_all, fields(max_tool_rounds = self.max_tool_rounds))]
    pub async fn resolve(
        &self,
        context: &mut Vec<Turn>,
        sink: &mut dyn ExchangeSink,
    ) -> Result<Resolution> {
        let definitions = self.tools.definitions();
        let mut records = Vec::new();
        let mut rounds = 0;

        loop {
            debug!("Backend call after {} tool round(s)", rounds);
            let mut stream = self.backend.send(context, &definitions).await?;
            let mut state = ResolverState::AwaitingFirstDelta;
            let mut answer = String::new();
            let mut calls = ToolCallBuffer::default();

            loop {
                let next = stream.next().await.transpose().inspect_err(|e| {
                    if rounds > 0 {
                        warn!("Response after tool round {} failed: {}", rounds, e);
                    }
                })?;

                state = match (state, next) {
                    (
                        ResolverState::AwaitingFirstDelta | ResolverState::Streaming,
                        Some(Delta::Content(text)),
                    ) => {
                        sink.fragment(&text).await?;
                        answer.push_str(&text);
                        ResolverState::Streaming
                    }
                    (ResolverState::AwaitingFirstDelta, Some(Delta::ToolCall(fragment))) => {
                        if rounds >= self.max_tool_rounds {
                            return Err(ChatlineError::ToolRoundsExceeded(self.max_tool_rounds));
                        }
                        calls.push(fragment);
                        ResolverState::ToolCallDetected
                    }
                    (ResolverState::ToolCallDetected, Some(Delta::ToolCall(fragment))) => {
                        calls.push(fragment);
                        ResolverState::ToolCallDetected
                    }
                    (ResolverState::ToolCallDetected, Some(Delta::Content(text))) => {
                        trace!("Discarding content during tool call: {:?}", text);
                        ResolverState::ToolCallDetected
                    }
                    (ResolverState::Streaming, Some(Delta::ToolCall(fragment))) => {
                        warn!("Ignoring tool call fragment after answer began: {:?}", fragment);
                        ResolverState::Streaming
                    }
                    (ResolverState::ToolCallDetected, None) => break,
                    (ResolverState::AwaitingFirstDelta | ResolverState::Streaming, None) => {
                        debug!("Resolver done after {} tool round(s)", rounds);
                        return Ok(Resolution {
                            answer,
                            tool_calls: records,
                            rounds,
                        });
                    }
                };
            }

            rounds += 1;
            let (style, requests) = calls.finish(rounds)?;
            info!("Tool round {}: {} call(s)", rounds, requests.len());
            self.run_round(style, requests, context, sink, &mut records).await?;
        }
    }

    async fn run_round(
        &self,
        style: CallStyle,
        requests: Vec<ToolCallRequest>,
        context: &mut Vec<Turn>,
        sink: &mut dyn ExchangeSink,
        records: &mut Vec<ToolCallRecord>,
    ) -> Result<()> {
        match style {
            CallStyle::Tool => {
                context.push(Turn::assistant_tool_calls(requests.clone()));
                for request in requests {
                    let result = self.run_tool(&request.function, sink, records).await?;
                    context.push(Turn::tool_result(request.id, request.function.name, result));
                }
            }
            CallStyle::Function => {
                for request in requests {
                    context.push(Turn::assistant_function_call(request.function.clone()));
                    let result = self.run_tool(&request.function, sink, records).await?;
                    context.push(Turn::function_result(request.function.name, result));
                }
            }
        }
        Ok(())
    }

    async fn run_tool(
        &self,
        call: &FunctionCall,
        sink: &mut dyn ExchangeSink,
        records: &mut Vec<ToolCallRecord>,
    ) -> Result<String> {
        sink.tool_started(&call.name).await?;
        let output = self.tools.invoke(&call.name, &call.arguments).await?;

        let record = ToolCallRecord {
            name: call.name.clone(),
            arguments: call.arguments.clone(),
            result: output.content,
        };
        debug!("Tool {} returned: {}", record, record.result);
        sink.tool_finished(&record).await?;

        if let Some(effect) = output.effect {
            sink.side_effect(effect).await?;
        }

        let result = record.result.clone();
        records.push(record);
        Ok(result)
    }
}
