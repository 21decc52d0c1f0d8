//! Scripted backend and recording sink shared by the chat tests.

use super::driver::{CallStyle, ChatBackend, Delta, DeltaStream, ToolCallFragment};
use super::resolver::ToolCallRecord;
use super::session::ExchangeSink;
use crate::error::Result;
use crate::tools::SideEffect;
use crate::turn::Turn;
use async_openai::types::ChatCompletionTool;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// Ordered record of backend calls and sink events, shared between a backend and a sink.
pub type EventLog = Arc<Mutex<Vec<String>>>;

fn log_event(log: &Option<EventLog>, event: &str) {
    if let Some(log) = log {
        log.lock().unwrap().push(event.to_string());
    }
}

/// Answers each request with the next canned delta sequence and remembers what it was sent.
#[derive(Default)]
pub struct ScriptedBackend {
    responses: Mutex<VecDeque<Vec<Result<Delta>>>>,
    pub contexts: Mutex<Vec<Vec<Turn>>>,
    pub offered: Mutex<Vec<Vec<String>>>,
    log: Option<EventLog>,
}

impl ScriptedBackend {
    pub fn new(responses: Vec<Vec<Result<Delta>>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            ..Self::default()
        }
    }

    pub fn with_log(mut self, log: EventLog) -> Self {
        self.log = Some(log);
        self
    }

    pub fn calls(&self) -> usize {
        self.contexts.lock().unwrap().len()
    }

    pub fn context(&self, call: usize) -> Vec<Turn> {
        self.contexts.lock().unwrap()[call].clone()
    }
}

#[async_trait]
impl ChatBackend for ScriptedBackend {
    async fn send(&self, context: &[Turn], tools: &[ChatCompletionTool]) -> Result<DeltaStream> {
        log_event(&self.log, "send");
        self.contexts.lock().unwrap().push(context.to_vec());
        self.offered
            .lock()
            .unwrap()
            .push(tools.iter().map(|t| t.function.name.clone()).collect());
        let deltas = self.responses.lock().unwrap().pop_front().unwrap_or_default();
        Ok(Box::pin(futures::stream::iter(deltas)))
    }
}

/// Collects everything an exchange reports.
#[derive(Default)]
pub struct RecordingSink {
    pub fragments: Vec<String>,
    pub started: Vec<String>,
    pub finished: Vec<String>,
    pub effects: usize,
    pub finishes: usize,
    log: Option<EventLog>,
}

impl RecordingSink {
    pub fn with_log(log: EventLog) -> Self {
        Self {
            log: Some(log),
            ..Self::default()
        }
    }

    pub fn text(&self) -> String {
        self.fragments.concat()
    }
}

#[async_trait]
impl ExchangeSink for RecordingSink {
    async fn fragment(&mut self, text: &str) -> Result<()> {
        log_event(&self.log, "fragment");
        self.fragments.push(text.to_string());
        Ok(())
    }

    async fn tool_started(&mut self, name: &str) -> Result<()> {
        log_event(&self.log, "tool_started");
        self.started.push(name.to_string());
        Ok(())
    }

    async fn tool_finished(&mut self, record: &ToolCallRecord) -> Result<()> {
        log_event(&self.log, "tool_finished");
        self.finished.push(record.to_string());
        Ok(())
    }

    async fn side_effect(&mut self, _effect: SideEffect) -> Result<()> {
        log_event(&self.log, "side_effect");
        self.effects += 1;
        Ok(())
    }

    async fn finish(&mut self) -> Result<()> {
        self.finishes += 1;
        Ok(())
    }
}

pub fn content(text: &str) -> Result<Delta> {
    Ok(Delta::Content(text.to_string()))
}

pub fn tool_fragment(
    index: usize,
    id: Option<&str>,
    name: Option<&str>,
    arguments: Option<&str>,
) -> Result<Delta> {
    Ok(Delta::ToolCall(ToolCallFragment {
        index,
        id: id.map(str::to_string),
        name: name.map(str::to_string),
        arguments: arguments.map(str::to_string),
        style: CallStyle::Tool,
    }))
}

pub fn function_fragment(name: Option<&str>, arguments: Option<&str>) -> Result<Delta> {
    Ok(Delta::ToolCall(ToolCallFragment {
        index: 0,
        id: None,
        name: name.map(str::to_string),
        arguments: arguments.map(str::to_string),
        style: CallStyle::Function,
    }))
}
