//! One end-to-end exchange against a stored conversation.

use super::driver::ChatBackend;
use super::resolver::{Resolution, Resolver, ToolCallRecord, DEFAULT_MAX_TOOL_ROUNDS};
use crate::config::DEFAULT_SYSTEM_PROMPT;
use crate::error::Result;
use crate::history::{ConversationId, HistoryStore};
use crate::tools::{SideEffect, ToolRegistry};
use crate::turn::{ImageAttachment, Turn};
use async_trait::async_trait;
use tracing::{debug, info, instrument};

/// Receives everything an exchange produces, as it happens.
#[async_trait]
pub trait ExchangeSink: Send {
    /// A fragment of the answer, in order.
    async fn fragment(&mut self, text: &str) -> Result<()>;

    /// A tool is about to run.
    async fn tool_started(&mut self, _name: &str) -> Result<()> {
        Ok(())
    }

    /// A tool has finished.
    async fn tool_finished(&mut self, _record: &ToolCallRecord) -> Result<()> {
        Ok(())
    }

    /// Work a finished tool left for the caller.
    async fn side_effect(&mut self, _effect: SideEffect) -> Result<()> {
        Ok(())
    }

    /// The answer is complete, or the exchange failed.
    async fn finish(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Chat session bound to a backend, a tool set and a history store.
pub struct Session<B: ChatBackend> {
    backend: B,
    tools: ToolRegistry,
    history: HistoryStore,
    system_prompt: String,
    max_tool_rounds: usize,
}

impl<B: ChatBackend> Session<B> {
    pub fn new(backend: B, tools: ToolRegistry, history: HistoryStore) -> Self {
        Self {
            backend,
            tools,
            history,
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            max_tool_rounds: DEFAULT_MAX_TOOL_ROUNDS,
        }
    }

    /// Set a custom system prompt.
    pub fn with_system_prompt(mut self, prompt: &str) -> Self {
        self.system_prompt = prompt.to_string();
        self
    }

    /// Set maximum tool rounds per exchange.
    pub fn with_max_tool_rounds(mut self, max: usize) -> Self {
        self.max_tool_rounds = max;
        self
    }

    pub fn history(&self) -> &HistoryStore {
        &self.history
    }

    /// Send one user message and stream the answer to `sink`.
    ///
    /// The user turn and the answer are stored only when the exchange succeeds.
    #[instrument(skip(self, user_text, image, sink), fields(conversation = %conversation))]
    pub async fn run_exchange(
        &self,
        conversation: &ConversationId,
        user_text: &str,
        image: Option<ImageAttachment>,
        sink: &mut dyn ExchangeSink,
    ) -> Result<Resolution> {
        let history = self.history.load(conversation)?;

        let user_turn = match &image {
            Some(image) => {
                debug!("Attaching {} byte image", image.len());
                Turn::user_with_image(user_text, image)
            }
            None => Turn::user(user_text),
        };

        let mut context = Vec::with_capacity(history.len() + 2);
        context.push(Turn::system(&self.system_prompt));
        context.extend(history);
        context.push(user_turn.clone());

        let outcome = Resolver::new(&self.backend, &self.tools)
            .with_max_tool_rounds(self.max_tool_rounds)
            .resolve(&mut context, sink)
            .await;
        sink.finish().await?;
        let resolution = outcome?;

        self.history.append(conversation, &user_turn)?;
        self.history
            .append(conversation, &Turn::assistant(&resolution.answer))?;

        info!(
            "Exchange complete: {} chars, {} tool call(s)",
            resolution.answer.len(),
            resolution.tool_calls.len()
        );
        Ok(resolution)
    }
}
