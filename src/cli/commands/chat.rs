//! Chat command: send one message and stream the answer.

use crate::chat::{OpenAIChat, Session};
use crate::cli::input::capture_clipboard_image;
use crate::cli::preflight::{self, Operation};
use crate::cli::TerminalSink;
use crate::config::Settings;
use crate::history::{ConversationId, HistoryStore};
use crate::openai;
use crate::tools::{ImageGenerator, ToolRegistry};
use anyhow::Result;
use std::time::Duration;
use tracing::{debug, info};

/// Run one exchange in `conversation`, optionally attaching the clipboard image.
pub async fn run_chat(
    message: &str,
    conversation: &ConversationId,
    attach_image: bool,
    settings: &Settings,
) -> Result<()> {
    preflight::check(Operation::Chat, settings)?;
    let api_key = openai::api_key()?;

    let image = if attach_image {
        let image = capture_clipboard_image()?;
        debug!("Captured {} byte clipboard image", image.len());
        Some(image)
    } else {
        None
    };

    let model = settings.chat.resolve_model(None);
    let connect_timeout = Duration::from_secs(settings.chat.connect_timeout_secs);
    let http = openai::streaming_http_client(connect_timeout)?;
    let backend = OpenAIChat::new(http, &settings.chat.api_base, &api_key, &model);

    let tool_http = openai::tool_http_client()?;
    let tools = if !settings.tools.enabled.is_empty() {
        let images = ImageGenerator::new(
            openai::create_client(&settings.chat.api_base, &api_key)?,
            tool_http.clone(),
            &settings.tools.image_model,
            &settings.tools.image_size,
        );
        ToolRegistry::new(settings.tools.clone(), tool_http, Some(images))?
    } else {
        ToolRegistry::disabled(tool_http)
    };
    info!("Using model {} with tools {:?}", backend.model(), tools.names());

    let session = Session::new(backend, tools, HistoryStore::new(settings.history_dir()))
        .with_system_prompt(&settings.chat.system_prompt)
        .with_max_tool_rounds(settings.chat.max_tool_rounds);

    let mut sink = TerminalSink::stdout(&settings.output);
    let resolution = session
        .run_exchange(conversation, message, image, &mut sink)
        .await?;

    for call in &resolution.tool_calls {
        debug!("Tool call: {} -> {}", call, call.result);
    }
    Ok(())
}
