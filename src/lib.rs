//! chatline - a streaming chat client for the terminal
//!
//! Sends a message (and optionally a clipboard image) to an OpenAI-compatible
//! chat-completion endpoint, streams the answer back as it is generated, and keeps
//! each conversation in a local append-only log that is replayed as context on the
//! next call.
//!
//! # Overview
//!
//! The model may ask for tools mid-answer. Tool requests are resolved in a bounded
//! loop: the requested tools run locally, their results are appended to the request
//! context, and the endpoint is asked again until it answers with text.
//!
//! # Architecture
//!
//! - `config` - Configuration management
//! - `turn` - Conversation turns in their wire and storage form
//! - `history` - Append-only JSON Lines conversation logs
//! - `tools` - Tool declarations and handlers
//! - `chat` - Streaming driver, tool-call resolver and session
//! - `cli` - Command-line interface
//!
//! # Example
//!
//! ```rust,no_run
//! use chatline::chat::{ExchangeSink, OpenAIChat, Session};
//! use chatline::config::Settings;
//! use chatline::history::{ConversationId, HistoryStore};
//! use chatline::tools::ToolRegistry;
//!
//! struct Print;
//!
//! #[async_trait::async_trait]
//! impl ExchangeSink for Print {
//!     async fn fragment(&mut self, text: &str) -> chatline::Result<()> {
//!         print!("{}", text);
//!         Ok(())
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     let key = chatline::openai::api_key()?;
//!     let http = reqwest::Client::new();
//!
//!     let backend = OpenAIChat::new(http.clone(), &settings.chat.api_base, &key, "gpt-4o");
//!     let tools = ToolRegistry::new(settings.tools.clone(), http, None)?;
//!     let session = Session::new(backend, tools, HistoryStore::new(settings.history_dir()));
//!
//!     let resolution = session
//!         .run_exchange(&ConversationId::default(), "what time is it", None, &mut Print)
//!         .await?;
//!     println!("\n{} tool call(s)", resolution.tool_calls.len());
//!     Ok(())
//! }
//! ```

pub mod chat;
pub mod cli;
pub mod config;
pub mod error;
pub mod history;
pub mod openai;
pub mod tools;
pub mod turn;

pub use error::{Result, ChatlineError};
