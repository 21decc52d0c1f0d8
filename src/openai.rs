//! HTTP and OpenAI client construction with sensible defaults.

use crate::error::{ChatlineError, Result};
use async_openai::{config::OpenAIConfig, Client};
use std::time::Duration;

/// Default timeout for one-shot API requests such as image generation (5 minutes).
const DEFAULT_TIMEOUT_SECS: u64 = 300;

/// Read the OpenAI API key from the environment.
pub fn api_key() -> Result<String> {
    match std::env::var("OPENAI_API_KEY") {
        Ok(key) if !key.is_empty() => Ok(key),
        Ok(_) => Err(ChatlineError::Config(
            "OPENAI_API_KEY is empty. Set it with: export OPENAI_API_KEY='sk-...'".to_string(),
        )),
        Err(_) => Err(ChatlineError::Config(
            "OPENAI_API_KEY not set. Set it with: export OPENAI_API_KEY='sk-...'".to_string(),
        )),
    }
}

/// Build the HTTP client used for streamed chat requests.
///
/// Only the connect phase is bounded; a streamed answer may legitimately run for minutes.
pub fn streaming_http_client(connect_timeout: Duration) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .connect_timeout(connect_timeout)
        .build()
        .map_err(ChatlineError::from)
}

/// Build the HTTP client used by tools for plain request/response calls.
pub fn tool_http_client() -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(30))
        .build()
        .map_err(ChatlineError::from)
}

/// Create an OpenAI client for the given API base with the default timeout.
pub fn create_client(api_base: &str, api_key: &str) -> Result<Client<OpenAIConfig>> {
    let http_client = reqwest::Client::builder()
        .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
        .build()?;

    let config = OpenAIConfig::new()
        .with_api_base(api_base.trim_end_matches('/'))
        .with_api_key(api_key);

    Ok(Client::with_config(config).with_http_client(http_client))
}
