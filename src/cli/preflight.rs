//! Pre-flight checks before contacting the model.
//!
//! Validates that configuration and inputs are usable before a request is sent, so a
//! misconfiguration fails with a clear message instead of an HTTP error.

use crate::config::Settings;
use crate::error::{ChatlineError, Result};
use crate::openai;

/// Requirements for different operations.
#[derive(Debug, Clone, Copy)]
pub enum Operation {
    /// Sending a message needs an API key and an http(s) API base.
    Chat,
    /// Reading or clearing history needs nothing external.
    History,
}

/// Run pre-flight checks for the given operation.
///
/// Returns Ok(()) if all checks pass, or an error describing what's missing.
pub fn check(operation: Operation, settings: &Settings) -> Result<()> {
    match operation {
        Operation::Chat => {
            check_api_base(&settings.chat.api_base)?;
            openai::api_key()?;
        }
        Operation::History => {
            // Nothing external to check
        }
    }
    Ok(())
}

fn check_api_base(api_base: &str) -> Result<()> {
    if api_base.starts_with("http://") || api_base.starts_with("https://") {
        Ok(())
    } else {
        Err(ChatlineError::Config(format!(
            "chat.api_base must be an http(s) URL, got '{}'",
            api_base
        )))
    }
}
