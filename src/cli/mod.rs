//! CLI module for chatline.

pub mod commands;
pub mod input;
mod output;
pub mod preflight;
mod terminal;

pub use output::Output;
pub use terminal::TerminalSink;

use crate::config::Settings;
use clap::Parser;
use std::path::PathBuf;

/// chatline - chat with a language model from the terminal
///
/// Streams the answer as it arrives, remembers each conversation between calls, and lets the
/// model check the time, your location and the weather, or draw you a picture.
#[derive(Parser, Debug)]
#[command(name = "chatline")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Message to send; piped stdin is appended
    pub input: Vec<String>,

    /// Clear the conversation history before sending
    #[arg(short = 'c', long)]
    pub clear: bool,

    /// System prompt for this call
    #[arg(short, long, num_args = 1.., value_name = "PROMPT")]
    pub system: Option<Vec<String>>,

    /// Model alias (3.5, 4, 4o, mini) or model id
    #[arg(short, long)]
    pub model: Option<String>,

    /// Conversation to use
    #[arg(short = 'n', long, default_value = "default", value_name = "NAME")]
    pub conversation: String,

    /// Attach the image on the clipboard
    #[arg(short, long)]
    pub image: bool,

    /// Print the conversation history and exit
    #[arg(long)]
    pub history: bool,

    /// List stored conversations and exit
    #[arg(long)]
    pub list: bool,

    /// Print the effective configuration and exit
    #[arg(long)]
    pub show_config: bool,

    /// Print the configuration file path and exit
    #[arg(long)]
    pub config_path: bool,

    /// Directory holding conversation logs
    #[arg(long, env = "CHATLINE_HISTORY_DIR", value_name = "DIR")]
    pub history_dir: Option<PathBuf>,

    /// Maximum tool rounds per answer
    #[arg(long, value_name = "N")]
    pub max_tool_rounds: Option<usize>,

    /// Do not offer any tools to the model
    #[arg(long)]
    pub no_tools: bool,

    /// Increase verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

impl Cli {
    /// The message to send, if any.
    pub fn message(&self) -> Option<String> {
        let message = self.input.join(" ");
        let message = message.trim();
        (!message.is_empty()).then(|| message.to_string())
    }

    /// System prompt given on the command line.
    pub fn system_prompt(&self) -> Option<String> {
        self.system
            .as_ref()
            .map(|words| words.join(" "))
            .filter(|prompt| !prompt.trim().is_empty())
    }

    /// Apply command-line overrides to loaded settings.
    pub fn apply_to(&self, settings: &mut Settings) {
        if let Some(dir) = &self.history_dir {
            settings.general.history_dir = dir.to_string_lossy().into_owned();
        }
        if let Some(model) = &self.model {
            settings.chat.model = model.clone();
        }
        if let Some(prompt) = self.system_prompt() {
            settings.chat.system_prompt = prompt;
        }
        if let Some(max) = self.max_tool_rounds {
            settings.chat.max_tool_rounds = max;
        }
        if self.no_tools {
            settings.tools.enabled.clear();
        }
    }

    /// Log filter directive for the requested verbosity.
    pub fn log_level(&self, configured: &str) -> String {
        match self.verbose {
            0 => configured.to_string(),
            1 => "info".to_string(),
            2 => "debug".to_string(),
            _ => "trace".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_message_words() {
        let cli = Cli::parse_from(["chatline", "what", "time", "is", "it"]);
        assert_eq!(cli.message().as_deref(), Some("what time is it"));
        assert_eq!(cli.conversation, "default");
        assert!(!cli.clear);
    }

    #[test]
    fn test_parse_flags() {
        let cli = Cli::parse_from([
            "chatline", "-c", "-m", "4", "-n", "work", "-i", "--max-tool-rounds", "2", "-vv",
            "hello",
        ]);
        assert!(cli.clear);
        assert!(cli.image);
        assert_eq!(cli.model.as_deref(), Some("4"));
        assert_eq!(cli.conversation, "work");
        assert_eq!(cli.max_tool_rounds, Some(2));
        assert_eq!(cli.log_level("warn"), "debug");
        assert_eq!(cli.message().as_deref(), Some("hello"));
    }

    #[test]
    fn test_system_prompt_words() {
        let cli = Cli::parse_from(["chatline", "-s", "You", "are", "terse", "--", "hi"]);
        assert_eq!(cli.system_prompt().as_deref(), Some("You are terse"));
        assert_eq!(cli.message().as_deref(), Some("hi"));
    }

    #[test]
    fn test_overrides_apply_to_settings() {
        let cli = Cli::parse_from([
            "chatline",
            "--history-dir",
            "/tmp/chatline-test",
            "--no-tools",
            "--max-tool-rounds",
            "1",
            "-m",
            "mini",
            "hi",
        ]);
        let mut settings = Settings::default();
        cli.apply_to(&mut settings);

        assert_eq!(settings.general.history_dir, "/tmp/chatline-test");
        assert!(settings.tools.enabled.is_empty());
        assert_eq!(settings.chat.max_tool_rounds, 1);
        assert_eq!(settings.chat.model, "mini");
    }

    #[test]
    fn test_flags_without_message() {
        let cli = Cli::parse_from(["chatline", "--clear"]);
        assert!(cli.message().is_none());
        assert_eq!(cli.log_level("warn"), "warn");
    }
}
