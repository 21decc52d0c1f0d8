//! CLI output formatting utilities.

use crate::history::ConversationSummary;
use crate::turn::{Role, Turn};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};

/// Output helper for CLI formatting.
///
/// Status lines go to stderr so stdout carries only answers and requested listings.
pub struct Output;

impl Output {
    /// Print an info message.
    pub fn info(msg: &str) {
        eprintln!("{} {}", style(">>").cyan().bold(), msg);
    }

    /// Print a warning message.
    pub fn warning(msg: &str) {
        eprintln!("{} {}", style(">>").yellow().bold(), msg);
    }

    /// Print a header.
    pub fn header(msg: &str) {
        println!("\n{}", style(msg).bold().underlined());
    }

    /// Print a key-value pair.
    pub fn kv(key: &str, value: &str) {
        println!("  {}: {}", style(key).dim(), value);
    }

    /// Print one stored turn.
    pub fn turn(turn: &Turn) {
        let label = match turn.role {
            Role::System => style("system:").dim().bold(),
            Role::User => style("you:").green().bold(),
            Role::Assistant => style("assistant:").cyan().bold(),
            Role::Tool | Role::Function => style("tool:").yellow().bold(),
        };
        let images = turn.content.as_ref().map(|c| c.image_count()).unwrap_or(0);

        println!("{} {}", label, turn.text());
        if images > 0 {
            println!("   {}", style(format!("[{} image(s) attached]", images)).dim());
        }
    }

    /// Print one conversation summary.
    pub fn conversation(summary: &ConversationSummary) {
        let modified = summary
            .modified
            .map(|m| m.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "  {} {} ({} turns, {})",
            style("*").cyan(),
            style(summary.id.as_str()).bold(),
            summary.turns,
            style(modified).dim()
        );
    }

    /// Create a spinner on stderr.
    pub fn spinner(msg: &str) -> ProgressBar {
        let pb = ProgressBar::new_spinner();
        if let Ok(spinner_style) =
            ProgressStyle::default_spinner().template("{spinner:.green} {msg}")
        {
            pb.set_style(spinner_style);
        }
        pb.set_message(msg.to_string());
        pb.enable_steady_tick(std::time::Duration::from_millis(100));
        pb
    }
}
