//! History commands: show, list and clear conversations.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::history::{ConversationId, HistoryStore};
use anyhow::Result;

/// Print every turn of a conversation.
pub fn run_history(
    store: &HistoryStore,
    conversation: &ConversationId,
    settings: &Settings,
) -> Result<()> {
    preflight::check(Operation::History, settings)?;

    let turns = store.load(conversation)?;
    if turns.is_empty() {
        Output::info(&format!("No history for '{}' yet.", conversation));
        return Ok(());
    }

    Output::header(&format!("Conversation '{}' ({} turns)", conversation, turns.len()));
    println!();
    for turn in &turns {
        Output::turn(turn);
    }
    Ok(())
}

/// List stored conversations.
pub fn run_list(store: &HistoryStore) -> Result<()> {
    let conversations = store.list()?;
    if conversations.is_empty() {
        Output::info("No conversations yet. Send a message to start one.");
        return Ok(());
    }

    Output::header(&format!("Conversations ({})", conversations.len()));
    println!();
    for summary in &conversations {
        Output::conversation(summary);
    }

    let total_turns: usize = conversations.iter().map(|c| c.turns).sum();
    println!();
    Output::kv("Total turns", &total_turns.to_string());
    Output::kv("History directory", &store.dir().display().to_string());
    Ok(())
}

/// Truncate a conversation's history.
pub fn run_clear(store: &HistoryStore, conversation: &ConversationId) -> Result<()> {
    store.clear(conversation)?;
    println!("Deleted history");
    Ok(())
}
