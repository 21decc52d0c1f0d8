//! CLI command implementations.

mod chat;
mod config;
mod history;

pub use chat::run_chat;
pub use config::{run_config_path, run_show_config};
pub use history::{run_clear, run_history, run_list};
