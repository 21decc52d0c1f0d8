//! chatline CLI entry point.

use anyhow::Result;
use chatline::cli::{commands, input, Cli, Output};
use chatline::config::Settings;
use chatline::history::{ConversationId, HistoryStore};
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    let piped = input::read_piped_stdin()?;
    let args = input::merge_stdin(std::env::args().collect(), piped.as_deref());
    if args.len() <= 1 {
        println!("No arguments given");
        return Ok(());
    }
    let cli = Cli::parse_from(args);

    // Load configuration, then let flags override it
    let mut settings = Settings::load_from(cli.config.as_ref())?;
    cli.apply_to(&mut settings);

    // Initialize logging; stdout is reserved for the answer
    let log_level = cli.log_level(&settings.general.log_level);
    tracing_subscriber::registry()
        .with(EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| format!("chatline={}", log_level)),
        ))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    if cli.config_path {
        commands::run_config_path(cli.config.as_ref())?;
    }
    if cli.show_config {
        commands::run_show_config(&settings)?;
    }

    let conversation: ConversationId = cli.conversation.parse()?;
    let store = HistoryStore::new(settings.history_dir());

    if cli.list {
        commands::run_list(&store)?;
    }
    if cli.clear {
        commands::run_clear(&store, &conversation)?;
    }
    if cli.history {
        commands::run_history(&store, &conversation, &settings)?;
    }
    if cli.list || cli.history {
        return Ok(());
    }

    match cli.message() {
        Some(message) => {
            commands::run_chat(&message, &conversation, cli.image, &settings).await?;
        }
        None if cli.image => {
            Output::warning("Ignoring --image: an image needs a message to go with it");
        }
        None => {}
    }

    Ok(())
}
