//! Terminal presentation of a streamed exchange.

use crate::chat::{ExchangeSink, ToolCallRecord};
use crate::cli::Output;
use crate::config::OutputSettings;
use crate::error::Result;
use crate::tools::{render_half_blocks, SideEffect};
use async_trait::async_trait;
use console::{style, Term};
use indicatif::ProgressBar;
use std::io::{self, Stdout, Write};
use std::time::Duration;

/// Prints the answer as it streams, with a spinner while tools run.
pub struct TerminalSink<W: Write + Send = Stdout> {
    out: W,
    typing_delay: Option<Duration>,
    image_width: u32,
    spinner: Option<ProgressBar>,
}

impl TerminalSink<Stdout> {
    /// Sink on stdout. The typing delay only applies when stdout is a terminal.
    pub fn stdout(settings: &OutputSettings) -> Self {
        let interactive = atty::is(atty::Stream::Stdout);
        let typing_delay = (interactive && settings.typing_delay_ms > 0)
            .then(|| Duration::from_millis(settings.typing_delay_ms));
        let columns = Term::stdout().size().1 as u32;

        Self::new(
            io::stdout(),
            typing_delay,
            settings.image_max_width.min(columns),
        )
    }
}

impl<W: Write + Send> TerminalSink<W> {
    pub fn new(out: W, typing_delay: Option<Duration>, image_width: u32) -> Self {
        Self {
            out,
            typing_delay,
            image_width,
            spinner: None,
        }
    }

    fn stop_spinner(&mut self) {
        if let Some(spinner) = self.spinner.take() {
            spinner.finish_and_clear();
        }
    }
}

#[async_trait]
impl<W: Write + Send> ExchangeSink for TerminalSink<W> {
    async fn fragment(&mut self, text: &str) -> Result<()> {
        let Some(delay) = self.typing_delay else {
            self.out.write_all(text.as_bytes())?;
            self.out.flush()?;
            return Ok(());
        };

        let mut buf = [0u8; 4];
        for c in text.chars() {
            self.out.write_all(c.encode_utf8(&mut buf).as_bytes())?;
            self.out.flush()?;
            tokio::time::sleep(delay).await;
        }
        Ok(())
    }

    async fn tool_started(&mut self, name: &str) -> Result<()> {
        self.stop_spinner();
        self.spinner = Some(Output::spinner(&format!("Running {}...", name)));
        Ok(())
    }

    async fn tool_finished(&mut self, record: &ToolCallRecord) -> Result<()> {
        self.stop_spinner();
        eprintln!("{} {}", style(format!("  [{}]", record.name)).dim(), style("✓").green());
        Ok(())
    }

    async fn side_effect(&mut self, effect: SideEffect) -> Result<()> {
        match effect {
            SideEffect::ShowImage { image, description } => {
                let art = render_half_blocks(&image, self.image_width);
                self.out.write_all(art.as_bytes())?;
                writeln!(self.out, "{}", style(description).dim().italic())?;
                self.out.flush()?;
            }
        }
        Ok(())
    }

    async fn finish(&mut self) -> Result<()> {
        self.stop_spinner();
        writeln!(self.out)?;
        self.out.flush()?;
        Ok(())
    }
}

impl<W: Write + Send> Drop for TerminalSink<W> {
    fn drop(&mut self) {
        self.stop_spinner();
    }
}
