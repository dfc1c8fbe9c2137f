use clap::{Args, Subcommand};

use super::queue_cmd::print_actions;
use super::OutputFormat;
use crate::app::App;

/// Inspect and recover actions that kept failing
#[derive(Args)]
pub struct QuarantineCommand {
    #[command(subcommand)]
    pub command: QuarantineSubcommand,
}

#[derive(Subcommand)]
pub enum QuarantineSubcommand {
    /// List quarantined actions
    List {
        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Return every quarantined action to the queue with a fresh retry budget
    Retry,

    /// Permanently discard every quarantined action
    Clear {
        /// Confirm the discard
        #[arg(long)]
        yes: bool,
    },
}

impl QuarantineCommand {
    pub async fn run(&self, app: &App) -> Result<(), Box<dyn std::error::Error>> {
        match &self.command {
            QuarantineSubcommand::List { format } => {
                let actions = app.queue.quarantined().await?;
                match format {
                    OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&actions)?),
                    OutputFormat::Text => print_actions(&actions, "Quarantine is empty."),
                }
            }
            QuarantineSubcommand::Retry => {
                let count = app.queue.retry_all().await?;
                println!("Returned {} action(s) to the queue.", count);
            }
            QuarantineSubcommand::Clear { yes } => {
                if !yes {
                    let count = app.queue.quarantined().await?.len();
                    return Err(format!(
                        "This discards {} action(s) permanently. Re-run with --yes to confirm.",
                        count
                    )
                    .into());
                }
                let count = app.queue.clear_all().await?;
                println!("Discarded {} action(s).", count);
            }
        }
        Ok(())
    }
}
