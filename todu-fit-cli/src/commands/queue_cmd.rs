use clap::{Args, Subcommand};

use todu_fit_offline::{QueueStatus, QueuedAction};

use super::OutputFormat;
use crate::app::App;

#[derive(Args)]
pub struct QueueCommand {
    #[command(subcommand)]
    pub command: QueueSubcommand,
}

#[derive(Subcommand)]
pub enum QueueSubcommand {
    /// Show pending and quarantined counts
    Status {
        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// List pending actions in the order they will run
    List {
        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },
}

impl QueueCommand {
    pub async fn run(&self, app: &App) -> Result<(), Box<dyn std::error::Error>> {
        match &self.command {
            QueueSubcommand::Status { format } => {
                let status = app.queue.refresh_status().await?;
                match format {
                    OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&status)?),
                    OutputFormat::Text => print_status(&status, app.queue.is_online()),
                }
            }
            QueueSubcommand::List { format } => {
                let pending = app.queue.pending().await?;
                match format {
                    OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&pending)?),
                    OutputFormat::Text => print_actions(&pending, "No pending actions."),
                }
            }
        }
        Ok(())
    }
}

pub fn print_status(status: &QueueStatus, online: bool) {
    println!("Connection:  {}", if online { "online" } else { "offline" });
    println!("Pending:     {}", status.pending);
    println!("Quarantined: {}", status.quarantined);
    match status.last_sync_at {
        Some(at) => println!("Last sync:   {}", at.format("%Y-%m-%d %H:%M:%S UTC")),
        None => println!("Last sync:   never"),
    }
}

pub fn print_queued(action: &QueuedAction, online: bool) {
    println!("Queued {} {}", action.kind(), action.payload.record_id());
    println!("  Action ID: {}", action.id);
    println!("  Priority:  {}", action.priority);
    if !online {
        println!();
        println!("Offline: the action will be sent when the connection returns.");
    }
}

pub fn print_actions(actions: &[QueuedAction], empty: &str) {
    if actions.is_empty() {
        println!("{}", empty);
        return;
    }

    println!(
        "{:<36}  {:<16}  {:>3}  {:>7}  {}",
        "ID", "KIND", "PRI", "RETRIES", "ROUTE"
    );
    println!("{}", "-".repeat(90));
    for action in actions {
        println!(
            "{:<36}  {:<16}  {:>3}  {:>3}/{:<3}  {} {}",
            action.id,
            action.kind(),
            action.priority,
            action.retry_count,
            action.max_retries,
            action.method,
            action.endpoint
        );
        if let Some(at) = action.scheduled_for {
            println!("{:<36}  next attempt after {}", "", at.format("%Y-%m-%d %H:%M:%S UTC"));
        }
    }
    println!("\nTotal: {} action(s)", actions.len());
}
