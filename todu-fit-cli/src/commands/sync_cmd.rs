//! Sync CLI commands for replaying the queue against the server.

use clap::{Args, Subcommand};

use todu_fit_offline::{RunOutcome, SyncError, SyncReport};

use super::queue_cmd::print_status;
use crate::app::App;
use crate::config::Config;

/// Sync with remote server
#[derive(Debug, Args)]
pub struct SyncCommand {
    #[command(subcommand)]
    command: Option<SyncSubcommand>,
}

#[derive(Debug, Subcommand)]
enum SyncSubcommand {
    /// Show sync configuration and server status
    Status,

    /// Keep syncing in the background until interrupted (Ctrl-C)
    Watch,
}

impl SyncCommand {
    pub async fn run(&self, app: &App, config: &Config) -> Result<(), SyncCommandError> {
        match &self.command {
            None => self.sync(app, config).await,
            Some(SyncSubcommand::Status) => self.status(app, config).await,
            Some(SyncSubcommand::Watch) => self.watch(app, config).await,
        }
    }

    async fn sync(&self, app: &App, config: &Config) -> Result<(), SyncCommandError> {
        if !config.sync.is_configured() {
            return Err(SyncCommandError::NotConfigured);
        }
        if !app.queue.is_online() {
            println!("Server unreachable, {} action(s) stay queued.", app.queue.status().pending);
            return Ok(());
        }

        println!("Syncing with server...");
        println!();

        match app.queue.sync_now().await? {
            RunOutcome::Completed(report) => print_report(&report),
            RunOutcome::Coalesced => println!("A sync is already running."),
        }
        Ok(())
    }

    async fn status(&self, app: &App, config: &Config) -> Result<(), SyncCommandError> {
        println!("Sync Configuration");
        println!("==================");
        println!();

        let Some(server_url) = &config.sync.server_url else {
            println!("Status: Not configured");
            println!();
            println!("To enable sync, add to your config file:");
            println!();
            println!("  sync:");
            println!("    server_url: \"http://localhost:8080\"");
            println!();
            println!("Or set environment variable:");
            println!("  FIT_SYNC_URL");
            return Ok(());
        };

        println!("Server:    {}", server_url);
        if let Some(health_url) = config.sync.health_url() {
            println!("Health:    {}", health_url);
        }
        println!(
            "Auto-sync: {}",
            if config.sync.auto_sync {
                "enabled"
            } else {
                "disabled"
            }
        );
        println!();

        let status = app.queue.refresh_status().await?;
        print_status(&status, app.queue.is_online());
        Ok(())
    }

    async fn watch(&self, app: &App, config: &Config) -> Result<(), SyncCommandError> {
        if !config.sync.is_configured() {
            return Err(SyncCommandError::NotConfigured);
        }

        let probe_task = app.probe.clone().map(|probe| probe.spawn());
        let handles = app.queue.start();
        println!("Watching queue, press Ctrl-C to stop.");

        let mut updates = app.queue.subscribe();
        let result = loop {
            tokio::select! {
                signal = tokio::signal::ctrl_c() => break signal,
                changed = updates.changed() => {
                    if changed.is_err() {
                        break Ok(());
                    }
                    let status = updates.borrow_and_update().clone();
                    if let (false, Some(report)) = (status.in_progress, &status.last_run) {
                        if report.processed_count > 0 || report.failed_count > 0 {
                            println!(
                                "synced {}, failed {}, pending {}, quarantined {}",
                                report.processed_count,
                                report.failed_count,
                                status.pending,
                                status.quarantined
                            );
                        }
                    }
                }
            }
        };

        handles.shutdown().await;
        if let Some(task) = probe_task {
            task.abort();
        }
        result.map_err(|e| SyncCommandError::RuntimeError(e.to_string()))
    }
}

fn print_report(report: &SyncReport) {
    println!("  ✓ {} synced", report.processed_count);
    if report.retried_count > 0 {
        println!("  ↻ {} will retry", report.retried_count);
    }
    if report.skipped_count > 0 {
        println!("  … {} waiting for backoff", report.skipped_count);
    }
    if report.failed_count > 0 {
        println!("  ✗ {} quarantined", report.failed_count);
    }
    for error in &report.errors {
        println!("    - {}", error);
    }

    println!();
    if report.stopped_early {
        println!("Sync interrupted, remaining actions stay queued.");
    } else if report.processed_count == 0 && report.failed_count == 0 {
        println!("Already up to date.");
    } else {
        println!("Sync complete.");
    }
}

/// Errors from sync commands
#[derive(Debug)]
pub enum SyncCommandError {
    NotConfigured,
    SyncError(SyncError),
    RuntimeError(String),
}

impl std::fmt::Display for SyncCommandError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SyncCommandError::NotConfigured => {
                write!(f, "Sync not configured. Run 'fit sync status' for setup help.")
            }
            SyncCommandError::SyncError(e) => write!(f, "{}", e),
            SyncCommandError::RuntimeError(e) => write!(f, "Runtime error: {}", e),
        }
    }
}

impl std::error::Error for SyncCommandError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SyncCommandError::SyncError(e) => Some(e),
            SyncCommandError::NotConfigured | SyncCommandError::RuntimeError(_) => None,
        }
    }
}

impl From<SyncError> for SyncCommandError {
    fn from(e: SyncError) -> Self {
        SyncCommandError::SyncError(e)
    }
}

impl From<todu_fit_offline::StorageError> for SyncCommandError {
    fn from(e: todu_fit_offline::StorageError) -> Self {
        SyncCommandError::SyncError(SyncError::Storage(e))
    }
}
