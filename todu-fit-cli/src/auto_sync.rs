//! Auto-sync after write commands.

use todu_fit_offline::RunOutcome;
use tracing::debug;

use crate::app::App;
use crate::config::Config;

/// Runs the queue once if `auto_sync` is enabled and the server answered the
/// startup probe.
///
/// Failures are reported but never fail the command; the actions stay queued
/// for the next run.
pub async fn try_auto_sync(app: &App, config: &Config) {
    if !config.sync.auto_sync || !config.sync.is_configured() {
        return;
    }

    if !app.queue.is_online() {
        eprintln!("Auto-sync: server unreachable, skipping");
        return;
    }

    match app.queue.sync_now().await {
        Ok(RunOutcome::Completed(report)) => {
            debug!(processed = report.processed_count, "auto-sync finished");
            for error in &report.errors {
                eprintln!("Auto-sync: {}", error);
            }
        }
        Ok(RunOutcome::Coalesced) => {}
        Err(e) => eprintln!("Auto-sync: {}", e),
    }
}
