//! The sync run: drains eligible actions in execution order.

use std::sync::atomic::Ordering;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{debug, error, info, warn};

use super::{OfflineQueue, QueueEvent, RunOutcome, SyncReport, Transition};
use crate::config::ClientErrorPolicy;
use crate::error::{ApiError, SyncError};
use crate::models::QueuedAction;

impl OfflineQueue {
    /// Runs the queue once, unless a run is already underway.
    ///
    /// Per-action failures are counted in the report and never abort the run.
    /// A storage failure does abort it; outcomes committed before the failure
    /// stay committed and the message is kept in the published last run.
    pub async fn sync_now(&self) -> Result<RunOutcome, SyncError> {
        if self
            .inner
            .in_progress
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("sync already in progress, request coalesced");
            return Ok(RunOutcome::Coalesced);
        }

        let run = RunGuard { queue: self };
        self.inner.status.send_modify(|status| status.in_progress = true);
        debug!("sync run started");

        let mut report = SyncReport::default();
        let result = self.run_once(&mut report).await;
        if let Err(e) = &result {
            error!(error = %e, "sync run aborted");
            report.errors.push(e.to_string());
        }

        self.inner.status.send_modify(|status| {
            status.in_progress = false;
            status.last_run = Some(report.clone());
        });
        drop(run);
        result?;

        if report.processed_count > 0 || report.failed_count > 0 || report.retried_count > 0 {
            info!(
                processed = report.processed_count,
                failed = report.failed_count,
                retried = report.retried_count,
                skipped = report.skipped_count,
                "sync run finished"
            );
        } else {
            debug!(skipped = report.skipped_count, "sync run found nothing to do");
        }

        if !report.stopped_early {
            self.request_follow_up().await;
        }

        Ok(RunOutcome::Completed(report))
    }

    async fn run_once(&self, report: &mut SyncReport) -> Result<(), SyncError> {
        let now = self.inner.clock.now();
        let snapshot = {
            let _guard = self.inner.write_lock.lock().await;
            self.inner.store.load_state().await?
        };

        for action in snapshot.ordered_pending() {
            if !action.is_eligible(now) {
                report.skipped_count += 1;
                continue;
            }

            if self.inner.stop_requested.load(Ordering::Acquire) {
                info!("stop requested, deferring the rest of the queue");
                report.stopped_early = true;
                break;
            }
            if !self.is_online() {
                info!("went offline during sync, deferring the rest of the queue");
                report.stopped_early = true;
                break;
            }

            match self.inner.executor.execute(&action).await {
                Ok(response) => {
                    self.commit(QueueEvent::Succeeded { id: action.id }).await?;
                    report.processed_count += 1;
                    debug!(
                        action_id = %action.id,
                        kind = action.kind(),
                        status = response.status,
                        "action synced"
                    );
                }
                Err(err) => self.record_failure(&action, err, report).await?,
            }
        }

        if report.processed_count > 0 {
            let at = self.inner.clock.now();
            self.inner.store.save_last_sync(at).await?;
            self.inner
                .status
                .send_modify(|status| status.last_sync_at = Some(at));
        }

        Ok(())
    }

    async fn record_failure(
        &self,
        action: &QueuedAction,
        err: ApiError,
        report: &mut SyncReport,
    ) -> Result<(), SyncError> {
        let reject = !err.is_transient()
            && self.inner.config.client_errors == ClientErrorPolicy::Quarantine;

        if reject {
            if let Transition::Quarantined { .. } =
                self.commit(QueueEvent::Rejected { id: action.id }).await?
            {
                report.failed_count += 1;
                let failure = SyncError::Rejected {
                    id: action.id,
                    kind: action.kind(),
                    reason: err,
                };
                warn!(action_id = %action.id, kind = action.kind(), error = %failure, "action rejected");
                report.errors.push(failure.to_string());
            }
            return Ok(());
        }

        let delay = self.inner.config.backoff.delay_for(action.retry_count + 1);
        let retry_at = retry_deadline(self.inner.clock.now(), delay);

        match self
            .commit(QueueEvent::Failed {
                id: action.id,
                retry_at,
            })
            .await?
        {
            Transition::Rescheduled { retry_count, .. } => {
                report.retried_count += 1;
                warn!(
                    action_id = %action.id,
                    kind = action.kind(),
                    retry_count,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "action failed, will retry"
                );
            }
            Transition::Quarantined { retry_count } => {
                report.failed_count += 1;
                let failure = SyncError::MaxRetriesExceeded {
                    id: action.id,
                    kind: action.kind(),
                    attempts: retry_count,
                    last_error: err,
                };
                error!(action_id = %action.id, kind = action.kind(), error = %failure, "action quarantined");
                report.errors.push(failure.to_string());
            }
            other => debug!(action_id = %action.id, transition = ?other, "failure not recorded"),
        }

        Ok(())
    }

    /// Requests another run if eligible work arrived while this one ran.
    async fn request_follow_up(&self) {
        if !self.is_online() {
            return;
        }
        match self.inner.store.load_state().await {
            Ok(state) if state.has_eligible(self.inner.clock.now()) => {
                debug!("eligible actions remain, requesting follow-up run");
                self.request_sync();
            }
            Ok(_) => {}
            Err(e) => warn!(error = %e, "failed to check for follow-up work"),
        }
    }
}

/// Releases the single-flight flag when a run ends, including by panic or
/// cancellation.
struct RunGuard<'a> {
    queue: &'a OfflineQueue,
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        let inner = &self.queue.inner;
        inner.stop_requested.store(false, Ordering::Release);
        inner.in_progress.store(false, Ordering::Release);
        inner.status.send_if_modified(|status| {
            let was_running = status.in_progress;
            status.in_progress = false;
            was_running
        });
    }
}

/// `now + delay`, saturating instead of overflowing. A deadline that cannot be
/// represented falls back to `now`, which keeps it no earlier than the attempt.
fn retry_deadline(now: DateTime<Utc>, delay: Duration) -> DateTime<Utc> {
    chrono::Duration::from_std(delay)
        .ok()
        .and_then(|delay| now.checked_add_signed(delay))
        .unwrap_or(now)
}
