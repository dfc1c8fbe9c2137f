//! Pure state transitions over the pending queue and the quarantine.
//!
//! Every mutation of the two collections goes through [`QueueState::apply`].
//! Callers load the current state, apply one event and persist the result
//! while holding the queue's write lock, so no update is lost between the
//! load and the save.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::QueuedAction;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueueState {
    pub pending: Vec<QueuedAction>,
    pub quarantined: Vec<QueuedAction>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum QueueEvent {
    Enqueued(QueuedAction),
    /// The remote call succeeded.
    Succeeded { id: Uuid },
    /// A retryable failure. `retry_at` is used only if budget remains.
    Failed { id: Uuid, retry_at: DateTime<Utc> },
    /// A permanent failure: quarantine without touching the retry count.
    Rejected { id: Uuid },
    /// Move every quarantined action back to pending with a fresh budget.
    QuarantineRevived,
    QuarantineCleared,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    Appended,
    /// The id already exists in one of the collections; nothing changed.
    DuplicateId,
    Completed,
    Rescheduled {
        retry_count: u32,
        scheduled_for: DateTime<Utc>,
    },
    Quarantined {
        retry_count: u32,
    },
    Revived(usize),
    Cleared(usize),
    /// The event named an action that is no longer pending.
    Missing,
}

impl QueueState {
    pub fn new(pending: Vec<QueuedAction>, quarantined: Vec<QueuedAction>) -> Self {
        Self {
            pending,
            quarantined,
        }
    }

    pub fn apply(&mut self, event: QueueEvent) -> Transition {
        match event {
            QueueEvent::Enqueued(action) => {
                if self.contains(action.id) {
                    return Transition::DuplicateId;
                }
                self.pending.push(action);
                Transition::Appended
            }
            QueueEvent::Succeeded { id } => match self.take_pending(id) {
                Some(_) => Transition::Completed,
                None => Transition::Missing,
            },
            QueueEvent::Failed { id, retry_at } => {
                let Some(index) = self.pending_index(id) else {
                    return Transition::Missing;
                };

                let action = &mut self.pending[index];
                // Records written with a zero budget still get one attempt.
                action.max_retries = action.max_retries.max(1);
                action.retry_count += 1;

                if action.retry_count >= action.max_retries {
                    let retry_count = action.retry_count;
                    let mut action = self.pending.remove(index);
                    action.scheduled_for = None;
                    self.quarantined.push(action);
                    Transition::Quarantined { retry_count }
                } else {
                    action.scheduled_for = Some(retry_at);
                    Transition::Rescheduled {
                        retry_count: action.retry_count,
                        scheduled_for: retry_at,
                    }
                }
            }
            QueueEvent::Rejected { id } => match self.take_pending(id) {
                Some(action) => {
                    let retry_count = action.retry_count;
                    self.quarantined.push(action);
                    Transition::Quarantined { retry_count }
                }
                None => Transition::Missing,
            },
            QueueEvent::QuarantineRevived => {
                let revived: Vec<QueuedAction> = self
                    .quarantined
                    .drain(..)
                    .map(QueuedAction::revived)
                    .collect();
                let count = revived.len();
                self.pending.extend(revived);
                Transition::Revived(count)
            }
            QueueEvent::QuarantineCleared => {
                let count = self.quarantined.len();
                self.quarantined.clear();
                Transition::Cleared(count)
            }
        }
    }

    /// Pending actions in execution order.
    pub fn ordered_pending(&self) -> Vec<QueuedAction> {
        let mut ordered = self.pending.clone();
        ordered.sort_by(QueuedAction::execution_order);
        ordered
    }

    pub fn has_eligible(&self, now: DateTime<Utc>) -> bool {
        self.pending.iter().any(|a| a.is_eligible(now))
    }

    /// The earliest backoff deadline still in the future.
    pub fn next_due(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.pending
            .iter()
            .filter_map(|a| a.scheduled_for)
            .filter(|at| *at > now)
            .min()
    }

    /// Drops duplicate ids, keeping quarantined copies over pending ones and
    /// the first occurrence otherwise. Returns how many entries were dropped.
    pub fn normalize(&mut self) -> usize {
        let before = self.pending.len() + self.quarantined.len();

        let mut seen = HashSet::new();
        self.quarantined.retain(|a| seen.insert(a.id));
        self.pending.retain(|a| seen.insert(a.id));

        before - self.pending.len() - self.quarantined.len()
    }

    fn contains(&self, id: Uuid) -> bool {
        self.pending.iter().any(|a| a.id == id) || self.quarantined.iter().any(|a| a.id == id)
    }

    fn pending_index(&self, id: Uuid) -> Option<usize> {
        self.pending.iter().position(|a| a.id == id)
    }

    fn take_pending(&mut self, id: Uuid) -> Option<QueuedAction> {
        self.pending_index(id).map(|i| self.pending.remove(i))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ActionDescriptor, ActionPayload, RecordRef};
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
    }

    fn action(max_retries: u32) -> QueuedAction {
        let payload = ActionPayload::MealDelete(RecordRef::new(Uuid::new_v4()));
        QueuedAction::from_descriptor(
            ActionDescriptor::new(payload).with_max_retries(max_retries),
            t0(),
            5,
            3,
        )
    }

    #[test]
    fn test_enqueue_rejects_duplicate_ids() {
        let a = action(3);
        let mut state = QueueState::new(vec![], vec![a.clone()]);

        assert_eq!(
            state.apply(QueueEvent::Enqueued(a.clone())),
            Transition::DuplicateId
        );
        assert!(state.pending.is_empty());
    }

    #[test]
    fn test_success_removes_action() {
        let a = action(3);
        let mut state = QueueState::new(vec![a.clone()], vec![]);

        assert_eq!(
            state.apply(QueueEvent::Succeeded { id: a.id }),
            Transition::Completed
        );
        assert!(state.pending.is_empty());
        assert_eq!(
            state.apply(QueueEvent::Succeeded { id: a.id }),
            Transition::Missing
        );
    }

    #[test]
    fn test_failure_increments_by_one_and_schedules() {
        let a = action(3);
        let mut state = QueueState::new(vec![a.clone()], vec![]);
        let retry_at = t0() + Duration::seconds(2);

        let transition = state.apply(QueueEvent::Failed { id: a.id, retry_at });

        assert_eq!(
            transition,
            Transition::Rescheduled {
                retry_count: 1,
                scheduled_for: retry_at
            }
        );
        assert_eq!(state.pending[0].retry_count, 1);
        assert_eq!(state.pending[0].scheduled_for, Some(retry_at));
    }

    #[test]
    fn test_quarantine_exactly_when_budget_reached() {
        let a = action(2);
        let mut state = QueueState::new(vec![a.clone()], vec![]);
        let retry_at = t0() + Duration::seconds(2);

        assert!(matches!(
            state.apply(QueueEvent::Failed { id: a.id, retry_at }),
            Transition::Rescheduled { retry_count: 1, .. }
        ));
        assert!(state.quarantined.is_empty());

        assert_eq!(
            state.apply(QueueEvent::Failed { id: a.id, retry_at }),
            Transition::Quarantined { retry_count: 2 }
        );
        assert!(state.pending.is_empty());
        assert_eq!(state.quarantined.len(), 1);
        assert_eq!(state.quarantined[0].retry_count, 2);
    }

    #[test]
    fn test_stored_zero_budget_quarantines_within_bounds() {
        let mut a = action(3);
        a.max_retries = 0;
        let mut state = QueueState::new(vec![a.clone()], vec![]);

        assert_eq!(
            state.apply(QueueEvent::Failed {
                id: a.id,
                retry_at: t0()
            }),
            Transition::Quarantined { retry_count: 1 }
        );
        let quarantined = &state.quarantined[0];
        assert!(quarantined.retry_count <= quarantined.max_retries);
    }

    #[test]
    fn test_rejection_keeps_retry_count() {
        let mut a = action(3);
        a.retry_count = 1;
        let mut state = QueueState::new(vec![a.clone()], vec![]);

        assert_eq!(
            state.apply(QueueEvent::Rejected { id: a.id }),
            Transition::Quarantined { retry_count: 1 }
        );
        assert_eq!(state.quarantined[0].retry_count, 1);
    }

    #[test]
    fn test_revive_resets_and_moves_everything() {
        let mut a = action(2);
        a.retry_count = 2;
        a.scheduled_for = Some(t0());
        let b = action(3);
        let mut state = QueueState::new(vec![b.clone()], vec![a.clone()]);

        assert_eq!(state.apply(QueueEvent::QuarantineRevived), Transition::Revived(1));
        assert!(state.quarantined.is_empty());
        assert_eq!(state.pending.len(), 2);

        let revived = state.pending.iter().find(|x| x.id == a.id).unwrap();
        assert_eq!(revived, &a.clone().revived());
    }

    #[test]
    fn test_clear() {
        let mut state = QueueState::new(vec![action(3)], vec![action(3), action(3)]);
        assert_eq!(state.apply(QueueEvent::QuarantineCleared), Transition::Cleared(2));
        assert!(state.quarantined.is_empty());
        assert_eq!(state.pending.len(), 1);
    }

    #[test]
    fn test_next_due_and_eligibility() {
        let mut a = action(3);
        let mut b = action(3);
        a.scheduled_for = Some(t0() + Duration::seconds(30));
        b.scheduled_for = Some(t0() + Duration::seconds(10));
        let state = QueueState::new(vec![a, b], vec![]);

        assert!(!state.has_eligible(t0()));
        assert_eq!(state.next_due(t0()), Some(t0() + Duration::seconds(10)));
        assert!(state.has_eligible(t0() + Duration::seconds(10)));
        assert_eq!(
            state.next_due(t0() + Duration::seconds(10)),
            Some(t0() + Duration::seconds(30))
        );
    }

    #[test]
    fn test_normalize_dedups() {
        let a = action(3);
        let b = action(3);
        let mut state = QueueState::new(vec![a.clone(), b.clone(), b.clone()], vec![a.clone()]);

        assert_eq!(state.normalize(), 2);
        assert_eq!(state.pending, vec![b]);
        assert_eq!(state.quarantined, vec![a]);
    }
}
