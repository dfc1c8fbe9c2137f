//! Typed action payloads.
//!
//! Each variant is one action `kind` with a fixed payload shape. Persisted
//! actions carry the kind and payload side by side:
//!
//! ```json
//! { "kind": "meal.create", "payload": { "id": "...", "date": "2025-03-02", ... } }
//! ```

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::action::HttpMethod;
use super::meal::MealEntry;
use super::reminder::Reminder;

/// Identifies a remote record to delete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordRef {
    pub id: Uuid,
}

impl RecordRef {
    pub fn new(id: Uuid) -> Self {
        Self { id }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "payload")]
pub enum ActionPayload {
    #[serde(rename = "meal.create")]
    MealCreate(MealEntry),
    #[serde(rename = "meal.update")]
    MealUpdate(MealEntry),
    #[serde(rename = "meal.delete")]
    MealDelete(RecordRef),
    #[serde(rename = "reminder.create")]
    ReminderCreate(Reminder),
    #[serde(rename = "reminder.update")]
    ReminderUpdate(Reminder),
    #[serde(rename = "reminder.delete")]
    ReminderDelete(RecordRef),
}

impl ActionPayload {
    /// The wire name of this action kind, e.g. `meal.create`.
    pub fn kind(&self) -> &'static str {
        match self {
            ActionPayload::MealCreate(_) => "meal.create",
            ActionPayload::MealUpdate(_) => "meal.update",
            ActionPayload::MealDelete(_) => "meal.delete",
            ActionPayload::ReminderCreate(_) => "reminder.create",
            ActionPayload::ReminderUpdate(_) => "reminder.update",
            ActionPayload::ReminderDelete(_) => "reminder.delete",
        }
    }

    /// Id of the domain record this action mutates.
    pub fn record_id(&self) -> Uuid {
        match self {
            ActionPayload::MealCreate(meal) | ActionPayload::MealUpdate(meal) => meal.id,
            ActionPayload::ReminderCreate(reminder) | ActionPayload::ReminderUpdate(reminder) => {
                reminder.id
            }
            ActionPayload::MealDelete(r) | ActionPayload::ReminderDelete(r) => r.id,
        }
    }

    /// REST route used when the descriptor does not override it.
    pub fn default_route(&self) -> (String, HttpMethod) {
        let id = self.record_id();
        match self {
            ActionPayload::MealCreate(_) => ("/meals".to_string(), HttpMethod::Post),
            ActionPayload::MealUpdate(_) => (format!("/meals/{}", id), HttpMethod::Put),
            ActionPayload::MealDelete(_) => (format!("/meals/{}", id), HttpMethod::Delete),
            ActionPayload::ReminderCreate(_) => ("/reminders".to_string(), HttpMethod::Post),
            ActionPayload::ReminderUpdate(_) => (format!("/reminders/{}", id), HttpMethod::Put),
            ActionPayload::ReminderDelete(_) => {
                (format!("/reminders/{}", id), HttpMethod::Delete)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MealType;
    use chrono::NaiveDate;

    fn meal() -> MealEntry {
        MealEntry::new(
            NaiveDate::from_ymd_opt(2025, 1, 15).unwrap(),
            MealType::Dinner,
            "Chili",
        )
    }

    #[test]
    fn test_adjacent_tagging() {
        let payload = ActionPayload::MealCreate(meal());
        let json = serde_json::to_value(&payload).unwrap();

        assert_eq!(json["kind"], "meal.create");
        assert_eq!(json["payload"]["description"], "Chili");
    }

    #[test]
    fn test_unknown_kind_is_rejected() {
        let json = r#"{"kind":"meal.explode","payload":{"id":"00000000-0000-0000-0000-000000000000"}}"#;
        assert!(serde_json::from_str::<ActionPayload>(json).is_err());
    }

    #[test]
    fn test_default_routes() {
        let entry = meal();
        let id = entry.id;

        assert_eq!(
            ActionPayload::MealCreate(entry.clone()).default_route(),
            ("/meals".to_string(), HttpMethod::Post)
        );
        assert_eq!(
            ActionPayload::MealUpdate(entry).default_route(),
            (format!("/meals/{}", id), HttpMethod::Put)
        );
        assert_eq!(
            ActionPayload::ReminderDelete(RecordRef::new(id)).default_route(),
            (format!("/reminders/{}", id), HttpMethod::Delete)
        );
    }

    #[test]
    fn test_kind_matches_serde_tag() {
        let payload = ActionPayload::MealDelete(RecordRef::new(Uuid::new_v4()));
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["kind"], payload.kind());
    }
}
