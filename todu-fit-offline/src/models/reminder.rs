use chrono::{NaiveTime, Weekday};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A recurring reminder (log a meal, drink water, ...).
///
/// An empty `weekdays` list means every day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reminder {
    pub id: Uuid,
    pub title: String,
    pub time: NaiveTime,
    #[serde(default)]
    pub weekdays: Vec<Weekday>,
    pub enabled: bool,
}

impl Reminder {
    pub fn new(title: impl Into<String>, time: NaiveTime) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: title.into(),
            time,
            weekdays: Vec::new(),
            enabled: true,
        }
    }

    pub fn on(mut self, weekdays: Vec<Weekday>) -> Self {
        self.weekdays = weekdays;
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }
}
