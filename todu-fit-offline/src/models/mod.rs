mod action;
mod meal;
mod payload;
mod reminder;

pub use action::{
    ActionDescriptor, HttpMethod, QueuedAction, DEFAULT_MAX_RETRIES, DEFAULT_PRIORITY,
};
pub use meal::{MealEntry, MealType};
pub use payload::{ActionPayload, RecordRef};
pub use reminder::Reminder;
