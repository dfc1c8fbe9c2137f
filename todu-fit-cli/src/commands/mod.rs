use clap::ValueEnum;

mod config_cmd;
mod meal;
mod quarantine;
mod queue_cmd;
mod reminder;
mod sync_cmd;

pub use config_cmd::ConfigCommand;
pub use meal::{MealCommand, MealSubcommand};
pub use quarantine::{QuarantineCommand, QuarantineSubcommand};
pub use queue_cmd::QueueCommand;
pub use reminder::{ReminderCommand, ReminderSubcommand};
pub use sync_cmd::SyncCommand;

#[derive(Clone, ValueEnum, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}
