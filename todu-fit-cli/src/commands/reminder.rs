use chrono::{NaiveTime, Weekday};
use clap::{Args, Subcommand};

use todu_fit_offline::{ActionDescriptor, ActionPayload, RecordRef, Reminder};

use super::meal::{parse_id, with_priority};
use super::queue_cmd::print_queued;
use crate::app::App;

#[derive(Args)]
pub struct ReminderCommand {
    #[command(subcommand)]
    pub command: ReminderSubcommand,
}

#[derive(Args, Debug)]
pub struct ReminderFields {
    /// Reminder title
    title: String,

    /// Time of day (HH:MM)
    #[arg(long)]
    time: String,

    /// Days to fire on, comma separated (e.g. mon,wed,fri); every day if omitted
    #[arg(long, value_delimiter = ',')]
    days: Vec<String>,

    /// Create the reminder switched off
    #[arg(long)]
    disabled: bool,

    /// Queue priority (lower runs first)
    #[arg(long)]
    priority: Option<i32>,
}

#[derive(Subcommand)]
pub enum ReminderSubcommand {
    /// Add a reminder
    Add {
        #[command(flatten)]
        fields: ReminderFields,
    },

    /// Replace a reminder
    Update {
        /// Reminder ID (UUID)
        id: String,

        #[command(flatten)]
        fields: ReminderFields,
    },

    /// Delete a reminder
    Delete {
        /// Reminder ID (UUID)
        id: String,
    },
}

impl ReminderCommand {
    pub async fn run(&self, app: &App) -> Result<(), Box<dyn std::error::Error>> {
        let descriptor = match &self.command {
            ReminderSubcommand::Add { fields } => with_priority(
                ActionDescriptor::new(ActionPayload::ReminderCreate(fields.to_reminder()?)),
                fields.priority,
            ),
            ReminderSubcommand::Update { id, fields } => {
                let reminder = Reminder {
                    id: parse_id(id)?,
                    ..fields.to_reminder()?
                };
                with_priority(
                    ActionDescriptor::new(ActionPayload::ReminderUpdate(reminder)),
                    fields.priority,
                )
            }
            ReminderSubcommand::Delete { id } => ActionDescriptor::new(
                ActionPayload::ReminderDelete(RecordRef::new(parse_id(id)?)),
            ),
        };

        let action = app.queue.enqueue(descriptor).await?;
        print_queued(&action, app.queue.is_online());
        Ok(())
    }
}

impl ReminderFields {
    fn to_reminder(&self) -> Result<Reminder, String> {
        let time = NaiveTime::parse_from_str(&self.time, "%H:%M")
            .map_err(|_| format!("Invalid time '{}'. Use HH:MM.", self.time))?;
        let weekdays = self
            .days
            .iter()
            .map(|d| {
                d.trim()
                    .parse::<Weekday>()
                    .map_err(|_| format!("Invalid day '{}'. Use mon, tue, ...", d))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let mut reminder = Reminder::new(&self.title, time).on(weekdays);
        if self.disabled {
            reminder = reminder.disabled();
        }
        Ok(reminder)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields(time: &str, days: &[&str]) -> ReminderFields {
        ReminderFields {
            title: "Log lunch".to_string(),
            time: time.to_string(),
            days: days.iter().map(|d| d.to_string()).collect(),
            disabled: false,
            priority: None,
        }
    }

    #[test]
    fn test_to_reminder() {
        let reminder = fields("12:30", &["mon", "Fri"]).to_reminder().unwrap();
        assert_eq!(reminder.time, NaiveTime::from_hms_opt(12, 30, 0).unwrap());
        assert_eq!(reminder.weekdays, vec![Weekday::Mon, Weekday::Fri]);
        assert!(reminder.enabled);
    }

    #[test]
    fn test_to_reminder_rejects_bad_input() {
        assert!(fields("12.30", &[]).to_reminder().is_err());
        assert!(fields("12:30", &["someday"]).to_reminder().is_err());
    }
}
