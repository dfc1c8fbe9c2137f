use chrono::{Local, NaiveDate};
use clap::{Args, Subcommand};
use uuid::Uuid;

use todu_fit_offline::{ActionDescriptor, ActionPayload, MealEntry, MealType, RecordRef};

use super::queue_cmd::print_queued;
use crate::app::App;

#[derive(Args)]
pub struct MealCommand {
    #[command(subcommand)]
    pub command: MealSubcommand,
}

/// Fields shared by `log` and `update`
#[derive(Args, Debug)]
pub struct MealFields {
    /// What was eaten
    description: String,

    /// Date (YYYY-MM-DD), defaults to today
    #[arg(long, short)]
    date: Option<String>,

    /// Meal type (breakfast, lunch, dinner, snack)
    #[arg(long = "type", short = 't', value_name = "TYPE")]
    meal_type: String,

    /// Estimated calories
    #[arg(long)]
    calories: Option<u32>,

    /// Add notes to the log
    #[arg(long)]
    notes: Option<String>,

    /// Reference to a photo of the meal
    #[arg(long)]
    photo: Option<String>,

    /// Queue priority (lower runs first)
    #[arg(long)]
    priority: Option<i32>,
}

#[derive(Subcommand)]
pub enum MealSubcommand {
    /// Log a meal
    Log {
        #[command(flatten)]
        fields: MealFields,
    },

    /// Replace a logged meal
    Update {
        /// Meal ID (UUID)
        id: String,

        #[command(flatten)]
        fields: MealFields,
    },

    /// Delete a logged meal
    Delete {
        /// Meal ID (UUID)
        id: String,
    },
}

impl MealCommand {
    pub async fn run(&self, app: &App) -> Result<(), Box<dyn std::error::Error>> {
        let descriptor = match &self.command {
            MealSubcommand::Log { fields } => with_priority(
                ActionDescriptor::new(ActionPayload::MealCreate(fields.to_entry()?)),
                fields.priority,
            ),
            MealSubcommand::Update { id, fields } => {
                let entry = MealEntry {
                    id: parse_id(id)?,
                    ..fields.to_entry()?
                };
                with_priority(
                    ActionDescriptor::new(ActionPayload::MealUpdate(entry)),
                    fields.priority,
                )
            }
            MealSubcommand::Delete { id } => {
                ActionDescriptor::new(ActionPayload::MealDelete(RecordRef::new(parse_id(id)?)))
            }
        };

        let action = app.queue.enqueue(descriptor).await?;
        print_queued(&action, app.queue.is_online());
        Ok(())
    }
}

impl MealFields {
    fn to_entry(&self) -> Result<MealEntry, Box<dyn std::error::Error>> {
        let date = match &self.date {
            Some(d) => NaiveDate::parse_from_str(d, "%Y-%m-%d")
                .map_err(|_| format!("Invalid date format '{}'. Use YYYY-MM-DD.", d))?,
            None => Local::now().date_naive(),
        };
        let meal_type: MealType = self.meal_type.parse().map_err(|e: String| e)?;

        let mut entry = MealEntry::new(date, meal_type, &self.description);
        if let Some(kcal) = self.calories {
            entry = entry.with_calories(kcal);
        }
        if let Some(n) = &self.notes {
            entry = entry.with_notes(n);
        }
        if let Some(photo) = &self.photo {
            entry = entry.with_photo_ref(photo);
        }
        Ok(entry)
    }
}

pub(super) fn with_priority(descriptor: ActionDescriptor, priority: Option<i32>) -> ActionDescriptor {
    match priority {
        Some(p) => descriptor.with_priority(p),
        None => descriptor,
    }
}

pub(super) fn parse_id(id: &str) -> Result<Uuid, String> {
    Uuid::parse_str(id).map_err(|_| format!("Invalid UUID: {}", id))
}
