use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MealType {
    Breakfast,
    Lunch,
    Dinner,
    Snack,
}

impl MealType {
    pub const ALL: [MealType; 4] = [
        MealType::Breakfast,
        MealType::Lunch,
        MealType::Dinner,
        MealType::Snack,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MealType::Breakfast => "breakfast",
            MealType::Lunch => "lunch",
            MealType::Dinner => "dinner",
            MealType::Snack => "snack",
        }
    }
}

impl fmt::Display for MealType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MealType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        MealType::ALL
            .into_iter()
            .find(|t| t.as_str() == wanted)
            .ok_or_else(|| {
                format!(
                    "Invalid meal type '{}'. Valid options: breakfast, lunch, dinner, snack",
                    s
                )
            })
    }
}

/// A logged meal as it is sent to the remote service.
///
/// `photo_ref` points at an image captured on the device; recognising what is
/// on the plate happens elsewhere, the queue only carries the reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MealEntry {
    pub id: Uuid,
    pub date: NaiveDate,
    pub meal_type: MealType,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub calories: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo_ref: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl MealEntry {
    pub fn new(date: NaiveDate, meal_type: MealType, description: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            date,
            meal_type,
            description: description.into(),
            calories: None,
            notes: None,
            photo_ref: None,
            created_at: Utc::now(),
        }
    }

    pub fn with_calories(mut self, calories: u32) -> Self {
        self.calories = Some(calories);
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    pub fn with_photo_ref(mut self, photo_ref: impl Into<String>) -> Self {
        self.photo_ref = Some(photo_ref.into());
        self
    }
}

impl fmt::Display for MealEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}: {}", self.date, self.meal_type, self.description)?;
        if let Some(kcal) = self.calories {
            write!(f, " ({} kcal)", kcal)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_meal_type_parse_is_case_insensitive() {
        assert_eq!("Dinner".parse::<MealType>().unwrap(), MealType::Dinner);
        assert_eq!(" snack ".parse::<MealType>().unwrap(), MealType::Snack);
    }

    #[test]
    fn test_meal_type_parse_rejects_unknown() {
        let err = "brunch".parse::<MealType>().unwrap_err();
        assert!(err.contains("brunch"));
    }

    #[test]
    fn test_meal_entry_json_omits_empty_optionals() {
        let date = NaiveDate::from_ymd_opt(2025, 3, 2).unwrap();
        let entry = MealEntry::new(date, MealType::Lunch, "Lentil soup");

        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["meal_type"], "lunch");
        assert!(json.get("calories").is_none());
        assert!(json.get("photo_ref").is_none());
    }

    #[test]
    fn test_meal_entry_display() {
        let date = NaiveDate::from_ymd_opt(2025, 3, 2).unwrap();
        let entry = MealEntry::new(date, MealType::Breakfast, "Oats").with_calories(320);
        assert_eq!(entry.to_string(), "2025-03-02 breakfast: Oats (320 kcal)");
    }
}
