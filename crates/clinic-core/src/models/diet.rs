//! Diet plan and meal ledger models.
//!
//! Weekly templates are keyed by diagnosis. Day indexing is ISO throughout:
//! Monday=1 .. Sunday=7, with an explicit conversion at the chrono boundary.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

/// Meal slot within a day. One logical slot per meal type per day.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum MealType {
    Breakfast,
    Lunch,
    Dinner,
    Snack,
}

impl MealType {
    /// Canonical lowercase name, as stored in the database.
    pub fn as_str(&self) -> &'static str {
        match self {
            MealType::Breakfast => "breakfast",
            MealType::Lunch => "lunch",
            MealType::Dinner => "dinner",
            MealType::Snack => "snack",
        }
    }

    /// Parse the canonical name.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "breakfast" => Some(MealType::Breakfast),
            "lunch" => Some(MealType::Lunch),
            "dinner" => Some(MealType::Dinner),
            "snack" => Some(MealType::Snack),
            _ => None,
        }
    }
}

/// ISO weekday, Monday=1 .. Sunday=7.
///
/// The canonical week enumeration for diet templates and compliance. Native
/// calendar APIs that number days differently must convert through here.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum IsoWeekday {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl IsoWeekday {
    /// ISO number, Monday=1 .. Sunday=7.
    pub fn number(&self) -> u8 {
        match self {
            IsoWeekday::Monday => 1,
            IsoWeekday::Tuesday => 2,
            IsoWeekday::Wednesday => 3,
            IsoWeekday::Thursday => 4,
            IsoWeekday::Friday => 5,
            IsoWeekday::Saturday => 6,
            IsoWeekday::Sunday => 7,
        }
    }

    /// Conversion boundary for chrono's weekday type.
    pub fn from_chrono(weekday: chrono::Weekday) -> Self {
        match weekday {
            chrono::Weekday::Mon => IsoWeekday::Monday,
            chrono::Weekday::Tue => IsoWeekday::Tuesday,
            chrono::Weekday::Wed => IsoWeekday::Wednesday,
            chrono::Weekday::Thu => IsoWeekday::Thursday,
            chrono::Weekday::Fri => IsoWeekday::Friday,
            chrono::Weekday::Sat => IsoWeekday::Saturday,
            chrono::Weekday::Sun => IsoWeekday::Sunday,
        }
    }

    /// Weekday of a calendar date.
    pub fn from_date(date: NaiveDate) -> Self {
        Self::from_chrono(date.weekday())
    }
}

/// One meal inside a day plan.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlannedMeal {
    pub meal_type: MealType,
    pub description: String,
    pub calories: Option<u32>,
}

/// Meals planned for one weekday.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DayPlan {
    pub weekday: IsoWeekday,
    pub meals: Vec<PlannedMeal>,
}

/// A weekly diet template keyed by diagnosis.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DietTemplate {
    /// Normalized diagnosis key (lowercase, trimmed)
    pub diagnosis_key: String,
    pub days: Vec<DayPlan>,
}

impl DietTemplate {
    /// Create a template from a diagnosis label and day plans.
    pub fn new(diagnosis_key: &str, days: Vec<DayPlan>) -> Self {
        Self {
            diagnosis_key: normalize_diagnosis(diagnosis_key),
            days,
        }
    }

    /// Plan for a given weekday, if the template schedules that day.
    pub fn plan_for(&self, weekday: IsoWeekday) -> Option<&DayPlan> {
        self.days.iter().find(|d| d.weekday == weekday)
    }
}

/// Normalize a free-text diagnosis into template-key form.
pub fn normalize_diagnosis(diagnosis: &str) -> String {
    diagnosis.trim().to_lowercase()
}

/// One row of the meal ledger.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DietEntry {
    pub id: String,
    pub patient_id: String,
    /// Calendar date, `YYYY-MM-DD`
    pub date: String,
    pub meal_type: MealType,
    pub description: Option<String>,
    pub calories: Option<u32>,
    /// Patient self-report
    pub completed: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl DietEntry {
    /// Create an unreported ledger row.
    pub fn new(patient_id: String, date: NaiveDate, meal: &PlannedMeal) -> Self {
        let now = chrono::Utc::now().to_rfc3339();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            patient_id,
            date: date.format("%Y-%m-%d").to_string(),
            meal_type: meal.meal_type,
            description: Some(meal.description.clone()),
            calories: meal.calories,
            completed: false,
            created_at: now.clone(),
            updated_at: now,
        }
    }
}
