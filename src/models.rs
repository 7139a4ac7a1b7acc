//! Core models for the axent library
//!
//! This module contains the domain records (users, subjects, topics and the
//! derived adaptive plan) along with the small coercion helpers used when
//! those records are built from loosely-shaped AI output.

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

/// Prefix for generated subject ids
pub const SUBJECT_ID_PREFIX: &str = "sub";
/// Prefix for generated topic ids
pub const TOPIC_ID_PREFIX: &str = "top";
/// Prefix for generated user ids
pub const USER_ID_PREFIX: &str = "user";

/// Generates a collision-resistant identifier of the form `<prefix>-<uuid>`
pub fn new_id(prefix: &str) -> String {
    format!("{}-{}", prefix, uuid::Uuid::new_v4().simple())
}

/// Time of day a student prefers for demanding work
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum EnergyPreference {
    #[default]
    Morning,
    Night,
}

impl EnergyPreference {
    /// Human readable label used in prompts and reports
    pub fn label(&self) -> &'static str {
        match self {
            EnergyPreference::Morning => "Morning",
            EnergyPreference::Night => "Night",
        }
    }
}

impl FromStr for EnergyPreference {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "morning" => Ok(EnergyPreference::Morning),
            "night" => Ok(EnergyPreference::Night),
            other => Err(format!("unknown energy preference '{}'", other)),
        }
    }
}

/// A student using the planner
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub email: String,
    pub branch: String,
    pub year: u8,
    pub daily_study_hours: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub study_hours_weekend: Option<f64>,
    #[serde(default)]
    pub energy_preference: EnergyPreference,
}

impl User {
    /// Creates a freshly onboarded user with the default study preferences
    pub fn onboard(name: &str, branch: &str, year: u8) -> Self {
        Self {
            id: new_id(USER_ID_PREFIX),
            name: name.to_string(),
            email: placeholder_email(name),
            branch: branch.to_string(),
            year,
            daily_study_hours: 4.0,
            study_hours_weekend: None,
            energy_preference: EnergyPreference::Morning,
        }
    }

    /// Weekend hours, falling back to two hours more than a weekday
    pub fn weekend_hours(&self) -> f64 {
        self.study_hours_weekend
            .unwrap_or(self.daily_study_hours + 2.0)
    }

    /// Applies an explicit profile edit
    pub fn apply(&mut self, update: ProfileUpdate) {
        if let Some(name) = update.name {
            self.name = name;
        }
        if let Some(branch) = update.branch {
            self.branch = branch;
        }
        if let Some(year) = update.year {
            self.year = year;
        }
        if let Some(hours) = update.daily_study_hours {
            self.daily_study_hours = hours;
        }
        if let Some(hours) = update.study_hours_weekend {
            self.study_hours_weekend = Some(hours);
        }
        if let Some(pref) = update.energy_preference {
            self.energy_preference = pref;
        }
    }
}

/// Builds the local placeholder address used for a user without an account email
fn placeholder_email(name: &str) -> String {
    let local = name
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(".");
    format!("{}@student.axent", local)
}

/// Fields a user may change on their profile
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub branch: Option<String>,
    pub year: Option<u8>,
    pub daily_study_hours: Option<f64>,
    pub study_hours_weekend: Option<f64>,
    pub energy_preference: Option<EnergyPreference>,
}

impl ProfileUpdate {
    /// Checks the year range and that study hours are positive
    pub fn validate(&self) -> Result<(), String> {
        if let Some(year) = self.year {
            if !(1..=4).contains(&year) {
                return Err("Year must be between 1 and 4".to_string());
            }
        }
        let hours = [
            ("dailyStudyHours", self.daily_study_hours, 24.0),
            ("studyHoursWeekend", self.study_hours_weekend, 24.0),
        ];
        for (field, value, max) in hours {
            if let Some(value) = value {
                if !(value.is_finite() && value > 0.0 && value <= max) {
                    return Err(format!("{} must be between 0 and {} hours", field, max));
                }
            }
        }
        Ok(())
    }
}

/// Difficulty tier of a subject
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Difficulty {
    Beginner,
    #[default]
    Intermediate,
    Advanced,
}

impl Difficulty {
    /// Loosely matches free text such as "advanced" or "Beginner level"
    pub fn coerce(raw: &str) -> Option<Self> {
        let lower = raw.to_ascii_lowercase();
        if lower.contains("beginner") || lower.contains("easy") {
            Some(Difficulty::Beginner)
        } else if lower.contains("advanced") || lower.contains("hard") {
            Some(Difficulty::Advanced)
        } else if lower.contains("intermediate") || lower.contains("medium") {
            Some(Difficulty::Intermediate)
        } else {
            None
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Difficulty::Beginner => "Beginner",
            Difficulty::Intermediate => "Intermediate",
            Difficulty::Advanced => "Advanced",
        };
        f.write_str(s)
    }
}

/// A course the student is preparing for
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subject {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub difficulty: Difficulty,
    pub priority: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credits: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence_level: Option<u8>,
    pub exam_date: NaiveDate,
    pub color: String,
}

/// Progress state of a topic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum TopicStatus {
    #[default]
    Todo,
    InProgress,
    Completed,
}

impl TopicStatus {
    /// Accepts the spellings the assistant and the AI tend to produce
    pub fn coerce(raw: &str) -> Option<Self> {
        let compact: String = raw
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_ascii_lowercase();
        match compact.as_str() {
            "todo" | "notstarted" | "pending" => Some(TopicStatus::Todo),
            "inprogress" | "started" => Some(TopicStatus::InProgress),
            "completed" | "complete" | "done" => Some(TopicStatus::Completed),
            _ => None,
        }
    }
}

impl FromStr for TopicStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TopicStatus::coerce(s).ok_or_else(|| format!("unknown topic status '{}'", s))
    }
}

impl fmt::Display for TopicStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TopicStatus::Todo => "Todo",
            TopicStatus::InProgress => "InProgress",
            TopicStatus::Completed => "Completed",
        };
        f.write_str(s)
    }
}

/// A unit of study inside a subject
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Topic {
    pub id: String,
    pub subject_id: String,
    pub title: String,
    pub estimated_hours: f64,
    pub weightage: f64,
    pub weakness_score: f64,
    pub status: TopicStatus,
}

impl Topic {
    /// Whether the planner should treat this topic as a weak spot
    pub fn is_weak(&self) -> bool {
        self.weakness_score > 6.0 || self.status == TopicStatus::Todo
    }
}

/// A subject together with its topics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubjectRoadmap {
    pub subject: Subject,
    pub topics: Vec<Topic>,
}

/// A full set of subjects and topics, e.g. a branch roadmap
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Roadmap {
    pub subjects: Vec<Subject>,
    pub topics: Vec<Topic>,
}

impl Roadmap {
    pub fn is_empty(&self) -> bool {
        self.subjects.is_empty()
    }
}

/// One day of an adaptive schedule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DaySchedule {
    pub day: String,
    #[serde(default)]
    pub tasks: Vec<String>,
}

/// Time allocated to a subject in an adaptive plan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubjectAllocation {
    pub subject: String,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub hours: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub percentage: Option<f64>,
    #[serde(default)]
    pub reasoning: String,
}

/// Expected outcomes of following an adaptive plan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanSummary {
    #[serde(default)]
    pub completion_timeline: String,
    #[serde(default)]
    pub confidence_improvement: String,
    #[serde(default)]
    pub workload_risk_reduction: String,
}

/// A generated weekly schedule. Derived on demand, never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdaptivePlan {
    pub visual_schedule: Vec<DaySchedule>,
    #[serde(default)]
    pub subject_breakdown: Vec<SubjectAllocation>,
    #[serde(default)]
    pub actionable_steps: Vec<String>,
    #[serde(default)]
    pub progress_logic: String,
    #[serde(default)]
    pub summary: Option<PlanSummary>,
}

/// Deserializes a number that may arrive as a JSON number or a numeric string
pub fn lenient_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(value_as_f64))
}

/// Deserializes an optional string, tolerating numbers and other scalars
pub fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) if !s.trim().is_empty() => Some(s),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        Some(serde_json::Value::Bool(b)) => Some(b.to_string()),
        _ => None,
    })
}

// Non-finite values cannot be written back to JSON, so they count as missing
fn value_as_f64(value: &serde_json::Value) -> Option<f64> {
    let parsed = match value {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.filter(|v| v.is_finite())
}
