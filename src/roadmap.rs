//! Roadmap generation
//!
//! Builds subject/topic roadmaps through the AI gateway. The AI output is
//! loosely shaped, so every record is read through a lenient raw form and then
//! completed with synthetic ids and defaults before it reaches the store.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{Duration, Months, NaiveDate};
use rand::seq::SliceRandom;
use serde::Deserialize;
use tracing::{info, warn};

use crate::gateway::{generate_json, AiGateway, GatewayError};
use crate::models::{
    lenient_f64, lenient_string, new_id, Difficulty, Roadmap, Subject, SubjectRoadmap, Topic,
    TopicStatus, SUBJECT_ID_PREFIX, TOPIC_ID_PREFIX,
};
use crate::syllabus;

/// Subject color tags
pub const PALETTE: [&str; 7] = [
    "#6366f1", "#ef4444", "#10b981", "#f59e0b", "#8b5cf6", "#ec4899", "#06b6d4",
];

const DEFAULT_PRIORITY: u8 = 3;
const SUBJECT_ROADMAP_PRIORITY: u8 = 4;
const SUBJECT_ROADMAP_EXAM_DAYS: i64 = 90;
const DEFAULT_TOPIC_HOURS: f64 = 2.0;
const DEFAULT_TOPIC_WEIGHTAGE: f64 = 5.0;
const DEFAULT_WEAKNESS: f64 = 5.0;
const DEFAULT_TOPIC_TITLE: &str = "Topic";

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSubject {
    #[serde(default, deserialize_with = "lenient_string")]
    id: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    title: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    difficulty: Option<String>,
    #[serde(default, deserialize_with = "lenient_f64")]
    priority: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    credits: Option<f64>,
    #[serde(default, deserialize_with = "lenient_string")]
    color: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    exam_date: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawTopic {
    #[serde(default, deserialize_with = "lenient_string")]
    subject_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    title: Option<String>,
    #[serde(default, deserialize_with = "lenient_f64")]
    estimated_hours: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    weightage: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    weakness_score: Option<f64>,
    #[serde(default, deserialize_with = "lenient_string")]
    status: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct RawBranchRoadmap {
    #[serde(default)]
    subjects: Vec<RawSubject>,
    #[serde(default)]
    topics: Vec<RawTopic>,
}

#[derive(Debug, Default, Deserialize)]
struct RawTopicList {
    #[serde(default)]
    topics: Vec<RawTopic>,
}

/// Generates roadmaps through an [`AiGateway`]
#[derive(Clone)]
pub struct RoadmapBuilder {
    gateway: Arc<dyn AiGateway>,
    today: Option<NaiveDate>,
}

impl RoadmapBuilder {
    pub fn new(gateway: Arc<dyn AiGateway>) -> Self {
        Self {
            gateway,
            today: None,
        }
    }

    /// Pins the calendar date used for synthesized exam dates
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = Some(today);
        self
    }

    pub fn today(&self) -> NaiveDate {
        self.today
            .unwrap_or_else(|| chrono::Local::now().date_naive())
    }

    /// Generates a 12-week roadmap for a whole branch.
    ///
    /// Never fails: a missing key or a failed generation yields an empty
    /// roadmap and a log line.
    pub async fn build_branch_roadmap(&self, user_id: &str, branch: &str) -> Roadmap {
        if !self.gateway.is_configured() {
            warn!(%branch, "Skipping branch roadmap, AI is not configured");
            return Roadmap::default();
        }

        let prompt = branch_roadmap_prompt(branch, syllabus::curriculum_context(branch));
        match generate_json::<RawBranchRoadmap>(self.gateway.as_ref(), &prompt).await {
            Ok(raw) => {
                let roadmap = self.complete_branch_roadmap(user_id, raw);
                info!(
                    %branch,
                    subjects = roadmap.subjects.len(),
                    topics = roadmap.topics.len(),
                    "Generated branch roadmap"
                );
                roadmap
            }
            Err(e) => {
                warn!(%branch, error = %e, "AI roadmap generation failed");
                Roadmap::default()
            }
        }
    }

    fn complete_branch_roadmap(&self, user_id: &str, raw: RawBranchRoadmap) -> Roadmap {
        let today = self.today();
        let mut id_map: HashMap<String, String> = HashMap::new();

        let subjects: Vec<Subject> = raw
            .subjects
            .into_iter()
            .enumerate()
            .map(|(idx, s)| {
                let id = new_id(SUBJECT_ID_PREFIX);
                if let Some(ai_id) = s.id {
                    id_map.insert(ai_id, id.clone());
                }
                let title = s.title.unwrap_or_else(|| format!("Subject {}", idx + 1));
                // Titles double as references when the AI omits ids
                id_map.entry(title.clone()).or_insert_with(|| id.clone());

                let exam_date = s
                    .exam_date
                    .as_deref()
                    .and_then(|d| NaiveDate::parse_from_str(d.trim(), "%Y-%m-%d").ok())
                    .unwrap_or_else(|| exam_date_for_index(today, idx));

                Subject {
                    id,
                    user_id: user_id.to_string(),
                    title,
                    difficulty: s
                        .difficulty
                        .as_deref()
                        .and_then(Difficulty::coerce)
                        .unwrap_or_default(),
                    priority: s
                        .priority
                        .map(|p| p.round().clamp(1.0, 5.0) as u8)
                        .unwrap_or(DEFAULT_PRIORITY),
                    credits: s.credits.map(|c| c.round().clamp(0.0, 255.0) as u8),
                    confidence_level: None,
                    exam_date,
                    color: s
                        .color
                        .filter(|c| c.starts_with('#'))
                        .unwrap_or_else(|| PALETTE[idx % PALETTE.len()].to_string()),
                }
            })
            .collect();

        let topics = raw
            .topics
            .into_iter()
            .filter_map(|t| {
                let subject_id = t
                    .subject_id
                    .as_ref()
                    .and_then(|ai_id| id_map.get(ai_id))
                    .cloned();
                match subject_id {
                    Some(subject_id) => {
                        let status = t
                            .status
                            .as_deref()
                            .and_then(TopicStatus::coerce)
                            .unwrap_or_default();
                        Some(complete_topic(t, subject_id, status))
                    }
                    None => {
                        warn!(
                            title = ?t.title,
                            subject_ref = ?t.subject_id,
                            "Dropping roadmap topic with unknown subject"
                        );
                        None
                    }
                }
            })
            .collect();

        Roadmap { subjects, topics }
    }

    /// Generates an ordered topic roadmap for a single subject
    pub async fn build_subject_roadmap(
        &self,
        subject_title: &str,
        user_id: &str,
        branch: Option<&str>,
    ) -> Result<SubjectRoadmap, GatewayError> {
        let prompt = subject_roadmap_prompt(subject_title, branch);
        let raw: RawTopicList = generate_json(self.gateway.as_ref(), &prompt).await?;

        let color = PALETTE
            .choose(&mut rand::thread_rng())
            .copied()
            .unwrap_or(PALETTE[0]);
        let subject = Subject {
            id: new_id(SUBJECT_ID_PREFIX),
            user_id: user_id.to_string(),
            title: subject_title.to_string(),
            difficulty: Difficulty::Intermediate,
            priority: SUBJECT_ROADMAP_PRIORITY,
            credits: None,
            confidence_level: None,
            exam_date: self.today() + Duration::days(SUBJECT_ROADMAP_EXAM_DAYS),
            color: color.to_string(),
        };

        let topics = raw
            .topics
            .into_iter()
            .map(|t| complete_topic(t, subject.id.clone(), TopicStatus::Todo))
            .collect::<Vec<_>>();

        info!(subject = %subject.title, topics = topics.len(), "Generated subject roadmap");
        Ok(SubjectRoadmap { subject, topics })
    }
}

fn complete_topic(raw: RawTopic, subject_id: String, status: TopicStatus) -> Topic {
    Topic {
        id: new_id(TOPIC_ID_PREFIX),
        subject_id,
        title: raw
            .title
            .unwrap_or_else(|| DEFAULT_TOPIC_TITLE.to_string()),
        estimated_hours: positive_or(raw.estimated_hours, DEFAULT_TOPIC_HOURS),
        weightage: positive_or(raw.weightage, DEFAULT_TOPIC_WEIGHTAGE),
        weakness_score: positive_or(raw.weakness_score, DEFAULT_WEAKNESS).min(10.0),
        status,
    }
}

// Zero counts as missing, matching how the AI omits values
fn positive_or(value: Option<f64>, default: f64) -> f64 {
    value.filter(|v| *v > 0.0).unwrap_or(default)
}

/// Exam date for the subject at `idx`: today plus (3 + idx) months, clamped to month end
pub fn exam_date_for_index(today: NaiveDate, idx: usize) -> NaiveDate {
    let months = 3 + idx as u32;
    today
        .checked_add_months(Months::new(months))
        .unwrap_or(today)
}

fn branch_roadmap_prompt(branch: &str, curriculum: &str) -> String {
    format!(
        r##"You are an Academic Dean for {branch}.
Create a high-performance 12-week study roadmap.
Required Curriculum Areas: {curriculum}

Format Guidelines:
1. Create 5-6 core Subjects.
2. For each subject, create 4-6 specific Units (Topics).
3. Ensure difficulty levels are balanced (Beginner to Advanced).
4. Provide logical dependencies (e.g., learn "Basics" before "Advanced").

RETURN JSON ONLY:
{{
  "subjects": [{{ "id": "...", "title": "...", "difficulty": "Beginner|Intermediate|Advanced", "priority": 1..5, "color": "#rrggbb" }}],
  "topics": [{{ "id": "...", "subjectId": "...", "title": "...", "estimatedHours": 1..10, "status": "Todo" }}]
}}"##
    )
}

fn subject_roadmap_prompt(subject_title: &str, branch: Option<&str>) -> String {
    let branch_note = branch
        .map(|b| format!(" (Branch: {})", b))
        .unwrap_or_default();
    format!(
        r#"You are an academic expert. Create a complete learning roadmap for the engineering subject "{subject_title}"{branch_note}.

Generate 5-8 specific, actionable topics/units that a student should master to learn this subject effectively. Order them logically (foundations first, advanced last).
Each topic should be a concrete unit like "Introduction and Basics", "Core Concepts", "Problem Solving", etc.

Return JSON ONLY: {{ "topics": [ {{ "title": "Topic Name", "estimatedHours": 3, "weightage": 7, "weaknessScore": 5 }} ] }}"#
    )
}
