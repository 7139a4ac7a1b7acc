//! Adaptive study planner
//!
//! Turns the user's profile, subjects and topics into a weekly schedule. The
//! allocation policy is stated in the prompt and the returned plan is taken
//! as-is; nothing here re-checks the schedule against that policy.

use std::sync::Arc;

use chrono::NaiveDate;
use serde::Serialize;
use tracing::{debug, info};

use crate::gateway::{generate_json, AiGateway, GatewayError};
use crate::models::{AdaptivePlan, Subject, Topic, User};

const DEFAULT_CREDITS: u8 = 3;
const DEFAULT_CONFIDENCE: u8 = 3;

#[derive(Debug, thiserror::Error)]
pub enum PlanError {
    #[error("Add at least one subject before generating a plan")]
    NoSubjects,

    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

/// Planning inputs derived for one subject
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectFeatures {
    pub name: String,
    pub credits: u8,
    pub confidence: u8,
    pub weak_topics: Vec<String>,
    pub priority: u8,
    pub exam_date: NaiveDate,
}

impl SubjectFeatures {
    pub fn derive(subject: &Subject, topics: &[Topic]) -> Self {
        Self {
            name: subject.title.clone(),
            credits: subject.credits.filter(|c| *c > 0).unwrap_or(DEFAULT_CREDITS),
            confidence: subject
                .confidence_level
                .filter(|c| *c > 0)
                .unwrap_or(DEFAULT_CONFIDENCE),
            weak_topics: topics
                .iter()
                .filter(|t| t.subject_id == subject.id && t.is_weak())
                .map(|t| t.title.clone())
                .collect(),
            priority: subject.priority,
            exam_date: subject.exam_date,
        }
    }
}

#[derive(Clone)]
pub struct AdaptivePlanner {
    gateway: Arc<dyn AiGateway>,
}

impl AdaptivePlanner {
    pub fn new(gateway: Arc<dyn AiGateway>) -> Self {
        Self { gateway }
    }

    /// Generates a weekly plan. Fails without contacting the AI when there are no subjects.
    pub async fn generate_plan(
        &self,
        user: &User,
        subjects: &[Subject],
        topics: &[Topic],
    ) -> Result<AdaptivePlan, PlanError> {
        if subjects.is_empty() {
            return Err(PlanError::NoSubjects);
        }

        let features: Vec<SubjectFeatures> = subjects
            .iter()
            .map(|s| SubjectFeatures::derive(s, topics))
            .collect();
        debug!(subjects = features.len(), "Derived planning features");

        let prompt = plan_prompt(user, &features);
        let plan: AdaptivePlan = generate_json(self.gateway.as_ref(), &prompt).await?;
        info!(
            user = %user.name,
            days = plan.visual_schedule.len(),
            "Generated adaptive plan"
        );
        Ok(plan)
    }
}

fn plan_prompt(user: &User, features: &[SubjectFeatures]) -> String {
    let energy = user.energy_preference.label();
    let subjects_json =
        serde_json::to_string_pretty(features).unwrap_or_else(|_| "[]".to_string());

    format!(
        r#"SYSTEM ROLE
You are an AI-powered adaptive study planning engine designed specifically for engineering students.
Your job is to analyze academic inputs, cognitive load, deadlines, and personal constraints to generate a personalized, evolving study schedule.

INPUTS:
1. Student Profile:
   Name: {name}
   Branch: {branch}
   Daily Study Hours (Weekday): {daily}
   Weekend Study Hours: {weekend}
   Preferred Study Time: {energy}

2. Subjects:
{subjects_json}

CORE PLANNING OBJECTIVES:
- Allocate time proportionally based on (Credits * Weight) + ((5 - Confidence) * Weight) + Weak Topic Count.
- Schedule weak & prerequisite-heavy topics earlier (High Cognitive Load).
- High-load tasks MUST be during {energy}.
- No more than 2 consecutive high-load sessions.
- Include Revision, Practice, and Buffer slots.

OUTPUT STRUCTURE (JSON Format):
{{
  "visualSchedule": [
    {{ "day": "Monday", "tasks": ["Subject: Task (Type) [Load]"] }}
  ],
  "subjectBreakdown": [
    {{ "subject": "Name", "hours": 10, "percentage": 25, "reasoning": "..." }}
  ],
  "actionableSteps": ["Step 1", "Step 2"],
  "progressLogic": "Explanation of checkpoints...",
  "summary": {{
    "completionTimeline": "...",
    "confidenceImprovement": "...",
    "workloadRiskReduction": "..."
  }}
}}

RETURN ONLY JSON. NO MARKDOWN."#,
        name = user.name,
        branch = user.branch,
        daily = user.daily_study_hours,
        weekend = user.weekend_hours(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Difficulty, EnergyPreference, TopicStatus};
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct MockGateway {
        response: String,
        calls: AtomicUsize,
        last_prompt: Mutex<Option<String>>,
    }

    impl MockGateway {
        fn new(response: &str) -> Arc<Self> {
            Arc::new(Self {
                response: response.to_string(),
                calls: AtomicUsize::new(0),
                last_prompt: Mutex::new(None),
            })
        }
    }

    #[async_trait::async_trait]
    impl AiGateway for MockGateway {
        async fn generate_text(&self, prompt: &str) -> Result<String, GatewayError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last_prompt.lock().unwrap() = Some(prompt.to_string());
            Ok(self.response.clone())
        }
    }

    fn subject(id: &str, title: &str) -> Subject {
        Subject {
            id: id.to_string(),
            user_id: "user-1".to_string(),
            title: title.to_string(),
            difficulty: Difficulty::Intermediate,
            priority: 4,
            credits: None,
            confidence_level: Some(2),
            exam_date: NaiveDate::from_ymd_opt(2025, 5, 1).unwrap(),
            color: "#6366f1".to_string(),
        }
    }

    fn topic(subject_id: &str, title: &str, weakness: f64, status: TopicStatus) -> Topic {
        Topic {
            id: format!("top-{}", title),
            subject_id: subject_id.to_string(),
            title: title.to_string(),
            estimated_hours: 2.0,
            weightage: 5.0,
            weakness_score: weakness,
            status,
        }
    }

    const PLAN_RESPONSE: &str = r#"```json
    {
      "visualSchedule": [
        {"day": "Monday", "tasks": ["DSA: Graphs (Theory) [High]", "DSA: Revision (Review) [Low]"]},
        {"day": "Tuesday", "tasks": ["OS: Paging (Practice) [High]"]}
      ],
      "subjectBreakdown": [{"subject": "DSA", "hours": 10, "percentage": 60, "reasoning": "weak"}],
      "actionableSteps": ["Start with graphs"],
      "progressLogic": "Weekly checkpoints",
      "summary": {"completionTimeline": "8 weeks", "confidenceImprovement": "+2", "workloadRiskReduction": "30%"}
    }
    ```"#;

    #[tokio::test]
    async fn test_no_subjects_never_calls_gateway() {
        let gateway = MockGateway::new(PLAN_RESPONSE);
        let planner = AdaptivePlanner::new(gateway.clone());
        let user = User::onboard("Ada", "Computer Science & Engineering", 2);

        let err = planner.generate_plan(&user, &[], &[]).await.unwrap_err();

        assert!(matches!(err, PlanError::NoSubjects));
        assert_eq!(gateway.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_generate_plan_parses_response() {
        let gateway = MockGateway::new(PLAN_RESPONSE);
        let planner = AdaptivePlanner::new(gateway.clone());
        let user = User::onboard("Ada", "Computer Science & Engineering", 2);

        let plan = planner
            .generate_plan(&user, &[subject("sub-1", "DSA")], &[])
            .await
            .unwrap();

        assert_eq!(plan.visual_schedule.len(), 2);
        assert_eq!(plan.visual_schedule[0].day, "Monday");
        assert_eq!(plan.subject_breakdown[0].hours, Some(10.0));
        assert_eq!(
            plan.summary.map(|s| s.completion_timeline),
            Some("8 weeks".to_string())
        );
        assert_eq!(gateway.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_gateway_errors_are_wrapped() {
        let planner = AdaptivePlanner::new(MockGateway::new("I cannot help with that"));
        let user = User::onboard("Ada", "Civil Engineering", 1);
        let err = planner
            .generate_plan(&user, &[subject("sub-1", "Surveying")], &[])
            .await
            .unwrap_err();
        assert!(matches!(err, PlanError::Gateway(GatewayError::Parse(_))));
    }

    #[test]
    fn test_features_pick_weak_topics_and_defaults() {
        let dsa = subject("sub-1", "DSA");
        let topics = vec![
            topic("sub-1", "Graphs", 8.0, TopicStatus::InProgress),
            topic("sub-1", "Arrays", 2.0, TopicStatus::Completed),
            topic("sub-1", "Heaps", 1.0, TopicStatus::Todo),
            topic("sub-2", "Paging", 9.0, TopicStatus::Todo),
        ];

        let features = SubjectFeatures::derive(&dsa, &topics);

        assert_eq!(features.weak_topics, vec!["Graphs", "Heaps"]);
        assert_eq!(features.credits, 3);
        assert_eq!(features.confidence, 2);
        assert_eq!(features.priority, 4);
    }

    #[tokio::test]
    async fn test_prompt_carries_profile_and_policy() {
        let gateway = MockGateway::new(PLAN_RESPONSE);
        let planner = AdaptivePlanner::new(gateway.clone());
        let mut user = User::onboard("Ada", "Computer Science & Engineering", 2);
        user.energy_preference = EnergyPreference::Night;
        user.daily_study_hours = 3.0;

        planner
            .generate_plan(&user, &[subject("sub-1", "DSA")], &[])
            .await
            .unwrap();

        let prompt = gateway.last_prompt.lock().unwrap().clone().unwrap();
        assert!(prompt.contains("Weekend Study Hours: 5"));
        assert!(prompt.contains("High-load tasks MUST be during Night."));
        assert!(prompt.contains("\"weakTopics\""));
        assert!(prompt.contains("\"examDate\": \"2025-05-01\""));
        assert!(prompt.contains("No more than 2 consecutive high-load sessions."));
    }
}
