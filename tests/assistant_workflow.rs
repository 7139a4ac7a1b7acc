//! End-to-end assistant flows over a scripted AI gateway

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use axent::api::router;
use axent::gateway::{AiGateway, GatewayError};
use axent::models::{TopicStatus, User};
use axent::store::Store;
use axent::tools::AssistantTools;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

/// Replies with queued responses in order
struct ScriptedGateway {
    replies: Mutex<VecDeque<Result<String, GatewayError>>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedGateway {
    fn new(replies: Vec<Result<&str, GatewayError>>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(
                replies
                    .into_iter()
                    .map(|r| r.map(str::to_string))
                    .collect(),
            ),
            prompts: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait::async_trait]
impl AiGateway for ScriptedGateway {
    async fn generate_text(&self, prompt: &str) -> Result<String, GatewayError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Err(GatewayError::EmptyResponse))
    }
}

const PLAN_RESPONSE: &str = r#"{
  "visualSchedule": [
    {"day": "Monday", "tasks": ["Thermodynamics: First Law (2h)"]},
    {"day": "Sunday", "tasks": ["Revision"]}
  ],
  "subjectBreakdown": [{"subject": "Thermodynamics", "hours": 6, "percentage": 100, "reasoning": "Exam soon"}],
  "actionableSteps": ["Start with the First Law"],
  "progressLogic": "Weak topics first",
  "summary": {"completionTimeline": "3 weeks", "confidenceImprovement": "+20%", "workloadRiskReduction": "Low"}
}"#;

fn signed_in_tools(gateway: Arc<ScriptedGateway>) -> AssistantTools {
    let store = Store::in_memory();
    store
        .set_user(User::onboard("Ada", "Mechanical Engineering", 2))
        .unwrap();
    AssistantTools::new(store, gateway)
}

#[tokio::test]
async fn test_plan_subject_then_schedule() {
    let gateway = ScriptedGateway::new(vec![
        Ok(r#"{"topics": [{"title": "First Law", "estimatedHours": 3}, {"title": "Entropy"}]}"#),
        Ok(PLAN_RESPONSE),
    ]);
    let tools = signed_in_tools(gateway.clone());

    let planned = tools.plan_subject("Thermodynamics").await;
    assert!(planned.success, "{}", planned.message);
    assert_eq!(planned.topic_count, Some(2));

    let listing = tools.list_my_subjects();
    assert_eq!(listing.subjects.len(), 1);
    assert_eq!(listing.subjects[0].topics, vec!["First Law", "Entropy"]);

    let schedule = tools.generate_study_schedule().await;
    assert!(schedule.success, "{}", schedule.message);
    assert_eq!(schedule.visual_schedule.map(|d| d.len()), Some(2));
    assert!(schedule.message.contains("Monday"));

    let prompts = gateway.prompts.lock().unwrap();
    assert_eq!(prompts.len(), 2);
    assert!(prompts[1].contains("Thermodynamics"));
}

#[tokio::test]
async fn test_schedule_without_subjects_skips_the_gateway() {
    let gateway = ScriptedGateway::new(vec![Ok(PLAN_RESPONSE)]);
    let tools = signed_in_tools(gateway.clone());

    let schedule = tools.generate_study_schedule().await;
    assert!(!schedule.success);
    assert!(gateway.prompts.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_http_topic_progress_flow() {
    let gateway = ScriptedGateway::new(vec![Ok(
        r#"{"topics": [{"title": "Gears"}, {"title": "Cams"}]}"#,
    )]);
    let tools = signed_in_tools(gateway);
    let store = tools.store().clone();
    let app = router(tools);

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/tools/plan_subject")
                .header("content-type", "application/json")
                .body(Body::from(json!({"subjectName": "Machine Design"}).to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let topic_id = store.snapshot().topics[0].id.clone();
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(format!("/api/topics/{}/status", topic_id))
                .header("content-type", "application/json")
                .body(Body::from(json!({"status": "completed"}).to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = response.into_body().collect().await.unwrap().to_bytes();
    let value: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(value["success"], true);
    assert_eq!(value["data"]["title"], "Gears");
    assert_eq!(store.snapshot().topics[0].status, TopicStatus::Completed);
}
