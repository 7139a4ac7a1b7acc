//! API Server module
//!
//! This module provides the HTTP API the dashboard talks to. Every JSON
//! endpoint answers with the `{success, data?, error?}` envelope.

use std::convert::Infallible;
use std::net::SocketAddr;

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
    routing::{get, post},
    Json, Router,
};
use chrono::NaiveDate;
use futures::Stream;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::net::TcpListener;
use tokio::sync::broadcast::error::RecvError;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::gateway::GatewayError;
use crate::models::{
    new_id, Difficulty, ProfileUpdate, Subject, Topic, TopicStatus, User, SUBJECT_ID_PREFIX,
    TOPIC_ID_PREFIX,
};
use crate::planner::PlanError;
use crate::report::{self, ReportSnapshot};
use crate::roadmap::PALETTE;
use crate::store::{AppState, DatastoreStatus, StoreError};
use crate::syllabus;
use crate::tools::{AssistantTools, ToolError};

/// Request to onboard a new student
#[derive(Debug, Serialize, Deserialize)]
pub struct OnboardRequest {
    pub name: String,
    pub branch: String,
    pub year: u8,
}

/// Request to add a subject by hand
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSubjectRequest {
    pub title: String,
    #[serde(default)]
    pub difficulty: Option<Difficulty>,
    #[serde(default)]
    pub priority: Option<u8>,
    #[serde(default)]
    pub credits: Option<u8>,
    #[serde(default)]
    pub confidence_level: Option<u8>,
    pub exam_date: NaiveDate,
    #[serde(default)]
    pub color: Option<String>,
}

/// Request to add a topic by hand
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTopicRequest {
    pub subject_id: String,
    pub title: String,
    #[serde(default)]
    pub estimated_hours: Option<f64>,
    #[serde(default)]
    pub weightage: Option<f64>,
    #[serde(default)]
    pub weakness_score: Option<f64>,
    #[serde(default)]
    pub status: Option<TopicStatus>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TopicStatusRequest {
    pub status: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SubjectRoadmapRequest {
    pub title: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatMessageRequest {
    pub message: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct SyllabusQuery {
    pub branch: Option<String>,
    pub year: Option<u8>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ReportQuery {
    #[serde(default)]
    pub summary: bool,
}

/// Health of the backing services
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusInfo {
    pub datastore: DatastoreStatus,
    pub ai_configured: bool,
    pub version: String,
}

/// Server configuration
#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub address: SocketAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: ([127, 0, 0, 1], 3000).into(),
        }
    }
}

/// API responses
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message),
        }
    }
}

fn ok<T: Serialize>(data: T) -> Response {
    (StatusCode::OK, Json(ApiResponse::success(data))).into_response()
}

fn fail(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(ApiResponse::<()>::error(message.into()))).into_response()
}

fn store_error_status(error: &StoreError) -> StatusCode {
    match error {
        StoreError::NoUser => StatusCode::BAD_REQUEST,
        StoreError::UnknownSubject(_) | StoreError::UnknownTopic(_) => StatusCode::NOT_FOUND,
        StoreError::ForeignSubject(_) => StatusCode::FORBIDDEN,
        StoreError::DuplicateId(_) => StatusCode::CONFLICT,
        StoreError::Io(_) | StoreError::Format(_) | StoreError::Version(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

/// Helper function to map store results to Axum responses
fn map_store_result<T: Serialize>(result: Result<T, StoreError>) -> Response {
    match result {
        Ok(data) => ok(data),
        Err(e) => fail(store_error_status(&e), e.to_string()),
    }
}

fn map_gateway_error(error: GatewayError) -> Response {
    warn!(error = %error, "AI request failed");
    fail(StatusCode::BAD_GATEWAY, error.to_string())
}

fn map_plan_result<T: Serialize>(result: Result<T, PlanError>) -> Response {
    match result {
        Ok(data) => ok(data),
        Err(PlanError::NoSubjects) => fail(StatusCode::BAD_REQUEST, PlanError::NoSubjects.to_string()),
        Err(PlanError::Gateway(e)) => map_gateway_error(e),
    }
}

fn map_tool_result(result: Result<Value, ToolError>) -> Response {
    match result {
        Ok(data) => ok(data),
        Err(e @ ToolError::UnknownTool(_)) => fail(StatusCode::NOT_FOUND, e.to_string()),
        Err(e @ ToolError::InvalidArguments { .. }) => fail(StatusCode::BAD_REQUEST, e.to_string()),
        Err(e @ ToolError::Encode(_)) => fail(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    }
}

fn require_user(tools: &AssistantTools) -> Result<User, Response> {
    tools
        .store()
        .user()
        .ok_or_else(|| fail(StatusCode::BAD_REQUEST, StoreError::NoUser.to_string()))
}

/// Builds the API router over the given tool surface
pub fn router(tools: AssistantTools) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // --- Session --- //
        .route("/api/status", get(status_handler))
        .route("/api/onboard", post(onboard_handler))
        .route("/api/logout", post(logout_handler))
        .route("/api/state", get(state_handler))
        .route("/api/user", get(get_user_handler).put(update_user_handler))
        // --- Manual entry and progress --- //
        .route("/api/subjects", post(add_subject_handler))
        .route("/api/topics", post(add_topic_handler))
        .route("/api/topics/:id/status", post(topic_status_handler))
        // --- Generation --- //
        .route("/api/roadmap/branch", post(branch_roadmap_handler))
        .route("/api/roadmap/subject", post(subject_roadmap_handler))
        .route("/api/plan", post(plan_handler))
        .route("/api/syllabus", get(syllabus_handler))
        // --- Assistant --- //
        .route("/api/chat/inject", post(inject_chat_handler))
        .route("/api/chat/take", post(take_chat_handler))
        .route("/api/tools", get(list_tools_handler))
        .route("/api/tools/:name", post(invoke_tool_handler))
        .route("/api/assistant/context", get(assistant_context_handler))
        // --- Export and events --- //
        .route("/api/report", get(report_handler))
        .route("/api/events", get(events_handler))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(tools)
}

/// Starts the API server
pub async fn serve(
    tools: AssistantTools,
    config: ServerConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let app = router(tools);

    info!("Starting server on {}", config.address);
    let listener = TcpListener::bind(config.address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// --- Session Handlers --- //

async fn status_handler(State(tools): State<AssistantTools>) -> impl IntoResponse {
    ok(StatusInfo {
        datastore: tools.store().datastore_status(),
        ai_configured: tools.gateway().is_configured(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

async fn onboard_handler(
    State(tools): State<AssistantTools>,
    Json(payload): Json<OnboardRequest>,
) -> impl IntoResponse {
    let name = payload.name.trim();
    let branch = payload.branch.trim();
    if name.is_empty() || branch.is_empty() {
        return fail(StatusCode::BAD_REQUEST, "Name and branch are required");
    }
    if !(1..=4).contains(&payload.year) {
        return fail(StatusCode::BAD_REQUEST, "Year must be between 1 and 4");
    }

    let user = User::onboard(name, branch, payload.year);
    info!(user = %user.id, %branch, "Onboarding student");
    if let Err(e) = tools.store().set_user(user.clone()) {
        return map_store_result::<()>(Err(e));
    }

    let roadmap = tools.roadmaps().build_branch_roadmap(&user.id, branch).await;
    if !roadmap.is_empty() {
        if let Err(e) = tools.store().set_subjects_and_topics(roadmap) {
            return map_store_result::<()>(Err(e));
        }
    }

    ok(tools.store().snapshot())
}

async fn logout_handler(State(tools): State<AssistantTools>) -> impl IntoResponse {
    map_store_result(tools.store().clear().map(|_| true))
}

async fn state_handler(State(tools): State<AssistantTools>) -> impl IntoResponse {
    ok(tools.store().snapshot())
}

async fn get_user_handler(State(tools): State<AssistantTools>) -> impl IntoResponse {
    match require_user(&tools) {
        Ok(user) => ok(user),
        Err(response) => response,
    }
}

async fn update_user_handler(
    State(tools): State<AssistantTools>,
    Json(update): Json<ProfileUpdate>,
) -> impl IntoResponse {
    if let Err(message) = update.validate() {
        return fail(StatusCode::BAD_REQUEST, message);
    }
    map_store_result(tools.store().update_profile(update))
}

// --- Manual Entry Handlers --- //

async fn add_subject_handler(
    State(tools): State<AssistantTools>,
    Json(payload): Json<NewSubjectRequest>,
) -> impl IntoResponse {
    let user = match require_user(&tools) {
        Ok(user) => user,
        Err(response) => return response,
    };
    if payload.title.trim().is_empty() {
        return fail(StatusCode::BAD_REQUEST, "Subject title is required");
    }

    let state = tools.store().snapshot();
    let subject = Subject {
        id: new_id(SUBJECT_ID_PREFIX),
        user_id: user.id,
        title: payload.title.trim().to_string(),
        difficulty: payload.difficulty.unwrap_or_default(),
        priority: payload.priority.unwrap_or(3).clamp(1, 5),
        credits: payload.credits,
        confidence_level: payload.confidence_level.map(|c| c.clamp(1, 5)),
        exam_date: payload.exam_date,
        color: payload
            .color
            .unwrap_or_else(|| PALETTE[state.subjects.len() % PALETTE.len()].to_string()),
    };
    let result = tools.store().add_subject(subject.clone()).map(|_| subject);
    map_store_result(result)
}

async fn add_topic_handler(
    State(tools): State<AssistantTools>,
    Json(payload): Json<NewTopicRequest>,
) -> impl IntoResponse {
    if payload.title.trim().is_empty() {
        return fail(StatusCode::BAD_REQUEST, "Topic title is required");
    }
    let topic = Topic {
        id: new_id(TOPIC_ID_PREFIX),
        subject_id: payload.subject_id,
        title: payload.title.trim().to_string(),
        estimated_hours: payload.estimated_hours.unwrap_or(2.0),
        weightage: payload.weightage.unwrap_or(5.0),
        weakness_score: payload.weakness_score.unwrap_or(5.0).clamp(0.0, 10.0),
        status: payload.status.unwrap_or_default(),
    };
    let result = tools.store().add_topic(topic.clone()).map(|_| topic);
    map_store_result(result)
}

async fn topic_status_handler(
    State(tools): State<AssistantTools>,
    Path(id): Path<String>,
    Json(payload): Json<TopicStatusRequest>,
) -> impl IntoResponse {
    match TopicStatus::coerce(&payload.status) {
        Some(status) => map_store_result(tools.store().set_topic_status(&id, status)),
        None => fail(
            StatusCode::BAD_REQUEST,
            format!("Unknown topic status '{}'", payload.status),
        ),
    }
}

// --- Generation Handlers --- //

async fn branch_roadmap_handler(State(tools): State<AssistantTools>) -> impl IntoResponse {
    let user = match require_user(&tools) {
        Ok(user) => user,
        Err(response) => return response,
    };
    let roadmap = tools.roadmaps().build_branch_roadmap(&user.id, &user.branch).await;
    if roadmap.is_empty() {
        return fail(StatusCode::BAD_GATEWAY, "Could not generate branch roadmap.");
    }
    map_store_result(
        tools
            .store()
            .set_subjects_and_topics(roadmap)
            .map(|_| tools.store().snapshot()),
    )
}

async fn subject_roadmap_handler(
    State(tools): State<AssistantTools>,
    Json(payload): Json<SubjectRoadmapRequest>,
) -> impl IntoResponse {
    let user = match require_user(&tools) {
        Ok(user) => user,
        Err(response) => return response,
    };
    let title = payload.title.trim();
    if title.is_empty() {
        return fail(StatusCode::BAD_REQUEST, "Subject title is required");
    }

    let roadmap = match tools
        .roadmaps()
        .build_subject_roadmap(title, &user.id, Some(&user.branch))
        .await
    {
        Ok(roadmap) => roadmap,
        Err(e) => return map_gateway_error(e),
    };
    let result = tools
        .store()
        .add_subject_roadmap(roadmap.clone())
        .map(|_| roadmap);
    map_store_result(result)
}

async fn plan_handler(State(tools): State<AssistantTools>) -> impl IntoResponse {
    let AppState {
        user,
        subjects,
        topics,
        ..
    } = tools.store().snapshot();
    let Some(user) = user else {
        return fail(StatusCode::BAD_REQUEST, StoreError::NoUser.to_string());
    };
    map_plan_result(tools.planner().generate_plan(&user, &subjects, &topics).await)
}

async fn syllabus_handler(
    State(tools): State<AssistantTools>,
    Query(query): Query<SyllabusQuery>,
) -> impl IntoResponse {
    match (query.branch, query.year) {
        (Some(branch), Some(year)) if (1..=4).contains(&year) => {
            ok(tools.list_syllabus_subjects(&branch, year))
        }
        (Some(_), Some(year)) => fail(
            StatusCode::BAD_REQUEST,
            format!("Year must be between 1 and 4, got {}", year),
        ),
        (None, None) => ok(&*syllabus::ENGINEERING_SYLLABUS),
        _ => fail(
            StatusCode::BAD_REQUEST,
            "Pass both branch and year, or neither for the full catalog",
        ),
    }
}

// --- Assistant Handlers --- //

async fn inject_chat_handler(
    State(tools): State<AssistantTools>,
    Json(payload): Json<ChatMessageRequest>,
) -> impl IntoResponse {
    if payload.message.trim().is_empty() {
        return fail(StatusCode::BAD_REQUEST, "Message is empty");
    }
    tools.store().send_to_chat(payload.message);
    ok(true)
}

async fn take_chat_handler(State(tools): State<AssistantTools>) -> impl IntoResponse {
    ok(tools.store().take_pending_chat_message())
}

async fn list_tools_handler() -> impl IntoResponse {
    ok(AssistantTools::catalog())
}

async fn invoke_tool_handler(
    State(tools): State<AssistantTools>,
    Path(name): Path<String>,
    body: Option<Json<Value>>,
) -> impl IntoResponse {
    let args = body.map(|Json(v)| v).unwrap_or(Value::Null);
    map_tool_result(tools.invoke(&name, args).await)
}

async fn assistant_context_handler(State(tools): State<AssistantTools>) -> impl IntoResponse {
    ok(tools.context())
}

// --- Export and Event Handlers --- //

async fn report_handler(
    State(tools): State<AssistantTools>,
    Query(query): Query<ReportQuery>,
) -> impl IntoResponse {
    let AppState {
        user,
        subjects,
        topics,
        ..
    } = tools.store().snapshot();
    let Some(user) = user else {
        return fail(StatusCode::BAD_REQUEST, StoreError::NoUser.to_string());
    };

    let mut snapshot =
        ReportSnapshot::new(user, subjects, topics, chrono::Local::now().naive_local());
    if query.summary {
        let summary = report::summarize_progress(tools.gateway().as_ref(), &snapshot).await;
        snapshot = snapshot.with_ai_summary(summary);
    }

    let disposition = format!("attachment; filename=\"{}\"", snapshot.file_name());
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "text/html; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        report::render_html(&snapshot),
    )
        .into_response()
}

async fn events_handler(
    State(tools): State<AssistantTools>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let receiver = tools.store().subscribe();
    let stream = futures::stream::unfold(receiver, |mut receiver| async move {
        match receiver.recv().await {
            // A lagged receiver still means something changed
            Ok(()) | Err(RecvError::Lagged(_)) => {
                let event = Event::default().event("update").data("change");
                Some((Ok::<_, Infallible>(event), receiver))
            }
            Err(RecvError::Closed) => None,
        }
    });
    Sse::new(stream).keep_alive(KeepAlive::default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::AiGateway;
    use crate::store::Store;
    use axum::{body::Body, http::Request};
    use http_body_util::BodyExt; // for `collect`
    use pretty_assertions::assert_eq;
    use serde::de::DeserializeOwned;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tower::ServiceExt; // for `oneshot`

    struct MockGateway {
        response: Result<String, GatewayError>,
        calls: AtomicUsize,
    }

    #[async_trait::async_trait]
    impl AiGateway for MockGateway {
        async fn generate_text(&self, _prompt: &str) -> Result<String, GatewayError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.response.clone()
        }
    }

    const BRANCH_ROADMAP: &str = r#"{
        "subjects": [{"id": "s1", "title": "Surveying"}, {"id": "s2", "title": "Hydrology"}],
        "topics": [{"subjectId": "s1", "title": "Levelling"}, {"subjectId": "s2", "title": "Runoff"}]
    }"#;

    fn setup_test_app(response: Result<&str, GatewayError>) -> (AssistantTools, Arc<MockGateway>, Router) {
        let gateway = Arc::new(MockGateway {
            response: response.map(str::to_string),
            calls: AtomicUsize::new(0),
        });
        let tools = AssistantTools::new(Store::in_memory(), gateway.clone());
        let app = router(tools.clone());
        (tools, gateway, app)
    }

    // Helper to make requests and split the envelope
    async fn request_json<T: DeserializeOwned>(
        app: &Router,
        method: &str,
        uri: &str,
        body: Option<Value>,
    ) -> (StatusCode, ApiResponse<T>) {
        let body = match body {
            Some(v) => Body::from(v.to_string()),
            None => Body::empty(),
        };
        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method(method)
                    .uri(uri)
                    .header("Content-Type", "application/json")
                    .body(body)
                    .unwrap(),
            )
            .await
            .unwrap();

        let status = response.status();
        let body_bytes = response.into_body().collect().await.unwrap().to_bytes();
        let parsed = serde_json::from_slice::<ApiResponse<T>>(&body_bytes).unwrap_or_else(|e| {
            panic!(
                "unparseable body ({}): {}",
                e,
                String::from_utf8_lossy(&body_bytes)
            )
        });
        (status, parsed)
    }

    async fn onboard(app: &Router) -> AppStateView {
        let (status, resp) = request_json::<AppStateView>(
            app,
            "POST",
            "/api/onboard",
            Some(json!({"name": "Ada Lovelace", "branch": "Civil Engineering", "year": 2})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        resp.data.unwrap()
    }

    #[derive(Debug, Deserialize)]
    struct AppStateView {
        user: Option<User>,
        subjects: Vec<Subject>,
        topics: Vec<Topic>,
    }

    #[tokio::test]
    async fn test_status_reports_datastore_and_ai() {
        let (_tools, _gw, app) = setup_test_app(Ok("{}"));
        let (status, resp) = request_json::<StatusInfo>(&app, "GET", "/api/status", None).await;
        assert_eq!(status, StatusCode::OK);
        let info = resp.data.unwrap();
        assert_eq!(info.datastore, DatastoreStatus::Disconnected);
        assert!(info.ai_configured);
    }

    #[tokio::test]
    async fn test_onboard_creates_user_and_roadmap() {
        let (tools, _gw, app) = setup_test_app(Ok(BRANCH_ROADMAP));

        let state = onboard(&app).await;

        let user = state.user.unwrap();
        assert!(user.id.starts_with("user-"));
        assert_eq!(user.email, "ada.lovelace@student.axent");
        assert_eq!(user.daily_study_hours, 4.0);
        assert_eq!(state.subjects.len(), 2);
        assert_eq!(state.topics.len(), 2);
        assert!(state.subjects.iter().all(|s| s.user_id == user.id));
        assert_eq!(tools.store().snapshot().subjects.len(), 2);
    }

    #[tokio::test]
    async fn test_onboard_survives_ai_failure() {
        let (_tools, _gw, app) = setup_test_app(Err(GatewayError::EmptyResponse));
        let state = onboard(&app).await;
        assert!(state.user.is_some());
        assert!(state.subjects.is_empty());
    }

    #[tokio::test]
    async fn test_profile_update_rejects_non_positive_hours() {
        let (tools, _gw, app) = setup_test_app(Err(GatewayError::EmptyResponse));
        onboard(&app).await;

        for body in [
            json!({"dailyStudyHours": 0}),
            json!({"studyHoursWeekend": -3.5}),
        ] {
            let (status, resp) = request_json::<Value>(&app, "PUT", "/api/user", Some(body)).await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert!(!resp.success);
        }
        assert_eq!(tools.store().user().unwrap().daily_study_hours, 4.0);

        let (status, resp) = request_json::<User>(
            &app,
            "PUT",
            "/api/user",
            Some(json!({"dailyStudyHours": 2.5})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(resp.data.unwrap().daily_study_hours, 2.5);
    }

    #[tokio::test]
    async fn test_onboard_rejects_bad_year() {
        let (_tools, _gw, app) = setup_test_app(Ok("{}"));
        let (status, resp) = request_json::<Value>(
            &app,
            "POST",
            "/api/onboard",
            Some(json!({"name": "Ada", "branch": "Civil Engineering", "year": 7})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(!resp.success);
    }

    #[tokio::test]
    async fn test_plan_without_subjects_is_bad_request() {
        let (_tools, gateway, app) = setup_test_app(Err(GatewayError::EmptyResponse));
        onboard(&app).await;
        let calls_after_onboard = gateway.calls.load(Ordering::SeqCst);

        let (status, resp) = request_json::<Value>(&app, "POST", "/api/plan", None).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            resp.error.as_deref(),
            Some("Add at least one subject before generating a plan")
        );
        assert_eq!(gateway.calls.load(Ordering::SeqCst), calls_after_onboard);
    }

    #[tokio::test]
    async fn test_plan_gateway_failure_is_bad_gateway() {
        let (tools, _gw, app) = setup_test_app(Ok(BRANCH_ROADMAP));
        onboard(&app).await;
        assert!(!tools.store().snapshot().subjects.is_empty());

        // The branch roadmap response is not a plan
        let (status, resp) = request_json::<Value>(&app, "POST", "/api/plan", None).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert!(resp.error.unwrap().starts_with("AI response was not valid JSON"));
    }

    #[tokio::test]
    async fn test_manual_entry_and_progress() {
        let (_tools, _gw, app) = setup_test_app(Err(GatewayError::EmptyResponse));
        onboard(&app).await;

        let (status, resp) = request_json::<Subject>(
            &app,
            "POST",
            "/api/subjects",
            Some(json!({"title": "Hydrology", "examDate": "2025-06-10", "priority": 9})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let subject = resp.data.unwrap();
        assert_eq!(subject.priority, 5);

        let (status, resp) = request_json::<Topic>(
            &app,
            "POST",
            "/api/topics",
            Some(json!({"subjectId": subject.id, "title": "Runoff"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let topic = resp.data.unwrap();

        let (status, resp) = request_json::<Topic>(
            &app,
            "POST",
            &format!("/api/topics/{}/status", topic.id),
            Some(json!({"status": "In Progress"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(resp.data.unwrap().status, TopicStatus::InProgress);

        let (status, _) = request_json::<Topic>(
            &app,
            "POST",
            "/api/topics",
            Some(json!({"subjectId": "sub-missing", "title": "Orphan"})),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_syllabus_lookup() {
        let (_tools, _gw, app) = setup_test_app(Ok("{}"));
        let (status, resp) = request_json::<Value>(
            &app,
            "GET",
            "/api/syllabus?branch=Mechanical%20Engineering&year=2",
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let data = resp.data.unwrap();
        assert!(data["subjects"]
            .as_array()
            .unwrap()
            .contains(&json!("Thermodynamics")));

        let (status, _) =
            request_json::<Value>(&app, "GET", "/api/syllabus?branch=Civil%20Engineering&year=5", None)
                .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_tools_endpoint() {
        let (_tools, _gw, app) = setup_test_app(Ok("{}"));

        let (_, resp) = request_json::<Vec<Value>>(&app, "GET", "/api/tools", None).await;
        assert_eq!(resp.data.unwrap().len(), 6);

        let (status, resp) =
            request_json::<Value>(&app, "POST", "/api/tools/list_my_subjects", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(resp.data.unwrap(), json!({"success": true, "subjects": []}));

        let (status, _) = request_json::<Value>(&app, "POST", "/api/tools/unknown", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_chat_injection_round_trip() {
        let (_tools, _gw, app) = setup_test_app(Ok("{}"));
        request_json::<bool>(
            &app,
            "POST",
            "/api/chat/inject",
            Some(json!({"message": "Plan my week"})),
        )
        .await;

        let (_, resp) = request_json::<Option<String>>(&app, "POST", "/api/chat/take", None).await;
        assert_eq!(resp.data.flatten(), Some("Plan my week".to_string()));
        let (_, resp) = request_json::<Option<String>>(&app, "POST", "/api/chat/take", None).await;
        assert_eq!(resp.data.flatten(), None);
    }

    #[tokio::test]
    async fn test_report_download() {
        let (_tools, _gw, app) = setup_test_app(Ok(BRANCH_ROADMAP));
        onboard(&app).await;

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/api/report")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let disposition = response
            .headers()
            .get(header::CONTENT_DISPOSITION)
            .and_then(|v| v.to_str().ok())
            .unwrap()
            .to_string();
        assert!(disposition.contains("Axent_Report_Ada_Lovelace_"));
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let html = String::from_utf8_lossy(&body);
        assert!(html.contains("Surveying"));
        assert!(html.contains("Student Information"));
    }
}
