//! API client module
//!
//! This module provides HTTP client functionality to interact with the axent API server.

use std::sync::Arc;

use reqwest::{Client as ReqwestClient, Error as ReqwestError, Method};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};

use super::server::{ApiResponse, NewSubjectRequest, NewTopicRequest, StatusInfo};
use crate::models::{AdaptivePlan, ProfileUpdate, Subject, SubjectRoadmap, Topic, User};
use crate::tools::{AssistantContext, SyllabusOutput};

/// API client configuration
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000".to_string(),
        }
    }
}

/// Client errors
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] ReqwestError),

    #[error("API error: {0}")]
    Api(String),

    #[error("Missing data in response")]
    MissingData,
}

/// Subjects, topics and user as returned by the server
#[derive(Debug, Clone, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateView {
    pub user: Option<User>,
    #[serde(default)]
    pub subjects: Vec<Subject>,
    #[serde(default)]
    pub topics: Vec<Topic>,
}

/// A downloaded progress report
#[derive(Debug, Clone)]
pub struct ReportDownload {
    pub file_name: String,
    pub html: String,
}

/// API client for the axent service
#[derive(Debug, Clone)]
pub struct Client {
    http_client: Arc<ReqwestClient>,
    config: ClientConfig,
}

impl Default for Client {
    fn default() -> Self {
        Self::new()
    }
}

impl Client {
    /// Create a new client with default configuration
    pub fn new() -> Self {
        Self::with_config(ClientConfig::default())
    }

    /// Create a new client with custom configuration
    pub fn with_config(config: ClientConfig) -> Self {
        Self {
            http_client: Arc::new(ReqwestClient::new()),
            config,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    async fn request<T: DeserializeOwned, B: Serialize>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<T, ClientError> {
        let mut request = self.http_client.request(method, self.url(path));
        if let Some(body) = body {
            request = request.json(body);
        }
        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;

        let api_response: ApiResponse<T> = match serde_json::from_str(&text) {
            Ok(parsed) => parsed,
            Err(_) if !status.is_success() => {
                return Err(ClientError::Api(format!("HTTP {}: {}", status, text)))
            }
            Err(e) => return Err(ClientError::Api(format!("Malformed response: {}", e))),
        };

        if api_response.success {
            api_response.data.ok_or(ClientError::MissingData)
        } else {
            Err(ClientError::Api(
                api_response
                    .error
                    .unwrap_or_else(|| "Unknown API error".to_string()),
            ))
        }
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        self.request::<T, ()>(Method::GET, path, None).await
    }

    async fn post<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ClientError> {
        self.request(Method::POST, path, Some(body)).await
    }

    pub async fn status(&self) -> Result<StatusInfo, ClientError> {
        self.get("/api/status").await
    }

    pub async fn onboard(&self, name: &str, branch: &str, year: u8) -> Result<StateView, ClientError> {
        self.post(
            "/api/onboard",
            &json!({"name": name, "branch": branch, "year": year}),
        )
        .await
    }

    pub async fn logout(&self) -> Result<bool, ClientError> {
        self.post("/api/logout", &json!({})).await
    }

    pub async fn state(&self) -> Result<StateView, ClientError> {
        self.get("/api/state").await
    }

    pub async fn update_profile(&self, update: &ProfileUpdate) -> Result<User, ClientError> {
        self.request(Method::PUT, "/api/user", Some(update)).await
    }

    pub async fn add_subject(&self, subject: &NewSubjectRequest) -> Result<Subject, ClientError> {
        self.post("/api/subjects", subject).await
    }

    pub async fn add_topic(&self, topic: &NewTopicRequest) -> Result<Topic, ClientError> {
        self.post("/api/topics", topic).await
    }

    pub async fn set_topic_status(&self, topic_id: &str, status: &str) -> Result<Topic, ClientError> {
        self.post(
            &format!("/api/topics/{}/status", topic_id),
            &json!({"status": status}),
        )
        .await
    }

    pub async fn branch_roadmap(&self) -> Result<StateView, ClientError> {
        self.post("/api/roadmap/branch", &json!({})).await
    }

    pub async fn subject_roadmap(&self, title: &str) -> Result<SubjectRoadmap, ClientError> {
        self.post("/api/roadmap/subject", &json!({"title": title}))
            .await
    }

    pub async fn plan(&self) -> Result<AdaptivePlan, ClientError> {
        self.post("/api/plan", &json!({})).await
    }

    pub async fn syllabus(&self, branch: &str, year: u8) -> Result<SyllabusOutput, ClientError> {
        let response = self
            .http_client
            .get(self.url("/api/syllabus"))
            .query(&[("branch", branch.to_string()), ("year", year.to_string())])
            .send()
            .await?;
        let api_response: ApiResponse<SyllabusOutput> = response.json().await?;
        if api_response.success {
            api_response.data.ok_or(ClientError::MissingData)
        } else {
            Err(ClientError::Api(
                api_response
                    .error
                    .unwrap_or_else(|| "Unknown API error".to_string()),
            ))
        }
    }

    pub async fn send_to_chat(&self, message: &str) -> Result<bool, ClientError> {
        self.post("/api/chat/inject", &json!({"message": message}))
            .await
    }

    pub async fn take_chat_message(&self) -> Result<Option<String>, ClientError> {
        match self.post::<Option<String>, _>("/api/chat/take", &json!({})).await {
            Ok(message) => Ok(message),
            // `data: null` means nothing was pending
            Err(ClientError::MissingData) => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub async fn list_tools(&self) -> Result<Vec<Value>, ClientError> {
        self.get("/api/tools").await
    }

    pub async fn invoke_tool(&self, name: &str, args: &Value) -> Result<Value, ClientError> {
        self.post(&format!("/api/tools/{}", name), args).await
    }

    pub async fn assistant_context(&self) -> Result<AssistantContext, ClientError> {
        self.get("/api/assistant/context").await
    }

    /// Downloads the HTML progress report
    pub async fn report(&self, with_summary: bool) -> Result<ReportDownload, ClientError> {
        let response = self
            .http_client
            .get(self.url("/api/report"))
            .query(&[("summary", with_summary)])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await?;
            let message = serde_json::from_str::<ApiResponse<Value>>(&text)
                .ok()
                .and_then(|r| r.error)
                .unwrap_or_else(|| format!("HTTP {}", status));
            return Err(ClientError::Api(message));
        }

        let file_name = response
            .headers()
            .get(reqwest::header::CONTENT_DISPOSITION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split("filename=").nth(1))
            .map(|v| v.trim_matches('"').to_string())
            .unwrap_or_else(|| "Axent_Report.html".to_string());
        let html = response.text().await?;
        Ok(ReportDownload { file_name, html })
    }
}
