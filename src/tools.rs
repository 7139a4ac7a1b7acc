//! Assistant tools
//!
//! The six capabilities a conversational assistant may call. Each tool takes
//! an explicit input shape and always answers with a structured outcome;
//! failures become `success: false` with a message rather than errors.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};

use crate::gateway::{AiGateway, API_KEY_ENV};
use crate::models::{AdaptivePlan, DaySchedule, PlanSummary, TopicStatus};
use crate::planner::AdaptivePlanner;
use crate::roadmap::RoadmapBuilder;
use crate::store::Store;
use crate::syllabus;

pub const PLAN_SUBJECT: &str = "plan_subject";
pub const GENERATE_STUDY_SCHEDULE: &str = "generate_study_schedule";
pub const GET_TOPIC_DETAILS: &str = "get_topic_details";
pub const LIST_MY_SUBJECTS: &str = "list_my_subjects";
pub const INITIALIZE_BRANCH_ROADMAP: &str = "initialize_branch_roadmap";
pub const LIST_SYLLABUS_SUBJECTS: &str = "list_syllabus_subjects";

const TOPIC_DETAILS_FALLBACK: &str = "Unable to fetch topic details at this time.";

#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("Unknown tool '{0}'")]
    UnknownTool(String),

    #[error("Invalid arguments for {tool}: {message}")]
    InvalidArguments { tool: String, message: String },

    #[error("Failed to encode tool output: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Name and description of a tool, as advertised to the assistant
#[derive(Debug, Clone, Serialize)]
pub struct ToolInfo {
    pub name: &'static str,
    pub description: &'static str,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanSubjectInput {
    pub subject_name: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PlanSubjectOutput {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject_title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub topic_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub topics: Option<Vec<String>>,
    pub message: String,
}

impl PlanSubjectOutput {
    fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            subject_title: None,
            topic_count: None,
            topics: None,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleOutput {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<PlanSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub visual_schedule: Option<Vec<DaySchedule>>,
    pub message: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopicDetailsInput {
    pub topic_title: String,
    pub subject_title: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TopicDetailsOutput {
    pub success: bool,
    pub details: String,
    pub topic_title: String,
    pub subject_title: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SubjectListing {
    pub title: String,
    pub topics: Vec<String>,
    pub topic_count: usize,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SubjectListOutput {
    pub success: bool,
    pub subjects: Vec<SubjectListing>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BranchRoadmapOutput {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub topic_count: Option<usize>,
    pub message: String,
}

impl BranchRoadmapOutput {
    fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            subject_count: None,
            topic_count: None,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SyllabusInput {
    pub branch: String,
    pub year: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SyllabusOutput {
    pub success: bool,
    pub branch: String,
    pub year: u8,
    pub subjects: Vec<String>,
    pub available_branches: Vec<String>,
}

/// Context strings handed to the assistant alongside each conversation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AssistantContext {
    pub user_context: String,
    pub subjects_context: String,
    pub capabilities_context: String,
}

/// The tool surface, bound to one store and gateway
#[derive(Clone)]
pub struct AssistantTools {
    store: Store,
    gateway: Arc<dyn AiGateway>,
    roadmaps: RoadmapBuilder,
    planner: AdaptivePlanner,
}

impl AssistantTools {
    pub fn new(store: Store, gateway: Arc<dyn AiGateway>) -> Self {
        Self {
            store,
            roadmaps: RoadmapBuilder::new(gateway.clone()),
            planner: AdaptivePlanner::new(gateway.clone()),
            gateway,
        }
    }

    /// Replaces the roadmap builder, e.g. to pin its clock
    pub fn with_roadmaps(mut self, roadmaps: RoadmapBuilder) -> Self {
        self.roadmaps = roadmaps;
        self
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn gateway(&self) -> &Arc<dyn AiGateway> {
        &self.gateway
    }

    pub fn roadmaps(&self) -> &RoadmapBuilder {
        &self.roadmaps
    }

    pub fn planner(&self) -> &AdaptivePlanner {
        &self.planner
    }

    /// Every tool with its description
    pub fn catalog() -> Vec<ToolInfo> {
        vec![
            ToolInfo {
                name: PLAN_SUBJECT,
                description: "Generate a learning roadmap for an engineering subject. Use when the user asks to plan, create roadmap, or help learn a subject (e.g. Data Structures, Heat Transfer, Fluid Mechanics).",
            },
            ToolInfo {
                name: GENERATE_STUDY_SCHEDULE,
                description: "Generate a personalized adaptive study plan. Use when the user asks to \"make a schedule\", \"plan my week\", or \"how should I study?\".",
            },
            ToolInfo {
                name: GET_TOPIC_DETAILS,
                description: "Get detailed study guidance for a specific topic in a subject. Use when the user asks about a topic, wants to understand a concept, or needs study tips for a unit.",
            },
            ToolInfo {
                name: LIST_MY_SUBJECTS,
                description: "List the user's current subjects and their topics. Use when the user asks what subjects they have, what they're studying, or their current roadmap.",
            },
            ToolInfo {
                name: INITIALIZE_BRANCH_ROADMAP,
                description: "Create a full branch roadmap with subjects and topics for the user's engineering branch. Use when the user wants to start fresh, set up their curriculum, or get a complete roadmap for their branch.",
            },
            ToolInfo {
                name: LIST_SYLLABUS_SUBJECTS,
                description: "List available subjects from the engineering syllabus for a given branch and year (1-4). Use when the user asks what subjects are in their branch/year or wants to add a subject from the curriculum.",
            },
        ]
    }

    /// Calls a tool by name with JSON arguments
    pub async fn invoke(&self, name: &str, args: Value) -> Result<Value, ToolError> {
        info!(tool = %name, "Invoking assistant tool");
        let output = match name {
            PLAN_SUBJECT => {
                let input: PlanSubjectInput = parse_args(name, args)?;
                serde_json::to_value(self.plan_subject(&input.subject_name).await)?
            }
            GENERATE_STUDY_SCHEDULE => {
                serde_json::to_value(self.generate_study_schedule().await)?
            }
            GET_TOPIC_DETAILS => {
                let input: TopicDetailsInput = parse_args(name, args)?;
                serde_json::to_value(
                    self.get_topic_details(&input.topic_title, &input.subject_title)
                        .await,
                )?
            }
            LIST_MY_SUBJECTS => serde_json::to_value(self.list_my_subjects())?,
            INITIALIZE_BRANCH_ROADMAP => {
                serde_json::to_value(self.initialize_branch_roadmap().await)?
            }
            LIST_SYLLABUS_SUBJECTS => {
                let input: SyllabusInput = parse_args(name, args)?;
                if !(1..=4).contains(&input.year) {
                    return Err(ToolError::InvalidArguments {
                        tool: name.to_string(),
                        message: format!("year must be between 1 and 4, got {}", input.year),
                    });
                }
                serde_json::to_value(self.list_syllabus_subjects(&input.branch, input.year))?
            }
            other => return Err(ToolError::UnknownTool(other.to_string())),
        };
        Ok(output)
    }

    /// Generates a roadmap for one subject and adds it to the store
    pub async fn plan_subject(&self, subject_name: &str) -> PlanSubjectOutput {
        let subject_name = subject_name.trim();
        if subject_name.is_empty() {
            return PlanSubjectOutput::failed("Tell me which subject you want to plan.");
        }

        let user = self.store.user();
        let user_id = user
            .as_ref()
            .map(|u| u.id.as_str())
            .unwrap_or(crate::gateway::DEFAULT_USER_KEY);
        let branch = user.as_ref().map(|u| u.branch.as_str());

        let roadmap = match self
            .roadmaps
            .build_subject_roadmap(subject_name, user_id, branch)
            .await
        {
            Ok(roadmap) if !roadmap.topics.is_empty() => roadmap,
            Ok(_) => {
                warn!(subject = %subject_name, "Subject roadmap came back without topics");
                return PlanSubjectOutput::failed(missing_roadmap_message());
            }
            Err(e) => {
                warn!(subject = %subject_name, error = %e, "Subject roadmap failed");
                return PlanSubjectOutput::failed(missing_roadmap_message());
            }
        };

        let title = roadmap.subject.title.clone();
        let topics: Vec<String> = roadmap.topics.iter().map(|t| t.title.clone()).collect();
        if let Err(e) = self.store.add_subject_roadmap(roadmap) {
            warn!(subject = %title, error = %e, "Could not store subject roadmap");
            return PlanSubjectOutput::failed(format!("Could not save the roadmap: {}", e));
        }

        PlanSubjectOutput {
            success: true,
            message: format!(
                "Created roadmap for {} with {} topics. Check your Roadmap and Planner pages.",
                title,
                topics.len()
            ),
            subject_title: Some(title),
            topic_count: Some(topics.len()),
            topics: Some(topics),
        }
    }

    /// Generates the adaptive weekly plan for the current user
    pub async fn generate_study_schedule(&self) -> ScheduleOutput {
        let state = self.store.snapshot();
        let user = match state.user {
            Some(user) if !state.subjects.is_empty() => user,
            _ => {
                return ScheduleOutput {
                    success: false,
                    summary: None,
                    visual_schedule: None,
                    message: "Please add subjects to your profile before generating a schedule."
                        .to_string(),
                }
            }
        };

        match self
            .planner
            .generate_plan(&user, &state.subjects, &state.topics)
            .await
        {
            Ok(plan) => ScheduleOutput {
                success: true,
                message: format_schedule_message(&plan),
                summary: plan.summary,
                visual_schedule: Some(plan.visual_schedule),
            },
            Err(e) => {
                warn!(error = %e, "Study schedule generation failed");
                ScheduleOutput {
                    success: false,
                    summary: None,
                    visual_schedule: None,
                    message: format!("I couldn't generate the plan right now. {}", e),
                }
            }
        }
    }

    /// Asks the AI for study guidance on one topic
    pub async fn get_topic_details(&self, topic_title: &str, subject_title: &str) -> TopicDetailsOutput {
        let prompt = format!(
            r#"Provide a concise 3-sentence introduction to the topic "{topic_title}" in the subject of "{subject_title}".
Then, provide a bulleted list of 3 key sub-concepts to master.
Finally, suggest a time allocation strategy (e.g., "Spend 2 hours on concept X...").
Keep it encouraging and directed at an engineering student."#
        );

        let (success, details) = match self.gateway.generate_text(&prompt).await {
            Ok(text) => (true, text.trim().to_string()),
            Err(e) => {
                warn!(topic = %topic_title, error = %e, "Topic details failed");
                (false, TOPIC_DETAILS_FALLBACK.to_string())
            }
        };

        TopicDetailsOutput {
            success,
            details,
            topic_title: topic_title.to_string(),
            subject_title: subject_title.to_string(),
        }
    }

    pub fn list_my_subjects(&self) -> SubjectListOutput {
        let state = self.store.snapshot();
        let subjects = state
            .subjects
            .iter()
            .map(|s| {
                let topics: Vec<String> = state
                    .topics_for(&s.id)
                    .into_iter()
                    .map(|t| t.title.clone())
                    .collect();
                SubjectListing {
                    title: s.title.clone(),
                    topic_count: topics.len(),
                    topics,
                }
            })
            .collect();
        SubjectListOutput {
            success: true,
            subjects,
        }
    }

    /// Regenerates the whole roadmap for the user's branch, replacing existing subjects
    pub async fn initialize_branch_roadmap(&self) -> BranchRoadmapOutput {
        let Some(user) = self.store.user() else {
            return BranchRoadmapOutput::failed("User not set.");
        };

        let roadmap = self.roadmaps.build_branch_roadmap(&user.id, &user.branch).await;
        if roadmap.is_empty() {
            return BranchRoadmapOutput::failed("Could not generate branch roadmap.");
        }

        let subject_count = roadmap.subjects.len();
        let topic_count = roadmap.topics.len();
        if let Err(e) = self.store.set_subjects_and_topics(roadmap) {
            warn!(error = %e, "Could not store branch roadmap");
            return BranchRoadmapOutput::failed(format!("Could not save the roadmap: {}", e));
        }

        BranchRoadmapOutput {
            success: true,
            subject_count: Some(subject_count),
            topic_count: Some(topic_count),
            message: format!(
                "Created {} subjects with {} topics for {}. Check Roadmap and Planner.",
                subject_count, topic_count, user.branch
            ),
        }
    }

    pub fn list_syllabus_subjects(&self, branch: &str, year: u8) -> SyllabusOutput {
        SyllabusOutput {
            success: (1..=4).contains(&year),
            branch: branch.to_string(),
            year,
            subjects: syllabus::subjects_for(branch, year),
            available_branches: syllabus::branch_names(),
        }
    }

    /// Context strings describing the user, their subjects and the available tools
    pub fn context(&self) -> AssistantContext {
        let state = self.store.snapshot();

        let user_context = match &state.user {
            Some(u) => format!(
                "Student: {}. Branch: {}. Daily study hours: {}h. Energy: {}.",
                u.name,
                u.branch,
                u.daily_study_hours,
                u.energy_preference.label().to_lowercase()
            ),
            None => "No student profile yet.".to_string(),
        };

        let subjects = join_or_none(state.subjects.iter().map(|s| s.title.as_str()));
        let topics = join_or_none(state.topics.iter().map(|t| t.title.as_str()));
        let in_progress = join_or_none(
            state
                .topics
                .iter()
                .filter(|t| t.status == TopicStatus::InProgress)
                .map(|t| t.title.as_str()),
        );

        let names: Vec<&str> = Self::catalog().iter().map(|t| t.name).collect();
        AssistantContext {
            user_context,
            subjects_context: format!(
                "Active subjects: {}. Topics: {}. In progress: {}.",
                subjects, topics, in_progress
            ),
            capabilities_context: format!(
                "You have tools: {}. Use them when relevant.",
                names.join(", ")
            ),
        }
    }
}

/// Renders a plan as a day-by-day bulleted message with a closing summary
pub fn format_schedule_message(plan: &AdaptivePlan) -> String {
    let mut text = String::from("Here is your personalized weekly schedule:\n");
    for day in &plan.visual_schedule {
        text.push_str(&format!("\n### {}\n", day.day));
        for task in &day.tasks {
            text.push_str(&format!("• {}\n", task));
        }
    }
    if let Some(summary) = &plan.summary {
        text.push_str("\n---\n\n### Summary\n");
        text.push_str(&format!("• Goal: {}\n", summary.completion_timeline));
        text.push_str(&format!("• Focus: {}", summary.confidence_improvement));
    }
    text
}

fn missing_roadmap_message() -> String {
    format!("Could not generate roadmap. Ensure {} is set.", API_KEY_ENV)
}

fn join_or_none<'a>(items: impl Iterator<Item = &'a str>) -> String {
    let joined = items.collect::<Vec<_>>().join(", ");
    if joined.is_empty() {
        "none".to_string()
    } else {
        joined
    }
}

fn parse_args<T: serde::de::DeserializeOwned>(tool: &str, args: Value) -> Result<T, ToolError> {
    // Tools without required fields accept a missing body
    let args = if args.is_null() {
        Value::Object(Default::default())
    } else {
        args
    };
    serde_json::from_value(args).map_err(|e| ToolError::InvalidArguments {
        tool: tool.to_string(),
        message: e.to_string(),
    })
}
