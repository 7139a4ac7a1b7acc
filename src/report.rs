//! Progress report export
//!
//! Computes the readiness metrics for the current user and renders them as a
//! self-contained HTML document that the dashboard offers as a download.

use chrono::{NaiveDate, NaiveDateTime};
use html_escape::encode_text;
use serde::Serialize;
use tracing::{debug, warn};

use crate::gateway::AiGateway;
use crate::models::{Subject, Topic, TopicStatus, User};

const WEEKDAYS: f64 = 5.0;
const WEEKEND_DAYS: f64 = 2.0;
const READINESS_GOOD: u32 = 70;
const READINESS_FAIR: u32 = 50;
const COMPLETION_ON_TRACK: u32 = 70;
const OPTIMAL_WEEKLY_HOURS: f64 = 20.0;

/// Headline numbers shown in the performance summary
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportMetrics {
    pub overall_score: u32,
    pub weekly_hours: f64,
    pub progress_percent: u32,
    pub completed_topics: usize,
    pub total_topics: usize,
    pub active_subjects_count: usize,
}

impl ReportMetrics {
    pub fn compute(user: &User, subjects: &[Subject], topics: &[Topic]) -> Self {
        let weekly_hours = user.daily_study_hours * WEEKDAYS + user.weekend_hours() * WEEKEND_DAYS;

        let total_topics = topics.len();
        let completed_topics = topics
            .iter()
            .filter(|t| t.status == TopicStatus::Completed)
            .count();
        let progress = if total_topics == 0 {
            0.0
        } else {
            completed_topics as f64 / total_topics as f64 * 100.0
        };

        let open: Vec<f64> = topics
            .iter()
            .filter(|t| t.status != TopicStatus::Completed)
            .map(|t| t.weakness_score.clamp(0.0, 10.0))
            .collect();
        let avg_weakness = if open.is_empty() {
            0.0
        } else {
            open.iter().sum::<f64>() / open.len() as f64
        };

        let score = 0.6 * progress + 0.4 * (100.0 - avg_weakness * 10.0);

        Self {
            overall_score: score.round().clamp(0.0, 100.0) as u32,
            weekly_hours,
            progress_percent: progress.round() as u32,
            completed_topics,
            total_topics,
            active_subjects_count: subjects.len(),
        }
    }
}

/// Everything the report renders, captured at one instant
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportSnapshot {
    pub user: User,
    pub subjects: Vec<Subject>,
    pub topics: Vec<Topic>,
    pub metrics: ReportMetrics,
    pub ai_summary: Option<String>,
    pub generated_at: NaiveDateTime,
}

impl ReportSnapshot {
    pub fn new(
        user: User,
        subjects: Vec<Subject>,
        topics: Vec<Topic>,
        generated_at: NaiveDateTime,
    ) -> Self {
        let metrics = ReportMetrics::compute(&user, &subjects, &topics);
        Self {
            user,
            subjects,
            topics,
            metrics,
            ai_summary: None,
            generated_at,
        }
    }

    pub fn with_ai_summary(mut self, summary: Option<String>) -> Self {
        self.ai_summary = summary.filter(|s| !s.trim().is_empty());
        self
    }

    /// Download name, e.g. `Axent_Report_Ada_Lovelace_2025-03-14.html`
    pub fn file_name(&self) -> String {
        file_name(&self.user.name, self.generated_at.date())
    }
}

pub fn file_name(user_name: &str, date: NaiveDate) -> String {
    let name = user_name.split_whitespace().collect::<Vec<_>>().join("_");
    format!("Axent_Report_{}_{}.html", name, date.format("%Y-%m-%d"))
}

/// Asks the AI for a two-sentence progress summary. Any failure yields `None`.
pub async fn summarize_progress(gateway: &dyn AiGateway, snapshot: &ReportSnapshot) -> Option<String> {
    if !gateway.is_configured() {
        return None;
    }
    let m = &snapshot.metrics;
    let prompt = format!(
        "Write a two-sentence, encouraging progress summary for an engineering student.\n\
         Branch: {}. Readiness score: {}/100. Topics completed: {}/{}. \
         Active subjects: {}. Weekly study capacity: {} hours.\n\
         Return plain text only.",
        snapshot.user.branch,
        m.overall_score,
        m.completed_topics,
        m.total_topics,
        m.active_subjects_count,
        m.weekly_hours
    );
    match gateway.generate_text(&prompt).await {
        Ok(text) => {
            debug!(chars = text.len(), "Generated report summary");
            Some(text.trim().to_string())
        }
        Err(e) => {
            warn!(error = %e, "Report summary unavailable");
            None
        }
    }
}

fn readiness_status(score: u32) -> &'static str {
    if score >= READINESS_GOOD {
        "✓ Good"
    } else if score >= READINESS_FAIR {
        "⚠ Fair"
    } else {
        "✗ Needs Improvement"
    }
}

fn completion_status(percent: u32) -> &'static str {
    if percent >= COMPLETION_ON_TRACK {
        "✓ On Track"
    } else {
        "⚠ Behind"
    }
}

fn capacity_status(hours: f64) -> &'static str {
    if hours >= OPTIMAL_WEEKLY_HOURS {
        "✓ Optimal"
    } else {
        "⚠ Low"
    }
}

/// Recommended next steps derived from the metrics
pub fn recommendations(metrics: &ReportMetrics) -> Vec<&'static str> {
    let mut recs = Vec::new();
    if metrics.overall_score < READINESS_FAIR {
        recs.push("Focus on high-weakness topics immediately to improve readiness score");
    } else if metrics.overall_score < READINESS_GOOD {
        recs.push("Continue steady progress and start revision cycles");
    } else {
        recs.push("Excellent progress! Maintain current pace and deepen understanding");
    }
    if metrics.progress_percent < 50 {
        recs.push("Increase daily study hours to catch up with your schedule");
    }
    if metrics.active_subjects_count == 0 {
        recs.push("Add subjects to start building your study roadmap");
    }
    if metrics.weekly_hours < OPTIMAL_WEEKLY_HOURS {
        recs.push("Consider increasing weekly study hours for better outcomes");
    }
    recs
}

fn or_na(value: &str) -> &str {
    if value.trim().is_empty() {
        "N/A"
    } else {
        value
    }
}

fn row(cells: &[&str]) -> String {
    let cells: String = cells
        .iter()
        .map(|c| format!("<td>{}</td>", encode_text(c)))
        .collect();
    format!("<tr>{}</tr>\n", cells)
}

/// Renders the report as a standalone HTML document
pub fn render_html(snapshot: &ReportSnapshot) -> String {
    let user = &snapshot.user;
    let m = &snapshot.metrics;
    let mut html = String::new();

    html.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n");
    html.push_str(&format!(
        "<title>Axent Report - {}</title>\n",
        encode_text(&user.name)
    ));
    html.push_str(
        "<style>\n\
         body { font-family: Helvetica, Arial, sans-serif; margin: 0; color: #111; }\n\
         header { background: #2563eb; color: #fff; padding: 24px 32px; }\n\
         header h1 { margin: 0; font-size: 28px; }\n\
         main { padding: 0 32px 32px; }\n\
         table { border-collapse: collapse; width: 100%; margin-bottom: 16px; }\n\
         th { background: #2563eb; color: #fff; text-align: left; }\n\
         th, td { border: 1px solid #cbd5e1; padding: 6px 10px; font-size: 13px; }\n\
         .insights { background: #dbeafe; color: #2563eb; font-style: italic; padding: 12px 16px; border-radius: 6px; }\n\
         footer { color: #808080; font-size: 11px; text-align: center; padding: 16px; }\n\
         </style>\n</head>\n<body>\n",
    );

    html.push_str(&format!(
        "<header>\n<h1>AXENT AI</h1>\n<p>Academic Progress Report</p>\n<p>Generated: {}</p>\n</header>\n<main>\n",
        snapshot.generated_at.format("%B %-d, %Y %H:%M")
    ));

    html.push_str("<h2>Student Information</h2>\n<table>\n<tr><th>Field</th><th>Value</th></tr>\n");
    html.push_str(&row(&["Name", or_na(&user.name)]));
    html.push_str(&row(&["Email", or_na(&user.email)]));
    html.push_str(&row(&["Branch", or_na(&user.branch)]));
    html.push_str(&row(&["Study Preference", user.energy_preference.label()]));
    html.push_str(&row(&[
        "Daily Study Hours",
        &format!("{}h weekday", user.daily_study_hours),
    ]));
    html.push_str("</table>\n");

    let topics_ratio = if m.total_topics > 0 {
        format!(
            "{}%",
            (m.completed_topics as f64 / m.total_topics as f64 * 100.0).round()
        )
    } else {
        "N/A".to_string()
    };
    html.push_str(
        "<h2>Performance Summary</h2>\n<table>\n<tr><th>Metric</th><th>Value</th><th>Status</th></tr>\n",
    );
    html.push_str(&row(&[
        "Overall Readiness",
        &format!("{}/100", m.overall_score),
        readiness_status(m.overall_score),
    ]));
    html.push_str(&row(&[
        "Task Completion",
        &format!("{}%", m.progress_percent),
        completion_status(m.progress_percent),
    ]));
    html.push_str(&row(&[
        "Topics Completed",
        &format!("{}/{}", m.completed_topics, m.total_topics),
        &topics_ratio,
    ]));
    html.push_str(&row(&[
        "Active Subjects",
        &m.active_subjects_count.to_string(),
        if m.active_subjects_count > 0 {
            "✓ Active"
        } else {
            "⚠ No Subjects"
        },
    ]));
    html.push_str(&row(&[
        "Weekly Study Capacity",
        &format!("{} hours", m.weekly_hours),
        capacity_status(m.weekly_hours),
    ]));
    html.push_str("</table>\n");

    if let Some(summary) = &snapshot.ai_summary {
        html.push_str(&format!(
            "<h2>AI-Powered Insights</h2>\n<p class=\"insights\">{}</p>\n",
            encode_text(summary)
        ));
    }

    html.push_str(
        "<h2>Subject Breakdown</h2>\n<table>\n<tr><th>Subject</th><th>Difficulty</th><th>Priority</th><th>Progress</th><th>%</th><th>Exam Date</th></tr>\n",
    );
    if snapshot.subjects.is_empty() {
        html.push_str(&row(&["No subjects defined yet", "-", "-", "-", "-", "-"]));
    }
    for subject in &snapshot.subjects {
        let topics: Vec<&Topic> = snapshot
            .topics
            .iter()
            .filter(|t| t.subject_id == subject.id)
            .collect();
        let done = topics
            .iter()
            .filter(|t| t.status == TopicStatus::Completed)
            .count();
        let percent = if topics.is_empty() {
            0.0
        } else {
            (done as f64 / topics.len() as f64 * 100.0).round()
        };
        html.push_str(&row(&[
            &subject.title,
            &subject.difficulty.to_string(),
            &format!("{}/5", subject.priority),
            &format!("{}/{}", done, topics.len()),
            &format!("{}%", percent),
            &subject.exam_date.format("%Y-%m-%d").to_string(),
        ]));
    }
    html.push_str("</table>\n");

    html.push_str("<h2>Recommended Actions</h2>\n<ul>\n");
    for rec in recommendations(m) {
        html.push_str(&format!("<li>{}</li>\n", encode_text(rec)));
    }
    html.push_str("</ul>\n</main>\n");

    html.push_str(
        "<footer>Generated by Axent AI - Powered by Tambo Intelligence</footer>\n</body>\n</html>\n",
    );
    html
}
