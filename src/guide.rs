//! Guide module for generating context-appropriate help content
//!
//! The CLI and the MCP server describe the same workflow, so both guides are
//! assembled from shared sections plus a few mode-specific ones.

/// Mode for guide generation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuideMode {
    /// Command-line interface mode
    Cli,
    /// Model Context Protocol mode
    Mcp,
}

/// Generate a comprehensive guide string for the specified mode
pub fn get_guide_string(mode: GuideMode) -> String {
    let config = match mode {
        GuideMode::Cli => GuideConfig::cli(),
        GuideMode::Mcp => GuideConfig::mcp(),
    };

    format!(
        r#"=== {title} ===

{overview}

{getting_started}

{statuses}

{command_reference}

{planning_policy}

{closing_message}"#,
        title = config.title,
        overview = get_overview_section(),
        getting_started = config.getting_started,
        statuses = get_status_section(),
        command_reference = config.command_reference,
        planning_policy = get_planning_policy_section(),
        closing_message = config.closing_message
    )
}

struct GuideConfig {
    title: &'static str,
    getting_started: &'static str,
    command_reference: &'static str,
    closing_message: &'static str,
}

impl GuideConfig {
    fn cli() -> Self {
        Self {
            title: "AXENT GUIDE",
            getting_started: r#"== GETTING STARTED ==

1. START THE SERVER (state survives restarts when a state file is given):
   $ axent serve --state-file ~/.axent/state.json
   AI features need a key: export AXENT_AI_API_KEY=<key>

2. ONBOARD:
   $ axent onboard "Ada" "Computer Engineering" 2

3. BUILD A ROADMAP:
   $ axent roadmap branch              Replace subjects with a branch-wide roadmap
   $ axent roadmap subject "Compilers" Add one subject with its topics

4. PLAN THE WEEK:
   $ axent plan"#,
            command_reference: r#"== COMMAND REFERENCE ==

Global options:
  --server=<url>                         Server URL (default: http://localhost:3000, env AXENT_SERVER)

Server:
  $ axent serve [--port <PORT>] [--state-file <PATH>]
  $ axent mcp [--state-file <PATH>]      Serve the assistant tools over MCP on stdio

Profile and state:
  $ axent status                         Datastore and AI configuration
  $ axent onboard <NAME> <BRANCH> <YEAR>
  $ axent state                          Subjects, topics and profile
  $ axent logout

Study material:
  $ axent roadmap branch
  $ axent roadmap subject <TITLE>
  $ axent topic status <TOPIC_ID> <todo|in-progress|completed>
  $ axent syllabus <BRANCH> <YEAR>
  $ axent plan

Assistant:
  $ axent chat <MESSAGE>                 Queue a message for the chat view
  $ axent tool list
  $ axent tool call <NAME> [--args <JSON>]

Reports:
  $ axent report [--summary] [--output <PATH>]"#,
            closing_message: "Run `axent <command> --help` for the options of a single command.",
        }
    }

    fn mcp() -> Self {
        Self {
            title: "AXENT MCP GUIDE",
            getting_started: r#"== GETTING STARTED ==

The student's profile is set up outside MCP. Every tool works against that
profile: tools that need one report a failure message when nobody is onboarded."#,
            command_reference: r#"== MCP TOOL REFERENCE ==

  plan_subject(subject_name)                       Add a subject with an AI-generated topic roadmap
  generate_study_schedule()                        Build this week's adaptive plan
  get_topic_details(topic_title, subject_title)    Study notes for one topic
  list_my_subjects()                               Current subjects and their topics
  initialize_branch_roadmap()                      Replace subjects with a branch-wide roadmap
  list_syllabus_subjects(branch, year)             Syllabus subjects for a branch and year (1-4)"#,
            closing_message: "Prefer list_my_subjects before planning so answers reflect the student's own subjects.",
        }
    }
}

fn get_overview_section() -> &'static str {
    r#"== OVERVIEW ==

Axent keeps an engineering student's subjects and topics, generates learning
roadmaps with an AI model, and turns them into an adaptive weekly study plan."#
}

fn get_status_section() -> &'static str {
    r#"== TOPIC STATUS ==

  todo         Not started
  in-progress  Being studied
  completed    Done; completion date is recorded

A topic counts as weak while it is still todo or its weakness score is above 6.
Weak topics get extra time in generated plans."#
}

fn get_planning_policy_section() -> &'static str {
    r#"== HOW PLANS ARE BUILT ==

- Subjects with nearer exams, higher credits and lower confidence get more time
- Difficult subjects are scheduled at the student's peak energy time
- Weekdays respect the student's weekday hours, weekends their weekend hours
- The week ends with a revision block"#
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_guide_lists_commands() {
        let guide = get_guide_string(GuideMode::Cli);
        assert!(guide.starts_with("=== AXENT GUIDE ==="));
        assert!(guide.contains("axent roadmap branch"));
        assert!(!guide.contains("MCP TOOL REFERENCE"));
    }

    #[test]
    fn test_mcp_guide_lists_every_tool() {
        let guide = get_guide_string(GuideMode::Mcp);
        for tool in crate::tools::AssistantTools::catalog() {
            assert!(guide.contains(tool.name), "missing {}", tool.name);
        }
    }
}
