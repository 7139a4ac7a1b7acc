//! CLI module
//!
//! This module provides the command-line interface for axent: it starts the
//! HTTP or MCP server, and drives a running server through the API client.

use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Args, CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use colored::Colorize;
use rmcp::ServiceExt;
use serde_json::Value;
use tracing::info;

use crate::{
    api::{serve, AxentMcpServer, Client, ClientConfig, ServerConfig},
    gateway::{AiConfig, AiGateway, StreamingGateway, DEFAULT_BASE_URL, DEFAULT_USER_KEY},
    guide::{get_guide_string, GuideMode},
    models::{Subject, Topic, TopicStatus},
    store::Store,
    tools::{format_schedule_message, AssistantTools},
};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// API server URL
    #[arg(
        short,
        long,
        global = true,
        env = "AXENT_SERVER",
        default_value = "http://localhost:3000"
    )]
    server: String,
}

/// AI provider settings shared by the server commands
#[derive(Args, Debug, Clone)]
struct AiArgs {
    /// API key for the AI provider
    #[arg(long, env = "AXENT_AI_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Base URL of the AI provider
    #[arg(long, env = "AXENT_AI_BASE_URL", default_value = DEFAULT_BASE_URL)]
    ai_base_url: String,

    /// User key sent with every provider run
    #[arg(long, env = "AXENT_AI_USER_KEY", default_value = DEFAULT_USER_KEY)]
    ai_user_key: String,
}

impl AiArgs {
    fn config(&self) -> AiConfig {
        AiConfig {
            api_key: self.api_key.clone(),
            base_url: self.ai_base_url.clone(),
            user_key: self.ai_user_key.clone(),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Start the axent API server
    Serve {
        /// Port to listen on
        #[arg(short, long, env = "AXENT_PORT", default_value_t = 3000)]
        port: u16,

        /// File the application state is persisted to
        #[arg(long, env = "AXENT_STATE_FILE")]
        state_file: Option<PathBuf>,

        #[command(flatten)]
        ai: AiArgs,
    },

    /// Serve the assistant tools over MCP on stdio
    Mcp {
        /// File the application state is persisted to
        #[arg(long, env = "AXENT_STATE_FILE")]
        state_file: Option<PathBuf>,

        #[command(flatten)]
        ai: AiArgs,
    },

    /// Show datastore and AI configuration status
    Status,

    /// Sign in as a new student
    Onboard {
        name: String,
        branch: String,
        /// Academic year (1-4)
        #[arg(value_parser = clap::value_parser!(u8).range(1..=4))]
        year: u8,
    },

    /// Sign out and clear all subjects and topics
    Logout,

    /// Show the profile, subjects and topics
    State,

    /// Generate roadmaps with the AI model
    Roadmap {
        #[command(subcommand)]
        command: RoadmapCommands,
    },

    /// Generate this week's adaptive study plan
    Plan,

    /// List syllabus subjects for a branch and year
    Syllabus {
        branch: String,
        #[arg(value_parser = clap::value_parser!(u8).range(1..=4))]
        year: u8,
    },

    /// Topic management commands
    Topic {
        #[command(subcommand)]
        command: TopicCommands,
    },

    /// Queue a message for the assistant chat
    Chat { message: String },

    /// Assistant tool commands
    Tool {
        #[command(subcommand)]
        command: ToolCommands,
    },

    /// Download the progress report
    Report {
        /// Include an AI-written summary
        #[arg(long)]
        summary: bool,

        /// Where to write the report (defaults to the server's file name)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Interactive guide on how to use this tool
    Guide,

    /// Generate shell completions
    Completions {
        /// The shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Subcommand)]
enum RoadmapCommands {
    /// Replace all subjects with a roadmap for the student's branch
    Branch,
    /// Add one subject with its topics
    Subject { title: String },
}

#[derive(Subcommand)]
enum TopicCommands {
    /// Set the status of a topic
    Status {
        topic_id: String,
        /// todo, in-progress or completed
        status: TopicStatus,
    },
}

#[derive(Subcommand)]
enum ToolCommands {
    /// List the available tools
    List,
    /// Invoke a tool with JSON arguments
    Call {
        name: String,
        #[arg(long, default_value = "{}")]
        args: String,
    },
}

/// Run the CLI application
pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match &cli.command {
        Commands::Serve {
            port,
            state_file,
            ai,
        } => {
            tracing_subscriber::fmt::init();
            let tools = build_tools(state_file.as_ref(), ai)?;
            println!("Starting axent API server on port {}...", port);

            let config = ServerConfig {
                address: ([127, 0, 0, 1], *port).into(),
            };
            serve(tools, config).await?;
            Ok(())
        }

        Commands::Mcp { state_file, ai } => {
            // stdout carries the protocol
            tracing_subscriber::fmt()
                .with_writer(io::stderr)
                .with_ansi(false)
                .init();
            let tools = build_tools(state_file.as_ref(), ai)?;
            info!("Starting axent MCP server on stdio");

            let service = AxentMcpServer::new(tools)
                .serve(rmcp::transport::stdio())
                .await?;
            service.waiting().await?;
            Ok(())
        }

        Commands::Status => {
            let status = create_client(&cli.server).status().await?;
            let datastore = format!("{:?}", status.datastore).to_lowercase();
            println!("axent server {}", status.version);
            println!("  Datastore: {}", datastore);
            if status.ai_configured {
                println!("  AI: {}", "configured".green());
            } else {
                println!("  AI: {}", "not configured (set AXENT_AI_API_KEY)".yellow());
            }
            Ok(())
        }

        Commands::Onboard { name, branch, year } => {
            let state = create_client(&cli.server)
                .onboard(name, branch, *year)
                .await?;
            if let Some(user) = state.user {
                println!(
                    "Welcome, {}! {} year {}.",
                    user.name.bold(),
                    user.branch,
                    user.year
                );
                println!("Next: 'axent roadmap branch' to build your subject roadmap");
            }
            Ok(())
        }

        Commands::Logout => {
            create_client(&cli.server).logout().await?;
            println!("Signed out; subjects and topics were cleared");
            Ok(())
        }

        Commands::State => {
            let state = create_client(&cli.server).state().await?;
            match &state.user {
                Some(user) => println!(
                    "{} ({}, year {}) - {}h/day",
                    user.name.bold(),
                    user.branch,
                    user.year,
                    user.daily_study_hours
                ),
                None => {
                    println!("No student onboarded. Use 'axent onboard'.");
                    return Ok(());
                }
            }
            print_subjects(&state.subjects, &state.topics);
            Ok(())
        }

        Commands::Roadmap { command } => {
            let client = create_client(&cli.server);
            match command {
                RoadmapCommands::Branch => {
                    let state = client.branch_roadmap().await?;
                    if state.subjects.is_empty() {
                        println!(
                            "{}",
                            "No roadmap was generated. Is the AI provider configured?".yellow()
                        );
                    } else {
                        println!("Roadmap with {} subjects:", state.subjects.len());
                        print_subjects(&state.subjects, &state.topics);
                    }
                }
                RoadmapCommands::Subject { title } => {
                    let roadmap = client.subject_roadmap(title).await?;
                    println!("Added subject:");
                    print_subjects(
                        std::slice::from_ref(&roadmap.subject),
                        &roadmap.topics,
                    );
                }
            }
            Ok(())
        }

        Commands::Plan => {
            let plan = create_client(&cli.server).plan().await?;
            println!("{}", format_schedule_message(&plan));
            Ok(())
        }

        Commands::Syllabus { branch, year } => {
            let syllabus = create_client(&cli.server).syllabus(branch, *year).await?;
            if syllabus.subjects.is_empty() {
                println!("No syllabus subjects for '{}' year {}", branch, year);
                println!("Available branches: {}", syllabus.available_branches.join(", "));
            } else {
                println!("{} - year {}:", syllabus.branch.bold(), syllabus.year);
                for subject in &syllabus.subjects {
                    println!("  • {}", subject);
                }
            }
            Ok(())
        }

        Commands::Topic { command } => match command {
            TopicCommands::Status { topic_id, status } => {
                let topic = create_client(&cli.server)
                    .set_topic_status(topic_id, &status.to_string())
                    .await?;
                println!("Topic \"{}\" is now {}", topic.title, status_label(topic.status));
                Ok(())
            }
        },

        Commands::Chat { message } => {
            create_client(&cli.server).send_to_chat(message).await?;
            println!("Message queued for the assistant");
            Ok(())
        }

        Commands::Tool { command } => {
            let client = create_client(&cli.server);
            match command {
                ToolCommands::List => {
                    for tool in client.list_tools().await? {
                        let name = tool.get("name").and_then(Value::as_str).unwrap_or("?");
                        let description = tool
                            .get("description")
                            .and_then(Value::as_str)
                            .unwrap_or("");
                        println!("{}\n    {}", name.bold(), description);
                    }
                }
                ToolCommands::Call { name, args } => {
                    let args: Value = serde_json::from_str(args)?;
                    let result = client.invoke_tool(name, &args).await?;
                    println!("{}", serde_json::to_string_pretty(&result)?);
                }
            }
            Ok(())
        }

        Commands::Report { summary, output } => {
            let report = create_client(&cli.server).report(*summary).await?;
            let path = output
                .clone()
                .unwrap_or_else(|| PathBuf::from(&report.file_name));
            std::fs::write(&path, report.html)?;
            println!("Report written to {}", path.display());
            Ok(())
        }

        Commands::Guide => {
            println!("{}", get_guide_string(GuideMode::Cli));
            Ok(())
        }

        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            let bin_name = cmd.get_name().to_string();
            generate(*shell, &mut cmd, bin_name, &mut io::stdout());
            Ok(())
        }
    }
}

fn build_tools(
    state_file: Option<&PathBuf>,
    ai: &AiArgs,
) -> Result<AssistantTools, Box<dyn std::error::Error>> {
    let store = match state_file {
        Some(path) => Store::open(path)?,
        None => Store::in_memory(),
    };
    let gateway: Arc<dyn AiGateway> = Arc::new(StreamingGateway::from_config(&ai.config()));
    Ok(AssistantTools::new(store, gateway))
}

fn create_client(server_url: &str) -> Client {
    let config = ClientConfig {
        base_url: server_url.to_string(),
    };

    Client::with_config(config)
}

fn status_label(status: TopicStatus) -> String {
    match status {
        TopicStatus::Todo => "todo".normal().to_string(),
        TopicStatus::InProgress => "in progress".yellow().to_string(),
        TopicStatus::Completed => "completed".green().to_string(),
    }
}

fn print_subjects(subjects: &[Subject], topics: &[Topic]) {
    if subjects.is_empty() {
        println!("  No subjects yet. Add some with 'axent roadmap subject <TITLE>'");
        return;
    }

    for subject in subjects {
        println!(
            "\n{} [{:?}, priority {}] exam {}",
            subject.title.bold(),
            subject.difficulty,
            subject.priority,
            subject.exam_date
        );
        println!("  id: {}", subject.id.dimmed());
        for topic in topics.iter().filter(|t| t.subject_id == subject.id) {
            println!(
                "  - {} ({}h, {}) {}",
                topic.title,
                topic.estimated_hours,
                status_label(topic.status),
                topic.id.dimmed()
            );
        }
    }
}
