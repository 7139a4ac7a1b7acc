//! Axent library crate
//!
//! Study planning for engineering students: AI-generated subject roadmaps,
//! an adaptive weekly planner, assistant tools, and progress reports, served
//! over HTTP and MCP.

pub mod api;
pub mod cli;
pub mod gateway;
pub mod guide;
pub mod models;
pub mod planner;
pub mod report;
pub mod roadmap;
pub mod store;
pub mod syllabus;
pub mod tools;

pub use gateway::{AiConfig, AiGateway, GatewayError, StreamingGateway};
pub use planner::{AdaptivePlanner, PlanError};
pub use roadmap::RoadmapBuilder;
pub use store::{Store, StoreError};
pub use tools::AssistantTools;
