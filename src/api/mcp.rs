//! Model Context Protocol (MCP) server implementation for axent
//!
//! This module exposes the assistant tools over MCP so a hosting
//! conversational agent can plan subjects, build schedules and browse the
//! syllabus on the student's behalf.

use rmcp::{model::*, tool, Error as McpError};

use crate::tools::AssistantTools;

/// MCP server wrapping the assistant tool surface
#[derive(Clone)]
pub struct AxentMcpServer {
    tools: AssistantTools,
}

impl AxentMcpServer {
    pub fn new(tools: AssistantTools) -> Self {
        Self { tools }
    }
}

/// Helper function to convert tool outputs to MCP CallToolResult
fn to_mcp_result<T: serde::Serialize>(output: T) -> Result<CallToolResult, McpError> {
    let json = serde_json::to_string_pretty(&output)
        .map_err(|e| McpError::internal_error(format!("Serialization error: {}", e), None))?;
    Ok(CallToolResult::success(vec![Content::text(json)]))
}

#[tool(tool_box)]
impl AxentMcpServer {
    #[tool(
        description = "Generate a learning roadmap for an engineering subject and add it to the student's subjects. Use when the user asks to plan, create a roadmap, or help learn a subject (e.g. Data Structures, Heat Transfer, Fluid Mechanics)."
    )]
    async fn plan_subject(
        &self,
        #[tool(param)] subject_name: String,
    ) -> Result<CallToolResult, McpError> {
        to_mcp_result(self.tools.plan_subject(&subject_name).await)
    }

    #[tool(
        description = "Generate a personalized adaptive weekly study plan. Use when the user asks to make a schedule, plan their week, or how they should study."
    )]
    async fn generate_study_schedule(&self) -> Result<CallToolResult, McpError> {
        to_mcp_result(self.tools.generate_study_schedule().await)
    }

    #[tool(
        description = "Get detailed study guidance for a specific topic in a subject: an introduction, key sub-concepts and a time allocation strategy."
    )]
    async fn get_topic_details(
        &self,
        #[tool(param)] topic_title: String,
        #[tool(param)] subject_title: String,
    ) -> Result<CallToolResult, McpError> {
        to_mcp_result(
            self.tools
                .get_topic_details(&topic_title, &subject_title)
                .await,
        )
    }

    #[tool(description = "List the student's current subjects and their topics")]
    async fn list_my_subjects(&self) -> Result<CallToolResult, McpError> {
        to_mcp_result(self.tools.list_my_subjects())
    }

    #[tool(
        description = "Create a full roadmap of subjects and topics for the student's engineering branch, replacing the current subjects"
    )]
    async fn initialize_branch_roadmap(&self) -> Result<CallToolResult, McpError> {
        to_mcp_result(self.tools.initialize_branch_roadmap().await)
    }

    #[tool(
        description = "List subjects from the engineering syllabus for a branch and academic year (1-4), along with every available branch"
    )]
    async fn list_syllabus_subjects(
        &self,
        #[tool(param)] branch: String,
        #[tool(param)] year: u8,
    ) -> Result<CallToolResult, McpError> {
        if !(1..=4).contains(&year) {
            return Err(McpError::invalid_params(
                format!("year must be between 1 and 4, got {}", year),
                None,
            ));
        }
        to_mcp_result(self.tools.list_syllabus_subjects(&branch, year))
    }
}

#[tool(tool_box)]
impl rmcp::ServerHandler for AxentMcpServer {
    fn get_info(&self) -> ServerInfo {
        let context = self.tools.context();
        ServerInfo {
            protocol_version: ProtocolVersion::default(),
            server_info: Implementation {
                name: "axent-mcp-server".into(),
                version: env!("CARGO_PKG_VERSION").into(),
            },
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            instructions: Some(format!(
                "Axent MCP Server - study planning for engineering students.\n{}\n{}\n{}",
                context.user_context, context.subjects_context, context.capabilities_context
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::{AiGateway, GatewayError};
    use crate::models::User;
    use crate::store::Store;
    use rmcp::ServerHandler;
    use std::sync::Arc;

    struct OfflineGateway;

    #[async_trait::async_trait]
    impl AiGateway for OfflineGateway {
        async fn generate_text(&self, _prompt: &str) -> Result<String, GatewayError> {
            Err(GatewayError::MissingApiKey)
        }

        fn is_configured(&self) -> bool {
            false
        }
    }

    fn server() -> AxentMcpServer {
        let store = Store::in_memory();
        store
            .set_user(User::onboard("Ada", "Civil Engineering", 2))
            .unwrap();
        AxentMcpServer::new(AssistantTools::new(store, Arc::new(OfflineGateway)))
    }

    #[test]
    fn test_info_carries_assistant_context() {
        let info = server().get_info();
        let instructions = info.instructions.unwrap();
        assert!(instructions.contains("Student: Ada. Branch: Civil Engineering."));
        assert!(instructions.contains("plan_subject"));
    }

    #[tokio::test]
    async fn test_syllabus_rejects_out_of_range_year() {
        let server = server();
        assert!(server
            .list_syllabus_subjects("Civil Engineering".to_string(), 0)
            .await
            .is_err());
        let result = server
            .list_syllabus_subjects("Civil Engineering".to_string(), 1)
            .await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_failed_generation_is_still_a_tool_result() {
        let result = server()
            .plan_subject("Hydrology".to_string())
            .await
            .unwrap();
        assert_eq!(result.is_error, Some(false));
    }
}
