//! MCP service implementation using rmcp.
//!
//! This module defines the SqlService struct: table resources, the `query`
//! tool and the fixed prompt catalog, exposed via the MCP protocol using the
//! rmcp framework's macros. Tool calls are dispatched by hand so that an
//! unknown tool name fails before any connection is touched.

use crate::db::ConnectionManager;
use crate::error::DbResult;
use crate::models::QueryInput;
use crate::prompts;
use crate::resources::ResourceHandler;
use crate::tools::{QueryToolHandler, ToolName};
use rmcp::{
    ErrorData as McpError, RoleServer, ServerHandler,
    handler::server::tool::{ToolCallContext, ToolRouter},
    handler::server::wrapper::Parameters,
    model::{
        CallToolRequestParam, CallToolResult, GetPromptRequestParam, GetPromptResult,
        Implementation, ListPromptsResult, ListResourcesResult, ListToolsResult,
        PaginatedRequestParam, ProtocolVersion, ReadResourceRequestParam, ReadResourceResult,
        ServerCapabilities, ServerInfo,
    },
    service::RequestContext,
    tool, tool_router,
};
use std::sync::Arc;
use tracing::{info, instrument};

#[derive(Clone)]
pub struct SqlService {
    /// Shared connection manager; the only state shared between requests
    connection_manager: Arc<ConnectionManager>,
    /// Table listing and column descriptors
    resources: ResourceHandler,
    /// Tool router for MCP tool dispatch (auto-generated)
    tool_router: ToolRouter<Self>,
}

impl SqlService {
    /// Create a new SqlService instance.
    ///
    /// Fails only if resource URIs cannot be derived from the connection string.
    pub fn new(connection_manager: Arc<ConnectionManager>) -> DbResult<Self> {
        let resources = ResourceHandler::new(Arc::clone(&connection_manager))?;
        Ok(Self {
            connection_manager,
            resources,
            tool_router: Self::tool_router(),
        })
    }

    pub fn connection_manager(&self) -> &Arc<ConnectionManager> {
        &self.connection_manager
    }
}

#[tool_router]
impl SqlService {
    #[tool(name = "query", description = "Run a read-only SQL query")]
    async fn query(
        &self,
        Parameters(input): Parameters<QueryInput>,
    ) -> Result<CallToolResult, McpError> {
        QueryToolHandler::new(Arc::clone(&self.connection_manager))
            .query(input)
            .await
    }
}

impl ServerHandler for SqlService {
    fn get_info(&self) -> ServerInfo {
        let connection = self.connection_manager.info();
        let database = match &connection.server_version {
            Some(version) => format!("{} {}", connection.database_type, version),
            None => connection.database_type.to_string(),
        };

        ServerInfo {
            protocol_version: ProtocolVersion::V_2025_03_26,
            capabilities: ServerCapabilities::builder()
                .enable_tools()
                .enable_resources()
                .enable_prompts()
                .build(),
            server_info: Implementation {
                name: "sql-mcp-server".to_owned(),
                title: Some("SQL MCP Server".to_owned()),
                version: env!("CARGO_PKG_VERSION").to_owned(),
                icons: None,
                website_url: None,
            },
            instructions: Some(format!(
                "Read-only access to a single SQL database ({database}).\n\
                \n\
                ## Workflow\n\
                1. Call `resources/list` to see every table; each resource is one table\n\
                2. Read a table resource to get its columns as JSON (`column_name`, `data_type`)\n\
                3. Call the `query` tool with `sql` to run a statement\n\
                \n\
                ## Notes\n\
                - Every statement runs in a read-only transaction that is always rolled back\n\
                - Qualify table names with their schema (e.g. `public.users`)\n\
                - SQL errors are returned as tool errors with the database's message"
            )),
        }
    }

    #[instrument(skip(self, _context))]
    async fn list_resources(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListResourcesResult, McpError> {
        info!("Listing resources");
        let resources = self.resources.list_resources().await?;
        Ok(ListResourcesResult {
            resources,
            next_cursor: None,
            meta: None,
        })
    }

    #[instrument(skip(self, _context))]
    async fn read_resource(
        &self,
        request: ReadResourceRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> Result<ReadResourceResult, McpError> {
        info!(uri = %request.uri, "Reading resource");
        Ok(self.resources.read_resource(&request.uri).await?)
    }

    #[instrument(skip(self, _context))]
    async fn list_tools(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, McpError> {
        Ok(ListToolsResult {
            tools: self.tool_router.list_all(),
            next_cursor: None,
            meta: None,
        })
    }

    #[instrument(skip(self, request, context), fields(tool = %request.name))]
    async fn call_tool(
        &self,
        request: CallToolRequestParam,
        context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, McpError> {
        let tool: ToolName = request.name.parse()?;
        info!(tool = %tool, "Calling tool");
        let tcc = ToolCallContext::new(self, request, context);
        self.tool_router.call(tcc).await
    }

    #[instrument(skip(self, _context))]
    async fn list_prompts(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListPromptsResult, McpError> {
        info!("Listing prompts");
        Ok(ListPromptsResult {
            prompts: prompts::list_prompts(),
            next_cursor: None,
            meta: None,
        })
    }

    #[instrument(skip(self, _context))]
    async fn get_prompt(
        &self,
        request: GetPromptRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> Result<GetPromptResult, McpError> {
        info!(prompt = %request.name, "Getting prompt");
        Ok(prompts::get_prompt(&request.name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ConnectionConfig;
    use tempfile::TempDir;

    async fn create_test_service(dir: &TempDir) -> SqlService {
        let path = dir.path().join("service.db");
        std::fs::File::create(&path).unwrap();
        let url = format!("sqlite:{}", path.display());
        let config = ConnectionConfig::new(url, Default::default()).unwrap();
        let manager = Arc::new(ConnectionManager::connect(config).await.unwrap());
        SqlService::new(manager).unwrap()
    }

    #[tokio::test]
    async fn test_server_info() {
        let dir = TempDir::new().unwrap();
        let service = create_test_service(&dir).await;
        let info = service.get_info();
        assert_eq!(info.server_info.name, "sql-mcp-server");
        assert!(info.capabilities.tools.is_some());
        assert!(info.capabilities.resources.is_some());
        assert!(info.capabilities.prompts.is_some());

        // The SQLite version is read once at connect time.
        let instructions = info.instructions.unwrap();
        let version = service.connection_manager().info().server_version.unwrap();
        assert!(instructions.contains(&format!("SQLite {version}")), "{instructions}");
    }

    #[tokio::test]
    async fn test_single_query_tool() {
        let dir = TempDir::new().unwrap();
        let service = create_test_service(&dir).await;
        let tools = service.tool_router.list_all();
        assert_eq!(tools.len(), 1);
        assert_eq!(tools[0].name, "query");
        assert_eq!(
            tools[0].description.as_deref(),
            Some("Run a read-only SQL query")
        );
        let schema = serde_json::Value::Object((*tools[0].input_schema).clone());
        assert_eq!(schema["properties"]["sql"]["type"], "string");
    }
}
