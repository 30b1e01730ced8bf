//! Query execution tool.
//!
//! This module implements the `query` MCP tool. The statement is handed to the
//! database unparsed; read-only enforcement is the transaction's job. SQL errors
//! become error results the caller can read, not protocol errors.

use crate::db::{ConnectionManager, QueryExecutor};
use crate::error::DbError;
use crate::models::QueryInput;
use rmcp::ErrorData as McpError;
use rmcp::model::{CallToolResult, Content};
use std::sync::Arc;
use tracing::{info, warn};

/// Handler for the `query` tool.
pub struct QueryToolHandler {
    executor: QueryExecutor,
}

impl QueryToolHandler {
    pub fn new(connection_manager: Arc<ConnectionManager>) -> Self {
        Self {
            executor: QueryExecutor::new(connection_manager),
        }
    }

    /// Run the statement and package its rows as the tool result.
    ///
    /// Database errors produce a result with `isError: true` carrying the
    /// driver's message. Pool and internal failures are protocol errors.
    pub async fn query(&self, input: QueryInput) -> Result<CallToolResult, McpError> {
        info!(tool = "query", sql_len = input.sql.len(), "Running query tool");

        match self.executor.execute_read_only(&input.sql).await {
            Ok(result) => {
                info!(
                    rows = result.row_count(),
                    elapsed_ms = result.execution_time_ms,
                    "Query succeeded"
                );
                let text = result.to_json_text().map_err(|e| {
                    McpError::internal_error(format!("Failed to serialize rows: {e}"), None)
                })?;
                Ok(CallToolResult::success(vec![Content::text(text)]))
            }
            Err(err @ DbError::Database { .. }) => {
                warn!(error = %err, "Query failed");
                Ok(CallToolResult::error(vec![Content::text(
                    err.caller_message(),
                )]))
            }
            Err(err) => Err(err.into()),
        }
    }
}
