//! Query-related data models.
//!
//! This module defines the request and result types for the `query` tool.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Arguments of the `query` tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct QueryInput {
    /// SQL statement to run inside a read-only transaction that is always rolled back.
    pub sql: String,
}

impl QueryInput {
    pub fn new(sql: impl Into<String>) -> Self {
        Self { sql: sql.into() }
    }
}

/// Rows produced by one tool call. Not retained after the response is sent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResult {
    pub rows: Vec<serde_json::Map<String, JsonValue>>,
    pub execution_time_ms: u64,
}

impl QueryResult {
    pub fn new(rows: Vec<serde_json::Map<String, JsonValue>>, execution_time_ms: u64) -> Self {
        Self {
            rows,
            execution_time_ms,
        }
    }

    /// Get the number of rows in the result.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Tool payload: the row array as pretty-printed JSON.
    pub fn to_json_text(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&self.rows)
    }
}
