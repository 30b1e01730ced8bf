//! MCP tool implementations.
//!
//! The server exposes a single tool:
//! - `query`: run one SQL statement inside a read-only transaction that is
//!   always rolled back

pub mod query;

pub use query::QueryToolHandler;

use crate::error::DbError;
use std::str::FromStr;

/// Name of every tool the server answers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolName {
    Query,
}

impl ToolName {
    pub fn as_str(&self) -> &'static str {
        match self {
            ToolName::Query => "query",
        }
    }
}

impl FromStr for ToolName {
    type Err = DbError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "query" => Ok(ToolName::Query),
            other => Err(DbError::unknown_tool(other)),
        }
    }
}

impl std::fmt::Display for ToolName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_query() {
        assert_eq!("query".parse::<ToolName>().unwrap(), ToolName::Query);
        assert_eq!(ToolName::Query.to_string(), "query");
    }

    #[test]
    fn test_parse_is_case_sensitive() {
        assert!("Query".parse::<ToolName>().is_err());
    }

    #[test]
    fn test_unknown_tool_error() {
        let err = "execute".parse::<ToolName>().unwrap_err();
        assert!(matches!(err, DbError::UnknownTool { ref name } if name == "execute"));
        assert_eq!(err.to_string(), "Unknown tool: execute");
    }
}
