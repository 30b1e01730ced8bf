//! SQL MCP Server Library
//!
//! This library exposes one SQL database (PostgreSQL or SQLite) to AI
//! assistants over MCP: every table is a resource describing its columns,
//! a single `query` tool runs statements in a rolled-back read-only
//! transaction, and one fixed prompt nudges callers to schema-qualify tables.

pub mod config;
pub mod db;
pub mod error;
pub mod mcp;
pub mod models;
pub mod prompts;
pub mod resources;
pub mod tools;
pub mod transport;

pub use config::Config;
pub use error::DbError;
pub use mcp::SqlService;
