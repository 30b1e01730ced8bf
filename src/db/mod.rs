//! Database abstraction layer.
//!
//! This module provides database access functionality:
//! - Connection pool management and per-request leases
//! - Read-only query execution
//! - Schema introspection
//! - Row to JSON type mappings

pub mod executor;
pub mod pool;
pub mod schema;
pub mod types;

pub use executor::QueryExecutor;
pub use pool::{ConnectionManager, DbConnection, DbPool, PooledConnection};
pub use schema::SchemaInspector;
