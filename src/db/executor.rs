//! Read-only query execution.
//!
//! Every statement runs on its own leased connection inside a transaction that
//! is never committed:
//!
//! 1. acquire a lease from the [`ConnectionManager`]
//! 2. begin a read-only transaction
//! 3. execute the statement once, unprepared-cached, collecting every row
//! 4. roll back, whatever the outcome of step 3
//! 5. drop the lease
//!
//! # Architecture
//!
//! The executor uses database-specific implementations organized in submodules:
//! - `postgres`: `BEGIN TRANSACTION READ ONLY`; the statement goes through the
//!   extended protocol, so multi-statement strings are rejected by the server
//! - `sqlite`: plain `BEGIN` on a pool opened read-only with `query_only`; the
//!   connection is closed after every call, so TEMP objects or pragmas created
//!   by a smuggled `COMMIT` never reach the next caller
//!
//! A call that is cancelled before its `ROLLBACK` completes (the request future
//! is dropped) closes its connection instead of returning it to the pool
//! mid-transaction.
//!
//! No SQL parsing or allow-listing happens here. The database enforces read-only.

use crate::db::pool::{ConnectionManager, DbConnection};
use crate::db::types::RowToJson;
use crate::error::DbResult;
use crate::models::QueryResult;
use sqlx::Executor;
use sqlx::pool::PoolConnection;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

/// Query executor that runs caller-supplied SQL without side effects.
#[derive(Debug, Clone)]
pub struct QueryExecutor {
    connection_manager: Arc<ConnectionManager>,
}

impl QueryExecutor {
    pub fn new(connection_manager: Arc<ConnectionManager>) -> Self {
        Self { connection_manager }
    }

    /// Execute `sql` inside a rolled-back read-only transaction and return its rows.
    ///
    /// Execution errors are returned unchanged. A failed rollback is logged and
    /// does not replace the statement's own result.
    pub async fn execute_read_only(&self, sql: &str) -> DbResult<QueryResult> {
        let start = Instant::now();
        debug!(sql = %sql, "Executing read-only query");

        let mut lease = self.connection_manager.acquire().await?;

        let rows = match lease.connection() {
            DbConnection::Postgres(conn) => postgres::run_read_only(conn, sql).await?,
            DbConnection::SQLite(conn) => sqlite::run_read_only(conn, sql).await?,
        };
        drop(lease);

        let execution_time_ms = start.elapsed().as_millis() as u64;
        debug!(
            rows = rows.len(),
            elapsed_ms = execution_time_ms,
            "Query completed"
        );
        Ok(QueryResult::new(rows, execution_time_ms))
    }
}

type JsonRow = serde_json::Map<String, serde_json::Value>;

/// Closes the borrowed connection on drop unless `ROLLBACK` completed.
struct RollbackGuard<'c, DB: sqlx::Database> {
    conn: &'c mut PoolConnection<DB>,
    rolled_back: bool,
}

impl<'c, DB: sqlx::Database> RollbackGuard<'c, DB> {
    fn new(conn: &'c mut PoolConnection<DB>) -> Self {
        Self {
            conn,
            rolled_back: false,
        }
    }
}

impl<DB: sqlx::Database> Drop for RollbackGuard<'_, DB> {
    fn drop(&mut self) {
        if !self.rolled_back {
            debug!("Transaction not rolled back, closing connection");
            self.conn.close_on_drop();
        }
    }
}

// =============================================================================
// Database-Specific Implementations
// =============================================================================

mod postgres {
    use super::*;
    use sqlx::Postgres;

    pub async fn run_read_only(
        conn: &mut PoolConnection<Postgres>,
        sql: &str,
    ) -> DbResult<Vec<JsonRow>> {
        let mut guard = RollbackGuard::new(conn);

        (&mut **guard.conn)
            .execute(sqlx::raw_sql("BEGIN TRANSACTION READ ONLY"))
            .await?;

        let result = (&mut **guard.conn)
            .fetch_all(sqlx::query(sql).persistent(false))
            .await;

        match (&mut **guard.conn).execute(sqlx::raw_sql("ROLLBACK")).await {
            Ok(_) => guard.rolled_back = true,
            Err(e) => warn!(error = %e, "Could not roll back transaction"),
        }
        drop(guard);

        Ok(result?.iter().map(RowToJson::to_json_map).collect())
    }
}

mod sqlite {
    use super::*;
    use sqlx::Sqlite;

    pub async fn run_read_only(
        conn: &mut PoolConnection<Sqlite>,
        sql: &str,
    ) -> DbResult<Vec<JsonRow>> {
        // Session state must not outlive the call.
        conn.close_on_drop();
        let mut guard = RollbackGuard::new(conn);

        (&mut **guard.conn).execute(sqlx::raw_sql("BEGIN")).await?;

        let result = (&mut **guard.conn)
            .fetch_all(sqlx::query(sql).persistent(false))
            .await;

        match (&mut **guard.conn).execute(sqlx::raw_sql("ROLLBACK")).await {
            Ok(_) => guard.rolled_back = true,
            Err(e) => warn!(error = %e, "Could not roll back transaction"),
        }
        drop(guard);

        Ok(result?.iter().map(RowToJson::to_json_map).collect())
    }
}
