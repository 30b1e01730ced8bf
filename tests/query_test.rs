//! Integration tests for the read-only query tool against SQLite.

mod common;

use common::{USERS_SQL, sqlite_fixture};
use rmcp::model::CallToolResult;
use sql_mcp_server::db::QueryExecutor;
use sql_mcp_server::error::DbError;
use sql_mcp_server::models::QueryInput;
use sql_mcp_server::tools::QueryToolHandler;
use std::sync::Arc;

fn rows_of(result: &CallToolResult) -> serde_json::Value {
    let text = &result.content[0].as_text().expect("text content").text;
    serde_json::from_str(text).expect("rows are JSON")
}

#[tokio::test]
async fn test_write_statements_leave_data_unchanged() {
    let fixture = sqlite_fixture(USERS_SQL).await;
    let handler = QueryToolHandler::new(Arc::clone(&fixture.manager));

    for sql in [
        "INSERT INTO users VALUES (3, 'linus')",
        "UPDATE users SET name = 'x'",
        "DELETE FROM users",
        "DROP TABLE users",
        "CREATE TABLE other (id integer)",
    ] {
        let result = handler.query(QueryInput::new(sql)).await.unwrap();
        assert_eq!(result.is_error, Some(true), "sql: {sql}");
        assert_eq!(fixture.manager.active_leases(), 0, "sql: {sql}");
    }

    let result = handler
        .query(QueryInput::new("SELECT id, name FROM users ORDER BY id"))
        .await
        .unwrap();
    assert_eq!(
        rows_of(&result),
        serde_json::json!([
            { "id": 1, "name": "ada" },
            { "id": 2, "name": "grace" }
        ])
    );
}

#[tokio::test]
async fn test_commit_smuggling_cannot_write() {
    let fixture = sqlite_fixture(USERS_SQL).await;
    let executor = QueryExecutor::new(Arc::clone(&fixture.manager));

    let result = executor
        .execute_read_only("COMMIT; INSERT INTO users VALUES (9, 'mallory')")
        .await;
    assert!(result.is_err());

    let count = executor
        .execute_read_only("SELECT COUNT(*) AS n FROM users")
        .await
        .unwrap();
    assert_eq!(count.rows[0]["n"], serde_json::json!(2));
    assert_eq!(fixture.manager.active_leases(), 0);
}

#[tokio::test]
async fn test_temp_table_cannot_shadow_real_table() {
    let fixture = sqlite_fixture(USERS_SQL).await;
    let executor = QueryExecutor::new(Arc::clone(&fixture.manager));

    // Whatever this returns, no later caller may see an empty `users`.
    let _ = executor
        .execute_read_only("COMMIT; CREATE TEMP TABLE users (id integer, name text); BEGIN")
        .await;

    let count = executor
        .execute_read_only("SELECT COUNT(*) AS n FROM users")
        .await
        .unwrap();
    assert_eq!(count.rows[0]["n"], serde_json::json!(2));
    assert_eq!(fixture.manager.active_leases(), 0);
}

#[tokio::test]
async fn test_session_state_does_not_carry_over_between_calls() {
    let fixture = sqlite_fixture(USERS_SQL).await;
    let executor = QueryExecutor::new(Arc::clone(&fixture.manager));

    // Switching query_only off only lasts for the connection it ran on.
    executor
        .execute_read_only("COMMIT; PRAGMA query_only = OFF; BEGIN")
        .await
        .unwrap();
    let result = executor
        .execute_read_only("COMMIT; CREATE TEMP VIEW users AS SELECT 0 AS id, 'x' AS name; BEGIN")
        .await;
    assert!(result.is_err());

    let query_only = executor
        .execute_read_only("PRAGMA query_only")
        .await
        .unwrap();
    assert_eq!(query_only.rows[0]["query_only"], serde_json::json!(1));

    let rows = executor
        .execute_read_only("SELECT id, name FROM users ORDER BY id")
        .await
        .unwrap();
    assert_eq!(
        serde_json::to_value(&rows.rows).unwrap(),
        serde_json::json!([
            { "id": 1, "name": "ada" },
            { "id": 2, "name": "grace" }
        ])
    );
    assert_eq!(fixture.manager.active_leases(), 0);
}

#[tokio::test]
async fn test_sql_error_carries_database_message() {
    let fixture = sqlite_fixture(USERS_SQL).await;
    let executor = QueryExecutor::new(Arc::clone(&fixture.manager));

    let err = executor
        .execute_read_only("SELECT * FROM nowhere")
        .await
        .unwrap_err();

    match err {
        DbError::Database { message, .. } => assert!(message.contains("nowhere")),
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(fixture.manager.active_leases(), 0);
}

#[tokio::test]
async fn test_empty_result_is_empty_array() {
    let fixture = sqlite_fixture(USERS_SQL).await;
    let handler = QueryToolHandler::new(Arc::clone(&fixture.manager));

    let result = handler
        .query(QueryInput::new("SELECT * FROM users WHERE id > 100"))
        .await
        .unwrap();

    assert_eq!(result.is_error, Some(false));
    assert_eq!(rows_of(&result), serde_json::json!([]));
}

#[tokio::test]
async fn test_value_types() {
    let fixture = sqlite_fixture(
        "CREATE TABLE samples (i integer, r real, t text, b blob, n integer, flag boolean);
         INSERT INTO samples VALUES (42, 1.5, 'héllo', x'cafe', NULL, 1);",
    )
    .await;
    let handler = QueryToolHandler::new(Arc::clone(&fixture.manager));

    let result = handler
        .query(QueryInput::new("SELECT i, r, t, b, n, flag FROM samples"))
        .await
        .unwrap();

    let rows = rows_of(&result);
    let row = &rows[0];
    assert_eq!(row["i"], serde_json::json!(42));
    assert_eq!(row["r"], serde_json::json!(1.5));
    assert_eq!(row["t"], serde_json::json!("héllo"));
    assert_eq!(row["b"], serde_json::json!("yv4="));
    assert_eq!(row["n"], serde_json::Value::Null);
    assert_eq!(row["flag"], serde_json::json!(true));
}

#[tokio::test]
async fn test_concurrent_queries_release_every_lease() {
    let fixture = sqlite_fixture(USERS_SQL).await;
    let manager = Arc::clone(&fixture.manager);

    let mut handles = Vec::new();
    for i in 0..8 {
        let manager = Arc::clone(&manager);
        handles.push(tokio::spawn(async move {
            let handler = QueryToolHandler::new(manager);
            let sql = if i % 2 == 0 {
                "SELECT COUNT(*) AS n FROM users"
            } else {
                "SELECT * FROM missing"
            };
            handler.query(QueryInput::new(sql)).await.unwrap()
        }));
    }

    for (i, handle) in handles.into_iter().enumerate() {
        let result = handle.await.unwrap();
        assert_eq!(result.is_error, Some(i % 2 == 1));
    }
    assert_eq!(manager.active_leases(), 0);
    assert_eq!(manager.total_acquired(), 8);
}
