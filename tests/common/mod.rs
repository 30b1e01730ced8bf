//! Shared helpers for integration tests.

#![allow(dead_code)]

use sql_mcp_server::config::PoolOptions;
use sql_mcp_server::db::ConnectionManager;
use sql_mcp_server::models::ConnectionConfig;
use sqlx::sqlite::SqliteConnectOptions;
use sqlx::{ConnectOptions, Connection};
use std::str::FromStr;
use std::sync::Arc;
use tempfile::TempDir;

/// A SQLite file seeded through a writable connection, served read-only.
pub struct SqliteFixture {
    /// Keeps the file alive for the duration of the test
    _dir: TempDir,
    pub url: String,
    pub manager: Arc<ConnectionManager>,
}

/// Create a SQLite database, run `setup_sql` against it, then connect the
/// read-only manager used by the server.
pub async fn sqlite_fixture(setup_sql: &str) -> SqliteFixture {
    let dir = TempDir::new().expect("create temp dir");
    let url = format!("sqlite:{}", dir.path().join("test.db").display());

    let mut seed = SqliteConnectOptions::from_str(&url)
        .expect("parse sqlite url")
        .create_if_missing(true)
        .connect()
        .await
        .expect("open seed connection");
    sqlx::raw_sql(setup_sql)
        .execute(&mut seed)
        .await
        .expect("seed database");
    seed.close().await.expect("close seed connection");

    let config = ConnectionConfig::new(url.clone(), PoolOptions::default()).unwrap();
    let manager = Arc::new(ConnectionManager::connect(config).await.unwrap());

    SqliteFixture {
        _dir: dir,
        url,
        manager,
    }
}

pub const USERS_SQL: &str = "
    CREATE TABLE users (id integer, name text);
    INSERT INTO users VALUES (1, 'ada'), (2, 'grace');
";
