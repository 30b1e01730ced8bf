//! Schema introspection module.
//!
//! This module provides the catalog reads behind resources: enumerating tables
//! with their owning schema, and describing the columns of one table.
//!
//! # Architecture
//!
//! SQL queries are organized in the `queries` submodule with constants for each
//! database type. Database-specific implementations are in their respective
//! submodules (postgres, sqlite), each providing the same interface. Table and
//! schema names are always bound as parameters, never interpolated.

use crate::db::pool::{DbConnection, PooledConnection};
use crate::error::DbResult;
use crate::models::{ColumnDescriptor, TableEntry};
use tracing::debug;

/// Schema inspector for database introspection.
pub struct SchemaInspector;

impl SchemaInspector {
    /// List every table and view with its owning schema, ordered by schema then name.
    pub async fn list_tables(conn: &mut PooledConnection) -> DbResult<Vec<TableEntry>> {
        match conn.connection() {
            DbConnection::Postgres(c) => postgres::list_tables(c).await,
            DbConnection::SQLite(c) => sqlite::list_tables(c).await,
        }
    }

    /// Describe the columns of `schema.table` in ordinal order.
    ///
    /// An unknown table (or schema) yields an empty list rather than an error.
    pub async fn describe_table(
        conn: &mut PooledConnection,
        table_name: &str,
        schema_name: &str,
    ) -> DbResult<Vec<ColumnDescriptor>> {
        match conn.connection() {
            DbConnection::Postgres(c) => postgres::describe_table(c, table_name, schema_name).await,
            DbConnection::SQLite(c) => sqlite::describe_table(c, table_name, schema_name).await,
        }
    }
}

// =============================================================================
// SQL Query Templates
// =============================================================================

mod queries {
    pub mod postgres {
        // information_schema columns are sql_identifier domains; cast so they decode as text.
        pub const LIST_TABLES: &str = r#"
            SELECT
                table_name::text AS name,
                table_schema::text AS schema
            FROM information_schema.tables
            ORDER BY table_schema, table_name
            "#;

        pub const DESCRIBE_COLUMNS: &str = r#"
            SELECT
                column_name::text AS column_name,
                data_type::text AS data_type
            FROM information_schema.columns
            WHERE table_name = $1
            AND table_schema = $2
            ORDER BY ordinal_position
            "#;
    }

    pub mod sqlite {
        pub const LIST_TABLES: &str = r#"
            SELECT name, 'main' AS schema
            FROM main.sqlite_master
            WHERE type IN ('table', 'view')
            AND name NOT LIKE 'sqlite_%'
            ORDER BY name
            "#;

        pub const SCHEMA_EXISTS: &str = "SELECT name FROM pragma_database_list WHERE name = ?1";

        pub const DESCRIBE_COLUMNS: &str = r#"
            SELECT name AS column_name, type AS data_type
            FROM pragma_table_info(?1, ?2)
            ORDER BY cid
            "#;
    }
}

// =============================================================================
// Database-Specific Implementations
// =============================================================================

mod postgres {
    use super::*;
    use sqlx::{PgConnection, Row};

    pub async fn list_tables(conn: &mut PgConnection) -> DbResult<Vec<TableEntry>> {
        let rows = sqlx::query(queries::postgres::LIST_TABLES)
            .fetch_all(&mut *conn)
            .await?;

        let tables = rows
            .iter()
            .map(|row| -> DbResult<TableEntry> {
                Ok(TableEntry::new(
                    row.try_get::<String, _>("name")?,
                    row.try_get::<String, _>("schema")?,
                ))
            })
            .collect::<DbResult<Vec<_>>>()?;

        debug!(count = tables.len(), "Listed PostgreSQL tables");
        Ok(tables)
    }

    pub async fn describe_table(
        conn: &mut PgConnection,
        table_name: &str,
        schema_name: &str,
    ) -> DbResult<Vec<ColumnDescriptor>> {
        let rows = sqlx::query(queries::postgres::DESCRIBE_COLUMNS)
            .bind(table_name)
            .bind(schema_name)
            .fetch_all(&mut *conn)
            .await?;

        let columns = rows
            .iter()
            .map(|row| -> DbResult<ColumnDescriptor> {
                Ok(ColumnDescriptor::new(
                    row.try_get::<String, _>("column_name")?,
                    row.try_get::<String, _>("data_type")?,
                ))
            })
            .collect::<DbResult<Vec<_>>>()?;

        debug!(
            table = table_name,
            schema = schema_name,
            count = columns.len(),
            "Described PostgreSQL table"
        );
        Ok(columns)
    }
}

mod sqlite {
    use super::*;
    use sqlx::{Row, SqliteConnection};

    pub async fn list_tables(conn: &mut SqliteConnection) -> DbResult<Vec<TableEntry>> {
        let rows = sqlx::query(queries::sqlite::LIST_TABLES)
            .fetch_all(&mut *conn)
            .await?;

        let tables = rows
            .iter()
            .map(|row| -> DbResult<TableEntry> {
                Ok(TableEntry::new(
                    row.try_get::<String, _>("name")?,
                    row.try_get::<String, _>("schema")?,
                ))
            })
            .collect::<DbResult<Vec<_>>>()?;

        debug!(count = tables.len(), "Listed SQLite tables");
        Ok(tables)
    }

    pub async fn describe_table(
        conn: &mut SqliteConnection,
        table_name: &str,
        schema_name: &str,
    ) -> DbResult<Vec<ColumnDescriptor>> {
        // pragma_table_info errors on an unknown schema; report it as "no columns".
        let schema_exists = sqlx::query(queries::sqlite::SCHEMA_EXISTS)
            .bind(schema_name)
            .fetch_optional(&mut *conn)
            .await?
            .is_some();
        if !schema_exists {
            debug!(schema = schema_name, "Unknown SQLite schema");
            return Ok(Vec::new());
        }

        let rows = sqlx::query(queries::sqlite::DESCRIBE_COLUMNS)
            .bind(table_name)
            .bind(schema_name)
            .fetch_all(&mut *conn)
            .await?;

        let columns = rows
            .iter()
            .map(|row| -> DbResult<ColumnDescriptor> {
                Ok(ColumnDescriptor::new(
                    row.try_get::<String, _>("column_name")?,
                    row.try_get::<String, _>("data_type")?,
                ))
            })
            .collect::<DbResult<Vec<_>>>()?;

        debug!(
            table = table_name,
            schema = schema_name,
            count = columns.len(),
            "Described SQLite table"
        );
        Ok(columns)
    }
}
