//! Resource listing and reading.
//!
//! Each table is one resource. Listing reads the catalog; reading resolves the
//! URI back to `(table, schema)` and returns its column descriptors as JSON.

use crate::db::{ConnectionManager, SchemaInspector};
use crate::error::{DbError, DbResult};
use crate::resources::uri::{RESOURCE_MIME_TYPE, ResourceBase, TableRef};
use rmcp::model::{AnnotateAble, RawResource, ReadResourceResult, Resource, ResourceContents};
use std::sync::Arc;
use tracing::{debug, info};

/// Handler for resource operations.
#[derive(Debug, Clone)]
pub struct ResourceHandler {
    connection_manager: Arc<ConnectionManager>,
    base: ResourceBase,
}

impl ResourceHandler {
    /// Create a handler whose URIs derive from the manager's connection string.
    pub fn new(connection_manager: Arc<ConnectionManager>) -> DbResult<Self> {
        let base = ResourceBase::from_connection_string(
            &connection_manager.config().connection_string,
        )?;
        Ok(Self {
            connection_manager,
            base,
        })
    }

    pub fn base(&self) -> &ResourceBase {
        &self.base
    }

    /// List one resource per table, ordered by schema then table name.
    pub async fn list_resources(&self) -> DbResult<Vec<Resource>> {
        let tables = {
            let mut conn = self.connection_manager.acquire().await?;
            SchemaInspector::list_tables(&mut conn).await?
        };

        let resources: Vec<Resource> = tables
            .into_iter()
            .map(|entry| {
                let table_ref = TableRef::new(entry.name, entry.schema);
                let uri = self.base.table_uri(&table_ref.table, &table_ref.schema);
                let mut raw = RawResource::new(uri, table_ref.display_name());
                raw.description = Some(table_ref.description());
                raw.mime_type = Some(RESOURCE_MIME_TYPE.to_string());
                raw.no_annotation()
            })
            .collect();

        info!(count = resources.len(), "Listed resources");
        Ok(resources)
    }

    /// Read the column descriptors of the table addressed by `uri`.
    ///
    /// The URI is resolved before a connection is acquired.
    pub async fn read_resource(&self, uri: &str) -> DbResult<ReadResourceResult> {
        let table_ref = TableRef::from_uri(uri)?;
        debug!(table = %table_ref.table, schema = %table_ref.schema, "Resolved resource URI");

        let columns = {
            let mut conn = self.connection_manager.acquire().await?;
            SchemaInspector::describe_table(&mut conn, &table_ref.table, &table_ref.schema)
                .await?
        };

        let text = serde_json::to_string_pretty(&columns)
            .map_err(|e| DbError::internal(format!("Failed to serialize columns: {e}")))?;

        let mut contents = ResourceContents::text(text, uri);
        if let ResourceContents::TextResourceContents { mime_type, .. } = &mut contents {
            *mime_type = Some(RESOURCE_MIME_TYPE.to_string());
        }

        info!(uri = %uri, columns = columns.len(), "Read resource");
        Ok(ReadResourceResult {
            contents: vec![contents],
        })
    }
}
