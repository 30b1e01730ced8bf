//! Resource URIs.
//!
//! A table resource lives at `<base>/<table>/schema/<schema>`, where `<base>` is
//! the connection URL with credentials, query and fragment removed and its last
//! path segment (the database name) dropped. Building and resolving are strict
//! inverses: `TableRef::from_uri(&base.table_uri(t, s))` yields `(t, s)` again.

use crate::error::{DbError, DbResult};
use percent_encoding::percent_decode_str;
use url::Url;

/// Path marker separating the table segment from the schema segment.
pub const SCHEMA_PATH: &str = "schema";

/// MIME type of every resource and of its contents.
pub const RESOURCE_MIME_TYPE: &str = "application/json";

/// Connection URL reduced to the part that prefixes every resource URI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceBase(Url);

impl ResourceBase {
    /// Derive the base from the startup connection string.
    ///
    /// `postgresql:` is normalized to `postgres:`. Username and password are
    /// stripped so resource URIs never carry credentials. A SQLite file path
    /// keeps its directory: `sqlite:/data/app.db` serves
    /// `sqlite:/data/<table>/schema/<schema>`, while a relative
    /// `sqlite:app.db` serves `sqlite:///<table>/schema/<schema>`.
    pub fn from_connection_string(connection_string: &str) -> DbResult<Self> {
        let parsed = Url::parse(connection_string)
            .map_err(|e| DbError::config(format!("Invalid database URL: {e}")))?;

        let scheme = match parsed.scheme() {
            "postgresql" => "postgres",
            other => other,
        };

        // sqlite:data.db has no hierarchical path to hang resources from.
        let mut url = if parsed.cannot_be_a_base() {
            Url::parse(&format!("{scheme}:///"))
                .map_err(|e| DbError::config(format!("Invalid database URL: {e}")))?
        } else {
            let mut url = parsed.clone();
            if url.scheme() != scheme && url.set_scheme(scheme).is_err() {
                return Err(DbError::config(format!(
                    "Cannot normalize URL scheme '{}'",
                    parsed.scheme()
                )));
            }
            url
        };

        // Both fail only for URLs without a host, which carry no credentials.
        let _ = url.set_username("");
        let _ = url.set_password(None);
        url.set_query(None);
        url.set_fragment(None);

        Ok(Self(url))
    }

    /// URI of the resource describing `schema.table`.
    pub fn table_uri(&self, table: &str, schema: &str) -> String {
        let mut url = self.0.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop().push(table).push(SCHEMA_PATH).push(schema);
        }
        url.to_string()
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl std::fmt::Display for ResourceBase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.0.as_str())
    }
}

/// A `(table, schema)` pair addressed by a resource URI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRef {
    pub table: String,
    pub schema: String,
}

impl TableRef {
    pub fn new(table: impl Into<String>, schema: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            schema: schema.into(),
        }
    }

    /// Resolve a resource URI: the last three path segments are schema, the
    /// `schema` marker and table, popped in that order.
    pub fn from_uri(uri: &str) -> DbResult<Self> {
        let url = Url::parse(uri)
            .map_err(|e| DbError::invalid_resource_uri(uri, format!("not a URL: {e}")))?;
        let mut segments: Vec<&str> = url
            .path_segments()
            .ok_or_else(|| DbError::invalid_resource_uri(uri, "URI has no path"))?
            .collect();

        let schema = segments.pop();
        let marker = segments.pop();
        let table = segments.pop();

        if marker != Some(SCHEMA_PATH) {
            return Err(DbError::invalid_resource_uri(
                uri,
                format!("expected a path ending in /<table>/{SCHEMA_PATH}/<schema>"),
            ));
        }

        let table = decode_segment(uri, table, "table")?;
        let schema = decode_segment(uri, schema, "schema")?;
        Ok(Self { table, schema })
    }

    /// Resource display name.
    pub fn display_name(&self) -> String {
        format!("\"{}\" table in schema \"{}\"", self.table, self.schema)
    }

    /// Resource description.
    pub fn description(&self) -> String {
        format!("Table \"{}\" in schema \"{}\"", self.table, self.schema)
    }
}

fn decode_segment(uri: &str, segment: Option<&str>, what: &str) -> DbResult<String> {
    let raw = segment.unwrap_or_default();
    let decoded = percent_decode_str(raw)
        .decode_utf8()
        .map_err(|_| DbError::invalid_resource_uri(uri, format!("{what} is not valid UTF-8")))?;
    if decoded.is_empty() {
        return Err(DbError::invalid_resource_uri(
            uri,
            format!("{what} segment is empty"),
        ));
    }
    Ok(decoded.into_owned())
}
