//! Table resources.
//!
//! - `uri`: building and resolving `<base>/<table>/schema/<schema>` URIs
//! - `handler`: listing tables and reading their column descriptors

pub mod handler;
pub mod uri;

pub use handler::ResourceHandler;
pub use uri::{RESOURCE_MIME_TYPE, ResourceBase, TableRef};
