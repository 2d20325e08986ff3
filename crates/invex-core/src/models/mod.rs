//! Data models: configuration, schemas, records.

pub mod config;
pub mod record;
pub mod schema;

pub use config::InvexConfig;
pub use record::{NormalizedRecord, ResultSet};
pub use schema::{ExtractionSchema, SchemaBuilder, SchemaDefinition};
