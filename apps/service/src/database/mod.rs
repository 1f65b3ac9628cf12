//! Database abstraction layer
//!
//! Job, metric and incident stores as traits, with a LibSQL backed
//! implementation and an in-memory one.

pub mod memory;
pub mod migrations;
pub mod models;
pub mod repository;

pub use memory::MemoryStore;
pub use repository::{IncidentStore, JobStore, LibsqlStore, MetricsStore};

use crate::error::StoreResult;

/// Initialize database with schema
pub async fn initialize_database(conn: &libsql::Connection) -> StoreResult<()> {
    migrations::run_migrations(conn).await
}
