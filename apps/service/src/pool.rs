use deadpool::managed::{self, Pool, RecycleError, RecycleResult};
use libsql::{Builder, Connection, Database, Error as LibsqlError};

use crate::error::StoreError;

/// deadpool manager handing out libsql connections to one local database
pub struct LibsqlManager {
    database: Database,
}

impl LibsqlManager {
    pub fn new(database: Database) -> Self {
        Self { database }
    }
}

impl managed::Manager for LibsqlManager {
    type Type = Connection;
    type Error = LibsqlError;

    async fn create(&self) -> Result<Self::Type, Self::Error> {
        self.database.connect()
    }

    async fn recycle(
        &self,
        conn: &mut Self::Type,
        _: &managed::Metrics,
    ) -> RecycleResult<Self::Error> {
        conn.query("SELECT 1", ())
            .await?
            .next()
            .await?
            .ok_or_else(|| RecycleError::Message("liveness query returned no row".into()))?;
        Ok(())
    }
}

pub type LibsqlPool = Pool<LibsqlManager>;

/// Open (or create) the database file at `path` and wrap it in a pool
pub async fn open_pool(path: &str, max_size: usize) -> Result<LibsqlPool, StoreError> {
    let database = Builder::new_local(path).build().await?;
    Pool::builder(LibsqlManager::new(database))
        .max_size(max_size.max(1))
        .build()
        .map_err(|e| StoreError::Pool(e.to_string()))
}
