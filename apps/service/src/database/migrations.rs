use libsql::Connection;

use crate::error::StoreResult;

/// Schema version - increment when making schema changes
const SCHEMA_VERSION: i32 = 2;

/// Run database migrations
///
/// Applies every migration newer than the version recorded in
/// `schema_migrations`, in order.
pub async fn run_migrations(conn: &Connection) -> StoreResult<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            applied_at INTEGER NOT NULL,
            description TEXT
        )",
        (),
    )
    .await?;

    let current_version = get_current_version(conn).await?;

    if current_version >= SCHEMA_VERSION {
        tracing::info!("Database schema is up to date (version {})", current_version);
        return Ok(());
    }

    tracing::info!("Running migrations from version {} to {}", current_version, SCHEMA_VERSION);

    if current_version < 1 {
        run_migration_v1(conn).await?;
        record_migration(conn, 1, "Jobs and metrics history").await?;
    }

    if current_version < 2 {
        run_migration_v2(conn).await?;
        record_migration(conn, 2, "Incidents with one incident per job").await?;
    }

    tracing::info!("Database migrations completed successfully (now at version {})", SCHEMA_VERSION);
    Ok(())
}

async fn get_current_version(conn: &Connection) -> StoreResult<i32> {
    let mut rows = conn.query("SELECT MAX(version) FROM schema_migrations", ()).await?;

    if let Some(row) = rows.next().await? {
        let version: Option<i32> = row.get(0)?;
        Ok(version.unwrap_or(0))
    } else {
        Ok(0)
    }
}

async fn record_migration(conn: &Connection, version: i32, description: &str) -> StoreResult<()> {
    let now = chrono::Utc::now().timestamp();

    conn.execute(
        "INSERT INTO schema_migrations (version, applied_at, description) VALUES (?, ?, ?)",
        libsql::params![version, now, description],
    )
    .await?;

    tracing::info!("Applied migration v{}: {}", version, description);
    Ok(())
}

/// Migration v1: jobs and the append-only metrics history
async fn run_migration_v1(conn: &Connection) -> StoreResult<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS jobs (
            uuid TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            job_type TEXT NOT NULL,
            url TEXT NOT NULL,
            selector TEXT,
            selector_type TEXT,
            endpoint_response_type TEXT,
            http_status_code INTEGER,
            component_ids TEXT NOT NULL DEFAULT '[]',
            start_on INTEGER,
            end_on INTEGER
        )",
        (),
    )
    .await?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS metrics_stats (
            uuid TEXT PRIMARY KEY,
            job_uuid TEXT NOT NULL,
            status TEXT NOT NULL,
            detailed_info TEXT NOT NULL,
            created_at INTEGER NOT NULL
        )",
        (),
    )
    .await?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_metrics_stats_job_created ON metrics_stats(job_uuid, created_at DESC)",
        (),
    )
    .await?;

    Ok(())
}

/// Migration v2: incidents
///
/// The unique index on `job_uuid` backs the one-incident-per-job rule; the
/// correlator reopens the existing row instead of inserting another.
async fn run_migration_v2(conn: &Connection) -> StoreResult<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS incidents (
            uuid TEXT PRIMARY KEY,
            job_uuid TEXT NOT NULL,
            name TEXT NOT NULL,
            description TEXT NOT NULL,
            status TEXT NOT NULL,
            date_start INTEGER NOT NULL,
            date_end INTEGER,
            component_ids TEXT NOT NULL DEFAULT '[]',
            updated_at INTEGER
        )",
        (),
    )
    .await?;

    conn.execute(
        "CREATE UNIQUE INDEX IF NOT EXISTS idx_incidents_job_uuid ON incidents(job_uuid)",
        (),
    )
    .await?;
    conn.execute("CREATE INDEX IF NOT EXISTS idx_incidents_status ON incidents(status)", ()).await?;

    Ok(())
}
