use async_trait::async_trait;
use libsql::{Row, params};
use std::collections::BTreeSet;
use uuid::Uuid;

use super::models::{
    Incident, IncidentStatus, Job, JobType, SelectorType, i64_to_timestamp, timestamp_to_i64,
};
use crate::error::{StoreError, StoreResult};
use crate::monitoring::types::MetricsStats;
use crate::pool::{LibsqlManager, LibsqlPool};
use crate::validation::validate_job;

/// Read side of the job configuration; the engine never writes jobs
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Get a job by id
    async fn get_job(&self, id: Uuid) -> StoreResult<Option<Job>>;

    /// All configured jobs
    async fn list_jobs(&self) -> StoreResult<Vec<Job>>;

    /// Insert or replace a job after validating it
    async fn save_job(&self, job: &Job) -> StoreResult<Job>;
}

/// Append-only metrics history
#[async_trait]
pub trait MetricsStore: Send + Sync {
    async fn save(&self, metric: MetricsStats) -> StoreResult<MetricsStats>;

    /// Most recent metrics for a job, newest first
    async fn recent_for_job(&self, job_id: Uuid, limit: usize) -> StoreResult<Vec<MetricsStats>>;
}

#[async_trait]
pub trait IncidentStore: Send + Sync {
    /// Incidents tied to a job, most recently started first
    async fn find_by_job(&self, job_id: Uuid) -> StoreResult<Vec<Incident>>;

    /// Upsert by incident id
    ///
    /// Fails with [`StoreError::Conflict`] when another incident already
    /// exists for the same job.
    async fn save(&self, incident: Incident) -> StoreResult<Incident>;

    /// All incidents currently OPENED
    async fn find_active(&self) -> StoreResult<Vec<Incident>>;

    /// Incidents affecting a component
    async fn find_by_component(&self, component_id: &str) -> StoreResult<Vec<Incident>>;
}

const JOB_COLUMNS: &str = "uuid, name, job_type, url, selector, selector_type, endpoint_response_type, http_status_code, component_ids, start_on, end_on";
const METRIC_COLUMNS: &str = "uuid, job_uuid, status, detailed_info, created_at";
const INCIDENT_COLUMNS: &str =
    "uuid, job_uuid, name, description, status, date_start, date_end, component_ids, updated_at";

/// LibSQL backed implementation of all three stores
pub struct LibsqlStore {
    pool: LibsqlPool,
}

impl LibsqlStore {
    /// Create a store from an existing pool; the schema must already exist
    pub fn new_from_pool(pool: LibsqlPool) -> Self {
        Self { pool }
    }

    /// Open the database at `path` and bring its schema up to date
    pub async fn open(path: &str, max_connections: usize) -> StoreResult<Self> {
        let pool = crate::pool::open_pool(path, max_connections).await?;
        let store = Self::new_from_pool(pool);
        let conn = store.get_conn().await?;
        super::initialize_database(&conn).await?;
        Ok(store)
    }

    async fn get_conn(&self) -> StoreResult<deadpool::managed::Object<LibsqlManager>> {
        self.pool.get().await.map_err(|e| StoreError::Pool(e.to_string()))
    }

    async fn query_incidents(
        &self,
        sql: &str,
        params: impl libsql::params::IntoParams,
    ) -> StoreResult<Vec<Incident>> {
        let conn = self.get_conn().await?;
        let mut rows = conn.query(sql, params).await?;
        let mut incidents = Vec::new();

        while let Some(row) = rows.next().await? {
            incidents.push(row_to_incident(&row)?);
        }

        Ok(incidents)
    }
}

fn parse_uuid(raw: &str) -> StoreResult<Uuid> {
    Uuid::parse_str(raw).map_err(|e| StoreError::Corrupt(format!("bad uuid '{raw}': {e}")))
}

fn parse_timestamp(millis: i64) -> StoreResult<chrono::DateTime<chrono::Utc>> {
    i64_to_timestamp(millis).ok_or_else(|| StoreError::Corrupt(format!("bad timestamp {millis}")))
}

fn encode_components(ids: &BTreeSet<String>) -> StoreResult<String> {
    serde_json::to_string(ids).map_err(|e| StoreError::Corrupt(e.to_string()))
}

fn decode_components(raw: &str) -> StoreResult<BTreeSet<String>> {
    serde_json::from_str(raw).map_err(|e| StoreError::Corrupt(format!("bad component ids: {e}")))
}

fn map_write_error(error: libsql::Error) -> StoreError {
    if error.to_string().contains("UNIQUE constraint failed") {
        StoreError::Conflict
    } else {
        StoreError::Query(error)
    }
}

fn row_to_job(row: &Row) -> StoreResult<Job> {
    let uuid: String = row.get(0)?;
    let job_type: String = row.get(2)?;
    let selector_type: Option<String> = row.get(5)?;
    let response_type: Option<String> = row.get(6)?;
    let status_code: Option<i64> = row.get(7)?;
    let components: String = row.get(8)?;

    Ok(Job {
        id: parse_uuid(&uuid)?,
        name: row.get(1)?,
        job_type: job_type.parse().unwrap_or(JobType::Unknown),
        url: row.get(3)?,
        selector: row.get(4)?,
        selector_type: selector_type.map(|_| SelectorType::Xpath),
        endpoint_response_type: response_type
            .map(|raw| raw.parse())
            .transpose()
            .map_err(StoreError::Corrupt)?,
        http_status_code: status_code
            .map(|code| {
                u16::try_from(code).map_err(|_| StoreError::Corrupt(format!("bad status {code}")))
            })
            .transpose()?,
        component_ids: decode_components(&components)?,
        start_on: row.get::<Option<i64>>(9)?.map(parse_timestamp).transpose()?,
        end_on: row.get::<Option<i64>>(10)?.map(parse_timestamp).transpose()?,
    })
}

fn row_to_metric(row: &Row) -> StoreResult<MetricsStats> {
    let uuid: String = row.get(0)?;
    let job_uuid: String = row.get(1)?;
    let status: String = row.get(2)?;

    Ok(MetricsStats {
        id: parse_uuid(&uuid)?,
        job_id: parse_uuid(&job_uuid)?,
        status: status.parse().map_err(StoreError::Corrupt)?,
        detailed_info: row.get(3)?,
        created_at: parse_timestamp(row.get(4)?)?,
    })
}

fn row_to_incident(row: &Row) -> StoreResult<Incident> {
    let uuid: String = row.get(0)?;
    let job_uuid: String = row.get(1)?;
    let status: String = row.get(4)?;
    let components: String = row.get(7)?;

    Ok(Incident {
        id: parse_uuid(&uuid)?,
        job_id: parse_uuid(&job_uuid)?,
        name: row.get(2)?,
        description: row.get(3)?,
        status: status.parse::<IncidentStatus>().map_err(StoreError::Corrupt)?,
        date_start: parse_timestamp(row.get(5)?)?,
        date_end: row.get::<Option<i64>>(6)?.map(parse_timestamp).transpose()?,
        component_ids: decode_components(&components)?,
        updated_at: row.get::<Option<i64>>(8)?.map(parse_timestamp).transpose()?,
    })
}

#[async_trait]
impl JobStore for LibsqlStore {
    async fn get_job(&self, id: Uuid) -> StoreResult<Option<Job>> {
        let conn = self.get_conn().await?;
        let mut rows = conn
            .query(&format!("SELECT {JOB_COLUMNS} FROM jobs WHERE uuid = ?"), params![id.to_string()])
            .await?;

        match rows.next().await? {
            Some(row) => Ok(Some(row_to_job(&row)?)),
            None => Ok(None),
        }
    }

    async fn list_jobs(&self) -> StoreResult<Vec<Job>> {
        let conn = self.get_conn().await?;
        let mut rows = conn.query(&format!("SELECT {JOB_COLUMNS} FROM jobs ORDER BY name"), ()).await?;
        let mut jobs = Vec::new();

        while let Some(row) = rows.next().await? {
            jobs.push(row_to_job(&row)?);
        }

        Ok(jobs)
    }

    async fn save_job(&self, job: &Job) -> StoreResult<Job> {
        validate_job(job).to_result()?;
        let conn = self.get_conn().await?;

        conn.execute(
            &format!("INSERT OR REPLACE INTO jobs ({JOB_COLUMNS}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"),
            params![
                job.id.to_string(),
                job.name.clone(),
                job.job_type.to_string(),
                job.url.clone(),
                job.selector.clone(),
                job.selector_type.map(|_| "XPATH".to_string()),
                job.endpoint_response_type.map(|t| t.to_string()),
                job.http_status_code.map(i64::from),
                encode_components(&job.component_ids)?,
                job.start_on.map(timestamp_to_i64),
                job.end_on.map(timestamp_to_i64)
            ],
        )
        .await
        .map_err(map_write_error)?;

        tracing::debug!(job_id = %job.id, "Saved job {}", job.name);
        Ok(job.clone())
    }
}

#[async_trait]
impl MetricsStore for LibsqlStore {
    async fn save(&self, metric: MetricsStats) -> StoreResult<MetricsStats> {
        let conn = self.get_conn().await?;

        conn.execute(
            &format!("INSERT INTO metrics_stats ({METRIC_COLUMNS}) VALUES (?, ?, ?, ?, ?)"),
            params![
                metric.id.to_string(),
                metric.job_id.to_string(),
                metric.status.to_string(),
                metric.detailed_info.clone(),
                timestamp_to_i64(metric.created_at)
            ],
        )
        .await
        .map_err(map_write_error)?;

        Ok(metric)
    }

    async fn recent_for_job(&self, job_id: Uuid, limit: usize) -> StoreResult<Vec<MetricsStats>> {
        let conn = self.get_conn().await?;
        let mut rows = conn
            .query(
                &format!(
                    "SELECT {METRIC_COLUMNS} FROM metrics_stats WHERE job_uuid = ? ORDER BY created_at DESC LIMIT ?"
                ),
                params![job_id.to_string(), limit as i64],
            )
            .await?;
        let mut metrics = Vec::new();

        while let Some(row) = rows.next().await? {
            metrics.push(row_to_metric(&row)?);
        }

        Ok(metrics)
    }
}

#[async_trait]
impl IncidentStore for LibsqlStore {
    async fn find_by_job(&self, job_id: Uuid) -> StoreResult<Vec<Incident>> {
        self.query_incidents(
            &format!("SELECT {INCIDENT_COLUMNS} FROM incidents WHERE job_uuid = ? ORDER BY date_start DESC"),
            params![job_id.to_string()],
        )
        .await
    }

    async fn save(&self, incident: Incident) -> StoreResult<Incident> {
        let conn = self.get_conn().await?;

        conn.execute(
            &format!(
                "INSERT INTO incidents ({INCIDENT_COLUMNS}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
                 ON CONFLICT(uuid) DO UPDATE SET
                    name = excluded.name,
                    description = excluded.description,
                    status = excluded.status,
                    date_start = excluded.date_start,
                    date_end = excluded.date_end,
                    component_ids = excluded.component_ids,
                    updated_at = excluded.updated_at"
            ),
            params![
                incident.id.to_string(),
                incident.job_id.to_string(),
                incident.name.clone(),
                incident.description.clone(),
                incident.status.to_string(),
                timestamp_to_i64(incident.date_start),
                incident.date_end.map(timestamp_to_i64),
                encode_components(&incident.component_ids)?,
                incident.updated_at.map(timestamp_to_i64)
            ],
        )
        .await
        .map_err(map_write_error)?;

        tracing::debug!(incident_id = %incident.id, job_id = %incident.job_id, "Saved incident ({})", incident.status);
        Ok(incident)
    }

    async fn find_active(&self) -> StoreResult<Vec<Incident>> {
        self.query_incidents(
            &format!("SELECT {INCIDENT_COLUMNS} FROM incidents WHERE status = ? ORDER BY date_start DESC"),
            params![IncidentStatus::Opened.to_string()],
        )
        .await
    }

    async fn find_by_component(&self, component_id: &str) -> StoreResult<Vec<Incident>> {
        self.query_incidents(
            &format!(
                "SELECT {INCIDENT_COLUMNS} FROM incidents
                 WHERE EXISTS (SELECT 1 FROM json_each(incidents.component_ids) WHERE json_each.value = ?)
                 ORDER BY date_start DESC"
            ),
            params![component_id.to_string()],
        )
        .await
    }
}
