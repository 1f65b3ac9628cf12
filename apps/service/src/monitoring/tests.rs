/// Integration tests for the execution engine
///
/// These tests verify end-to-end functionality of:
/// - Probe dispatch → incident correlation → metric persistence
/// - Incident lifecycle across consecutive executions
/// - Per-job serialization of concurrent executions
use crate::database::models::{EndpointResponseType, Incident, IncidentStatus, Job, JobType};
use crate::database::{IncidentStore, JobStore, LibsqlStore, MemoryStore, MetricsStore};
use crate::error::{EngineError, StoreError, StoreResult};
use crate::monitoring::engine::ExecutionEngine;
use crate::monitoring::http::HttpResponse;
use crate::monitoring::probes::{DomProbe, EndpointProbe, StatusCodeProbe};
use crate::monitoring::testing::{FakeBrowser, PageBehaviour, ScriptedHttp};
use crate::monitoring::types::{MetricsStats, MetricsStatus};
use crate::monitoring::workers::BlockingPool;
use crate::monitoring::JobDispatcher;
use anyhow::Result;
use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

const USERS: &str = include_str!("../../testdata/users.json");

/// Helper to build an engine over scripted collaborators
fn create_engine(
    http: ScriptedHttp,
    browser: FakeBrowser,
    metrics: Arc<dyn MetricsStore>,
    incidents: Arc<dyn IncidentStore>,
) -> ExecutionEngine {
    let http = Arc::new(http);
    let workers = Arc::new(BlockingPool::new("dom-e2e", 1, 4).unwrap());
    let dispatcher = JobDispatcher::new(
        Arc::new(DomProbe::new(Arc::new(browser), workers, Duration::from_secs(5))),
        Arc::new(StatusCodeProbe::new(http.clone(), Duration::from_secs(3))),
        Arc::new(EndpointProbe::new(http)),
    );
    ExecutionEngine::new(dispatcher, metrics, incidents)
}

fn memory_engine(http: ScriptedHttp, store: &Arc<MemoryStore>) -> ExecutionEngine {
    create_engine(http, FakeBrowser::new(PageBehaviour::Visible), store.clone(), store.clone())
}

fn status_job() -> Job {
    Job::status_code("TestJob", "https://example.com", 200, ["123".to_string(), "456".to_string()])
}

#[tokio::test]
async fn test_failed_status_check_opens_incident() -> Result<()> {
    let store = Arc::new(MemoryStore::new());
    let engine = memory_engine(ScriptedHttp::status(504), &store);
    let job = status_job();

    let metric = engine.execute(&job).await?.expect("status code jobs produce a metric");
    assert_eq!(metric.status, MetricsStatus::Fail);
    assert!(metric.detailed_info.contains("504"));

    let incidents = store.find_by_job(job.id).await?;
    assert_eq!(incidents.len(), 1);
    assert_eq!(incidents[0].status, IncidentStatus::Opened);
    assert_eq!(incidents[0].component_ids, job.component_ids);
    assert_eq!(incidents[0].description, metric.detailed_info);
    assert!(incidents[0].date_end.is_none());

    assert_eq!(store.all_metrics().await, vec![metric]);
    Ok(())
}

#[tokio::test]
async fn test_recovery_resolves_open_incident() -> Result<()> {
    let store = Arc::new(MemoryStore::new());
    let job = status_job();
    let started = Utc::now() - ChronoDuration::minutes(15);
    IncidentStore::save(store.as_ref(), Incident::open_for(&job, "Incident info", started)).await?;

    let engine = memory_engine(ScriptedHttp::status(200), &store);
    let metric = engine.execute(&job).await?.unwrap();
    assert_eq!(metric.status, MetricsStatus::Success);

    let incident = store.find_by_job(job.id).await?.remove(0);
    assert_eq!(incident.status, IncidentStatus::Resolved);
    assert_eq!(incident.date_start, started);
    assert!(incident.date_end.is_some());
    assert!(incident.updated_at.is_some());
    Ok(())
}

#[tokio::test]
async fn test_failure_reopens_resolved_incident() -> Result<()> {
    let store = Arc::new(MemoryStore::new());
    let job = status_job();
    let mut previous = Incident::open_for(&job, "Incident info", Utc::now() - ChronoDuration::hours(2));
    previous.status = IncidentStatus::Resolved;
    previous.date_end = Some(Utc::now() - ChronoDuration::hours(1));
    IncidentStore::save(store.as_ref(), previous.clone()).await?;

    let engine = memory_engine(ScriptedHttp::status(500), &store);
    let metric = engine.execute(&job).await?.unwrap();

    let incidents = store.all_incidents().await;
    assert_eq!(incidents.len(), 1);
    let reopened = &incidents[0];
    assert_eq!(reopened.id, previous.id);
    assert_eq!(reopened.status, IncidentStatus::Opened);
    assert_eq!(reopened.description, metric.detailed_info);
    assert!(reopened.date_end.is_none());
    assert!(reopened.date_start >= previous.date_end.unwrap());
    Ok(())
}

#[tokio::test]
async fn test_success_without_incident_writes_only_metric() -> Result<()> {
    let store = Arc::new(MemoryStore::new());
    let engine = memory_engine(ScriptedHttp::body(200, USERS), &store);
    let job = Job::endpoint(
        "FindJSON",
        "https://example.com/users",
        EndpointResponseType::Json,
        "$[0].address.zipcode",
        ["123".to_string()],
    );

    let metric = engine.execute(&job).await?.unwrap();
    assert_eq!(metric.status, MetricsStatus::Success);
    assert_eq!(metric.detailed_info, "Extracted value: 92998-3874");

    assert!(store.all_incidents().await.is_empty());
    assert_eq!(store.all_metrics().await.len(), 1);
    Ok(())
}

#[tokio::test]
async fn test_incident_lifecycle_over_repeated_runs() -> Result<()> {
    let store = Arc::new(MemoryStore::new());
    let http = ScriptedHttp::sequence(vec![
        Ok(HttpResponse { status: 503, body: String::new() }),
        Ok(HttpResponse { status: 503, body: String::new() }),
        Ok(HttpResponse { status: 200, body: String::new() }),
        Ok(HttpResponse { status: 200, body: String::new() }),
    ]);
    let engine = memory_engine(http, &store);
    let job = status_job();

    let mut statuses = Vec::new();
    for _ in 0..4 {
        engine.execute(&job).await?;
        statuses.push(store.find_by_job(job.id).await?.first().map(|i| i.status));
    }

    assert_eq!(
        statuses,
        vec![
            Some(IncidentStatus::Opened),
            Some(IncidentStatus::Opened),
            Some(IncidentStatus::Resolved),
            Some(IncidentStatus::Resolved),
        ]
    );
    assert_eq!(store.all_incidents().await.len(), 1);
    assert_eq!(store.recent_for_job(job.id, 10).await?.len(), 4);
    Ok(())
}

#[tokio::test]
async fn test_screenshot_job_is_skipped() -> Result<()> {
    let store = Arc::new(MemoryStore::new());
    let http = ScriptedHttp::status(500);
    let engine = memory_engine(http.clone(), &store);
    let job = Job::new("Screenshot", JobType::Screenshot, "https://example.com", ["123".to_string()]);

    assert!(engine.execute(&job).await?.is_none());
    assert_eq!(http.calls(), 0);
    assert!(store.all_metrics().await.is_empty());
    assert!(store.all_incidents().await.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_missing_dom_element_opens_incident() -> Result<()> {
    let store = Arc::new(MemoryStore::new());
    let browser = FakeBrowser::new(PageBehaviour::Missing);
    let engine = create_engine(ScriptedHttp::status(200), browser.clone(), store.clone(), store.clone());
    let job = Job::dom_node("home", "https://example.com", "//div[@id='missing']", ["123".to_string()]);

    let metric = engine.execute(&job).await?.unwrap();
    assert_eq!(metric.status, MetricsStatus::Fail);
    assert!(metric.detailed_info.starts_with("DOM does not contain specified element."));
    assert_eq!(browser.closed(), 1);
    assert_eq!(store.find_active().await?.len(), 1);
    Ok(())
}

#[tokio::test]
async fn test_concurrent_executions_of_one_job_are_serialized() -> Result<()> {
    let store = Arc::new(MemoryStore::new());
    let http = ScriptedHttp::delayed(
        Duration::from_millis(50),
        HttpResponse { status: 504, body: String::new() },
    );
    let engine = memory_engine(http, &store);
    let job = status_job();

    // Without the gate both runs would see no incident and the second insert would conflict
    let (first, second) = tokio::join!(engine.execute(&job), engine.execute(&job));
    first?;
    second?;

    assert_eq!(store.all_incidents().await.len(), 1);
    assert_eq!(store.all_metrics().await.len(), 2);
    Ok(())
}

#[tokio::test]
async fn test_execute_by_id_reports_unknown_job() -> Result<()> {
    let store = Arc::new(MemoryStore::new());
    let engine = memory_engine(ScriptedHttp::status(200), &store);
    let job = status_job();
    store.save_job(&job).await?;

    assert!(engine.execute_by_id(store.as_ref(), job.id).await?.is_some());

    let missing = Uuid::new_v4();
    let result = engine.execute_by_id(store.as_ref(), missing).await;
    assert!(matches!(result, Err(EngineError::JobNotFound(id)) if id == missing));
    Ok(())
}

/// Metrics store whose backend is gone
struct UnavailableMetrics;

#[async_trait]
impl MetricsStore for UnavailableMetrics {
    async fn save(&self, _metric: MetricsStats) -> StoreResult<MetricsStats> {
        Err(StoreError::Pool("connection refused".to_string()))
    }

    async fn recent_for_job(&self, _job_id: Uuid, _limit: usize) -> StoreResult<Vec<MetricsStats>> {
        Err(StoreError::Pool("connection refused".to_string()))
    }
}

#[tokio::test]
async fn test_store_failure_fails_the_execution() {
    let store = Arc::new(MemoryStore::new());
    let engine = create_engine(
        ScriptedHttp::status(200),
        FakeBrowser::new(PageBehaviour::Visible),
        Arc::new(UnavailableMetrics),
        store,
    );

    let result = engine.execute(&status_job()).await;
    assert!(matches!(result, Err(EngineError::Store(StoreError::Pool(_)))));
}

#[tokio::test]
async fn test_engine_over_libsql_store() -> Result<()> {
    let temp_dir = tempfile::tempdir()?;
    let db_path = temp_dir.path().join("engine.db");
    let store = Arc::new(LibsqlStore::open(&db_path.to_string_lossy(), 2).await?);
    let job = status_job();
    store.save_job(&job).await?;

    let failing = create_engine(
        ScriptedHttp::status(504),
        FakeBrowser::new(PageBehaviour::Visible),
        store.clone(),
        store.clone(),
    );
    failing.execute_by_id(store.as_ref(), job.id).await?;

    let opened = store.find_by_job(job.id).await?;
    assert_eq!(opened.len(), 1);
    assert_eq!(opened[0].status, IncidentStatus::Opened);
    assert_eq!(store.find_by_component("456").await?.len(), 1);

    let recovering = create_engine(
        ScriptedHttp::status(200),
        FakeBrowser::new(PageBehaviour::Visible),
        store.clone(),
        store.clone(),
    );
    recovering.execute_by_id(store.as_ref(), job.id).await?;

    let resolved = store.find_by_job(job.id).await?;
    assert_eq!(resolved.len(), 1);
    assert_eq!(resolved[0].id, opened[0].id);
    assert_eq!(resolved[0].status, IncidentStatus::Resolved);
    assert!(store.find_active().await?.is_empty());

    let history = store.recent_for_job(job.id, 10).await?;
    assert_eq!(history.len(), 2);
    assert!(history.iter().any(|m| m.status == MetricsStatus::Success));
    Ok(())
}
