use std::collections::HashMap;
use std::sync::{Arc, Mutex, Weak};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use uuid::Uuid;

use super::dispatcher::JobDispatcher;
use super::http::ReqwestHttpClient;
use super::incident::IncidentCorrelator;
use super::probes::{DomProbe, EndpointProbe, StatusCodeProbe};
use super::types::MetricsStats;
use super::workers::BlockingPool;
use crate::browser::WebDriverBrowser;
use crate::config::Config;
use crate::database::models::Job;
use crate::database::{IncidentStore, JobStore, MetricsStore};
use crate::error::EngineError;

/// Name prefix of the DOM worker threads
const DOM_POOL_NAME: &str = "dom-probe";

/// Per-job single-flight gates
///
/// Entries only live while some execution holds or waits for the gate.
#[derive(Default)]
pub struct JobGates {
    gates: Mutex<HashMap<Uuid, Weak<AsyncMutex<()>>>>,
}

impl JobGates {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait until no other execution of `job_id` is running
    pub async fn acquire(&self, job_id: Uuid) -> OwnedMutexGuard<()> {
        let gate = {
            let mut gates = match self.gates.lock() {
                Ok(gates) => gates,
                Err(poisoned) => poisoned.into_inner(),
            };
            gates.retain(|_, gate| gate.strong_count() > 0);

            match gates.get(&job_id).and_then(Weak::upgrade) {
                Some(gate) => gate,
                None => {
                    let gate = Arc::new(AsyncMutex::new(()));
                    gates.insert(job_id, Arc::downgrade(&gate));
                    gate
                }
            }
        };

        gate.lock_owned().await
    }

    /// Jobs with a running or waiting execution
    pub fn active(&self) -> usize {
        match self.gates.lock() {
            Ok(gates) => gates.values().filter(|gate| gate.strong_count() > 0).count(),
            Err(poisoned) => poisoned.into_inner().values().filter(|gate| gate.strong_count() > 0).count(),
        }
    }
}

/// Runs one job end to end: probe, incident correlation, metric persistence
pub struct ExecutionEngine {
    dispatcher: JobDispatcher,
    correlator: IncidentCorrelator,
    metrics: Arc<dyn MetricsStore>,
    gates: JobGates,
}

impl ExecutionEngine {
    pub fn new(
        dispatcher: JobDispatcher,
        metrics: Arc<dyn MetricsStore>,
        incidents: Arc<dyn IncidentStore>,
    ) -> Self {
        Self {
            dispatcher,
            correlator: IncidentCorrelator::new(incidents),
            metrics,
            gates: JobGates::new(),
        }
    }

    /// Build the production probes from `config`
    ///
    /// Spawns the DOM worker threads; call once per process.
    pub fn from_config(
        config: &Config,
        metrics: Arc<dyn MetricsStore>,
        incidents: Arc<dyn IncidentStore>,
    ) -> Result<Self, EngineError> {
        let http = Arc::new(
            ReqwestHttpClient::new(&config.http)
                .map_err(|e| EngineError::Setup(format!("HTTP client: {e}")))?,
        );
        let workers = Arc::new(
            BlockingPool::new(DOM_POOL_NAME, config.browser.workers, config.browser.queue_capacity)
                .map_err(|e| EngineError::Setup(format!("DOM worker pool: {e}")))?,
        );
        let browser = Arc::new(WebDriverBrowser::new(&config.browser, &config.http));

        let dispatcher = JobDispatcher::new(
            Arc::new(DomProbe::new(browser, workers, config.browser.page_load_wait())),
            Arc::new(StatusCodeProbe::new(http.clone(), config.http.status_check_timeout())),
            Arc::new(EndpointProbe::new(http)),
        );

        tracing::info!(
            "Execution engine ready ({} DOM workers, hub {})",
            config.browser.workers.max(1),
            config.browser.hub_url
        );
        Ok(Self::new(dispatcher, metrics, incidents))
    }

    /// Execute `job` once
    ///
    /// Returns the stored metric, or `None` when the job type has no probe.
    /// Executions of the same job are serialized.
    pub async fn execute(&self, job: &Job) -> Result<Option<MetricsStats>, EngineError> {
        let _gate = self.gates.acquire(job.id).await;

        let Some(metric) = self.dispatcher.dispatch(job).await else {
            return Ok(None);
        };

        self.correlator.correlate(job, &metric).await?;
        let saved = self.metrics.save(metric).await?;

        tracing::debug!(job_id = %job.id, metric_id = %saved.id, "Stored {} metric", saved.status);
        Ok(Some(saved))
    }

    /// Load a job from `jobs` and execute it
    pub async fn execute_by_id(
        &self,
        jobs: &dyn JobStore,
        job_id: Uuid,
    ) -> Result<Option<MetricsStats>, EngineError> {
        let job = jobs.get_job(job_id).await?.ok_or(EngineError::JobNotFound(job_id))?;
        self.execute(&job).await
    }
}
