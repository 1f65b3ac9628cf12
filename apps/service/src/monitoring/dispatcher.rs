use std::sync::Arc;

use super::probes::Probe;
use super::types::MetricsStats;
use crate::database::models::{Job, JobType};

/// Routes a job to the probe strategy for its type
pub struct JobDispatcher {
    dom: Arc<dyn Probe>,
    status_code: Arc<dyn Probe>,
    endpoint: Arc<dyn Probe>,
}

impl JobDispatcher {
    pub fn new(dom: Arc<dyn Probe>, status_code: Arc<dyn Probe>, endpoint: Arc<dyn Probe>) -> Self {
        Self { dom, status_code, endpoint }
    }

    /// Probe to use for a job type, `None` when the type is not probed
    pub fn probe_for(&self, job_type: JobType) -> Option<&dyn Probe> {
        match job_type {
            JobType::DomNode => Some(self.dom.as_ref()),
            JobType::StatusCode => Some(self.status_code.as_ref()),
            JobType::Endpoint => Some(self.endpoint.as_ref()),
            JobType::Screenshot | JobType::Unknown => None,
        }
    }

    /// Execute the job's probe
    ///
    /// Returns `None` for job types without a probe; callers must then skip
    /// metric and incident writes.
    pub async fn dispatch(&self, job: &Job) -> Option<MetricsStats> {
        let Some(probe) = self.probe_for(job.job_type) else {
            tracing::debug!("No probe for {} job: {}, id: {}; skipping", job.job_type, job.name, job.id);
            return None;
        };

        match job.job_type {
            JobType::DomNode => {
                tracing::info!("Starting DOM Monitoring job: {}, id: {}", job.name, job.id)
            }
            JobType::StatusCode => {
                tracing::info!("Starting Status Code monitoring job: {}, id: {}", job.name, job.id)
            }
            _ => tracing::info!("Starting Endpoint monitoring job: {}, id: {}", job.name, job.id),
        }

        Some(probe.probe(job).await)
    }
}
