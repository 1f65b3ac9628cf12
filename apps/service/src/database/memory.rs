//! In-process store with the same contracts as [`LibsqlStore`](super::LibsqlStore).
//!
//! Nothing survives a restart. Used by tests and by callers that embed the
//! engine without a database file.

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::models::{Incident, Job};
use super::repository::{IncidentStore, JobStore, MetricsStore};
use crate::error::{StoreError, StoreResult};
use crate::monitoring::types::MetricsStats;
use crate::validation::validate_job;

#[derive(Default)]
pub struct MemoryStore {
    jobs: RwLock<HashMap<Uuid, Job>>,
    metrics: RwLock<Vec<MetricsStats>>,
    incidents: RwLock<Vec<Incident>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every incident ever written, in insertion order
    pub async fn all_incidents(&self) -> Vec<Incident> {
        self.incidents.read().await.clone()
    }

    /// Every metric ever written, in insertion order
    pub async fn all_metrics(&self) -> Vec<MetricsStats> {
        self.metrics.read().await.clone()
    }
}

fn newest_first(mut incidents: Vec<Incident>) -> Vec<Incident> {
    incidents.sort_by(|a, b| b.date_start.cmp(&a.date_start));
    incidents
}

#[async_trait]
impl JobStore for MemoryStore {
    async fn get_job(&self, id: Uuid) -> StoreResult<Option<Job>> {
        Ok(self.jobs.read().await.get(&id).cloned())
    }

    async fn list_jobs(&self) -> StoreResult<Vec<Job>> {
        let mut jobs: Vec<Job> = self.jobs.read().await.values().cloned().collect();
        jobs.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(jobs)
    }

    async fn save_job(&self, job: &Job) -> StoreResult<Job> {
        validate_job(job).to_result()?;
        self.jobs.write().await.insert(job.id, job.clone());
        Ok(job.clone())
    }
}

#[async_trait]
impl MetricsStore for MemoryStore {
    async fn save(&self, metric: MetricsStats) -> StoreResult<MetricsStats> {
        self.metrics.write().await.push(metric.clone());
        Ok(metric)
    }

    async fn recent_for_job(&self, job_id: Uuid, limit: usize) -> StoreResult<Vec<MetricsStats>> {
        let mut metrics: Vec<MetricsStats> = self
            .metrics
            .read()
            .await
            .iter()
            .filter(|m| m.job_id == job_id)
            .cloned()
            .collect();
        metrics.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        metrics.truncate(limit);
        Ok(metrics)
    }
}

#[async_trait]
impl IncidentStore for MemoryStore {
    async fn find_by_job(&self, job_id: Uuid) -> StoreResult<Vec<Incident>> {
        let incidents = self.incidents.read().await;
        Ok(newest_first(incidents.iter().filter(|i| i.job_id == job_id).cloned().collect()))
    }

    async fn save(&self, incident: Incident) -> StoreResult<Incident> {
        let mut incidents = self.incidents.write().await;

        if incidents.iter().any(|i| i.job_id == incident.job_id && i.id != incident.id) {
            return Err(StoreError::Conflict);
        }

        match incidents.iter_mut().find(|i| i.id == incident.id) {
            Some(existing) => *existing = incident.clone(),
            None => incidents.push(incident.clone()),
        }

        Ok(incident)
    }

    async fn find_active(&self) -> StoreResult<Vec<Incident>> {
        let incidents = self.incidents.read().await;
        Ok(newest_first(incidents.iter().filter(|i| i.is_open()).cloned().collect()))
    }

    async fn find_by_component(&self, component_id: &str) -> StoreResult<Vec<Incident>> {
        let incidents = self.incidents.read().await;
        Ok(newest_first(
            incidents.iter().filter(|i| i.component_ids.contains(component_id)).cloned().collect(),
        ))
    }
}
