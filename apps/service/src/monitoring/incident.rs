//! Incident state machine.
//!
//! | current  | FAIL                         | SUCCESS             |
//! |----------|------------------------------|---------------------|
//! | none     | open a new incident          | nothing             |
//! | RESOLVED | reopen with a new start date | nothing             |
//! | OPENED   | refresh the description      | resolve it          |

use chrono::{DateTime, Utc};
use std::sync::Arc;

use super::types::{MetricsStats, MetricsStatus};
use crate::database::IncidentStore;
use crate::database::models::{Incident, IncidentStatus, Job};
use crate::error::StoreResult;

/// Decision taken for one metric
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    /// No incident existed; this one must be inserted
    Opened(Incident),
    /// A resolved incident degraded again
    Reopened(Incident),
    /// An open incident saw another failure
    Updated(Incident),
    /// An open incident recovered
    Resolved(Incident),
    /// Nothing to persist
    Unchanged,
}

impl Transition {
    /// Incident to persist, if any
    pub fn incident(&self) -> Option<&Incident> {
        match self {
            Transition::Opened(i)
            | Transition::Reopened(i)
            | Transition::Updated(i)
            | Transition::Resolved(i) => Some(i),
            Transition::Unchanged => None,
        }
    }
}

/// Apply `metric` to the job's current incident
pub fn transition(
    current: Option<Incident>,
    job: &Job,
    metric: &MetricsStats,
    now: DateTime<Utc>,
) -> Transition {
    match (current, metric.status) {
        (None, MetricsStatus::Fail) => Transition::Opened(Incident::open_for(job, &metric.detailed_info, now)),
        (None, MetricsStatus::Success) => Transition::Unchanged,
        (Some(mut incident), MetricsStatus::Fail) => {
            let reopened = incident.status == IncidentStatus::Resolved;
            if reopened {
                incident.date_start = now;
            }
            incident.status = IncidentStatus::Opened;
            incident.description = metric.detailed_info.clone();
            incident.date_end = None;
            incident.updated_at = Some(now);

            if reopened { Transition::Reopened(incident) } else { Transition::Updated(incident) }
        }
        (Some(mut incident), MetricsStatus::Success) => match incident.status {
            IncidentStatus::Resolved => Transition::Unchanged,
            IncidentStatus::Opened => {
                incident.status = IncidentStatus::Resolved;
                incident.date_end = Some(now);
                incident.updated_at = Some(now);
                Transition::Resolved(incident)
            }
        },
    }
}

/// Loads a job's incident, applies the state machine and stores the result
pub struct IncidentCorrelator {
    incidents: Arc<dyn IncidentStore>,
}

impl IncidentCorrelator {
    pub fn new(incidents: Arc<dyn IncidentStore>) -> Self {
        Self { incidents }
    }

    pub async fn correlate(&self, job: &Job, metric: &MetricsStats) -> StoreResult<Transition> {
        // Stores return newest first and keep at most one per job
        let current = self.incidents.find_by_job(job.id).await?.into_iter().next();
        let decision = transition(current, job, metric, Utc::now());

        match &decision {
            Transition::Opened(incident) => {
                tracing::warn!(incident_id = %incident.id, "Opened incident for job {} ({})", job.name, job.id)
            }
            Transition::Reopened(incident) => {
                tracing::warn!(incident_id = %incident.id, "Reopened incident for job {} ({})", job.name, job.id)
            }
            Transition::Resolved(incident) => {
                tracing::info!(incident_id = %incident.id, "Resolved incident for job {} ({})", job.name, job.id)
            }
            Transition::Updated(_) | Transition::Unchanged => {}
        }

        if let Some(incident) = decision.incident() {
            self.incidents.save(incident.clone()).await?;
        }

        Ok(decision)
    }
}
