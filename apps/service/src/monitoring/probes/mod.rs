//! Probe strategies, one per probe-able job type.
//!
//! A probe never fails: transport, parse and configuration problems all end
//! up as a FAIL metric describing the cause.

pub mod dom;
pub mod endpoint;
pub mod status_code;

pub use dom::DomProbe;
pub use endpoint::EndpointProbe;
pub use status_code::StatusCodeProbe;

use crate::database::models::Job;
use crate::monitoring::types::MetricsStats;

#[async_trait::async_trait]
pub trait Probe: Send + Sync {
    /// Run the check for `job` and classify the outcome
    async fn probe(&self, job: &Job) -> MetricsStats;
}

/// Suffix identifying the job in log lines and DOM messages
pub(crate) fn job_label(job: &Job) -> String {
    format!("Job - {} id {}", job.name, job.id)
}
