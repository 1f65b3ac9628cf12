/// Monitoring engine module - executes monitoring jobs
///
/// This module is responsible for:
/// - Routing a job to the probe for its type
/// - Running HTTP, endpoint extraction and DOM probes
/// - Correlating probe outcomes with the job's incident
/// - Persisting the resulting metrics
pub mod dispatcher;
pub mod engine;
pub mod extract;
pub mod http;
pub mod incident;
pub mod probes;
pub mod types;
pub mod workers;

#[cfg(test)]
mod testing;
#[cfg(test)]
mod tests;

pub use dispatcher::JobDispatcher;
pub use engine::{ExecutionEngine, JobGates};
pub use incident::{IncidentCorrelator, Transition};
pub use types::{MetricsStats, MetricsStatus};
