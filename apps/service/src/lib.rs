//! Uptime monitoring job execution and incident correlation.
//!
//! [`monitoring::ExecutionEngine`] runs a [`database::models::Job`] once,
//! records the outcome as a metric and keeps the job's incident in step.
//! Scheduling is left to the caller.

pub mod browser;
pub mod config;
pub mod database;
pub mod error;
pub mod fixtures;
pub mod monitoring;
pub mod pool;
pub mod validation;

pub use config::Config;
pub use error::{EngineError, StoreError};
pub use monitoring::{ExecutionEngine, MetricsStats, MetricsStatus};
