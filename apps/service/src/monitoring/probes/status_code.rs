use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;

use super::{Probe, job_label};
use crate::database::models::Job;
use crate::monitoring::http::{ACCEPT_ANY, HttpClient, HttpError};
use crate::monitoring::types::MetricsStats;

/// Compares the status code of a GET against the job's expected code
pub struct StatusCodeProbe {
    client: Arc<dyn HttpClient>,
    operation_timeout: Duration,
}

impl StatusCodeProbe {
    pub fn new(client: Arc<dyn HttpClient>, operation_timeout: Duration) -> Self {
        Self { client, operation_timeout }
    }
}

#[async_trait::async_trait]
impl Probe for StatusCodeProbe {
    async fn probe(&self, job: &Job) -> MetricsStats {
        let Some(expected) = job.http_status_code else {
            tracing::error!("No expected status code configured {}", job_label(job));
            return MetricsStats::failure(job.id, "ConfigurationError: no expected status code configured");
        };

        let outcome = timeout(self.operation_timeout, self.client.status(&job.url, ACCEPT_ANY))
            .await
            .unwrap_or(Err(HttpError::Timeout(self.operation_timeout)));

        match outcome {
            Ok(status) if status == expected => {
                tracing::info!("URL {} is accessible {}", job.url, job_label(job));
                MetricsStats::success(job.id, format!("URL {} is accessible", job.url))
            }
            Ok(status) => {
                tracing::warn!(
                    "URL {} is not accessible, status code: {} (expected {}) {}",
                    job.url,
                    status,
                    expected,
                    job_label(job)
                );
                MetricsStats::failure(
                    job.id,
                    format!(
                        "URL {} is not accessible, status code: {} (expected {})",
                        job.url, status, expected
                    ),
                )
            }
            Err(error) => {
                tracing::error!("Error. Details: {} {}", error.describe(), job_label(job));
                MetricsStats::failure(job.id, error.describe())
            }
        }
    }
}
