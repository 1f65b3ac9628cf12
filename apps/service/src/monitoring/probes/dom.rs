use std::sync::Arc;
use std::time::Duration;

use super::{Probe, job_label};
use crate::browser::{Browser, BrowserError, BrowserSession};
use crate::database::models::Job;
use crate::monitoring::types::MetricsStats;
use crate::monitoring::workers::BlockingPool;

/// Loads the job's page in a remote browser and waits for its XPath element
///
/// Browser calls block, so every check runs on the dedicated worker pool.
pub struct DomProbe {
    browser: Arc<dyn Browser>,
    workers: Arc<BlockingPool>,
    wait_timeout: Duration,
}

impl DomProbe {
    pub fn new(browser: Arc<dyn Browser>, workers: Arc<BlockingPool>, wait_timeout: Duration) -> Self {
        Self { browser, workers, wait_timeout }
    }
}

#[async_trait::async_trait]
impl Probe for DomProbe {
    async fn probe(&self, job: &Job) -> MetricsStats {
        let browser = self.browser.clone();
        let owned_job = job.clone();
        let wait_timeout = self.wait_timeout;

        match self.workers.run(move || check_dom(browser.as_ref(), &owned_job, wait_timeout)).await {
            Ok(metric) => metric,
            Err(error) => {
                tracing::error!("DOM check could not run: {} {}", error, job_label(job));
                MetricsStats::failure(job.id, format!("WorkerError: {error}"))
            }
        }
    }
}

/// Blocking body of the DOM check; the session is closed on every path
fn check_dom(browser: &dyn Browser, job: &Job, wait_timeout: Duration) -> MetricsStats {
    let Some(xpath) = job.selector.as_deref() else {
        return MetricsStats::failure(job.id, "ConfigurationError: no XPath selector configured");
    };

    let mut session = match browser.open() {
        Ok(session) => session,
        Err(error) => {
            tracing::error!("Could not open browser session: {} {}", error, job_label(job));
            return MetricsStats::failure(job.id, error.to_string());
        }
    };
    tracing::info!("Connected to WebDriver {}", job_label(job));

    let outcome = locate(session.as_mut(), &job.url, xpath, wait_timeout);

    if let Err(error) = session.close() {
        tracing::warn!("Failed to close browser session: {} {}", error, job_label(job));
    }

    match outcome {
        Ok(()) => {
            let msg = format!("DOM contains specified element. URL: {} {}", job.url, job_label(job));
            tracing::info!("{}", msg);
            MetricsStats::success(job.id, msg)
        }
        Err(BrowserError::NoSuchElement(_)) => {
            let msg =
                format!("DOM does not contain specified element. URL: {} {}", job.url, job_label(job));
            tracing::warn!("{}", msg);
            MetricsStats::failure(job.id, msg)
        }
        Err(error) => {
            tracing::error!("Error. Details: {} {}", error, job_label(job));
            MetricsStats::failure(job.id, error.to_string())
        }
    }
}

fn locate(
    session: &mut dyn BrowserSession,
    url: &str,
    xpath: &str,
    wait_timeout: Duration,
) -> Result<(), BrowserError> {
    session.navigate(url)?;
    session.wait_until_visible(xpath, wait_timeout)?;
    session.find_element(xpath)?;
    Ok(())
}
