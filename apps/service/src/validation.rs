//! Checks applied to jobs before they are stored.
//!
//! The engine never rejects a job at execution time: a misconfigured job
//! still runs and yields a FAIL metric. These checks only guard the write
//! path of the job store.

use url::Url;

use crate::database::models::{Job, JobType};
use crate::error::StoreError;

/// Validation results with specific error messages
#[derive(Debug, Clone)]
pub struct ValidationResult {
    pub is_valid: bool,
    pub error: Option<String>,
}

impl ValidationResult {
    pub fn ok() -> Self {
        Self { is_valid: true, error: None }
    }

    pub fn err(msg: impl Into<String>) -> Self {
        Self { is_valid: false, error: Some(msg.into()) }
    }

    pub fn to_result(&self) -> Result<(), StoreError> {
        if self.is_valid {
            Ok(())
        } else {
            Err(StoreError::Invalid(
                self.error.clone().unwrap_or_else(|| "Validation failed".to_string()),
            ))
        }
    }
}

/// Validate HTTP/HTTPS URL of a job
pub fn validate_http_endpoint(target: &str) -> ValidationResult {
    if target.trim().is_empty() {
        return ValidationResult::err("URL cannot be empty");
    }

    match Url::parse(target) {
        Ok(url) => {
            let scheme = url.scheme();
            if scheme != "http" && scheme != "https" {
                return ValidationResult::err(format!(
                    "Invalid scheme '{scheme}'. Must be http or https"
                ));
            }

            if url.host_str().is_none() {
                return ValidationResult::err("URL must have a valid host");
            }

            ValidationResult::ok()
        }
        Err(e) => {
            if !target.contains("://") {
                ValidationResult::err("URL must include scheme (http:// or https://)")
            } else {
                ValidationResult::err(format!("Invalid URL: {e}"))
            }
        }
    }
}

fn has_selector(job: &Job) -> bool {
    job.selector.as_deref().is_some_and(|s| !s.trim().is_empty())
}

/// Validate a job's configuration for its type
pub fn validate_job(job: &Job) -> ValidationResult {
    if job.name.trim().is_empty() {
        return ValidationResult::err("Job name cannot be empty");
    }

    let url_check = validate_http_endpoint(&job.url);
    if !url_check.is_valid {
        return url_check;
    }

    if job.component_ids.is_empty() {
        return ValidationResult::err("Job must be associated with at least one component");
    }

    match job.job_type {
        JobType::StatusCode => match job.http_status_code {
            Some(code) if (100..=599).contains(&code) => {}
            Some(code) => {
                return ValidationResult::err(format!("Invalid expected status code: {code}"));
            }
            None => return ValidationResult::err("STATUS_CODE job requires an expected status code"),
        },
        JobType::DomNode if !has_selector(job) => {
            return ValidationResult::err("DOM_NODE job requires an XPath selector");
        }
        JobType::Endpoint => {
            if !has_selector(job) {
                return ValidationResult::err("ENDPOINT job requires a selector");
            }
            if job.endpoint_response_type.is_none() {
                return ValidationResult::err("ENDPOINT job requires a response type");
            }
        }
        _ => {}
    }

    if let (Some(start), Some(end)) = (job.start_on, job.end_on) {
        if start > end {
            return ValidationResult::err("startOn must not be after endOn");
        }
    }

    ValidationResult::ok()
}
