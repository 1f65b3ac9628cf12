use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

/// Outcome of a single probe execution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MetricsStatus {
    Success,
    Fail,
}

impl std::fmt::Display for MetricsStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MetricsStatus::Success => write!(f, "SUCCESS"),
            MetricsStatus::Fail => write!(f, "FAIL"),
        }
    }
}

impl FromStr for MetricsStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "SUCCESS" => Ok(MetricsStatus::Success),
            "FAIL" => Ok(MetricsStatus::Fail),
            other => Err(format!("unknown metrics status: {other}")),
        }
    }
}

/// Immutable record of one job execution
///
/// Exactly one is produced per probe run; the history per job is append-only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsStats {
    /// Unique id of this record
    pub id: Uuid,

    /// Job that produced the record
    pub job_id: Uuid,

    /// SUCCESS or FAIL
    pub status: MetricsStatus,

    /// Human readable description of the outcome
    pub detailed_info: String,

    pub created_at: DateTime<Utc>,
}

impl MetricsStats {
    pub fn new(job_id: Uuid, status: MetricsStatus, detailed_info: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            job_id,
            status,
            detailed_info: detailed_info.into(),
            created_at: Utc::now(),
        }
    }

    pub fn success(job_id: Uuid, detailed_info: impl Into<String>) -> Self {
        Self::new(job_id, MetricsStatus::Success, detailed_info)
    }

    pub fn failure(job_id: Uuid, detailed_info: impl Into<String>) -> Self {
        Self::new(job_id, MetricsStatus::Fail, detailed_info)
    }

    pub fn is_success(&self) -> bool {
        self.status == MetricsStatus::Success
    }
}

impl std::fmt::Display for MetricsStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[{}] job {} {}: {}",
            self.created_at.to_rfc3339(),
            self.job_id,
            self.status,
            self.detailed_info
        )
    }
}
