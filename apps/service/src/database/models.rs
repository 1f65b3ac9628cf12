use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::str::FromStr;
use uuid::Uuid;

/// Kind of check a job performs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobType {
    DomNode,
    StatusCode,
    Endpoint,
    Screenshot,
    /// Anything this build does not know how to probe
    #[serde(other)]
    Unknown,
}

impl std::fmt::Display for JobType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobType::DomNode => write!(f, "DOM_NODE"),
            JobType::StatusCode => write!(f, "STATUS_CODE"),
            JobType::Endpoint => write!(f, "ENDPOINT"),
            JobType::Screenshot => write!(f, "SCREENSHOT"),
            JobType::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

impl FromStr for JobType {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "DOM_NODE" => JobType::DomNode,
            "STATUS_CODE" => JobType::StatusCode,
            "ENDPOINT" => JobType::Endpoint,
            "SCREENSHOT" => JobType::Screenshot,
            _ => JobType::Unknown,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SelectorType {
    #[default]
    Xpath,
}

/// Body format an ENDPOINT job expects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EndpointResponseType {
    Json,
    Xml,
}

impl EndpointResponseType {
    /// Value sent in the `Accept` header
    pub fn media_type(self) -> &'static str {
        match self {
            EndpointResponseType::Json => "application/json",
            EndpointResponseType::Xml => "application/xml",
        }
    }
}

impl std::fmt::Display for EndpointResponseType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EndpointResponseType::Json => write!(f, "JSON"),
            EndpointResponseType::Xml => write!(f, "XML"),
        }
    }
}

impl FromStr for EndpointResponseType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "JSON" => Ok(EndpointResponseType::Json),
            "XML" => Ok(EndpointResponseType::Xml),
            other => Err(format!("unknown endpoint response type: {other}")),
        }
    }
}

/// Job model - a configured monitoring check
///
/// Owned by the scheduling side; the engine only reads it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub id: Uuid,
    pub name: String,
    #[serde(rename = "type")]
    pub job_type: JobType,
    pub url: String,

    /// XPath for DOM_NODE and XML endpoints, JSONPath for JSON endpoints
    pub selector: Option<String>,
    pub selector_type: Option<SelectorType>,
    pub endpoint_response_type: Option<EndpointResponseType>,

    /// Expected status for STATUS_CODE jobs
    pub http_status_code: Option<u16>,
    pub component_ids: BTreeSet<String>,

    // Scheduling window, not interpreted here
    pub start_on: Option<DateTime<Utc>>,
    pub end_on: Option<DateTime<Utc>>,
}

impl Job {
    /// Create a job of the given type with no type-specific settings
    pub fn new(
        name: impl Into<String>,
        job_type: JobType,
        url: impl Into<String>,
        component_ids: impl IntoIterator<Item = String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            job_type,
            url: url.into(),
            selector: None,
            selector_type: None,
            endpoint_response_type: None,
            http_status_code: None,
            component_ids: component_ids.into_iter().collect(),
            start_on: None,
            end_on: None,
        }
    }

    /// STATUS_CODE job expecting `expected`
    pub fn status_code(
        name: impl Into<String>,
        url: impl Into<String>,
        expected: u16,
        component_ids: impl IntoIterator<Item = String>,
    ) -> Self {
        let mut job = Self::new(name, JobType::StatusCode, url, component_ids);
        job.http_status_code = Some(expected);
        job
    }

    /// ENDPOINT job extracting `selector` from a body of type `response_type`
    pub fn endpoint(
        name: impl Into<String>,
        url: impl Into<String>,
        response_type: EndpointResponseType,
        selector: impl Into<String>,
        component_ids: impl IntoIterator<Item = String>,
    ) -> Self {
        let mut job = Self::new(name, JobType::Endpoint, url, component_ids);
        job.endpoint_response_type = Some(response_type);
        job.selector = Some(selector.into());
        job
    }

    /// DOM_NODE job waiting for the element at `xpath`
    pub fn dom_node(
        name: impl Into<String>,
        url: impl Into<String>,
        xpath: impl Into<String>,
        component_ids: impl IntoIterator<Item = String>,
    ) -> Self {
        let mut job = Self::new(name, JobType::DomNode, url, component_ids);
        job.selector = Some(xpath.into());
        job.selector_type = Some(SelectorType::Xpath);
        job
    }

    pub fn with_id(mut self, id: Uuid) -> Self {
        self.id = id;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IncidentStatus {
    Opened,
    Resolved,
}

impl std::fmt::Display for IncidentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IncidentStatus::Opened => write!(f, "OPENED"),
            IncidentStatus::Resolved => write!(f, "RESOLVED"),
        }
    }
}

impl FromStr for IncidentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "OPENED" => Ok(IncidentStatus::Opened),
            "RESOLVED" => Ok(IncidentStatus::Resolved),
            other => Err(format!("unknown incident status: {other}")),
        }
    }
}

/// Incident model - an ongoing or past outage of one job
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Incident {
    pub id: Uuid,
    pub job_id: Uuid,
    pub name: String,
    pub description: String,
    pub status: IncidentStatus,
    pub date_start: DateTime<Utc>,

    /// `None` while the incident is open
    pub date_end: Option<DateTime<Utc>>,
    pub component_ids: BTreeSet<String>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Incident {
    /// Open a fresh incident for `job`
    pub fn open_for(job: &Job, description: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            job_id: job.id,
            name: format!("Incident for job: {}", job.name),
            description: description.into(),
            status: IncidentStatus::Opened,
            date_start: now,
            date_end: None,
            component_ids: job.component_ids.clone(),
            updated_at: None,
        }
    }

    pub fn is_open(&self) -> bool {
        self.status == IncidentStatus::Opened
    }
}

/// Convert a timestamp to Unix milliseconds for storage
pub fn timestamp_to_i64(time: DateTime<Utc>) -> i64 {
    time.timestamp_millis()
}

/// Convert stored Unix milliseconds back to a timestamp
pub fn i64_to_timestamp(millis: i64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp_millis(millis)
}
