use std::sync::Arc;

use super::{Probe, job_label};
use crate::database::models::{EndpointResponseType, Job};
use crate::monitoring::extract::{Extraction, extract_json, extract_xml};
use crate::monitoring::http::HttpClient;
use crate::monitoring::types::MetricsStats;

/// Fetches a JSON or XML document and extracts the job's selector from it
pub struct EndpointProbe {
    client: Arc<dyn HttpClient>,
}

impl EndpointProbe {
    pub fn new(client: Arc<dyn HttpClient>) -> Self {
        Self { client }
    }

    fn fail(job: &Job, detail: String) -> MetricsStats {
        tracing::error!("Error. Details: {} {}", detail, job_label(job));
        MetricsStats::failure(job.id, detail)
    }
}

#[async_trait::async_trait]
impl Probe for EndpointProbe {
    async fn probe(&self, job: &Job) -> MetricsStats {
        let Some(response_type) = job.endpoint_response_type else {
            return Self::fail(job, "ConfigurationError: Wrong endpoint response type".to_string());
        };
        let Some(selector) = job.selector.as_deref() else {
            return Self::fail(job, "ConfigurationError: no selector configured".to_string());
        };

        let response = match self.client.get(&job.url, response_type.media_type()).await {
            Ok(response) => response,
            Err(error) => return Self::fail(job, error.describe()),
        };

        if !response.is_success() {
            return Self::fail(
                job,
                format!("ResponseError: {} returned status code {}", job.url, response.status),
            );
        }

        let extraction = match response_type {
            EndpointResponseType::Json => extract_json(&response.body, selector),
            EndpointResponseType::Xml => extract_xml(&response.body, selector),
        };

        match extraction {
            Extraction::Found(value) => {
                tracing::info!("Extracted value {} from {} {}", value, job.url, job_label(job));
                MetricsStats::success(job.id, format!("Extracted value: {value}"))
            }
            Extraction::NotFound => {
                let detail = match response_type {
                    EndpointResponseType::Json => format!("PathNotFound: JSONPath '{selector}' not found."),
                    EndpointResponseType::Xml => format!("PathNotFound: XPath '{selector}' not found."),
                };
                tracing::warn!("{} {}", detail, job_label(job));
                MetricsStats::failure(job.id, detail)
            }
            Extraction::MalformedSelector(reason) => Self::fail(job, format!("SelectorError: {reason}")),
            Extraction::MalformedDocument(reason) => Self::fail(job, format!("ParseError: {reason}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monitoring::http::HttpError;
    use crate::monitoring::testing::ScriptedHttp;
    use crate::monitoring::types::MetricsStatus;

    const USERS: &str = include_str!("../../../testdata/users.json");
    const WEATHER: &str = include_str!("../../../testdata/weather.xml");

    fn json_job(selector: &str) -> Job {
        Job::endpoint("FindJSON", "https://example.com/users", EndpointResponseType::Json, selector, [
            "123".to_string(),
        ])
    }

    fn xml_job(selector: &str) -> Job {
        Job::endpoint("FindXML", "https://example.com/weather", EndpointResponseType::Xml, selector, [
            "123".to_string(),
        ])
    }

    async fn run(job: &Job, client: ScriptedHttp) -> MetricsStats {
        EndpointProbe::new(Arc::new(client)).probe(job).await
    }

    #[tokio::test]
    async fn test_find_value_in_json_response() {
        let client = ScriptedHttp::body(200, USERS);
        let metric = run(&json_job("$[0].address.zipcode"), client.clone()).await;

        assert_eq!(metric.status, MetricsStatus::Success);
        assert_eq!(metric.detailed_info, "Extracted value: 92998-3874");
        assert_eq!(client.last_accept().as_deref(), Some("application/json"));
    }

    #[tokio::test]
    async fn test_cannot_find_value_in_json_response() {
        let metric = run(&json_job("$[0].address.town"), ScriptedHttp::body(200, USERS)).await;

        assert_eq!(metric.status, MetricsStatus::Fail);
        assert!(metric.detailed_info.contains("not found"));
    }

    #[tokio::test]
    async fn test_corrupted_json_path() {
        let job = json_job("$[0]!@#$%^&*(*&*(&*(&DSDaddress.town");
        let metric = run(&job, ScriptedHttp::body(200, USERS)).await;

        assert_eq!(metric.status, MetricsStatus::Fail);
        assert!(metric.detailed_info.starts_with("SelectorError: "));
    }

    #[tokio::test]
    async fn test_find_value_in_xml_response() {
        let client = ScriptedHttp::body(200, WEATHER);
        let metric = run(&xml_job("/current/temperature/@value"), client.clone()).await;

        assert_eq!(metric.status, MetricsStatus::Success);
        assert_eq!(metric.detailed_info, "Extracted value: 289.15");
        assert_eq!(client.last_accept().as_deref(), Some("application/xml"));
    }

    #[tokio::test]
    async fn test_cannot_find_value_in_xml_response() {
        let metric = run(&xml_job("/current/notToBeFound/@value"), ScriptedHttp::body(200, WEATHER)).await;

        assert_eq!(metric.status, MetricsStatus::Fail);
        assert_eq!(
            metric.detailed_info,
            "PathNotFound: XPath '/current/notToBeFound/@value' not found."
        );
    }

    #[tokio::test]
    async fn test_corrupted_xpath() {
        let job = xml_job("!@#$%^&*()_(**&@/current/temperature/@value");
        let metric = run(&job, ScriptedHttp::body(200, WEATHER)).await;

        assert_eq!(metric.status, MetricsStatus::Fail);
    }

    #[tokio::test]
    async fn test_wrong_endpoint_type() {
        let mut job = xml_job("/current/temperature/@value");
        job.endpoint_response_type = None;

        let client = ScriptedHttp::body(200, WEATHER);
        let metric = run(&job, client.clone()).await;

        assert_eq!(metric.status, MetricsStatus::Fail);
        assert!(metric.detailed_info.contains("Wrong endpoint response type"));
        assert_eq!(client.calls(), 0);
    }

    #[tokio::test]
    async fn test_error_status_fails_without_parsing() {
        let metric = run(&json_job("$[0].id"), ScriptedHttp::body(503, USERS)).await;

        assert_eq!(metric.status, MetricsStatus::Fail);
        assert!(metric.detailed_info.contains("503"));
    }

    #[tokio::test]
    async fn test_transport_error_is_caught() {
        let client = ScriptedHttp::error(HttpError::Request("dns error".into()));
        let metric = run(&json_job("$[0].id"), client).await;

        assert_eq!(metric.status, MetricsStatus::Fail);
        assert!(metric.detailed_info.starts_with("RequestError: "));
    }
}
