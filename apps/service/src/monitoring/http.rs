//! Non-blocking HTTP GET used by the STATUS_CODE and ENDPOINT probes.

use async_trait::async_trait;
use reqwest::header::{ACCEPT, HeaderValue};
use std::time::Duration;
use thiserror::Error;

use crate::config::HttpConfig;

/// `Accept` value for checks that take any content type
pub const ACCEPT_ANY: &str = "*/*";

/// Status and text body of a completed GET
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[derive(Debug, Clone, Error)]
pub enum HttpError {
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("request failed: {0}")]
    Request(String),

    #[error("failed to read response body: {0}")]
    Body(String),
}

impl HttpError {
    /// Stable category name, used as the prefix of FAIL messages
    pub fn kind(&self) -> &'static str {
        match self {
            HttpError::Timeout(_) => "TimeoutError",
            HttpError::Connect(_) => "ConnectError",
            HttpError::Request(_) => "RequestError",
            HttpError::Body(_) => "BodyError",
        }
    }

    /// `Kind: message` as recorded in metrics
    pub fn describe(&self) -> String {
        format!("{}: {}", self.kind(), self)
    }
}

#[async_trait]
pub trait HttpClient: Send + Sync {
    /// GET `url` with the given `Accept` header and read the body as text
    async fn get(&self, url: &str, accept: &str) -> Result<HttpResponse, HttpError>;

    /// GET `url` and return the status as soon as the headers arrive
    ///
    /// The body is never read, so a slow or truncated body cannot fail the call.
    async fn status(&self, url: &str, accept: &str) -> Result<u16, HttpError>;
}

/// reqwest backed client with connection level timeouts
pub struct ReqwestHttpClient {
    client: reqwest::Client,
    connect_timeout: Duration,
    read_timeout: Duration,
}

impl ReqwestHttpClient {
    pub fn new(config: &HttpConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout())
            .read_timeout(config.read_timeout())
            .user_agent(config.user_agent.clone())
            .build()?;

        Ok(Self {
            client,
            connect_timeout: config.connect_timeout(),
            read_timeout: config.read_timeout(),
        })
    }

    fn classify(&self, error: reqwest::Error) -> HttpError {
        if error.is_timeout() {
            self.timed_out(error.is_connect())
        } else if error.is_connect() {
            HttpError::Connect(error.to_string())
        } else if error.is_body() || error.is_decode() {
            HttpError::Body(error.to_string())
        } else {
            HttpError::Request(error.to_string())
        }
    }

    /// Timeout error carrying the limit that actually expired
    fn timed_out(&self, connecting: bool) -> HttpError {
        if connecting {
            HttpError::Timeout(self.connect_timeout)
        } else {
            HttpError::Timeout(self.read_timeout)
        }
    }

    async fn send(&self, url: &str, accept: &str) -> Result<reqwest::Response, HttpError> {
        let accept = HeaderValue::from_str(accept)
            .map_err(|e| HttpError::Request(format!("invalid Accept header: {e}")))?;

        self.client.get(url).header(ACCEPT, accept).send().await.map_err(|e| self.classify(e))
    }
}

#[async_trait]
impl HttpClient for ReqwestHttpClient {
    async fn get(&self, url: &str, accept: &str) -> Result<HttpResponse, HttpError> {
        let response = self.send(url, accept).await?;

        let status = response.status().as_u16();
        let body = response.text().await.map_err(|e| self.classify(e))?;

        Ok(HttpResponse { status, body })
    }

    async fn status(&self, url: &str, accept: &str) -> Result<u16, HttpError> {
        // Dropping the response discards the unread body
        let response = self.send(url, accept).await?;
        Ok(response.status().as_u16())
    }
}
