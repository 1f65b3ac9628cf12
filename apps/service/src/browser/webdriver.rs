//! W3C WebDriver client for a remote hub (Selenium Grid, chromedriver, ...).

use reqwest::blocking::Client;
use serde_json::{Value, json};
use std::cell::RefCell;
use std::collections::HashMap;
use std::time::{Duration, Instant};

use super::{Browser, BrowserError, BrowserSession, ElementRef};
use crate::config::{BrowserConfig, HttpConfig};

/// Key under which W3C drivers return element ids
const ELEMENT_KEY: &str = "element-6066-11e4-a52e-4f735466cecf";
const POLL_INTERVAL: Duration = Duration::from_millis(250);

thread_local! {
    // One blocking client per worker thread and timeout pair. Clients are
    // only built and dropped on the threads that run browser sessions.
    static CLIENTS: RefCell<HashMap<(Duration, Duration), Client>> = RefCell::new(HashMap::new());
}

fn client_for(connect_timeout: Duration, command_timeout: Duration) -> Result<Client, BrowserError> {
    CLIENTS.with(|clients| {
        let mut clients = clients.borrow_mut();
        if let Some(client) = clients.get(&(connect_timeout, command_timeout)) {
            return Ok(client.clone());
        }

        let client = Client::builder()
            .connect_timeout(connect_timeout)
            .timeout(command_timeout)
            .build()
            .map_err(|e| BrowserError::Transport(e.to_string()))?;
        clients.insert((connect_timeout, command_timeout), client.clone());
        Ok(client)
    })
}

/// Opens Chrome sessions on a remote WebDriver hub
pub struct WebDriverBrowser {
    hub_url: String,
    connect_timeout: Duration,
    command_timeout: Duration,
}

impl WebDriverBrowser {
    pub fn new(browser: &BrowserConfig, http: &HttpConfig) -> Self {
        Self {
            hub_url: browser.hub_url.trim_end_matches('/').to_string(),
            connect_timeout: http.connect_timeout(),
            // Navigation waits for the page load, so allow more than one read timeout
            command_timeout: http.read_timeout() + browser.page_load_wait(),
        }
    }
}

impl Browser for WebDriverBrowser {
    fn open(&self) -> Result<Box<dyn BrowserSession>, BrowserError> {
        let client = client_for(self.connect_timeout, self.command_timeout)?;

        let capabilities = json!({
            "capabilities": {
                "alwaysMatch": {
                    "browserName": "chrome",
                    "goog:chromeOptions": { "args": ["--headless=new", "--no-sandbox"] }
                }
            }
        });

        let value = send(client.post(format!("{}/session", self.hub_url)).json(&capabilities))?;
        let session_id = value
            .get("sessionId")
            .and_then(Value::as_str)
            .ok_or_else(|| BrowserError::Protocol("new session response has no sessionId".into()))?
            .to_string();

        tracing::debug!("Opened WebDriver session {}", session_id);
        Ok(Box::new(WebDriverSession {
            client,
            base: format!("{}/session/{}", self.hub_url, session_id),
            session_id,
            closed: false,
        }))
    }
}

pub struct WebDriverSession {
    client: Client,
    base: String,
    session_id: String,
    closed: bool,
}

impl WebDriverSession {
    fn is_displayed(&self, element: &ElementRef) -> Result<bool, BrowserError> {
        let value = send(self.client.get(format!("{}/element/{}/displayed", self.base, element.0)))?;
        Ok(value.as_bool().unwrap_or(false))
    }

    fn locate_visible(&mut self, xpath: &str) -> Result<bool, BrowserError> {
        let element = self.find_element(xpath)?;
        self.is_displayed(&element)
    }
}

impl BrowserSession for WebDriverSession {
    fn navigate(&mut self, url: &str) -> Result<(), BrowserError> {
        send(self.client.post(format!("{}/url", self.base)).json(&json!({ "url": url })))?;
        Ok(())
    }

    fn wait_until_visible(&mut self, xpath: &str, timeout: Duration) -> Result<(), BrowserError> {
        let deadline = Instant::now() + timeout;
        let mut located = false;

        loop {
            match self.locate_visible(xpath) {
                Ok(true) => return Ok(()),
                // Re-rendered pages detach elements between lookup and check
                Ok(false) | Err(BrowserError::StaleElement(_)) => located = true,
                Err(BrowserError::NoSuchElement(_)) => {}
                Err(other) => return Err(other),
            }

            let now = Instant::now();
            if now >= deadline {
                return Err(if located {
                    BrowserError::Timeout(timeout, format!("visibility of element located by xpath {xpath}"))
                } else {
                    BrowserError::NoSuchElement(format!("no element matches xpath {xpath}"))
                });
            }
            std::thread::sleep(POLL_INTERVAL.min(deadline - now));
        }
    }

    fn find_element(&mut self, xpath: &str) -> Result<ElementRef, BrowserError> {
        let value = send(
            self.client
                .post(format!("{}/element", self.base))
                .json(&json!({ "using": "xpath", "value": xpath })),
        )?;

        value
            .get(ELEMENT_KEY)
            .and_then(Value::as_str)
            .map(|id| ElementRef(id.to_string()))
            .ok_or_else(|| BrowserError::Protocol("element response has no element id".into()))
    }

    fn close(&mut self) -> Result<(), BrowserError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        send(self.client.delete(&self.base))?;
        tracing::debug!("Closed WebDriver session {}", self.session_id);
        Ok(())
    }
}

impl Drop for WebDriverSession {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            tracing::warn!("Failed to close WebDriver session {}: {}", self.session_id, e);
        }
    }
}

/// Send a command and unwrap the W3C `{"value": ...}` envelope
fn send(request: reqwest::blocking::RequestBuilder) -> Result<Value, BrowserError> {
    let response = request.send().map_err(|e| {
        if e.is_timeout() {
            BrowserError::Transport(format!("webdriver command timed out: {e}"))
        } else {
            BrowserError::Transport(e.to_string())
        }
    })?;
    let status = response.status();
    let body: Value = response
        .json()
        .map_err(|e| BrowserError::Protocol(format!("unreadable webdriver response ({status}): {e}")))?;

    decode_response(status.is_success(), body)
}

fn decode_response(success: bool, body: Value) -> Result<Value, BrowserError> {
    let value = body.get("value").cloned().unwrap_or(Value::Null);

    if let Some(error) = value.get("error").and_then(Value::as_str) {
        let message = value.get("message").and_then(Value::as_str).unwrap_or_default().to_string();
        return Err(match error {
            "no such element" => BrowserError::NoSuchElement(message),
            "stale element reference" => BrowserError::StaleElement(message),
            "timeout" | "script timeout" => BrowserError::DriverTimeout(message),
            other => BrowserError::Protocol(format!("{other}: {message}")),
        });
    }

    if !success {
        return Err(BrowserError::Protocol(format!("unexpected webdriver response: {body}")));
    }

    Ok(value)
}
