//! Remote browser automation used by DOM_NODE probes.
//!
//! Every call here blocks the calling thread. Run it on the DOM worker pool,
//! never on the async runtime.

pub mod webdriver;

use std::time::Duration;
use thiserror::Error;

pub use webdriver::WebDriverBrowser;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BrowserError {
    /// The page has no element matching the selector
    #[error("no such element: {0}")]
    NoSuchElement(String),

    /// The element was found but went away before it could be inspected
    #[error("stale element reference: {0}")]
    StaleElement(String),

    #[error("timed out after {0:?} waiting for {1}")]
    Timeout(Duration, String),

    /// The driver gave up on a command under its own timeouts
    #[error("webdriver command timed out: {0}")]
    DriverTimeout(String),

    #[error("browser connection failed: {0}")]
    Transport(String),

    #[error("webdriver error: {0}")]
    Protocol(String),
}

/// Opaque reference to an element inside a session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementRef(pub String);

/// Factory for browser sessions
pub trait Browser: Send + Sync {
    fn open(&self) -> Result<Box<dyn BrowserSession>, BrowserError>;
}

/// One live browser session
///
/// Implementations must release the remote session on drop when
/// [`close`](BrowserSession::close) was not called.
pub trait BrowserSession: Send {
    fn navigate(&mut self, url: &str) -> Result<(), BrowserError>;

    /// Block until an element matching `xpath` is displayed or `timeout` passes
    ///
    /// Fails with [`BrowserError::NoSuchElement`] when nothing ever matched and
    /// with [`BrowserError::Timeout`] when a match never became visible.
    fn wait_until_visible(&mut self, xpath: &str, timeout: Duration) -> Result<(), BrowserError>;

    fn find_element(&mut self, xpath: &str) -> Result<ElementRef, BrowserError>;

    fn close(&mut self) -> Result<(), BrowserError>;
}
