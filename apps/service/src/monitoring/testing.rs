//! Scripted collaborators for probe and engine tests.

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::browser::{Browser, BrowserError, BrowserSession, ElementRef};
use crate::monitoring::http::{HttpClient, HttpError, HttpResponse};

type Reply = Result<HttpResponse, HttpError>;

struct HttpScript {
    replies: Mutex<Vec<Reply>>,
    delay: Option<Duration>,
    calls: AtomicUsize,
    body_reads: AtomicUsize,
    last_accept: Mutex<Option<String>>,
}

/// HTTP client answering from a fixed script; the last reply repeats
#[derive(Clone)]
pub struct ScriptedHttp(Arc<HttpScript>);

impl ScriptedHttp {
    pub fn sequence(replies: Vec<Reply>) -> Self {
        assert!(!replies.is_empty(), "script needs at least one reply");
        Self(Arc::new(HttpScript {
            replies: Mutex::new(replies),
            delay: None,
            calls: AtomicUsize::new(0),
            body_reads: AtomicUsize::new(0),
            last_accept: Mutex::new(None),
        }))
    }

    pub fn status(status: u16) -> Self {
        Self::sequence(vec![Ok(HttpResponse { status, body: String::new() })])
    }

    pub fn body(status: u16, body: &str) -> Self {
        Self::sequence(vec![Ok(HttpResponse { status, body: body.to_string() })])
    }

    pub fn error(error: HttpError) -> Self {
        Self::sequence(vec![Err(error)])
    }

    pub fn delayed(delay: Duration, response: HttpResponse) -> Self {
        Self(Arc::new(HttpScript {
            replies: Mutex::new(vec![Ok(response)]),
            delay: Some(delay),
            calls: AtomicUsize::new(0),
            body_reads: AtomicUsize::new(0),
            last_accept: Mutex::new(None),
        }))
    }

    pub fn calls(&self) -> usize {
        self.0.calls.load(Ordering::SeqCst)
    }

    pub fn last_accept(&self) -> Option<String> {
        self.0.last_accept.lock().unwrap().clone()
    }

    /// Number of calls that asked for the body
    pub fn body_reads(&self) -> usize {
        self.0.body_reads.load(Ordering::SeqCst)
    }

    async fn next_reply(&self, accept: &str) -> Reply {
        self.0.calls.fetch_add(1, Ordering::SeqCst);
        *self.0.last_accept.lock().unwrap() = Some(accept.to_string());

        if let Some(delay) = self.0.delay {
            tokio::time::sleep(delay).await;
        }

        let mut replies = self.0.replies.lock().unwrap();
        if replies.len() > 1 { replies.remove(0) } else { replies[0].clone() }
    }
}

#[async_trait]
impl HttpClient for ScriptedHttp {
    async fn get(&self, _url: &str, accept: &str) -> Result<HttpResponse, HttpError> {
        self.0.body_reads.fetch_add(1, Ordering::SeqCst);
        self.next_reply(accept).await
    }

    async fn status(&self, _url: &str, accept: &str) -> Result<u16, HttpError> {
        self.next_reply(accept).await.map(|response| response.status)
    }
}

/// How the page behind a [`FakeBrowser`] reacts
#[derive(Debug, Clone)]
pub enum PageBehaviour {
    Visible,
    /// No element ever matches
    Missing,
    /// An element matches but is never displayed
    Hidden,
    NavigationFails(String),
    Panics,
}

struct BrowserState {
    behaviour: PageBehaviour,
    reachable: bool,
    opened: AtomicUsize,
    closed: AtomicUsize,
    visited: Mutex<Vec<String>>,
}

/// In-process browser that counts opened and released sessions
#[derive(Clone)]
pub struct FakeBrowser(Arc<BrowserState>);

impl FakeBrowser {
    pub fn new(behaviour: PageBehaviour) -> Self {
        Self::build(behaviour, true)
    }

    pub fn unreachable() -> Self {
        Self::build(PageBehaviour::Visible, false)
    }

    fn build(behaviour: PageBehaviour, reachable: bool) -> Self {
        Self(Arc::new(BrowserState {
            behaviour,
            reachable,
            opened: AtomicUsize::new(0),
            closed: AtomicUsize::new(0),
            visited: Mutex::new(Vec::new()),
        }))
    }

    pub fn opened(&self) -> usize {
        self.0.opened.load(Ordering::SeqCst)
    }

    pub fn closed(&self) -> usize {
        self.0.closed.load(Ordering::SeqCst)
    }

    pub fn visited(&self) -> Vec<String> {
        self.0.visited.lock().unwrap().clone()
    }
}

impl Browser for FakeBrowser {
    fn open(&self) -> Result<Box<dyn BrowserSession>, BrowserError> {
        if !self.0.reachable {
            return Err(BrowserError::Transport("connection refused".into()));
        }
        self.0.opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakeSession { state: self.0.clone(), closed: false }))
    }
}

struct FakeSession {
    state: Arc<BrowserState>,
    closed: bool,
}

impl BrowserSession for FakeSession {
    fn navigate(&mut self, url: &str) -> Result<(), BrowserError> {
        self.state.visited.lock().unwrap().push(url.to_string());
        match &self.state.behaviour {
            PageBehaviour::NavigationFails(reason) => Err(BrowserError::Protocol(reason.clone())),
            _ => Ok(()),
        }
    }

    fn wait_until_visible(&mut self, xpath: &str, timeout: Duration) -> Result<(), BrowserError> {
        match &self.state.behaviour {
            PageBehaviour::Missing => Err(BrowserError::NoSuchElement(xpath.to_string())),
            PageBehaviour::Hidden => Err(BrowserError::Timeout(timeout, format!("visibility of {xpath}"))),
            PageBehaviour::Panics => panic!("driver crashed"),
            _ => Ok(()),
        }
    }

    fn find_element(&mut self, xpath: &str) -> Result<ElementRef, BrowserError> {
        Ok(ElementRef(format!("element-for-{xpath}")))
    }

    fn close(&mut self) -> Result<(), BrowserError> {
        if !self.closed {
            self.closed = true;
            self.state.closed.fetch_add(1, Ordering::SeqCst);
        }
        Ok(())
    }
}

impl Drop for FakeSession {
    fn drop(&mut self) {
        let _ = self.close();
    }
}
