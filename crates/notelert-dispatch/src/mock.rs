//! Scripted in-memory transport for tests.
//!
//! Replies are matched by URL suffix (e.g. `"/schedule-push"`). The last
//! scripted reply for a suffix repeats until a new one is pushed.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::transport::{HttpRequest, HttpResponse, HttpTransport};

#[derive(Debug, Clone)]
pub enum MockReply {
    /// Status + JSON body.
    Json(u16, Value),
    /// Status + raw body.
    Text(u16, String),
    /// Transport failure with this message.
    Fail(String),
    /// Never answers.
    Hang,
}

/// Replies for one URL suffix. `repeating` is set once the last reply has
/// been served; a later push replaces it instead of queueing behind it.
struct Script {
    suffix: String,
    replies: VecDeque<MockReply>,
    repeating: bool,
}

pub struct MockTransport {
    scripts: Mutex<Vec<Script>>,
    requests: Mutex<Vec<HttpRequest>>,
    delay: Duration,
    in_flight: Arc<AtomicUsize>,
}

/// Decrements the in-flight counter when the request future is dropped.
struct InFlightGuard(Arc<AtomicUsize>);

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl MockTransport {
    pub fn new() -> Self {
        Self {
            scripts: Mutex::new(Vec::new()),
            requests: Mutex::new(Vec::new()),
            delay: Duration::ZERO,
            in_flight: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Delay every reply (used to overlap concurrent callers).
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn on(self, path_suffix: &str, reply: MockReply) -> Self {
        self.push(path_suffix, reply);
        self
    }

    pub fn push(&self, path_suffix: &str, reply: MockReply) {
        let mut scripts = self.scripts.lock().unwrap_or_else(|e| e.into_inner());
        match scripts.iter_mut().find(|s| s.suffix == path_suffix) {
            Some(script) => {
                if script.repeating {
                    script.replies.clear();
                    script.repeating = false;
                }
                script.replies.push_back(reply);
            }
            None => scripts.push(Script {
                suffix: path_suffix.to_string(),
                replies: VecDeque::from([reply]),
                repeating: false,
            }),
        }
    }

    /// Every request seen so far, in order.
    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn calls_to(&self, path_suffix: &str) -> usize {
        self.requests()
            .iter()
            .filter(|r| r.url.ends_with(path_suffix))
            .count()
    }

    pub fn total_calls(&self) -> usize {
        self.requests().len()
    }

    /// Requests whose futures are still alive.
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    fn next_reply(&self, url: &str) -> Option<MockReply> {
        let mut scripts = self.scripts.lock().unwrap_or_else(|e| e.into_inner());
        let script = scripts.iter_mut().find(|s| url.ends_with(s.suffix.as_str()))?;
        if script.replies.len() > 1 {
            script.replies.pop_front()
        } else {
            script.repeating = true;
            script.replies.front().cloned()
        }
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

fn reason(status: u16) -> String {
    reqwest::StatusCode::from_u16(status)
        .ok()
        .and_then(|s| s.canonical_reason())
        .unwrap_or_default()
        .to_string()
}

#[async_trait]
impl HttpTransport for MockTransport {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, String> {
        self.in_flight.fetch_add(1, Ordering::SeqCst);
        let _guard = InFlightGuard(self.in_flight.clone());

        let reply = self.next_reply(&request.url);
        let url = request.url.clone();
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(request);

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        match reply {
            Some(MockReply::Json(status, body)) => Ok(HttpResponse {
                status,
                status_text: reason(status),
                body: body.to_string(),
            }),
            Some(MockReply::Text(status, body)) => Ok(HttpResponse {
                status,
                status_text: reason(status),
                body,
            }),
            Some(MockReply::Fail(message)) => Err(message),
            Some(MockReply::Hang) => {
                std::future::pending::<()>().await;
                Err("unreachable".into())
            }
            None => Err(format!("no scripted reply for {url}")),
        }
    }
}
