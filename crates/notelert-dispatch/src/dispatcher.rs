//! Request dispatcher: one timeout-bounded HTTP exchange, classified result.

use std::sync::Arc;
use std::time::Duration;

use notelert_core::{ApiConfig, NotelertError, Result};
use serde_json::Value;
use tokio::time::Instant;

use crate::classify::{classify_status, classify_transport};
use crate::transport::{HttpRequest, HttpResponse, HttpTransport, Method, ReqwestTransport};

/// Backend endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    SchedulePush,
    ScheduleEmail,
    PremiumStatus,
    ListLocations,
}

impl Endpoint {
    pub fn method(&self) -> Method {
        match self {
            Self::SchedulePush | Self::ScheduleEmail => Method::Post,
            Self::PremiumStatus | Self::ListLocations => Method::Get,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::SchedulePush => "schedule-push",
            Self::ScheduleEmail => "schedule-email",
            Self::PremiumStatus => "premium-status",
            Self::ListLocations => "list-locations",
        }
    }

    fn path<'a>(&self, api: &'a ApiConfig) -> &'a str {
        match self {
            Self::SchedulePush => &api.schedule_push_path,
            Self::ScheduleEmail => &api.schedule_email_path,
            Self::PremiumStatus => &api.premium_status_path,
            Self::ListLocations => &api.list_locations_path,
        }
    }
}

/// Sends requests through an [`HttpTransport`] with a hard deadline.
///
/// On timeout the transport future is dropped, which aborts the underlying
/// connection. No retries.
pub struct RequestDispatcher {
    transport: Arc<dyn HttpTransport>,
    api: ApiConfig,
    timeout: Duration,
}

impl RequestDispatcher {
    pub fn new(transport: Arc<dyn HttpTransport>, api: ApiConfig) -> Self {
        let timeout = api.timeout();
        Self {
            transport,
            api,
            timeout,
        }
    }

    /// Dispatcher over a real reqwest client.
    pub fn with_reqwest(api: ApiConfig) -> Self {
        Self::new(Arc::new(ReqwestTransport::new()), api)
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn api(&self) -> &ApiConfig {
        &self.api
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Perform one exchange. `Ok` only for status < 400.
    pub async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        let method = request.method.as_str();
        let url = request.url.clone();
        let started = Instant::now();

        let outcome = tokio::time::timeout(self.timeout, self.transport.execute(request)).await;
        let elapsed = started.elapsed().as_millis();

        match outcome {
            Err(_) => {
                tracing::debug!("⏱️ {method} {url} aborted after {elapsed}ms");
                Err(NotelertError::TimedOut(self.timeout))
            }
            Ok(Err(message)) => {
                tracing::debug!("{method} {url} transport failure: {message}");
                Err(classify_transport(&message))
            }
            Ok(Ok(resp)) if resp.is_success() => {
                tracing::debug!("{method} {url} → {} ({elapsed}ms)", resp.status);
                Ok(resp)
            }
            Ok(Ok(resp)) => {
                tracing::debug!("{method} {url} → {} ({elapsed}ms)", resp.status);
                Err(classify_status(resp.status, &resp.status_text, &resp.body))
            }
        }
    }

    /// Call a backend endpoint with the plugin token header and decode the JSON reply.
    /// An empty success body decodes to `Value::Null`.
    pub async fn call(
        &self,
        endpoint: Endpoint,
        token: &str,
        body: Option<Value>,
    ) -> Result<Value> {
        let url = self.api.url(endpoint.path(&self.api));
        let request = match endpoint.method() {
            Method::Get => HttpRequest::get(&url),
            Method::Post => HttpRequest::post(&url, body.unwrap_or(Value::Null)),
        }
        .header(&self.api.token_header, token);

        let resp = self.send(request).await?;
        if resp.body.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&resp.body).map_err(|e| {
            NotelertError::Unknown(format!("Malformed {} response: {e}", endpoint.name()))
        })
    }
}
