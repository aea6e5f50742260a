//! HTTP transport seam. Production uses reqwest; tests script replies.

use async_trait::async_trait;
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
        }
    }
}

/// An outbound request, fully assembled.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    /// JSON body (POST only).
    pub body: Option<Value>,
}

impl HttpRequest {
    pub fn get(url: &str) -> Self {
        Self {
            method: Method::Get,
            url: url.to_string(),
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn post(url: &str, body: Value) -> Self {
        Self {
            method: Method::Post,
            url: url.to_string(),
            headers: Vec::new(),
            body: Some(body),
        }
    }

    pub fn header(mut self, key: &str, value: &str) -> Self {
        self.headers.push((key.to_string(), value.to_string()));
        self
    }
}

/// Raw response: any status, body as text.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub status_text: String,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        self.status < 400
    }
}

/// Performs one HTTP exchange.
///
/// `Err` carries the transport failure message; the dispatcher classifies it.
/// Implementations must release their resources when the future is dropped.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, String>;
}

/// reqwest-backed transport. Dropping the in-flight future closes the connection.
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .user_agent(concat!("Notelert/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!("⚠️ Falling back to default HTTP client: {e}");
                reqwest::Client::new()
            });
        Self { client }
    }
}

impl Default for ReqwestTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, String> {
        let mut req = match request.method {
            Method::Get => self.client.get(&request.url),
            Method::Post => self.client.post(&request.url),
        };

        for (key, value) in &request.headers {
            req = req.header(key.as_str(), value.as_str());
        }

        if let Some(body) = &request.body {
            req = req.json(body);
        }

        let resp = req.send().await.map_err(|e| {
            // Connection-level failures share one label so the classifier
            // can tell them apart from everything else.
            if e.is_connect() || e.is_request() {
                format!("NetworkError: {e}")
            } else {
                e.to_string()
            }
        })?;

        let status = resp.status();
        let status_text = status.canonical_reason().unwrap_or_default().to_string();
        let body = resp
            .text()
            .await
            .map_err(|e| format!("NetworkError: failed to read body: {e}"))?;

        Ok(HttpResponse {
            status: status.as_u16(),
            status_text,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_builders() {
        let req = HttpRequest::post("https://x/api", serde_json::json!({"a": 1}))
            .header("x-plugin-token", "abc");
        assert_eq!(req.method, Method::Post);
        assert_eq!(req.headers, vec![("x-plugin-token".into(), "abc".into())]);
        assert!(req.body.is_some());

        let req = HttpRequest::get("https://x/api");
        assert_eq!(req.method.as_str(), "GET");
        assert!(req.body.is_none());
    }

    #[test]
    fn test_response_success_boundary() {
        let ok = HttpResponse { status: 399, status_text: String::new(), body: String::new() };
        let bad = HttpResponse { status: 400, status_text: String::new(), body: String::new() };
        assert!(ok.is_success());
        assert!(!bad.is_success());
    }
}
