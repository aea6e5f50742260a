//! Maps HTTP statuses and transport failures onto [`NotelertError`].

use notelert_core::NotelertError;
use serde_json::Value;

/// What could be recovered from an error response body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorBody {
    /// JSON body with a usable `message` or `error` field.
    Message(String),
    /// Not JSON, or JSON without either field.
    Unparseable,
}

/// Parse an error body. `message` wins over `error`; `error` may also be
/// an object carrying its own `message`.
pub fn parse_error_body(body: &str) -> ErrorBody {
    let Ok(value) = serde_json::from_str::<Value>(body) else {
        return ErrorBody::Unparseable;
    };

    let text = value
        .get("message")
        .and_then(Value::as_str)
        .or_else(|| value.get("error").and_then(Value::as_str))
        .or_else(|| {
            value
                .get("error")
                .and_then(|e| e.get("message"))
                .and_then(Value::as_str)
        })
        .map(str::trim)
        .filter(|s| !s.is_empty());

    match text {
        Some(t) => ErrorBody::Message(t.to_string()),
        None => ErrorBody::Unparseable,
    }
}

/// Classify a response with status >= 400.
pub fn classify_status(status: u16, status_text: &str, body: &str) -> NotelertError {
    let message = match parse_error_body(body) {
        ErrorBody::Message(m) => m,
        ErrorBody::Unparseable => format!("HTTP {status}: {status_text}"),
    };

    match status {
        401 | 403 => NotelertError::Auth { status, message },
        404 => NotelertError::NotFound(message),
        429 => NotelertError::RateLimited(message),
        _ => NotelertError::Server { status, message },
    }
}

/// Classify a transport failure by its message.
pub fn classify_transport(message: &str) -> NotelertError {
    const NETWORK_MARKERS: [&str; 3] = ["Failed to fetch", "NetworkError", "CORS"];

    if NETWORK_MARKERS.iter().any(|m| message.contains(m)) {
        NotelertError::Network(message.to_string())
    } else {
        NotelertError::Unknown(message.to_string())
    }
}
