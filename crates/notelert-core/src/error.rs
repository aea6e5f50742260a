//! Error taxonomy for every Notelert network and validation path.

use std::time::Duration;

/// Errors surfaced by the dispatcher, the builder and the scheduler.
#[derive(Debug, thiserror::Error)]
pub enum NotelertError {
    /// Malformed date, incomplete location or malformed token.
    /// Never sent over the wire.
    #[error("Validation error: {0}")]
    Validation(String),

    /// 401/403: invalid token or not premium.
    #[error("Authorization error (HTTP {status}): {message}")]
    Auth { status: u16, message: String },

    /// 404: account not provisioned.
    #[error("Not found: {0}")]
    NotFound(String),

    /// 429: quota exhausted.
    #[error("Rate limited: {0}")]
    RateLimited(String),

    /// No response within the dispatcher timeout.
    #[error("Request timed out after {}s", .0.as_secs())]
    TimedOut(Duration),

    /// Offline, CORS or DNS failure.
    #[error("Network error: {0}")]
    Network(String),

    /// Any other HTTP status >= 400.
    #[error("Server error (HTTP {status}): {message}")]
    Server { status: u16, message: String },

    /// Transport failure that does not look like a network problem.
    #[error("Unknown error: {0}")]
    Unknown(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Fieldless mirror of [`NotelertError`] for matching and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Validation,
    Auth,
    NotFound,
    RateLimited,
    TimedOut,
    Network,
    Server,
    Unknown,
    Config,
    Io,
    Json,
}

impl NotelertError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::Auth { .. } => ErrorKind::Auth,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::RateLimited(_) => ErrorKind::RateLimited,
            Self::TimedOut(_) => ErrorKind::TimedOut,
            Self::Network(_) => ErrorKind::Network,
            Self::Server { .. } => ErrorKind::Server,
            Self::Unknown(_) => ErrorKind::Unknown,
            Self::Config(_) => ErrorKind::Config,
            Self::Io(_) => ErrorKind::Io,
            Self::Json(_) => ErrorKind::Json,
        }
    }

    /// HTTP status carried by the error, if it came from a response.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Auth { status, .. } | Self::Server { status, .. } => Some(*status),
            Self::NotFound(_) => Some(404),
            Self::RateLimited(_) => Some(429),
            _ => None,
        }
    }

    /// Failures where the backend gave no trustworthy answer.
    /// The authorization cache keeps its previous value for these.
    pub fn is_network_class(&self) -> bool {
        matches!(
            self,
            Self::TimedOut(_) | Self::Network(_) | Self::Server { .. } | Self::Unknown(_)
        )
    }

    /// Short user-facing text for a notice.
    pub fn user_message(&self) -> String {
        match self {
            Self::Validation(msg) => msg.clone(),
            Self::Auth { .. } => {
                "Your plugin token is invalid or your account is not premium.".into()
            }
            Self::NotFound(_) => "No Notelert account is linked to this token yet.".into(),
            Self::RateLimited(_) => "Reminder quota reached. Try again later.".into(),
            Self::TimedOut(_) => "The Notelert server did not respond in time.".into(),
            Self::Network(_) => {
                "Could not reach the Notelert server. Check your connection.".into()
            }
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, NotelertError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_and_status() {
        let err = NotelertError::Auth { status: 403, message: "Forbidden".into() };
        assert_eq!(err.kind(), ErrorKind::Auth);
        assert_eq!(err.status(), Some(403));
        assert!(!err.is_network_class());

        let err = NotelertError::RateLimited("slow down".into());
        assert_eq!(err.status(), Some(429));
        assert_eq!(NotelertError::Validation("x".into()).status(), None);
    }

    #[test]
    fn test_network_class() {
        assert!(NotelertError::TimedOut(Duration::from_secs(25)).is_network_class());
        assert!(NotelertError::Network("offline".into()).is_network_class());
        assert!(
            NotelertError::Server { status: 503, message: "down".into() }.is_network_class()
        );
        assert!(!NotelertError::NotFound("gone".into()).is_network_class());
    }

    #[test]
    fn test_timeout_display() {
        let err = NotelertError::TimedOut(Duration::from_secs(25));
        assert_eq!(err.to_string(), "Request timed out after 25s");
    }
}
