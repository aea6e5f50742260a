//! # Notelert Core
//!
//! Shared building blocks for the Notelert client:
//! - reminder data model (patterns, locations, email records, premium status)
//! - error taxonomy used by every network path
//! - TOML configuration (`~/.notelert/config.toml`)
//! - the `HostBridge` trait the embedding application implements

pub mod config;
pub mod error;
pub mod host;
pub mod types;

pub use config::{ApiConfig, NotelertConfig, PlatformConfig, Settings};
pub use error::{ErrorKind, NotelertError, Result};
pub use host::HostBridge;
pub use types::{
    AuthorizationStatus, LocationTarget, Platform, PlatformContext, Recurrence,
    RecurrenceFrequency, ReminderKind, ReminderPattern, SavedLocation, ScheduledEmailRecord,
    ScheduledNotification, SourceRef,
};

/// Returns true when `token` has the shape of a plugin token:
/// exactly 64 ASCII hex characters.
pub fn is_valid_plugin_token(token: &str) -> bool {
    token.len() == 64 && token.bytes().all(|b| b.is_ascii_hexdigit())
}
