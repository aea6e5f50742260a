//! Host application hooks.

use crate::error::Result;
use crate::types::ScheduledEmailRecord;

/// What the embedding application provides to the scheduler.
///
/// Rendering, persistence and navigation stay on the host side; the
/// scheduler only calls through this trait.
pub trait HostBridge: Send + Sync {
    /// Show a short user-visible notice.
    fn notice(&self, message: &str);

    /// Hand navigation off to a deep link. Fire-and-forget.
    fn open_url(&self, uri: &str) -> Result<()>;

    /// Persist a scheduled email. Called exactly once per scheduled email.
    fn on_email_scheduled(&self, record: ScheduledEmailRecord);
}
