//! # Notelert Scheduler
//!
//! Turns reminder patterns detected in notes into backend requests
//! (desktop) or `notelert://` deep links (mobile).
//!
//! - `clean` — strips `:@date,time` / `:#location` authoring syntax
//! - `request` — pure push/email request bodies with validation
//! - `deeplink` — percent-encoded deep link builder and decoder
//! - `scheduler` — the per-platform decision tree

pub mod clean;
pub mod deeplink;
pub mod request;
pub mod scheduler;

pub use clean::clean_message;
pub use deeplink::DeepLink;
pub use request::{EmailRequest, PushRequest, build_email_request, build_push_request};
pub use scheduler::{
    DispatchResult, EmailOutcome, NotificationScheduler, ScheduleOutcome, new_notification_id,
};
