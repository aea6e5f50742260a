//! # Notelert Dispatch
//!
//! Everything that talks to the Notelert backend.
//!
//! ## Architecture
//! ```text
//! AuthorizationCache ──┐
//! LocationDirectory ───┼──► RequestDispatcher ──► HttpTransport (reqwest)
//! NotificationScheduler┘        │ 25s timeout, drop = abort
//!                               └──► classify (status / transport → NotelertError)
//! ```
//!
//! The dispatcher never panics and never retries: every outcome is a
//! `Result` and the caller decides what to do with failures.

pub mod auth;
pub mod classify;
pub mod dispatcher;
pub mod locations;
#[cfg(any(test, feature = "mock"))]
pub mod mock;
pub mod transport;

pub use auth::{AuthorizationCache, Subscription};
pub use classify::ErrorBody;
pub use dispatcher::{Endpoint, RequestDispatcher};
pub use locations::LocationDirectory;
pub use transport::{HttpRequest, HttpResponse, HttpTransport, Method, ReqwestTransport};
