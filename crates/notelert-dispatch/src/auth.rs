//! Premium authorization cache.
//!
//! One instance per application, owned by the composition root and shared
//! by `Arc`. Reads never wait on the network; refreshes go through the
//! dispatcher and replace the whole state at once.
//!
//! Refresh rules:
//! - malformed token (not 64 hex chars) → not premium, no request
//! - fresh (< TTL) and not forced → cached value
//! - 200 → new value, fetch time stamped
//! - 401/403/404 → not premium, fetch time stamped
//! - network-class failure, 429 or a malformed body → previous value marked
//!   `cached`, or not premium if there was nothing resolved to fall back on
//!
//! `invalidate` (and a token change) starts a new epoch. A refresh that
//! began in an older epoch is dropped when it completes.

use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock, Weak};
use std::time::Duration;

use chrono::{DateTime, Utc};
use notelert_core::{AuthorizationStatus, ErrorKind, NotelertError, is_valid_plugin_token};
use serde::Deserialize;
use tokio::time::Instant;

use crate::dispatcher::{Endpoint, RequestDispatcher};

/// Five minutes.
pub const DEFAULT_TTL: Duration = Duration::from_secs(5 * 60);

/// Refreshes attempted by one `get_status` call when its results keep
/// being superseded by invalidations.
const MAX_REFRESH_ATTEMPTS: usize = 3;

type Listener = Arc<dyn Fn(&AuthorizationStatus) + Send + Sync>;
type ListenerList = Mutex<Vec<(u64, Listener)>>;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PremiumStatusResponse {
    #[serde(default)]
    is_premium: bool,
    #[serde(default)]
    expires_at: Option<DateTime<Utc>>,
}

struct CacheState {
    status: AuthorizationStatus,
    last_fetch: Option<Instant>,
    /// Bumped by `invalidate`, under the same lock as the status.
    epoch: u64,
}

pub struct AuthorizationCache {
    dispatcher: Arc<RequestDispatcher>,
    ttl: Duration,
    token: RwLock<String>,
    state: RwLock<CacheState>,
    /// Bumped after every refresh whose result was committed.
    generation: AtomicU64,
    /// Serializes refreshes so overlapping callers share one request.
    refresh_gate: tokio::sync::Mutex<()>,
    listeners: Arc<ListenerList>,
    next_listener_id: AtomicU64,
}

/// Handle returned by [`AuthorizationCache::subscribe`].
pub struct Subscription {
    id: u64,
    listeners: Weak<ListenerList>,
}

impl Subscription {
    /// Stop receiving updates.
    pub fn unsubscribe(self) {
        if let Some(listeners) = self.listeners.upgrade() {
            listeners
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .retain(|(id, _)| *id != self.id);
        }
    }
}

impl AuthorizationCache {
    pub fn new(dispatcher: Arc<RequestDispatcher>) -> Self {
        Self {
            dispatcher,
            ttl: DEFAULT_TTL,
            token: RwLock::new(String::new()),
            state: RwLock::new(CacheState {
                status: AuthorizationStatus::initial(),
                last_fetch: None,
                epoch: 0,
            }),
            generation: AtomicU64::new(0),
            refresh_gate: tokio::sync::Mutex::new(()),
            listeners: Arc::new(Mutex::new(Vec::new())),
            next_listener_id: AtomicU64::new(1),
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Set the token used for refreshes. A different token invalidates the cache.
    pub fn set_token(&self, token: &str) {
        let token = token.trim();
        let changed = {
            let mut current = self.token.write().unwrap_or_else(|e| e.into_inner());
            if *current == token {
                false
            } else {
                *current = token.to_string();
                true
            }
        };
        if changed {
            tracing::debug!("🔑 Plugin token changed, invalidating premium status");
            self.invalidate();
        }
    }

    /// Set the token and resolve the status once.
    pub async fn preload(&self, token: &str) -> AuthorizationStatus {
        self.set_token(token);
        self.get_status(false).await
    }

    /// Current status, refreshing through the dispatcher when stale or forced.
    /// Never returns a `loading` status.
    pub async fn get_status(&self, force_refresh: bool) -> AuthorizationStatus {
        if !is_valid_plugin_token(&self.current_token()) {
            return self.reject_malformed_token();
        }

        if !force_refresh && self.is_fresh() {
            return self.get_cached_status();
        }

        let seen = self.generation.load(Ordering::SeqCst);
        let _gate = self.refresh_gate.lock().await;
        if self.generation.load(Ordering::SeqCst) != seen {
            // Another caller committed a refresh while we waited.
            let status = self.get_cached_status();
            if !status.loading {
                return status;
            }
        }

        for _ in 0..MAX_REFRESH_ATTEMPTS {
            let token = self.current_token();
            if !is_valid_plugin_token(&token) {
                return self.reject_malformed_token();
            }
            let epoch = self.current_epoch();
            let (status, committed) = self.refresh(&token, epoch).await;
            if committed {
                self.generation.fetch_add(1, Ordering::SeqCst);
                return status;
            }
            tracing::debug!("Premium status was invalidated during refresh, retrying");
        }

        let status = self.get_cached_status();
        if status.loading {
            AuthorizationStatus::not_premium()
        } else {
            status
        }
    }

    /// Non-blocking read of the last committed status.
    pub fn get_cached_status(&self) -> AuthorizationStatus {
        self.state
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .status
            .clone()
    }

    /// Reset to the initial loading state (logout, token change).
    /// Refreshes already in flight will not overwrite it.
    pub fn invalidate(&self) {
        let status = AuthorizationStatus::initial();
        {
            let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
            state.status = status.clone();
            state.last_fetch = None;
            state.epoch += 1;
        }
        self.notify(&status);
    }

    /// Register a listener called after every committed change.
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&AuthorizationStatus) + Send + Sync + 'static,
    {
        let id = self.next_listener_id.fetch_add(1, Ordering::SeqCst);
        self.listeners
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((id, Arc::new(listener)));
        Subscription {
            id,
            listeners: Arc::downgrade(&self.listeners),
        }
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    fn current_token(&self) -> String {
        self.token.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    fn current_epoch(&self) -> u64 {
        self.state.read().unwrap_or_else(|e| e.into_inner()).epoch
    }

    fn reject_malformed_token(&self) -> AuthorizationStatus {
        tracing::debug!("Plugin token missing or malformed, skipping premium check");
        let status = AuthorizationStatus::not_premium();
        self.commit(&self.current_token(), self.current_epoch(), status.clone(), None);
        status
    }

    fn is_fresh(&self) -> bool {
        let state = self.state.read().unwrap_or_else(|e| e.into_inner());
        state
            .last_fetch
            .is_some_and(|at| at.elapsed() < self.ttl)
    }

    /// Fetch and commit. Returns the status and whether it was committed.
    async fn refresh(&self, token: &str, epoch: u64) -> (AuthorizationStatus, bool) {
        let result = self
            .dispatcher
            .call(Endpoint::PremiumStatus, token, None)
            .await
            .and_then(|value| {
                serde_json::from_value::<PremiumStatusResponse>(value).map_err(NotelertError::from)
            });

        let (status, fetched_at) = match result {
            Ok(body) => {
                let status = AuthorizationStatus::resolved(body.is_premium, body.expires_at);
                tracing::info!("⭐ Premium status refreshed: premium={}", status.is_premium);
                (status, Some(Instant::now()))
            }
            Err(e) if e.is_network_class() => {
                tracing::warn!("⚠️ Premium status backend unreachable: {e}");
                (self.fallback_status(), None)
            }
            Err(e) if matches!(e.kind(), ErrorKind::Auth | ErrorKind::NotFound) => {
                tracing::info!("Premium status: account not premium ({e})");
                (AuthorizationStatus::not_premium(), Some(Instant::now()))
            }
            Err(e) => {
                tracing::warn!("⚠️ Premium status check rejected: {e}");
                (self.fallback_status(), None)
            }
        };

        let committed = self.commit(token, epoch, status.clone(), fetched_at);
        (status, committed)
    }

    /// Previous resolved value marked `cached`, else not premium.
    fn fallback_status(&self) -> AuthorizationStatus {
        let previous = self.get_cached_status();
        if previous.loading {
            AuthorizationStatus::not_premium()
        } else {
            AuthorizationStatus {
                cached: true,
                ..previous
            }
        }
    }

    /// Replace the state in one write, then notify listeners.
    /// Results for a replaced token or an older epoch are dropped.
    fn commit(
        &self,
        token: &str,
        epoch: u64,
        status: AuthorizationStatus,
        fetched_at: Option<Instant>,
    ) -> bool {
        if self.current_token() != token {
            tracing::debug!("Discarding premium status for a replaced token");
            return false;
        }
        {
            let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
            if state.epoch != epoch {
                tracing::debug!("Discarding premium status from before an invalidation");
                return false;
            }
            if state.status == status && fetched_at.is_none() {
                return true;
            }
            state.status = status.clone();
            if fetched_at.is_some() {
                state.last_fetch = fetched_at;
            }
        }
        self.notify(&status);
        true
    }

    fn notify(&self, status: &AuthorizationStatus) {
        let listeners: Vec<Listener> = self
            .listeners
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .map(|(_, l)| l.clone())
            .collect();

        for listener in listeners {
            if std::panic::catch_unwind(AssertUnwindSafe(|| listener(status))).is_err() {
                tracing::warn!("⚠️ Premium status listener panicked");
            }
        }
    }
}
