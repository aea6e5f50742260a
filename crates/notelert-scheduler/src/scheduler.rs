//! Notification scheduler — desktop push/email flows and mobile hand-off.
//!
//! ```text
//! create_notification(pattern, ctx)
//!   ├── iOS      → notice, nothing sent
//!   ├── Android  → notelert:// deep link → host.open_url
//!   └── Desktop
//!         ├── bad token → guidance notice
//!         └── build → schedule-push ──ok──► (time + email) schedule-email
//!                                             └── failure: warn only, push stays
//! ```
//!
//! Only validation errors escape `create_notification`; they keep the
//! editing UI open. Everything else ends as one notice plus one log line.

use std::borrow::Cow;
use std::sync::{Arc, RwLock};

use chrono::Utc;
use notelert_core::{
    HostBridge, NotelertError, Platform, PlatformContext, ReminderKind, ReminderPattern, Result,
    ScheduledEmailRecord, ScheduledNotification, Settings,
};
use notelert_dispatch::{AuthorizationCache, Endpoint, RequestDispatcher};
use serde::Deserialize;

use crate::deeplink::{DeepLink, return_link};
use crate::request::{build_email_request, build_push_request, parse_schedule};

/// Result of a single push dispatch: acknowledgement or error, never both.
pub type DispatchResult = Result<ScheduledNotification>;

/// What happened to a `create_notification` call.
#[derive(Debug)]
pub enum ScheduleOutcome {
    /// Backend accepted the push.
    Scheduled {
        notification: ScheduledNotification,
        kind: ReminderKind,
        email: EmailOutcome,
    },
    /// Desktop without a usable token; the user was told how to get one.
    TokenRequired,
    /// Remote reminders are not offered on this platform.
    PlatformUnsupported,
    /// Handed to the mobile app through a deep link.
    HandedOff { notification_id: String, uri: String },
    /// Failed after validation; the user has already been notified.
    Failed(NotelertError),
}

impl ScheduleOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Scheduled { .. } | Self::HandedOff { .. })
    }

    pub fn notification_id(&self) -> Option<&str> {
        match self {
            Self::Scheduled { notification, .. } => Some(&notification.notification_id),
            Self::HandedOff { notification_id, .. } => Some(notification_id),
            _ => None,
        }
    }
}

/// Companion email result for a desktop time reminder.
#[derive(Debug)]
pub enum EmailOutcome {
    /// No email configured, or not a time reminder.
    NotRequested,
    /// Premium status is known to be inactive.
    SkippedNotPremium,
    Scheduled(ScheduledEmailRecord),
    /// Logged as a warning; the push is still scheduled.
    Failed(NotelertError),
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EmailResponse {
    #[serde(default)]
    notification_id: Option<String>,
}

pub struct NotificationScheduler {
    dispatcher: Arc<RequestDispatcher>,
    auth: Arc<AuthorizationCache>,
    host: Arc<dyn HostBridge>,
    settings: RwLock<Settings>,
}

impl NotificationScheduler {
    pub fn new(
        dispatcher: Arc<RequestDispatcher>,
        auth: Arc<AuthorizationCache>,
        host: Arc<dyn HostBridge>,
        settings: Settings,
    ) -> Self {
        auth.set_token(&settings.plugin_token);
        Self {
            dispatcher,
            auth,
            host,
            settings: RwLock::new(settings),
        }
    }

    /// Replace the settings snapshot. A new token invalidates the premium cache.
    pub fn update_settings(&self, settings: Settings) {
        self.auth.set_token(&settings.plugin_token);
        *self.settings.write().unwrap_or_else(|e| e.into_inner()) = settings;
    }

    pub fn settings(&self) -> Settings {
        self.settings.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn auth(&self) -> &Arc<AuthorizationCache> {
        &self.auth
    }

    /// Schedule a reminder for the current platform.
    ///
    /// Returns `Err` only for validation failures that the caller should
    /// fix before retrying (the editing UI stays open).
    pub async fn create_notification(
        &self,
        pattern: &ReminderPattern,
        ctx: &PlatformContext,
    ) -> Result<ScheduleOutcome> {
        let notification_id = new_notification_id();

        match ctx.platform {
            Platform::Ios => {
                tracing::info!("📱 Remote reminders are not available on iOS");
                self.host
                    .notice("Notelert reminders are not available on iOS yet.");
                Ok(ScheduleOutcome::PlatformUnsupported)
            }
            Platform::Android => Ok(self.hand_off(pattern, ctx, notification_id)),
            Platform::Desktop => self.schedule_desktop(pattern, ctx, notification_id).await,
        }
    }

    /// Schedule only the email for an already scheduled push.
    /// Every failure is returned so a confirmation dialog can stay open.
    pub async fn schedule_email(
        &self,
        pattern: &ReminderPattern,
        notification_id: &str,
    ) -> Result<ScheduledEmailRecord> {
        let settings = self.settings();
        if !settings.has_valid_token() {
            return Err(NotelertError::Validation(
                "Set a valid plugin token before scheduling emails".into(),
            ));
        }
        let email = settings
            .email()
            .ok_or_else(|| NotelertError::Validation("No email address configured".into()))?;

        self.send_email(pattern, notification_id, email, &settings.plugin_token)
            .await
            .inspect_err(|e| {
                tracing::warn!("⚠️ Email reminder '{}' failed: {e}", pattern.title)
            })
    }

    /// Send the push request for a validated pattern.
    pub async fn schedule_push(
        &self,
        pattern: &ReminderPattern,
        notification_id: &str,
        deep_link: Option<&str>,
    ) -> DispatchResult {
        let token = self.settings().plugin_token;
        let request = build_push_request(pattern, notification_id, deep_link)?;
        let value = self
            .dispatcher
            .call(Endpoint::SchedulePush, &token, Some(serde_json::to_value(&request)?))
            .await?;

        // Older backends answer with an empty body; fall back to our id.
        let mut ack: ScheduledNotification =
            serde_json::from_value(value).unwrap_or_else(|e| {
                tracing::debug!("Unreadable push acknowledgement ({e}), keeping {notification_id}");
                ScheduledNotification {
                    notification_id: notification_id.to_string(),
                    scheduled_for: None,
                }
            });
        if ack.notification_id.is_empty() {
            ack.notification_id = notification_id.to_string();
        }
        Ok(ack)
    }

    fn hand_off(
        &self,
        pattern: &ReminderPattern,
        ctx: &PlatformContext,
        notification_id: String,
    ) -> ScheduleOutcome {
        let settings = self.settings();
        let pattern = resolve_location(pattern, &settings);
        let ctx = with_vault(ctx, &settings);
        let uri = DeepLink::for_pattern(&pattern, &ctx).to_uri();

        match self.host.open_url(&uri) {
            Ok(()) => {
                tracing::info!("📲 Handed reminder '{}' to the Notelert app", pattern.title);
                ScheduleOutcome::HandedOff {
                    notification_id,
                    uri,
                }
            }
            Err(e) => {
                tracing::error!("❌ Could not open Notelert app: {e}");
                self.host
                    .notice("Could not open the Notelert app. Is it installed?");
                ScheduleOutcome::Failed(e)
            }
        }
    }

    async fn schedule_desktop(
        &self,
        pattern: &ReminderPattern,
        ctx: &PlatformContext,
        notification_id: String,
    ) -> Result<ScheduleOutcome> {
        let settings = self.settings();
        if !settings.has_valid_token() {
            tracing::info!("🔑 No valid plugin token, skipping remote reminder");
            self.host.notice(
                "Add your plugin token from the Notelert app in settings to schedule reminders.",
            );
            return Ok(ScheduleOutcome::TokenRequired);
        }

        let pattern = resolve_location(pattern, &settings);
        let kind = pattern.resolved_kind();
        let ctx = with_vault(ctx, &settings);
        let deep_link = match (ctx.vault_name.as_deref(), &pattern.source) {
            (Some(vault), Some(source)) => Some(return_link(vault, source)),
            _ => None,
        };

        // Validate before touching the network.
        if let Err(e) = build_push_request(&pattern, &notification_id, deep_link.as_deref()) {
            tracing::warn!("⚠️ Reminder '{}' rejected: {e}", pattern.title);
            self.host.notice(&e.user_message());
            return Err(e);
        }

        let notification = match self
            .schedule_push(&pattern, &notification_id, deep_link.as_deref())
            .await
        {
            Ok(ack) => ack,
            Err(e) => {
                tracing::error!("❌ Failed to schedule reminder '{}': {e}", pattern.title);
                self.host.notice(&e.user_message());
                return Ok(ScheduleOutcome::Failed(e));
            }
        };

        tracing::info!(
            "✅ Reminder '{}' scheduled ({})",
            pattern.title,
            notification.notification_id
        );

        let email = if kind == ReminderKind::Time {
            self.companion_email(&pattern, &notification_id, &settings)
                .await
        } else {
            EmailOutcome::NotRequested
        };

        self.host.notice(match &email {
            EmailOutcome::Scheduled(_) => "Reminder and email scheduled.",
            _ => "Reminder scheduled.",
        });

        Ok(ScheduleOutcome::Scheduled {
            notification,
            kind,
            email,
        })
    }

    async fn companion_email(
        &self,
        pattern: &ReminderPattern,
        notification_id: &str,
        settings: &Settings,
    ) -> EmailOutcome {
        let Some(email) = settings.email() else {
            return EmailOutcome::NotRequested;
        };

        let status = self.auth.get_cached_status();
        if !status.loading && !status.is_premium {
            tracing::debug!("Email reminders need premium, skipping email");
            return EmailOutcome::SkippedNotPremium;
        }

        match self
            .send_email(pattern, notification_id, email, &settings.plugin_token)
            .await
        {
            Ok(record) => EmailOutcome::Scheduled(record),
            Err(e) => {
                tracing::warn!(
                    "⚠️ Push scheduled but email for '{}' failed: {e}",
                    pattern.title
                );
                EmailOutcome::Failed(e)
            }
        }
    }

    /// Dispatch the email request and persist the record on success.
    async fn send_email(
        &self,
        pattern: &ReminderPattern,
        notification_id: &str,
        email: &str,
        token: &str,
    ) -> Result<ScheduledEmailRecord> {
        let request = build_email_request(pattern, notification_id, email)?;
        let value = self
            .dispatcher
            .call(Endpoint::ScheduleEmail, token, Some(serde_json::to_value(&request)?))
            .await?;

        let ack: EmailResponse = serde_json::from_value(value).unwrap_or_else(|e| {
            tracing::debug!("Unreadable email acknowledgement ({e}), keeping {notification_id}");
            EmailResponse {
                notification_id: None,
            }
        });
        if let Some(id) = ack.notification_id.as_deref()
            && id != notification_id
        {
            tracing::debug!("Email backend returned id {id}, keeping {notification_id}");
        }

        let (date, time) = (
            pattern.date.as_deref().unwrap_or_default(),
            pattern.time.as_deref().unwrap_or_default(),
        );
        let record = ScheduledEmailRecord {
            notification_id: notification_id.to_string(),
            title: request.title,
            message: request.message,
            scheduled_date: parse_schedule(date, time)?,
            created_at: Utc::now(),
        };

        tracing::info!("📧 Email reminder scheduled for {}", record.scheduled_date);
        self.host.on_email_scheduled(record.clone());
        Ok(record)
    }
}

/// Fresh id per invocation; also correlates push and email.
pub fn new_notification_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Fill in coordinates for a named location from the saved list.
fn resolve_location<'a>(
    pattern: &'a ReminderPattern,
    settings: &Settings,
) -> Cow<'a, ReminderPattern> {
    let Some(location) = &pattern.location else {
        return Cow::Borrowed(pattern);
    };
    if location.has_coordinates() {
        return Cow::Borrowed(pattern);
    }
    match settings.find_location(&location.name) {
        Some(saved) => {
            tracing::debug!("📍 Resolved '{}' from saved locations", location.name);
            let mut resolved = pattern.clone();
            let mut target = saved.to_target();
            if location.radius.is_some() {
                target.radius = location.radius;
            }
            if location.address.is_some() {
                target.address = location.address.clone();
            }
            resolved.location = Some(target);
            Cow::Owned(resolved)
        }
        None => Cow::Borrowed(pattern),
    }
}

fn with_vault<'a>(ctx: &'a PlatformContext, settings: &Settings) -> Cow<'a, PlatformContext> {
    if ctx.vault_name.is_some() || settings.vault_name.is_none() {
        return Cow::Borrowed(ctx);
    }
    Cow::Owned(PlatformContext {
        platform: ctx.platform,
        vault_name: settings.vault_name.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use notelert_core::{LocationTarget, SavedLocation};

    fn settings_with_home() -> Settings {
        Settings {
            saved_locations: vec![SavedLocation {
                name: "Home".into(),
                latitude: 48.85,
                longitude: 2.35,
                radius: 200.0,
                address: Some("1 Rue".into()),
            }],
            ..Default::default()
        }
    }

    #[test]
    fn test_notification_ids_are_unique() {
        assert_ne!(new_notification_id(), new_notification_id());
    }

    #[test]
    fn test_resolve_location_from_settings() {
        let pattern = ReminderPattern::near("t", "m", LocationTarget::named("home"));
        let resolved = resolve_location(&pattern, &settings_with_home());
        let loc = resolved.location.as_ref().unwrap();
        assert_eq!(loc.latitude, Some(48.85));
        assert_eq!(loc.radius, Some(200.0));
        assert_eq!(loc.address.as_deref(), Some("1 Rue"));
        assert!(matches!(resolved, Cow::Owned(_)));
    }

    #[test]
    fn test_resolve_location_keeps_explicit_coordinates() {
        let mut target = LocationTarget::named("Home");
        target.latitude = Some(1.0);
        target.longitude = Some(2.0);
        let pattern = ReminderPattern::near("t", "m", target);
        let resolved = resolve_location(&pattern, &settings_with_home());
        assert!(matches!(resolved, Cow::Borrowed(_)));
    }

    #[test]
    fn test_with_vault_prefers_context() {
        let settings = Settings {
            vault_name: Some("Settings Vault".into()),
            ..Default::default()
        };
        let ctx = PlatformContext::mobile(Platform::Android, Some("Ctx Vault"));
        assert_eq!(with_vault(&ctx, &settings).vault_name.as_deref(), Some("Ctx Vault"));

        let ctx = PlatformContext::desktop();
        assert_eq!(with_vault(&ctx, &settings).vault_name.as_deref(), Some("Settings Vault"));
    }
}
