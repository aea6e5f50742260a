//! Reminder data model shared across the Notelert crates.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Trigger family of a reminder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReminderKind {
    Time,
    Location,
}

impl ReminderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Time => "time",
            Self::Location => "location",
        }
    }
}

impl std::str::FromStr for ReminderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "time" => Ok(Self::Time),
            "location" => Ok(Self::Location),
            other => Err(format!("unknown reminder type '{other}'")),
        }
    }
}

/// A place a location reminder is attached to.
/// Coordinates are optional because in-note syntax may only name the place.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LocationTarget {
    pub name: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub radius: Option<f64>,
    pub address: Option<String>,
}

impl LocationTarget {
    pub fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }

    pub fn has_coordinates(&self) -> bool {
        matches!(
            (self.latitude, self.longitude),
            (Some(lat), Some(lon)) if !lat.is_nan() && !lon.is_nan()
        )
    }
}

/// Repeat rule forwarded to the backend untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recurrence {
    pub frequency: RecurrenceFrequency,
    #[serde(default = "default_interval")]
    pub interval: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub until: Option<NaiveDate>,
}

fn default_interval() -> u32 { 1 }

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecurrenceFrequency {
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

/// Where in the vault a reminder was written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceRef {
    pub file_path: String,
    pub line: Option<u32>,
}

/// A reminder detected in a note. Read-only to the scheduler.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReminderPattern {
    pub title: String,
    pub message: String,
    /// Explicit type; inferred from the other fields when absent.
    #[serde(rename = "type")]
    pub kind: Option<ReminderKind>,
    /// `YYYY-MM-DD`
    pub date: Option<String>,
    /// `HH:MM` or `HH:MM:SS`
    pub time: Option<String>,
    pub location: Option<LocationTarget>,
    pub source: Option<SourceRef>,
    pub recurrence: Option<Recurrence>,
}

impl ReminderPattern {
    /// Time-triggered reminder.
    pub fn at(title: &str, message: &str, date: &str, time: &str) -> Self {
        Self {
            title: title.to_string(),
            message: message.to_string(),
            date: Some(date.to_string()),
            time: Some(time.to_string()),
            ..Default::default()
        }
    }

    /// Location-triggered reminder.
    pub fn near(title: &str, message: &str, location: LocationTarget) -> Self {
        Self {
            title: title.to_string(),
            message: message.to_string(),
            location: Some(location),
            ..Default::default()
        }
    }

    pub fn with_kind(mut self, kind: ReminderKind) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn with_source(mut self, file_path: &str, line: Option<u32>) -> Self {
        self.source = Some(SourceRef {
            file_path: file_path.to_string(),
            line,
        });
        self
    }

    pub fn with_recurrence(mut self, recurrence: Recurrence) -> Self {
        self.recurrence = Some(recurrence);
        self
    }

    /// Explicit type first, then `location` when a location is present, else `time`.
    pub fn resolved_kind(&self) -> ReminderKind {
        match (self.kind, &self.location) {
            (Some(kind), _) => kind,
            (None, Some(_)) => ReminderKind::Location,
            (None, None) => ReminderKind::Time,
        }
    }
}

/// Email reminder the backend accepted. Appended once to the host-owned list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduledEmailRecord {
    pub notification_id: String,
    pub title: String,
    pub message: String,
    pub scheduled_date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// Premium authorization state as last seen by the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorizationStatus {
    pub is_premium: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    pub loading: bool,
    pub cached: bool,
}

impl AuthorizationStatus {
    /// State before the first fetch attempt completes.
    pub fn initial() -> Self {
        Self {
            is_premium: false,
            expires_at: None,
            loading: true,
            cached: false,
        }
    }

    /// Definitive "not premium" (bad token, 401, or nothing better to fall back on).
    pub fn not_premium() -> Self {
        Self {
            is_premium: false,
            expires_at: None,
            loading: false,
            cached: false,
        }
    }

    pub fn resolved(is_premium: bool, expires_at: Option<DateTime<Utc>>) -> Self {
        Self {
            is_premium,
            expires_at,
            loading: false,
            cached: false,
        }
    }
}

impl Default for AuthorizationStatus {
    fn default() -> Self {
        Self::initial()
    }
}

/// A named place stored in settings or returned by `list-locations`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedLocation {
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default = "default_radius")]
    pub radius: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

fn default_radius() -> f64 { 100.0 }

impl SavedLocation {
    pub fn to_target(&self) -> LocationTarget {
        LocationTarget {
            name: self.name.clone(),
            latitude: Some(self.latitude),
            longitude: Some(self.longitude),
            radius: Some(self.radius),
            address: self.address.clone(),
        }
    }
}

/// Host platform the scheduler is running on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    #[default]
    Desktop,
    Android,
    Ios,
}

impl Platform {
    pub fn is_mobile(&self) -> bool {
        !matches!(self, Self::Desktop)
    }
}

impl std::str::FromStr for Platform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "desktop" => Ok(Self::Desktop),
            "android" => Ok(Self::Android),
            "ios" => Ok(Self::Ios),
            other => Err(format!("unknown platform '{other}'")),
        }
    }
}

/// Per-invocation platform information supplied by the host.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlatformContext {
    pub platform: Platform,
    /// Vault name used to build the return link on mobile.
    pub vault_name: Option<String>,
}

impl PlatformContext {
    pub fn desktop() -> Self {
        Self::default()
    }

    pub fn mobile(platform: Platform, vault_name: Option<&str>) -> Self {
        Self {
            platform,
            vault_name: vault_name.map(str::to_string),
        }
    }
}

/// Backend acknowledgement of a scheduled push.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduledNotification {
    pub notification_id: String,
    #[serde(default)]
    pub scheduled_for: Option<String>,
}
