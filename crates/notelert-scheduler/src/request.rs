//! Backend request bodies. Pure: no I/O, no clock except local timezone lookup.

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, NaiveTime, SecondsFormat, TimeZone, Utc};
use notelert_core::{
    LocationTarget, NotelertError, Recurrence, ReminderKind, ReminderPattern, Result,
};
use serde::Serialize;

use crate::clean::clean_message;

/// Location reminders fire on arrival.
pub const TRIGGER_ARRIVE: &str = "arrive";

/// Body of `POST schedule-push`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PushRequest {
    pub title: String,
    pub message: String,
    pub notification_id: String,
    #[serde(rename = "type")]
    pub kind: ReminderKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scheduled_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<PushLocation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recurrence: Option<Recurrence>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub obsidian_deep_link: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PushLocation {
    pub latitude: f64,
    pub longitude: f64,
    pub address: String,
    pub trigger_type: &'static str,
}

/// Body of `POST schedule-email`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailRequest {
    pub to: String,
    pub title: String,
    pub message: String,
    pub scheduled_date: String,
    pub notification_id: String,
    pub user_email: String,
}

/// Parse `YYYY-MM-DD` + `HH:MM[:SS]` in the local timezone.
pub fn parse_schedule(date: &str, time: &str) -> Result<DateTime<Utc>> {
    let invalid = || NotelertError::Validation(format!("Invalid date/time: '{date} {time}'"));

    let day = NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d").map_err(|_| invalid())?;
    let clock = NaiveTime::parse_from_str(time.trim(), "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(time.trim(), "%H:%M:%S"))
        .map_err(|_| invalid())?;

    // `earliest` picks the first instant of an ambiguous DST hour; a
    // skipped hour has no instant at all.
    Local
        .from_local_datetime(&NaiveDateTime::new(day, clock))
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
        .ok_or_else(invalid)
}

/// ISO-8601 with milliseconds and `Z`, e.g. `2025-03-01T08:00:00.000Z`.
pub fn iso_timestamp(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn require_schedule(pattern: &ReminderPattern) -> Result<DateTime<Utc>> {
    match (pattern.date.as_deref(), pattern.time.as_deref()) {
        (Some(date), Some(time)) => parse_schedule(date, time),
        _ => Err(NotelertError::Validation(
            "Time reminders need both a date and a time".into(),
        )),
    }
}

fn require_location(location: Option<&LocationTarget>) -> Result<PushLocation> {
    let location = location
        .filter(|l| !l.name.trim().is_empty())
        .ok_or_else(|| {
            NotelertError::Validation("Location reminders need a location name".into())
        })?;

    match (location.latitude, location.longitude) {
        (Some(latitude), Some(longitude)) if !latitude.is_nan() && !longitude.is_nan() => {
            Ok(PushLocation {
                latitude,
                longitude,
                address: location
                    .address
                    .clone()
                    .filter(|a| !a.trim().is_empty())
                    .unwrap_or_else(|| location.name.clone()),
                trigger_type: TRIGGER_ARRIVE,
            })
        }
        _ => Err(NotelertError::Validation(format!(
            "Location '{}' has no valid coordinates",
            location.name
        ))),
    }
}

/// Build the push body. Validation failures never reach the wire.
pub fn build_push_request(
    pattern: &ReminderPattern,
    notification_id: &str,
    deep_link: Option<&str>,
) -> Result<PushRequest> {
    let kind = pattern.resolved_kind();

    let (scheduled_date, location) = match kind {
        ReminderKind::Time => (Some(iso_timestamp(&require_schedule(pattern)?)), None),
        ReminderKind::Location => (None, Some(require_location(pattern.location.as_ref())?)),
    };

    Ok(PushRequest {
        title: pattern.title.trim().to_string(),
        message: clean_message(&pattern.message),
        notification_id: notification_id.to_string(),
        kind,
        scheduled_date,
        location,
        recurrence: pattern.recurrence.clone(),
        obsidian_deep_link: deep_link.map(str::to_string),
    })
}

/// Build the companion email body. Only time reminders can be emailed.
pub fn build_email_request(
    pattern: &ReminderPattern,
    notification_id: &str,
    email: &str,
) -> Result<EmailRequest> {
    if pattern.resolved_kind() != ReminderKind::Time {
        return Err(NotelertError::Validation(
            "Only time reminders can be sent by email".into(),
        ));
    }
    let email = email.trim();
    if email.is_empty() || !email.contains('@') {
        return Err(NotelertError::Validation(format!("Invalid email address '{email}'")));
    }

    Ok(EmailRequest {
        to: email.to_string(),
        title: pattern.title.trim().to_string(),
        message: clean_message(&pattern.message),
        scheduled_date: iso_timestamp(&require_schedule(pattern)?),
        notification_id: notification_id.to_string(),
        user_email: email.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use notelert_core::{ErrorKind, RecurrenceFrequency};
    use serde_json::json;

    fn located(lat: Option<f64>, lon: Option<f64>) -> ReminderPattern {
        ReminderPattern::near(
            "Milk",
            "Buy milk :#Shop",
            LocationTarget {
                name: "Shop".into(),
                latitude: lat,
                longitude: lon,
                radius: Some(100.0),
                address: None,
            },
        )
    }

    fn call_mom() -> ReminderPattern {
        ReminderPattern::at("Call", "Call mom :@2025-03-01,09:00", "2025-03-01", "09:00")
    }

    #[test]
    fn test_time_request() {
        let pattern = call_mom();
        let req = build_push_request(&pattern, "n-1", None).unwrap();
        assert_eq!(req.kind, ReminderKind::Time);
        assert_eq!(req.message, "Call mom");
        assert!(req.location.is_none());

        let expected = parse_schedule("2025-03-01", "09:00").unwrap();
        assert_eq!(req.scheduled_date, Some(iso_timestamp(&expected)));
        assert!(req.scheduled_date.unwrap().ends_with(":00.000Z"));
    }

    #[test]
    fn test_time_request_wire_shape() {
        let pattern = ReminderPattern::at("Call", "hi", "2025-03-01", "09:00");
        let req = build_push_request(&pattern, "n-1", Some("obsidian://open")).unwrap();
        let value = serde_json::to_value(req).unwrap();
        assert_eq!(value["type"], "time");
        assert_eq!(value["notificationId"], "n-1");
        assert_eq!(value["obsidianDeepLink"], "obsidian://open");
        assert!(value.get("location").is_none());
        assert!(value.get("recurrence").is_none());
    }

    #[test]
    fn test_invalid_time_combinations_rejected() {
        for (date, time) in [
            ("2025-02-30", "09:00"),
            ("2025-03-01", "25:00"),
            ("tomorrow", "09:00"),
            ("2025-03-01", ""),
        ] {
            let pattern = ReminderPattern::at("t", "m", date, time);
            let err = build_push_request(&pattern, "n", None).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Validation, "{date} {time}");
        }

        let mut pattern = ReminderPattern::at("t", "m", "2025-03-01", "09:00");
        pattern.time = None;
        assert!(build_push_request(&pattern, "n", None).is_err());
    }

    #[test]
    fn test_seconds_accepted() {
        assert!(parse_schedule("2025-03-01", "09:00:30").is_ok());
    }

    #[test]
    fn test_location_request() {
        let req = build_push_request(&located(Some(48.85), Some(2.35)), "n-2", None).unwrap();
        assert_eq!(req.kind, ReminderKind::Location);
        assert!(req.scheduled_date.is_none());
        let value = serde_json::to_value(&req).unwrap();
        assert_eq!(
            value["location"],
            json!({
                "latitude": 48.85,
                "longitude": 2.35,
                "address": "Shop",
                "triggerType": "arrive"
            })
        );
    }

    #[test]
    fn test_location_requires_coordinates() {
        for (lat, lon) in [
            (None, Some(2.0)),
            (Some(1.0), None),
            (Some(f64::NAN), Some(2.0)),
            (Some(1.0), Some(f64::NAN)),
        ] {
            let err = build_push_request(&located(lat, lon), "n", None).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Validation);
        }

        let mut pattern = located(Some(1.0), Some(2.0));
        pattern.location.as_mut().unwrap().name = " ".into();
        assert!(build_push_request(&pattern, "n", None).is_err());
    }

    #[test]
    fn test_explicit_type_wins_over_location() {
        let pattern = located(Some(1.0), Some(2.0)).with_kind(ReminderKind::Time);
        // Time type without date/time is rejected rather than silently sent as location.
        let err = build_push_request(&pattern, "n", None).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn test_recurrence_forwarded() {
        let pattern =
            ReminderPattern::at("t", "m", "2025-03-01", "09:00").with_recurrence(Recurrence {
                frequency: RecurrenceFrequency::Weekly,
                interval: 2,
                until: None,
            });
        let value = serde_json::to_value(build_push_request(&pattern, "n", None).unwrap()).unwrap();
        assert_eq!(value["recurrence"], json!({"frequency": "weekly", "interval": 2}));
    }

    #[test]
    fn test_email_request() {
        let pattern = call_mom();
        let req = build_email_request(&pattern, "n-3", " me@example.com ").unwrap();
        assert_eq!(req.to, "me@example.com");
        assert_eq!(req.user_email, "me@example.com");
        assert_eq!(req.message, "Call mom");
        assert_eq!(req.notification_id, "n-3");

        let value = serde_json::to_value(&req).unwrap();
        assert!(value.get("scheduledDate").is_some());
        assert!(value.get("userEmail").is_some());
    }

    #[test]
    fn test_email_rejects_location_and_bad_address() {
        assert!(build_email_request(&located(Some(1.0), Some(2.0)), "n", "a@b.c").is_err());
        let pattern = ReminderPattern::at("t", "m", "2025-03-01", "09:00");
        assert!(build_email_request(&pattern, "n", "not-an-email").is_err());
    }
}
