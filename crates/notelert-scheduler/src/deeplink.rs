//! `notelert://` deep links for the companion mobile app.
//!
//! Every value is percent-encoded (`%20` for spaces, never `+`), so titles
//! and messages containing `&`, `=`, `?` or `#` survive the trip.

use notelert_core::{
    NotelertError, PlatformContext, ReminderKind, ReminderPattern, Result, SourceRef,
};

use crate::clean::clean_message;

pub const SCHEME: &str = "notelert";
pub const ADD_ACTION: &str = "add";

/// Ordered query parameters of a deep link.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeepLink {
    action: String,
    params: Vec<(String, String)>,
}

impl DeepLink {
    pub fn new(action: &str) -> Self {
        Self {
            action: action.to_string(),
            params: Vec::new(),
        }
    }

    /// Append a parameter, keeping it even when the value is empty.
    pub fn field(mut self, key: &str, value: impl ToString) -> Self {
        self.params.push((key.to_string(), value.to_string()));
        self
    }

    /// Append a parameter. Empty values are skipped.
    pub fn param(mut self, key: &str, value: impl ToString) -> Self {
        let value = value.to_string();
        if !value.is_empty() {
            self.params.push((key.to_string(), value));
        }
        self
    }

    pub fn param_opt(self, key: &str, value: Option<impl ToString>) -> Self {
        match value {
            Some(v) => self.param(key, v),
            None => self,
        }
    }

    /// Deep link that asks the mobile app to create `pattern`.
    pub fn for_pattern(pattern: &ReminderPattern, ctx: &PlatformContext) -> Self {
        let kind = pattern.resolved_kind();
        let mut link = Self::new(ADD_ACTION)
            .field("title", pattern.title.trim())
            .field("message", clean_message(&pattern.message))
            .field("type", kind.as_str());

        match kind {
            ReminderKind::Time => {
                link = link
                    .param_opt("date", pattern.date.as_deref())
                    .param_opt("time", pattern.time.as_deref());
            }
            ReminderKind::Location => {
                if let Some(loc) = &pattern.location {
                    link = link
                        .param("location", loc.name.trim())
                        .param_opt("latitude", loc.latitude.filter(|v| !v.is_nan()))
                        .param_opt("longitude", loc.longitude.filter(|v| !v.is_nan()))
                        .param_opt("radius", loc.radius.filter(|v| !v.is_nan()));
                }
            }
        }

        if let (Some(vault), Some(source)) = (ctx.vault_name.as_deref(), &pattern.source) {
            link = link.param("returnLink", return_link(vault, source));
        }
        link
    }

    pub fn action(&self) -> &str {
        &self.action
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn params(&self) -> &[(String, String)] {
        &self.params
    }

    pub fn to_uri(&self) -> String {
        let query = encode_query(&self.params);
        if query.is_empty() {
            format!("{SCHEME}://{}", self.action)
        } else {
            format!("{SCHEME}://{}?{query}", self.action)
        }
    }

    /// Decode a `notelert://` URI.
    pub fn parse(uri: &str) -> Result<Self> {
        let rest = uri
            .strip_prefix(SCHEME)
            .and_then(|r| r.strip_prefix("://"))
            .ok_or_else(|| NotelertError::Validation(format!("Not a {SCHEME}:// link: {uri}")))?;

        let (action, query) = rest.split_once('?').unwrap_or((rest, ""));
        let mut link = Self::new(action);
        for pair in query.split('&').filter(|p| !p.is_empty()) {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            let key = decode(key)?;
            let value = decode(value)?;
            link.params.push((key, value));
        }
        Ok(link)
    }
}

/// `obsidian://open?vault=..&file=..` pointing back at the note.
pub fn return_link(vault: &str, source: &SourceRef) -> String {
    let mut params = vec![
        ("vault".to_string(), vault.to_string()),
        ("file".to_string(), source.file_path.clone()),
    ];
    if let Some(line) = source.line {
        params.push(("line".to_string(), line.to_string()));
    }
    format!("obsidian://open?{}", encode_query(&params))
}

fn encode_query(params: &[(String, String)]) -> String {
    params
        .iter()
        .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
        .collect::<Vec<_>>()
        .join("&")
}

fn decode(s: &str) -> Result<String> {
    urlencoding::decode(s)
        .map(|c| c.into_owned())
        .map_err(|e| NotelertError::Validation(format!("Bad percent-encoding in deep link: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use notelert_core::{LocationTarget, Platform};

    fn android() -> PlatformContext {
        PlatformContext::mobile(Platform::Android, Some("My Vault"))
    }

    #[test]
    fn test_time_link_round_trip() {
        let pattern = ReminderPattern::at(
            "Rent & bills?",
            "Pay 100% = done #money :@2025-03-01,09:00",
            "2025-03-01",
            "09:00",
        );
        let uri = DeepLink::for_pattern(&pattern, &PlatformContext::default()).to_uri();
        assert!(uri.starts_with("notelert://add?title=Rent%20%26%20bills%3F&"));
        assert!(!uri.contains('+'));

        let link = DeepLink::parse(&uri).unwrap();
        assert_eq!(link.action(), "add");
        assert_eq!(link.get("title"), Some("Rent & bills?"));
        assert_eq!(link.get("message"), Some("Pay 100% = done #money"));
        assert_eq!(link.get("date"), Some("2025-03-01"));
        assert_eq!(link.get("time"), Some("09:00"));
        assert_eq!(link.get("type"), Some("time"));
        assert_eq!(link.get("returnLink"), None);
    }

    #[test]
    fn test_location_link_round_trip() {
        let pattern = ReminderPattern::near(
            "Groceries",
            "Buy milk :#Shop",
            LocationTarget {
                name: "Corner Shop".into(),
                latitude: Some(48.8566),
                longitude: Some(-2.35),
                radius: Some(150.0),
                address: None,
            },
        );
        let link = DeepLink::parse(&DeepLink::for_pattern(&pattern, &android()).to_uri()).unwrap();
        assert_eq!(link.get("type"), Some("location"));
        assert_eq!(link.get("location"), Some("Corner Shop"));
        assert_eq!(link.get("latitude"), Some("48.8566"));
        assert_eq!(link.get("longitude"), Some("-2.35"));
        assert_eq!(link.get("radius"), Some("150"));
        assert_eq!(link.get("message"), Some("Buy milk"));
    }

    #[test]
    fn test_return_link_is_double_encoded() {
        let pattern = ReminderPattern::at("t", "m", "2025-03-01", "09:00")
            .with_source("Daily/2025 03 01.md", Some(12));
        let uri = DeepLink::for_pattern(&pattern, &android()).to_uri();
        assert!(uri.contains("returnLink=obsidian%3A%2F%2Fopen%3Fvault%3DMy%2520Vault"));

        let link = DeepLink::parse(&uri).unwrap();
        assert_eq!(
            link.get("returnLink"),
            Some("obsidian://open?vault=My%20Vault&file=Daily%2F2025%2003%2001.md&line=12")
        );
    }

    #[test]
    fn test_empty_message_survives_round_trip() {
        let pattern = ReminderPattern::at("", ":@2025-03-01,09:00", "2025-03-01", "09:00");
        let uri = DeepLink::for_pattern(&pattern, &PlatformContext::default()).to_uri();
        assert!(uri.starts_with("notelert://add?title=&message=&type=time&"));

        let link = DeepLink::parse(&uri).unwrap();
        assert_eq!(link.get("title"), Some(""));
        assert_eq!(link.get("message"), Some(""));
        assert_eq!(link.get("date"), Some("2025-03-01"));
    }

    #[test]
    fn test_parse_rejects_other_schemes() {
        assert!(DeepLink::parse("https://example.com?a=b").is_err());
        assert!(DeepLink::parse("notelert://add").unwrap().params().is_empty());
    }
}
