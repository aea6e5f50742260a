//! # Notelert CLI
//!
//! Schedule remote reminders, inspect premium status and manage saved
//! locations from the terminal.
//!
//! Usage:
//!   notelert schedule "Dentist" "Call the dentist" --date 2025-03-01 --time 09:00
//!   notelert schedule "Milk" "Buy milk" --location Shop
//!   notelert status --refresh
//!   notelert locations --sync
//!   notelert decode-link "notelert://add?title=..."

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tracing_subscriber::EnvFilter;

use notelert_core::{
    HostBridge, LocationTarget, NotelertConfig, Platform, PlatformContext, ReminderKind,
    ReminderPattern, ScheduledEmailRecord,
};
use notelert_dispatch::{AuthorizationCache, LocationDirectory, RequestDispatcher};
use notelert_scheduler::{DeepLink, EmailOutcome, NotificationScheduler, ScheduleOutcome};

#[derive(Parser)]
#[command(
    name = "notelert",
    version,
    about = "🔔 Notelert — remote reminders for your notes"
)]
struct Cli {
    /// Config file (default: ~/.notelert/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Schedule a reminder
    Schedule(ScheduleArgs),
    /// Show premium status
    Status {
        /// Bypass the cache
        #[arg(long)]
        refresh: bool,
    },
    /// List saved locations
    Locations {
        /// Fetch from the backend and store them in config
        #[arg(long)]
        sync: bool,
    },
    /// Schedule only the email for an existing notification
    Email {
        notification_id: String,
        title: String,
        message: String,
        #[arg(long)]
        date: String,
        #[arg(long)]
        time: String,
    },
    /// Decode a notelert:// deep link
    DecodeLink { uri: String },
    /// Show resolved configuration
    Config,
}

#[derive(Args)]
struct ScheduleArgs {
    title: String,
    message: String,
    /// Date as YYYY-MM-DD
    #[arg(long)]
    date: Option<String>,
    /// Time as HH:MM
    #[arg(long)]
    time: Option<String>,
    /// Location name (resolved from saved locations when no coordinates are given)
    #[arg(long)]
    location: Option<String>,
    #[arg(long, allow_hyphen_values = true)]
    lat: Option<f64>,
    #[arg(long, allow_hyphen_values = true)]
    lon: Option<f64>,
    /// Radius in meters
    #[arg(long)]
    radius: Option<f64>,
    #[arg(long)]
    address: Option<String>,
    /// Reminder type: time | location
    #[arg(long = "type")]
    kind: Option<ReminderKind>,
    /// Note the reminder came from
    #[arg(long)]
    file: Option<String>,
    #[arg(long)]
    line: Option<u32>,
    /// desktop | android | ios (default from config)
    #[arg(long)]
    platform: Option<Platform>,
}

impl ScheduleArgs {
    fn to_pattern(&self) -> ReminderPattern {
        let mut pattern = ReminderPattern {
            title: self.title.clone(),
            message: self.message.clone(),
            date: self.date.clone(),
            time: self.time.clone(),
            location: self.location.as_ref().map(|name| LocationTarget {
                name: name.clone(),
                latitude: self.lat,
                longitude: self.lon,
                radius: self.radius,
                address: self.address.clone(),
            }),
            ..Default::default()
        };
        if let Some(kind) = self.kind {
            pattern = pattern.with_kind(kind);
        }
        if let Some(file) = &self.file {
            pattern = pattern.with_source(file, self.line);
        }
        pattern
    }
}

/// Host bridge for the terminal: notices go to stdout, email records to config.
struct TerminalHost {
    config: Mutex<NotelertConfig>,
    path: PathBuf,
}

impl HostBridge for TerminalHost {
    fn notice(&self, message: &str) {
        println!("🔔 {message}");
    }

    fn open_url(&self, uri: &str) -> notelert_core::Result<()> {
        println!("📲 Open on your phone:\n   {uri}");
        Ok(())
    }

    fn on_email_scheduled(&self, record: ScheduledEmailRecord) {
        let mut config = self.config.lock().unwrap_or_else(|e| e.into_inner());
        config.settings.scheduled_emails.push(record);
        if let Err(e) = config.save_to(&self.path) {
            tracing::warn!("⚠️ Could not record scheduled email: {e}");
        }
    }
}

struct App {
    config: NotelertConfig,
    path: PathBuf,
    dispatcher: Arc<RequestDispatcher>,
    auth: Arc<AuthorizationCache>,
}

impl App {
    fn new(config: NotelertConfig, path: PathBuf) -> Self {
        let dispatcher = Arc::new(RequestDispatcher::with_reqwest(config.api.clone()));
        let auth = Arc::new(AuthorizationCache::new(dispatcher.clone()));
        Self {
            config,
            path,
            dispatcher,
            auth,
        }
    }

    fn scheduler(&self) -> NotificationScheduler {
        let host = Arc::new(TerminalHost {
            config: Mutex::new(self.config.clone()),
            path: self.path.clone(),
        });
        NotificationScheduler::new(
            self.dispatcher.clone(),
            self.auth.clone(),
            host,
            self.config.settings.clone(),
        )
    }
}

fn load_config(path: Option<PathBuf>) -> Result<(NotelertConfig, PathBuf)> {
    let Some(path) = path else {
        return Ok((NotelertConfig::load()?, NotelertConfig::default_path()));
    };
    let mut config = if path.exists() {
        NotelertConfig::load_from(&path)?
    } else {
        NotelertConfig::default()
    };
    config.apply_env_overrides();
    Ok((config, path))
}

fn redact(token: &str) -> String {
    let chars: Vec<char> = token.chars().collect();
    match chars.len() {
        0 => "(not set)".into(),
        n if n <= 8 => "****".into(),
        n => {
            let head: String = chars[..4].iter().collect();
            let tail: String = chars[n - 4..].iter().collect();
            format!("{head}…{tail} ({n} chars)")
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        "notelert=debug,notelert_core=debug,notelert_dispatch=debug,notelert_scheduler=debug"
    } else {
        "notelert=info,notelert_dispatch=info,notelert_scheduler=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();

    let (config, path) = load_config(cli.config)?;
    let app = App::new(config, path);

    match cli.command {
        Command::Schedule(args) => {
            let pattern = args.to_pattern();
            let platform = args.platform.unwrap_or(app.config.platform.kind);
            let ctx = match platform {
                Platform::Desktop => PlatformContext::desktop(),
                mobile => {
                    PlatformContext::mobile(mobile, app.config.settings.vault_name.as_deref())
                }
            };

            let scheduler = app.scheduler();
            if platform == Platform::Desktop {
                // Resolve premium first so the companion email gate has an answer.
                app.auth.preload(&app.config.settings.plugin_token).await;
            }
            let outcome = scheduler.create_notification(&pattern, &ctx).await?;
            match &outcome {
                ScheduleOutcome::Scheduled {
                    notification,
                    kind,
                    email,
                } => {
                    println!(
                        "✅ Scheduled {} reminder {}",
                        kind.as_str(),
                        notification.notification_id
                    );
                    if let Some(at) = &notification.scheduled_for {
                        println!("   ⏰ Fires at {at}");
                    }
                    match email {
                        EmailOutcome::Scheduled(record) => {
                            println!("   📧 Email at {}", record.scheduled_date)
                        }
                        EmailOutcome::SkippedNotPremium => {
                            println!("   📧 Email skipped (premium required)")
                        }
                        EmailOutcome::Failed(e) => println!("   ⚠️ Email failed: {e}"),
                        EmailOutcome::NotRequested => {}
                    }
                }
                ScheduleOutcome::HandedOff { notification_id, .. } => {
                    println!("✅ Handed off as {notification_id}");
                }
                ScheduleOutcome::Failed(e) => anyhow::bail!("{e}"),
                ScheduleOutcome::TokenRequired | ScheduleOutcome::PlatformUnsupported => {}
            }
        }

        Command::Status { refresh } => {
            let status = app.auth.preload(&app.config.settings.plugin_token).await;
            let status = if refresh {
                app.auth.get_status(true).await
            } else {
                status
            };
            let label = if status.is_premium { "💎 Premium" } else { "Free" };
            println!("{label}");
            if let Some(expires) = status.expires_at {
                println!("   Expires: {expires}");
            }
            if status.cached {
                println!("   ⚠️ Backend unreachable, showing last known status");
            }
        }

        Command::Locations { sync } => {
            let mut config = app.config.clone();
            if sync {
                let directory = LocationDirectory::new(app.dispatcher.clone());
                config.settings.saved_locations =
                    directory.fetch(&config.settings.plugin_token).await?;
                config.save_to(&app.path)?;
                println!("🔄 Synced {} location(s)", config.settings.saved_locations.len());
            }
            if config.settings.saved_locations.is_empty() {
                println!("No saved locations.");
            }
            for loc in &config.settings.saved_locations {
                println!(
                    "📍 {} ({:.5}, {:.5}) r={}m{}",
                    loc.name,
                    loc.latitude,
                    loc.longitude,
                    loc.radius,
                    loc.address.as_deref().map(|a| format!(" — {a}")).unwrap_or_default()
                );
            }
        }

        Command::Email {
            notification_id,
            title,
            message,
            date,
            time,
        } => {
            let pattern = ReminderPattern::at(&title, &message, &date, &time);
            let record = app
                .scheduler()
                .schedule_email(&pattern, &notification_id)
                .await?;
            println!("📧 Email scheduled for {}", record.scheduled_date);
        }

        Command::DecodeLink { uri } => {
            let link = DeepLink::parse(&uri)?;
            println!("action: {}", link.action());
            for (key, value) in link.params() {
                println!("  {key}: {value}");
            }
        }

        Command::Config => {
            let config = &app.config;
            println!("📄 {}", app.path.display());
            println!("   API:       {}", config.api.base_url);
            println!("   Timeout:   {}s", config.api.timeout_secs);
            println!("   Token:     {}", redact(&config.settings.plugin_token));
            println!("   Valid:     {}", config.settings.has_valid_token());
            println!(
                "   Email:     {}",
                config.settings.email().unwrap_or("(not set)")
            );
            println!(
                "   Vault:     {}",
                config.settings.vault_name.as_deref().unwrap_or("(not set)")
            );
            println!("   Platform:  {:?}", config.platform.kind);
            println!("   Locations: {}", config.settings.saved_locations.len());
            println!("   Emails:    {}", config.settings.scheduled_emails.len());
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_schedule() {
        let cli = Cli::try_parse_from([
            "notelert", "schedule", "Gym", "Stretch", "--location", "Gym", "--lat", "40.1",
            "--lon", "-73.5", "--type", "location",
        ])
        .unwrap();
        match cli.command {
            Command::Schedule(args) => {
                assert_eq!(args.lon, Some(-73.5));
                assert_eq!(args.kind, Some(ReminderKind::Location));
            }
            _ => panic!("expected schedule"),
        }
    }

    #[test]
    fn test_location_keeps_date_and_time() {
        let cli = Cli::try_parse_from([
            "notelert", "schedule", "Gym", "Stretch", "--type", "time", "--location", "Gym",
            "--date", "2025-03-01", "--time", "09:00",
        ])
        .unwrap();
        let Command::Schedule(args) = cli.command else {
            panic!("expected schedule");
        };
        let pattern = args.to_pattern();
        assert_eq!(pattern.date.as_deref(), Some("2025-03-01"));
        assert_eq!(pattern.time.as_deref(), Some("09:00"));
        assert_eq!(pattern.location.as_ref().map(|l| l.name.as_str()), Some("Gym"));
        assert_eq!(pattern.resolved_kind(), ReminderKind::Time);
        assert!(notelert_scheduler::build_push_request(&pattern, "n-1", None).is_ok());
    }

    #[test]
    fn test_redact() {
        assert_eq!(redact(""), "(not set)");
        assert_eq!(redact("abc"), "****");
        let token = "a".repeat(64);
        let shown = redact(&token);
        assert!(shown.starts_with("aaaa…aaaa"));
        assert!(!shown.contains(&token));
    }
}
