use crate::error::{HerdbookError, HerdbookResult};
use chrono::NaiveDate;
use std::fmt;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_DATABASE_URL: &str = "postgresql://postgres@localhost:5432/herdbook";
const DEFAULT_PORT: u16 = 3000;
const DEFAULT_MAX_BACKFILL_DAYS: u32 = 3660;

/// Runtime configuration, read once at startup and shared through `AppState`.
#[derive(Clone, PartialEq)]
pub struct AppConfig {
    pub database_url: String,
    pub port: u16,
    pub admin_token: Option<String>,
    pub force_ssl: bool,
    pub allowed_hosts: Vec<String>,
    pub backfill_start: NaiveDate,
    /// Longest backfill range, in days, a single run may cover.
    pub max_backfill_days: u32,
}

impl AppConfig {
    /// Loads `.env` if present, then reads the process environment.
    pub fn from_env() -> HerdbookResult<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> HerdbookResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let database_url = get("DATABASE_URL").unwrap_or_else(|| {
            tracing::warn!("DATABASE_URL not found in env, using default local postgres");
            DEFAULT_DATABASE_URL.to_string()
        });

        let port = match get("PORT") {
            Some(raw) => raw
                .trim()
                .parse::<u16>()
                .map_err(|e| HerdbookError::Config(format!("Invalid PORT '{}': {}", raw, e)))?,
            None => DEFAULT_PORT,
        };

        let admin_token = get("ADMIN_TOKEN");
        if admin_token.is_none() {
            tracing::warn!("ADMIN_TOKEN not set, admin endpoints will reject every request");
        }

        let force_ssl = match get("FORCE_SSL") {
            Some(raw) => parse_bool(&raw)
                .ok_or_else(|| HerdbookError::Config(format!("Invalid FORCE_SSL '{}'", raw)))?,
            None => false,
        };

        let allowed_hosts = get("ALLOWED_HOSTS")
            .map(|raw| {
                raw.split(',')
                    .map(|h| h.trim().to_ascii_lowercase())
                    .filter(|h| !h.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        let backfill_start = match get("BACKFILL_START") {
            Some(raw) => NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").map_err(|e| {
                HerdbookError::Config(format!("Invalid BACKFILL_START '{}': {}", raw, e))
            })?,
            None => default_backfill_start(),
        };

        let max_backfill_days = match get("MAX_BACKFILL_DAYS") {
            Some(raw) => raw
                .trim()
                .parse::<u32>()
                .ok()
                .filter(|days| *days > 0)
                .ok_or_else(|| {
                    HerdbookError::Config(format!("Invalid MAX_BACKFILL_DAYS '{}'", raw))
                })?,
            None => DEFAULT_MAX_BACKFILL_DAYS,
        };

        Ok(Self {
            database_url,
            port,
            admin_token,
            force_ssl,
            allowed_hosts,
            backfill_start,
            max_backfill_days,
        })
    }

    /// Whether `host` (with or without port) passes the allow-list.
    /// An empty list allows every host.
    pub fn host_allowed(&self, host: &str) -> bool {
        if self.allowed_hosts.is_empty() {
            return true;
        }
        let name = host
            .rsplit_once(':')
            .filter(|(_, port)| port.chars().all(|c| c.is_ascii_digit()))
            .map_or(host, |(name, _)| name)
            .to_ascii_lowercase();
        self.allowed_hosts.iter().any(|allowed| *allowed == name)
    }
}

impl fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppConfig")
            .field("database_url", &self.database_url)
            .field("port", &self.port)
            .field("admin_token", &self.admin_token.as_ref().map(|_| "[redacted]"))
            .field("force_ssl", &self.force_ssl)
            .field("allowed_hosts", &self.allowed_hosts)
            .field("backfill_start", &self.backfill_start)
            .field("max_backfill_days", &self.max_backfill_days)
            .finish()
    }
}

/// Installs the global subscriber, filtered by `RUST_LOG` (default `info`).
/// Call after `dotenvy::dotenv()` so a `.env` filter applies.
pub fn init_tracing() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();
}

pub fn default_backfill_start() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 4, 1).unwrap_or_default()
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
