use std::time::Duration;

use reqwest::Url;

use crate::core::logging::LogFormat;

const ENV_PREFIX: &str = "FEED_NOTIFIER_";
const DEFAULT_TITLE: &str = "OMG! Ubuntu!";
const DEFAULT_POLL_MINUTES: u64 = 15;
/// One week.
const MAX_POLL_MINUTES: u64 = 7 * 24 * 60;
const DEFAULT_DATABASE_URL: &str = "sqlite://feed-notifier.db?mode=rwc";
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 20;
const DEFAULT_FETCH_RETRIES: usize = 2;
const DEFAULT_ICON_BASE_URL: &str = "assets";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required setting FEED_NOTIFIER_{0}")]
    Missing(&'static str),
    #[error("invalid value `{value}` for FEED_NOTIFIER_{key}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub feed_url: String,
    pub home_url: String,
    /// Product name shown in notification titles.
    pub title: String,
    pub poll_interval: Duration,
    pub database_url: String,
    pub http_timeout: Duration,
    pub fetch_retries: usize,
    pub icon_base_url: String,
    pub log_format: LogFormat,
}

impl AppConfig {
    /// Reads `.env.local` if present, then the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::from_filename(".env.local");
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from `lookup`, which receives full variable names
    /// such as `FEED_NOTIFIER_FEED_URL`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(&format!("{ENV_PREFIX}{key}"))
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let feed_url = get("FEED_URL").ok_or(ConfigError::Missing("FEED_URL"))?;
        let parsed = parse_http_url("FEED_URL", &feed_url)?;
        let home_url = match get("HOME_URL") {
            Some(home) => {
                parse_http_url("HOME_URL", &home)?;
                home
            }
            None => site_root(parsed),
        };
        let poll_minutes = parse_number("POLL_INTERVAL_MINUTES", get("POLL_INTERVAL_MINUTES"))?
            .unwrap_or(DEFAULT_POLL_MINUTES);
        if poll_minutes == 0 || poll_minutes > MAX_POLL_MINUTES {
            return Err(ConfigError::Invalid {
                key: "POLL_INTERVAL_MINUTES",
                value: poll_minutes.to_string(),
                reason: format!("must be between 1 and {MAX_POLL_MINUTES}"),
            });
        }
        let http_timeout_secs = parse_number("HTTP_TIMEOUT_SECS", get("HTTP_TIMEOUT_SECS"))?
            .unwrap_or(DEFAULT_HTTP_TIMEOUT_SECS);
        let fetch_retries = parse_number("FETCH_RETRIES", get("FETCH_RETRIES"))?
            .unwrap_or(DEFAULT_FETCH_RETRIES);
        let log_format = match get("LOG_FORMAT") {
            None => LogFormat::Plain,
            Some(raw) => raw.parse::<LogFormat>().map_err(|reason| ConfigError::Invalid {
                key: "LOG_FORMAT",
                value: raw.clone(),
                reason,
            })?,
        };

        Ok(Self {
            feed_url,
            home_url,
            title: get("TITLE").unwrap_or_else(|| DEFAULT_TITLE.to_string()),
            poll_interval: Duration::from_secs(poll_minutes * 60),
            database_url: get("DATABASE_URL").unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string()),
            http_timeout: Duration::from_secs(http_timeout_secs),
            fetch_retries,
            icon_base_url: get("ICON_BASE_URL")
                .unwrap_or_else(|| DEFAULT_ICON_BASE_URL.to_string()),
            log_format,
        })
    }
}

fn parse_number<T: std::str::FromStr>(
    key: &'static str,
    raw: Option<String>,
) -> Result<Option<T>, ConfigError>
where
    T::Err: std::fmt::Display,
{
    raw.map(|value| {
        value.parse::<T>().map_err(|err| ConfigError::Invalid {
            key,
            reason: err.to_string(),
            value,
        })
    })
    .transpose()
}

fn parse_http_url(key: &'static str, raw: &str) -> Result<Url, ConfigError> {
    let invalid = |reason: String| ConfigError::Invalid {
        key,
        value: raw.to_string(),
        reason,
    };
    let url = Url::parse(raw).map_err(|err| invalid(err.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid("expected an http(s) URL".to_string()));
    }
    if url.host_str().map_or(true, str::is_empty) {
        return Err(invalid("URL has no host".to_string()));
    }
    Ok(url)
}

/// `https://user@host/path?q#f` -> `https://host/`.
fn site_root(mut url: Url) -> String {
    url.set_path("/");
    url.set_query(None);
    url.set_fragment(None);
    // Only fails for URLs that cannot carry credentials, which http(s) can.
    let _ = url.set_username("");
    let _ = url.set_password(None);
    url.to_string()
}
