//! Runtime configuration read from environment variables

use std::env::VarError;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

use crate::scraper::DEFAULT_USER_AGENT;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
}

/// Price search tuning
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchSettings {
    /// Pages fetched when the caller does not ask for a count
    pub default_pages: u32,
    /// Upper bound on pages for one search
    pub max_pages: u32,
    /// Pause between consecutive upstream page fetches
    pub page_delay: Duration,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            default_pages: 2,
            max_pages: 5,
            page_delay: Duration::from_millis(500),
        }
    }
}

impl SearchSettings {
    /// Requested page count clamped to `1..=max_pages`, or the default.
    pub fn clamp_pages(&self, requested: Option<u32>) -> u32 {
        requested
            .unwrap_or(self.default_pages)
            .clamp(1, self.max_pages.max(1))
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub database_url: String,
    pub db_max_connections: u32,
    pub log_level: String,
    pub static_dir: PathBuf,
    pub upstream_base_url: String,
    pub upstream_user_agent: String,
    pub search: SearchSettings,
}

/// Load configuration, reading a `.env` file first when one exists.
///
/// # Errors
///
/// Returns `ConfigError` if a value cannot be parsed.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    build_app_config(|key| std::env::var(key))
}

/// Every variable is optional; unset ones fall back to their defaults.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, VarError>,
{
    let or_default =
        |var: &str, default: &str| -> String { lookup(var).unwrap_or_else(|_| default.to_string()) };

    let parse = |var: &str, default: &str| -> Result<u64, ConfigError> {
        parse_value(var, &or_default(var, default))
    };

    let positive = |var: &str, default: &str| -> Result<u32, ConfigError> {
        let value: u32 = parse_value(var, &or_default(var, default))?;
        if value == 0 {
            return Err(ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(value)
    };

    let bind_addr = parse_value("BIND_ADDR", &or_default("BIND_ADDR", "0.0.0.0:3000"))?;
    let database_url = or_default("DATABASE_URL", "sqlite:database/quotations.db");
    let db_max_connections = positive("DB_MAX_CONNECTIONS", "5")?;
    let log_level = or_default("LOG_LEVEL", "info");
    let static_dir = PathBuf::from(or_default("STATIC_DIR", "public"));

    let upstream_base_url = or_default("UPSTREAM_BASE_URL", "https://www.staticice.com.au");
    if reqwest::Url::parse(&upstream_base_url).is_err() {
        return Err(ConfigError::InvalidEnvVar {
            var: "UPSTREAM_BASE_URL".to_string(),
            reason: format!("{upstream_base_url} is not an absolute URL"),
        });
    }
    let upstream_user_agent = or_default("UPSTREAM_USER_AGENT", DEFAULT_USER_AGENT);

    let max_pages = positive("SEARCH_MAX_PAGES", "5")?;
    let default_pages = positive("SEARCH_DEFAULT_PAGES", "2")?;
    if default_pages > max_pages {
        return Err(ConfigError::InvalidEnvVar {
            var: "SEARCH_DEFAULT_PAGES".to_string(),
            reason: format!("{default_pages} exceeds SEARCH_MAX_PAGES ({max_pages})"),
        });
    }
    let page_delay = Duration::from_millis(parse("SEARCH_PAGE_DELAY_MS", "500")?);

    Ok(AppConfig {
        bind_addr,
        database_url,
        db_max_connections,
        log_level,
        static_dir,
        upstream_base_url,
        upstream_user_agent,
        search: SearchSettings {
            default_pages,
            max_pages,
            page_delay,
        },
    })
}

fn parse_value<T>(var: &str, raw: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim().parse::<T>().map_err(|e| ConfigError::InvalidEnvVar {
        var: var.to_string(),
        reason: e.to_string(),
    })
}
