// crm_server/src/config.rs

use crate::errors::{AppError, Result};
use crm_core::{QueryConfig, StoreConfig};
use dotenvy::dotenv;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct AppConfig {
  pub server_host: String,
  pub server_port: u16,
  pub store: StoreConfig,
  pub query: QueryConfig,

  // Where the operational jobs append their lines.
  pub heartbeat_log_path: PathBuf,
  pub report_log_path: PathBuf,
  pub reminder_log_path: PathBuf,

  // Optional: seed demo customers and products on startup
  pub seed_db: bool,
}

impl AppConfig {
  pub fn from_env() -> Result<Self> {
    dotenv().ok(); // Load .env file if present
    Self::from_lookup(|name| env::var(name).ok())
  }

  /// Builds the config from any variable source; `from_env` uses the process environment.
  pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
    let get_or = |name: &str, default: &str| lookup(name).unwrap_or_else(|| default.to_string());

    let server_host = get_or("SERVER_HOST", "127.0.0.1");
    let server_port = parse_var("SERVER_PORT", &get_or("SERVER_PORT", "8080"))?;

    let defaults = StoreConfig::default();
    let store = StoreConfig {
      database_url: lookup("DATABASE_URL").filter(|url| !url.trim().is_empty()),
      max_connections: match lookup("DB_MAX_CONNECTIONS") {
        Some(raw) => parse_var("DB_MAX_CONNECTIONS", &raw)?,
        None => defaults.max_connections,
      },
      acquire_timeout: match lookup("DB_ACQUIRE_TIMEOUT_SECS") {
        Some(raw) => Duration::from_secs(parse_var("DB_ACQUIRE_TIMEOUT_SECS", &raw)?),
        None => defaults.acquire_timeout,
      },
    };

    let query_defaults = QueryConfig::default();
    let query = QueryConfig {
      default_page_size: match lookup("DEFAULT_PAGE_SIZE") {
        Some(raw) => parse_var("DEFAULT_PAGE_SIZE", &raw)?,
        None => query_defaults.default_page_size,
      },
      max_page_size: match lookup("MAX_PAGE_SIZE") {
        Some(raw) => parse_var("MAX_PAGE_SIZE", &raw)?,
        None => query_defaults.max_page_size,
      },
    };
    if query.default_page_size == 0 || query.default_page_size > query.max_page_size {
      return Err(AppError::Config(format!(
        "DEFAULT_PAGE_SIZE must be between 1 and MAX_PAGE_SIZE ({})",
        query.max_page_size
      )));
    }

    let seed_db = parse_var("SEED_DB", &get_or("SEED_DB", "false"))?;

    let config = Self {
      server_host,
      server_port,
      store,
      query,
      heartbeat_log_path: get_or("HEARTBEAT_LOG_PATH", "/tmp/crm_heartbeat_log.txt").into(),
      report_log_path: get_or("REPORT_LOG_PATH", "/tmp/crm_report_log.txt").into(),
      reminder_log_path: get_or("REMINDER_LOG_PATH", "/tmp/order_reminders_log.txt").into(),
      seed_db,
    };
    tracing::info!(store = %config.store.redacted_url(), "Application configuration loaded successfully.");
    Ok(config)
  }

  pub fn bind_address(&self) -> String {
    format!("{}:{}", self.server_host, self.server_port)
  }
}

fn parse_var<T>(name: &str, raw: &str) -> Result<T>
where
  T: std::str::FromStr,
  T::Err: std::fmt::Display,
{
  raw
    .trim()
    .parse::<T>()
    .map_err(|e| AppError::Config(format!("Invalid {} value '{}': {}", name, raw, e)))
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::collections::HashMap;

  fn config_from(pairs: &[(&str, &str)]) -> Result<AppConfig> {
    let vars: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
    AppConfig::from_lookup(|name| vars.get(name).cloned())
  }

  #[test]
  fn defaults_select_the_memory_store() {
    let config = config_from(&[]).unwrap();
    assert!(config.store.database_url.is_none());
    assert_eq!(config.bind_address(), "127.0.0.1:8080");
    assert_eq!(config.query.max_page_size, 100);
    assert!(!config.seed_db);
  }

  #[test]
  fn values_are_parsed_and_checked() {
    let config = config_from(&[
      ("DATABASE_URL", "postgres://crm:pw@localhost/crm"),
      ("DB_ACQUIRE_TIMEOUT_SECS", "9"),
      ("MAX_PAGE_SIZE", "50"),
      ("SEED_DB", "true"),
    ])
    .unwrap();
    assert_eq!(config.store.acquire_timeout, Duration::from_secs(9));
    assert_eq!(config.query.max_page_size, 50);
    assert!(config.seed_db);

    assert!(config_from(&[("SERVER_PORT", "http")]).is_err());
    assert!(config_from(&[("DEFAULT_PAGE_SIZE", "500")]).is_err());
  }
}
