// server/src/config.rs

use crate::errors::{AppError, Result};
use dotenvy::dotenv;
use std::env;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
  Pretty,
  Json,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
  pub server_host: String,
  pub server_port: u16,

  /// Postgres URL. Without one the server runs on the in-memory store.
  pub database_url: Option<String>,
  /// Redis URL. Without one the cache and limiters use process memory.
  pub redis_url: Option<String>,
  pub redis_key_prefix: String,

  pub telegram_bot_token: Option<String>,
  pub telegram_chat_id: Option<String>,

  pub purchase_limit_per_ip: i64,
  pub purchase_timeout: Duration,
  pub rate_limit_requests: i64,
  pub rate_limit_window: Duration,

  pub dispatch_queue_capacity: usize,
  pub log_format: LogFormat,

  /// Inserts the demo catalog on startup when its slugs are free.
  pub seed_db: bool,
}

impl AppConfig {
  pub fn from_env() -> Result<Self> {
    dotenv().ok();
    Self::from_lookup(|name| env::var(name).ok())
  }

  /// Builds the config from any variable source. Blank values count as unset.
  pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
    let get_env = |var_name: &str| lookup(var_name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

    fn parsed<T: FromStr>(var_name: &str, raw: Option<String>, default: T) -> Result<T>
    where
      T::Err: std::fmt::Display,
    {
      match raw {
        Some(v) => v
          .parse::<T>()
          .map_err(|e| AppError::Config(format!("Invalid {} value '{}': {}", var_name, v, e))),
        None => Ok(default),
      }
    }

    let server_host = get_env("SERVER_HOST").unwrap_or_else(|| "127.0.0.1".to_string());
    let server_port = parsed("SERVER_PORT", get_env("SERVER_PORT"), 8080u16)?;

    let purchase_limit_per_ip = parsed("PURCHASE_LIMIT_PER_IP", get_env("PURCHASE_LIMIT_PER_IP"), 2i64)?;
    let purchase_timeout_minutes = parsed("PURCHASE_TIMEOUT_MINUTES", get_env("PURCHASE_TIMEOUT_MINUTES"), 30u64)?;
    let rate_limit_requests = parsed("RATE_LIMIT_REQUESTS", get_env("RATE_LIMIT_REQUESTS"), 10i64)?;
    let rate_limit_window_secs = parsed("RATE_LIMIT_WINDOW_SECS", get_env("RATE_LIMIT_WINDOW_SECS"), 10u64)?;
    let dispatch_queue_capacity = parsed("DISPATCH_QUEUE_CAPACITY", get_env("DISPATCH_QUEUE_CAPACITY"), 256usize)?;

    if purchase_limit_per_ip < 1 || rate_limit_requests < 1 {
      return Err(AppError::Config(
        "PURCHASE_LIMIT_PER_IP and RATE_LIMIT_REQUESTS must be at least 1".to_string(),
      ));
    }

    let log_format = match get_env("LOG_FORMAT").as_deref() {
      None | Some("pretty") => LogFormat::Pretty,
      Some("json") => LogFormat::Json,
      Some(other) => return Err(AppError::Config(format!("Invalid LOG_FORMAT value '{}'", other))),
    };

    let seed_db = parsed("SEED_DB", get_env("SEED_DB"), false)?;

    Ok(Self {
      server_host,
      server_port,
      database_url: get_env("DATABASE_URL"),
      redis_url: get_env("REDIS_URL"),
      redis_key_prefix: get_env("REDIS_KEY_PREFIX").unwrap_or_else(|| "storefront".to_string()),
      telegram_bot_token: get_env("TELEGRAM_BOT_TOKEN"),
      telegram_chat_id: get_env("TELEGRAM_CHAT_ID"),
      purchase_limit_per_ip,
      purchase_timeout: Duration::from_secs(purchase_timeout_minutes * 60),
      rate_limit_requests,
      rate_limit_window: Duration::from_secs(rate_limit_window_secs),
      dispatch_queue_capacity,
      log_format,
      seed_db,
    })
  }

  pub fn bind_address(&self) -> String {
    format!("{}:{}", self.server_host, self.server_port)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::collections::HashMap;

  fn config_from(vars: &[(&str, &str)]) -> Result<AppConfig> {
    let vars: HashMap<String, String> = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
    AppConfig::from_lookup(|name| vars.get(name).cloned())
  }

  #[test]
  fn defaults_apply_when_nothing_is_set() {
    let cfg = config_from(&[]).unwrap();
    assert_eq!(cfg.bind_address(), "127.0.0.1:8080");
    assert!(cfg.database_url.is_none());
    assert!(cfg.redis_url.is_none());
    assert_eq!(cfg.redis_key_prefix, "storefront");
    assert_eq!(cfg.purchase_limit_per_ip, 2);
    assert_eq!(cfg.purchase_timeout, Duration::from_secs(1800));
    assert_eq!(cfg.rate_limit_requests, 10);
    assert_eq!(cfg.rate_limit_window, Duration::from_secs(10));
    assert_eq!(cfg.log_format, LogFormat::Pretty);
    assert!(!cfg.seed_db);
  }

  #[test]
  fn blank_values_count_as_unset() {
    let cfg = config_from(&[("DATABASE_URL", "  "), ("TELEGRAM_BOT_TOKEN", "")]).unwrap();
    assert!(cfg.database_url.is_none());
    assert!(cfg.telegram_bot_token.is_none());
  }

  #[test]
  fn invalid_values_are_config_errors() {
    assert!(matches!(config_from(&[("SERVER_PORT", "eighty")]), Err(AppError::Config(_))));
    assert!(matches!(config_from(&[("SEED_DB", "yes")]), Err(AppError::Config(_))));
    assert!(matches!(config_from(&[("LOG_FORMAT", "xml")]), Err(AppError::Config(_))));
    assert!(matches!(config_from(&[("PURCHASE_LIMIT_PER_IP", "0")]), Err(AppError::Config(_))));
  }
}
