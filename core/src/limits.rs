// core/src/limits.rs

//! Per-IP purchase limiting and request rate limiting.
//!
//! Both limiters fail open: when the key-value store is unavailable the
//! request is allowed and the failure is logged.

use crate::kv::KvStore;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, instrument, warn};

/// Client address used as the limiter key: first `x-forwarded-for` entry,
/// then `x-real-ip`, then `x-client-ip`, else `"unknown"`.
pub fn client_ip<'a>(header: impl Fn(&str) -> Option<&'a str>) -> String {
  if let Some(forwarded) = header("x-forwarded-for") {
    if let Some(first) = forwarded.split(',').next() {
      let first = first.trim();
      if !first.is_empty() {
        return first.to_string();
      }
    }
  }
  header("x-real-ip")
    .or_else(|| header("x-client-ip"))
    .map(|v| v.trim().to_string())
    .filter(|v| !v.is_empty())
    .unwrap_or_else(|| "unknown".to_string())
}

/// Renders a TTL for customers: `"0 minutes"`, `"N minute(s)"` or
/// `"H hour(s) and M minute(s)"`.
pub fn format_time_remaining(seconds: i64) -> String {
  if seconds <= 0 {
    return "0 minutes".to_string();
  }
  let plural = |n: i64| if n == 1 { "" } else { "s" };
  let hours = seconds / 3600;
  let minutes = (seconds % 3600) / 60;
  if hours > 0 {
    format!(
      "{} hour{} and {} minute{}",
      hours,
      plural(hours),
      minutes,
      plural(minutes)
    )
  } else {
    format!("{} minute{}", minutes, plural(minutes))
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseAllowance {
  pub allowed: bool,
  pub current_purchases: i64,
  pub limit: i64,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub timeout_remaining: Option<i64>,
}

#[derive(Clone)]
pub struct PurchaseLimiter {
  kv: Arc<dyn KvStore>,
  limit: i64,
  window: Duration,
}

impl PurchaseLimiter {
  pub fn new(kv: Arc<dyn KvStore>, limit: i64, window: Duration) -> Self {
    Self { kv, limit, window }
  }

  pub fn limit(&self) -> i64 {
    self.limit
  }

  fn key(ip: &str) -> String {
    format!("purchase_limit:{}", ip)
  }

  #[instrument(name = "PurchaseLimiter::can_purchase", skip(self))]
  pub async fn can_purchase(&self, ip: &str) -> PurchaseAllowance {
    match self.check(ip).await {
      Ok(allowance) => allowance,
      Err(e) => {
        error!(error = %e, "Purchase limit check failed, allowing purchase.");
        PurchaseAllowance {
          allowed: true,
          current_purchases: 0,
          limit: self.limit,
          timeout_remaining: None,
        }
      }
    }
  }

  async fn check(&self, ip: &str) -> crate::error::StoreResult<PurchaseAllowance> {
    let key = Self::key(ip);
    let current = self
      .kv
      .get(&key)
      .await?
      .and_then(|raw| raw.parse::<i64>().ok())
      .unwrap_or(0);

    if current >= self.limit {
      let remaining = self.kv.ttl(&key).await?.unwrap_or(0).max(0);
      return Ok(PurchaseAllowance {
        allowed: false,
        current_purchases: current,
        limit: self.limit,
        timeout_remaining: Some(remaining),
      });
    }

    Ok(PurchaseAllowance {
      allowed: true,
      current_purchases: current,
      limit: self.limit,
      timeout_remaining: None,
    })
  }

  /// Counts a completed purchase. The first purchase in a window starts the
  /// window; later ones keep its expiry.
  #[instrument(name = "PurchaseLimiter::record_purchase", skip(self))]
  pub async fn record_purchase(&self, ip: &str) {
    let key = Self::key(ip);
    let result = async {
      let current = self
        .kv
        .get(&key)
        .await?
        .and_then(|raw| raw.parse::<i64>().ok())
        .unwrap_or(0);
      if current == 0 {
        self.kv.set(&key, "1", Some(self.window)).await
      } else {
        self.kv.incr(&key).await.map(|_| ())
      }
    }
    .await;
    if let Err(e) = result {
      error!(error = %e, "Failed to record purchase.");
    }
  }
}

/// Outcome of one rate-limit check, with the values reported in the
/// `X-RateLimit-*` headers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateDecision {
  pub allowed: bool,
  pub limit: i64,
  pub remaining: i64,
  /// Unix time in milliseconds at which the current window ends.
  pub reset_at_ms: i64,
}

/// Fixed-window request counter keyed by client IP.
#[derive(Clone)]
pub struct RateLimiter {
  kv: Arc<dyn KvStore>,
  max_requests: i64,
  window: Duration,
}

impl RateLimiter {
  pub fn new(kv: Arc<dyn KvStore>, max_requests: i64, window: Duration) -> Self {
    Self {
      kv,
      max_requests,
      window,
    }
  }

  #[instrument(name = "RateLimiter::check", skip(self))]
  pub async fn check(&self, ip: &str) -> RateDecision {
    let key = format!("ratelimit_{}", ip);
    let now_ms = chrono::Utc::now().timestamp_millis();
    let window_ms = self.window.as_millis() as i64;

    let counted = async {
      let count = self.kv.incr(&key).await?;
      if count == 1 {
        self.kv.expire(&key, self.window).await?;
      }
      let ttl = self.kv.ttl(&key).await?;
      Ok::<_, crate::error::StoreError>((count, ttl))
    }
    .await;

    match counted {
      Ok((count, ttl)) => {
        let reset_at_ms = now_ms + ttl.map(|s| s * 1000).unwrap_or(window_ms);
        let allowed = count <= self.max_requests;
        if !allowed {
          warn!(count, limit = self.max_requests, "Rate limit exceeded.");
        }
        RateDecision {
          allowed,
          limit: self.max_requests,
          remaining: (self.max_requests - count).max(0),
          reset_at_ms,
        }
      }
      Err(e) => {
        error!(error = %e, "Rate limit check failed, allowing request.");
        RateDecision {
          allowed: true,
          limit: self.max_requests,
          remaining: self.max_requests,
          reset_at_ms: now_ms + window_ms,
        }
      }
    }
  }
}
