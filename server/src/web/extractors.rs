// server/src/web/extractors.rs

use actix_web::dev::Payload;
use actix_web::{web, FromRequest, HttpRequest, HttpResponseBuilder};
use futures_util::future::{ready, LocalBoxFuture, Ready};
use storefront_core::limits::{client_ip, RateDecision};
use tracing::warn;

use crate::errors::{rate_limit_headers, AppError};
use crate::state::AppState;

/// Caller address as reported by the proxy headers.
#[derive(Debug, Clone)]
pub struct ClientIp(pub String);

fn ip_of(req: &HttpRequest) -> String {
  client_ip(|name| req.headers().get(name).and_then(|v| v.to_str().ok()))
}

impl FromRequest for ClientIp {
  type Error = AppError;
  type Future = Ready<Result<Self, Self::Error>>;

  fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
    ready(Ok(ClientIp(ip_of(req))))
  }
}

/// Admits the request under the per-IP request budget. Rejected requests
/// become `AppError::RateLimited` before the handler runs.
#[derive(Debug, Clone)]
pub struct RateLimited {
  pub ip: String,
  pub decision: RateDecision,
}

impl RateLimited {
  /// Copies the `X-RateLimit-*` headers onto a response.
  pub fn decorate<'a>(&self, builder: &'a mut HttpResponseBuilder) -> &'a mut HttpResponseBuilder {
    for (name, value) in rate_limit_headers(&self.decision) {
      builder.insert_header((name, value));
    }
    builder
  }
}

impl FromRequest for RateLimited {
  type Error = AppError;
  type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

  fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
    let ip = ip_of(req);
    let state = req.app_data::<web::Data<AppState>>().cloned();
    Box::pin(async move {
      let state = state.ok_or_else(|| AppError::Internal("application state not registered".to_string()))?;
      let decision = state.rate_limiter.check(&ip).await;
      if !decision.allowed {
        warn!(ip = %ip, "Request rejected by rate limiter.");
        return Err(AppError::RateLimited(decision));
      }
      Ok(RateLimited { ip, decision })
    })
  }
}
