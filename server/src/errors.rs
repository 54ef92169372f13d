// server/src/errors.rs

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde_json::json;
use storefront_core::limits::RateDecision;
use storefront_core::{CatalogError, CheckoutError, FlowError, StatusChangeError, StoreError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
  #[error("Validation Error: {0}")]
  Validation(String),

  #[error("Resource Not Found: {0}")]
  NotFound(String),

  #[error("Conflict: {0}")]
  Conflict(String),

  #[error("Cannot approve order: Insufficient stock")]
  InsufficientStock { details: Vec<String> },

  #[error("Purchase limit exceeded")]
  PurchaseLimitExceeded { message: String, timeout_remaining: i64 },

  #[error("Too many requests")]
  RateLimited(RateDecision),

  #[error("Configuration Error: {0}")]
  Config(String),

  #[error("Store Error: {0}")]
  Store(#[from] StoreError),

  #[error("Workflow Error: {source}")]
  Workflow {
    #[from]
    source: FlowError,
  },

  #[error("Internal Server Error: {0}")]
  Internal(String),
}

impl From<anyhow::Error> for AppError {
  fn from(err: anyhow::Error) -> Self {
    AppError::Internal(err.to_string())
  }
}

impl From<StatusChangeError> for AppError {
  fn from(err: StatusChangeError) -> Self {
    match err {
      StatusChangeError::OrderNotFound => AppError::NotFound("Order not found".to_string()),
      StatusChangeError::InsufficientStock { details } => AppError::InsufficientStock { details },
      StatusChangeError::Validation(m) => AppError::Validation(m),
      StatusChangeError::Conflict(_) => {
        AppError::Conflict("Order status was changed by another request. Reload and try again.".to_string())
      }
      StatusChangeError::Store(e) => AppError::Store(e),
      StatusChangeError::Flow(e) => AppError::Workflow { source: e },
    }
  }
}

impl From<CheckoutError> for AppError {
  fn from(err: CheckoutError) -> Self {
    match err {
      CheckoutError::Validation(m) => AppError::Validation(m),
      CheckoutError::PurchaseLimitExceeded {
        message,
        timeout_remaining,
      } => AppError::PurchaseLimitExceeded {
        message,
        timeout_remaining,
      },
      CheckoutError::Store(e) => AppError::Store(e),
      CheckoutError::Flow(e) => AppError::Workflow { source: e },
    }
  }
}

impl From<CatalogError> for AppError {
  fn from(err: CatalogError) -> Self {
    match err {
      CatalogError::NotFound(m) => AppError::NotFound(m),
      CatalogError::Validation(m) => AppError::Validation(m),
      CatalogError::Store(e) => AppError::Store(e),
    }
  }
}

impl ResponseError for AppError {
  fn status_code(&self) -> StatusCode {
    match self {
      AppError::Validation(_) | AppError::InsufficientStock { .. } => StatusCode::BAD_REQUEST,
      AppError::NotFound(_) => StatusCode::NOT_FOUND,
      AppError::Conflict(_) => StatusCode::CONFLICT,
      AppError::PurchaseLimitExceeded { .. } | AppError::RateLimited(_) => StatusCode::TOO_MANY_REQUESTS,
      AppError::Config(_) | AppError::Store(_) | AppError::Workflow { .. } | AppError::Internal(_) => {
        StatusCode::INTERNAL_SERVER_ERROR
      }
    }
  }

  fn error_response(&self) -> HttpResponse {
    let status = self.status_code();
    if status.is_server_error() {
      tracing::error!(application_error = %self, "Responding with error");
    } else {
      tracing::warn!(application_error = %self, "Rejecting request");
    }

    let mut builder = HttpResponse::build(status);
    match self {
      AppError::Validation(m) | AppError::NotFound(m) | AppError::Conflict(m) => builder.json(json!({ "error": m })),
      AppError::InsufficientStock { details } => builder.json(json!({
        "error": "Cannot approve order: Insufficient stock",
        "details": details,
      })),
      AppError::PurchaseLimitExceeded {
        message,
        timeout_remaining,
      } => builder.json(json!({
        "error": "Purchase limit exceeded",
        "message": message,
        "timeoutRemaining": timeout_remaining,
      })),
      AppError::RateLimited(decision) => {
        for (name, value) in rate_limit_headers(decision) {
          builder.insert_header((name, value));
        }
        builder.json(json!({ "error": "Too many requests" }))
      }
      // Infrastructure detail stays in the logs.
      AppError::Config(_) | AppError::Store(_) | AppError::Workflow { .. } | AppError::Internal(_) => {
        builder.json(json!({ "error": "Internal server error" }))
      }
    }
  }
}

/// `X-RateLimit-*` headers for a rate-limit decision.
pub fn rate_limit_headers(decision: &RateDecision) -> [(&'static str, String); 3] {
  [
    ("X-RateLimit-Limit", decision.limit.to_string()),
    ("X-RateLimit-Remaining", decision.remaining.to_string()),
    ("X-RateLimit-Reset", decision.reset_at_ms.to_string()),
  ]
}

pub type Result<T, E = AppError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
  use super::*;
  use actix_web::body::to_bytes;

  async fn body_of(err: AppError) -> (StatusCode, serde_json::Value) {
    let resp = err.error_response();
    let status = resp.status();
    let bytes = to_bytes(resp.into_body()).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
  }

  #[actix_web::test]
  async fn insufficient_stock_lists_details() {
    let err = AppError::from(StatusChangeError::InsufficientStock {
      details: vec!["Insufficient stock for Tee (M). Available: 1, Requested: 2".into()],
    });
    let (status, body) = body_of(err).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Cannot approve order: Insufficient stock");
    assert_eq!(body["details"][0], "Insufficient stock for Tee (M). Available: 1, Requested: 2");
  }

  #[actix_web::test]
  async fn missing_order_is_404() {
    let (status, body) = body_of(StatusChangeError::OrderNotFound.into()).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({ "error": "Order not found" }));
  }

  #[actix_web::test]
  async fn lost_status_race_is_409() {
    let (status, body) = body_of(StatusChangeError::Conflict("order is APPROVED, expected PENDING".into()).into()).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(
      body,
      json!({ "error": "Order status was changed by another request. Reload and try again." })
    );
  }

  #[actix_web::test]
  async fn infrastructure_errors_are_generic() {
    let (status, body) = body_of(StoreError::Internal("pool exhausted at 10.0.0.3".into()).into()).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, json!({ "error": "Internal server error" }));
  }

  #[actix_web::test]
  async fn rate_limited_carries_headers() {
    let resp = AppError::RateLimited(RateDecision {
      allowed: false,
      limit: 10,
      remaining: 0,
      reset_at_ms: 1_700_000_000_000,
    })
    .error_response();
    assert_eq!(resp.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(resp.headers().get("X-RateLimit-Limit").unwrap().to_str().unwrap(), "10");
    assert_eq!(resp.headers().get("X-RateLimit-Remaining").unwrap().to_str().unwrap(), "0");
  }
}
