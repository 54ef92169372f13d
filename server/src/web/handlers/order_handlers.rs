// server/src/web/handlers/order_handlers.rs

use actix_web::{web, HttpResponse};
use serde_json::json;
use storefront_core::limits::format_time_remaining;
use storefront_core::orders::CheckoutRequest;
use tracing::{info, instrument};

use crate::errors::AppError;
use crate::state::AppState;
use crate::web::extractors::{ClientIp, RateLimited};

#[instrument(
    name = "handler::create_order",
    skip(app_state, req_payload, rate),
    fields(ip = %rate.ip, items = req_payload.items.len())
)]
pub async fn create_order_handler(
  app_state: web::Data<AppState>,
  req_payload: web::Json<CheckoutRequest>,
  rate: RateLimited,
) -> Result<HttpResponse, AppError> {
  let order = app_state
    .checkout
    .place_order(req_payload.into_inner(), &rate.ip)
    .await?;
  info!(order_number = %order.order_number, "Checkout completed.");
  Ok(rate.decorate(&mut HttpResponse::Created()).json(order))
}

#[instrument(name = "handler::purchase_limit_check", skip(app_state, client_ip), fields(ip = %client_ip.0))]
pub async fn purchase_limit_check_handler(
  app_state: web::Data<AppState>,
  client_ip: ClientIp,
) -> Result<HttpResponse, AppError> {
  let allowance = app_state.purchase_limiter.can_purchase(&client_ip.0).await;
  let remaining = allowance.timeout_remaining.unwrap_or(0);
  Ok(HttpResponse::Ok().json(json!({
    "allowed": allowance.allowed,
    "currentPurchases": allowance.current_purchases,
    "limit": allowance.limit,
    "timeoutRemaining": remaining,
    "timeoutFormatted": format_time_remaining(remaining),
  })))
}
