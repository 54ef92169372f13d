// server/src/web/handlers/admin_handlers.rs

use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use storefront_core::catalog::{NewProduct, ProductPatch};
use storefront_core::dispatch::notifier::TEST_MESSAGE;
use storefront_core::dispatch::NotifyError;
use storefront_core::models::OrderStatus;
use storefront_core::orders::OrderFilter;
use storefront_core::stats::collect_stats;
use tracing::{error, info, instrument};
use uuid::Uuid;

use crate::errors::AppError;
use crate::state::AppState;

// --- Orders ---

#[derive(Deserialize, Debug, Default)]
pub struct ListOrdersQuery {
  pub status: Option<String>,
  pub search: Option<String>,
}

impl ListOrdersQuery {
  fn into_filter(self) -> Result<OrderFilter, AppError> {
    let status = match self.status.as_deref().map(str::trim) {
      None | Some("") => None,
      Some(s) if s.eq_ignore_ascii_case("all") => None,
      Some(s) => Some(s.parse::<OrderStatus>().map_err(|e| AppError::Validation(e.to_string()))?),
    };
    let search = self.search.map(|s| s.trim().to_string()).filter(|s| !s.is_empty());
    Ok(OrderFilter { status, search })
  }
}

#[instrument(name = "handler::admin_list_orders", skip(app_state, query_params))]
pub async fn list_orders_handler(
  app_state: web::Data<AppState>,
  query_params: web::Query<ListOrdersQuery>,
) -> Result<HttpResponse, AppError> {
  let filter = query_params.into_inner().into_filter()?;
  let orders = app_state.orders.list_orders(&filter).await?;
  info!(count = orders.len(), "Orders listed.");
  Ok(HttpResponse::Ok().json(orders))
}

#[instrument(name = "handler::admin_get_order", skip(app_state, path), fields(order_id = %path.as_ref()))]
pub async fn get_order_handler(app_state: web::Data<AppState>, path: web::Path<Uuid>) -> Result<HttpResponse, AppError> {
  let order = app_state
    .orders
    .find_order(path.into_inner())
    .await?
    .ok_or_else(|| AppError::NotFound("Order not found".to_string()))?;
  Ok(HttpResponse::Ok().json(order))
}

#[derive(Deserialize, Debug)]
pub struct UpdateStatusPayload {
  pub status: String,
}

#[instrument(
    name = "handler::admin_update_order_status",
    skip(app_state, path, req_payload),
    fields(order_id = %path.as_ref(), requested = %req_payload.status)
)]
pub async fn update_order_status_handler(
  app_state: web::Data<AppState>,
  path: web::Path<Uuid>,
  req_payload: web::Json<UpdateStatusPayload>,
) -> Result<HttpResponse, AppError> {
  let requested = req_payload
    .status
    .parse::<OrderStatus>()
    .map_err(|e| AppError::Validation(e.to_string()))?;
  let order = app_state
    .status_controller
    .change_status(path.into_inner(), requested)
    .await?;
  info!(order_number = %order.order_number, status = %order.status, "Order status changed.");
  Ok(HttpResponse::Ok().json(order))
}

#[instrument(name = "handler::admin_stock_check", skip(app_state, path), fields(order_id = %path.as_ref()))]
pub async fn stock_check_handler(app_state: web::Data<AppState>, path: web::Path<Uuid>) -> Result<HttpResponse, AppError> {
  let order = app_state
    .orders
    .find_order(path.into_inner())
    .await?
    .ok_or_else(|| AppError::NotFound("Order not found".to_string()))?;
  let report = app_state.ledger.check_availability(&order.stock_lines()).await;
  Ok(HttpResponse::Ok().json(report))
}

// --- Products ---

#[instrument(name = "handler::admin_create_product", skip(app_state, req_payload))]
pub async fn create_product_handler(
  app_state: web::Data<AppState>,
  req_payload: web::Json<NewProduct>,
) -> Result<HttpResponse, AppError> {
  let product = app_state.catalog.create(req_payload.into_inner()).await?;
  Ok(HttpResponse::Created().json(product))
}

#[instrument(name = "handler::admin_update_product", skip(app_state, path, req_payload), fields(product_id = %path.as_ref()))]
pub async fn update_product_handler(
  app_state: web::Data<AppState>,
  path: web::Path<Uuid>,
  req_payload: web::Json<ProductPatch>,
) -> Result<HttpResponse, AppError> {
  let product = app_state
    .catalog
    .update(path.into_inner(), req_payload.into_inner())
    .await?;
  Ok(HttpResponse::Ok().json(product))
}

#[instrument(name = "handler::admin_archive_product", skip(app_state, path), fields(product_id = %path.as_ref()))]
pub async fn archive_product_handler(
  app_state: web::Data<AppState>,
  path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
  let product = app_state.catalog.archive(path.into_inner()).await?;
  Ok(HttpResponse::Ok().json(json!({
    "message": "Product archived",
    "product": product,
  })))
}

// --- Dashboard & maintenance ---

#[instrument(name = "handler::admin_stats", skip(app_state))]
pub async fn stats_handler(app_state: web::Data<AppState>) -> HttpResponse {
  let stats = collect_stats(app_state.stats.as_ref()).await;
  HttpResponse::Ok().json(stats)
}

#[derive(Deserialize, Debug, Default)]
pub struct InvalidateCachePayload {
  pub key: Option<String>,
}

#[instrument(name = "handler::admin_invalidate_cache", skip(app_state, req_payload))]
pub async fn invalidate_cache_handler(
  app_state: web::Data<AppState>,
  req_payload: web::Json<InvalidateCachePayload>,
) -> Result<HttpResponse, AppError> {
  let key = req_payload
    .into_inner()
    .key
    .map(|k| k.trim().to_string())
    .filter(|k| !k.is_empty())
    .ok_or_else(|| AppError::Validation("Cache key is required".to_string()))?;

  if key == "all" {
    app_state.cache.invalidate_all().await;
  } else {
    app_state.cache.invalidate(&key).await;
  }
  info!(key = %key, "Cache invalidated by admin.");
  Ok(HttpResponse::Ok().json(json!({
    "success": true,
    "message": format!("Cache invalidated for key: {}", key),
  })))
}

#[instrument(name = "handler::admin_telegram_test", skip(app_state))]
pub async fn telegram_test_handler(app_state: web::Data<AppState>) -> HttpResponse {
  match app_state.notifier.send_message(TEST_MESSAGE).await {
    Ok(()) => HttpResponse::Ok().json(json!({ "success": true, "message": "Test message sent" })),
    Err(NotifyError::NotConfigured) => HttpResponse::BadRequest().json(json!({
      "success": false,
      "error": "Telegram bot is not configured",
    })),
    Err(e) => {
      error!(error = %e, "Telegram test message failed.");
      HttpResponse::InternalServerError().json(json!({
        "success": false,
        "error": "Failed to send test message",
      }))
    }
  }
}
