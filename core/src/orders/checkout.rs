// core/src/orders/checkout.rs

//! Order creation from a storefront checkout.

use super::{generate_order_number, OrderStore};
use crate::dispatch::Dispatcher;
use crate::error::{FlowError, StoreError};
use crate::flow::{ContextData, Pipeline, PipelineControl, PipelineResult};
use crate::limits::PurchaseLimiter;
use crate::models::{NewOrder, NewOrderItem, Order};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, instrument, warn};
use uuid::Uuid;
use validator::{Validate, ValidationError};

pub const DEFAULT_SIZE: &str = "One Size";

#[derive(Debug, Error)]
pub enum CheckoutError {
  #[error("{0}")]
  Validation(String),

  #[error("Purchase limit exceeded")]
  PurchaseLimitExceeded { message: String, timeout_remaining: i64 },

  #[error("Store error: {0}")]
  Store(#[from] StoreError),

  #[error("Flow error: {0}")]
  Flow(#[from] FlowError),
}

fn validate_phone(phone: &str) -> Result<(), ValidationError> {
  let ok = phone
    .chars()
    .enumerate()
    .all(|(i, c)| c.is_ascii_digit() || matches!(c, ' ' | '(' | ')' | '-') || (c == '+' && i == 0));
  if ok && phone.chars().any(|c| c.is_ascii_digit()) {
    Ok(())
  } else {
    Err(ValidationError::new("phone").with_message("Please enter a valid phone number".into()))
  }
}

fn validate_payment_proof(url: &str) -> Result<(), ValidationError> {
  if url.starts_with("http") || url.starts_with("/uploads/") {
    Ok(())
  } else {
    Err(ValidationError::new("payment_proof").with_message("Please upload a valid payment proof".into()))
  }
}

fn validate_positive(value: &Decimal) -> Result<(), ValidationError> {
  if *value > Decimal::ZERO {
    Ok(())
  } else {
    Err(ValidationError::new("positive").with_message("Must be greater than zero".into()))
  }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CheckoutVariant {
  pub size: Option<String>,
}

/// One cart line as submitted by the storefront.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CheckoutItem {
  /// Product id.
  #[validate(length(min = 1, message = "Product ID is required"))]
  pub id: String,
  #[validate(length(min = 1, message = "Product name is required"))]
  pub name: String,
  #[validate(custom(function = "validate_positive", message = "Price must be positive"))]
  pub price: Decimal,
  #[validate(range(min = 1, message = "Quantity must be at least 1"))]
  pub quantity: i32,
  #[serde(default)]
  pub variant: Option<CheckoutVariant>,
}

impl CheckoutItem {
  pub fn size(&self) -> String {
    self
      .variant
      .as_ref()
      .and_then(|v| v.size.as_deref())
      .map(str::trim)
      .filter(|s| !s.is_empty())
      .unwrap_or(DEFAULT_SIZE)
      .to_string()
  }
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequest {
  #[validate(length(min = 2, message = "Full name must be at least 2 characters"))]
  pub full_name: String,
  #[validate(email(message = "Please enter a valid email address"))]
  pub email: Option<String>,
  #[validate(
    length(min = 7, max = 20, message = "Phone number must be 7 to 20 characters"),
    custom(function = "validate_phone")
  )]
  pub phone: String,
  #[validate(length(min = 1, message = "Province/City is required"))]
  pub province: String,
  #[validate(length(min = 5, message = "Address must be at least 5 characters"))]
  pub address: String,
  #[validate(custom(function = "validate_payment_proof"))]
  pub payment_proof_url: Option<String>,
  pub instagram: Option<String>,
  #[validate(length(min = 1, message = "Cart must contain at least one item"), nested)]
  pub items: Vec<CheckoutItem>,
  pub subtotal: Option<Decimal>,
  pub delivery_fee: Option<Decimal>,
  #[validate(custom(function = "validate_positive", message = "Total must be positive"))]
  pub total: Decimal,
}

impl CheckoutRequest {
  /// Blank optional fields are treated as absent.
  fn normalized(mut self) -> Self {
    let blank_to_none = |v: Option<String>| v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty());
    self.email = blank_to_none(self.email);
    self.payment_proof_url = blank_to_none(self.payment_proof_url);
    self.instagram = blank_to_none(self.instagram);
    self
  }

  /// Checks the request and builds the order to insert.
  pub fn into_new_order(self) -> Result<NewOrder, CheckoutError> {
    let request = self.normalized();
    request
      .validate()
      .map_err(|e| CheckoutError::Validation(e.to_string()))?;

    let items = request
      .items
      .iter()
      .map(|item| {
        let product_id = Uuid::parse_str(item.id.trim())
          .map_err(|_| CheckoutError::Validation(format!("Invalid product id '{}'", item.id)))?;
        Ok(NewOrderItem {
          product_id,
          name: item.name.clone(),
          price: item.price,
          size: item.size(),
          quantity: item.quantity,
        })
      })
      .collect::<Result<Vec<_>, CheckoutError>>()?;

    Ok(NewOrder {
      order_number: generate_order_number(),
      total: request.total,
      customer_name: request.full_name.trim().to_string(),
      customer_email: request.email,
      customer_phone: request.phone.trim().to_string(),
      shipping_address: format!("{}, {}", request.address.trim(), request.province.trim()),
      payment_proof_url: request.payment_proof_url,
      items,
    })
  }
}

#[derive(Debug)]
pub struct CheckoutCtx {
  pub request: Option<CheckoutRequest>,
  pub client_ip: String,
  pub new_order: Option<NewOrder>,
  pub order: Option<Order>,
}

impl CheckoutCtx {
  pub fn new(request: CheckoutRequest, client_ip: impl Into<String>) -> Self {
    Self {
      request: Some(request),
      client_ip: client_ip.into(),
      new_order: None,
      order: None,
    }
  }
}

/// `check_purchase_limit -> validate_request -> create_order ->
/// record_purchase -> notify_new_order`.
///
/// A client over the limit is turned away before its request is looked at.
pub struct CheckoutFlow {
  pipeline: Pipeline<CheckoutCtx, CheckoutError>,
}

impl CheckoutFlow {
  pub fn new(orders: Arc<dyn OrderStore>, limiter: PurchaseLimiter, dispatcher: Dispatcher) -> Self {
    let mut pipeline = Pipeline::new(&[
      ("check_purchase_limit", false, None),
      ("validate_request", false, None),
      ("create_order", false, None),
      ("record_purchase", false, None),
      ("notify_new_order", true, None),
    ]);

    pipeline.on_root("validate_request", |ctx: ContextData<CheckoutCtx>| async move {
      let mut guard = ctx.write();
      let request = guard
        .request
        .take()
        .ok_or_else(|| CheckoutError::Flow(FlowError::Internal("checkout request missing".into())))?;
      guard.new_order = Some(request.into_new_order()?);
      Ok::<_, CheckoutError>(PipelineControl::Continue)
    });

    let limits = limiter.clone();
    pipeline.on_root("check_purchase_limit", move |ctx: ContextData<CheckoutCtx>| {
      let limits = limits.clone();
      async move {
        let ip = ctx.read().client_ip.clone();
        let allowance = limits.can_purchase(&ip).await;
        if allowance.allowed {
          return Ok(PipelineControl::Continue);
        }
        let remaining = allowance.timeout_remaining.unwrap_or(0);
        let wait_minutes = if remaining > 0 { (remaining + 59) / 60 } else { 30 };
        warn!(ip = %ip, purchases = allowance.current_purchases, "Purchase limit reached.");
        Err(CheckoutError::PurchaseLimitExceeded {
          message: format!(
            "You have reached the maximum of {} purchases. Please wait {} minutes before placing another order.",
            allowance.limit, wait_minutes
          ),
          timeout_remaining: remaining,
        })
      }
    });

    pipeline.on_root("create_order", move |ctx: ContextData<CheckoutCtx>| {
      let orders = orders.clone();
      async move {
        let new_order = ctx
          .write()
          .new_order
          .take()
          .ok_or_else(|| CheckoutError::Flow(FlowError::Internal("validated order missing".into())))?;
        let order = orders.create_order(new_order).await?;
        info!(order_number = %order.order_number, total = %order.total, "Order created.");
        ctx.write().order = Some(order);
        Ok::<_, CheckoutError>(PipelineControl::Continue)
      }
    });

    pipeline.on_root("record_purchase", move |ctx: ContextData<CheckoutCtx>| {
      let limits = limiter.clone();
      async move {
        let ip = ctx.read().client_ip.clone();
        limits.record_purchase(&ip).await;
        Ok::<_, CheckoutError>(PipelineControl::Continue)
      }
    });

    pipeline.on_root("notify_new_order", move |ctx: ContextData<CheckoutCtx>| {
      let dispatcher = dispatcher.clone();
      async move {
        if let Some(order) = ctx.read().order.clone() {
          dispatcher.notify_new_order(order);
        }
        Ok::<_, CheckoutError>(PipelineControl::Continue)
      }
    });

    Self { pipeline }
  }

  pub fn step_names(&self) -> Vec<&str> {
    self.pipeline.step_names()
  }

  #[instrument(name = "CheckoutFlow::place_order", skip(self, request))]
  pub async fn place_order(&self, request: CheckoutRequest, client_ip: &str) -> Result<Order, CheckoutError> {
    let ctx = ContextData::new(CheckoutCtx::new(request, client_ip));
    match self.pipeline.run(ctx.clone()).await? {
      PipelineResult::Completed => {
        let order = ctx.write().order.take();
        order.ok_or_else(|| CheckoutError::Flow(FlowError::Internal("checkout completed without an order".into())))
      }
      PipelineResult::Stopped => Err(CheckoutError::Flow(FlowError::Internal(
        "checkout stopped before completion".into(),
      ))),
    }
  }
}
