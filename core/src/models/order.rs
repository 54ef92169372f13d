// core/src/models/order.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type as SqlxType};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::stock::StockLine;

/// Order lifecycle status, stored in the `order_status` Postgres enum.
///
/// Only `Pending`, `Approved` and `Cancelled` take part in status transitions;
/// the remaining variants exist for display of historical rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, SqlxType)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "order_status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
  Pending,
  Approved,
  Cancelled,
  Confirmed,
  Processing,
  Shipped,
  Delivered,
}

impl OrderStatus {
  pub fn as_str(&self) -> &'static str {
    match self {
      OrderStatus::Pending => "PENDING",
      OrderStatus::Approved => "APPROVED",
      OrderStatus::Cancelled => "CANCELLED",
      OrderStatus::Confirmed => "CONFIRMED",
      OrderStatus::Processing => "PROCESSING",
      OrderStatus::Shipped => "SHIPPED",
      OrderStatus::Delivered => "DELIVERED",
    }
  }

  /// Whether an admin may request this status through the status controller.
  pub fn is_assignable(&self) -> bool {
    matches!(self, OrderStatus::Pending | OrderStatus::Approved | OrderStatus::Cancelled)
  }
}

impl fmt::Display for OrderStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown order status '{0}'")]
pub struct UnknownOrderStatus(pub String);

impl FromStr for OrderStatus {
  type Err = UnknownOrderStatus;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim().to_ascii_uppercase().as_str() {
      "PENDING" => Ok(OrderStatus::Pending),
      "APPROVED" => Ok(OrderStatus::Approved),
      "CANCELLED" => Ok(OrderStatus::Cancelled),
      "CONFIRMED" => Ok(OrderStatus::Confirmed),
      "PROCESSING" => Ok(OrderStatus::Processing),
      "SHIPPED" => Ok(OrderStatus::Shipped),
      "DELIVERED" => Ok(OrderStatus::Delivered),
      _ => Err(UnknownOrderStatus(s.to_string())),
    }
  }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Order {
  pub id: Uuid,
  pub order_number: String,
  pub total: Decimal,
  pub status: OrderStatus,
  pub customer_name: String,
  pub customer_email: Option<String>,
  pub customer_phone: String,
  pub shipping_address: String,
  pub payment_proof_url: Option<String>,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
  // Loaded separately from `order_items`.
  #[sqlx(skip)]
  pub items: Vec<OrderItem>,
}

impl Order {
  /// The order's lines as stock movements against the ledger.
  pub fn stock_lines(&self) -> Vec<StockLine> {
    self.items.iter().map(OrderItem::stock_line).collect()
  }
}

/// A line of an order. Name and price are snapshots taken at checkout.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
  pub id: Uuid,
  #[serde(skip_serializing)]
  pub order_id: Uuid,
  pub product_id: Uuid,
  pub name: String,
  pub price: Decimal,
  pub size: String,
  pub quantity: i32,
}

impl OrderItem {
  pub fn stock_line(&self) -> StockLine {
    StockLine {
      product_id: self.product_id,
      size: self.size.clone(),
      quantity: self.quantity,
    }
  }
}

/// Everything needed to insert an order and its items in one transaction.
#[derive(Debug, Clone)]
pub struct NewOrder {
  pub order_number: String,
  pub total: Decimal,
  pub customer_name: String,
  pub customer_email: Option<String>,
  pub customer_phone: String,
  pub shipping_address: String,
  pub payment_proof_url: Option<String>,
  pub items: Vec<NewOrderItem>,
}

#[derive(Debug, Clone)]
pub struct NewOrderItem {
  pub product_id: Uuid,
  pub name: String,
  pub price: Decimal,
  pub size: String,
  pub quantity: i32,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn status_parses_case_insensitively() {
    assert_eq!("approved".parse::<OrderStatus>(), Ok(OrderStatus::Approved));
    assert_eq!(" PENDING ".parse::<OrderStatus>(), Ok(OrderStatus::Pending));
    assert!("REFUNDED".parse::<OrderStatus>().is_err());
  }

  #[test]
  fn only_live_states_are_assignable() {
    assert!(OrderStatus::Cancelled.is_assignable());
    assert!(!OrderStatus::Shipped.is_assignable());
  }

  #[test]
  fn status_serializes_in_upper_case() {
    let json = serde_json::to_string(&OrderStatus::Approved).unwrap();
    assert_eq!(json, "\"APPROVED\"");
  }
}
