// core/src/models/stock.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// One `(product, size, quantity)` line handed to the stock ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockLine {
  pub product_id: Uuid,
  pub size: String,
  pub quantity: i32,
}

impl StockLine {
  pub fn new(product_id: Uuid, size: impl Into<String>, quantity: i32) -> Self {
    Self {
      product_id,
      size: size.into(),
      quantity,
    }
  }
}

/// Stock counters for one product size, joined with the product name for messages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct StockEntry {
  pub product_id: Uuid,
  pub size: String,
  pub product_name: String,
  pub stock: i32,
  pub reserved_stock: i32,
}

impl StockEntry {
  pub fn available(&self) -> i32 {
    self.stock - self.reserved_stock
  }
}
