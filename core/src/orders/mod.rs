// core/src/orders/mod.rs

//! Order persistence contract and the order flows built on it.

pub mod checkout;
pub mod number;
pub mod status;

pub use checkout::{CheckoutCtx, CheckoutError, CheckoutFlow, CheckoutItem, CheckoutRequest};
pub use number::generate_order_number;
pub use status::{OrderStatusController, StatusChangeCtx, StatusChangeError, StockTransition};

use crate::error::StoreResult;
use crate::models::{NewOrder, Order, OrderStatus};
use async_trait::async_trait;
use uuid::Uuid;

/// Filter for the admin order list.
#[derive(Debug, Clone, Default)]
pub struct OrderFilter {
  pub status: Option<OrderStatus>,
  /// Case-insensitive match on order number, customer name, email or phone.
  pub search: Option<String>,
}

impl OrderFilter {
  pub fn matches(&self, order: &Order) -> bool {
    if self.status.is_some_and(|s| s != order.status) {
      return false;
    }
    let Some(needle) = self.search.as_deref().map(str::to_lowercase) else {
      return true;
    };
    if needle.is_empty() {
      return true;
    }
    [
      Some(order.order_number.as_str()),
      Some(order.customer_name.as_str()),
      order.customer_email.as_deref(),
      Some(order.customer_phone.as_str()),
    ]
    .into_iter()
    .flatten()
    .any(|field| field.to_lowercase().contains(&needle))
  }
}

#[async_trait]
pub trait OrderStore: Send + Sync {
  /// Order with its items.
  async fn find_order(&self, id: Uuid) -> StoreResult<Option<Order>>;

  /// Matching orders with items, newest first.
  async fn list_orders(&self, filter: &OrderFilter) -> StoreResult<Vec<Order>>;

  /// Inserts the order (status `PENDING`) and its items atomically.
  async fn create_order(&self, order: NewOrder) -> StoreResult<Order>;

  /// Moves the order from `from` to `to` and returns it with items.
  /// `StoreError::NotFound` when the order does not exist,
  /// `StoreError::Conflict` when its status is no longer `from`.
  async fn update_status(&self, id: Uuid, from: OrderStatus, to: OrderStatus) -> StoreResult<Order>;
}
