// tests/common/mod.rs
#![allow(dead_code)]

use chrono::{Duration as ChronoDuration, Utc};
use rust_decimal::Decimal;
use std::sync::Arc;
use storefront_core::dispatch::{Dispatcher, SideEffect};
use storefront_core::models::{NewOrder, NewOrderItem, Order, Product, ProductSize, StockLine};
use storefront_core::orders::OrderStore;
use storefront_core::store::MemoryStore;
use storefront_core::{ContextData, FlowError, PipelineControl, StockLedger, StockStore};
use tokio::sync::mpsc;
use tracing::Level;
use uuid::Uuid;

// --- Pipeline engine fixtures ---
#[derive(Clone, Debug, Default)]
pub struct TestContext {
  pub counter: i32,
  pub message: String,
  pub steps_executed: Vec<String>,
  pub should_stop_at: Option<String>,
}

#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum TestError {
  #[error("Flow error: {0}")]
  Flow(String),

  #[error("Test handler failed: {0}")]
  Handler(String),
}

impl From<FlowError> for TestError {
  fn from(fe: FlowError) -> Self {
    TestError::Flow(format!("{:?}", fe))
  }
}

pub fn create_simple_handler(
  step_name: &'static str,
  message_to_append: &'static str,
) -> storefront_core::flow::Handler<TestContext, TestError> {
  Box::new(move |ctx: ContextData<TestContext>| {
    Box::pin(async move {
      let mut guard = ctx.write();
      guard.counter += 1;
      guard.message.push_str(message_to_append);
      guard.steps_executed.push(step_name.to_string());
      if guard.should_stop_at.as_deref() == Some(step_name) {
        return Ok(PipelineControl::Stop);
      }
      Ok(PipelineControl::Continue)
    })
  })
}

pub fn create_failing_handler(
  step_name: &'static str,
  error_message: &'static str,
) -> storefront_core::flow::Handler<TestContext, TestError> {
  Box::new(move |ctx: ContextData<TestContext>| {
    Box::pin(async move {
      ctx.write().steps_executed.push(step_name.to_string());
      Err(TestError::Handler(error_message.to_string()))
    })
  })
}

// --- Tracing ---
use once_cell::sync::Lazy;
static TRACING_INIT: Lazy<()> = Lazy::new(|| {
  tracing_subscriber::fmt()
    .with_max_level(Level::DEBUG)
    .with_test_writer()
    .try_init()
    .ok();
});

pub fn setup_tracing() {
  Lazy::force(&TRACING_INIT);
}

// --- Storefront fixtures ---
pub fn money(units: i64) -> Decimal {
  Decimal::new(units, 0)
}

/// A memory store plus the pieces built on it. Side effects land in `effects`.
pub struct Shop {
  pub store: MemoryStore,
  pub ledger: StockLedger,
  pub dispatcher: Dispatcher,
  pub effects: mpsc::Receiver<SideEffect>,
}

impl Shop {
  pub fn new() -> Self {
    let store = MemoryStore::new();
    let ledger = StockLedger::new(Arc::new(store.clone()));
    let (dispatcher, effects) = Dispatcher::detached(64);
    Self {
      store,
      ledger,
      dispatcher,
      effects,
    }
  }

  /// Adds a product named `name` with `(size, stock)` rows. `age_minutes`
  /// pushes its creation time into the past.
  pub async fn add_product(&self, name: &str, price: i64, sizes: &[(&str, i32)], age_minutes: i64) -> Uuid {
    let rows: Vec<(&str, i32, i32)> = sizes.iter().map(|(size, stock)| (*size, *stock, 0)).collect();
    self.add_product_with_reserved(name, price, &rows, age_minutes).await
  }

  /// Like `add_product`, with `(size, stock, reserved)` rows.
  pub async fn add_product_with_reserved(
    &self,
    name: &str,
    price: i64,
    sizes: &[(&str, i32, i32)],
    age_minutes: i64,
  ) -> Uuid {
    let id = Uuid::new_v4();
    let created = Utc::now() - ChronoDuration::minutes(age_minutes);
    let product = Product {
      id,
      name: name.to_string(),
      slug: storefront_core::models::slugify(name),
      description: Some(format!("{} description", name)),
      price: money(price),
      in_stock: true,
      is_archived: false,
      category_id: None,
      collection_id: None,
      created_at: created,
      updated_at: created,
      archived_at: None,
    };
    let rows = sizes
      .iter()
      .map(|(size, stock, reserved)| ProductSize {
        id: Uuid::new_v4(),
        product_id: id,
        size: size.to_string(),
        price: money(price),
        stock: *stock,
        reserved_stock: *reserved,
      })
      .collect();
    self.store.insert_product(product, rows).await;
    id
  }

  pub async fn stock_of(&self, product_id: Uuid, size: &str) -> Option<i32> {
    self
      .store
      .find_entry(product_id, size)
      .await
      .unwrap()
      .map(|e| e.stock)
  }

  /// Creates a PENDING order with one line per `(product, size, quantity)`.
  pub async fn place_order(&self, lines: &[(Uuid, &str, i32)]) -> Order {
    let items = lines
      .iter()
      .map(|(product_id, size, quantity)| NewOrderItem {
        product_id: *product_id,
        name: "Line".to_string(),
        price: money(10),
        size: size.to_string(),
        quantity: *quantity,
      })
      .collect();
    self
      .store
      .create_order(NewOrder {
        order_number: storefront_core::orders::generate_order_number(),
        total: money(10),
        customer_name: "Test Customer".to_string(),
        customer_email: Some("customer@example.com".to_string()),
        customer_phone: "+1 555 0100".to_string(),
        shipping_address: "1 Test Street, Lima".to_string(),
        payment_proof_url: None,
        items,
      })
      .await
      .unwrap()
  }

  pub fn drain_effects(&mut self) -> Vec<SideEffect> {
    let mut out = Vec::new();
    while let Ok(effect) = self.effects.try_recv() {
      out.push(effect);
    }
    out
  }
}

pub fn line(product_id: Uuid, size: &str, quantity: i32) -> StockLine {
  StockLine::new(product_id, size, quantity)
}
