// core/src/stock/mod.rs

//! The stock ledger: per `(product, size)` counters and the transactional
//! reduce / restore / availability operations over them.

pub mod ledger;

pub use ledger::{AvailabilityReport, StockLedger, StockOutcome};

use crate::error::StoreResult;
use crate::models::StockEntry;
use async_trait::async_trait;
use uuid::Uuid;

/// Storage backend for stock entries.
#[async_trait]
pub trait StockStore: Send + Sync {
  /// Opens a transaction in which entries can be locked and adjusted.
  /// Backends must give it serializable-or-stronger isolation.
  async fn begin(&self) -> StoreResult<Box<dyn StockTransaction>>;

  /// Reads an entry outside of any transaction.
  async fn find_entry(&self, product_id: Uuid, size: &str) -> StoreResult<Option<StockEntry>>;
}

/// An open stock transaction. Dropping it without `commit` discards every adjustment.
#[async_trait]
pub trait StockTransaction: Send {
  /// Reads an entry and locks it against other writers until the transaction ends.
  /// Adjustments already made in this transaction are visible.
  async fn lock_entry(&mut self, product_id: Uuid, size: &str) -> StoreResult<Option<StockEntry>>;

  /// Adds `delta` (possibly negative) to the entry's `stock`.
  async fn adjust_stock(&mut self, product_id: Uuid, size: &str, delta: i32) -> StoreResult<()>;

  async fn commit(self: Box<Self>) -> StoreResult<()>;

  async fn rollback(self: Box<Self>) -> StoreResult<()>;
}
