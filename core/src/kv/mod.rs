// core/src/kv/mod.rs

//! Key-value store used for counters with TTLs and cached JSON documents.

mod memory;
mod redis_kv;

pub use memory::MemoryKvStore;
pub use redis_kv::RedisKvStore;

use crate::error::StoreResult;
use async_trait::async_trait;
use std::time::Duration;

#[async_trait]
pub trait KvStore: Send + Sync {
  async fn get(&self, key: &str) -> StoreResult<Option<String>>;

  /// Stores `value`, replacing any previous value and expiry.
  async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> StoreResult<()>;

  /// Increments the integer at `key` (missing counts as 0), keeping its expiry.
  async fn incr(&self, key: &str) -> StoreResult<i64>;

  async fn expire(&self, key: &str, ttl: Duration) -> StoreResult<()>;

  /// Remaining lifetime in whole seconds. `None` when the key is missing or
  /// has no expiry.
  async fn ttl(&self, key: &str) -> StoreResult<Option<i64>>;

  async fn delete(&self, keys: &[String]) -> StoreResult<()>;

  async fn keys_with_prefix(&self, prefix: &str) -> StoreResult<Vec<String>>;

  /// Removes every key this store owns.
  async fn flush(&self) -> StoreResult<()>;
}
