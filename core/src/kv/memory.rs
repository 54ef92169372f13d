// core/src/kv/memory.rs

use super::KvStore;
use crate::error::{StoreError, StoreResult};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, Clone)]
struct Slot {
  value: String,
  expires_at: Option<Instant>,
}

impl Slot {
  fn is_live(&self, now: Instant) -> bool {
    self.expires_at.map_or(true, |at| at > now)
  }
}

/// Process-local key-value store. Expiry follows `tokio::time`, so paused
/// test clocks apply.
#[derive(Debug, Default)]
pub struct MemoryKvStore {
  slots: Mutex<HashMap<String, Slot>>,
}

impl MemoryKvStore {
  pub fn new() -> Self {
    Self::default()
  }

  fn live<'a>(slots: &'a mut HashMap<String, Slot>, key: &str, now: Instant) -> Option<&'a mut Slot> {
    if slots.get(key).is_some_and(|s| !s.is_live(now)) {
      slots.remove(key);
    }
    slots.get_mut(key)
  }
}

#[async_trait]
impl KvStore for MemoryKvStore {
  async fn get(&self, key: &str) -> StoreResult<Option<String>> {
    let mut slots = self.slots.lock();
    Ok(Self::live(&mut slots, key, Instant::now()).map(|s| s.value.clone()))
  }

  async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> StoreResult<()> {
    let expires_at = ttl.map(|t| Instant::now() + t);
    self.slots.lock().insert(
      key.to_string(),
      Slot {
        value: value.to_string(),
        expires_at,
      },
    );
    Ok(())
  }

  async fn incr(&self, key: &str) -> StoreResult<i64> {
    let mut slots = self.slots.lock();
    let now = Instant::now();
    match Self::live(&mut slots, key, now) {
      Some(slot) => {
        let current: i64 = slot
          .value
          .parse()
          .map_err(|_| StoreError::Internal(format!("value at '{}' is not an integer", key)))?;
        slot.value = (current + 1).to_string();
        Ok(current + 1)
      }
      None => {
        slots.insert(
          key.to_string(),
          Slot {
            value: "1".to_string(),
            expires_at: None,
          },
        );
        Ok(1)
      }
    }
  }

  async fn expire(&self, key: &str, ttl: Duration) -> StoreResult<()> {
    let mut slots = self.slots.lock();
    let now = Instant::now();
    if let Some(slot) = Self::live(&mut slots, key, now) {
      slot.expires_at = Some(now + ttl);
    }
    Ok(())
  }

  async fn ttl(&self, key: &str) -> StoreResult<Option<i64>> {
    let mut slots = self.slots.lock();
    let now = Instant::now();
    Ok(
      Self::live(&mut slots, key, now)
        .and_then(|s| s.expires_at)
        .map(|at| at.saturating_duration_since(now).as_secs() as i64),
    )
  }

  async fn delete(&self, keys: &[String]) -> StoreResult<()> {
    let mut slots = self.slots.lock();
    for key in keys {
      slots.remove(key);
    }
    Ok(())
  }

  async fn keys_with_prefix(&self, prefix: &str) -> StoreResult<Vec<String>> {
    let now = Instant::now();
    let slots = self.slots.lock();
    Ok(
      slots
        .iter()
        .filter(|(k, s)| k.starts_with(prefix) && s.is_live(now))
        .map(|(k, _)| k.clone())
        .collect(),
    )
  }

  async fn flush(&self) -> StoreResult<()> {
    self.slots.lock().clear();
    Ok(())
  }
}
