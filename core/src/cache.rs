// core/src/cache.rs

//! JSON response cache on top of the key-value store.
//!
//! Every failure is logged and then treated as a miss or a no-op: the cache
//! never fails a request.

use crate::kv::KvStore;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

pub const PRODUCTS_KEY: &str = "products";
pub const CATEGORIES_KEY: &str = "categories";
pub const COLLECTIONS_KEY: &str = "collections";

pub const PRODUCT_LIST_TTL: Duration = Duration::from_secs(30 * 60);
pub const PRODUCT_DETAIL_TTL: Duration = Duration::from_secs(60 * 60);
pub const TAXONOMY_TTL: Duration = Duration::from_secs(60 * 60);

pub fn product_key(slug: &str) -> String {
  format!("product:{}", slug)
}

pub fn product_list_key(params: &str) -> String {
  format!("{}:{}", PRODUCTS_KEY, params)
}

#[derive(Clone)]
pub struct ResponseCache {
  kv: Arc<dyn KvStore>,
}

impl ResponseCache {
  pub fn new(kv: Arc<dyn KvStore>) -> Self {
    Self { kv }
  }

  pub async fn get_json<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
    let raw = match self.kv.get(key).await {
      Ok(raw) => raw?,
      Err(e) => {
        warn!(key, error = %e, "Cache read failed.");
        return None;
      }
    };
    match serde_json::from_str(&raw) {
      Ok(value) => {
        debug!(key, "Cache hit.");
        Some(value)
      }
      Err(e) => {
        warn!(key, error = %e, "Discarding undecodable cache entry.");
        None
      }
    }
  }

  pub async fn put_json<T: Serialize>(&self, key: &str, value: &T, ttl: Duration) {
    let raw = match serde_json::to_string(value) {
      Ok(raw) => raw,
      Err(e) => {
        warn!(key, error = %e, "Could not encode value for cache.");
        return;
      }
    };
    if let Err(e) = self.kv.set(key, &raw, Some(ttl)).await {
      warn!(key, error = %e, "Cache write failed.");
    }
  }

  /// Removes `key`. Invalidating `products` also drops every `products:*` page.
  pub async fn invalidate(&self, key: &str) {
    let mut keys = vec![key.to_string()];
    if key == PRODUCTS_KEY {
      match self.kv.keys_with_prefix(&format!("{}:", PRODUCTS_KEY)).await {
        Ok(pages) => keys.extend(pages),
        Err(e) => warn!(error = %e, "Could not list cached product pages."),
      }
    }
    match self.kv.delete(&keys).await {
      Ok(()) => debug!(key, removed = keys.len(), "Cache invalidated."),
      Err(e) => warn!(key, error = %e, "Cache invalidation failed."),
    }
  }

  pub async fn invalidate_many(&self, keys: &[String]) {
    for key in keys {
      self.invalidate(key).await;
    }
  }

  /// Clears every entry in the store.
  pub async fn invalidate_all(&self) {
    if let Err(e) = self.kv.flush().await {
      warn!(error = %e, "Flushing the cache failed.");
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::kv::MemoryKvStore;

  #[tokio::test]
  async fn invalidating_products_drops_pages() {
    let kv = Arc::new(MemoryKvStore::new());
    let cache = ResponseCache::new(kv.clone());
    cache.put_json(PRODUCTS_KEY, &1, PRODUCT_LIST_TTL).await;
    cache.put_json(&product_list_key("page=2"), &2, PRODUCT_LIST_TTL).await;
    cache.put_json(&product_key("tee"), &3, PRODUCT_DETAIL_TTL).await;

    cache.invalidate(PRODUCTS_KEY).await;

    assert_eq!(cache.get_json::<i32>(PRODUCTS_KEY).await, None);
    assert_eq!(cache.get_json::<i32>(&product_list_key("page=2")).await, None);
    assert_eq!(cache.get_json::<i32>(&product_key("tee")).await, Some(3));
  }

  #[tokio::test]
  async fn undecodable_entry_is_a_miss() {
    let kv = Arc::new(MemoryKvStore::new());
    kv.set("categories", "not json", None).await.unwrap();
    let cache = ResponseCache::new(kv);
    assert_eq!(cache.get_json::<Vec<String>>(CATEGORIES_KEY).await, None);
  }
}
