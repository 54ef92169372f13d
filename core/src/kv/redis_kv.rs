// core/src/kv/redis_kv.rs

use super::KvStore;
use crate::error::StoreResult;
use async_trait::async_trait;
use redis::{aio::ConnectionManager, AsyncCommands, Client};
use std::time::Duration;
use tracing::{debug, info};

/// Redis-backed store. Every key is namespaced as `{prefix}:{key}`.
#[derive(Clone)]
pub struct RedisKvStore {
  conn: ConnectionManager,
  key_prefix: String,
}

impl RedisKvStore {
  pub async fn connect(url: &str, key_prefix: &str) -> StoreResult<Self> {
    let client = Client::open(url)?;
    let conn = ConnectionManager::new(client).await?;
    info!(key_prefix = %key_prefix, "Connected to Redis.");
    Ok(Self {
      conn,
      key_prefix: key_prefix.to_string(),
    })
  }

  fn full_key(&self, key: &str) -> String {
    format!("{}:{}", self.key_prefix, key)
  }

  fn strip<'a>(&self, full: &'a str) -> &'a str {
    full
      .strip_prefix(self.key_prefix.as_str())
      .and_then(|rest| rest.strip_prefix(':'))
      .unwrap_or(full)
  }

  async fn scan(&self, pattern: &str) -> StoreResult<Vec<String>> {
    let mut conn = self.conn.clone();
    let mut cursor = 0u64;
    let mut found = Vec::new();
    loop {
      let (next_cursor, keys): (u64, Vec<String>) = redis::cmd("SCAN")
        .arg(cursor)
        .arg("MATCH")
        .arg(pattern)
        .arg("COUNT")
        .arg(100)
        .query_async(&mut conn)
        .await?;
      found.extend(keys);
      cursor = next_cursor;
      if cursor == 0 {
        break;
      }
    }
    Ok(found)
  }
}

#[async_trait]
impl KvStore for RedisKvStore {
  async fn get(&self, key: &str) -> StoreResult<Option<String>> {
    let mut conn = self.conn.clone();
    Ok(conn.get(self.full_key(key)).await?)
  }

  async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> StoreResult<()> {
    let mut conn = self.conn.clone();
    let key = self.full_key(key);
    match ttl {
      Some(ttl) => {
        let _: () = conn.set_ex(&key, value, ttl.as_secs().max(1)).await?;
      }
      None => {
        let _: () = conn.set(&key, value).await?;
      }
    }
    Ok(())
  }

  async fn incr(&self, key: &str) -> StoreResult<i64> {
    let mut conn = self.conn.clone();
    Ok(conn.incr(self.full_key(key), 1i64).await?)
  }

  async fn expire(&self, key: &str, ttl: Duration) -> StoreResult<()> {
    let mut conn = self.conn.clone();
    let _: bool = conn.expire(self.full_key(key), ttl.as_secs() as i64).await?;
    Ok(())
  }

  async fn ttl(&self, key: &str) -> StoreResult<Option<i64>> {
    let mut conn = self.conn.clone();
    // -2: missing key, -1: no expiry.
    let secs: i64 = conn.ttl(self.full_key(key)).await?;
    Ok((secs >= 0).then_some(secs))
  }

  async fn delete(&self, keys: &[String]) -> StoreResult<()> {
    if keys.is_empty() {
      return Ok(());
    }
    let mut conn = self.conn.clone();
    let full: Vec<String> = keys.iter().map(|k| self.full_key(k)).collect();
    let _: i64 = conn.del(full).await?;
    Ok(())
  }

  async fn keys_with_prefix(&self, prefix: &str) -> StoreResult<Vec<String>> {
    let pattern = format!("{}*", self.full_key(prefix));
    let keys = self.scan(&pattern).await?;
    Ok(keys.iter().map(|k| self.strip(k).to_string()).collect())
  }

  async fn flush(&self) -> StoreResult<()> {
    let keys = self.scan(&format!("{}:*", self.key_prefix)).await?;
    debug!(count = keys.len(), "Flushing namespaced Redis keys.");
    if keys.is_empty() {
      return Ok(());
    }
    let mut conn = self.conn.clone();
    let _: i64 = conn.del(keys).await?;
    Ok(())
  }
}
