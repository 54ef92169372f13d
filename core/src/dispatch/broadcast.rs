// core/src/dispatch/broadcast.rs

use crate::kv::KvStore;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{debug, warn};

pub const LAST_UPDATE_KEY: &str = "last_product_update";
pub const LAST_UPDATE_TTL: Duration = Duration::from_secs(60 * 60);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductUpdateKind {
  ProductCreated,
  ProductUpdated,
  ProductDeleted,
  StockUpdated,
}

/// Event pushed to storefront clients. `slug` names the affected product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductUpdate {
  #[serde(rename = "type")]
  pub kind: ProductUpdateKind,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub slug: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub name: Option<String>,
  pub timestamp: DateTime<Utc>,
}

impl ProductUpdate {
  pub fn new(kind: ProductUpdateKind, slug: impl Into<String>, name: Option<String>) -> Self {
    Self {
      kind,
      slug: Some(slug.into()),
      name,
      timestamp: Utc::now(),
    }
  }
}

/// Formats one `text/event-stream` frame.
pub fn sse_frame(json: &str) -> String {
  format!("data: {}\n\n", json)
}

pub fn connection_message() -> String {
  json!({ "type": "connection", "message": "Connected to product updates" }).to_string()
}

/// Fan-out of product updates to every connected SSE client, plus the last
/// update kept in the key-value store for late joiners.
#[derive(Clone)]
pub struct ProductUpdateHub {
  tx: broadcast::Sender<String>,
  kv: Arc<dyn KvStore>,
}

impl ProductUpdateHub {
  pub fn new(kv: Arc<dyn KvStore>, capacity: usize) -> Self {
    let (tx, _) = broadcast::channel(capacity.max(1));
    Self { tx, kv }
  }

  pub fn subscribe(&self) -> broadcast::Receiver<String> {
    self.tx.subscribe()
  }

  pub fn subscriber_count(&self) -> usize {
    self.tx.receiver_count()
  }

  pub async fn publish(&self, update: &ProductUpdate) {
    let payload = match serde_json::to_string(update) {
      Ok(p) => p,
      Err(e) => {
        warn!(error = %e, "Could not encode product update.");
        return;
      }
    };
    // Err here only means nobody is listening right now.
    let delivered = self.tx.send(payload.clone()).unwrap_or(0);
    debug!(delivered, kind = ?update.kind, "Product update broadcast.");

    if let Err(e) = self.kv.set(LAST_UPDATE_KEY, &payload, Some(LAST_UPDATE_TTL)).await {
      warn!(error = %e, "Could not store last product update.");
    }
  }

  pub async fn last_update(&self) -> Option<String> {
    match self.kv.get(LAST_UPDATE_KEY).await {
      Ok(v) => v,
      Err(e) => {
        warn!(error = %e, "Could not read last product update.");
        None
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::kv::MemoryKvStore;

  #[tokio::test]
  async fn publish_reaches_subscribers_and_is_remembered() {
    let hub = ProductUpdateHub::new(Arc::new(MemoryKvStore::new()), 16);
    let mut rx = hub.subscribe();

    let update = ProductUpdate::new(ProductUpdateKind::ProductUpdated, "tee", Some("Tee".into()));
    hub.publish(&update).await;

    let received = rx.recv().await.unwrap();
    let decoded: ProductUpdate = serde_json::from_str(&received).unwrap();
    assert_eq!(decoded, update);
    assert!(received.contains("\"type\":\"product_updated\""));
    assert_eq!(hub.last_update().await, Some(received));
  }

  #[test]
  fn frames_are_data_lines() {
    assert_eq!(sse_frame("{}"), "data: {}\n\n");
    assert!(connection_message().contains("Connected to product updates"));
  }
}
