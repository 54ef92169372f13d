// tests/checkout_tests.rs
mod common;

use common::*;
use serde_json::json;
use serial_test::serial;
use std::sync::Arc;
use std::time::Duration;
use storefront_core::dispatch::SideEffect;
use storefront_core::kv::MemoryKvStore;
use storefront_core::limits::PurchaseLimiter;
use storefront_core::models::OrderStatus;
use storefront_core::orders::{CheckoutRequest, OrderFilter, OrderStore};
use storefront_core::{CheckoutError, CheckoutFlow};
use uuid::Uuid;

fn checkout(shop: &Shop, limit: i64) -> (CheckoutFlow, PurchaseLimiter) {
  let limiter = PurchaseLimiter::new(Arc::new(MemoryKvStore::new()), limit, Duration::from_secs(30 * 60));
  let flow = CheckoutFlow::new(Arc::new(shop.store.clone()), limiter.clone(), shop.dispatcher.clone());
  (flow, limiter)
}

fn request(product_id: Uuid) -> CheckoutRequest {
  serde_json::from_value(json!({
    "fullName": "Ana Lima",
    "email": "ana@example.com",
    "phone": "+51 999 888 777",
    "province": "Lima",
    "address": "Av. Arequipa 123",
    "paymentProofUrl": "https://cdn.example.com/proof.jpg",
    "instagram": "@ana",
    "items": [
      { "id": product_id.to_string(), "name": "Classic Tee", "price": 25, "quantity": 2, "variant": { "size": "M" } }
    ],
    "subtotal": 50,
    "deliveryFee": 0,
    "total": 50
  }))
  .unwrap()
}

#[tokio::test]
#[serial]
async fn checkout_runs_named_steps() {
  let shop = Shop::new();
  let (flow, _) = checkout(&shop, 2);
  assert_eq!(
    flow.step_names(),
    vec![
      "check_purchase_limit",
      "validate_request",
      "create_order",
      "record_purchase",
      "notify_new_order"
    ]
  );
}

#[tokio::test]
#[serial]
async fn checkout_creates_a_pending_order_and_queues_a_notification() {
  setup_tracing();
  let mut shop = Shop::new();
  let tee = shop.add_product("Classic Tee", 25, &[("M", 10)], 0).await;
  let (flow, limiter) = checkout(&shop, 2);

  let order = flow.place_order(request(tee), "203.0.113.7").await.unwrap();

  assert_eq!(order.status, OrderStatus::Pending);
  assert!(order.order_number.starts_with("ORD-"));
  assert_eq!(order.customer_name, "Ana Lima");
  assert_eq!(order.shipping_address, "Av. Arequipa 123, Lima");
  assert_eq!(order.items.len(), 1);
  assert_eq!(order.items[0].size, "M");
  assert_eq!(order.items[0].quantity, 2);

  // Checkout never touches stock.
  assert_eq!(shop.stock_of(tee, "M").await, Some(10));

  let stored = shop.store.list_orders(&OrderFilter::default()).await.unwrap();
  assert_eq!(stored.len(), 1);

  let allowance = limiter.can_purchase("203.0.113.7").await;
  assert_eq!(allowance.current_purchases, 1);

  let effects = shop.drain_effects();
  assert_eq!(effects.len(), 1);
  match &effects[0] {
    SideEffect::NotifyNewOrder(queued) => assert_eq!(queued.id, order.id),
    other => panic!("expected order notification, got {:?}", other),
  }
}

#[tokio::test]
#[serial]
async fn checkout_enforces_the_purchase_limit_per_ip() {
  setup_tracing();
  let shop = Shop::new();
  let tee = shop.add_product("Classic Tee", 25, &[("M", 10)], 0).await;
  let (flow, _) = checkout(&shop, 2);

  flow.place_order(request(tee), "198.51.100.1").await.unwrap();
  flow.place_order(request(tee), "198.51.100.1").await.unwrap();

  let err = flow.place_order(request(tee), "198.51.100.1").await.unwrap_err();
  match err {
    CheckoutError::PurchaseLimitExceeded {
      message,
      timeout_remaining,
    } => {
      assert_eq!(
        message,
        "You have reached the maximum of 2 purchases. Please wait 30 minutes before placing another order."
      );
      assert!(timeout_remaining > 0 && timeout_remaining <= 1800);
    }
    other => panic!("expected PurchaseLimitExceeded, got {:?}", other),
  }

  // Another client is unaffected.
  assert!(flow.place_order(request(tee), "198.51.100.2").await.is_ok());

  let stored = shop.store.list_orders(&OrderFilter::default()).await.unwrap();
  assert_eq!(stored.len(), 3);
}

#[tokio::test]
#[serial]
async fn invalid_checkout_is_rejected_before_counting_a_purchase() {
  setup_tracing();
  let shop = Shop::new();
  let tee = shop.add_product("Classic Tee", 25, &[("M", 10)], 0).await;
  let (flow, limiter) = checkout(&shop, 2);

  let mut bad = request(tee);
  bad.address = "x".into();
  let err = flow.place_order(bad, "192.0.2.10").await.unwrap_err();

  assert!(matches!(err, CheckoutError::Validation(_)));
  assert_eq!(limiter.can_purchase("192.0.2.10").await.current_purchases, 0);
  assert!(shop.store.list_orders(&OrderFilter::default()).await.unwrap().is_empty());
}

#[tokio::test]
#[serial]
async fn limited_client_is_refused_before_validation() {
  setup_tracing();
  let shop = Shop::new();
  let tee = shop.add_product("Classic Tee", 25, &[("M", 10)], 0).await;
  let (flow, limiter) = checkout(&shop, 1);

  flow.place_order(request(tee), "192.0.2.20").await.unwrap();

  let mut bad = request(tee);
  bad.address = "x".into();
  let err = flow.place_order(bad, "192.0.2.20").await.unwrap_err();

  assert!(matches!(err, CheckoutError::PurchaseLimitExceeded { .. }), "got {:?}", err);
  assert_eq!(limiter.can_purchase("192.0.2.20").await.current_purchases, 1);
  assert_eq!(shop.store.list_orders(&OrderFilter::default()).await.unwrap().len(), 1);
}
