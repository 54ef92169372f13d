// tests/order_status_tests.rs
mod common;

use async_trait::async_trait;
use common::*;
use serial_test::serial;
use std::sync::Arc;
use tokio::sync::Barrier;
use storefront_core::cache::{product_key, PRODUCTS_KEY};
use storefront_core::dispatch::{ProductUpdateKind, SideEffect};
use storefront_core::models::{NewOrder, Order, OrderStatus};
use storefront_core::orders::{OrderFilter, OrderStore};
use storefront_core::store::MemoryStore;
use storefront_core::{OrderStatusController, StatusChangeError, StoreError, StoreResult};
use uuid::Uuid;

fn controller(shop: &Shop) -> OrderStatusController {
  OrderStatusController::new(
    Arc::new(shop.store.clone()),
    shop.ledger.clone(),
    Arc::new(shop.store.clone()),
    shop.dispatcher.clone(),
  )
}

async fn status_of(shop: &Shop, order: &Order) -> OrderStatus {
  shop.store.find_order(order.id).await.unwrap().unwrap().status
}

#[tokio::test]
#[serial]
async fn controller_runs_named_steps() {
  let shop = Shop::new();
  assert_eq!(
    controller(&shop).step_names(),
    vec!["load_order", "apply_stock_transition", "persist_status", "dispatch_side_effects"]
  );
}

#[tokio::test]
#[serial]
async fn approving_a_pending_order_reduces_stock() {
  setup_tracing();
  let mut shop = Shop::new();
  let tee = shop.add_product("Classic Tee", 25, &[("M", 10), ("L", 3)], 0).await;
  let order = shop.place_order(&[(tee, "M", 2), (tee, "L", 3)]).await;

  let updated = controller(&shop)
    .change_status(order.id, OrderStatus::Approved)
    .await
    .unwrap();

  assert_eq!(updated.status, OrderStatus::Approved);
  assert_eq!(updated.items.len(), 2);
  assert_eq!(shop.stock_of(tee, "M").await, Some(8));
  assert_eq!(shop.stock_of(tee, "L").await, Some(0));

  let effects = shop.drain_effects();
  assert_eq!(effects.len(), 2);
  match &effects[0] {
    SideEffect::InvalidateCache { keys } => {
      assert_eq!(keys, &vec![PRODUCTS_KEY.to_string(), product_key("classic-tee")]);
    }
    other => panic!("expected cache invalidation, got {:?}", other),
  }
  match &effects[1] {
    SideEffect::Broadcast(update) => {
      assert_eq!(update.kind, ProductUpdateKind::StockUpdated);
      assert_eq!(update.slug.as_deref(), Some("classic-tee"));
    }
    other => panic!("expected broadcast, got {:?}", other),
  }
}

#[tokio::test]
#[serial]
async fn approval_with_short_stock_is_rejected_and_changes_nothing() {
  setup_tracing();
  let mut shop = Shop::new();
  let tee = shop.add_product("Classic Tee", 25, &[("M", 10), ("S", 1)], 0).await;
  let order = shop.place_order(&[(tee, "M", 2), (tee, "S", 2)]).await;

  let err = controller(&shop)
    .change_status(order.id, OrderStatus::Approved)
    .await
    .unwrap_err();

  match err {
    StatusChangeError::InsufficientStock { details } => {
      assert_eq!(
        details,
        vec!["Insufficient stock for Classic Tee (S). Available: 1, Requested: 2".to_string()]
      );
    }
    other => panic!("expected InsufficientStock, got {:?}", other),
  }
  assert_eq!(status_of(&shop, &order).await, OrderStatus::Pending);
  assert_eq!(shop.stock_of(tee, "M").await, Some(10));
  assert_eq!(shop.stock_of(tee, "S").await, Some(1));
  assert!(shop.drain_effects().is_empty());
}

#[tokio::test]
#[serial]
async fn reverting_an_approved_order_restores_stock() {
  setup_tracing();
  let shop = Shop::new();
  let tee = shop.add_product("Classic Tee", 25, &[("M", 10)], 0).await;
  let order = shop.place_order(&[(tee, "M", 4)]).await;
  let controller = controller(&shop);

  controller.change_status(order.id, OrderStatus::Approved).await.unwrap();
  assert_eq!(shop.stock_of(tee, "M").await, Some(6));

  let reverted = controller.change_status(order.id, OrderStatus::Pending).await.unwrap();
  assert_eq!(reverted.status, OrderStatus::Pending);
  assert_eq!(shop.stock_of(tee, "M").await, Some(10));
}

#[tokio::test]
#[serial]
async fn revert_proceeds_even_when_restore_fails() {
  setup_tracing();
  let shop = Shop::new();
  let tee = shop.add_product("Classic Tee", 25, &[("M", 10), ("L", 5)], 0).await;
  let order = shop.place_order(&[(tee, "M", 1), (tee, "L", 1)]).await;
  let controller = controller(&shop);

  controller.change_status(order.id, OrderStatus::Approved).await.unwrap();
  assert!(shop.store.remove_size(tee, "L").await);

  let reverted = controller.change_status(order.id, OrderStatus::Pending).await.unwrap();

  assert_eq!(reverted.status, OrderStatus::Pending);
  // The restore was rolled back as a whole, M included.
  assert_eq!(shop.stock_of(tee, "M").await, Some(9));
}

#[tokio::test]
#[serial]
async fn other_transitions_leave_stock_untouched() {
  setup_tracing();
  let shop = Shop::new();
  let tee = shop.add_product("Classic Tee", 25, &[("M", 10)], 0).await;
  let controller = controller(&shop);

  let pending = shop.place_order(&[(tee, "M", 2)]).await;
  let cancelled = controller.change_status(pending.id, OrderStatus::Cancelled).await.unwrap();
  assert_eq!(cancelled.status, OrderStatus::Cancelled);
  assert_eq!(shop.stock_of(tee, "M").await, Some(10));

  let approved = shop.place_order(&[(tee, "M", 3)]).await;
  controller.change_status(approved.id, OrderStatus::Approved).await.unwrap();
  controller.change_status(approved.id, OrderStatus::Cancelled).await.unwrap();
  assert_eq!(shop.stock_of(tee, "M").await, Some(7));

  // Approving twice does not reduce twice.
  let again = shop.place_order(&[(tee, "M", 1)]).await;
  controller.change_status(again.id, OrderStatus::Approved).await.unwrap();
  controller.change_status(again.id, OrderStatus::Approved).await.unwrap();
  assert_eq!(shop.stock_of(tee, "M").await, Some(6));
}

#[tokio::test]
#[serial]
async fn unknown_order_is_not_found() {
  setup_tracing();
  let shop = Shop::new();

  let err = controller(&shop)
    .change_status(Uuid::new_v4(), OrderStatus::Approved)
    .await
    .unwrap_err();

  assert!(matches!(err, StatusChangeError::OrderNotFound));
  assert_eq!(err.to_string(), "Order not found");
}

#[tokio::test]
#[serial]
async fn display_only_statuses_cannot_be_requested() {
  setup_tracing();
  let shop = Shop::new();
  let tee = shop.add_product("Classic Tee", 25, &[("M", 10)], 0).await;
  let order = shop.place_order(&[(tee, "M", 1)]).await;

  let err = controller(&shop)
    .change_status(order.id, OrderStatus::Shipped)
    .await
    .unwrap_err();

  assert!(matches!(err, StatusChangeError::Validation(_)));
  assert_eq!(status_of(&shop, &order).await, OrderStatus::Pending);
}

/// Reads from the memory store but refuses every status write.
struct ReadOnlyOrders(MemoryStore);

#[async_trait]
impl OrderStore for ReadOnlyOrders {
  async fn find_order(&self, id: Uuid) -> StoreResult<Option<Order>> {
    self.0.find_order(id).await
  }

  async fn list_orders(&self, filter: &OrderFilter) -> StoreResult<Vec<Order>> {
    self.0.list_orders(filter).await
  }

  async fn create_order(&self, order: NewOrder) -> StoreResult<Order> {
    self.0.create_order(order).await
  }

  async fn update_status(&self, _id: Uuid, _from: OrderStatus, _to: OrderStatus) -> StoreResult<Order> {
    Err(StoreError::Internal("status writes disabled".into()))
  }
}

#[tokio::test]
#[serial]
async fn failed_status_write_hands_reduced_stock_back() {
  setup_tracing();
  let shop = Shop::new();
  let tee = shop.add_product("Classic Tee", 25, &[("M", 10)], 0).await;
  let order = shop.place_order(&[(tee, "M", 4)]).await;

  let controller = OrderStatusController::new(
    Arc::new(ReadOnlyOrders(shop.store.clone())),
    shop.ledger.clone(),
    Arc::new(shop.store.clone()),
    shop.dispatcher.clone(),
  );

  let err = controller
    .change_status(order.id, OrderStatus::Approved)
    .await
    .unwrap_err();

  assert!(matches!(err, StatusChangeError::Store(StoreError::Internal(_))));
  assert_eq!(shop.stock_of(tee, "M").await, Some(10));
  assert_eq!(status_of(&shop, &order).await, OrderStatus::Pending);
}

#[tokio::test]
#[serial]
async fn approve_reject_then_revert_walkthrough() {
  setup_tracing();
  let shop = Shop::new();
  let tee = shop.add_product("Classic Tee", 25, &[("M", 5)], 0).await;
  let controller = controller(&shop);

  let first = shop.place_order(&[(tee, "M", 3)]).await;
  let approved = controller.change_status(first.id, OrderStatus::Approved).await.unwrap();
  assert_eq!(approved.status, OrderStatus::Approved);
  assert_eq!(shop.stock_of(tee, "M").await, Some(2));

  let second = shop.place_order(&[(tee, "M", 5)]).await;
  match controller.change_status(second.id, OrderStatus::Approved).await {
    Err(StatusChangeError::InsufficientStock { details }) => assert_eq!(
      details,
      vec!["Insufficient stock for Classic Tee (M). Available: 2, Requested: 5".to_string()]
    ),
    other => panic!("expected InsufficientStock, got {:?}", other),
  }
  assert_eq!(status_of(&shop, &second).await, OrderStatus::Pending);

  controller.change_status(first.id, OrderStatus::Pending).await.unwrap();
  assert_eq!(shop.stock_of(tee, "M").await, Some(5));
}

/// Holds every `find_order` caller until `barrier` releases them together, so
/// two status changes load the same order state.
struct LockstepOrders {
  inner: MemoryStore,
  barrier: Arc<Barrier>,
}

#[async_trait]
impl OrderStore for LockstepOrders {
  async fn find_order(&self, id: Uuid) -> StoreResult<Option<Order>> {
    let order = self.inner.find_order(id).await;
    self.barrier.wait().await;
    order
  }

  async fn list_orders(&self, filter: &OrderFilter) -> StoreResult<Vec<Order>> {
    self.inner.list_orders(filter).await
  }

  async fn create_order(&self, order: NewOrder) -> StoreResult<Order> {
    self.inner.create_order(order).await
  }

  async fn update_status(&self, id: Uuid, from: OrderStatus, to: OrderStatus) -> StoreResult<Order> {
    self.inner.update_status(id, from, to).await
  }
}

fn lockstep_controller(shop: &Shop) -> OrderStatusController {
  OrderStatusController::new(
    Arc::new(LockstepOrders {
      inner: shop.store.clone(),
      barrier: Arc::new(Barrier::new(2)),
    }),
    shop.ledger.clone(),
    Arc::new(shop.store.clone()),
    shop.dispatcher.clone(),
  )
}

fn split_results(results: [Result<Order, StatusChangeError>; 2]) -> (usize, usize) {
  let mut stored = 0;
  let mut conflicts = 0;
  for result in results {
    match result {
      Ok(_) => stored += 1,
      Err(StatusChangeError::Conflict(_)) => conflicts += 1,
      Err(other) => panic!("unexpected error: {:?}", other),
    }
  }
  (stored, conflicts)
}

#[tokio::test]
#[serial]
async fn overlapping_approvals_reduce_stock_once() {
  setup_tracing();
  let shop = Shop::new();
  let tee = shop.add_product("Classic Tee", 25, &[("M", 10)], 0).await;
  let order = shop.place_order(&[(tee, "M", 3)]).await;
  let controller = lockstep_controller(&shop);

  let (a, b) = tokio::join!(
    controller.change_status(order.id, OrderStatus::Approved),
    controller.change_status(order.id, OrderStatus::Approved),
  );

  assert_eq!(split_results([a, b]), (1, 1));
  assert_eq!(shop.stock_of(tee, "M").await, Some(7));
  assert_eq!(status_of(&shop, &order).await, OrderStatus::Approved);
}

#[tokio::test]
#[serial]
async fn overlapping_reverts_restore_stock_once() {
  setup_tracing();
  let shop = Shop::new();
  let tee = shop.add_product("Classic Tee", 25, &[("M", 10)], 0).await;
  let order = shop.place_order(&[(tee, "M", 3)]).await;
  controller(&shop).change_status(order.id, OrderStatus::Approved).await.unwrap();
  assert_eq!(shop.stock_of(tee, "M").await, Some(7));
  let controller = lockstep_controller(&shop);

  let (a, b) = tokio::join!(
    controller.change_status(order.id, OrderStatus::Pending),
    controller.change_status(order.id, OrderStatus::Pending),
  );

  assert_eq!(split_results([a, b]), (1, 1));
  assert_eq!(shop.stock_of(tee, "M").await, Some(10));
  assert_eq!(status_of(&shop, &order).await, OrderStatus::Pending);
}
