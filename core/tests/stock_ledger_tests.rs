// tests/stock_ledger_tests.rs
mod common;

use common::*;
use serial_test::serial;
use storefront_core::StockStore;
use uuid::Uuid;

#[tokio::test]
#[serial]
async fn reduce_applies_every_line_in_one_transaction() {
  setup_tracing();
  let shop = Shop::new();
  let tee = shop.add_product("Classic Tee", 25, &[("M", 10), ("L", 4)], 0).await;

  let outcome = shop.ledger.reduce_stock(&[line(tee, "M", 3), line(tee, "L", 4)]).await;

  assert!(outcome.success, "unexpected errors: {:?}", outcome.errors);
  assert!(outcome.errors.is_empty());
  assert_eq!(shop.stock_of(tee, "M").await, Some(7));
  assert_eq!(shop.stock_of(tee, "L").await, Some(0));
}

#[tokio::test]
#[serial]
async fn reduce_is_all_or_nothing_and_reports_every_short_line() {
  setup_tracing();
  let shop = Shop::new();
  let tee = shop.add_product("Classic Tee", 25, &[("S", 1), ("M", 10)], 0).await;
  let cap = shop.add_product("Logo Cap", 15, &[("One Size", 0)], 0).await;

  let outcome = shop
    .ledger
    .reduce_stock(&[line(tee, "M", 2), line(tee, "S", 5), line(cap, "One Size", 1)])
    .await;

  assert!(!outcome.success);
  assert_eq!(
    outcome.errors,
    vec![
      "Insufficient stock for Classic Tee (S). Available: 1, Requested: 5".to_string(),
      "Insufficient stock for Logo Cap (One Size). Available: 0, Requested: 1".to_string(),
    ]
  );
  // The good line was rolled back with the rest.
  assert_eq!(shop.stock_of(tee, "M").await, Some(10));
  assert_eq!(shop.stock_of(tee, "S").await, Some(1));
}

#[tokio::test]
#[serial]
async fn reduce_reports_missing_size_and_leaves_stock_alone() {
  setup_tracing();
  let shop = Shop::new();
  let tee = shop.add_product("Classic Tee", 25, &[("M", 10)], 0).await;

  let outcome = shop.ledger.reduce_stock(&[line(tee, "M", 1), line(tee, "XXL", 1)]).await;

  assert!(!outcome.success);
  assert_eq!(outcome.errors, vec![format!("Product size XXL not found for product {}", tee)]);
  assert_eq!(shop.stock_of(tee, "M").await, Some(10));
}

#[tokio::test]
#[serial]
async fn reduce_rejects_empty_and_non_positive_lines() {
  setup_tracing();
  let shop = Shop::new();
  let tee = shop.add_product("Classic Tee", 25, &[("M", 10)], 0).await;

  let empty = shop.ledger.reduce_stock(&[]).await;
  assert!(!empty.success);
  assert_eq!(empty.errors, vec!["No items provided".to_string()]);

  let zero = shop.ledger.reduce_stock(&[line(tee, "M", 0)]).await;
  assert!(!zero.success);
  assert_eq!(zero.errors, vec![format!("Invalid quantity 0 for product {} (M)", tee)]);
  assert_eq!(shop.stock_of(tee, "M").await, Some(10));
}

#[tokio::test]
#[serial]
async fn restore_adds_back_without_an_upper_bound() {
  setup_tracing();
  let shop = Shop::new();
  let tee = shop.add_product("Classic Tee", 25, &[("M", 2)], 0).await;

  let lines = [line(tee, "M", 5)];
  assert!(shop.ledger.restore_stock(&lines).await.success);
  assert_eq!(shop.stock_of(tee, "M").await, Some(7));

  // Restoring twice counts twice.
  assert!(shop.ledger.restore_stock(&lines).await.success);
  assert_eq!(shop.stock_of(tee, "M").await, Some(12));
}

#[tokio::test]
#[serial]
async fn restore_fails_atomically_when_a_size_is_gone() {
  setup_tracing();
  let shop = Shop::new();
  let tee = shop.add_product("Classic Tee", 25, &[("M", 2), ("L", 2)], 0).await;
  assert!(shop.store.remove_size(tee, "L").await);

  let outcome = shop.ledger.restore_stock(&[line(tee, "M", 1), line(tee, "L", 1)]).await;

  assert!(!outcome.success);
  assert_eq!(outcome.errors, vec![format!("Product size L not found for product {}", tee)]);
  assert_eq!(shop.stock_of(tee, "M").await, Some(2));
}

#[tokio::test]
#[serial]
async fn availability_check_reports_without_writing() {
  setup_tracing();
  let shop = Shop::new();
  let tee = shop.add_product("Classic Tee", 25, &[("M", 3)], 0).await;
  let unknown = Uuid::new_v4();

  let ok = shop.ledger.check_availability(&[line(tee, "M", 3)]).await;
  assert!(ok.available);
  assert!(ok.errors.is_empty());

  let short = shop
    .ledger
    .check_availability(&[line(tee, "M", 4), line(unknown, "M", 1)])
    .await;
  assert!(!short.available);
  assert_eq!(
    short.errors,
    vec![
      "Insufficient stock for Classic Tee (M). Available: 3, Requested: 4".to_string(),
      format!("Product size M not found for product {}", unknown),
    ]
  );
  assert_eq!(shop.stock_of(tee, "M").await, Some(3));
}

#[tokio::test]
#[serial]
async fn reserved_units_are_not_available() {
  setup_tracing();
  let shop = Shop::new();
  let tee = shop.add_product_with_reserved("Classic Tee", 25, &[("M", 5, 2)], 0).await;

  let dry_run = shop.ledger.check_availability(&[line(tee, "M", 4)]).await;
  assert!(!dry_run.available);

  let outcome = shop.ledger.reduce_stock(&[line(tee, "M", 4)]).await;
  assert!(!outcome.success);
  assert_eq!(
    outcome.errors,
    vec!["Insufficient stock for Classic Tee (M). Available: 3, Requested: 4".to_string()]
  );
  assert_eq!(shop.stock_of(tee, "M").await, Some(5));

  // Reducing within the unreserved units only touches `stock`.
  assert!(shop.ledger.reduce_stock(&[line(tee, "M", 3)]).await.success);
  assert_eq!(shop.stock_of(tee, "M").await, Some(2));
  let entry = shop.store.find_entry(tee, "M").await.unwrap().unwrap();
  assert_eq!(entry.reserved_stock, 2);
  assert_eq!(entry.available(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[serial]
async fn concurrent_reductions_never_oversell() {
  setup_tracing();
  let shop = Shop::new();
  let hoodie = shop.add_product("Oversized Hoodie", 60, &[("M", 5)], 0).await;

  let mut handles = Vec::new();
  for _ in 0..12 {
    let ledger = shop.ledger.clone();
    handles.push(tokio::spawn(async move { ledger.reduce_stock(&[line(hoodie, "M", 1)]).await }));
  }

  let mut succeeded = 0;
  for handle in handles {
    if handle.await.unwrap().success {
      succeeded += 1;
    }
  }

  assert_eq!(succeeded, 5);
  assert_eq!(shop.stock_of(hoodie, "M").await, Some(0));
}
