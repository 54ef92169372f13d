// server/src/state.rs

use crate::config::AppConfig;
use std::sync::Arc;
use storefront_core::cache::ResponseCache;
use storefront_core::dispatch::Notifier;
use storefront_core::kv::KvStore;
use storefront_core::limits::{PurchaseLimiter, RateLimiter};
use storefront_core::stats::StatsSource;
use storefront_core::{
  Catalog, CatalogStore, CategoryStore, CheckoutFlow, Dispatcher, OrderStatusController, OrderStore, ProductUpdateHub,
  StockLedger, StockStore, Taxonomy,
};
use tokio::task::JoinHandle;

/// Subscribers that fall this far behind start losing updates.
const BROADCAST_CAPACITY: usize = 64;

#[derive(Clone)]
pub struct AppState {
  pub config: Arc<AppConfig>,
  pub orders: Arc<dyn OrderStore>,
  pub stats: Arc<dyn StatsSource>,
  pub ledger: StockLedger,
  pub status_controller: Arc<OrderStatusController>,
  pub checkout: Arc<CheckoutFlow>,
  pub catalog: Catalog,
  pub taxonomy: Taxonomy,
  pub cache: ResponseCache,
  pub hub: ProductUpdateHub,
  pub purchase_limiter: PurchaseLimiter,
  pub rate_limiter: RateLimiter,
  pub notifier: Arc<dyn Notifier>,
  pub dispatcher: Dispatcher,
}

impl AppState {
  /// Wires every service on top of one storage backend and one key-value
  /// store, and starts the side-effect worker.
  pub fn build<S>(
    config: Arc<AppConfig>,
    store: S,
    kv: Arc<dyn KvStore>,
    notifier: Arc<dyn Notifier>,
  ) -> (Self, JoinHandle<()>)
  where
    S: OrderStore + StockStore + CatalogStore + CategoryStore + StatsSource + Clone + 'static,
  {
    let cache = ResponseCache::new(kv.clone());
    let hub = ProductUpdateHub::new(kv.clone(), BROADCAST_CAPACITY);
    let (dispatcher, worker) =
      Dispatcher::spawn(config.dispatch_queue_capacity, cache.clone(), hub.clone(), notifier.clone());

    let orders: Arc<dyn OrderStore> = Arc::new(store.clone());
    let catalog_store: Arc<dyn CatalogStore> = Arc::new(store.clone());
    let ledger = StockLedger::new(Arc::new(store.clone()));

    let purchase_limiter = PurchaseLimiter::new(kv.clone(), config.purchase_limit_per_ip, config.purchase_timeout);
    let rate_limiter = RateLimiter::new(kv, config.rate_limit_requests, config.rate_limit_window);

    let status_controller = OrderStatusController::new(
      orders.clone(),
      ledger.clone(),
      catalog_store.clone(),
      dispatcher.clone(),
    );
    let checkout = CheckoutFlow::new(orders.clone(), purchase_limiter.clone(), dispatcher.clone());
    let catalog = Catalog::new(catalog_store, cache.clone(), dispatcher.clone());
    let taxonomy = Taxonomy::new(Arc::new(store.clone()), cache.clone());

    let state = Self {
      config,
      orders,
      stats: Arc::new(store),
      ledger,
      status_controller: Arc::new(status_controller),
      checkout: Arc::new(checkout),
      catalog,
      taxonomy,
      cache,
      hub,
      purchase_limiter,
      rate_limiter,
      notifier,
      dispatcher,
    };
    (state, worker)
  }
}
