// core/src/dispatch/mod.rs

//! Fire-and-forget side effects: cache invalidation, product update
//! broadcasts and admin chat notifications run on a worker task fed by a
//! bounded queue. Queueing never blocks and never fails the caller.

pub mod broadcast;
pub mod notifier;

pub use broadcast::{ProductUpdate, ProductUpdateHub, ProductUpdateKind};
pub use notifier::{format_order_message, LogNotifier, Notifier, NotifyError, TelegramNotifier};

use crate::cache::ResponseCache;
use crate::models::Order;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, warn};

#[derive(Debug)]
pub enum SideEffect {
  InvalidateCache { keys: Vec<String> },
  Broadcast(ProductUpdate),
  NotifyNewOrder(Box<Order>),
}

impl SideEffect {
  fn label(&self) -> &'static str {
    match self {
      SideEffect::InvalidateCache { .. } => "invalidate_cache",
      SideEffect::Broadcast(_) => "broadcast",
      SideEffect::NotifyNewOrder(_) => "notify_new_order",
    }
  }
}

/// Producer half. Cheap to clone.
#[derive(Clone)]
pub struct Dispatcher {
  tx: mpsc::Sender<SideEffect>,
}

impl Dispatcher {
  /// Starts the worker on the current tokio runtime.
  pub fn spawn(
    capacity: usize,
    cache: ResponseCache,
    hub: ProductUpdateHub,
    notifier: Arc<dyn Notifier>,
  ) -> (Self, JoinHandle<()>) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    let worker = DispatchWorker {
      rx,
      cache,
      hub,
      notifier,
    };
    let handle = tokio::spawn(worker.run());
    (Self { tx }, handle)
  }

  /// A dispatcher whose effects go straight into the returned receiver.
  pub fn detached(capacity: usize) -> (Self, mpsc::Receiver<SideEffect>) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (Self { tx }, rx)
  }

  pub fn submit(&self, effect: SideEffect) {
    let label = effect.label();
    match self.tx.try_send(effect) {
      Ok(()) => debug!(effect = label, "Side effect queued."),
      Err(mpsc::error::TrySendError::Full(_)) => {
        warn!(effect = label, "Side effect queue full, dropping.")
      }
      Err(mpsc::error::TrySendError::Closed(_)) => {
        error!(effect = label, "Side effect worker gone, dropping.")
      }
    }
  }

  pub fn invalidate(&self, keys: Vec<String>) {
    if !keys.is_empty() {
      self.submit(SideEffect::InvalidateCache { keys });
    }
  }

  pub fn notify(&self, update: ProductUpdate) {
    self.submit(SideEffect::Broadcast(update));
  }

  pub fn notify_new_order(&self, order: Order) {
    self.submit(SideEffect::NotifyNewOrder(Box::new(order)));
  }
}

struct DispatchWorker {
  rx: mpsc::Receiver<SideEffect>,
  cache: ResponseCache,
  hub: ProductUpdateHub,
  notifier: Arc<dyn Notifier>,
}

impl DispatchWorker {
  async fn run(mut self) {
    info!("Dispatch worker started.");
    while let Some(effect) = self.rx.recv().await {
      self.handle(effect).await;
    }
    info!("Dispatch queue closed, worker exiting.");
  }

  #[instrument(name = "DispatchWorker::handle", skip_all, fields(effect = effect.label()))]
  async fn handle(&self, effect: SideEffect) {
    match effect {
      SideEffect::InvalidateCache { keys } => self.cache.invalidate_many(&keys).await,
      SideEffect::Broadcast(update) => self.hub.publish(&update).await,
      SideEffect::NotifyNewOrder(order) => {
        let text = format_order_message(&order);
        match self.notifier.send_message(&text).await {
          Ok(()) => info!(order_number = %order.order_number, "New order notification sent."),
          Err(e) => warn!(order_number = %order.order_number, error = %e, "New order notification failed."),
        }
      }
    }
  }
}
