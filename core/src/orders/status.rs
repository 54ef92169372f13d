// core/src/orders/status.rs

//! Order status transitions and the stock movements they imply.

use super::OrderStore;
use crate::cache::{product_key, PRODUCTS_KEY};
use crate::catalog::CatalogStore;
use crate::dispatch::{Dispatcher, ProductUpdate, ProductUpdateKind};
use crate::error::{FlowError, StoreError};
use crate::flow::{ContextData, Pipeline, PipelineControl, PipelineResult, SkipCondition};
use crate::models::{Order, OrderStatus, StockLine};
use crate::stock::{StockLedger, StockOutcome};
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum StatusChangeError {
  #[error("Order not found")]
  OrderNotFound,

  #[error("Cannot approve order: Insufficient stock")]
  InsufficientStock { details: Vec<String> },

  #[error("Invalid status change: {0}")]
  Validation(String),

  /// Another change to the same order was stored first.
  #[error("Order status changed concurrently: {0}")]
  Conflict(String),

  #[error("Store error: {0}")]
  Store(#[from] StoreError),

  #[error("Flow error: {0}")]
  Flow(#[from] FlowError),
}

/// Stock movement implied by a status change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StockTransition {
  /// `PENDING -> APPROVED`: take the order's lines out of stock.
  Reduce,
  /// `APPROVED -> PENDING`: put them back.
  Restore,
  None,
}

impl StockTransition {
  pub fn between(from: OrderStatus, to: OrderStatus) -> Self {
    match (from, to) {
      (OrderStatus::Pending, OrderStatus::Approved) => StockTransition::Reduce,
      (OrderStatus::Approved, OrderStatus::Pending) => StockTransition::Restore,
      _ => StockTransition::None,
    }
  }
}

/// Context threaded through the status change pipeline.
#[derive(Debug, Clone)]
pub struct StatusChangeCtx {
  pub order_id: Uuid,
  pub requested: OrderStatus,
  pub previous: Option<OrderStatus>,
  pub lines: Vec<StockLine>,
  pub transition: StockTransition,
  /// Set once the stock movement has been committed, so a failed status
  /// write can undo it.
  pub stock_moved: bool,
  pub updated: Option<Order>,
}

impl StatusChangeCtx {
  pub fn new(order_id: Uuid, requested: OrderStatus) -> Self {
    Self {
      order_id,
      requested,
      previous: None,
      lines: Vec::new(),
      transition: StockTransition::None,
      stock_moved: false,
      updated: None,
    }
  }
}

/// Applies admin status changes: `load_order -> apply_stock_transition ->
/// persist_status -> dispatch_side_effects`.
///
/// Approval reduces stock and is rejected when any line is short. Reverting an
/// approved order to pending restores stock; a failed restore is logged and the
/// status change still goes through. The status write only lands if the order
/// still has the status it was loaded with; a change that loses that race
/// undoes its stock movement and fails with `Conflict`. Side effects are queued
/// after the status is stored and never affect the result.
pub struct OrderStatusController {
  pipeline: Pipeline<StatusChangeCtx, StatusChangeError>,
}

impl OrderStatusController {
  pub fn new(
    orders: Arc<dyn OrderStore>,
    ledger: StockLedger,
    catalog: Arc<dyn CatalogStore>,
    dispatcher: Dispatcher,
  ) -> Self {
    let no_stock_movement: SkipCondition<StatusChangeCtx> =
      Arc::new(|ctx: ContextData<StatusChangeCtx>| ctx.read().transition == StockTransition::None);

    let mut pipeline = Pipeline::new(&[
      ("load_order", false, None),
      ("apply_stock_transition", false, Some(no_stock_movement)),
      ("persist_status", false, None),
      ("dispatch_side_effects", true, None),
    ]);

    let store = orders.clone();
    pipeline.on_root("load_order", move |ctx: ContextData<StatusChangeCtx>| {
      let store = store.clone();
      async move {
        let order_id = ctx.read().order_id;
        let order = store
          .find_order(order_id)
          .await?
          .ok_or(StatusChangeError::OrderNotFound)?;

        let mut guard = ctx.write();
        guard.transition = StockTransition::between(order.status, guard.requested);
        guard.previous = Some(order.status);
        guard.lines = order.stock_lines();
        info!(
          order_number = %order.order_number,
          from = %order.status,
          to = %guard.requested,
          transition = ?guard.transition,
          "Loaded order for status change."
        );
        Ok::<_, StatusChangeError>(PipelineControl::Continue)
      }
    });

    let stock = ledger.clone();
    pipeline.on_root("apply_stock_transition", move |ctx: ContextData<StatusChangeCtx>| {
      let stock = stock.clone();
      async move {
        let (transition, lines) = {
          let guard = ctx.read();
          (guard.transition, guard.lines.clone())
        };
        match transition {
          StockTransition::Reduce => {
            let outcome = stock.reduce_stock(&lines).await;
            if !outcome.success {
              warn!(errors = ?outcome.errors, "Approval rejected, stock not reduced.");
              return Err(StatusChangeError::InsufficientStock {
                details: outcome.errors,
              });
            }
            ctx.write().stock_moved = true;
          }
          StockTransition::Restore => {
            let outcome = stock.restore_stock(&lines).await;
            if outcome.success {
              ctx.write().stock_moved = true;
            } else {
              error!(errors = ?outcome.errors, "Stock restore failed; status change proceeds.");
            }
          }
          StockTransition::None => {}
        }
        Ok(PipelineControl::Continue)
      }
    });

    let store = orders;
    let compensate = ledger;
    pipeline.on_root("persist_status", move |ctx: ContextData<StatusChangeCtx>| {
      let store = store.clone();
      let compensate = compensate.clone();
      async move {
        let (order_id, previous, requested) = {
          let guard = ctx.read();
          (guard.order_id, guard.previous, guard.requested)
        };
        let Some(previous) = previous else {
          return Err(StatusChangeError::Flow(FlowError::Internal("order status not loaded".into())));
        };

        // Conditional on `previous`: of two overlapping changes only one is stored.
        match store.update_status(order_id, previous, requested).await {
          Ok(order) => {
            ctx.write().updated = Some(order);
            Ok(PipelineControl::Continue)
          }
          Err(e) => {
            let (moved, transition, lines) = {
              let guard = ctx.read();
              (guard.stock_moved, guard.transition, guard.lines.clone())
            };
            if moved {
              let undone = match transition {
                StockTransition::Reduce => compensate.restore_stock(&lines).await,
                StockTransition::Restore => compensate.reduce_stock(&lines).await,
                StockTransition::None => StockOutcome::ok(),
              };
              if undone.success {
                warn!(error = %e, transition = ?transition, "Status write failed; stock movement undone.");
              } else {
                error!(
                  error = %e,
                  transition = ?transition,
                  errors = ?undone.errors,
                  "Status write failed and the stock movement could not be undone."
                );
              }
            }
            Err(match e {
              StoreError::NotFound(_) => StatusChangeError::OrderNotFound,
              StoreError::Conflict(m) => StatusChangeError::Conflict(m),
              other => StatusChangeError::Store(other),
            })
          }
        }
      }
    });

    pipeline.on_root("dispatch_side_effects", move |ctx: ContextData<StatusChangeCtx>| {
      let catalog = catalog.clone();
      let dispatcher = dispatcher.clone();
      async move {
        let product_ids: Vec<Uuid> = {
          let guard = ctx.read();
          let mut ids: Vec<Uuid> = guard.lines.iter().map(|l| l.product_id).collect();
          ids.sort();
          ids.dedup();
          ids
        };

        let slugs = match catalog.slugs_for(&product_ids).await {
          Ok(slugs) => slugs,
          Err(e) => {
            warn!(error = %e, "Could not resolve product slugs for cache invalidation.");
            Vec::new()
          }
        };

        let mut keys = vec![PRODUCTS_KEY.to_string()];
        keys.extend(slugs.iter().map(|s| product_key(s)));
        dispatcher.invalidate(keys);
        for slug in slugs {
          dispatcher.notify(ProductUpdate::new(ProductUpdateKind::StockUpdated, slug, None));
        }
        Ok::<_, StatusChangeError>(PipelineControl::Continue)
      }
    });

    Self { pipeline }
  }

  pub fn step_names(&self) -> Vec<&str> {
    self.pipeline.step_names()
  }

  /// Moves order `order_id` to `requested` and returns the stored order.
  #[instrument(name = "OrderStatusController::change_status", skip_all, fields(order_id = %order_id, requested = %requested))]
  pub async fn change_status(&self, order_id: Uuid, requested: OrderStatus) -> Result<Order, StatusChangeError> {
    if !requested.is_assignable() {
      return Err(StatusChangeError::Validation(format!(
        "Status {} cannot be set; expected PENDING, APPROVED or CANCELLED",
        requested
      )));
    }

    let ctx = ContextData::new(StatusChangeCtx::new(order_id, requested));
    match self.pipeline.run(ctx.clone()).await? {
      PipelineResult::Completed => {
        let updated = ctx.write().updated.take();
        updated.ok_or_else(|| {
          StatusChangeError::Flow(FlowError::Internal(
            "status change completed without a stored order".to_string(),
          ))
        })
      }
      PipelineResult::Stopped => Err(StatusChangeError::Flow(FlowError::Internal(
        "status change stopped before completion".to_string(),
      ))),
    }
  }
}
