// core/src/stock/ledger.rs

use super::{StockStore, StockTransaction};
use crate::error::StoreError;
use crate::models::StockLine;
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};

/// Result of `reduce_stock` / `restore_stock`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StockOutcome {
  pub success: bool,
  pub errors: Vec<String>,
}

impl StockOutcome {
  pub fn ok() -> Self {
    Self {
      success: true,
      errors: Vec::new(),
    }
  }

  fn failed(errors: Vec<String>) -> Self {
    Self { success: false, errors }
  }
}

/// Result of the read-only availability check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AvailabilityReport {
  pub available: bool,
  pub errors: Vec<String>,
}

#[derive(Debug, Clone, Copy)]
enum Movement {
  Reduce,
  Restore,
}

impl Movement {
  fn as_str(self) -> &'static str {
    match self {
      Movement::Reduce => "reduce",
      Movement::Restore => "restore",
    }
  }
}

fn missing_entry(line: &StockLine) -> String {
  format!("Product size {} not found for product {}", line.size, line.product_id)
}

fn validate_lines(lines: &[StockLine]) -> Vec<String> {
  if lines.is_empty() {
    return vec!["No items provided".to_string()];
  }
  lines
    .iter()
    .filter(|l| l.quantity <= 0)
    .map(|l| {
      format!(
        "Invalid quantity {} for product {} ({})",
        l.quantity, l.product_id, l.size
      )
    })
    .collect()
}

/// Transactional mutators over the stock ledger.
///
/// Every call runs in a single backend transaction: either every line is
/// applied or none is. Failures come back as a `StockOutcome`; nothing here
/// returns an error to the caller.
#[derive(Clone)]
pub struct StockLedger {
  store: Arc<dyn StockStore>,
}

impl StockLedger {
  pub fn new(store: Arc<dyn StockStore>) -> Self {
    Self { store }
  }

  /// Decrements `stock` for every line. Any missing entry or line whose
  /// `stock - reserved_stock` is below the requested quantity rolls the whole
  /// call back; every offending line is reported.
  #[instrument(name = "StockLedger::reduce_stock", skip_all, fields(lines = lines.len()))]
  pub async fn reduce_stock(&self, lines: &[StockLine]) -> StockOutcome {
    self.apply(Movement::Reduce, lines).await
  }

  /// Increments `stock` for every line with no upper bound. A missing entry is
  /// the only business failure.
  #[instrument(name = "StockLedger::restore_stock", skip_all, fields(lines = lines.len()))]
  pub async fn restore_stock(&self, lines: &[StockLine]) -> StockOutcome {
    self.apply(Movement::Restore, lines).await
  }

  /// Dry run of `reduce_stock`: same lookups and checks, no writes.
  #[instrument(name = "StockLedger::check_availability", skip_all, fields(lines = lines.len()))]
  pub async fn check_availability(&self, lines: &[StockLine]) -> AvailabilityReport {
    let invalid = validate_lines(lines);
    if !invalid.is_empty() {
      return AvailabilityReport {
        available: false,
        errors: invalid,
      };
    }

    let mut errors = Vec::new();
    for line in lines {
      match self.store.find_entry(line.product_id, &line.size).await {
        Ok(None) => errors.push(missing_entry(line)),
        Ok(Some(entry)) => {
          if entry.available() < line.quantity {
            errors.push(format!(
              "Insufficient stock for {} ({}). Available: {}, Requested: {}",
              entry.product_name,
              line.size,
              entry.available(),
              line.quantity
            ));
          }
        }
        Err(e) => {
          error!(error = %e, product_id = %line.product_id, size = %line.size, "Stock lookup failed.");
          errors.push("Failed to check stock availability".to_string());
          break;
        }
      }
    }

    AvailabilityReport {
      available: errors.is_empty(),
      errors,
    }
  }

  async fn apply(&self, movement: Movement, lines: &[StockLine]) -> StockOutcome {
    let invalid = validate_lines(lines);
    if !invalid.is_empty() {
      warn!(movement = movement.as_str(), "Rejected stock movement with invalid lines.");
      return StockOutcome::failed(invalid);
    }

    let mut tx = match self.store.begin().await {
      Ok(tx) => tx,
      Err(e) => {
        error!(error = %e, movement = movement.as_str(), "Could not open stock transaction.");
        return StockOutcome::failed(vec![format!("Failed to {} stock", movement.as_str())]);
      }
    };

    let errors = match Self::apply_lines(tx.as_mut(), movement, lines).await {
      Ok(errors) => errors,
      Err(e) => {
        error!(error = %e, movement = movement.as_str(), "Stock transaction failed.");
        if let Err(rb) = tx.rollback().await {
          error!(error = %rb, "Rollback after stock failure also failed.");
        }
        return StockOutcome::failed(vec![format!("Failed to {} stock", movement.as_str())]);
      }
    };

    if !errors.is_empty() {
      warn!(
        movement = movement.as_str(),
        failures = errors.len(),
        "Stock movement rejected, rolling back."
      );
      if let Err(e) = tx.rollback().await {
        error!(error = %e, "Rollback of rejected stock movement failed.");
      }
      return StockOutcome::failed(errors);
    }

    match tx.commit().await {
      Ok(()) => {
        info!(movement = movement.as_str(), lines = lines.len(), "Stock movement committed.");
        StockOutcome::ok()
      }
      Err(e) => {
        error!(error = %e, movement = movement.as_str(), "Commit of stock movement failed.");
        StockOutcome::failed(vec![format!("Failed to {} stock", movement.as_str())])
      }
    }
  }

  /// Applies each line inside `tx`, collecting business failures. Store errors
  /// abort immediately.
  async fn apply_lines(
    tx: &mut dyn StockTransaction,
    movement: Movement,
    lines: &[StockLine],
  ) -> Result<Vec<String>, StoreError> {
    let mut errors = Vec::new();
    for line in lines {
      let Some(entry) = tx.lock_entry(line.product_id, &line.size).await? else {
        errors.push(missing_entry(line));
        continue;
      };

      match movement {
        Movement::Reduce => {
          let available = entry.available();
          if available < line.quantity {
            errors.push(format!(
              "Insufficient stock for {} ({}). Available: {}, Requested: {}",
              entry.product_name, line.size, available, line.quantity
            ));
            continue;
          }
          if errors.is_empty() {
            tx.adjust_stock(line.product_id, &line.size, -line.quantity).await?;
          }
        }
        Movement::Restore => {
          if errors.is_empty() {
            tx.adjust_stock(line.product_id, &line.size, line.quantity).await?;
          }
        }
      }
    }
    Ok(errors)
  }
}
