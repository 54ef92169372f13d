// core/src/stats.rs

use crate::error::StoreResult;
use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::error;

/// Product sizes with fewer units than this count as low stock.
pub const LOW_STOCK_THRESHOLD: i32 = 5;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminStats {
  pub total_products: i64,
  pub total_orders: i64,
  /// Distinct non-null customer emails across all orders.
  pub total_customers: i64,
  /// Sum of approved order totals, rounded to a whole amount.
  pub total_revenue: Decimal,
  pub categories: i64,
  pub collections: i64,
  pub low_stock_products: i64,
}

#[async_trait]
pub trait StatsSource: Send + Sync {
  async fn admin_stats(&self) -> StoreResult<AdminStats>;
}

/// Dashboard figures; all zeros when the store cannot be read.
pub async fn collect_stats(source: &dyn StatsSource) -> AdminStats {
  match source.admin_stats().await {
    Ok(mut stats) => {
      stats.total_revenue = stats.total_revenue.round();
      stats
    }
    Err(e) => {
      error!(error = %e, "Failed to collect admin stats.");
      AdminStats::default()
    }
  }
}
