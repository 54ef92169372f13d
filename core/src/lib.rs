// src/lib.rs

//! Storefront core: order fulfilment with inventory reservation.
//!
//! The crate holds everything the HTTP server needs that is not HTTP:
//!  - A small async step-pipeline engine (`flow`) used by the order flows.
//!  - The stock ledger with transactional reduce / restore / availability checks.
//!  - The order status controller and the checkout flow.
//!  - The product catalog, categories and collections, with a JSON response cache.
//!  - Purchase and request rate limiting over a key-value store.
//!  - Fire-and-forget side effects: cache invalidation, SSE broadcast, chat notifications.
//!  - Postgres and in-memory storage backends.

pub mod cache;
pub mod catalog;
pub mod dispatch;
pub mod error;
pub mod flow;
pub mod kv;
pub mod limits;
pub mod models;
pub mod orders;
pub mod stats;
pub mod stock;
pub mod store;

// --- Re-exports for the Public API ---

pub use crate::flow::{ContextData, Pipeline, PipelineControl, PipelineResult, SkipCondition, StepDef};

pub use crate::error::{FlowError, StoreError, StoreResult};

pub use crate::stock::{AvailabilityReport, StockLedger, StockOutcome, StockStore, StockTransaction};

pub use crate::orders::{CheckoutError, CheckoutFlow, OrderStatusController, OrderStore, StatusChangeError};

pub use crate::catalog::{Catalog, CatalogError, CatalogStore, CategoryStore, Taxonomy};

pub use crate::dispatch::{Dispatcher, ProductUpdateHub};
