// core/src/catalog/mod.rs

//! Product catalog: storage contracts, query types and the cached services
//! used by the storefront and admin endpoints.

mod query;
mod service;
mod taxonomy;

pub use query::{NewProduct, Pagination, ProductPage, ProductPatch, ProductQuery, ProductSort, SizeInput};
pub use service::{Catalog, CatalogError};
pub use taxonomy::{CategoryInput, CategoryPatch, CategoryStore, CollectionInput, CollectionPatch, Taxonomy};

use crate::error::StoreResult;
use crate::models::{Product, ProductDetail, ProductSummary};
use async_trait::async_trait;
use uuid::Uuid;

#[async_trait]
pub trait CatalogStore: Send + Sync {
  /// One page of non-archived products.
  async fn list_products(&self, query: &ProductQuery) -> StoreResult<ProductPage>;

  /// Non-archived product by slug.
  async fn product_by_slug(&self, slug: &str) -> StoreResult<Option<ProductDetail>>;

  /// Product by id, archived or not.
  async fn product_by_id(&self, id: Uuid) -> StoreResult<Option<ProductDetail>>;

  /// Newest non-archived products.
  async fn new_arrivals(&self, limit: i64) -> StoreResult<Vec<ProductSummary>>;

  async fn slug_exists(&self, slug: &str, excluding: Option<Uuid>) -> StoreResult<bool>;

  /// Inserts the product with its sizes. `product.slug` must already be set.
  async fn create_product(&self, product: NewProduct) -> StoreResult<ProductDetail>;

  /// Applies the set fields; `sizes`, when present, replaces the size list.
  async fn update_product(&self, id: Uuid, patch: ProductPatch) -> StoreResult<ProductDetail>;

  /// Soft delete. `StoreError::NotFound` when the id is unknown.
  async fn archive_product(&self, id: Uuid) -> StoreResult<Product>;

  /// Slugs of the given products, in no particular order.
  async fn slugs_for(&self, product_ids: &[Uuid]) -> StoreResult<Vec<String>>;
}
