// core/src/catalog/service.rs

use super::{CatalogStore, NewProduct, ProductPage, ProductPatch, ProductQuery};
use crate::cache::{
  product_key, ResponseCache, CATEGORIES_KEY, COLLECTIONS_KEY, PRODUCTS_KEY, PRODUCT_DETAIL_TTL, PRODUCT_LIST_TTL,
};
use crate::dispatch::{Dispatcher, ProductUpdate, ProductUpdateKind};
use crate::error::StoreError;
use crate::models::{slugify, Product, ProductDetail, ProductSummary};
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, instrument};
use uuid::Uuid;
use validator::Validate;

pub const NEW_ARRIVALS_LIMIT: i64 = 8;

#[derive(Debug, Error)]
pub enum CatalogError {
  #[error("{0}")]
  NotFound(String),

  #[error("{0}")]
  Validation(String),

  #[error("Store error: {0}")]
  Store(#[from] StoreError),
}

fn slug_error(e: StoreError) -> CatalogError {
  match e {
    StoreError::Conflict(_) => CatalogError::Validation("Product with this slug already exists".into()),
    StoreError::NotFound(_) => CatalogError::NotFound("Product not found".into()),
    other => CatalogError::Store(other),
  }
}

/// Catalog reads through the response cache, and admin writes that keep the
/// cache and connected storefronts in step.
#[derive(Clone)]
pub struct Catalog {
  store: Arc<dyn CatalogStore>,
  cache: ResponseCache,
  dispatcher: Dispatcher,
}

impl Catalog {
  pub fn new(store: Arc<dyn CatalogStore>, cache: ResponseCache, dispatcher: Dispatcher) -> Self {
    Self {
      store,
      cache,
      dispatcher,
    }
  }

  /// Cached category and collection lists carry product counts.
  async fn invalidate_group_counts(&self) {
    self
      .cache
      .invalidate_many(&[CATEGORIES_KEY.to_string(), COLLECTIONS_KEY.to_string()])
      .await;
  }

  #[instrument(name = "Catalog::list", skip_all, fields(page = query.page, sort = query.sort.as_str()))]
  pub async fn list(&self, query: ProductQuery) -> Result<ProductPage, CatalogError> {
    let query = query.normalized();
    let key = query.cache_key();
    if let Some(page) = self.cache.get_json::<ProductPage>(&key).await {
      return Ok(page);
    }
    let page = self.store.list_products(&query).await?;
    self.cache.put_json(&key, &page, PRODUCT_LIST_TTL).await;
    Ok(page)
  }

  #[instrument(name = "Catalog::detail", skip(self))]
  pub async fn detail(&self, slug: &str) -> Result<ProductDetail, CatalogError> {
    let key = product_key(slug);
    if let Some(detail) = self.cache.get_json::<ProductDetail>(&key).await {
      return Ok(detail);
    }
    let detail = self
      .store
      .product_by_slug(slug)
      .await?
      .ok_or_else(|| CatalogError::NotFound("Product not found".into()))?;
    self.cache.put_json(&key, &detail, PRODUCT_DETAIL_TTL).await;
    Ok(detail)
  }

  pub async fn new_arrivals(&self) -> Result<Vec<ProductSummary>, CatalogError> {
    Ok(self.store.new_arrivals(NEW_ARRIVALS_LIMIT).await?)
  }

  pub async fn product(&self, id: Uuid) -> Result<ProductDetail, CatalogError> {
    self
      .store
      .product_by_id(id)
      .await?
      .ok_or_else(|| CatalogError::NotFound("Product not found".into()))
  }

  #[instrument(name = "Catalog::create", skip_all, fields(name = %input.name))]
  pub async fn create(&self, mut input: NewProduct) -> Result<ProductDetail, CatalogError> {
    input
      .validate()
      .map_err(|e| CatalogError::Validation(e.to_string()))?;

    let slug = input
      .slug
      .as_deref()
      .map(slugify)
      .filter(|s| !s.is_empty())
      .unwrap_or_else(|| slugify(&input.name));
    if slug.is_empty() {
      return Err(CatalogError::Validation("Cannot derive a slug from the product name".into()));
    }
    if self.store.slug_exists(&slug, None).await? {
      return Err(CatalogError::Validation("Product with this slug already exists".into()));
    }
    input.slug = Some(slug);

    let created = self.store.create_product(input).await.map_err(slug_error)?;
    info!(product_id = %created.id, slug = %created.slug, "Product created.");

    self.cache.invalidate(PRODUCTS_KEY).await;
    self.invalidate_group_counts().await;
    self.dispatcher.notify(ProductUpdate::new(
      ProductUpdateKind::ProductCreated,
      created.slug.clone(),
      Some(created.name.clone()),
    ));
    Ok(created)
  }

  #[instrument(name = "Catalog::update", skip(self, patch))]
  pub async fn update(&self, id: Uuid, mut patch: ProductPatch) -> Result<ProductDetail, CatalogError> {
    patch
      .validate()
      .map_err(|e| CatalogError::Validation(e.to_string()))?;

    let existing = self.product(id).await?;
    if let Some(raw) = patch.slug.take() {
      let slug = slugify(&raw);
      if slug.is_empty() {
        return Err(CatalogError::Validation("Slug must contain letters or numbers".into()));
      }
      if slug != existing.slug && self.store.slug_exists(&slug, Some(id)).await? {
        return Err(CatalogError::Validation("Product with this slug already exists".into()));
      }
      patch.slug = Some(slug);
    }

    let updated = self.store.update_product(id, patch).await.map_err(slug_error)?;
    info!(product_id = %id, slug = %updated.slug, "Product updated.");

    self.cache.invalidate(PRODUCTS_KEY).await;
    self.invalidate_group_counts().await;
    self.cache.invalidate(&product_key(&existing.slug)).await;
    if updated.slug != existing.slug {
      self.cache.invalidate(&product_key(&updated.slug)).await;
    }
    self.dispatcher.notify(ProductUpdate::new(
      ProductUpdateKind::ProductUpdated,
      updated.slug.clone(),
      Some(updated.name.clone()),
    ));
    Ok(updated)
  }

  #[instrument(name = "Catalog::archive", skip(self))]
  pub async fn archive(&self, id: Uuid) -> Result<Product, CatalogError> {
    let archived = self.store.archive_product(id).await.map_err(slug_error)?;
    info!(product_id = %id, slug = %archived.slug, "Product archived.");

    self.cache.invalidate(PRODUCTS_KEY).await;
    self.cache.invalidate(&product_key(&archived.slug)).await;
    self
      .dispatcher
      .notify(ProductUpdate::new(ProductUpdateKind::ProductDeleted, archived.slug.clone(), None));
    Ok(archived)
  }
}
