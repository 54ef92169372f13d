// core/src/catalog/taxonomy.rs

//! Categories and collections: the admin-managed groupings products point at.

use super::CatalogError;
use crate::cache::{ResponseCache, CATEGORIES_KEY, COLLECTIONS_KEY, TAXONOMY_TTL};
use crate::error::{StoreError, StoreResult};
use crate::models::{Category, Collection, CollectionType};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;
use validator::Validate;

fn blank_to_none(value: Option<String>) -> Option<String> {
  value.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

fn invalid(e: validator::ValidationErrors) -> CatalogError {
  CatalogError::Validation(e.to_string())
}

/// Full set of category fields, as created or as stored after an update.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CategoryInput {
  #[validate(length(min = 2, message = "Name must be at least 2 characters"))]
  pub name: String,
  #[validate(url(message = "Please enter a valid URL"))]
  pub image_url: Option<String>,
}

impl CategoryInput {
  fn normalized(mut self) -> Self {
    self.name = self.name.trim().to_string();
    self.image_url = blank_to_none(self.image_url);
    self
  }
}

/// Partial category update. A blank `imageUrl` clears the image.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CategoryPatch {
  #[validate(length(min = 2, message = "Name must be at least 2 characters"))]
  pub name: Option<String>,
  pub image_url: Option<String>,
}

impl CategoryPatch {
  pub fn apply_to(self, existing: &Category) -> CategoryInput {
    CategoryInput {
      name: self.name.unwrap_or_else(|| existing.name.clone()),
      image_url: match self.image_url {
        Some(url) => Some(url),
        None => existing.image_url.clone(),
      },
    }
    .normalized()
  }
}

fn default_available() -> bool {
  true
}

/// Full set of collection fields, as created or as stored after an update.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CollectionInput {
  #[validate(length(min = 2, message = "Name must be at least 2 characters"))]
  pub name: String,
  #[validate(length(min = 10, message = "Description must be at least 10 characters"))]
  pub description: String,
  #[serde(default = "default_available")]
  pub available: bool,
  #[serde(default)]
  pub collection_type: CollectionType,
  pub discontinued_date: Option<DateTime<Utc>>,
}

impl CollectionInput {
  fn normalized(mut self) -> Self {
    self.name = self.name.trim().to_string();
    self.description = self.description.trim().to_string();
    self
  }
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CollectionPatch {
  #[validate(length(min = 2, message = "Name must be at least 2 characters"))]
  pub name: Option<String>,
  #[validate(length(min = 10, message = "Description must be at least 10 characters"))]
  pub description: Option<String>,
  pub available: Option<bool>,
  pub collection_type: Option<CollectionType>,
  pub discontinued_date: Option<DateTime<Utc>>,
}

impl CollectionPatch {
  pub fn apply_to(self, existing: &Collection) -> CollectionInput {
    CollectionInput {
      name: self.name.unwrap_or_else(|| existing.name.clone()),
      description: self.description.unwrap_or_else(|| existing.description.clone()),
      available: self.available.unwrap_or(existing.available),
      collection_type: self.collection_type.unwrap_or(existing.collection_type),
      discontinued_date: self.discontinued_date.or(existing.discontinued_date),
    }
    .normalized()
  }
}

#[async_trait]
pub trait CategoryStore: Send + Sync {
  /// All categories by name, with product counts.
  async fn list_categories(&self) -> StoreResult<Vec<Category>>;

  async fn category_by_id(&self, id: Uuid) -> StoreResult<Option<Category>>;

  /// Whether another category already uses `name`.
  async fn category_name_taken(&self, name: &str, excluding: Option<Uuid>) -> StoreResult<bool>;

  /// `StoreError::Conflict` on a duplicate name.
  async fn create_category(&self, input: &CategoryInput) -> StoreResult<Category>;

  /// Overwrites every field. `StoreError::NotFound` / `Conflict` as for create.
  async fn update_category(&self, id: Uuid, input: &CategoryInput) -> StoreResult<Category>;

  /// `StoreError::Conflict` while any product still points at the category.
  async fn delete_category(&self, id: Uuid) -> StoreResult<()>;

  /// All collections by name, with product counts.
  async fn list_collections(&self) -> StoreResult<Vec<Collection>>;

  async fn collection_by_id(&self, id: Uuid) -> StoreResult<Option<Collection>>;

  async fn create_collection(&self, input: &CollectionInput) -> StoreResult<Collection>;

  async fn update_collection(&self, id: Uuid, input: &CollectionInput) -> StoreResult<Collection>;

  /// `StoreError::Conflict` while any product still points at the collection.
  async fn delete_collection(&self, id: Uuid) -> StoreResult<()>;
}

const DUPLICATE_CATEGORY: &str = "Category with this name already exists";
const CATEGORY_IN_USE: &str = "Cannot delete category with associated products";
const COLLECTION_IN_USE: &str = "Cannot delete collection with associated products";

fn category_error(e: StoreError) -> CatalogError {
  match e {
    StoreError::NotFound(_) => CatalogError::NotFound("Category not found".into()),
    other => CatalogError::Store(other),
  }
}

fn collection_error(e: StoreError) -> CatalogError {
  match e {
    StoreError::NotFound(_) => CatalogError::NotFound("Collection not found".into()),
    other => CatalogError::Store(other),
  }
}

/// Admin CRUD for categories and collections. Lists are served through the
/// response cache and every write drops the cached list.
#[derive(Clone)]
pub struct Taxonomy {
  store: Arc<dyn CategoryStore>,
  cache: ResponseCache,
}

impl Taxonomy {
  pub fn new(store: Arc<dyn CategoryStore>, cache: ResponseCache) -> Self {
    Self { store, cache }
  }

  pub async fn categories(&self) -> Result<Vec<Category>, CatalogError> {
    if let Some(cached) = self.cache.get_json::<Vec<Category>>(CATEGORIES_KEY).await {
      return Ok(cached);
    }
    let categories = self.store.list_categories().await?;
    self.cache.put_json(CATEGORIES_KEY, &categories, TAXONOMY_TTL).await;
    Ok(categories)
  }

  pub async fn category(&self, id: Uuid) -> Result<Category, CatalogError> {
    self
      .store
      .category_by_id(id)
      .await?
      .ok_or_else(|| CatalogError::NotFound("Category not found".into()))
  }

  #[instrument(name = "Taxonomy::create_category", skip_all, fields(name = %input.name))]
  pub async fn create_category(&self, input: CategoryInput) -> Result<Category, CatalogError> {
    let input = input.normalized();
    input.validate().map_err(invalid)?;
    if self.store.category_name_taken(&input.name, None).await? {
      return Err(CatalogError::Validation(DUPLICATE_CATEGORY.into()));
    }

    let created = self.store.create_category(&input).await.map_err(|e| match e {
      StoreError::Conflict(_) => CatalogError::Validation(DUPLICATE_CATEGORY.into()),
      other => category_error(other),
    })?;
    info!(category_id = %created.id, "Category created.");
    self.cache.invalidate(CATEGORIES_KEY).await;
    Ok(created)
  }

  #[instrument(name = "Taxonomy::update_category", skip(self, patch))]
  pub async fn update_category(&self, id: Uuid, patch: CategoryPatch) -> Result<Category, CatalogError> {
    patch.validate().map_err(invalid)?;
    let existing = self.category(id).await?;
    let input = patch.apply_to(&existing);
    input.validate().map_err(invalid)?;
    if input.name != existing.name && self.store.category_name_taken(&input.name, Some(id)).await? {
      return Err(CatalogError::Validation(DUPLICATE_CATEGORY.into()));
    }

    let updated = self.store.update_category(id, &input).await.map_err(|e| match e {
      StoreError::Conflict(_) => CatalogError::Validation(DUPLICATE_CATEGORY.into()),
      other => category_error(other),
    })?;
    info!(category_id = %id, "Category updated.");
    self.cache.invalidate(CATEGORIES_KEY).await;
    Ok(updated)
  }

  #[instrument(name = "Taxonomy::delete_category", skip(self))]
  pub async fn delete_category(&self, id: Uuid) -> Result<(), CatalogError> {
    let existing = self.category(id).await?;
    if existing.product_count > 0 {
      return Err(CatalogError::Validation(CATEGORY_IN_USE.into()));
    }
    self.store.delete_category(id).await.map_err(|e| match e {
      StoreError::Conflict(_) => CatalogError::Validation(CATEGORY_IN_USE.into()),
      other => category_error(other),
    })?;
    info!(category_id = %id, name = %existing.name, "Category deleted.");
    self.cache.invalidate(CATEGORIES_KEY).await;
    Ok(())
  }

  pub async fn collections(&self) -> Result<Vec<Collection>, CatalogError> {
    if let Some(cached) = self.cache.get_json::<Vec<Collection>>(COLLECTIONS_KEY).await {
      return Ok(cached);
    }
    let collections = self.store.list_collections().await?;
    self.cache.put_json(COLLECTIONS_KEY, &collections, TAXONOMY_TTL).await;
    Ok(collections)
  }

  pub async fn collection(&self, id: Uuid) -> Result<Collection, CatalogError> {
    self
      .store
      .collection_by_id(id)
      .await?
      .ok_or_else(|| CatalogError::NotFound("Collection not found".into()))
  }

  #[instrument(name = "Taxonomy::create_collection", skip_all, fields(name = %input.name))]
  pub async fn create_collection(&self, input: CollectionInput) -> Result<Collection, CatalogError> {
    let input = input.normalized();
    input.validate().map_err(invalid)?;
    let created = self.store.create_collection(&input).await.map_err(collection_error)?;
    info!(collection_id = %created.id, "Collection created.");
    self.cache.invalidate(COLLECTIONS_KEY).await;
    Ok(created)
  }

  #[instrument(name = "Taxonomy::update_collection", skip(self, patch))]
  pub async fn update_collection(&self, id: Uuid, patch: CollectionPatch) -> Result<Collection, CatalogError> {
    patch.validate().map_err(invalid)?;
    let existing = self.collection(id).await?;
    let input = patch.apply_to(&existing);
    input.validate().map_err(invalid)?;

    let updated = self.store.update_collection(id, &input).await.map_err(collection_error)?;
    info!(collection_id = %id, "Collection updated.");
    self.cache.invalidate(COLLECTIONS_KEY).await;
    Ok(updated)
  }

  #[instrument(name = "Taxonomy::delete_collection", skip(self))]
  pub async fn delete_collection(&self, id: Uuid) -> Result<(), CatalogError> {
    let existing = self.collection(id).await?;
    if existing.product_count > 0 {
      return Err(CatalogError::Validation(COLLECTION_IN_USE.into()));
    }
    self.store.delete_collection(id).await.map_err(|e| match e {
      StoreError::Conflict(_) => CatalogError::Validation(COLLECTION_IN_USE.into()),
      other => collection_error(other),
    })?;
    info!(collection_id = %id, name = %existing.name, "Collection deleted.");
    self.cache.invalidate(COLLECTIONS_KEY).await;
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  fn category() -> Category {
    Category {
      id: Uuid::new_v4(),
      name: "Tops".into(),
      image_url: Some("https://cdn.example.com/tops.jpg".into()),
      product_count: 0,
      created_at: Utc::now(),
      updated_at: Utc::now(),
    }
  }

  #[test]
  fn blank_image_url_clears_and_absent_keeps() {
    let existing = category();

    let kept = CategoryPatch {
      name: Some("  Outerwear ".into()),
      image_url: None,
    }
    .apply_to(&existing);
    assert_eq!(kept.name, "Outerwear");
    assert_eq!(kept.image_url, existing.image_url);

    let cleared = CategoryPatch {
      name: None,
      image_url: Some("".into()),
    }
    .apply_to(&existing);
    assert_eq!(cleared.name, "Tops");
    assert_eq!(cleared.image_url, None);
  }

  #[test]
  fn collection_defaults_to_current_and_available() {
    let input: CollectionInput = serde_json::from_value(json!({
      "name": "Summer 24",
      "description": "Light fabrics for the hot months."
    }))
    .unwrap();
    assert!(input.available);
    assert_eq!(input.collection_type, CollectionType::Current);
    assert!(input.validate().is_ok());
  }

  #[test]
  fn short_collection_description_is_rejected() {
    let input: CollectionInput = serde_json::from_value(json!({ "name": "Drop", "description": "short" })).unwrap();
    let err = input.validate().unwrap_err().to_string();
    assert!(err.contains("Description must be at least 10 characters"), "{}", err);
  }
}
