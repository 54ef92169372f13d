// core/src/catalog/query.rs

use crate::models::ProductSummary;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;
use validator::{Validate, ValidationError};

pub const DEFAULT_PAGE_SIZE: i64 = 12;
pub const MAX_PAGE_SIZE: i64 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProductSort {
  #[default]
  Newest,
  PriceAsc,
  PriceDesc,
  NameAsc,
  NameDesc,
}

impl ProductSort {
  pub fn as_str(&self) -> &'static str {
    match self {
      ProductSort::Newest => "newest",
      ProductSort::PriceAsc => "price-asc",
      ProductSort::PriceDesc => "price-desc",
      ProductSort::NameAsc => "name-asc",
      ProductSort::NameDesc => "name-desc",
    }
  }
}

impl FromStr for ProductSort {
  type Err = std::convert::Infallible;

  /// Unknown values sort by newest.
  fn from_str(s: &str) -> Result<Self, Self::Err> {
    Ok(match s {
      "price-asc" => ProductSort::PriceAsc,
      "price-desc" => ProductSort::PriceDesc,
      "name-asc" => ProductSort::NameAsc,
      "name-desc" => ProductSort::NameDesc,
      _ => ProductSort::Newest,
    })
  }
}

/// Normalized storefront listing query.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductQuery {
  pub category: Option<Uuid>,
  pub collection: Option<Uuid>,
  pub search: Option<String>,
  pub min_price: Option<Decimal>,
  pub max_price: Option<Decimal>,
  pub sort: ProductSort,
  pub page: i64,
  pub limit: i64,
}

impl Default for ProductQuery {
  fn default() -> Self {
    Self {
      category: None,
      collection: None,
      search: None,
      min_price: None,
      max_price: None,
      sort: ProductSort::Newest,
      page: 1,
      limit: DEFAULT_PAGE_SIZE,
    }
  }
}

impl ProductQuery {
  /// Clamps paging and drops blank search terms.
  pub fn normalized(mut self) -> Self {
    self.page = self.page.max(1);
    self.limit = self.limit.clamp(1, MAX_PAGE_SIZE);
    self.search = self
      .search
      .map(|s| s.trim().to_string())
      .filter(|s| !s.is_empty());
    self
  }

  pub fn offset(&self) -> i64 {
    (self.page - 1) * self.limit
  }

  /// Cache key for this page, under the `products:` namespace.
  pub fn cache_key(&self) -> String {
    fn opt<T: ToString>(v: &Option<T>) -> String {
      v.as_ref().map(ToString::to_string).unwrap_or_default()
    }
    crate::cache::product_list_key(&format!(
      "{}:{}:{}:{}:{}:{}:{}:{}",
      opt(&self.category),
      opt(&self.collection),
      opt(&self.search),
      self.sort.as_str(),
      self.page,
      self.limit,
      opt(&self.min_price),
      opt(&self.max_price),
    ))
  }

  /// Whether a product at `price` with the given text passes the filters.
  pub fn matches(
    &self,
    name: &str,
    description: Option<&str>,
    price: Decimal,
    category: Option<Uuid>,
    collection: Option<Uuid>,
  ) -> bool {
    if self.category.is_some() && self.category != category {
      return false;
    }
    if self.collection.is_some() && self.collection != collection {
      return false;
    }
    if self.min_price.is_some_and(|min| price < min) || self.max_price.is_some_and(|max| price > max) {
      return false;
    }
    match &self.search {
      Some(term) => {
        let term = term.to_lowercase();
        name.to_lowercase().contains(&term) || description.is_some_and(|d| d.to_lowercase().contains(&term))
      }
      None => true,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
  pub total: i64,
  pub page: i64,
  pub limit: i64,
  pub total_pages: i64,
}

impl Pagination {
  pub fn new(total: i64, page: i64, limit: i64) -> Self {
    let total_pages = if limit > 0 { (total + limit - 1) / limit } else { 0 };
    Self {
      total,
      page,
      limit,
      total_pages,
    }
  }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductPage {
  pub products: Vec<ProductSummary>,
  pub pagination: Pagination,
}

pub(crate) fn validate_positive(value: &Decimal) -> Result<(), ValidationError> {
  if *value > Decimal::ZERO {
    Ok(())
  } else {
    Err(ValidationError::new("positive").with_message("Price must be positive".into()))
  }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SizeInput {
  #[validate(length(min = 1, message = "Size is required"))]
  pub size: String,
  #[validate(custom(function = "validate_positive"))]
  pub price: Decimal,
  #[validate(range(min = 0, message = "Stock must be zero or positive"))]
  #[serde(default)]
  pub stock: i32,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewProduct {
  #[validate(length(min = 2, message = "Name must be at least 2 characters"))]
  pub name: String,
  pub slug: Option<String>,
  pub description: Option<String>,
  #[validate(custom(function = "validate_positive"))]
  pub price: Decimal,
  #[serde(default = "default_in_stock")]
  pub in_stock: bool,
  pub category_id: Option<Uuid>,
  pub collection_id: Option<Uuid>,
  #[serde(default)]
  #[validate(nested)]
  pub sizes: Vec<SizeInput>,
}

fn default_in_stock() -> bool {
  true
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ProductPatch {
  #[validate(length(min = 2, message = "Name must be at least 2 characters"))]
  pub name: Option<String>,
  pub slug: Option<String>,
  pub description: Option<String>,
  #[validate(custom(function = "validate_positive"))]
  pub price: Option<Decimal>,
  pub in_stock: Option<bool>,
  pub category_id: Option<Uuid>,
  pub collection_id: Option<Uuid>,
  #[validate(nested)]
  pub sizes: Option<Vec<SizeInput>>,
}
