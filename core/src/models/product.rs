// core/src/models/product.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Product {
  pub id: Uuid,
  pub name: String,
  pub slug: String,
  pub description: Option<String>,
  pub price: Decimal,
  pub in_stock: bool,
  pub is_archived: bool,
  pub category_id: Option<Uuid>,
  pub collection_id: Option<Uuid>,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
  pub archived_at: Option<DateTime<Utc>>,
}

/// A sellable size of a product. Its `stock`/`reserved_stock` pair is the
/// product's row in the stock ledger.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ProductSize {
  pub id: Uuid,
  pub product_id: Uuid,
  pub size: String,
  pub price: Decimal,
  pub stock: i32,
  pub reserved_stock: i32,
}

/// List-view shape of a product.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductSummary {
  pub id: Uuid,
  pub name: String,
  pub slug: String,
  pub description: Option<String>,
  pub price: Decimal,
  pub in_stock: bool,
  pub category_id: Option<Uuid>,
  pub collection_id: Option<Uuid>,
  pub has_sizes: bool,
  pub min_price: Decimal,
  pub max_price: Decimal,
  pub created_at: DateTime<Utc>,
}

impl ProductSummary {
  pub fn from_parts(product: &Product, sizes: &[ProductSize]) -> Self {
    let min_price = sizes.iter().map(|s| s.price).min().unwrap_or(product.price);
    let max_price = sizes.iter().map(|s| s.price).max().unwrap_or(product.price);
    Self {
      id: product.id,
      name: product.name.clone(),
      slug: product.slug.clone(),
      description: product.description.clone(),
      price: product.price,
      in_stock: product.in_stock,
      category_id: product.category_id,
      collection_id: product.collection_id,
      has_sizes: !sizes.is_empty(),
      min_price,
      max_price,
      created_at: product.created_at,
    }
  }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductSizeView {
  pub id: Uuid,
  pub size: String,
  pub price: Decimal,
  pub stock: i32,
  pub in_stock: bool,
}

/// Detail-view shape of a product, including its sizes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductDetail {
  pub id: Uuid,
  pub name: String,
  pub slug: String,
  pub description: Option<String>,
  pub price: Decimal,
  pub in_stock: bool,
  pub category_id: Option<Uuid>,
  pub collection_id: Option<Uuid>,
  pub sizes: Vec<ProductSizeView>,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

impl ProductDetail {
  pub fn from_parts(product: &Product, sizes: &[ProductSize]) -> Self {
    Self {
      id: product.id,
      name: product.name.clone(),
      slug: product.slug.clone(),
      description: product.description.clone(),
      price: product.price,
      in_stock: product.in_stock,
      category_id: product.category_id,
      collection_id: product.collection_id,
      sizes: sizes
        .iter()
        .map(|s| ProductSizeView {
          id: s.id,
          size: s.size.clone(),
          price: s.price,
          stock: s.stock,
          in_stock: s.stock > 0,
        })
        .collect(),
      created_at: product.created_at,
      updated_at: product.updated_at,
    }
  }
}

/// Lower-case, dash-separated slug derived from a product name.
pub fn slugify(name: &str) -> String {
  let mut slug = String::with_capacity(name.len());
  let mut pending_dash = false;
  for ch in name.chars().flat_map(char::to_lowercase) {
    if ch.is_ascii_alphanumeric() {
      if pending_dash && !slug.is_empty() {
        slug.push('-');
      }
      pending_dash = false;
      slug.push(ch);
    } else {
      pending_dash = true;
    }
  }
  slug
}

#[cfg(test)]
mod tests {
  use super::*;

  fn dec(s: &str) -> Decimal {
    s.parse().unwrap()
  }

  fn product() -> Product {
    Product {
      id: Uuid::new_v4(),
      name: "Linen Shirt".to_string(),
      slug: "linen-shirt".to_string(),
      description: None,
      price: dec("25.00"),
      in_stock: true,
      is_archived: false,
      category_id: None,
      collection_id: None,
      created_at: Utc::now(),
      updated_at: Utc::now(),
      archived_at: None,
    }
  }

  fn size(product_id: Uuid, label: &str, price: &str, stock: i32) -> ProductSize {
    ProductSize {
      id: Uuid::new_v4(),
      product_id,
      size: label.to_string(),
      price: dec(price),
      stock,
      reserved_stock: 0,
    }
  }

  #[test]
  fn summary_price_range_comes_from_sizes() {
    let p = product();
    let sizes = vec![size(p.id, "S", "20.00", 1), size(p.id, "XL", "30.00", 0)];
    let summary = ProductSummary::from_parts(&p, &sizes);
    assert!(summary.has_sizes);
    assert_eq!(summary.min_price, dec("20.00"));
    assert_eq!(summary.max_price, dec("30.00"));
  }

  #[test]
  fn summary_without_sizes_falls_back_to_base_price() {
    let p = product();
    let summary = ProductSummary::from_parts(&p, &[]);
    assert!(!summary.has_sizes);
    assert_eq!(summary.min_price, p.price);
    assert_eq!(summary.max_price, p.price);
  }

  #[test]
  fn detail_marks_empty_sizes_out_of_stock() {
    let p = product();
    let sizes = vec![size(p.id, "M", "25.00", 0)];
    let detail = ProductDetail::from_parts(&p, &sizes);
    assert!(!detail.sizes[0].in_stock);
  }

  #[test]
  fn slugify_collapses_punctuation() {
    assert_eq!(slugify("  Linen Shirt -- Summer '24 "), "linen-shirt-summer-24");
  }
}
