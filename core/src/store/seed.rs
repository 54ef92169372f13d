// core/src/store/seed.rs

//! Demo catalog for local runs.

use crate::catalog::{CatalogStore, NewProduct, SizeInput};
use crate::error::StoreResult;
use rust_decimal::Decimal;
use tracing::info;

fn size(label: &str, price: Decimal, stock: i32) -> SizeInput {
  SizeInput {
    size: label.to_string(),
    price,
    stock,
  }
}

pub fn demo_products() -> Vec<NewProduct> {
  let tee = Decimal::new(2500, 2);
  let hoodie = Decimal::new(5500, 2);
  let cap = Decimal::new(1800, 2);
  vec![
    NewProduct {
      name: "Classic Tee".into(),
      slug: Some("classic-tee".into()),
      description: Some("Heavyweight cotton tee with a relaxed fit.".into()),
      price: tee,
      in_stock: true,
      category_id: None,
      collection_id: None,
      sizes: vec![size("S", tee, 10), size("M", tee, 5), size("L", tee, 3)],
    },
    NewProduct {
      name: "Oversized Hoodie".into(),
      slug: Some("oversized-hoodie".into()),
      description: Some("Brushed fleece hoodie with a dropped shoulder.".into()),
      price: hoodie,
      in_stock: true,
      category_id: None,
      collection_id: None,
      sizes: vec![size("M", hoodie, 4), size("XL", Decimal::new(6000, 2), 2)],
    },
    NewProduct {
      name: "Logo Cap".into(),
      slug: Some("logo-cap".into()),
      description: Some("Six-panel cap with an embroidered logo.".into()),
      price: cap,
      in_stock: true,
      category_id: None,
      collection_id: None,
      sizes: vec![size("One Size", cap, 20)],
    },
  ]
}

/// Inserts the demo products whose slug is not taken yet. Returns how many were added.
pub async fn seed_demo_catalog(store: &dyn CatalogStore) -> StoreResult<usize> {
  let mut added = 0;
  for product in demo_products() {
    let slug = product.slug.clone().unwrap_or_default();
    if store.slug_exists(&slug, None).await? {
      continue;
    }
    store.create_product(product).await?;
    added += 1;
  }
  info!(added, "Demo catalog seeded.");
  Ok(added)
}
