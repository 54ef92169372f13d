// core/src/store/memory.rs

use crate::catalog::{
  CatalogStore, CategoryInput, CategoryStore, CollectionInput, NewProduct, Pagination, ProductPage, ProductPatch,
  ProductQuery, ProductSort, SizeInput,
};
use crate::error::{StoreError, StoreResult};
use crate::models::{
  Category, Collection, NewOrder, Order, OrderItem, OrderStatus, Product, ProductDetail, ProductSize, ProductSummary,
  StockEntry,
};
use crate::orders::{OrderFilter, OrderStore};
use crate::stats::{AdminStats, StatsSource, LOW_STOCK_THRESHOLD};
use crate::stock::{StockStore, StockTransaction};
use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

#[derive(Debug, Default)]
struct MemoryState {
  products: HashMap<Uuid, Product>,
  /// Per product, in display order.
  sizes: HashMap<Uuid, Vec<ProductSize>>,
  orders: HashMap<Uuid, Order>,
  /// `product_count` is filled in on read.
  categories: HashMap<Uuid, Category>,
  collections: HashMap<Uuid, Collection>,
}

impl MemoryState {
  fn detail(&self, product: &Product) -> ProductDetail {
    ProductDetail::from_parts(product, self.sizes_of(product.id))
  }

  fn summary(&self, product: &Product) -> ProductSummary {
    ProductSummary::from_parts(product, self.sizes_of(product.id))
  }

  fn sizes_of(&self, product_id: Uuid) -> &[ProductSize] {
    self.sizes.get(&product_id).map(Vec::as_slice).unwrap_or(&[])
  }

  fn entry(&self, product_id: Uuid, size: &str) -> Option<StockEntry> {
    let product = self.products.get(&product_id)?;
    let row = self.sizes_of(product_id).iter().find(|s| s.size == size)?;
    Some(StockEntry {
      product_id,
      size: row.size.clone(),
      product_name: product.name.clone(),
      stock: row.stock,
      reserved_stock: row.reserved_stock,
    })
  }

  fn counted_category(&self, category: &Category) -> Category {
    let mut category = category.clone();
    category.product_count = self
      .products
      .values()
      .filter(|p| p.category_id == Some(category.id))
      .count() as i64;
    category
  }

  fn counted_collection(&self, collection: &Collection) -> Collection {
    let mut collection = collection.clone();
    collection.product_count = self
      .products
      .values()
      .filter(|p| p.collection_id == Some(collection.id))
      .count() as i64;
    collection
  }

  fn slug_taken(&self, slug: &str, excluding: Option<Uuid>) -> bool {
    self
      .products
      .values()
      .any(|p| p.slug == slug && Some(p.id) != excluding)
  }

  fn replace_sizes(&mut self, product_id: Uuid, inputs: Vec<SizeInput>) {
    let previous = self.sizes.remove(&product_id).unwrap_or_default();
    let sizes = inputs
      .into_iter()
      .map(|input| {
        let kept = previous.iter().find(|p| p.size == input.size);
        ProductSize {
          id: kept.map(|p| p.id).unwrap_or_else(Uuid::new_v4),
          product_id,
          size: input.size,
          price: input.price,
          stock: input.stock,
          reserved_stock: kept.map(|p| p.reserved_stock).unwrap_or(0),
        }
      })
      .collect();
    self.sizes.insert(product_id, sizes);
  }
}

/// Process-local store behind one async mutex. Stock transactions hold the
/// mutex until commit or rollback, so they are fully serialized.
#[derive(Clone, Default)]
pub struct MemoryStore {
  state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
  pub fn new() -> Self {
    Self::default()
  }

  /// Inserts or replaces a product together with its sizes.
  pub async fn insert_product(&self, product: Product, sizes: Vec<ProductSize>) {
    let mut state = self.state.lock().await;
    state.sizes.insert(product.id, sizes);
    state.products.insert(product.id, product);
  }

  /// Removes one size row. Orders referencing it keep their lines.
  pub async fn remove_size(&self, product_id: Uuid, size: &str) -> bool {
    let mut state = self.state.lock().await;
    match state.sizes.get_mut(&product_id) {
      Some(rows) => {
        let before = rows.len();
        rows.retain(|r| r.size != size);
        rows.len() != before
      }
      None => false,
    }
  }
}

struct MemoryStockTx {
  guard: OwnedMutexGuard<MemoryState>,
  pending: HashMap<(Uuid, String), i32>,
}

#[async_trait]
impl StockTransaction for MemoryStockTx {
  async fn lock_entry(&mut self, product_id: Uuid, size: &str) -> StoreResult<Option<StockEntry>> {
    let delta = self
      .pending
      .get(&(product_id, size.to_string()))
      .copied()
      .unwrap_or(0);
    Ok(self.guard.entry(product_id, size).map(|mut e| {
      e.stock += delta;
      e
    }))
  }

  async fn adjust_stock(&mut self, product_id: Uuid, size: &str, delta: i32) -> StoreResult<()> {
    if self.guard.entry(product_id, size).is_none() {
      return Err(StoreError::NotFound(format!("stock entry {}/{}", product_id, size)));
    }
    *self.pending.entry((product_id, size.to_string())).or_insert(0) += delta;
    Ok(())
  }

  async fn commit(self: Box<Self>) -> StoreResult<()> {
    let MemoryStockTx { mut guard, pending } = *self;
    for ((product_id, size), delta) in pending {
      if let Some(row) = guard
        .sizes
        .get_mut(&product_id)
        .and_then(|rows| rows.iter_mut().find(|r| r.size == size))
      {
        row.stock += delta;
      }
    }
    Ok(())
  }

  async fn rollback(self: Box<Self>) -> StoreResult<()> {
    Ok(())
  }
}

#[async_trait]
impl StockStore for MemoryStore {
  async fn begin(&self) -> StoreResult<Box<dyn StockTransaction>> {
    let guard = self.state.clone().lock_owned().await;
    Ok(Box::new(MemoryStockTx {
      guard,
      pending: HashMap::new(),
    }))
  }

  async fn find_entry(&self, product_id: Uuid, size: &str) -> StoreResult<Option<StockEntry>> {
    Ok(self.state.lock().await.entry(product_id, size))
  }
}

#[async_trait]
impl OrderStore for MemoryStore {
  async fn find_order(&self, id: Uuid) -> StoreResult<Option<Order>> {
    Ok(self.state.lock().await.orders.get(&id).cloned())
  }

  async fn list_orders(&self, filter: &OrderFilter) -> StoreResult<Vec<Order>> {
    let state = self.state.lock().await;
    let mut orders: Vec<Order> = state.orders.values().filter(|o| filter.matches(o)).cloned().collect();
    orders.sort_by(|a, b| {
      b.created_at
        .cmp(&a.created_at)
        .then_with(|| b.order_number.cmp(&a.order_number))
    });
    Ok(orders)
  }

  async fn create_order(&self, new_order: NewOrder) -> StoreResult<Order> {
    let mut state = self.state.lock().await;
    if state.orders.values().any(|o| o.order_number == new_order.order_number) {
      return Err(StoreError::Conflict(format!("order number {}", new_order.order_number)));
    }
    let id = Uuid::new_v4();
    let now = Utc::now();
    let order = Order {
      id,
      order_number: new_order.order_number,
      total: new_order.total,
      status: OrderStatus::Pending,
      customer_name: new_order.customer_name,
      customer_email: new_order.customer_email,
      customer_phone: new_order.customer_phone,
      shipping_address: new_order.shipping_address,
      payment_proof_url: new_order.payment_proof_url,
      created_at: now,
      updated_at: now,
      items: new_order
        .items
        .into_iter()
        .map(|item| OrderItem {
          id: Uuid::new_v4(),
          order_id: id,
          product_id: item.product_id,
          name: item.name,
          price: item.price,
          size: item.size,
          quantity: item.quantity,
        })
        .collect(),
    };
    state.orders.insert(id, order.clone());
    Ok(order)
  }

  async fn update_status(&self, id: Uuid, from: OrderStatus, to: OrderStatus) -> StoreResult<Order> {
    let mut state = self.state.lock().await;
    let order = state
      .orders
      .get_mut(&id)
      .ok_or_else(|| StoreError::NotFound(format!("order {}", id)))?;
    if order.status != from {
      return Err(StoreError::Conflict(format!(
        "order {} is {}, expected {}",
        id, order.status, from
      )));
    }
    order.status = to;
    order.updated_at = Utc::now();
    Ok(order.clone())
  }
}

fn sort_products(products: &mut [&Product], sort: ProductSort) {
  match sort {
    ProductSort::Newest => products.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
    ProductSort::PriceAsc => products.sort_by(|a, b| a.price.cmp(&b.price)),
    ProductSort::PriceDesc => products.sort_by(|a, b| b.price.cmp(&a.price)),
    ProductSort::NameAsc => products.sort_by(|a, b| a.name.cmp(&b.name)),
    ProductSort::NameDesc => products.sort_by(|a, b| b.name.cmp(&a.name)),
  }
}

#[async_trait]
impl CatalogStore for MemoryStore {
  async fn list_products(&self, query: &ProductQuery) -> StoreResult<ProductPage> {
    let state = self.state.lock().await;
    let mut matching: Vec<&Product> = state
      .products
      .values()
      .filter(|p| !p.is_archived)
      .filter(|p| {
        query.matches(
          &p.name,
          p.description.as_deref(),
          p.price,
          p.category_id,
          p.collection_id,
        )
      })
      .collect();
    sort_products(&mut matching, query.sort);

    let total = matching.len() as i64;
    let products = matching
      .into_iter()
      .skip(query.offset() as usize)
      .take(query.limit as usize)
      .map(|p| state.summary(p))
      .collect();
    Ok(ProductPage {
      products,
      pagination: Pagination::new(total, query.page, query.limit),
    })
  }

  async fn product_by_slug(&self, slug: &str) -> StoreResult<Option<ProductDetail>> {
    let state = self.state.lock().await;
    Ok(
      state
        .products
        .values()
        .find(|p| p.slug == slug && !p.is_archived)
        .map(|p| state.detail(p)),
    )
  }

  async fn product_by_id(&self, id: Uuid) -> StoreResult<Option<ProductDetail>> {
    let state = self.state.lock().await;
    Ok(state.products.get(&id).map(|p| state.detail(p)))
  }

  async fn new_arrivals(&self, limit: i64) -> StoreResult<Vec<ProductSummary>> {
    let state = self.state.lock().await;
    let mut live: Vec<&Product> = state.products.values().filter(|p| !p.is_archived).collect();
    sort_products(&mut live, ProductSort::Newest);
    Ok(live.into_iter().take(limit as usize).map(|p| state.summary(p)).collect())
  }

  async fn slug_exists(&self, slug: &str, excluding: Option<Uuid>) -> StoreResult<bool> {
    Ok(self.state.lock().await.slug_taken(slug, excluding))
  }

  async fn create_product(&self, input: NewProduct) -> StoreResult<ProductDetail> {
    let mut state = self.state.lock().await;
    let slug = input
      .slug
      .ok_or_else(|| StoreError::Internal("product slug not set".into()))?;
    if state.slug_taken(&slug, None) {
      return Err(StoreError::Conflict(format!("slug {}", slug)));
    }
    let now = Utc::now();
    let product = Product {
      id: Uuid::new_v4(),
      name: input.name,
      slug,
      description: input.description,
      price: input.price,
      in_stock: input.in_stock,
      is_archived: false,
      category_id: input.category_id,
      collection_id: input.collection_id,
      created_at: now,
      updated_at: now,
      archived_at: None,
    };
    state.replace_sizes(product.id, input.sizes);
    let detail = state.detail(&product);
    state.products.insert(product.id, product);
    Ok(detail)
  }

  async fn update_product(&self, id: Uuid, patch: ProductPatch) -> StoreResult<ProductDetail> {
    let mut state = self.state.lock().await;
    if let Some(slug) = &patch.slug {
      if state.slug_taken(slug, Some(id)) {
        return Err(StoreError::Conflict(format!("slug {}", slug)));
      }
    }
    let product = state
      .products
      .get_mut(&id)
      .ok_or_else(|| StoreError::NotFound(format!("product {}", id)))?;
    if let Some(name) = patch.name {
      product.name = name;
    }
    if let Some(slug) = patch.slug {
      product.slug = slug;
    }
    if patch.description.is_some() {
      product.description = patch.description;
    }
    if let Some(price) = patch.price {
      product.price = price;
    }
    if let Some(in_stock) = patch.in_stock {
      product.in_stock = in_stock;
    }
    if patch.category_id.is_some() {
      product.category_id = patch.category_id;
    }
    if patch.collection_id.is_some() {
      product.collection_id = patch.collection_id;
    }
    product.updated_at = Utc::now();
    let product = product.clone();

    if let Some(sizes) = patch.sizes {
      state.replace_sizes(id, sizes);
    }
    Ok(state.detail(&product))
  }

  async fn archive_product(&self, id: Uuid) -> StoreResult<Product> {
    let mut state = self.state.lock().await;
    let product = state
      .products
      .get_mut(&id)
      .ok_or_else(|| StoreError::NotFound(format!("product {}", id)))?;
    let now = Utc::now();
    product.is_archived = true;
    product.archived_at = Some(now);
    product.updated_at = now;
    Ok(product.clone())
  }

  async fn slugs_for(&self, product_ids: &[Uuid]) -> StoreResult<Vec<String>> {
    let state = self.state.lock().await;
    Ok(
      product_ids
        .iter()
        .filter_map(|id| state.products.get(id))
        .map(|p| p.slug.clone())
        .collect(),
    )
  }
}

fn name_taken(categories: &HashMap<Uuid, Category>, name: &str, excluding: Option<Uuid>) -> bool {
  categories
    .values()
    .any(|c| c.name == name && Some(c.id) != excluding)
}

#[async_trait]
impl CategoryStore for MemoryStore {
  async fn list_categories(&self) -> StoreResult<Vec<Category>> {
    let state = self.state.lock().await;
    let mut categories: Vec<Category> = state.categories.values().map(|c| state.counted_category(c)).collect();
    categories.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(categories)
  }

  async fn category_by_id(&self, id: Uuid) -> StoreResult<Option<Category>> {
    let state = self.state.lock().await;
    Ok(state.categories.get(&id).map(|c| state.counted_category(c)))
  }

  async fn category_name_taken(&self, name: &str, excluding: Option<Uuid>) -> StoreResult<bool> {
    Ok(name_taken(&self.state.lock().await.categories, name, excluding))
  }

  async fn create_category(&self, input: &CategoryInput) -> StoreResult<Category> {
    let mut state = self.state.lock().await;
    if name_taken(&state.categories, &input.name, None) {
      return Err(StoreError::Conflict(format!("category name {}", input.name)));
    }
    let now = Utc::now();
    let category = Category {
      id: Uuid::new_v4(),
      name: input.name.clone(),
      image_url: input.image_url.clone(),
      product_count: 0,
      created_at: now,
      updated_at: now,
    };
    state.categories.insert(category.id, category.clone());
    Ok(category)
  }

  async fn update_category(&self, id: Uuid, input: &CategoryInput) -> StoreResult<Category> {
    let mut state = self.state.lock().await;
    if name_taken(&state.categories, &input.name, Some(id)) {
      return Err(StoreError::Conflict(format!("category name {}", input.name)));
    }
    let category = state
      .categories
      .get_mut(&id)
      .ok_or_else(|| StoreError::NotFound(format!("category {}", id)))?;
    category.name = input.name.clone();
    category.image_url = input.image_url.clone();
    category.updated_at = Utc::now();
    let category = category.clone();
    Ok(state.counted_category(&category))
  }

  async fn delete_category(&self, id: Uuid) -> StoreResult<()> {
    let mut state = self.state.lock().await;
    let category = state
      .categories
      .get(&id)
      .ok_or_else(|| StoreError::NotFound(format!("category {}", id)))?;
    if state.counted_category(category).product_count > 0 {
      return Err(StoreError::Conflict(format!("category {} has products", id)));
    }
    state.categories.remove(&id);
    Ok(())
  }

  async fn list_collections(&self) -> StoreResult<Vec<Collection>> {
    let state = self.state.lock().await;
    let mut collections: Vec<Collection> = state.collections.values().map(|c| state.counted_collection(c)).collect();
    collections.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(collections)
  }

  async fn collection_by_id(&self, id: Uuid) -> StoreResult<Option<Collection>> {
    let state = self.state.lock().await;
    Ok(state.collections.get(&id).map(|c| state.counted_collection(c)))
  }

  async fn create_collection(&self, input: &CollectionInput) -> StoreResult<Collection> {
    let now = Utc::now();
    let collection = Collection {
      id: Uuid::new_v4(),
      name: input.name.clone(),
      description: input.description.clone(),
      available: input.available,
      collection_type: input.collection_type,
      discontinued_date: input.discontinued_date,
      product_count: 0,
      created_at: now,
      updated_at: now,
    };
    self
      .state
      .lock()
      .await
      .collections
      .insert(collection.id, collection.clone());
    Ok(collection)
  }

  async fn update_collection(&self, id: Uuid, input: &CollectionInput) -> StoreResult<Collection> {
    let mut state = self.state.lock().await;
    let collection = state
      .collections
      .get_mut(&id)
      .ok_or_else(|| StoreError::NotFound(format!("collection {}", id)))?;
    collection.name = input.name.clone();
    collection.description = input.description.clone();
    collection.available = input.available;
    collection.collection_type = input.collection_type;
    collection.discontinued_date = input.discontinued_date;
    collection.updated_at = Utc::now();
    let collection = collection.clone();
    Ok(state.counted_collection(&collection))
  }

  async fn delete_collection(&self, id: Uuid) -> StoreResult<()> {
    let mut state = self.state.lock().await;
    let collection = state
      .collections
      .get(&id)
      .ok_or_else(|| StoreError::NotFound(format!("collection {}", id)))?;
    if state.counted_collection(collection).product_count > 0 {
      return Err(StoreError::Conflict(format!("collection {} has products", id)));
    }
    state.collections.remove(&id);
    Ok(())
  }
}

#[async_trait]
impl StatsSource for MemoryStore {
  async fn admin_stats(&self) -> StoreResult<AdminStats> {
    let state = self.state.lock().await;
    let customers: HashSet<&str> = state
      .orders
      .values()
      .filter_map(|o| o.customer_email.as_deref())
      .collect();
    let revenue: Decimal = state
      .orders
      .values()
      .filter(|o| o.status == OrderStatus::Approved)
      .map(|o| o.total)
      .sum();
    Ok(AdminStats {
      total_products: state.products.values().filter(|p| !p.is_archived).count() as i64,
      total_orders: state.orders.len() as i64,
      total_customers: customers.len() as i64,
      total_revenue: revenue,
      categories: state.categories.len() as i64,
      collections: state.collections.len() as i64,
      low_stock_products: state
        .sizes
        .values()
        .flatten()
        .filter(|s| s.stock < LOW_STOCK_THRESHOLD)
        .count() as i64,
    })
  }
}
