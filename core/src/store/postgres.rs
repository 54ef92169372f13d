// core/src/store/postgres.rs

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
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool, Postgres, QueryBuilder, Transaction};
use std::collections::HashMap;
use tracing::{debug, instrument};
use uuid::Uuid;

const PRODUCT_COLUMNS: &str = "id, name, slug, description, price, in_stock, is_archived, category_id, \
   collection_id, created_at, updated_at, archived_at";
const SIZE_COLUMNS: &str = "id, product_id, size, price, stock, reserved_stock";
const ORDER_COLUMNS: &str = "id, order_number, total, status, customer_name, customer_email, customer_phone, \
   shipping_address, payment_proof_url, created_at, updated_at";
const ITEM_COLUMNS: &str = "id, order_id, product_id, name, price, size, quantity";
const CATEGORY_SELECT: &str = "SELECT c.id, c.name, c.image_url, c.created_at, c.updated_at, \
   (SELECT COUNT(*) FROM products p WHERE p.category_id = c.id) AS product_count FROM categories c";
const COLLECTION_SELECT: &str = "SELECT c.id, c.name, c.description, c.available, c.collection_type, \
   c.discontinued_date, c.created_at, c.updated_at, \
   (SELECT COUNT(*) FROM products p WHERE p.collection_id = c.id) AS product_count FROM collections c";

/// Maps unique-constraint violations to `StoreError::Conflict`.
fn conflict_aware(e: sqlx::Error) -> StoreError {
  if let sqlx::Error::Database(db) = &e {
    if db.code().as_deref() == Some("23505") {
      return StoreError::Conflict(db.message().to_string());
    }
  }
  StoreError::Database(e)
}

/// Maps foreign-key violations (rows still referenced) to `StoreError::Conflict`.
fn in_use_aware(e: sqlx::Error) -> StoreError {
  if let sqlx::Error::Database(db) = &e {
    if db.code().as_deref() == Some("23503") {
      return StoreError::Conflict(db.message().to_string());
    }
  }
  StoreError::Database(e)
}

fn like_pattern(term: &str) -> String {
  let escaped = term.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_");
  format!("%{}%", escaped)
}

/// Postgres backend over a shared `PgPool`. Expects the tables from `schema.sql`.
#[derive(Clone)]
pub struct PgStore {
  pool: PgPool,
}

impl PgStore {
  pub fn new(pool: PgPool) -> Self {
    Self { pool }
  }

  pub async fn connect(database_url: &str) -> StoreResult<Self> {
    let pool = PgPool::connect(database_url).await?;
    Ok(Self::new(pool))
  }

  async fn sizes_for(&self, product_ids: &[Uuid]) -> StoreResult<HashMap<Uuid, Vec<ProductSize>>> {
    if product_ids.is_empty() {
      return Ok(HashMap::new());
    }
    let rows: Vec<ProductSize> = sqlx::query_as(&format!(
      "SELECT {} FROM product_sizes WHERE product_id = ANY($1) ORDER BY sort_order, size",
      SIZE_COLUMNS
    ))
    .bind(product_ids)
    .fetch_all(&self.pool)
    .await?;

    let mut grouped: HashMap<Uuid, Vec<ProductSize>> = HashMap::new();
    for row in rows {
      grouped.entry(row.product_id).or_default().push(row);
    }
    Ok(grouped)
  }

  async fn summaries(&self, products: &[Product]) -> StoreResult<Vec<ProductSummary>> {
    let ids: Vec<Uuid> = products.iter().map(|p| p.id).collect();
    let sizes = self.sizes_for(&ids).await?;
    Ok(
      products
        .iter()
        .map(|p| ProductSummary::from_parts(p, sizes.get(&p.id).map(Vec::as_slice).unwrap_or(&[])))
        .collect(),
    )
  }

  async fn detail(&self, product: Product) -> StoreResult<ProductDetail> {
    let sizes = self.sizes_for(&[product.id]).await?;
    Ok(ProductDetail::from_parts(
      &product,
      sizes.get(&product.id).map(Vec::as_slice).unwrap_or(&[]),
    ))
  }

  async fn attach_items(&self, mut orders: Vec<Order>) -> StoreResult<Vec<Order>> {
    if orders.is_empty() {
      return Ok(orders);
    }
    let ids: Vec<Uuid> = orders.iter().map(|o| o.id).collect();
    let items: Vec<OrderItem> = sqlx::query_as(&format!(
      "SELECT {} FROM order_items WHERE order_id = ANY($1) ORDER BY line_no",
      ITEM_COLUMNS
    ))
    .bind(&ids)
    .fetch_all(&self.pool)
    .await?;

    let mut by_order: HashMap<Uuid, Vec<OrderItem>> = HashMap::new();
    for item in items {
      by_order.entry(item.order_id).or_default().push(item);
    }
    for order in &mut orders {
      order.items = by_order.remove(&order.id).unwrap_or_default();
    }
    Ok(orders)
  }

  async fn write_sizes(conn: &mut PgConnection, product_id: Uuid, sizes: &[SizeInput]) -> StoreResult<()> {
    let labels: Vec<String> = sizes.iter().map(|s| s.size.clone()).collect();
    sqlx::query("DELETE FROM product_sizes WHERE product_id = $1 AND NOT (size = ANY($2))")
      .bind(product_id)
      .bind(&labels)
      .execute(&mut *conn)
      .await?;

    for (position, size) in sizes.iter().enumerate() {
      sqlx::query(
        "INSERT INTO product_sizes (id, product_id, size, price, stock, reserved_stock, sort_order) \
         VALUES ($1, $2, $3, $4, $5, 0, $6) \
         ON CONFLICT (product_id, size) DO UPDATE SET price = EXCLUDED.price, stock = EXCLUDED.stock, \
         sort_order = EXCLUDED.sort_order",
      )
      .bind(Uuid::new_v4())
      .bind(product_id)
      .bind(&size.size)
      .bind(size.price)
      .bind(size.stock)
      .bind(position as i32)
      .execute(&mut *conn)
      .await?;
    }
    Ok(())
  }
}

fn push_product_filters<'a>(qb: &mut QueryBuilder<'a, Postgres>, query: &'a ProductQuery) {
  if let Some(category) = query.category {
    qb.push(" AND category_id = ").push_bind(category);
  }
  if let Some(collection) = query.collection {
    qb.push(" AND collection_id = ").push_bind(collection);
  }
  if let Some(min) = query.min_price {
    qb.push(" AND price >= ").push_bind(min);
  }
  if let Some(max) = query.max_price {
    qb.push(" AND price <= ").push_bind(max);
  }
  if let Some(term) = &query.search {
    let pattern = like_pattern(term);
    qb.push(" AND (name ILIKE ")
      .push_bind(pattern.clone())
      .push(" OR description ILIKE ")
      .push_bind(pattern)
      .push(")");
  }
}

fn order_clause(sort: ProductSort) -> &'static str {
  match sort {
    ProductSort::Newest => "created_at DESC",
    ProductSort::PriceAsc => "price ASC",
    ProductSort::PriceDesc => "price DESC",
    ProductSort::NameAsc => "name ASC",
    ProductSort::NameDesc => "name DESC",
  }
}

/// Serializable transaction; `lock_entry` takes a row lock with `FOR UPDATE`.
struct PgStockTx {
  tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl StockTransaction for PgStockTx {
  async fn lock_entry(&mut self, product_id: Uuid, size: &str) -> StoreResult<Option<StockEntry>> {
    let entry: Option<StockEntry> = sqlx::query_as(
      "SELECT ps.product_id, ps.size, p.name AS product_name, ps.stock, ps.reserved_stock \
       FROM product_sizes ps JOIN products p ON p.id = ps.product_id \
       WHERE ps.product_id = $1 AND ps.size = $2 \
       FOR UPDATE OF ps",
    )
    .bind(product_id)
    .bind(size)
    .fetch_optional(&mut *self.tx)
    .await?;
    Ok(entry)
  }

  async fn adjust_stock(&mut self, product_id: Uuid, size: &str, delta: i32) -> StoreResult<()> {
    let result = sqlx::query(
      "UPDATE product_sizes SET stock = stock + $3, updated_at = NOW() WHERE product_id = $1 AND size = $2",
    )
    .bind(product_id)
    .bind(size)
    .bind(delta)
    .execute(&mut *self.tx)
    .await?;
    if result.rows_affected() == 0 {
      return Err(StoreError::NotFound(format!("stock entry {}/{}", product_id, size)));
    }
    Ok(())
  }

  async fn commit(self: Box<Self>) -> StoreResult<()> {
    self.tx.commit().await?;
    Ok(())
  }

  async fn rollback(self: Box<Self>) -> StoreResult<()> {
    self.tx.rollback().await?;
    Ok(())
  }
}

#[async_trait]
impl StockStore for PgStore {
  async fn begin(&self) -> StoreResult<Box<dyn StockTransaction>> {
    let mut tx = self.pool.begin().await?;
    sqlx::query("SET TRANSACTION ISOLATION LEVEL SERIALIZABLE")
      .execute(&mut *tx)
      .await?;
    Ok(Box::new(PgStockTx { tx }))
  }

  async fn find_entry(&self, product_id: Uuid, size: &str) -> StoreResult<Option<StockEntry>> {
    let entry = sqlx::query_as(
      "SELECT ps.product_id, ps.size, p.name AS product_name, ps.stock, ps.reserved_stock \
       FROM product_sizes ps JOIN products p ON p.id = ps.product_id \
       WHERE ps.product_id = $1 AND ps.size = $2",
    )
    .bind(product_id)
    .bind(size)
    .fetch_optional(&self.pool)
    .await?;
    Ok(entry)
  }
}

#[async_trait]
impl OrderStore for PgStore {
  async fn find_order(&self, id: Uuid) -> StoreResult<Option<Order>> {
    let order: Option<Order> = sqlx::query_as(&format!("SELECT {} FROM orders WHERE id = $1", ORDER_COLUMNS))
      .bind(id)
      .fetch_optional(&self.pool)
      .await?;
    match order {
      Some(order) => Ok(self.attach_items(vec![order]).await?.pop()),
      None => Ok(None),
    }
  }

  #[instrument(name = "PgStore::list_orders", skip(self))]
  async fn list_orders(&self, filter: &OrderFilter) -> StoreResult<Vec<Order>> {
    let mut qb: QueryBuilder<Postgres> = QueryBuilder::new(format!("SELECT {} FROM orders WHERE TRUE", ORDER_COLUMNS));
    if let Some(status) = filter.status {
      qb.push(" AND status = ").push_bind(status);
    }
    if let Some(term) = filter.search.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
      let pattern = like_pattern(term);
      qb.push(" AND (order_number ILIKE ")
        .push_bind(pattern.clone())
        .push(" OR customer_name ILIKE ")
        .push_bind(pattern.clone())
        .push(" OR customer_email ILIKE ")
        .push_bind(pattern.clone())
        .push(" OR customer_phone ILIKE ")
        .push_bind(pattern)
        .push(")");
    }
    qb.push(" ORDER BY created_at DESC");

    let orders: Vec<Order> = qb.build_query_as().fetch_all(&self.pool).await?;
    debug!(count = orders.len(), "Fetched orders.");
    self.attach_items(orders).await
  }

  #[instrument(name = "PgStore::create_order", skip_all, fields(order_number = %new_order.order_number))]
  async fn create_order(&self, new_order: NewOrder) -> StoreResult<Order> {
    let mut tx = self.pool.begin().await?;
    let order_id = Uuid::new_v4();

    let mut order: Order = sqlx::query_as(&format!(
      "INSERT INTO orders (id, order_number, total, status, customer_name, customer_email, customer_phone, \
       shipping_address, payment_proof_url) VALUES ($1, $2, $3, 'PENDING', $4, $5, $6, $7, $8) RETURNING {}",
      ORDER_COLUMNS
    ))
    .bind(order_id)
    .bind(&new_order.order_number)
    .bind(new_order.total)
    .bind(&new_order.customer_name)
    .bind(&new_order.customer_email)
    .bind(&new_order.customer_phone)
    .bind(&new_order.shipping_address)
    .bind(&new_order.payment_proof_url)
    .fetch_one(&mut *tx)
    .await
    .map_err(conflict_aware)?;

    for (line_no, item) in new_order.items.iter().enumerate() {
      let row: OrderItem = sqlx::query_as(&format!(
        "INSERT INTO order_items (id, order_id, product_id, name, price, size, quantity, line_no) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8) RETURNING {}",
        ITEM_COLUMNS
      ))
      .bind(Uuid::new_v4())
      .bind(order_id)
      .bind(item.product_id)
      .bind(&item.name)
      .bind(item.price)
      .bind(&item.size)
      .bind(item.quantity)
      .bind(line_no as i32)
      .fetch_one(&mut *tx)
      .await?;
      order.items.push(row);
    }

    tx.commit().await?;
    Ok(order)
  }

  #[instrument(name = "PgStore::update_status", skip(self))]
  async fn update_status(&self, id: Uuid, from: OrderStatus, to: OrderStatus) -> StoreResult<Order> {
    let order: Option<Order> = sqlx::query_as(&format!(
      "UPDATE orders SET status = $2, updated_at = NOW() WHERE id = $1 AND status = $3 RETURNING {}",
      ORDER_COLUMNS
    ))
    .bind(id)
    .bind(to)
    .bind(from)
    .fetch_optional(&self.pool)
    .await?;
    let Some(order) = order else {
      let current: Option<OrderStatus> = sqlx::query_scalar("SELECT status FROM orders WHERE id = $1")
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
      return Err(match current {
        Some(current) => StoreError::Conflict(format!("order {} is {}, expected {}", id, current, from)),
        None => StoreError::NotFound(format!("order {}", id)),
      });
    };
    self
      .attach_items(vec![order])
      .await?
      .pop()
      .ok_or_else(|| StoreError::Internal(format!("order {} vanished after update", id)))
  }
}

#[async_trait]
impl CatalogStore for PgStore {
  #[instrument(name = "PgStore::list_products", skip_all, fields(page = query.page))]
  async fn list_products(&self, query: &ProductQuery) -> StoreResult<ProductPage> {
    let mut count_qb: QueryBuilder<Postgres> =
      QueryBuilder::new("SELECT COUNT(*) FROM products WHERE is_archived = FALSE");
    push_product_filters(&mut count_qb, query);
    let total: i64 = count_qb.build_query_scalar().fetch_one(&self.pool).await?;

    let mut qb: QueryBuilder<Postgres> = QueryBuilder::new(format!(
      "SELECT {} FROM products WHERE is_archived = FALSE",
      PRODUCT_COLUMNS
    ));
    push_product_filters(&mut qb, query);
    qb.push(" ORDER BY ")
      .push(order_clause(query.sort))
      .push(" LIMIT ")
      .push_bind(query.limit)
      .push(" OFFSET ")
      .push_bind(query.offset());
    let products: Vec<Product> = qb.build_query_as().fetch_all(&self.pool).await?;

    Ok(ProductPage {
      products: self.summaries(&products).await?,
      pagination: Pagination::new(total, query.page, query.limit),
    })
  }

  async fn product_by_slug(&self, slug: &str) -> StoreResult<Option<ProductDetail>> {
    let product: Option<Product> = sqlx::query_as(&format!(
      "SELECT {} FROM products WHERE slug = $1 AND is_archived = FALSE",
      PRODUCT_COLUMNS
    ))
    .bind(slug)
    .fetch_optional(&self.pool)
    .await?;
    match product {
      Some(p) => Ok(Some(self.detail(p).await?)),
      None => Ok(None),
    }
  }

  async fn product_by_id(&self, id: Uuid) -> StoreResult<Option<ProductDetail>> {
    let product: Option<Product> = sqlx::query_as(&format!("SELECT {} FROM products WHERE id = $1", PRODUCT_COLUMNS))
      .bind(id)
      .fetch_optional(&self.pool)
      .await?;
    match product {
      Some(p) => Ok(Some(self.detail(p).await?)),
      None => Ok(None),
    }
  }

  async fn new_arrivals(&self, limit: i64) -> StoreResult<Vec<ProductSummary>> {
    let products: Vec<Product> = sqlx::query_as(&format!(
      "SELECT {} FROM products WHERE is_archived = FALSE ORDER BY created_at DESC LIMIT $1",
      PRODUCT_COLUMNS
    ))
    .bind(limit)
    .fetch_all(&self.pool)
    .await?;
    self.summaries(&products).await
  }

  async fn slug_exists(&self, slug: &str, excluding: Option<Uuid>) -> StoreResult<bool> {
    let exists: bool = sqlx::query_scalar(
      "SELECT EXISTS (SELECT 1 FROM products WHERE slug = $1 AND ($2::uuid IS NULL OR id <> $2))",
    )
    .bind(slug)
    .bind(excluding)
    .fetch_one(&self.pool)
    .await?;
    Ok(exists)
  }

  #[instrument(name = "PgStore::create_product", skip_all, fields(name = %input.name))]
  async fn create_product(&self, input: NewProduct) -> StoreResult<ProductDetail> {
    let slug = input
      .slug
      .clone()
      .ok_or_else(|| StoreError::Internal("product slug not set".into()))?;
    let mut tx = self.pool.begin().await?;

    let product: Product = sqlx::query_as(&format!(
      "INSERT INTO products (id, name, slug, description, price, in_stock, category_id, collection_id) \
       VALUES ($1, $2, $3, $4, $5, $6, $7, $8) RETURNING {}",
      PRODUCT_COLUMNS
    ))
    .bind(Uuid::new_v4())
    .bind(&input.name)
    .bind(&slug)
    .bind(&input.description)
    .bind(input.price)
    .bind(input.in_stock)
    .bind(input.category_id)
    .bind(input.collection_id)
    .fetch_one(&mut *tx)
    .await
    .map_err(conflict_aware)?;

    Self::write_sizes(&mut tx, product.id, &input.sizes).await?;
    tx.commit().await?;
    self.detail(product).await
  }

  #[instrument(name = "PgStore::update_product", skip(self, patch))]
  async fn update_product(&self, id: Uuid, patch: ProductPatch) -> StoreResult<ProductDetail> {
    let mut tx = self.pool.begin().await?;

    let product: Option<Product> = sqlx::query_as(&format!(
      "UPDATE products SET \
         name = COALESCE($2, name), \
         slug = COALESCE($3, slug), \
         description = COALESCE($4, description), \
         price = COALESCE($5, price), \
         in_stock = COALESCE($6, in_stock), \
         category_id = COALESCE($7, category_id), \
         collection_id = COALESCE($8, collection_id), \
         updated_at = NOW() \
       WHERE id = $1 RETURNING {}",
      PRODUCT_COLUMNS
    ))
    .bind(id)
    .bind(&patch.name)
    .bind(&patch.slug)
    .bind(&patch.description)
    .bind(patch.price)
    .bind(patch.in_stock)
    .bind(patch.category_id)
    .bind(patch.collection_id)
    .fetch_optional(&mut *tx)
    .await
    .map_err(conflict_aware)?;
    let product = product.ok_or_else(|| StoreError::NotFound(format!("product {}", id)))?;

    if let Some(sizes) = &patch.sizes {
      Self::write_sizes(&mut tx, id, sizes).await?;
    }
    tx.commit().await?;
    self.detail(product).await
  }

  async fn archive_product(&self, id: Uuid) -> StoreResult<Product> {
    let product: Option<Product> = sqlx::query_as(&format!(
      "UPDATE products SET is_archived = TRUE, archived_at = NOW(), updated_at = NOW() WHERE id = $1 RETURNING {}",
      PRODUCT_COLUMNS
    ))
    .bind(id)
    .fetch_optional(&self.pool)
    .await?;
    product.ok_or_else(|| StoreError::NotFound(format!("product {}", id)))
  }

  async fn slugs_for(&self, product_ids: &[Uuid]) -> StoreResult<Vec<String>> {
    if product_ids.is_empty() {
      return Ok(Vec::new());
    }
    let slugs: Vec<String> = sqlx::query_scalar("SELECT slug FROM products WHERE id = ANY($1)")
      .bind(product_ids)
      .fetch_all(&self.pool)
      .await?;
    Ok(slugs)
  }
}

#[async_trait]
impl CategoryStore for PgStore {
  async fn list_categories(&self) -> StoreResult<Vec<Category>> {
    let categories = sqlx::query_as(&format!("{} ORDER BY c.name", CATEGORY_SELECT))
      .fetch_all(&self.pool)
      .await?;
    Ok(categories)
  }

  async fn category_by_id(&self, id: Uuid) -> StoreResult<Option<Category>> {
    let category = sqlx::query_as(&format!("{} WHERE c.id = $1", CATEGORY_SELECT))
      .bind(id)
      .fetch_optional(&self.pool)
      .await?;
    Ok(category)
  }

  async fn category_name_taken(&self, name: &str, excluding: Option<Uuid>) -> StoreResult<bool> {
    let taken: bool = sqlx::query_scalar(
      "SELECT EXISTS (SELECT 1 FROM categories WHERE name = $1 AND ($2::uuid IS NULL OR id <> $2))",
    )
    .bind(name)
    .bind(excluding)
    .fetch_one(&self.pool)
    .await?;
    Ok(taken)
  }

  #[instrument(name = "PgStore::create_category", skip_all, fields(name = %input.name))]
  async fn create_category(&self, input: &CategoryInput) -> StoreResult<Category> {
    let id = Uuid::new_v4();
    sqlx::query("INSERT INTO categories (id, name, image_url) VALUES ($1, $2, $3)")
      .bind(id)
      .bind(&input.name)
      .bind(&input.image_url)
      .execute(&self.pool)
      .await
      .map_err(conflict_aware)?;
    self
      .category_by_id(id)
      .await?
      .ok_or_else(|| StoreError::Internal(format!("category {} vanished after insert", id)))
  }

  async fn update_category(&self, id: Uuid, input: &CategoryInput) -> StoreResult<Category> {
    let result = sqlx::query("UPDATE categories SET name = $2, image_url = $3, updated_at = NOW() WHERE id = $1")
      .bind(id)
      .bind(&input.name)
      .bind(&input.image_url)
      .execute(&self.pool)
      .await
      .map_err(conflict_aware)?;
    if result.rows_affected() == 0 {
      return Err(StoreError::NotFound(format!("category {}", id)));
    }
    self
      .category_by_id(id)
      .await?
      .ok_or_else(|| StoreError::NotFound(format!("category {}", id)))
  }

  async fn delete_category(&self, id: Uuid) -> StoreResult<()> {
    let result = sqlx::query("DELETE FROM categories WHERE id = $1")
      .bind(id)
      .execute(&self.pool)
      .await
      .map_err(in_use_aware)?;
    if result.rows_affected() == 0 {
      return Err(StoreError::NotFound(format!("category {}", id)));
    }
    Ok(())
  }

  async fn list_collections(&self) -> StoreResult<Vec<Collection>> {
    let collections = sqlx::query_as(&format!("{} ORDER BY c.name", COLLECTION_SELECT))
      .fetch_all(&self.pool)
      .await?;
    Ok(collections)
  }

  async fn collection_by_id(&self, id: Uuid) -> StoreResult<Option<Collection>> {
    let collection = sqlx::query_as(&format!("{} WHERE c.id = $1", COLLECTION_SELECT))
      .bind(id)
      .fetch_optional(&self.pool)
      .await?;
    Ok(collection)
  }

  #[instrument(name = "PgStore::create_collection", skip_all, fields(name = %input.name))]
  async fn create_collection(&self, input: &CollectionInput) -> StoreResult<Collection> {
    let id = Uuid::new_v4();
    sqlx::query(
      "INSERT INTO collections (id, name, description, available, collection_type, discontinued_date) \
       VALUES ($1, $2, $3, $4, $5, $6)",
    )
    .bind(id)
    .bind(&input.name)
    .bind(&input.description)
    .bind(input.available)
    .bind(input.collection_type)
    .bind(input.discontinued_date)
    .execute(&self.pool)
    .await?;
    self
      .collection_by_id(id)
      .await?
      .ok_or_else(|| StoreError::Internal(format!("collection {} vanished after insert", id)))
  }

  async fn update_collection(&self, id: Uuid, input: &CollectionInput) -> StoreResult<Collection> {
    let result = sqlx::query(
      "UPDATE collections SET name = $2, description = $3, available = $4, collection_type = $5, \
       discontinued_date = $6, updated_at = NOW() WHERE id = $1",
    )
    .bind(id)
    .bind(&input.name)
    .bind(&input.description)
    .bind(input.available)
    .bind(input.collection_type)
    .bind(input.discontinued_date)
    .execute(&self.pool)
    .await?;
    if result.rows_affected() == 0 {
      return Err(StoreError::NotFound(format!("collection {}", id)));
    }
    self
      .collection_by_id(id)
      .await?
      .ok_or_else(|| StoreError::NotFound(format!("collection {}", id)))
  }

  async fn delete_collection(&self, id: Uuid) -> StoreResult<()> {
    let result = sqlx::query("DELETE FROM collections WHERE id = $1")
      .bind(id)
      .execute(&self.pool)
      .await
      .map_err(in_use_aware)?;
    if result.rows_affected() == 0 {
      return Err(StoreError::NotFound(format!("collection {}", id)));
    }
    Ok(())
  }
}

#[async_trait]
impl StatsSource for PgStore {
  async fn admin_stats(&self) -> StoreResult<AdminStats> {
    let total_products: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE is_archived = FALSE")
      .fetch_one(&self.pool)
      .await?;
    let total_orders: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM orders")
      .fetch_one(&self.pool)
      .await?;
    let total_customers: i64 =
      sqlx::query_scalar("SELECT COUNT(DISTINCT customer_email) FROM orders WHERE customer_email IS NOT NULL")
        .fetch_one(&self.pool)
        .await?;
    let categories: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM categories")
      .fetch_one(&self.pool)
      .await?;
    let collections: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM collections")
      .fetch_one(&self.pool)
      .await?;

    let total_revenue: Decimal =
      sqlx::query_scalar("SELECT COALESCE(SUM(total), 0) FROM orders WHERE status = 'APPROVED'")
        .fetch_one(&self.pool)
        .await?;
    let low_stock_products: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM product_sizes WHERE stock < $1")
      .bind(LOW_STOCK_THRESHOLD)
      .fetch_one(&self.pool)
      .await?;

    Ok(AdminStats {
      total_products,
      total_orders,
      total_customers,
      total_revenue,
      categories,
      collections,
      low_stock_products,
    })
  }
}
