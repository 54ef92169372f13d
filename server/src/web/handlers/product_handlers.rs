// server/src/web/handlers/product_handlers.rs

use actix_web::{web, HttpResponse};
use rust_decimal::Decimal;
use serde::Deserialize;
use storefront_core::catalog::{ProductQuery, ProductSort};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::errors::AppError;
use crate::state::AppState;
use crate::web::extractors::RateLimited;

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct ListProductsQuery {
  pub category: Option<Uuid>,
  pub collection: Option<Uuid>,
  pub search: Option<String>,
  pub min_price: Option<Decimal>,
  pub max_price: Option<Decimal>,
  pub sort: Option<String>,
  pub page: Option<i64>,
  pub limit: Option<i64>,
}

impl From<ListProductsQuery> for ProductQuery {
  fn from(q: ListProductsQuery) -> Self {
    let defaults = ProductQuery::default();
    ProductQuery {
      category: q.category,
      collection: q.collection,
      search: q.search,
      min_price: q.min_price,
      max_price: q.max_price,
      sort: q
        .sort
        .as_deref()
        .and_then(|s| s.parse::<ProductSort>().ok())
        .unwrap_or(defaults.sort),
      page: q.page.unwrap_or(defaults.page),
      limit: q.limit.unwrap_or(defaults.limit),
    }
  }
}

#[instrument(name = "handler::list_products", skip(app_state, query_params, rate))]
pub async fn list_products_handler(
  app_state: web::Data<AppState>,
  query_params: web::Query<ListProductsQuery>,
  rate: RateLimited,
) -> Result<HttpResponse, AppError> {
  let page = app_state.catalog.list(query_params.into_inner().into()).await?;
  info!(
    returned = page.products.len(),
    total = page.pagination.total,
    "Products listed."
  );
  Ok(rate.decorate(&mut HttpResponse::Ok()).json(page))
}

#[instrument(name = "handler::get_product", skip(app_state, path, rate), fields(slug = %path.as_ref()))]
pub async fn get_product_handler(
  app_state: web::Data<AppState>,
  path: web::Path<String>,
  rate: RateLimited,
) -> Result<HttpResponse, AppError> {
  let detail = app_state.catalog.detail(&path.into_inner()).await?;
  Ok(rate.decorate(&mut HttpResponse::Ok()).json(detail))
}

#[instrument(name = "handler::new_arrivals", skip(app_state, rate))]
pub async fn new_arrivals_handler(app_state: web::Data<AppState>, rate: RateLimited) -> Result<HttpResponse, AppError> {
  let products = app_state.catalog.new_arrivals().await?;
  Ok(rate.decorate(&mut HttpResponse::Ok()).json(products))
}
