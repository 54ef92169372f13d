// server/src/web/handlers/taxonomy_handlers.rs

use actix_web::{web, HttpResponse};
use serde_json::json;
use storefront_core::catalog::{CategoryInput, CategoryPatch, CollectionInput, CollectionPatch};
use tracing::instrument;
use uuid::Uuid;

use crate::errors::AppError;
use crate::state::AppState;

// --- Categories ---

#[instrument(name = "handler::admin_list_categories", skip(app_state))]
pub async fn list_categories_handler(app_state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
  let categories = app_state.taxonomy.categories().await?;
  Ok(HttpResponse::Ok().json(categories))
}

#[instrument(name = "handler::admin_get_category", skip(app_state, path), fields(category_id = %path.as_ref()))]
pub async fn get_category_handler(app_state: web::Data<AppState>, path: web::Path<Uuid>) -> Result<HttpResponse, AppError> {
  let category = app_state.taxonomy.category(path.into_inner()).await?;
  Ok(HttpResponse::Ok().json(category))
}

#[instrument(name = "handler::admin_create_category", skip(app_state, req_payload))]
pub async fn create_category_handler(
  app_state: web::Data<AppState>,
  req_payload: web::Json<CategoryInput>,
) -> Result<HttpResponse, AppError> {
  let category = app_state.taxonomy.create_category(req_payload.into_inner()).await?;
  Ok(HttpResponse::Created().json(category))
}

#[instrument(name = "handler::admin_update_category", skip(app_state, path, req_payload), fields(category_id = %path.as_ref()))]
pub async fn update_category_handler(
  app_state: web::Data<AppState>,
  path: web::Path<Uuid>,
  req_payload: web::Json<CategoryPatch>,
) -> Result<HttpResponse, AppError> {
  let category = app_state
    .taxonomy
    .update_category(path.into_inner(), req_payload.into_inner())
    .await?;
  Ok(HttpResponse::Ok().json(category))
}

#[instrument(name = "handler::admin_delete_category", skip(app_state, path), fields(category_id = %path.as_ref()))]
pub async fn delete_category_handler(
  app_state: web::Data<AppState>,
  path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
  app_state.taxonomy.delete_category(path.into_inner()).await?;
  Ok(HttpResponse::Ok().json(json!({ "success": true })))
}

// --- Collections ---

#[instrument(name = "handler::admin_list_collections", skip(app_state))]
pub async fn list_collections_handler(app_state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
  let collections = app_state.taxonomy.collections().await?;
  Ok(HttpResponse::Ok().json(collections))
}

#[instrument(name = "handler::admin_get_collection", skip(app_state, path), fields(collection_id = %path.as_ref()))]
pub async fn get_collection_handler(
  app_state: web::Data<AppState>,
  path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
  let collection = app_state.taxonomy.collection(path.into_inner()).await?;
  Ok(HttpResponse::Ok().json(collection))
}

#[instrument(name = "handler::admin_create_collection", skip(app_state, req_payload))]
pub async fn create_collection_handler(
  app_state: web::Data<AppState>,
  req_payload: web::Json<CollectionInput>,
) -> Result<HttpResponse, AppError> {
  let collection = app_state.taxonomy.create_collection(req_payload.into_inner()).await?;
  Ok(HttpResponse::Created().json(collection))
}

#[instrument(name = "handler::admin_update_collection", skip(app_state, path, req_payload), fields(collection_id = %path.as_ref()))]
pub async fn update_collection_handler(
  app_state: web::Data<AppState>,
  path: web::Path<Uuid>,
  req_payload: web::Json<CollectionPatch>,
) -> Result<HttpResponse, AppError> {
  let collection = app_state
    .taxonomy
    .update_collection(path.into_inner(), req_payload.into_inner())
    .await?;
  Ok(HttpResponse::Ok().json(collection))
}

#[instrument(name = "handler::admin_delete_collection", skip(app_state, path), fields(collection_id = %path.as_ref()))]
pub async fn delete_collection_handler(
  app_state: web::Data<AppState>,
  path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
  app_state.taxonomy.delete_collection(path.into_inner()).await?;
  Ok(HttpResponse::Ok().json(json!({ "message": "Collection deleted successfully" })))
}
