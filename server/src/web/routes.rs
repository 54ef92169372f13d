// server/src/web/routes.rs

use actix_web::{error::JsonPayloadError, web, HttpRequest, HttpResponse};

use crate::errors::AppError;
use crate::web::handlers::{admin_handlers, order_handlers, product_handlers, sse_handlers, taxonomy_handlers};

async fn health_check_handler() -> HttpResponse {
  HttpResponse::Ok().json(serde_json::json!({ "status": "ok" }))
}

/// Malformed JSON bodies answer like every other validation failure.
fn json_error_handler(err: JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
  AppError::Validation(format!("Invalid request body: {}", err)).into()
}

pub fn json_config() -> web::JsonConfig {
  web::JsonConfig::default().error_handler(json_error_handler)
}

pub fn configure_app_routes(cfg: &mut web::ServiceConfig) {
  cfg.service(
    web::scope("/api")
      .app_data(json_config())
      .route("/health", web::get().to(health_check_handler))
      // Storefront
      .service(
        web::scope("/products")
          .route("", web::get().to(product_handlers::list_products_handler))
          // Registered before `/{slug}` so it is not read as a slug.
          .route("/new-arrivals", web::get().to(product_handlers::new_arrivals_handler))
          .route("/{slug}", web::get().to(product_handlers::get_product_handler)),
      )
      .route("/orders", web::post().to(order_handlers::create_order_handler))
      .route(
        "/purchase-limit/check",
        web::get().to(order_handlers::purchase_limit_check_handler),
      )
      .route(
        "/sse/product-updates",
        web::get().to(sse_handlers::product_updates_handler),
      )
      // Admin
      .service(
        web::scope("/admin")
          .route("/orders", web::get().to(admin_handlers::list_orders_handler))
          .route("/orders/{id}", web::get().to(admin_handlers::get_order_handler))
          .route("/orders/{id}", web::patch().to(admin_handlers::update_order_status_handler))
          .route("/orders/{id}/stock-check", web::get().to(admin_handlers::stock_check_handler))
          .route("/products", web::post().to(admin_handlers::create_product_handler))
          .route("/products/{id}", web::put().to(admin_handlers::update_product_handler))
          .route("/products/{id}", web::delete().to(admin_handlers::archive_product_handler))
          .route("/categories", web::get().to(taxonomy_handlers::list_categories_handler))
          .route("/categories", web::post().to(taxonomy_handlers::create_category_handler))
          .route("/categories/{id}", web::get().to(taxonomy_handlers::get_category_handler))
          .route("/categories/{id}", web::put().to(taxonomy_handlers::update_category_handler))
          .route("/categories/{id}", web::delete().to(taxonomy_handlers::delete_category_handler))
          .route("/collections", web::get().to(taxonomy_handlers::list_collections_handler))
          .route("/collections", web::post().to(taxonomy_handlers::create_collection_handler))
          .route("/collections/{id}", web::get().to(taxonomy_handlers::get_collection_handler))
          .route("/collections/{id}", web::put().to(taxonomy_handlers::update_collection_handler))
          .route("/collections/{id}", web::delete().to(taxonomy_handlers::delete_collection_handler))
          .route("/stats", web::get().to(admin_handlers::stats_handler))
          .route("/cache/invalidate", web::post().to(admin_handlers::invalidate_cache_handler))
          .route("/telegram/test", web::post().to(admin_handlers::telegram_test_handler)),
      ),
  );
}
