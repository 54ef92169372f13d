// server/src/main.rs

mod config;
mod errors;
mod state;
mod web;

use crate::config::{AppConfig, LogFormat};
use crate::state::AppState;

use actix_web::{web as actix_data, App, HttpServer};
use std::io;
use std::sync::Arc;
use storefront_core::dispatch::{LogNotifier, Notifier, TelegramNotifier};
use storefront_core::kv::{KvStore, MemoryKvStore, RedisKvStore};
use storefront_core::store::seed::seed_demo_catalog;
use storefront_core::store::{MemoryStore, PgStore};
use storefront_core::CatalogStore;
use tracing::Level;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::EnvFilter;

fn init_tracing(format: LogFormat) {
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(Level::INFO.as_str()));
  let builder = tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_span_events(FmtSpan::CLOSE);
  match format {
    LogFormat::Pretty => builder.init(),
    LogFormat::Json => builder.json().init(),
  }
}

fn startup_error(context: &str, err: impl std::fmt::Display) -> io::Error {
  tracing::error!(error = %err, "{}", context);
  io::Error::other(format!("{}: {}", context, err))
}

async fn seed_if_requested(config: &AppConfig, store: &dyn CatalogStore) {
  if !config.seed_db {
    return;
  }
  match seed_demo_catalog(store).await {
    Ok(added) => tracing::info!(added, "Demo catalog ready."),
    Err(e) => tracing::error!(error = %e, "Seeding the demo catalog failed."),
  }
}

#[actix_web::main]
async fn main() -> io::Result<()> {
  let app_config = match AppConfig::from_env() {
    Ok(cfg) => Arc::new(cfg),
    Err(e) => {
      init_tracing(LogFormat::Pretty);
      return Err(startup_error("Failed to load application configuration", e));
    }
  };
  init_tracing(app_config.log_format);
  tracing::info!("Starting storefront server...");

  let kv: Arc<dyn KvStore> = match &app_config.redis_url {
    Some(url) => {
      let store = RedisKvStore::connect(url, &app_config.redis_key_prefix)
        .await
        .map_err(|e| startup_error("Failed to connect to Redis", e))?;
      tracing::info!("Using Redis for cache and limits.");
      Arc::new(store)
    }
    None => {
      tracing::warn!("REDIS_URL not set, cache and limits are process-local.");
      Arc::new(MemoryKvStore::new())
    }
  };

  let notifier: Arc<dyn Notifier> = match (&app_config.telegram_bot_token, &app_config.telegram_chat_id) {
    (Some(token), Some(chat_id)) => Arc::new(TelegramNotifier::new(token.clone(), chat_id.clone())),
    _ => {
      tracing::warn!("Telegram credentials not set, order notifications are only logged.");
      Arc::new(LogNotifier)
    }
  };

  let (app_state, worker) = match &app_config.database_url {
    Some(url) => {
      let store = PgStore::connect(url)
        .await
        .map_err(|e| startup_error("Failed to connect to the database", e))?;
      tracing::info!("Successfully connected to the database.");
      seed_if_requested(&app_config, &store).await;
      AppState::build(app_config.clone(), store, kv, notifier)
    }
    None => {
      tracing::warn!("DATABASE_URL not set, running on the in-memory store.");
      let store = MemoryStore::new();
      seed_if_requested(&app_config, &store).await;
      AppState::build(app_config.clone(), store, kv, notifier)
    }
  };

  let server_address = app_config.bind_address();
  tracing::info!("Attempting to bind server to {}...", server_address);

  let result = HttpServer::new(move || {
    App::new()
      .app_data(actix_data::Data::new(app_state.clone()))
      .wrap(tracing_actix_web::TracingLogger::default())
      .configure(web::configure_app_routes)
  })
  .bind(&server_address)?
  .run()
  .await;

  worker.abort();
  result
}
