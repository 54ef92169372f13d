// server/src/web/handlers/sse_handlers.rs

use actix_web::web::{self, Bytes};
use actix_web::HttpResponse;
use futures_util::{stream, StreamExt};
use std::convert::Infallible;
use storefront_core::dispatch::broadcast::{connection_message, sse_frame};
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, instrument, warn};

use crate::state::AppState;

/// `text/event-stream` of product updates: a connection frame, the last
/// stored update if any, then every update published while connected.
#[instrument(name = "handler::product_updates", skip(app_state))]
pub async fn product_updates_handler(app_state: web::Data<AppState>) -> HttpResponse {
  // Subscribe before reading the stored update so nothing published in
  // between is missed.
  let rx = app_state.hub.subscribe();

  let mut opening = vec![sse_frame(&connection_message())];
  if let Some(last) = app_state.hub.last_update().await {
    opening.push(sse_frame(&last));
  }
  info!(subscribers = app_state.hub.subscriber_count(), "SSE client connected.");

  let live = stream::unfold(rx, |mut rx| async move {
    loop {
      match rx.recv().await {
        Ok(update) => return Some((sse_frame(&update), rx)),
        Err(RecvError::Lagged(skipped)) => warn!(skipped, "SSE client fell behind, updates dropped."),
        Err(RecvError::Closed) => return None,
      }
    }
  });

  let frames = stream::iter(opening)
    .chain(live)
    .map(|frame| Ok::<_, Infallible>(Bytes::from(frame)));

  HttpResponse::Ok()
    .content_type("text/event-stream")
    .insert_header(("Cache-Control", "no-cache"))
    .insert_header(("Connection", "keep-alive"))
    .streaming(frames)
}
