// core/src/dispatch/notifier.rs

use crate::models::Order;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;
use tracing::{info, instrument, warn};

#[derive(Debug, Error)]
pub enum NotifyError {
  #[error("Notifier is not configured")]
  NotConfigured,

  #[error("HTTP error talking to the chat API: {0}")]
  Http(#[from] reqwest::Error),

  #[error("Chat API rejected the message: {0}")]
  Api(String),
}

/// Outbound admin chat channel.
#[async_trait]
pub trait Notifier: Send + Sync {
  async fn send_message(&self, text: &str) -> Result<(), NotifyError>;

  fn is_configured(&self) -> bool;
}

/// Sends HTML messages through the Telegram Bot API.
pub struct TelegramNotifier {
  client: reqwest::Client,
  api_base: String,
  bot_token: String,
  chat_id: String,
}

#[derive(Debug, Deserialize)]
struct TelegramResponse {
  ok: bool,
  description: Option<String>,
}

impl TelegramNotifier {
  pub fn new(bot_token: impl Into<String>, chat_id: impl Into<String>) -> Self {
    Self::with_api_base("https://api.telegram.org", bot_token, chat_id)
  }

  pub fn with_api_base(
    api_base: impl Into<String>,
    bot_token: impl Into<String>,
    chat_id: impl Into<String>,
  ) -> Self {
    Self {
      client: reqwest::Client::new(),
      api_base: api_base.into(),
      bot_token: bot_token.into(),
      chat_id: chat_id.into(),
    }
  }
}

#[async_trait]
impl Notifier for TelegramNotifier {
  #[instrument(name = "TelegramNotifier::send_message", skip_all)]
  async fn send_message(&self, text: &str) -> Result<(), NotifyError> {
    let url = format!("{}/bot{}/sendMessage", self.api_base, self.bot_token);
    let resp: TelegramResponse = self
      .client
      .post(url)
      .json(&json!({
        "chat_id": self.chat_id,
        "text": text,
        "parse_mode": "HTML",
        "disable_web_page_preview": false,
      }))
      .send()
      .await?
      .json()
      .await?;

    if !resp.ok {
      return Err(NotifyError::Api(
        resp.description.unwrap_or_else(|| "unknown error".to_string()),
      ));
    }
    info!("Telegram message delivered.");
    Ok(())
  }

  fn is_configured(&self) -> bool {
    true
  }
}

/// Fallback when no chat credentials are configured: messages are only logged.
#[derive(Debug, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
  async fn send_message(&self, text: &str) -> Result<(), NotifyError> {
    warn!(chars = text.len(), "Chat notifier not configured, message dropped.");
    Err(NotifyError::NotConfigured)
  }

  fn is_configured(&self) -> bool {
    false
  }
}

pub const TEST_MESSAGE: &str = "🤖 Telegram bot is working correctly!";

fn escape_html(raw: &str) -> String {
  raw
    .replace('&', "&amp;")
    .replace('<', "&lt;")
    .replace('>', "&gt;")
}

/// New-order message in Telegram HTML.
pub fn format_order_message(order: &Order) -> String {
  let items = order
    .items
    .iter()
    .map(|item| {
      format!(
        "• {} ({}) - Qty: {} - ${:.2}",
        escape_html(&item.name),
        escape_html(&item.size),
        item.quantity,
        item.price
      )
    })
    .collect::<Vec<_>>()
    .join("\n");

  let mut msg = String::new();
  msg.push_str("🛍️ <b>NEW ORDER RECEIVED</b>\n\n");
  msg.push_str("📋 <b>Order Details:</b>\n");
  msg.push_str(&format!("Order #: <code>{}</code>\n", escape_html(&order.order_number)));
  msg.push_str(&format!("Total: <b>${:.2}</b>\n", order.total));
  msg.push_str(&format!("Date: {}\n\n", order.created_at.format("%Y-%m-%d %H:%M:%S UTC")));
  msg.push_str("👤 <b>Customer Info:</b>\n");
  msg.push_str(&format!("Name: {}\n", escape_html(&order.customer_name)));
  msg.push_str(&format!("Phone: {}\n", escape_html(&order.customer_phone)));
  if let Some(email) = &order.customer_email {
    msg.push_str(&format!("Email: {}\n", escape_html(email)));
  }
  msg.push_str("\n📦 <b>Items:</b>\n");
  msg.push_str(&items);
  msg.push_str("\n\n🏠 <b>Shipping Address:</b>\n");
  msg.push_str(&escape_html(&order.shipping_address));
  if let Some(proof) = &order.payment_proof_url {
    msg.push_str(&format!("\n\n💳 <b>Payment Proof:</b> {}", escape_html(proof)));
  }
  msg.push_str("\n\n---\nPlease process this order as soon as possible.");
  msg
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::models::{OrderItem, OrderStatus};
  use chrono::Utc;
  use rust_decimal::Decimal;
  use uuid::Uuid;

  fn order() -> Order {
    let id = Uuid::new_v4();
    Order {
      id,
      order_number: "ORD-1-ABCDE".into(),
      total: Decimal::new(4550, 2),
      status: OrderStatus::Pending,
      customer_name: "Ana <script>".into(),
      customer_email: None,
      customer_phone: "+1 555 0100".into(),
      shipping_address: "12 Main St, Lima".into(),
      payment_proof_url: Some("/uploads/proof.png".into()),
      created_at: Utc::now(),
      updated_at: Utc::now(),
      items: vec![OrderItem {
        id: Uuid::new_v4(),
        order_id: id,
        product_id: Uuid::new_v4(),
        name: "Tee".into(),
        price: Decimal::new(2275, 2),
        size: "M".into(),
        quantity: 2,
      }],
    }
  }

  #[test]
  fn order_message_lists_items_and_escapes_markup() {
    let msg = format_order_message(&order());
    assert!(msg.contains("<code>ORD-1-ABCDE</code>"));
    assert!(msg.contains("Total: <b>$45.50</b>"));
    assert!(msg.contains("• Tee (M) - Qty: 2 - $22.75"));
    assert!(msg.contains("Ana &lt;script&gt;"));
    assert!(msg.contains("Payment Proof:</b> /uploads/proof.png"));
    assert!(!msg.contains("Email:"));
  }

  #[tokio::test]
  async fn log_notifier_reports_not_configured() {
    let notifier = LogNotifier;
    assert!(!notifier.is_configured());
    assert!(matches!(
      notifier.send_message("hi").await,
      Err(NotifyError::NotConfigured)
    ));
  }
}
