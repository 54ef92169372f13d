// core/src/models/taxonomy.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type as SqlxType};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Category {
  pub id: Uuid,
  pub name: String,
  pub image_url: Option<String>,
  /// Products pointing at this category, archived ones included.
  pub product_count: i64,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

/// Stored in the `collection_type` Postgres enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, SqlxType)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "collection_type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CollectionType {
  #[default]
  Current,
  Discontinued,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Collection {
  pub id: Uuid,
  pub name: String,
  pub description: String,
  pub available: bool,
  pub collection_type: CollectionType,
  pub discontinued_date: Option<DateTime<Utc>>,
  pub product_count: i64,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn collection_type_uses_upper_case_names() {
    assert_eq!(serde_json::to_string(&CollectionType::Discontinued).unwrap(), "\"DISCONTINUED\"");
    let parsed: CollectionType = serde_json::from_str("\"CURRENT\"").unwrap();
    assert_eq!(parsed, CollectionType::default());
  }
}
