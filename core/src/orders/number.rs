// core/src/orders/number.rs

use uuid::Uuid;

const ALPHABET: &[u8; 36] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// `ORD-<unix millis>-<5 random base-36 characters>`, upper case.
pub fn generate_order_number() -> String {
  let millis = chrono::Utc::now().timestamp_millis();
  let mut entropy = Uuid::new_v4().as_u128();
  let mut suffix = String::with_capacity(5);
  for _ in 0..5 {
    suffix.push(ALPHABET[(entropy % 36) as usize] as char);
    entropy /= 36;
  }
  format!("ORD-{}-{}", millis, suffix)
}
