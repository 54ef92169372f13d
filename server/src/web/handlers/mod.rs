// server/src/web/handlers/mod.rs

pub mod admin_handlers;
pub mod order_handlers;
pub mod product_handlers;
pub mod sse_handlers;
pub mod taxonomy_handlers;
