// core/src/models/mod.rs

//! Data structures for database entities and their API shapes.

pub mod order;
pub mod product;
pub mod stock;
pub mod taxonomy;

pub use order::{NewOrder, NewOrderItem, Order, OrderItem, OrderStatus, UnknownOrderStatus};
pub use product::{slugify, Product, ProductDetail, ProductSize, ProductSizeView, ProductSummary};
pub use stock::{StockEntry, StockLine};
pub use taxonomy::{Category, Collection, CollectionType};
