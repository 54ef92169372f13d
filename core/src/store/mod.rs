// core/src/store/mod.rs

//! Storage backends. Each backend implements every store trait so the server
//! can pick one at startup.

mod memory;
mod postgres;
pub mod seed;

pub use memory::MemoryStore;
pub use postgres::PgStore;
