//! Data models
//!
//! Shared between the store server and its API consumers.
//! DB row types use `#[cfg_attr(feature = "db", derive(sqlx::FromRow))]`.
//! All IDs are `i64` (SQLite INTEGER PRIMARY KEY); all amounts are i64
//! minor currency units.

pub mod category;
pub mod order;
pub mod product;
pub mod variant;

// Re-exports
pub use category::*;
pub use order::*;
pub use product::*;
pub use variant::*;
