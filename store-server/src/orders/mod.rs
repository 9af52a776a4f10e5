//! Orders Module
//!
//! Order creation with idempotency, price verification and atomic
//! persistence, plus the best-effort identity enrichment client.

pub mod creator;
pub mod identity;

pub use creator::{CheckoutOutcome, create_order};
pub use identity::IdentityClient;
