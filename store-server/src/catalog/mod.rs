//! Catalog Module
//!
//! The variant engine behind the product API: combination generation,
//! reference parsing/encoding, listing projection and single-item
//! resolution. Everything here is pure over already-fetched rows — the
//! repositories do the I/O.

pub mod generator;
pub mod listing;
pub mod reference;
pub mod resolve;

pub use generator::{EmptyAxes, GenerateError, GenerationInput, VariantOverride, generate_variants};
pub use listing::{ListingItem, SortKey};
pub use reference::{ProductKey, ProductRef, encode_virtual, virtual_id};
pub use resolve::{EffectiveView, ResolveError, Selection, effective_view, pick_variant};
