//! Campaign-hierarchy catalog: remote record normalization and idempotent upserts.

mod catalog_model;
mod catalog_traits;
mod entity_upserter;
mod normalize;

pub use catalog_model::*;
pub use catalog_traits::*;
pub use entity_upserter::*;
pub use normalize::*;
