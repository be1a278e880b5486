//! Incremental catalog sync: paging, run bookkeeping and watermarks.

mod paged_fetcher;
mod sync_model;
mod sync_orchestrator;
mod sync_traits;

pub use paged_fetcher::*;
pub use sync_model::*;
pub use sync_orchestrator::*;
pub use sync_traits::*;
