//! Sync cursors and run history.

mod model;
mod repository;

pub use model::{SyncRunDB, SyncStateDB};
pub use repository::SyncStateRepository;
