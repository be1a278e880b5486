//! SQLite storage for adpulse, built on diesel.
//!
//! Reads go through the r2d2 pool; writes go through the single writer actor.

pub mod alerts;
pub mod anomalies;
pub mod catalog;
pub mod db;
pub mod errors;
pub mod metrics;
pub mod profiles;
pub mod schema;
pub mod sync;
pub mod utils;

pub use alerts::AlertRepository;
pub use anomalies::AnomalyRepository;
pub use catalog::CatalogRepository;
pub use db::{create_pool, get_connection, init, run_migrations, spawn_writer, DbPool, WriteHandle};
pub use errors::StorageError;
pub use metrics::MetricFactRepository;
pub use profiles::ProfileRepository;
pub use sync::SyncStateRepository;
