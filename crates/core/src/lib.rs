//! Core domain for adpulse: campaign catalog sync, metric aggregation and
//! robust anomaly detection over advertising performance data.

pub mod alerts;
pub mod anomalies;
pub mod catalog;
pub mod errors;
pub mod metrics;
pub mod profiles;
pub mod sync;
pub mod utils;

pub use errors::{Error, Result};
