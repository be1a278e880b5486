//! Robust baseline estimation and anomaly detection over metric series.

mod anomalies_model;
mod anomalies_traits;
mod anomaly_detector;
mod baseline;

pub use anomalies_model::*;
pub use anomalies_traits::*;
pub use anomaly_detector::*;
pub use baseline::*;
