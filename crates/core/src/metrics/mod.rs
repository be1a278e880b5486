//! Performance facts and the metrics derived from them.

mod metric_aggregator;
mod metrics_model;
mod metrics_traits;

pub use metric_aggregator::*;
pub use metrics_model::*;
pub use metrics_traits::*;
