//! Alerts raised from anomalies and their outbound notification queue.

mod alert_dispatcher;
mod alerts_model;
mod alerts_traits;

pub use alert_dispatcher::*;
pub use alerts_model::*;
pub use alerts_traits::*;
