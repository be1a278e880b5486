mod model;
mod repository;

pub use model::{AlertDB, NotificationChannelDB, NotificationQueueDB};
pub use repository::AlertRepository;
