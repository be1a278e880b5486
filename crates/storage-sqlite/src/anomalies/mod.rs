mod model;
mod repository;

pub use model::AnomalyDB;
pub use repository::AnomalyRepository;
