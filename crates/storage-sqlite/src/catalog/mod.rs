mod model;
mod repository;

pub use model::CatalogEntityDB;
pub use repository::CatalogRepository;
