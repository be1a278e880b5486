mod model;
mod repository;

pub use model::{ProfileDB, ProfileTokenDB};
pub use repository::ProfileRepository;
