//! Advertiser profiles, their regions and stored API credentials.

mod profiles_model;
mod profiles_traits;

pub use profiles_model::*;
pub use profiles_traits::*;
