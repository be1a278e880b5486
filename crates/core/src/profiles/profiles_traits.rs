use async_trait::async_trait;

use super::{Profile, StoredToken};
use crate::errors::Result;

pub trait ProfileRepositoryTrait: Send + Sync {
    fn get_profile(&self, profile_id: &str) -> Result<Option<Profile>>;
    fn list_active_profiles(&self) -> Result<Vec<Profile>>;
}

#[async_trait]
pub trait CredentialRepositoryTrait: Send + Sync {
    fn get_token(&self, profile_id: &str) -> Result<Option<StoredToken>>;
    async fn save_token(&self, token: StoredToken) -> Result<()>;
}

/// Supplies a bearer token that is valid for at least the refresh margin.
#[async_trait]
pub trait AccessTokenProvider: Send + Sync {
    async fn ensure_access_token(&self, profile: &Profile) -> Result<String>;
}
