use async_trait::async_trait;

use super::{CatalogEntity, EntityType};
use crate::errors::Result;

#[async_trait]
pub trait CatalogRepositoryTrait: Send + Sync {
    /// Upserts every entity in one transaction. Conflicts on
    /// `(profile_id, entity_type, entity_id)` overwrite the stored row.
    async fn upsert_entities(&self, entities: Vec<CatalogEntity>) -> Result<usize>;

    fn get_entity(
        &self,
        profile_id: &str,
        entity_type: EntityType,
        entity_id: &str,
    ) -> Result<Option<CatalogEntity>>;

    fn count_entities(&self, profile_id: &str, entity_type: EntityType) -> Result<i64>;
}
