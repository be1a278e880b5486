use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use diesel::prelude::*;
use diesel::r2d2::{self, Pool};
use diesel::SqliteConnection;
use log::debug;

use adpulse_core::catalog::{CatalogEntity, CatalogRepositoryTrait, EntityType};
use adpulse_core::Result;

use super::model::CatalogEntityDB;
use crate::db::{get_connection, WriteHandle};
use crate::errors::StorageError;
use crate::schema::catalog_entities;
use crate::utils::{enum_to_db, ts_to_db};

pub struct CatalogRepository {
    pool: Arc<Pool<r2d2::ConnectionManager<SqliteConnection>>>,
    writer: WriteHandle,
}

impl CatalogRepository {
    pub fn new(
        pool: Arc<Pool<r2d2::ConnectionManager<SqliteConnection>>>,
        writer: WriteHandle,
    ) -> Self {
        CatalogRepository { pool, writer }
    }
}

#[async_trait]
impl CatalogRepositoryTrait for CatalogRepository {
    async fn upsert_entities(&self, entities: Vec<CatalogEntity>) -> Result<usize> {
        if entities.is_empty() {
            return Ok(0);
        }
        let synced_at = ts_to_db(&Utc::now());
        let rows = entities
            .into_iter()
            .map(|entity| CatalogEntityDB::from_domain(entity, &synced_at))
            .collect::<Result<Vec<_>>>()?;

        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<usize> {
                let mut affected_rows = 0;
                for row in &rows {
                    affected_rows += diesel::insert_into(catalog_entities::table)
                        .values(row)
                        .on_conflict((
                            catalog_entities::profile_id,
                            catalog_entities::entity_type,
                            catalog_entities::entity_id,
                        ))
                        .do_update()
                        .set(row)
                        .execute(conn)
                        .map_err(StorageError::from)?;
                }
                debug!("Upserted {} catalog rows", affected_rows);
                Ok(affected_rows)
            })
            .await
    }

    fn get_entity(
        &self,
        profile_id: &str,
        entity_type: EntityType,
        entity_id: &str,
    ) -> Result<Option<CatalogEntity>> {
        let mut conn = get_connection(&self.pool)?;
        let row = catalog_entities::table
            .find((profile_id, enum_to_db(&entity_type)?, entity_id))
            .select(CatalogEntityDB::as_select())
            .first(&mut conn)
            .optional()
            .map_err(StorageError::from)?;
        row.map(CatalogEntity::try_from).transpose()
    }

    fn count_entities(&self, profile_id: &str, entity_type: EntityType) -> Result<i64> {
        let mut conn = get_connection(&self.pool)?;
        let count = catalog_entities::table
            .filter(catalog_entities::profile_id.eq(profile_id))
            .filter(catalog_entities::entity_type.eq(enum_to_db(&entity_type)?))
            .count()
            .get_result(&mut conn)
            .map_err(StorageError::from)?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::setup_test_db;
    use adpulse_core::catalog::EntityState;
    use chrono::TimeZone;
    use serde_json::json;

    fn campaign(id: &str, name: &str, budget: Option<i64>) -> CatalogEntity {
        CatalogEntity {
            profile_id: "p1".to_string(),
            entity_type: EntityType::Campaigns,
            entity_id: id.to_string(),
            parent_id: None,
            campaign_id: Some(id.to_string()),
            name: Some(name.to_string()),
            state: EntityState::Enabled,
            budget_micros: budget,
            bid_micros: None,
            last_updated_time: Some(Utc.with_ymd_and_hms(2026, 4, 2, 8, 0, 0).unwrap()),
            payload: json!({ "campaignId": id, "name": name }),
        }
    }

    #[tokio::test]
    async fn upsert_is_idempotent_per_natural_key() {
        let (pool, writer) = setup_test_db();
        let repo = CatalogRepository::new(pool, writer);

        let batch = vec![campaign("C1", "Brand", Some(5_000_000)), campaign("C2", "Generic", None)];
        assert_eq!(repo.upsert_entities(batch.clone()).await.unwrap(), 2);
        repo.upsert_entities(batch).await.unwrap();

        assert_eq!(repo.count_entities("p1", EntityType::Campaigns).unwrap(), 2);
        assert_eq!(repo.count_entities("p1", EntityType::Ads).unwrap(), 0);
        assert_eq!(repo.count_entities("p2", EntityType::Campaigns).unwrap(), 0);
    }

    #[tokio::test]
    async fn later_payload_overwrites_stored_row() {
        let (pool, writer) = setup_test_db();
        let repo = CatalogRepository::new(pool, writer);

        repo.upsert_entities(vec![campaign("C1", "Brand", Some(5_000_000))])
            .await
            .unwrap();
        let mut renamed = campaign("C1", "Brand EU", None);
        renamed.state = EntityState::Paused;
        repo.upsert_entities(vec![renamed.clone()]).await.unwrap();

        let stored = repo
            .get_entity("p1", EntityType::Campaigns, "C1")
            .unwrap()
            .unwrap();
        assert_eq!(stored, renamed);
        assert_eq!(stored.budget_micros, None);
        assert!(repo
            .get_entity("p1", EntityType::AdGroups, "C1")
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn empty_batch_is_a_no_op() {
        let (pool, writer) = setup_test_db();
        let repo = CatalogRepository::new(pool, writer);
        assert_eq!(repo.upsert_entities(Vec::new()).await.unwrap(), 0);
    }
}
