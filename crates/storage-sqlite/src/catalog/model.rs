use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use adpulse_core::catalog::{CatalogEntity, EntityState};
use adpulse_core::Result;

use crate::utils::{enum_from_db, enum_to_db, opt_ts_from_db, ts_to_db};

#[derive(
    Queryable,
    Identifiable,
    Insertable,
    AsChangeset,
    Selectable,
    PartialEq,
    Serialize,
    Deserialize,
    Debug,
    Clone,
)]
#[diesel(table_name = crate::schema::catalog_entities)]
#[diesel(primary_key(profile_id, entity_type, entity_id))]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
#[diesel(treat_none_as_null = true)]
pub struct CatalogEntityDB {
    pub profile_id: String,
    pub entity_type: String,
    pub entity_id: String,
    pub parent_id: Option<String>,
    pub campaign_id: Option<String>,
    pub name: Option<String>,
    pub state: String,
    pub budget_micros: Option<i64>,
    pub bid_micros: Option<i64>,
    pub last_updated_time: Option<String>,
    pub payload: String,
    pub synced_at: String,
}

impl CatalogEntityDB {
    pub fn from_domain(entity: CatalogEntity, synced_at: &str) -> Result<Self> {
        Ok(Self {
            entity_type: enum_to_db(&entity.entity_type)?,
            state: entity.state.as_str().to_string(),
            last_updated_time: entity.last_updated_time.as_ref().map(ts_to_db),
            payload: serde_json::to_string(&entity.payload)?,
            profile_id: entity.profile_id,
            entity_id: entity.entity_id,
            parent_id: entity.parent_id,
            campaign_id: entity.campaign_id,
            name: entity.name,
            budget_micros: entity.budget_micros,
            bid_micros: entity.bid_micros,
            synced_at: synced_at.to_string(),
        })
    }
}

impl TryFrom<CatalogEntityDB> for CatalogEntity {
    type Error = adpulse_core::Error;

    fn try_from(db: CatalogEntityDB) -> Result<Self> {
        Ok(CatalogEntity {
            entity_type: enum_from_db(&db.entity_type)?,
            state: EntityState::parse_lenient(&db.state),
            last_updated_time: opt_ts_from_db(db.last_updated_time.as_deref())?,
            payload: serde_json::from_str(&db.payload)?,
            profile_id: db.profile_id,
            entity_id: db.entity_id,
            parent_id: db.parent_id,
            campaign_id: db.campaign_id,
            name: db.name,
            budget_micros: db.budget_micros,
            bid_micros: db.bid_micros,
        })
    }
}
