use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use adpulse_core::profiles::{Profile, StoredToken};
use adpulse_core::Result;

use crate::utils::{enum_from_db, enum_to_db, ts_from_db, ts_to_db};

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
#[diesel(table_name = crate::schema::profiles)]
#[diesel(primary_key(profile_id))]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
#[diesel(treat_none_as_null = true)]
pub struct ProfileDB {
    pub profile_id: String,
    pub user_id: Option<String>,
    pub region: String,
    pub account_name: Option<String>,
    pub currency_code: Option<String>,
    pub is_active: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl ProfileDB {
    pub fn from_domain(profile: &Profile, now: &str) -> Result<Self> {
        Ok(Self {
            profile_id: profile.profile_id.clone(),
            user_id: profile.user_id.clone(),
            region: enum_to_db(&profile.region)?,
            account_name: profile.account_name.clone(),
            currency_code: profile.currency_code.clone(),
            is_active: profile.is_active,
            created_at: now.to_string(),
            updated_at: now.to_string(),
        })
    }
}

impl TryFrom<ProfileDB> for Profile {
    type Error = adpulse_core::Error;

    fn try_from(db: ProfileDB) -> Result<Self> {
        Ok(Profile {
            region: enum_from_db(&db.region)?,
            profile_id: db.profile_id,
            user_id: db.user_id,
            account_name: db.account_name,
            currency_code: db.currency_code,
            is_active: db.is_active,
        })
    }
}

#[derive(
    Queryable,
    Identifiable,
    Insertable,
    AsChangeset,
    Selectable,
    PartialEq,
    Debug,
    Clone,
)]
#[diesel(table_name = crate::schema::profile_tokens)]
#[diesel(primary_key(profile_id))]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct ProfileTokenDB {
    pub profile_id: String,
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: String,
    pub updated_at: String,
}

impl ProfileTokenDB {
    pub fn from_domain(token: StoredToken, now: &str) -> Self {
        Self {
            expires_at: ts_to_db(&token.expires_at),
            profile_id: token.profile_id,
            access_token: token.access_token,
            refresh_token: token.refresh_token,
            updated_at: now.to_string(),
        }
    }
}

impl TryFrom<ProfileTokenDB> for StoredToken {
    type Error = adpulse_core::Error;

    fn try_from(db: ProfileTokenDB) -> Result<Self> {
        Ok(StoredToken {
            expires_at: ts_from_db(&db.expires_at)?,
            profile_id: db.profile_id,
            access_token: db.access_token,
            refresh_token: db.refresh_token,
        })
    }
}
