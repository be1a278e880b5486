use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use diesel::prelude::*;
use diesel::r2d2::{self, Pool};
use diesel::SqliteConnection;

use adpulse_core::profiles::{
    CredentialRepositoryTrait, Profile, ProfileRepositoryTrait, StoredToken,
};
use adpulse_core::Result;

use super::model::{ProfileDB, ProfileTokenDB};
use crate::db::{get_connection, WriteHandle};
use crate::errors::StorageError;
use crate::schema::{profile_tokens, profiles};
use crate::utils::ts_to_db;

pub struct ProfileRepository {
    pool: Arc<Pool<r2d2::ConnectionManager<SqliteConnection>>>,
    writer: WriteHandle,
}

impl ProfileRepository {
    pub fn new(
        pool: Arc<Pool<r2d2::ConnectionManager<SqliteConnection>>>,
        writer: WriteHandle,
    ) -> Self {
        ProfileRepository { pool, writer }
    }

    /// Inserts or replaces a profile. `created_at` survives updates.
    pub async fn upsert_profile(&self, profile: Profile) -> Result<Profile> {
        let now = ts_to_db(&Utc::now());
        let row = ProfileDB::from_domain(&profile, &now)?;
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<Profile> {
                diesel::insert_into(profiles::table)
                    .values(&row)
                    .on_conflict(profiles::profile_id)
                    .do_update()
                    .set((
                        profiles::user_id.eq(&row.user_id),
                        profiles::region.eq(&row.region),
                        profiles::account_name.eq(&row.account_name),
                        profiles::currency_code.eq(&row.currency_code),
                        profiles::is_active.eq(row.is_active),
                        profiles::updated_at.eq(&row.updated_at),
                    ))
                    .execute(conn)
                    .map_err(StorageError::from)?;
                let stored = profiles::table
                    .find(&row.profile_id)
                    .select(ProfileDB::as_select())
                    .first(conn)
                    .map_err(StorageError::from)?;
                Profile::try_from(stored)
            })
            .await
    }
}

#[async_trait]
impl ProfileRepositoryTrait for ProfileRepository {
    fn get_profile(&self, profile_id: &str) -> Result<Option<Profile>> {
        let mut conn = get_connection(&self.pool)?;
        let row = profiles::table
            .find(profile_id)
            .select(ProfileDB::as_select())
            .first(&mut conn)
            .optional()
            .map_err(StorageError::from)?;
        row.map(Profile::try_from).transpose()
    }

    fn list_active_profiles(&self) -> Result<Vec<Profile>> {
        let mut conn = get_connection(&self.pool)?;
        profiles::table
            .filter(profiles::is_active.eq(true))
            .order(profiles::profile_id.asc())
            .select(ProfileDB::as_select())
            .load(&mut conn)
            .map_err(StorageError::from)?
            .into_iter()
            .map(Profile::try_from)
            .collect()
    }
}

#[async_trait]
impl CredentialRepositoryTrait for ProfileRepository {
    fn get_token(&self, profile_id: &str) -> Result<Option<StoredToken>> {
        let mut conn = get_connection(&self.pool)?;
        let row = profile_tokens::table
            .find(profile_id)
            .select(ProfileTokenDB::as_select())
            .first(&mut conn)
            .optional()
            .map_err(StorageError::from)?;
        row.map(StoredToken::try_from).transpose()
    }

    async fn save_token(&self, token: StoredToken) -> Result<()> {
        let row = ProfileTokenDB::from_domain(token, &ts_to_db(&Utc::now()));
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<()> {
                diesel::insert_into(profile_tokens::table)
                    .values(&row)
                    .on_conflict(profile_tokens::profile_id)
                    .do_update()
                    .set(&row)
                    .execute(conn)
                    .map_err(StorageError::from)?;
                Ok(())
            })
            .await
    }
}
