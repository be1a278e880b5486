use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use diesel::prelude::*;
use diesel::r2d2::{self, Pool};
use diesel::upsert::excluded;
use diesel::SqliteConnection;

use adpulse_core::metrics::{
    DailyPerformanceFact, HourlyConversionFact, HourlyTrafficFact, MetricFactRepositoryTrait,
};
use adpulse_core::Result;

use super::model::{
    date_to_db, ConversionsHourlyDB, DailyPerformanceDB, NewConversionsHourlyDB,
    NewDailyPerformanceDB, NewTrafficHourlyDB, TrafficHourlyDB,
};
use crate::db::{get_connection, WriteHandle};
use crate::errors::StorageError;
use crate::schema::{conversions_hourly, daily_performance, traffic_hourly};
use crate::utils::ts_to_db;

pub struct MetricFactRepository {
    pool: Arc<Pool<r2d2::ConnectionManager<SqliteConnection>>>,
    writer: WriteHandle,
}

impl MetricFactRepository {
    pub fn new(
        pool: Arc<Pool<r2d2::ConnectionManager<SqliteConnection>>>,
        writer: WriteHandle,
    ) -> Self {
        Self { pool, writer }
    }
}

#[async_trait]
impl MetricFactRepositoryTrait for MetricFactRepository {
    fn load_hourly_traffic(
        &self,
        profile_id: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<HourlyTrafficFact>> {
        let mut conn = get_connection(&self.pool)?;
        traffic_hourly::table
            .filter(traffic_hourly::profile_id.eq(profile_id))
            .filter(traffic_hourly::hour_start.ge(ts_to_db(&from)))
            .filter(traffic_hourly::hour_start.lt(ts_to_db(&to)))
            .order((traffic_hourly::hour_start.asc(), traffic_hourly::id.asc()))
            .select(TrafficHourlyDB::as_select())
            .load(&mut conn)
            .map_err(StorageError::from)?
            .into_iter()
            .map(HourlyTrafficFact::try_from)
            .collect()
    }

    fn load_hourly_conversions(
        &self,
        profile_id: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<HourlyConversionFact>> {
        let mut conn = get_connection(&self.pool)?;
        conversions_hourly::table
            .filter(conversions_hourly::profile_id.eq(profile_id))
            .filter(conversions_hourly::hour_start.ge(ts_to_db(&from)))
            .filter(conversions_hourly::hour_start.lt(ts_to_db(&to)))
            .order((conversions_hourly::hour_start.asc(), conversions_hourly::id.asc()))
            .select(ConversionsHourlyDB::as_select())
            .load(&mut conn)
            .map_err(StorageError::from)?
            .into_iter()
            .map(HourlyConversionFact::try_from)
            .collect()
    }

    fn load_daily_performance(
        &self,
        profile_id: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<DailyPerformanceFact>> {
        let mut conn = get_connection(&self.pool)?;
        daily_performance::table
            .filter(daily_performance::profile_id.eq(profile_id))
            .filter(daily_performance::date.ge(date_to_db(&from)))
            .filter(daily_performance::date.le(date_to_db(&to)))
            .order((daily_performance::date.asc(), daily_performance::id.asc()))
            .select(DailyPerformanceDB::as_select())
            .load(&mut conn)
            .map_err(StorageError::from)?
            .into_iter()
            .map(DailyPerformanceFact::try_from)
            .collect()
    }

    async fn record_hourly_traffic(&self, facts: Vec<HourlyTrafficFact>) -> Result<usize> {
        let rows: Vec<NewTrafficHourlyDB> = facts.into_iter().map(Into::into).collect();
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<usize> {
                let mut affected_rows = 0;
                for row in &rows {
                    affected_rows += diesel::insert_into(traffic_hourly::table)
                        .values(row)
                        .on_conflict((
                            traffic_hourly::profile_id,
                            traffic_hourly::campaign_id,
                            traffic_hourly::ad_group_id,
                            traffic_hourly::hour_start,
                        ))
                        .do_update()
                        .set((
                            traffic_hourly::impressions.eq(excluded(traffic_hourly::impressions)),
                            traffic_hourly::clicks.eq(excluded(traffic_hourly::clicks)),
                            traffic_hourly::cost.eq(excluded(traffic_hourly::cost)),
                        ))
                        .execute(conn)
                        .map_err(StorageError::from)?;
                }
                Ok(affected_rows)
            })
            .await
    }

    async fn record_hourly_conversions(&self, facts: Vec<HourlyConversionFact>) -> Result<usize> {
        let rows: Vec<NewConversionsHourlyDB> = facts.into_iter().map(Into::into).collect();
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<usize> {
                let mut affected_rows = 0;
                for row in &rows {
                    affected_rows += diesel::insert_into(conversions_hourly::table)
                        .values(row)
                        .on_conflict((
                            conversions_hourly::profile_id,
                            conversions_hourly::campaign_id,
                            conversions_hourly::ad_group_id,
                            conversions_hourly::hour_start,
                        ))
                        .do_update()
                        .set((
                            conversions_hourly::conversions
                                .eq(excluded(conversions_hourly::conversions)),
                            conversions_hourly::sales.eq(excluded(conversions_hourly::sales)),
                        ))
                        .execute(conn)
                        .map_err(StorageError::from)?;
                }
                Ok(affected_rows)
            })
            .await
    }

    async fn record_daily_performance(&self, facts: Vec<DailyPerformanceFact>) -> Result<usize> {
        let rows: Vec<NewDailyPerformanceDB> = facts.into_iter().map(Into::into).collect();
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<usize> {
                let mut affected_rows = 0;
                for row in &rows {
                    affected_rows += diesel::insert_into(daily_performance::table)
                        .values(row)
                        .on_conflict((
                            daily_performance::profile_id,
                            daily_performance::campaign_id,
                            daily_performance::ad_group_id,
                            daily_performance::date,
                        ))
                        .do_update()
                        .set((
                            daily_performance::impressions
                                .eq(excluded(daily_performance::impressions)),
                            daily_performance::clicks.eq(excluded(daily_performance::clicks)),
                            daily_performance::cost.eq(excluded(daily_performance::cost)),
                            daily_performance::conversions
                                .eq(excluded(daily_performance::conversions)),
                            daily_performance::sales.eq(excluded(daily_performance::sales)),
                        ))
                        .execute(conn)
                        .map_err(StorageError::from)?;
                }
                Ok(affected_rows)
            })
            .await
    }
}
