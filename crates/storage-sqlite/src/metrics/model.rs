//! Fact rows. A missing ad group is stored as an empty string so the unique
//! keys stay usable for upserts.

use chrono::NaiveDate;
use diesel::prelude::*;

use adpulse_core::errors::Error;
use adpulse_core::metrics::{DailyPerformanceFact, HourlyConversionFact, HourlyTrafficFact};
use adpulse_core::Result;

use crate::errors::StorageError;
use crate::utils::{ts_from_db, ts_to_db};

const DATE_FORMAT: &str = "%Y-%m-%d";

pub fn ad_group_to_db(value: Option<String>) -> String {
    value.unwrap_or_default()
}

pub fn ad_group_from_db(value: String) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}

pub fn date_to_db(value: &NaiveDate) -> String {
    value.format(DATE_FORMAT).to_string()
}

pub fn date_from_db(value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value, DATE_FORMAT)
        .map_err(|_| Error::from(StorageError::InvalidValue(format!("Invalid date '{}'", value))))
}

#[derive(Queryable, Selectable, Debug, Clone)]
#[diesel(table_name = crate::schema::traffic_hourly)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct TrafficHourlyDB {
    pub id: i32,
    pub profile_id: String,
    pub campaign_id: String,
    pub ad_group_id: String,
    pub hour_start: String,
    pub impressions: i64,
    pub clicks: i64,
    pub cost: f64,
}

#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = crate::schema::traffic_hourly)]
pub struct NewTrafficHourlyDB {
    pub profile_id: String,
    pub campaign_id: String,
    pub ad_group_id: String,
    pub hour_start: String,
    pub impressions: i64,
    pub clicks: i64,
    pub cost: f64,
}

impl From<HourlyTrafficFact> for NewTrafficHourlyDB {
    fn from(fact: HourlyTrafficFact) -> Self {
        Self {
            hour_start: ts_to_db(&fact.hour_start),
            ad_group_id: ad_group_to_db(fact.ad_group_id),
            profile_id: fact.profile_id,
            campaign_id: fact.campaign_id,
            impressions: fact.impressions,
            clicks: fact.clicks,
            cost: fact.cost,
        }
    }
}

impl TryFrom<TrafficHourlyDB> for HourlyTrafficFact {
    type Error = Error;

    fn try_from(db: TrafficHourlyDB) -> Result<Self> {
        Ok(HourlyTrafficFact {
            hour_start: ts_from_db(&db.hour_start)?,
            ad_group_id: ad_group_from_db(db.ad_group_id),
            profile_id: db.profile_id,
            campaign_id: db.campaign_id,
            impressions: db.impressions,
            clicks: db.clicks,
            cost: db.cost,
        })
    }
}

#[derive(Queryable, Selectable, Debug, Clone)]
#[diesel(table_name = crate::schema::conversions_hourly)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct ConversionsHourlyDB {
    pub id: i32,
    pub profile_id: String,
    pub campaign_id: String,
    pub ad_group_id: String,
    pub hour_start: String,
    pub conversions: i64,
    pub sales: f64,
}

#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = crate::schema::conversions_hourly)]
pub struct NewConversionsHourlyDB {
    pub profile_id: String,
    pub campaign_id: String,
    pub ad_group_id: String,
    pub hour_start: String,
    pub conversions: i64,
    pub sales: f64,
}

impl From<HourlyConversionFact> for NewConversionsHourlyDB {
    fn from(fact: HourlyConversionFact) -> Self {
        Self {
            hour_start: ts_to_db(&fact.hour_start),
            ad_group_id: ad_group_to_db(fact.ad_group_id),
            profile_id: fact.profile_id,
            campaign_id: fact.campaign_id,
            conversions: fact.conversions,
            sales: fact.sales,
        }
    }
}

impl TryFrom<ConversionsHourlyDB> for HourlyConversionFact {
    type Error = Error;

    fn try_from(db: ConversionsHourlyDB) -> Result<Self> {
        Ok(HourlyConversionFact {
            hour_start: ts_from_db(&db.hour_start)?,
            ad_group_id: ad_group_from_db(db.ad_group_id),
            profile_id: db.profile_id,
            campaign_id: db.campaign_id,
            conversions: db.conversions,
            sales: db.sales,
        })
    }
}

#[derive(Queryable, Selectable, Debug, Clone)]
#[diesel(table_name = crate::schema::daily_performance)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct DailyPerformanceDB {
    pub id: i32,
    pub profile_id: String,
    pub campaign_id: String,
    pub ad_group_id: String,
    pub date: String,
    pub impressions: i64,
    pub clicks: i64,
    pub cost: f64,
    pub conversions: i64,
    pub sales: f64,
}

#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = crate::schema::daily_performance)]
pub struct NewDailyPerformanceDB {
    pub profile_id: String,
    pub campaign_id: String,
    pub ad_group_id: String,
    pub date: String,
    pub impressions: i64,
    pub clicks: i64,
    pub cost: f64,
    pub conversions: i64,
    pub sales: f64,
}

impl From<DailyPerformanceFact> for NewDailyPerformanceDB {
    fn from(fact: DailyPerformanceFact) -> Self {
        Self {
            date: date_to_db(&fact.date),
            ad_group_id: ad_group_to_db(fact.ad_group_id),
            profile_id: fact.profile_id,
            campaign_id: fact.campaign_id,
            impressions: fact.impressions,
            clicks: fact.clicks,
            cost: fact.cost,
            conversions: fact.conversions,
            sales: fact.sales,
        }
    }
}

impl TryFrom<DailyPerformanceDB> for DailyPerformanceFact {
    type Error = Error;

    fn try_from(db: DailyPerformanceDB) -> Result<Self> {
        Ok(DailyPerformanceFact {
            date: date_from_db(&db.date)?,
            ad_group_id: ad_group_from_db(db.ad_group_id),
            profile_id: db.profile_id,
            campaign_id: db.campaign_id,
            impressions: db.impressions,
            clicks: db.clicks,
            cost: db.cost,
            conversions: db.conversions,
            sales: db.sales,
        })
    }
}
