use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};

use super::{DailyPerformanceFact, HourlyConversionFact, HourlyTrafficFact};
use crate::errors::Result;

/// Read and write access to the raw performance fact tables.
///
/// Hourly ranges are half-open `[from, to)`; daily ranges are inclusive.
#[async_trait]
pub trait MetricFactRepositoryTrait: Send + Sync {
    fn load_hourly_traffic(
        &self,
        profile_id: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<HourlyTrafficFact>>;

    fn load_hourly_conversions(
        &self,
        profile_id: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<HourlyConversionFact>>;

    fn load_daily_performance(
        &self,
        profile_id: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<DailyPerformanceFact>>;

    /// Upserts keyed by (profile, campaign, ad group, hour).
    async fn record_hourly_traffic(&self, facts: Vec<HourlyTrafficFact>) -> Result<usize>;

    async fn record_hourly_conversions(&self, facts: Vec<HourlyConversionFact>) -> Result<usize>;

    /// Upserts keyed by (profile, campaign, ad group, date).
    async fn record_daily_performance(&self, facts: Vec<DailyPerformanceFact>) -> Result<usize>;
}
