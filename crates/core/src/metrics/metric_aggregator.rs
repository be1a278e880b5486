use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use log::debug;

use super::{
    Metric, MetricDataPoint, MetricFactRepositoryTrait, MetricTotals, Scope, SkippedDataPoint,
    TimeWindow,
};
use crate::errors::Result;
use crate::utils::time_utils::{start_of_day, truncate_to_hour};

/// Totals per bucket start, per entity.
pub type EntitySeries = BTreeMap<String, BTreeMap<DateTime<Utc>, MetricTotals>>;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AggregationOutput {
    pub points: Vec<MetricDataPoint>,
    pub skipped: Vec<SkippedDataPoint>,
}

/// Buckets under evaluation at `now`, as a half-open range.
///
/// Intraday covers the most recently completed hour, so each closed hour is
/// scored by exactly one hourly run. Daily covers the current UTC date.
pub fn current_range(window: TimeWindow, now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
    match window {
        TimeWindow::Intraday => {
            let hour = truncate_to_hour(now);
            (hour - Duration::hours(1), hour)
        }
        TimeWindow::Daily => {
            let day_start = start_of_day(now.date_naive());
            (day_start, day_start + Duration::days(1))
        }
    }
}

/// Derives `metric` for every bucket of `series` inside `[from, to)`.
/// Buckets with an undefined value are reported as skipped, never zero-filled.
pub fn derive_points(
    series: &EntitySeries,
    metric: Metric,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
) -> AggregationOutput {
    let mut output = AggregationOutput::default();
    for (entity_id, buckets) in series {
        for (bucket, totals) in buckets.range(from..to) {
            match totals.derive(metric) {
                Some(value) if value.is_finite() => output.points.push(MetricDataPoint {
                    entity_id: entity_id.clone(),
                    metric,
                    value,
                    timestamp: *bucket,
                }),
                _ => output.skipped.push(SkippedDataPoint {
                    entity_id: entity_id.clone(),
                    metric,
                    timestamp: *bucket,
                    reason: format!("{} undefined (zero denominator)", metric),
                }),
            }
        }
    }
    output
}

fn entity_key(
    scope: Scope,
    profile_id: &str,
    campaign_id: &str,
    ad_group_id: Option<&str>,
) -> Option<String> {
    match scope {
        Scope::Account => Some(profile_id.to_string()),
        Scope::Campaign => Some(campaign_id.to_string()),
        Scope::AdGroup => ad_group_id
            .filter(|id| !id.is_empty())
            .map(str::to_string),
    }
}

/// Reduces raw fact rows into per-entity, per-bucket totals.
pub struct MetricAggregator {
    repository: Arc<dyn MetricFactRepositoryTrait>,
}

impl MetricAggregator {
    pub fn new(repository: Arc<dyn MetricFactRepositoryTrait>) -> Self {
        Self { repository }
    }

    /// Loads totals for buckets starting in `[from, to)`.
    ///
    /// Intraday joins hourly traffic and conversion rows on (entity, hour); daily
    /// reads the precomputed daily table.
    pub fn load_series(
        &self,
        profile_id: &str,
        scope: Scope,
        window: TimeWindow,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<EntitySeries> {
        let mut series = EntitySeries::new();
        if from >= to {
            return Ok(series);
        }

        match window {
            TimeWindow::Intraday => {
                let traffic = self.repository.load_hourly_traffic(profile_id, from, to)?;
                let conversions = self
                    .repository
                    .load_hourly_conversions(profile_id, from, to)?;
                debug!(
                    "Aggregating {} traffic and {} conversion rows for {} ({})",
                    traffic.len(),
                    conversions.len(),
                    profile_id,
                    scope
                );
                for fact in traffic {
                    if let Some(key) = entity_key(
                        scope,
                        profile_id,
                        &fact.campaign_id,
                        fact.ad_group_id.as_deref(),
                    ) {
                        series
                            .entry(key)
                            .or_default()
                            .entry(truncate_to_hour(fact.hour_start))
                            .or_default()
                            .add_traffic(fact.impressions, fact.clicks, fact.cost);
                    }
                }
                for fact in conversions {
                    if let Some(key) = entity_key(
                        scope,
                        profile_id,
                        &fact.campaign_id,
                        fact.ad_group_id.as_deref(),
                    ) {
                        series
                            .entry(key)
                            .or_default()
                            .entry(truncate_to_hour(fact.hour_start))
                            .or_default()
                            .add_conversions(fact.conversions, fact.sales);
                    }
                }
            }
            TimeWindow::Daily => {
                let last_day = (to - Duration::nanoseconds(1)).date_naive();
                let rows =
                    self.repository
                        .load_daily_performance(profile_id, from.date_naive(), last_day)?;
                debug!(
                    "Aggregating {} daily rows for {} ({})",
                    rows.len(),
                    profile_id,
                    scope
                );
                for fact in rows {
                    let bucket = start_of_day(fact.date);
                    if bucket < from || bucket >= to {
                        continue;
                    }
                    if let Some(key) = entity_key(
                        scope,
                        profile_id,
                        &fact.campaign_id,
                        fact.ad_group_id.as_deref(),
                    ) {
                        let totals = series.entry(key).or_default().entry(bucket).or_default();
                        totals.add_traffic(fact.impressions, fact.clicks, fact.cost);
                        totals.add_conversions(fact.conversions, fact.sales);
                    }
                }
            }
        }
        Ok(series)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::{DailyPerformanceFact, HourlyConversionFact, HourlyTrafficFact};
    use async_trait::async_trait;
    use chrono::{NaiveDate, TimeZone};
    use std::sync::Mutex;

    #[derive(Default)]
    struct InMemoryFacts {
        traffic: Mutex<Vec<HourlyTrafficFact>>,
        conversions: Mutex<Vec<HourlyConversionFact>>,
        daily: Mutex<Vec<DailyPerformanceFact>>,
    }

    #[async_trait]
    impl MetricFactRepositoryTrait for InMemoryFacts {
        fn load_hourly_traffic(
            &self,
            profile_id: &str,
            from: DateTime<Utc>,
            to: DateTime<Utc>,
        ) -> Result<Vec<HourlyTrafficFact>> {
            Ok(self
                .traffic
                .lock()
                .unwrap()
                .iter()
                .filter(|f| f.profile_id == profile_id && f.hour_start >= from && f.hour_start < to)
                .cloned()
                .collect())
        }

        fn load_hourly_conversions(
            &self,
            profile_id: &str,
            from: DateTime<Utc>,
            to: DateTime<Utc>,
        ) -> Result<Vec<HourlyConversionFact>> {
            Ok(self
                .conversions
                .lock()
                .unwrap()
                .iter()
                .filter(|f| f.profile_id == profile_id && f.hour_start >= from && f.hour_start < to)
                .cloned()
                .collect())
        }

        fn load_daily_performance(
            &self,
            profile_id: &str,
            from: NaiveDate,
            to: NaiveDate,
        ) -> Result<Vec<DailyPerformanceFact>> {
            Ok(self
                .daily
                .lock()
                .unwrap()
                .iter()
                .filter(|f| f.profile_id == profile_id && f.date >= from && f.date <= to)
                .cloned()
                .collect())
        }

        async fn record_hourly_traffic(&self, facts: Vec<HourlyTrafficFact>) -> Result<usize> {
            let n = facts.len();
            self.traffic.lock().unwrap().extend(facts);
            Ok(n)
        }

        async fn record_hourly_conversions(
            &self,
            facts: Vec<HourlyConversionFact>,
        ) -> Result<usize> {
            let n = facts.len();
            self.conversions.lock().unwrap().extend(facts);
            Ok(n)
        }

        async fn record_daily_performance(
            &self,
            facts: Vec<DailyPerformanceFact>,
        ) -> Result<usize> {
            let n = facts.len();
            self.daily.lock().unwrap().extend(facts);
            Ok(n)
        }
    }

    fn current_points(
        aggregator: &MetricAggregator,
        scope: Scope,
        metric: Metric,
        window: TimeWindow,
        now: DateTime<Utc>,
    ) -> AggregationOutput {
        let (from, to) = current_range(window, now);
        let series = aggregator.load_series("p1", scope, window, from, to).unwrap();
        derive_points(&series, metric, from, to)
    }

    fn traffic(campaign: &str, ad_group: &str, hour: DateTime<Utc>, cost: f64) -> HourlyTrafficFact {
        HourlyTrafficFact {
            profile_id: "p1".into(),
            campaign_id: campaign.into(),
            ad_group_id: Some(ad_group.into()),
            hour_start: hour,
            impressions: 100,
            clicks: 10,
            cost,
        }
    }

    fn conversion(campaign: &str, ad_group: &str, hour: DateTime<Utc>, sales: f64) -> HourlyConversionFact {
        HourlyConversionFact {
            profile_id: "p1".into(),
            campaign_id: campaign.into(),
            ad_group_id: Some(ad_group.into()),
            hour_start: hour,
            conversions: 1,
            sales,
        }
    }

    #[tokio::test]
    async fn intraday_joins_traffic_and_conversions_per_hour() {
        let repo = Arc::new(InMemoryFacts::default());
        let h9 = Utc.with_ymd_and_hms(2026, 3, 10, 9, 0, 0).unwrap();
        let h10 = h9 + Duration::hours(1);
        repo.record_hourly_traffic(vec![
            traffic("C1", "AG1", h9, 10.0),
            traffic("C1", "AG2", h9, 30.0),
            traffic("C1", "AG1", h10, 5.0),
        ])
        .await
        .unwrap();
        repo.record_hourly_conversions(vec![conversion("C1", "AG1", h9, 160.0)])
            .await
            .unwrap();

        let aggregator = MetricAggregator::new(repo);
        let now = h10 + Duration::minutes(30);
        let acos = current_points(&aggregator, Scope::Campaign, Metric::Acos, TimeWindow::Intraday, now);

        // The 10:00 bucket is still open and is not evaluated.
        assert_eq!(acos.points.len(), 1);
        assert_eq!(acos.points[0].entity_id, "C1");
        assert_eq!(acos.points[0].timestamp, h9);
        assert_eq!(acos.points[0].value, 25.0);
        assert!(acos.skipped.is_empty());

        let by_group = current_points(&aggregator, Scope::AdGroup, Metric::Acos, TimeWindow::Intraday, now);
        assert_eq!(by_group.points.len(), 1);
        assert_eq!(by_group.points[0].entity_id, "AG1");
        assert_eq!(by_group.skipped.len(), 1);
        assert_eq!(by_group.skipped[0].entity_id, "AG2");
    }

    #[tokio::test]
    async fn daily_reads_precomputed_rows_and_sums_account_scope() {
        let repo = Arc::new(InMemoryFacts::default());
        let today = NaiveDate::from_ymd_opt(2026, 3, 10).unwrap();
        let row = |campaign: &str, date: NaiveDate, cost: f64, sales: f64| DailyPerformanceFact {
            profile_id: "p1".into(),
            campaign_id: campaign.into(),
            ad_group_id: None,
            date,
            impressions: 1000,
            clicks: 20,
            cost,
            conversions: 2,
            sales,
        };
        repo.record_daily_performance(vec![
            row("C1", today, 50.0, 0.0),
            row("C2", today, 20.0, 80.0),
            row("C1", today.pred_opt().unwrap(), 10.0, 40.0),
        ])
        .await
        .unwrap();

        let aggregator = MetricAggregator::new(repo);
        let now = Utc.with_ymd_and_hms(2026, 3, 10, 18, 0, 0).unwrap();

        let account = current_points(&aggregator, Scope::Account, Metric::Spend, TimeWindow::Daily, now);
        assert_eq!(account.points.len(), 1);
        assert_eq!(account.points[0].entity_id, "p1");
        assert_eq!(account.points[0].value, 70.0);

        let acos = current_points(&aggregator, Scope::Campaign, Metric::Acos, TimeWindow::Daily, now);
        assert_eq!(acos.points.len(), 1);
        assert_eq!(acos.points[0].entity_id, "C2");
        assert_eq!(acos.points[0].value, 25.0);
        assert_eq!(acos.skipped.len(), 1);
        assert_eq!(acos.skipped[0].entity_id, "C1");

        // Ad-group scope ignores rows without an ad group.
        let groups = current_points(&aggregator, Scope::AdGroup, Metric::Spend, TimeWindow::Daily, now);
        assert!(groups.points.is_empty());
    }

    #[test]
    fn current_range_for_windows() {
        let now = Utc.with_ymd_and_hms(2026, 3, 10, 14, 25, 0).unwrap();
        let midnight = Utc.with_ymd_and_hms(2026, 3, 10, 0, 0, 0).unwrap();
        assert_eq!(
            current_range(TimeWindow::Intraday, now),
            (
                Utc.with_ymd_and_hms(2026, 3, 10, 13, 0, 0).unwrap(),
                Utc.with_ymd_and_hms(2026, 3, 10, 14, 0, 0).unwrap()
            )
        );
        // Just after midnight the closed hour belongs to the previous day.
        let after_midnight = midnight + Duration::minutes(5);
        assert_eq!(
            current_range(TimeWindow::Intraday, after_midnight),
            (midnight - Duration::hours(1), midnight)
        );
        assert_eq!(
            current_range(TimeWindow::Daily, now),
            (midnight, midnight + Duration::days(1))
        );
    }
}
