use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::Error;

/// Named performance metrics. Derived metrics are percentages except `cpc`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    Spend,
    Sales,
    Acos,
    Cvr,
    Ctr,
    Cpc,
    Impressions,
}

impl Metric {
    pub const ALL: [Metric; 7] = [
        Metric::Spend,
        Metric::Sales,
        Metric::Acos,
        Metric::Cvr,
        Metric::Ctr,
        Metric::Cpc,
        Metric::Impressions,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Metric::Spend => "spend",
            Metric::Sales => "sales",
            Metric::Acos => "acos",
            Metric::Cvr => "cvr",
            Metric::Ctr => "ctr",
            Metric::Cpc => "cpc",
            Metric::Impressions => "impressions",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Metric {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Metric::ALL
            .into_iter()
            .find(|m| m.as_str() == value.trim())
            .ok_or_else(|| Error::validation(format!("Unknown metric '{}'", value)))
    }
}

/// Level of the campaign hierarchy a metric is aggregated at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scope {
    Campaign,
    AdGroup,
    /// Whole profile. The entity id is the profile id.
    Account,
}

impl Scope {
    pub fn as_str(&self) -> &'static str {
        match self {
            Scope::Campaign => "campaign",
            Scope::AdGroup => "ad_group",
            Scope::Account => "account",
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Scope {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "campaign" => Ok(Scope::Campaign),
            "ad_group" => Ok(Scope::AdGroup),
            "account" => Ok(Scope::Account),
            other => Err(Error::validation(format!("Unknown scope '{}'", other))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeWindow {
    /// Hour buckets of the current UTC day.
    Intraday,
    /// Day buckets.
    Daily,
}

impl TimeWindow {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimeWindow::Intraday => "intraday",
            TimeWindow::Daily => "daily",
        }
    }
}

impl fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TimeWindow {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "intraday" => Ok(TimeWindow::Intraday),
            "daily" => Ok(TimeWindow::Daily),
            other => Err(Error::validation(format!("Unknown window '{}'", other))),
        }
    }
}

/// One metric value for one entity and bucket. Never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricDataPoint {
    pub entity_id: String,
    pub metric: Metric,
    pub value: f64,
    /// Start of the hour or day bucket.
    pub timestamp: DateTime<Utc>,
}

/// A bucket whose metric could not be derived, e.g. `acos` with zero sales.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkippedDataPoint {
    pub entity_id: String,
    pub metric: Metric,
    pub timestamp: DateTime<Utc>,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HourlyTrafficFact {
    pub profile_id: String,
    pub campaign_id: String,
    pub ad_group_id: Option<String>,
    pub hour_start: DateTime<Utc>,
    pub impressions: i64,
    pub clicks: i64,
    pub cost: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HourlyConversionFact {
    pub profile_id: String,
    pub campaign_id: String,
    pub ad_group_id: Option<String>,
    pub hour_start: DateTime<Utc>,
    pub conversions: i64,
    pub sales: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyPerformanceFact {
    pub profile_id: String,
    pub campaign_id: String,
    pub ad_group_id: Option<String>,
    pub date: NaiveDate,
    pub impressions: i64,
    pub clicks: i64,
    pub cost: f64,
    pub conversions: i64,
    pub sales: f64,
}

/// Summed raw counters for one (entity, bucket).
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MetricTotals {
    pub impressions: i64,
    pub clicks: i64,
    pub spend: f64,
    pub conversions: i64,
    pub sales: f64,
}

impl MetricTotals {
    pub fn add_traffic(&mut self, impressions: i64, clicks: i64, cost: f64) {
        self.impressions += impressions;
        self.clicks += clicks;
        self.spend += cost;
    }

    pub fn add_conversions(&mut self, conversions: i64, sales: f64) {
        self.conversions += conversions;
        self.sales += sales;
    }

    /// Derives `metric`, or `None` when its denominator is zero.
    pub fn derive(&self, metric: Metric) -> Option<f64> {
        match metric {
            Metric::Spend => Some(self.spend),
            Metric::Sales => Some(self.sales),
            Metric::Impressions => Some(self.impressions as f64),
            Metric::Acos => (self.sales != 0.0).then(|| self.spend / self.sales * 100.0),
            Metric::Cvr => {
                (self.clicks != 0).then(|| self.conversions as f64 / self.clicks as f64 * 100.0)
            }
            Metric::Ctr => (self.impressions != 0)
                .then(|| self.clicks as f64 / self.impressions as f64 * 100.0),
            Metric::Cpc => (self.clicks != 0).then(|| self.spend / self.clicks as f64),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derived_metric_formulas() {
        let totals = MetricTotals {
            impressions: 2000,
            clicks: 40,
            spend: 20.0,
            conversions: 4,
            sales: 80.0,
        };
        assert_eq!(totals.derive(Metric::Acos), Some(25.0));
        assert_eq!(totals.derive(Metric::Cvr), Some(10.0));
        assert_eq!(totals.derive(Metric::Ctr), Some(2.0));
        assert_eq!(totals.derive(Metric::Cpc), Some(0.5));
        assert_eq!(totals.derive(Metric::Impressions), Some(2000.0));
    }

    #[test]
    fn zero_denominators_are_undefined() {
        let totals = MetricTotals {
            spend: 50.0,
            ..MetricTotals::default()
        };
        assert_eq!(totals.derive(Metric::Acos), None);
        assert_eq!(totals.derive(Metric::Cvr), None);
        assert_eq!(totals.derive(Metric::Ctr), None);
        assert_eq!(totals.derive(Metric::Cpc), None);
        assert_eq!(totals.derive(Metric::Spend), Some(50.0));
    }

    #[test]
    fn names_round_trip() {
        for metric in Metric::ALL {
            assert_eq!(metric.as_str().parse::<Metric>().unwrap(), metric);
        }
        assert_eq!("ad_group".parse::<Scope>().unwrap(), Scope::AdGroup);
        assert!("hourly".parse::<TimeWindow>().is_err());
    }
}
