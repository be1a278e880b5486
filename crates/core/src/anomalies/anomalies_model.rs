use std::fmt;
use std::str::FromStr;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::Error;
use crate::metrics::{Metric, Scope, TimeWindow};

/// Largest magnitude persisted for a score. Zero-MAD deviations score infinite.
pub const STORED_SCORE_LIMIT: f64 = 1e9;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Spike,
    Dip,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Spike => "spike",
            Direction::Dip => "dip",
        }
    }

    /// The direction in which `metric` moving is bad news.
    pub fn adverse_for(metric: Metric) -> Direction {
        match metric {
            Metric::Spend | Metric::Acos | Metric::Cpc => Direction::Spike,
            Metric::Sales | Metric::Cvr | Metric::Ctr | Metric::Impressions => Direction::Dip,
        }
    }
}

impl FromStr for Direction {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "spike" => Ok(Direction::Spike),
            "dip" => Ok(Direction::Dip),
            other => Err(Error::validation(format!("Unknown direction '{}'", other))),
        }
    }
}

/// Ordered: `Info < Warn < Critical`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Warn,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Warn => "warn",
            Severity::Critical => "critical",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "info" => Ok(Severity::Info),
            "warn" => Ok(Severity::Warn),
            "critical" => Ok(Severity::Critical),
            other => Err(Error::validation(format!("Unknown severity '{}'", other))),
        }
    }
}

/// Review state. Only ever set to `New` here; the dashboard moves it on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnomalyState {
    New,
    Ack,
    Resolved,
}

impl AnomalyState {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnomalyState::New => "new",
            AnomalyState::Ack => "ack",
            AnomalyState::Resolved => "resolved",
        }
    }
}

impl FromStr for AnomalyState {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "new" => Ok(AnomalyState::New),
            "ack" => Ok(AnomalyState::Ack),
            "resolved" => Ok(AnomalyState::Resolved),
            other => Err(Error::validation(format!("Unknown anomaly state '{}'", other))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Anomaly {
    pub id: String,
    pub profile_id: String,
    pub scope: Scope,
    pub entity_id: String,
    pub metric: Metric,
    pub time_window: TimeWindow,
    /// Detection instant. Together with `fingerprint` this is the upsert key.
    pub ts: DateTime<Utc>,
    /// Start of the observed hour or day.
    pub bucket_start: DateTime<Utc>,
    pub value: f64,
    pub baseline_median: f64,
    pub baseline_mad: f64,
    pub score: f64,
    pub direction: Direction,
    pub severity: Severity,
    pub fingerprint: String,
    pub state: AnomalyState,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DetectionConfig {
    pub min_baseline_points: usize,
    /// Same-hour samples taken at 7-day strides for intraday baselines.
    pub intraday_history_weeks: i64,
    pub daily_history_days: i64,
    pub warn_threshold: f64,
    pub critical_threshold: f64,
    pub intraday_cooldown: Duration,
    pub daily_cooldown: Duration,
    pub inter_profile_delay: StdDuration,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            min_baseline_points: 3,
            intraday_history_weeks: 4,
            daily_history_days: 28,
            warn_threshold: 2.0,
            critical_threshold: 3.5,
            intraday_cooldown: Duration::hours(6),
            daily_cooldown: Duration::hours(48),
            inter_profile_delay: StdDuration::from_millis(250),
        }
    }
}

impl DetectionConfig {
    pub fn cooldown(&self, window: TimeWindow) -> Duration {
        match window {
            TimeWindow::Intraday => self.intraday_cooldown,
            TimeWindow::Daily => self.daily_cooldown,
        }
    }
}

/// Counters and results for one detection job.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectionSummary {
    pub profiles_processed: usize,
    pub data_points_evaluated: usize,
    pub data_points_skipped: usize,
    pub no_baseline: usize,
    pub below_threshold: usize,
    pub direction_filtered: usize,
    pub suppressed: usize,
    pub anomalies_persisted: usize,
    pub alerts_created: usize,
    pub anomalies: Vec<Anomaly>,
    pub warnings: Vec<String>,
    pub errors: Vec<String>,
}
