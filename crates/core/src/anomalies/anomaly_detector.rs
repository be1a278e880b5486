use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use log::{debug, info, warn};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use super::{
    Anomaly, AnomalyRepositoryTrait, AnomalyServiceTrait, AnomalyState, Baseline,
    DetectionConfig, DetectionSummary, Direction, Severity, STORED_SCORE_LIMIT,
};
use crate::alerts::AlertDispatcherTrait;
use crate::errors::{Error, Result};
use crate::metrics::{
    current_range, derive_points, Metric, MetricAggregator, MetricDataPoint, Scope, TimeWindow,
};
use crate::profiles::{Profile, ProfileRepositoryTrait};

/// Maps `|score|` to a severity. Boundaries: below `warn` is info, up to and
/// including `critical` is warn, above is critical.
pub fn classify_severity(score: f64, config: &DetectionConfig) -> Severity {
    let magnitude = score.abs();
    if magnitude < config.warn_threshold {
        Severity::Info
    } else if magnitude <= config.critical_threshold {
        Severity::Warn
    } else {
        Severity::Critical
    }
}

/// Bucket key used in fingerprints: the hour for intraday, the date for daily.
pub fn bucket_label(window: TimeWindow, bucket: DateTime<Utc>) -> String {
    match window {
        TimeWindow::Intraday => bucket.format("%Y-%m-%dT%H").to_string(),
        TimeWindow::Daily => bucket.format("%Y-%m-%d").to_string(),
    }
}

/// Deterministic deduplication key for one anomaly condition.
pub fn compute_fingerprint(
    profile_id: &str,
    scope: Scope,
    entity_id: &str,
    metric: Metric,
    window: TimeWindow,
    bucket: DateTime<Utc>,
) -> String {
    let key = format!(
        "{}|{}|{}|{}|{}|{}",
        profile_id,
        scope.as_str(),
        entity_id,
        metric.as_str(),
        window.as_str(),
        bucket_label(window, bucket)
    );
    format!("{:x}", Sha256::digest(key.as_bytes()))
}

/// Buckets sampled to build the baseline for `bucket`.
///
/// Intraday takes the same hour at 7-day strides to cancel weekly seasonality;
/// daily takes the trailing days before `bucket`.
pub fn history_buckets(
    window: TimeWindow,
    bucket: DateTime<Utc>,
    config: &DetectionConfig,
) -> Vec<DateTime<Utc>> {
    match window {
        TimeWindow::Intraday => (1..=config.intraday_history_weeks)
            .map(|week| bucket - Duration::days(7 * week))
            .collect(),
        TimeWindow::Daily => (1..=config.daily_history_days)
            .map(|day| bucket - Duration::days(day))
            .collect(),
    }
}

/// Earliest bucket any baseline for buckets from `current_from` can reach.
fn history_start(
    window: TimeWindow,
    current_from: DateTime<Utc>,
    config: &DetectionConfig,
) -> DateTime<Utc> {
    match window {
        TimeWindow::Intraday => current_from - Duration::days(7 * config.intraday_history_weeks),
        TimeWindow::Daily => current_from - Duration::days(config.daily_history_days),
    }
}

/// Outcome of scoring one data point.
#[derive(Debug, Clone, PartialEq)]
pub enum Evaluation {
    NoBaseline,
    BelowThreshold { score: f64 },
    /// Moved in the harmless direction for its metric.
    FilteredDirection { direction: Direction, score: f64 },
    Candidate(Anomaly),
}

pub struct AnomalyDetector {
    repository: Arc<dyn AnomalyRepositoryTrait>,
    config: DetectionConfig,
}

impl AnomalyDetector {
    pub fn new(repository: Arc<dyn AnomalyRepositoryTrait>, config: DetectionConfig) -> Self {
        Self { repository, config }
    }

    pub fn config(&self) -> &DetectionConfig {
        &self.config
    }

    /// Scores `point` against `history`. Pure; nothing is read or written.
    pub fn evaluate(
        &self,
        profile_id: &str,
        scope: Scope,
        window: TimeWindow,
        point: &MetricDataPoint,
        history: &[f64],
        now: DateTime<Utc>,
    ) -> Evaluation {
        let Some(baseline) = Baseline::from_values(history, self.config.min_baseline_points)
        else {
            return Evaluation::NoBaseline;
        };
        let score = baseline.score(point.value);
        let severity = classify_severity(score, &self.config);
        if severity == Severity::Info {
            return Evaluation::BelowThreshold { score };
        }

        let direction = if point.value > baseline.median {
            Direction::Spike
        } else {
            Direction::Dip
        };
        if direction != Direction::adverse_for(point.metric) {
            return Evaluation::FilteredDirection { direction, score };
        }

        Evaluation::Candidate(Anomaly {
            id: Uuid::now_v7().to_string(),
            profile_id: profile_id.to_string(),
            scope,
            entity_id: point.entity_id.clone(),
            metric: point.metric,
            time_window: window,
            ts: now,
            bucket_start: point.timestamp,
            value: point.value,
            baseline_median: baseline.median,
            baseline_mad: baseline.mad,
            score: score.clamp(-STORED_SCORE_LIMIT, STORED_SCORE_LIMIT),
            direction,
            severity,
            fingerprint: compute_fingerprint(
                profile_id,
                scope,
                &point.entity_id,
                point.metric,
                window,
                point.timestamp,
            ),
            state: AnomalyState::New,
            created_at: now,
        })
    }

    /// Persists `candidate` unless an anomaly with the same fingerprint and an
    /// equal or higher severity exists inside the cooldown window. Returns the
    /// stored row, or `None` when suppressed.
    pub async fn persist(&self, candidate: Anomaly) -> Result<Option<Anomaly>> {
        let since = candidate.ts - self.config.cooldown(candidate.time_window);
        if let Some(existing) = self
            .repository
            .find_latest_by_fingerprint(&candidate.fingerprint, since)?
        {
            if existing.ts != candidate.ts && existing.severity >= candidate.severity {
                debug!(
                    "Suppressed {} {} anomaly for {} ({} within cooldown)",
                    candidate.severity, candidate.metric, candidate.entity_id, existing.severity
                );
                return Ok(None);
            }
        }
        self.repository.upsert_anomaly(candidate).await.map(Some)
    }
}

pub struct AnomalyDetectionService {
    profile_repository: Arc<dyn ProfileRepositoryTrait>,
    anomaly_repository: Arc<dyn AnomalyRepositoryTrait>,
    aggregator: MetricAggregator,
    detector: AnomalyDetector,
    dispatcher: Arc<dyn AlertDispatcherTrait>,
}

impl AnomalyDetectionService {
    pub fn new(
        profile_repository: Arc<dyn ProfileRepositoryTrait>,
        anomaly_repository: Arc<dyn AnomalyRepositoryTrait>,
        aggregator: MetricAggregator,
        dispatcher: Arc<dyn AlertDispatcherTrait>,
        config: DetectionConfig,
    ) -> Self {
        Self {
            profile_repository,
            detector: AnomalyDetector::new(anomaly_repository.clone(), config),
            anomaly_repository,
            aggregator,
            dispatcher,
        }
    }

    fn resolve_profiles(&self, profile_id: Option<&str>) -> Result<Vec<Profile>> {
        match profile_id {
            Some(id) => {
                let profile = self
                    .profile_repository
                    .get_profile(id)?
                    .ok_or_else(|| Error::not_found(format!("Profile {} not found", id)))?;
                Ok(vec![profile])
            }
            None => self.profile_repository.list_active_profiles(),
        }
    }

    async fn detect_for_profile(
        &self,
        profile_id: &str,
        scope: Scope,
        window: TimeWindow,
        now: DateTime<Utc>,
        summary: &mut DetectionSummary,
    ) -> Result<()> {
        let config = self.detector.config();
        let (current_from, current_to) = current_range(window, now);
        let series = self.aggregator.load_series(
            profile_id,
            scope,
            window,
            history_start(window, current_from, config),
            current_to,
        )?;

        for metric in Metric::ALL {
            let output = derive_points(&series, metric, current_from, current_to);
            for skipped in &output.skipped {
                debug!(
                    "Skipped data point {} {} at {}: {}",
                    skipped.entity_id, skipped.metric, skipped.timestamp, skipped.reason
                );
            }
            summary.data_points_skipped += output.skipped.len();

            for point in output.points {
                summary.data_points_evaluated += 1;
                let history: Vec<f64> = series
                    .get(&point.entity_id)
                    .map(|buckets| {
                        history_buckets(window, point.timestamp, config)
                            .into_iter()
                            .filter_map(|bucket| buckets.get(&bucket)?.derive(metric))
                            .collect()
                    })
                    .unwrap_or_default();

                let candidate =
                    match self
                        .detector
                        .evaluate(profile_id, scope, window, &point, &history, now)
                    {
                        Evaluation::NoBaseline => {
                            summary.no_baseline += 1;
                            continue;
                        }
                        Evaluation::BelowThreshold { .. } => {
                            summary.below_threshold += 1;
                            continue;
                        }
                        Evaluation::FilteredDirection { .. } => {
                            summary.direction_filtered += 1;
                            continue;
                        }
                        Evaluation::Candidate(anomaly) => anomaly,
                    };

                let Some(stored) = self.detector.persist(candidate).await? else {
                    summary.suppressed += 1;
                    continue;
                };
                info!(
                    "Anomaly {}: {} {} {} on {} {} (score {:.2})",
                    stored.id,
                    stored.severity,
                    stored.metric,
                    stored.direction.as_str(),
                    stored.scope,
                    stored.entity_id,
                    stored.score
                );
                summary.anomalies_persisted += 1;

                match self.dispatcher.dispatch(&stored).await {
                    Ok(Some(_)) => summary.alerts_created += 1,
                    Ok(None) => {}
                    Err(err) => {
                        warn!("Alert dispatch failed for anomaly {}: {}", stored.id, err);
                        summary
                            .warnings
                            .push(format!("alert for anomaly {} not created: {}", stored.id, err));
                    }
                }
                summary.anomalies.push(stored);
            }
        }
        Ok(())
    }
}

#[async_trait]
impl AnomalyServiceTrait for AnomalyDetectionService {
    async fn detect(
        &self,
        profile_id: Option<&str>,
        scope: Scope,
        window: TimeWindow,
        now: DateTime<Utc>,
    ) -> Result<DetectionSummary> {
        let profiles = self.resolve_profiles(profile_id)?;
        let mut summary = DetectionSummary::default();
        let delay = self.detector.config().inter_profile_delay;

        for (index, profile) in profiles.iter().enumerate() {
            if index > 0 && !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            match self
                .detect_for_profile(&profile.profile_id, scope, window, now, &mut summary)
                .await
            {
                Ok(()) => summary.profiles_processed += 1,
                Err(err) if profile_id.is_some() => return Err(err),
                Err(err) => {
                    warn!("Detection failed for profile {}: {}", profile.profile_id, err);
                    summary
                        .errors
                        .push(format!("{}: {}", profile.profile_id, err));
                }
            }
        }

        info!(
            "Detection ({} / {}) finished: profiles={} evaluated={} skipped={} persisted={} suppressed={} alerts={}",
            scope,
            window,
            summary.profiles_processed,
            summary.data_points_evaluated,
            summary.data_points_skipped,
            summary.anomalies_persisted,
            summary.suppressed,
            summary.alerts_created
        );
        Ok(summary)
    }

    fn list_anomalies(&self, profile_id: &str, limit: i64) -> Result<Vec<Anomaly>> {
        self.anomaly_repository.list_anomalies(profile_id, limit)
    }
}
