use serde::{Deserialize, Serialize};

/// Scales MAD so it is comparable to a normal standard deviation.
pub const MAD_SCALE: f64 = 0.6745;

/// Robust centre and spread of a historical sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Baseline {
    pub median: f64,
    pub mad: f64,
    pub points: usize,
}

impl Baseline {
    /// Returns `None` when fewer than `min_points` finite values are available.
    pub fn from_values(values: &[f64], min_points: usize) -> Option<Baseline> {
        let sample: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
        if sample.len() < min_points.max(1) {
            return None;
        }
        let centre = median(&sample)?;
        let deviations: Vec<f64> = sample.iter().map(|v| (v - centre).abs()).collect();
        let mad = median(&deviations)?;
        Some(Baseline {
            median: centre,
            mad,
            points: sample.len(),
        })
    }

    /// Robust z-score of `value`. With zero MAD any deviation is infinite.
    pub fn score(&self, value: f64) -> f64 {
        let deviation = value - self.median;
        if self.mad == 0.0 {
            if deviation == 0.0 {
                0.0
            } else {
                deviation.signum() * f64::INFINITY
            }
        } else {
            MAD_SCALE * deviation / self.mad
        }
    }
}

/// Median with linear interpolation between the two middle values of an
/// even-length list.
pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Some(sorted[mid])
    }
}
