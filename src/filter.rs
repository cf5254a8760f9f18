//! Outlier-trimmed averaging over a burst of raw reads

use crate::errors::{SensorError, SensorResult};
use crate::sensors::{Freshness, RawReading};

/// Fewer samples than this leave nothing after trimming.
pub const MIN_SMOOTHING_STEPS: usize = 3;

/// Per-channel trimmed mean of several raw reads, still in raw counts
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SmoothedSample {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub temperature: Option<f32>,
    /// Stale if any contributing read was stale
    pub freshness: Freshness,
}

impl SmoothedSample {
    pub fn axes(&self) -> [f32; 3] {
        [self.x, self.y, self.z]
    }
}

/// Mean after dropping exactly one minimum and one maximum value.
fn trimmed_mean(mut values: Vec<i16>) -> f32 {
    values.sort_unstable();
    let kept = &values[1..values.len() - 1];
    let sum: i64 = kept.iter().map(|&v| i64::from(v)).sum();
    sum as f32 / kept.len() as f32
}

/// Trim each channel independently, so the dropped extremes of x and y may
/// come from different readings.
pub fn smooth(readings: &[RawReading]) -> SensorResult<SmoothedSample> {
    if readings.len() < MIN_SMOOTHING_STEPS {
        return Err(SensorError::InvalidSmoothing {
            steps: readings.len(),
        });
    }

    let channel = |pick: fn(&RawReading) -> i16| trimmed_mean(readings.iter().map(pick).collect());

    let temperature = readings
        .iter()
        .map(|r| r.sample.temperature)
        .collect::<Option<Vec<i16>>>()
        .map(trimmed_mean);

    let freshness = if readings.iter().any(RawReading::is_stale) {
        Freshness::Stale
    } else {
        Freshness::Fresh
    };

    Ok(SmoothedSample {
        x: channel(|r| r.sample.x),
        y: channel(|r| r.sample.y),
        z: channel(|r| r.sample.z),
        temperature,
        freshness,
    })
}
