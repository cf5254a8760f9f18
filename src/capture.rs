//! Unsupervised calibration capture.
//!
//! The operator rotates the sensor through as many orientations as possible
//! while raw samples widen per-axis bounds. Once no bound has moved for the
//! stability window, coverage is taken as complete and the bounds are emitted.

use crate::calibration::CalibrationBounds;
use crate::errors::SensorResult;
use crate::sensors::{AxisSample, Magnetometer, RawReading};
use tokio::time::{sleep, Duration, Instant};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureSettings {
    /// How long the bounds must stay put before capture completes
    pub window: Duration,
    /// Delay between consecutive raw reads
    pub sample_interval: Duration,
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            window: Duration::from_secs(5),
            sample_interval: Duration::from_millis(10),
        }
    }
}

/// Result of feeding one sample to [`CalibrationCapture::observe`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureStatus {
    /// At least one bound moved
    Widened,
    /// Nothing moved, window not yet elapsed
    Steady,
    /// Window elapsed for the first time; carries the final bounds
    Converged(CalibrationBounds),
    /// Already converged earlier, sample ignored
    Done,
}

/// Convergence detector over a stream of raw samples
#[derive(Debug, Clone)]
pub struct CalibrationCapture {
    bounds: CalibrationBounds,
    last_change: Instant,
    window: Duration,
    done: bool,
    samples: u64,
}

impl CalibrationCapture {
    pub fn new(window: Duration, now: Instant) -> Self {
        Self {
            bounds: CalibrationBounds::unobserved(),
            last_change: now,
            window,
            done: false,
            samples: 0,
        }
    }

    pub fn bounds(&self) -> &CalibrationBounds {
        &self.bounds
    }

    pub fn is_done(&self) -> bool {
        self.done
    }

    pub fn samples(&self) -> u64 {
        self.samples
    }

    pub fn observe(&mut self, sample: &AxisSample, now: Instant) -> CaptureStatus {
        if self.done {
            return CaptureStatus::Done;
        }
        self.samples += 1;

        if self.bounds.widen(sample) {
            self.last_change = now;
            return CaptureStatus::Widened;
        }

        if now.duration_since(self.last_change) > self.window {
            self.done = true;
            return CaptureStatus::Converged(self.bounds);
        }
        CaptureStatus::Steady
    }

    /// Like [`observe`](Self::observe) but stale frames only advance the clock.
    pub fn observe_reading(&mut self, reading: &RawReading, now: Instant) -> CaptureStatus {
        if reading.is_stale() {
            if self.done {
                return CaptureStatus::Done;
            }
            if now.duration_since(self.last_change) > self.window {
                self.done = true;
                return CaptureStatus::Converged(self.bounds);
            }
            return CaptureStatus::Steady;
        }
        self.observe(&reading.sample, now)
    }
}

/// Sample `mag` until the bounds converge and return them.
///
/// The bounds are returned even if an axis never moved; callers should
/// [`validate`](CalibrationBounds::validate) before deriving parameters.
pub async fn capture_calibration<M>(mag: &mut M, settings: &CaptureSettings) -> SensorResult<CalibrationBounds>
where
    M: Magnetometer + ?Sized,
{
    info!(
        "[{}] calibration capture started, rotate the sensor through all orientations",
        mag.id()
    );
    let mut capture = CalibrationCapture::new(settings.window, Instant::now());

    loop {
        let reading = mag.read_raw().await?;
        match capture.observe_reading(&reading, Instant::now()) {
            CaptureStatus::Widened => {
                debug!("[{}] bounds widened: {}", mag.id(), capture.bounds());
            }
            CaptureStatus::Converged(bounds) => {
                info!(
                    "[{}] calibration converged after {} samples: {}",
                    mag.id(),
                    capture.samples(),
                    bounds
                );
                if let Err(e) = bounds.validate() {
                    warn!("[{}] captured bounds are unusable: {}", mag.id(), e);
                }
                return Ok(bounds);
            }
            CaptureStatus::Steady | CaptureStatus::Done => {}
        }
        sleep(settings.sample_interval).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calibration::{Axis, AxisBounds};

    #[test]
    fn converges_only_after_quiet_window() {
        let start = Instant::now();
        let window = Duration::from_secs(5);
        let mut capture = CalibrationCapture::new(window, start);

        assert_eq!(
            capture.observe(&AxisSample::new(10, 0, 0), start),
            CaptureStatus::Widened
        );
        assert_eq!(
            capture.observe(&AxisSample::new(10, 0, 0), start + window),
            CaptureStatus::Steady
        );
        let status = capture.observe(&AxisSample::new(5, 0, 0), start + window + Duration::from_millis(1));
        assert_eq!(status, CaptureStatus::Widened);

        let later = start + window * 2 + Duration::from_millis(2);
        match capture.observe(&AxisSample::new(7, 0, 0), later) {
            CaptureStatus::Converged(bounds) => {
                assert_eq!(bounds.axis(Axis::X), AxisBounds::new(5, 10));
            }
            other => panic!("expected convergence, got {:?}", other),
        }
        assert!(capture.is_done());
        assert_eq!(
            capture.observe(&AxisSample::new(-500, 0, 0), later),
            CaptureStatus::Done
        );
        assert_eq!(capture.bounds().axis(Axis::X).min, 5);
    }

    #[test]
    fn axes_are_widened_independently() {
        let now = Instant::now();
        let mut capture = CalibrationCapture::new(Duration::from_secs(1), now);
        capture.observe(&AxisSample::new(100, -3, 7), now);
        capture.observe(&AxisSample::new(0, 50, 7), now);
        let b = capture.bounds();
        assert_eq!(b.axis(Axis::X), AxisBounds::new(0, 100));
        assert_eq!(b.axis(Axis::Y), AxisBounds::new(-3, 50));
        assert_eq!(b.axis(Axis::Z), AxisBounds::new(7, 7));
    }

    #[test]
    fn stale_reading_does_not_widen() {
        let now = Instant::now();
        let mut capture = CalibrationCapture::new(Duration::from_secs(1), now);
        capture.observe(&AxisSample::new(1, 1, 1), now);
        let stale = RawReading::stale(AxisSample::new(900, 900, 900));
        assert_eq!(capture.observe_reading(&stale, now), CaptureStatus::Steady);
        assert_eq!(capture.bounds().axis(Axis::X), AxisBounds::new(1, 1));
    }
}
