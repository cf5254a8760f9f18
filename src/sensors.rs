use crate::bus::RegisterBus;
use crate::calibration::CalibrationParameters;
use crate::config::SensorEntry;
use crate::errors::{SensorError, SensorResult};
use crate::filter::{self, SmoothedSample};
use crate::heading::{Declination, Heading};
use async_trait::async_trait;
use serde::Deserialize;

#[cfg(feature = "qmc5883l")]
pub mod qmc5883l;
#[cfg(feature = "qmc5883p")]
pub mod qmc5883p;

/// One decoded register frame, in raw counts
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct AxisSample {
    pub x: i16,
    pub y: i16,
    pub z: i16,
    /// Absent on variants without a temperature channel
    pub temperature: Option<i16>,
}

impl AxisSample {
    pub fn new(x: i16, y: i16, z: i16) -> Self {
        Self {
            x,
            y,
            z,
            temperature: None,
        }
    }

    pub fn axes(&self) -> [i16; 3] {
        [self.x, self.y, self.z]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    /// Read from the device during this call
    Fresh,
    /// Last good frame, reused because the bus transfer failed
    Stale,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawReading {
    pub sample: AxisSample,
    pub freshness: Freshness,
}

impl RawReading {
    pub fn fresh(sample: AxisSample) -> Self {
        Self {
            sample,
            freshness: Freshness::Fresh,
        }
    }

    pub fn stale(sample: AxisSample) -> Self {
        Self {
            sample,
            freshness: Freshness::Stale,
        }
    }

    pub fn is_stale(&self) -> bool {
        self.freshness == Freshness::Stale
    }
}

/// What a driver does when a bus transfer fails mid-read
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StalePolicy {
    /// Log the failure and return the previous frame marked stale
    ReuseStale,
    /// Propagate the bus error to the caller
    Fail,
}

/// Lifecycle of a driver instance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverState {
    Uninitialized,
    Configured,
}

/// Stages applied by [`Magnetometer::read`], always in the order
/// smoothing, calibration, scaling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ReadOptions {
    pub scaled: bool,
    pub calibrated: bool,
    pub smoothed: bool,
    pub smooth_steps: usize,
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self {
            scaled: false,
            calibrated: false,
            smoothed: false,
            smooth_steps: 10,
        }
    }
}

/// Output of the reading pipeline.
///
/// Axes are in raw counts unless scaling was requested, in which case they
/// are in gauss and the temperature in °C.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MagReading {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub temperature: Option<f32>,
    pub freshness: Freshness,
}

impl MagReading {
    pub fn axes(&self) -> [f32; 3] {
        [self.x, self.y, self.z]
    }
}

/// Capability shared by every magnetometer variant.
///
/// Setters take the variant's raw field code and reject codes outside its
/// legal set with [`SensorError::InvalidParameter`], leaving the current
/// configuration untouched. Every accepted change rewrites the full
/// configuration to the device.
#[async_trait]
pub trait Magnetometer: Send {
    /// Check chip identity, then reset.
    async fn init(&mut self) -> SensorResult<()>;
    /// Soft reset, settle, then write the current configuration.
    async fn reset(&mut self) -> SensorResult<()>;
    /// True when the status register reports fresh data.
    async fn ready(&mut self) -> SensorResult<bool>;
    /// Wait for data ready and decode one frame.
    async fn read_raw(&mut self) -> SensorResult<RawReading>;

    async fn set_range(&mut self, code: u8) -> SensorResult<()>;
    async fn set_oversampling(&mut self, code: u8) -> SensorResult<()>;
    async fn set_sampling_rate(&mut self, code: u8) -> SensorResult<()>;
    async fn set_mode(&mut self, code: u8) -> SensorResult<()>;

    /// Counts per gauss at the current range
    fn lsb_per_gauss(&self) -> f32;
    /// Convert a raw temperature value, `None` if the variant has no sensor.
    fn temperature_celsius(&self, raw: f32) -> Option<f32>;

    fn calibration(&self) -> Option<&CalibrationParameters>;
    fn set_calibration(&mut self, parameters: CalibrationParameters);
    fn declination(&self) -> Declination;

    fn id(&self) -> &str;
    fn state(&self) -> DriverState;

    /// One raw read converted to gauss and °C.
    async fn read_scaled(&mut self) -> SensorResult<MagReading> {
        let raw = self.read_raw().await?;
        let lsb = self.lsb_per_gauss();
        Ok(MagReading {
            x: f32::from(raw.sample.x) / lsb,
            y: f32::from(raw.sample.y) / lsb,
            z: f32::from(raw.sample.z) / lsb,
            temperature: raw
                .sample
                .temperature
                .and_then(|t| self.temperature_celsius(f32::from(t))),
            freshness: raw.freshness,
        })
    }

    /// `steps` raw reads reduced by [`filter::smooth`].
    async fn read_smoothed(&mut self, steps: usize) -> SensorResult<SmoothedSample> {
        if steps < filter::MIN_SMOOTHING_STEPS {
            return Err(SensorError::InvalidSmoothing { steps });
        }
        let mut readings = Vec::with_capacity(steps);
        for _ in 0..steps {
            readings.push(self.read_raw().await?);
        }
        filter::smooth(&readings)
    }

    async fn read(&mut self, options: ReadOptions) -> SensorResult<MagReading> {
        let calibration = if options.calibrated {
            let parameters = self.calibration().copied().ok_or_else(|| SensorError::NotCalibrated {
                sensor: self.id().to_string(),
            })?;
            Some(parameters)
        } else {
            None
        };

        let (mut axes, mut temperature, freshness) = if options.smoothed {
            let s = self.read_smoothed(options.smooth_steps).await?;
            (s.axes(), s.temperature, s.freshness)
        } else {
            let raw = self.read_raw().await?;
            (
                raw.sample.axes().map(f32::from),
                raw.sample.temperature.map(f32::from),
                raw.freshness,
            )
        };

        if let Some(parameters) = calibration {
            axes = parameters.apply(axes);
        }

        if options.scaled {
            let lsb = self.lsb_per_gauss();
            axes = axes.map(|v| v / lsb);
            temperature = temperature.and_then(|t| self.temperature_celsius(t));
        }

        let [x, y, z] = axes;
        Ok(MagReading {
            x,
            y,
            z,
            temperature,
            freshness,
        })
    }

    /// Bearing of the horizontal components with this driver's declination
    fn heading(&self, x: f32, y: f32) -> Heading {
        Heading::from_components(x, y, self.declination())
    }
}

/// Build the driver named by `entry.driver` on top of `bus`, applying the
/// entry's declination, read policies and stored calibration.
pub fn create_sensor_driver<B>(entry: &SensorEntry, bus: B) -> SensorResult<Box<dyn Magnetometer>>
where
    B: RegisterBus + 'static,
{
    let declination = entry.declination.to_declination()?;
    let mut driver: Box<dyn Magnetometer> = match entry.driver.as_str() {
        #[cfg(feature = "qmc5883l")]
        "qmc5883l" => {
            let mut d = qmc5883l::Qmc5883l::new(entry.id.clone(), bus)
                .with_declination(declination);
            if let Some(address) = entry.address {
                d = d.with_address(address);
            }
            if let Some(policy) = entry.stale_policy {
                d = d.with_stale_policy(policy);
            }
            if let Some(offset) = entry.temperature_offset {
                d = d.with_temperature_offset(offset);
            }
            Box::new(d)
        }
        #[cfg(feature = "qmc5883p")]
        "qmc5883p" => {
            let mut d = qmc5883p::Qmc5883p::new(entry.id.clone(), bus)
                .with_declination(declination)
                .with_auto_range(entry.auto_range);
            if let Some(address) = entry.address {
                d = d.with_address(address);
            }
            if let Some(policy) = entry.stale_policy {
                d = d.with_stale_policy(policy);
            }
            Box::new(d)
        }
        _ => {
            return Err(SensorError::UnsupportedDriver {
                driver: entry.driver.clone(),
            })
        }
    };

    if let Some(bounds) = entry.calibration {
        driver.set_calibration(CalibrationParameters::from_bounds(&bounds)?);
    }

    Ok(driver)
}
