//! Drivers for the QMC5883L and QMC5883P three-axis magnetometers, with
//! smoothing, min/max calibration, compass heading and calibration capture.

pub mod bus;
pub mod calibration;
pub mod capture;
pub mod config;
pub mod errors;
pub mod filter;
pub mod heading;
pub mod registers;
pub mod registry;
pub mod scheduler;
pub mod sensors;

pub use calibration::{Axis, CalibrationBounds, CalibrationParameters};
pub use capture::{capture_calibration, CalibrationCapture, CaptureSettings, CaptureStatus};
pub use errors::{
    AppError, AppResult, BusError, CalibrationError, DeclinationError, SensorError, SensorResult,
};
pub use heading::{Declination, Heading};
pub use sensors::{
    create_sensor_driver, AxisSample, Freshness, MagReading, Magnetometer, RawReading, ReadOptions,
    StalePolicy,
};

use std::str::FromStr;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Install the fmt subscriber. RUST_LOG overrides the INFO default.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunMode {
    /// Periodic reads with heading
    #[default]
    Stream,
    /// Run the calibration capture once and print the bounds
    Capture,
}

impl FromStr for RunMode {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "stream" => Ok(RunMode::Stream),
            "capture" => Ok(RunMode::Capture),
            other => Err(AppError::UnknownMode(other.to_string())),
        }
    }
}

/// Render captured bounds as a `[sensor.calibration]` table for compass.toml
pub fn calibration_snippet(bounds: &CalibrationBounds) -> AppResult<String> {
    Ok(format!("[sensor.calibration]\n{}", toml::to_string(bounds)?))
}

/// Load `<config_dir>/compass.toml`, bring up the sensor and run `mode`.
pub async fn run_compass(config_dir: &str, mode: RunMode) -> AppResult<()> {
    let path = format!("{}/compass.toml", config_dir);
    let config = config::load_compass_config(&path)?;
    info!("[config] loaded sensor '{}' ({})", config.sensor.id, config.sensor.driver);

    let mut mag = registry::init_compass(&config).await?;

    match mode {
        RunMode::Capture => {
            let bounds = capture_calibration(mag.as_mut(), &config.capture.to_settings()).await?;
            println!("{}", serde_json::to_string(&bounds)?);
            println!("{}", calibration_snippet(&bounds)?);
            bounds.validate().map_err(SensorError::from)?;
        }
        RunMode::Stream => {
            let frequency = config.sensor.frequency.unwrap_or(scheduler::DEFAULT_FREQUENCY);
            scheduler::run_stream(mag.as_mut(), config.sensor.read, frequency, None).await;
        }
    }
    Ok(())
}
