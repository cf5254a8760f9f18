use super::bus_config::BusEntry;
use crate::calibration::CalibrationBounds;
use crate::capture::CaptureSettings;
use crate::errors::{ConfigError, ConfigResult, DeclinationError};
use crate::filter::MIN_SMOOTHING_STEPS;
use crate::heading::Declination;
use crate::scheduler::MAX_FREQUENCY;
use crate::sensors::{ReadOptions, StalePolicy};
use serde::Deserialize;
use std::fs;
use tokio::time::Duration;

const KNOWN_DRIVERS: &[&str] = &["qmc5883l", "qmc5883p"];

/// Root of `compass.toml`
#[derive(Debug, Clone, Deserialize)]
pub struct CompassConfig {
    #[serde(default)]
    pub bus: BusEntry,
    pub sensor: SensorEntry,
    #[serde(default)]
    pub capture: CaptureEntry,
}

/// The `[sensor]` table
#[derive(Debug, Clone, Deserialize)]
pub struct SensorEntry {
    pub id: String,
    pub driver: String,
    /// Overrides the variant's fixed bus address
    pub address: Option<u8>,
    /// Streaming rate in Hz
    pub frequency: Option<u32>,
    #[serde(default)]
    pub declination: DeclinationEntry,
    pub temperature_offset: Option<f32>,
    pub stale_policy: Option<StalePolicy>,
    #[serde(default)]
    pub auto_range: bool,
    pub calibration: Option<CalibrationBounds>,
    #[serde(default)]
    pub read: ReadOptions,
}

impl SensorEntry {
    /// Entry with every optional field left at its default
    pub fn new(id: &str, driver: &str) -> Self {
        Self {
            id: id.to_string(),
            driver: driver.to_string(),
            address: None,
            frequency: None,
            declination: DeclinationEntry::default(),
            temperature_offset: None,
            stale_policy: None,
            auto_range: false,
            calibration: None,
            read: ReadOptions::default(),
        }
    }
}

/// `declination = { degrees = 5, minutes = 37 }`
#[derive(Debug, Default, Clone, Copy, Deserialize)]
pub struct DeclinationEntry {
    pub degrees: i16,
    #[serde(default)]
    pub minutes: i16,
}

impl DeclinationEntry {
    pub fn to_declination(self) -> Result<Declination, DeclinationError> {
        Declination::new(self.degrees, self.minutes)
    }
}

/// The `[capture]` table
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct CaptureEntry {
    pub window_secs: u64,
    pub sample_interval_ms: u64,
}

impl Default for CaptureEntry {
    fn default() -> Self {
        Self {
            window_secs: 5,
            sample_interval_ms: 10,
        }
    }
}

impl CaptureEntry {
    pub fn to_settings(self) -> CaptureSettings {
        CaptureSettings {
            window: Duration::from_secs(self.window_secs),
            sample_interval: Duration::from_millis(self.sample_interval_ms),
        }
    }
}

fn invalid(field: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::InvalidValue {
        field: field.to_string(),
        reason: reason.into(),
    }
}

impl CompassConfig {
    fn validate(&self) -> ConfigResult<()> {
        let sensor = &self.sensor;
        if !KNOWN_DRIVERS.contains(&sensor.driver.as_str()) {
            return Err(invalid(
                "sensor.driver",
                format!("unknown driver '{}', expected one of {:?}", sensor.driver, KNOWN_DRIVERS),
            ));
        }
        if let Some(frequency) = sensor.frequency {
            if frequency == 0 || frequency > MAX_FREQUENCY {
                return Err(invalid(
                    "sensor.frequency",
                    format!("must be between 1 and {} Hz", MAX_FREQUENCY),
                ));
            }
        }
        sensor
            .declination
            .to_declination()
            .map_err(|e| invalid("sensor.declination", e.to_string()))?;
        if sensor.read.smoothed && sensor.read.smooth_steps < MIN_SMOOTHING_STEPS {
            return Err(invalid(
                "sensor.read.smooth_steps",
                format!("smoothing needs at least {} steps", MIN_SMOOTHING_STEPS),
            ));
        }
        if let Some(bounds) = &sensor.calibration {
            bounds
                .validate()
                .map_err(|e| invalid("sensor.calibration", e.to_string()))?;
        }
        if self.capture.window_secs == 0 {
            return Err(invalid("capture.window_secs", "must be at least 1 second"));
        }
        Ok(())
    }
}

/// Parse and validate a TOML document
pub fn parse_compass_config(content: &str) -> ConfigResult<CompassConfig> {
    let parsed: CompassConfig = toml::from_str(content)?;
    parsed.validate()?;
    Ok(parsed)
}

/// Loads config from TOML file
pub fn load_compass_config(path: &str) -> ConfigResult<CompassConfig> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::LoadError {
        path: path.to_string(),
        source,
    })?;
    parse_compass_config(&content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calibration::Axis;

    const FULL: &str = r#"
        [bus]
        path = "/dev/i2c-3"

        [sensor]
        id = "mag0"
        driver = "qmc5883l"
        address = 0x0D
        frequency = 20
        temperature_offset = 42.5
        stale_policy = "fail"
        declination = { degrees = -5, minutes = 37 }

        [sensor.calibration]
        x_min = -1980
        x_max = 1577
        y_min = -3975
        y_max = -713
        z_min = -1650
        z_max = 1576

        [sensor.read]
        calibrated = true
        smoothed = true
        smooth_steps = 5

        [capture]
        window_secs = 8
    "#;

    #[test]
    fn parses_full_document() {
        let cfg = parse_compass_config(FULL).unwrap();
        assert_eq!(cfg.bus.path, "/dev/i2c-3");
        assert_eq!(cfg.sensor.address, Some(0x0D));
        assert_eq!(cfg.sensor.stale_policy, Some(StalePolicy::Fail));
        assert_eq!(cfg.sensor.declination.degrees, -5);
        let bounds = cfg.sensor.calibration.unwrap();
        assert_eq!(bounds.axis(Axis::Y).min, -3975);
        assert_eq!(
            cfg.sensor.read,
            ReadOptions {
                scaled: false,
                calibrated: true,
                smoothed: true,
                smooth_steps: 5
            }
        );
        let settings = cfg.capture.to_settings();
        assert_eq!(settings.window, Duration::from_secs(8));
        assert_eq!(settings.sample_interval, Duration::from_millis(10));
    }

    #[test]
    fn minimal_document_uses_defaults() {
        let cfg = parse_compass_config("[sensor]\nid = \"m\"\ndriver = \"qmc5883p\"\n").unwrap();
        assert_eq!(cfg.bus.path, "/dev/i2c-1");
        assert_eq!(cfg.sensor.read, ReadOptions::default());
        assert!(cfg.sensor.calibration.is_none());
        assert_eq!(cfg.capture.window_secs, 5);
    }

    #[test]
    fn rejects_unknown_driver() {
        let err = parse_compass_config("[sensor]\nid = \"m\"\ndriver = \"hmc5883l\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { field, .. } if field == "sensor.driver"));
    }

    #[test]
    fn rejects_flat_calibration_axis() {
        let doc = r#"
            [sensor]
            id = "m"
            driver = "qmc5883l"
            calibration = { x_min = -1, x_max = 1, y_min = 4, y_max = 4, z_min = -1, z_max = 1 }
        "#;
        let err = parse_compass_config(doc).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { field, .. } if field == "sensor.calibration"));
    }

    #[test]
    fn rejects_out_of_range_frequency() {
        for frequency in ["0", "1001", "2000000"] {
            let doc = format!(
                "[sensor]\nid = \"m\"\ndriver = \"qmc5883l\"\nfrequency = {}\n",
                frequency
            );
            let err = parse_compass_config(&doc).unwrap_err();
            assert!(matches!(err, ConfigError::InvalidValue { field, .. } if field == "sensor.frequency"));
        }
        let ok = "[sensor]\nid = \"m\"\ndriver = \"qmc5883l\"\nfrequency = 1000\n";
        assert_eq!(parse_compass_config(ok).unwrap().sensor.frequency, Some(1000));
    }

    #[test]
    fn rejects_declination_past_half_turn() {
        let doc = r#"
            [sensor]
            id = "m"
            driver = "qmc5883l"
            declination = { degrees = 200, minutes = 0 }
        "#;
        let err = parse_compass_config(doc).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { field, .. } if field == "sensor.declination"));
    }

    #[test]
    fn rejects_short_smoothing() {
        let doc = r#"
            [sensor]
            id = "m"
            driver = "qmc5883l"
            read = { smoothed = true, smooth_steps = 2 }
        "#;
        assert!(parse_compass_config(doc).is_err());
    }

    #[test]
    fn missing_file_reports_path() {
        let err = load_compass_config("/nonexistent/compass.toml").unwrap_err();
        assert!(matches!(err, ConfigError::LoadError { path, .. } if path == "/nonexistent/compass.toml"));
    }
}
