use thiserror::Error;
use crate::bus::i2c::I2CError;
use crate::calibration::Axis;

/// Transport-level failures reported by a [`RegisterBus`](crate::bus::RegisterBus)
#[derive(Error, Debug)]
pub enum BusError {
    #[error("I2C communication failed: {0}")]
    I2c(#[from] I2CError),

    #[error("device {address:#04x} did not acknowledge register {reg:#04x}")]
    NoResponse { address: u8, reg: u8 },

    #[error("short read at register {reg:#04x}: expected {expected} bytes, got {actual}")]
    ShortRead { reg: u8, expected: usize, actual: usize },

    #[error("transfer of {len} bytes at register {reg:#04x} exceeds the {max}-byte block limit")]
    TransferTooLong { reg: u8, len: usize, max: usize },
}

/// Errors raised by the magnetometer drivers and the reading pipeline
#[derive(Error, Debug)]
pub enum SensorError {
    #[error("bus transfer failed: {0}")]
    Bus(#[from] BusError),

    #[error("Sensor '{sensor}' rejected {field} code {value}")]
    InvalidParameter { sensor: String, field: &'static str, value: u8 },

    #[error("Sensor '{sensor}' not ready after {retries} polls")]
    Timeout { sensor: String, retries: u32 },

    #[error("Sensor '{sensor}' wrong chip ID: expected {expected:#04x}, got {actual:#04x}")]
    WrongChipId { sensor: String, expected: u8, actual: u8 },

    #[error("Sensor '{sensor}' has not been reset yet")]
    NotInitialized { sensor: String },

    #[error("Sensor '{sensor}' has no calibration parameters")]
    NotCalibrated { sensor: String },

    #[error("calibration rejected: {0}")]
    Calibration(#[from] CalibrationError),

    #[error("{0}")]
    Declination(#[from] DeclinationError),

    #[error("smoothing needs at least 3 samples, got {steps}")]
    InvalidSmoothing { steps: usize },

    #[error("Unsupported sensor driver: '{driver}'")]
    UnsupportedDriver { driver: String },
}

/// Degenerate calibration bounds; scale factors would be undefined
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalibrationError {
    #[error("{axis} axis was never observed")]
    Unobserved { axis: Axis },

    #[error("{axis} axis bounds are inverted (min {min} > max {max})")]
    Inverted { axis: Axis, min: i32, max: i32 },

    #[error("{axis} axis has zero range, rotate the sensor through more orientations")]
    ZeroRange { axis: Axis },
}

/// Declination more than half a turn either way
#[derive(Error, Debug, Clone, Copy, PartialEq)]
#[error("declination of {radians} rad is outside ±π")]
pub struct DeclinationError {
    pub radians: f64,
}

/// Configuration-related errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration from '{path}': {source}")]
    LoadError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid configuration format: {0}")]
    FormatError(#[from] toml::de::Error),

    #[error("Invalid configuration value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

/// Registry and initialization errors
#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("Failed to open bus '{path}': {source}")]
    BusInitError {
        path: String,
        #[source]
        source: BusError,
    },

    #[error("Failed to create sensor driver: {0}")]
    DriverCreationError(#[source] SensorError),

    #[error("Sensor initialization failed: {0}")]
    RegistrationError(#[source] SensorError),
}

/// Result type aliases for convenience
pub type SensorResult<T> = Result<T, SensorError>;
pub type ConfigResult<T> = Result<T, ConfigError>;
pub type RegistryResult<T> = Result<T, RegistryError>;

/// Top-level failures of the `qmc5883` binary
#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Sensor(#[from] SensorError),

    #[error("Failed to encode calibration record: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Failed to encode calibration record: {0}")]
    Toml(#[from] toml::ser::Error),

    #[error("Unknown mode '{0}', expected 'stream' or 'capture'")]
    UnknownMode(String),
}

pub type AppResult<T> = Result<T, AppError>;
