pub mod sensor_config;
pub mod bus_config;

pub use sensor_config::{
    load_compass_config, parse_compass_config, CaptureEntry, CompassConfig, DeclinationEntry,
    SensorEntry,
};
pub use bus_config::BusEntry;
