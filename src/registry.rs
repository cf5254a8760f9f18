use crate::bus::i2c::I2CBus;
use crate::config::CompassConfig;
use crate::errors::{RegistryError, RegistryResult};
use crate::sensors::{create_sensor_driver, Magnetometer};
use tracing::info;

/// Open the configured bus, build the driver and run its init sequence.
pub async fn init_compass(config: &CompassConfig) -> RegistryResult<Box<dyn Magnetometer>> {
    let bus = I2CBus::new(&config.bus.path).map_err(|e| RegistryError::BusInitError {
        path: config.bus.path.clone(),
        source: e.into(),
    })?;

    let entry = &config.sensor;
    let mut sensor = create_sensor_driver(entry, bus).map_err(RegistryError::DriverCreationError)?;
    info!(
        "[registry] registering sensor: id={} driver={} bus={}",
        entry.id, entry.driver, config.bus.path
    );
    sensor.init().await.map_err(RegistryError::RegistrationError)?;
    Ok(sensor)
}
