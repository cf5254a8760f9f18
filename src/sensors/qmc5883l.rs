use super::{DriverState, Magnetometer, RawReading, StalePolicy, AxisSample};
use crate::bus::RegisterBus;
use crate::calibration::CalibrationParameters;
use crate::errors::{BusError, SensorError, SensorResult};
use crate::heading::Declination;
use crate::registers::qmc5883l::*;
use async_trait::async_trait;
use tokio::time::{sleep, Duration};
use tracing::{debug, warn};

const RESET_SETTLE: Duration = Duration::from_millis(100);
const CONFIG_SETTLE: Duration = Duration::from_millis(10);
const POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Offset added to the scaled die temperature
pub const DEFAULT_TEMPERATURE_OFFSET: f32 = 50.0;

/// QMC5883L driver.
///
/// Ready polling is unbounded. A failed transfer during a read is handled by
/// the stale policy, which defaults to reusing the last good frame.
pub struct Qmc5883l<B> {
    id: String,
    address: u8,
    bus: B,
    config: Config,
    state: DriverState,
    stale_policy: StalePolicy,
    temperature_offset: f32,
    declination: Declination,
    calibration: Option<CalibrationParameters>,
    frame: [u8; FRAME_LEN],
}

impl<B: RegisterBus> Qmc5883l<B> {
    pub fn new(id: String, bus: B) -> Self {
        Self {
            id,
            address: ADDRESS,
            bus,
            config: Config::default(),
            state: DriverState::Uninitialized,
            stale_policy: StalePolicy::ReuseStale,
            temperature_offset: DEFAULT_TEMPERATURE_OFFSET,
            declination: Declination::default(),
            calibration: None,
            frame: [0; FRAME_LEN],
        }
    }

    pub fn with_address(mut self, address: u8) -> Self {
        self.address = address;
        self
    }

    pub fn with_stale_policy(mut self, policy: StalePolicy) -> Self {
        self.stale_policy = policy;
        self
    }

    pub fn with_temperature_offset(mut self, offset: f32) -> Self {
        self.temperature_offset = offset;
        self
    }

    pub fn with_declination(mut self, declination: Declination) -> Self {
        self.declination = declination;
        self
    }

    /// Configuration used by the next reset
    pub fn with_config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> Config {
        self.config
    }

    /// Replace the whole configuration in one write.
    pub async fn set_config(&mut self, config: Config) -> SensorResult<()> {
        self.write_config(config).await?;
        Ok(())
    }

    pub fn release(self) -> B {
        self.bus
    }

    /// The stored config follows CONTROL1 as soon as that write lands, even
    /// if the CONTROL2 write then fails.
    async fn write_config(&mut self, config: Config) -> Result<(), BusError> {
        let control1 = config.control1();
        debug!("[{}] CONTROL1 <- {:#010b}", self.id, control1);
        self.bus.write_byte(self.address, CONTROL1, control1).await?;
        self.config = config;
        sleep(CONFIG_SETTLE).await;
        self.bus
            .write_byte(self.address, CONTROL2, CONTROL2_INT_DISABLE)
            .await?;
        sleep(CONFIG_SETTLE).await;
        Ok(())
    }

    fn invalid(&self, field: &'static str, value: u8) -> SensorError {
        SensorError::InvalidParameter {
            sensor: self.id.clone(),
            field,
            value,
        }
    }

    async fn status(&mut self) -> Result<u8, BusError> {
        let mut buf = [0u8; 1];
        self.bus.read_bytes(self.address, STATUS, &mut buf).await?;
        Ok(buf[0])
    }

    /// Data-ready test. An overrun with DRDY clear still counts as ready so
    /// a partially read frame cannot stall the poll loop.
    fn status_ready(&self, status: u8) -> bool {
        if status & STATUS_OVL != 0 {
            debug!("[{}] field exceeds the configured range", self.id);
        }
        if status & STATUS_DRDY != 0 {
            return true;
        }
        if status & STATUS_DOR != 0 {
            warn!("[{}] data overrun, reading previous frame", self.id);
            return true;
        }
        false
    }

    async fn fetch_frame(&mut self) -> Result<(), BusError> {
        loop {
            let status = self.status().await?;
            if self.status_ready(status) {
                break;
            }
            sleep(POLL_INTERVAL).await;
        }

        let mut frame = [0u8; FRAME_LEN];
        self.bus.read_bytes(self.address, DATA_X_LSB, &mut frame).await?;
        self.frame = frame;
        Ok(())
    }

    fn decode(&self) -> AxisSample {
        let f = &self.frame;
        AxisSample {
            x: i16::from_le_bytes([f[0], f[1]]),
            y: i16::from_le_bytes([f[2], f[3]]),
            z: i16::from_le_bytes([f[4], f[5]]),
            temperature: Some(i16::from_le_bytes([f[7], f[8]])),
        }
    }
}

#[async_trait]
impl<B: RegisterBus> Magnetometer for Qmc5883l<B> {
    async fn init(&mut self) -> SensorResult<()> {
        let mut chip_id = [0u8; 1];
        self.bus.read_bytes(self.address, CHIP_ID, &mut chip_id).await?;
        if chip_id[0] != CHIP_ID_VALUE {
            return Err(SensorError::WrongChipId {
                sensor: self.id.clone(),
                expected: CHIP_ID_VALUE,
                actual: chip_id[0],
            });
        }
        self.reset().await
    }

    async fn reset(&mut self) -> SensorResult<()> {
        self.bus
            .write_byte(self.address, CONTROL2, CONTROL2_SOFT_RST)
            .await?;
        sleep(RESET_SETTLE).await;
        self.bus
            .write_byte(self.address, SET_RESET_PERIOD, SET_RESET_PERIOD_RECOMMENDED)
            .await?;
        self.write_config(self.config).await?;
        self.state = DriverState::Configured;
        debug!("[{}] reset complete", self.id);
        Ok(())
    }

    async fn ready(&mut self) -> SensorResult<bool> {
        let status = self.status().await?;
        Ok(self.status_ready(status))
    }

    async fn read_raw(&mut self) -> SensorResult<RawReading> {
        if self.state == DriverState::Uninitialized {
            return Err(SensorError::NotInitialized {
                sensor: self.id.clone(),
            });
        }

        match self.fetch_frame().await {
            Ok(()) => Ok(RawReading::fresh(self.decode())),
            Err(e) => match self.stale_policy {
                StalePolicy::Fail => Err(e.into()),
                StalePolicy::ReuseStale => {
                    warn!("[{}] read failed, reusing previous frame: {}", self.id, e);
                    Ok(RawReading::stale(self.decode()))
                }
            },
        }
    }

    async fn set_range(&mut self, code: u8) -> SensorResult<()> {
        let range = Range::try_from(code).map_err(|v| self.invalid("range", v))?;
        self.set_config(Config { range, ..self.config }).await
    }

    async fn set_oversampling(&mut self, code: u8) -> SensorResult<()> {
        let oversampling = Oversampling::try_from(code).map_err(|v| self.invalid("oversampling", v))?;
        self.set_config(Config { oversampling, ..self.config }).await
    }

    async fn set_sampling_rate(&mut self, code: u8) -> SensorResult<()> {
        let rate = OutputRate::try_from(code).map_err(|v| self.invalid("sampling rate", v))?;
        self.set_config(Config { rate, ..self.config }).await
    }

    async fn set_mode(&mut self, code: u8) -> SensorResult<()> {
        let mode = Mode::try_from(code).map_err(|v| self.invalid("mode", v))?;
        self.set_config(Config { mode, ..self.config }).await
    }

    fn lsb_per_gauss(&self) -> f32 {
        self.config.range.lsb_per_gauss()
    }

    fn temperature_celsius(&self, raw: f32) -> Option<f32> {
        Some(raw / 100.0 + self.temperature_offset)
    }

    fn calibration(&self) -> Option<&CalibrationParameters> {
        self.calibration.as_ref()
    }

    fn set_calibration(&mut self, parameters: CalibrationParameters) {
        self.calibration = Some(parameters);
    }

    fn declination(&self) -> Declination {
        self.declination
    }

    fn id(&self) -> &str {
        &self.id
    }

    fn state(&self) -> DriverState {
        self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::mock::MockBus;

    fn frame(x: i16, y: i16, z: i16, temp: i16) -> Vec<u8> {
        let mut f = Vec::with_capacity(FRAME_LEN);
        f.extend_from_slice(&x.to_le_bytes());
        f.extend_from_slice(&y.to_le_bytes());
        f.extend_from_slice(&z.to_le_bytes());
        f.push(STATUS_DRDY);
        f.extend_from_slice(&temp.to_le_bytes());
        f
    }

    async fn configured(bus: &MockBus) -> Qmc5883l<MockBus> {
        bus.set_register(CHIP_ID, CHIP_ID_VALUE);
        bus.set_register(STATUS, STATUS_DRDY);
        let mut mag = Qmc5883l::new("mag0".to_string(), bus.clone());
        mag.init().await.unwrap();
        bus.clear_writes();
        mag
    }

    #[tokio::test(start_paused = true)]
    async fn decodes_little_endian_frame() {
        let bus = MockBus::new();
        let mut mag = configured(&bus).await;
        bus.queue_read(DATA_X_LSB, frame(-1980, 1577, -3, 2345));

        let reading = mag.read_raw().await.unwrap();
        assert!(!reading.is_stale());
        assert_eq!(
            reading.sample,
            AxisSample {
                x: -1980,
                y: 1577,
                z: -3,
                temperature: Some(2345)
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn overrun_without_drdy_counts_as_ready() {
        let bus = MockBus::new();
        let mut mag = configured(&bus).await;
        bus.queue_reads(STATUS, [vec![0x00], vec![STATUS_DOR]]);

        assert!(!mag.ready().await.unwrap());
        assert!(mag.ready().await.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn polls_until_data_ready() {
        let bus = MockBus::new();
        let mut mag = configured(&bus).await;
        bus.queue_reads(STATUS, [vec![0], vec![0], vec![0]]);

        mag.read_raw().await.unwrap();
        assert_eq!(bus.read_count(STATUS), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn temperature_uses_offset() {
        let bus = MockBus::new();
        let mut mag = configured(&bus).await;
        bus.queue_read(DATA_X_LSB, frame(3000, -6000, 0, 1250));

        let scaled = mag.read_scaled().await.unwrap();
        assert_eq!(scaled.x, 1.0);
        assert_eq!(scaled.y, -2.0);
        assert_eq!(scaled.temperature, Some(12.5 + DEFAULT_TEMPERATURE_OFFSET));
    }
}
