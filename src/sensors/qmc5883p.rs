use super::{AxisSample, DriverState, Magnetometer, RawReading, StalePolicy};
use crate::bus::RegisterBus;
use crate::calibration::CalibrationParameters;
use crate::errors::{BusError, SensorError, SensorResult};
use crate::heading::Declination;
use crate::registers::qmc5883p::*;
use async_trait::async_trait;
use tokio::time::{sleep, Duration};
use tracing::{debug, warn};

const RESET_SETTLE: Duration = Duration::from_millis(1);
const POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Status polls before a read gives up
pub const READY_RETRIES: u32 = 100;

/// QMC5883P driver.
///
/// Ready polling is bounded by [`READY_RETRIES`]. There is no temperature
/// channel. With auto-range enabled, an overflow flag seen while polling
/// steps the range one notch wider.
pub struct Qmc5883p<B> {
    id: String,
    address: u8,
    bus: B,
    config: Config,
    state: DriverState,
    stale_policy: StalePolicy,
    auto_range: bool,
    declination: Declination,
    calibration: Option<CalibrationParameters>,
    frame: [u8; FRAME_LEN],
}

/// Why a frame could not be fetched
enum FetchError {
    Bus(BusError),
    Timeout,
}

impl From<BusError> for FetchError {
    fn from(e: BusError) -> Self {
        FetchError::Bus(e)
    }
}

impl<B: RegisterBus> Qmc5883p<B> {
    pub fn new(id: String, bus: B) -> Self {
        Self {
            id,
            address: ADDRESS,
            bus,
            config: Config::default(),
            state: DriverState::Uninitialized,
            stale_policy: StalePolicy::Fail,
            auto_range: false,
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

    pub fn with_auto_range(mut self, enabled: bool) -> Self {
        self.auto_range = enabled;
        self
    }

    pub fn with_declination(mut self, declination: Declination) -> Self {
        self.declination = declination;
        self
    }

    pub fn with_config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> Config {
        self.config
    }

    pub async fn set_config(&mut self, config: Config) -> SensorResult<()> {
        self.write_config(config).await?;
        Ok(())
    }

    pub fn release(self) -> B {
        self.bus
    }

    /// Each register's fields are committed once its write lands, so a
    /// failed CONTROL2 write leaves the old range with the new CONTROL1 fields.
    async fn write_config(&mut self, config: Config) -> Result<(), BusError> {
        let (control1, control2) = (config.control1(), config.control2());
        debug!(
            "[{}] CONTROL1 <- {:#010b}, CONTROL2 <- {:#010b}",
            self.id, control1, control2
        );
        self.bus.write_byte(self.address, CONTROL1, control1).await?;
        self.config = Config {
            range: self.config.range,
            ..config
        };
        self.bus.write_byte(self.address, CONTROL2, control2).await?;
        self.config = config;
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

    async fn widen_range(&mut self) -> Result<(), BusError> {
        let Some(range) = self.config.range.wider() else {
            return Ok(());
        };
        warn!(
            "[{}] field overflow, widening range {:?} -> {:?}",
            self.id, self.config.range, range
        );
        self.write_config(Config { range, ..self.config }).await
    }

    async fn fetch_frame(&mut self) -> Result<(), FetchError> {
        let mut ready = false;
        for _ in 0..READY_RETRIES {
            sleep(POLL_INTERVAL).await;
            let status = self.status().await?;
            if self.auto_range && status & STATUS_OVFL != 0 {
                self.widen_range().await?;
            }
            if status & STATUS_DRDY != 0 {
                ready = true;
                break;
            }
        }
        if !ready {
            return Err(FetchError::Timeout);
        }

        let mut frame = [0u8; FRAME_LEN];
        self.bus.read_bytes(self.address, DATA_X_LSB, &mut frame).await?;
        self.frame = frame;
        Ok(())
    }

    fn decode(&self) -> AxisSample {
        let f = &self.frame;
        AxisSample::new(
            i16::from_le_bytes([f[0], f[1]]),
            i16::from_le_bytes([f[2], f[3]]),
            i16::from_le_bytes([f[4], f[5]]),
        )
    }
}

#[async_trait]
impl<B: RegisterBus> Magnetometer for Qmc5883p<B> {
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
            .write_byte(self.address, AXIS_SIGN, AXIS_SIGN_DEFAULT)
            .await?;
        self.write_config(self.config).await?;
        self.state = DriverState::Configured;
        debug!("[{}] reset complete", self.id);
        Ok(())
    }

    async fn ready(&mut self) -> SensorResult<bool> {
        Ok(self.status().await? & STATUS_DRDY != 0)
    }

    async fn read_raw(&mut self) -> SensorResult<RawReading> {
        if self.state == DriverState::Uninitialized {
            return Err(SensorError::NotInitialized {
                sensor: self.id.clone(),
            });
        }

        match self.fetch_frame().await {
            Ok(()) => Ok(RawReading::fresh(self.decode())),
            Err(FetchError::Timeout) => Err(SensorError::Timeout {
                sensor: self.id.clone(),
                retries: READY_RETRIES,
            }),
            Err(FetchError::Bus(e)) => match self.stale_policy {
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

    fn temperature_celsius(&self, _raw: f32) -> Option<f32> {
        None
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
