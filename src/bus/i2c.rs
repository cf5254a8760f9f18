#[cfg(target_os = "linux")]
use i2cdev::linux::{LinuxI2CDevice, LinuxI2CError};
#[cfg(target_os = "linux")]
use i2cdev::core::I2CDevice;

use super::RegisterBus;
use crate::errors::BusError;
use async_trait::async_trait;

/// I2C bus error type - platform specific
#[cfg(target_os = "linux")]
pub type I2CError = LinuxI2CError;

#[cfg(not(target_os = "linux"))]
#[derive(Debug)]
pub struct I2CError(String);

#[cfg(not(target_os = "linux"))]
impl std::fmt::Display for I2CError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "I2C not supported on this platform: {}", self.0)
    }
}

#[cfg(not(target_os = "linux"))]
impl std::error::Error for I2CError {}

/// Longest SMBus i2c block transfer
pub const SMBUS_BLOCK_MAX: usize = 32;

/// Length of a block transfer as the byte SMBus expects.
pub fn block_len(reg: u8, len: usize) -> Result<u8, BusError> {
    if len > SMBUS_BLOCK_MAX {
        return Err(BusError::TransferTooLong {
            reg,
            len,
            max: SMBUS_BLOCK_MAX,
        });
    }
    Ok(len as u8)
}

/// I2C bus backed by a Linux i2c-dev character device
#[cfg(target_os = "linux")]
pub struct I2CBus {
    device: LinuxI2CDevice,
}

#[cfg(not(target_os = "linux"))]
pub struct I2CBus {
    _phantom: std::marker::PhantomData<()>,
}

#[cfg(target_os = "linux")]
impl I2CBus {
    pub fn new(path: &str) -> Result<Self, I2CError> {
        let device = LinuxI2CDevice::new(path, 0)?;
        Ok(Self { device })
    }
}

#[cfg(target_os = "linux")]
#[async_trait]
impl RegisterBus for I2CBus {
    async fn read_bytes(&mut self, address: u8, reg: u8, buf: &mut [u8]) -> Result<(), BusError> {
        self.device.set_slave_address(address as u16)?;

        if buf.len() == 1 {
            // Use SMBus read byte data for single byte reads
            buf[0] = self.device.smbus_read_byte_data(reg)?;
        } else {
            // Use SMBus block read for multi-byte reads
            let len = block_len(reg, buf.len())?;
            let block = self.device.smbus_read_i2c_block_data(reg, len)?;
            if block.len() != buf.len() {
                return Err(BusError::ShortRead {
                    reg,
                    expected: buf.len(),
                    actual: block.len(),
                });
            }
            buf.copy_from_slice(&block);
        }

        Ok(())
    }

    async fn write_bytes(&mut self, address: u8, reg: u8, data: &[u8]) -> Result<(), BusError> {
        self.device.set_slave_address(address as u16)?;
        match data {
            [byte] => self.device.smbus_write_byte_data(reg, *byte)?,
            _ => {
                block_len(reg, data.len())?;
                self.device.smbus_write_i2c_block_data(reg, data)?
            }
        }
        Ok(())
    }
}

#[cfg(not(target_os = "linux"))]
impl I2CBus {
    pub fn new(_path: &str) -> Result<Self, I2CError> {
        Err(I2CError("I2C is only supported on Linux".to_string()))
    }
}

#[cfg(not(target_os = "linux"))]
#[async_trait]
impl RegisterBus for I2CBus {
    async fn read_bytes(&mut self, _address: u8, _reg: u8, _buf: &mut [u8]) -> Result<(), BusError> {
        Err(I2CError("I2C is only supported on Linux".to_string()).into())
    }

    async fn write_bytes(&mut self, _address: u8, _reg: u8, _data: &[u8]) -> Result<(), BusError> {
        Err(I2CError("I2C is only supported on Linux".to_string()).into())
    }
}
