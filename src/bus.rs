pub mod i2c;
#[cfg(any(test, feature = "mock"))]
pub mod mock;

use crate::errors::BusError;
use async_trait::async_trait;

/// Register-addressed access to a device on a two-wire bus.
///
/// Drivers own their bus exclusively; sharing one physical bus between
/// several drivers is left to the implementation of this trait.
#[async_trait]
pub trait RegisterBus: Send {
    /// Read `buf.len()` consecutive registers starting at `reg`.
    async fn read_bytes(&mut self, address: u8, reg: u8, buf: &mut [u8]) -> Result<(), BusError>;

    /// Write `data` to consecutive registers starting at `reg`.
    async fn write_bytes(&mut self, address: u8, reg: u8, data: &[u8]) -> Result<(), BusError>;

    async fn write_byte(&mut self, address: u8, reg: u8, byte: u8) -> Result<(), BusError> {
        self.write_bytes(address, reg, &[byte]).await
    }
}
