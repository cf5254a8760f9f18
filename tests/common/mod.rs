#![allow(dead_code)]

use qmc5883::bus::mock::MockBus;
use qmc5883::registers::{qmc5883l, qmc5883p};
use qmc5883::sensors::qmc5883l::Qmc5883l;
use qmc5883::sensors::qmc5883p::Qmc5883p;
use qmc5883::Magnetometer;

/// QMC5883L data frame: x, y, z, status, temperature
pub fn l_frame(x: i16, y: i16, z: i16, temp: i16) -> Vec<u8> {
    let mut f = Vec::with_capacity(qmc5883l::FRAME_LEN);
    f.extend_from_slice(&x.to_le_bytes());
    f.extend_from_slice(&y.to_le_bytes());
    f.extend_from_slice(&z.to_le_bytes());
    f.push(qmc5883l::STATUS_DRDY);
    f.extend_from_slice(&temp.to_le_bytes());
    f
}

/// QMC5883P data frame: x, y, z
pub fn p_frame(x: i16, y: i16, z: i16) -> Vec<u8> {
    [x, y, z].iter().flat_map(|v| v.to_le_bytes()).collect()
}

/// Bus that answers the QMC5883L identity check and always reports data ready
pub fn l_bus() -> MockBus {
    let bus = MockBus::new();
    bus.set_register(qmc5883l::CHIP_ID, qmc5883l::CHIP_ID_VALUE);
    bus.set_register(qmc5883l::STATUS, qmc5883l::STATUS_DRDY);
    bus
}

pub fn p_bus() -> MockBus {
    let bus = MockBus::new();
    bus.set_register(qmc5883p::CHIP_ID, qmc5883p::CHIP_ID_VALUE);
    bus.set_register(qmc5883p::STATUS, qmc5883p::STATUS_DRDY);
    bus
}

pub async fn l_ready(bus: &MockBus) -> Qmc5883l<MockBus> {
    let mut mag = Qmc5883l::new("mag0".to_string(), bus.clone());
    mag.init().await.unwrap();
    bus.clear_writes();
    mag
}

pub async fn p_ready(bus: &MockBus) -> Qmc5883p<MockBus> {
    let mut mag = Qmc5883p::new("mag1".to_string(), bus.clone());
    mag.init().await.unwrap();
    bus.clear_writes();
    mag
}

pub fn close(a: f32, b: f32) -> bool {
    (a - b).abs() <= 1e-3 * b.abs().max(1.0)
}
