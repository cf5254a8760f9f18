//! QMC5883L register map

/// Fixed 7-bit bus address
pub const ADDRESS: u8 = 0x0D;

// Register addresses
pub const DATA_X_LSB: u8 = 0x00;
pub const STATUS: u8 = 0x06;
pub const TEMP_LSB: u8 = 0x07;
pub const CONTROL1: u8 = 0x09;
pub const CONTROL2: u8 = 0x0A;
pub const SET_RESET_PERIOD: u8 = 0x0B;
pub const CHIP_ID: u8 = 0x0D;

pub const CHIP_ID_VALUE: u8 = 0xFF;

/// X, Y, Z (i16 LE), status (u8), temperature (i16 LE)
pub const FRAME_LEN: usize = 9;

// STATUS bits
pub const STATUS_DRDY: u8 = 0x01;
pub const STATUS_OVL: u8 = 0x02;
pub const STATUS_DOR: u8 = 0x04;

// CONTROL2 bits
pub const CONTROL2_INT_DISABLE: u8 = 0x01;
pub const CONTROL2_ROL_PNT: u8 = 0x40;
pub const CONTROL2_SOFT_RST: u8 = 0x80;

pub const SET_RESET_PERIOD_RECOMMENDED: u8 = 0x01;

// CONTROL1 field offsets
pub const OSR_SHIFT: u8 = 6;
pub const RNG_SHIFT: u8 = 4;
pub const ODR_SHIFT: u8 = 2;
pub const MODE_SHIFT: u8 = 0;

field_codes! {
    /// Over-sample ratio (CONTROL1 bits 7:6)
    Oversampling {
        Os512 = 0,
        Os256 = 1,
        Os128 = 2,
        Os64 = 3,
    }
}

field_codes! {
    /// Full scale (CONTROL1 bits 5:4)
    Range {
        Gauss2 = 0,
        Gauss8 = 1,
    }
}

field_codes! {
    /// Output data rate (CONTROL1 bits 3:2)
    OutputRate {
        Hz10 = 0,
        Hz50 = 1,
        Hz100 = 2,
        Hz200 = 3,
    }
}

field_codes! {
    /// Operating mode (CONTROL1 bits 1:0)
    Mode {
        Standby = 0,
        Continuous = 1,
    }
}

impl Range {
    pub fn lsb_per_gauss(self) -> f32 {
        match self {
            Range::Gauss2 => 12000.0,
            Range::Gauss8 => 3000.0,
        }
    }
}

/// Contents of CONTROL1
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    pub oversampling: Oversampling,
    pub range: Range,
    pub rate: OutputRate,
    pub mode: Mode,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            oversampling: Oversampling::Os64,
            range: Range::Gauss8,
            rate: OutputRate::Hz100,
            mode: Mode::Continuous,
        }
    }
}

impl Config {
    pub fn control1(&self) -> u8 {
        (self.oversampling.code() << OSR_SHIFT)
            | (self.range.code() << RNG_SHIFT)
            | (self.rate.code() << ODR_SHIFT)
            | (self.mode.code() << MODE_SHIFT)
    }
}
