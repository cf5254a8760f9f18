//! QMC5883P register map

/// Fixed 7-bit bus address
pub const ADDRESS: u8 = 0x2C;

// Register addresses
pub const CHIP_ID: u8 = 0x00;
pub const DATA_X_LSB: u8 = 0x01;
pub const STATUS: u8 = 0x09;
pub const CONTROL1: u8 = 0x0A;
pub const CONTROL2: u8 = 0x0B;
pub const AXIS_SIGN: u8 = 0x29;

pub const CHIP_ID_VALUE: u8 = 0x80;

/// X, Y, Z as i16 LE
pub const FRAME_LEN: usize = 6;

// STATUS bits
pub const STATUS_DRDY: u8 = 0x01;
pub const STATUS_OVFL: u8 = 0x02;

pub const CONTROL2_SOFT_RST: u8 = 0x80;

/// Sign convention for the X/Y/Z outputs
pub const AXIS_SIGN_DEFAULT: u8 = 0x06;

// CONTROL1 field offsets
pub const OSR2_SHIFT: u8 = 6;
pub const OSR1_SHIFT: u8 = 4;
pub const ODR_SHIFT: u8 = 2;
pub const MODE_SHIFT: u8 = 0;
// CONTROL2 field offsets
pub const RNG_SHIFT: u8 = 2;

/// LSB per gauss, indexed by range code
pub const LSB_PER_GAUSS: [f32; 4] = [1000.0, 2500.0, 3750.0, 15000.0];

field_codes! {
    /// Operating mode (CONTROL1 bits 1:0)
    Mode {
        Suspend = 0,
        Normal = 1,
        Single = 2,
        Continuous = 3,
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
    /// Over-sample ratio (CONTROL1 bits 5:4)
    Oversampling {
        Ratio8 = 0,
        Ratio4 = 1,
        Ratio2 = 2,
        Ratio1 = 3,
    }
}

field_codes! {
    /// Down-sample ratio (CONTROL1 bits 7:6)
    Downsampling {
        Ratio1 = 0,
        Ratio2 = 1,
        Ratio4 = 2,
        Ratio8 = 3,
    }
}

field_codes! {
    /// Full scale (CONTROL2 bits 3:2)
    Range {
        Gauss30 = 0,
        Gauss12 = 1,
        Gauss8 = 2,
        Gauss2 = 3,
    }
}

impl Range {
    pub fn lsb_per_gauss(self) -> f32 {
        LSB_PER_GAUSS[self.code() as usize]
    }

    /// Next less sensitive range, if any
    pub fn wider(self) -> Option<Range> {
        match self {
            Range::Gauss2 => Some(Range::Gauss8),
            Range::Gauss8 => Some(Range::Gauss12),
            Range::Gauss12 => Some(Range::Gauss30),
            Range::Gauss30 => None,
        }
    }
}

/// Contents of CONTROL1 and the range field of CONTROL2
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    pub mode: Mode,
    pub rate: OutputRate,
    pub oversampling: Oversampling,
    pub downsampling: Downsampling,
    pub range: Range,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            mode: Mode::Normal,
            rate: OutputRate::Hz200,
            oversampling: Oversampling::Ratio8,
            downsampling: Downsampling::Ratio8,
            range: Range::Gauss2,
        }
    }
}

impl Config {
    pub fn control1(&self) -> u8 {
        (self.downsampling.code() << OSR2_SHIFT)
            | (self.oversampling.code() << OSR1_SHIFT)
            | (self.rate.code() << ODR_SHIFT)
            | (self.mode.code() << MODE_SHIFT)
    }

    pub fn control2(&self) -> u8 {
        self.range.code() << RNG_SHIFT
    }
}
