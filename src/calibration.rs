//! Hard-iron / soft-iron correction from per-axis min/max bounds
//!
//! The correction is axis aligned: each axis is re-centred on the midpoint of
//! its observed bounds and scaled so that every axis reports the same average
//! half-range. There are no cross-axis terms.

use crate::errors::CalibrationError;
use crate::sensors::AxisSample;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    pub const ALL: [Axis; 3] = [Axis::X, Axis::Y, Axis::Z];

    pub fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Axis::X => "x",
            Axis::Y => "y",
            Axis::Z => "z",
        };
        f.write_str(name)
    }
}

/// Observed (min, max) for one axis
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AxisBounds {
    pub min: i32,
    pub max: i32,
}

impl AxisBounds {
    /// Sentinel that any real sample tightens on both ends.
    pub const UNOBSERVED: AxisBounds = AxisBounds {
        min: i32::MAX,
        max: i32::MIN,
    };

    pub fn new(min: i32, max: i32) -> Self {
        Self { min, max }
    }

    pub fn is_observed(&self) -> bool {
        *self != Self::UNOBSERVED
    }

    /// Extend the bounds to include `value`. Returns true if either end moved.
    pub fn widen(&mut self, value: i32) -> bool {
        let mut changed = false;
        if value < self.min {
            self.min = value;
            changed = true;
        }
        if value > self.max {
            self.max = value;
            changed = true;
        }
        changed
    }

    fn check(&self, axis: Axis) -> Result<(), CalibrationError> {
        if !self.is_observed() {
            return Err(CalibrationError::Unobserved { axis });
        }
        if self.min > self.max {
            return Err(CalibrationError::Inverted {
                axis,
                min: self.min,
                max: self.max,
            });
        }
        if self.min == self.max {
            return Err(CalibrationError::ZeroRange { axis });
        }
        Ok(())
    }
}

/// Per-axis bounds in the exchange order x, y, z.
///
/// Serialized as the flat record `{x_min, x_max, y_min, y_max, z_min, z_max}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "BoundsRecord", into = "BoundsRecord")]
pub struct CalibrationBounds {
    axes: [AxisBounds; 3],
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
struct BoundsRecord {
    x_min: i32,
    x_max: i32,
    y_min: i32,
    y_max: i32,
    z_min: i32,
    z_max: i32,
}

impl From<BoundsRecord> for CalibrationBounds {
    fn from(r: BoundsRecord) -> Self {
        CalibrationBounds::new(r.x_min, r.x_max, r.y_min, r.y_max, r.z_min, r.z_max)
    }
}

impl From<CalibrationBounds> for BoundsRecord {
    fn from(b: CalibrationBounds) -> Self {
        let [x_min, x_max, y_min, y_max, z_min, z_max] = b.to_array();
        BoundsRecord {
            x_min,
            x_max,
            y_min,
            y_max,
            z_min,
            z_max,
        }
    }
}

impl Default for CalibrationBounds {
    fn default() -> Self {
        Self::unobserved()
    }
}

impl CalibrationBounds {
    pub fn new(x_min: i32, x_max: i32, y_min: i32, y_max: i32, z_min: i32, z_max: i32) -> Self {
        Self {
            axes: [
                AxisBounds::new(x_min, x_max),
                AxisBounds::new(y_min, y_max),
                AxisBounds::new(z_min, z_max),
            ],
        }
    }

    pub fn unobserved() -> Self {
        Self {
            axes: [AxisBounds::UNOBSERVED; 3],
        }
    }

    pub fn axis(&self, axis: Axis) -> AxisBounds {
        self.axes[axis.index()]
    }

    /// Widen each axis against its own bounds. Returns true if any bound moved.
    pub fn widen(&mut self, sample: &AxisSample) -> bool {
        let mut changed = false;
        for (bounds, value) in self.axes.iter_mut().zip(sample.axes()) {
            changed |= bounds.widen(i32::from(value));
        }
        changed
    }

    /// Bounds in exchange order: x_min, x_max, y_min, y_max, z_min, z_max
    pub fn to_array(&self) -> [i32; 6] {
        let [x, y, z] = self.axes;
        [x.min, x.max, y.min, y.max, z.min, z.max]
    }

    /// Fails on the first axis that is unobserved, inverted or flat.
    pub fn validate(&self) -> Result<(), CalibrationError> {
        for axis in Axis::ALL {
            self.axis(axis).check(axis)?;
        }
        Ok(())
    }

    pub fn parameters(&self) -> Result<CalibrationParameters, CalibrationError> {
        CalibrationParameters::from_bounds(self)
    }
}

impl fmt::Display for CalibrationBounds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [x_min, x_max, y_min, y_max, z_min, z_max] = self.to_array();
        write!(f, "{x_min}, {x_max}, {y_min}, {y_max}, {z_min}, {z_max}")
    }
}

/// Offsets and scale factors derived from validated bounds
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CalibrationParameters {
    bounds: CalibrationBounds,
    offset: [f32; 3],
    half_range: [f32; 3],
    avg_half_range: f32,
    scale: [f32; 3],
}

impl CalibrationParameters {
    pub fn from_bounds(bounds: &CalibrationBounds) -> Result<Self, CalibrationError> {
        bounds.validate()?;

        let mut offset = [0.0f32; 3];
        let mut half_range = [0.0f32; 3];
        for axis in Axis::ALL {
            let b = bounds.axis(axis);
            let i = axis.index();
            offset[i] = (b.min as f32 + b.max as f32) / 2.0;
            half_range[i] = (b.max as f32 - b.min as f32) / 2.0;
        }

        let avg_half_range = half_range.iter().sum::<f32>() / 3.0;
        let scale = half_range.map(|h| avg_half_range / h);

        Ok(Self {
            bounds: *bounds,
            offset,
            half_range,
            avg_half_range,
            scale,
        })
    }

    pub fn bounds(&self) -> &CalibrationBounds {
        &self.bounds
    }

    pub fn offset(&self) -> [f32; 3] {
        self.offset
    }

    pub fn half_range(&self) -> [f32; 3] {
        self.half_range
    }

    pub fn avg_half_range(&self) -> f32 {
        self.avg_half_range
    }

    pub fn scale(&self) -> [f32; 3] {
        self.scale
    }

    /// `(raw - offset) * scale` on every axis
    pub fn apply(&self, raw: [f32; 3]) -> [f32; 3] {
        let mut out = [0.0f32; 3];
        for i in 0..3 {
            out[i] = (raw[i] - self.offset[i]) * self.scale[i];
        }
        out
    }

    pub fn apply_sample(&self, sample: &AxisSample) -> [f32; 3] {
        self.apply(sample.axes().map(f32::from))
    }
}
