//! Compass bearing from calibrated horizontal field components

use crate::errors::DeclinationError;
use std::f64::consts::{PI, TAU};

/// Angle between magnetic and true north, added to every heading.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Declination {
    radians: f64,
}

impl Declination {
    /// Build from degrees and arc-minutes. The sign of `degrees` applies to
    /// the minutes as well, so `(-5, 37)` is -5°37′. With zero degrees the
    /// sign of `minutes` is used.
    pub fn new(degrees: i16, minutes: i16) -> Result<Self, DeclinationError> {
        let magnitude = f64::from(degrees.unsigned_abs()) + f64::from(minutes.unsigned_abs()) / 60.0;
        let negative = degrees < 0 || (degrees == 0 && minutes < 0);
        let signed = if negative { -magnitude } else { magnitude };
        if magnitude > 180.0 {
            return Err(DeclinationError {
                radians: signed.to_radians(),
            });
        }
        Ok(Self {
            radians: signed.to_radians().clamp(-PI, PI),
        })
    }

    /// Accepts -π ..= π.
    pub fn from_radians(radians: f64) -> Result<Self, DeclinationError> {
        if !radians.is_finite() || radians.abs() > PI {
            return Err(DeclinationError { radians });
        }
        Ok(Self { radians })
    }

    pub fn radians(&self) -> f64 {
        self.radians
    }
}

/// Bearing in whole degrees and arc-minutes, 0°0′ ..= 359°59′
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Heading {
    pub degrees: u16,
    pub minutes: u8,
}

impl Heading {
    /// `atan2(y, x)` plus declination, wrapped once into [0, 2π). With the
    /// declination bounded to ±π one wrap always suffices.
    ///
    /// Minutes that round up to 60 are carried into the degrees, and a carry
    /// onto 360° wraps to 0°.
    pub fn from_components(x: f32, y: f32, declination: Declination) -> Self {
        let mut angle = f64::from(y).atan2(f64::from(x)) + declination.radians();

        if angle < 0.0 {
            angle += TAU;
        } else if angle >= TAU {
            angle -= TAU;
        }

        let bearing = angle.to_degrees();
        let mut degrees = bearing.floor();
        let mut minutes = ((bearing - degrees) * 60.0).round();
        if minutes >= 60.0 {
            minutes -= 60.0;
            degrees += 1.0;
        }
        if degrees >= 360.0 {
            degrees -= 360.0;
        }

        Self {
            degrees: degrees as u16,
            minutes: minutes as u8,
        }
    }

    pub fn as_degrees(&self) -> f32 {
        f32::from(self.degrees) + f32::from(self.minutes) / 60.0
    }
}

impl std::fmt::Display for Heading {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}°{:02}′", self.degrees, self.minutes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn heading(x: f32, y: f32) -> Heading {
        Heading::from_components(x, y, Declination::default())
    }

    fn heading_with(x: f32, y: f32, declination: Declination) -> Heading {
        Heading::from_components(x, y, declination)
    }

    #[test]
    fn cardinal_directions() {
        assert_eq!(heading(1.0, 0.0), Heading { degrees: 0, minutes: 0 });
        assert_eq!(heading(0.0, 1.0), Heading { degrees: 90, minutes: 0 });
        assert_eq!(heading(-1.0, 0.0), Heading { degrees: 180, minutes: 0 });
        assert_eq!(heading(0.0, -1.0), Heading { degrees: 270, minutes: 0 });
    }

    #[test]
    fn declination_is_added() {
        let east = Declination::new(5, 37).unwrap();
        let h = Heading::from_components(1.0, 0.0, east);
        assert_eq!(h, Heading { degrees: 5, minutes: 37 });

        let west = Declination::new(-5, 37).unwrap();
        let h = Heading::from_components(1.0, 0.0, west);
        // 360 - 5°37′
        assert_eq!(h, Heading { degrees: 354, minutes: 23 });
    }

    #[test]
    fn negative_minutes_with_zero_degrees() {
        let d = Declination::new(0, -30).unwrap();
        assert!((d.radians() + 0.5f64.to_radians()).abs() < 1e-12);
    }

    #[test]
    fn declination_beyond_half_turn_is_rejected() {
        assert!(Declination::new(180, 0).is_ok());
        assert!(Declination::new(-180, 0).is_ok());
        assert!(matches!(Declination::new(180, 1), Err(DeclinationError { .. })));
        assert!(Declination::new(-200, 0).is_err());
        assert_eq!(
            Declination::from_radians(14.0),
            Err(DeclinationError { radians: 14.0 })
        );
        assert!(Declination::from_radians(f64::NAN).is_err());
    }

    #[test]
    fn extreme_declinations_stay_within_one_turn() {
        let east = Declination::from_radians(PI).unwrap();
        assert_eq!(heading_with(0.0, 1.0, east), Heading { degrees: 270, minutes: 0 });
        let west = Declination::from_radians(-PI).unwrap();
        assert_eq!(heading_with(0.0, -1.0, west), Heading { degrees: 90, minutes: 0 });
    }

    #[test]
    fn minutes_carry_into_degrees() {
        // 44.9999° rounds to 45°0′, not 44°60′
        let angle = 44.9999f64.to_radians();
        let h = heading(angle.cos() as f32, angle.sin() as f32);
        assert_eq!(h, Heading { degrees: 45, minutes: 0 });
    }

    #[test]
    fn carry_past_full_turn_wraps_to_zero() {
        let angle = (-0.0001f64).to_radians();
        let h = heading(angle.cos() as f32, angle.sin() as f32);
        assert_eq!(h, Heading { degrees: 0, minutes: 0 });
    }

    #[test]
    fn display_pads_minutes() {
        assert_eq!(Heading { degrees: 7, minutes: 5 }.to_string(), "7°05′");
    }
}
