use serde::{Deserialize, Serialize};

pub const GEO_FIX_FRAC_BITS: u32 = 23;

const FRAC_MASK: i32 = (1 << GEO_FIX_FRAC_BITS) - 1;

/// Largest fraction base used directly, bigger bases are scaled down first
/// so `numerator << 23` stays inside 64 bits.
const MAX_FRAC_BASE: u32 = 10_000_000;

/// Arc-minutes per degree in the parser's 1/100000 arc-minute units.
const ARC_MINUTE_E5_PER_DEGREE: u32 = 60 * 100_000;

/// Angle in degrees as signed 9.23 fixed point. Bits 0..=22 hold the
/// fraction as an unsigned magnitude, the sign marks the hemisphere.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct GeoFix(pub i32);

impl GeoFix {
    /// Builds `int_part + frac_numerator / frac_base` degrees.
    ///
    /// Returns `None` when `frac_numerator >= frac_base` or when the whole
    /// degrees don't fit in 9 signed bits.
    pub fn from_parts(int_part: i32, frac_numerator: u32, frac_base: u32) -> Option<Self> {
        if frac_numerator >= frac_base {
            return None;
        }

        let whole = int_part.checked_mul(1 << GEO_FIX_FRAC_BITS)?;

        let (mut numerator, mut base) = (frac_numerator, frac_base);
        if base > MAX_FRAC_BASE {
            let scale = base / MAX_FRAC_BASE;
            numerator /= scale;
            base /= scale;
        }

        let frac = (u64::from(numerator) << GEO_FIX_FRAC_BITS) / u64::from(base);
        Some(Self(whole | frac as i32))
    }

    /// Converts the GGA parser's 1/100000 arc-minute angle.
    pub fn from_arc_minutes_e5(value: i32) -> Option<Self> {
        let magnitude = value.unsigned_abs();
        let degrees = i32::try_from(magnitude / ARC_MINUTE_E5_PER_DEGREE).ok()?;
        let fixed = Self::from_parts(
            degrees,
            magnitude % ARC_MINUTE_E5_PER_DEGREE,
            ARC_MINUTE_E5_PER_DEGREE,
        )?;

        Some(if value < 0 { Self(-fixed.0) } else { fixed })
    }

    /// Whole degrees, arithmetic shift (floors negative values).
    pub fn int_part(self) -> i32 {
        self.0 >> GEO_FIX_FRAC_BITS
    }

    /// Fraction bits rescaled to `out_base`, e.g. 100000 for five decimals.
    pub fn frac_part(self, out_base: u32) -> u32 {
        let frac = (self.0 & FRAC_MASK) as u64;
        ((frac * u64::from(out_base)) >> GEO_FIX_FRAC_BITS) as u32
    }

    pub fn to_degrees(self) -> f64 {
        f64::from(self.0) / f64::from(1u32 << GEO_FIX_FRAC_BITS)
    }
}
