//! Barometric altitude estimator.
//!
//! Raw samples arrive at whatever rate the sensor driver manages. They are
//! resampled to [`SAMPLE_RATE_HZ`] and smoothed twice: once for the
//! altitude and vertical speed used by the phase logic, and once more,
//! much heavier, for the apogee tracking maximum. A separate slow path
//! tracks the launch field altitude while on the pad.

use serde::{Deserialize, Serialize};

use crate::dsp::{FirFilter, Interpolator, TimebaseError};

pub const TICK_RATE_HZ: u32 = 1000;
pub const SAMPLE_RATE_HZ: u32 = 40;
pub const SAMPLE_PERIOD_MS: u32 = TICK_RATE_HZ / SAMPLE_RATE_HZ;
pub const FIELD_SAMPLE_PERIOD_MS: u32 = TICK_RATE_HZ / 2;

pub const ALT_FILTER_TAPS: usize = 20;
pub const APOGEE_FILTER_TAPS: usize = 80;
pub const FIELD_FILTER_TAPS: usize = 60;

/// mm/s
pub const LAUNCH_VSPEED: i32 = 25_000;
/// mm above the field altitude
pub const LAUNCH_ALTITUDE_AGL: i32 = 100_000;
/// mm below the tracked maximum
pub const APOGEE_DROP: i32 = 10_000;
/// mm/s, below this the vehicle counts as stationary
pub const LANDED_VSPEED: u32 = 100;
/// ms of continuous stationary readings before landing is declared
pub const LANDED_HOLD_MS: u64 = 5_000;

/// Scalar outputs of [`BaroData`], for telemetry and logs.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BaroSnapshot {
    pub tick: u64,
    pub alt: i32,
    pub alt2: i32,
    pub alt_max: i32,
    pub alt_raw: i32,
    pub alt_raw_max: i32,
    pub alt_field: i32,
    pub vspeed: i32,
    pub vspeed_max: i32,
    pub landing_tick: Option<u64>,
}

/// All altitudes in mm, speeds in mm/s, ticks in ms.
#[derive(Debug, Clone)]
pub struct BaroData {
    /// single filtered altitude
    pub alt: i32,
    /// double filtered altitude, apogee detection input
    pub alt2: i32,
    /// running maximum of `alt2`
    pub alt_max: i32,
    pub alt_raw: i32,
    pub alt_raw_max: i32,
    /// slow tracking launch field altitude, frozen after leaving the pad
    pub alt_field: i32,
    pub tick: u64,
    pub vspeed: i32,
    pub vspeed_max: i32,
    /// start of the current landing candidate window
    pub landing_tick: Option<u64>,

    alt_interp: Interpolator,
    alt_filter: FirFilter<ALT_FILTER_TAPS>,
    apogee_detect_filter: FirFilter<APOGEE_FILTER_TAPS>,
    field_alt_interp: Interpolator,
    field_alt_filter: FirFilter<FIELD_FILTER_TAPS>,

    valid: bool,
}

impl BaroData {
    pub const fn new() -> Self {
        Self {
            alt: 0,
            alt2: 0,
            alt_max: 0,
            alt_raw: 0,
            alt_raw_max: 0,
            alt_field: 0,
            tick: 0,
            vspeed: 0,
            vspeed_max: 0,
            landing_tick: None,
            alt_interp: Interpolator::new(SAMPLE_PERIOD_MS),
            alt_filter: FirFilter::new(),
            apogee_detect_filter: FirFilter::new(),
            field_alt_interp: Interpolator::new(FIELD_SAMPLE_PERIOD_MS),
            field_alt_filter: FirFilter::new(),
            valid: false,
        }
    }

    /// False until the first sample has been processed.
    pub fn is_valid(&self) -> bool {
        self.valid
    }

    /// Runs one raw sample through the filter chain. The field altitude is
    /// only tracked when `track_field` is set.
    ///
    /// A sample older than the previous one is rejected before anything is
    /// modified.
    pub fn process(
        &mut self,
        raw_alt: i32,
        tick: u64,
        track_field: bool,
    ) -> Result<(), TimebaseError> {
        if !self.valid {
            self.alt = raw_alt;
            self.alt2 = raw_alt;
            self.alt_raw = raw_alt;
            self.alt_raw_max = raw_alt;
            self.alt_field = raw_alt;
            self.alt_max = raw_alt;
            self.tick = tick;
            self.valid = true;
        }

        self.alt_interp.feed(raw_alt, tick)?;
        while let Some((sample, _)) = self.alt_interp.poll() {
            let previous = self.alt;
            self.alt = self.alt_filter.run(sample);
            self.vspeed = self
                .alt
                .saturating_sub(previous)
                .saturating_mul(SAMPLE_RATE_HZ as i32);
            self.alt2 = self.apogee_detect_filter.run(self.alt);
            self.alt_max = self.alt_max.max(self.alt2);
        }

        // fed from the same tick stream as the primary path, it can't be
        // behind after the primary feed succeeded
        if track_field && self.field_alt_interp.feed(raw_alt, tick).is_ok() {
            while let Some((sample, _)) = self.field_alt_interp.poll() {
                self.alt_field = self.field_alt_filter.run(sample);
            }
        }

        self.alt_raw = raw_alt;
        self.alt_raw_max = self.alt_raw_max.max(raw_alt);
        self.vspeed_max = self.vspeed_max.max(self.vspeed);
        self.tick = tick;
        Ok(())
    }

    pub fn snapshot(&self) -> BaroSnapshot {
        BaroSnapshot {
            tick: self.tick,
            alt: self.alt,
            alt2: self.alt2,
            alt_max: self.alt_max,
            alt_raw: self.alt_raw,
            alt_raw_max: self.alt_raw_max,
            alt_field: self.alt_field,
            vspeed: self.vspeed,
            vspeed_max: self.vspeed_max,
            landing_tick: self.landing_tick,
        }
    }
}

impl Default for BaroData {
    fn default() -> Self {
        Self::new()
    }
}
