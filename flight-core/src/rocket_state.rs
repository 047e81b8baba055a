use serde::{Deserialize, Serialize};

use crate::baro::{
    APOGEE_DROP, BaroData, LANDED_HOLD_MS, LANDED_VSPEED, LAUNCH_ALTITUDE_AGL, LAUNCH_VSPEED,
};
use crate::gps::{GgaFix, GpsData};

#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FlightPhase {
    #[default]
    Idle,
    Armed,
    Ascent,
    Descent,
    Landed,
}

impl FlightPhase {
    /// The launch field altitude is only tracked while still on the pad.
    pub fn on_pad(self) -> bool {
        matches!(self, FlightPhase::Idle | FlightPhase::Armed)
    }
}

/// Everything the main loop knows about the vehicle.
#[derive(Debug, Clone)]
pub struct RocketState {
    pub phase: FlightPhase,
    pub baro: BaroData,
    pub gps: GpsData,
}

impl RocketState {
    pub const fn new() -> Self {
        Self {
            phase: FlightPhase::Idle,
            baro: BaroData::new(),
            gps: GpsData::new(),
        }
    }

    pub fn arm(&mut self) -> bool {
        if self.phase != FlightPhase::Idle {
            return false;
        }
        log_info!("Armed");
        self.phase = FlightPhase::Armed;
        true
    }

    pub fn disarm(&mut self) -> bool {
        if self.phase != FlightPhase::Armed {
            return false;
        }
        log_info!("Disarmed");
        self.phase = FlightPhase::Idle;
        true
    }

    /// Feeds one raw barometric altitude sample and advances the flight
    /// phase by at most one step.
    ///
    /// A sample stamped earlier than the previous one is dropped and the
    /// current phase returned unchanged.
    pub fn update_baro(&mut self, raw_alt_mm: i32, tick_ms: u64) -> FlightPhase {
        if !self.baro.is_valid() {
            self.phase = FlightPhase::Idle;
        }

        if let Err(e) = self.baro.process(raw_alt_mm, tick_ms, self.phase.on_pad()) {
            log_warn!("Dropping baro sample: {:?}", e);
            return self.phase;
        }

        let next = self.next_phase(tick_ms);
        if next != self.phase {
            log_info!(
                "Flight phase {:?} -> {:?} at {}ms, alt {}mm",
                self.phase,
                next,
                tick_ms,
                self.baro.alt
            );
            self.phase = next;
        }
        self.phase
    }

    /// The GPS record is informational, it doesn't drive the phase.
    pub fn update_gps(&mut self, fix: &GgaFix, tick_ms: u64) -> bool {
        self.gps.update(fix, tick_ms)
    }

    fn next_phase(&mut self, tick: u64) -> FlightPhase {
        let baro = &mut self.baro;
        match self.phase {
            FlightPhase::Armed => {
                let above_field = baro.alt.saturating_sub(baro.alt_field);
                if baro.vspeed >= LAUNCH_VSPEED || above_field > LAUNCH_ALTITUDE_AGL {
                    FlightPhase::Ascent
                } else {
                    FlightPhase::Armed
                }
            }
            FlightPhase::Ascent => {
                if baro.alt_max.saturating_sub(baro.alt) > APOGEE_DROP {
                    baro.landing_tick = Some(tick);
                    FlightPhase::Descent
                } else {
                    FlightPhase::Ascent
                }
            }
            FlightPhase::Descent => {
                let since = *baro.landing_tick.get_or_insert(tick);
                if baro.vspeed.unsigned_abs() >= LANDED_VSPEED {
                    baro.landing_tick = Some(tick);
                    FlightPhase::Descent
                } else if tick.saturating_sub(since) > LANDED_HOLD_MS {
                    FlightPhase::Landed
                } else {
                    FlightPhase::Descent
                }
            }
            phase @ (FlightPhase::Idle | FlightPhase::Landed) => phase,
        }
    }
}

impl Default for RocketState {
    fn default() -> Self {
        Self::new()
    }
}
