// only use std when feature = "std" is enabled or during testing
#![cfg_attr(not(any(test, feature = "std")), no_std)]

mod fmt;

#[cfg(test)]
mod tests;

pub mod baro;
pub mod dsp;
pub mod gps;
pub mod nmea;
pub mod rocket_state;
pub mod time;

pub use baro::{BaroData, BaroSnapshot};
pub use rocket_state::{FlightPhase, RocketState};
