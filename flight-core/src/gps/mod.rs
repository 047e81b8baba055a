pub mod geo_fix;
pub mod gga;

use embassy_futures::yield_now;
use embedded_io_async::Read;
use serde::{Deserialize, Serialize};

use crate::fmt::Debug2DefmtWrapper;
use crate::nmea::{NmeaFramer, SentenceConsumer, SentenceProducer};
use crate::time::Clock;

pub use geo_fix::GeoFix;
pub use gga::{GgaField, GgaFix, GgaParseError, parse_gga};

/// Latest GPS position. `alt_max` is the highest altitude seen since boot.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct GpsData {
    pub lat: GeoFix,
    pub lon: GeoFix,
    /// mm above mean sea level
    pub alt: i32,
    pub alt_max: i32,
    /// UTC time of day of the fix
    pub time_ms: u32,
    /// local tick the fix was applied at
    pub tick: u64,
    pub valid: bool,
}

impl GpsData {
    pub const fn new() -> Self {
        Self {
            lat: GeoFix(0),
            lon: GeoFix(0),
            alt: 0,
            alt_max: 0,
            time_ms: 0,
            tick: 0,
            valid: false,
        }
    }

    /// Returns false, leaving the data untouched, if the coordinates don't
    /// fit in [`GeoFix`].
    pub fn update(&mut self, fix: &GgaFix, tick: u64) -> bool {
        let (Some(lat), Some(lon)) = (
            GeoFix::from_arc_minutes_e5(fix.lat),
            GeoFix::from_arc_minutes_e5(fix.lon),
        ) else {
            log_warn!("GGA coordinates out of range: {} {}", fix.lat, fix.lon);
            return false;
        };

        self.alt_max = if self.valid {
            self.alt_max.max(fix.alt_mm)
        } else {
            fix.alt_mm
        };
        self.lat = lat;
        self.lon = lon;
        self.alt = fix.alt_mm;
        self.time_ms = fix.time_ms;
        self.tick = tick;
        self.valid = true;
        true
    }
}

/// Producer side of the GPS pipeline: frames bytes from `rx` and hands
/// complete sentences to the queue. A full queue drops the sentence.
///
/// Runs until `rx` reports end of stream and returns the number of
/// sentences dropped.
pub async fn run_gps_uart_receiver(
    rx: &mut impl Read,
    framer: &mut NmeaFramer,
    producer: &mut SentenceProducer<'_>,
) -> u32 {
    let mut buffer = [0; 64];
    let mut dropped = 0u32;
    loop {
        match rx.read(&mut buffer).await {
            Ok(0) => return dropped,
            Ok(length) => {
                for &byte in &buffer[..length] {
                    if let Some(sentence) = framer.push_byte(byte) {
                        if producer.put(sentence).is_err() {
                            dropped = dropped.wrapping_add(1);
                            log_warn!("NMEA queue full, sentence dropped");
                        }
                    }
                }
            }
            Err(e) => {
                log_error!("Error reading from UART: {:?}", Debug2DefmtWrapper(e));
                yield_now().await;
            }
        }
    }
}

/// Consumer side: drains the queue, applies every valid GGA fix to `gps`
/// stamped with `clock`, and returns how many fixes were applied.
pub fn process_gps_sentences(
    consumer: &mut SentenceConsumer<'_>,
    gps: &mut GpsData,
    clock: &impl Clock,
) -> usize {
    let mut applied = 0;
    while let Ok(sentence) = consumer.get() {
        match parse_gga(sentence.as_bytes()) {
            Ok(fix) => {
                if gps.update(&fix, clock.now_ms()) {
                    applied += 1;
                }
            }
            Err(GgaParseError::WrongSentenceType) => {}
            Err(e) => {
                log_debug!("Invalid GGA sentence: {:?}", e);
            }
        }
    }
    applied
}
