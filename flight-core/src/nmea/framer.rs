use serde::{Deserialize, Serialize};

use super::Sentence;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FramerState {
    Waiting,
    Receiving,
}

/// Diagnostic counters, they only ever count up (wrapping).
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FramerStats {
    pub completions: u32,
    pub overruns: u32,
    pub restarts: u32,
}

/// Extracts `$...\n` and `!...\n` sentences from a raw byte stream, one
/// byte per call. Lives in the producer (receive interrupt) context.
pub struct NmeaFramer {
    state: FramerState,
    buffer: Sentence,
    stats: FramerStats,
}

fn is_start_byte(byte: u8) -> bool {
    byte == b'$' || byte == b'!'
}

impl NmeaFramer {
    pub const fn new() -> Self {
        Self {
            state: FramerState::Waiting,
            buffer: Sentence::new(),
            stats: FramerStats {
                completions: 0,
                overruns: 0,
                restarts: 0,
            },
        }
    }

    pub fn stats(&self) -> FramerStats {
        self.stats
    }

    /// Returns the sentence completed by this byte, if any. A sentence is
    /// handed out exactly once and never partially.
    pub fn push_byte(&mut self, byte: u8) -> Option<&Sentence> {
        match self.state {
            FramerState::Waiting => {
                if is_start_byte(byte) {
                    self.begin(byte);
                }
                None
            }
            FramerState::Receiving => {
                if is_start_byte(byte) {
                    self.stats.restarts = self.stats.restarts.wrapping_add(1);
                    log_trace!("NMEA sentence restarted after {} bytes", self.buffer.len());
                    self.begin(byte);
                    return None;
                }

                if self.buffer.push(byte).is_err() {
                    self.stats.overruns = self.stats.overruns.wrapping_add(1);
                    log_trace!("NMEA sentence overran the buffer, discarded");
                    self.state = FramerState::Waiting;
                    return None;
                }

                if byte == b'\n' {
                    self.stats.completions = self.stats.completions.wrapping_add(1);
                    self.state = FramerState::Waiting;
                    return Some(&self.buffer);
                }

                None
            }
        }
    }

    /// Callback flavour of [`Self::push_byte`]. `on_sentence` runs before
    /// this returns, so it must not block.
    pub fn run(&mut self, byte: u8, on_sentence: impl FnOnce(&Sentence)) -> bool {
        match self.push_byte(byte) {
            Some(sentence) => {
                on_sentence(sentence);
                true
            }
            None => false,
        }
    }

    fn begin(&mut self, start: u8) {
        self.buffer.clear();
        // an empty buffer always has room for the start byte
        let _ = self.buffer.push(start);
        self.state = FramerState::Receiving;
    }
}

impl Default for NmeaFramer {
    fn default() -> Self {
        Self::new()
    }
}
