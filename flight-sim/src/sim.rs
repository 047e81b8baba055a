use std::fs::File;
use std::path::Path;

use anyhow::{Context, Result};
use flight_core::{FlightPhase, RocketState};
use log::info;
use serde::{Deserialize, Serialize};

/// One CSV row per barometer sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SimRecord {
    pub tick: u64,
    pub raw_alt: i32,
    pub alt: i32,
    pub alt2: i32,
    pub alt_field: i32,
    pub vspeed: i32,
    pub phase: FlightPhase,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub tick: u64,
    pub from: FlightPhase,
    pub to: FlightPhase,
}

/// A `tick_ms,alt_mm` row of a recorded barometer trace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct BaroSample {
    pub tick_ms: u64,
    pub alt_mm: i32,
}

pub fn load_baro_samples(path: &Path) -> Result<Vec<(u64, i32)>> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("failed to open {}", path.display()))?;
    reader
        .deserialize()
        .map(|row| {
            let sample: BaroSample = row?;
            Ok((sample.tick_ms, sample.alt_mm))
        })
        .collect::<Result<Vec<_>, csv::Error>>()
        .with_context(|| format!("failed to parse {}", path.display()))
}

/// Feeds every `(tick_ms, raw_alt_mm)` sample to a fresh [`RocketState`],
/// arming it on the first sample after `arm_at_ms`.
pub fn run_samples(
    samples: impl IntoIterator<Item = (u64, i32)>,
    arm_at_ms: u64,
    mut on_record: impl FnMut(&SimRecord) -> Result<()>,
) -> Result<Vec<Transition>> {
    let mut state = RocketState::new();
    let mut transitions = Vec::new();
    let mut armed = false;

    for (tick, raw_alt) in samples {
        if !armed && tick > arm_at_ms {
            armed = state.arm();
            if armed {
                transitions.push(Transition {
                    tick,
                    from: FlightPhase::Idle,
                    to: FlightPhase::Armed,
                });
            }
        }

        let before = state.phase;
        let phase = state.update_baro(raw_alt, tick);
        if phase != before {
            info!(
                "{}ms: {:?} -> {:?}, {:?}",
                tick,
                before,
                phase,
                state.baro.snapshot()
            );
            transitions.push(Transition {
                tick,
                from: before,
                to: phase,
            });
        }

        on_record(&SimRecord {
            tick,
            raw_alt,
            alt: state.baro.alt,
            alt2: state.baro.alt2,
            alt_field: state.baro.alt_field,
            vspeed: state.baro.vspeed,
            phase,
        })?;
    }

    info!(
        "Processed samples up to {}ms, max raw altitude {}mm, max vertical speed {}mm/s",
        state.baro.tick, state.baro.alt_raw_max, state.baro.vspeed_max
    );
    Ok(transitions)
}

/// [`run_samples`] writing every record to a CSV file.
pub fn run_to_csv(
    samples: impl IntoIterator<Item = (u64, i32)>,
    arm_at_ms: u64,
    output: &Path,
) -> Result<Vec<Transition>> {
    let mut writer = csv::Writer::from_writer(
        File::create(output).with_context(|| format!("failed to create {}", output.display()))?,
    );
    let transitions = run_samples(samples, arm_at_ms, |record| {
        writer.serialize(record)?;
        Ok(())
    })?;
    writer.flush()?;
    Ok(transitions)
}
