mod args;
mod model;
mod nmea_replay;
mod sim;

use anyhow::{Context, Result};
use args::{Cli, ModeSelect};
use clap::Parser;
use log::{LevelFilter, info, warn};
use model::{AltitudeModel, ModelConfig};
use rand::{SeedableRng, rngs::StdRng};
use sim::Transition;

fn main() -> Result<()> {
    let _ = env_logger::builder()
        .filter_level(LevelFilter::Info)
        .parse_default_env()
        .try_init();
    let args = Cli::parse();
    match args.mode {
        ModeSelect::Simulate(args) => {
            let model = match &args.model {
                Some(path) => {
                    let config = ModelConfig::load(path)?;
                    let base_dir = path.parent().unwrap_or(std::path::Path::new("."));
                    AltitudeModel::from_config(&config, base_dir)?
                }
                None => AltitudeModel::standard_flight(),
            };
            info!("Model runs for {}s", model.duration() / 1000);

            let mut rng = StdRng::seed_from_u64(args.seed);
            let samples = model.generate(args.interval_ms, args.jitter_ms, &mut rng);
            let transitions = sim::run_to_csv(samples, args.arm_at_ms, &args.output)?;
            report(&transitions);
            info!("Wrote {}", args.output.display());
        }
        ModeSelect::ReplayBaro(args) => {
            let samples = sim::load_baro_samples(&args.input)?;
            info!("Loaded {} samples", samples.len());
            let transitions = sim::run_to_csv(samples, args.arm_at_ms, &args.output)?;
            report(&transitions);
            info!("Wrote {}", args.output.display());
        }
        ModeSelect::ReplayNmea(args) => {
            let bytes = std::fs::read(&args.log)
                .with_context(|| format!("failed to read {}", args.log.display()))?;
            let summary = nmea_replay::replay(&bytes, args.baud)?;
            nmea_replay::log_summary(&summary);
        }
    }

    Ok(())
}

fn report(transitions: &[Transition]) {
    for t in transitions {
        info!("{:>9}ms  {:?} -> {:?}", t.tick, t.from, t.to);
    }
    if !transitions.iter().any(|t| t.to == flight_core::FlightPhase::Landed) {
        warn!("Flight never reached Landed");
    }
}
