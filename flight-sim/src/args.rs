use std::path::PathBuf;

use clap::Parser;
use clap::Subcommand;

#[derive(Parser, Debug)]
#[command(name = "Flight Sim")]
#[command(bin_name = "flight-sim")]
pub struct Cli {
    #[clap(subcommand)]
    pub mode: ModeSelect,
}

#[derive(Subcommand, Debug)]
pub enum ModeSelect {
    #[command(about = "fly a synthetic altitude model through the flight state machine")]
    Simulate(SimulateCli),

    #[command(about = "run a recorded tick_ms,alt_mm barometer trace through the state machine")]
    ReplayBaro(ReplayBaroCli),

    #[command(about = "decode a raw NMEA log through the GPS receive pipeline")]
    ReplayNmea(ReplayNmeaCli),
}

#[derive(Parser, Debug)]
pub struct SimulateCli {
    #[arg(long, help = "TOML altitude model, defaults to the built-in field and flight")]
    pub model: Option<PathBuf>,
    #[arg(long, default_value_t = 0)]
    pub seed: u64,
    #[arg(long, default_value_t = 100)]
    pub interval_ms: u64,
    #[arg(long, default_value_t = 20)]
    pub jitter_ms: u64,
    #[arg(long, default_value_t = 60_000)]
    pub arm_at_ms: u64,
    #[arg(long, default_value = "sim-output.csv")]
    pub output: PathBuf,
}

#[derive(Parser, Debug)]
pub struct ReplayBaroCli {
    pub input: PathBuf,
    #[arg(long, default_value_t = 60_000)]
    pub arm_at_ms: u64,
    #[arg(long, default_value = "replay-output.csv")]
    pub output: PathBuf,
}

#[derive(Parser, Debug)]
pub struct ReplayNmeaCli {
    pub log: PathBuf,
    #[arg(long, default_value_t = 115_200, help = "UART pacing, 0 replays as fast as possible")]
    pub baud: u32,
}
