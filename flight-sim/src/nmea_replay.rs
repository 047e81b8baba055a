use std::convert::Infallible;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Result, anyhow};
use embassy_futures::block_on;
use embedded_io_async::{ErrorType, Read};
use flight_core::gps::{GpsData, process_gps_sentences, run_gps_uart_receiver};
use flight_core::nmea::{FramerStats, NmeaFramer, SentenceQueue};
use log::info;

const CHUNK_LEN: usize = 16;

/// Serves a byte buffer in small chunks at roughly the pace of a UART
/// running at `baud` (8N1). A zero baud rate means no pacing.
pub struct PacedReader<'a> {
    bytes: &'a [u8],
    chunk_delay: Duration,
}

impl<'a> PacedReader<'a> {
    pub fn new(bytes: &'a [u8], baud: u32) -> Self {
        let chunk_delay = if baud == 0 {
            Duration::ZERO
        } else {
            Duration::from_secs_f64((CHUNK_LEN * 10) as f64 / f64::from(baud))
        };
        Self { bytes, chunk_delay }
    }
}

impl ErrorType for PacedReader<'_> {
    type Error = Infallible;
}

impl Read for PacedReader<'_> {
    async fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        if !self.chunk_delay.is_zero() && !self.bytes.is_empty() {
            thread::sleep(self.chunk_delay);
        }
        let len = buf.len().min(CHUNK_LEN).min(self.bytes.len());
        let (chunk, rest) = self.bytes.split_at(len);
        buf[..len].copy_from_slice(chunk);
        self.bytes = rest;
        Ok(len)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReplaySummary {
    pub fixes: Vec<GpsData>,
    pub framer: FramerStats,
    pub dropped: u32,
}

/// Runs `bytes` through the receive pipeline with the framer on its own
/// thread, the way the receive interrupt and main loop split the work on
/// the flight computer.
pub fn replay(bytes: &[u8], baud: u32) -> Result<ReplaySummary> {
    let mut queue = SentenceQueue::new();
    let (mut producer, mut consumer) = queue.split();
    let done = AtomicBool::new(false);
    let start = Instant::now();
    let clock = || start.elapsed().as_millis() as u64;

    thread::scope(|s| -> Result<ReplaySummary> {
        let receiver = s.spawn(|| {
            let mut framer = NmeaFramer::new();
            let mut rx = PacedReader::new(bytes, baud);
            let dropped = block_on(run_gps_uart_receiver(&mut rx, &mut framer, &mut producer));
            done.store(true, Ordering::Release);
            (framer.stats(), dropped)
        });

        let mut gps = GpsData::new();
        let mut fixes = Vec::new();
        loop {
            // read the flag first so sentences queued right before it was
            // set are still drained below
            let finished = done.load(Ordering::Acquire);
            if process_gps_sentences(&mut consumer, &mut gps, &clock) > 0 {
                print_fix(&gps);
                fixes.push(gps.clone());
            }
            if finished {
                break;
            }
            thread::sleep(Duration::from_millis(1));
        }

        let (framer, dropped) = receiver
            .join()
            .map_err(|_| anyhow!("receiver thread panicked"))?;
        Ok(ReplaySummary {
            fixes,
            framer,
            dropped,
        })
    })
}

fn print_fix(gps: &GpsData) {
    let seconds = gps.time_ms / 1000;
    println!(
        "{:02}:{:02}:{:02}.{:03}  {:>11.6} {:>11.6}  {:>9.1} m  (max {:.1} m)",
        seconds / 3600,
        seconds / 60 % 60,
        seconds % 60,
        gps.time_ms % 1000,
        gps.lat.to_degrees(),
        gps.lon.to_degrees(),
        f64::from(gps.alt) / 1000.0,
        f64::from(gps.alt_max) / 1000.0,
    );
}

pub fn log_summary(summary: &ReplaySummary) {
    info!(
        "{} fixes, {} sentences framed, {} overruns, {} restarts, {} dropped on a full queue",
        summary.fixes.len(),
        summary.framer.completions,
        summary.framer.overruns,
        summary.framer.restarts,
        summary.dropped
    );
}
