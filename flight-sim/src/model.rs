use std::f64::consts::TAU;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use rand::Rng;
use serde::{Deserialize, Serialize};

pub const DEFAULT_GROUND_ALT_MM: i32 = 250_000;

/// (amplitude mm, period ms) of the slow pressure drift components.
const NOISE_SINUSOIDS: [(f64, f64); 4] = [
    (400.0, 5_030.0),
    (800.0, 12_175.0),
    (1_200.0, 18_050.0),
    (1_085.0, 10_000.0),
];
const NOISE_UNIFORM_MM: i32 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Noise {
    None,
    #[default]
    Idle,
    Disturbed,
}

impl Noise {
    fn scale(self) -> i32 {
        match self {
            Noise::None => 0,
            Noise::Idle => 1,
            Noise::Disturbed => 2,
        }
    }

    /// `t` is absolute model time so the sinusoids stay continuous across
    /// segments with the same noise.
    pub fn sample(self, t: u64, rng: &mut impl Rng) -> i32 {
        let scale = self.scale();
        if scale == 0 {
            return 0;
        }

        let t = t as f64;
        let drift: f64 = NOISE_SINUSOIDS
            .iter()
            .map(|(amplitude, period)| amplitude * (TAU * t / period).sin())
            .sum();
        let jitter = rng.random_range(-NOISE_UNIFORM_MM..=NOISE_UNIFORM_MM);

        scale * (drift as i32 + jitter)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfilePoint {
    pub tick_ms: u64,
    pub alt_mm: i32,
}

/// Altitude trace relative to the start of a segment.
#[derive(Debug, Clone, PartialEq)]
pub struct Profile {
    points: Vec<ProfilePoint>,
}

impl Profile {
    /// Points must be in time order, the first one is moved to tick 0.
    pub fn new(mut points: Vec<ProfilePoint>) -> Result<Self> {
        let first = points
            .first()
            .ok_or_else(|| anyhow!("flight profile has no points"))?
            .tick_ms;
        if points.windows(2).any(|w| w[1].tick_ms < w[0].tick_ms) {
            return Err(anyhow!("flight profile ticks go backwards"));
        }
        for point in points.iter_mut() {
            point.tick_ms -= first;
        }
        Ok(Self { points })
    }

    /// Reads a `tick_ms,alt_mm` CSV with a header row.
    pub fn load(path: &Path) -> Result<Self> {
        let mut reader = csv::Reader::from_path(path)
            .with_context(|| format!("failed to open profile {}", path.display()))?;
        let points = reader
            .deserialize()
            .collect::<Result<Vec<ProfilePoint>, _>>()
            .with_context(|| format!("failed to parse profile {}", path.display()))?;
        Self::new(points)
    }

    /// Boost, coast to roughly 950 m, then 20 m/s under parachute.
    pub fn builtin_flight() -> Self {
        let points = [
            (0, 0),
            (500, 2_000),
            (3_000, 150_000),
            (8_000, 600_000),
            (14_000, 900_000),
            (17_000, 950_000),
            (20_000, 930_000),
            (66_500, 0),
        ]
        .into_iter()
        .map(|(tick_ms, alt_mm)| ProfilePoint { tick_ms, alt_mm })
        .collect();
        Self { points }
    }

    pub fn duration(&self) -> u64 {
        self.points.last().map_or(0, |p| p.tick_ms)
    }

    pub fn end_alt(&self) -> i32 {
        self.points.last().map_or(0, |p| p.alt_mm)
    }

    /// Linear interpolation, clamped to the end points.
    pub fn at(&self, t: u64) -> i32 {
        let after = self.points.partition_point(|p| p.tick_ms <= t);
        match (after.checked_sub(1).map(|i| self.points[i]), self.points.get(after)) {
            (Some(before), Some(after)) => {
                let delta = i64::from(after.alt_mm - before.alt_mm);
                let tdelta = (after.tick_ms - before.tick_ms) as i64;
                let progress = (t - before.tick_ms) as i64;
                before.alt_mm + (delta * progress / tdelta) as i32
            }
            (Some(last), None) => last.alt_mm,
            (None, Some(first)) => first.alt_mm,
            (None, None) => 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum SegmentKind {
    Level,
    Rate { rate_mm_per_ms: f64 },
    Profile(Profile),
}

#[derive(Debug, Clone, PartialEq)]
struct Segment {
    start: u64,
    base_alt: i32,
    kind: SegmentKind,
    noise: Noise,
}

/// Piecewise altitude over time, built segment by segment. Each segment
/// starts at the altitude the previous one ended on.
#[derive(Debug, Clone, PartialEq)]
pub struct AltitudeModel {
    alt: i32,
    duration: u64,
    segments: Vec<Segment>,
}

impl AltitudeModel {
    pub fn new(start_alt: i32) -> Self {
        Self {
            alt: start_alt,
            duration: 0,
            segments: Vec::new(),
        }
    }

    pub fn duration(&self) -> u64 {
        self.duration
    }

    fn push(&mut self, duration: u64, kind: SegmentKind, noise: Noise) -> &mut Self {
        self.segments.push(Segment {
            start: self.duration,
            base_alt: self.alt,
            kind,
            noise,
        });
        self.duration += duration;
        self
    }

    pub fn level(&mut self, duration: u64, noise: Noise) -> &mut Self {
        self.push(duration, SegmentKind::Level, noise)
    }

    pub fn rate(&mut self, duration: u64, rate_mm_per_ms: f64, noise: Noise) -> &mut Self {
        self.push(duration, SegmentKind::Rate { rate_mm_per_ms }, noise);
        self.alt += (duration as f64 * rate_mm_per_ms) as i32;
        self
    }

    pub fn profile(&mut self, profile: Profile, noise: Noise) -> &mut Self {
        let (duration, end_alt) = (profile.duration(), profile.end_alt());
        self.push(duration, SegmentKind::Profile(profile), noise);
        self.alt += end_alt;
        self
    }

    /// Ten minutes on the pad with the weather drifting around.
    pub fn standard_field() -> Self {
        let mut model = Self::new(DEFAULT_GROUND_ALT_MM);
        model
            .level(600_000, Noise::Idle)
            .rate(10_000, 0.2, Noise::Idle)
            .level(30_000, Noise::Idle)
            .rate(30_000, -0.01, Noise::Disturbed)
            .rate(15_000, 0.08, Noise::Disturbed)
            .level(15_000, Noise::Idle);
        model
    }

    /// [`Self::standard_field`] followed by the built-in flight and a quiet
    /// minute after touchdown.
    pub fn standard_flight() -> Self {
        let mut model = Self::standard_field();
        model
            .profile(Profile::builtin_flight(), Noise::Disturbed)
            .level(60_000, Noise::None);
        model
    }

    pub fn from_config(config: &ModelConfig, base_dir: &Path) -> Result<Self> {
        let mut model = Self::new(config.start_alt_mm);
        for segment in &config.segments {
            match segment {
                SegmentConfig::Level { duration_ms, noise } => {
                    model.level(*duration_ms, *noise);
                }
                SegmentConfig::Rate {
                    duration_ms,
                    rate_mm_per_ms,
                    noise,
                } => {
                    model.rate(*duration_ms, *rate_mm_per_ms, *noise);
                }
                SegmentConfig::Profile { path, noise } => {
                    model.profile(Profile::load(&base_dir.join(path))?, *noise);
                }
            }
        }

        if model.segments.is_empty() {
            return Err(anyhow!("altitude model has no segments"));
        }
        Ok(model)
    }

    fn segment_at(&self, t: u64) -> Option<&Segment> {
        let index = self.segments.partition_point(|s| s.start <= t);
        index.checked_sub(1).map(|i| &self.segments[i])
    }

    /// True altitude without noise.
    pub fn clean(&self, t: u64) -> i32 {
        let Some(segment) = self.segment_at(t) else {
            return self.alt;
        };

        let elapsed = t - segment.start;
        segment.base_alt
            + match &segment.kind {
                SegmentKind::Level => 0,
                SegmentKind::Rate { rate_mm_per_ms } => (elapsed as f64 * rate_mm_per_ms) as i32,
                SegmentKind::Profile(profile) => profile.at(elapsed),
            }
    }

    /// What the barometer would read at `t`.
    pub fn sample(&self, t: u64, rng: &mut impl Rng) -> i32 {
        let noise = self.segment_at(t).map_or(Noise::None, |s| s.noise);
        self.clean(t) + noise.sample(t, rng)
    }

    /// Samples the whole model every `interval_ms`, each gap varied by up
    /// to `jitter_ms`. Like a real sensor the first reading shows up a few
    /// intervals after power-on.
    pub fn generate(
        &self,
        interval_ms: u64,
        jitter_ms: u64,
        rng: &mut impl Rng,
    ) -> Vec<(u64, i32)> {
        let mut t = 0;
        for _ in 0..10 {
            t += next_gap(interval_ms, jitter_ms, rng);
        }

        let mut samples = Vec::new();
        while t < self.duration {
            samples.push((t, self.sample(t, rng)));
            t += next_gap(interval_ms, jitter_ms, rng);
        }
        samples
    }
}

/// `interval_ms` give or take half of `jitter_ms`, never zero.
fn next_gap(interval_ms: u64, jitter_ms: u64, rng: &mut impl Rng) -> u64 {
    let jitter = if jitter_ms == 0 {
        0
    } else {
        rng.random_range(0..jitter_ms)
    };
    (interval_ms + jitter).saturating_sub(jitter_ms / 2).max(1)
}

fn default_start_alt() -> i32 {
    DEFAULT_GROUND_ALT_MM
}

/// TOML description of an [`AltitudeModel`].
///
/// ```toml
/// start_alt_mm = 250000
///
/// [[segment]]
/// kind = "level"
/// duration_ms = 60000
///
/// [[segment]]
/// kind = "profile"
/// path = "flight.csv"
/// noise = "disturbed"
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    #[serde(default = "default_start_alt")]
    pub start_alt_mm: i32,
    #[serde(rename = "segment")]
    pub segments: Vec<SegmentConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SegmentConfig {
    Level {
        duration_ms: u64,
        #[serde(default)]
        noise: Noise,
    },
    Rate {
        duration_ms: u64,
        rate_mm_per_ms: f64,
        #[serde(default)]
        noise: Noise,
    },
    Profile {
        /// relative to the model file
        path: PathBuf,
        #[serde(default)]
        noise: Noise,
    },
}

impl ModelConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let config_str = fs::read_to_string(path)
            .with_context(|| format!("failed to read model {}", path.display()))?;
        let config = toml::from_str(&config_str)
            .with_context(|| format!("failed to parse model {}", path.display()))?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{SeedableRng, rngs::StdRng};
    use std::io::Write;

    #[test]
    fn segments_chain_their_altitudes() {
        let mut model = AltitudeModel::new(1_000);
        model
            .level(1_000, Noise::None)
            .rate(2_000, 0.5, Noise::None)
            .level(1_000, Noise::None);

        assert_eq!(model.duration(), 4_000);
        assert_eq!(model.clean(0), 1_000);
        assert_eq!(model.clean(999), 1_000);
        assert_eq!(model.clean(1_000), 1_000);
        assert_eq!(model.clean(2_000), 1_500);
        assert_eq!(model.clean(3_000), 2_000);
        assert_eq!(model.clean(3_500), 2_000);
        // past the end holds the final altitude
        assert_eq!(model.clean(10_000), 2_000);
    }

    #[test]
    fn profile_interpolates_between_points() {
        let profile = Profile::new(vec![
            ProfilePoint { tick_ms: 500, alt_mm: 0 },
            ProfilePoint { tick_ms: 1_500, alt_mm: 1_000 },
            ProfilePoint { tick_ms: 2_500, alt_mm: 0 },
        ])
        .unwrap();

        assert_eq!(profile.duration(), 2_000);
        assert_eq!(profile.at(0), 0);
        assert_eq!(profile.at(250), 250);
        assert_eq!(profile.at(1_000), 1_000);
        assert_eq!(profile.at(1_900), 100);
        assert_eq!(profile.at(5_000), 0);

        let mut model = AltitudeModel::new(100);
        model.profile(profile, Noise::None).level(100, Noise::None);
        assert_eq!(model.clean(1_000), 1_100);
        assert_eq!(model.clean(2_050), 100);
    }

    #[test]
    fn bad_profiles_are_rejected() {
        assert!(Profile::new(Vec::new()).is_err());
        assert!(
            Profile::new(vec![
                ProfilePoint { tick_ms: 10, alt_mm: 0 },
                ProfilePoint { tick_ms: 5, alt_mm: 0 },
            ])
            .is_err()
        );
    }

    #[test]
    fn noise_stays_bounded() {
        let mut rng = StdRng::seed_from_u64(7);
        let bound: f64 = NOISE_SINUSOIDS.iter().map(|(a, _)| a).sum::<f64>()
            + f64::from(NOISE_UNIFORM_MM);

        for t in (0..120_000).step_by(37) {
            assert_eq!(Noise::None.sample(t, &mut rng), 0);
            assert!(f64::from(Noise::Idle.sample(t, &mut rng).abs()) <= bound + 1.0);
            assert!(f64::from(Noise::Disturbed.sample(t, &mut rng).abs()) <= 2.0 * bound + 2.0);
        }
    }

    #[test]
    fn generated_samples_respect_jitter() {
        let mut model = AltitudeModel::new(0);
        model.level(60_000, Noise::None);

        let mut rng = StdRng::seed_from_u64(1);
        let samples = model.generate(100, 20, &mut rng);
        assert!(samples.len() > 500);
        assert!(samples.first().unwrap().0 >= 900);
        for pair in samples.windows(2) {
            let gap = pair[1].0 - pair[0].0;
            assert!((90..110).contains(&gap), "gap {}", gap);
        }
        assert!(samples.iter().all(|(_, alt)| *alt == 0));
    }

    #[test]
    fn same_seed_same_samples() {
        let model = AltitudeModel::standard_field();
        let a = model.generate(100, 20, &mut StdRng::seed_from_u64(3));
        let b = model.generate(100, 20, &mut StdRng::seed_from_u64(3));
        assert_eq!(a, b);
    }

    #[test]
    fn standard_flight_returns_to_the_field() {
        let model = AltitudeModel::standard_flight();
        let end = model.clean(model.duration());
        // the drift segments leave the pad a little higher than it started
        assert_eq!(end, DEFAULT_GROUND_ALT_MM + 2_000 - 300 + 1_200);
    }

    #[test]
    fn config_builds_model() {
        let dir = tempfile::tempdir().unwrap();
        let mut profile = std::fs::File::create(dir.path().join("flight.csv")).unwrap();
        writeln!(profile, "tick_ms,alt_mm").unwrap();
        writeln!(profile, "0,0").unwrap();
        writeln!(profile, "1000,5000").unwrap();

        let config: ModelConfig = toml::from_str(
            r#"
            start_alt_mm = 1000

            [[segment]]
            kind = "level"
            duration_ms = 500
            noise = "none"

            [[segment]]
            kind = "rate"
            duration_ms = 1000
            rate_mm_per_ms = 2.0

            [[segment]]
            kind = "profile"
            path = "flight.csv"
            noise = "disturbed"
            "#,
        )
        .unwrap();

        assert_eq!(
            config.segments[1],
            SegmentConfig::Rate {
                duration_ms: 1_000,
                rate_mm_per_ms: 2.0,
                noise: Noise::Idle
            }
        );

        let model = AltitudeModel::from_config(&config, dir.path()).unwrap();
        assert_eq!(model.duration(), 2_500);
        assert_eq!(model.clean(1_500), 3_000);
        assert_eq!(model.clean(2_500), 8_000);
    }

    #[test]
    fn missing_profile_is_an_error() {
        let config = ModelConfig {
            start_alt_mm: 0,
            segments: vec![SegmentConfig::Profile {
                path: "does-not-exist.csv".into(),
                noise: Noise::None,
            }],
        };
        assert!(AltitudeModel::from_config(&config, Path::new("/nonexistent")).is_err());
    }
}
