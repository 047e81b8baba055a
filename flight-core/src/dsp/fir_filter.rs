/// Upper bound on the number of taps a filter may be built with.
pub const MAX_TAPS: usize = 100;

/// Coefficients are Q8.24.
pub const COEFFICIENT_FRAC_BITS: u32 = 24;

/// Samples inside the delay line are Q28.4, which keeps ~134 km of
/// millimetre-resolution altitude representable.
pub const SAMPLE_FRAC_BITS: u32 = 4;

const OUTPUT_SHIFT: u32 = COEFFICIENT_FRAC_BITS + SAMPLE_FRAC_BITS;

/// Fixed-point FIR filter with `N` taps.
///
/// The delay line is warm-started with the first sample it sees, so a
/// filter fed a constant signal outputs that signal from the very first
/// call instead of ramping up from zero.
#[derive(Debug, Clone)]
pub struct FirFilter<const N: usize> {
    coefficients: [i32; N],
    taps: [i32; N],
    valid: bool,
}

impl<const N: usize> FirFilter<N> {
    /// Uniform window (moving average) normalised to unity in Q8.24.
    pub const fn new() -> Self {
        Self::with_coefficients([(1 << COEFFICIENT_FRAC_BITS) / N as i32; N])
    }

    /// Custom Q8.24 window. Coefficients are immutable once the filter exists.
    pub const fn with_coefficients(coefficients: [i32; N]) -> Self {
        const {
            assert!(N > 0 && N <= MAX_TAPS, "tap count must be within 1..=MAX_TAPS");
        }

        Self {
            coefficients,
            taps: [0; N],
            valid: false,
        }
    }

    pub const fn tap_count(&self) -> usize {
        N
    }

    pub fn coefficients(&self) -> &[i32; N] {
        &self.coefficients
    }

    /// Whether the delay line has been primed by a first sample.
    pub fn is_warm(&self) -> bool {
        self.valid
    }

    /// Forget the history, the next sample warm-starts the filter again.
    pub fn reset(&mut self) {
        self.taps = [0; N];
        self.valid = false;
    }

    pub fn run(&mut self, sample: i32) -> i32 {
        let mut carried = sample << SAMPLE_FRAC_BITS;

        if !self.valid {
            self.taps = [carried; N];
            self.valid = true;
        }

        // newest sample enters at the head while the oldest falls off the end
        let mut sum: i64 = 0;
        for (c, tap) in self.coefficients.iter().zip(self.taps.iter_mut()) {
            sum += i64::from(*c) * i64::from(carried);
            carried = core::mem::replace(tap, carried);
        }

        (sum >> OUTPUT_SHIFT) as i32
    }
}

impl<const N: usize> Default for FirFilter<N> {
    fn default() -> Self {
        Self::new()
    }
}
