#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimebaseError {
    /// The fed tick is older than the newest tick already fed.
    DegenerateTimebase { last_tick: u64, tick: u64 },
}

/// Resamples an irregular `(sample, tick)` stream onto a fixed period
/// using linear interpolation between the two newest observations.
///
/// Every `feed` must be followed by polling until `poll` returns `None`,
/// otherwise due samples are interpolated against the wrong pair.
#[derive(Debug, Clone)]
pub struct Interpolator {
    period: u32,
    next_tick: u64,

    real_last: i32,
    real_last_tick: u64,

    current: i32,
    current_tick: u64,

    valid: bool,
}

impl Interpolator {
    /// A zero period is treated as one tick.
    pub const fn new(period: u32) -> Self {
        Self {
            period: if period == 0 { 1 } else { period },
            next_tick: 0,
            real_last: 0,
            real_last_tick: 0,
            current: 0,
            current_tick: 0,
            valid: false,
        }
    }

    pub fn period(&self) -> u32 {
        self.period
    }

    /// Tick of the next sample `poll` will produce, once initialised.
    pub fn next_tick(&self) -> Option<u64> {
        self.valid.then_some(self.next_tick)
    }

    pub fn feed(&mut self, sample: i32, tick: u64) -> Result<(), TimebaseError> {
        if !self.valid {
            self.real_last = sample;
            self.real_last_tick = tick;
            self.next_tick = tick;
            self.valid = true;
        } else {
            if tick < self.current_tick {
                return Err(TimebaseError::DegenerateTimebase {
                    last_tick: self.current_tick,
                    tick,
                });
            }
            self.real_last = self.current;
            self.real_last_tick = self.current_tick;
        }

        self.current = sample;
        self.current_tick = tick;
        Ok(())
    }

    pub fn poll(&mut self) -> Option<(i32, u64)> {
        if !self.valid || self.next_tick > self.current_tick {
            return None;
        }

        let tick = self.next_tick;
        let tdelta = self.current_tick - self.real_last_tick;

        // exact hit needs no division, and two observations sharing a tick
        // resolve to the newer one
        let sample = if tick == self.current_tick || tdelta == 0 {
            self.current
        } else {
            let delta = i64::from(self.current) - i64::from(self.real_last);
            let progress = tick as i64 - self.real_last_tick as i64;
            // multiply before dividing to keep the precision
            let offset = (progress * delta) / tdelta as i64;
            (i64::from(self.real_last) + offset) as i32
        };

        self.next_tick += u64::from(self.period);
        Some((sample, tick))
    }

    /// Drains every sample due up to the newest fed tick.
    pub fn drain(&mut self) -> impl Iterator<Item = (i32, u64)> + '_ {
        core::iter::from_fn(move || self.poll())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_interpolator_yields_nothing() {
        let mut interp = Interpolator::new(25);
        assert_eq!(interp.poll(), None);
        assert_eq!(interp.next_tick(), None);
    }

    #[test]
    fn first_sample_is_emitted_exactly() {
        let mut interp = Interpolator::new(25);
        interp.feed(1234, 1000).unwrap();
        assert_eq!(interp.poll(), Some((1234, 1000)));
        assert_eq!(interp.poll(), None);
        assert_eq!(interp.next_tick(), Some(1025));
    }

    #[test]
    fn four_periods_produce_four_even_steps() {
        let period = 25;
        let t0 = 10_000;
        let mut interp = Interpolator::new(period);

        interp.feed(0, t0).unwrap();
        assert_eq!(interp.drain().count(), 1);

        interp.feed(100, t0 + 4 * period as u64).unwrap();
        let mut out = [(0, 0); 4];
        let mut n = 0;
        for s in interp.drain() {
            out[n] = s;
            n += 1;
        }

        assert_eq!(n, 4);
        assert_eq!(
            out,
            [
                (25, t0 + 25),
                (50, t0 + 50),
                (75, t0 + 75),
                (100, t0 + 100)
            ]
        );
    }

    #[test]
    fn irregular_input_is_resampled() {
        let mut interp = Interpolator::new(10);
        interp.feed(0, 0).unwrap();
        interp.drain().for_each(drop);

        // 7 ms late, no emission due yet for tick 10
        interp.feed(70, 7).unwrap();
        assert_eq!(interp.poll(), None);

        interp.feed(-30, 17).unwrap();
        // between (70, 7) and (-30, 17): 70 + 3 * -100 / 10
        assert_eq!(interp.poll(), Some((40, 10)));
        assert_eq!(interp.poll(), None);
    }

    #[test]
    fn sparse_input_fills_every_period() {
        let mut interp = Interpolator::new(500);
        interp.feed(0, 0).unwrap();
        interp.drain().for_each(drop);

        interp.feed(10_000, 5_000).unwrap();
        let ticks: heapless::Vec<u64, 16> = interp.drain().map(|(_, t)| t).collect();
        assert_eq!(ticks.len(), 10);
        assert_eq!(ticks.first(), Some(&500));
        assert_eq!(ticks.last(), Some(&5_000));
    }

    #[test]
    fn shared_tick_uses_newest_sample() {
        let mut interp = Interpolator::new(25);
        interp.feed(0, 0).unwrap();
        // skipping the drain on purpose leaves tick 0 due
        interp.feed(10, 0).unwrap();
        assert_eq!(interp.poll(), Some((10, 0)));

        interp.feed(20, 50).unwrap();
        interp.feed(99, 50).unwrap();
        // tick 25 falls between two observations both stamped 50
        assert_eq!(interp.poll(), Some((99, 25)));
        assert_eq!(interp.poll(), Some((99, 50)));
    }

    #[test]
    fn backwards_tick_is_rejected() {
        let mut interp = Interpolator::new(25);
        interp.feed(0, 100).unwrap();
        interp.drain().for_each(drop);

        assert_eq!(
            interp.feed(5, 99),
            Err(TimebaseError::DegenerateTimebase {
                last_tick: 100,
                tick: 99
            })
        );
        assert_eq!(interp.poll(), None);

        interp.feed(50, 150).unwrap();
        assert_eq!(interp.poll(), Some((25, 125)));
    }
}
