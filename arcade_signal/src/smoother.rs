//! Exponential moving average over per-frame activation.

/// Weight given to each new sample.
pub const ALPHA: f64 = 0.15;

/// Single-scalar EMA.  With inputs in `[0, 1]` the output stays in `[0, 1]`;
/// no further clamping is applied.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Smoother {
    ema: f64,
}

impl Smoother {
    pub fn new() -> Self {
        Smoother { ema: 0.0 }
    }

    /// Fold one sample in and return the new ratio.
    pub fn update(&mut self, value: f64) -> f64 {
        self.ema = self.ema * (1.0 - ALPHA) + value * ALPHA;
        self.ema
    }

    pub fn value(&self) -> f64 {
        self.ema
    }

    pub fn reset(&mut self) {
        self.ema = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constant_input_converges() {
        let mut s = Smoother::new();
        for _ in 0..200 { s.update(0.42); }
        assert!((s.value() - 0.42).abs() < 1e-9);
    }

    #[test]
    fn stays_within_unit_interval() {
        let mut s = Smoother::new();
        // Alternate the extremes; the EMA must never escape [0, 1].
        for i in 0..500 {
            let v = if i % 3 == 0 { 1.0 } else { 0.0 };
            let e = s.update(v);
            assert!((0.0..=1.0).contains(&e), "ema {} escaped at step {}", e, i);
        }
        for _ in 0..500 {
            let e = s.update(1.0);
            assert!(e <= 1.0);
        }
    }

    #[test]
    fn first_step_weight() {
        let mut s = Smoother::new();
        assert!((s.update(1.0) - 0.15).abs() < 1e-12);
        assert!((s.update(1.0) - (0.15 * 0.85 + 0.15)).abs() < 1e-12);
    }

    #[test]
    fn reset_zeroes() {
        let mut s = Smoother::new();
        s.update(0.9);
        s.reset();
        assert_eq!(s.value(), 0.0);
    }
}
