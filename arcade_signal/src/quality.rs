//! Adaptive quality control.
//!
//! A discrete hill-climber over three knobs.  Every sample reports how long
//! the extraction took; [`QualityController::tune`] moves at most one knob by
//! one step in response:
//!
//! ```text
//!   cost > 14 ms   degrade:  scale ↓ (≥ 0.75)  →  stride ↑ (≤ 3)  →  frame_skip ↑ (≤ 2)
//!   cost <  6 ms   improve:  frame_skip ↓       →  stride ↓         →  scale ↑ (≤ 1.0)
//!   otherwise      hold
//! ```
//!
//! The 6/14 dead band keeps the controller from thrashing around a single
//! operating point.

use log::debug;

pub const DEGRADE_ABOVE_MS: f64 = 14.0;
pub const IMPROVE_BELOW_MS: f64 = 6.0;

pub const SCALE_STEP:  f64 = 0.1;
pub const SCALE_FLOOR: f64 = 0.75;
pub const SCALE_MAX:   f64 = 1.0;
pub const STRIDE_MAX:  u32 = 3;
pub const SKIP_MAX:    u32 = 2;

const EPS: f64 = 1e-9;

/// Extraction parameters read by the metric extractor.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct QualityParams {
    /// Fraction of the native analysis resolution, in `(0, 1]`.
    pub scale:      f64,
    /// Sample every `stride`-th pixel on both axes.
    pub stride:     u32,
    /// Incoming frames dropped after each processed one.
    pub frame_skip: u32,
}

impl Default for QualityParams {
    fn default() -> Self {
        QualityParams { scale: SCALE_MAX, stride: 1, frame_skip: 0 }
    }
}

/// Which knob the last call to `tune` moved.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum QualityStep {
    Hold,
    ScaleDown,
    StrideUp,
    SkipUp,
    SkipDown,
    StrideDown,
    ScaleUp,
}

#[derive(Clone, Debug, Default)]
pub struct QualityController {
    params: QualityParams,
}

impl QualityController {
    pub fn new() -> Self {
        QualityController { params: QualityParams::default() }
    }

    pub fn params(&self) -> QualityParams {
        self.params
    }

    pub fn reset(&mut self) {
        self.params = QualityParams::default();
    }

    /// Feed one processing cost; returns the parameters for the next frame.
    pub fn tune(&mut self, cost_ms: f64) -> QualityParams {
        let step = self.step(cost_ms);
        if step != QualityStep::Hold {
            debug!(
                "quality {:?} after {:.1} ms → scale={:.2} stride={} skip={}",
                step, cost_ms, self.params.scale, self.params.stride, self.params.frame_skip
            );
        }
        self.params
    }

    /// Apply one adjustment and report which knob moved.
    pub fn step(&mut self, cost_ms: f64) -> QualityStep {
        let p = &mut self.params;
        if cost_ms > DEGRADE_ABOVE_MS {
            if p.scale > SCALE_FLOOR + EPS {
                p.scale = (p.scale - SCALE_STEP).max(SCALE_FLOOR);
                QualityStep::ScaleDown
            } else if p.stride < STRIDE_MAX {
                p.stride += 1;
                QualityStep::StrideUp
            } else if p.frame_skip < SKIP_MAX {
                p.frame_skip += 1;
                QualityStep::SkipUp
            } else {
                QualityStep::Hold
            }
        } else if cost_ms < IMPROVE_BELOW_MS {
            if p.frame_skip > 0 {
                p.frame_skip -= 1;
                QualityStep::SkipDown
            } else if p.stride > 1 {
                p.stride -= 1;
                QualityStep::StrideDown
            } else if p.scale < SCALE_MAX - EPS {
                p.scale = (p.scale + SCALE_STEP).min(SCALE_MAX);
                QualityStep::ScaleUp
            } else {
                QualityStep::Hold
            }
        } else {
            QualityStep::Hold
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at_floor(p: QualityParams) -> bool {
        (p.scale - SCALE_FLOOR).abs() < 1e-9 && p.stride == STRIDE_MAX && p.frame_skip == SKIP_MAX
    }

    #[test]
    fn heavy_load_degrades_one_step_at_a_time() {
        let mut q = QualityController::new();
        let expected = [
            QualityStep::ScaleDown,   // 0.9
            QualityStep::ScaleDown,   // 0.8
            QualityStep::ScaleDown,   // 0.75 (floored)
            QualityStep::StrideUp,    // 2
            QualityStep::StrideUp,    // 3
            QualityStep::SkipUp,      // 1
            QualityStep::SkipUp,      // 2
        ];
        for (i, want) in expected.iter().enumerate() {
            assert_eq!(q.step(20.0), *want, "call {}", i);
        }
        assert!(at_floor(q.params()));
        for _ in 0..10 {
            assert_eq!(q.step(20.0), QualityStep::Hold);
        }
        assert!(at_floor(q.params()));
    }

    #[test]
    fn degrade_is_monotone() {
        let mut q = QualityController::new();
        let mut prev = q.params();
        for _ in 0..20 {
            let p = q.tune(20.0);
            assert!(p.scale <= prev.scale);
            assert!(p.stride >= prev.stride);
            assert!(p.frame_skip >= prev.frame_skip);
            prev = p;
        }
    }

    #[test]
    fn light_load_recovers_in_reverse_order() {
        let mut q = QualityController::new();
        for _ in 0..20 { q.tune(20.0); }

        let expected = [
            QualityStep::SkipDown,
            QualityStep::SkipDown,
            QualityStep::StrideDown,
            QualityStep::StrideDown,
            QualityStep::ScaleUp,     // 0.85
            QualityStep::ScaleUp,     // 0.95
            QualityStep::ScaleUp,     // 1.0 (capped)
        ];
        for (i, want) in expected.iter().enumerate() {
            assert_eq!(q.step(3.0), *want, "call {}", i);
        }
        for _ in 0..10 { q.tune(3.0); }
        assert_eq!(q.params(), QualityParams { scale: 1.0, stride: 1, frame_skip: 0 });
    }

    #[test]
    fn dead_band_holds() {
        let mut q = QualityController::new();
        q.tune(20.0);
        let before = q.params();
        for cost in [6.0, 10.0, 14.0] {
            assert_eq!(q.step(cost), QualityStep::Hold);
        }
        assert_eq!(q.params(), before);
    }

    #[test]
    fn readapts_after_step_change() {
        let mut q = QualityController::new();
        for _ in 0..3 { q.tune(3.0); }
        assert_eq!(q.params(), QualityParams::default());
        q.tune(30.0);
        assert!(q.params().scale < 1.0);
        q.tune(2.0);
        assert_eq!(q.params().scale, 1.0);
    }
}
