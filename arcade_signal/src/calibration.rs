//! One-shot neutral-face calibration.
//!
//! While the window is open every sample is accumulated instead of being fed
//! to the trigger machine.  The routine never blocks: the caller offers
//! samples as they arrive and polls for completion with the current clock.

use crate::metric::DetectionMode;

/// Length of the collection window.
pub const CALIBRATION_WINDOW_MS: f64 = 1000.0;

pub const THRESHOLD_MIN: f64 = 0.05;
pub const THRESHOLD_MAX: f64 = 0.95;

/// Result of a finished calibration.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CalibrationOutcome {
    pub baseline:  f64,
    pub threshold: f64,
    pub samples:   u32,
}

#[derive(Clone, Debug)]
pub struct Calibration {
    started_at: f64,
    offset:     f64,
    sum:        f64,
    count:      u32,
}

impl Calibration {
    pub fn start(now: f64, mode: DetectionMode) -> Self {
        Calibration {
            started_at: now,
            offset:     mode.calibration_offset(),
            sum:        0.0,
            count:      0,
        }
    }

    pub fn feed(&mut self, value: f64) {
        self.sum += value;
        self.count += 1;
    }

    /// Fraction of the window elapsed, for progress display.
    pub fn progress(&self, now: f64) -> f64 {
        ((now - self.started_at) / CALIBRATION_WINDOW_MS).clamp(0.0, 1.0)
    }

    pub fn is_due(&self, now: f64) -> bool {
        now - self.started_at >= CALIBRATION_WINDOW_MS
    }

    /// Close the window.  With no samples the current smoothed value stands
    /// in for the baseline.
    pub fn finish(&self, current_ema: f64) -> CalibrationOutcome {
        let baseline = if self.count > 0 {
            self.sum / self.count as f64
        } else {
            current_ema
        };
        CalibrationOutcome {
            baseline,
            threshold: (baseline + self.offset).clamp(THRESHOLD_MIN, THRESHOLD_MAX),
            samples:   self.count,
        }
    }

    /// `finish` once the window has elapsed.
    pub fn poll(&self, now: f64, current_ema: f64) -> Option<CalibrationOutcome> {
        if self.is_due(now) { Some(self.finish(current_ema)) } else { None }
    }
}
