//! Debounced trigger: hysteresis + sustain + cooldown.
//!
//! The machine has two behavioural states, modelled with the `armed` flag
//! and the `cooldown_until` deadline rather than an enum:
//!
//! ```text
//!            ema ≥ high for ≥ sustain  &&  now ≥ cooldown_until
//!   ARMED ─────────────────────────────────────────────────────▶ COOLDOWN
//!     ▲                      (fire once)                            │
//!     └──────────────────────── ema ≤ low ──────────────────────────┘
//! ```
//!
//! `high = threshold`, `low = max(0.05, threshold − HYSTERESIS)`.  Dipping
//! under `high` at any point restarts the sustain timer, even when the signal
//! is still above `low`.

/// Width of the hysteresis band below the threshold.
pub const HYSTERESIS: f64 = 0.07;

/// Lowest re-arm level regardless of threshold.
pub const LOW_FLOOR: f64 = 0.05;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TriggerState {
    pub armed:          bool,
    /// Time (ms) the ratio last rose to `high`; `None` while below it.
    pub above_since:    Option<f64>,
    pub cooldown_until: f64,
}

impl Default for TriggerState {
    fn default() -> Self {
        TriggerState { armed: true, above_since: None, cooldown_until: 0.0 }
    }
}

/// Converts a smoothed ratio into discrete fire events.
#[derive(Clone, Debug, Default)]
pub struct TriggerMachine {
    state: TriggerState,
}

impl TriggerMachine {
    pub fn new() -> Self {
        TriggerMachine::default()
    }

    pub fn state(&self) -> TriggerState {
        self.state
    }

    pub fn is_armed(&self) -> bool {
        self.state.armed
    }

    pub fn reset(&mut self) {
        self.state = TriggerState::default();
    }

    /// Re-arm level for a given threshold.
    pub fn low_band(threshold: f64) -> f64 {
        (threshold - HYSTERESIS).max(LOW_FLOOR)
    }

    /// Evaluate one tick.  Returns `true` exactly when the trigger fires.
    ///
    /// `now` must be monotonic (ms).  `sustain_ms` and `cooldown_ms` are read
    /// fresh every tick so tunables take effect immediately.
    pub fn update(
        &mut self,
        now:         f64,
        ema:         f64,
        threshold:   f64,
        sustain_ms:  f64,
        cooldown_ms: f64,
    ) -> bool {
        let high = threshold;
        let low  = Self::low_band(threshold);
        let s    = &mut self.state;

        if ema >= high {
            if s.above_since.is_none() {
                s.above_since = Some(now);
            }
        } else {
            s.above_since = None;
        }

        let mut fired = false;
        if s.armed {
            if let Some(since) = s.above_since {
                if now - since >= sustain_ms && now >= s.cooldown_until {
                    fired = true;
                    s.armed = false;
                    s.cooldown_until = now + cooldown_ms;
                }
            }
        } else if ema <= low {
            s.armed = true;
            s.above_since = None;
        }

        fired
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const T: f64 = 0.5;
    const S: f64 = 200.0;
    const C: f64 = 500.0;

    #[test]
    fn sustained_signal_fires_once_at_sustain() {
        let mut m = TriggerMachine::new();
        let mut fires = Vec::new();
        // 1 ms resolution over 1.2 s, signal pinned at 0.6.
        for t in 0..=1200 {
            let now = t as f64;
            if m.update(now, 0.6, T, S, C) { fires.push(now); }
        }
        assert_eq!(fires, vec![200.0]);
        assert!(!m.is_armed());
        assert_eq!(m.state().cooldown_until, 700.0);
    }

    #[test]
    fn no_refire_inside_cooldown_even_after_rearm() {
        let mut m = TriggerMachine::new();
        let mut fires = Vec::new();
        for t in (0..=2000).step_by(10) {
            let now = t as f64;
            // Fire at 200, drop to re-arm at 300, come back up from 320 on.
            let ema = if (300..320).contains(&t) { 0.3 } else { 0.6 };
            if m.update(now, ema, T, S, C) { fires.push(now); }
        }
        assert_eq!(fires[0], 200.0);
        assert!(fires[1] >= 700.0, "second fire at {}", fires[1]);
        assert_eq!(fires.len(), 2);
    }

    #[test]
    fn short_burst_does_not_fire_and_clears_latch() {
        let mut m = TriggerMachine::new();
        for t in 0..100 {
            assert!(!m.update(t as f64, 0.6, T, S, C));
        }
        assert_eq!(m.state().above_since, Some(0.0));
        for t in 100..400 {
            assert!(!m.update(t as f64, 0.42, T, S, C));
        }
        assert_eq!(m.state().above_since, None);
        assert!(m.is_armed());
    }

    #[test]
    fn dip_inside_band_restarts_sustain() {
        let mut m = TriggerMachine::new();
        for t in 0..150 { m.update(t as f64, 0.6, T, S, C); }
        // 0.47 is below high but above low (0.43).
        assert!(!m.update(150.0, 0.47, T, S, C));
        assert_eq!(m.state().above_since, None);
        let mut fired_at = None;
        for t in 151..600 {
            if m.update(t as f64, 0.6, T, S, C) { fired_at = Some(t); break; }
        }
        assert_eq!(fired_at, Some(351));
    }

    #[test]
    fn rearm_requires_falling_through_low_band() {
        let mut m = TriggerMachine::new();
        for t in 0..=200 { m.update(t as f64, 0.6, T, S, C); }
        assert!(!m.is_armed());
        // Hovering between low and high keeps it disarmed.
        for t in 201..1000 { m.update(t as f64, 0.45, T, S, C); }
        assert!(!m.is_armed());
        m.update(1000.0, 0.43, T, S, C);
        assert!(m.is_armed());
    }

    #[test]
    fn low_band_floor() {
        assert!((TriggerMachine::low_band(0.5) - 0.43).abs() < 1e-12);
        assert_eq!(TriggerMachine::low_band(0.08), LOW_FLOOR);
    }

    #[test]
    fn reset_restores_armed() {
        let mut m = TriggerMachine::new();
        for t in 0..=200 { m.update(t as f64, 0.9, T, S, C); }
        m.reset();
        assert_eq!(m.state(), TriggerState::default());
    }
}
