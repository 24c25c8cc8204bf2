//! Per-camera-session vision pipeline.
//!
//! A [`VisionSession`] is created when the camera starts and dropped when it
//! stops.  It owns the smoother, trigger machine, quality controller and any
//! running calibration, so a new session always begins from clean state.
//!
//! The owner drives it cooperatively: once per activation it hands over the
//! newest frame (or nothing) and gets back the events that frame produced.
//! Every activation checks the liveness flag first, so a stopped session
//! never acts on a frame that was already in flight.

use std::time::Instant;

use image::RgbaImage;
use log::{debug, info, warn};

use crate::calibration::{Calibration, CalibrationOutcome, THRESHOLD_MAX, THRESHOLD_MIN};
use crate::error::SignalError;
use crate::metric::{
    DetectionMode, DetectorExtractor, FaceDetector, HeuristicExtractor, MetricEngine, Sample,
};
use crate::quality::{QualityController, QualityParams};
use crate::smoother::Smoother;
use crate::trigger::{TriggerMachine, TriggerState};

// ════════════════════════════════════════════════════════════════════════════
// TriggerSettings: runtime tunables
// ════════════════════════════════════════════════════════════════════════════

/// User-adjustable knobs.  Read on every sample, so changes apply to the next
/// frame without restarting the session.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TriggerSettings {
    pub threshold:   f64,
    pub sustain_ms:  f64,
    pub cooldown_ms: f64,
    pub mode:        DetectionMode,
    pub engine:      MetricEngine,
}

impl Default for TriggerSettings {
    fn default() -> Self {
        TriggerSettings {
            threshold:   0.22,
            sustain_ms:  120.0,
            cooldown_ms: 600.0,
            mode:        DetectionMode::MouthOpen,
            engine:      MetricEngine::Heuristic,
        }
    }
}

impl TriggerSettings {
    pub fn validate(&self) -> Result<(), SignalError> {
        if !(THRESHOLD_MIN..=THRESHOLD_MAX).contains(&self.threshold) {
            return Err(SignalError::ThresholdOutOfRange(self.threshold));
        }
        for (name, value) in [("sustain_ms", self.sustain_ms), ("cooldown_ms", self.cooldown_ms)] {
            if !value.is_finite() || value < 0.0 {
                return Err(SignalError::InvalidDuration { name, value });
            }
        }
        Ok(())
    }

    /// Switch detection mode, pulling the threshold to a sensible default.
    pub fn set_mode(&mut self, mode: DetectionMode) {
        self.mode = mode;
        self.threshold = mode.adjust_threshold(self.threshold);
    }

    pub fn nudge_threshold(&mut self, delta: f64) {
        self.threshold = (self.threshold + delta).clamp(THRESHOLD_MIN, THRESHOLD_MAX);
    }

    pub fn nudge_sustain(&mut self, delta_ms: f64) {
        self.sustain_ms = (self.sustain_ms + delta_ms).max(0.0);
    }

    pub fn nudge_cooldown(&mut self, delta_ms: f64) {
        self.cooldown_ms = (self.cooldown_ms + delta_ms).max(0.0);
    }
}

// ════════════════════════════════════════════════════════════════════════════
// SessionEvent
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Debug, PartialEq)]
pub enum SessionEvent {
    /// A frame was measured.
    Sampled(Sample),
    /// The trigger fired: perform the action.
    Fire,
    /// Detector engine saw no face; the sample counted as 0.
    NoFace,
    /// Detector engine selected but none is installed; heuristic used instead.
    DetectorUnavailable,
    /// The detector returned an error; the sample counted as 0.
    DetectorFailed(String),
    CalibrationDone(CalibrationOutcome),
}

// ════════════════════════════════════════════════════════════════════════════
// VisionSession
// ════════════════════════════════════════════════════════════════════════════

pub struct VisionSession {
    alive:          bool,
    heuristic:      HeuristicExtractor,
    detector:       Option<DetectorExtractor>,
    quality:        QualityController,
    smoother:       Smoother,
    trigger:        TriggerMachine,
    calibration:    Option<Calibration>,
    skip_remaining: u32,
    last_sample:    Option<Sample>,
    warned_no_detector: bool,
}

impl VisionSession {
    pub fn new(detector: Option<Box<dyn FaceDetector>>) -> Self {
        VisionSession {
            alive:          true,
            heuristic:      HeuristicExtractor::default(),
            detector:       detector.map(DetectorExtractor::new),
            quality:        QualityController::new(),
            smoother:       Smoother::new(),
            trigger:        TriggerMachine::new(),
            calibration:    None,
            skip_remaining: 0,
            last_sample:    None,
            warned_no_detector: false,
        }
    }

    pub fn with_extractor(mut self, heuristic: HeuristicExtractor) -> Self {
        self.heuristic = heuristic;
        self
    }

    // ── lifecycle ─────────────────────────────────────────────────────────

    pub fn is_alive(&self) -> bool { self.alive }

    /// Halt the session.  Later activations are no-ops.
    pub fn stop(&mut self) {
        if self.alive {
            info!("vision session stopped");
        }
        self.alive = false;
        self.calibration = None;
    }

    // ── accessors ─────────────────────────────────────────────────────────

    pub fn ratio(&self)         -> f64                 { self.smoother.value() }
    pub fn quality(&self)       -> QualityParams       { self.quality.params() }
    pub fn trigger_state(&self) -> TriggerState        { self.trigger.state() }
    pub fn last_sample(&self)   -> Option<Sample>      { self.last_sample }
    pub fn has_detector(&self)  -> bool                { self.detector.is_some() }
    pub fn is_calibrating(&self) -> bool               { self.calibration.is_some() }

    pub fn calibration_progress(&self, now: f64) -> Option<f64> {
        self.calibration.as_ref().map(|c| c.progress(now))
    }

    // ── calibration ───────────────────────────────────────────────────────

    /// Open a calibration window.  Restarts any window already open.
    pub fn begin_calibration(&mut self, now: f64, mode: DetectionMode) {
        if !self.alive { return; }
        info!("calibration started ({})", mode.label());
        self.calibration = Some(Calibration::start(now, mode));
    }

    /// Close the calibration window once it has elapsed, even if no frames
    /// arrived during it.
    pub fn poll_calibration(&mut self, now: f64) -> Option<CalibrationOutcome> {
        if !self.alive { return None; }
        let outcome = self.calibration.as_ref()?.poll(now, self.smoother.value())?;
        self.calibration = None;
        self.trigger.reset();
        info!(
            "calibration done: baseline={:.3} threshold={:.3} ({} samples)",
            outcome.baseline, outcome.threshold, outcome.samples
        );
        Some(outcome)
    }

    // ── per-frame work ────────────────────────────────────────────────────

    /// One activation of the vision task.
    pub fn process_frame(
        &mut self,
        frame:    &RgbaImage,
        now:      f64,
        settings: &TriggerSettings,
    ) -> Vec<SessionEvent> {
        let mut events = Vec::new();
        if !self.alive { return events; }

        if frame.width() == 0 || frame.height() == 0 {
            return events;
        }
        if self.skip_remaining > 0 {
            self.skip_remaining -= 1;
            return events;
        }

        let started = Instant::now();
        let value = self.extract(frame, now, settings, &mut events);
        let cost  = started.elapsed().as_secs_f64() * 1000.0;

        let sample = Sample { value, timestamp_ms: now, processing_cost_ms: cost };
        events.extend(self.ingest(sample, settings));
        events
    }

    fn extract(
        &mut self,
        frame:    &RgbaImage,
        now:      f64,
        settings: &TriggerSettings,
        events:   &mut Vec<SessionEvent>,
    ) -> f64 {
        if settings.engine == MetricEngine::Detector {
            match self.detector.as_mut() {
                Some(det) => {
                    return match det.measure(frame, now) {
                        Ok(Some(v)) => v,
                        Ok(None) => {
                            events.push(SessionEvent::NoFace);
                            0.0
                        }
                        Err(e) => {
                            warn!("{}", e);
                            events.push(SessionEvent::DetectorFailed(e.to_string()));
                            0.0
                        }
                    };
                }
                None => {
                    if !self.warned_no_detector {
                        warn!("no face detector installed; using heuristic metric");
                        self.warned_no_detector = true;
                    }
                    events.push(SessionEvent::DetectorUnavailable);
                }
            }
        }

        let params = self.quality.params();
        self.heuristic
            .measure(frame, &params)
            .map(|a| a.for_mode(settings.mode))
            .unwrap_or(0.0)
    }

    /// Feed an already-measured sample through quality control, smoothing,
    /// calibration and the trigger machine.
    pub fn ingest(&mut self, sample: Sample, settings: &TriggerSettings) -> Vec<SessionEvent> {
        let mut events = Vec::new();
        if !self.alive { return events; }

        let params = self.quality.tune(sample.processing_cost_ms);
        self.skip_remaining = params.frame_skip;

        let ema = self.smoother.update(sample.value);
        self.last_sample = Some(sample);
        events.push(SessionEvent::Sampled(sample));

        if let Some(cal) = self.calibration.as_mut() {
            cal.feed(sample.value);
            if let Some(outcome) = self.poll_calibration(sample.timestamp_ms) {
                events.push(SessionEvent::CalibrationDone(outcome));
            }
            return events;
        }

        if self.trigger.update(
            sample.timestamp_ms,
            ema,
            settings.threshold,
            settings.sustain_ms,
            settings.cooldown_ms,
        ) {
            debug!("trigger fired at {:.0} ms (ratio {:.3})", sample.timestamp_ms, ema);
            events.push(SessionEvent::Fire);
        }
        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metric::FaceBlendshapes;
    use image::Rgba;

    fn sample(value: f64, t: f64, cost: f64) -> Sample {
        Sample { value, timestamp_ms: t, processing_cost_ms: cost }
    }

    fn fires(events: &[SessionEvent]) -> usize {
        events.iter().filter(|e| **e == SessionEvent::Fire).count()
    }

    fn settings() -> TriggerSettings {
        TriggerSettings { threshold: 0.5, sustain_ms: 100.0, cooldown_ms: 500.0, ..Default::default() }
    }

    #[test]
    fn sustained_activation_fires_once() {
        let mut s = VisionSession::new(None);
        let cfg = settings();
        let mut total = 0;
        for i in 0..100 {
            total += fires(&s.ingest(sample(1.0, i as f64 * 16.0, 10.0), &cfg));
        }
        assert_eq!(total, 1);
        assert!(s.ratio() > 0.9);
    }

    #[test]
    fn frame_skip_drops_frames_after_each_sample() {
        let mut s = VisionSession::new(None);
        let cfg = settings();
        // Push the controller to its floor so frame_skip == 2.
        for i in 0..7 { s.ingest(sample(0.0, i as f64, 50.0), &cfg); }
        assert_eq!(s.quality().frame_skip, 2);

        let frame = RgbaImage::from_pixel(64, 48, Rgba([128, 128, 128, 255]));
        let processed: Vec<bool> = (0..6)
            .map(|i| !s.process_frame(&frame, 100.0 + i as f64, &cfg).is_empty())
            .collect();
        // The quick frames below relax the skip again, so only the first
        // two-frame gap is guaranteed.
        assert_eq!(&processed[..3], &[false, false, true]);
    }

    #[test]
    fn zero_sized_frames_do_not_use_up_skips() {
        let mut s = VisionSession::new(None);
        let cfg = settings();
        for i in 0..7 { s.ingest(sample(0.0, i as f64, 50.0), &cfg); }
        assert_eq!(s.quality().frame_skip, 2);

        for i in 0..3 {
            assert!(s.process_frame(&RgbaImage::new(0, 0), 100.0 + i as f64, &cfg).is_empty());
        }
        let frame = RgbaImage::from_pixel(64, 48, Rgba([128, 128, 128, 255]));
        assert!(s.process_frame(&frame, 110.0, &cfg).is_empty());
        assert!(s.process_frame(&frame, 111.0, &cfg).is_empty());
        assert!(!s.process_frame(&frame, 112.0, &cfg).is_empty());
    }

    #[test]
    fn zero_sized_frame_is_a_no_sample_tick() {
        let mut s = VisionSession::new(None);
        let events = s.process_frame(&RgbaImage::new(0, 0), 0.0, &settings());
        assert!(events.is_empty());
        assert!(s.last_sample().is_none());
    }

    #[test]
    fn stopped_session_ignores_everything() {
        let mut s = VisionSession::new(None);
        s.stop();
        let frame = RgbaImage::from_pixel(32, 32, Rgba([0, 0, 0, 255]));
        assert!(s.process_frame(&frame, 0.0, &settings()).is_empty());
        assert!(s.ingest(sample(1.0, 0.0, 1.0), &settings()).is_empty());
        s.begin_calibration(0.0, DetectionMode::Smile);
        assert!(!s.is_calibrating());
        assert_eq!(s.ratio(), 0.0);
    }

    #[test]
    fn calibration_withholds_trigger_then_reports() {
        let mut s = VisionSession::new(None);
        let cfg = settings();
        s.begin_calibration(0.0, DetectionMode::MouthOpen);

        let mut outcome = None;
        for i in 0..=70 {
            let ev = s.ingest(sample(0.9, i as f64 * 16.0, 10.0), &cfg);
            assert_eq!(fires(&ev), 0, "fired during calibration window");
            for e in ev {
                if let SessionEvent::CalibrationDone(o) = e { outcome = Some(o); }
            }
            if outcome.is_some() { break; }
        }
        let o = outcome.expect("calibration finished");
        assert!((o.baseline - 0.9).abs() < 1e-9);
        assert!((o.threshold - 0.95).abs() < 1e-9);
        assert!(!s.is_calibrating());
    }

    #[test]
    fn calibration_without_frames_uses_ema() {
        let mut s = VisionSession::new(None);
        let cfg = settings();
        for i in 0..50 { s.ingest(sample(0.2, i as f64, 10.0), &cfg); }
        s.begin_calibration(1000.0, DetectionMode::MouthOpen);
        assert!(s.poll_calibration(1500.0).is_none());
        let o = s.poll_calibration(2000.0).unwrap();
        assert_eq!(o.samples, 0);
        assert!((o.baseline - s.ratio()).abs() < 1e-12);
    }

    struct NoFaces;
    impl FaceDetector for NoFaces {
        fn detect(&mut self, _f: &RgbaImage, _t: f64) -> Result<Vec<FaceBlendshapes>, SignalError> {
            Ok(Vec::new())
        }
    }

    #[test]
    fn no_face_decays_ratio() {
        let mut s = VisionSession::new(Some(Box::new(NoFaces)));
        let cfg = TriggerSettings { engine: MetricEngine::Detector, ..settings() };
        for i in 0..20 { s.ingest(sample(1.0, i as f64, 10.0), &cfg); }
        let before = s.ratio();

        let frame = RgbaImage::from_pixel(32, 32, Rgba([0, 0, 0, 255]));
        let ev = s.process_frame(&frame, 100.0, &cfg);
        assert!(ev.contains(&SessionEvent::NoFace));
        assert!(s.ratio() < before);
        assert_eq!(s.last_sample().unwrap().value, 0.0);
    }

    #[test]
    fn missing_detector_falls_back_to_heuristic() {
        let mut s = VisionSession::new(None);
        let cfg = TriggerSettings { engine: MetricEngine::Detector, ..settings() };
        let frame = RgbaImage::from_pixel(320, 240, Rgba([0, 0, 0, 255]));
        let ev = s.process_frame(&frame, 0.0, &cfg);
        assert!(ev.contains(&SessionEvent::DetectorUnavailable));
        assert_eq!(s.last_sample().unwrap().value, 1.0);
    }

    #[test]
    fn settings_validation_and_nudges() {
        let mut cfg = TriggerSettings::default();
        assert!(cfg.validate().is_ok());
        cfg.threshold = 0.99;
        assert_eq!(cfg.validate(), Err(SignalError::ThresholdOutOfRange(0.99)));
        cfg.nudge_threshold(0.5);
        assert_eq!(cfg.threshold, THRESHOLD_MAX);
        cfg.sustain_ms = -1.0;
        assert!(matches!(cfg.validate(), Err(SignalError::InvalidDuration { name: "sustain_ms", .. })));
        cfg.nudge_sustain(-100.0);
        assert_eq!(cfg.sustain_ms, 0.0);

        let mut cfg = TriggerSettings::default();
        cfg.set_mode(DetectionMode::Smile);
        assert_eq!(cfg.threshold, 0.55);
    }
}
