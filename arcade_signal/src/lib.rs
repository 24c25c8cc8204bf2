//! # arcade_signal
//!
//! Turns a noisy camera-derived activation metric into clean, debounced
//! trigger events while keeping per-frame processing cost bounded.
//!
//! ## Pipeline
//!
//! | Stage | Type | Role |
//! |---|---|---|
//! | Extract | [`HeuristicExtractor`] / [`DetectorExtractor`] | frame → activation in `[0, 1]` |
//! | Tune | [`QualityController`] | processing cost → next frame's [`QualityParams`] |
//! | Smooth | [`Smoother`] | activation → EMA ratio |
//! | Trigger | [`TriggerMachine`] | ratio → discrete fire events (hysteresis + sustain + cooldown) |
//! | Calibrate | [`Calibration`] | 1 s neutral baseline → threshold |
//!
//! [`VisionSession`] owns one instance of every stateful stage for the
//! lifetime of a camera session, so nothing leaks across stop/start cycles.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use arcade_signal::{VisionSession, TriggerSettings, SessionEvent};
//! use image::RgbaImage;
//!
//! let mut session = VisionSession::new(None);
//! let settings = TriggerSettings::default();
//! let frame = RgbaImage::new(320, 240);
//!
//! for ev in session.process_frame(&frame, 0.0, &settings) {
//!     if let SessionEvent::Fire = ev {
//!         // jump!
//!     }
//! }
//! ```

pub mod calibration;
pub mod error;
pub mod metric;
pub mod quality;
pub mod session;
pub mod smoother;
pub mod trigger;

pub use calibration::{Calibration, CalibrationOutcome, CALIBRATION_WINDOW_MS};
pub use error::SignalError;
pub use metric::{
    luminance, DetectionMode, DetectorExtractor, FaceBlendshapes, FaceDetector,
    HeuristicExtractor, MetricEngine, RoiLayout, Sample,
};
pub use quality::{QualityController, QualityParams};
pub use session::{SessionEvent, TriggerSettings, VisionSession};
pub use smoother::Smoother;
pub use trigger::{TriggerMachine, TriggerState, HYSTERESIS};
