//! Activation metrics.
//!
//! Two engines produce the per-frame activation value:
//!
//! * [`HeuristicExtractor`]: luminance statistics over a lower-centre region
//!   of interest where the mouth sits when the face is centred.  Dark pixels
//!   stand for an open mouth, bright pixels for teeth in a smile.
//! * [`DetectorExtractor`]: the averaged left/right smile blend-shape score
//!   reported by an external face-landmark detector.

use image::imageops::{self, FilterType};
use image::RgbaImage;
use std::borrow::Cow;

use crate::error::SignalError;
use crate::quality::QualityParams;

// ════════════════════════════════════════════════════════════════════════════
// Sample
// ════════════════════════════════════════════════════════════════════════════

/// One processed frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Sample {
    pub value:              f64,
    pub timestamp_ms:       f64,
    pub processing_cost_ms: f64,
}

// ════════════════════════════════════════════════════════════════════════════
// Modes
// ════════════════════════════════════════════════════════════════════════════

/// Which facial action drives the trigger.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum DetectionMode {
    /// Dark-pixel fraction (open mouth).
    #[default]
    MouthOpen,
    /// Bright-pixel fraction (teeth showing).
    Smile,
}

impl DetectionMode {
    pub fn label(self) -> &'static str {
        match self {
            DetectionMode::MouthOpen => "mouth-open",
            DetectionMode::Smile     => "smile",
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            DetectionMode::MouthOpen => DetectionMode::Smile,
            DetectionMode::Smile     => DetectionMode::MouthOpen,
        }
    }

    /// Margin added to the neutral baseline by calibration.
    pub fn calibration_offset(self) -> f64 {
        match self {
            DetectionMode::MouthOpen => 0.12,
            DetectionMode::Smile     => 0.15,
        }
    }

    /// Threshold to use after switching into this mode.  A threshold that
    /// makes no sense for the new metric is replaced by the mode default.
    pub fn adjust_threshold(self, threshold: f64) -> f64 {
        match self {
            DetectionMode::Smile     if threshold < 0.3 => 0.55,
            DetectionMode::MouthOpen if threshold > 0.6 => 0.22,
            _ => threshold,
        }
    }

    pub fn hint(self) -> &'static str {
        match self {
            DetectionMode::MouthOpen =>
                "Centre your face in the guide and open your mouth to jump",
            DetectionMode::Smile =>
                "Face the camera and smile so your teeth show to jump",
        }
    }
}

/// Which extractor produces the activation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum MetricEngine {
    #[default]
    Heuristic,
    Detector,
}

impl MetricEngine {
    pub fn label(self) -> &'static str {
        match self {
            MetricEngine::Heuristic => "heuristic",
            MetricEngine::Detector  => "detector",
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            MetricEngine::Heuristic => MetricEngine::Detector,
            MetricEngine::Detector  => MetricEngine::Heuristic,
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Heuristic extractor
// ════════════════════════════════════════════════════════════════════════════

/// Native analysis resolution before quality scaling.
pub const ANALYSIS_W: u32 = 160;
pub const ANALYSIS_H: u32 = 120;

pub const DARK_LUMA:   f64 = 70.0;
pub const BRIGHT_LUMA: f64 = 180.0;

/// Rec. 709 luma.
pub fn luminance(r: u8, g: u8, b: u8) -> f64 {
    0.2126 * r as f64 + 0.7152 * g as f64 + 0.0722 * b as f64
}

/// Partitioning of the region of interest.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum RoiLayout {
    /// The whole box as one block.
    SingleBox,
    /// 3×3 blocks; a local feature only needs to fill one of them.
    #[default]
    Grid3x3,
}

impl RoiLayout {
    fn divisions(self) -> u32 {
        match self {
            RoiLayout::SingleBox => 1,
            RoiLayout::Grid3x3   => 3,
        }
    }
}

/// Pixel rectangle inside the analysed image.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Roi {
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
}

impl Roi {
    /// Lower-centre box: 36 % × 26 % of the image, top edge at 56 % height.
    pub fn mouth_box(width: u32, height: u32) -> Roi {
        let w = (width  as f64 * 0.36).floor() as u32;
        let h = (height as f64 * 0.26).floor() as u32;
        Roi {
            x: (width - w) / 2,
            y: (height as f64 * 0.56).floor() as u32,
            w,
            h,
        }
    }
}

/// Dark / bright fractions, each the maximum over all blocks.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Activation {
    pub dark:   f64,
    pub bright: f64,
}

impl Activation {
    pub fn for_mode(&self, mode: DetectionMode) -> f64 {
        match mode {
            DetectionMode::MouthOpen => self.dark,
            DetectionMode::Smile     => self.bright,
        }
    }
}

#[derive(Clone, Debug)]
pub struct HeuristicExtractor {
    pub layout:           RoiLayout,
    pub dark_threshold:   f64,
    pub bright_threshold: f64,
}

impl Default for HeuristicExtractor {
    fn default() -> Self {
        HeuristicExtractor {
            layout:           RoiLayout::Grid3x3,
            dark_threshold:   DARK_LUMA,
            bright_threshold: BRIGHT_LUMA,
        }
    }
}

impl HeuristicExtractor {
    pub fn new(layout: RoiLayout) -> Self {
        HeuristicExtractor { layout, ..Default::default() }
    }

    /// Analysis dimensions for a given quality scale (never below 1×1).
    pub fn analysis_size(scale: f64) -> (u32, u32) {
        let w = (ANALYSIS_W as f64 * scale).round().max(1.0) as u32;
        let h = (ANALYSIS_H as f64 * scale).round().max(1.0) as u32;
        (w, h)
    }

    /// Measure one frame.  `None` for zero-area frames.
    pub fn measure(&self, frame: &RgbaImage, params: &QualityParams) -> Option<Activation> {
        if frame.width() == 0 || frame.height() == 0 {
            return None;
        }

        let (aw, ah) = Self::analysis_size(params.scale);
        let small: Cow<RgbaImage> = if frame.dimensions() == (aw, ah) {
            Cow::Borrowed(frame)
        } else {
            Cow::Owned(imageops::resize(frame, aw, ah, FilterType::Triangle))
        };

        let roi    = Roi::mouth_box(aw, ah);
        let n      = self.layout.divisions();
        let stride = params.stride.max(1) as usize;
        let mut act = Activation::default();

        for by in 0..n {
            for bx in 0..n {
                let x0 = roi.x + roi.w * bx / n;
                let x1 = roi.x + roi.w * (bx + 1) / n;
                let y0 = roi.y + roi.h * by / n;
                let y1 = roi.y + roi.h * (by + 1) / n;

                let (mut dark, mut bright, mut total) = (0u32, 0u32, 0u32);
                for y in (y0..y1).step_by(stride) {
                    for x in (x0..x1).step_by(stride) {
                        let p = small.get_pixel(x, y).0;
                        let luma = luminance(p[0], p[1], p[2]);
                        if luma < self.dark_threshold   { dark += 1; }
                        if luma > self.bright_threshold { bright += 1; }
                        total += 1;
                    }
                }
                if total == 0 { continue; }

                act.dark   = act.dark.max(dark as f64 / total as f64);
                act.bright = act.bright.max(bright as f64 / total as f64);
            }
        }
        Some(act)
    }
}

// ════════════════════════════════════════════════════════════════════════════
// External detector
// ════════════════════════════════════════════════════════════════════════════

pub const SMILE_LEFT:  &str = "mouthSmileLeft";
pub const SMILE_RIGHT: &str = "mouthSmileRight";

/// Named blend-shape scores for one detected face.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FaceBlendshapes {
    pub categories: Vec<(String, f32)>,
}

impl FaceBlendshapes {
    pub fn score(&self, name: &str) -> Option<f32> {
        self.categories.iter().find(|(n, _)| n == name).map(|(_, s)| *s)
    }

    /// Mean of the left and right smile scores (missing scores count as 0).
    pub fn smile(&self) -> f64 {
        let l = self.score(SMILE_LEFT).unwrap_or(0.0) as f64;
        let r = self.score(SMILE_RIGHT).unwrap_or(0.0) as f64;
        (l + r) / 2.0
    }
}

/// A face-landmark detector; returns zero or more faces per frame.
pub trait FaceDetector {
    fn detect(&mut self, frame: &RgbaImage, timestamp_ms: f64)
        -> Result<Vec<FaceBlendshapes>, SignalError>;
}

pub struct DetectorExtractor {
    detector: Box<dyn FaceDetector>,
}

impl DetectorExtractor {
    pub fn new(detector: Box<dyn FaceDetector>) -> Self {
        DetectorExtractor { detector }
    }

    /// Smile score of the first face, or `None` when no face was found.
    pub fn measure(&mut self, frame: &RgbaImage, timestamp_ms: f64)
        -> Result<Option<f64>, SignalError>
    {
        let faces = self.detector.detect(frame, timestamp_ms)?;
        Ok(faces.first().map(FaceBlendshapes::smile))
    }
}
