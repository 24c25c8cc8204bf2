//! Startup configuration.
//!
//! Values come from three layers, lowest first: built-in defaults, an
//! optional TOML file, then command-line flags (applied in `main`).  The
//! result is validated once, before any window or camera is opened.
//!
//! ```toml
//! variant     = "survivor"
//! mode        = "smile"
//! engine      = "detector"
//! roi         = "grid"
//! threshold   = 0.55
//! sustain_ms  = 150
//! cooldown_ms = 700
//! camera      = "synthetic"
//! seed        = 42
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use arcade_signal::{DetectionMode, MetricEngine, RoiLayout, SignalError, TriggerSettings};
use clap::ValueEnum;
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config {path}: {source}")]
    Io {
        path:   PathBuf,
        source: std::io::Error,
    },
    #[error("invalid config syntax: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid setting: {0}")]
    Invalid(#[from] SignalError),
    #[error("camera_index must be non-negative (got {0})")]
    CameraIndex(i32),
}

// ════════════════════════════════════════════════════════════════════════════
// Choice enums (shared by the TOML file and the CLI)
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum Variant {
    #[default]
    Runner,
    Survivor,
}

impl Variant {
    pub fn label(self) -> &'static str {
        match self {
            Variant::Runner   => "runner",
            Variant::Survivor => "survivor",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum ModeChoice {
    #[default]
    MouthOpen,
    Smile,
}

impl From<ModeChoice> for DetectionMode {
    fn from(m: ModeChoice) -> Self {
        match m {
            ModeChoice::MouthOpen => DetectionMode::MouthOpen,
            ModeChoice::Smile     => DetectionMode::Smile,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum EngineChoice {
    #[default]
    Heuristic,
    Detector,
}

impl From<EngineChoice> for MetricEngine {
    fn from(e: EngineChoice) -> Self {
        match e {
            EngineChoice::Heuristic => MetricEngine::Heuristic,
            EngineChoice::Detector  => MetricEngine::Detector,
        }
    }
}

/// How the mouth region is partitioned by the heuristic extractor.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum RoiChoice {
    /// 3×3 blocks, maximum over blocks.
    #[default]
    Grid,
    /// The whole lower-centre box as one block.
    Box,
}

impl From<RoiChoice> for RoiLayout {
    fn from(r: RoiChoice) -> Self {
        match r {
            RoiChoice::Grid => RoiLayout::Grid3x3,
            RoiChoice::Box  => RoiLayout::SingleBox,
        }
    }
}

/// Where frames come from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum CameraKind {
    /// Rendered face driven from the keyboard.
    #[default]
    Synthetic,
    /// OpenCV capture device (needs the `webcam` feature).
    Webcam,
}

// ════════════════════════════════════════════════════════════════════════════
// ArcadeConfig
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ArcadeConfig {
    pub variant:      Variant,
    pub mode:         ModeChoice,
    pub engine:       EngineChoice,
    pub roi:          RoiChoice,
    pub threshold:    f64,
    pub sustain_ms:   f64,
    pub cooldown_ms:  f64,
    pub camera:       CameraKind,
    pub camera_index: i32,
    /// Start the camera as soon as the window opens.
    pub autostart:    bool,
    /// Fixed simulation seed; random when absent.
    pub seed:         Option<u64>,
}

impl Default for ArcadeConfig {
    fn default() -> Self {
        let s = TriggerSettings::default();
        ArcadeConfig {
            variant:      Variant::Runner,
            mode:         ModeChoice::MouthOpen,
            engine:       EngineChoice::Heuristic,
            roi:          RoiChoice::Grid,
            threshold:    s.threshold,
            sustain_ms:   s.sustain_ms,
            cooldown_ms:  s.cooldown_ms,
            camera:       CameraKind::Synthetic,
            camera_index: 0,
            autostart:    true,
            seed:         None,
        }
    }
}

impl ArcadeConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Trigger tunables as the vision session consumes them.
    pub fn settings(&self) -> TriggerSettings {
        TriggerSettings {
            threshold:   self.threshold,
            sustain_ms:  self.sustain_ms,
            cooldown_ms: self.cooldown_ms,
            mode:        self.mode.into(),
            engine:      self.engine.into(),
        }
    }

    /// Switch mode the way the runtime toggle does, pulling the threshold to
    /// the new mode's default when it no longer makes sense.
    pub fn set_mode(&mut self, mode: ModeChoice) {
        self.mode = mode;
        self.threshold = DetectionMode::from(mode).adjust_threshold(self.threshold);
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.settings().validate()?;
        if self.camera_index < 0 {
            return Err(ConfigError::CameraIndex(self.camera_index));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_is_all_defaults() {
        let cfg = ArcadeConfig::from_toml_str("").unwrap();
        assert_eq!(cfg, ArcadeConfig::default());
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn parses_kebab_case_choices() {
        let cfg = ArcadeConfig::from_toml_str(
            r#"
            variant   = "survivor"
            mode      = "mouth-open"
            engine    = "detector"
            roi       = "box"
            threshold = 0.3
            seed      = 9
            "#,
        )
        .unwrap();
        assert_eq!(cfg.variant, Variant::Survivor);
        assert_eq!(cfg.engine, EngineChoice::Detector);
        assert_eq!(RoiLayout::from(cfg.roi), RoiLayout::SingleBox);
        assert_eq!(cfg.seed, Some(9));
        let s = cfg.settings();
        assert_eq!(s.threshold, 0.3);
        assert_eq!(s.engine, MetricEngine::Detector);
        assert_eq!(s.sustain_ms, 120.0);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = ArcadeConfig::from_toml_str("treshold = 0.4").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn out_of_range_threshold_fails_validation() {
        let cfg = ArcadeConfig { threshold: 0.99, ..ArcadeConfig::default() };
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::Invalid(SignalError::ThresholdOutOfRange(_)))
        ));

        let cfg = ArcadeConfig { cooldown_ms: -1.0, ..ArcadeConfig::default() };
        assert!(cfg.validate().is_err());

        let cfg = ArcadeConfig { camera_index: -2, ..ArcadeConfig::default() };
        assert!(matches!(cfg.validate(), Err(ConfigError::CameraIndex(-2))));
    }

    #[test]
    fn mode_switch_moves_threshold() {
        let mut cfg = ArcadeConfig::default();
        cfg.set_mode(ModeChoice::Smile);
        assert_eq!(cfg.threshold, 0.55);
        cfg.set_mode(ModeChoice::MouthOpen);
        assert_eq!(cfg.threshold, 0.55);

        cfg.threshold = 0.7;
        cfg.set_mode(ModeChoice::MouthOpen);
        assert_eq!(cfg.threshold, 0.22);
    }

    #[test]
    fn missing_file_reports_path() {
        let err = ArcadeConfig::load(Path::new("/nonexistent/arcade.toml")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/arcade.toml"));
    }
}
