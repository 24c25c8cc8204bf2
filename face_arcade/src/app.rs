//! Top-level application state machine.
//!
//! `AppState` owns the game engine, the trigger settings, and (while the
//! camera is on) the capture handle plus its `VisionSession`.  It turns
//! input commands and session events into engine actions and builds the
//! scene the renderer draws each frame.

use std::time::Instant;

use arcade_signal::{
    CalibrationOutcome, DetectionMode, FaceDetector, HeuristicExtractor, MetricEngine, RoiLayout,
    SessionEvent, TriggerSettings, VisionSession,
};
use arcade_sim::{Action, Bounds, Engine, Phase, Runner, Survivor, World};
use image::RgbaImage;
use log::{debug, info, warn};

use crate::camera::{
    spawn_camera, CameraError, CameraEvent, CameraHandle, FaceControls, FrameSource,
    SimFaceDetector, SyntheticCamera,
};
use crate::config::{ArcadeConfig, CameraKind, Variant};
use crate::error::AppError;
use crate::input::{translate, Command, FacePose, InputEvent};
use crate::render::{draw_scene, Canvas, Scene, VisionHud, WIN_H, WIN_W};
use crate::visualizer::Visualizer;

// ════════════════════════════════════════════════════════════════════════════
// Game: one engine per variant
// ════════════════════════════════════════════════════════════════════════════

pub enum Game {
    Runner(Engine<Runner>),
    Survivor(Engine<Survivor>),
}

impl Game {
    pub fn new(variant: Variant, bounds: Bounds, seed: Option<u64>) -> Self {
        match (variant, seed) {
            (Variant::Runner, Some(s))   => Game::Runner(Engine::with_seed(Runner::new(), bounds, s)),
            (Variant::Runner, None)      => Game::Runner(Engine::new(Runner::new(), bounds)),
            (Variant::Survivor, Some(s)) => Game::Survivor(Engine::with_seed(Survivor::new(), bounds, s)),
            (Variant::Survivor, None)    => Game::Survivor(Engine::new(Survivor::new(), bounds)),
        }
    }

    pub fn act(&mut self, action: Action) {
        match self {
            Game::Runner(e)   => e.act(action),
            Game::Survivor(e) => e.act(action),
        }
    }

    pub fn tick(&mut self, dt: f64) {
        match self {
            Game::Runner(e)   => e.tick(dt),
            Game::Survivor(e) => e.tick(dt),
        }
    }

    pub fn world(&self) -> &World {
        match self {
            Game::Runner(e)   => e.world(),
            Game::Survivor(e) => e.world(),
        }
    }

    pub fn world_mut(&mut self) -> &mut World {
        match self {
            Game::Runner(e)   => e.world_mut(),
            Game::Survivor(e) => e.world_mut(),
        }
    }

    pub fn phase(&self) -> Phase {
        self.world().state.phase
    }
}

// ════════════════════════════════════════════════════════════════════════════
// AppState
// ════════════════════════════════════════════════════════════════════════════

pub struct AppState {
    // ── game ──────────────────────────────────────────────────────────────
    variant:  Variant,
    game:     Game,

    // ── vision ────────────────────────────────────────────────────────────
    settings: TriggerSettings,
    roi:      RoiLayout,
    camera_kind:  CameraKind,
    camera_index: i32,
    controls: FaceControls,
    camera:   Option<CameraHandle>,
    session:  Option<VisionSession>,
    preview:  Option<RgbaImage>,
    fires:    u64,
    /// The last processed frame reported no face.
    no_face:  bool,

    // ── status message ────────────────────────────────────────────────────
    pub status: String,
}

impl AppState {
    pub fn new(cfg: &ArcadeConfig) -> Self {
        let settings = cfg.settings();
        AppState {
            variant:      cfg.variant,
            game:         Game::new(cfg.variant, Bounds::new(WIN_W as f64, WIN_H as f64), cfg.seed),
            settings,
            roi:          cfg.roi.into(),
            camera_kind:  cfg.camera,
            camera_index: cfg.camera_index,
            controls:     FaceControls::default(),
            camera:       None,
            session:      None,
            preview:      None,
            fires:        0,
            no_face:      false,
            status:       settings.mode.hint().to_string(),
        }
    }

    // ── accessors ─────────────────────────────────────────────────────────

    pub fn game(&self)      -> &Game            { &self.game }
    pub fn game_mut(&mut self) -> &mut Game     { &mut self.game }
    pub fn settings(&self)  -> &TriggerSettings { &self.settings }
    pub fn controls(&self)  -> &FaceControls    { &self.controls }
    pub fn fires(&self)     -> u64              { self.fires }
    pub fn camera_on(&self) -> bool             { self.session.is_some() }
    pub fn vision(&self)    -> Option<&VisionSession> { self.session.as_ref() }

    // ── input ─────────────────────────────────────────────────────────────

    /// Returns false when the user asked to quit.
    pub fn handle_input(&mut self, event: InputEvent, now_ms: f64) -> bool {
        let game_over = self.game.phase() == Phase::GameOver;
        match translate(event, self.variant, game_over) {
            Some(cmd) => self.handle_command(cmd, now_ms),
            None => true,
        }
    }

    pub fn handle_command(&mut self, cmd: Command, now_ms: f64) -> bool {
        match cmd {
            Command::Game(action) => self.game.act(action),

            Command::Threshold(d) => {
                self.settings.nudge_threshold(d);
                self.status = format!("threshold {:.2}", self.settings.threshold);
            }
            Command::Sustain(d) => {
                self.settings.nudge_sustain(d);
                self.status = format!("sustain {:.0} ms", self.settings.sustain_ms);
            }
            Command::Cooldown(d) => {
                self.settings.nudge_cooldown(d);
                self.status = format!("cooldown {:.0} ms", self.settings.cooldown_ms);
            }

            Command::ToggleMode => {
                self.settings.set_mode(self.settings.mode.toggled());
                self.status = self.settings.mode.hint().to_string();
                info!(
                    "mode {} (threshold {:.2})",
                    self.settings.mode.label(), self.settings.threshold
                );
            }
            Command::ToggleEngine => {
                self.settings.engine = self.settings.engine.toggled();
                let fallback = self.settings.engine == MetricEngine::Detector
                    && self.session.as_ref().is_some_and(|s| !s.has_detector());
                self.status = if fallback {
                    "engine detector: no detector installed, using heuristic".to_string()
                } else {
                    format!("engine {}", self.settings.engine.label())
                };
            }

            Command::Calibrate => match self.session.as_mut() {
                Some(s) => {
                    s.begin_calibration(now_ms, self.settings.mode);
                    self.status = "calibrating: hold a neutral face".to_string();
                }
                None => self.status = "start the camera (V) before calibrating".to_string(),
            },

            Command::ToggleCamera => {
                if self.camera_on() { self.stop_camera(); } else { self.start_camera(); }
            }
            Command::ToggleFace => {
                let visible = self.controls.toggle_visible();
                self.status = format!("synthetic face {}", if visible { "shown" } else { "hidden" });
            }

            Command::Quit => return false,
        }
        true
    }

    pub fn apply_pose(&self, pose: FacePose) {
        self.controls.set_mouth_open(pose.mouth_open);
        self.controls.set_smiling(pose.smiling);
    }

    // ── camera lifecycle ──────────────────────────────────────────────────

    pub fn start_camera(&mut self) {
        match self.camera_kind {
            CameraKind::Synthetic => {
                let detector = SimFaceDetector::new(self.controls.clone());
                let source = SyntheticCamera::new(self.controls.clone());
                self.start_camera_with(source, Some(Box::new(detector)));
            }
            CameraKind::Webcam => self.start_webcam(),
        }
    }

    #[cfg(feature = "webcam")]
    fn start_webcam(&mut self) {
        let source = crate::camera::WebcamSource::new(self.camera_index);
        self.start_camera_with(source, None);
    }

    #[cfg(not(feature = "webcam"))]
    fn start_webcam(&mut self) {
        let e = CameraError::Unsupported(WEBCAM_MISSING);
        warn!("camera {}: {}", self.camera_index, e);
        self.status = format!("camera error: {}", e);
    }

    /// Fresh session on a fresh capture thread; nothing carries over from a
    /// previous camera run.
    pub fn start_camera_with<S: FrameSource>(
        &mut self,
        source:   S,
        detector: Option<Box<dyn FaceDetector>>,
    ) {
        self.stop_camera();
        self.session = Some(self.new_session(detector));
        self.camera = Some(spawn_camera(source));
        self.status = "camera starting…".to_string();
    }

    pub fn stop_camera(&mut self) {
        if let Some(mut s) = self.session.take() {
            s.stop();
        }
        if let Some(h) = self.camera.take() {
            h.stop();
            self.status = "camera off".to_string();
        }
        self.preview = None;
        self.no_face = false;
    }

    fn new_session(&self, detector: Option<Box<dyn FaceDetector>>) -> VisionSession {
        VisionSession::new(detector).with_extractor(HeuristicExtractor::new(self.roi))
    }

    /// Session without a capture thread; frames arrive through
    /// [`feed_frame`](Self::feed_frame).
    pub fn attach_session(&mut self) {
        self.stop_camera();
        let detector = SimFaceDetector::new(self.controls.clone());
        self.session = Some(self.new_session(Some(Box::new(detector))));
    }

    // ── per-frame vision work ─────────────────────────────────────────────

    /// Drain the capture thread and process only the newest frame.
    pub fn pump_camera(&mut self, now_ms: f64) {
        let Some(handle) = self.camera.as_ref() else { return; };

        let mut newest = None;
        let mut failure = None;
        for ev in handle.drain() {
            match ev {
                CameraEvent::Started { name } => self.status = format!("camera on ({})", name),
                CameraEvent::Frame(f)         => newest = Some(f),
                CameraEvent::Failed(e)        => failure = Some(e),
            }
        }

        if let Some(e) = failure {
            warn!("camera stopped: {}", e);
            self.stop_camera();
            self.status = format!("camera error: {}", e);
            return;
        }
        if let Some(frame) = newest {
            self.feed_frame(frame, now_ms);
        }
        self.poll_calibration(now_ms);
    }

    pub fn feed_frame(&mut self, frame: RgbaImage, now_ms: f64) {
        let Some(session) = self.session.as_mut() else { return; };
        let events = session.process_frame(&frame, now_ms, &self.settings);
        self.preview = Some(frame);

        let sampled = events.iter().any(|e| matches!(e, SessionEvent::Sampled(_)));
        let missing = events.contains(&SessionEvent::NoFace);
        if self.no_face && sampled && !missing {
            self.no_face = false;
            self.status = self.settings.mode.hint().to_string();
        }
        for ev in events {
            self.handle_session_event(ev);
        }
    }

    /// Close a calibration window that elapsed without frames.
    pub fn poll_calibration(&mut self, now_ms: f64) {
        let outcome = self.session.as_mut().and_then(|s| s.poll_calibration(now_ms));
        if let Some(o) = outcome {
            self.apply_calibration(o);
        }
    }

    pub fn handle_session_event(&mut self, ev: SessionEvent) {
        match ev {
            SessionEvent::Sampled(_) => {}
            SessionEvent::Fire => {
                self.fires += 1;
                debug!("camera trigger → jump");
                self.game.act(Action::Jump);
            }
            SessionEvent::NoFace => {
                self.no_face = true;
                self.status = "no face".to_string();
            }
            SessionEvent::DetectorUnavailable => {
                self.status = "detector unavailable, using heuristic".to_string();
            }
            SessionEvent::DetectorFailed(e) => self.status = format!("detector error: {}", e),
            SessionEvent::CalibrationDone(o) => self.apply_calibration(o),
        }
    }

    fn apply_calibration(&mut self, o: CalibrationOutcome) {
        self.settings.threshold = o.threshold;
        self.status = format!(
            "calibrated: baseline {:.2}, threshold {:.2}",
            o.baseline, o.threshold
        );
    }

    // ── per-frame simulation ──────────────────────────────────────────────

    pub fn tick(&mut self, dt: f64) {
        self.game.tick(dt);
    }

    pub fn scene(&self, now_ms: f64) -> Scene<'_> {
        let vision = self.session.as_ref().map(|s| VisionHud {
            preview:     self.preview.as_ref(),
            ratio:       s.ratio(),
            armed:       s.trigger_state().armed,
            quality:     s.quality(),
            calibration: s.calibration_progress(now_ms),
        });
        Scene {
            variant:  self.variant,
            world:    self.game.world(),
            settings: self.settings,
            status:   &self.status,
            vision,
        }
    }
}

const WEBCAM_MISSING: &str = "webcam support not compiled in (rebuild with --features webcam)";

// ════════════════════════════════════════════════════════════════════════════
// run(): the windowed loop
// ════════════════════════════════════════════════════════════════════════════

/// Run the full application.
///
/// Polls window input, drains the camera, advances the simulation by the
/// measured frame time and presents the rendered scene, at ~60 fps.
pub fn run(cfg: ArcadeConfig) -> Result<(), AppError> {
    cfg.validate()?;
    if !cfg!(feature = "webcam") && cfg.camera == CameraKind::Webcam {
        return Err(CameraError::Unsupported(WEBCAM_MISSING).into());
    }

    let mut vis = Visualizer::new(&format!("Face Arcade | {}", cfg.variant.label()))?;
    let mut app = AppState::new(&cfg);
    if cfg.autostart {
        app.start_camera();
    }
    info!("{} started", cfg.variant.label());

    let mut canvas = Canvas::new(WIN_W, WIN_H);
    let epoch = Instant::now();
    let mut last = epoch;

    while vis.is_open() {
        let now = Instant::now();
        let dt = now.duration_since(last).as_secs_f64();
        let now_ms = now.duration_since(epoch).as_secs_f64() * 1000.0;
        last = now;

        // 1. Input
        app.apply_pose(vis.face_pose());
        let mut quit = false;
        for ev in vis.poll_input() {
            if !app.handle_input(ev, now_ms) { quit = true; }
        }
        if quit { break; }

        // 2. Vision
        app.pump_camera(now_ms);

        // 3. Simulation
        app.tick(dt);

        // 4. Render
        draw_scene(&mut canvas, &app.scene(now_ms));
        vis.present(&canvas)?;
    }

    app.stop_camera();
    Ok(())
}

// ════════════════════════════════════════════════════════════════════════════
// run_headless(): no window, simulated clock
// ════════════════════════════════════════════════════════════════════════════

const FRAME_MS: f64 = 1000.0 / 60.0;
/// Synthetic face toggles its expression every this many frames.
const POSE_PERIOD: u64 = 45;

#[derive(Clone, Debug, PartialEq)]
pub struct HeadlessReport {
    pub frames:    u64,
    pub fires:     u64,
    pub runs:      u64,
    pub score:     u32,
    pub sim_time:  f64,
}

/// Drive the engine and the vision pipeline for `frames` frames on a
/// simulated 60 Hz clock, with the synthetic camera at 30 Hz and a scripted
/// face.  Finished runs restart immediately.
pub fn run_headless(cfg: ArcadeConfig, frames: u64) -> Result<HeadlessReport, AppError> {
    cfg.validate()?;

    let mut app = AppState::new(&cfg);
    app.attach_session();
    let camera = SyntheticCamera::new(app.controls().clone());
    let mut canvas = Canvas::new(WIN_W, WIN_H);
    let mut runs = 1;
    let mut best = 0;

    for i in 0..frames {
        let now_ms = i as f64 * FRAME_MS;
        let active = (i / POSE_PERIOD) % 2 == 1;
        let pose = match app.settings().mode {
            DetectionMode::MouthOpen => FacePose { mouth_open: active, smiling: false },
            DetectionMode::Smile     => FacePose { mouth_open: false, smiling: active },
        };
        app.apply_pose(pose);

        if i % 2 == 0 {
            app.feed_frame(camera.render(), now_ms);
        }
        app.poll_calibration(now_ms);
        app.tick(FRAME_MS / 1000.0);

        if app.game().phase() == Phase::GameOver {
            best = best.max(app.game().world().state.score);
            app.game_mut().act(Action::Restart);
            runs += 1;
        }
        draw_scene(&mut canvas, &app.scene(now_ms));
    }

    let world = app.game().world();
    let report = HeadlessReport {
        frames,
        fires:    app.fires(),
        runs,
        score:    best.max(world.state.score),
        sim_time: frames as f64 * FRAME_MS / 1000.0,
    };
    info!(
        "headless: {} frames, {} triggers, {} runs, best score {}",
        report.frames, report.fires, report.runs, report.score
    );
    Ok(report)
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
