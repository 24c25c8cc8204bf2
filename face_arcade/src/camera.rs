//! Frame acquisition: a synthetic keyboard-driven face or a real webcam.
//!
//! The public interface is [`CameraEvent`] delivered over a bounded channel
//! from a capture thread.  The main loop doesn't need to know whether frames
//! came from a device or were rendered.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, SyncSender, TrySendError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use arcade_signal::metric::{SMILE_LEFT, SMILE_RIGHT};
use arcade_signal::{FaceBlendshapes, FaceDetector, SignalError};
use image::{Rgba, RgbaImage};
use log::{info, warn};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum CameraError {
    #[error("camera open failed: {0}")]
    Open(String),
    #[error("camera read failed: {0}")]
    Read(String),
    #[error("{0}")]
    Unsupported(&'static str),
}

// ════════════════════════════════════════════════════════════════════════════
// FrameSource trait: unified interface for devices and synthetic frames
// ════════════════════════════════════════════════════════════════════════════

/// Anything that can produce RGBA frames.  `open` runs on the capture thread
/// before the first `next_frame`.
pub trait FrameSource: Send + 'static {
    fn name(&self) -> &'static str;
    fn open(&mut self) -> Result<(), CameraError>;
    /// Blocks until a frame is ready.  `Ok(None)` means nothing this time.
    fn next_frame(&mut self) -> Result<Option<RgbaImage>, CameraError>;
}

#[derive(Debug)]
pub enum CameraEvent {
    Started { name: &'static str },
    Frame(RgbaImage),
    Failed(CameraError),
}

// ════════════════════════════════════════════════════════════════════════════
// Capture thread
// ════════════════════════════════════════════════════════════════════════════

/// Owner side of a running capture thread.  Dropping it stops the thread.
pub struct CameraHandle {
    rx:     Option<Receiver<CameraEvent>>,
    stop:   Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

/// Spawn a frame source on its own thread and return the receiving end.
///
/// The channel holds one frame; while the consumer is behind, newer frames
/// are dropped at the source instead of queueing.
pub fn spawn_camera<S: FrameSource>(source: S) -> CameraHandle {
    let (tx, rx) = mpsc::sync_channel(1);
    let stop = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&stop);
    let thread = thread::spawn(move || capture_loop(source, tx, flag));
    CameraHandle { rx: Some(rx), stop, thread: Some(thread) }
}

fn capture_loop<S: FrameSource>(mut source: S, tx: SyncSender<CameraEvent>, stop: Arc<AtomicBool>) {
    if let Err(e) = source.open() {
        warn!("{}: {}", source.name(), e);
        let _ = tx.send(CameraEvent::Failed(e));
        return;
    }
    info!("camera started ({})", source.name());
    if tx.send(CameraEvent::Started { name: source.name() }).is_err() { return; }

    while !stop.load(Ordering::Relaxed) {
        match source.next_frame() {
            Ok(Some(frame)) => match tx.try_send(CameraEvent::Frame(frame)) {
                Ok(()) | Err(TrySendError::Full(_)) => {}
                Err(TrySendError::Disconnected(_)) => break,
            },
            Ok(None) => thread::sleep(Duration::from_millis(5)),
            Err(e) => {
                warn!("{}: {}", source.name(), e);
                let _ = tx.send(CameraEvent::Failed(e));
                break;
            }
        }
    }
    info!("camera released ({})", source.name());
}

impl CameraHandle {
    /// Everything the capture thread has delivered so far, without blocking.
    pub fn drain(&self) -> Vec<CameraEvent> {
        match &self.rx {
            Some(rx) => rx.try_iter().collect(),
            None => Vec::new(),
        }
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Option<CameraEvent> {
        let rx = self.rx.as_ref()?;
        match rx.recv_timeout(timeout) {
            Ok(ev) => Some(ev),
            Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => None,
        }
    }

    /// Signal the thread, release the channel, and wait for the device to
    /// be closed.
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        self.rx = None;
        if let Some(t) = self.thread.take() {
            let _ = t.join();
        }
    }
}

impl Drop for CameraHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}

// ════════════════════════════════════════════════════════════════════════════
// FaceControls: keyboard state shared with the synthetic camera/detector
// ════════════════════════════════════════════════════════════════════════════

#[derive(Debug)]
struct FaceFlags {
    visible:    AtomicBool,
    mouth_open: AtomicBool,
    smiling:    AtomicBool,
}

/// What the simulated face is doing right now.  Cheap to clone; all clones
/// see the same state.
#[derive(Clone, Debug)]
pub struct FaceControls {
    flags: Arc<FaceFlags>,
}

impl Default for FaceControls {
    fn default() -> Self {
        FaceControls {
            flags: Arc::new(FaceFlags {
                visible:    AtomicBool::new(true),
                mouth_open: AtomicBool::new(false),
                smiling:    AtomicBool::new(false),
            }),
        }
    }
}

impl FaceControls {
    pub fn is_visible(&self) -> bool   { self.flags.visible.load(Ordering::Relaxed) }
    pub fn is_mouth_open(&self) -> bool { self.flags.mouth_open.load(Ordering::Relaxed) }
    pub fn is_smiling(&self) -> bool   { self.flags.smiling.load(Ordering::Relaxed) }

    pub fn set_mouth_open(&self, v: bool) { self.flags.mouth_open.store(v, Ordering::Relaxed); }
    pub fn set_smiling(&self, v: bool)    { self.flags.smiling.store(v, Ordering::Relaxed); }

    /// Returns the new visibility.
    pub fn toggle_visible(&self) -> bool {
        !self.flags.visible.fetch_xor(true, Ordering::Relaxed)
    }
}

// ════════════════════════════════════════════════════════════════════════════
// SyntheticCamera: always available
// ════════════════════════════════════════════════════════════════════════════

const BACKDROP: Rgba<u8> = Rgba([88, 92, 104, 255]);
const SKIN:     Rgba<u8> = Rgba([210, 170, 140, 255]);
const LIPS:     Rgba<u8> = Rgba([150, 60, 60, 255]);
const MOUTH:    Rgba<u8> = Rgba([24, 8, 12, 255]);
const TEETH:    Rgba<u8> = Rgba([246, 244, 236, 255]);
const EYES:     Rgba<u8> = Rgba([40, 40, 48, 255]);

/// Renders a cartoon face whose mouth follows [`FaceControls`].  The mouth
/// sits inside the analyser's region of interest, so opening it darkens the
/// region and smiling brightens it.
pub struct SyntheticCamera {
    controls: FaceControls,
    width:    u32,
    height:   u32,
    interval: Duration,
}

impl SyntheticCamera {
    pub fn new(controls: FaceControls) -> Self {
        SyntheticCamera {
            controls,
            width:    320,
            height:   240,
            interval: Duration::from_millis(33),
        }
    }

    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    /// One frame for the current face state.
    pub fn render(&self) -> RgbaImage {
        let (w, h) = (self.width as f64, self.height as f64);
        let mut img = RgbaImage::from_pixel(self.width, self.height, BACKDROP);
        if !self.controls.is_visible() {
            return img;
        }

        fill_ellipse(&mut img, 0.5 * w, 0.55 * h, 0.28 * w, 0.42 * h, SKIN);
        fill_ellipse(&mut img, 0.40 * w, 0.40 * h, 0.03 * w, 0.03 * h, EYES);
        fill_ellipse(&mut img, 0.60 * w, 0.40 * h, 0.03 * w, 0.03 * h, EYES);

        if self.controls.is_mouth_open() {
            fill_ellipse(&mut img, 0.5 * w, 0.69 * h, 0.10 * w, 0.08 * h, MOUTH);
        } else if self.controls.is_smiling() {
            fill_rect(&mut img, 0.40 * w, 0.645 * h, 0.60 * w, 0.735 * h, TEETH);
        } else {
            fill_rect(&mut img, 0.42 * w, 0.68 * h, 0.58 * w, 0.70 * h, LIPS);
        }
        img
    }
}

impl FrameSource for SyntheticCamera {
    fn name(&self) -> &'static str { "synthetic" }

    fn open(&mut self) -> Result<(), CameraError> {
        if self.width == 0 || self.height == 0 {
            return Err(CameraError::Open("zero-sized synthetic frame".into()));
        }
        Ok(())
    }

    fn next_frame(&mut self) -> Result<Option<RgbaImage>, CameraError> {
        thread::sleep(self.interval);
        Ok(Some(self.render()))
    }
}

fn fill_ellipse(img: &mut RgbaImage, cx: f64, cy: f64, rx: f64, ry: f64, color: Rgba<u8>) {
    let (w, h) = img.dimensions();
    let y0 = (cy - ry).floor().max(0.0) as u32;
    let y1 = ((cy + ry).ceil() as u32).min(h);
    let x0 = (cx - rx).floor().max(0.0) as u32;
    let x1 = ((cx + rx).ceil() as u32).min(w);
    for y in y0..y1 {
        for x in x0..x1 {
            let dx = (x as f64 + 0.5 - cx) / rx;
            let dy = (y as f64 + 0.5 - cy) / ry;
            if dx * dx + dy * dy <= 1.0 {
                img.put_pixel(x, y, color);
            }
        }
    }
}

fn fill_rect(img: &mut RgbaImage, x0: f64, y0: f64, x1: f64, y1: f64, color: Rgba<u8>) {
    let (w, h) = img.dimensions();
    for y in (y0.max(0.0) as u32)..(y1 as u32).min(h) {
        for x in (x0.max(0.0) as u32)..(x1 as u32).min(w) {
            img.put_pixel(x, y, color);
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// SimFaceDetector
// ════════════════════════════════════════════════════════════════════════════

/// Blend-shape detector answering from [`FaceControls`] instead of pixels.
pub struct SimFaceDetector {
    controls: FaceControls,
}

impl SimFaceDetector {
    pub fn new(controls: FaceControls) -> Self {
        SimFaceDetector { controls }
    }
}

impl FaceDetector for SimFaceDetector {
    fn detect(&mut self, _frame: &RgbaImage, _timestamp_ms: f64)
        -> Result<Vec<FaceBlendshapes>, SignalError>
    {
        if !self.controls.is_visible() {
            return Ok(Vec::new());
        }
        let smile = if self.controls.is_smiling() { 0.92 } else { 0.04 };
        Ok(vec![FaceBlendshapes {
            categories: vec![
                (SMILE_LEFT.to_string(), smile),
                (SMILE_RIGHT.to_string(), smile - 0.02),
                ("jawOpen".to_string(), if self.controls.is_mouth_open() { 0.8 } else { 0.05 }),
            ],
        }])
    }
}

// ════════════════════════════════════════════════════════════════════════════
// WebcamSource: real device (feature = "webcam")
// ════════════════════════════════════════════════════════════════════════════

/// OpenCV capture device.
///
/// Requires the `webcam` feature flag and the OpenCV shared libraries.
#[cfg(feature = "webcam")]
pub struct WebcamSource {
    index: i32,
    cap:   Option<opencv::videoio::VideoCapture>,
}

#[cfg(feature = "webcam")]
impl WebcamSource {
    pub fn new(index: i32) -> Self {
        WebcamSource { index, cap: None }
    }
}

#[cfg(feature = "webcam")]
impl FrameSource for WebcamSource {
    fn name(&self) -> &'static str { "webcam" }

    fn open(&mut self) -> Result<(), CameraError> {
        use opencv::prelude::*;
        use opencv::videoio;

        let cap = videoio::VideoCapture::new(self.index, videoio::CAP_ANY)
            .map_err(|e| CameraError::Open(e.to_string()))?;
        let opened = cap.is_opened().map_err(|e| CameraError::Open(e.to_string()))?;
        if !opened {
            return Err(CameraError::Open(format!("device {} unavailable", self.index)));
        }
        self.cap = Some(cap);
        Ok(())
    }

    fn next_frame(&mut self) -> Result<Option<RgbaImage>, CameraError> {
        use opencv::core::Mat;
        use opencv::imgproc;
        use opencv::prelude::*;

        let cap = self.cap.as_mut().ok_or_else(|| CameraError::Read("device not open".into()))?;
        let mut frame = Mat::default();
        let got = cap.read(&mut frame).map_err(|e| CameraError::Read(e.to_string()))?;
        if !got || frame.empty() {
            return Ok(None);
        }

        let mut rgba = Mat::default();
        imgproc::cvt_color(&frame, &mut rgba, imgproc::COLOR_BGR2RGBA, 0)
            .map_err(|e| CameraError::Read(e.to_string()))?;
        let bytes = rgba.data_bytes().map_err(|e| CameraError::Read(e.to_string()))?;
        let (w, h) = (rgba.cols() as u32, rgba.rows() as u32);
        Ok(RgbaImage::from_raw(w, h, bytes.to_vec()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arcade_signal::{DetectionMode, HeuristicExtractor, QualityParams};

    struct BrokenSource;

    impl FrameSource for BrokenSource {
        fn name(&self) -> &'static str { "broken" }
        fn open(&mut self) -> Result<(), CameraError> {
            Err(CameraError::Open("permission denied".into()))
        }
        fn next_frame(&mut self) -> Result<Option<RgbaImage>, CameraError> {
            Ok(None)
        }
    }

    fn activation(cam: &SyntheticCamera, mode: DetectionMode) -> f64 {
        let frame = cam.render();
        HeuristicExtractor::default()
            .measure(&frame, &QualityParams::default())
            .map(|a| a.for_mode(mode))
            .unwrap_or(0.0)
    }

    #[test]
    fn open_mouth_darkens_the_region() {
        let controls = FaceControls::default();
        let cam = SyntheticCamera::new(controls.clone());
        let closed = activation(&cam, DetectionMode::MouthOpen);
        controls.set_mouth_open(true);
        let open = activation(&cam, DetectionMode::MouthOpen);
        assert!(closed < 0.1, "closed = {closed}");
        assert!(open > 0.6, "open = {open}");
    }

    #[test]
    fn smile_brightens_the_region() {
        let controls = FaceControls::default();
        let cam = SyntheticCamera::new(controls.clone());
        let neutral = activation(&cam, DetectionMode::Smile);
        controls.set_smiling(true);
        let smile = activation(&cam, DetectionMode::Smile);
        assert!(neutral < 0.1, "neutral = {neutral}");
        assert!(smile > 0.55, "smile = {smile}");
    }

    #[test]
    fn hidden_face_yields_no_detections() {
        let controls = FaceControls::default();
        let mut det = SimFaceDetector::new(controls.clone());
        let frame = RgbaImage::new(4, 4);
        assert_eq!(det.detect(&frame, 0.0).unwrap().len(), 1);
        assert!(!controls.toggle_visible());
        assert!(det.detect(&frame, 0.0).unwrap().is_empty());
    }

    #[test]
    fn detector_reports_smile_scores() {
        let controls = FaceControls::default();
        controls.set_smiling(true);
        let mut det = SimFaceDetector::new(controls);
        let faces = det.detect(&RgbaImage::new(4, 4), 0.0).unwrap();
        assert!(faces[0].smile() > 0.85);
    }

    #[test]
    fn open_failure_is_reported_once() {
        let handle = spawn_camera(BrokenSource);
        match handle.recv_timeout(Duration::from_secs(2)) {
            Some(CameraEvent::Failed(CameraError::Open(msg))) => assert!(msg.contains("permission")),
            other => panic!("unexpected {other:?}"),
        }
        assert!(handle.recv_timeout(Duration::from_millis(50)).is_none());
    }

    #[test]
    fn synthetic_camera_streams_until_stopped() {
        let cam = SyntheticCamera::new(FaceControls::default()).with_size(64, 48);
        let handle = spawn_camera(cam);
        assert!(matches!(
            handle.recv_timeout(Duration::from_secs(2)),
            Some(CameraEvent::Started { name: "synthetic" })
        ));
        match handle.recv_timeout(Duration::from_secs(2)) {
            Some(CameraEvent::Frame(f)) => assert_eq!(f.dimensions(), (64, 48)),
            other => panic!("unexpected {other:?}"),
        }
        handle.stop();
    }
}
