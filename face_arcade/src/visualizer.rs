//! The `minifb` window: presents finished canvases and reports input.

use minifb::{Key, KeyRepeat, MouseButton, MouseMode, Window, WindowOptions};

use crate::error::AppError;
use crate::input::{FacePose, InputEvent, SimKey};
use crate::render::{Canvas, WIN_H, WIN_W};

/// Key → event table for one-shot presses.
const BINDINGS: &[(Key, SimKey)] = &[
    (Key::Space,        SimKey::Space),
    (Key::Up,           SimKey::Up),
    (Key::Enter,        SimKey::Enter),
    (Key::P,            SimKey::Pause),
    (Key::Equal,        SimKey::ThresholdUp),
    (Key::Minus,        SimKey::ThresholdDown),
    (Key::RightBracket, SimKey::SustainUp),
    (Key::LeftBracket,  SimKey::SustainDown),
    (Key::Period,       SimKey::CooldownUp),
    (Key::Comma,        SimKey::CooldownDown),
    (Key::M,            SimKey::Mode),
    (Key::E,            SimKey::Engine),
    (Key::C,            SimKey::Calibrate),
    (Key::V,            SimKey::Camera),
    (Key::F,            SimKey::Face),
    (Key::Q,            SimKey::Quit),
    (Key::Escape,       SimKey::Quit),
];

pub struct Visualizer {
    window:         Window,
    mouse_was_down: bool,
}

impl Visualizer {
    pub fn new(title: &str) -> Result<Self, AppError> {
        let mut window = Window::new(
            title,
            WIN_W, WIN_H,
            WindowOptions {
                resize: false,
                ..WindowOptions::default()
            },
        ).map_err(|e| AppError::Window(e.to_string()))?;

        window.limit_update_rate(Some(std::time::Duration::from_millis(16))); // ~60fps

        Ok(Visualizer { window, mouse_was_down: false })
    }

    pub fn is_open(&self) -> bool { self.window.is_open() }

    /// Presses and clicks since the last call.
    pub fn poll_input(&mut self) -> Vec<InputEvent> {
        let mut events: Vec<InputEvent> = BINDINGS
            .iter()
            .filter(|(k, _)| self.window.is_key_pressed(*k, KeyRepeat::No))
            .map(|&(_, sk)| InputEvent::Key(sk))
            .collect();

        // Edge-triggered: one event per press, not per frame held.
        let down = self.window.get_mouse_down(MouseButton::Left);
        if down && !self.mouse_was_down {
            if let Some((x, y)) = self.window.get_mouse_pos(MouseMode::Discard) {
                events.push(InputEvent::PointerDown { x: x as f64, y: y as f64 });
            }
        }
        self.mouse_was_down = down;
        events
    }

    /// Held keys that pose the synthetic face.
    pub fn face_pose(&self) -> FacePose {
        FacePose {
            mouth_open: self.window.is_key_down(Key::O),
            smiling:    self.window.is_key_down(Key::S),
        }
    }

    pub fn present(&mut self, canvas: &Canvas) -> Result<(), AppError> {
        self.window
            .update_with_buffer(canvas.pixels(), canvas.width(), canvas.height())
            .map_err(|e| AppError::Window(e.to_string()))
    }
}
