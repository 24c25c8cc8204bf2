//! Window input → commands.
//!
//! The visualizer reports raw [`InputEvent`]s; [`translate`] turns each one
//! into at most one [`Command`] given the current variant and phase.  Manual
//! jumps and camera triggers end up at the same `Engine::act` entry point.

use arcade_sim::{Action, Vec2};

use crate::config::Variant;

/// Keys the app listens to, decoupled from the windowing crate.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SimKey {
    Space,          // jump / restart (runner)
    Up,             // jump
    Enter,          // restart (runner)
    Pause,          // P
    ThresholdUp,    // =
    ThresholdDown,  // -
    SustainUp,      // ]
    SustainDown,    // [
    CooldownUp,     // .
    CooldownDown,   // ,
    Mode,           // M
    Engine,         // E
    Calibrate,      // C
    Camera,         // V
    Face,           // F
    Quit,           // Q / Escape
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum InputEvent {
    Key(SimKey),
    /// Primary button pressed at window coordinates.
    PointerDown { x: f64, y: f64 },
}

/// Keys held down this frame that pose the synthetic face.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FacePose {
    pub mouth_open: bool,
    pub smiling:    bool,
}

pub const THRESHOLD_STEP: f64 = 0.01;
pub const SUSTAIN_STEP:   f64 = 20.0;   // ms
pub const COOLDOWN_STEP:  f64 = 50.0;   // ms

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Command {
    Game(Action),
    Threshold(f64),
    Sustain(f64),
    Cooldown(f64),
    ToggleMode,
    ToggleEngine,
    Calibrate,
    ToggleCamera,
    ToggleFace,
    Quit,
}

pub fn translate(event: InputEvent, variant: Variant, game_over: bool) -> Option<Command> {
    use Command::*;

    let cmd = match event {
        InputEvent::PointerDown { x, y } => match (variant, game_over) {
            (_, true)                  => Game(Action::Restart),
            (Variant::Runner, false)   => Game(Action::Jump),
            (Variant::Survivor, false) => Game(Action::MoveTo(Vec2::new(x, y))),
        },
        InputEvent::Key(key) => match key {
            SimKey::Space | SimKey::Enter
                if game_over && variant == Variant::Runner => Game(Action::Restart),
            SimKey::Space | SimKey::Up => Game(Action::Jump),
            SimKey::Enter              => return None,
            SimKey::Pause              => Game(Action::TogglePause),
            SimKey::ThresholdUp        => Threshold(THRESHOLD_STEP),
            SimKey::ThresholdDown      => Threshold(-THRESHOLD_STEP),
            SimKey::SustainUp          => Sustain(SUSTAIN_STEP),
            SimKey::SustainDown        => Sustain(-SUSTAIN_STEP),
            SimKey::CooldownUp         => Cooldown(COOLDOWN_STEP),
            SimKey::CooldownDown       => Cooldown(-COOLDOWN_STEP),
            SimKey::Mode               => ToggleMode,
            SimKey::Engine             => ToggleEngine,
            SimKey::Calibrate          => Calibrate,
            SimKey::Camera             => ToggleCamera,
            SimKey::Face               => ToggleFace,
            SimKey::Quit               => Quit,
        },
    };
    Some(cmd)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(k: SimKey, v: Variant, over: bool) -> Option<Command> {
        translate(InputEvent::Key(k), v, over)
    }

    #[test]
    fn runner_space_jumps_then_restarts() {
        assert_eq!(key(SimKey::Space, Variant::Runner, false), Some(Command::Game(Action::Jump)));
        assert_eq!(key(SimKey::Space, Variant::Runner, true), Some(Command::Game(Action::Restart)));
        assert_eq!(key(SimKey::Enter, Variant::Runner, true), Some(Command::Game(Action::Restart)));
        assert_eq!(key(SimKey::Enter, Variant::Runner, false), None);
    }

    #[test]
    fn survivor_restarts_on_click_only() {
        assert_eq!(key(SimKey::Enter, Variant::Survivor, true), None);
        let click = InputEvent::PointerDown { x: 10.0, y: 20.0 };
        assert_eq!(
            translate(click, Variant::Survivor, false),
            Some(Command::Game(Action::MoveTo(Vec2::new(10.0, 20.0))))
        );
        assert_eq!(translate(click, Variant::Survivor, true), Some(Command::Game(Action::Restart)));
    }

    #[test]
    fn runner_click_jumps() {
        let click = InputEvent::PointerDown { x: 0.0, y: 0.0 };
        assert_eq!(translate(click, Variant::Runner, false), Some(Command::Game(Action::Jump)));
        assert_eq!(translate(click, Variant::Runner, true), Some(Command::Game(Action::Restart)));
    }

    #[test]
    fn tunable_steps() {
        assert_eq!(key(SimKey::ThresholdDown, Variant::Runner, false), Some(Command::Threshold(-0.01)));
        assert_eq!(key(SimKey::SustainUp, Variant::Runner, false), Some(Command::Sustain(20.0)));
        assert_eq!(key(SimKey::CooldownDown, Variant::Survivor, true), Some(Command::Cooldown(-50.0)));
    }
}
