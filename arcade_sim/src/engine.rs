//! The generic tick loop.
//!
//! [`Engine`] runs the steps every variant shares (clock, entity motion,
//! culling, pickups, bullet hits, the phase machine) and defers the rest to
//! its [`Ruleset`].

use log::info;
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::geometry::{Bounds, Vec2};
use crate::world::{Phase, World};

/// Largest step taken in one tick.  Longer gaps (a stalled frame, a dragged
/// window) are truncated rather than integrated.
pub const MAX_DT: f64 = 1.0 / 20.0;

/// Player intents from any input source.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Action {
    Jump,
    MoveTo(Vec2),
    TogglePause,
    Restart,
}

/// What a variant contributes to the shared loop.
pub trait Ruleset {
    fn name(&self) -> &'static str;

    /// Whether `Action::TogglePause` is honoured.
    fn can_pause(&self) -> bool { false }

    /// Place the player and re-arm spawn timers.  The world has already been
    /// cleared.
    fn reset(&mut self, world: &mut World);

    /// Update the difficulty scalar from the elapsed time.
    fn advance_difficulty(&mut self, world: &mut World);

    /// Move the player and set entity velocities for this tick.
    fn update_movement(&mut self, world: &mut World, dt: f64);

    fn spawn(&mut self, world: &mut World, rng: &mut StdRng, dt: f64);

    /// Player vs. the variant's hazard.  Returns true when the run ends.
    fn resolve_hazard_collision(&mut self, world: &mut World) -> bool;

    /// Timers and behaviour that run after collisions.
    fn after_collisions(&mut self, _world: &mut World, _dt: f64) {}

    /// Handle a gameplay action while running.
    fn act(&mut self, world: &mut World, action: Action);
}

pub struct Engine<R: Ruleset> {
    world: World,
    rules: R,
    rng:   StdRng,
}

impl<R: Ruleset> Engine<R> {
    pub fn new(rules: R, bounds: Bounds) -> Self {
        Self::with_rng(rules, bounds, StdRng::from_entropy())
    }

    /// Deterministic engine for replays and tests.
    pub fn with_seed(rules: R, bounds: Bounds, seed: u64) -> Self {
        Self::with_rng(rules, bounds, StdRng::seed_from_u64(seed))
    }

    fn with_rng(rules: R, bounds: Bounds, rng: StdRng) -> Self {
        let mut engine = Engine { world: World::new(bounds), rules, rng };
        engine.reset();
        engine
    }

    pub fn world(&self) -> &World { &self.world }
    pub fn world_mut(&mut self) -> &mut World { &mut self.world }
    pub fn rules(&self) -> &R { &self.rules }
    pub fn rules_mut(&mut self) -> &mut R { &mut self.rules }
    pub fn phase(&self) -> Phase { self.world.state.phase }

    /// Back to initial state from anywhere, including game over.
    pub fn reset(&mut self) {
        self.world.clear();
        self.rules.reset(&mut self.world);
    }

    /// Entry point for keyboard, pointer and camera triggers alike.
    pub fn act(&mut self, action: Action) {
        match action {
            Action::Restart => {
                info!("{} restarted (score was {})", self.rules.name(), self.world.state.score);
                self.reset();
            }
            Action::TogglePause => {
                if !self.rules.can_pause() { return; }
                self.world.state.phase = match self.world.state.phase {
                    Phase::Running  => Phase::Paused,
                    Phase::Paused   => Phase::Running,
                    Phase::GameOver => Phase::GameOver,
                };
            }
            Action::Jump | Action::MoveTo(_) => {
                if self.world.state.is_running() {
                    self.rules.act(&mut self.world, action);
                }
            }
        }
    }

    /// Advance by `dt` seconds (clamped to [`MAX_DT`]).
    pub fn tick(&mut self, dt: f64) {
        if !self.world.state.is_running() { return; }
        let dt = dt.clamp(0.0, MAX_DT);

        self.world.state.time += dt;
        self.rules.advance_difficulty(&mut self.world);
        self.rules.update_movement(&mut self.world, dt);
        self.world.integrate(dt);
        self.rules.spawn(&mut self.world, &mut self.rng, dt);

        if self.rules.resolve_hazard_collision(&mut self.world) {
            self.world.end_run();
            info!(
                "{} over at {:.1}s, score {}",
                self.rules.name(), self.world.state.time, self.world.state.score
            );
            return;
        }

        self.world.collect_coins();
        self.world.resolve_bullet_hits();
        self.rules.after_collisions(&mut self.world, dt);
    }
}
