//! # arcade_sim
//!
//! Deterministic simulation for the two arcade variants.  Nothing here knows
//! about windows, cameras or wall-clock time: callers feed [`Action`]s and
//! frame deltas in, and read the [`World`] back out to draw it.
//!
//! ```text
//! Action ──► Engine::act ──► Ruleset::act
//! dt     ──► Engine::tick ─► difficulty → movement → integrate/cull
//!                             → spawn → hazard → coins → bullets → timers
//! ```
//!
//! [`Runner`] is an endless side-scroller (gravity, jump, obstacles, coin
//! arcs); [`Survivor`] is a top-down arena (seek-to-pointer, chasers,
//! auto-fire).  Both run on the same [`Engine`].

pub mod engine;
pub mod entity;
pub mod geometry;
pub mod runner;
pub mod survivor;
pub mod world;

pub use engine::{Action, Engine, Ruleset, MAX_DT};
pub use entity::{Body, Bullet, Coin, Enemy, Obstacle};
pub use geometry::{circles_touch, coarse_box_hit, Bounds, Vec2};
pub use runner::Runner;
pub use survivor::Survivor;
pub use world::{GameState, Phase, Player, World, COIN_SCORE, KILL_SCORE};
