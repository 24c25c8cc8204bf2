//! Endless side-scrolling runner: jump over blocks, grab coin arcs.

use rand::rngs::StdRng;
use rand::Rng;

use crate::engine::{Action, Ruleset};
use crate::entity::{Coin, Obstacle};
use crate::geometry::{coarse_box_hit, Vec2};
use crate::world::{Player, World};

pub const GRAVITY:       f64 = 1500.0;   // px/s²
pub const JUMP_VELOCITY: f64 = 600.0;    // px/s, upward
pub const GROUND_INSET:  f64 = 40.0;     // ground line above the bottom edge
pub const PLAYER_X:      f64 = 120.0;
pub const PLAYER_R:      f64 = 16.0;

pub const BASE_SPEED:    f64 = 240.0;    // px/s
pub const SPEED_GAIN:    f64 = 12.0;     // px/s per second survived
pub const MAX_SPEED:     f64 = 520.0;

const COIN_R:       f64 = 8.0;
const COIN_SPACING: f64 = 24.0;

#[derive(Clone, Debug, Default)]
pub struct Runner {
    obstacle_timer: f64,
    coin_timer:     f64,
}

impl Runner {
    pub fn new() -> Self {
        Runner::default()
    }

    pub fn ground_y(world: &World) -> f64 {
        world.bounds.height - GROUND_INSET
    }

    fn spawn_obstacle(world: &mut World, rng: &mut StdRng) {
        let w = rng.gen_range(20.0..40.0);
        let h = rng.gen_range(20.0..50.0);
        world.obstacles.push(Obstacle {
            pos: Vec2::new(world.bounds.width + 40.0, Self::ground_y(world) - h),
            w,
            h,
            vel: Vec2::new(-world.state.difficulty, 0.0),
        });
    }

    /// A short sine-wave arc of 3–5 coins hovering over the ground.
    fn spawn_coin_arc(world: &mut World, rng: &mut StdRng) {
        let count: u32 = rng.gen_range(3..=5);
        let base_y = Self::ground_y(world) - rng.gen_range(60.0..120.0);
        let vel = Vec2::new(-world.state.difficulty, 0.0);
        for i in 0..count {
            let i = i as f64;
            world.coins.push(Coin {
                pos: Vec2::new(
                    world.bounds.width + 60.0 + i * COIN_SPACING,
                    base_y + (i * 0.6).sin() * 8.0,
                ),
                r: COIN_R,
                vel,
            });
        }
    }
}

impl Ruleset for Runner {
    fn name(&self) -> &'static str { "runner" }

    fn reset(&mut self, world: &mut World) {
        let ground = Self::ground_y(world);
        world.player = Player::new(Vec2::new(PLAYER_X, ground), PLAYER_R);
        world.state.difficulty = BASE_SPEED;
        self.obstacle_timer = 0.0;
        self.coin_timer = 0.0;
    }

    fn advance_difficulty(&mut self, world: &mut World) {
        world.state.difficulty = (BASE_SPEED + world.state.time * SPEED_GAIN).min(MAX_SPEED);
    }

    fn update_movement(&mut self, world: &mut World, dt: f64) {
        let ground = Self::ground_y(world);
        let p = &mut world.player;
        p.vel.y += GRAVITY * dt;
        p.pos.y += p.vel.y * dt;
        if p.pos.y >= ground {
            p.pos.y = ground;
            p.vel.y = 0.0;
            p.on_ground = true;
        }

        let scroll = Vec2::new(-world.state.difficulty, 0.0);
        for o in &mut world.obstacles { o.vel = scroll; }
        for c in &mut world.coins { c.vel = scroll; }
    }

    fn spawn(&mut self, world: &mut World, rng: &mut StdRng, dt: f64) {
        self.obstacle_timer -= dt;
        self.coin_timer -= dt;
        if self.obstacle_timer <= 0.0 {
            Self::spawn_obstacle(world, rng);
            self.obstacle_timer = rng.gen_range(1.0..1.8);
        }
        if self.coin_timer <= 0.0 {
            Self::spawn_coin_arc(world, rng);
            self.coin_timer = rng.gen_range(1.2..2.4);
        }
    }

    fn resolve_hazard_collision(&mut self, world: &mut World) -> bool {
        let p = &world.player;
        world
            .obstacles
            .iter()
            .any(|o| coarse_box_hit(p.pos.x, p.pos.y, p.r, o.pos.x, o.pos.y, o.w))
    }

    fn act(&mut self, world: &mut World, action: Action) {
        if let Action::Jump = action {
            let p = &mut world.player;
            if p.on_ground {
                p.vel.y = -JUMP_VELOCITY;
                p.on_ground = false;
            }
        }
    }
}
