//! Top-down arena survivor: walk toward the pointer, auto-fire at the
//! nearest chaser, outlast the swarm.

use log::debug;
use rand::rngs::StdRng;
use rand::Rng;

use crate::engine::{Action, Ruleset};
use crate::entity::{Bullet, Enemy};
use crate::geometry::{circles_touch, Vec2};
use crate::world::{Player, World};

pub const PLAYER_R:     f64 = 14.0;
pub const PLAYER_SPEED: f64 = 180.0;    // px/s
pub const MAX_HP:       f64 = 100.0;

pub const CONTACT_DAMAGE: f64 = 10.0;
pub const INVULN_WINDOW:  f64 = 0.8;    // s
/// Contact pushes the player this far away from the enemy, along the
/// enemy→player axis.
pub const KNOCKBACK:      f64 = 14.0;   // px

pub const FIRE_INTERVAL: f64 = 0.45;    // s
const BULLET_SPEED: f64 = 380.0;
const BULLET_R:     f64 = 4.0;
const BULLET_LIFE:  f64 = 1.3;

const SPAWN_MARGIN:      f64 = 40.0;
const SPAWN_SLOWEST:     f64 = 1.2;
const SPAWN_FASTEST:     f64 = 0.45;
const EXTRA_SPAWN_AFTER: f64 = 20.0;
const EXTRA_SPAWN_ODDS:  f64 = 0.3;

/// Seek targets closer than this are considered reached.
const ARRIVE_DIST: f64 = 2.0;

#[derive(Clone, Debug, Default)]
pub struct Survivor {
    spawn_timer: f64,
}

impl Survivor {
    pub fn new() -> Self {
        Survivor::default()
    }

    /// Seconds between spawns at time `t`; `difficulty` holds this value.
    pub fn spawn_interval(t: f64) -> f64 {
        (SPAWN_SLOWEST - t * 0.01).max(SPAWN_FASTEST)
    }

    fn spawn_enemy(world: &mut World, rng: &mut StdRng) {
        let (w, h) = (world.bounds.width, world.bounds.height);
        let pos = match rng.gen_range(0..4) {
            0 => Vec2::new(rng.gen_range(0.0..w), -SPAWN_MARGIN),
            1 => Vec2::new(w + SPAWN_MARGIN, rng.gen_range(0.0..h)),
            2 => Vec2::new(rng.gen_range(0.0..w), h + SPAWN_MARGIN),
            _ => Vec2::new(-SPAWN_MARGIN, rng.gen_range(0.0..h)),
        };
        let speed = 60.0 + rng.gen_range(0.0..40.0) + (world.state.time * 2.0).min(100.0);
        world.enemies.push(Enemy {
            pos,
            r: rng.gen_range(10.0..16.0),
            speed,
            hp: 2,
            vel: Vec2::ZERO,
        });
    }

    fn fire_at_nearest(world: &mut World) -> bool {
        let from = world.player.pos;
        let Some(idx) = world.nearest_enemy(from) else {
            return false;
        };
        let dir = (world.enemies[idx].pos - from).normalized();
        world.bullets.push(Bullet {
            pos:  from,
            r:    BULLET_R,
            vel:  dir * BULLET_SPEED,
            life: BULLET_LIFE,
        });
        true
    }
}

impl Ruleset for Survivor {
    fn name(&self) -> &'static str { "survivor" }

    fn can_pause(&self) -> bool { true }

    fn reset(&mut self, world: &mut World) {
        let mut player = Player::new(world.bounds.center(), PLAYER_R);
        player.health = Some(MAX_HP);
        player.speed = PLAYER_SPEED;
        world.player = player;
        world.state.difficulty = SPAWN_SLOWEST;
        self.spawn_timer = 0.0;
    }

    fn advance_difficulty(&mut self, world: &mut World) {
        world.state.difficulty = Self::spawn_interval(world.state.time);
    }

    fn update_movement(&mut self, world: &mut World, dt: f64) {
        let p = &mut world.player;
        if let Some(target) = p.target {
            let to = target - p.pos;
            let dist = to.length();
            if dist > ARRIVE_DIST {
                p.pos += to.normalized() * dist.min(p.speed * dt);
            } else {
                p.target = None;
            }
        }

        let chase = p.pos;
        for e in &mut world.enemies {
            e.vel = (chase - e.pos).normalized() * e.speed;
        }
    }

    fn spawn(&mut self, world: &mut World, rng: &mut StdRng, dt: f64) {
        self.spawn_timer -= dt;
        if self.spawn_timer > 0.0 { return; }

        Self::spawn_enemy(world, rng);
        self.spawn_timer = world.state.difficulty;
        if world.state.time > EXTRA_SPAWN_AFTER && rng.gen_bool(EXTRA_SPAWN_ODDS) {
            Self::spawn_enemy(world, rng);
        }
    }

    fn resolve_hazard_collision(&mut self, world: &mut World) -> bool {
        let p = &mut world.player;
        for e in &world.enemies {
            if !circles_touch(p.pos, p.r, e.pos, e.r) { continue; }
            let away = p.pos - e.pos;
            if p.take_hit(CONTACT_DAMAGE, INVULN_WINDOW, away, KNOCKBACK) {
                debug!("player hit, hp {:?}", p.health);
            }
            if p.is_dead() { return true; }
        }
        false
    }

    fn after_collisions(&mut self, world: &mut World, dt: f64) {
        let p = &mut world.player;
        p.invuln = (p.invuln - dt).max(0.0);
        p.fire_cd -= dt;
        if p.fire_cd <= 0.0 && Self::fire_at_nearest(world) {
            world.player.fire_cd = FIRE_INTERVAL;
        }
    }

    fn act(&mut self, world: &mut World, action: Action) {
        if let Action::MoveTo(target) = action {
            world.player.target = Some(target);
        }
    }
}
