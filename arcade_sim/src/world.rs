//! Simulation state shared by every ruleset.
//!
//! [`World`] owns the player, the score/clock and one ordered collection per
//! entity kind.  It knows how to move and cull entities and how to resolve
//! the collisions that behave the same in every variant (coin pickup, bullet
//! hits); everything variant-specific lives in a [`Ruleset`](crate::Ruleset).

use crate::entity::{Body, Bullet, Coin, Enemy, Obstacle};
use crate::geometry::{circles_touch, Bounds, Vec2};

/// Entities are dropped once fully this far outside the visible area.
pub const CULL_MARGIN: f64 = 40.0;

pub const COIN_SCORE: u32 = 5;
pub const KILL_SCORE: u32 = 10;

// ════════════════════════════════════════════════════════════════════════════
// Phase / GameState
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Running,
    Paused,
    /// Terminal until an explicit reset.
    GameOver,
}

#[derive(Clone, Debug, PartialEq)]
pub struct GameState {
    /// Seconds of running time since the last reset.
    pub time:       f64,
    /// Ruleset-defined difficulty scalar (scroll speed, spawn interval, …).
    pub difficulty: f64,
    pub score:      u32,
    pub phase:      Phase,
}

impl GameState {
    pub fn is_running(&self)   -> bool { self.phase == Phase::Running }
    pub fn is_game_over(&self) -> bool { self.phase == Phase::GameOver }
}

// ════════════════════════════════════════════════════════════════════════════
// Player
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Debug, PartialEq)]
pub struct Player {
    pub pos:       Vec2,
    pub vel:       Vec2,
    pub r:         f64,
    pub on_ground: bool,
    /// Seconds of remaining invulnerability.
    pub invuln:    f64,
    /// Seconds until the next shot may be taken.
    pub fire_cd:   f64,
    /// `None` for variants without health.
    pub health:    Option<f64>,
    /// Seek target for pointer-driven movement.
    pub target:    Option<Vec2>,
    /// Maximum seek speed in px/s.
    pub speed:     f64,
}

impl Player {
    pub fn new(pos: Vec2, r: f64) -> Self {
        Player {
            pos,
            vel:       Vec2::ZERO,
            r,
            on_ground: true,
            invuln:    0.0,
            fire_cd:   0.0,
            health:    None,
            target:    None,
            speed:     0.0,
        }
    }

    pub fn is_invulnerable(&self) -> bool {
        self.invuln > 0.0
    }

    /// Apply damage unless invulnerable.  On a hit the player becomes
    /// invulnerable for `window` seconds and is pushed `knockback` px along
    /// `away`.  Returns whether the hit landed.
    pub fn take_hit(&mut self, damage: f64, window: f64, away: Vec2, knockback: f64) -> bool {
        if self.is_invulnerable() {
            return false;
        }
        if let Some(hp) = self.health.as_mut() {
            *hp = (*hp - damage).max(0.0);
        }
        self.invuln = window;
        self.pos += away.normalized() * knockback;
        true
    }

    pub fn is_dead(&self) -> bool {
        matches!(self.health, Some(hp) if hp <= 0.0)
    }
}

// ════════════════════════════════════════════════════════════════════════════
// World
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Debug)]
pub struct World {
    pub bounds:    Bounds,
    pub state:     GameState,
    pub player:    Player,
    pub obstacles: Vec<Obstacle>,
    pub coins:     Vec<Coin>,
    pub enemies:   Vec<Enemy>,
    pub bullets:   Vec<Bullet>,
}

impl World {
    pub fn new(bounds: Bounds) -> Self {
        World {
            bounds,
            state: GameState { time: 0.0, difficulty: 0.0, score: 0, phase: Phase::Running },
            player: Player::new(bounds.center(), 0.0),
            obstacles: Vec::new(),
            coins:     Vec::new(),
            enemies:   Vec::new(),
            bullets:   Vec::new(),
        }
    }

    /// Empty every collection and restart the clock.  The ruleset places the
    /// player afterwards.
    pub fn clear(&mut self) {
        self.state = GameState { time: 0.0, difficulty: 0.0, score: 0, phase: Phase::Running };
        self.obstacles.clear();
        self.coins.clear();
        self.enemies.clear();
        self.bullets.clear();
    }

    pub fn entity_count(&self) -> usize {
        self.obstacles.len() + self.coins.len() + self.enemies.len() + self.bullets.len()
    }

    pub fn end_run(&mut self) {
        self.state.phase = Phase::GameOver;
    }

    /// Move every entity by its velocity, age bullets, and drop whatever has
    /// left the play area or expired.
    pub fn integrate(&mut self, dt: f64) {
        let bounds = self.bounds;
        advance_and_cull(&mut self.obstacles, dt, &bounds);
        advance_and_cull(&mut self.coins, dt, &bounds);
        advance_and_cull(&mut self.enemies, dt, &bounds);
        advance_and_cull(&mut self.bullets, dt, &bounds);

        for b in &mut self.bullets {
            b.life -= dt;
        }
        self.bullets.retain(|b| b.life > 0.0);
    }

    /// Remove every coin touching the player.  Returns how many were taken.
    pub fn collect_coins(&mut self) -> u32 {
        let (p, r) = (self.player.pos, self.player.r);
        let before = self.coins.len();
        self.coins.retain(|c| !circles_touch(c.pos, c.r, p, r));
        let taken = (before - self.coins.len()) as u32;
        self.state.score += taken * COIN_SCORE;
        taken
    }

    /// Each bullet damages at most one enemy and is consumed by the hit.
    /// Returns the number of enemies killed.
    pub fn resolve_bullet_hits(&mut self) -> u32 {
        let mut kills = 0;
        let enemies = &mut self.enemies;
        self.bullets.retain(|b| {
            let Some(idx) = enemies.iter().position(|e| circles_touch(e.pos, e.r, b.pos, b.r)) else {
                return true;
            };
            enemies[idx].hp -= 1;
            if enemies[idx].hp <= 0 {
                enemies.remove(idx);
                kills += 1;
            }
            false
        });
        self.state.score += kills * KILL_SCORE;
        kills
    }

    /// Index of the enemy closest to `from`.
    pub fn nearest_enemy(&self, from: Vec2) -> Option<usize> {
        self.enemies
            .iter()
            .enumerate()
            .min_by(|(_, a), (_, b)| {
                (a.pos - from).length_sq().total_cmp(&(b.pos - from).length_sq())
            })
            .map(|(i, _)| i)
    }
}

fn advance_and_cull<T: Body>(items: &mut Vec<T>, dt: f64, bounds: &Bounds) {
    items.retain_mut(|item| {
        item.advance(dt);
        let (min, max) = item.aabb();
        !bounds.has_left(min, max, item.vel(), CULL_MARGIN)
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn world() -> World {
        let mut w = World::new(Bounds::new(800.0, 480.0));
        w.player = Player::new(Vec2::new(120.0, 440.0), 16.0);
        w
    }

    fn enemy_at(x: f64, y: f64, hp: i32) -> Enemy {
        Enemy { pos: Vec2::new(x, y), r: 12.0, speed: 0.0, hp, vel: Vec2::ZERO }
    }

    fn bullet_at(x: f64, y: f64) -> Bullet {
        Bullet { pos: Vec2::new(x, y), r: 4.0, vel: Vec2::ZERO, life: 1.0 }
    }

    #[test]
    fn tangent_coin_is_collected() {
        let mut w = world();
        w.coins.push(Coin { pos: Vec2::new(144.0, 440.0), r: 8.0, vel: Vec2::ZERO });
        w.coins.push(Coin { pos: Vec2::new(145.0, 440.0), r: 8.0, vel: Vec2::ZERO });
        assert_eq!(w.collect_coins(), 1);
        assert_eq!(w.state.score, COIN_SCORE);
        assert_eq!(w.coins.len(), 1);
        assert_eq!(w.coins[0].pos.x, 145.0);
    }

    #[test]
    fn obstacles_are_dropped_past_the_left_margin() {
        let mut w = world();
        let vel = Vec2::new(-100.0, 0.0);
        w.obstacles.push(Obstacle { pos: Vec2::new(-60.0, 400.0), w: 20.0, h: 40.0, vel });
        w.obstacles.push(Obstacle { pos: Vec2::new(300.0, 400.0), w: 20.0, h: 40.0, vel });
        // First step puts the first obstacle's right edge at -40.1.
        w.integrate(0.001);
        assert_eq!(w.obstacles.len(), 1);
        assert!((w.obstacles[0].pos.x - 299.9).abs() < 1e-9);
    }

    #[test]
    fn fresh_spawns_offscreen_right_survive() {
        let mut w = world();
        w.coins.push(Coin { pos: Vec2::new(1000.0, 300.0), r: 8.0, vel: Vec2::new(-240.0, 0.0) });
        w.integrate(0.016);
        assert_eq!(w.coins.len(), 1);
    }

    #[test]
    fn bullets_expire() {
        let mut w = world();
        let mut b = bullet_at(400.0, 200.0);
        b.life = 0.05;
        w.bullets.push(b);
        w.integrate(0.03);
        assert_eq!(w.bullets.len(), 1);
        w.integrate(0.03);
        assert!(w.bullets.is_empty());
    }

    #[test]
    fn two_hits_kill_an_enemy() {
        let mut w = world();
        w.enemies.push(enemy_at(400.0, 200.0, 2));
        w.bullets.push(bullet_at(400.0, 200.0));
        assert_eq!(w.resolve_bullet_hits(), 0);
        assert_eq!(w.enemies[0].hp, 1);
        assert!(w.bullets.is_empty());

        w.bullets.push(bullet_at(410.0, 200.0));
        assert_eq!(w.resolve_bullet_hits(), 1);
        assert!(w.enemies.is_empty());
        assert_eq!(w.state.score, KILL_SCORE);
    }

    #[test]
    fn one_bullet_one_enemy() {
        let mut w = world();
        w.enemies.push(enemy_at(400.0, 200.0, 1));
        w.enemies.push(enemy_at(402.0, 200.0, 1));
        w.bullets.push(bullet_at(401.0, 200.0));
        assert_eq!(w.resolve_bullet_hits(), 1);
        assert_eq!(w.enemies.len(), 1);
    }

    #[test]
    fn invulnerability_blocks_second_hit() {
        let mut p = Player::new(Vec2::new(100.0, 100.0), 14.0);
        p.health = Some(100.0);
        assert!(p.take_hit(10.0, 0.8, Vec2::new(1.0, 0.0), 14.0));
        assert_eq!(p.health, Some(90.0));
        assert!(p.is_invulnerable());
        assert_eq!(p.pos, Vec2::new(114.0, 100.0));

        assert!(!p.take_hit(10.0, 0.8, Vec2::new(1.0, 0.0), 14.0));
        assert_eq!(p.health, Some(90.0));
    }

    #[test]
    fn nearest_enemy_picks_closest() {
        let mut w = world();
        assert_eq!(w.nearest_enemy(Vec2::ZERO), None);
        w.enemies.push(enemy_at(500.0, 0.0, 1));
        w.enemies.push(enemy_at(50.0, 50.0, 1));
        w.enemies.push(enemy_at(300.0, 300.0, 1));
        assert_eq!(w.nearest_enemy(Vec2::ZERO), Some(1));
    }

    #[test]
    fn clear_empties_everything() {
        let mut w = world();
        w.enemies.push(enemy_at(1.0, 1.0, 1));
        w.bullets.push(bullet_at(1.0, 1.0));
        w.state.score = 40;
        w.end_run();
        w.clear();
        assert_eq!(w.entity_count(), 0);
        assert_eq!(w.state.score, 0);
        assert!(w.state.is_running());
    }
}
