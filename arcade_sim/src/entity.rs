//! Entities owned by the world's per-type collections.

use crate::geometry::Vec2;

/// Axis-aligned block standing on the runner's ground.  `pos` is its
/// top-left corner.
#[derive(Clone, Debug, PartialEq)]
pub struct Obstacle {
    pub pos: Vec2,
    pub w:   f64,
    pub h:   f64,
    pub vel: Vec2,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Coin {
    pub pos: Vec2,
    pub r:   f64,
    pub vel: Vec2,
}

/// Chaser in the survivor arena.
#[derive(Clone, Debug, PartialEq)]
pub struct Enemy {
    pub pos:   Vec2,
    pub r:     f64,
    pub speed: f64,
    pub hp:    i32,
    pub vel:   Vec2,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Bullet {
    pub pos:  Vec2,
    pub r:    f64,
    pub vel:  Vec2,
    /// Seconds left before the bullet fizzles.
    pub life: f64,
}

/// Position, velocity and bounding box: what the world needs to move and
/// cull an entity without knowing its kind.
pub trait Body {
    fn pos_mut(&mut self) -> &mut Vec2;
    fn vel(&self) -> Vec2;
    fn aabb(&self) -> (Vec2, Vec2);

    fn advance(&mut self, dt: f64) {
        let v = self.vel();
        *self.pos_mut() += v * dt;
    }
}

fn circle_aabb(c: Vec2, r: f64) -> (Vec2, Vec2) {
    (Vec2::new(c.x - r, c.y - r), Vec2::new(c.x + r, c.y + r))
}

impl Body for Obstacle {
    fn pos_mut(&mut self) -> &mut Vec2 { &mut self.pos }
    fn vel(&self) -> Vec2 { self.vel }
    fn aabb(&self) -> (Vec2, Vec2) {
        (self.pos, Vec2::new(self.pos.x + self.w, self.pos.y + self.h))
    }
}

impl Body for Coin {
    fn pos_mut(&mut self) -> &mut Vec2 { &mut self.pos }
    fn vel(&self) -> Vec2 { self.vel }
    fn aabb(&self) -> (Vec2, Vec2) { circle_aabb(self.pos, self.r) }
}

impl Body for Enemy {
    fn pos_mut(&mut self) -> &mut Vec2 { &mut self.pos }
    fn vel(&self) -> Vec2 { self.vel }
    fn aabb(&self) -> (Vec2, Vec2) { circle_aabb(self.pos, self.r) }
}

impl Body for Bullet {
    fn pos_mut(&mut self) -> &mut Vec2 { &mut self.pos }
    fn vel(&self) -> Vec2 { self.vel }
    fn aabb(&self) -> (Vec2, Vec2) { circle_aabb(self.pos, self.r) }
}
