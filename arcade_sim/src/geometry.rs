//! Vector math and hit tests.

use std::ops::{Add, AddAssign, Mul, Sub, SubAssign};

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Vec2 {
    pub x: f64,
    pub y: f64,
}

impl Vec2 {
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };

    pub const fn new(x: f64, y: f64) -> Self {
        Vec2 { x, y }
    }

    pub fn length_sq(self) -> f64 {
        self.x * self.x + self.y * self.y
    }

    pub fn length(self) -> f64 {
        self.length_sq().sqrt()
    }

    /// Unit vector, or zero for a zero-length input.
    pub fn normalized(self) -> Vec2 {
        let len = self.length();
        if len > 0.0 { self * (1.0 / len) } else { Vec2::ZERO }
    }
}

impl Add for Vec2 {
    type Output = Vec2;
    fn add(self, o: Vec2) -> Vec2 { Vec2::new(self.x + o.x, self.y + o.y) }
}

impl Sub for Vec2 {
    type Output = Vec2;
    fn sub(self, o: Vec2) -> Vec2 { Vec2::new(self.x - o.x, self.y - o.y) }
}

impl Mul<f64> for Vec2 {
    type Output = Vec2;
    fn mul(self, k: f64) -> Vec2 { Vec2::new(self.x * k, self.y * k) }
}

impl AddAssign for Vec2 {
    fn add_assign(&mut self, o: Vec2) { self.x += o.x; self.y += o.y; }
}

impl SubAssign for Vec2 {
    fn sub_assign(&mut self, o: Vec2) { self.x -= o.x; self.y -= o.y; }
}

/// Visible play area; the origin is the top-left corner, y grows downward.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Bounds {
    pub width:  f64,
    pub height: f64,
}

impl Bounds {
    pub fn new(width: f64, height: f64) -> Self {
        Bounds { width, height }
    }

    pub fn center(&self) -> Vec2 {
        Vec2::new(self.width / 2.0, self.height / 2.0)
    }

    /// True once the box `[min, max]` has fully left the area expanded by
    /// `margin` on a side it is moving toward (or resting beyond).
    pub fn has_left(&self, min: Vec2, max: Vec2, vel: Vec2, margin: f64) -> bool {
        (max.x < -margin && vel.x <= 0.0)
            || (min.x > self.width + margin && vel.x >= 0.0)
            || (max.y < -margin && vel.y <= 0.0)
            || (min.y > self.height + margin && vel.y >= 0.0)
    }
}

/// Inclusive circle overlap: tangent circles touch.
pub fn circles_touch(a: Vec2, ra: f64, b: Vec2, rb: f64) -> bool {
    let rr = ra + rb;
    (a - b).length_sq() <= rr * rr
}

/// Coarse player-vs-box test used by the runner.
///
/// Horizontally the player counts as a circle of radius `r` around `x`;
/// vertically only its ground point `y` is compared with the box top.  This
/// is not a true circle/rectangle intersection and is kept that way because
/// the obstacle sizes are tuned against it.
pub fn coarse_box_hit(x: f64, y: f64, r: f64, box_x: f64, box_top: f64, box_w: f64) -> bool {
    x + r > box_x && x - r < box_x + box_w && y > box_top
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tangent_circles_touch() {
        assert!(circles_touch(Vec2::new(0.0, 0.0), 16.0, Vec2::new(24.0, 0.0), 8.0));
        assert!(!circles_touch(Vec2::new(0.0, 0.0), 16.0, Vec2::new(24.001, 0.0), 8.0));
    }

    #[test]
    fn coarse_hit_needs_both_axes() {
        // Box spans x 100..130, top at y 300.
        assert!(coarse_box_hit(90.0, 310.0, 16.0, 100.0, 300.0, 30.0));
        // Horizontally clear.
        assert!(!coarse_box_hit(80.0, 310.0, 16.0, 100.0, 300.0, 30.0));
        // Ground point above the top edge: the radius does not count vertically.
        assert!(!coarse_box_hit(115.0, 299.0, 16.0, 100.0, 300.0, 30.0));
        // Touching edges exactly is not a hit.
        assert!(!coarse_box_hit(84.0, 310.0, 16.0, 100.0, 300.0, 30.0));
    }

    #[test]
    fn leaving_bounds_respects_direction() {
        let b = Bounds::new(800.0, 600.0);
        let left = Vec2::new(-1.0, 0.0);
        // Fully past the left margin and moving left.
        assert!(b.has_left(Vec2::new(-80.0, 10.0), Vec2::new(-41.0, 20.0), left, 40.0));
        // Exactly on the margin is still kept.
        assert!(!b.has_left(Vec2::new(-80.0, 10.0), Vec2::new(-40.0, 20.0), left, 40.0));
        // Off the right edge but moving in (freshly spawned) is kept.
        assert!(!b.has_left(Vec2::new(900.0, 10.0), Vec2::new(910.0, 20.0), left, 40.0));
        // Off the right edge and moving out is dropped.
        assert!(b.has_left(Vec2::new(900.0, 10.0), Vec2::new(910.0, 20.0), Vec2::new(1.0, 0.0), 40.0));
    }

    #[test]
    fn normalized_zero_is_zero() {
        assert_eq!(Vec2::ZERO.normalized(), Vec2::ZERO);
        let n = Vec2::new(3.0, 4.0).normalized();
        assert!((n.length() - 1.0).abs() < 1e-12);
    }
}
