//! Arena geometry - movement, bounds and hit shapes

use std::f32::consts::{PI, TAU};

/// Physics helpers for positions, facing and hit tests
pub struct PhysicsSystem;

impl PhysicsSystem {
    /// Wrap an angle into [-π, π]
    pub fn normalize_angle(angle: f32) -> f32 {
        (angle + PI).rem_euclid(TAU) - PI
    }

    pub fn distance(x1: f32, y1: f32, x2: f32, y2: f32) -> f32 {
        let dx = x2 - x1;
        let dy = y2 - y1;
        (dx * dx + dy * dy).sqrt()
    }

    /// Heading from one point to another
    pub fn angle_to(from_x: f32, from_y: f32, to_x: f32, to_y: f32) -> f32 {
        (to_y - from_y).atan2(to_x - from_x)
    }

    /// Move a point along a heading
    pub fn advance(x: f32, y: f32, angle: f32, distance: f32) -> (f32, f32) {
        (x + angle.cos() * distance, y + angle.sin() * distance)
    }

    /// Clamp a position into the map, keeping `margin` from every wall
    pub fn clamp_to_bounds(x: f32, y: f32, margin: f32, width: f32, height: f32) -> (f32, f32) {
        (
            x.max(margin).min(width - margin),
            y.max(margin).min(height - margin),
        )
    }

    /// Cone test: within `range` and within `half_angle` of `facing`
    pub fn in_cone(
        origin_x: f32,
        origin_y: f32,
        facing: f32,
        target_x: f32,
        target_y: f32,
        range: f32,
        half_angle: f32,
    ) -> bool {
        let dist = Self::distance(origin_x, origin_y, target_x, target_y);
        if dist > range {
            return false;
        }
        let to_target = Self::angle_to(origin_x, origin_y, target_x, target_y);
        let diff = Self::normalize_angle(to_target - facing);
        diff.abs() < half_angle
    }

    /// Beam test along a ray from `origin` in direction `facing`.
    /// The target's projection onto the ray must lie strictly inside
    /// (0, range) and its perpendicular distance must be under `hit_radius`.
    pub fn on_beam(
        origin_x: f32,
        origin_y: f32,
        facing: f32,
        target_x: f32,
        target_y: f32,
        range: f32,
        hit_radius: f32,
    ) -> bool {
        let vx = facing.cos();
        let vy = facing.sin();
        let tx = target_x - origin_x;
        let ty = target_y - origin_y;

        let dot = tx * vx + ty * vy;
        if dot <= 0.0 || dot >= range {
            return false;
        }

        let px = origin_x + dot * vx;
        let py = origin_y + dot * vy;
        Self::distance(px, py, target_x, target_y) < hit_radius
    }

    pub fn in_radius(
        center_x: f32,
        center_y: f32,
        target_x: f32,
        target_y: f32,
        radius: f32,
    ) -> bool {
        let dx = target_x - center_x;
        let dy = target_y - center_y;
        dx * dx + dy * dy <= radius * radius
    }
}
