//! Constant-speed integration.
//!
//! Velocity is rebuilt from the stored heading every tick, nudged by the
//! steering force, then renormalised back to the configured speed. Force can
//! only change direction; speed never drifts.

use crate::math::{look_rotation_safe, safe_normalize, Quat, Vec3};

/// State written back to the store for one boid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose {
    pub position: Vec3,
    pub heading: Vec3,
    pub rotation: Quat,
    pub velocity: Vec3,
}

/// Advance one boid by `delta_secs`.
///
/// If the force exactly cancels the current velocity the previous heading is
/// kept, so the result always has `|velocity| == speed`.
pub fn integrate(
    position: Vec3,
    heading: Vec3,
    rotation: Quat,
    force: Vec3,
    speed: f32,
    delta_secs: f32,
) -> Pose {
    let mut velocity = heading * speed;
    velocity += force * delta_secs;

    let mut direction = safe_normalize(velocity);
    if direction == Vec3::ZERO {
        direction = heading;
    }
    let velocity = direction * speed;

    let up = rotation * Vec3::Y;
    Pose {
        position: position + velocity * delta_secs,
        heading: direction,
        rotation: look_rotation_safe(velocity, up),
        velocity,
    }
}
