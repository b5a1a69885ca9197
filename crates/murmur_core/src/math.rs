//! Vector math for the flock pipeline
//!
//! Re-exports glam plus the degenerate-safe operations the force model and
//! integrator depend on. Nothing in here may produce a NaN from finite input.

pub use glam::*;

use rand::Rng;

/// Squared cross-product length under which forward and up are treated as
/// collinear by [`look_rotation_safe`].
const COLLINEAR_EPSILON: f32 = 1.0e-6;

/// Normalize `v`, returning [`Vec3::ZERO`] for zero-length or non-finite input.
#[inline]
pub fn safe_normalize(v: Vec3) -> Vec3 {
    v.normalize_or_zero()
}

/// Rotation whose local +Z points along `forward` and whose local +Y leans
/// toward `up`.
///
/// Never fails: when `forward` is (anti-)parallel to `up` the shortest arc
/// from +Z is used instead, and a zero `forward` yields the identity.
pub fn look_rotation_safe(forward: Vec3, up: Vec3) -> Quat {
    let z = safe_normalize(forward);
    if z == Vec3::ZERO {
        return Quat::IDENTITY;
    }

    let x = up.cross(z);
    let x_len_sq = x.length_squared();
    if !(x_len_sq > COLLINEAR_EPSILON) {
        return Quat::from_rotation_arc(Vec3::Z, z);
    }

    let x = x / x_len_sq.sqrt();
    let y = z.cross(x);
    Quat::from_mat3(&Mat3::from_cols(x, y, z)).normalize()
}

/// Smallest distance from `position` to any face of an origin-centred cube.
/// Negative once the point is outside.
#[inline]
pub fn min_face_distance(position: Vec3, half_extent: f32) -> f32 {
    half_extent - position.abs().max_element()
}

/// Integer cell coordinate containing `point` for cubic cells of `cell_size`.
#[inline]
pub fn cell_coord(point: Vec3, cell_size: f32) -> IVec3 {
    (point / cell_size).floor().as_ivec3()
}

/// Spatial hash of a cell coordinate (Teschner et al. prime mix).
///
/// Distinct cells may collide; colliding cells are simply treated as one.
#[inline]
pub fn hash_cell(coord: IVec3) -> u32 {
    const P1: u32 = 73_856_093;
    const P2: u32 = 19_349_663;
    const P3: u32 = 83_492_791;
    (coord.x as u32).wrapping_mul(P1)
        ^ (coord.y as u32).wrapping_mul(P2)
        ^ (coord.z as u32).wrapping_mul(P3)
}

/// Rotation from three independent Euler angles drawn in [0, 360) degrees.
pub fn random_rotation<R: Rng + ?Sized>(rng: &mut R) -> Quat {
    let x = rng.gen_range(0.0f32..360.0).to_radians();
    let y = rng.gen_range(0.0f32..360.0).to_radians();
    let z = rng.gen_range(0.0f32..360.0).to_radians();
    Quat::from_euler(EulerRot::YXZ, y, x, z)
}

/// Uniform point inside the origin-centred cube of the given half extent.
pub fn random_point_in_cube<R: Rng + ?Sized>(rng: &mut R, half_extent: f32) -> Vec3 {
    Vec3::new(
        rng.gen_range(-half_extent..=half_extent),
        rng.gen_range(-half_extent..=half_extent),
        rng.gen_range(-half_extent..=half_extent),
    )
}
