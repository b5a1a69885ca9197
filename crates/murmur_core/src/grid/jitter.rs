//! Per-tick grid jitter
//!
//! A fixed lattice systematically splits flocks that sit on a cell boundary.
//! Rotating and shifting the lattice by a fresh random amount every tick
//! spreads that undercount evenly over time.

use crate::math::{random_rotation, Quat, Vec3};
use rand::Rng;

/// Rotation and offset applied to every position before hashing. Drawn once
/// per tick and shared read-only by all hashing work of that tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridJitter {
    pub rotation: Quat,
    pub offset: Vec3,
}

impl GridJitter {
    /// No rotation, no offset: the plain axis-aligned lattice.
    pub const IDENTITY: Self = Self {
        rotation: Quat::IDENTITY,
        offset: Vec3::ZERO,
    };

    /// Draw a rotation of 0-360 degrees per axis and an offset in
    /// `[-cell_size / 2, cell_size / 2]` per axis.
    pub fn draw<R: Rng + ?Sized>(rng: &mut R, cell_size: f32) -> Self {
        let rotation = random_rotation(rng);
        let range = cell_size / 2.0;
        let offset = Vec3::new(
            rng.gen_range(-range..=range),
            rng.gen_range(-range..=range),
            rng.gen_range(-range..=range),
        );
        Self { rotation, offset }
    }

    /// Map a world position into jittered lattice space.
    #[inline]
    pub fn apply(&self, position: Vec3) -> Vec3 {
        self.rotation * (position + self.offset)
    }
}

impl Default for GridJitter {
    fn default() -> Self {
        Self::IDENTITY
    }
}
