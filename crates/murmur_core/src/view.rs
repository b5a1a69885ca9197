//! Read-only per-tick transforms for the host.

use crate::math::{Mat4, Quat, Vec3};
use bytemuck::{Pod, Zeroable};

/// World pose of one boid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoidTransform {
    pub position: Vec3,
    pub rotation: Quat,
}

impl BoidTransform {
    /// Model matrix with unit scale.
    pub fn to_matrix(&self) -> Mat4 {
        Mat4::from_rotation_translation(self.rotation, self.position)
    }
}

/// Column-major model matrix, laid out for direct instance-buffer upload.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct TransformRaw {
    pub model: [[f32; 4]; 4],
}

impl From<BoidTransform> for TransformRaw {
    fn from(transform: BoidTransform) -> Self {
        Self {
            model: transform.to_matrix().to_cols_array_2d(),
        }
    }
}

/// Borrowed view of every boid's pose after a tick.
#[derive(Debug, Clone, Copy)]
pub struct TransformView<'a> {
    positions: &'a [Vec3],
    rotations: &'a [Quat],
}

impl<'a> TransformView<'a> {
    pub(crate) fn new(positions: &'a [Vec3], rotations: &'a [Quat]) -> Self {
        debug_assert_eq!(positions.len(), rotations.len());
        Self {
            positions,
            rotations,
        }
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn positions(&self) -> &'a [Vec3] {
        self.positions
    }

    pub fn rotations(&self) -> &'a [Quat] {
        self.rotations
    }

    pub fn get(&self, index: usize) -> Option<BoidTransform> {
        Some(BoidTransform {
            position: *self.positions.get(index)?,
            rotation: *self.rotations.get(index)?,
        })
    }

    pub fn iter(&self) -> impl ExactSizeIterator<Item = BoidTransform> + 'a {
        self.positions
            .iter()
            .zip(self.rotations)
            .map(|(&position, &rotation)| BoidTransform { position, rotation })
    }

    /// Refill `out` with one model matrix per boid.
    pub fn write_raw(&self, out: &mut Vec<TransformRaw>) {
        out.clear();
        out.extend(self.iter().map(TransformRaw::from));
    }
}
