//! Boid storage
//!
//! Dense struct-of-arrays state indexed by a stable boid index. Position,
//! heading and orientation are the only data that outlive a tick.
//!
//! Storage is double-buffered the same way component columns are: the
//! integrate stage reads `cur` and writes `nxt`, and the simulation swaps
//! the two only after every stage of the tick succeeded. A failed tick
//! therefore never touches the state the host can observe.

use crate::math::{
    look_rotation_safe, random_point_in_cube, random_rotation, safe_normalize, Quat, Vec3,
};
use rand::Rng;
use rayon::prelude::*;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum StoreError {
    #[error("got {positions} positions but {rotations} rotations")]
    LengthMismatch { positions: usize, rotations: usize },

    #[error("boid {index} has a non-finite pose")]
    NonFinite { index: usize },

    #[error("boid {index} has a zero-length heading")]
    ZeroHeading { index: usize },
}

/// One buffer worth of per-boid state.
#[derive(Debug, Clone, Default)]
pub struct Poses {
    pub(crate) positions: Vec<Vec3>,
    pub(crate) headings: Vec<Vec3>,
    pub(crate) rotations: Vec<Quat>,
}

impl Poses {
    fn from_parts(positions: Vec<Vec3>, rotations: Vec<Quat>) -> Self {
        let headings = rotations
            .iter()
            .map(|rotation| (*rotation * Vec3::Z).normalize())
            .collect();
        Self {
            positions,
            headings,
            rotations,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    #[inline]
    pub fn positions(&self) -> &[Vec3] {
        &self.positions
    }

    /// Unit direction of travel.
    #[inline]
    pub fn headings(&self) -> &[Vec3] {
        &self.headings
    }

    #[inline]
    pub fn rotations(&self) -> &[Quat] {
        &self.rotations
    }

    /// Index of the first boid whose state contains NaN or infinity.
    pub fn first_non_finite(&self) -> Option<usize> {
        (0..self.len()).into_par_iter().find_first(|&i| {
            !(self.positions[i].is_finite()
                && self.headings[i].is_finite()
                && self.rotations[i].is_finite())
        })
    }
}

/// Owner of all persistent boid state.
#[derive(Debug, Clone)]
pub struct BoidStore {
    cur: Poses,
    nxt: Poses,
}

impl BoidStore {
    /// Build a store from host-provided poses. Headings are taken from each
    /// rotation's local +Z axis.
    pub fn from_poses(positions: Vec<Vec3>, rotations: Vec<Quat>) -> Result<Self, StoreError> {
        if positions.len() != rotations.len() {
            return Err(StoreError::LengthMismatch {
                positions: positions.len(),
                rotations: rotations.len(),
            });
        }

        let rotations: Vec<Quat> = rotations.into_iter().map(Quat::normalize).collect();
        let cur = Poses::from_parts(positions, rotations);
        if let Some(index) = cur.first_non_finite() {
            return Err(StoreError::NonFinite { index });
        }

        Ok(Self {
            nxt: cur.clone(),
            cur,
        })
    }

    /// Build a store from positions and directions of travel.
    ///
    /// Headings need not be unit length but must be finite and non-zero.
    pub fn from_headings(positions: Vec<Vec3>, headings: Vec<Vec3>) -> Result<Self, StoreError> {
        for (index, heading) in headings.iter().enumerate() {
            if !heading.is_finite() {
                return Err(StoreError::NonFinite { index });
            }
            if safe_normalize(*heading) == Vec3::ZERO {
                return Err(StoreError::ZeroHeading { index });
            }
        }

        let rotations = headings
            .iter()
            .map(|heading| look_rotation_safe(*heading, Vec3::Y))
            .collect();
        Self::from_poses(positions, rotations)
    }

    /// Scatter `count` boids uniformly through the cage with random
    /// orientations.
    pub fn random<R: Rng + ?Sized>(count: usize, half_extent: f32, rng: &mut R) -> Self {
        let mut positions = Vec::with_capacity(count);
        let mut rotations = Vec::with_capacity(count);
        for _ in 0..count {
            positions.push(random_point_in_cube(rng, half_extent));
            rotations.push(random_rotation(rng));
        }

        let cur = Poses::from_parts(positions, rotations);
        Self {
            nxt: cur.clone(),
            cur,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.cur.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.cur.is_empty()
    }

    /// Committed state.
    #[inline]
    pub fn current(&self) -> &Poses {
        &self.cur
    }

    #[inline]
    pub fn positions(&self) -> &[Vec3] {
        self.cur.positions()
    }

    #[inline]
    pub fn headings(&self) -> &[Vec3] {
        self.cur.headings()
    }

    #[inline]
    pub fn rotations(&self) -> &[Quat] {
        self.cur.rotations()
    }

    /// Committed state for reading alongside the write buffer for the tick.
    pub(crate) fn split_buffers(&mut self) -> (&Poses, &mut Poses) {
        (&self.cur, &mut self.nxt)
    }

    /// Publish the write buffer. Call once per successful tick.
    pub(crate) fn swap_buffers(&mut self) {
        std::mem::swap(&mut self.cur, &mut self.nxt);
    }
}
