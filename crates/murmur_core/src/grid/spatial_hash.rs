//! Spatial hash grid for per-tick neighbour grouping.
//!
//! Cells are cubes with an edge of one perception radius. Every boid is
//! hashed independently from its own position, so insertion needs no
//! coordination beyond the concurrent map itself.

use super::GridJitter;
use crate::math::{cell_coord, hash_cell, IVec3, Vec3};
use dashmap::DashMap;
use rayon::prelude::*;

/// Hashed cell identifier. Two distinct lattice cells may share a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellKey(pub u32);

/// Concurrent multi-map from cell key to the boid indices hashed into it.
pub struct SpatialHashGrid {
    cell_size: f32,
    jitter: GridJitter,
    cells: DashMap<CellKey, Vec<usize>>,
}

impl SpatialHashGrid {
    /// Create an empty grid for one tick.
    pub fn new(cell_size: f32, jitter: GridJitter) -> Self {
        Self {
            cell_size,
            jitter,
            cells: DashMap::new(),
        }
    }

    /// Pre-size for roughly `capacity` occupied cells.
    pub fn with_capacity(cell_size: f32, jitter: GridJitter, capacity: usize) -> Self {
        Self {
            cell_size,
            jitter,
            cells: DashMap::with_capacity(capacity),
        }
    }

    #[inline]
    pub fn cell_size(&self) -> f32 {
        self.cell_size
    }

    #[inline]
    pub fn jitter(&self) -> &GridJitter {
        &self.jitter
    }

    /// Lattice cell of `position` after jitter.
    #[inline]
    pub fn cell_of(&self, position: Vec3) -> IVec3 {
        cell_coord(self.jitter.apply(position), self.cell_size)
    }

    #[inline]
    pub fn key_of(&self, position: Vec3) -> CellKey {
        CellKey(hash_cell(self.cell_of(position)))
    }

    /// Record boid `index` at `position`. Safe to call from many threads.
    pub fn insert(&self, index: usize, position: Vec3) {
        let key = self.key_of(position);
        self.cells.entry(key).or_default().push(index);
    }

    /// Hash every position in parallel; boid `i` is `positions[i]`.
    pub fn insert_all(&self, positions: &[Vec3]) {
        positions
            .par_iter()
            .enumerate()
            .for_each(|(index, &position)| self.insert(index, position));
    }

    /// Number of occupied keys.
    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    /// Number of inserted boids.
    pub fn entry_count(&self) -> usize {
        self.cells.iter().map(|cell| cell.value().len()).sum()
    }

    /// Members of a cell in insertion order (unspecified under concurrency).
    pub fn members(&self, key: CellKey) -> Option<Vec<usize>> {
        self.cells.get(&key).map(|cell| cell.value().clone())
    }

    /// Consume the grid into one member list per occupied key.
    pub fn into_groups(self) -> Vec<Vec<usize>> {
        self.cells.into_par_iter().map(|(_, members)| members).collect()
    }
}
