//! Flock configuration
//!
//! A single value passed to [`crate::initialize`] and threaded through every
//! stage of every tick. There is no global instance.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors detected by [`FlockConfig::validate`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("perception radius must be finite and > 0 (got {0})")]
    PerceptionRadius(f32),

    #[error("boid speed must be finite and > 0 (got {0})")]
    BoidSpeed(f32),

    #[error("cage half extent must be finite and > 0 (got {0})")]
    CageHalfExtent(f32),

    #[error("avoid-walls turn distance must be finite and >= 0 (got {0})")]
    AvoidWallsTurnDist(f32),

    #[error("{name} must be finite and >= 0 (got {value})")]
    Weight { name: &'static str, value: f32 },

    #[error("worker thread count must be > 0 when set")]
    WorkerThreads,

    #[error("cage spans {cells} cells per half extent, limit is {limit}")]
    CellResolution { cells: f32, limit: f32 },
}

/// Upper bound on `(cage_half_extent + max jitter offset) / perception_radius`.
///
/// Cell coordinates are `i32` computed through `f32`. Keeping the cage within
/// 2^20 cells leaves room for boids that overshoot the walls by orders of
/// magnitude before the coordinate saturates or loses integer precision.
pub const MAX_CELLS_PER_HALF_EXTENT: f32 = (1u32 << 20) as f32;

/// Steering weights applied to the four force terms.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Weights {
    pub separation: f32,
    pub cohesion: f32,
    pub alignment: f32,
    pub avoid_walls: f32,
}

impl Default for Weights {
    fn default() -> Self {
        Self {
            separation: 10.0,
            cohesion: 1.0,
            alignment: 5.0,
            avoid_walls: 20.0,
        }
    }
}

/// Everything a simulation needs besides its population.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlockConfig {
    /// Neighbour influence distance, also the spatial hash cell size.
    pub perception_radius: f32,
    /// Constant speed of every boid.
    pub boid_speed: f32,
    /// Half the edge length of the origin-centred cage.
    pub cage_half_extent: f32,
    /// Distance from the nearest face at which boids start turning back.
    pub avoid_walls_turn_dist: f32,
    pub weights: Weights,
    /// Dedicated rayon pool size. `None` runs on the global pool.
    pub worker_threads: Option<usize>,
    /// Seed for initial placement and per-tick grid jitter.
    pub seed: u64,
}

impl Default for FlockConfig {
    fn default() -> Self {
        Self {
            perception_radius: 5.0,
            boid_speed: 10.0,
            cage_half_extent: 25.0,
            avoid_walls_turn_dist: 5.0,
            weights: Weights::default(),
            worker_threads: None,
            seed: 0,
        }
    }
}

impl FlockConfig {
    /// Set the cage from its full edge length.
    pub fn with_cage_size(mut self, cage_size: f32) -> Self {
        self.cage_half_extent = cage_size / 2.0;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_weights(mut self, weights: Weights) -> Self {
        self.weights = weights;
        self
    }

    /// Reject out-of-range values. Nothing is clamped or defaulted.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.perception_radius.is_finite() && self.perception_radius > 0.0) {
            return Err(ConfigError::PerceptionRadius(self.perception_radius));
        }
        if !(self.boid_speed.is_finite() && self.boid_speed > 0.0) {
            return Err(ConfigError::BoidSpeed(self.boid_speed));
        }
        if !(self.cage_half_extent.is_finite() && self.cage_half_extent > 0.0) {
            return Err(ConfigError::CageHalfExtent(self.cage_half_extent));
        }
        if !(self.avoid_walls_turn_dist.is_finite() && self.avoid_walls_turn_dist >= 0.0) {
            return Err(ConfigError::AvoidWallsTurnDist(self.avoid_walls_turn_dist));
        }

        let weights = [
            ("separation weight", self.weights.separation),
            ("cohesion weight", self.weights.cohesion),
            ("alignment weight", self.weights.alignment),
            ("avoid-walls weight", self.weights.avoid_walls),
        ];
        for (name, value) in weights {
            if !(value.is_finite() && value >= 0.0) {
                return Err(ConfigError::Weight { name, value });
            }
        }

        if self.worker_threads == Some(0) {
            return Err(ConfigError::WorkerThreads);
        }

        let cells = (self.cage_half_extent + self.max_jitter_offset()) / self.perception_radius;
        if !(cells <= MAX_CELLS_PER_HALF_EXTENT) {
            return Err(ConfigError::CellResolution {
                cells,
                limit: MAX_CELLS_PER_HALF_EXTENT,
            });
        }
        Ok(())
    }

    /// Maximum per-axis jitter offset applied before hashing.
    #[inline]
    pub fn max_jitter_offset(&self) -> f32 {
        self.perception_radius / 2.0
    }
}
