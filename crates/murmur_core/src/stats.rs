//! Flock statistics for logging and assertions.

use crate::math::Vec3;
use crate::store::Poses;
use rayon::prelude::*;

/// Summary of the committed state after the most recent tick.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FlockStats {
    pub population: usize,
    /// Occupied hash cells in the last tick.
    pub occupied_cells: usize,
    /// Average number of other boids sharing a boid's cell.
    pub mean_nearby: f32,
    /// Largest absolute position component over all boids.
    pub max_abs_coordinate: f32,
    /// Largest deviation of `|heading| * speed` from `speed`.
    pub max_speed_error: f32,
}

impl FlockStats {
    pub(crate) fn measure(poses: &Poses, speed: f32, occupied_cells: usize, mean_nearby: f32) -> Self {
        let max_abs_coordinate = poses
            .positions()
            .par_iter()
            .map(|p| p.abs().max_element())
            .reduce(|| 0.0, f32::max);
        let max_speed_error = poses
            .headings()
            .par_iter()
            .map(|h: &Vec3| (h.length() * speed - speed).abs())
            .reduce(|| 0.0, f32::max);

        Self {
            population: poses.len(),
            occupied_cells,
            mean_nearby,
            max_abs_coordinate,
            max_speed_error,
        }
    }
}
