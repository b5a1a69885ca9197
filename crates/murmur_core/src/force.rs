//! Steering force model.
//!
//! A pure function of one boid's state, its cell aggregate and the
//! configuration. The aggregate always includes the boid itself, so its own
//! contribution is subtracted before anything is averaged.

use crate::aggregate::CellAggregate;
use crate::config::{FlockConfig, Weights};
use crate::math::{min_face_distance, safe_normalize, Vec3};

/// Configuration subset read by [`steering_force`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ForceParams {
    pub cell_size: f32,
    pub cage_half_extent: f32,
    pub avoid_walls_turn_dist: f32,
    pub weights: Weights,
}

impl From<&FlockConfig> for ForceParams {
    fn from(config: &FlockConfig) -> Self {
        Self {
            cell_size: config.perception_radius,
            cage_half_extent: config.cage_half_extent,
            avoid_walls_turn_dist: config.avoid_walls_turn_dist,
            weights: config.weights,
        }
    }
}

/// The four weighted terms, kept apart for inspection.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SteeringTerms {
    pub separation: Vec3,
    pub cohesion: Vec3,
    pub alignment: Vec3,
    pub avoid_walls: Vec3,
}

impl SteeringTerms {
    /// Unclamped sum of all terms.
    #[inline]
    pub fn total(&self) -> Vec3 {
        self.separation + self.cohesion + self.alignment + self.avoid_walls
    }
}

/// Evaluate every steering term for a boid at `position` heading `heading`.
pub fn steering_terms(
    position: Vec3,
    heading: Vec3,
    cell: &CellAggregate,
    params: &ForceParams,
) -> SteeringTerms {
    let mut terms = SteeringTerms::default();
    let weights = &params.weights;

    let nearby = cell.nearby_count();
    if nearby > 0 {
        let nearby = nearby as f32;
        let average_position = (cell.position_sum - position) / nearby;
        let average_heading = (cell.heading_sum - heading) / nearby;

        let distance_normalized =
            average_position.distance_squared(position) / (params.cell_size * params.cell_size);
        let need_to_leave = (1.0 - distance_normalized).max(0.0);

        let to_average = safe_normalize(average_position - position);
        terms.separation = -to_average * weights.separation * need_to_leave;
        terms.cohesion = to_average * weights.cohesion;
        terms.alignment = average_heading * weights.alignment;
    }

    if min_face_distance(position, params.cage_half_extent) < params.avoid_walls_turn_dist {
        terms.avoid_walls = -safe_normalize(position) * weights.avoid_walls;
    }

    terms
}

/// Total steering force. No magnitude clamp is applied.
#[inline]
pub fn steering_force(
    position: Vec3,
    heading: Vec3,
    cell: &CellAggregate,
    params: &ForceParams,
) -> Vec3 {
    steering_terms(position, heading, cell, params).total()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> ForceParams {
        ForceParams::from(&FlockConfig::default())
    }

    fn alone(index: usize, position: Vec3, heading: Vec3) -> CellAggregate {
        CellAggregate {
            representative: index,
            position_sum: position,
            heading_sum: heading,
            count: 1,
        }
    }

    #[test]
    fn lone_boid_far_from_walls_feels_nothing() {
        let cell = alone(0, Vec3::new(1.0, 2.0, 3.0), Vec3::Z);
        let force = steering_force(Vec3::new(1.0, 2.0, 3.0), Vec3::Z, &cell, &params());
        assert_eq!(force, Vec3::ZERO);
    }

    #[test]
    fn lone_boid_near_wall_turns_to_centre() {
        let params = params();
        let position = Vec3::new(22.0, 0.0, 0.0);
        let cell = alone(0, position, Vec3::X);
        let terms = steering_terms(position, Vec3::X, &cell, &params);
        assert_eq!(terms.separation, Vec3::ZERO);
        assert_eq!(terms.cohesion, Vec3::ZERO);
        assert_eq!(terms.alignment, Vec3::ZERO);
        assert_eq!(terms.avoid_walls, Vec3::NEG_X * params.weights.avoid_walls);
        assert_eq!(terms.total(), terms.avoid_walls);
    }

    #[test]
    fn pair_matches_closed_form() {
        let params = params();
        let a = Vec3::new(0.0, 0.0, 0.0);
        let b = Vec3::new(3.0, 0.0, 4.0) * 0.5; // distance 2.5
        let heading_a = Vec3::Z;
        let heading_b = Vec3::X;
        let cell = CellAggregate {
            representative: 0,
            position_sum: a + b,
            heading_sum: heading_a + heading_b,
            count: 2,
        };

        let terms = steering_terms(a, heading_a, &cell, &params);
        let dir = (b - a).normalize();
        let need_to_leave = 1.0 - (2.5 * 2.5) / (5.0 * 5.0);
        let w = params.weights;

        assert!(terms.separation.abs_diff_eq(-dir * w.separation * need_to_leave, 1e-5));
        assert!(terms.cohesion.abs_diff_eq(dir * w.cohesion, 1e-5));
        assert!(terms.alignment.abs_diff_eq(heading_b * w.alignment, 1e-5));
        assert_eq!(terms.avoid_walls, Vec3::ZERO);
    }

    #[test]
    fn separation_fades_at_one_cell_size() {
        let params = params();
        let a = Vec3::ZERO;
        let b = Vec3::new(6.0, 0.0, 0.0);
        let cell = CellAggregate {
            representative: 0,
            position_sum: a + b,
            heading_sum: Vec3::Z * 2.0,
            count: 2,
        };
        let terms = steering_terms(a, Vec3::Z, &cell, &params);
        assert_eq!(terms.separation, Vec3::ZERO);
        assert!(terms.cohesion.abs_diff_eq(Vec3::X * params.weights.cohesion, 1e-6));
    }

    #[test]
    fn coincident_neighbours_produce_no_nan() {
        let p = Vec3::new(1.0, 1.0, 1.0);
        let cell = CellAggregate {
            representative: 0,
            position_sum: p * 3.0,
            heading_sum: Vec3::Z * 3.0,
            count: 3,
        };
        let force = steering_force(p, Vec3::Z, &cell, &params());
        assert!(force.is_finite());
        assert!(force.abs_diff_eq(Vec3::Z * params().weights.alignment, 1e-5));
    }

    #[test]
    fn boid_at_origin_with_wall_closer_than_turn_distance_stays_finite() {
        let params = ForceParams {
            cage_half_extent: 1.0,
            avoid_walls_turn_dist: 5.0,
            ..params()
        };
        let cell = alone(0, Vec3::ZERO, Vec3::Z);
        assert_eq!(steering_force(Vec3::ZERO, Vec3::Z, &cell, &params), Vec3::ZERO);
    }
}
