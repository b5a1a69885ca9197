//! Murmur Core
//!
//! Flocking simulation for a fixed population of boids in a cubic cage.
//! Neighbour aggregation runs through a per-tick pipeline:
//! - jittered spatial hashing into a concurrent multi-map
//! - a commutative per-cell reduction ("merge")
//! - a per-boid steering and constant-speed integration pass
//!
//! The stages are ordered by an explicit stage graph
//! (copy ∥ hash → merge → integrate) executed on rayon.
//!
//! ```ignore
//! let mut sim = murmur_core::initialize(500, FlockConfig::default())?;
//! let view = murmur_core::step(&mut sim, 1.0 / 60.0)?;
//! for transform in view.iter() { /* upload */ }
//! murmur_core::dispose(sim);
//! ```

pub mod aggregate;
pub mod config;
pub mod error;
pub mod force;
pub mod grid;
pub mod integrate;
pub mod math;
pub mod pipeline;
pub mod schedule;
pub mod simulation;
pub mod stats;
pub mod store;
pub mod time;
pub mod view;

pub use glam;

pub use aggregate::{CellAggregate, CellAggregates, MergeError};
pub use config::{ConfigError, FlockConfig, Weights};
pub use error::{SimulationError, TickError};
pub use force::{steering_force, steering_terms, ForceParams, SteeringTerms};
pub use grid::{CellKey, GridJitter, SpatialHashGrid};
pub use integrate::{integrate, Pose};
pub use simulation::Simulation;
pub use stats::FlockStats;
pub use store::{BoidStore, Poses, StoreError};
pub use view::{BoidTransform, TransformRaw, TransformView};

/// Engine version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Create a simulation of `population` randomly placed boids.
pub fn initialize(population: usize, config: FlockConfig) -> Result<Simulation, SimulationError> {
    Simulation::initialize(population, config)
}

/// Advance `simulation` by `delta_secs` seconds.
pub fn step(simulation: &mut Simulation, delta_secs: f32) -> Result<TransformView<'_>, TickError> {
    simulation.step(delta_secs)
}

/// Release a simulation.
pub fn dispose(simulation: Simulation) {
    simulation.dispose();
}
