//! Errors surfaced to the host.

use crate::config::ConfigError;
use crate::schedule::{StageError, StageGraphError};
use crate::store::StoreError;
use thiserror::Error;

/// Failure to create a simulation.
#[derive(Debug, Error)]
pub enum SimulationError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("invalid initial state: {0}")]
    Store(#[from] StoreError),

    #[error("invalid stage graph: {0}")]
    Schedule(#[from] StageGraphError),

    #[error("failed to start worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

/// Failure of a single tick. The store is left at its pre-tick state.
#[derive(Debug, Error)]
pub enum TickError {
    #[error("delta time must be finite and >= 0 (got {0})")]
    InvalidDeltaTime(f32),

    #[error(transparent)]
    Stage(#[from] StageError),
}
