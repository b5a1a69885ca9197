use crate::aggregate::MergeError;
use crate::schedule::{BufferId, StageHandle};
use thiserror::Error;

/// Errors that can occur while registering a stage with a graph.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StageGraphError {
    #[error("stage '{name}' is already registered")]
    DuplicateName { name: String },

    #[error("stage '{name}' does not access any buffers")]
    EmptyAccess { name: String },

    #[error("stage '{name}' depends on unregistered stage '{dependency}'")]
    UnknownDependency { name: String, dependency: String },

    #[error(
        "stage '{requested}' and stage '{existing}' both touch buffer '{buffer}' \
         with a write but are not ordered by a dependency"
    )]
    UnorderedAccess {
        buffer: BufferId,
        existing: String,
        requested: String,
        existing_handle: StageHandle,
    },
}

/// Reason a stage gave up.
#[derive(Debug, Error)]
pub enum StageFault {
    #[error(transparent)]
    Merge(#[from] MergeError),

    #[error("boid {index} produced a non-finite pose")]
    NonFinite { index: usize },

    #[error("buffer '{0}' was not produced by an earlier stage")]
    MissingInput(BufferId),

    #[error("buffer '{0}' is poisoned")]
    Poisoned(BufferId),

    #[error("panicked: {0}")]
    Panicked(String),
}

/// A stage failure, which aborts the whole tick.
#[derive(Debug, Error)]
#[error("stage '{stage}' aborted the tick: {fault}")]
pub struct StageError {
    pub stage: String,
    #[source]
    pub fault: StageFault,
}
