//! Explicit stage graph for the per-tick pipeline.
//!
//! Stages declare their dependencies and the buffers they touch; the graph
//! validates ordering at registration time and the executor enforces the
//! resulting barriers on every run.

mod executor;
mod stage_descriptor;
mod stage_error;
mod stage_graph;
mod stage_handle;

pub use executor::{Schedule, StageCompletion};
pub use stage_descriptor::{BufferId, StageDescriptor};
pub use stage_error::{StageError, StageFault, StageGraphError};
pub use stage_graph::StageGraph;
pub use stage_handle::StageHandle;
