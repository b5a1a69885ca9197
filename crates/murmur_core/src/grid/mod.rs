//! Jittered spatial hashing.

mod jitter;
mod spatial_hash;

pub use jitter::GridJitter;
pub use spatial_hash::{CellKey, SpatialHashGrid};
