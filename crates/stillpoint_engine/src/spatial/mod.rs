//! Spatial partitioning data structures
//!
//! Provides proximity queries over object positions for the scene pass.

mod hash_grid;
mod spatial_query;

pub use hash_grid::{CellKey, NearbyObject, SpatialError, SpatialHashGrid, SpatialStats};
pub use spatial_query::SpatialQuery;
