//! Rendering-side primitives
//!
//! The camera that drives culling and LOD, and pooled dynamic objects.

pub mod dynamic;
pub mod primitives;

pub use dynamic::{PoolHandle, PoolStats, Poolable, PooledNode, ResourcePool};
pub use primitives::Camera;
