//! Procedural asset generation and caching

pub mod geometry;
pub mod geometry_cache;

pub use geometry::{uv_sphere, GeometryGenerator, GeometryParams, MeshData, PebbleGenerator, Vertex};
pub use geometry_cache::{CacheStats, GeometryCache, DEFAULT_GEOMETRY_CAPACITY};
