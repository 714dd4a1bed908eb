//! Abstract spatial query interface
//!
//! Lets the scene code index object positions without committing to one
//! partitioning scheme (uniform grid, octree, BVH, ...).

use crate::foundation::math::Vec3;
use crate::scene::bounds::AABB;

/// Point-based spatial index
pub trait SpatialQuery<K> {
    /// Insert an object at a position, replacing any previous entry
    fn insert(&mut self, id: K, position: Vec3);

    /// Remove an object; returns whether it was present
    fn remove(&mut self, id: &K) -> bool;

    /// Move an object
    fn update(&mut self, id: K, position: Vec3);

    /// Objects whose position is within `radius` of `center`
    fn query_sphere(&self, center: Vec3, radius: f32) -> Vec<K>;

    /// Objects whose position lies inside `aabb`
    fn query_aabb(&self, aabb: &AABB) -> Vec<K>;

    /// Recorded position of an object
    fn position(&self, id: &K) -> Option<Vec3>;

    /// Remove every object
    fn clear(&mut self);

    /// Number of indexed objects
    fn entity_count(&self) -> usize;
}
