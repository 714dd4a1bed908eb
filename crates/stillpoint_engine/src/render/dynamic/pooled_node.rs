//! Poolable scene node and the particle pool built from it

use std::sync::Arc;

use super::resource_pool::{Poolable, ResourcePool};
use crate::assets::geometry::MeshData;
use crate::core::config::PoolConfig;
use crate::foundation::math::{Transform, Vec3};

/// Default free-list ceiling for particle pools
pub const DEFAULT_PARTICLE_POOL_SIZE: usize = 5000;

/// Lightweight scene node that lives in a [`ResourcePool`]
///
/// Carries just enough state for simple motion: a transform, a velocity and
/// an age. Geometry is shared, never owned.
#[derive(Debug, Clone)]
pub struct PooledNode {
    /// World transform
    pub transform: Transform,
    /// Units per second
    pub velocity: Vec3,
    /// Seconds since the node was last acquired
    pub age: f32,
    visible: bool,
    geometry: Option<Arc<MeshData>>,
}

impl Default for PooledNode {
    fn default() -> Self {
        Self {
            transform: Transform::identity(),
            velocity: Vec3::zeros(),
            age: 0.0,
            visible: false,
            geometry: None,
        }
    }
}

impl PooledNode {
    /// Hidden node at the origin with no geometry
    pub fn new() -> Self {
        Self::default()
    }

    /// Hidden node sharing `geometry`
    pub fn with_geometry(geometry: Arc<MeshData>) -> Self {
        Self {
            geometry: Some(geometry),
            ..Self::default()
        }
    }

    /// Whether the node is checked out and shown
    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// Shared geometry, if any
    pub fn geometry(&self) -> Option<&Arc<MeshData>> {
        self.geometry.as_ref()
    }

    /// Swap the shared geometry
    pub fn set_geometry(&mut self, geometry: Option<Arc<MeshData>>) {
        self.geometry = geometry;
    }

    /// Integrate velocity and age over `dt` seconds
    pub fn advance(&mut self, dt: f32) {
        self.transform.position += self.velocity * dt;
        self.age += dt;
    }
}

impl Poolable for PooledNode {
    fn set_active(&mut self, active: bool) {
        self.visible = active;
    }

    fn transform_mut(&mut self) -> &mut Transform {
        &mut self.transform
    }

    fn reset(&mut self) {
        self.transform.reset();
        self.velocity = Vec3::zeros();
        self.age = 0.0;
    }

    fn dispose(&mut self) {
        self.geometry = None;
    }
}

/// Pool of particle nodes
pub type ParticlePool = ResourcePool<PooledNode>;

/// Particle pool sharing one mesh, with the default ceiling of 5000
pub fn particle_pool(geometry: Option<Arc<MeshData>>) -> ParticlePool {
    particle_pool_with_size(geometry, DEFAULT_PARTICLE_POOL_SIZE)
}

/// Particle pool sharing one mesh, with an explicit ceiling
pub fn particle_pool_with_size(geometry: Option<Arc<MeshData>>, max_size: usize) -> ParticlePool {
    ResourcePool::new(
        move || geometry.clone().map_or_else(PooledNode::new, PooledNode::with_geometry),
        max_size,
    )
}

/// Particle pool sized and pre-filled from configuration
pub fn particle_pool_from_config(geometry: Option<Arc<MeshData>>, config: &PoolConfig) -> ParticlePool {
    let mut pool = particle_pool_with_size(geometry, config.particle_max_size);
    pool.pre_allocate(config.preallocate);
    pool
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::geometry::uv_sphere;
    use approx::assert_relative_eq;

    #[test]
    fn test_particle_pool_defaults() {
        let pool = particle_pool(None);
        assert_eq!(pool.max_size(), 5000);
    }

    #[test]
    fn test_particles_share_geometry() {
        let mesh = Arc::new(uv_sphere(0.05, 4, 3));
        let mut pool = particle_pool(Some(Arc::clone(&mesh)));
        let a = pool.acquire();
        let b = pool.acquire();

        let ga = pool.get(a).and_then(PooledNode::geometry).unwrap();
        let gb = pool.get(b).and_then(PooledNode::geometry).unwrap();
        assert!(Arc::ptr_eq(ga, gb));
        assert!(Arc::ptr_eq(ga, &mesh));
    }

    #[test]
    fn test_set_geometry_swaps_the_mesh() {
        let coarse = Arc::new(uv_sphere(0.05, 4, 3));
        let fine = Arc::new(uv_sphere(0.05, 16, 12));
        let mut pool = particle_pool(Some(Arc::clone(&coarse)));
        let handle = pool.acquire();

        let node = pool.get_mut(handle).unwrap();
        node.set_geometry(Some(Arc::clone(&fine)));
        assert!(Arc::ptr_eq(node.geometry().unwrap(), &fine));
        assert_eq!(Arc::strong_count(&coarse), 2);

        node.set_geometry(None);
        assert!(node.geometry().is_none());
        assert_eq!(Arc::strong_count(&fine), 1);
    }

    #[test]
    fn test_release_resets_motion() {
        let mut pool = particle_pool(None);
        let handle = pool.acquire();
        {
            let node = pool.get_mut(handle).unwrap();
            assert!(node.is_visible());
            node.velocity = Vec3::new(0.0, 2.0, 0.0);
            node.advance(0.5);
            assert_relative_eq!(node.transform.position.y, 1.0);
            assert_relative_eq!(node.age, 0.5);
        }

        pool.release(handle);
        let node = pool.get(handle).unwrap();
        assert!(!node.is_visible());
        assert!(node.transform.is_identity());
        assert_eq!(node.velocity, Vec3::zeros());
        assert_relative_eq!(node.age, 0.0);
    }

    #[test]
    fn test_pool_from_config_preallocates() {
        let config = PoolConfig {
            particle_max_size: 8,
            preallocate: 20,
            ..PoolConfig::default()
        };
        let pool = particle_pool_from_config(None, &config);
        assert_eq!(pool.max_size(), 8);
        assert_eq!(pool.stats().pool_size, 8);
    }
}
