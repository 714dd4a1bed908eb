//! Pebble garden nodes
//!
//! Each pebble owns a transform and a shared mesh from the geometry cache.
//! When the scene pass moves a pebble to another quality tier the mesh is
//! swapped for the cached one matching the new tier and camera distance.

use std::sync::Arc;

use rand::prelude::*;
use stillpoint_engine::assets::{GeometryCache, GeometryParams, MeshData, PebbleGenerator};
use stillpoint_engine::foundation::math::{Mat4, Quat, Transform, Vec3};
use stillpoint_engine::scene::{AdaptiveQuality, QualityChange, QualityTier, SceneNode, AABB};
use stillpoint_engine::scheduler::{TaskError, TaskResult};
use stillpoint_engine::{CoordinatorError, SceneCoordinator};

/// Radius of the ring pebbles are scattered on
const GARDEN_RADIUS: f32 = 40.0;

/// A single pebble in the garden
pub struct PebbleNode {
    id: String,
    transform: Transform,
    is_static: bool,
    quality: QualityTier,
    mesh: Arc<MeshData>,
    rebuilds: u32,
}

impl PebbleNode {
    /// Create a pebble with a high quality mesh
    pub fn new(id: impl Into<String>, transform: Transform, is_static: bool, geometry: &mut GeometryCache) -> Self {
        let quality = QualityTier::default();
        let params = GeometryParams::for_quality(quality, 0.0, is_static);
        let mesh = geometry.get_or_generate(&params, &PebbleGenerator);
        Self {
            id: id.into(),
            transform,
            is_static,
            quality,
            mesh,
            rebuilds: 0,
        }
    }
}

impl SceneNode for PebbleNode {
    fn id(&self) -> &str {
        &self.id
    }

    fn world_transform(&self) -> Mat4 {
        self.transform.to_matrix()
    }

    fn local_bounds(&self) -> Option<AABB> {
        Some(self.mesh.bounds())
    }

    fn as_adaptive(&self) -> Option<&dyn AdaptiveQuality> {
        Some(self)
    }

    fn as_adaptive_mut(&mut self) -> Option<&mut dyn AdaptiveQuality> {
        Some(self)
    }
}

impl AdaptiveQuality for PebbleNode {
    fn quality(&self) -> QualityTier {
        self.quality
    }

    fn apply_quality(&mut self, change: &QualityChange, geometry: &mut GeometryCache) -> TaskResult {
        let params = GeometryParams::for_quality(change.tier, change.distance, self.is_static);
        let mesh = geometry.get_or_generate(&params, &PebbleGenerator);
        if mesh.triangle_count() == 0 {
            return Err(TaskError::failed(format!("empty mesh for '{}'", params.cache_key())));
        }

        self.mesh = mesh;
        self.quality = change.tier;
        self.rebuilds += 1;
        log::trace!(
            "Pebble '{}' now {} ({} triangles, rebuild #{})",
            self.id,
            self.quality,
            self.mesh.triangle_count(),
            self.rebuilds
        );
        Ok(())
    }
}

/// Scatter `count` pebbles on a ring around the origin
///
/// Every third pebble is static. The layout is reproducible for a seed.
pub fn scatter(coordinator: &mut SceneCoordinator, count: usize, seed: u64) -> Result<(), CoordinatorError> {
    let mut rng = StdRng::seed_from_u64(seed);
    for index in 0..count {
        let angle = rng.gen_range(0.0..std::f32::consts::TAU);
        let radius = rng.gen_range(2.0..GARDEN_RADIUS);
        let position = Vec3::new(angle.cos() * radius, 0.0, angle.sin() * radius);

        let mut transform = Transform::from_position_scale(position, rng.gen_range(0.6..1.4));
        transform.rotation = Quat::from_axis_angle(&Vec3::y_axis(), rng.gen_range(0.0..std::f32::consts::TAU));

        let pebble = PebbleNode::new(
            format!("pebble-{index}"),
            transform,
            index % 3 == 0,
            &mut coordinator.context_mut().geometry,
        );
        coordinator.add_node(Box::new(pebble))?;
    }
    log::info!("Scattered {} pebbles", count);
    Ok(())
}
