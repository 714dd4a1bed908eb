//! Frustum visibility culling
//!
//! Objects register a world transform and optional local bounds. After a
//! camera update, [`VisibilityCuller::cull_objects`] classifies every object
//! against the camera frustum. Classification fails open: an object with no
//! usable bounds, or any object before the first camera update, is visible.

use std::borrow::Borrow;
use std::collections::HashMap;
use std::hash::Hash;

use super::bounds::{Frustum, AABB};
use crate::foundation::math::Mat4;
use crate::render::primitives::Camera;

/// Per-object culling state
#[derive(Debug, Clone, PartialEq)]
pub struct VisibilityRecord {
    /// Bounds in object space; `None` means unknown
    pub local_bounds: Option<AABB>,
    /// Object-to-world transform
    pub world_transform: Mat4,
    /// Result of the most recent `cull_objects`
    pub visible: bool,
}

impl VisibilityRecord {
    /// World-space bounds, if the object has usable local bounds
    pub fn world_bounds(&self) -> Option<AABB> {
        self.local_bounds
            .filter(|bounds| !bounds.is_empty())
            .map(|bounds| bounds.transformed(&self.world_transform))
    }
}

/// Partition produced by a cull pass
#[derive(Debug, Clone, PartialEq)]
pub struct CullResult<K> {
    /// Objects intersecting the frustum
    pub visible: Vec<K>,
    /// Objects entirely outside it
    pub hidden: Vec<K>,
}

/// Aggregate visibility counts
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CullingStats {
    /// Registered objects
    pub total_objects: usize,
    /// Objects intersecting the current frustum
    pub visible_count: usize,
    /// Objects outside it
    pub hidden_count: usize,
    /// `hidden / total`, zero for an empty culler
    pub culling_efficiency: f32,
}

/// Classifies registered objects against the camera frustum
#[derive(Debug, Clone)]
pub struct VisibilityCuller<K> {
    records: HashMap<K, VisibilityRecord>,
    frustum: Option<Frustum>,
}

impl<K> Default for VisibilityCuller<K> {
    fn default() -> Self {
        Self {
            records: HashMap::new(),
            frustum: None,
        }
    }
}

impl<K> VisibilityCuller<K>
where
    K: Eq + Hash + Clone,
{
    /// Create an empty culler with no camera yet
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an object, replacing any previous record with the same id
    pub fn add_object(&mut self, id: K, world_transform: Mat4, local_bounds: Option<AABB>) {
        self.records.insert(
            id,
            VisibilityRecord {
                local_bounds,
                world_transform,
                visible: true,
            },
        );
    }

    /// Unregister an object; returns whether it was registered
    pub fn remove_object<Q>(&mut self, id: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.records.remove(id).is_some()
    }

    /// Replace an object's world transform
    pub fn set_object_transform<Q>(&mut self, id: &Q, world_transform: Mat4) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        match self.records.get_mut(id) {
            Some(record) => {
                record.world_transform = world_transform;
                true
            }
            None => false,
        }
    }

    /// Replace an object's local bounds
    pub fn update_object_bounds<Q>(&mut self, id: &Q, local_bounds: Option<AABB>) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        match self.records.get_mut(id) {
            Some(record) => {
                record.local_bounds = local_bounds;
                true
            }
            None => false,
        }
    }

    /// Rebuild the frustum from the camera's `projection × view`
    pub fn update_camera(&mut self, camera: &Camera) {
        self.frustum = Some(Frustum::from_matrix(&camera.get_view_projection_matrix()));
    }

    /// Current frustum, `None` before the first camera update
    pub fn frustum(&self) -> Option<&Frustum> {
        self.frustum.as_ref()
    }

    /// Classify every object and store the result on its record
    pub fn cull_objects(&mut self) -> CullResult<K> {
        let mut result = CullResult {
            visible: Vec::with_capacity(self.records.len()),
            hidden: Vec::new(),
        };

        let frustum = self.frustum.as_ref();
        for (id, record) in self.records.iter_mut() {
            record.visible = classify(frustum, record);
            if record.visible {
                result.visible.push(id.clone());
            } else {
                result.hidden.push(id.clone());
            }
        }

        log::trace!(
            "Culled {} object(s): {} visible, {} hidden",
            self.records.len(),
            result.visible.len(),
            result.hidden.len()
        );
        result
    }

    /// Whether an object intersects the current frustum
    ///
    /// Computed on the spot without touching the stored classification.
    /// Unknown ids are not visible.
    pub fn is_visible<Q>(&self, id: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.records
            .get(id)
            .map_or(false, |record| classify(self.frustum.as_ref(), record))
    }

    /// Flag written by the most recent `cull_objects`
    pub fn classification<Q>(&self, id: &Q) -> Option<bool>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.records.get(id).map(|record| record.visible)
    }

    /// Stored record for an object
    pub fn record<Q>(&self, id: &Q) -> Option<&VisibilityRecord>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.records.get(id)
    }

    /// Ids currently intersecting the frustum
    pub fn visible_objects(&self) -> Vec<K> {
        let frustum = self.frustum.as_ref();
        self.records
            .iter()
            .filter(|(_, record)| classify(frustum, record))
            .map(|(id, _)| id.clone())
            .collect()
    }

    /// Visibility counts against the current frustum
    pub fn stats(&self) -> CullingStats {
        let frustum = self.frustum.as_ref();
        let total_objects = self.records.len();
        let visible_count = self
            .records
            .values()
            .filter(|record| classify(frustum, record))
            .count();
        let hidden_count = total_objects - visible_count;
        let culling_efficiency = if total_objects > 0 {
            hidden_count as f32 / total_objects as f32
        } else {
            0.0
        };

        CullingStats {
            total_objects,
            visible_count,
            hidden_count,
            culling_efficiency,
        }
    }

    /// Number of registered objects
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether no objects are registered
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Unregister everything; the frustum is kept
    pub fn clear(&mut self) {
        self.records.clear();
    }
}

fn classify(frustum: Option<&Frustum>, record: &VisibilityRecord) -> bool {
    match (frustum, record.world_bounds()) {
        (Some(frustum), Some(bounds)) => frustum.intersects_aabb(&bounds),
        _ => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::Vec3;
    use approx::assert_relative_eq;

    fn unit_bounds() -> Option<AABB> {
        Some(AABB::from_center_extents(Vec3::zeros(), Vec3::new(0.5, 0.5, 0.5)))
    }

    fn at(x: f32, y: f32, z: f32) -> Mat4 {
        Mat4::new_translation(&Vec3::new(x, y, z))
    }

    fn front_camera() -> Camera {
        Camera::perspective(Vec3::new(0.0, 0.0, 10.0), 60.0, 1.0, 0.1, 100.0)
    }

    #[test]
    fn test_everything_visible_before_first_camera() {
        let mut culler = VisibilityCuller::new();
        culler.add_object("behind", at(0.0, 0.0, 50.0), unit_bounds());
        assert!(culler.is_visible("behind"));

        let result = culler.cull_objects();
        assert_eq!(result.visible, vec!["behind"]);
        assert!(result.hidden.is_empty());
    }

    #[test]
    fn test_missing_or_empty_bounds_fail_open() {
        let mut culler = VisibilityCuller::new();
        culler.add_object("no-bounds", at(0.0, 0.0, 50.0), None);
        culler.add_object("empty-bounds", at(0.0, 0.0, 50.0), Some(AABB::empty()));
        culler.add_object("bounded", at(0.0, 0.0, 50.0), unit_bounds());

        // (position, target, object in view)
        let views = [
            (Vec3::new(0.0, 0.0, 10.0), Vec3::zeros(), false),
            (Vec3::new(0.0, 0.0, 10.0), Vec3::new(0.0, 0.0, 100.0), true),
            (Vec3::new(0.0, 0.0, 60.0), Vec3::new(0.0, 0.0, 200.0), false),
            (Vec3::new(100.0, 0.0, 50.0), Vec3::new(300.0, 0.0, 50.0), false),
            (Vec3::new(-40.0, 5.0, 50.0), Vec3::new(-40.0, 5.0, -100.0), false),
            (Vec3::new(-40.0, 0.0, 50.0), Vec3::new(0.0, 0.0, 50.0), true),
        ];
        for (position, target, in_view) in views {
            let mut camera = Camera::perspective(position, 60.0, 1.0, 0.1, 500.0);
            camera.look_at(target, Vec3::y());
            culler.update_camera(&camera);

            assert!(culler.is_visible("no-bounds"), "hidden from {:?}", position);
            assert!(culler.is_visible("empty-bounds"), "hidden from {:?}", position);
            assert_eq!(culler.is_visible("bounded"), in_view, "view from {:?}", position);

            let result = culler.cull_objects();
            assert!(result.visible.contains(&"no-bounds"));
            assert!(result.visible.contains(&"empty-bounds"));
            assert_eq!(result.hidden.len(), usize::from(!in_view));
        }
    }

    #[test]
    fn test_cull_partitions_and_records_flags() {
        let mut culler = VisibilityCuller::new();
        culler.update_camera(&front_camera());
        culler.add_object("center", at(0.0, 0.0, 0.0), unit_bounds());
        culler.add_object("behind", at(0.0, 0.0, 20.0), unit_bounds());
        culler.add_object("left", at(-80.0, 0.0, 0.0), unit_bounds());

        let mut result = culler.cull_objects();
        result.hidden.sort();
        assert_eq!(result.visible, vec!["center"]);
        assert_eq!(result.hidden, vec!["behind", "left"]);
        assert_eq!(culler.classification("behind"), Some(false));
        assert_eq!(culler.classification("center"), Some(true));
        assert_eq!(culler.classification("unknown"), None);
    }

    #[test]
    fn test_is_visible_does_not_mutate_classification() {
        let mut culler = VisibilityCuller::new();
        culler.update_camera(&front_camera());
        culler.add_object("mover", at(0.0, 0.0, 0.0), unit_bounds());
        culler.cull_objects();

        culler.set_object_transform("mover", at(0.0, 0.0, 30.0));
        assert!(!culler.is_visible("mover"));
        assert_eq!(culler.classification("mover"), Some(true));
        assert!(!culler.is_visible("unknown"));
    }

    #[test]
    fn test_stats_and_visible_objects() {
        let mut culler = VisibilityCuller::new();
        assert_eq!(culler.stats(), CullingStats::default());

        culler.update_camera(&front_camera());
        culler.add_object(1_u32, at(0.0, 0.0, 0.0), unit_bounds());
        culler.add_object(2, at(0.0, 0.0, 0.0), unit_bounds());
        culler.add_object(3, at(0.0, 0.0, 40.0), unit_bounds());
        culler.add_object(4, at(0.0, 300.0, 0.0), unit_bounds());

        let stats = culler.stats();
        assert_eq!(stats.total_objects, 4);
        assert_eq!(stats.visible_count, 2);
        assert_eq!(stats.hidden_count, 2);
        assert_relative_eq!(stats.culling_efficiency, 0.5);

        let mut visible = culler.visible_objects();
        visible.sort();
        assert_eq!(visible, vec![1, 2]);
    }

    #[test]
    fn test_bounds_update_and_removal() {
        let mut culler = VisibilityCuller::new();
        culler.update_camera(&front_camera());
        culler.add_object("rock", at(0.0, 0.0, 20.0), None);
        assert!(culler.is_visible("rock"));

        assert!(culler.update_object_bounds("rock", unit_bounds()));
        assert!(!culler.is_visible("rock"));

        assert!(culler.remove_object("rock"));
        assert!(!culler.remove_object("rock"));
        assert!(!culler.update_object_bounds("rock", None));
        assert!(culler.is_empty());
    }
}
