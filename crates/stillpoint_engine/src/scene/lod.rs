//! Distance-based level of detail
//!
//! [`LodManager`] tracks object positions against the camera and reports
//! tier changes. [`AdaptiveLodPolicy`] picks the distance thresholds to use
//! from the current [`PerformanceTier`], so a struggling frame rate pulls
//! every object towards cheaper geometry.

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::collections::HashMap;
use std::hash::Hash;

use crate::config::ConfigError;
use crate::diagnostics::PerformanceTier;
use crate::foundation::math::Vec3;
use crate::render::primitives::Camera;

/// Geometry quality tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum QualityTier {
    /// Coarsest geometry
    Low,
    /// Intermediate geometry
    Medium,
    /// Full detail
    High,
}

impl Default for QualityTier {
    fn default() -> Self {
        Self::High
    }
}

impl std::fmt::Display for QualityTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        };
        f.write_str(name)
    }
}

/// One distance threshold: at `distance` or further, use `tier`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LodLevel {
    /// Camera distance at which this tier starts
    pub distance: f32,
    /// Tier used from this distance on
    pub tier: QualityTier,
}

impl LodLevel {
    /// Create a level
    pub const fn new(distance: f32, tier: QualityTier) -> Self {
        Self { distance, tier }
    }
}

/// Tier of the largest threshold not exceeding `distance`
///
/// Returns [`QualityTier::High`] when the object is closer than every
/// threshold (or there are none). Levels do not need to be sorted.
pub fn select_tier(levels: &[LodLevel], distance: f32) -> QualityTier {
    levels
        .iter()
        .filter(|level| level.distance <= distance)
        .max_by(|a, b| a.distance.total_cmp(&b.distance))
        .map(|level| level.tier)
        .unwrap_or_default()
}

/// A tier change reported by [`LodManager::update_lod`]
#[derive(Debug, Clone, PartialEq)]
pub struct LodUpdate<K> {
    /// Object whose tier changed
    pub id: K,
    /// Newly selected tier
    pub tier: QualityTier,
    /// Camera distance that produced it
    pub distance: f32,
}

#[derive(Debug, Clone)]
struct LodObject {
    position: Vec3,
    levels: Vec<LodLevel>,
    current: QualityTier,
}

/// Tracks per-object LOD tiers relative to a camera position
#[derive(Debug, Clone)]
pub struct LodManager<K> {
    objects: HashMap<K, LodObject>,
    camera_position: Vec3,
}

impl<K> Default for LodManager<K> {
    fn default() -> Self {
        Self {
            objects: HashMap::new(),
            camera_position: Vec3::zeros(),
        }
    }
}

impl<K> LodManager<K>
where
    K: Eq + Hash + Clone,
{
    /// Create an empty manager with the camera at the origin
    pub fn new() -> Self {
        Self::default()
    }

    /// Track an object; its tier starts at [`QualityTier::High`]
    ///
    /// Re-adding an id replaces its levels and resets its tier.
    pub fn add_object(&mut self, id: K, position: Vec3, mut levels: Vec<LodLevel>) {
        levels.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        self.objects.insert(
            id,
            LodObject {
                position,
                levels,
                current: QualityTier::High,
            },
        );
    }

    /// Stop tracking an object; returns whether it was tracked
    pub fn remove_object<Q>(&mut self, id: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.objects.remove(id).is_some()
    }

    /// Move an object; returns whether it was tracked
    pub fn set_object_position<Q>(&mut self, id: &Q, position: Vec3) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        match self.objects.get_mut(id) {
            Some(object) => {
                object.position = position;
                true
            }
            None => false,
        }
    }

    /// Take the camera position from a camera
    pub fn update_camera(&mut self, camera: &Camera) {
        self.camera_position = camera.position;
    }

    /// Set the camera position directly
    pub fn set_camera_position(&mut self, position: Vec3) {
        self.camera_position = position;
    }

    /// Recompute every tier; returns only the objects whose tier changed
    pub fn update_lod(&mut self) -> Vec<LodUpdate<K>> {
        let camera = self.camera_position;
        let mut updates = Vec::new();

        for (id, object) in self.objects.iter_mut() {
            let distance = (object.position - camera).magnitude();
            let tier = select_tier(&object.levels, distance);
            if tier != object.current {
                object.current = tier;
                updates.push(LodUpdate {
                    id: id.clone(),
                    tier,
                    distance,
                });
            }
        }

        if !updates.is_empty() {
            log::debug!("LOD changed for {} object(s)", updates.len());
        }
        updates
    }

    /// Current tier of an object
    pub fn lod<Q>(&self, id: &Q) -> Option<QualityTier>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.objects.get(id).map(|object| object.current)
    }

    /// Camera distance of an object
    pub fn distance<Q>(&self, id: &Q) -> Option<f32>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.objects
            .get(id)
            .map(|object| (object.position - self.camera_position).magnitude())
    }

    /// Number of tracked objects
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// Whether nothing is tracked
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Stop tracking everything
    pub fn clear(&mut self) {
        self.objects.clear();
    }
}

/// Distance thresholds per performance tier
///
/// Lower performance tiers reach for coarser geometry sooner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdaptiveLodPolicy {
    /// Thresholds used while the frame rate is low
    pub low: Vec<LodLevel>,
    /// Thresholds used at a medium frame rate
    pub medium: Vec<LodLevel>,
    /// Thresholds used while the frame rate is high
    pub high: Vec<LodLevel>,
}

impl Default for AdaptiveLodPolicy {
    fn default() -> Self {
        Self {
            low: vec![
                LodLevel::new(0.0, QualityTier::Medium),
                LodLevel::new(20.0, QualityTier::Low),
            ],
            medium: vec![
                LodLevel::new(0.0, QualityTier::High),
                LodLevel::new(15.0, QualityTier::Medium),
                LodLevel::new(25.0, QualityTier::Low),
            ],
            high: vec![
                LodLevel::new(0.0, QualityTier::High),
                LodLevel::new(30.0, QualityTier::Medium),
            ],
        }
    }
}

impl AdaptiveLodPolicy {
    /// Thresholds for a performance tier
    pub fn levels_for(&self, performance: PerformanceTier) -> &[LodLevel] {
        match performance {
            PerformanceTier::Low => &self.low,
            PerformanceTier::Medium => &self.medium,
            PerformanceTier::High => &self.high,
        }
    }

    /// Quality tier for an object at `distance` under `performance`
    pub fn target_tier(&self, performance: PerformanceTier, distance: f32) -> QualityTier {
        select_tier(self.levels_for(performance), distance)
    }

    /// Validate the thresholds
    pub fn validate(&self) -> Result<(), ConfigError> {
        let all = self.low.iter().chain(&self.medium).chain(&self.high);
        for level in all {
            if !level.distance.is_finite() || level.distance < 0.0 {
                return Err(ConfigError::Invalid(format!(
                    "LOD threshold distance must be finite and non-negative, got {}",
                    level.distance
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn three_levels() -> Vec<LodLevel> {
        vec![
            LodLevel::new(25.0, QualityTier::Low),
            LodLevel::new(0.0, QualityTier::High),
            LodLevel::new(15.0, QualityTier::Medium),
        ]
    }

    #[test]
    fn test_select_tier_picks_largest_threshold_below_distance() {
        let levels = three_levels();
        assert_eq!(select_tier(&levels, 5.0), QualityTier::High);
        assert_eq!(select_tier(&levels, 15.0), QualityTier::Medium);
        assert_eq!(select_tier(&levels, 24.9), QualityTier::Medium);
        assert_eq!(select_tier(&levels, 80.0), QualityTier::Low);
    }

    #[test]
    fn test_select_tier_defaults_to_high() {
        assert_eq!(select_tier(&[], 100.0), QualityTier::High);
        let far_only = [LodLevel::new(50.0, QualityTier::Low)];
        assert_eq!(select_tier(&far_only, 10.0), QualityTier::High);
    }

    #[test]
    fn test_update_lod_reports_only_changes() {
        let mut lod = LodManager::new();
        lod.add_object("near".to_string(), Vec3::new(0.0, 0.0, 5.0), three_levels());
        lod.add_object("far".to_string(), Vec3::new(0.0, 0.0, 40.0), three_levels());
        assert_eq!(lod.lod("near"), Some(QualityTier::High));

        let updates = lod.update_lod();
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].id, "far");
        assert_eq!(updates[0].tier, QualityTier::Low);
        assert_relative_eq!(updates[0].distance, 40.0);

        assert!(lod.update_lod().is_empty());

        lod.set_camera_position(Vec3::new(0.0, 0.0, 20.0));
        let mut updates = lod.update_lod();
        updates.sort_by(|a, b| a.id.cmp(&b.id));
        assert_eq!(updates.len(), 2);
        assert_eq!((updates[0].id.as_str(), updates[0].tier), ("far", QualityTier::Medium));
        assert_eq!((updates[1].id.as_str(), updates[1].tier), ("near", QualityTier::Medium));
    }

    #[test]
    fn test_camera_and_object_moves() {
        let mut lod = LodManager::new();
        lod.add_object(7_u32, Vec3::zeros(), three_levels());

        let camera = Camera::perspective(Vec3::new(0.0, 0.0, 30.0), 60.0, 1.0, 0.1, 100.0);
        lod.update_camera(&camera);
        assert_relative_eq!(lod.distance(&7).unwrap(), 30.0);

        assert!(lod.set_object_position(&7, Vec3::new(0.0, 0.0, 20.0)));
        assert!(!lod.set_object_position(&8, Vec3::zeros()));
        assert_relative_eq!(lod.distance(&7).unwrap(), 10.0);
        assert!(lod.update_lod().is_empty());

        assert!(lod.remove_object(&7));
        assert!(lod.lod(&7).is_none());
        assert!(lod.is_empty());
    }

    #[test]
    fn test_adaptive_policy_defaults() {
        let policy = AdaptiveLodPolicy::default();
        assert_eq!(policy.target_tier(PerformanceTier::Low, 5.0), QualityTier::Medium);
        assert_eq!(policy.target_tier(PerformanceTier::Low, 20.0), QualityTier::Low);
        assert_eq!(policy.target_tier(PerformanceTier::Medium, 10.0), QualityTier::High);
        assert_eq!(policy.target_tier(PerformanceTier::Medium, 18.0), QualityTier::Medium);
        assert_eq!(policy.target_tier(PerformanceTier::Medium, 30.0), QualityTier::Low);
        assert_eq!(policy.target_tier(PerformanceTier::High, 29.0), QualityTier::High);
        assert_eq!(policy.target_tier(PerformanceTier::High, 500.0), QualityTier::Medium);
        assert!(policy.validate().is_ok());
    }

    #[test]
    fn test_negative_threshold_rejected() {
        let mut policy = AdaptiveLodPolicy::default();
        policy.medium.push(LodLevel::new(-1.0, QualityTier::Low));
        assert!(policy.validate().is_err());
    }
}
