//! Scene management
//!
//! Bounding volumes, frustum culling, distance-based level of detail and the
//! node registry the coordinator drives every scene pass.

pub mod bounds;
pub mod culling;
pub mod lod;
pub mod scene_graph;

pub use bounds::{Frustum, Plane, AABB};
pub use culling::{CullResult, CullingStats, VisibilityCuller, VisibilityRecord};
pub use lod::{select_tier, AdaptiveLodPolicy, LodLevel, LodManager, LodUpdate, QualityTier};
pub use scene_graph::{AdaptiveQuality, NodeKey, QualityChange, SceneGraph, SceneNode};
