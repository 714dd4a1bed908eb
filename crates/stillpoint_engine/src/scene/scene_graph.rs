//! Scene node traits and the node registry
//!
//! Host objects join the scene by implementing [`SceneNode`]. Nodes that can
//! trade detail for speed additionally implement [`AdaptiveQuality`] and
//! expose it through [`SceneNode::as_adaptive_mut`]; the scene pass checks
//! for the capability instead of guessing at a node's internals.

use slotmap::{new_key_type, SlotMap};
use std::collections::HashMap;

use super::bounds::AABB;
use super::lod::QualityTier;
use crate::assets::geometry_cache::GeometryCache;
use crate::diagnostics::PerformanceTier;
use crate::foundation::math::{Mat4, Vec3};
use crate::scheduler::TaskResult;

new_key_type! {
    /// Stable handle to a node in a [`SceneGraph`]
    pub struct NodeKey;
}

/// Something placed in the scene
pub trait SceneNode {
    /// Unique identifier
    fn id(&self) -> &str;

    /// Object-to-world transform
    fn world_transform(&self) -> Mat4;

    /// Bounds in object space; `None` when unknown (never culled)
    fn local_bounds(&self) -> Option<AABB> {
        None
    }

    /// World-space origin of the node
    fn position(&self) -> Vec3 {
        self.world_transform().fixed_view::<3, 1>(0, 3).into_owned()
    }

    /// Quality control, for nodes that support it
    fn as_adaptive(&self) -> Option<&dyn AdaptiveQuality> {
        None
    }

    /// Mutable quality control, for nodes that support it
    fn as_adaptive_mut(&mut self) -> Option<&mut dyn AdaptiveQuality> {
        None
    }
}

impl std::fmt::Debug for dyn SceneNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SceneNode")
            .field("id", &self.id())
            .finish_non_exhaustive()
    }
}

/// A requested quality transition
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QualityChange {
    /// Tier the node had
    pub previous: QualityTier,
    /// Tier the node should switch to
    pub tier: QualityTier,
    /// Camera distance that led to the change
    pub distance: f32,
    /// Performance tier in effect
    pub performance: PerformanceTier,
}

/// Capability of nodes whose detail level can be changed at runtime
pub trait AdaptiveQuality {
    /// Tier currently in use
    fn quality(&self) -> QualityTier;

    /// Switch to `change.tier`
    ///
    /// Only called when the tier actually differs from [`quality`]. Meshes
    /// should come from `geometry` so equal parameters share one mesh.
    ///
    /// [`quality`]: AdaptiveQuality::quality
    fn apply_quality(&mut self, change: &QualityChange, geometry: &mut GeometryCache) -> TaskResult;
}

/// Registry of scene nodes addressable by id or by [`NodeKey`]
#[derive(Default)]
pub struct SceneGraph {
    nodes: SlotMap<NodeKey, Box<dyn SceneNode>>,
    ids: HashMap<String, NodeKey>,
}

impl SceneGraph {
    /// Create an empty graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node
    ///
    /// Ids are unique: a node whose id is taken is handed back unchanged.
    pub fn insert(&mut self, node: Box<dyn SceneNode>) -> Result<NodeKey, Box<dyn SceneNode>> {
        if self.ids.contains_key(node.id()) {
            return Err(node);
        }
        let id = node.id().to_string();
        let key = self.nodes.insert(node);
        self.ids.insert(id, key);
        Ok(key)
    }

    /// Remove a node by id
    pub fn remove(&mut self, id: &str) -> Option<Box<dyn SceneNode>> {
        let key = self.ids.remove(id)?;
        self.nodes.remove(key)
    }

    /// Whether a node with this id exists
    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains_key(id)
    }

    /// Key of the node with this id
    pub fn key(&self, id: &str) -> Option<NodeKey> {
        self.ids.get(id).copied()
    }

    /// Node by id
    pub fn get(&self, id: &str) -> Option<&dyn SceneNode> {
        self.key(id).and_then(|key| self.get_by_key(key))
    }

    /// Mutable node by id
    pub fn get_mut(&mut self, id: &str) -> Option<&mut dyn SceneNode> {
        let key = self.key(id)?;
        self.get_by_key_mut(key)
    }

    /// Node by key
    pub fn get_by_key(&self, key: NodeKey) -> Option<&dyn SceneNode> {
        self.nodes.get(key).map(|node| node.as_ref())
    }

    /// Mutable node by key
    pub fn get_by_key_mut(&mut self, key: NodeKey) -> Option<&mut dyn SceneNode> {
        match self.nodes.get_mut(key) {
            Some(node) => Some(node.as_mut()),
            None => None,
        }
    }

    /// All nodes
    pub fn iter(&self) -> impl Iterator<Item = (NodeKey, &dyn SceneNode)> + '_ {
        self.nodes.iter().map(|(key, node)| (key, node.as_ref()))
    }

    /// All nodes, mutably
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (NodeKey, &mut Box<dyn SceneNode>)> + '_ {
        self.nodes.iter_mut()
    }

    /// Number of nodes
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the graph is empty
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Remove every node
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.ids.clear();
    }
}

impl std::fmt::Debug for SceneGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SceneGraph")
            .field("nodes", &self.ids.keys().collect::<Vec<_>>())
            .finish()
    }
}
