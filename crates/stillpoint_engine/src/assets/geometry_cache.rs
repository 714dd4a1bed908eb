//! Geometry cache for deduplicating generated meshes
//!
//! Provides a bounded LRU layer on top of a [`GeometryGenerator`] so objects
//! that share generation parameters share one mesh.

use std::sync::Arc;

use super::geometry::{GeometryGenerator, GeometryParams, MeshData};
use crate::foundation::collections::BoundedCache;

/// Default number of cached meshes
pub const DEFAULT_GEOMETRY_CAPACITY: usize = 50;

/// Cache occupancy and effectiveness
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CacheStats {
    /// Meshes currently cached
    pub entries: usize,
    /// Maximum cached meshes
    pub capacity: usize,
    /// Lookups served from the cache
    pub hits: u64,
    /// Lookups that had to generate
    pub misses: u64,
    /// `hits / (hits + misses)`, zero before the first lookup
    pub hit_rate: f32,
}

/// LRU cache of generated meshes keyed by [`GeometryParams::cache_key`]
///
/// Meshes are shared as `Arc<MeshData>`. Callers that need to modify one
/// take their own copy (`Arc::make_mut` or `MeshData::clone`), so the cached
/// mesh is never altered behind other readers' backs.
#[derive(Debug)]
pub struct GeometryCache {
    cache: BoundedCache<String, Arc<MeshData>>,
    hits: u64,
    misses: u64,
}

impl GeometryCache {
    /// Create a cache holding at most `capacity` meshes
    pub fn new(capacity: usize) -> Self {
        Self {
            cache: BoundedCache::new(capacity),
            hits: 0,
            misses: 0,
        }
    }

    /// Cached mesh for `params`, generating and caching it on a miss
    pub fn get_or_generate(
        &mut self,
        params: &GeometryParams,
        generator: &dyn GeometryGenerator,
    ) -> Arc<MeshData> {
        let key = params.cache_key();
        if let Some(mesh) = self.cache.get_cloned(&key) {
            self.hits += 1;
            return mesh;
        }

        self.misses += 1;
        let mesh = Arc::new(generator.generate(params));
        log::trace!(
            "Generated geometry '{}' ({} triangles)",
            key,
            mesh.triangle_count()
        );
        if let Some((evicted, _)) = self.cache.set(key, Arc::clone(&mesh)) {
            log::trace!("Evicted geometry '{}'", evicted);
        }
        mesh
    }

    /// Whether a mesh for `params` is cached; does not affect recency
    pub fn contains(&self, params: &GeometryParams) -> bool {
        self.cache.has(&params.cache_key())
    }

    /// Number of cached meshes
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    /// Whether nothing is cached
    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    /// Drop every cached mesh; counters are kept
    pub fn clear(&mut self) {
        self.cache.clear();
    }

    /// Occupancy and hit counters
    pub fn stats(&self) -> CacheStats {
        let lookups = self.hits + self.misses;
        CacheStats {
            entries: self.cache.len(),
            capacity: self.cache.capacity(),
            hits: self.hits,
            misses: self.misses,
            hit_rate: if lookups > 0 {
                self.hits as f32 / lookups as f32
            } else {
                0.0
            },
        }
    }
}

impl Default for GeometryCache {
    fn default() -> Self {
        Self::new(DEFAULT_GEOMETRY_CAPACITY)
    }
}
