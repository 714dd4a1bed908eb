//! Uniform-cell spatial hash
//!
//! Space is cut into cubes of edge `cell_size`; each object is recorded in
//! the one cell containing its position. Proximity queries scan a cube of
//! neighbouring cells, so they cost time proportional to the neighbourhood,
//! not to the number of objects.

use std::borrow::Borrow;
use std::collections::{HashMap, HashSet};
use std::hash::Hash;
use thiserror::Error;

use super::spatial_query::SpatialQuery;
use crate::foundation::math::Vec3;
use crate::scene::bounds::AABB;

/// Spatial index errors
#[derive(Error, Debug, Clone, Copy, PartialEq)]
pub enum SpatialError {
    /// Cell size must be finite and strictly positive
    #[error("invalid cell size {0}: must be finite and greater than zero")]
    InvalidCellSize(f32),
}

/// Integer cell coordinates `(⌊x/s⌋, ⌊y/s⌋, ⌊z/s⌋)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellKey(pub i32, pub i32, pub i32);

impl CellKey {
    fn offset(self, dx: i32, dy: i32, dz: i32) -> Self {
        Self(
            self.0.saturating_add(dx),
            self.1.saturating_add(dy),
            self.2.saturating_add(dz),
        )
    }

    fn chebyshev_distance(self, other: Self) -> i64 {
        let d = |a: i32, b: i32| (i64::from(a) - i64::from(b)).abs();
        d(self.0, other.0).max(d(self.1, other.1)).max(d(self.2, other.2))
    }
}

/// Query hit with its exact distance
#[derive(Debug, Clone, PartialEq)]
pub struct NearbyObject<K> {
    /// Object id
    pub id: K,
    /// Euclidean distance from the query point
    pub distance: f32,
    /// Recorded position
    pub position: Vec3,
}

/// Grid occupancy
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SpatialStats {
    /// Indexed objects
    pub total_objects: usize,
    /// Non-empty cells
    pub total_cells: usize,
    /// `total_objects / total_cells`, zero when empty
    pub average_objects_per_cell: f32,
    /// Fullest cell
    pub max_objects_in_cell: usize,
}

/// Uniform-cell spatial hash grid
#[derive(Debug, Clone)]
pub struct SpatialHashGrid<K> {
    cell_size: f32,
    cells: HashMap<CellKey, HashSet<K>>,
    positions: HashMap<K, (Vec3, CellKey)>,
}

impl<K> SpatialHashGrid<K>
where
    K: Eq + Hash + Clone,
{
    /// Create an empty grid
    ///
    /// Fails unless `cell_size` is finite and greater than zero.
    pub fn new(cell_size: f32) -> Result<Self, SpatialError> {
        if !cell_size.is_finite() || cell_size <= 0.0 {
            return Err(SpatialError::InvalidCellSize(cell_size));
        }
        Ok(Self {
            cell_size,
            cells: HashMap::new(),
            positions: HashMap::new(),
        })
    }

    /// Cell edge length
    pub fn cell_size(&self) -> f32 {
        self.cell_size
    }

    /// Cell containing a position
    pub fn cell_key(&self, position: &Vec3) -> CellKey {
        let axis = |v: f32| (v / self.cell_size).floor() as i32;
        CellKey(axis(position.x), axis(position.y), axis(position.z))
    }

    /// Index an object, moving it if it was already present
    pub fn insert(&mut self, id: K, position: Vec3) {
        self.remove(&id);
        let key = self.cell_key(&position);
        self.cells.entry(key).or_default().insert(id.clone());
        self.positions.insert(id, (position, key));
    }

    /// Move an object; same as [`insert`](Self::insert)
    pub fn update(&mut self, id: K, position: Vec3) {
        self.insert(id, position);
    }

    /// Remove an object, dropping its cell if it became empty
    pub fn remove<Q>(&mut self, id: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let Some((_, key)) = self.positions.remove(id) else {
            return false;
        };
        if let Some(cell) = self.cells.get_mut(&key) {
            cell.remove(id);
            if cell.is_empty() {
                self.cells.remove(&key);
            }
        }
        true
    }

    /// Every object in the cube of cells within `⌈radius / cell_size⌉` of
    /// the centre cell
    ///
    /// A superset of the objects within `radius`; use
    /// [`get_nearby_with_distance`](Self::get_nearby_with_distance) for an
    /// exact answer.
    pub fn get_nearby(&self, position: &Vec3, radius: f32) -> Vec<K> {
        let center = self.cell_key(position);
        let reach = (radius.max(0.0) / self.cell_size).ceil().min(i32::MAX as f32) as i32;
        let mut nearby = Vec::new();

        let side = 2 * i64::from(reach) + 1;
        if side.saturating_mul(side).saturating_mul(side) > self.cells.len() as i64 {
            // Cheaper to walk the occupied cells than the whole neighbourhood
            for (key, cell) in &self.cells {
                if key.chebyshev_distance(center) <= i64::from(reach) {
                    nearby.extend(cell.iter().cloned());
                }
            }
            return nearby;
        }

        for dx in -reach..=reach {
            for dy in -reach..=reach {
                for dz in -reach..=reach {
                    if let Some(cell) = self.cells.get(&center.offset(dx, dy, dz)) {
                        nearby.extend(cell.iter().cloned());
                    }
                }
            }
        }
        nearby
    }

    /// Objects within `radius` (inclusive), nearest first
    pub fn get_nearby_with_distance(&self, position: &Vec3, radius: f32) -> Vec<NearbyObject<K>> {
        let mut results: Vec<NearbyObject<K>> = self
            .get_nearby(position, radius)
            .into_iter()
            .filter_map(|id| {
                let (object_position, _) = *self.positions.get(&id)?;
                let distance = (object_position - position).magnitude();
                (distance <= radius).then(|| NearbyObject {
                    id,
                    distance,
                    position: object_position,
                })
            })
            .collect();
        results.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        results
    }

    /// Recorded position of an object
    pub fn position<Q>(&self, id: &Q) -> Option<Vec3>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.positions.get(id).map(|(position, _)| *position)
    }

    /// Whether an object is indexed
    pub fn contains<Q>(&self, id: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.positions.contains_key(id)
    }

    /// Every indexed object with its position
    pub fn all_objects(&self) -> Vec<(K, Vec3)> {
        self.positions
            .iter()
            .map(|(id, (position, _))| (id.clone(), *position))
            .collect()
    }

    /// Remove every object
    pub fn clear(&mut self) {
        self.cells.clear();
        self.positions.clear();
    }

    /// Number of indexed objects
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    /// Whether nothing is indexed
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Occupancy summary
    pub fn stats(&self) -> SpatialStats {
        let total_objects = self.positions.len();
        let total_cells = self.cells.len();
        let max_objects_in_cell = self.cells.values().map(HashSet::len).max().unwrap_or(0);
        let average_objects_per_cell = if total_cells > 0 {
            total_objects as f32 / total_cells as f32
        } else {
            0.0
        };

        SpatialStats {
            total_objects,
            total_cells,
            average_objects_per_cell,
            max_objects_in_cell,
        }
    }
}

impl<K> SpatialQuery<K> for SpatialHashGrid<K>
where
    K: Eq + Hash + Clone,
{
    fn insert(&mut self, id: K, position: Vec3) {
        SpatialHashGrid::insert(self, id, position);
    }

    fn remove(&mut self, id: &K) -> bool {
        SpatialHashGrid::remove(self, id)
    }

    fn update(&mut self, id: K, position: Vec3) {
        SpatialHashGrid::update(self, id, position);
    }

    fn query_sphere(&self, center: Vec3, radius: f32) -> Vec<K> {
        self.get_nearby_with_distance(&center, radius)
            .into_iter()
            .map(|hit| hit.id)
            .collect()
    }

    fn query_aabb(&self, aabb: &AABB) -> Vec<K> {
        if aabb.is_empty() {
            return Vec::new();
        }
        let (lo, hi) = (self.cell_key(&aabb.min), self.cell_key(&aabb.max));
        self.cells
            .iter()
            .filter(|(key, _)| {
                (lo.0..=hi.0).contains(&key.0)
                    && (lo.1..=hi.1).contains(&key.1)
                    && (lo.2..=hi.2).contains(&key.2)
            })
            .flat_map(|(_, cell)| cell.iter())
            .filter(|id| {
                self.positions
                    .get(*id)
                    .map_or(false, |(position, _)| aabb.contains_point(*position))
            })
            .cloned()
            .collect()
    }

    fn position(&self, id: &K) -> Option<Vec3> {
        SpatialHashGrid::position(self, id)
    }

    fn clear(&mut self) {
        SpatialHashGrid::clear(self);
    }

    fn entity_count(&self) -> usize {
        self.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn grid(cell_size: f32) -> SpatialHashGrid<String> {
        SpatialHashGrid::new(cell_size).unwrap()
    }

    #[test]
    fn test_invalid_cell_size_rejected() {
        assert_eq!(
            SpatialHashGrid::<u32>::new(0.0).unwrap_err(),
            SpatialError::InvalidCellSize(0.0)
        );
        assert!(SpatialHashGrid::<u32>::new(-5.0).is_err());
        assert!(SpatialHashGrid::<u32>::new(f32::NAN).is_err());
        assert!(SpatialHashGrid::<u32>::new(f32::INFINITY).is_err());
    }

    #[test]
    fn test_inserted_object_is_found_at_its_position() {
        let mut grid = grid(50.0);
        let position = Vec3::new(10.0, 10.0, 10.0);
        grid.insert("pebble".to_string(), position);

        assert!(grid.get_nearby(&position, 0.0).contains(&"pebble".to_string()));
        let exact = grid.get_nearby_with_distance(&position, 0.0);
        assert_eq!(exact.len(), 1);
        assert_relative_eq!(exact[0].distance, 0.0);
    }

    #[test]
    fn test_cell_key_floors_negative_coordinates() {
        let grid = grid(10.0);
        assert_eq!(grid.cell_key(&Vec3::new(-0.5, 9.9, 10.0)), CellKey(-1, 0, 1));
    }

    #[test]
    fn test_update_moves_between_cells() {
        let mut grid = grid(10.0);
        grid.insert("a".to_string(), Vec3::new(1.0, 1.0, 1.0));
        grid.update("a".to_string(), Vec3::new(95.0, 1.0, 1.0));

        assert_eq!(grid.len(), 1);
        assert_eq!(grid.stats().total_cells, 1);
        assert!(grid.get_nearby(&Vec3::new(1.0, 1.0, 1.0), 5.0).is_empty());
        assert_eq!(grid.position("a"), Some(Vec3::new(95.0, 1.0, 1.0)));
    }

    #[test]
    fn test_remove_drops_empty_cells() {
        let mut grid = grid(10.0);
        grid.insert("a".to_string(), Vec3::zeros());
        grid.insert("b".to_string(), Vec3::new(1.0, 0.0, 0.0));
        assert!(grid.remove("a"));
        assert_eq!(grid.stats().total_cells, 1);
        assert!(grid.remove("b"));
        assert!(!grid.remove("b"));
        assert_eq!(grid.stats(), SpatialStats::default());
    }

    #[test]
    fn test_nearby_with_distance_filters_and_sorts() {
        let mut grid = grid(5.0);
        grid.insert("far".to_string(), Vec3::new(9.0, 0.0, 0.0));
        grid.insert("near".to_string(), Vec3::new(2.0, 0.0, 0.0));
        grid.insert("mid".to_string(), Vec3::new(0.0, 6.0, 0.0));
        grid.insert("corner".to_string(), Vec3::new(7.0, 7.0, 0.0));

        let coarse = grid.get_nearby(&Vec3::zeros(), 8.0);
        assert!(coarse.contains(&"corner".to_string()));

        let hits = grid.get_nearby_with_distance(&Vec3::zeros(), 8.0);
        let ids: Vec<&str> = hits.iter().map(|hit| hit.id.as_str()).collect();
        assert_eq!(ids, vec!["near", "mid"]);
        assert_relative_eq!(hits[1].distance, 6.0);
    }

    #[test]
    fn test_huge_radius_scans_occupied_cells() {
        let mut grid = grid(1.0);
        grid.insert("x".to_string(), Vec3::new(500.0, -300.0, 20.0));
        grid.insert("y".to_string(), Vec3::new(-40.0, 0.0, 0.0));
        let mut everything = grid.get_nearby(&Vec3::zeros(), 1.0e6);
        everything.sort();
        assert_eq!(everything, vec!["x".to_string(), "y".to_string()]);
    }

    #[test]
    fn test_stats() {
        let mut grid = grid(10.0);
        grid.insert("a".to_string(), Vec3::new(1.0, 1.0, 1.0));
        grid.insert("b".to_string(), Vec3::new(2.0, 2.0, 2.0));
        grid.insert("c".to_string(), Vec3::new(50.0, 1.0, 1.0));

        let stats = grid.stats();
        assert_eq!(stats.total_objects, 3);
        assert_eq!(stats.total_cells, 2);
        assert_eq!(stats.max_objects_in_cell, 2);
        assert_relative_eq!(stats.average_objects_per_cell, 1.5);
        assert_eq!(grid.all_objects().len(), 3);
    }

    #[test]
    fn test_spatial_query_trait() {
        fn index_all(index: &mut dyn SpatialQuery<u32>) {
            for id in 0..10_u32 {
                index.insert(id, Vec3::new(id as f32 * 3.0, 0.0, 0.0));
            }
        }

        let mut grid: SpatialHashGrid<u32> = SpatialHashGrid::new(4.0).unwrap();
        index_all(&mut grid);
        let query: &dyn SpatialQuery<u32> = &grid;
        assert_eq!(query.entity_count(), 10);

        let mut in_sphere = query.query_sphere(Vec3::zeros(), 7.0);
        in_sphere.sort();
        assert_eq!(in_sphere, vec![0, 1, 2]);

        let aabb = AABB::new(Vec3::new(10.0, -1.0, -1.0), Vec3::new(20.0, 1.0, 1.0));
        let mut in_box = query.query_aabb(&aabb);
        in_box.sort();
        assert_eq!(in_box, vec![4, 5, 6]);
        assert_eq!(query.position(&3), Some(Vec3::new(9.0, 0.0, 0.0)));
    }
}
