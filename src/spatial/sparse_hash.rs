//! Sparse hash grid for proximity queries over creatures

use ahash::AHashMap;
use glam::Vec3;

use crate::core::types::EntityId;

const MAX_RINGS: i32 = 1024;

/// Uniform grid on the ground plane keyed by integer cell coordinates
///
/// Rebuilt from scratch every tick. With a capped population a full rebuild
/// is cheaper than tracking per-move cell changes.
#[derive(Debug, Clone)]
pub struct SpatialIndex {
    cell_size: f32,
    cells: AHashMap<(i32, i32), Vec<(EntityId, Vec3)>>,
    locations: AHashMap<EntityId, (i32, i32)>,
}

impl SpatialIndex {
    /// Non-positive or non-finite cell sizes fall back to 1.0
    pub fn new(cell_size: f32) -> Self {
        let cell_size = if cell_size.is_finite() && cell_size > 0.0 {
            cell_size
        } else {
            1.0
        };
        Self {
            cell_size,
            cells: AHashMap::new(),
            locations: AHashMap::new(),
        }
    }

    pub fn cell_size(&self) -> f32 {
        self.cell_size
    }

    #[inline]
    pub fn cell_coord(&self, pos: Vec3) -> (i32, i32) {
        (
            (pos.x / self.cell_size).floor() as i32,
            (pos.z / self.cell_size).floor() as i32,
        )
    }

    pub fn clear(&mut self) {
        self.cells.clear();
        self.locations.clear();
    }

    pub fn len(&self) -> usize {
        self.locations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locations.is_empty()
    }

    pub fn contains(&self, entity: EntityId) -> bool {
        self.locations.contains_key(&entity)
    }

    pub fn insert(&mut self, entity: EntityId, pos: Vec3) {
        if !pos.is_finite() {
            tracing::warn!(?entity, ?pos, "refusing to index non-finite position");
            return;
        }
        self.remove(entity);
        let coord = self.cell_coord(pos);
        self.cells.entry(coord).or_default().push((entity, pos));
        self.locations.insert(entity, coord);
    }

    /// Release an entity; returns whether it was indexed
    pub fn remove(&mut self, entity: EntityId) -> bool {
        let Some(coord) = self.locations.remove(&entity) else {
            return false;
        };
        if let Some(cell) = self.cells.get_mut(&coord) {
            cell.retain(|&(e, _)| e != entity);
            if cell.is_empty() {
                self.cells.remove(&coord);
            }
        }
        true
    }

    /// All entities in the query cell and its surrounding ring(s)
    ///
    /// The 3x3 block covers any radius up to one cell; larger radii widen the
    /// block so no candidate is missed.
    pub fn query_neighbors(
        &self,
        pos: Vec3,
        radius: f32,
    ) -> impl Iterator<Item = (EntityId, Vec3)> + '_ {
        let (cx, cz) = self.cell_coord(pos);
        let rings = self.rings_for(radius);

        (-rings..=rings).flat_map(move |dx| {
            (-rings..=rings).flat_map(move |dz| {
                self.cells
                    .get(&(cx.saturating_add(dx), cz.saturating_add(dz)))
                    .into_iter()
                    .flatten()
                    .copied()
            })
        })
    }

    #[inline]
    fn rings_for(&self, radius: f32) -> i32 {
        ((radius / self.cell_size).ceil() as i32).clamp(1, MAX_RINGS)
    }

    /// Entities within `radius` of `center` (3D distance)
    pub fn query(&self, center: Vec3, radius: f32) -> Vec<EntityId> {
        if !center.is_finite() || !(radius >= 0.0) {
            return Vec::new();
        }
        let within = |&(_, pos): &(EntityId, Vec3)| center.distance(pos) <= radius;

        // Past a certain radius, walking the occupied cells beats probing empty ones
        let span = (2 * i64::from(self.rings_for(radius)) + 1).pow(2);
        let rings_exhausted = (radius / self.cell_size).ceil() > MAX_RINGS as f32;
        if rings_exhausted || span > self.cells.len() as i64 {
            self.cells
                .values()
                .flatten()
                .copied()
                .filter(within)
                .map(|(entity, _)| entity)
                .collect()
        } else {
            self.query_neighbors(center, radius)
                .filter(within)
                .map(|(entity, _)| entity)
                .collect()
        }
    }

    /// Rebuild grid from positions
    pub fn rebuild(&mut self, entities: impl Iterator<Item = (EntityId, Vec3)>) {
        self.clear();
        for (entity, pos) in entities {
            self.insert(entity, pos);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slotmap::SlotMap;

    fn ids(n: usize) -> Vec<EntityId> {
        let mut map: SlotMap<EntityId, ()> = SlotMap::with_key();
        (0..n).map(|_| map.insert(())).collect()
    }

    #[test]
    fn test_query_filters_by_exact_distance() {
        let ids = ids(3);
        let mut grid = SpatialIndex::new(10.0);
        grid.rebuild(
            [
                (ids[0], Vec3::new(0.0, 0.0, 0.0)),
                (ids[1], Vec3::new(4.0, 0.0, 3.0)),
                (ids[2], Vec3::new(9.0, 0.0, 0.0)),
            ]
            .into_iter(),
        );

        let mut found = grid.query(Vec3::ZERO, 5.0);
        found.sort();
        let mut expected = vec![ids[0], ids[1]];
        expected.sort();
        assert_eq!(found, expected);
    }

    #[test]
    fn test_query_across_cell_boundary() {
        let ids = ids(1);
        let mut grid = SpatialIndex::new(10.0);
        // Just across the boundary into the neighboring cell
        grid.insert(ids[0], Vec3::new(10.1, 0.0, 0.0));
        assert_eq!(grid.query(Vec3::new(9.9, 0.0, 0.0), 1.0), vec![ids[0]]);
    }

    #[test]
    fn test_large_radius_widens_search() {
        let ids = ids(1);
        let mut grid = SpatialIndex::new(5.0);
        grid.insert(ids[0], Vec3::new(32.0, 0.0, 0.0));
        assert_eq!(grid.query(Vec3::ZERO, 40.0), vec![ids[0]]);
        assert!(grid.query(Vec3::ZERO, 31.0).is_empty());
    }

    #[test]
    fn test_negative_coordinates() {
        let ids = ids(2);
        let mut grid = SpatialIndex::new(10.0);
        grid.insert(ids[0], Vec3::new(-0.5, 0.0, -0.5));
        grid.insert(ids[1], Vec3::new(0.5, 0.0, 0.5));
        assert_eq!(grid.cell_coord(Vec3::new(-0.5, 0.0, -0.5)), (-1, -1));
        assert_eq!(grid.query(Vec3::ZERO, 1.0).len(), 2);
    }

    #[test]
    fn test_remove_releases_entity() {
        let ids = ids(2);
        let mut grid = SpatialIndex::new(10.0);
        grid.insert(ids[0], Vec3::ZERO);
        grid.insert(ids[1], Vec3::ONE);
        assert!(grid.remove(ids[0]));
        assert!(!grid.remove(ids[0]));
        assert_eq!(grid.query(Vec3::ZERO, 5.0), vec![ids[1]]);
        assert_eq!(grid.len(), 1);
    }

    #[test]
    fn test_reinsert_moves_entity() {
        let ids = ids(1);
        let mut grid = SpatialIndex::new(10.0);
        grid.insert(ids[0], Vec3::ZERO);
        grid.insert(ids[0], Vec3::new(50.0, 0.0, 50.0));
        assert!(grid.query(Vec3::ZERO, 5.0).is_empty());
        assert_eq!(grid.len(), 1);
    }

    #[test]
    fn test_bad_inputs_return_nothing() {
        let ids = ids(1);
        let mut grid = SpatialIndex::new(0.0);
        assert_eq!(grid.cell_size(), 1.0);
        grid.insert(ids[0], Vec3::new(f32::NAN, 0.0, 0.0));
        assert!(grid.is_empty());
        assert!(grid.query(Vec3::ZERO, f32::NAN).is_empty());
        assert!(grid.query(Vec3::new(f32::INFINITY, 0.0, 0.0), 1.0).is_empty());
    }
}
