//! Sparse hash grid for efficient spatial queries

use ahash::AHashMap;
use std::sync::{PoisonError, RwLock};

use crate::core::error::Result;
use crate::core::types::{EntityId, LayerMask, Vec2};
use crate::spatial::nearby::{NearbyBuffer, SpatialIndex};

#[derive(Debug, Clone, Copy)]
struct Placement {
    pos: Vec2,
    layers: LayerMask,
}

/// Sparse hash grid for O(1) neighbor queries
pub struct SparseHashGrid {
    cell_size: f32,
    cells: AHashMap<(i32, i32), Vec<EntityId>>,
    placements: AHashMap<EntityId, Placement>,
}

impl SparseHashGrid {
    pub fn new(cell_size: f32) -> Self {
        Self {
            cell_size,
            cells: AHashMap::new(),
            placements: AHashMap::new(),
        }
    }

    #[inline]
    fn cell_coord(&self, pos: Vec2) -> (i32, i32) {
        (
            (pos.x / self.cell_size).floor() as i32,
            (pos.y / self.cell_size).floor() as i32,
        )
    }

    pub fn clear(&mut self) {
        self.cells.clear();
        self.placements.clear();
    }

    pub fn len(&self) -> usize {
        self.placements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.placements.is_empty()
    }

    /// Insert or move an entity
    pub fn insert(&mut self, entity: EntityId, pos: Vec2, layers: LayerMask) {
        self.remove(entity);
        let coord = self.cell_coord(pos);
        self.cells.entry(coord).or_default().push(entity);
        self.placements.insert(entity, Placement { pos, layers });
    }

    pub fn remove(&mut self, entity: EntityId) {
        let Some(old) = self.placements.remove(&entity) else {
            return;
        };
        let coord = self.cell_coord(old.pos);
        if let Some(cell) = self.cells.get_mut(&coord) {
            cell.retain(|&e| e != entity);
            if cell.is_empty() {
                self.cells.remove(&coord);
            }
        }
    }

    pub fn position(&self, entity: EntityId) -> Option<Vec2> {
        self.placements.get(&entity).map(|p| p.pos)
    }

    /// Query entities on `layers` within `radius` of `center`
    pub fn query_radius(&self, center: Vec2, radius: f32, layers: LayerMask, out: &mut NearbyBuffer) {
        let (cx, cy) = self.cell_coord(center);
        let span = (radius / self.cell_size).ceil().max(0.0) as i32;

        // Cell coords saturate at the i32 edges for far-out positions, so the
        // neighbourhood is clipped there rather than wrapping or overflowing
        let xs = cx.saturating_sub(span)..=cx.saturating_add(span);
        let ys = cy.saturating_sub(span)..=cy.saturating_add(span);

        for x in xs {
            for y in ys.clone() {
                let Some(cell) = self.cells.get(&(x, y)) else {
                    continue;
                };
                for &entity in cell {
                    let Some(placement) = self.placements.get(&entity) else {
                        continue;
                    };
                    if !placement.layers.intersects(layers) || center.distance(&placement.pos) > radius {
                        continue;
                    }
                    if !out.push(Some(entity)) {
                        return;
                    }
                }
            }
        }
    }
}

/// Thread-safe grid the host moves entities around in while scanners query it
pub struct WorldGrid {
    grid: RwLock<SparseHashGrid>,
}

impl WorldGrid {
    pub fn new(cell_size: f32) -> Self {
        Self {
            grid: RwLock::new(SparseHashGrid::new(cell_size)),
        }
    }

    pub fn place(&self, entity: EntityId, pos: Vec2, layers: LayerMask) {
        self.grid
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(entity, pos, layers);
    }

    pub fn remove(&self, entity: EntityId) {
        self.grid.write().unwrap_or_else(PoisonError::into_inner).remove(entity);
    }

    pub fn len(&self) -> usize {
        self.grid.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl SpatialIndex for WorldGrid {
    fn position_of(&self, entity: EntityId) -> Option<Vec2> {
        self.grid.read().unwrap_or_else(PoisonError::into_inner).position(entity)
    }

    fn query_nearby(
        &self,
        center: Vec2,
        radius: f32,
        layers: LayerMask,
        out: &mut NearbyBuffer,
    ) -> Result<()> {
        self.grid
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .query_radius(center, radius, layers, out);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(buffer: &NearbyBuffer) -> Vec<u64> {
        let mut ids: Vec<u64> = buffer.iter().flatten().map(|e| e.0).collect();
        ids.sort_unstable();
        ids
    }

    #[test]
    fn test_query_radius_spans_cells() {
        let mut grid = SparseHashGrid::new(5.0);
        grid.insert(EntityId(1), Vec2::new(0.0, 0.0), LayerMask::PLAYERS);
        grid.insert(EntityId(2), Vec2::new(18.0, 0.0), LayerMask::PLAYERS);
        grid.insert(EntityId(3), Vec2::new(21.0, 0.0), LayerMask::PLAYERS);

        let mut out = NearbyBuffer::new();
        grid.query_radius(Vec2::new(0.0, 0.0), 20.0, LayerMask::PLAYERS, &mut out);
        assert_eq!(ids(&out), vec![1, 2]);
    }

    #[test]
    fn test_query_filters_layers() {
        let mut grid = SparseHashGrid::new(10.0);
        grid.insert(EntityId(1), Vec2::new(0.0, 0.0), LayerMask::PLAYERS);
        grid.insert(EntityId(2), Vec2::new(1.0, 1.0), LayerMask::NPCS);

        let mut out = NearbyBuffer::new();
        grid.query_radius(Vec2::new(0.0, 0.0), 5.0, LayerMask::PLAYERS, &mut out);
        assert_eq!(ids(&out), vec![1]);
    }

    #[test]
    fn test_insert_moves_entity() {
        let mut grid = SparseHashGrid::new(10.0);
        grid.insert(EntityId(1), Vec2::new(0.0, 0.0), LayerMask::PLAYERS);
        grid.insert(EntityId(1), Vec2::new(100.0, 100.0), LayerMask::PLAYERS);
        assert_eq!(grid.len(), 1);

        let mut out = NearbyBuffer::new();
        grid.query_radius(Vec2::new(0.0, 0.0), 20.0, LayerMask::ALL, &mut out);
        assert!(out.is_empty());
        assert_eq!(grid.position(EntityId(1)), Some(Vec2::new(100.0, 100.0)));
    }

    #[test]
    fn test_query_respects_buffer_capacity() {
        let mut grid = SparseHashGrid::new(10.0);
        for i in 0..10 {
            grid.insert(EntityId(i), Vec2::new(i as f32 * 0.1, 0.0), LayerMask::PLAYERS);
        }

        let mut out = NearbyBuffer::with_capacity(4);
        grid.query_radius(Vec2::new(0.0, 0.0), 5.0, LayerMask::PLAYERS, &mut out);
        assert_eq!(out.len(), 4);
        assert!(out.is_truncated());
    }

    #[test]
    fn test_query_far_from_origin() {
        let mut grid = SparseHashGrid::new(10.0);
        grid.insert(EntityId(1), Vec2::new(3.0e10, 0.0), LayerMask::PLAYERS);
        grid.insert(EntityId(2), Vec2::new(-3.0e10, -3.0e10), LayerMask::PLAYERS);
        grid.insert(EntityId(3), Vec2::new(0.0, 0.0), LayerMask::PLAYERS);

        let mut out = NearbyBuffer::new();
        grid.query_radius(Vec2::new(3.0e10, 0.0), 20.0, LayerMask::PLAYERS, &mut out);
        assert_eq!(ids(&out), vec![1]);

        out.clear();
        grid.query_radius(Vec2::new(-3.0e10, -3.0e10), 20.0, LayerMask::PLAYERS, &mut out);
        assert_eq!(ids(&out), vec![2]);
    }

    #[test]
    fn test_world_grid_remove() {
        let world = WorldGrid::new(10.0);
        world.place(EntityId(1), Vec2::new(1.0, 2.0), LayerMask::PLAYERS);
        assert_eq!(world.position_of(EntityId(1)), Some(Vec2::new(1.0, 2.0)));

        world.remove(EntityId(1));
        assert_eq!(world.position_of(EntityId(1)), None);
        assert!(world.is_empty());
    }
}
