//! Neighbor query contract and its fixed-capacity result buffer

use std::mem::size_of;

use crate::core::error::Result;
use crate::core::types::{EntityId, LayerMask, Vec2};

/// Size of the reusable neighbor buffer, matching the host physics engine's
/// shared overlap buffer
pub const NEARBY_BUFFER_BYTES: usize = 8 * 1024;

/// Number of handles that fit in the neighbor buffer
pub const NEARBY_CAPACITY: usize = NEARBY_BUFFER_BYTES / size_of::<u64>();

/// Reusable result buffer for neighbor queries
///
/// Allocated once per scanner and cleared between scans. Results beyond the
/// capacity are dropped, never reallocated. A `None` slot is a handle the
/// spatial service could not resolve to an entity.
#[derive(Debug, Clone)]
pub struct NearbyBuffer {
    slots: Vec<Option<EntityId>>,
    capacity: usize,
    truncated: bool,
}

impl NearbyBuffer {
    pub fn new() -> Self {
        Self::with_capacity(NEARBY_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
            capacity,
            truncated: false,
        }
    }

    pub fn clear(&mut self) {
        self.slots.clear();
        self.truncated = false;
    }

    /// Append a hit; returns false once the buffer is full
    pub fn push(&mut self, hit: Option<EntityId>) -> bool {
        if self.slots.len() >= self.capacity {
            self.truncated = true;
            return false;
        }
        self.slots.push(hit);
        true
    }

    pub fn as_slice(&self) -> &[Option<EntityId>] {
        &self.slots
    }

    pub fn iter(&self) -> impl Iterator<Item = Option<EntityId>> + '_ {
        self.slots.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Whether the last query had more hits than fit
    pub fn is_truncated(&self) -> bool {
        self.truncated
    }
}

impl Default for NearbyBuffer {
    fn default() -> Self {
        Self::new()
    }
}

/// Spatial proximity service the scanners query
///
/// Implementations must be synchronous and must not block on I/O. A query
/// writes its hits into `out`, which the caller has already cleared; the
/// querying entity itself is expected among the hits when it matches.
pub trait SpatialIndex: Send + Sync {
    /// Current position of `entity`, if the service knows it
    fn position_of(&self, entity: EntityId) -> Option<Vec2>;

    /// Collect every entity on `layers` within `radius` of `center`
    fn query_nearby(
        &self,
        center: Vec2,
        radius: f32,
        layers: LayerMask,
        out: &mut NearbyBuffer,
    ) -> Result<()>;
}
