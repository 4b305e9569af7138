//! Spatial proximity queries

pub mod nearby;
pub mod sparse_hash;

pub use nearby::{NearbyBuffer, SpatialIndex, NEARBY_CAPACITY};
pub use sparse_hash::{SparseHashGrid, WorldGrid};
