//! Affinity and infection bookkeeping
//!
//! Entities build affinity toward the peers they keep running into. Once a
//! peer's affinity crosses `plague_min_affinity` it becomes a contagion
//! vector, and every vector in a proximity report pushes the entity's
//! infection level up. Reports without vectors, and isolation, pull it back
//! down.

pub mod ledger;
pub mod registry;
pub mod state;

pub use ledger::AffinityLedger;
pub use registry::{ContagionRegistry, SharedState, StateSnapshot};
pub use state::{stage, ContagionState, Transition};
