//! Plague - proximity-driven social contagion
//!
//! Entities that keep running into each other build affinity; once enough
//! strongly-bonded peers are nearby, an entity's infection level climbs,
//! and it recovers slowly when isolated. The level maps onto ten cumulative
//! symptom stages that a host metabolism applies each tick.

pub mod contagion;
pub mod core;
pub mod simulation;
pub mod spatial;
