//! Periodic processes around the contagion core
//!
//! Two independent schedules touch each entity:
//! proximity scan -> registry report, and metabolism tick -> level read ->
//! symptom translation -> metabolic deltas.

pub mod lifecycle;
pub mod metabolism;
pub mod scanner;
pub mod symptoms;

pub use lifecycle::PlagueHost;
pub use metabolism::{metabolism_tick, Metabolism};
pub use scanner::{ProximityEvent, ProximityScanner, ScanScheduler};
pub use symptoms::{symptoms_for, Symptom, SYMPTOM_STAGES};
