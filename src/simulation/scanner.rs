//! Proximity scanning - one periodic task per active entity
//!
//! Each scan re-queries the spatial service and turns the result into
//! exactly one report for the registry:
//! - more than one hit (the entity normally sees itself) -> proximity
//! - otherwise, or when the query fails -> alone
//!
//! The `ScanScheduler` owns every scan task, keyed by entity id. Stopping a
//! scan never touches the entity's registry entry.

use ahash::AHashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, trace, warn};

use crate::contagion::registry::ContagionRegistry;
use crate::contagion::state::Transition;
use crate::core::config::ScanConfig;
use crate::core::error::{PlagueError, Result};
use crate::core::types::EntityId;
use crate::spatial::nearby::{NearbyBuffer, SpatialIndex};

/// Outcome of one scan
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProximityEvent<'a> {
    /// Full hit list, the scanning entity included
    Proximity(&'a [Option<EntityId>]),
    Alone,
}

/// Scans the surroundings of a single entity
pub struct ProximityScanner {
    entity: EntityId,
    spatial: Arc<dyn SpatialIndex>,
    scan: ScanConfig,
    buffer: NearbyBuffer,
}

impl ProximityScanner {
    pub fn new(entity: EntityId, spatial: Arc<dyn SpatialIndex>, scan: ScanConfig) -> Self {
        Self {
            entity,
            spatial,
            scan,
            buffer: NearbyBuffer::new(),
        }
    }

    pub fn entity(&self) -> EntityId {
        self.entity
    }

    /// Query the spatial service once
    ///
    /// A failed query degrades to `Alone` for this scan.
    pub fn scan(&mut self) -> ProximityEvent<'_> {
        self.buffer.clear();
        if let Err(err) = self.query() {
            warn!(entity = %self.entity, error = %err, "proximity query failed, treating as alone");
            self.buffer.clear();
            return ProximityEvent::Alone;
        }

        if self.buffer.is_truncated() {
            debug!(entity = %self.entity, capacity = self.buffer.capacity(), "neighbor buffer full");
        }

        if self.buffer.len() > 1 {
            ProximityEvent::Proximity(self.buffer.as_slice())
        } else {
            ProximityEvent::Alone
        }
    }

    /// Scan and feed the result to the registry
    ///
    /// Returns `None` when the entity has no registry entry; that is logged
    /// and the scan is dropped.
    pub fn scan_and_report(&mut self, registry: &ContagionRegistry) -> Option<Transition> {
        let entity = self.entity;
        let result = match self.scan() {
            ProximityEvent::Proximity(hits) => {
                trace!(entity = %entity, hits = hits.len(), "proximity");
                registry.report_proximity(entity, hits.iter().copied())
            }
            ProximityEvent::Alone => {
                trace!(entity = %entity, "alone");
                registry.report_alone(entity)
            }
        };

        match result {
            Ok(transition) => Some(transition),
            Err(err) => {
                warn!(entity = %entity, error = %err, "entity has no state");
                None
            }
        }
    }

    fn query(&mut self) -> Result<()> {
        let center = self
            .spatial
            .position_of(self.entity)
            .ok_or_else(|| PlagueError::ProximityQuery(format!("no position for {}", self.entity)))?;
        self.spatial
            .query_nearby(center, self.scan.plague_range, self.scan.layers, &mut self.buffer)
    }
}

/// Central table of running scan tasks
///
/// Tasks are spawned onto the runtime handed to `new`, so `start` and
/// `stop` may be called from any thread, inside that runtime or not.
pub struct ScanScheduler {
    registry: Arc<ContagionRegistry>,
    spatial: Arc<dyn SpatialIndex>,
    scan: ScanConfig,
    runtime: Handle,
    tasks: Mutex<AHashMap<EntityId, JoinHandle<()>>>,
}

impl ScanScheduler {
    pub fn new(
        registry: Arc<ContagionRegistry>,
        spatial: Arc<dyn SpatialIndex>,
        scan: ScanConfig,
        runtime: Handle,
    ) -> Self {
        Self {
            registry,
            spatial,
            scan,
            runtime,
            tasks: Mutex::new(AHashMap::new()),
        }
    }

    /// Start scanning `entity`; returns false if it is already scanning
    pub fn start(&self, entity: EntityId) -> bool {
        let mut tasks = self.tasks();
        if tasks.get(&entity).is_some_and(|task| !task.is_finished()) {
            return false;
        }

        let scanner = ProximityScanner::new(entity, Arc::clone(&self.spatial), self.scan);
        let task = self.runtime.spawn(run_scanner(scanner, Arc::clone(&self.registry), self.scan));
        tasks.insert(entity, task);
        debug!(entity = %entity, "proximity scan started");
        true
    }

    /// Stop scanning `entity`; stopping an idle entity is a no-op
    pub fn stop(&self, entity: EntityId) -> bool {
        match self.tasks().remove(&entity) {
            Some(task) => {
                task.abort();
                debug!(entity = %entity, "proximity scan stopped");
                true
            }
            None => false,
        }
    }

    pub fn is_scanning(&self, entity: EntityId) -> bool {
        self.tasks().get(&entity).is_some_and(|task| !task.is_finished())
    }

    pub fn active_count(&self) -> usize {
        self.tasks().values().filter(|task| !task.is_finished()).count()
    }

    /// Stop every scan
    pub fn shutdown(&self) {
        for (_, task) in self.tasks().drain() {
            task.abort();
        }
    }

    fn tasks(&self) -> MutexGuard<'_, AHashMap<EntityId, JoinHandle<()>>> {
        self.tasks.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for ScanScheduler {
    fn drop(&mut self) {
        self.shutdown();
    }
}

async fn run_scanner(mut scanner: ProximityScanner, registry: Arc<ContagionRegistry>, scan: ScanConfig) {
    let mut ticker = interval_at(Instant::now() + scan.initial_delay(), scan.period());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        ticker.tick().await;
        scanner.scan_and_report(&registry);
    }
}
