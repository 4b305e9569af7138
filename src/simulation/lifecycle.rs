//! Entity lifecycle handling
//!
//! The host world tells us when entities become active or leave. Activation
//! registers the entity (if new) and starts its proximity scan; departure
//! only stops the scan. Registry entries outlive departures.

use std::sync::Arc;
use tokio::runtime::Handle;
use tracing::info;

use crate::contagion::registry::{ContagionRegistry, StateSnapshot};
use crate::core::config::PlagueConfig;
use crate::core::error::{PlagueError, Result};
use crate::core::types::EntityId;
use crate::simulation::scanner::ScanScheduler;
use crate::spatial::nearby::SpatialIndex;

/// Wires the registry and the scan scheduler to the host's lifecycle feed
pub struct PlagueHost {
    registry: Arc<ContagionRegistry>,
    scheduler: ScanScheduler,
}

impl PlagueHost {
    /// Build a host that runs its scans on the current tokio runtime
    ///
    /// Fails with `NoRuntime` when called outside one; use `with_runtime`
    /// to hand over a runtime explicitly.
    pub fn new(config: &PlagueConfig, spatial: Arc<dyn SpatialIndex>) -> Result<Self> {
        let runtime = Handle::try_current().map_err(|_| PlagueError::NoRuntime)?;
        Self::with_runtime(config, spatial, runtime)
    }

    pub fn with_runtime(config: &PlagueConfig, spatial: Arc<dyn SpatialIndex>, runtime: Handle) -> Result<Self> {
        config.validate()?;
        let registry = Arc::new(ContagionRegistry::new(config.rates));
        let scheduler = ScanScheduler::new(Arc::clone(&registry), spatial, config.scan, runtime);
        Ok(Self { registry, scheduler })
    }

    pub fn registry(&self) -> &Arc<ContagionRegistry> {
        &self.registry
    }

    pub fn scheduler(&self) -> &ScanScheduler {
        &self.scheduler
    }

    /// Register every entity already present when the host starts
    pub fn bootstrap(&self, present: impl IntoIterator<Item = EntityId>) -> usize {
        let mut count = 0;
        for entity in present {
            self.registry.ensure(entity);
            self.scheduler.start(entity);
            count += 1;
        }
        info!(count, "registered entities present at startup");
        count
    }

    /// An entity joined (or rejoined) the world
    ///
    /// Returns true if the entity was seen for the first time.
    pub fn on_entity_active(&self, entity: EntityId) -> bool {
        let (_, created) = self.registry.register(entity);
        if created {
            info!(entity = %entity, "entity has been plagued");
        } else {
            info!(entity = %entity, "entity has returned");
        }
        self.scheduler.start(entity);
        created
    }

    /// An entity left the world; its contagion state is kept
    pub fn on_entity_left(&self, entity: EntityId) {
        self.scheduler.stop(entity);
        info!(entity = %entity, "entity is no longer watched");
    }

    /// Level read used by the metabolism tick
    pub fn infection_level(&self, entity: EntityId) -> Result<u32> {
        self.registry.infection_level(entity)
    }

    pub fn snapshot(&self, entity: EntityId) -> Result<StateSnapshot> {
        self.registry.snapshot(entity)
    }

    pub fn shutdown(&self) {
        self.scheduler.shutdown();
    }
}
