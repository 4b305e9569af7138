//! Process-wide contagion registry
//!
//! Lifecycle: an entry is created the first time an entity is seen active
//! and is never removed while the process runs. Entities that leave and come
//! back pick up exactly where they left off.
//!
//! Each entry sits behind its own mutex. The outer map lock is only held
//! long enough to find or insert an entry, so work on one entity never
//! blocks work on another.

use ahash::AHashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

use crate::contagion::state::{ContagionState, Transition};
use crate::core::config::ContagionRates;
use crate::core::error::{PlagueError, Result};
use crate::core::types::EntityId;

/// Shared handle to one entity's state
pub type SharedState = Arc<Mutex<ContagionState>>;

/// Point-in-time copy of one entity's state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateSnapshot {
    pub entity: EntityId,
    pub infection_level: u32,
    pub stage: u32,
    pub affinities: Vec<(EntityId, u32)>,
}

pub struct ContagionRegistry {
    rates: ContagionRates,
    states: RwLock<AHashMap<EntityId, SharedState>>,
}

impl ContagionRegistry {
    pub fn new(rates: ContagionRates) -> Self {
        Self {
            rates,
            states: RwLock::new(AHashMap::new()),
        }
    }

    pub fn rates(&self) -> &ContagionRates {
        &self.rates
    }

    /// Existing state for `entity`, or a fresh one stored on the spot
    pub fn ensure(&self, entity: EntityId) -> SharedState {
        self.register(entity).0
    }

    /// Like `ensure`, also reporting whether the entry was just created
    pub fn register(&self, entity: EntityId) -> (SharedState, bool) {
        if let Some(state) = self.read_map().get(&entity) {
            return (Arc::clone(state), false);
        }

        let mut states = self.states.write().unwrap_or_else(PoisonError::into_inner);
        // Another caller may have won the race between the two locks
        let mut created = false;
        let state = states.entry(entity).or_insert_with(|| {
            created = true;
            Arc::new(Mutex::new(ContagionState::new(entity)))
        });
        (Arc::clone(state), created)
    }

    /// Lookup only; never creates
    pub fn get(&self, entity: EntityId) -> Result<SharedState> {
        self.read_map()
            .get(&entity)
            .cloned()
            .ok_or(PlagueError::EntityNotFound(entity))
    }

    pub fn contains(&self, entity: EntityId) -> bool {
        self.read_map().contains_key(&entity)
    }

    pub fn len(&self) -> usize {
        self.read_map().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read_map().is_empty()
    }

    /// Current infection level, as read by the metabolism tick
    pub fn infection_level(&self, entity: EntityId) -> Result<u32> {
        self.with_state(entity, |state| state.infection_level())
    }

    /// Apply a proximity report to `entity`
    pub fn report_proximity<I>(&self, entity: EntityId, neighbors: I) -> Result<Transition>
    where
        I: IntoIterator<Item = Option<EntityId>>,
    {
        let rates = self.rates;
        self.with_state(entity, |state| state.on_proximity(neighbors, &rates))
    }

    /// Apply an isolation report to `entity`
    pub fn report_alone(&self, entity: EntityId) -> Result<Transition> {
        let rates = self.rates;
        self.with_state(entity, |state| state.on_alone(&rates))
    }

    pub fn snapshot(&self, entity: EntityId) -> Result<StateSnapshot> {
        self.with_state(entity, |state| StateSnapshot {
            entity,
            infection_level: state.infection_level(),
            stage: state.stage(),
            affinities: state.ledger().entries(),
        })
    }

    /// Run `f` with exclusive access to one entity's state
    pub fn with_state<T>(&self, entity: EntityId, f: impl FnOnce(&mut ContagionState) -> T) -> Result<T> {
        let shared = self.get(entity)?;
        let mut guard = lock_state(&shared);
        Ok(f(&mut *guard))
    }

    fn read_map(&self) -> std::sync::RwLockReadGuard<'_, AHashMap<EntityId, SharedState>> {
        self.states.read().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Lock a state, recovering from poisoning
///
/// Every mutation completes before its guard drops, so a panic elsewhere
/// cannot leave a half-applied transition behind.
pub fn lock_state(state: &Mutex<ContagionState>) -> MutexGuard<'_, ContagionState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}
