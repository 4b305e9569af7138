//! Infection level state machine

use tracing::debug;

use crate::contagion::ledger::AffinityLedger;
use crate::core::config::{ContagionRates, MAX_INFECTION_LEVEL, STAGE_WIDTH};
use crate::core::types::EntityId;

/// Which transition a report produced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Level rose by `vectors * plague_increase_rate`
    Increased { vectors: u32 },
    /// Increase would have crossed the ceiling, level kept
    CeilingHeld { vectors: u32 },
    /// Level fell by `plague_decrease_rate`
    Decreased,
    /// Decrease would have gone below zero, level kept
    FloorHeld,
}

/// Contagion state of one entity
#[derive(Debug, Clone)]
pub struct ContagionState {
    infection_level: u32,
    ledger: AffinityLedger,
    /// Fresh state that has not yet handled any report
    pristine: bool,
}

impl ContagionState {
    pub fn new(owner: EntityId) -> Self {
        Self {
            infection_level: 0,
            ledger: AffinityLedger::new(owner),
            pristine: true,
        }
    }

    pub fn owner(&self) -> EntityId {
        self.ledger.owner()
    }

    pub fn infection_level(&self) -> u32 {
        self.infection_level
    }

    pub fn stage(&self) -> u32 {
        stage(self.infection_level)
    }

    pub fn ledger(&self) -> &AffinityLedger {
        &self.ledger
    }

    pub fn is_pristine(&self) -> bool {
        self.pristine
    }

    /// Raise the level by `vectors` stages' worth, all or nothing
    pub fn increase(&mut self, vectors: u32, rates: &ContagionRates) -> Transition {
        let next = vectors
            .checked_mul(rates.plague_increase_rate)
            .and_then(|delta| self.infection_level.checked_add(delta))
            .filter(|&level| level <= MAX_INFECTION_LEVEL);

        match next {
            Some(level) => {
                self.infection_level = level;
                Transition::Increased { vectors }
            }
            None => Transition::CeilingHeld { vectors },
        }
    }

    /// Lower the level by one decrease step, all or nothing
    pub fn decrease(&mut self, rates: &ContagionRates) -> Transition {
        match self.infection_level.checked_sub(rates.plague_decrease_rate) {
            Some(level) => {
                self.infection_level = level;
                Transition::Decreased
            }
            None => Transition::FloorHeld,
        }
    }

    /// Handle a proximity report
    ///
    /// `neighbors` is the raw query result; `None` slots are handles that did
    /// not resolve to an entity. The owner is expected to appear in the set
    /// and is skipped by the ledger's self check, so it never counts as a
    /// contagion vector.
    pub fn on_proximity<I>(&mut self, neighbors: I, rates: &ContagionRates) -> Transition
    where
        I: IntoIterator<Item = Option<EntityId>>,
    {
        let mut vectors = 0u32;
        for neighbor in neighbors.into_iter().flatten() {
            if let Ok(affinity) = self.ledger.bump(neighbor, rates.affinity_inc_rate) {
                if affinity >= rates.plague_min_affinity {
                    vectors += 1;
                }
            }
        }
        self.pristine = false;

        let transition = if vectors > 0 {
            self.increase(vectors, rates)
        } else {
            self.decrease(rates)
        };
        self.log_transition(transition);
        transition
    }

    /// Handle an isolation report: fade every bond, then lose one step
    ///
    /// A pristine state has no bonds yet, so its first call skips the fade.
    pub fn on_alone(&mut self, rates: &ContagionRates) -> Transition {
        if self.pristine {
            self.pristine = false;
        } else {
            self.ledger.decay_all(rates.affinity_dec_rate);
        }

        let transition = self.decrease(rates);
        self.log_transition(transition);
        transition
    }

    fn log_transition(&self, transition: Transition) {
        if matches!(transition, Transition::Increased { .. } | Transition::Decreased) {
            debug!(
                entity = %self.owner(),
                level = self.infection_level,
                stage = self.stage(),
                ?transition,
                "infection level changed"
            );
        }
    }
}

/// Symptom stage (0..=10) for an infection level
pub fn stage(level: u32) -> u32 {
    level.min(MAX_INFECTION_LEVEL) / STAGE_WIDTH
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const OWNER: EntityId = EntityId(100);

    fn rates() -> ContagionRates {
        ContagionRates::default()
    }

    fn at_level(level: u32) -> ContagionState {
        let mut state = ContagionState::new(OWNER);
        state.infection_level = level;
        state.pristine = false;
        state
    }

    #[test]
    fn test_fresh_state_is_pristine() {
        let state = ContagionState::new(OWNER);
        assert_eq!(state.infection_level(), 0);
        assert!(state.is_pristine());
        assert!(state.ledger().is_empty());
    }

    #[test]
    fn test_increase_is_all_or_nothing() {
        let mut state = at_level(8000);

        assert_eq!(state.increase(3, &rates()), Transition::CeilingHeld { vectors: 3 });
        assert_eq!(state.infection_level(), 8000);

        assert_eq!(state.increase(2, &rates()), Transition::Increased { vectors: 2 });
        assert_eq!(state.infection_level(), 10_000);

        assert_eq!(state.increase(1, &rates()), Transition::CeilingHeld { vectors: 1 });
        assert_eq!(state.infection_level(), 10_000);
    }

    #[test]
    fn test_increase_with_absurd_vector_count_does_not_overflow() {
        let mut state = at_level(0);
        assert_eq!(state.increase(u32::MAX, &rates()), Transition::CeilingHeld { vectors: u32::MAX });
        assert_eq!(state.infection_level(), 0);
    }

    #[test]
    fn test_decrease_is_all_or_nothing() {
        let mut custom = rates();
        custom.plague_decrease_rate = 700;
        let mut state = at_level(1000);

        assert_eq!(state.decrease(&custom), Transition::Decreased);
        assert_eq!(state.infection_level(), 300);
        assert_eq!(state.decrease(&custom), Transition::FloorHeld);
        assert_eq!(state.infection_level(), 300);
    }

    #[test]
    fn test_self_in_neighbors_never_counts() {
        let mut state = at_level(0);
        for _ in 0..5 {
            let transition = state.on_proximity([Some(OWNER)], &rates());
            assert_eq!(transition, Transition::FloorHeld);
        }
        assert_eq!(state.infection_level(), 0);
        assert!(state.ledger().is_empty());
    }

    #[test]
    fn test_unresolved_neighbor_skipped() {
        let mut state = at_level(0);
        let peer = EntityId(7);
        state.on_proximity([Some(OWNER), None, Some(peer)], &rates());
        assert_eq!(state.ledger().len(), 1);
        assert_eq!(state.ledger().score(peer), Some(0));
    }

    #[test]
    fn test_proximity_without_vectors_decreases() {
        let mut state = at_level(3000);
        let transition = state.on_proximity([Some(OWNER), Some(EntityId(5))], &rates());
        assert_eq!(transition, Transition::Decreased);
        assert_eq!(state.infection_level(), 2000);
    }

    #[test]
    fn test_pristine_skips_first_decay_only() {
        let mut state = ContagionState::new(OWNER);
        state.on_alone(&rates());
        assert!(!state.is_pristine());

        // Build a bond of 20, then isolate twice
        let peer = EntityId(9);
        for _ in 0..3 {
            state.on_proximity([Some(peer)], &rates());
        }
        assert_eq!(state.ledger().score(peer), Some(20));

        state.on_alone(&rates());
        state.on_alone(&rates());
        assert_eq!(state.ledger().score(peer), Some(18));
    }

    #[test]
    fn test_first_proximity_clears_pristine() {
        let mut state = ContagionState::new(OWNER);
        let peer = EntityId(9);
        state.on_proximity([Some(OWNER), Some(peer)], &rates());
        state.on_proximity([Some(OWNER), Some(peer)], &rates());
        assert_eq!(state.ledger().score(peer), Some(10));

        state.on_alone(&rates());
        assert_eq!(state.ledger().score(peer), Some(9));
    }

    #[test]
    fn test_stage_bands() {
        assert_eq!(stage(0), 0);
        assert_eq!(stage(999), 0);
        assert_eq!(stage(1000), 1);
        assert_eq!(stage(9999), 9);
        assert_eq!(stage(10_000), 10);
    }

    #[derive(Debug, Clone)]
    enum Event {
        Near(Vec<u64>),
        Alone,
        Increase(u32),
        Decrease,
    }

    fn event() -> impl Strategy<Value = Event> {
        prop_oneof![
            prop::collection::vec(95u64..105, 0..8).prop_map(Event::Near),
            Just(Event::Alone),
            (0u32..12).prop_map(Event::Increase),
            Just(Event::Decrease),
        ]
    }

    proptest! {
        #[test]
        fn prop_level_stays_in_range(
            events in prop::collection::vec(event(), 0..300),
            increase in 1u32..=MAX_INFECTION_LEVEL,
            decrease in 1u32..3000,
        ) {
            let rates = ContagionRates {
                plague_increase_rate: increase,
                plague_decrease_rate: decrease,
                ..ContagionRates::default()
            };
            let mut state = ContagionState::new(OWNER);

            for event in events {
                let before = state.infection_level();
                match event {
                    Event::Near(ids) => {
                        state.on_proximity(ids.into_iter().map(|id| Some(EntityId(id))), &rates);
                    }
                    Event::Alone => {
                        state.on_alone(&rates);
                    }
                    Event::Increase(n) => {
                        if state.increase(n, &rates) == (Transition::CeilingHeld { vectors: n }) {
                            prop_assert_eq!(state.infection_level(), before);
                        }
                    }
                    Event::Decrease => {
                        if state.decrease(&rates) == Transition::FloorHeld {
                            prop_assert_eq!(state.infection_level(), before);
                            prop_assert!(before < decrease);
                        }
                    }
                }
                prop_assert!(state.infection_level() <= MAX_INFECTION_LEVEL);
                prop_assert_eq!(state.ledger().score(OWNER), None);
            }
        }
    }
}
