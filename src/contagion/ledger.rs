//! Per-entity affinity bookkeeping

use ahash::AHashMap;

use crate::core::error::{PlagueError, Result};
use crate::core::types::EntityId;

/// Accumulated affinity one entity holds toward the peers it has been near
///
/// Scores are unsigned and saturate at `u32::MAX`, so they can never go
/// negative or wrap. The owner never appears as a key.
#[derive(Debug, Clone)]
pub struct AffinityLedger {
    owner: EntityId,
    scores: AHashMap<EntityId, u32>,
}

impl AffinityLedger {
    pub fn new(owner: EntityId) -> Self {
        Self {
            owner,
            scores: AHashMap::new(),
        }
    }

    pub fn owner(&self) -> EntityId {
        self.owner
    }

    /// Record one contact with `peer` and return the resulting score
    ///
    /// The first contact only creates the entry at 0; scoring starts with
    /// the second contact. Bumping the owner is rejected with
    /// `InvalidSelfReference` and leaves the ledger untouched.
    pub fn bump(&mut self, peer: EntityId, increment: u32) -> Result<u32> {
        if peer == self.owner {
            return Err(PlagueError::InvalidSelfReference(peer));
        }

        let score = self
            .scores
            .entry(peer)
            .and_modify(|score| *score = score.saturating_add(increment))
            .or_insert(0);

        Ok(*score)
    }

    /// Fade every known peer by `decrement`, flooring at zero
    pub fn decay_all(&mut self, decrement: u32) {
        for score in self.scores.values_mut() {
            *score = score.saturating_sub(decrement);
        }
    }

    pub fn score(&self, peer: EntityId) -> Option<u32> {
        self.scores.get(&peer).copied()
    }

    pub fn len(&self) -> usize {
        self.scores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }

    /// All entries sorted by peer id, for stable inspection output
    pub fn entries(&self) -> Vec<(EntityId, u32)> {
        let mut entries: Vec<_> = self.scores.iter().map(|(&id, &score)| (id, score)).collect();
        entries.sort_unstable_by_key(|(id, _)| *id);
        entries
    }
}
