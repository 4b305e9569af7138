//! End-to-end contagion behavior through the registry
//!
//! These drive proximity/alone reports by hand, the same way the scanners
//! would, and check the level trajectory and the resulting symptoms.

use plague::contagion::{ContagionRegistry, Transition};
use plague::core::config::{ContagionRates, MetabolismBaseline, MAX_INFECTION_LEVEL};
use plague::core::types::EntityId;
use plague::simulation::metabolism::{metabolism_tick, Metabolism};
use plague::simulation::symptoms::{symptoms_for, Symptom};

const SUBJECT: EntityId = EntityId(1);
const PEER_A: EntityId = EntityId(2);
const PEER_B: EntityId = EntityId(3);

/// Hits as a scanner reports them: the subject sees itself too
fn hits(ids: &[EntityId]) -> Vec<Option<EntityId>> {
    std::iter::once(SUBJECT).chain(ids.iter().copied()).map(Some).collect()
}

fn registry_with_subject() -> ContagionRegistry {
    let registry = ContagionRegistry::new(ContagionRates::default());
    registry.ensure(SUBJECT);
    registry
}

#[test]
fn test_threshold_crossing_jumps_two_stages() {
    let registry = registry_with_subject();

    // First contact only records the peers
    let transition = registry.report_proximity(SUBJECT, hits(&[PEER_A, PEER_B])).unwrap();
    assert_eq!(transition, Transition::FloorHeld);
    assert_eq!(registry.infection_level(SUBJECT).unwrap(), 0);

    // Second contact lifts both peers to 10 = plague_min_affinity
    let transition = registry.report_proximity(SUBJECT, hits(&[PEER_A, PEER_B])).unwrap();
    assert_eq!(transition, Transition::Increased { vectors: 2 });
    assert_eq!(registry.infection_level(SUBJECT).unwrap(), 2000);
}

#[test]
fn test_isolation_walks_level_down_to_floor() {
    let registry = registry_with_subject();
    registry.report_proximity(SUBJECT, hits(&[PEER_A, PEER_B])).unwrap();
    registry.report_proximity(SUBJECT, hits(&[PEER_A, PEER_B])).unwrap();
    assert_eq!(registry.infection_level(SUBJECT).unwrap(), 2000);

    let mut levels = Vec::new();
    for _ in 0..3 {
        registry.report_alone(SUBJECT).unwrap();
        levels.push(registry.infection_level(SUBJECT).unwrap());
    }
    assert_eq!(levels, vec![1000, 0, 0]);

    // Bonds faded by one per isolated scan
    let snapshot = registry.snapshot(SUBJECT).unwrap();
    assert_eq!(snapshot.affinities, vec![(PEER_A, 7), (PEER_B, 7)]);
}

#[test]
fn test_full_infection_reaches_poison() {
    let registry = registry_with_subject();
    let peers: Vec<EntityId> = (10..15).map(EntityId).collect();

    registry.report_proximity(SUBJECT, hits(&peers)).unwrap();
    registry.report_proximity(SUBJECT, hits(&peers)).unwrap();
    assert_eq!(registry.infection_level(SUBJECT).unwrap(), 5000);
    registry.report_proximity(SUBJECT, hits(&peers)).unwrap();
    assert_eq!(registry.infection_level(SUBJECT).unwrap(), MAX_INFECTION_LEVEL);

    // Already at the ceiling: held, not clamped past it
    let transition = registry.report_proximity(SUBJECT, hits(&peers)).unwrap();
    assert_eq!(transition, Transition::CeilingHeld { vectors: 5 });

    let mut metabolism = Metabolism::default();
    let level = metabolism_tick(&registry, SUBJECT, &mut metabolism, &MetabolismBaseline::default());
    assert_eq!(level, Some(MAX_INFECTION_LEVEL));
    assert_eq!(metabolism.poison, 2.0);
}

#[test]
fn test_ceiling_is_all_or_nothing() {
    let registry = registry_with_subject();
    let peers: Vec<EntityId> = (10..13).map(EntityId).collect();

    // 3 vectors per report: 0 -> 3000 -> 6000 -> 9000, then 12000 is refused
    registry.report_proximity(SUBJECT, hits(&peers)).unwrap();
    for expected in [3000, 6000, 9000, 9000, 9000] {
        registry.report_proximity(SUBJECT, hits(&peers)).unwrap();
        assert_eq!(registry.infection_level(SUBJECT).unwrap(), expected);
    }

    // A single vector still fits
    registry.report_proximity(SUBJECT, hits(&peers[..1])).unwrap();
    assert_eq!(registry.infection_level(SUBJECT).unwrap(), MAX_INFECTION_LEVEL);
}

#[test]
fn test_poison_boundary() {
    let poison = Symptom::Poison { magnitude: 2.0 };
    assert!(symptoms_for(MAX_INFECTION_LEVEL).contains(&poison));
    assert!(!symptoms_for(MAX_INFECTION_LEVEL - 1).contains(&poison));
}

#[test]
fn test_first_contact_scores_zero() {
    // First sighting records the peer at 0; it only starts counting on the
    // second sighting.
    let registry = registry_with_subject();
    registry.report_proximity(SUBJECT, hits(&[PEER_A])).unwrap();
    assert_eq!(registry.snapshot(SUBJECT).unwrap().affinities, vec![(PEER_A, 0)]);

    registry.report_proximity(SUBJECT, hits(&[PEER_A])).unwrap();
    assert_eq!(registry.snapshot(SUBJECT).unwrap().affinities, vec![(PEER_A, 10)]);
}

#[test]
fn test_self_in_report_does_not_inflate_vectors() {
    let registry = registry_with_subject();

    // Report the subject many times over: never a vector, never a ledger entry
    for _ in 0..10 {
        let transition = registry
            .report_proximity(SUBJECT, vec![Some(SUBJECT), Some(SUBJECT)])
            .unwrap();
        assert_eq!(transition, Transition::FloorHeld);
    }
    assert!(registry.snapshot(SUBJECT).unwrap().affinities.is_empty());

    // With one real peer the count is exactly one, not two
    registry.report_proximity(SUBJECT, hits(&[PEER_A])).unwrap();
    let transition = registry.report_proximity(SUBJECT, hits(&[PEER_A])).unwrap();
    assert_eq!(transition, Transition::Increased { vectors: 1 });
}

#[test]
fn test_weak_neighbors_decrease_level() {
    let registry = registry_with_subject();
    registry.report_proximity(SUBJECT, hits(&[PEER_A, PEER_B])).unwrap();
    registry.report_proximity(SUBJECT, hits(&[PEER_A, PEER_B])).unwrap();
    assert_eq!(registry.infection_level(SUBJECT).unwrap(), 2000);

    // Strangers only: no vectors, one decrease step
    let strangers = [EntityId(50), EntityId(51)];
    let transition = registry.report_proximity(SUBJECT, hits(&strangers)).unwrap();
    assert_eq!(transition, Transition::Decreased);
    assert_eq!(registry.infection_level(SUBJECT).unwrap(), 1000);
}
