//! Metabolism tick: read the level, translate it, apply the effects
//!
//! `Metabolism` stands in for the host's per-entity metabolic fields. The
//! contagion core never owns them; it only computes what to change.

use tracing::{trace, warn};

use crate::contagion::registry::ContagionRegistry;
use crate::core::config::MetabolismBaseline;
use crate::core::types::EntityId;
use crate::simulation::symptoms::{symptoms_for, Symptom};

/// Comfort value the host treats as "as uncomfortable as it gets"
pub const COMFORT_MIN: f32 = -1.0;

#[derive(Debug, Clone, PartialEq)]
pub struct Metabolism {
    pub pending_health: f32,
    pub calories: f32,
    pub hydration: f32,
    pub comfort: f32,
    pub temperature: f32,
    pub bleeding: f32,
    pub poison: f32,
    /// Live heart-rate reading (0.0 = resting, 1.0 = maximal)
    pub heart_rate: f32,
}

impl Default for Metabolism {
    fn default() -> Self {
        Self {
            pending_health: 0.0,
            calories: 500.0,
            hydration: 250.0,
            comfort: 0.0,
            temperature: 20.0,
            bleeding: 0.0,
            poison: 0.0,
            heart_rate: 0.5,
        }
    }
}

impl Metabolism {
    /// Apply one symptom's delta
    pub fn apply(&mut self, symptom: &Symptom, baseline: &MetabolismBaseline) {
        let heart_term = self.heart_rate / baseline.heart_rate_divisor;
        match *symptom {
            Symptom::HealthRegen { multiplier } => {
                self.pending_health += baseline.health_gain * multiplier;
            }
            Symptom::CalorieLoss { multiplier } => {
                self.calories -= baseline.calories_loss * multiplier + heart_term;
            }
            Symptom::HydrationLoss { multiplier } => {
                self.hydration -= baseline.hydration_loss * multiplier + heart_term;
            }
            Symptom::ComfortMinimum => self.comfort = COMFORT_MIN,
            Symptom::TemperatureDrop { amount } => self.temperature -= amount,
            Symptom::Bleeding { amount } => self.bleeding += amount,
            Symptom::Poison { magnitude } => self.poison = magnitude,
        }
    }

    /// Apply every symptom for `level`, in stage order
    pub fn apply_level(&mut self, level: u32, baseline: &MetabolismBaseline) -> usize {
        let symptoms = symptoms_for(level);
        for symptom in &symptoms {
            self.apply(symptom, baseline);
        }
        symptoms.len()
    }
}

/// One metabolism tick for `entity`
///
/// Returns the infection level that was applied, or `None` if the entity is
/// unknown to the registry (logged, nothing applied).
pub fn metabolism_tick(
    registry: &ContagionRegistry,
    entity: EntityId,
    metabolism: &mut Metabolism,
    baseline: &MetabolismBaseline,
) -> Option<u32> {
    let level = match registry.infection_level(entity) {
        Ok(level) => level,
        Err(err) => {
            warn!(entity = %entity, error = %err, "entity has no state");
            return None;
        }
    };

    let applied = metabolism.apply_level(level, baseline);
    trace!(entity = %entity, level, applied, "metabolism tick");
    Some(level)
}
