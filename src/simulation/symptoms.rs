//! Infection level -> staged physiological effects
//!
//! Stages are cumulative: the table is walked from the lowest threshold up
//! and every met stage contributes its effect, stopping at the first unmet
//! one. Stage 4 undoes stage 1's regen bonus rather than replacing it, so
//! order matters.
//!
//! Stage 10 is the odd one out: poison requires the level to be exactly
//! 10000, not merely at or above it.

use crate::core::config::MAX_INFECTION_LEVEL;

/// One physiological effect, relative to the host's baseline rates
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Symptom {
    /// Adds `multiplier` x baseline health gain to pending health
    HealthRegen { multiplier: f32 },
    /// Removes `multiplier` x baseline calorie loss, plus a heart-rate term
    CalorieLoss { multiplier: f32 },
    /// Removes `multiplier` x baseline hydration loss, plus a heart-rate term
    HydrationLoss { multiplier: f32 },
    ComfortMinimum,
    TemperatureDrop { amount: f32 },
    Bleeding { amount: f32 },
    Poison { magnitude: f32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Threshold {
    AtLeast(u32),
    Exactly(u32),
}

impl Threshold {
    pub fn is_met(self, level: u32) -> bool {
        match self {
            Threshold::AtLeast(min) => level >= min,
            Threshold::Exactly(value) => level == value,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SymptomStage {
    pub threshold: Threshold,
    pub symptom: Symptom,
}

const fn at_least(min: u32, symptom: Symptom) -> SymptomStage {
    SymptomStage { threshold: Threshold::AtLeast(min), symptom }
}

/// Ascending stage table
pub static SYMPTOM_STAGES: [SymptomStage; 10] = [
    at_least(1, Symptom::HealthRegen { multiplier: 0.5 }),
    at_least(1000, Symptom::CalorieLoss { multiplier: 3.0 }),
    at_least(2000, Symptom::HydrationLoss { multiplier: 3.0 }),
    at_least(3000, Symptom::HealthRegen { multiplier: -0.5 }),
    at_least(4000, Symptom::ComfortMinimum),
    at_least(5000, Symptom::CalorieLoss { multiplier: 5.0 }),
    at_least(6000, Symptom::HydrationLoss { multiplier: 5.0 }),
    at_least(7000, Symptom::TemperatureDrop { amount: 0.05 }),
    at_least(8000, Symptom::Bleeding { amount: 0.005 }),
    SymptomStage {
        threshold: Threshold::Exactly(MAX_INFECTION_LEVEL),
        symptom: Symptom::Poison { magnitude: 2.0 },
    },
];

/// Active stages for `level`, lowest first
pub fn active_stages(level: u32) -> impl Iterator<Item = &'static SymptomStage> {
    SYMPTOM_STAGES
        .iter()
        .take_while(move |stage| stage.threshold.is_met(level))
}

/// Effects to apply for `level`, in application order
pub fn symptoms_for(level: u32) -> Vec<Symptom> {
    active_stages(level).map(|stage| stage.symptom).collect()
}
