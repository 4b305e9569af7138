//! Contagion configuration with documented constants
//!
//! All magic numbers are collected here with explanations of their purpose
//! and how they interact with each other. Every field has a default, so a
//! TOML file only needs to name the values it overrides.

use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use crate::core::error::{PlagueError, Result};
use crate::core::types::LayerMask;

/// Upper bound of the infection level scale
pub const MAX_INFECTION_LEVEL: u32 = 10_000;

/// Width of one symptom stage on the infection scale
pub const STAGE_WIDTH: u32 = 1_000;

/// Longest scan delay or period accepted (one day, in seconds)
///
/// Keeps scan deadlines far from the limits of the runtime's clock.
pub const MAX_SCAN_SECS: f32 = 86_400.0;

/// Rates driving the affinity ledger and the infection state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ContagionRates {
    /// Infection gained per contagion vector in a single proximity report
    ///
    /// At 1000, every qualifying neighbor pushes the entity one full stage.
    pub plague_increase_rate: u32,

    /// Infection lost per report without any contagion vector
    pub plague_decrease_rate: u32,

    /// Affinity a neighbor needs before it counts as a contagion vector
    ///
    /// With affinity_inc_rate = 10 this is crossed on the second scan that
    /// sees the same neighbor (first contact records 0, second adds 10).
    pub plague_min_affinity: u32,

    /// Affinity gained per repeated contact with the same neighbor
    pub affinity_inc_rate: u32,

    /// Affinity lost by every known neighbor per isolated scan
    ///
    /// Deliberately much smaller than affinity_inc_rate: a bond built over
    /// a few scans takes many lonely scans to fade.
    pub affinity_dec_rate: u32,
}

impl Default for ContagionRates {
    fn default() -> Self {
        Self {
            plague_increase_rate: 1000,
            plague_decrease_rate: 1000,
            plague_min_affinity: 10,
            affinity_inc_rate: 10,
            affinity_dec_rate: 1,
        }
    }
}

/// Proximity scan scheduling and query shape
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Radius of the neighbor query (world units)
    pub plague_range: f32,

    /// Delay before an entity's first scan after it becomes active (seconds)
    pub initial_delay_secs: f32,

    /// Interval between scans of one entity (seconds)
    pub period_secs: f32,

    /// Layers the neighbor query is restricted to
    pub layers: LayerMask,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            plague_range: 20.0,
            initial_delay_secs: 2.0,
            period_secs: 1.5,
            layers: LayerMask::PLAYERS,
        }
    }
}

impl ScanConfig {
    /// Delay before the first scan; negative values mean "scan immediately"
    ///
    /// Values `validate` would reject fall back to the default delay.
    pub fn initial_delay(&self) -> Duration {
        scan_duration(self.initial_delay_secs.max(0.0))
            .unwrap_or_else(|| Duration::from_secs_f32(Self::default().initial_delay_secs))
    }

    /// Interval between scans; never zero
    pub fn period(&self) -> Duration {
        scan_duration(self.period_secs)
            .filter(|period| !period.is_zero())
            .unwrap_or_else(|| Duration::from_secs_f32(Self::default().period_secs))
    }
}

/// `secs` as a `Duration`, if it is a finite, non-negative value within
/// `MAX_SCAN_SECS`
fn scan_duration(secs: f32) -> Option<Duration> {
    if !(secs <= MAX_SCAN_SECS) {
        return None;
    }
    Duration::try_from_secs_f32(secs).ok()
}

/// Baseline metabolic rates the symptom multipliers scale
///
/// These are the host's default per-tick rates:
/// - health gain 0.03
/// - calorie loss 0 - 0.05
/// - hydration loss 0 - 0.025
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct MetabolismBaseline {
    pub health_gain: f32,
    pub calories_loss: f32,
    pub hydration_loss: f32,

    /// Heart rate is divided by this before being added to a scaled loss
    pub heart_rate_divisor: f32,
}

impl Default for MetabolismBaseline {
    fn default() -> Self {
        Self {
            health_gain: 0.03,
            calories_loss: 0.05,
            hydration_loss: 0.025,
            heart_rate_divisor: 10.0,
        }
    }
}

/// Configuration for the whole contagion system
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct PlagueConfig {
    pub rates: ContagionRates,
    pub scan: ScanConfig,
    pub metabolism: MetabolismBaseline,
}

impl PlagueConfig {
    /// Create a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a config from TOML text; missing fields keep their defaults
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: PlagueConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a config file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Validate configuration for internal consistency
    pub fn validate(&self) -> Result<()> {
        let rates = &self.rates;
        if rates.plague_increase_rate == 0 || rates.plague_decrease_rate == 0 {
            return Err(PlagueError::InvalidConfig(
                "plague increase/decrease rates must be positive".into(),
            ));
        }

        // A single vector must be able to move the level at all
        if rates.plague_increase_rate > MAX_INFECTION_LEVEL {
            return Err(PlagueError::InvalidConfig(format!(
                "plague_increase_rate ({}) exceeds the infection ceiling ({})",
                rates.plague_increase_rate, MAX_INFECTION_LEVEL
            )));
        }

        if rates.affinity_inc_rate == 0 {
            return Err(PlagueError::InvalidConfig(
                "affinity_inc_rate must be positive".into(),
            ));
        }

        if !(self.scan.plague_range > 0.0) || !self.scan.plague_range.is_finite() {
            return Err(PlagueError::InvalidConfig(format!(
                "plague_range ({}) must be a positive, finite distance",
                self.scan.plague_range
            )));
        }

        let period = scan_duration(self.scan.period_secs).filter(|p| !p.is_zero());
        if period.is_none() {
            return Err(PlagueError::InvalidConfig(format!(
                "scan period ({}) must be positive and at most {} seconds",
                self.scan.period_secs, MAX_SCAN_SECS
            )));
        }

        let delay = self.scan.initial_delay_secs;
        if delay.is_nan() || scan_duration(delay.max(0.0)).is_none() {
            return Err(PlagueError::InvalidConfig(format!(
                "scan initial delay ({}) must be at most {} seconds",
                delay, MAX_SCAN_SECS
            )));
        }

        if !(self.metabolism.heart_rate_divisor > 0.0) {
            return Err(PlagueError::InvalidConfig(
                "heart_rate_divisor must be positive".into(),
            ));
        }

        Ok(())
    }
}
