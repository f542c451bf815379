//! Engine configuration with documented constants
//!
//! All tuning numbers are collected here with explanations of their purpose
//! and how they interact with each other. Every section deserializes from TOML
//! with per-field defaults, so a config file only needs the values it changes.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crate::core::error::{EngineError, Result};

/// Top-level engine configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub simulation: SimulationConfig,
    pub needs: NeedsConfig,
    pub battle: BattleConfig,
}

/// Scheduler pacing and seeding
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Wall-clock length of one tick in milliseconds
    ///
    /// Passive production rates are expressed per minute and scaled by this.
    pub tick_interval_ms: u64,

    /// Ticks between day rollovers
    ///
    /// At the default 1000 ms tick, 120 ticks make a two minute day.
    pub ticks_per_day: u64,

    /// Seed for the deterministic random source
    pub seed: u64,

    /// Save through the persistence adapter every N ticks (0 disables)
    pub autosave_every_ticks: u64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 1000,
            ticks_per_day: 120,
            seed: 42,
            autosave_every_ticks: 30,
        }
    }
}

/// Need decay rates. Needs run 0-100 where 100 is fully satisfied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NeedsConfig {
    // === PER TICK ===
    /// Hunger lost per tick while idle
    pub idle_hunger_decay: f64,
    /// Rest lost per tick while idle
    pub idle_rest_decay: f64,
    /// Hunger lost per tick while busy in a queue
    ///
    /// Busy entities tire faster: at 0.1 an explorer loses twice the hunger
    /// of an idle colonist.
    pub busy_hunger_decay: f64,
    /// Rest lost per tick while busy in a queue
    pub busy_rest_decay: f64,
    /// Below this hunger or rest, health and morale erode every tick
    pub distress_threshold: f64,
    /// Health and morale lost per tick while distressed
    pub distress_penalty: f64,

    // === PER DAY (idle entities only) ===
    pub daily_hunger_decay: f64,
    pub daily_rest_decay: f64,
    /// Below this hunger or rest, the daily morale/health penalties apply
    pub daily_low_threshold: f64,
    pub daily_hunger_morale_penalty: f64,
    pub daily_hunger_health_penalty: f64,
    pub daily_rest_morale_penalty: f64,
}

impl Default for NeedsConfig {
    fn default() -> Self {
        Self {
            idle_hunger_decay: 0.05,
            idle_rest_decay: 0.03,
            busy_hunger_decay: 0.1,
            busy_rest_decay: 0.15,
            distress_threshold: 20.0,
            distress_penalty: 0.1,

            daily_hunger_decay: 5.0,
            daily_rest_decay: 3.0,
            daily_low_threshold: 30.0,
            daily_hunger_morale_penalty: 10.0,
            daily_hunger_health_penalty: 5.0,
            daily_rest_morale_penalty: 5.0,
        }
    }
}

/// Battle and raid tuning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BattleConfig {
    /// Uniform random multiplier applied to the attacker's advantage
    ///
    /// Victory when advantage * factor > 0.5, so with [0.8, 1.2] an even
    /// fight is a coin flip and a 2:1 power ratio wins most of the time.
    pub random_factor_min: f64,
    pub random_factor_max: f64,

    /// Fraction of force lost by the winning side
    pub winner_attrition_min: f64,
    pub winner_attrition_max: f64,

    /// Fraction of force lost by the losing side
    pub loser_attrition_min: f64,
    pub loser_attrition_max: f64,

    /// Share of the loser's holdings taken as loot
    pub loot_fraction: f64,

    /// Per-resource loot share overriding `loot_fraction`
    pub loot_overrides: BTreeMap<String, f64>,

    /// Power every kingdom has before buildings and units
    pub base_power: f64,

    /// Time before the same rival can be raided again
    pub raid_cooldown_ms: u64,
}

impl Default for BattleConfig {
    fn default() -> Self {
        let mut loot_overrides = BTreeMap::new();
        loot_overrides.insert("gold".to_string(), 0.3);

        Self {
            random_factor_min: 0.8,
            random_factor_max: 1.2,
            winner_attrition_min: 0.02,
            winner_attrition_max: 0.10,
            loser_attrition_min: 0.10,
            loser_attrition_max: 0.30,
            loot_fraction: 0.2,
            loot_overrides,
            base_power: 100.0,
            raid_cooldown_ms: 10_000,
        }
    }
}

impl BattleConfig {
    /// Loot share for a resource
    pub fn loot_share(&self, resource: &str) -> f64 {
        self.loot_overrides
            .get(resource)
            .copied()
            .unwrap_or(self.loot_fraction)
    }
}

impl EngineConfig {
    /// Create a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from a TOML file
    pub fn load_from_toml(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::parse_toml(&content)
    }

    /// Parse and validate configuration from a TOML string
    pub fn parse_toml(content: &str) -> Result<Self> {
        let config: EngineConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration for internal consistency
    pub fn validate(&self) -> Result<()> {
        let sim = &self.simulation;
        if sim.tick_interval_ms == 0 {
            return Err(EngineError::Config("tick_interval_ms must be positive".into()));
        }
        if sim.ticks_per_day == 0 {
            return Err(EngineError::Config("ticks_per_day must be positive".into()));
        }

        let needs = &self.needs;
        let rates = [
            needs.idle_hunger_decay,
            needs.idle_rest_decay,
            needs.busy_hunger_decay,
            needs.busy_rest_decay,
            needs.distress_penalty,
            needs.daily_hunger_decay,
            needs.daily_rest_decay,
        ];
        if rates.iter().any(|r| *r < 0.0) {
            return Err(EngineError::Config("Decay rates must not be negative".into()));
        }

        let battle = &self.battle;
        if battle.random_factor_min <= 0.0 || battle.random_factor_min > battle.random_factor_max {
            return Err(EngineError::Config(format!(
                "random factor range [{}, {}] is invalid",
                battle.random_factor_min, battle.random_factor_max
            )));
        }
        for (name, lo, hi) in [
            ("winner_attrition", battle.winner_attrition_min, battle.winner_attrition_max),
            ("loser_attrition", battle.loser_attrition_min, battle.loser_attrition_max),
        ] {
            if lo < 0.0 || hi > 1.0 || lo > hi {
                return Err(EngineError::Config(format!(
                    "{name} range [{lo}, {hi}] must lie within [0, 1]"
                )));
            }
        }
        let shares = std::iter::once(battle.loot_fraction).chain(battle.loot_overrides.values().copied());
        for share in shares {
            if !(0.0..=1.0).contains(&share) {
                return Err(EngineError::Config(format!("loot share {share} outside [0, 1]")));
            }
        }

        Ok(())
    }

    /// Milliseconds of wall time in one game day
    pub fn day_length_ms(&self) -> u64 {
        self.simulation
            .tick_interval_ms
            .saturating_mul(self.simulation.ticks_per_day)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(EngineConfig::default().validate().is_ok());
        assert_eq!(EngineConfig::default().day_length_ms(), 120_000);
    }

    #[test]
    fn test_day_length_saturates() {
        let mut config = EngineConfig::default();
        config.simulation.tick_interval_ms = u64::MAX / 2;
        config.simulation.ticks_per_day = 3;
        assert_eq!(config.day_length_ms(), u64::MAX);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = EngineConfig::parse_toml(
            r#"
            [simulation]
            seed = 7

            [battle]
            loot_fraction = 0.25
            "#,
        )
        .unwrap();

        assert_eq!(config.simulation.seed, 7);
        assert_eq!(config.simulation.tick_interval_ms, 1000);
        assert_eq!(config.battle.loot_share("food"), 0.25);
        assert_eq!(config.battle.loot_share("gold"), 0.3);
    }

    #[test]
    fn test_invalid_random_range_rejected() {
        let result = EngineConfig::parse_toml(
            r#"
            [battle]
            random_factor_min = 1.5
            random_factor_max = 1.2
            "#,
        );
        assert!(matches!(result, Err(EngineError::Config(_))));
    }

    #[test]
    fn test_zero_tick_interval_rejected() {
        let mut config = EngineConfig::default();
        config.simulation.tick_interval_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_malformed_toml_is_toml_error() {
        let result = EngineConfig::parse_toml("[simulation\nseed = ");
        assert!(matches!(result, Err(EngineError::TomlError(_))));
    }
}
