//! Combat configuration with documented tunables
//!
//! Behavioural knobs live here so a scenario or mod can override them from
//! TOML. Fixed balance tables (accuracy by rank, scissor classes, stance
//! bonuses) live in `combat::constants`.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core::error::{CombatError, Result};

/// Configuration for the combat resolution engine
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CombatConfig {
    // === PRE-ROUND ATTRITION ===
    /// Rounds with an index below this run the retreat/decloak/assimilation pass
    ///
    /// After this many rounds the combatants are considered fully committed
    /// and nobody slips away before firing starts.
    pub attrition_round_limit: u32,

    /// Escape chance for cloaked, frigate-class or scout units under Retreat
    pub easy_retreat_chance: f64,

    /// Escape chance for every other unit under Retreat
    pub hard_retreat_chance: f64,

    /// Chance that a non-Borg unit is assimilated when a Borg unit is present
    pub assimilation_chance: f64,

    // === ATTACK CYCLE ===
    /// Consecutive attacker-turn skips after which the cycle ends
    ///
    /// With two target slots per owner, 13 covers six owners twice over.
    /// Larger rosters raise the effective limit to `2 * owners + 1`.
    pub max_consecutive_skips: u32,

    /// Firing turns an owner always gets before the turn cap can kick in
    pub firing_turn_floor: u32,

    /// Fraction of the owner's starting unit count that caps its firing turns
    pub firing_turn_fraction: f64,

    // === DAMAGE MODEL ===
    /// Lower bound of the per-hit random multiplier (inclusive)
    pub random_multiplier_min: f64,

    /// Upper bound of the per-hit random multiplier (exclusive)
    pub random_multiplier_max: f64,

    /// Faction modifier for a dominant faction attacking a weaker civilization
    pub dominant_faction_multiplier: f64,

    // === OUTCOME ===
    /// Survivors with more remaining firepower than this never retreat
    pub forced_stay_firepower: u32,
}

impl Default for CombatConfig {
    fn default() -> Self {
        Self {
            attrition_round_limit: 7,
            easy_retreat_chance: 0.8,
            hard_retreat_chance: 0.5,
            assimilation_chance: 0.05,

            max_consecutive_skips: 13,
            firing_turn_floor: 12,
            firing_turn_fraction: 0.9,

            random_multiplier_min: 0.8,
            random_multiplier_max: 1.3,
            dominant_faction_multiplier: 2.0,

            forced_stay_firepower: 100,
        }
    }
}

impl CombatConfig {
    /// Create a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a config from TOML; missing keys keep their defaults
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: CombatConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a config file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Validate configuration for internal consistency
    pub fn validate(&self) -> Result<()> {
        let chances = [
            ("easy_retreat_chance", self.easy_retreat_chance),
            ("hard_retreat_chance", self.hard_retreat_chance),
            ("assimilation_chance", self.assimilation_chance),
            ("firing_turn_fraction", self.firing_turn_fraction),
        ];
        for (name, value) in chances {
            if !(0.0..=1.0).contains(&value) {
                return Err(CombatError::InvalidConfig(format!(
                    "{} ({}) must be within [0, 1]",
                    name, value
                )));
            }
        }

        if self.random_multiplier_min <= 0.0
            || self.random_multiplier_min >= self.random_multiplier_max
        {
            return Err(CombatError::InvalidConfig(format!(
                "random multiplier range [{}, {}) is empty or non-positive",
                self.random_multiplier_min, self.random_multiplier_max
            )));
        }

        if self.max_consecutive_skips == 0 {
            return Err(CombatError::InvalidConfig(
                "max_consecutive_skips must be positive".into(),
            ));
        }

        if self.dominant_faction_multiplier <= 0.0 {
            return Err(CombatError::InvalidConfig(
                "dominant_faction_multiplier must be positive".into(),
            ));
        }

        Ok(())
    }

    /// Effective skip limit for a roster of `owners` participants
    pub fn skip_limit(&self, owners: usize) -> u32 {
        self.max_consecutive_skips.max(owners as u32 * 2 + 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(CombatConfig::default().validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = CombatConfig::from_toml_str("assimilation_chance = 0.25").unwrap();
        assert_eq!(config.assimilation_chance, 0.25);
        assert_eq!(config.attrition_round_limit, 7);
        assert_eq!(config.max_consecutive_skips, 13);
    }

    #[test]
    fn test_rejects_out_of_range_chance() {
        let result = CombatConfig::from_toml_str("hard_retreat_chance = 1.5");
        assert!(matches!(result, Err(CombatError::InvalidConfig(_))));
    }

    #[test]
    fn test_rejects_empty_random_range() {
        let mut config = CombatConfig::default();
        config.random_multiplier_min = 1.3;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_skip_limit_grows_with_roster() {
        let config = CombatConfig::default();
        assert_eq!(config.skip_limit(3), 13);
        assert_eq!(config.skip_limit(8), 17);
    }
}
