//! Damage model for a single hit
//!
//! ```text
//! damage = (amount + scissor + stance)
//!        × target power × attacker power × station pace × faction
//!        × (1.5 − target damage control) × favor the bold
//!        × (1 − target maneuverability) × attacker accuracy × random
//! ```
//!
//! Every factor is a pure function so it can be tested on its own; only the
//! random multiplier touches the RNG.

use rand::Rng;

use crate::combat::constants::*;
use crate::combat::context::Civilization;
use crate::combat::ledger::AssetLedger;
use crate::combat::stance::{FirePhase, Stance};
use crate::combat::unit::{CombatUnit, HullClass};
use crate::core::config::CombatConfig;
use crate::core::types::Turn;

/// Aggregate strength of one owner's forces in the sector
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FleetStrength {
    /// Σ(firepower + effective pool) over every active unit, station included
    pub durability: f64,
    /// Share of the owner's active ships that are command class
    pub command_density: f64,
}

impl FleetStrength {
    pub fn of(ledger: &AssetLedger) -> Self {
        let mut durability = 0.0;
        let mut ships = 0usize;
        let mut command = 0usize;

        for index in ledger.active_indices() {
            let Some(unit) = ledger.unit(index) else { continue };
            durability += unit.durability_score();
            if !unit.is_station() {
                ships += 1;
                if unit.hull_class.is_command() {
                    command += 1;
                }
            }
        }

        let command_density = if ships == 0 {
            0.0
        } else {
            command as f64 / ships as f64
        };
        Self { durability, command_density }
    }
}

/// Everything the damage model needs to know about one hit
#[derive(Debug, Clone, Copy)]
pub struct Hit<'a> {
    pub attacker: &'a CombatUnit,
    pub target: &'a CombatUnit,
    pub attacker_stance: Stance,
    pub target_stance: Stance,
    pub attacker_civ: &'a Civilization,
    pub target_civ: &'a Civilization,
    pub attacker_strength: FleetStrength,
    pub target_strength: FleetStrength,
    pub amount: u32,
    pub phase: FirePhase,
    pub turn: Turn,
    pub pace_modifier: f64,
}

/// Accuracy adjustment from how many command ships back the attacker up
pub fn command_density_modifier(class: HullClass, density: f64) -> f64 {
    if class.is_command() {
        return 0.0;
    }
    if class.is_civilian() {
        return if density < COMMAND_DENSITY_LOW { COMMAND_MALUS } else { 0.0 };
    }
    if !class.is_assault() {
        return 0.0;
    }

    if density < COMMAND_DENSITY_LOW {
        COMMAND_MALUS
    } else if density < COMMAND_DENSITY_HIGH {
        COMMAND_BONUS_MODEST
    } else {
        COMMAND_BONUS_STRONG
    }
}

pub fn attacker_accuracy(attacker: &CombatUnit, command_density: f64) -> f64 {
    let mut accuracy = attacker.experience.accuracy();
    if attacker.hero {
        accuracy += HERO_ACCURACY_BONUS;
    }
    accuracy + command_density_modifier(attacker.hull_class, command_density)
}

pub fn target_damage_control(target: &CombatUnit) -> f64 {
    let mut control = target.experience.damage_control();
    if target.hero || target.is_station() {
        control += HARDENED_DAMAGE_CONTROL_BONUS;
    }
    control
}

/// +35% of the amount when the attacker's hull class beats the target's
pub fn scissor_bonus(attacker: &CombatUnit, target: &CombatUnit, amount: f64) -> f64 {
    let attacker_group = attacker.hull_class.scissor_group();
    let target_group = target.hull_class.scissor_group();
    if attacker_group.beats(target_group) {
        amount * SCISSOR_BONUS
    } else {
        0.0
    }
}

pub fn stance_bonus(attacker: Stance, defender: Stance, phase: FirePhase, amount: f64) -> f64 {
    amount * attacker.bonus_against(defender, phase)
}

/// Power-asymmetry multiplier rewarding the outgunned and taxing the overwhelming
pub fn favor_the_bold(attacker_total: f64, defender_total: f64, turn: Turn) -> f64 {
    if attacker_total <= 0.0 || defender_total <= 0.0 {
        return 1.0;
    }

    if attacker_total * BOLD_CLAMP_RATIO <= defender_total {
        return BOLD_CLAMP_UNDERDOG;
    }
    if defender_total * BOLD_CLAMP_RATIO <= attacker_total {
        return BOLD_CLAMP_OVERWHELMING;
    }

    if attacker_total * BOLD_ASYMMETRY_RATIO <= defender_total {
        return BOLD_UNDERDOG_TIERS
            .iter()
            .find(|(min_turn, min_size, _)| turn >= *min_turn && attacker_total >= *min_size)
            .map(|(_, _, bonus)| *bonus)
            .unwrap_or(1.0);
    }
    if defender_total * BOLD_ASYMMETRY_RATIO <= attacker_total {
        return BOLD_MALUS_TIERS
            .iter()
            .find(|(min_turn, _)| turn >= *min_turn)
            .map(|(_, malus)| *malus)
            .unwrap_or(1.0);
    }

    1.0
}

#[derive(Debug, Clone, Copy)]
pub struct DamageModel<'a> {
    config: &'a CombatConfig,
}

impl<'a> DamageModel<'a> {
    pub fn new(config: &'a CombatConfig) -> Self {
        Self { config }
    }

    pub fn faction_modifier(&self, hit: &Hit<'_>) -> f64 {
        let weaker = hit.target_strength.durability < hit.attacker_strength.durability;
        if hit.attacker_civ.is_dominant && weaker {
            self.config.dominant_faction_multiplier
        } else {
            1.0
        }
    }

    /// Damage before truncation for a given random multiplier
    pub fn damage_with(&self, hit: &Hit<'_>, random_multiplier: f64) -> f64 {
        let amount = hit.amount as f64;
        let base = amount
            + scissor_bonus(hit.attacker, hit.target, amount)
            + stance_bonus(hit.attacker_stance, hit.target_stance, hit.phase, amount);

        let station_pace = if hit.target.is_station() {
            hit.pace_modifier
        } else {
            1.0
        };
        let bold = favor_the_bold(
            hit.attacker_strength.durability,
            hit.target_strength.durability,
            hit.turn,
        );

        let damage = base
            * hit.target_civ.target_power
            * hit.attacker_civ.attack_power
            * station_pace
            * self.faction_modifier(hit)
            * (DAMAGE_CONTROL_CEILING - target_damage_control(hit.target))
            * bold
            * (1.0 - hit.target.maneuverability_factor())
            * attacker_accuracy(hit.attacker, hit.attacker_strength.command_density)
            * random_multiplier;
        damage.max(0.0)
    }

    /// Roll the random multiplier and return integer damage
    pub fn roll<R: Rng + ?Sized>(&self, hit: &Hit<'_>, rng: &mut R) -> i32 {
        let random = rng.gen_range(self.config.random_multiplier_min..self.config.random_multiplier_max);
        self.damage_with(hit, random) as i32
    }
}
