//! External collaborators consulted during combat
//!
//! Combat never owns diplomacy, fleet orders or civilization records. It
//! asks for them through `CombatContext`.

use serde::{Deserialize, Serialize};

use crate::combat::roster::TargetSlot;
use crate::combat::stance::Stance;
use crate::combat::unit::CombatUnit;
use crate::core::error::{CombatError, Result};
use crate::core::types::{CivId, Turn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Controller {
    Human,
    #[default]
    Ai,
}

/// AI temperament toward the other civilizations in the sector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Disposition {
    Warlike,
    Hostile,
    #[default]
    Neutral,
    Friendly,
}

impl Disposition {
    pub fn is_aggressive(self) -> bool {
        matches!(self, Disposition::Warlike | Disposition::Hostile)
    }
}

/// What combat needs to know about a civilization
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Civilization {
    pub id: CivId,
    pub name: String,
    #[serde(default)]
    pub controller: Controller,
    #[serde(default)]
    pub disposition: Disposition,
    /// Assimilates instead of just destroying
    #[serde(default)]
    pub is_borg: bool,
    /// Hits weaker civilizations twice as hard
    #[serde(default)]
    pub is_dominant: bool,
    /// Multiplier on damage this civilization deals
    #[serde(default = "unit_modifier")]
    pub attack_power: f64,
    /// Multiplier on damage this civilization receives
    #[serde(default = "unit_modifier")]
    pub target_power: f64,
}

fn unit_modifier() -> f64 {
    1.0
}

impl Civilization {
    pub fn new(id: CivId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            controller: Controller::Ai,
            disposition: Disposition::Neutral,
            is_borg: false,
            is_dominant: false,
            attack_power: 1.0,
            target_power: 1.0,
        }
    }

    pub fn is_human(&self) -> bool {
        self.controller == Controller::Human
    }
}

/// The star system the battle takes place in
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SectorInfo {
    /// Civilization that controls the system, if any
    #[serde(default)]
    pub system_owner: Option<CivId>,
    /// Civilization whose home system this is, if any
    #[serde(default)]
    pub home_of: Option<CivId>,
}

/// Lookups the engine makes against the rest of the game
pub trait CombatContext {
    fn civilization(&self, id: CivId) -> Option<&Civilization>;

    /// Stance of the fleet the unit belongs to
    fn stance(&self, unit: &CombatUnit) -> Stance;

    /// Targets a human player picked for this battle
    fn chosen_targets(&self, owner: CivId) -> [TargetSlot; 2];

    fn at_war(&self, a: CivId, b: CivId) -> bool;

    /// Whether `a` is willing to fight `b` at all
    fn will_engage(&self, a: CivId, b: CivId) -> bool;

    fn turn_number(&self) -> Turn;

    /// Game-pace scaling applied to hits on stations
    fn pace_modifier(&self) -> f64 {
        1.0
    }

    fn sector(&self) -> &SectorInfo;
}

/// Look up a civilization; a missing record is a broken contract, not a game state
pub fn require_civilization<C: CombatContext + ?Sized>(ctx: &C, id: CivId) -> Result<&Civilization> {
    ctx.civilization(id)
        .ok_or(CombatError::UnknownCivilization(id))
}
