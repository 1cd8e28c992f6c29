//! Combat units: live per-battle state for one ship or station
//!
//! A unit bundles its durability, its weapons and its tags in one value so
//! the engine never pairs a ship with its firing capability by position.

use serde::{Deserialize, Serialize};

use crate::combat::constants::*;
use crate::core::types::{CivId, FleetId, UnitId};

/// Crew experience rank
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Experience {
    #[default]
    Unknown,
    Green,
    Regular,
    Veteran,
    Elite,
    Legendary,
}

impl Experience {
    pub fn accuracy(self) -> f64 {
        match self {
            Experience::Unknown => ACCURACY_UNKNOWN,
            Experience::Green => ACCURACY_GREEN,
            Experience::Regular => ACCURACY_REGULAR,
            Experience::Veteran => ACCURACY_VETERAN,
            Experience::Elite => ACCURACY_ELITE,
            Experience::Legendary => ACCURACY_LEGENDARY,
        }
    }

    pub fn damage_control(self) -> f64 {
        match self {
            Experience::Unknown => DAMAGE_CONTROL_UNKNOWN,
            Experience::Green => DAMAGE_CONTROL_GREEN,
            Experience::Regular => DAMAGE_CONTROL_REGULAR,
            Experience::Veteran => DAMAGE_CONTROL_VETERAN,
            Experience::Elite => DAMAGE_CONTROL_ELITE,
            Experience::Legendary => DAMAGE_CONTROL_LEGENDARY,
        }
    }
}

/// Hull class tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HullClass {
    Command,
    Battleship,
    Cube,
    Cruiser,
    Sphere,
    Destroyer,
    Frigate,
    Probe,
    Scout,
    Transport,
    Construction,
    Colony,
    Medical,
    Spy,
    Diplomatic,
    Station,
}

/// Rock-paper-scissors grouping used by the scissor bonus
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScissorGroup {
    /// Command ships, battleships, cubes
    Capital,
    /// Cruisers and spheres
    Line,
    /// Destroyers, frigates, probes
    Light,
    /// Anything else; beaten by everything
    Unranked,
}

impl ScissorGroup {
    pub fn beats(self, other: ScissorGroup) -> bool {
        use ScissorGroup::*;
        matches!(
            (self, other),
            (Line, Light) | (Light, Capital) | (Capital, Line) | (_, Unranked)
        )
    }
}

impl HullClass {
    pub fn scissor_group(self) -> ScissorGroup {
        match self {
            HullClass::Command | HullClass::Battleship | HullClass::Cube => ScissorGroup::Capital,
            HullClass::Cruiser | HullClass::Sphere => ScissorGroup::Line,
            HullClass::Destroyer | HullClass::Frigate | HullClass::Probe => ScissorGroup::Light,
            _ => ScissorGroup::Unranked,
        }
    }

    /// Command-class hulls lift the accuracy of the rest of the fleet
    pub fn is_command(self) -> bool {
        matches!(self, HullClass::Command | HullClass::Battleship | HullClass::Cube)
    }

    /// Non-command warships
    pub fn is_assault(self) -> bool {
        matches!(
            self,
            HullClass::Cruiser
                | HullClass::Sphere
                | HullClass::Destroyer
                | HullClass::Frigate
                | HullClass::Probe
        )
    }

    pub fn is_civilian(self) -> bool {
        matches!(
            self,
            HullClass::Scout
                | HullClass::Transport
                | HullClass::Construction
                | HullClass::Colony
                | HullClass::Medical
                | HullClass::Spy
                | HullClass::Diplomatic
        )
    }

    /// Small hulls that slip away easily
    pub fn is_light(self) -> bool {
        matches!(self, HullClass::Frigate | HullClass::Scout)
    }

    pub fn is_transport(self) -> bool {
        self == HullClass::Transport
    }

    /// Escorts screen transports under Formation
    pub fn is_escort(self) -> bool {
        self == HullClass::Frigate
    }

    /// Construction and colony ships anchor their owner in the sector
    pub fn is_builder(self) -> bool {
        matches!(self, HullClass::Construction | HullClass::Colony)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Mobility {
    #[default]
    Mobile,
    Stationary,
}

/// Current/maximum pair for hull or shield strength
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Durability {
    pub current: i32,
    pub max: i32,
}

impl Durability {
    pub fn full(max: i32) -> Self {
        Self { current: max, max }
    }

    /// Share of maximum remaining, 0.0 when the maximum is zero
    pub fn ratio(&self) -> f64 {
        if self.max <= 0 {
            0.0
        } else {
            self.current.max(0) as f64 / self.max as f64
        }
    }
}

/// Firing capability of a unit
///
/// `remaining` never exceeds `firepower`; it is reset at the start of each
/// round and only goes down while the round runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Weapons {
    firepower: u32,
    remaining: u32,
}

impl Weapons {
    pub fn new(firepower: u32) -> Self {
        Self { firepower, remaining: firepower }
    }

    pub fn firepower(&self) -> u32 {
        self.firepower
    }

    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    pub fn is_armed(&self) -> bool {
        self.firepower > 0
    }

    pub fn reset(&mut self) {
        self.remaining = self.firepower;
    }

    /// Spend up to `amount`; returns what was actually spent
    pub fn spend(&mut self, amount: u32) -> u32 {
        let spent = amount.min(self.remaining);
        self.remaining -= spent;
        spent
    }
}

/// Live per-battle state for one ship or station
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CombatUnit {
    pub id: UnitId,
    pub name: String,
    pub owner: CivId,
    pub fleet: Option<FleetId>,
    pub hull_class: HullClass,
    pub mobility: Mobility,
    pub experience: Experience,
    pub hero: bool,
    pub cloaked: bool,
    pub camouflaged: bool,
    /// 0 (sitting duck) and up; see `maneuverability_factor`
    pub maneuverability: u8,
    pub hull: Durability,
    pub shield: Durability,
    pub weapons: Weapons,
}

impl CombatUnit {
    /// A mobile ship at full strength
    pub fn ship(
        owner: CivId,
        name: impl Into<String>,
        hull_class: HullClass,
        firepower: u32,
        hull: i32,
        shield: i32,
    ) -> Self {
        Self {
            id: UnitId::new(),
            name: name.into(),
            owner,
            fleet: None,
            hull_class,
            mobility: Mobility::Mobile,
            experience: Experience::Regular,
            hero: false,
            cloaked: false,
            camouflaged: false,
            maneuverability: 0,
            hull: Durability::full(hull),
            shield: Durability::full(shield),
            weapons: Weapons::new(firepower),
        }
    }

    /// A stationary platform at full strength
    pub fn station(owner: CivId, name: impl Into<String>, firepower: u32, hull: i32, shield: i32) -> Self {
        Self {
            mobility: Mobility::Stationary,
            ..Self::ship(owner, name, HullClass::Station, firepower, hull, shield)
        }
    }

    pub fn with_fleet(mut self, fleet: FleetId) -> Self {
        self.fleet = Some(fleet);
        self
    }

    pub fn with_experience(mut self, experience: Experience) -> Self {
        self.experience = experience;
        self
    }

    pub fn with_maneuverability(mut self, rating: u8) -> Self {
        self.maneuverability = rating;
        self
    }

    pub fn as_hero(mut self) -> Self {
        self.hero = true;
        self
    }

    pub fn cloaked(mut self) -> Self {
        self.cloaked = true;
        self
    }

    pub fn is_alive(&self) -> bool {
        self.hull.current > 0
    }

    pub fn is_station(&self) -> bool {
        self.mobility == Mobility::Stationary
    }

    pub fn is_hidden(&self) -> bool {
        self.cloaked || self.camouflaged
    }

    pub fn can_fire(&self) -> bool {
        self.is_alive() && self.weapons.remaining() > 0
    }

    /// Fraction of each hit this unit evades; stations never evade
    pub fn maneuverability_factor(&self) -> f64 {
        if self.is_station() {
            return 0.0;
        }
        (self.maneuverability as f64 * MANEUVERABILITY_STEP).min(MANEUVERABILITY_CAP)
    }

    /// Combined shield + hull
    pub fn pool(&self) -> i32 {
        self.shield.current.max(0) + self.hull.current.max(0)
    }

    /// Combined pool inflated by maneuverability; what a hit has to chew through
    pub fn effective_pool(&self) -> f64 {
        self.pool() as f64 * (1.0 + self.maneuverability_factor())
    }

    /// Contribution of this unit to its owner's fleet durability
    pub fn durability_score(&self) -> f64 {
        self.weapons.firepower() as f64 + self.effective_pool()
    }

    /// Apply damage against the effective pool, shields first.
    /// Returns true when the unit is destroyed.
    pub fn absorb(&mut self, damage: i32) -> bool {
        if damage <= 0 || !self.is_alive() {
            return !self.is_alive();
        }
        if damage as f64 >= self.effective_pool() {
            self.shield.current = 0;
            self.hull.current = 0;
            return true;
        }

        let loss = (damage as f64 / (1.0 + self.maneuverability_factor())) as i32;
        let to_shield = loss.min(self.shield.current.max(0));
        self.shield.current -= to_shield;
        self.hull.current -= loss - to_shield;
        !self.is_alive()
    }

    pub fn decloak(&mut self) {
        self.cloaked = false;
        self.camouflaged = false;
    }
}
