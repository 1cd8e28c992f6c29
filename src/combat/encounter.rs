//! Encounters: a data-driven battle setup
//!
//! `EncounterSpec` is the TOML scenario format. Building it yields the
//! `Encounter` (which answers every `CombatContext` question from plain
//! tables) and the ordered asset ledgers the engine fights over.

use std::fs;
use std::path::Path;

use ahash::{AHashMap, AHashSet};
use serde::{Deserialize, Serialize};

use crate::combat::context::{CombatContext, Civilization, SectorInfo};
use crate::combat::ledger::AssetLedger;
use crate::combat::roster::TargetSlot;
use crate::combat::stance::Stance;
use crate::combat::unit::{CombatUnit, Experience, HullClass};
use crate::core::error::{CombatError, Result};
use crate::core::types::{CivId, FleetId, Turn};

/// Answers combat's questions about the wider game from in-memory tables
#[derive(Debug, Clone, Default)]
pub struct Encounter {
    turn: Turn,
    pace_modifier: f64,
    sector: SectorInfo,
    civs: AHashMap<CivId, Civilization>,
    wars: AHashSet<(CivId, CivId)>,
    stances: AHashMap<FleetId, Stance>,
    chosen: AHashMap<CivId, [TargetSlot; 2]>,
}

impl Encounter {
    pub fn new(turn: Turn) -> Self {
        Self {
            turn,
            pace_modifier: 1.0,
            ..Self::default()
        }
    }

    pub fn with_civ(mut self, civ: Civilization) -> Self {
        self.civs.insert(civ.id, civ);
        self
    }

    pub fn with_war(mut self, a: CivId, b: CivId) -> Self {
        self.declare_war(a, b);
        self
    }

    pub fn with_sector(mut self, sector: SectorInfo) -> Self {
        self.sector = sector;
        self
    }

    pub fn with_pace_modifier(mut self, pace_modifier: f64) -> Self {
        self.pace_modifier = pace_modifier;
        self
    }

    pub fn declare_war(&mut self, a: CivId, b: CivId) {
        self.wars.insert((a, b));
        self.wars.insert((b, a));
    }

    pub fn set_stance(&mut self, fleet: FleetId, stance: Stance) {
        self.stances.insert(fleet, stance);
    }

    pub fn choose_targets(&mut self, owner: CivId, slots: [TargetSlot; 2]) {
        self.chosen.insert(owner, slots);
    }

    pub fn set_turn(&mut self, turn: Turn) {
        self.turn = turn;
    }
}

impl CombatContext for Encounter {
    fn civilization(&self, id: CivId) -> Option<&Civilization> {
        self.civs.get(&id)
    }

    fn stance(&self, unit: &CombatUnit) -> Stance {
        unit.fleet
            .and_then(|fleet| self.stances.get(&fleet).copied())
            .unwrap_or_default()
    }

    fn chosen_targets(&self, owner: CivId) -> [TargetSlot; 2] {
        self.chosen.get(&owner).copied().unwrap_or_default()
    }

    fn at_war(&self, a: CivId, b: CivId) -> bool {
        self.wars.contains(&(a, b))
    }

    /// At war, or `a` is a Borg collective or an aggressive AI
    fn will_engage(&self, a: CivId, b: CivId) -> bool {
        if a == b {
            return false;
        }
        if self.at_war(a, b) {
            return true;
        }
        self.civs
            .get(&a)
            .is_some_and(|civ| civ.is_borg || (!civ.is_human() && civ.disposition.is_aggressive()))
    }

    fn turn_number(&self) -> Turn {
        self.turn
    }

    fn pace_modifier(&self) -> f64 {
        self.pace_modifier
    }

    fn sector(&self) -> &SectorInfo {
        &self.sector
    }
}

fn default_turn() -> Turn {
    1
}

fn default_pace() -> f64 {
    1.0
}

fn default_experience() -> Experience {
    Experience::Regular
}

/// One ship in a scenario file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnitSpec {
    pub name: String,
    pub class: HullClass,
    #[serde(default)]
    pub firepower: u32,
    pub hull: i32,
    #[serde(default)]
    pub shield: i32,
    #[serde(default = "default_experience")]
    pub experience: Experience,
    #[serde(default)]
    pub maneuverability: u8,
    #[serde(default)]
    pub hero: bool,
    #[serde(default)]
    pub cloaked: bool,
    #[serde(default)]
    pub camouflaged: bool,
}

impl UnitSpec {
    fn into_unit(self, owner: CivId, fleet: Option<FleetId>) -> CombatUnit {
        let mut unit = CombatUnit::ship(owner, self.name, self.class, self.firepower, self.hull, self.shield)
            .with_experience(self.experience)
            .with_maneuverability(self.maneuverability);
        unit.fleet = fleet;
        unit.hero = self.hero;
        unit.cloaked = self.cloaked;
        unit.camouflaged = self.camouflaged;
        unit
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FleetSpec {
    pub id: FleetId,
    pub owner: CivId,
    #[serde(default)]
    pub stance: Stance,
    #[serde(default)]
    pub ships: Vec<UnitSpec>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StationSpec {
    pub owner: CivId,
    pub name: String,
    #[serde(default)]
    pub firepower: u32,
    pub hull: i32,
    #[serde(default)]
    pub shield: i32,
    #[serde(default = "default_experience")]
    pub experience: Experience,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetChoice {
    pub owner: CivId,
    pub slots: [TargetSlot; 2],
}

/// Scenario file format
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncounterSpec {
    #[serde(default = "default_turn")]
    pub turn: Turn,
    #[serde(default = "default_pace")]
    pub pace_modifier: f64,
    #[serde(default)]
    pub sector: SectorInfo,
    pub civilizations: Vec<Civilization>,
    #[serde(default)]
    pub wars: Vec<[CivId; 2]>,
    #[serde(default)]
    pub fleets: Vec<FleetSpec>,
    #[serde(default)]
    pub stations: Vec<StationSpec>,
    #[serde(default)]
    pub targets: Vec<TargetChoice>,
}

impl EncounterSpec {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Validate and split into the collaborator tables and the ledgers.
    ///
    /// Ledgers follow the order civilizations are listed in; civilizations
    /// with no units get no ledger.
    pub fn build(self) -> Result<(Encounter, Vec<AssetLedger>)> {
        let mut encounter = Encounter::new(self.turn)
            .with_sector(self.sector)
            .with_pace_modifier(self.pace_modifier);

        let order: Vec<CivId> = self.civilizations.iter().map(|c| c.id).collect();
        for civ in self.civilizations {
            let id = civ.id;
            if encounter.civs.insert(id, civ).is_some() {
                return Err(CombatError::InvalidEncounter(format!("duplicate civilization {}", id)));
            }
        }

        let known = |id: CivId, what: &str| -> Result<()> {
            if encounter.civs.contains_key(&id) {
                Ok(())
            } else {
                Err(CombatError::InvalidEncounter(format!("{} refers to unknown {}", what, id)))
            }
        };
        for [a, b] in &self.wars {
            known(*a, "war")?;
            known(*b, "war")?;
        }
        for choice in &self.targets {
            known(choice.owner, "target choice")?;
        }

        let mut ledgers: AHashMap<CivId, AssetLedger> = AHashMap::new();
        let mut seen_fleets = AHashSet::new();
        for fleet in self.fleets {
            known(fleet.owner, "fleet")?;
            if !seen_fleets.insert(fleet.id) {
                return Err(CombatError::InvalidEncounter(format!("duplicate fleet {:?}", fleet.id)));
            }
            encounter.stances.insert(fleet.id, fleet.stance);
            let ledger = ledgers
                .entry(fleet.owner)
                .or_insert_with(|| AssetLedger::new(fleet.owner));
            for ship in fleet.ships {
                ledger.add(ship.into_unit(fleet.owner, Some(fleet.id)))?;
            }
        }
        for station in self.stations {
            known(station.owner, "station")?;
            let unit = CombatUnit::station(station.owner, station.name, station.firepower, station.hull, station.shield)
                .with_experience(station.experience);
            ledgers
                .entry(station.owner)
                .or_insert_with(|| AssetLedger::new(station.owner))
                .add(unit)?;
        }

        for [a, b] in self.wars {
            encounter.declare_war(a, b);
        }
        for choice in self.targets {
            encounter.choose_targets(choice.owner, choice.slots);
        }

        let ledgers = order
            .into_iter()
            .filter_map(|id| ledgers.remove(&id))
            .collect();
        Ok((encounter, ledgers))
    }
}
