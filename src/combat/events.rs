//! Narrative combat events and the sinks that receive them
//!
//! The engine records structured events per round instead of formatting
//! text. Observers decide what to do with them: append situation reports
//! to a civilization's log, refresh a battle view, and so on.

use serde::{Deserialize, Serialize};

use crate::combat::stance::FirePhase;
use crate::combat::unit::CombatUnit;
use crate::core::types::{CivId, UnitId};

/// Identifies the unit an event is about
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitTag {
    pub id: UnitId,
    pub name: String,
    pub owner: CivId,
}

impl From<&CombatUnit> for UnitTag {
    fn from(unit: &CombatUnit) -> Self {
        Self {
            id: unit.id,
            name: unit.name.clone(),
            owner: unit.owner,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum CombatEvent {
    /// Slipped out of the sector before firing started
    Escaped { unit: UnitTag },
    /// Cloak or camouflage dropped for the engagement
    Decloaked { unit: UnitTag },
    /// Taken over by a Borg collective
    Assimilated { unit: UnitTag, by: CivId },
    Destroyed { unit: UnitTag },
    /// Took damage this round but still holds together
    Survived { unit: UnitTag, hull: i32, shield: i32 },
    /// Pulled out after the round because it had no reason to stay
    ForcedRetreat { unit: UnitTag },
}

impl CombatEvent {
    pub fn unit(&self) -> &UnitTag {
        match self {
            CombatEvent::Escaped { unit }
            | CombatEvent::Decloaked { unit }
            | CombatEvent::Assimilated { unit, .. }
            | CombatEvent::Destroyed { unit }
            | CombatEvent::Survived { unit, .. }
            | CombatEvent::ForcedRetreat { unit } => unit,
        }
    }

    /// Civilizations whose situation report should carry this event
    pub fn recipients(&self) -> Vec<CivId> {
        match self {
            CombatEvent::Assimilated { unit, by } => vec![unit.owner, *by],
            other => vec![other.unit().owner],
        }
    }

    /// One-line sitrep text
    pub fn describe(&self) -> String {
        match self {
            CombatEvent::Escaped { unit } => format!("{} escaped the battle", unit.name),
            CombatEvent::Decloaked { unit } => format!("{} was forced to decloak", unit.name),
            CombatEvent::Assimilated { unit, by } => {
                format!("{} was assimilated by {}", unit.name, by)
            }
            CombatEvent::Destroyed { unit } => format!("{} was destroyed", unit.name),
            CombatEvent::Survived { unit, hull, shield } => format!(
                "{} survived with hull {} and shields {}",
                unit.name, hull, shield
            ),
            CombatEvent::ForcedRetreat { unit } => format!("{} retreated", unit.name),
        }
    }
}

/// Incremental battle-state update, emitted once per hit
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BattleUpdate {
    pub round: u32,
    pub phase: FirePhase,
    pub attacker: UnitId,
    pub target: UnitId,
    pub firepower_spent: u32,
    pub damage: i32,
    pub destroyed: bool,
}

/// Caller-supplied notification sinks; every method defaults to a no-op
pub trait BattleObserver {
    fn append_sitrep(&mut self, _owner: CivId, _event: &CombatEvent) {}

    fn battle_updated(&mut self, _update: &BattleUpdate) {}

    fn round_ended(&mut self, _report: &crate::combat::engine::RoundReport) {}

    /// Called once, with the report of the round that ended the battle
    fn battle_ended(&mut self, _report: &crate::combat::engine::RoundReport) {}
}

/// Observer that ignores everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NullObserver;

impl BattleObserver for NullObserver {}

/// Observer that keeps everything it is told
#[derive(Debug, Default, Clone)]
pub struct RecordingObserver {
    pub sitreps: Vec<(CivId, CombatEvent)>,
    pub updates: Vec<BattleUpdate>,
    pub rounds_ended: u32,
    pub battles_ended: u32,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sitreps_for(&self, owner: CivId) -> impl Iterator<Item = &CombatEvent> {
        self.sitreps
            .iter()
            .filter(move |(o, _)| *o == owner)
            .map(|(_, e)| e)
    }
}

impl BattleObserver for RecordingObserver {
    fn append_sitrep(&mut self, owner: CivId, event: &CombatEvent) {
        self.sitreps.push((owner, event.clone()));
    }

    fn battle_updated(&mut self, update: &BattleUpdate) {
        self.updates.push(update.clone());
    }

    fn round_ended(&mut self, _report: &crate::combat::engine::RoundReport) {
        self.rounds_ended += 1;
    }

    fn battle_ended(&mut self, _report: &crate::combat::engine::RoundReport) {
        self.battles_ended += 1;
    }
}
