//! Per-owner asset ledgers
//!
//! Every unit sits in exactly one bucket. Units enter the battle in
//! `Combat` or `NonCombat` and leave at most once, into one of the terminal
//! buckets. Entries are never removed, so a unit's index is a stable handle
//! for the lifetime of the ledger.

use serde::{Deserialize, Serialize};

use crate::combat::unit::CombatUnit;
use crate::core::error::{CombatError, Result};
use crate::core::types::{CivId, UnitId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Bucket {
    Combat,
    NonCombat,
    Escaped,
    Destroyed,
    Assimilated,
}

impl Bucket {
    /// Still in the fight (can be targeted)
    pub fn is_engaged(self) -> bool {
        matches!(self, Bucket::Combat | Bucket::NonCombat)
    }

    pub fn is_terminal(self) -> bool {
        !self.is_engaged()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub unit: CombatUnit,
    bucket: Bucket,
}

impl LedgerEntry {
    pub fn bucket(&self) -> Bucket {
        self.bucket
    }

    /// Engaged and not yet at zero hull
    pub fn is_active(&self) -> bool {
        self.bucket.is_engaged() && self.unit.is_alive()
    }
}

/// Bucket counts for reporting
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerSummary {
    pub combat: usize,
    pub non_combat: usize,
    pub escaped: usize,
    pub destroyed: usize,
    pub assimilated: usize,
}

/// All assets one civilization brought into the sector
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetLedger {
    owner: CivId,
    entries: Vec<LedgerEntry>,
}

impl AssetLedger {
    pub fn new(owner: CivId) -> Self {
        Self { owner, entries: Vec::new() }
    }

    pub fn owner(&self) -> CivId {
        self.owner
    }

    /// Add a unit; armed units go to `Combat`, unarmed ones to `NonCombat`
    pub fn add(&mut self, unit: CombatUnit) -> Result<usize> {
        let bucket = if unit.weapons.is_armed() {
            Bucket::Combat
        } else {
            Bucket::NonCombat
        };
        self.add_to(unit, bucket)
    }

    pub fn add_to(&mut self, unit: CombatUnit, bucket: Bucket) -> Result<usize> {
        if unit.owner != self.owner {
            return Err(CombatError::InvalidEncounter(format!(
                "unit '{}' owned by {} added to ledger of {}",
                unit.name, unit.owner, self.owner
            )));
        }
        self.entries.push(LedgerEntry { unit, bucket });
        Ok(self.entries.len() - 1)
    }

    /// Builder-style variant of `add` for setting up fixtures
    pub fn with_unit(mut self, unit: CombatUnit) -> Result<Self> {
        self.add(unit)?;
        Ok(self)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entry(&self, index: usize) -> Option<&LedgerEntry> {
        self.entries.get(index)
    }

    pub fn unit(&self, index: usize) -> Option<&CombatUnit> {
        self.entries.get(index).map(|e| &e.unit)
    }

    pub fn unit_mut(&mut self, index: usize) -> Option<&mut CombatUnit> {
        self.entries.get_mut(index).map(|e| &mut e.unit)
    }

    pub fn bucket_of(&self, index: usize) -> Option<Bucket> {
        self.entries.get(index).map(|e| e.bucket)
    }

    pub fn find(&self, id: UnitId) -> Option<usize> {
        self.entries.iter().position(|e| e.unit.id == id)
    }

    pub fn entries(&self) -> impl Iterator<Item = (usize, &LedgerEntry)> {
        self.entries.iter().enumerate()
    }

    pub fn units_in(&self, bucket: Bucket) -> impl Iterator<Item = &CombatUnit> {
        self.entries
            .iter()
            .filter(move |e| e.bucket == bucket)
            .map(|e| &e.unit)
    }

    pub fn count(&self, bucket: Bucket) -> usize {
        self.entries.iter().filter(|e| e.bucket == bucket).count()
    }

    /// Indices of engaged units with hull above zero
    pub fn active_indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.entries
            .iter()
            .enumerate()
            .filter(|(_, e)| e.is_active())
            .map(|(i, _)| i)
    }

    pub fn has_active(&self) -> bool {
        self.entries.iter().any(LedgerEntry::is_active)
    }

    /// True while at least one armed unit is still in the `Combat` bucket
    pub fn has_combatants(&self) -> bool {
        self.entries
            .iter()
            .any(|e| e.bucket == Bucket::Combat && e.unit.is_alive())
    }

    /// The owner's station, if it is still in the fight
    pub fn station(&self) -> Option<usize> {
        self.active_indices()
            .find(|&i| self.entries[i].unit.is_station())
    }

    /// Move an engaged unit into a terminal bucket.
    ///
    /// Returns false (and changes nothing) when the unit already left the
    /// fight or the destination is not terminal.
    pub fn transition(&mut self, index: usize, to: Bucket) -> bool {
        match self.entries.get_mut(index) {
            Some(entry) if entry.bucket.is_engaged() && to.is_terminal() => {
                entry.bucket = to;
                true
            }
            _ => false,
        }
    }

    /// Reset every engaged unit's remaining firepower
    pub fn reset_firepower(&mut self) {
        for entry in self.entries.iter_mut().filter(|e| e.bucket.is_engaged()) {
            entry.unit.weapons.reset();
        }
    }

    pub fn summary(&self) -> LedgerSummary {
        LedgerSummary {
            combat: self.count(Bucket::Combat),
            non_combat: self.count(Bucket::NonCombat),
            escaped: self.count(Bucket::Escaped),
            destroyed: self.count(Bucket::Destroyed),
            assimilated: self.count(Bucket::Assimilated),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combat::unit::HullClass;

    fn ledger() -> AssetLedger {
        let owner = CivId(1);
        let mut ledger = AssetLedger::new(owner);
        ledger
            .add(CombatUnit::ship(owner, "Cruiser", HullClass::Cruiser, 200, 300, 100))
            .unwrap();
        ledger
            .add(CombatUnit::ship(owner, "Colony Ship", HullClass::Colony, 0, 80, 0))
            .unwrap();
        ledger
    }

    #[test]
    fn test_add_sorts_by_armament() {
        let ledger = ledger();
        assert_eq!(ledger.bucket_of(0), Some(Bucket::Combat));
        assert_eq!(ledger.bucket_of(1), Some(Bucket::NonCombat));
    }

    #[test]
    fn test_add_rejects_foreign_unit() {
        let mut ledger = ledger();
        let foreign = CombatUnit::ship(CivId(2), "Raider", HullClass::Frigate, 50, 50, 0);
        assert!(ledger.add(foreign).is_err());
    }

    #[test]
    fn test_transition_happens_once() {
        let mut ledger = ledger();
        assert!(ledger.transition(0, Bucket::Escaped));
        assert!(!ledger.transition(0, Bucket::Destroyed));
        assert_eq!(ledger.bucket_of(0), Some(Bucket::Escaped));
    }

    #[test]
    fn test_transition_cannot_return_to_combat() {
        let mut ledger = ledger();
        ledger.transition(1, Bucket::Assimilated);
        assert!(!ledger.transition(1, Bucket::Combat));
        assert!(!ledger.transition(0, Bucket::NonCombat));
        assert_eq!(ledger.bucket_of(1), Some(Bucket::Assimilated));
    }

    #[test]
    fn test_summary_partitions_all_units() {
        let mut ledger = ledger();
        ledger.transition(0, Bucket::Destroyed);
        let summary = ledger.summary();
        let total = summary.combat
            + summary.non_combat
            + summary.escaped
            + summary.destroyed
            + summary.assimilated;
        assert_eq!(total, ledger.len());
        assert_eq!(summary.destroyed, 1);
    }

    #[test]
    fn test_station_lookup() {
        let owner = CivId(1);
        let mut ledger = ledger();
        assert!(ledger.station().is_none());
        let idx = ledger
            .add(CombatUnit::station(owner, "Outpost", 100, 500, 200))
            .unwrap();
        assert_eq!(ledger.station(), Some(idx));
    }
}
