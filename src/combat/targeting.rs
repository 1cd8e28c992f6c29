//! Target selection
//!
//! A pick starts from the sticky cache (keep shooting at what we hit last)
//! or a uniform draw, is redirected onto the defender's station when one is
//! up, and is finally re-biased by Raid and Formation stances.

use ahash::AHashMap;
use rand::seq::SliceRandom;
use rand::Rng;

use crate::combat::constants::*;
use crate::combat::context::{require_civilization, CombatContext};
use crate::combat::ledger::AssetLedger;
use crate::combat::stance::Stance;
use crate::combat::unit::CombatUnit;
use crate::core::error::Result;
use crate::core::types::CivId;

/// Stable handle to a unit: ledger position plus entry index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UnitRef {
    pub ledger: usize,
    pub index: usize,
}

impl UnitRef {
    pub fn new(ledger: usize, index: usize) -> Self {
        Self { ledger, index }
    }

    pub fn resolve<'a>(&self, ledgers: &'a [AssetLedger]) -> Option<&'a CombatUnit> {
        ledgers.get(self.ledger)?.unit(self.index)
    }

    pub fn resolve_mut<'a>(&self, ledgers: &'a mut [AssetLedger]) -> Option<&'a mut CombatUnit> {
        ledgers.get_mut(self.ledger)?.unit_mut(self.index)
    }

    pub fn is_active(&self, ledgers: &[AssetLedger]) -> bool {
        ledgers
            .get(self.ledger)
            .and_then(|l| l.entry(self.index))
            .is_some_and(|e| e.is_active())
    }
}

/// Last damaged-but-surviving target per attacking owner
#[derive(Debug, Clone, Default)]
pub struct StickyTargets {
    last: AHashMap<CivId, UnitRef>,
}

impl StickyTargets {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, owner: CivId) -> Option<UnitRef> {
        self.last.get(&owner).copied()
    }

    pub fn remember(&mut self, owner: CivId, target: UnitRef) {
        self.last.insert(owner, target);
    }

    /// Drop every entry pointing at a unit that is gone
    pub fn forget(&mut self, target: UnitRef) {
        self.last.retain(|_, cached| *cached != target);
    }

    pub fn len(&self) -> usize {
        self.last.len()
    }

    pub fn is_empty(&self) -> bool {
        self.last.is_empty()
    }
}

/// Chance to stay on the cached target instead of drawing a fresh one
pub fn sticky_keep_chance(target: &CombatUnit, owned_by_borg: bool) -> f64 {
    if owned_by_borg {
        STICKY_KEEP_BORG
    } else if target.shield.ratio() > STICKY_HIGH_THRESHOLD {
        STICKY_KEEP_HIGH_SHIELD
    } else if target.hull.ratio() > STICKY_HIGH_THRESHOLD {
        STICKY_KEEP_HIGH_HULL
    } else {
        0.0
    }
}

pub struct TargetSelector<'a, C: CombatContext + ?Sized> {
    ledgers: &'a [AssetLedger],
    ctx: &'a C,
}

impl<'a, C: CombatContext + ?Sized> TargetSelector<'a, C> {
    pub fn new(ledgers: &'a [AssetLedger], ctx: &'a C) -> Self {
        Self { ledgers, ctx }
    }

    /// Pick a unit in `target_ledger` for `attacker_owner` to shoot at
    pub fn select<R: Rng + ?Sized>(
        &self,
        attacker_owner: CivId,
        attacker_stance: Stance,
        target_ledger: usize,
        sticky: &StickyTargets,
        rng: &mut R,
    ) -> Result<Option<UnitRef>> {
        let Some(ledger) = self.ledgers.get(target_ledger) else {
            return Ok(None);
        };
        let candidates: Vec<usize> = ledger.active_indices().collect();
        if candidates.is_empty() {
            return Ok(None);
        }

        let mut pick = match self.sticky_pick(attacker_owner, target_ledger, sticky, rng)? {
            Some(index) => index,
            None => match candidates.choose(rng) {
                Some(&index) => index,
                None => return Ok(None),
            },
        };

        if let Some(station) = ledger.station() {
            if self.stance_of(ledger, station) != Stance::Formation {
                pick = station;
            }
        }

        if attacker_stance == Stance::Raid {
            pick = self.raid_pick(ledger, &candidates, pick, rng);
        }

        Ok(Some(UnitRef::new(target_ledger, pick)))
    }

    fn sticky_pick<R: Rng + ?Sized>(
        &self,
        attacker_owner: CivId,
        target_ledger: usize,
        sticky: &StickyTargets,
        rng: &mut R,
    ) -> Result<Option<usize>> {
        let Some(cached) = sticky.get(attacker_owner) else {
            return Ok(None);
        };
        if cached.ledger != target_ledger || !cached.is_active(self.ledgers) {
            return Ok(None);
        }
        let Some(unit) = cached.resolve(self.ledgers) else {
            return Ok(None);
        };

        let borg = require_civilization(self.ctx, unit.owner)?.is_borg;
        let keep = sticky_keep_chance(unit, borg);
        if keep > 0.0 && rng.gen_bool(keep) {
            Ok(Some(cached.index))
        } else {
            Ok(None)
        }
    }

    /// Raiders go for transports; a Formation defender screens them with escorts
    fn raid_pick<R: Rng + ?Sized>(
        &self,
        ledger: &AssetLedger,
        candidates: &[usize],
        current: usize,
        rng: &mut R,
    ) -> usize {
        let matching = |predicate: fn(&CombatUnit) -> bool| -> Vec<usize> {
            candidates
                .iter()
                .copied()
                .filter(|&i| ledger.unit(i).is_some_and(predicate))
                .collect()
        };
        let transports = matching(|u| u.hull_class.is_transport());

        let preferred = if self.in_formation(ledger, candidates) {
            let escorts = matching(|u| u.hull_class.is_escort());
            if escorts.is_empty() {
                transports
            } else {
                escorts
            }
        } else {
            transports
        };

        preferred.choose(rng).copied().unwrap_or(current)
    }

    /// Any of the defender's ships flying in Formation screens the rest
    fn in_formation(&self, ledger: &AssetLedger, candidates: &[usize]) -> bool {
        candidates.iter().any(|&i| {
            ledger
                .unit(i)
                .is_some_and(|u| !u.is_station() && self.ctx.stance(u) == Stance::Formation)
        })
    }

    fn stance_of(&self, ledger: &AssetLedger, index: usize) -> Stance {
        ledger
            .unit(index)
            .map(|u| self.ctx.stance(u))
            .unwrap_or_default()
    }
}
