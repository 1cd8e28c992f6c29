//! Battle roster: who each owner is shooting at this round
//!
//! Built once per round, then only read by the attack and retaliation
//! cycles.

use ahash::AHashMap;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::combat::context::{require_civilization, CombatContext};
use crate::core::error::Result;
use crate::core::types::CivId;

/// One of an owner's two target choices
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TargetSlot {
    /// Nothing chosen; the owner does not open fire through this slot
    #[default]
    NoTarget,
    /// Only shoot back when shot at
    ReturnFireOnly,
    /// Open fire on this owner
    Target(CivId),
}

impl TargetSlot {
    pub fn owner(self) -> Option<CivId> {
        match self {
            TargetSlot::Target(owner) => Some(owner),
            _ => None,
        }
    }
}

/// Which of the two slots the attack cycle is looking at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SlotIndex {
    First,
    Second,
}

impl SlotIndex {
    pub fn index(self) -> usize {
        match self {
            SlotIndex::First => 0,
            SlotIndex::Second => 1,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct BattleRoster {
    order: Vec<CivId>,
    slots: AHashMap<CivId, [TargetSlot; 2]>,
}

impl BattleRoster {
    /// Resolve target slots for every owner with surviving units.
    ///
    /// `owners` must be distinct and in roster order. With fewer than two
    /// owners the roster is inactive and holds no slots.
    pub fn build<C, R>(owners: &[CivId], ctx: &C, rng: &mut R) -> Result<Self>
    where
        C: CombatContext + ?Sized,
        R: Rng + ?Sized,
    {
        let mut roster = BattleRoster {
            order: owners.to_vec(),
            slots: AHashMap::new(),
        };
        if owners.len() < 2 {
            return Ok(roster);
        }

        for &owner in owners {
            let civ = require_civilization(ctx, owner)?;
            let others: Vec<CivId> = owners.iter().copied().filter(|&o| o != owner).collect();

            let mut slots = if civ.is_human() {
                normalize_player_choice(owner, ctx.chosen_targets(owner))
            } else if civ.disposition.is_aggressive() {
                let mut draw = || match others.choose(&mut *rng) {
                    Some(&other) => TargetSlot::Target(other),
                    None => TargetSlot::NoTarget,
                };
                [draw(), draw()]
            } else {
                [TargetSlot::ReturnFireOnly; 2]
            };

            let enemies: Vec<CivId> = others
                .iter()
                .copied()
                .filter(|&other| ctx.at_war(owner, other))
                .take(2)
                .collect();
            for (slot, &enemy) in slots.iter_mut().zip(enemies.iter()) {
                *slot = TargetSlot::Target(enemy);
            }

            tracing::trace!(?owner, ?slots, "roster slots resolved");
            roster.slots.insert(owner, slots);
        }

        Ok(roster)
    }

    /// At least two owners are present
    pub fn is_active(&self) -> bool {
        self.order.len() >= 2
    }

    pub fn owners(&self) -> &[CivId] {
        &self.order
    }

    pub fn slots(&self, owner: CivId) -> [TargetSlot; 2] {
        self.slots.get(&owner).copied().unwrap_or_default()
    }

    pub fn slot(&self, owner: CivId, index: SlotIndex) -> TargetSlot {
        self.slots(owner)[index.index()]
    }

    /// Owners with no target in either slot hold their fire entirely,
    /// including return fire.
    pub fn holds_fire(&self, owner: CivId) -> bool {
        self.slots(owner)
            .iter()
            .all(|slot| *slot == TargetSlot::NoTarget)
    }
}

fn normalize_player_choice(owner: CivId, choice: [TargetSlot; 2]) -> [TargetSlot; 2] {
    let sanitize = |slot: TargetSlot| match slot {
        TargetSlot::Target(target) if target == owner => TargetSlot::NoTarget,
        other => other,
    };
    let choice = [sanitize(choice[0]), sanitize(choice[1])];

    match choice {
        [TargetSlot::ReturnFireOnly, TargetSlot::Target(named)]
        | [TargetSlot::Target(named), TargetSlot::ReturnFireOnly] => [TargetSlot::Target(named); 2],
        other => other,
    }
}
