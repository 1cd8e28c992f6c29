//! Attack and retaliation cycles
//!
//! A round's fire exchange runs as one explicit state machine:
//!
//! ```text
//! SelectAttacker ─► SelectTarget ─► ApplyDamage ─► ContinueOrStop
//!       ▲                 ▲                              │
//!       │                 └──── leftover / retaliator ───┤
//!       └────────────────── volley over ─────────────────┘
//! ```
//!
//! Owners take turns through both roster slots. Each attack volley that
//! lands hands its spent firepower to the defender as a retaliation
//! budget, which the defender's mobile units (or its station) spend back
//! on the attacker. The cycle stops once a full run of owner slots in a
//! row has nothing to do.

use ahash::AHashMap;
use rand::seq::SliceRandom;
use rand::Rng;

use crate::combat::context::{require_civilization, CombatContext};
use crate::combat::damage::{DamageModel, FleetStrength, Hit};
use crate::combat::engine::RoundState;
use crate::combat::events::{BattleObserver, BattleUpdate};
use crate::combat::ledger::AssetLedger;
use crate::combat::roster::{BattleRoster, SlotIndex, TargetSlot};
use crate::combat::stance::FirePhase;
use crate::combat::targeting::{StickyTargets, TargetSelector, UnitRef};
use crate::combat::unit::CombatUnit;
use crate::core::config::CombatConfig;
use crate::core::error::Result;
use crate::core::types::CivId;

/// Why an owner's slot produced no firing turn
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Slot holds `NoTarget` or `ReturnFireOnly`
    NoActiveTarget,
    /// The named owner has nothing left in the sector
    TargetGone,
    /// None of the owner's units has firepower left
    OutOfFirepower,
    /// The owner already fired more turns than its fleet warrants
    TurnCapReached,
}

/// One shooter placing a block of firepower on one enemy ledger
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Volley {
    pub shooter: UnitRef,
    pub owner: CivId,
    pub target_ledger: usize,
    pub phase: FirePhase,
    /// Firepower still to place
    pub amount: u32,
    /// Firepower already placed
    pub spent: u32,
    /// Retaliation budget left before this volley; unused for attacks
    pub budget: u32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Phase {
    SelectAttacker,
    SelectTarget(Volley),
    ApplyDamage(Volley, UnitRef),
    ContinueOrStop(Volley),
    Done,
}

/// Firepower actually consumed by a hit.
///
/// A kill only costs the share of `amount` needed to chew through the
/// target's pool; anything short of a kill consumes the whole amount.
pub fn firepower_spent(amount: u32, damage: i32, target_pool: f64) -> u32 {
    if amount == 0 {
        return 0;
    }
    if damage <= 0 || (damage as f64) < target_pool {
        return amount;
    }
    let needed = (amount as f64 * target_pool / damage as f64).ceil() as u32;
    needed.clamp(1, amount)
}

pub(crate) struct FireExchange<'a, C: CombatContext + ?Sized, R: Rng + ?Sized> {
    ledgers: &'a mut [AssetLedger],
    ctx: &'a C,
    config: &'a CombatConfig,
    roster: &'a BattleRoster,
    sticky: &'a mut StickyTargets,
    state: &'a mut RoundState,
    rng: &'a mut R,
    observer: &'a mut dyn BattleObserver,
    ledger_of: AHashMap<CivId, usize>,
    cursor: usize,
    slot: SlotIndex,
    skips: u32,
    skip_limit: u32,
    turns_fired: AHashMap<CivId, u32>,
    starting_units: AHashMap<CivId, usize>,
}

impl<'a, C, R> FireExchange<'a, C, R>
where
    C: CombatContext + ?Sized,
    R: Rng + ?Sized,
{
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        ledgers: &'a mut [AssetLedger],
        ctx: &'a C,
        config: &'a CombatConfig,
        roster: &'a BattleRoster,
        sticky: &'a mut StickyTargets,
        state: &'a mut RoundState,
        rng: &'a mut R,
        observer: &'a mut dyn BattleObserver,
    ) -> Self {
        let ledger_of = ledgers
            .iter()
            .enumerate()
            .map(|(i, l)| (l.owner(), i))
            .collect();
        let starting_units = ledgers
            .iter()
            .map(|l| (l.owner(), l.active_indices().count()))
            .collect();

        Self {
            ledgers,
            ctx,
            config,
            roster,
            sticky,
            state,
            rng,
            observer,
            ledger_of,
            cursor: 0,
            slot: SlotIndex::First,
            skips: 0,
            skip_limit: config.skip_limit(roster.owners().len()),
            turns_fired: AHashMap::new(),
            starting_units,
        }
    }

    /// Drive the exchange until every owner has run out of reasons to fire
    pub fn run(&mut self) -> Result<()> {
        if !self.roster.is_active() {
            return Ok(());
        }
        let mut phase = Phase::SelectAttacker;
        loop {
            phase = match phase {
                Phase::SelectAttacker => match self.select_attacker()? {
                    Some(volley) => Phase::SelectTarget(volley),
                    None => Phase::Done,
                },
                Phase::SelectTarget(volley) => self.select_target(volley)?,
                Phase::ApplyDamage(volley, target) => self.apply_damage(volley, target)?,
                Phase::ContinueOrStop(volley) => self.continue_or_stop(volley),
                Phase::Done => return Ok(()),
            };
        }
    }

    fn select_attacker(&mut self) -> Result<Option<Volley>> {
        let roster = self.roster;
        let owners = roster.owners();
        while self.skips < self.skip_limit {
            let owner = owners[self.cursor];
            let slot = self.slot;
            self.advance();

            let target_ledger = match self.check_turn(owner, slot) {
                Ok(target_ledger) => target_ledger,
                Err(reason) => {
                    self.skips += 1;
                    tracing::trace!(%owner, ?slot, ?reason, skips = self.skips, "slot skipped");
                    continue;
                }
            };

            let Some(&attacker_ledger) = self.ledger_of.get(&owner) else {
                self.skips += 1;
                continue;
            };
            let shooters = self.armed_units(attacker_ledger, |_| true);
            let Some(&index) = shooters.choose(&mut *self.rng) else {
                self.skips += 1;
                continue;
            };

            self.skips = 0;
            *self.turns_fired.entry(owner).or_insert(0) += 1;
            self.state.attack_turns += 1;

            let shooter = UnitRef::new(attacker_ledger, index);
            let amount = shooter
                .resolve(self.ledgers)
                .map(|u| u.weapons.remaining())
                .unwrap_or(0);
            tracing::debug!(%owner, ?slot, ?shooter, amount, "attack turn");
            return Ok(Some(Volley {
                shooter,
                owner,
                target_ledger,
                phase: FirePhase::Attack,
                amount,
                spent: 0,
                budget: 0,
            }));
        }
        tracing::debug!(skips = self.skips, "fire exchange exhausted");
        Ok(None)
    }

    fn advance(&mut self) {
        self.slot = match self.slot {
            SlotIndex::First => SlotIndex::Second,
            SlotIndex::Second => {
                self.cursor = (self.cursor + 1) % self.roster.owners().len();
                SlotIndex::First
            }
        };
    }

    /// Ledger index the owner may fire on through this slot
    fn check_turn(&self, owner: CivId, slot: SlotIndex) -> std::result::Result<usize, SkipReason> {
        let TargetSlot::Target(target) = self.roster.slot(owner, slot) else {
            return Err(SkipReason::NoActiveTarget);
        };
        let target_ledger = self
            .ledger_of
            .get(&target)
            .copied()
            .filter(|&l| self.ledgers[l].has_active())
            .ok_or(SkipReason::TargetGone)?;

        let own = self.ledger_of.get(&owner).copied();
        let armed = own.is_some_and(|l| !self.armed_units(l, |_| true).is_empty());
        if !armed {
            return Err(SkipReason::OutOfFirepower);
        }

        let fired = self.turns_fired.get(&owner).copied().unwrap_or(0);
        let starting = self.starting_units.get(&owner).copied().unwrap_or(0);
        if fired > self.config.firing_turn_floor
            && fired as f64 > self.config.firing_turn_fraction * starting as f64
        {
            return Err(SkipReason::TurnCapReached);
        }
        Ok(target_ledger)
    }

    fn armed_units(&self, ledger: usize, filter: impl Fn(&CombatUnit) -> bool) -> Vec<usize> {
        let ledger = &self.ledgers[ledger];
        ledger
            .active_indices()
            .filter(|&i| ledger.unit(i).is_some_and(|u| u.can_fire() && filter(u)))
            .collect()
    }

    fn select_target(&mut self, volley: Volley) -> Result<Phase> {
        let Some(shooter) = volley.shooter.resolve(self.ledgers) else {
            return Ok(self.volley_over(volley));
        };
        let stance = self.ctx.stance(shooter);
        let pick = TargetSelector::new(self.ledgers, self.ctx).select(
            volley.owner,
            stance,
            volley.target_ledger,
            self.sticky,
            &mut *self.rng,
        )?;
        Ok(match pick {
            Some(target) => Phase::ApplyDamage(volley, target),
            None => self.volley_over(volley),
        })
    }

    fn apply_damage(&mut self, mut volley: Volley, target: UnitRef) -> Result<Phase> {
        let (damage, pool) = {
            let ledgers: &[AssetLedger] = self.ledgers;
            let (Some(attacker), Some(defender)) = (volley.shooter.resolve(ledgers), target.resolve(ledgers))
            else {
                return Ok(self.volley_over(volley));
            };
            let hit = Hit {
                attacker,
                target: defender,
                attacker_stance: self.ctx.stance(attacker),
                target_stance: self.ctx.stance(defender),
                attacker_civ: require_civilization(self.ctx, attacker.owner)?,
                target_civ: require_civilization(self.ctx, defender.owner)?,
                attacker_strength: FleetStrength::of(&ledgers[volley.shooter.ledger]),
                target_strength: FleetStrength::of(&ledgers[target.ledger]),
                amount: volley.amount,
                phase: volley.phase,
                turn: self.ctx.turn_number(),
                pace_modifier: self.ctx.pace_modifier(),
            };
            let damage = DamageModel::new(self.config).roll(&hit, &mut *self.rng);
            (damage, defender.effective_pool())
        };

        let spent = firepower_spent(volley.amount, damage, pool);
        let spent = match volley.shooter.resolve_mut(self.ledgers) {
            Some(shooter) => shooter.weapons.spend(spent),
            None => 0,
        };
        let Some(defender) = target.resolve_mut(self.ledgers) else {
            return Ok(self.volley_over(volley));
        };
        let destroyed = defender.absorb(damage);
        let target_id = defender.id;

        volley.amount = volley.amount.saturating_sub(spent);
        volley.spent += spent;
        self.state.damaged.insert(target);
        self.state.total_damage += i64::from(damage.max(0));

        if destroyed {
            self.sticky.forget(target);
        } else {
            self.sticky.remember(volley.owner, target);
        }

        let attacker_id = volley
            .shooter
            .resolve(self.ledgers)
            .map(|u| u.id)
            .unwrap_or_default();
        tracing::trace!(phase = ?volley.phase, damage, spent, destroyed, "hit");
        self.observer.battle_updated(&BattleUpdate {
            round: self.state.round,
            phase: volley.phase,
            attacker: attacker_id,
            target: target_id,
            firepower_spent: spent,
            damage,
            destroyed,
        });

        Ok(Phase::ContinueOrStop(volley))
    }

    fn continue_or_stop(&mut self, volley: Volley) -> Phase {
        let shooter_ready = volley
            .shooter
            .resolve(self.ledgers)
            .is_some_and(|u| u.can_fire());
        let targets_left = self.ledgers[volley.target_ledger].has_active();
        if volley.amount > 0 && shooter_ready && targets_left {
            return Phase::SelectTarget(volley);
        }
        self.volley_over(volley)
    }

    /// Where the machine goes once a volley has nothing more to place
    fn volley_over(&mut self, volley: Volley) -> Phase {
        match volley.phase {
            FirePhase::Attack => {
                let defender = self.ledgers[volley.target_ledger].owner();
                if volley.spent == 0 || self.roster.holds_fire(defender) {
                    return Phase::SelectAttacker;
                }
                match self.next_retaliator(volley.target_ledger, volley.shooter.ledger, volley.spent) {
                    Some(retaliation) => {
                        self.state.retaliations += 1;
                        tracing::debug!(%defender, budget = volley.spent, "retaliating");
                        Phase::SelectTarget(retaliation)
                    }
                    // nobody able to shoot back: the budget lapses
                    None => Phase::SelectAttacker,
                }
            }
            FirePhase::Retaliation => {
                let budget = volley.budget.saturating_sub(volley.spent);
                if volley.spent == 0 || budget == 0 {
                    return Phase::SelectAttacker;
                }
                match self.next_retaliator(volley.shooter.ledger, volley.target_ledger, budget) {
                    Some(next) => Phase::SelectTarget(next),
                    None => Phase::SelectAttacker,
                }
            }
        }
    }

    /// Draw the next unit to shoot back: mobile units first, the station last
    fn next_retaliator(&mut self, defender_ledger: usize, attacker_ledger: usize, budget: u32) -> Option<Volley> {
        if !self.ledgers[attacker_ledger].has_active() {
            return None;
        }
        let mobile = self.armed_units(defender_ledger, |u| !u.is_station());
        let index = match mobile.choose(&mut *self.rng) {
            Some(&index) => index,
            None => *self.armed_units(defender_ledger, |u| u.is_station()).first()?,
        };

        let shooter = UnitRef::new(defender_ledger, index);
        let remaining = shooter.resolve(self.ledgers)?.weapons.remaining();
        Some(Volley {
            shooter,
            owner: self.ledgers[defender_ledger].owner(),
            target_ledger: attacker_ledger,
            phase: FirePhase::Retaliation,
            amount: remaining.min(budget),
            spent: 0,
            budget,
        })
    }
}
