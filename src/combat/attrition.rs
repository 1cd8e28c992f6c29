//! Pre-round attrition
//!
//! Before the first shots of an early round: units under Retreat try to
//! slip away, cloaks drop, and a Borg presence assimilates what it can.

use rand::Rng;

use crate::combat::context::{require_civilization, CombatContext};
use crate::combat::engine::RoundState;
use crate::combat::events::{BattleObserver, CombatEvent, UnitTag};
use crate::combat::ledger::{AssetLedger, Bucket};
use crate::combat::stance::Stance;
use crate::combat::targeting::UnitRef;
use crate::combat::unit::CombatUnit;
use crate::core::config::CombatConfig;
use crate::core::error::Result;
use crate::core::types::CivId;

/// Cloaked, camouflaged and light hulls get away more easily
pub fn is_easy_retreat(unit: &CombatUnit) -> bool {
    unit.is_hidden() || unit.hull_class.is_light()
}

fn active_refs(ledgers: &[AssetLedger]) -> Vec<UnitRef> {
    ledgers
        .iter()
        .enumerate()
        .flat_map(|(l, ledger)| ledger.active_indices().map(move |i| UnitRef::new(l, i)))
        .collect()
}

pub(crate) fn resolve_attrition<C, R>(
    ledgers: &mut [AssetLedger],
    ctx: &C,
    config: &CombatConfig,
    state: &mut RoundState,
    rng: &mut R,
    observer: &mut dyn BattleObserver,
) -> Result<()>
where
    C: CombatContext + ?Sized,
    R: Rng + ?Sized,
{
    // Easy-retreat candidates are fixed up front so a failed easy roll
    // does not fall through to the hard pass.
    let retreating: Vec<(UnitRef, bool)> = active_refs(ledgers)
        .into_iter()
        .filter_map(|r| {
            let unit = r.resolve(ledgers)?;
            let retreat = !unit.is_station() && ctx.stance(unit) == Stance::Retreat;
            retreat.then(|| (r, is_easy_retreat(unit)))
        })
        .collect();

    for easy in [true, false] {
        let chance = if easy {
            config.easy_retreat_chance
        } else {
            config.hard_retreat_chance
        };
        for &(r, _) in retreating.iter().filter(|(_, e)| *e == easy) {
            if rng.gen_bool(chance) {
                escape(ledgers, r, state, observer);
            }
        }
    }

    for r in active_refs(ledgers) {
        let Some(unit) = r.resolve_mut(ledgers) else { continue };
        if unit.is_hidden() {
            unit.decloak();
            let tag = UnitTag::from(&*unit);
            tracing::debug!(unit = %tag.name, "decloaked");
            state.record(CombatEvent::Decloaked { unit: tag }, observer);
        }
    }

    assimilate(ledgers, ctx, config, state, rng, observer)
}

fn escape(
    ledgers: &mut [AssetLedger],
    r: UnitRef,
    state: &mut RoundState,
    observer: &mut dyn BattleObserver,
) {
    if !ledgers[r.ledger].transition(r.index, Bucket::Escaped) {
        return;
    }
    if let Some(unit) = r.resolve(ledgers) {
        tracing::debug!(unit = %unit.name, owner = %unit.owner, "escaped before firing");
        state.record(CombatEvent::Escaped { unit: UnitTag::from(unit) }, observer);
    }
}

fn assimilate<C, R>(
    ledgers: &mut [AssetLedger],
    ctx: &C,
    config: &CombatConfig,
    state: &mut RoundState,
    rng: &mut R,
    observer: &mut dyn BattleObserver,
) -> Result<()>
where
    C: CombatContext + ?Sized,
    R: Rng + ?Sized,
{
    let mut collective: Option<CivId> = None;
    let mut borg_owners = Vec::new();
    for ledger in ledgers.iter().filter(|l| l.has_active()) {
        if require_civilization(ctx, ledger.owner())?.is_borg {
            borg_owners.push(ledger.owner());
            collective.get_or_insert(ledger.owner());
        }
    }
    let Some(collective) = collective else {
        return Ok(());
    };

    for r in active_refs(ledgers) {
        if borg_owners.contains(&ledgers[r.ledger].owner()) {
            continue;
        }
        if !rng.gen_bool(config.assimilation_chance) {
            continue;
        }
        if ledgers[r.ledger].transition(r.index, Bucket::Assimilated) {
            if let Some(unit) = r.resolve(ledgers) {
                tracing::debug!(unit = %unit.name, by = %collective, "assimilated");
                state.record(
                    CombatEvent::Assimilated { unit: UnitTag::from(unit), by: collective },
                    observer,
                );
            }
        }
    }
    Ok(())
}
