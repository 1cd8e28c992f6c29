//! End-of-round bookkeeping
//!
//! Wrecks are moved to `Destroyed`, damaged survivors get a report, and
//! every surviving unit without a reason to hold the sector is pulled out.
//! Running it twice in a row changes nothing the second time.

use crate::combat::context::CombatContext;
use crate::combat::engine::RoundState;
use crate::combat::events::{BattleObserver, CombatEvent, UnitTag};
use crate::combat::ledger::{AssetLedger, Bucket};
use crate::combat::targeting::{StickyTargets, UnitRef};
use crate::combat::unit::CombatUnit;
use crate::core::config::CombatConfig;
use crate::core::types::CivId;

/// Facts about the sector that decide who may stay after the round
#[derive(Debug, Clone, Default)]
struct StayContext {
    station_owner: Option<CivId>,
    builder_owners: Vec<CivId>,
    first_survivor_owner: Option<CivId>,
}

impl StayContext {
    fn gather(ledgers: &[AssetLedger], survivors: &[UnitRef]) -> Self {
        let mut context = StayContext::default();
        for unit in survivors.iter().filter_map(|r| r.resolve(ledgers)) {
            context.first_survivor_owner.get_or_insert(unit.owner);
            if unit.is_station() {
                context.station_owner.get_or_insert(unit.owner);
            }
            if unit.hull_class.is_builder() && !context.builder_owners.contains(&unit.owner) {
                context.builder_owners.push(unit.owner);
            }
        }
        context
    }
}

/// Whether a surviving unit keeps its place in the sector
pub fn may_stay<C: CombatContext + ?Sized>(
    unit: &CombatUnit,
    ctx: &C,
    config: &CombatConfig,
    station_owner: Option<CivId>,
    builder_owners: &[CivId],
    first_survivor_owner: Option<CivId>,
) -> bool {
    let owner = unit.owner;
    let tolerated = |other: CivId| other == owner || !ctx.will_engage(owner, other);
    let sector = ctx.sector();

    unit.is_station()
        || sector.home_of == Some(owner)
        || sector.system_owner.is_some_and(|o| tolerated(o))
        || station_owner.is_some_and(|o| tolerated(o))
        || builder_owners.iter().any(|&o| tolerated(o))
        || first_survivor_owner.is_some_and(|o| tolerated(o))
        || unit.weapons.remaining() > config.forced_stay_firepower
}

pub(crate) fn finalize<C>(
    ledgers: &mut [AssetLedger],
    ctx: &C,
    config: &CombatConfig,
    sticky: &mut StickyTargets,
    state: &mut RoundState,
    observer: &mut dyn BattleObserver,
) where
    C: CombatContext + ?Sized,
{
    for l in 0..ledgers.len() {
        let wrecks: Vec<usize> = ledgers[l]
            .entries()
            .filter(|(_, e)| e.bucket().is_engaged() && !e.unit.is_alive())
            .map(|(i, _)| i)
            .collect();
        for index in wrecks {
            if !ledgers[l].transition(index, Bucket::Destroyed) {
                continue;
            }
            let r = UnitRef::new(l, index);
            sticky.forget(r);
            state.damaged.remove(&r);
            if let Some(unit) = r.resolve(ledgers) {
                tracing::debug!(unit = %unit.name, owner = %unit.owner, "destroyed");
                state.record(CombatEvent::Destroyed { unit: UnitTag::from(unit) }, observer);
            }
        }
    }

    let mut damaged: Vec<UnitRef> = state.damaged.drain().collect();
    damaged.sort_by_key(|r| (r.ledger, r.index));
    for r in damaged {
        if !r.is_active(ledgers) {
            continue;
        }
        if let Some(unit) = r.resolve(ledgers) {
            let event = CombatEvent::Survived {
                unit: UnitTag::from(unit),
                hull: unit.hull.current,
                shield: unit.shield.current,
            };
            state.record(event, observer);
        }
    }

    let survivors: Vec<UnitRef> = ledgers
        .iter()
        .enumerate()
        .flat_map(|(l, ledger)| ledger.active_indices().map(move |i| UnitRef::new(l, i)))
        .collect();
    let stay = StayContext::gather(ledgers, &survivors);

    for r in survivors {
        let Some(unit) = r.resolve(ledgers) else { continue };
        if may_stay(
            unit,
            ctx,
            config,
            stay.station_owner,
            &stay.builder_owners,
            stay.first_survivor_owner,
        ) {
            continue;
        }
        let tag = UnitTag::from(unit);
        if ledgers[r.ledger].transition(r.index, Bucket::Escaped) {
            sticky.forget(r);
            tracing::debug!(unit = %tag.name, owner = %tag.owner, "forced retreat");
            state.record(CombatEvent::ForcedRetreat { unit: tag }, observer);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combat::context::{Civilization, Disposition, SectorInfo};
    use crate::combat::encounter::Encounter;
    use crate::combat::events::NullObserver;
    use crate::combat::unit::HullClass;

    fn warring() -> Encounter {
        Encounter::new(1)
            .with_civ(Civilization::new(CivId(1), "Federation"))
            .with_civ(Civilization::new(CivId(2), "Dominion"))
            .with_war(CivId(1), CivId(2))
    }

    fn ship(owner: u32, name: &str, firepower: u32) -> CombatUnit {
        CombatUnit::ship(CivId(owner), name, HullClass::Destroyer, firepower, 100, 50)
    }

    fn run(ctx: &Encounter, ledgers: &mut [AssetLedger], state: &mut RoundState) {
        let mut sticky = StickyTargets::new();
        finalize(ledgers, ctx, &CombatConfig::default(), &mut sticky, state, &mut NullObserver);
    }

    #[test]
    fn test_wrecks_move_to_destroyed() {
        let ctx = warring();
        let mut ledgers = vec![AssetLedger::new(CivId(1)).with_unit(ship(1, "Valiant", 50)).unwrap()];
        ledgers[0].unit_mut(0).unwrap().hull.current = 0;
        let mut state = RoundState::new(0);
        state.damaged.insert(UnitRef::new(0, 0));
        run(&ctx, &mut ledgers, &mut state);

        assert_eq!(ledgers[0].bucket_of(0), Some(Bucket::Destroyed));
        assert_eq!(state.events.len(), 1);
        assert!(matches!(state.events[0], CombatEvent::Destroyed { .. }));
    }

    #[test]
    fn test_damaged_survivor_reported() {
        let ctx = warring();
        let mut ledgers = vec![AssetLedger::new(CivId(1)).with_unit(ship(1, "Valiant", 50)).unwrap()];
        ledgers[0].unit_mut(0).unwrap().hull.current = 40;
        let mut state = RoundState::new(0);
        state.damaged.insert(UnitRef::new(0, 0));
        run(&ctx, &mut ledgers, &mut state);

        assert_eq!(
            state.events,
            vec![CombatEvent::Survived {
                unit: UnitTag::from(ledgers[0].unit(0).unwrap()),
                hull: 40,
                shield: 50,
            }]
        );
    }

    #[test]
    fn test_first_survivor_holds_and_enemy_withdraws() {
        let ctx = warring();
        let mut ledgers = vec![
            AssetLedger::new(CivId(1)).with_unit(ship(1, "Valiant", 50)).unwrap(),
            AssetLedger::new(CivId(2)).with_unit(ship(2, "Jem'Hadar", 50)).unwrap(),
        ];
        let mut state = RoundState::new(0);
        run(&ctx, &mut ledgers, &mut state);

        assert_eq!(ledgers[0].bucket_of(0), Some(Bucket::Combat));
        assert_eq!(ledgers[1].bucket_of(0), Some(Bucket::Escaped));
        assert!(matches!(state.events[0], CombatEvent::ForcedRetreat { .. }));
    }

    #[test]
    fn test_heavy_firepower_keeps_a_unit_in_place() {
        let ctx = warring();
        let mut ledgers = vec![
            AssetLedger::new(CivId(1)).with_unit(ship(1, "Valiant", 50)).unwrap(),
            AssetLedger::new(CivId(2)).with_unit(ship(2, "Jem'Hadar", 500)).unwrap(),
        ];
        let mut state = RoundState::new(0);
        run(&ctx, &mut ledgers, &mut state);

        assert_eq!(ledgers[1].bucket_of(0), Some(Bucket::Combat));
    }

    #[test]
    fn test_home_system_defenders_stay() {
        let ctx = warring().with_sector(SectorInfo {
            system_owner: Some(CivId(2)),
            home_of: Some(CivId(2)),
        });
        let mut ledgers = vec![
            AssetLedger::new(CivId(1)).with_unit(ship(1, "Valiant", 50)).unwrap(),
            AssetLedger::new(CivId(2)).with_unit(ship(2, "Jem'Hadar", 50)).unwrap(),
        ];
        let mut state = RoundState::new(0);
        run(&ctx, &mut ledgers, &mut state);

        assert_eq!(ledgers[1].bucket_of(0), Some(Bucket::Combat));
    }

    #[test]
    fn test_tolerated_system_owner_lets_visitors_stay() {
        let mut traders = Civilization::new(CivId(3), "Ferengi");
        traders.disposition = Disposition::Friendly;
        let ctx = warring()
            .with_civ(traders)
            .with_sector(SectorInfo { system_owner: Some(CivId(1)), home_of: None });
        let mut ledgers = vec![
            AssetLedger::new(CivId(2)).with_unit(ship(2, "Jem'Hadar", 50)).unwrap(),
            AssetLedger::new(CivId(3)).with_unit(ship(3, "Marauder", 50)).unwrap(),
        ];
        let mut state = RoundState::new(0);
        run(&ctx, &mut ledgers, &mut state);

        assert_eq!(ledgers[1].bucket_of(0), Some(Bucket::Combat));
    }

    #[test]
    fn test_second_pass_is_a_no_op() {
        let ctx = warring();
        let mut ledgers = vec![
            AssetLedger::new(CivId(1)).with_unit(ship(1, "Valiant", 50)).unwrap(),
            AssetLedger::new(CivId(2))
                .with_unit(ship(2, "Jem'Hadar", 50))
                .unwrap()
                .with_unit(ship(2, "Wreck", 50))
                .unwrap(),
        ];
        ledgers[1].unit_mut(1).unwrap().hull.current = 0;
        let mut state = RoundState::new(0);
        run(&ctx, &mut ledgers, &mut state);
        let first: Vec<_> = ledgers.iter().map(|l| l.summary()).collect();
        let events = state.events.len();

        run(&ctx, &mut ledgers, &mut state);
        let second: Vec<_> = ledgers.iter().map(|l| l.summary()).collect();
        assert_eq!(first, second);
        assert_eq!(state.events.len(), events);
    }
}
