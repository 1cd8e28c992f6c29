//! Combat engine integration tests
//!
//! Whole rounds driven through the public `Battle` API, including the
//! statistical checks on retreat and assimilation rates.

use proptest::prelude::*;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use sector_combat::combat::{
    AssetLedger, Battle, Bucket, Civilization, CombatContext, CombatEvent, CombatUnit, Disposition,
    Encounter, EncounterSpec, FirePhase, HullClass, NullObserver, RecordingObserver, RoundOutcome,
    Stance, TargetSlot,
};
use sector_combat::combat::roster::BattleRoster;
use sector_combat::core::config::CombatConfig;
use sector_combat::core::types::{CivId, FleetId};

const TRIALS: u32 = 10_000;

fn civ(id: u32, name: &str) -> Civilization {
    Civilization::new(CivId(id), name)
}

fn single(owner: u32, unit: CombatUnit) -> AssetLedger {
    AssetLedger::new(CivId(owner)).with_unit(unit).unwrap()
}

fn escape_rate(class: HullClass) -> f64 {
    let mut ctx = Encounter::new(1).with_civ(civ(1, "Federation"));
    ctx.set_stance(FleetId(1), Stance::Retreat);
    let mut rng = ChaCha8Rng::seed_from_u64(2024);

    let mut escaped = 0;
    for _ in 0..TRIALS {
        let unit = CombatUnit::ship(CivId(1), "Runner", class, 100, 200, 100).with_fleet(FleetId(1));
        let mut battle = Battle::new(vec![single(1, unit)]).unwrap();
        battle.resolve_round(&ctx, &mut rng, &mut NullObserver).unwrap();
        if battle.ledgers()[0].bucket_of(0) == Some(Bucket::Escaped) {
            escaped += 1;
        }
    }
    escaped as f64 / TRIALS as f64
}

#[test]
fn test_easy_retreat_rate() {
    let rate = escape_rate(HullClass::Scout);
    assert!((rate - 0.8).abs() < 0.02, "easy retreat rate {}", rate);
}

#[test]
fn test_hard_retreat_rate() {
    let rate = escape_rate(HullClass::Battleship);
    assert!((rate - 0.5).abs() < 0.02, "hard retreat rate {}", rate);
}

#[test]
fn test_no_retreat_after_attrition_rounds() {
    let mut ctx = Encounter::new(1).with_civ(civ(1, "Federation"));
    ctx.set_stance(FleetId(1), Stance::Retreat);
    let config = CombatConfig {
        easy_retreat_chance: 1.0,
        attrition_round_limit: 0,
        ..CombatConfig::default()
    };
    let unit = CombatUnit::ship(CivId(1), "Runner", HullClass::Scout, 10, 50, 0).with_fleet(FleetId(1));
    let mut battle = Battle::with_config(vec![single(1, unit)], config).unwrap();
    let mut rng = ChaCha8Rng::seed_from_u64(1);
    battle.resolve_round(&ctx, &mut rng, &mut NullObserver).unwrap();

    assert_eq!(battle.ledgers()[0].bucket_of(0), Some(Bucket::Combat));
}

#[test]
fn test_cruiser_destroys_frigate_in_one_pass() {
    let mut ctx = Encounter::new(1)
        .with_civ(civ(1, "Federation"))
        .with_civ(civ(2, "Cardassians"))
        .with_war(CivId(1), CivId(2));
    ctx.set_stance(FleetId(1), Stance::Engage);
    ctx.set_stance(FleetId(2), Stance::Engage);

    for seed in 0..50 {
        let cruiser = CombatUnit::ship(CivId(1), "Cruiser", HullClass::Cruiser, 500, 300, 200).with_fleet(FleetId(1));
        let frigate = CombatUnit::ship(CivId(2), "Frigate", HullClass::Frigate, 100, 100, 50).with_fleet(FleetId(2));
        let mut battle = Battle::new(vec![single(1, cruiser), single(2, frigate)]).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let report = battle.resolve_round(&ctx, &mut rng, &mut NullObserver).unwrap();

        let frigate = battle.ledgers()[1].unit(0).unwrap();
        assert!(frigate.pool() <= 0);
        assert_eq!(battle.ledgers()[1].bucket_of(0), Some(Bucket::Destroyed));

        let cruiser = battle.ledgers()[0].unit(0).unwrap();
        assert!(cruiser.weapons.remaining() < cruiser.weapons.firepower());
        assert!(report.attack_turns >= 1);
        assert!(report
            .events
            .iter()
            .any(|e| matches!(e, CombatEvent::Destroyed { unit } if unit.owner == CivId(2))));
    }
}

#[test]
fn test_retaliation_spends_defender_firepower() {
    let ctx = Encounter::new(1)
        .with_civ(civ(1, "Federation"))
        .with_civ(civ(2, "Cardassians"))
        .with_war(CivId(1), CivId(2));
    let tank = |owner| CombatUnit::ship(CivId(owner), "Bulwark", HullClass::Battleship, 200, 20_000, 20_000);
    let mut battle = Battle::new(vec![single(1, tank(1)), single(2, tank(2))]).unwrap();
    let mut rng = ChaCha8Rng::seed_from_u64(77);
    let mut observer = RecordingObserver::new();
    let report = battle.resolve_round(&ctx, &mut rng, &mut observer).unwrap();

    assert!(report.retaliations >= 1);
    assert!(observer.updates.iter().any(|u| u.phase == FirePhase::Retaliation));
    for ledger in battle.ledgers() {
        assert_eq!(ledger.unit(0).unwrap().weapons.remaining(), 0);
    }
}

#[test]
fn test_assimilation_rate_matches_config() {
    let mut borg = civ(9, "Borg Collective");
    borg.is_borg = true;
    let ctx = Encounter::new(1).with_civ(civ(1, "Federation")).with_civ(borg);
    let config = CombatConfig::default();
    let expected = config.assimilation_chance;
    let mut rng = ChaCha8Rng::seed_from_u64(4242);

    let mut assimilated = 0;
    for _ in 0..TRIALS {
        let cube = CombatUnit::ship(CivId(9), "Cube", HullClass::Cube, 1000, 5000, 5000);
        let victim = CombatUnit::ship(CivId(1), "Yamato", HullClass::Cruiser, 300, 300, 200);
        let mut battle =
            Battle::with_config(vec![single(1, victim), single(9, cube)], config.clone()).unwrap();
        let report = battle.resolve_round(&ctx, &mut rng, &mut NullObserver).unwrap();

        let ledger = &battle.ledgers()[0];
        if ledger.bucket_of(0) == Some(Bucket::Assimilated) {
            assimilated += 1;
            assert_eq!(ledger.count(Bucket::Destroyed), 0);
            assert!(!report
                .events
                .iter()
                .any(|e| matches!(e, CombatEvent::Destroyed { .. })));
        }
        assert_eq!(battle.ledgers()[1].count(Bucket::Assimilated), 0);
    }

    let rate = assimilated as f64 / TRIALS as f64;
    assert!((rate - expected).abs() < 0.01, "assimilation rate {}", rate);
}

#[test]
fn test_peaceful_owners_terminate_without_damage() {
    let ctx = Encounter::new(1)
        .with_civ(civ(1, "Federation"))
        .with_civ(civ(2, "Vulcans"))
        .with_civ(Civilization {
            disposition: Disposition::Friendly,
            ..civ(3, "Bajorans")
        });
    let mut rng = ChaCha8Rng::seed_from_u64(5);

    let roster = BattleRoster::build(&[CivId(1), CivId(2), CivId(3)], &ctx, &mut rng).unwrap();
    for owner in roster.owners() {
        assert_eq!(roster.slots(*owner), [TargetSlot::ReturnFireOnly; 2]);
    }

    let ledgers = (1..=3)
        .map(|owner| single(owner, CombatUnit::ship(CivId(owner), "Patrol", HullClass::Cruiser, 300, 300, 300)))
        .collect();
    let mut battle = Battle::new(ledgers).unwrap();
    let mut observer = RecordingObserver::new();
    let report = battle.resolve_round(&ctx, &mut rng, &mut observer).unwrap();

    assert_eq!(report.outcome, RoundOutcome::Resolved);
    assert_eq!(report.attack_turns, 0);
    assert_eq!(report.total_damage, 0);
    assert!(observer.updates.is_empty());
    for ledger in battle.ledgers() {
        let unit = ledger.unit(0).unwrap();
        assert_eq!(unit.pool(), 600);
        assert_eq!(ledger.bucket_of(0), Some(Bucket::Combat));
    }
}

#[test]
fn test_finalizer_rerun_is_a_no_op() {
    let ctx = Encounter::new(1)
        .with_civ(civ(1, "Federation"))
        .with_civ(civ(2, "Dominion"))
        .with_war(CivId(1), CivId(2));
    let ledgers = vec![
        AssetLedger::new(CivId(1))
            .with_unit(CombatUnit::ship(CivId(1), "Defiant", HullClass::Destroyer, 250, 250, 150))
            .unwrap()
            .with_unit(CombatUnit::ship(CivId(1), "Lakota", HullClass::Cruiser, 300, 300, 200))
            .unwrap(),
        AssetLedger::new(CivId(2))
            .with_unit(CombatUnit::ship(CivId(2), "Attack Ship", HullClass::Frigate, 150, 150, 100))
            .unwrap()
            .with_unit(CombatUnit::ship(CivId(2), "Battlecruiser", HullClass::Battleship, 400, 500, 300))
            .unwrap(),
    ];
    let mut battle = Battle::new(ledgers).unwrap();
    let mut rng = ChaCha8Rng::seed_from_u64(31);
    battle.resolve_round(&ctx, &mut rng, &mut NullObserver).unwrap();

    let before = battle.summaries();
    let buckets: Vec<Vec<Option<Bucket>>> = battle
        .ledgers()
        .iter()
        .map(|l| (0..l.len()).map(|i| l.bucket_of(i)).collect())
        .collect();

    let events = battle.finalize_round(&ctx, &mut NullObserver);
    assert!(events.is_empty());
    assert_eq!(battle.summaries(), before);
    let after: Vec<Vec<Option<Bucket>>> = battle
        .ledgers()
        .iter()
        .map(|l| (0..l.len()).map(|i| l.bucket_of(i)).collect())
        .collect();
    assert_eq!(buckets, after);
}

#[test]
fn test_sample_scenario_runs() {
    let spec = EncounterSpec::from_toml_str(include_str!("../data/scenarios/border_skirmish.toml")).unwrap();
    let (ctx, ledgers) = spec.build().unwrap();
    assert_eq!(ledgers.len(), 3);
    assert!(ctx.civilization(CivId(1)).unwrap().is_human());

    let mut battle = Battle::new(ledgers).unwrap();
    let mut rng = ChaCha8Rng::seed_from_u64(64);
    let mut observer = RecordingObserver::new();
    for _ in 0..5 {
        let report = battle.resolve_round(&ctx, &mut rng, &mut observer).unwrap();
        if report.outcome == RoundOutcome::Inactive || battle.is_over() {
            break;
        }
    }

    assert!(battle.round() >= 1);
    assert!(!observer.updates.is_empty());
    // Romulan cloaks drop on the first round
    assert!(observer
        .sitreps_for(CivId(3))
        .any(|e| matches!(e, CombatEvent::Decloaked { .. })));
}

fn fleet(owner: u32, sizes: &[(u32, i32)]) -> AssetLedger {
    let mut ledger = AssetLedger::new(CivId(owner));
    let classes = [HullClass::Cruiser, HullClass::Destroyer, HullClass::Frigate, HullClass::Battleship];
    for (i, &(firepower, hull)) in sizes.iter().enumerate() {
        let unit = CombatUnit::ship(CivId(owner), format!("Ship {}", i), classes[i % classes.len()], firepower, hull, hull / 2)
            .with_fleet(FleetId(owner));
        ledger.add(unit).unwrap();
    }
    ledger
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_firepower_and_partition_hold(
        seed in any::<u64>(),
        a in prop::collection::vec((0u32..600, 1i32..800), 1..6),
        b in prop::collection::vec((0u32..600, 1i32..800), 1..6),
        retreat in any::<bool>(),
    ) {
        let mut ctx = Encounter::new(1)
            .with_civ(civ(1, "Federation"))
            .with_civ(civ(2, "Klingons"))
            .with_war(CivId(1), CivId(2));
        if retreat {
            ctx.set_stance(FleetId(2), Stance::Retreat);
        }
        let total = a.len() + b.len();
        let mut battle = Battle::new(vec![fleet(1, &a), fleet(2, &b)]).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let mut left: Vec<Vec<bool>> = battle
            .ledgers()
            .iter()
            .map(|l| vec![false; l.len()])
            .collect();

        for _ in 0..3 {
            battle.resolve_round(&ctx, &mut rng, &mut NullObserver).unwrap();

            let mut counted = 0;
            for (l, ledger) in battle.ledgers().iter().enumerate() {
                let summary = ledger.summary();
                counted += summary.combat + summary.non_combat + summary.escaped
                    + summary.destroyed + summary.assimilated;
                for i in 0..ledger.len() {
                    let unit = ledger.unit(i).unwrap();
                    prop_assert!(unit.weapons.remaining() <= unit.weapons.firepower());
                    let bucket = ledger.bucket_of(i).unwrap();
                    if left[l][i] {
                        prop_assert!(bucket.is_terminal());
                    }
                    if bucket.is_terminal() {
                        left[l][i] = true;
                    }
                }
            }
            prop_assert_eq!(counted, total);
        }
    }
}
