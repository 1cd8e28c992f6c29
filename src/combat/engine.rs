//! Per-round battle driver
//!
//! `Battle` owns the ledgers for one sector and resolves one round at a
//! time: attrition, roster, fire exchange, then finalization. The caller
//! decides how many rounds to run.

use ahash::AHashSet;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::combat::attrition::resolve_attrition;
use crate::combat::context::CombatContext;
use crate::combat::cycle::FireExchange;
use crate::combat::events::{BattleObserver, CombatEvent};
use crate::combat::finalizer::finalize;
use crate::combat::ledger::{AssetLedger, LedgerSummary};
use crate::combat::roster::BattleRoster;
use crate::combat::targeting::{StickyTargets, UnitRef};
use crate::core::config::CombatConfig;
use crate::core::error::{CombatError, Result};
use crate::core::types::CivId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundOutcome {
    /// Fewer than two owners were left to fight
    Inactive,
    Resolved,
}

/// What happened in one round
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundReport {
    pub round: u32,
    pub outcome: RoundOutcome,
    pub events: Vec<CombatEvent>,
    pub attack_turns: u32,
    pub retaliations: u32,
    pub total_damage: i64,
    /// Bucket counts per owner after the round
    pub ledgers: Vec<(CivId, LedgerSummary)>,
}

impl RoundReport {
    /// Events that belong in `owner`'s situation report
    pub fn sitreps_for(&self, owner: CivId) -> impl Iterator<Item = &CombatEvent> {
        self.events
            .iter()
            .filter(move |event| event.recipients().contains(&owner))
    }
}

/// Scratch state for the round in progress
#[derive(Debug, Default)]
pub(crate) struct RoundState {
    pub round: u32,
    pub events: Vec<CombatEvent>,
    /// Units hit at least once this round
    pub damaged: AHashSet<UnitRef>,
    pub attack_turns: u32,
    pub retaliations: u32,
    pub total_damage: i64,
}

impl RoundState {
    pub fn new(round: u32) -> Self {
        Self {
            round,
            ..Self::default()
        }
    }

    /// Keep the event and route it to every civilization it concerns
    pub fn record(&mut self, event: CombatEvent, observer: &mut dyn BattleObserver) {
        for owner in event.recipients() {
            observer.append_sitrep(owner, &event);
        }
        self.events.push(event);
    }
}

#[derive(Debug, Clone)]
pub struct Battle {
    ledgers: Vec<AssetLedger>,
    config: CombatConfig,
    round: u32,
    sticky: StickyTargets,
}

impl Battle {
    /// One ledger per owner, in roster order
    pub fn new(ledgers: Vec<AssetLedger>) -> Result<Self> {
        Self::with_config(ledgers, CombatConfig::default())
    }

    pub fn with_config(ledgers: Vec<AssetLedger>, config: CombatConfig) -> Result<Self> {
        config.validate()?;
        let mut seen = AHashSet::new();
        for ledger in &ledgers {
            if !seen.insert(ledger.owner()) {
                return Err(CombatError::InvalidEncounter(format!(
                    "{} has more than one ledger",
                    ledger.owner()
                )));
            }
        }
        Ok(Self {
            ledgers,
            config,
            round: 0,
            sticky: StickyTargets::new(),
        })
    }

    pub fn config(&self) -> &CombatConfig {
        &self.config
    }

    /// Rounds resolved so far
    pub fn round(&self) -> u32 {
        self.round
    }

    pub fn ledgers(&self) -> &[AssetLedger] {
        &self.ledgers
    }

    pub fn ledger(&self, owner: CivId) -> Option<&AssetLedger> {
        self.ledgers.iter().find(|l| l.owner() == owner)
    }

    pub fn into_ledgers(self) -> Vec<AssetLedger> {
        self.ledgers
    }

    /// Owners with at least one unit still in the fight, in roster order
    pub fn participants(&self) -> Vec<CivId> {
        self.ledgers
            .iter()
            .filter(|l| l.has_active())
            .map(|l| l.owner())
            .collect()
    }

    /// Fewer than two owners still have armed units in the fight
    pub fn is_over(&self) -> bool {
        self.ledgers.iter().filter(|l| l.has_combatants()).count() < 2
    }

    pub fn summaries(&self) -> Vec<(CivId, LedgerSummary)> {
        self.ledgers
            .iter()
            .map(|l| (l.owner(), l.summary()))
            .collect()
    }

    /// Resolve one full round and advance the round counter
    pub fn resolve_round<C, R>(
        &mut self,
        ctx: &C,
        rng: &mut R,
        observer: &mut dyn BattleObserver,
    ) -> Result<RoundReport>
    where
        C: CombatContext + ?Sized,
        R: Rng + ?Sized,
    {
        let mut state = RoundState::new(self.round);
        tracing::debug!(round = self.round, "round start");

        for ledger in &mut self.ledgers {
            ledger.reset_firepower();
        }

        if self.round < self.config.attrition_round_limit {
            resolve_attrition(&mut self.ledgers, ctx, &self.config, &mut state, rng, observer)?;
        }

        let roster = BattleRoster::build(&self.participants(), ctx, rng)?;
        let outcome = if roster.is_active() {
            FireExchange::new(
                &mut self.ledgers,
                ctx,
                &self.config,
                &roster,
                &mut self.sticky,
                &mut state,
                rng,
                observer,
            )
            .run()?;
            finalize(&mut self.ledgers, ctx, &self.config, &mut self.sticky, &mut state, observer);
            RoundOutcome::Resolved
        } else {
            tracing::debug!(round = self.round, "fewer than two owners, round inactive");
            RoundOutcome::Inactive
        };

        let report = RoundReport {
            round: self.round,
            outcome,
            events: state.events,
            attack_turns: state.attack_turns,
            retaliations: state.retaliations,
            total_damage: state.total_damage,
            ledgers: self.summaries(),
        };
        tracing::info!(
            round = report.round,
            outcome = ?report.outcome,
            attack_turns = report.attack_turns,
            retaliations = report.retaliations,
            damage = report.total_damage,
            events = report.events.len(),
            "round resolved"
        );

        self.round += 1;
        observer.round_ended(&report);
        if report.outcome == RoundOutcome::Inactive || self.is_over() {
            observer.battle_ended(&report);
        }
        Ok(report)
    }

    /// Run the end-of-round pass on its own; a second call in a row is a no-op
    pub fn finalize_round<C>(&mut self, ctx: &C, observer: &mut dyn BattleObserver) -> Vec<CombatEvent>
    where
        C: CombatContext + ?Sized,
    {
        let mut state = RoundState::new(self.round);
        finalize(&mut self.ledgers, ctx, &self.config, &mut self.sticky, &mut state, observer);
        state.events
    }
}
