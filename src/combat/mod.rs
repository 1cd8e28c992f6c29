//! Multi-party space battle resolution

pub mod attrition;
pub mod constants;
pub mod context;
pub mod cycle;
pub mod damage;
pub mod encounter;
pub mod engine;
pub mod events;
pub mod finalizer;
pub mod ledger;
pub mod roster;
pub mod stance;
pub mod targeting;
pub mod unit;

pub use context::{CombatContext, Civilization, Controller, Disposition, SectorInfo};
pub use encounter::{Encounter, EncounterSpec};
pub use engine::{Battle, RoundOutcome, RoundReport};
pub use events::{BattleObserver, BattleUpdate, CombatEvent, NullObserver, RecordingObserver, UnitTag};
pub use ledger::{AssetLedger, Bucket, LedgerSummary};
pub use roster::{BattleRoster, TargetSlot};
pub use stance::{FirePhase, Stance};
pub use unit::{CombatUnit, Experience, HullClass};
