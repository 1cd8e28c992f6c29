//! Sector Combat - Entry Point
//!
//! Loads an encounter scenario, resolves battle rounds against it and
//! prints what happened.

use clap::Parser;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use sector_combat::combat::{
    Battle, CombatContext, EncounterSpec, LedgerSummary, RecordingObserver, RoundOutcome, RoundReport,
};
use sector_combat::core::config::CombatConfig;
use sector_combat::core::error::Result;
use sector_combat::core::types::CivId;

/// Resolve space battles from a scenario file
#[derive(Parser, Debug)]
#[command(name = "sector-combat")]
#[command(about = "Resolve a multi-party space battle round by round")]
struct Args {
    /// Encounter scenario (TOML)
    #[arg(long)]
    scenario: String,

    /// Maximum number of rounds to resolve
    #[arg(long, default_value_t = 1)]
    rounds: u32,

    /// Random seed for deterministic runs
    #[arg(long)]
    seed: Option<u64>,

    /// Combat tuning overrides (TOML)
    #[arg(long)]
    config: Option<String>,

    /// Output format: json or text
    #[arg(long, default_value = "text")]
    format: String,
}

#[derive(Serialize)]
struct BattleOutput {
    seed: u64,
    rounds: Vec<RoundReport>,
    ledgers: Vec<(CivId, LedgerSummary)>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("sector_combat=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => CombatConfig::load(path)?,
        None => CombatConfig::default(),
    };
    let (encounter, ledgers) = EncounterSpec::load(&args.scenario)?.build()?;
    let mut battle = Battle::with_config(ledgers, config)?;

    let seed = args.seed.unwrap_or_else(rand::random);
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    tracing::info!(scenario = %args.scenario, seed, rounds = args.rounds, "resolving battle");

    let mut observer = RecordingObserver::new();
    let mut rounds = Vec::new();
    for _ in 0..args.rounds {
        let report = battle.resolve_round(&encounter, &mut rng, &mut observer)?;
        let inactive = report.outcome == RoundOutcome::Inactive;
        rounds.push(report);
        if inactive || battle.is_over() {
            break;
        }
    }

    let output = BattleOutput {
        seed,
        rounds,
        ledgers: battle.summaries(),
    };
    match args.format.as_str() {
        "json" => println!("{}", serde_json::to_string_pretty(&output)?),
        _ => print_text(&output, &encounter),
    }
    Ok(())
}

fn print_text(output: &BattleOutput, encounter: &impl CombatContext) {
    let name = |id: CivId| {
        encounter
            .civilization(id)
            .map(|c| c.name.clone())
            .unwrap_or_else(|| id.to_string())
    };

    println!("Battle Result (seed {})", output.seed);
    println!("=============");
    for report in &output.rounds {
        println!();
        println!(
            "Round {} - {:?}: {} attack turns, {} retaliations, {} damage",
            report.round, report.outcome, report.attack_turns, report.retaliations, report.total_damage
        );
        for (owner, _) in &report.ledgers {
            let lines: Vec<String> = report.sitreps_for(*owner).map(|e| e.describe()).collect();
            if lines.is_empty() {
                continue;
            }
            println!("  {}:", name(*owner));
            for line in lines {
                println!("    {}", line);
            }
        }
    }

    println!();
    println!("Final Ledgers");
    println!("=============");
    for (owner, summary) in &output.ledgers {
        println!(
            "{:<20} combat {:>3}  non-combat {:>3}  escaped {:>3}  destroyed {:>3}  assimilated {:>3}",
            name(*owner),
            summary.combat,
            summary.non_combat,
            summary.escaped,
            summary.destroyed,
            summary.assimilated
        );
    }
}
