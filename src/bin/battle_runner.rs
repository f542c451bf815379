//! Headless Battle Runner
//!
//! Resolves many battles between two power totals and prints win rate and
//! attrition statistics, for balancing rival kingdoms.

use clap::Parser;
use idle_engine::core::config::EngineConfig;
use idle_engine::simulation::battle::{resolve_battle, BattleReport};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::Serialize;
use std::path::PathBuf;

/// Headless Battle Runner - raid balance statistics
#[derive(Parser, Debug)]
#[command(name = "battle_runner")]
#[command(about = "Resolve repeated battles and output win statistics")]
struct Args {
    /// Attacker (player) power
    #[arg(long, default_value_t = 100.0)]
    attacker: f64,

    /// Defender (rival) power
    #[arg(long, default_value_t = 80.0)]
    defender: f64,

    /// Number of battles to resolve
    #[arg(long, default_value_t = 1000)]
    battles: u32,

    /// Random seed for deterministic runs
    #[arg(long)]
    seed: Option<u64>,

    /// Engine config with battle tuning (TOML)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Output format: json or text
    #[arg(long, default_value = "json")]
    format: String,
}

/// JSON output structure
#[derive(Serialize)]
struct BattleStats {
    attacker_power: f64,
    defender_power: f64,
    battles: u32,
    victories: u32,
    win_rate: f64,
    mean_attacker_attrition: f64,
    mean_defender_attrition: f64,
    seed: u64,
}

fn summarize(args: &Args, seed: u64, reports: &[BattleReport]) -> BattleStats {
    let n = reports.len().max(1) as f64;
    let victories = reports.iter().filter(|r| r.victory).count() as u32;
    BattleStats {
        attacker_power: args.attacker,
        defender_power: args.defender,
        battles: reports.len() as u32,
        victories,
        win_rate: victories as f64 / n,
        mean_attacker_attrition: reports.iter().map(|r| r.attacker_attrition).sum::<f64>() / n,
        mean_defender_attrition: reports.iter().map(|r| r.defender_attrition).sum::<f64>() / n,
        seed,
    }
}

fn main() {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => EngineConfig::load_from_toml(path).unwrap_or_else(|e| {
            eprintln!("Warning: Failed to load config '{}': {}", path.display(), e);
            eprintln!("Using default battle tuning");
            EngineConfig::default()
        }),
        None => EngineConfig::default(),
    };

    let seed = args.seed.unwrap_or_else(rand::random);
    let mut rng = ChaCha8Rng::seed_from_u64(seed);

    let reports: Vec<BattleReport> = (0..args.battles)
        .map(|_| resolve_battle(args.attacker, args.defender, &config.battle, &mut rng))
        .collect();
    let stats = summarize(&args, seed, &reports);

    match args.format.as_str() {
        "text" => {
            println!("Battle Statistics");
            println!("=================");
            println!("Power: {:.0} vs {:.0}", stats.attacker_power, stats.defender_power);
            println!("Victories: {} / {} ({:.1}%)", stats.victories, stats.battles, stats.win_rate * 100.0);
            println!("Mean attacker attrition: {:.1}%", stats.mean_attacker_attrition * 100.0);
            println!("Mean defender attrition: {:.1}%", stats.mean_defender_attrition * 100.0);
            println!("Seed: {}", stats.seed);
        }
        other => {
            if other != "json" {
                eprintln!("Unknown format '{}', defaulting to json", other);
            }
            match serde_json::to_string_pretty(&stats) {
                Ok(json) => println!("{}", json),
                Err(e) => eprintln!("Failed to encode results: {}", e),
            }
        }
    }
}
