//! Idle Engine - Entry Point
//!
//! Loads an engine config and a game catalog, resumes the saved game if there
//! is one, and runs either an interactive console (one tick per command) or a
//! live real-time session driven by the engine runtime.

use idle_engine::catalog::Catalog;
use idle_engine::command::{Command, CommandOutcome};
use idle_engine::core::clock::{Clock, ManualClock, SystemClock};
use idle_engine::core::config::EngineConfig;
use idle_engine::core::error::Result;
use idle_engine::core::types::{ActionKind, EntityId};
use idle_engine::entity::registry::EntityStatus;
use idle_engine::persistence::{save_or_log, JsonFileStore, SavedState};
use idle_engine::runtime::{load_world, EngineRuntime};
use idle_engine::simulation::cooldown::raid_key;
use idle_engine::simulation::snapshot::Snapshot;
use idle_engine::simulation::tick::{run_tick, SimulationEvent};
use idle_engine::simulation::world::World;

use clap::Parser;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(name = "idle-engine")]
#[command(about = "Run an idle game catalog from the console")]
struct Args {
    /// Game catalog (TOML)
    #[arg(long, default_value = "data/kingdom.toml")]
    catalog: PathBuf,

    /// Engine config (TOML); defaults are used when omitted
    #[arg(long)]
    config: Option<PathBuf>,

    /// Save file (JSON)
    #[arg(long, default_value = "save.json")]
    save: PathBuf,

    /// Override the RNG seed of a new game
    #[arg(long)]
    seed: Option<u64>,

    /// Run in real time until Ctrl-C instead of the interactive console
    #[arg(long)]
    live: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("idle_engine=info")),
        )
        .init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => EngineConfig::load_from_toml(path)?,
        None => EngineConfig::default(),
    };
    if let Some(seed) = args.seed {
        config.simulation.seed = seed;
    }
    let catalog = Catalog::load_from_toml(&args.catalog)?;
    let store = JsonFileStore::new(&args.save);

    if args.live {
        let rt = tokio::runtime::Runtime::new()?;
        return rt.block_on(run_live(config, catalog, store));
    }

    let clock = ManualClock::new(SystemClock.now());
    let world = load_world(config, catalog, &store, clock.now())?;
    run_console(world, clock, store)
}

/// Real-time session on the engine runtime
async fn run_live(config: EngineConfig, catalog: Catalog, store: JsonFileStore) -> Result<()> {
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let world = load_world(config, catalog, &store, clock.now())?;
    println!("=== {} ===  (Ctrl-C to save and quit)", world.catalog.title);

    let (handle, task) = EngineRuntime::spawn(world, clock, Box::new(store));
    let mut events = handle.subscribe();

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            event = events.recv() => match event {
                Ok(SimulationEvent::DayStarted { .. }) => display_status(&handle.latest()),
                Ok(event) => print_event(&event),
                Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!("Skipped {} events", n);
                }
                Err(_) => break,
            },
        }
    }

    handle.shutdown().await?;
    let world = task
        .await
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
    println!("\nSaved. Day {}, {} entities.", world.state.calendar.current_day(), world.state.registry.len());
    Ok(())
}

/// Interactive console: time only moves when asked
fn run_console(mut world: World, clock: ManualClock, mut store: JsonFileStore) -> Result<()> {
    let interval = world.config.simulation.tick_interval_ms;

    println!("\n=== {} ===", world.catalog.title);
    println!();
    println!("Commands:");
    println!("  tick / t                        - Advance one tick");
    println!("  run <n>                         - Advance n ticks");
    println!("  status / s                      - Show detailed status");
    println!("  enroll <id> <action> [partner]  - Queue a timed action");
    println!("  buy <archetype> / sell <id>     - Acquire or remove an entity");
    println!("  care <id> <kind>                - Feed, rest, pamper...");
    println!("  raid <rival>                    - Attack a rival kingdom");
    println!("  pause / resume / save           - Pause, resume or save the game");
    println!("  quit / q                        - Save and exit");

    loop {
        display_status(&world.snapshot(clock.now()));

        print!("> ");
        io::stdout().flush()?;
        let mut input = String::new();
        if io::stdin().read_line(&mut input)? == 0 {
            break;
        }
        let input = input.trim();
        if input.is_empty() {
            continue;
        }
        if input == "quit" || input == "q" {
            break;
        }

        if input == "tick" || input == "t" {
            advance(&mut world, &clock, interval, 1);
            continue;
        }
        if input == "status" || input == "s" {
            display_detailed_status(&world.snapshot(clock.now()));
            continue;
        }
        if input == "save" {
            save(&world, &clock, &mut store);
            continue;
        }
        if let Some(n) = input.strip_prefix("run ") {
            match n.trim().parse::<u64>() {
                Ok(n) => {
                    advance(&mut world, &clock, interval, n);
                    println!("Now at tick {}.", world.state.calendar.current_tick());
                }
                Err(_) => println!("Usage: run <number>"),
            }
            continue;
        }

        match parse_command(input) {
            Some(command) => match world.dispatch(command, clock.now()) {
                Ok(outcome) => print_outcome(&outcome),
                Err(e) => println!("Rejected: {}", e),
            },
            None => println!("Unknown command: {}", input),
        }
    }

    save(&world, &clock, &mut store);
    println!(
        "\nGoodbye! Day {}, {} entities, {} ticks elapsed.",
        world.state.calendar.current_day(),
        world.state.registry.len(),
        world.state.calendar.current_tick()
    );
    Ok(())
}

fn advance(world: &mut World, clock: &ManualClock, interval: u64, ticks: u64) {
    for _ in 0..ticks {
        clock.advance(interval);
        for event in run_tick(world, clock.now()) {
            print_event(&event);
        }
    }
}

fn save(world: &World, clock: &ManualClock, store: &mut JsonFileStore) {
    let saved = SavedState::new(world.state.clone(), clock.now());
    if save_or_log(store, &saved) {
        println!("Saved to {}", store.path().display());
    }
}

fn parse_command(input: &str) -> Option<Command> {
    let parts: Vec<&str> = input.split_whitespace().collect();

    match parts.as_slice() {
        ["enroll", subject, action] => Some(Command::Enroll {
            subject: parse_id(subject)?,
            partner: None,
            action: ActionKind::from(*action),
        }),
        ["enroll", subject, action, partner] => Some(Command::Enroll {
            subject: parse_id(subject)?,
            partner: Some(parse_id(partner)?),
            action: ActionKind::from(*action),
        }),
        ["buy", archetype] => Some(Command::Acquire {
            archetype: archetype.to_string(),
            name: None,
        }),
        ["buy", archetype, name] => Some(Command::Acquire {
            archetype: archetype.to_string(),
            name: Some(name.to_string()),
        }),
        ["sell", entity] => Some(Command::Remove { entity: parse_id(entity)? }),
        ["care", entity, kind] => Some(Command::Care {
            entity: parse_id(entity)?,
            care: kind.to_string(),
        }),
        ["raid", rival @ ..] if !rival.is_empty() => Some(Command::Raid {
            rival: rival.join(" "),
        }),
        ["pause"] => Some(Command::Pause),
        ["resume"] => Some(Command::Resume),
        _ => None,
    }
}

fn parse_id(s: &str) -> Option<EntityId> {
    s.parse::<u32>().ok().map(EntityId)
}

fn print_outcome(outcome: &CommandOutcome) {
    match outcome {
        CommandOutcome::Enrolled { entry, ends_at } => {
            println!("Queued entry {} (done at {})", entry.0, ends_at)
        }
        CommandOutcome::Acquired { entity } => println!("Acquired {}", entity),
        CommandOutcome::Removed { entity, refund } => {
            let refund: Vec<String> = refund.iter().map(|(k, v)| format!("{} {}", v, k)).collect();
            println!("Removed {} for {}", entity, refund.join(", "))
        }
        CommandOutcome::Cared { entity } => println!("Cared for {}", entity),
        CommandOutcome::Raided(raid) => {
            let result = if raid.report.victory { "Victory" } else { "Defeat" };
            println!(
                "{} against {} ({:.0} vs {:.0}); lost {} unit(s)",
                result,
                raid.rival,
                raid.attacker_power,
                raid.defender_power,
                raid.lost_units.len()
            );
            for (kind, amount) in raid.loot.iter() {
                println!("  +{} {}", amount, kind);
            }
        }
        CommandOutcome::Paused { .. } => println!("Paused"),
        CommandOutcome::Resumed { paused_ms } => println!("Resumed after {} ms", paused_ms),
    }
}

fn print_event(event: &SimulationEvent) {
    match event {
        SimulationEvent::ActionCompleted { subject, action, .. } => {
            println!("  {} finished {}", subject, action)
        }
        SimulationEvent::EntitySpawned { entity, name, archetype } => {
            println!("  New {}: {} ({})", archetype, name, entity)
        }
        SimulationEvent::Discovered { entity, discovery } => {
            println!("  {} discovered {}", entity, discovery)
        }
        SimulationEvent::Researched { technology } => println!("  Research complete: {}", technology),
        SimulationEvent::DayStarted { day } => println!("  Day {} begins", day),
        SimulationEvent::Produced { .. } | SimulationEvent::CooldownExpired { .. } => {}
    }
}

/// Display a brief status summary
fn display_status(snapshot: &Snapshot) {
    let resources: Vec<String> = snapshot
        .resources
        .iter()
        .map(|(kind, amount)| format!("{} {}", kind, amount))
        .collect();
    println!();
    println!(
        "--- Day {} | Tick {} | {} entities ({} idle){} ---",
        snapshot.day,
        snapshot.tick,
        snapshot.entities.len(),
        snapshot.idle_count(),
        if snapshot.paused { " | PAUSED" } else { "" }
    );
    println!("  {}", resources.join(" | "));
}

fn display_detailed_status(snapshot: &Snapshot) {
    println!();
    println!("Power: {:.0}", snapshot.power);
    for (kind, rate) in &snapshot.rates {
        println!("  {:>10}: {:+.1}/min", kind, rate);
    }

    println!("Entities:");
    for entity in &snapshot.entities {
        let status = match &entity.status {
            EntityStatus::Idle => "idle".to_string(),
            EntityStatus::Busy { action, .. } => action.to_string(),
        };
        let needs = entity
            .needs
            .as_ref()
            .map(|n| {
                let (need, level) = n.most_pressing();
                format!(", lowest need {:?} {:.0}", need, level)
            })
            .unwrap_or_default();
        println!("  {} {} [{}] - {}{}", entity.id, entity.name, entity.archetype, status, needs);
    }

    if !snapshot.queue.is_empty() {
        println!("Queue:");
        for entry in &snapshot.queue {
            println!(
                "  #{} {} {} - {:.0}% ({}s left)",
                entry.entry.0,
                entry.subject,
                entry.action,
                entry.progress * 100.0,
                entry.remaining_ms / 1000
            );
        }
    }

    for rival in &snapshot.rivals {
        let cooldown = snapshot
            .cooldowns
            .get(&raid_key(&rival.name))
            .map(|ms| format!(" (ready in {}s)", ms / 1000 + 1))
            .unwrap_or_default();
        println!("Rival {}: power {:.0}{}", rival.name, rival.power, cooldown);
    }
    if !snapshot.discovered.is_empty() {
        println!("Discovered: {}", snapshot.discovered.join(", "));
    }
}
