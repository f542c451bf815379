//! Tick system - orchestrates one step of the simulation
//!
//! Per tick, unless paused:
//! calendar -> daily need decay -> per-tick need decay -> passive production
//! -> queue completions -> cooldown expiry
//!
//! The caller publishes a snapshot afterwards.

use serde::{Deserialize, Serialize};

use crate::core::types::{ActionKind, EntityId, EntryId, ResourceKind, Timestamp};
use crate::economy::production::tick_production;
use crate::simulation::world::World;

/// Events generated during a simulation tick
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SimulationEvent {
    /// The calendar rolled over into a new day
    DayStarted { day: u64 },
    /// Whole units produced (positive) or consumed (negative)
    Produced { resource: ResourceKind, amount: i64 },
    ActionCompleted {
        entry: EntryId,
        subject: EntityId,
        action: ActionKind,
    },
    EntitySpawned {
        entity: EntityId,
        name: String,
        archetype: String,
    },
    Discovered { entity: EntityId, discovery: String },
    Researched { technology: String },
    CooldownExpired { key: String },
}

/// Run one tick at wall time `now`. Does nothing while paused.
pub fn run_tick(world: &mut World, now: Timestamp) -> Vec<SimulationEvent> {
    let mut events = Vec::new();
    if world.is_paused() {
        return events;
    }

    if world.state.calendar.advance() {
        let day = world.state.calendar.current_day();
        tracing::info!(day, "New day");
        apply_daily_decay(world);
        events.push(SimulationEvent::DayStarted { day });
    }

    apply_tick_decay(world);

    let bonuses = world.research_bonuses();
    let results = tick_production(
        &world.catalog.production,
        &world.state.registry,
        &bonuses,
        &mut world.state.ledger,
        &mut world.state.production,
        world.config.simulation.tick_interval_ms,
    );
    for result in results {
        tracing::debug!(resource = %result.resource, amount = result.amount, "Production");
        events.push(SimulationEvent::Produced {
            resource: result.resource,
            amount: result.amount,
        });
    }

    events.extend(world.complete_due(now));

    for key in world.state.cooldowns.purge(now) {
        events.push(SimulationEvent::CooldownExpired { key });
    }

    events
}

/// Per-tick need decay; busy entities decay faster
fn apply_tick_decay(world: &mut World) {
    let config = &world.config.needs;
    for entity in world.state.registry.iter_mut() {
        let busy = !entity.is_idle();
        if let Some(needs) = entity.needs.as_mut() {
            needs.decay_tick(config, busy);
        }
    }
}

/// Once-a-day decay for idle entities
fn apply_daily_decay(world: &mut World) {
    let config = &world.config.needs;
    for entity in world.state.registry.iter_mut().filter(|e| e.is_idle()) {
        if let Some(needs) = entity.needs.as_mut() {
            needs.decay_daily(config);
        }
    }
}
