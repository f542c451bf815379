//! World - the single game state container
//!
//! `GameState` holds everything that is saved. `World` pairs it with the
//! engine config and catalog, which are loaded from files and never saved.
//! All mutation goes through `&mut World`: commands via [`World::dispatch`]
//! and time via [`crate::simulation::tick::run_tick`].

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::catalog::{Catalog, ResearchBonuses};
use crate::command::{Command, CommandExecutor, CommandOutcome};
use crate::core::calendar::Calendar;
use crate::core::config::EngineConfig;
use crate::core::error::Result;
use crate::core::types::{EntityId, Timestamp};
use crate::economy::ledger::{Cost, ResourceLedger};
use crate::economy::production::ProductionState;
use crate::entity::registry::EntityRegistry;
use crate::queue::effect::{apply_outcome, resolve_effect};
use crate::queue::manager::QueueManager;
use crate::simulation::battle::calculate_power;
use crate::simulation::cooldown::Cooldowns;
use crate::simulation::snapshot::Snapshot;
use crate::simulation::tick::SimulationEvent;

/// An opposing kingdom as it stands now (power and holdings shrink with raids)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rival {
    pub name: String,
    pub power: f64,
    pub holdings: Cost,
}

/// Everything that persists between sessions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameState {
    pub calendar: Calendar,
    pub ledger: ResourceLedger,
    pub registry: EntityRegistry,
    pub queue: QueueManager,
    pub production: ProductionState,
    pub cooldowns: Cooldowns,
    pub rivals: Vec<Rival>,
    /// Discovery names found so far
    pub discovered: BTreeSet<String>,
    /// Completed technologies
    #[serde(default)]
    pub researched: BTreeSet<String>,
    pub paused_since: Option<Timestamp>,
    pub rng: ChaCha8Rng,
}

impl GameState {
    /// Fresh state from a catalog's starting section
    pub fn new(config: &EngineConfig, catalog: &Catalog, now: Timestamp) -> Result<Self> {
        let mut rng = ChaCha8Rng::seed_from_u64(config.simulation.seed);
        let mut registry = EntityRegistry::new();

        for start in &catalog.starting.entities {
            let archetype = catalog.archetype(&start.archetype)?;
            let name = match &start.name {
                Some(name) => name.clone(),
                None => catalog.names.generate(&mut rng),
            };
            let mut template = archetype.template(name);
            for (attr, value) in &start.attributes {
                template.attributes.insert(attr.clone(), *value);
            }
            if template.needs.is_some() {
                if let Some(needs) = &start.needs {
                    template.needs = Some(needs.clone().clamped());
                }
            }
            registry.spawn(template, now);
        }

        let rivals = catalog
            .rivals
            .iter()
            .map(|r| Rival {
                name: r.name.clone(),
                power: r.power,
                holdings: r.holdings.clone(),
            })
            .collect();

        let mut ledger = ResourceLedger::with_balances(&catalog.starting.resources);
        ledger.set_cap(catalog.resource_cap);

        Ok(Self {
            calendar: Calendar::new(config.simulation.ticks_per_day),
            ledger,
            registry,
            queue: QueueManager::new(),
            production: ProductionState::new(),
            cooldowns: Cooldowns::new(),
            rivals,
            discovered: BTreeSet::new(),
            researched: BTreeSet::new(),
            paused_since: None,
            rng,
        })
    }
}

pub struct World {
    pub config: EngineConfig,
    pub catalog: Catalog,
    pub state: GameState,
}

impl World {
    /// New game from the catalog's starting state
    pub fn new(config: EngineConfig, catalog: Catalog, now: Timestamp) -> Result<Self> {
        config.validate()?;
        catalog.validate()?;
        let state = GameState::new(&config, &catalog, now)?;
        tracing::info!(
            title = %catalog.title,
            entities = state.registry.len(),
            seed = config.simulation.seed,
            "New game"
        );
        Ok(Self { config, catalog, state })
    }

    /// Resume from saved state. Needs are clamped and the storage cap follows
    /// the current catalog.
    pub fn from_state(config: EngineConfig, catalog: Catalog, mut state: GameState) -> Result<Self> {
        config.validate()?;
        catalog.validate()?;
        for entity in state.registry.iter_mut() {
            if let Some(needs) = entity.needs.take() {
                entity.needs = Some(needs.clamped());
            }
        }
        state.ledger.set_cap(catalog.resource_cap);
        Ok(Self { config, catalog, state })
    }

    /// Validate then apply one command
    pub fn dispatch(&mut self, command: Command, now: Timestamp) -> Result<CommandOutcome> {
        CommandExecutor::execute(self, command, now)
    }

    pub fn is_paused(&self) -> bool {
        self.state.paused_since.is_some()
    }

    pub fn research_bonuses(&self) -> ResearchBonuses {
        self.catalog.research_bonuses(&self.state.researched)
    }

    /// Total power of the player's side for raids
    pub fn power(&self) -> f64 {
        calculate_power(
            &self.state.registry,
            &self.catalog,
            self.config.battle.base_power,
            &self.research_bonuses(),
        )
    }

    /// Ids of combat-capable entities, oldest first
    pub fn combat_units(&self) -> Vec<EntityId> {
        self.state
            .registry
            .iter()
            .filter(|e| {
                self.catalog
                    .archetype(&e.archetype)
                    .map(|a| a.combat)
                    .unwrap_or(false)
            })
            .map(|e| e.id)
            .collect()
    }

    /// Complete every queue entry due at `now` and apply its effect once.
    ///
    /// Entries whose action or subject no longer exists are released without
    /// an effect.
    pub fn complete_due(&mut self, now: Timestamp) -> Vec<SimulationEvent> {
        let mut events = Vec::new();
        let state = &mut self.state;

        for entry in state.queue.tick(now) {
            QueueManager::release(&entry, &mut state.registry);

            let action = match self.catalog.action(&entry.action) {
                Ok(action) => action,
                Err(e) => {
                    tracing::warn!(entry = entry.id.0, "Dropping completion: {}", e);
                    continue;
                }
            };
            let subject = match state.registry.get(entry.subject) {
                Some(subject) => subject,
                None => {
                    tracing::warn!(entry = entry.id.0, subject = %entry.subject, "Subject gone before completion");
                    continue;
                }
            };
            let partner = entry.partner.and_then(|id| state.registry.get(id));

            let outcome = match resolve_effect(&action.effect, subject, partner, &self.catalog, &mut state.rng) {
                Ok(outcome) => outcome,
                Err(e) => {
                    tracing::warn!(entry = entry.id.0, action = %entry.action, "Effect failed: {}", e);
                    continue;
                }
            };
            let discovery = outcome.discovery.clone();
            let researched = outcome.researched.clone();

            let spawned = match apply_outcome(outcome, entry.subject, &mut state.registry, &mut state.ledger, now) {
                Ok(spawned) => spawned,
                Err(e) => {
                    tracing::warn!(entry = entry.id.0, "Effect could not be applied: {}", e);
                    continue;
                }
            };

            tracing::debug!(entry = entry.id.0, subject = %entry.subject, action = %entry.action, "Completed");
            events.push(SimulationEvent::ActionCompleted {
                entry: entry.id,
                subject: entry.subject,
                action: entry.action.clone(),
            });

            if let Some(found) = discovery {
                tracing::info!(subject = %entry.subject, discovery = %found, "Discovery");
                state.discovered.insert(found.clone());
                events.push(SimulationEvent::Discovered {
                    entity: entry.subject,
                    discovery: found,
                });
            }
            if let Some(technology) = researched {
                if state.researched.insert(technology.clone()) {
                    tracing::info!(technology = %technology, "Research complete");
                    events.push(SimulationEvent::Researched { technology });
                }
            }
            if let Some(id) = spawned {
                if let Some(entity) = state.registry.get(id) {
                    events.push(SimulationEvent::EntitySpawned {
                        entity: id,
                        name: entity.name.clone(),
                        archetype: entity.archetype.clone(),
                    });
                }
            }
        }

        events
    }

    pub fn snapshot(&self, now: Timestamp) -> Snapshot {
        Snapshot::capture(self, now)
    }
}
