//! Engine runtime - runs a world on a fixed-interval tick
//!
//! The world lives inside one tokio task and is never shared. Callers talk to
//! it through an [`EngineHandle`]: commands go over an mpsc channel with a
//! oneshot reply, snapshots are published on a watch channel after every
//! tick and command, and simulation events are broadcast.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::catalog::Catalog;
use crate::command::{Command, CommandOutcome};
use crate::core::clock::Clock;
use crate::core::config::EngineConfig;
use crate::core::error::{EngineError, Result};
use crate::persistence::{load_or_log, save_or_log, PersistenceAdapter, SavedState};
use crate::simulation::snapshot::Snapshot;
use crate::simulation::tick::{run_tick, SimulationEvent};
use crate::simulation::world::World;

const REQUEST_BUFFER: usize = 64;
const EVENT_BUFFER: usize = 256;

enum Request {
    Dispatch {
        command: Command,
        reply: oneshot::Sender<Result<CommandOutcome>>,
    },
    Snapshot {
        reply: oneshot::Sender<Snapshot>,
    },
    Save {
        reply: oneshot::Sender<bool>,
    },
    Shutdown,
}

/// Cloneable handle to a running engine
#[derive(Clone)]
pub struct EngineHandle {
    tx: mpsc::Sender<Request>,
    snapshots: watch::Receiver<Snapshot>,
    events: broadcast::Sender<SimulationEvent>,
}

impl EngineHandle {
    /// Send a command and wait for its outcome
    pub async fn dispatch(&self, command: Command) -> Result<CommandOutcome> {
        let (reply, rx) = oneshot::channel();
        self.send(Request::Dispatch { command, reply }).await?;
        rx.await.map_err(|_| EngineError::RuntimeClosed)?
    }

    /// A snapshot taken now, after any queued commands
    pub async fn snapshot(&self) -> Result<Snapshot> {
        let (reply, rx) = oneshot::channel();
        self.send(Request::Snapshot { reply }).await?;
        rx.await.map_err(|_| EngineError::RuntimeClosed)
    }

    /// The most recently published snapshot, without waiting
    pub fn latest(&self) -> Snapshot {
        self.snapshots.borrow().clone()
    }

    /// Receiver that wakes on every published snapshot
    pub fn watch(&self) -> watch::Receiver<Snapshot> {
        self.snapshots.clone()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SimulationEvent> {
        self.events.subscribe()
    }

    /// Save now. Returns whether the save succeeded.
    pub async fn save(&self) -> Result<bool> {
        let (reply, rx) = oneshot::channel();
        self.send(Request::Save { reply }).await?;
        rx.await.map_err(|_| EngineError::RuntimeClosed)
    }

    /// Stop the engine. It saves once more before exiting.
    pub async fn shutdown(&self) -> Result<()> {
        self.send(Request::Shutdown).await
    }

    async fn send(&self, request: Request) -> Result<()> {
        self.tx.send(request).await.map_err(|_| EngineError::RuntimeClosed)
    }
}

/// Resume the saved game if there is a usable one, otherwise start fresh
pub fn load_world(
    config: EngineConfig,
    catalog: Catalog,
    store: &dyn PersistenceAdapter,
    now: u64,
) -> Result<World> {
    match load_or_log(store) {
        Some(saved) => {
            tracing::info!(saved_at = saved.saved_at, "Resuming saved game");
            World::from_state(config, catalog, saved.state)
        }
        None => World::new(config, catalog, now),
    }
}

pub struct EngineRuntime {
    world: World,
    clock: Arc<dyn Clock>,
    store: Box<dyn PersistenceAdapter>,
    requests: mpsc::Receiver<Request>,
    snapshots: watch::Sender<Snapshot>,
    events: broadcast::Sender<SimulationEvent>,
}

impl EngineRuntime {
    /// Start the engine on the current tokio runtime. The join handle yields
    /// the final world after shutdown.
    pub fn spawn(
        world: World,
        clock: Arc<dyn Clock>,
        store: Box<dyn PersistenceAdapter>,
    ) -> (EngineHandle, JoinHandle<World>) {
        let (tx, requests) = mpsc::channel(REQUEST_BUFFER);
        let (snapshot_tx, snapshot_rx) = watch::channel(world.snapshot(clock.now()));
        let (events, _) = broadcast::channel(EVENT_BUFFER);

        let handle = EngineHandle {
            tx,
            snapshots: snapshot_rx,
            events: events.clone(),
        };
        let runtime = Self {
            world,
            clock,
            store,
            requests,
            snapshots: snapshot_tx,
            events,
        };
        (handle, tokio::spawn(runtime.run()))
    }

    async fn run(mut self) -> World {
        let interval = Duration::from_millis(self.world.config.simulation.tick_interval_ms);
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick fires immediately
        ticker.tick().await;

        tracing::info!(interval_ms = interval.as_millis() as u64, "Engine started");
        loop {
            tokio::select! {
                _ = ticker.tick() => self.on_tick(),
                request = self.requests.recv() => match request {
                    Some(Request::Shutdown) | None => break,
                    Some(request) => self.handle(request),
                },
            }
        }

        self.save();
        tracing::info!("Engine stopped");
        self.world
    }

    fn on_tick(&mut self) {
        let now = self.clock.now();
        for event in run_tick(&mut self.world, now) {
            // No subscribers is fine
            let _ = self.events.send(event);
        }
        self.publish(now);

        let every = self.world.config.simulation.autosave_every_ticks;
        let tick = self.world.state.calendar.current_tick();
        if every > 0 && tick > 0 && tick % every == 0 && !self.world.is_paused() {
            self.save();
        }
    }

    fn handle(&mut self, request: Request) {
        let now = self.clock.now();
        match request {
            Request::Dispatch { command, reply } => {
                let result = self.world.dispatch(command, now);
                if let Err(e) = &result {
                    tracing::debug!("Command rejected: {}", e);
                } else {
                    self.publish(now);
                }
                let _ = reply.send(result);
            }
            Request::Snapshot { reply } => {
                let _ = reply.send(self.world.snapshot(now));
            }
            Request::Save { reply } => {
                let _ = reply.send(self.save());
            }
            Request::Shutdown => {}
        }
    }

    fn publish(&self, now: u64) {
        self.snapshots.send_replace(self.world.snapshot(now));
    }

    fn save(&mut self) -> bool {
        let saved = SavedState::new(self.world.state.clone(), self.clock.now());
        save_or_log(self.store.as_mut(), &saved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{ActionDef, ActionDuration, Archetype, StartingEntity};
    use crate::core::clock::ManualClock;
    use crate::core::types::{ActionKind, EntityId, ResourceKind};
    use crate::economy::ledger::Cost;
    use crate::entity::registry::EntityStatus;
    use crate::persistence::MemoryStore;

    fn world(interval_ms: u64) -> World {
        let mut config = EngineConfig::default();
        config.simulation.tick_interval_ms = interval_ms;
        config.simulation.autosave_every_ticks = 0;

        let mut catalog = Catalog::new("runtime");
        catalog.add_archetype(Archetype::new("peasant"));
        let mut farm = ActionDef::new("farm", ActionDuration::Secs(30));
        farm.effect.yields = Cost::new().with("food", 10);
        catalog.add_action(farm);
        catalog.starting.entities.push(StartingEntity {
            archetype: "peasant".into(),
            name: Some("Hob".into()),
            attributes: Default::default(),
            needs: None,
        });
        World::new(config, catalog, 0).unwrap()
    }

    #[tokio::test]
    async fn test_command_then_completion_on_tick() {
        let clock = ManualClock::new(0);
        let (handle, task) = EngineRuntime::spawn(world(5), Arc::new(clock.clone()), Box::new(MemoryStore::new()));

        let outcome = handle
            .dispatch(Command::Enroll {
                subject: EntityId(1),
                partner: None,
                action: ActionKind::from("farm"),
            })
            .await
            .unwrap();
        assert!(matches!(outcome, CommandOutcome::Enrolled { ends_at: 30_000, .. }));

        let mut events = handle.subscribe();
        clock.set(30_000);
        let event = tokio::time::timeout(Duration::from_secs(2), async {
            loop {
                if let Ok(SimulationEvent::ActionCompleted { subject, .. }) = events.recv().await {
                    return subject;
                }
            }
        })
        .await
        .expect("completion within timeout");
        assert_eq!(event, EntityId(1));

        let snapshot = handle.snapshot().await.unwrap();
        assert_eq!(snapshot.entity(EntityId(1)).unwrap().status, EntityStatus::Idle);
        assert_eq!(snapshot.resources[&ResourceKind::from("food")], 10);

        handle.shutdown().await.unwrap();
        let world = task.await.unwrap();
        assert!(world.state.queue.is_empty());
    }

    #[tokio::test]
    async fn test_rejection_is_returned() {
        let clock = ManualClock::new(0);
        let (handle, task) = EngineRuntime::spawn(world(5), Arc::new(clock), Box::new(MemoryStore::new()));

        let err = handle
            .dispatch(Command::Acquire {
                archetype: "dragon".into(),
                name: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::UnknownArchetype(_)));

        handle.shutdown().await.unwrap();
        task.await.unwrap();
        assert!(matches!(handle.snapshot().await, Err(EngineError::RuntimeClosed)));
    }

    #[tokio::test]
    async fn test_failing_store_keeps_running() {
        let clock = ManualClock::new(0);
        let (handle, task) = EngineRuntime::spawn(world(5), Arc::new(clock), Box::new(MemoryStore::failing()));

        assert!(!handle.save().await.unwrap());
        let mut watch = handle.watch();
        tokio::time::timeout(Duration::from_secs(2), watch.changed())
            .await
            .expect("tick within timeout")
            .unwrap();
        assert!(handle.latest().tick >= 1);

        handle.shutdown().await.unwrap();
        task.await.unwrap();
    }

    #[test]
    fn test_load_world_prefers_save() {
        let mut saved_world = world(1000);
        saved_world.state.ledger.credit("gold".into(), 77);
        let store = MemoryStore::with_saved(SavedState::new(saved_world.state.clone(), 5));

        let fresh = world(1000);
        let loaded = load_world(fresh.config.clone(), fresh.catalog.clone(), &store, 0).unwrap();
        assert_eq!(loaded.state.ledger.balance("gold"), 77);

        let loaded = load_world(fresh.config, fresh.catalog, &MemoryStore::failing(), 0).unwrap();
        assert_eq!(loaded.state.ledger.balance("gold"), 0);
    }
}
