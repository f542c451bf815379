//! Read-only view of the world for renderers
//!
//! A snapshot is plain data: it can be serialized, compared, and sent across
//! threads without holding any lock on the world.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::core::types::{ActionKind, EntityId, EntryId, ResourceKind, Tick, Timestamp};
use crate::economy::production::production_rates;
use crate::entity::needs::Needs;
use crate::entity::registry::{Entity, EntityStatus};
use crate::queue::entry::QueueEntry;
use crate::simulation::world::{Rival, World};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityView {
    pub id: EntityId,
    pub name: String,
    pub archetype: String,
    pub status: EntityStatus,
    pub attributes: BTreeMap<String, f64>,
    pub needs: Option<Needs>,
    pub trained: Vec<String>,
    pub parents: Option<(EntityId, EntityId)>,
    pub children: Vec<EntityId>,
}

impl From<&Entity> for EntityView {
    fn from(entity: &Entity) -> Self {
        Self {
            id: entity.id,
            name: entity.name.clone(),
            archetype: entity.archetype.clone(),
            status: entity.status.clone(),
            attributes: entity.attributes.clone(),
            needs: entity.needs.clone(),
            trained: entity.trained.clone(),
            parents: entity.parents,
            children: entity.children.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueView {
    pub entry: EntryId,
    pub subject: EntityId,
    pub partner: Option<EntityId>,
    pub action: ActionKind,
    pub ends_at: Timestamp,
    pub remaining_ms: u64,
    pub progress: f64,
}

impl QueueView {
    fn new(entry: &QueueEntry, now: Timestamp) -> Self {
        Self {
            entry: entry.id,
            subject: entry.subject,
            partner: entry.partner,
            action: entry.action.clone(),
            ends_at: entry.ends_at,
            remaining_ms: entry.remaining(now),
            progress: entry.progress(now),
        }
    }
}

/// Everything a renderer needs for one frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub title: String,
    pub taken_at: Timestamp,
    pub tick: Tick,
    pub day: u64,
    pub day_progress: f64,
    pub paused: bool,
    pub resources: BTreeMap<ResourceKind, u64>,
    /// Net units per minute
    pub rates: BTreeMap<ResourceKind, f64>,
    pub entities: Vec<EntityView>,
    pub queue: Vec<QueueView>,
    /// Remaining milliseconds per active cooldown
    pub cooldowns: BTreeMap<String, u64>,
    pub rivals: Vec<Rival>,
    pub discovered: Vec<String>,
    pub researched: Vec<String>,
    pub power: f64,
}

impl Snapshot {
    pub fn capture(world: &World, now: Timestamp) -> Self {
        let state = &world.state;
        Self {
            title: world.catalog.title.clone(),
            taken_at: now,
            tick: state.calendar.current_tick(),
            day: state.calendar.current_day(),
            day_progress: state.calendar.day_progress(),
            paused: state.paused_since.is_some(),
            resources: state.ledger.balances(),
            rates: production_rates(&world.catalog.production, &state.registry, &world.research_bonuses()),
            entities: state.registry.iter().map(EntityView::from).collect(),
            queue: state.queue.pending().iter().map(|e| QueueView::new(e, now)).collect(),
            cooldowns: state.cooldowns.remaining(now),
            rivals: state.rivals.clone(),
            discovered: state.discovered.iter().cloned().collect(),
            researched: state.researched.iter().cloned().collect(),
            power: world.power(),
        }
    }

    pub fn entity(&self, id: EntityId) -> Option<&EntityView> {
        self.entities.iter().find(|e| e.id == id)
    }

    pub fn idle_count(&self) -> usize {
        self.entities
            .iter()
            .filter(|e| e.status == EntityStatus::Idle)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{ActionDef, ActionDuration, Archetype, Catalog, StartingEntity};
    use crate::command::Command;
    use crate::core::config::EngineConfig;
    use crate::economy::ledger::Cost;

    fn world() -> World {
        let mut catalog = Catalog::new("snap");
        catalog.add_archetype(Archetype::new("worker"));
        catalog.add_action(ActionDef::new("work", ActionDuration::Secs(10)));
        catalog.starting.resources = Cost::new().with("gold", 10);
        for name in ["A", "B"] {
            catalog.starting.entities.push(StartingEntity {
                archetype: "worker".into(),
                name: Some(name.into()),
                attributes: Default::default(),
                needs: None,
            });
        }
        World::new(EngineConfig::default(), catalog, 0).unwrap()
    }

    #[test]
    fn test_snapshot_reflects_queue() {
        let mut world = world();
        world
            .dispatch(
                Command::Enroll {
                    subject: EntityId(1),
                    partner: None,
                    action: ActionKind::from("work"),
                },
                0,
            )
            .unwrap();

        let snap = world.snapshot(2_500);
        assert_eq!(snap.queue.len(), 1);
        assert_eq!(snap.queue[0].remaining_ms, 7_500);
        assert!((snap.queue[0].progress - 0.25).abs() < 1e-12);
        assert_eq!(snap.idle_count(), 1);
        assert_eq!(snap.resources[&ResourceKind::from("gold")], 10);
    }

    #[test]
    fn test_snapshot_json() {
        let snap = world().snapshot(0);
        let json = serde_json::to_string(&snap).unwrap();
        let back: Snapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(snap, back);
    }
}
