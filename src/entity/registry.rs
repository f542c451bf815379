//! Entity registry - every colonist, creature, unit and building in a game

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::core::error::{EngineError, Result};
use crate::core::types::{ActionKind, EntityId, EntryId, Timestamp};
use crate::entity::needs::Needs;

/// Whether an entity is free to take on a queued action
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum EntityStatus {
    Idle,
    /// Enrolled in a pending queue entry (as subject or partner)
    Busy { action: ActionKind, entry: EntryId },
}

/// A game actor with mutable status and attributes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub id: EntityId,
    pub name: String,
    pub archetype: String,
    pub status: EntityStatus,
    /// Named numeric stats (attack, skill, level, strength, ...)
    pub attributes: BTreeMap<String, f64>,
    /// Only living entities carry needs; buildings have none
    pub needs: Option<Needs>,
    /// Skills or jobs learned from completed training
    pub trained: Vec<String>,
    pub parents: Option<(EntityId, EntityId)>,
    pub children: Vec<EntityId>,
    pub created_at: Timestamp,
}

impl Entity {
    pub fn is_idle(&self) -> bool {
        self.status == EntityStatus::Idle
    }

    /// Attribute value, 0.0 when absent
    pub fn attribute(&self, name: &str) -> f64 {
        self.attributes.get(name).copied().unwrap_or(0.0)
    }

    pub fn set_attribute(&mut self, name: &str, value: f64) {
        self.attributes.insert(name.to_string(), value);
    }

    /// Apply an attribute change, holding the result at or below `cap`
    pub fn add_attribute(&mut self, name: &str, delta: f64, cap: Option<f64>) {
        let current = self.attribute(name);
        let mut value = current + delta;
        if let Some(cap) = cap {
            if current >= cap {
                return;
            }
            value = value.min(cap);
        }
        self.set_attribute(name, value);
    }

    pub fn has_trained(&self, skill: &str) -> bool {
        self.trained.iter().any(|t| t == skill)
    }
}

/// Description of an entity to create
#[derive(Debug, Clone, PartialEq)]
pub struct NewEntity {
    pub name: String,
    pub archetype: String,
    pub attributes: BTreeMap<String, f64>,
    pub needs: Option<Needs>,
    pub parents: Option<(EntityId, EntityId)>,
}

impl NewEntity {
    pub fn new(name: impl Into<String>, archetype: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            archetype: archetype.into(),
            attributes: BTreeMap::new(),
            needs: None,
            parents: None,
        }
    }

    pub fn with_attribute(mut self, name: &str, value: f64) -> Self {
        self.attributes.insert(name.to_string(), value);
        self
    }

    pub fn with_needs(mut self, needs: Needs) -> Self {
        self.needs = Some(needs);
        self
    }

    pub fn with_parents(mut self, a: EntityId, b: EntityId) -> Self {
        self.parents = Some((a, b));
        self
    }
}

/// In-memory collection of entities, looked up by id
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "RegistryData", into = "RegistryData")]
pub struct EntityRegistry {
    entities: BTreeMap<EntityId, Entity>,
    next_id: u32,
}

/// Serialized form: a plain list, since JSON object keys must be strings
#[derive(Serialize, Deserialize)]
struct RegistryData {
    next_id: u32,
    entities: Vec<Entity>,
}

impl From<RegistryData> for EntityRegistry {
    fn from(data: RegistryData) -> Self {
        let entities = data.entities.into_iter().map(|e| (e.id, e)).collect();
        Self {
            entities,
            next_id: data.next_id,
        }
    }
}

impl From<EntityRegistry> for RegistryData {
    fn from(registry: EntityRegistry) -> Self {
        Self {
            next_id: registry.next_id,
            entities: registry.entities.into_values().collect(),
        }
    }
}

impl EntityRegistry {
    pub fn new() -> Self {
        Self {
            entities: BTreeMap::new(),
            next_id: 1,
        }
    }

    /// Create an entity and return its id. New entities start idle.
    pub fn spawn(&mut self, template: NewEntity, now: Timestamp) -> EntityId {
        let id = EntityId(self.next_id.max(1));
        self.next_id = id.0 + 1;

        self.entities.insert(
            id,
            Entity {
                id,
                name: template.name,
                archetype: template.archetype,
                status: EntityStatus::Idle,
                attributes: template.attributes,
                needs: template.needs,
                trained: Vec::new(),
                parents: template.parents,
                children: Vec::new(),
                created_at: now,
            },
        );

        if let Some((a, b)) = template.parents {
            for parent in [a, b] {
                if let Some(p) = self.entities.get_mut(&parent) {
                    if !p.children.contains(&id) {
                        p.children.push(id);
                    }
                }
            }
        }

        id
    }

    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(&id)
    }

    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.entities.get_mut(&id)
    }

    pub fn require(&self, id: EntityId) -> Result<&Entity> {
        self.entities.get(&id).ok_or(EngineError::EntityNotFound(id))
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.entities.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Entities in id order
    pub fn iter(&self) -> impl Iterator<Item = &Entity> {
        self.entities.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Entity> {
        self.entities.values_mut()
    }

    /// The entity, if it exists and is idle
    pub fn ensure_idle(&self, id: EntityId) -> Result<&Entity> {
        let entity = self.require(id)?;
        if !entity.is_idle() {
            return Err(EngineError::EntityUnavailable(id));
        }
        Ok(entity)
    }

    /// The only path between idle and busy. Crate-private so that only the
    /// queue (busy) and the completion handler (idle) can call it.
    pub(crate) fn set_status(&mut self, id: EntityId, status: EntityStatus) -> Result<()> {
        let entity = self
            .entities
            .get_mut(&id)
            .ok_or(EngineError::EntityNotFound(id))?;
        entity.status = status;
        Ok(())
    }

    /// Remove an idle entity (sell / dismiss). Busy entities cannot be removed.
    pub fn remove(&mut self, id: EntityId) -> Result<Entity> {
        self.ensure_idle(id)?;
        self.entities
            .remove(&id)
            .ok_or(EngineError::EntityNotFound(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spawn_assigns_sequential_ids() {
        let mut registry = EntityRegistry::new();
        let a = registry.spawn(NewEntity::new("Aki", "kemonomimi"), 0);
        let b = registry.spawn(NewEntity::new("Rei", "kemonomimi"), 0);
        assert_eq!(a, EntityId(1));
        assert_eq!(b, EntityId(2));
        assert!(registry.get(a).unwrap().is_idle());
    }

    #[test]
    fn test_ensure_idle() {
        let mut registry = EntityRegistry::new();
        let id = registry.spawn(NewEntity::new("Sarah Chen", "colonist"), 0);
        assert!(registry.ensure_idle(id).is_ok());

        registry
            .set_status(
                id,
                EntityStatus::Busy {
                    action: ActionKind::from("explore"),
                    entry: EntryId(1),
                },
            )
            .unwrap();
        assert!(matches!(registry.ensure_idle(id), Err(EngineError::EntityUnavailable(_))));
        assert!(matches!(
            registry.ensure_idle(EntityId(99)),
            Err(EngineError::EntityNotFound(_))
        ));
    }

    #[test]
    fn test_remove_requires_idle() {
        let mut registry = EntityRegistry::new();
        let id = registry.spawn(NewEntity::new("Knight", "knight"), 0);
        registry
            .set_status(
                id,
                EntityStatus::Busy {
                    action: ActionKind::from("patrol"),
                    entry: EntryId(4),
                },
            )
            .unwrap();
        assert!(registry.remove(id).is_err());
        assert!(registry.contains(id));

        registry.set_status(id, EntityStatus::Idle).unwrap();
        let removed = registry.remove(id).unwrap();
        assert_eq!(removed.name, "Knight");
        assert!(registry.is_empty());
    }

    #[test]
    fn test_offspring_links_parents() {
        let mut registry = EntityRegistry::new();
        let a = registry.spawn(NewEntity::new("Aki", "kemonomimi"), 0);
        let b = registry.spawn(NewEntity::new("Yuki", "kemonomimi"), 0);
        let child = registry.spawn(NewEntity::new("Hana", "kemonomimi").with_parents(a, b), 10);

        assert_eq!(registry.get(child).unwrap().parents, Some((a, b)));
        assert_eq!(registry.get(a).unwrap().children, vec![child]);
        assert_eq!(registry.get(b).unwrap().children, vec![child]);
    }

    #[test]
    fn test_ids_not_reused_after_removal() {
        let mut registry = EntityRegistry::new();
        let a = registry.spawn(NewEntity::new("A", "unit"), 0);
        registry.remove(a).unwrap();
        let b = registry.spawn(NewEntity::new("B", "unit"), 0);
        assert_ne!(a, b);
    }

    #[test]
    fn test_attribute_cap() {
        let mut registry = EntityRegistry::new();
        let id = registry.spawn(NewEntity::new("Scout", "colonist").with_attribute("exploration", 9.95), 0);
        let entity = registry.get_mut(id).unwrap();
        entity.add_attribute("exploration", 0.1, Some(10.0));
        assert_eq!(entity.attribute("exploration"), 10.0);
        assert_eq!(entity.attribute("missing"), 0.0);
    }

    #[test]
    fn test_serde_round_trip() {
        let mut registry = EntityRegistry::new();
        registry.spawn(NewEntity::new("Mine", "gold_mine").with_attribute("level", 2.0), 5);
        registry.spawn(NewEntity::new("Marcus", "colonist").with_needs(Needs::default()), 5);

        let json = serde_json::to_string(&registry).unwrap();
        let restored: EntityRegistry = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, registry);
    }
}
