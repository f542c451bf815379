//! Game catalog - the static definitions a game is built from
//!
//! Archetypes describe what entities look like, actions describe the timed
//! work they can be queued for, and the remaining tables cover care actions,
//! discoveries, technologies, passive production, rival kingdoms and the
//! starting state. Catalogs are usually loaded from TOML (see [`loader`]).

pub mod loader;
pub mod research;

pub use loader::CatalogFile;
pub use research::{ResearchBonuses, Technology};

use ahash::AHashMap;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::core::config::EngineConfig;
use crate::core::error::{EngineError, Result};
use crate::core::types::{ActionKind, ResourceKind};
use crate::economy::ledger::Cost;
use crate::economy::production::{ProductionRule, ProductionSource};
use crate::entity::names::NameGenerator;
use crate::entity::needs::{NeedChange, NeedType, Needs};
use crate::entity::registry::{Entity, NewEntity};
use crate::queue::effect::{CompletionEffect, SpawnRule};

/// Template for a kind of entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Archetype {
    pub name: String,
    #[serde(default)]
    pub display_name: Option<String>,
    /// Base attributes given to new entities
    #[serde(default)]
    pub attributes: BTreeMap<String, f64>,
    /// Living entities get needs; buildings and items do not
    #[serde(default)]
    pub has_needs: bool,
    /// Price to acquire one directly
    #[serde(default)]
    pub cost: Cost,
    /// Units that only come from training are not sold directly
    #[serde(default = "default_for_sale")]
    pub for_sale: bool,
    /// Credited when one is removed (sold)
    #[serde(default)]
    pub sale_value: Cost,
    /// Extra sale price from the entity's attributes and training
    #[serde(default)]
    pub sale: Option<SaleRule>,
    /// Counts toward the army for raids
    #[serde(default)]
    pub combat: bool,
    /// Power contributed per unit of each attribute
    #[serde(default)]
    pub power: BTreeMap<String, f64>,
}

fn default_for_sale() -> bool {
    true
}

impl Archetype {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            display_name: None,
            attributes: BTreeMap::new(),
            has_needs: false,
            cost: Cost::new(),
            for_sale: true,
            sale_value: Cost::new(),
            sale: None,
            combat: false,
            power: BTreeMap::new(),
        }
    }

    /// A spawnable entity with this archetype's base attributes
    pub fn template(&self, name: impl Into<String>) -> NewEntity {
        let mut template = NewEntity::new(name, self.name.clone());
        template.attributes = self.attributes.clone();
        if self.has_needs {
            template.needs = Some(Needs::default());
        }
        template
    }

    /// Power an entity of this archetype adds to its side
    pub fn power_of(&self, entity: &Entity) -> f64 {
        self.power
            .iter()
            .map(|(attr, weight)| entity.attribute(attr) * weight)
            .sum()
    }

    /// What selling this entity pays: the flat sale value plus any priced part
    pub fn sale_price(&self, entity: &Entity) -> Cost {
        let mut price = self.sale_value.clone();
        if let Some(rule) = &self.sale {
            price.add(rule.resource.clone(), rule.price(entity));
        }
        price
    }
}

fn full_price() -> f64 {
    1.0
}

/// Sale price derived from an entity's attributes and trained skills
///
/// `round(fraction * (max(minimum, round(base + sum(weight * attribute))) + trained bonuses))`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaleRule {
    pub resource: ResourceKind,
    #[serde(default)]
    pub base: f64,
    /// Value per point of each attribute
    #[serde(default)]
    pub per_attribute: BTreeMap<String, f64>,
    /// Floor on the attribute-derived value
    #[serde(default)]
    pub minimum: f64,
    /// Value added per trained skill
    #[serde(default)]
    pub trained: BTreeMap<String, f64>,
    /// Share of the computed value the seller receives
    #[serde(default = "full_price")]
    pub fraction: f64,
}

impl SaleRule {
    pub fn price(&self, entity: &Entity) -> u64 {
        let stats: f64 = self
            .per_attribute
            .iter()
            .map(|(attr, weight)| entity.attribute(attr) * weight)
            .sum();
        let training: f64 = entity
            .trained
            .iter()
            .filter_map(|skill| self.trained.get(skill))
            .sum();
        let value = (self.base + stats).round().max(self.minimum) + training;
        (value * self.fraction).round().max(0.0) as u64
    }

    fn validate(&self, archetype: &str) -> Result<()> {
        let numbers = [self.base, self.minimum, self.fraction]
            .into_iter()
            .chain(self.per_attribute.values().copied())
            .chain(self.trained.values().copied());
        for n in numbers {
            if !n.is_finite() {
                return Err(EngineError::Config(format!(
                    "archetype '{}' has a non-finite sale value",
                    archetype
                )));
            }
        }
        if self.fraction < 0.0 {
            return Err(EngineError::Config(format!(
                "archetype '{}' has a negative sale fraction",
                archetype
            )));
        }
        Ok(())
    }
}

/// How long a queued action takes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionDuration {
    Secs(u64),
    /// Game days, converted through the tick interval and day length
    Days(u64),
}

impl ActionDuration {
    /// Saturates rather than wrapping for absurdly long durations
    pub fn to_millis(self, config: &EngineConfig) -> u64 {
        match self {
            ActionDuration::Secs(secs) => secs.saturating_mul(1000),
            ActionDuration::Days(days) => days.saturating_mul(config.day_length_ms()),
        }
    }
}

fn no_minimum() -> f64 {
    f64::NEG_INFINITY
}

/// Bounds on an attribute or need for an entity to be enrolled
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Requirement {
    pub stat: String,
    #[serde(default = "no_minimum")]
    pub minimum: f64,
    /// Highest value still allowed, such as one below a building's top level
    #[serde(default)]
    pub maximum: Option<f64>,
}

impl Requirement {
    /// Needs are looked up first ("health", "rest", ...), then attributes
    pub fn value_for(&self, entity: &Entity) -> f64 {
        let need = match self.stat.as_str() {
            "hunger" => Some(NeedType::Hunger),
            "rest" => Some(NeedType::Rest),
            "health" => Some(NeedType::Health),
            "morale" => Some(NeedType::Morale),
            _ => None,
        };
        match (need, entity.needs.as_ref()) {
            (Some(need), Some(needs)) => needs.get(need),
            _ => entity.attribute(&self.stat),
        }
    }

    pub fn check(&self, entity: &Entity) -> Result<()> {
        let value = self.value_for(entity);
        if value < self.minimum {
            return Err(EngineError::RequirementNotMet {
                entity: entity.id,
                attribute: self.stat.clone(),
                minimum: self.minimum,
            });
        }
        match self.maximum {
            Some(maximum) if value > maximum => Err(EngineError::LimitReached {
                entity: entity.id,
                attribute: self.stat.clone(),
                maximum,
            }),
            _ => Ok(()),
        }
    }

    pub fn is_met(&self, entity: &Entity) -> bool {
        self.check(entity).is_ok()
    }
}

/// Cost growth with a subject attribute: every amount is multiplied by
/// `factor ^ attribute` and floored
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostScaling {
    pub attribute: String,
    pub factor: f64,
}

/// A timed action entities can be queued for
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionDef {
    pub kind: ActionKind,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub cost: Cost,
    #[serde(default)]
    pub cost_scaling: Option<CostScaling>,
    pub duration: ActionDuration,
    /// Archetypes allowed as subject; empty allows any
    #[serde(default)]
    pub subjects: Vec<String>,
    #[serde(default)]
    pub requires_partner: bool,
    #[serde(default)]
    pub requirements: Vec<Requirement>,
    #[serde(default)]
    pub effect: CompletionEffect,
}

impl ActionDef {
    pub fn new(kind: &str, duration: ActionDuration) -> Self {
        Self {
            kind: ActionKind::from(kind),
            name: None,
            cost: Cost::new(),
            cost_scaling: None,
            duration,
            subjects: Vec::new(),
            requires_partner: false,
            requirements: Vec::new(),
            effect: CompletionEffect::default(),
        }
    }

    pub fn accepts_subject(&self, archetype: &str) -> bool {
        self.subjects.is_empty() || self.subjects.iter().any(|s| s == archetype)
    }

    /// Cost for this subject, after any scaling
    pub fn cost_for(&self, subject: &Entity) -> Cost {
        let Some(scaling) = &self.cost_scaling else {
            return self.cost.clone();
        };
        let multiplier = scaling.factor.powf(subject.attribute(&scaling.attribute));
        self.cost
            .iter()
            .map(|(kind, amount)| (kind.clone(), (amount as f64 * multiplier).floor() as u64))
            .collect()
    }
}

/// An instant, cost-paying need restore (feed, rest, pamper)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CareAction {
    pub kind: String,
    #[serde(default)]
    pub cost: Cost,
    #[serde(default)]
    pub changes: Vec<NeedChange>,
    #[serde(default)]
    pub requires_idle: bool,
}

/// Something an exploration can turn up
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Discovery {
    pub name: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub yields: Cost,
    #[serde(default = "default_weight")]
    pub weight: f64,
}

fn default_weight() -> f64 {
    1.0
}

/// An opposing kingdom that can be raided
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RivalDef {
    pub name: String,
    pub power: f64,
    #[serde(default)]
    pub holdings: Cost,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StartingEntity {
    pub archetype: String,
    #[serde(default)]
    pub name: Option<String>,
    /// Overrides applied on top of the archetype's base attributes
    #[serde(default)]
    pub attributes: BTreeMap<String, f64>,
    /// Starting needs, for archetypes that have them
    #[serde(default)]
    pub needs: Option<Needs>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StartingState {
    #[serde(default)]
    pub resources: Cost,
    #[serde(default)]
    pub entities: Vec<StartingEntity>,
}

/// Catalog of all definitions for one game
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    pub title: String,
    archetypes: AHashMap<String, Archetype>,
    actions: AHashMap<ActionKind, ActionDef>,
    care: AHashMap<String, CareAction>,
    discoveries: AHashMap<String, Discovery>,
    technologies: AHashMap<String, Technology>,
    pub production: Vec<ProductionRule>,
    pub rivals: Vec<RivalDef>,
    pub names: NameGenerator,
    pub starting: StartingState,
    /// Storage limit applied to every resource
    pub resource_cap: Option<u64>,
}

impl Catalog {
    pub fn new(title: &str) -> Self {
        Self {
            title: title.to_string(),
            ..Self::default()
        }
    }

    pub fn add_archetype(&mut self, archetype: Archetype) {
        self.archetypes.insert(archetype.name.clone(), archetype);
    }

    pub fn add_action(&mut self, action: ActionDef) {
        self.actions.insert(action.kind.clone(), action);
    }

    pub fn add_care(&mut self, care: CareAction) {
        self.care.insert(care.kind.clone(), care);
    }

    pub fn add_discovery(&mut self, discovery: Discovery) {
        self.discoveries.insert(discovery.name.clone(), discovery);
    }

    pub fn add_technology(&mut self, technology: Technology) {
        self.technologies.insert(technology.name.clone(), technology);
    }

    pub fn add_rival(&mut self, rival: RivalDef) {
        self.rivals.push(rival);
    }

    pub fn add_production(&mut self, rule: ProductionRule) {
        self.production.push(rule);
    }

    pub fn archetype(&self, name: &str) -> Result<&Archetype> {
        self.archetypes
            .get(name)
            .ok_or_else(|| EngineError::UnknownArchetype(name.to_string()))
    }

    pub fn action(&self, kind: &ActionKind) -> Result<&ActionDef> {
        self.actions
            .get(kind)
            .ok_or_else(|| EngineError::UnknownAction(kind.to_string()))
    }

    pub fn care(&self, kind: &str) -> Result<&CareAction> {
        self.care
            .get(kind)
            .ok_or_else(|| EngineError::UnknownAction(kind.to_string()))
    }

    pub fn discovery(&self, name: &str) -> Option<&Discovery> {
        self.discoveries.get(name)
    }

    pub fn technology(&self, name: &str) -> Option<&Technology> {
        self.technologies.get(name)
    }

    /// Combined bonuses of the completed technologies
    pub fn research_bonuses(&self, completed: &BTreeSet<String>) -> ResearchBonuses {
        ResearchBonuses::from_completed(completed.iter().filter_map(|name| self.technologies.get(name)))
    }

    /// Action kinds in name order
    pub fn action_kinds(&self) -> Vec<&ActionKind> {
        let mut kinds: Vec<_> = self.actions.keys().collect();
        kinds.sort();
        kinds
    }

    /// Check that every cross reference resolves and every number is usable
    pub fn validate(&self) -> Result<()> {
        let missing = |what: &str, name: &str| {
            EngineError::Config(format!("{} references unknown archetype '{}'", what, name))
        };

        for archetype in self.archetypes.values() {
            if let Some(rule) = &archetype.sale {
                rule.validate(&archetype.name)?;
            }
        }
        for technology in self.technologies.values() {
            technology.validate()?;
        }

        for action in self.actions.values() {
            action.effect.validate(action.kind.as_str())?;
            if let Some(scaling) = &action.cost_scaling {
                if !scaling.factor.is_finite() || scaling.factor <= 0.0 {
                    return Err(EngineError::Config(format!(
                        "action '{}' has invalid cost scaling factor {}",
                        action.kind, scaling.factor
                    )));
                }
            }
            if let Some(tech) = &action.effect.research {
                if !self.technologies.contains_key(tech) {
                    return Err(EngineError::Config(format!(
                        "action '{}' researches unknown technology '{}'",
                        action.kind, tech
                    )));
                }
            }
            for subject in &action.subjects {
                if !self.archetypes.contains_key(subject) {
                    return Err(missing(&format!("action '{}'", action.kind), subject));
                }
            }
            match &action.effect.spawn {
                Some(SpawnRule::Archetype { archetype, .. }) if !self.archetypes.contains_key(archetype) => {
                    return Err(missing(&format!("action '{}'", action.kind), archetype));
                }
                Some(SpawnRule::Offspring { .. }) if !action.requires_partner => {
                    return Err(EngineError::Config(format!(
                        "action '{}' spawns offspring but does not require a partner",
                        action.kind
                    )));
                }
                _ => {}
            }
            if let Some(rule) = &action.effect.discovery {
                if rule.table.is_empty() {
                    return Err(EngineError::Config(format!(
                        "action '{}' has an empty discovery table",
                        action.kind
                    )));
                }
                for name in &rule.table {
                    match self.discoveries.get(name) {
                        Some(d) if d.weight > 0.0 => {}
                        Some(_) => {
                            return Err(EngineError::Config(format!(
                                "discovery '{}' must have a positive weight",
                                name
                            )))
                        }
                        None => {
                            return Err(EngineError::Config(format!(
                                "action '{}' references unknown discovery '{}'",
                                action.kind, name
                            )))
                        }
                    }
                }
            }
        }

        for rule in &self.production {
            if let ProductionSource::Archetype { archetype, .. } = &rule.source {
                if !self.archetypes.contains_key(archetype) {
                    return Err(missing("production rule", archetype));
                }
            }
        }

        for entity in &self.starting.entities {
            if !self.archetypes.contains_key(&entity.archetype) {
                return Err(missing("starting entity", &entity.archetype));
            }
        }

        Ok(())
    }
}
