//! Completion effects
//!
//! An effect describes what happens when a queued action finishes. Resolving
//! it is pure: given the subject, optional partner and an RNG it produces an
//! [`EffectOutcome`] without touching game state. [`apply_outcome`] then
//! mutates the registry and ledger in one step.

use rand::distributions::WeightedIndex;
use rand::prelude::Distribution;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::catalog::Catalog;
use crate::core::error::{EngineError, Result};
use crate::core::types::{EntityId, Timestamp};
use crate::economy::ledger::{Cost, ResourceLedger};
use crate::entity::needs::{NeedChange, Needs};
use crate::entity::registry::{Entity, EntityRegistry, NewEntity};

/// Random gain to one attribute of the subject
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeGain {
    pub attribute: String,
    pub min: f64,
    pub max: f64,
    /// Draw an integer in `[min, max]` instead of a real
    #[serde(default)]
    pub whole: bool,
    #[serde(default)]
    pub cap: Option<f64>,
}

impl AttributeGain {
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        if !(self.max > self.min) {
            return self.min;
        }
        if self.whole {
            rng.gen_range(self.min.round() as i64..=self.max.round() as i64) as f64
        } else {
            rng.gen_range(self.min..self.max)
        }
    }

    fn validate(&self, action: &str) -> Result<()> {
        let cap_ok = self.cap.map_or(true, f64::is_finite);
        if !self.min.is_finite() || !self.max.is_finite() || !cap_ok || self.max < self.min {
            return Err(EngineError::Config(format!(
                "action '{}' has an invalid gain for '{}': [{}, {}]",
                action, self.attribute, self.min, self.max
            )));
        }
        Ok(())
    }
}

fn invalid(action: &str, what: &str) -> EngineError {
    EngineError::Config(format!("action '{}' has an invalid {}", action, what))
}

/// New entity produced on completion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum SpawnRule {
    /// A fresh entity of a fixed archetype (a trained soldier, a forged sword).
    /// Each roll adds a random amount to the new entity's base attribute.
    Archetype {
        archetype: String,
        #[serde(default)]
        rolls: Vec<AttributeGain>,
    },
    /// A child of subject and partner: archetype inherited from one parent,
    /// each attribute the parents' mean with uniform variation
    Offspring {
        #[serde(default = "default_inherit_chance")]
        inherit_chance: f64,
        #[serde(default = "default_variation")]
        variation: f64,
        #[serde(default = "default_stat_min")]
        min: f64,
        #[serde(default = "default_stat_max")]
        max: f64,
    },
}

fn default_inherit_chance() -> f64 {
    0.7
}

fn default_variation() -> f64 {
    10.0
}

fn default_stat_min() -> f64 {
    10.0
}

fn default_stat_max() -> f64 {
    100.0
}

/// Skill-scaled chance to turn up something from a discovery table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscoveryRule {
    /// Attribute driving the chance
    pub skill: String,
    #[serde(default = "default_skill_scale")]
    pub skill_scale: f64,
    #[serde(default = "default_max_chance")]
    pub max_chance: f64,
    pub table: Vec<String>,
}

fn default_skill_scale() -> f64 {
    10.0
}

fn default_max_chance() -> f64 {
    0.8
}

impl SpawnRule {
    fn validate(&self, action: &str) -> Result<()> {
        match self {
            SpawnRule::Archetype { rolls, .. } => rolls.iter().try_for_each(|roll| roll.validate(action)),
            SpawnRule::Offspring {
                inherit_chance,
                variation,
                min,
                max,
            } => {
                if !(0.0..=1.0).contains(inherit_chance) {
                    return Err(invalid(action, "inherit chance"));
                }
                if !variation.is_finite() || *variation < 0.0 {
                    return Err(invalid(action, "offspring variation"));
                }
                if !min.is_finite() || !max.is_finite() || min > max {
                    return Err(invalid(action, "offspring attribute range"));
                }
                Ok(())
            }
        }
    }
}

impl DiscoveryRule {
    pub fn chance(&self, skill: f64) -> f64 {
        if self.skill_scale <= 0.0 {
            return self.max_chance.clamp(0.0, 1.0);
        }
        (skill / self.skill_scale).min(self.max_chance).clamp(0.0, 1.0)
    }

    fn validate(&self, action: &str) -> Result<()> {
        if !(0.0..=1.0).contains(&self.max_chance) || !self.skill_scale.is_finite() {
            return Err(invalid(action, "discovery chance"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompletionEffect {
    #[serde(default)]
    pub attribute_gains: Vec<AttributeGain>,
    #[serde(default)]
    pub need_changes: Vec<NeedChange>,
    /// Resources credited on completion
    #[serde(default)]
    pub yields: Cost,
    /// Skill tag appended to the subject's trained list
    #[serde(default)]
    pub learn: Option<String>,
    #[serde(default)]
    pub spawn: Option<SpawnRule>,
    #[serde(default)]
    pub discovery: Option<DiscoveryRule>,
    /// Technology unlocked on completion
    #[serde(default)]
    pub research: Option<String>,
}

impl CompletionEffect {
    /// Reject ranges and chances that would make resolution panic
    pub fn validate(&self, action: &str) -> Result<()> {
        for gain in &self.attribute_gains {
            gain.validate(action)?;
        }
        if let Some(spawn) = &self.spawn {
            spawn.validate(action)?;
        }
        if let Some(discovery) = &self.discovery {
            discovery.validate(action)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AttributeChange {
    pub attribute: String,
    pub delta: f64,
    pub cap: Option<f64>,
}

/// The resolved result of a completion effect, not yet applied
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EffectOutcome {
    pub attribute_changes: Vec<AttributeChange>,
    pub need_changes: Vec<NeedChange>,
    pub resources: Cost,
    pub learned: Option<String>,
    pub spawn: Option<NewEntity>,
    pub discovery: Option<String>,
    pub researched: Option<String>,
}

/// Resolve an effect for a subject (and partner, for paired actions).
///
/// Random draws happen in a fixed order: discovery roll and pick, attribute
/// gains in declaration order, then spawn (name then rolls, or inheritance,
/// attribute variation in name order, name).
pub fn resolve_effect<R: Rng + ?Sized>(
    effect: &CompletionEffect,
    subject: &Entity,
    partner: Option<&Entity>,
    catalog: &Catalog,
    rng: &mut R,
) -> Result<EffectOutcome> {
    let mut outcome = EffectOutcome {
        need_changes: effect.need_changes.clone(),
        resources: effect.yields.clone(),
        learned: effect.learn.clone(),
        researched: effect.research.clone(),
        ..EffectOutcome::default()
    };

    // Chance uses the skill before this trip's gain
    if let Some(rule) = &effect.discovery {
        let chance = rule.chance(subject.attribute(&rule.skill));
        if rng.gen_bool(chance) {
            if let Some(found) = pick_discovery(rule, catalog, rng) {
                if let Some(discovery) = catalog.discovery(&found) {
                    outcome.resources.merge(&discovery.yields);
                }
                outcome.discovery = Some(found);
            }
        }
    }

    for gain in &effect.attribute_gains {
        outcome.attribute_changes.push(AttributeChange {
            attribute: gain.attribute.clone(),
            delta: gain.sample(rng),
            cap: gain.cap,
        });
    }

    outcome.spawn = match &effect.spawn {
        None => None,
        Some(SpawnRule::Archetype { archetype, rolls }) => {
            let archetype = catalog.archetype(archetype)?;
            let mut template = archetype.template(catalog.names.generate(rng));
            for roll in rolls {
                let base = template.attributes.get(&roll.attribute).copied().unwrap_or(0.0);
                let mut value = base + roll.sample(rng);
                if let Some(cap) = roll.cap {
                    value = value.min(cap);
                }
                template.attributes.insert(roll.attribute.clone(), value);
            }
            Some(template)
        }
        Some(SpawnRule::Offspring {
            inherit_chance,
            variation,
            min,
            max,
        }) => {
            let partner = partner.ok_or_else(|| EngineError::PartnerRequired {
                action: "offspring".to_string(),
            })?;
            Some(offspring(subject, partner, *inherit_chance, *variation, (*min, *max), catalog, rng)?)
        }
    };

    Ok(outcome)
}

fn pick_discovery<R: Rng + ?Sized>(rule: &DiscoveryRule, catalog: &Catalog, rng: &mut R) -> Option<String> {
    let weights: Vec<f64> = rule
        .table
        .iter()
        .map(|name| catalog.discovery(name).map(|d| d.weight).unwrap_or(0.0))
        .collect();
    let dist = WeightedIndex::new(&weights).ok()?;
    rule.table.get(dist.sample(rng)).cloned()
}

fn offspring<R: Rng + ?Sized>(
    first: &Entity,
    second: &Entity,
    inherit_chance: f64,
    variation: f64,
    bounds: (f64, f64),
    catalog: &Catalog,
    rng: &mut R,
) -> Result<NewEntity> {
    let archetype_name = if rng.gen_bool(inherit_chance.clamp(0.0, 1.0)) {
        &first.archetype
    } else {
        &second.archetype
    };
    let archetype = catalog.archetype(archetype_name)?;

    // An attribute only one parent has is inherited from that parent alone
    let names: BTreeSet<&String> = first.attributes.keys().chain(second.attributes.keys()).collect();
    let mut attributes = BTreeMap::new();
    for name in names {
        let values: Vec<f64> = [first, second]
            .iter()
            .filter_map(|parent| parent.attributes.get(name).copied())
            .collect();
        let mean = values.iter().sum::<f64>() / values.len() as f64;
        let jitter = if variation > 0.0 {
            rng.gen_range(-variation..variation)
        } else {
            0.0
        };
        attributes.insert(name.clone(), (mean + jitter).round().clamp(bounds.0, bounds.1));
    }

    let mut child = NewEntity::new(catalog.names.generate(rng), archetype.name.clone())
        .with_parents(first.id, second.id);
    child.attributes = attributes;
    if archetype.has_needs {
        child.needs = Some(Needs::default());
    }
    Ok(child)
}

/// Apply a resolved outcome to the subject, ledger and registry.
/// Returns the id of any spawned entity.
pub fn apply_outcome(
    outcome: EffectOutcome,
    subject: EntityId,
    registry: &mut EntityRegistry,
    ledger: &mut ResourceLedger,
    now: Timestamp,
) -> Result<Option<EntityId>> {
    let entity = registry
        .get_mut(subject)
        .ok_or(EngineError::EntityNotFound(subject))?;

    for change in &outcome.attribute_changes {
        entity.add_attribute(&change.attribute, change.delta, change.cap);
    }
    if let Some(needs) = entity.needs.as_mut() {
        for change in &outcome.need_changes {
            needs.adjust(change.need, change.amount);
        }
    }
    if let Some(skill) = outcome.learned {
        if !entity.has_trained(&skill) {
            entity.trained.push(skill);
        }
    }

    ledger.credit_all(&outcome.resources);

    Ok(outcome.spawn.map(|template| registry.spawn(template, now)))
}
