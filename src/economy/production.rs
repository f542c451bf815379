//! Production system - applies passive production each tick
//!
//! Rules are expressed per minute of wall time. Each tick adds the scaled rate
//! to a fractional carry per resource; whole units are moved into (or drained
//! from) the ledger and the remainder stays in the carry for the next tick.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::catalog::ResearchBonuses;
use crate::core::types::ResourceKind;
use crate::economy::ledger::ResourceLedger;
use crate::entity::registry::EntityRegistry;

const MS_PER_MINUTE: f64 = 60_000.0;
/// Absorbs float error so that six carries of 1/6 make a whole unit
const CARRY_EPSILON: f64 = 1e-9;

/// What a production rule scales with
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProductionSource {
    /// Fixed rate regardless of entities (e.g. life support draining power)
    #[default]
    Flat,
    /// Rate per entity of an archetype, multiplied by one of its attributes
    /// (a level-3 gold mine produces three times the base rate). Without an
    /// attribute each entity counts once.
    Archetype {
        archetype: String,
        #[serde(default)]
        attribute: Option<String>,
    },
}

/// A passive production (positive) or consumption (negative) rule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductionRule {
    pub resource: ResourceKind,
    /// Units per minute, per unit of the source multiplier
    pub per_minute: f64,
    #[serde(default)]
    pub source: ProductionSource,
}

impl ProductionRule {
    /// Effective units per minute given the current entities
    pub fn rate(&self, registry: &EntityRegistry) -> f64 {
        match &self.source {
            ProductionSource::Flat => self.per_minute,
            ProductionSource::Archetype { archetype, attribute } => {
                let multiplier: f64 = registry
                    .iter()
                    .filter(|e| &e.archetype == archetype)
                    .map(|e| match attribute {
                        Some(attr) => e.attribute(attr),
                        None => 1.0,
                    })
                    .sum();
                self.per_minute * multiplier
            }
        }
    }
}

/// Fractional production carried between ticks
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProductionState {
    carry: BTreeMap<ResourceKind, f64>,
}

impl ProductionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn carry(&self, kind: &ResourceKind) -> f64 {
        self.carry.get(kind).copied().unwrap_or(0.0)
    }
}

/// Whole units moved by one production tick
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductionResult {
    pub resource: ResourceKind,
    /// Positive for production, negative for consumption actually drained
    pub amount: i64,
}

/// Net per-minute rate for every resource. A research multiplier applies to
/// a positive net rate, floored to whole units per minute.
pub fn production_rates(
    rules: &[ProductionRule],
    registry: &EntityRegistry,
    bonuses: &ResearchBonuses,
) -> BTreeMap<ResourceKind, f64> {
    let mut rates = BTreeMap::new();
    for rule in rules {
        *rates.entry(rule.resource.clone()).or_insert(0.0) += rule.rate(registry);
    }
    for (kind, rate) in rates.iter_mut() {
        let multiplier = bonuses.production_multiplier(kind);
        if *rate > 0.0 && multiplier != 1.0 {
            *rate = (*rate * multiplier).floor();
        }
    }
    rates
}

/// Apply one tick of passive production
///
/// Returns the whole-unit changes applied to the ledger this tick.
pub fn tick_production(
    rules: &[ProductionRule],
    registry: &EntityRegistry,
    bonuses: &ResearchBonuses,
    ledger: &mut ResourceLedger,
    state: &mut ProductionState,
    tick_ms: u64,
) -> Vec<ProductionResult> {
    for (kind, rate) in production_rates(rules, registry, bonuses) {
        let delta = rate * tick_ms as f64 / MS_PER_MINUTE;
        if delta != 0.0 {
            *state.carry.entry(kind).or_insert(0.0) += delta;
        }
    }

    let mut results = Vec::new();
    for (kind, carry) in state.carry.iter_mut() {
        let whole = if *carry >= 0.0 {
            (*carry + CARRY_EPSILON).floor()
        } else {
            (*carry - CARRY_EPSILON).ceil()
        };
        if whole == 0.0 {
            continue;
        }
        *carry -= whole;

        let amount = if whole > 0.0 {
            ledger.credit(kind.clone(), whole as u64) as i64
        } else {
            -(ledger.drain(kind, (-whole) as u64) as i64)
        };

        if amount != 0 {
            results.push(ProductionResult {
                resource: kind.clone(),
                amount,
            });
        }
    }

    results
}
