//! Research - technologies that boost production and army strength
//!
//! A technology is unlocked by completing an action whose effect names it.
//! Bonuses from every completed technology multiply together.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::core::error::{EngineError, Result};
use crate::core::types::ResourceKind;

fn no_bonus() -> f64 {
    1.0
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Technology {
    pub name: String,
    #[serde(default)]
    pub display_name: Option<String>,
    /// Production multiplier per resource
    #[serde(default)]
    pub production: BTreeMap<ResourceKind, f64>,
    /// Multiplier on the power of combat units
    #[serde(default = "no_bonus")]
    pub unit_power: f64,
    /// Multiplier on the power of everything else
    #[serde(default = "no_bonus")]
    pub building_power: f64,
}

impl Technology {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            display_name: None,
            production: BTreeMap::new(),
            unit_power: 1.0,
            building_power: 1.0,
        }
    }

    pub(crate) fn validate(&self) -> Result<()> {
        let multipliers = self
            .production
            .values()
            .chain([&self.unit_power, &self.building_power]);
        for m in multipliers {
            if !m.is_finite() || *m < 0.0 {
                return Err(EngineError::Config(format!(
                    "technology '{}' has invalid multiplier {}",
                    self.name, m
                )));
            }
        }
        Ok(())
    }
}

/// Combined effect of every completed technology
#[derive(Debug, Clone, PartialEq)]
pub struct ResearchBonuses {
    pub production: BTreeMap<ResourceKind, f64>,
    pub unit_power: f64,
    pub building_power: f64,
}

impl Default for ResearchBonuses {
    fn default() -> Self {
        Self {
            production: BTreeMap::new(),
            unit_power: 1.0,
            building_power: 1.0,
        }
    }
}

impl ResearchBonuses {
    pub fn from_completed<'a>(technologies: impl IntoIterator<Item = &'a Technology>) -> Self {
        let mut bonuses = Self::default();
        for tech in technologies {
            for (kind, multiplier) in &tech.production {
                *bonuses.production.entry(kind.clone()).or_insert(1.0) *= multiplier;
            }
            bonuses.unit_power *= tech.unit_power;
            bonuses.building_power *= tech.building_power;
        }
        bonuses
    }

    pub fn production_multiplier(&self, kind: &ResourceKind) -> f64 {
        self.production.get(kind).copied().unwrap_or(1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mining() -> Technology {
        let mut tech = Technology::new("mining");
        tech.production.insert(ResourceKind::from("gold"), 1.4);
        tech.production.insert(ResourceKind::from("stone"), 1.4);
        tech
    }

    #[test]
    fn test_bonuses_combine() {
        let mut iron = Technology::new("iron_working");
        iron.unit_power = 1.2;
        let mut deep = Technology::new("deep_mining");
        deep.production.insert(ResourceKind::from("gold"), 1.5);

        let techs = [mining(), iron, deep];
        let bonuses = ResearchBonuses::from_completed(&techs);
        assert!((bonuses.production_multiplier(&ResourceKind::from("gold")) - 2.1).abs() < 1e-12);
        assert!((bonuses.production_multiplier(&ResourceKind::from("stone")) - 1.4).abs() < 1e-12);
        assert_eq!(bonuses.production_multiplier(&ResourceKind::from("food")), 1.0);
        assert_eq!(bonuses.unit_power, 1.2);
        assert_eq!(bonuses.building_power, 1.0);
    }

    #[test]
    fn test_nothing_researched_is_neutral() {
        let bonuses = ResearchBonuses::from_completed(std::iter::empty());
        assert_eq!(bonuses, ResearchBonuses::default());
    }

    #[test]
    fn test_invalid_multiplier_rejected() {
        let mut tech = mining();
        assert!(tech.validate().is_ok());
        tech.unit_power = f64::NAN;
        assert!(tech.validate().is_err());
    }
}
