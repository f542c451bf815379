//! Catalog TOML loading
//!
//! A catalog document is a flat set of arrays of tables:
//!
//! ```toml
//! title = "Kingdom"
//!
//! [starting]
//! resources = { gold = 500, food = 200 }
//!
//! [[archetypes]]
//! name = "soldier"
//! combat = true
//! attributes = { attack = 10, defense = 8, health = 25 }
//!
//! [[actions]]
//! kind = "train_soldier"
//! duration = { secs = 30 }
//! cost = { gold = 50 }
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;

use super::{ActionDef, Archetype, CareAction, Catalog, Discovery, RivalDef, StartingState, Technology};
use crate::core::error::Result;
use crate::economy::production::ProductionRule;
use crate::entity::names::NameGenerator;

/// On-disk catalog layout
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogFile {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub archetypes: Vec<Archetype>,
    #[serde(default)]
    pub actions: Vec<ActionDef>,
    #[serde(default)]
    pub care: Vec<CareAction>,
    #[serde(default)]
    pub discoveries: Vec<Discovery>,
    #[serde(default)]
    pub technologies: Vec<Technology>,
    #[serde(default)]
    pub production: Vec<ProductionRule>,
    #[serde(default)]
    pub rivals: Vec<RivalDef>,
    #[serde(default)]
    pub names: Option<NameGenerator>,
    #[serde(default)]
    pub starting: StartingState,
    #[serde(default)]
    pub resource_cap: Option<u64>,
}

impl CatalogFile {
    pub fn into_catalog(self) -> Catalog {
        let mut catalog = Catalog::new(&self.title);
        for archetype in self.archetypes {
            catalog.add_archetype(archetype);
        }
        for action in self.actions {
            catalog.add_action(action);
        }
        for care in self.care {
            catalog.add_care(care);
        }
        for discovery in self.discoveries {
            catalog.add_discovery(discovery);
        }
        for technology in self.technologies {
            catalog.add_technology(technology);
        }
        for rival in self.rivals {
            catalog.add_rival(rival);
        }
        catalog.production = self.production;
        if let Some(names) = self.names {
            catalog.names = names;
        }
        catalog.starting = self.starting;
        catalog.resource_cap = self.resource_cap;
        catalog
    }
}

impl Catalog {
    /// Load and validate a catalog from a TOML file
    pub fn load_from_toml(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::parse_toml(&content)
    }

    /// Parse and validate a catalog from a TOML string
    pub fn parse_toml(content: &str) -> Result<Self> {
        let file: CatalogFile = toml::from_str(content)?;
        let catalog = file.into_catalog();
        catalog.validate()?;
        tracing::debug!(
            title = %catalog.title,
            archetypes = catalog.archetypes.len(),
            actions = catalog.actions.len(),
            "Loaded catalog"
        );
        Ok(catalog)
    }
}
