//! Player commands
//!
//! Every state change a player can request is a [`Command`], applied through
//! [`crate::simulation::World::dispatch`]. Each command is validated in full
//! before anything is mutated, so a rejected command leaves the world as it
//! was.

pub mod executor;

use serde::{Deserialize, Serialize};

use crate::core::types::{ActionKind, EntityId, EntryId, Timestamp};
use crate::economy::ledger::Cost;
use crate::simulation::battle::BattleReport;

pub use executor::CommandExecutor;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum Command {
    /// Queue a timed action for an idle entity (and partner, for paired actions)
    Enroll {
        subject: EntityId,
        #[serde(default)]
        partner: Option<EntityId>,
        action: ActionKind,
    },
    /// Buy a new entity of an archetype
    Acquire {
        archetype: String,
        #[serde(default)]
        name: Option<String>,
    },
    /// Sell or dismiss an idle entity
    Remove { entity: EntityId },
    /// Instant need restore, such as feeding or resting
    Care { entity: EntityId, care: String },
    Raid { rival: String },
    Pause,
    Resume,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RaidOutcome {
    pub rival: String,
    pub attacker_power: f64,
    pub defender_power: f64,
    pub report: BattleReport,
    pub loot: Cost,
    /// Units lost, newest first
    pub lost_units: Vec<EntityId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CommandOutcome {
    Enrolled { entry: EntryId, ends_at: Timestamp },
    Acquired { entity: EntityId },
    Removed { entity: EntityId, refund: Cost },
    Cared { entity: EntityId },
    Raided(RaidOutcome),
    Paused { since: Timestamp },
    Resumed { paused_ms: u64 },
}
