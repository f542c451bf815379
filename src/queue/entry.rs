use serde::{Deserialize, Serialize};

use crate::core::types::{ActionKind, EntityId, EntryId, Timestamp};
use crate::economy::ledger::Cost;

/// A pending timed action
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueEntry {
    pub id: EntryId,
    pub subject: EntityId,
    #[serde(default)]
    pub partner: Option<EntityId>,
    pub action: ActionKind,
    pub started_at: Timestamp,
    /// Absolute completion time, so completion after a reload is computed
    /// from stored time
    pub ends_at: Timestamp,
    pub cost_paid: Cost,
    /// Time spent paused while this entry was pending
    #[serde(default)]
    pub paused_ms: u64,
}

impl QueueEntry {
    pub fn is_due(&self, now: Timestamp) -> bool {
        self.ends_at <= now
    }

    pub fn remaining(&self, now: Timestamp) -> u64 {
        self.ends_at.saturating_sub(now)
    }

    /// Fraction complete in `[0, 1]`, not counting paused time
    pub fn progress(&self, now: Timestamp) -> f64 {
        let total = self
            .ends_at
            .saturating_sub(self.started_at)
            .saturating_sub(self.paused_ms);
        if total == 0 {
            return 1.0;
        }
        let elapsed = now
            .saturating_sub(self.started_at)
            .saturating_sub(self.paused_ms);
        (elapsed as f64 / total as f64).clamp(0.0, 1.0)
    }

    /// Subject and partner
    pub fn participants(&self) -> impl Iterator<Item = EntityId> {
        std::iter::once(self.subject).chain(self.partner)
    }

    pub fn involves(&self, entity: EntityId) -> bool {
        self.subject == entity || self.partner == Some(entity)
    }
}
