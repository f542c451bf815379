//! Queue manager - owns pending timed actions
//!
//! Enrollment validates everything before touching state: subject and partner
//! idle, subject archetype accepted, requirements met, cost affordable. Only
//! then is the cost (scaled to the subject, for upgrades) paid, the
//! participants marked busy and the entry pushed.
//! Entries complete in enrollment order.

use serde::{Deserialize, Serialize};

use crate::catalog::ActionDef;
use crate::core::error::{EngineError, Result};
use crate::core::types::{EntityId, EntryId, Timestamp};
use crate::economy::ledger::ResourceLedger;
use crate::entity::registry::{EntityRegistry, EntityStatus};
use crate::queue::entry::QueueEntry;

/// Everything needed to enroll one entity (or a pair) in a timed action
#[derive(Debug, Clone, Copy)]
pub struct EnrollRequest<'a> {
    pub subject: EntityId,
    pub partner: Option<EntityId>,
    pub action: &'a ActionDef,
    pub duration_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueManager {
    pending: Vec<QueueEntry>,
    next_id: u64,
}

impl Default for QueueManager {
    fn default() -> Self {
        Self::new()
    }
}

impl QueueManager {
    pub fn new() -> Self {
        Self {
            pending: Vec::new(),
            next_id: 1,
        }
    }

    /// Validate, pay, mark busy and queue. Nothing changes on error.
    pub fn enroll(
        &mut self,
        registry: &mut EntityRegistry,
        ledger: &mut ResourceLedger,
        request: EnrollRequest<'_>,
        now: Timestamp,
    ) -> Result<EntryId> {
        let action = request.action;
        let subject = registry.ensure_idle(request.subject)?;
        if !action.accepts_subject(&subject.archetype) {
            return Err(EngineError::InvalidSubject {
                entity: subject.id,
                action: action.kind.to_string(),
            });
        }
        for requirement in &action.requirements {
            requirement.check(subject)?;
        }
        let cost = action.cost_for(subject);

        let partner = if action.requires_partner {
            let partner_id = request.partner.ok_or_else(|| EngineError::PartnerRequired {
                action: action.kind.to_string(),
            })?;
            if partner_id == request.subject {
                return Err(EngineError::InvalidSubject {
                    entity: partner_id,
                    action: action.kind.to_string(),
                });
            }
            let partner = registry.ensure_idle(partner_id)?;
            if !action.accepts_subject(&partner.archetype) {
                return Err(EngineError::InvalidSubject {
                    entity: partner_id,
                    action: action.kind.to_string(),
                });
            }
            Some(partner_id)
        } else {
            None
        };

        if let Some(err) = ledger.shortfall(&cost) {
            return Err(err);
        }

        // Validated; apply
        ledger.pay(&cost)?;
        let id = EntryId(self.next_id);
        self.next_id += 1;

        let entry = QueueEntry {
            id,
            subject: request.subject,
            partner,
            action: action.kind.clone(),
            started_at: now,
            ends_at: now.saturating_add(request.duration_ms),
            cost_paid: cost,
            paused_ms: 0,
        };
        for participant in entry.participants() {
            registry.set_status(
                participant,
                EntityStatus::Busy {
                    action: action.kind.clone(),
                    entry: id,
                },
            )?;
        }

        tracing::debug!(
            entry = id.0,
            subject = %request.subject,
            action = %action.kind,
            ends_at = entry.ends_at,
            "Enrolled"
        );
        self.pending.push(entry);
        Ok(id)
    }

    /// Remove and return every entry due at `now`, in enrollment order.
    /// Calling again with the same `now` returns nothing.
    pub fn tick(&mut self, now: Timestamp) -> Vec<QueueEntry> {
        if !self.pending.iter().any(|e| e.is_due(now)) {
            return Vec::new();
        }
        let (due, pending): (Vec<_>, Vec<_>) = std::mem::take(&mut self.pending)
            .into_iter()
            .partition(|e| e.is_due(now));
        self.pending = pending;
        due
    }

    /// Return a completed entry's participants to idle
    pub fn release(entry: &QueueEntry, registry: &mut EntityRegistry) {
        for participant in entry.participants() {
            if registry.set_status(participant, EntityStatus::Idle).is_err() {
                tracing::warn!(entity = %participant, entry = entry.id.0, "Participant vanished before completion");
            }
        }
    }

    /// Push back entries that were still running when a pause began
    pub fn extend_after(&mut self, paused_since: Timestamp, pause_len: u64) {
        for entry in self.pending.iter_mut().filter(|e| e.ends_at > paused_since) {
            entry.ends_at = entry.ends_at.saturating_add(pause_len);
            entry.paused_ms += pause_len;
        }
    }

    pub fn pending(&self) -> &[QueueEntry] {
        &self.pending
    }

    pub fn get(&self, id: EntryId) -> Option<&QueueEntry> {
        self.pending.iter().find(|e| e.id == id)
    }

    pub fn is_enrolled(&self, entity: EntityId) -> bool {
        self.pending.iter().any(|e| e.involves(entity))
    }

    /// Earliest pending completion time
    pub fn next_due(&self) -> Option<Timestamp> {
        self.pending.iter().map(|e| e.ends_at).min()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
