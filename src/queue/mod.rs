//! Timed action queue and completion effects

pub mod effect;
pub mod entry;
pub mod manager;

pub use effect::{
    apply_outcome, resolve_effect, AttributeChange, AttributeGain, CompletionEffect, DiscoveryRule,
    EffectOutcome, SpawnRule,
};
pub use entry::QueueEntry;
pub use manager::{EnrollRequest, QueueManager};
