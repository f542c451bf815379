//! Wall-clock cooldowns keyed by action and target

use ahash::AHashMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::core::error::{EngineError, Result};
use crate::core::types::Timestamp;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Cooldowns {
    until: AHashMap<String, Timestamp>,
}

impl Cooldowns {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start(&mut self, key: impl Into<String>, now: Timestamp, duration_ms: u64) {
        self.until.insert(key.into(), now.saturating_add(duration_ms));
    }

    pub fn is_active(&self, key: &str, now: Timestamp) -> bool {
        self.until.get(key).is_some_and(|&until| now < until)
    }

    /// `OnCooldown` if the key has not expired yet
    pub fn check(&self, key: &str, now: Timestamp) -> Result<()> {
        match self.until.get(key) {
            Some(&until) if now < until => Err(EngineError::OnCooldown {
                key: key.to_string(),
                until,
            }),
            _ => Ok(()),
        }
    }

    /// Drop expired keys, returning them in name order
    pub fn purge(&mut self, now: Timestamp) -> Vec<String> {
        let mut expired: Vec<String> = self
            .until
            .iter()
            .filter(|(_, &until)| until <= now)
            .map(|(key, _)| key.clone())
            .collect();
        expired.sort();
        for key in &expired {
            self.until.remove(key);
        }
        expired
    }

    /// Remaining milliseconds per active key
    pub fn remaining(&self, now: Timestamp) -> BTreeMap<String, u64> {
        self.until
            .iter()
            .filter(|(_, &until)| until > now)
            .map(|(key, &until)| (key.clone(), until - now))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.until.len()
    }

    pub fn is_empty(&self) -> bool {
        self.until.is_empty()
    }
}

pub fn raid_key(rival: &str) -> String {
    format!("raid:{}", rival)
}
