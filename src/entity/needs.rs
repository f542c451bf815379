//! Needs that drive entity wellbeing
//!
//! All values run from 0.0 (depleted) to 100.0 (fully satisfied) and are
//! clamped to that range after every change.

use serde::{Deserialize, Serialize};

use crate::core::config::NeedsConfig;

pub const NEED_MIN: f64 = 0.0;
pub const NEED_MAX: f64 = 100.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Needs {
    pub hunger: f64,
    pub rest: f64,
    pub health: f64,
    pub morale: f64,
}

impl Default for Needs {
    fn default() -> Self {
        Self {
            hunger: 80.0,
            rest: 80.0,
            health: 100.0,
            morale: 80.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NeedType {
    Hunger,
    Rest,
    Health,
    Morale,
}

impl Needs {
    pub fn get(&self, need: NeedType) -> f64 {
        match need {
            NeedType::Hunger => self.hunger,
            NeedType::Rest => self.rest,
            NeedType::Health => self.health,
            NeedType::Morale => self.morale,
        }
    }

    /// Every need pulled into [0, 100]; used for catalog and saved values
    pub fn clamped(self) -> Self {
        Self {
            hunger: self.hunger.clamp(NEED_MIN, NEED_MAX),
            rest: self.rest.clamp(NEED_MIN, NEED_MAX),
            health: self.health.clamp(NEED_MIN, NEED_MAX),
            morale: self.morale.clamp(NEED_MIN, NEED_MAX),
        }
    }

    /// Change a need by `delta`, clamped to [0, 100]
    pub fn adjust(&mut self, need: NeedType, delta: f64) {
        let slot = match need {
            NeedType::Hunger => &mut self.hunger,
            NeedType::Rest => &mut self.rest,
            NeedType::Health => &mut self.health,
            NeedType::Morale => &mut self.morale,
        };
        *slot = (*slot + delta).clamp(NEED_MIN, NEED_MAX);
    }

    /// Get most depleted need
    pub fn most_pressing(&self) -> (NeedType, f64) {
        let needs = [
            (NeedType::Hunger, self.hunger),
            (NeedType::Rest, self.rest),
            (NeedType::Health, self.health),
            (NeedType::Morale, self.morale),
        ];
        needs
            .into_iter()
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .unwrap_or((NeedType::Hunger, self.hunger))
    }

    /// Hunger or rest below the threshold, hunger first
    pub fn distressed(&self, threshold: f64) -> Option<NeedType> {
        if self.hunger < threshold {
            return Some(NeedType::Hunger);
        }
        if self.rest < threshold {
            return Some(NeedType::Rest);
        }
        None
    }

    /// Per-tick decay. Busy entities tire faster.
    pub fn decay_tick(&mut self, config: &NeedsConfig, busy: bool) {
        let (hunger, rest) = if busy {
            (config.busy_hunger_decay, config.busy_rest_decay)
        } else {
            (config.idle_hunger_decay, config.idle_rest_decay)
        };
        self.adjust(NeedType::Hunger, -hunger);
        self.adjust(NeedType::Rest, -rest);

        if self.distressed(config.distress_threshold).is_some() {
            self.adjust(NeedType::Health, -config.distress_penalty);
            self.adjust(NeedType::Morale, -config.distress_penalty);
        }
    }

    /// Once-a-day decay, applied to idle entities
    pub fn decay_daily(&mut self, config: &NeedsConfig) {
        self.adjust(NeedType::Hunger, -config.daily_hunger_decay);
        self.adjust(NeedType::Rest, -config.daily_rest_decay);

        if self.hunger < config.daily_low_threshold {
            self.adjust(NeedType::Morale, -config.daily_hunger_morale_penalty);
            self.adjust(NeedType::Health, -config.daily_hunger_health_penalty);
        }
        if self.rest < config.daily_low_threshold {
            self.adjust(NeedType::Morale, -config.daily_rest_morale_penalty);
        }
    }
}

/// A signed change to one need, used by care actions and completion effects
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NeedChange {
    pub need: NeedType,
    pub amount: f64,
}
