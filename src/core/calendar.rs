//! Calendar - game tick and day counter
//!
//! The day advances on a modulus boundary of the tick counter. Games start on
//! day 1.

use serde::{Deserialize, Serialize};

use crate::core::types::Tick;

/// Calendar tracks simulation time with tick/day granularity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Calendar {
    tick: Tick,
    ticks_per_day: u64,
}

impl Calendar {
    pub fn new(ticks_per_day: u64) -> Self {
        Self {
            tick: 0,
            ticks_per_day: ticks_per_day.max(1),
        }
    }

    /// Advance one tick. Returns true when the tick crossed into a new day.
    pub fn advance(&mut self) -> bool {
        self.tick += 1;
        self.tick % self.ticks_per_day == 0
    }

    pub fn current_tick(&self) -> Tick {
        self.tick
    }

    pub fn current_day(&self) -> u64 {
        1 + self.tick / self.ticks_per_day
    }

    /// Fraction of the current day elapsed (0.0 - 1.0)
    pub fn day_progress(&self) -> f64 {
        (self.tick % self.ticks_per_day) as f64 / self.ticks_per_day as f64
    }

    pub fn ticks_per_day(&self) -> u64 {
        self.ticks_per_day
    }
}

impl Default for Calendar {
    fn default() -> Self {
        Self::new(120)
    }
}
