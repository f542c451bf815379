//! Save and load game state
//!
//! Storage sits behind [`PersistenceAdapter`]. Saving and loading are never
//! fatal to the game: [`save_or_log`] and [`load_or_log`] log failures and
//! carry on.

pub mod store;

use serde::{Deserialize, Serialize};

use crate::core::error::{EngineError, Result};
use crate::core::types::Timestamp;
use crate::simulation::world::GameState;

pub use store::{JsonFileStore, MemoryStore};

/// Current save format version
pub const SAVE_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedState {
    pub version: u32,
    pub saved_at: Timestamp,
    pub state: GameState,
}

impl SavedState {
    pub fn new(state: GameState, saved_at: Timestamp) -> Self {
        Self {
            version: SAVE_VERSION,
            saved_at,
            state,
        }
    }

    /// Reject saves written by a newer engine
    pub fn check_version(&self) -> Result<()> {
        if self.version > SAVE_VERSION {
            return Err(EngineError::Persistence(format!(
                "save format {} is newer than supported {}",
                self.version, SAVE_VERSION
            )));
        }
        Ok(())
    }
}

pub trait PersistenceAdapter: Send {
    /// The last saved state, or `None` if nothing has been saved
    fn load(&self) -> Result<Option<SavedState>>;

    fn save(&mut self, saved: &SavedState) -> Result<()>;
}

/// Save, logging any failure. Returns whether the save succeeded.
pub fn save_or_log(adapter: &mut dyn PersistenceAdapter, saved: &SavedState) -> bool {
    match adapter.save(saved) {
        Ok(()) => {
            tracing::debug!(saved_at = saved.saved_at, "Saved game");
            true
        }
        Err(e) => {
            tracing::warn!("Failed to save game: {}", e);
            false
        }
    }
}

/// Load, logging any failure. A failed or incompatible load starts fresh.
pub fn load_or_log(adapter: &dyn PersistenceAdapter) -> Option<SavedState> {
    match adapter.load() {
        Ok(Some(saved)) => match saved.check_version() {
            Ok(()) => Some(saved),
            Err(e) => {
                tracing::warn!("Ignoring saved game: {}", e);
                None
            }
        },
        Ok(None) => None,
        Err(e) => {
            tracing::warn!("Failed to load saved game: {}", e);
            None
        }
    }
}
