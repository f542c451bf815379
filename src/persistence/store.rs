use std::fs;
use std::path::{Path, PathBuf};

use crate::core::error::{EngineError, Result};
use crate::persistence::{PersistenceAdapter, SavedState};

/// Saves to a JSON file. Writes go to a sibling temp file that is then
/// renamed over the target, so a crash mid-write leaves the old save.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl PersistenceAdapter for JsonFileStore {
    fn load(&self) -> Result<Option<SavedState>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&self.path)?;
        let saved = serde_json::from_str(&content)?;
        Ok(Some(saved))
    }

    fn save(&mut self, saved: &SavedState) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(saved)?;
        let temp = self.temp_path();
        fs::write(&temp, json)?;
        fs::rename(&temp, &self.path)?;
        Ok(())
    }
}

/// Keeps the last save in memory. Can be told to fail, to exercise error paths.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    saved: Option<SavedState>,
    fail: bool,
    pub saves: usize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store whose every load and save fails
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn with_saved(saved: SavedState) -> Self {
        Self {
            saved: Some(saved),
            ..Self::default()
        }
    }

    pub fn saved(&self) -> Option<&SavedState> {
        self.saved.as_ref()
    }
}

impl PersistenceAdapter for MemoryStore {
    fn load(&self) -> Result<Option<SavedState>> {
        if self.fail {
            return Err(EngineError::Persistence("memory store set to fail".into()));
        }
        Ok(self.saved.clone())
    }

    fn save(&mut self, saved: &SavedState) -> Result<()> {
        if self.fail {
            return Err(EngineError::Persistence("memory store set to fail".into()));
        }
        self.saved = Some(saved.clone());
        self.saves += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Archetype, Catalog, StartingEntity};
    use crate::core::config::EngineConfig;
    use crate::economy::ledger::Cost;
    use crate::persistence::{load_or_log, save_or_log, SAVE_VERSION};
    use crate::simulation::world::GameState;

    fn state() -> GameState {
        let mut catalog = Catalog::new("save");
        let mut colonist = Archetype::new("colonist");
        colonist.has_needs = true;
        catalog.add_archetype(colonist);
        catalog.starting.resources = Cost::new().with("food", 50);
        catalog.starting.entities.push(StartingEntity {
            archetype: "colonist".into(),
            name: None,
            attributes: Default::default(),
            needs: None,
        });
        GameState::new(&EngineConfig::default(), &catalog, 0).unwrap()
    }

    #[test]
    fn test_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = JsonFileStore::new(dir.path().join("saves").join("game.json"));
        assert!(store.load().unwrap().is_none());

        let saved = SavedState::new(state(), 1_234);
        store.save(&saved).unwrap();
        assert!(!store.temp_path().exists());

        let loaded = store.load().unwrap().unwrap();
        assert_eq!(loaded, saved);
        assert_eq!(loaded.version, SAVE_VERSION);
    }

    #[test]
    fn test_corrupt_file_is_error_not_panic() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("game.json");
        fs::write(&path, "{ not json").unwrap();
        let store = JsonFileStore::new(&path);
        assert!(matches!(store.load(), Err(EngineError::SerdeError(_))));
        assert!(load_or_log(&store).is_none());
    }

    #[test]
    fn test_failing_store_is_not_fatal() {
        let mut store = MemoryStore::failing();
        assert!(!save_or_log(&mut store, &SavedState::new(state(), 0)));
        assert!(load_or_log(&store).is_none());
    }

    #[test]
    fn test_memory_store_keeps_last_save() {
        let mut store = MemoryStore::new();
        assert!(store.load().unwrap().is_none());

        store.save(&SavedState::new(state(), 1)).unwrap();
        store.save(&SavedState::new(state(), 2)).unwrap();
        assert_eq!(store.saves, 2);
        assert_eq!(store.saved().map(|s| s.saved_at), Some(2));
    }

    #[test]
    fn test_newer_version_ignored() {
        let mut saved = SavedState::new(state(), 0);
        saved.version = SAVE_VERSION + 1;
        let store = MemoryStore::with_saved(saved);
        assert!(load_or_log(&store).is_none());
    }
}
