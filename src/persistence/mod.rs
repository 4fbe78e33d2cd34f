//! Snapshot persistence for the active run and the player base
//!
//! Two records live in a key-value store: `player_base` (always present) and
//! `active_run` (only while a run is in progress). Each is a versioned JSON
//! snapshot. Loading is forgiving: missing fields take their serde defaults,
//! a damaged run is repaired or discarded, and a damaged player base falls
//! back to a fresh one without overwriting what is stored.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::catalog::EntityCatalog;
use crate::core::config::ChronicleConfig;
use crate::core::error::PersistError;
use crate::rewards::PlayerBase;
use crate::run::ChronicleRunState;

pub const SNAPSHOT_VERSION: u32 = 1;
pub const ACTIVE_RUN_KEY: &str = "active_run";
pub const PLAYER_BASE_KEY: &str = "player_base";

fn default_version() -> u32 {
    SNAPSHOT_VERSION
}

/// Versioned wrapper around a persisted aggregate
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot<T> {
    #[serde(default = "default_version")]
    pub version: u32,
    pub data: T,
}

impl<T: Serialize> Snapshot<T> {
    pub fn new(data: T) -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            data,
        }
    }

    pub fn encode(&self) -> Result<String, PersistError> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Decode a snapshot, rejecting versions newer than this build understands
pub fn decode_snapshot<T: DeserializeOwned>(raw: &str) -> Result<T, PersistError> {
    let snapshot: Snapshot<serde_json::Value> = serde_json::from_str(raw)?;
    if snapshot.version > SNAPSHOT_VERSION {
        return Err(PersistError::UnsupportedVersion {
            found: snapshot.version,
            supported: SNAPSHOT_VERSION,
        });
    }
    Ok(serde_json::from_value(snapshot.data)?)
}

/// Minimal string key-value storage
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, PersistError>;

    fn put(&mut self, key: &str, value: String) -> Result<(), PersistError>;

    fn remove(&mut self, key: &str) -> Result<(), PersistError>;
}

/// Store kept in memory (tests, headless runs)
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: BTreeMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, PersistError> {
        Ok(self.entries.get(key).cloned())
    }

    fn put(&mut self, key: &str, value: String) -> Result<(), PersistError> {
        self.entries.insert(key.to_string(), value);
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), PersistError> {
        self.entries.remove(key);
        Ok(())
    }
}

/// One `<key>.json` file per record in a directory
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, PersistError> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, PersistError> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn put(&mut self, key: &str, value: String) -> Result<(), PersistError> {
        // Write-then-rename so a crash never leaves a half-written record
        let path = self.path_for(key);
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, value)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), PersistError> {
        match fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Everything restored at startup
#[derive(Debug, Clone)]
pub struct LoadedState {
    pub player: PlayerBase,
    pub run: Option<ChronicleRunState>,
    /// Repairs and discards applied while loading
    pub recovered: Vec<String>,
}

/// Reads and writes the two persisted records
#[derive(Debug, Clone)]
pub struct SaveStore<S: KeyValueStore> {
    store: S,
}

impl<S: KeyValueStore> SaveStore<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn inner(&self) -> &S {
        &self.store
    }

    pub fn save_player(&mut self, player: &PlayerBase) -> Result<(), PersistError> {
        let encoded = Snapshot::new(player).encode()?;
        self.store.put(PLAYER_BASE_KEY, encoded)
    }

    /// Persist a run after a committed operation
    ///
    /// The player base always follows the run's player. The run record is kept
    /// only while the run is active; a finished run clears it.
    pub fn save_run(&mut self, run: &ChronicleRunState) -> Result<(), PersistError> {
        self.save_player(&run.player)?;
        if run.is_active() {
            let encoded = Snapshot::new(run).encode()?;
            self.store.put(ACTIVE_RUN_KEY, encoded)
        } else {
            tracing::info!("Run {} finished ({:?}), clearing active run", run.id, run.status);
            self.store.remove(ACTIVE_RUN_KEY)
        }
    }

    /// Restore the player base and any active run
    ///
    /// Only storage IO failures are returned as errors; unreadable records
    /// are recovered locally.
    pub fn load(
        &mut self,
        catalog: &EntityCatalog,
        config: &ChronicleConfig,
    ) -> Result<LoadedState, PersistError> {
        let mut recovered = Vec::new();

        let player = match self.store.get(PLAYER_BASE_KEY)? {
            None => PlayerBase::default(),
            Some(raw) => match decode_snapshot::<PlayerBase>(&raw) {
                Ok(player) => player,
                Err(e) => {
                    tracing::warn!("Player base unreadable ({}), starting from defaults", e);
                    recovered.push(format!("player base unreadable: {}", e));
                    PlayerBase::default()
                }
            },
        };

        let run = match self.store.get(ACTIVE_RUN_KEY)? {
            None => None,
            Some(raw) => match decode_snapshot::<ChronicleRunState>(&raw) {
                Ok(mut run) if run.is_active() => {
                    recovered.extend(run.repair(catalog, config));
                    Some(run)
                }
                Ok(run) => {
                    tracing::warn!("Stored run {} is not active, clearing it", run.id);
                    recovered.push(format!("stale run {} cleared", run.id));
                    self.store.remove(ACTIVE_RUN_KEY)?;
                    None
                }
                Err(e) => {
                    tracing::error!("Discarding corrupted run: {}", e);
                    recovered.push(format!("corrupted run discarded: {}", e));
                    self.store.remove(ACTIVE_RUN_KEY)?;
                    None
                }
            },
        };

        Ok(LoadedState {
            player,
            run,
            recovered,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_store_roundtrip() {
        let mut store = MemoryStore::new();
        assert_eq!(store.get("k").unwrap(), None);
        store.put("k", "v".into()).unwrap();
        assert_eq!(store.get("k").unwrap().as_deref(), Some("v"));
        store.remove("k").unwrap();
        store.remove("k").unwrap();
        assert_eq!(store.get("k").unwrap(), None);
    }

    #[test]
    fn test_newer_version_rejected() {
        let raw = r#"{"version": 99, "data": {}}"#;
        let result = decode_snapshot::<PlayerBase>(raw);
        assert!(matches!(
            result,
            Err(PersistError::UnsupportedVersion { found: 99, .. })
        ));
    }

    #[test]
    fn test_missing_version_and_fields_use_defaults() {
        let player: PlayerBase = decode_snapshot(r#"{"data": {"name": "Ada"}}"#).unwrap();
        assert_eq!(player.name, "Ada");
        assert_eq!(player.stats, PlayerBase::default().stats);
        assert_eq!(player.level, 1);
    }

    #[test]
    fn test_corrupt_player_base_falls_back_but_is_kept() {
        let mut store = MemoryStore::new();
        store.put(PLAYER_BASE_KEY, "not json".into()).unwrap();
        let mut saves = SaveStore::new(store);

        let loaded = saves
            .load(&EntityCatalog::builtin(), &ChronicleConfig::default())
            .unwrap();
        assert_eq!(loaded.player, PlayerBase::default());
        assert_eq!(loaded.recovered.len(), 1);
        // The unreadable record is left for inspection, not overwritten
        assert_eq!(
            saves.inner().get(PLAYER_BASE_KEY).unwrap().as_deref(),
            Some("not json")
        );
    }

    #[test]
    fn test_corrupt_run_is_discarded() {
        let mut store = MemoryStore::new();
        store.put(ACTIVE_RUN_KEY, r#"{"version":1,"data":{"id":3}}"#.into()).unwrap();
        let mut saves = SaveStore::new(store);

        let loaded = saves
            .load(&EntityCatalog::builtin(), &ChronicleConfig::default())
            .unwrap();
        assert!(loaded.run.is_none());
        assert_eq!(saves.inner().get(ACTIVE_RUN_KEY).unwrap(), None);
    }

    #[test]
    fn test_file_store_missing_key_is_none() {
        let dir = std::env::temp_dir().join(format!("chronicle-store-{}", uuid::Uuid::new_v4()));
        let mut store = FileStore::open(&dir).unwrap();
        assert_eq!(store.get(PLAYER_BASE_KEY).unwrap(), None);
        store.put(PLAYER_BASE_KEY, "{}".into()).unwrap();
        assert_eq!(store.get(PLAYER_BASE_KEY).unwrap().as_deref(), Some("{}"));
        store.remove(PLAYER_BASE_KEY).unwrap();
        assert_eq!(store.get(PLAYER_BASE_KEY).unwrap(), None);
        let _ = fs::remove_dir_all(&dir);
    }
}
