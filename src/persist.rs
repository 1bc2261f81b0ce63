use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::{create_dir_all, File};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use crate::board::Position;
use crate::config::{Difficulty, GameConfig, Side};
use crate::error::{PersistError, StoreError};
use crate::ledger::Ledger;
use crate::rules;

/// Key holding the match snapshot.
pub const STATE_KEY: &str = "matchline.state";
pub const SNAPSHOT_VERSION: u32 = 1;

/// Durable string slots.
pub trait KvStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError>;
}

#[derive(Default, Debug, Clone)]
pub struct MemoryStore {
    slots: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self { Self::default() }
}

impl KvStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> { Ok(self.slots.get(key).cloned()) }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        self.slots.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// One `<key>.json` file per slot under a directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self { Self { dir: dir.as_ref().to_path_buf() } }

    fn path(&self, key: &str) -> PathBuf { self.dir.join(format!("{key}.json")) }
}

impl KvStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        match std::fs::read_to_string(self.path(key)) {
            Ok(s) => Ok(Some(s)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        create_dir_all(&self.dir)?;
        let path = self.path(key);
        let tmp = path.with_extension("json.tmp");
        let mut f = File::create(&tmp)?;
        f.write_all(value.as_bytes())?;
        f.sync_all()?;
        std::fs::rename(&tmp, &path)?;
        Ok(())
    }
}

#[derive(Serialize, Deserialize)]
struct Snapshot {
    version: u32,
    config: GameConfig,
    cursor: usize,
    positions: Vec<Position>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RestoredState {
    pub ledger: Ledger,
    pub config: GameConfig,
    /// Came from the store rather than freshly created.
    pub restored: bool,
}

impl RestoredState {
    pub fn fresh(difficulty: Difficulty) -> Self {
        Self { ledger: Ledger::default(), config: GameConfig::fresh(difficulty, Side::White), restored: false }
    }
}

/// Saves and restores the match through an injected [`KvStore`].
pub struct Persistence<S: KvStore> {
    store: S,
}

impl<S: KvStore> Persistence<S> {
    pub fn new(store: S) -> Self { Self { store } }

    pub fn store(&self) -> &S { &self.store }

    pub fn store_mut(&mut self) -> &mut S { &mut self.store }

    /// The stored match if it was played at `difficulty`, otherwise a fresh
    /// one. Unreadable state counts as no state.
    pub fn load(&self, difficulty: Difficulty) -> RestoredState {
        let blob = match self.store.get(STATE_KEY) {
            Ok(Some(b)) => b,
            Ok(None) => return RestoredState::fresh(difficulty),
            Err(e) => {
                log::warn!("match state unreadable, starting fresh: {e}");
                return RestoredState::fresh(difficulty);
            }
        };
        let (ledger, config) = match decode(&blob) {
            Ok(state) => state,
            Err(e) => {
                log::warn!("{e}; starting fresh");
                return RestoredState::fresh(difficulty);
            }
        };
        if config.difficulty != difficulty {
            log::info!("stored match was {} not {difficulty}; starting fresh", config.difficulty);
            return RestoredState::fresh(difficulty);
        }
        log::debug!("restored match: {} positions, cursor {}", ledger.len(), ledger.cursor());
        RestoredState { ledger, config, restored: true }
    }

    /// Overwrites the stored snapshot.
    pub fn save(&mut self, ledger: &Ledger, config: &GameConfig) -> Result<(), PersistError> {
        let snap = Snapshot { version: SNAPSHOT_VERSION, config: *config, cursor: ledger.cursor(), positions: ledger.positions().to_vec() };
        let blob = serde_json::to_string(&snap)?;
        self.store.set(STATE_KEY, &blob)?;
        Ok(())
    }
}

fn decode(blob: &str) -> Result<(Ledger, GameConfig), PersistError> {
    let corrupt = PersistError::Corrupt;
    let snap: Snapshot = serde_json::from_str(blob).map_err(|e| corrupt(e.to_string()))?;
    if snap.version != SNAPSHOT_VERSION {
        return Err(corrupt(format!("unsupported snapshot version {}", snap.version)));
    }
    rules::verify_chain(&snap.positions).map_err(|e| corrupt(e.to_string()))?;
    let ledger = Ledger::from_parts(snap.positions, snap.cursor).map_err(|e| corrupt(e.to_string()))?;
    Ok((ledger, snap.config))
}
