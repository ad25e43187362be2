use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::domain::{AssignmentTable, Resident, Shop};

pub const SNAPSHOT_VERSION: u32 = 1;

/// Everything needed to restore a roster between sessions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RosterSnapshot {
    pub version: u32,
    pub saved_at: DateTime<Utc>,
    pub residents: Vec<Resident>,
    pub shops: Vec<Shop>,
    #[serde(default)]
    pub assignments: AssignmentTable,
    pub next_id: u64,
}

/// Persistence collaborator. `load` returns `None` when nothing was saved yet.
pub trait RosterStore: Send + Sync {
    fn load(&self) -> Result<Option<RosterSnapshot>, StoreError>;
    fn save(&self, snapshot: &RosterSnapshot) -> Result<(), StoreError>;
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("roster store io failure at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("roster snapshot could not be encoded or decoded: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("roster store unavailable: {0}")]
    Unavailable(String),
}

/// Stores the snapshot as pretty-printed JSON, replacing the file atomically.
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

    fn io_error(&self, source: std::io::Error) -> StoreError {
        StoreError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

impl RosterStore for JsonFileStore {
    fn load(&self) -> Result<Option<RosterSnapshot>, StoreError> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(self.io_error(err)),
        };
        let snapshot = serde_json::from_slice(&bytes)?;
        debug!(path = %self.path.display(), "roster snapshot loaded");
        Ok(Some(snapshot))
    }

    fn save(&self, snapshot: &RosterSnapshot) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|err| self.io_error(err))?;
        }

        let payload = serde_json::to_vec_pretty(snapshot)?;
        let staging = self.path.with_extension("json.tmp");
        let mut file = fs::File::create(&staging).map_err(|err| self.io_error(err))?;
        file.write_all(&payload)
            .and_then(|_| file.sync_all())
            .map_err(|err| self.io_error(err))?;
        fs::rename(&staging, &self.path).map_err(|err| self.io_error(err))?;

        debug!(
            path = %self.path.display(),
            residents = snapshot.residents.len(),
            shops = snapshot.shops.len(),
            "roster snapshot saved"
        );
        Ok(())
    }
}

/// Process-local store, used by the HTTP service when no snapshot path is wanted and by tests.
#[derive(Debug, Default, Clone)]
pub struct MemoryRosterStore {
    snapshot: Arc<Mutex<Option<RosterSnapshot>>>,
}

impl MemoryRosterStore {
    pub fn with_snapshot(snapshot: RosterSnapshot) -> Self {
        Self {
            snapshot: Arc::new(Mutex::new(Some(snapshot))),
        }
    }
}

impl RosterStore for MemoryRosterStore {
    fn load(&self) -> Result<Option<RosterSnapshot>, StoreError> {
        let guard = self
            .snapshot
            .lock()
            .map_err(|_| StoreError::Unavailable("memory store mutex poisoned".to_string()))?;
        Ok(guard.clone())
    }

    fn save(&self, snapshot: &RosterSnapshot) -> Result<(), StoreError> {
        let mut guard = self
            .snapshot
            .lock()
            .map_err(|_| StoreError::Unavailable("memory store mutex poisoned".to_string()))?;
        *guard = Some(snapshot.clone());
        Ok(())
    }
}
