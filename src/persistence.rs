// Best-effort local snapshots
//
// Three independent JSON files live in the data directory, one per state
// slice. Timestamps are written as RFC 3339 strings by chrono's serde
// support, so loaded records compare directly against "now".

use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};

use crate::error::Result;

pub const CHATS_SNAPSHOT: &str = "chats";
pub const CALLS_SNAPSHOT: &str = "calls";
pub const STATUS_SNAPSHOT: &str = "status";

const SNAPSHOT_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct Envelope<T> {
    version: u32,
    saved_at: DateTime<Utc>,
    state: T,
}

#[derive(Debug, Clone)]
pub struct SnapshotStore {
    dir: PathBuf,
}

impl SnapshotStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        SnapshotStore { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{}.json", name))
    }

    /// Write one snapshot. The file is replaced in one rename so a crash
    /// mid-write leaves the previous snapshot intact.
    pub fn save<T: Serialize>(&self, name: &str, state: &T) -> Result<()> {
        if !self.dir.exists() {
            fs::create_dir_all(&self.dir)?;
        }

        let path = self.path_for(name);
        let tmp = self.dir.join(format!("{}.json.tmp", name));
        let envelope = Envelope {
            version: SNAPSHOT_VERSION,
            saved_at: Utc::now(),
            state,
        };

        let file = File::create(&tmp)?;
        serde_json::to_writer_pretty(file, &envelope)?;
        fs::rename(&tmp, &path)?;

        debug!("Saved {} snapshot to {}", name, path.display());
        Ok(())
    }

    /// Read one snapshot; a missing file is `Ok(None)`
    pub fn load<T: DeserializeOwned>(&self, name: &str) -> Result<Option<T>> {
        let path = self.path_for(name);
        if !path.exists() {
            return Ok(None);
        }

        let file = File::open(&path)?;
        let envelope: Envelope<T> = serde_json::from_reader(BufReader::new(file))?;
        if envelope.version != SNAPSHOT_VERSION {
            warn!(
                "{} snapshot has version {}, expected {}",
                name, envelope.version, SNAPSHOT_VERSION
            );
        }

        info!("Loaded {} snapshot saved at {}", name, envelope.saved_at);
        Ok(Some(envelope.state))
    }

    /// Load a snapshot, falling back to `fallback` when it is missing or unreadable
    pub fn load_or<T, F>(&self, name: &str, fallback: F) -> T
    where
        T: DeserializeOwned,
        F: FnOnce() -> T,
    {
        match self.load(name) {
            Ok(Some(state)) => state,
            Ok(None) => fallback(),
            Err(e) => {
                warn!("Could not read {} snapshot, starting fresh: {}", name, e);
                fallback()
            }
        }
    }

    pub fn remove(&self, name: &str) -> Result<()> {
        let path = self.path_for(name);
        if path.exists() {
            fs::remove_file(path)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calls::CallLog;
    use crate::seed;
    use chrono::TimeZone;

    #[test]
    fn missing_snapshot_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path());
        let loaded: Option<CallLog> = store.load(CALLS_SNAPSHOT).unwrap();
        assert!(loaded.is_none());
    }

    #[test]
    fn timestamps_survive_a_save_load_cycle() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path());
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        let log = seed::call_log(now);

        store.save(CALLS_SNAPSHOT, &log).unwrap();
        let loaded: CallLog = store.load(CALLS_SNAPSHOT).unwrap().unwrap();
        assert_eq!(loaded, log);

        let raw = fs::read_to_string(store.path_for(CALLS_SNAPSHOT)).unwrap();
        assert!(raw.contains("2024-03-01T11:00:00Z"));
    }

    #[test]
    fn corrupt_snapshot_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path());
        fs::write(store.path_for(CALLS_SNAPSHOT), "{ not json").unwrap();

        let log: CallLog = store.load_or(CALLS_SNAPSHOT, CallLog::default);
        assert!(log.calls().is_empty());
    }
}
