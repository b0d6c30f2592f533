//! Trip persistence
//!
//! The roster loads every trip once at startup and writes a trip back after
//! each successful mutation. A save replaces the whole trip as one unit.
//!
//! - `JsonDirStore` - one pretty-printed `<name>.json` per trip in a directory
//! - `MemoryStore` - process-local map, for tests and throwaway runs

use crate::domain::types::is_valid_trip_name;
use crate::domain::Trip;
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid trip data in {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to encode trip {name}: {source}")]
    Encode {
        name: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Trip name {name:?} cannot be used as a file name")]
    InvalidName { name: String },

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// Persistence collaborator for the roster
pub trait TripStore: Send + Sync {
    /// Every stored trip, in no particular order
    fn load_all(&self) -> Result<Vec<Trip>, StoreError>;

    /// Durably replace the stored copy of `trip`
    fn save(&self, trip: &Trip) -> Result<(), StoreError>;
}

/// Directory of JSON files, one per trip
pub struct JsonDirStore {
    dir: PathBuf,
}

impl JsonDirStore {
    /// Open (creating if needed) a store rooted at `dir`
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, StoreError> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir).map_err(|source| StoreError::Io { path: dir.clone(), source })?;
        info!(dir = %dir.display(), "trip_store_opened");
        Ok(Self { dir })
    }

    fn trip_path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{name}.json"))
    }

    fn read_trip(path: &Path) -> Result<Trip, StoreError> {
        let contents = fs::read_to_string(path)
            .map_err(|source| StoreError::Io { path: path.to_path_buf(), source })?;
        serde_json::from_str(&contents)
            .map_err(|source| StoreError::Parse { path: path.to_path_buf(), source })
    }
}

impl TripStore for JsonDirStore {
    fn load_all(&self) -> Result<Vec<Trip>, StoreError> {
        let io_err = |source| StoreError::Io { path: self.dir.clone(), source };
        let mut trips = Vec::new();

        for entry in fs::read_dir(&self.dir).map_err(io_err)? {
            let path = entry.map_err(io_err)?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }

            let trip = Self::read_trip(&path)?;
            if !is_valid_trip_name(trip.name()) {
                warn!(
                    file = %path.display(),
                    trip = %trip.name(),
                    "trip_file_invalid_name_skipped"
                );
                continue;
            }
            let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or_default();
            if stem != trip.name() {
                warn!(
                    file = %path.display(),
                    trip = %trip.name(),
                    "trip_file_name_mismatch"
                );
            }
            debug!(file = %path.display(), trip = %trip.name(), "trip_file_loaded");
            trips.push(trip);
        }

        Ok(trips)
    }

    fn save(&self, trip: &Trip) -> Result<(), StoreError> {
        if !is_valid_trip_name(trip.name()) {
            return Err(StoreError::InvalidName { name: trip.name().to_string() });
        }
        let path = self.trip_path(trip.name());
        let tmp_path = self.dir.join(format!(".{}.json.tmp", trip.name()));

        let json = serde_json::to_string_pretty(trip)
            .map_err(|source| StoreError::Encode { name: trip.name().to_string(), source })?;

        // Write beside the target then rename, so readers never see half a file
        let write = || -> std::io::Result<()> {
            let mut file = fs::File::create(&tmp_path)?;
            file.write_all(json.as_bytes())?;
            file.write_all(b"\n")?;
            file.sync_all()?;
            fs::rename(&tmp_path, &path)
        };

        write().map_err(|source| {
            let _ = fs::remove_file(&tmp_path);
            StoreError::Io { path: path.clone(), source }
        })?;

        debug!(file = %path.display(), bytes = %json.len(), "trip_saved");
        Ok(())
    }
}

/// In-process store; contents vanish with the process
#[derive(Default)]
pub struct MemoryStore {
    trips: Mutex<FxHashMap<String, Trip>>,
    #[cfg(test)]
    fail_saves: std::sync::atomic::AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populated store
    pub fn with_trips(trips: impl IntoIterator<Item = Trip>) -> Self {
        let store = Self::new();
        {
            let mut map = store.trips.lock();
            for trip in trips {
                map.insert(trip.name().to_string(), trip);
            }
        }
        store
    }

    /// Stored copy of a trip, if any
    pub fn get(&self, name: &str) -> Option<Trip> {
        self.trips.lock().get(name).cloned()
    }

    /// Make every following `save` fail (for exercising rollback paths)
    #[cfg(test)]
    pub fn fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, std::sync::atomic::Ordering::Relaxed);
    }
}

impl TripStore for MemoryStore {
    fn load_all(&self) -> Result<Vec<Trip>, StoreError> {
        Ok(self.trips.lock().values().cloned().collect())
    }

    fn save(&self, trip: &Trip) -> Result<(), StoreError> {
        #[cfg(test)]
        if self.fail_saves.load(std::sync::atomic::Ordering::Relaxed) {
            return Err(StoreError::Unavailable("injected failure".to_string()));
        }

        self.trips.lock().insert(trip.name().to_string(), trip.clone());
        Ok(())
    }
}
