//! Disk-backed result cache for completed units.
//!
//! The cache holds one entry per (producer, unit identity). An entry exists
//! only after the unit completed successfully, so `exists` doubles as the
//! "already done" check that makes re-runs resumable: a crashed multi-hour
//! run restarts without recomputing finished units. The on-disk layout is an
//! implementation detail behind the [`ResultCache`] trait;
//! [`MemoryResultCache`] is the in-memory stand-in used by engine tests.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use log::{debug, warn};

use crate::facts::FactSet;
use crate::sample::SampleUnit;

/// Persistence of per-unit results keyed by (producer, unit identity).
pub trait ResultCache {
    /// True when a completed result exists for the unit.
    fn exists(&self, producer: &str, unit: &SampleUnit) -> bool;

    /// Loads the unit's facts. A read failure is a cache miss (the unit is
    /// safely recomputed), never an error.
    fn load(&self, producer: &str, unit: &SampleUnit) -> Option<FactSet>;

    /// Persists the unit's facts. A write failure is logged; the only cost
    /// is recomputation on the next run.
    fn save(&self, producer: &str, unit: &SampleUnit, facts: &FactSet);
}

/// Cache entries stored as flat-text files under the report tree, at
/// `<report>/<project subdir>/{producer}_{unit key}.data`.
pub struct DiskResultCache {
    report_dir: PathBuf,
}

impl DiskResultCache {
    pub fn new(report_dir: impl Into<PathBuf>) -> Self {
        DiskResultCache { report_dir: report_dir.into() }
    }

    /// Deterministic entry path for a (producer, unit) pair.
    pub fn entry_path(&self, producer: &str, unit: &SampleUnit) -> PathBuf {
        self.report_dir
            .join(unit.report_subdir())
            .join(format!("{producer}_{}.data", unit.key()))
    }
}

impl ResultCache for DiskResultCache {
    fn exists(&self, producer: &str, unit: &SampleUnit) -> bool {
        self.entry_path(producer, unit).is_file()
    }

    fn load(&self, producer: &str, unit: &SampleUnit) -> Option<FactSet> {
        let path = self.entry_path(producer, unit);
        if !path.is_file() {
            return None;
        }
        match FactSet::load_file(&path) {
            Ok(facts) => {
                debug!("Loaded cached result for {unit} from {}", path.display());
                Some(facts)
            }
            Err(error) => {
                warn!(
                    "Unreadable cache entry {} ({error}), unit {unit} will be recomputed",
                    path.display()
                );
                None
            }
        }
    }

    fn save(&self, producer: &str, unit: &SampleUnit, facts: &FactSet) {
        let path = self.entry_path(producer, unit);
        if let Some(parent) = path.parent() {
            if let Err(error) = std::fs::create_dir_all(parent) {
                warn!("Unable to create cache directory {}: {error}", parent.display());
                return;
            }
        }
        if let Err(error) = facts.write_file(&path) {
            warn!("Unable to save result for {unit} to {}: {error}", path.display());
        }
    }
}

/// In-memory cache for tests; also counts saves so tests can assert the
/// engine persists each unit at most once.
#[derive(Default)]
pub struct MemoryResultCache {
    entries: Mutex<HashMap<(String, String), FactSet>>,
    saves: Mutex<Vec<String>>,
}

impl MemoryResultCache {
    pub fn new() -> Self {
        MemoryResultCache::default()
    }

    /// Number of stored entries.
    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Unit keys in save order, duplicates included.
    pub fn saved_units(&self) -> Vec<String> {
        self.saves.lock().unwrap().clone()
    }
}

impl ResultCache for MemoryResultCache {
    fn exists(&self, producer: &str, unit: &SampleUnit) -> bool {
        self.entries.lock().unwrap().contains_key(&(producer.to_string(), unit.key()))
    }

    fn load(&self, producer: &str, unit: &SampleUnit) -> Option<FactSet> {
        self.entries.lock().unwrap().get(&(producer.to_string(), unit.key())).cloned()
    }

    fn save(&self, producer: &str, unit: &SampleUnit, facts: &FactSet) {
        self.saves.lock().unwrap().push(unit.key());
        self.entries
            .lock()
            .unwrap()
            .insert((producer.to_string(), unit.key()), facts.clone());
    }
}

/// Removes a producer's cache entries and report artifacts under the report
/// tree. Best-effort: failures are logged and skipped so one stubborn file
/// never fails the run.
pub fn remove_producer_files(report_dir: &Path, producer: &str) {
    let Ok(subdirs) = std::fs::read_dir(report_dir) else { return };
    let data_prefix = format!("{producer}_");
    let artifact_suffix = format!("-{producer}.txt");
    for subdir in subdirs.flatten() {
        if !subdir.path().is_dir() {
            continue;
        }
        let Ok(entries) = std::fs::read_dir(subdir.path()) else { continue };
        for entry in entries.flatten() {
            let name = entry.file_name().to_string_lossy().into_owned();
            let is_cache = name.starts_with(&data_prefix) && name.ends_with(".data");
            let is_artifact = name.ends_with(&artifact_suffix);
            if is_cache || is_artifact {
                if let Err(error) = std::fs::remove_file(entry.path()) {
                    warn!("Unable to remove {}: {error}", entry.path().display());
                }
            }
        }
    }
}
