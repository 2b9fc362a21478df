//! Run configuration loaded from `key=value` conf files.
//!
//! Settings are flat string pairs with typed accessors and defaults. All
//! engine-facing keys live under the `qc.conf.` prefix, e.g.
//! `qc.conf.threads` or `qc.conf.fastqstats.threads` for a per-producer
//! override.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use indexmap::IndexMap;

use crate::errors::{QcError, Result};

/// Prefix of every engine-facing configuration key.
pub const CONF_PREFIX: &str = "qc.conf.";

/// Flat `key=value` configuration with typed accessors.
#[derive(Debug, Clone, Default)]
pub struct Settings {
    entries: IndexMap<String, String>,
}

impl Settings {
    /// Creates an empty settings map.
    pub fn new() -> Self {
        Settings { entries: IndexMap::new() }
    }

    /// Loads settings from a conf file. Blank lines and `#` comments are
    /// ignored; any other line must contain `=`.
    pub fn load(path: &Path) -> Result<Settings> {
        let file = File::open(path).map_err(|e| QcError::io(path, e))?;
        let reader = BufReader::new(file);
        let mut settings = Settings::new();
        for (index, line) in reader.lines().enumerate() {
            let line = line.map_err(|e| QcError::io(path, e))?;
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            let (key, value) = trimmed.split_once('=').ok_or_else(|| {
                QcError::InvalidFileFormat {
                    file_type: "settings".to_string(),
                    path: path.display().to_string(),
                    reason: format!("line {}: missing '='", index + 1),
                }
            })?;
            settings.set(key.trim(), value.trim());
        }
        Ok(settings)
    }

    /// Sets a value, replacing any existing one.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.insert(key.into(), value.into());
    }

    /// Raw string value for `key`, if present.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// String value for `key`, or `default` when absent.
    pub fn get_or<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        self.get(key).unwrap_or(default)
    }

    /// Integer value for `key`, or `default` when absent.
    pub fn get_int_or(&self, key: &str, default: i64) -> Result<i64> {
        match self.get(key) {
            None => Ok(default),
            Some(value) => value.parse().map_err(|_| QcError::InvalidSetting {
                key: key.to_string(),
                reason: format!("'{value}' is not an integer"),
            }),
        }
    }

    /// Boolean value for `key`, or `default` when absent.
    pub fn get_bool_or(&self, key: &str, default: bool) -> Result<bool> {
        match self.get(key) {
            None => Ok(default),
            Some(value) => match value.to_ascii_lowercase().as_str() {
                "true" | "yes" | "1" => Ok(true),
                "false" | "no" | "0" => Ok(false),
                _ => Err(QcError::InvalidSetting {
                    key: key.to_string(),
                    reason: format!("'{value}' is not a boolean"),
                }),
            },
        }
    }

    /// Comma-separated integer list for `key`; empty when absent.
    pub fn get_int_list(&self, key: &str) -> Result<Vec<i64>> {
        let Some(value) = self.get(key) else { return Ok(Vec::new()) };
        value
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| {
                s.parse().map_err(|_| QcError::InvalidSetting {
                    key: key.to_string(),
                    reason: format!("'{s}' is not an integer"),
                })
            })
            .collect()
    }

    /// Worker count for `producer`: the per-producer override
    /// `qc.conf.{producer}.threads` when set, else the global
    /// `qc.conf.threads`, else the hardware parallelism. Must be >= 1.
    pub fn threads_for(&self, producer: &str) -> Result<usize> {
        let default = std::thread::available_parallelism().map(|n| n.get() as i64).unwrap_or(1);
        let global = self.get_int_or(&format!("{CONF_PREFIX}threads"), default)?;
        let key = format!("{CONF_PREFIX}{producer}.threads");
        let threads = self.get_int_or(&key, global)?;
        if threads < 1 {
            return Err(QcError::InvalidSetting {
                key,
                reason: format!("thread count must be >= 1, got {threads}"),
            });
        }
        Ok(threads as usize)
    }
}

/// Fixed per-run paths handed to producers at `configure` time.
#[derive(Debug, Clone)]
pub struct QcContext {
    /// Run identifier, used in cache and output file names.
    pub run_id: String,
    /// Root of the demultiplexed FASTQ tree.
    pub fastq_dir: PathBuf,
    /// Root of the report tree; cache entries and artifacts live here.
    pub report_dir: PathBuf,
    /// Scratch directory for producer temporaries.
    pub tmp_dir: PathBuf,
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn settings(pairs: &[(&str, &str)]) -> Settings {
        let mut s = Settings::new();
        for (k, v) in pairs {
            s.set(*k, *v);
        }
        s
    }

    #[test]
    fn test_load_conf_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("qc.conf");
        std::fs::write(&path, "# runqc settings\nqc.conf.threads = 8\n\nqc.conf.process.all.reads=false\n")
            .unwrap();
        let s = Settings::load(&path).unwrap();
        assert_eq!(s.get_int_or("qc.conf.threads", 1).unwrap(), 8);
        assert!(!s.get_bool_or("qc.conf.process.all.reads", true).unwrap());
    }

    #[test]
    fn test_defaults_when_absent() {
        let s = Settings::new();
        assert_eq!(s.get_int_or("qc.conf.threads", 4).unwrap(), 4);
        assert!(s.get_bool_or("qc.conf.process.undetermined.samples", true).unwrap());
        assert!(s.get_int_list("qc.conf.fastqstats.excluded.lanes").unwrap().is_empty());
    }

    #[test]
    fn test_invalid_values_are_errors() {
        let s = settings(&[("qc.conf.threads", "many"), ("qc.conf.process.all.reads", "maybe")]);
        assert!(matches!(
            s.get_int_or("qc.conf.threads", 1),
            Err(QcError::InvalidSetting { .. })
        ));
        assert!(matches!(
            s.get_bool_or("qc.conf.process.all.reads", true),
            Err(QcError::InvalidSetting { .. })
        ));
    }

    #[test]
    fn test_int_list_parsing() {
        let s = settings(&[("qc.conf.fastqstats.excluded.lanes", "2, 5,7")]);
        assert_eq!(s.get_int_list("qc.conf.fastqstats.excluded.lanes").unwrap(), vec![2, 5, 7]);
    }

    #[test]
    fn test_threads_for_producer_override() {
        let s = settings(&[("qc.conf.threads", "4"), ("qc.conf.fastqstats.threads", "2")]);
        assert_eq!(s.threads_for("fastqstats").unwrap(), 2);
        assert_eq!(s.threads_for("other").unwrap(), 4);
    }

    #[test]
    fn test_threads_must_be_positive() {
        let s = settings(&[("qc.conf.threads", "0")]);
        assert!(matches!(s.threads_for("fastqstats"), Err(QcError::InvalidSetting { .. })));
    }
}
