//! Insertion-ordered typed fact storage.
//!
//! A [`FactSet`] maps dot-separated keys (e.g. `run.info.read.count`) to
//! scalar values. Values are stored as canonical text and parsed on typed
//! access, which keeps the flat-file round trip lossless for every supported
//! scalar type. Keys are namespaced by producer name and sample-unit
//! identity, so fact sets produced by different units merge without
//! collisions.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use indexmap::IndexMap;

use crate::errors::{QcError, Result};

/// Insertion-ordered mapping from dot-separated keys to scalar values.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FactSet {
    entries: IndexMap<String, String>,
}

impl FactSet {
    /// Creates an empty fact set.
    pub fn new() -> Self {
        FactSet { entries: IndexMap::new() }
    }

    /// Number of facts stored.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when no facts are stored.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// True when a fact exists for `key`.
    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Stores a string fact. A later `put` for the same key replaces the
    /// value but keeps the original insertion position.
    pub fn put(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.insert(key.into(), value.into());
    }

    /// Stores an integer fact.
    pub fn put_int(&mut self, key: impl Into<String>, value: i64) {
        self.put(key, value.to_string());
    }

    /// Stores a floating-point fact.
    pub fn put_double(&mut self, key: impl Into<String>, value: f64) {
        self.put(key, value.to_string());
    }

    /// Stores a boolean fact.
    pub fn put_bool(&mut self, key: impl Into<String>, value: bool) {
        self.put(key, value.to_string());
    }

    /// Raw string value for `key`, if present.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Required string value for `key`.
    pub fn get_required(&self, key: &str) -> Result<&str> {
        self.get(key).ok_or_else(|| QcError::MissingFact { key: key.to_string() })
    }

    /// Required integer value for `key`.
    pub fn get_int(&self, key: &str) -> Result<i64> {
        let value = self.get_required(key)?;
        value.parse().map_err(|_| QcError::FactType {
            key: key.to_string(),
            value: value.to_string(),
            expected: "integer",
        })
    }

    /// Required floating-point value for `key`.
    pub fn get_double(&self, key: &str) -> Result<f64> {
        let value = self.get_required(key)?;
        value.parse().map_err(|_| QcError::FactType {
            key: key.to_string(),
            value: value.to_string(),
            expected: "float",
        })
    }

    /// Required boolean value for `key`. Accepts `true`/`false` in any case,
    /// matching the canonical text written by [`FactSet::put_bool`].
    pub fn get_bool(&self, key: &str) -> Result<bool> {
        let value = self.get_required(key)?;
        match value.to_ascii_lowercase().as_str() {
            "true" => Ok(true),
            "false" => Ok(false),
            _ => Err(QcError::FactType {
                key: key.to_string(),
                value: value.to_string(),
                expected: "boolean",
            }),
        }
    }

    /// Iterator over `(key, value)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Keys in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Keys starting with `prefix`, in insertion order.
    pub fn keys_with_prefix<'a>(&'a self, prefix: &'a str) -> impl Iterator<Item = &'a str> {
        self.keys().filter(move |k| k.starts_with(prefix))
    }

    /// Merges `other` into `self`. A duplicate key takes the later value but
    /// keeps its first insertion position.
    pub fn merge(&mut self, other: &FactSet) {
        for (key, value) in &other.entries {
            self.entries.insert(key.clone(), value.clone());
        }
    }

    /// Writes one `key=value` line per fact, in insertion order.
    pub fn write_file(&self, path: &Path) -> Result<()> {
        let file = File::create(path).map_err(|e| QcError::io(path, e))?;
        let mut writer = BufWriter::new(file);
        for (key, value) in &self.entries {
            writeln!(writer, "{key}={value}").map_err(|e| QcError::io(path, e))?;
        }
        writer.flush().map_err(|e| QcError::io(path, e))
    }

    /// Loads a fact set written by [`FactSet::write_file`]. Blank lines and
    /// `#` comment lines are ignored; a line without `=` is malformed.
    pub fn load_file(path: &Path) -> Result<FactSet> {
        let file = File::open(path).map_err(|e| QcError::io(path, e))?;
        let reader = BufReader::new(file);
        let mut facts = FactSet::new();
        for (index, line) in reader.lines().enumerate() {
            let line = line.map_err(|e| QcError::io(path, e))?;
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            let (key, value) = trimmed.split_once('=').ok_or_else(|| {
                QcError::InvalidFileFormat {
                    file_type: "run data".to_string(),
                    path: path.display().to_string(),
                    reason: format!("line {}: missing '='", index + 1),
                }
            })?;
            facts.put(key.trim(), value);
        }
        Ok(facts)
    }
}

impl<'a> IntoIterator for &'a FactSet {
    type Item = (&'a String, &'a String);
    type IntoIter = indexmap::map::Iter<'a, String, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
