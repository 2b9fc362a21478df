//! Producers and their registry.
//!
//! A producer is a named component contributing facts to the shared run
//! dataset, either by driving a [`UnitEngine`](crate::engine::UnitEngine)
//! per sample unit or by computing directly from a single report file. The
//! [`ProducerRegistry`] is built explicitly at startup, producer by
//! producer, and passed by reference; there is no global discovery.
//!
//! `run_producers` executes a requested set in dependency order, pulling in
//! required upstream producers automatically, with summary producers always
//! after every per-unit producer.

use std::collections::HashSet;

use log::info;

use crate::errors::{QcError, Result};
use crate::facts::FactSet;
use crate::settings::{QcContext, Settings};

/// A named contributor of facts to the run dataset.
pub trait Producer {
    /// Stable producer name, used in settings keys, cache entries and fact
    /// namespaces.
    fn name(&self) -> &'static str;

    /// Names of producers whose facts this one reads.
    fn required_producers(&self) -> &[&'static str] {
        &[]
    }

    /// Summary producers aggregate run-wide facts and run after every
    /// per-unit producer.
    fn is_summary(&self) -> bool {
        false
    }

    /// Validates settings and captures per-run paths. Errors here abort the
    /// run before any unit is processed.
    fn configure(&mut self, context: &QcContext, settings: &Settings) -> Result<()>;

    /// Contributes facts to `dataset`.
    fn collect(&mut self, dataset: &mut FactSet) -> anyhow::Result<()>;

    /// Removes this producer's scratch files and superseded per-unit
    /// results. Invoked only after a fully successful run; an aborted run
    /// keeps its partial cache for the next attempt. Best-effort.
    fn clear(&mut self);
}

/// Explicit name-to-producer collection with dependency ordering.
#[derive(Default)]
pub struct ProducerRegistry {
    producers: Vec<Box<dyn Producer>>,
}

impl ProducerRegistry {
    pub fn new() -> Self {
        ProducerRegistry::default()
    }

    /// Adds a producer; names must be unique.
    pub fn register(&mut self, producer: Box<dyn Producer>) -> Result<()> {
        if self.producers.iter().any(|p| p.name() == producer.name()) {
            return Err(QcError::DuplicateProducer { name: producer.name().to_string() });
        }
        self.producers.push(producer);
        Ok(())
    }

    /// Registered names, in registration order.
    pub fn names(&self) -> Vec<&'static str> {
        self.producers.iter().map(|p| p.name()).collect()
    }

    fn index_of(&self, name: &str) -> Result<usize> {
        self.producers.iter().position(|p| p.name() == name).ok_or_else(|| {
            QcError::ProducerDependencies { reason: format!("unknown producer '{name}'") }
        })
    }

    /// Expands `requested` with its transitive dependencies and orders the
    /// result so every producer follows its dependencies, with summary
    /// producers last. Fails on an unknown name or a dependency cycle.
    pub fn resolve(&self, requested: &[&str]) -> Result<Vec<usize>> {
        // Transitive closure of the requested set.
        let mut selected: Vec<usize> = Vec::new();
        let mut pending: Vec<usize> = Vec::new();
        let mut seen: HashSet<usize> = HashSet::new();
        for name in requested {
            let index = self.index_of(name)?;
            if seen.insert(index) {
                pending.push(index);
            }
        }
        while let Some(index) = pending.pop() {
            selected.push(index);
            for dep in self.producers[index].required_producers() {
                let dep_index = self.index_of(dep)?;
                if seen.insert(dep_index) {
                    pending.push(dep_index);
                }
            }
        }
        selected.sort_unstable();

        // Repeated passes: place a producer once all its dependencies are
        // placed. No progress in a full pass means a cycle.
        let mut ordered: Vec<usize> = Vec::with_capacity(selected.len());
        let mut placed: HashSet<&str> = HashSet::new();
        let mut remaining = selected;
        while !remaining.is_empty() {
            let before = remaining.len();
            remaining.retain(|&index| {
                let producer = &self.producers[index];
                let ready = producer
                    .required_producers()
                    .iter()
                    .all(|dep| placed.contains(dep));
                if ready {
                    placed.insert(producer.name());
                    ordered.push(index);
                }
                !ready
            });
            if remaining.len() == before {
                let names: Vec<&str> =
                    remaining.iter().map(|&i| self.producers[i].name()).collect();
                return Err(QcError::ProducerDependencies {
                    reason: format!("dependency cycle among: {}", names.join(", ")),
                });
            }
        }

        // Summary producers after every per-unit producer, keeping the
        // dependency order within each group.
        let (summary, per_unit): (Vec<usize>, Vec<usize>) =
            ordered.into_iter().partition(|&i| self.producers[i].is_summary());
        Ok(per_unit.into_iter().chain(summary).collect())
    }

    /// Configures and runs `requested` (plus dependencies) in order, then
    /// removes scratch files and superseded per-unit results once everything
    /// succeeded.
    pub fn run_producers(
        &mut self,
        requested: &[&str],
        context: &QcContext,
        settings: &Settings,
        dataset: &mut FactSet,
    ) -> anyhow::Result<()> {
        let order = self.resolve(requested)?;
        for &index in &order {
            self.producers[index].configure(context, settings)?;
        }
        for &index in &order {
            let producer = &mut self.producers[index];
            info!("Running producer {}", producer.name());
            producer.collect(dataset)?;
        }
        for &index in &order {
            self.producers[index].clear();
        }
        Ok(())
    }
}
