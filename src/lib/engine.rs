//! The execution coordinator.
//!
//! [`UnitEngine::run`] enumerates sample units, resolves each against the
//! result cache, dispatches cache misses through a [`TaskRunner`] and merges
//! each successful unit's facts into the run-wide dataset after persisting
//! them. The failure contract is fail-fast: the first failed unit aborts the
//! whole batch, queued work is cancelled and the first captured error is
//! returned. Units confirmed successful before the failure stay merged and
//! cached; units still pending are never merged.
//!
//! There is no per-unit timeout. A hung computation blocks the run; only
//! after a failure does the bounded grace period cap how long shutdown
//! waits for in-flight work.

use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use log::{debug, info, warn};

use crate::cache::ResultCache;
use crate::executor::TaskRunner;
use crate::facts::FactSet;
use crate::sample::{enumerate_units, EnumerationPolicy, SampleUnit};
use crate::task::{AnalysisTask, UnitTaskFactory};

/// How long shutdown waits for in-flight work after a failure.
pub const DEFAULT_SHUTDOWN_GRACE: Duration = Duration::from_secs(60 * 60);

/// Per-producer coordinator over the run's sample units.
pub struct UnitEngine {
    producer: String,
    fastq_dir: PathBuf,
    report_dir: PathBuf,
    threads: usize,
    policy: EnumerationPolicy,
    grace: Duration,
    /// Enumerated once per run; `Some` after the first `run` call.
    units: Option<Vec<SampleUnit>>,
}

impl UnitEngine {
    pub fn new(
        producer: impl Into<String>,
        fastq_dir: impl Into<PathBuf>,
        report_dir: impl Into<PathBuf>,
        threads: usize,
        policy: EnumerationPolicy,
    ) -> Self {
        UnitEngine {
            producer: producer.into(),
            fastq_dir: fastq_dir.into(),
            report_dir: report_dir.into(),
            threads,
            policy,
            grace: DEFAULT_SHUTDOWN_GRACE,
            units: None,
        }
    }

    /// Overrides the post-failure shutdown grace period.
    pub fn with_shutdown_grace(mut self, grace: Duration) -> Self {
        self.grace = grace;
        self
    }

    /// The enumerated units, once `run` has been called.
    pub fn units(&self) -> Option<&[SampleUnit]> {
        self.units.as_deref()
    }

    /// Processes every unit and merges the results into `dataset`.
    ///
    /// Returns the first unit failure encountered, after cancelling pending
    /// work. On success every processed unit's facts are both in `dataset`
    /// and in `cache`, so a subsequent run over the same report tree
    /// executes zero tasks.
    pub fn run(
        &mut self,
        dataset: &mut FactSet,
        cache: &dyn ResultCache,
        factory: &dyn UnitTaskFactory,
    ) -> Result<()> {
        if self.units.is_none() {
            let units = enumerate_units(dataset, &self.fastq_dir, &self.policy)
                .context("sample unit enumeration failed")?;
            info!("{}: {} sample unit(s) to process", self.producer, units.len());
            self.units = Some(units);
        }
        let units = self.units.clone().unwrap_or_default();
        let paired = is_paired_run(dataset)?;

        let mut runner = TaskRunner::new(self.threads);
        let mut persisted: HashSet<String> = HashSet::new();
        let mut cache_hits = 0usize;
        let mut outstanding = 0usize;
        let mut first_failure: Option<anyhow::Error> = None;

        for unit in &units {
            if first_failure.is_some() {
                break;
            }
            if unit.files().is_empty() {
                debug!("{}: no input files for {unit}, skipped", self.producer);
                continue;
            }
            if let Some(facts) = cache.load(&self.producer, unit) {
                debug!("{}: cache hit for {unit}", self.producer);
                cache_hits += 1;
                dataset.merge(&facts);
                continue;
            }

            let unit_report_dir = self.report_dir.join(unit.report_subdir());
            std::fs::create_dir_all(&unit_report_dir).with_context(|| {
                format!("unable to create report directory {}", unit_report_dir.display())
            })?;

            match factory.create_task(dataset, unit, &unit_report_dir, paired)? {
                None => {
                    debug!("{}: {unit} intentionally skipped", self.producer);
                    continue;
                }
                Some(task) => {
                    runner.submit(task);
                    outstanding += 1;
                }
            }

            // React to completions already available so a failure aborts the
            // batch before the next submission. Inline mode completes here
            // every iteration, making serial runs abort immediately.
            while let Some(done) = runner.try_recv() {
                outstanding -= 1;
                if let Err(error) =
                    self.absorb(done, dataset, cache, &mut persisted)
                {
                    first_failure = Some(error);
                    runner.cancel();
                    break;
                }
            }
        }

        // Join point: wait for everything still in flight.
        while first_failure.is_none() && outstanding > 0 {
            match runner.recv() {
                Some(done) => {
                    outstanding -= 1;
                    if let Err(error) =
                        self.absorb(done, dataset, cache, &mut persisted)
                    {
                        first_failure = Some(error);
                        runner.cancel();
                    }
                }
                None => break,
            }
        }

        match first_failure {
            None => {
                runner.join();
                info!(
                    "{}: completed, {} unit(s) computed, {} from cache",
                    self.producer,
                    persisted.len(),
                    cache_hits
                );
                Ok(())
            }
            Some(error) => {
                // Results arriving after the first failure are never merged.
                let left = runner.drain(outstanding, self.grace);
                if left > 0 {
                    warn!(
                        "{}: {left} unit(s) still running after {}s grace period, abandoned",
                        self.producer,
                        self.grace.as_secs()
                    );
                }
                runner.abandon();
                Err(error.context(format!("{} failed", self.producer)))
            }
        }
    }

    /// Persists and merges one completed task, or yields its failure. The
    /// dedupe set guarantees at most one save per unit per run.
    fn absorb(
        &self,
        mut task: AnalysisTask,
        dataset: &mut FactSet,
        cache: &dyn ResultCache,
        persisted: &mut HashSet<String>,
    ) -> Result<()> {
        if task.is_success() {
            if persisted.insert(task.unit().key()) {
                cache.save(&self.producer, task.unit(), task.facts());
            }
            dataset.merge(task.facts());
            return Ok(());
        }
        match task.take_failure() {
            Some(error) => Err(error.context(format!("unit {} failed", task.unit()))),
            // Cancelled before it ran; not an error of its own.
            None => Ok(()),
        }
    }
}

/// A run is paired when it has more than one non-indexed read.
pub fn is_paired_run(dataset: &FactSet) -> crate::errors::Result<bool> {
    let read_count = dataset.get_int("run.info.read.count")?;
    let mut data_reads = 0;
    for read in 1..=read_count {
        if !dataset.get_bool(&format!("run.info.read{read}.indexed"))? {
            data_reads += 1;
        }
    }
    Ok(data_reads > 1)
}
