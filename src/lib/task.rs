//! Per-unit analysis tasks.
//!
//! An [`AnalysisTask`] pairs one [`SampleUnit`] with a pluggable
//! [`UnitComputation`] and the fact set the computation fills. Tasks are
//! shared-nothing: each owns its facts exclusively until the engine merges
//! them, and never touches global state. `run` executes at most once and
//! converts every failure mode, panics included, into a captured error that
//! the engine surfaces at its join point.

use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::anyhow;
use log::debug;

use crate::errors::{QcError, Result};
use crate::facts::FactSet;
use crate::sample::SampleUnit;

/// The pluggable per-unit computation a producer supplies.
///
/// Given the unit and its report directory, fills `facts` with namespaced
/// keys and may write report artifacts under `report_dir` as a side effect.
pub trait UnitComputation: Send {
    fn compute(&self, unit: &SampleUnit, report_dir: &Path, facts: &mut FactSet)
        -> anyhow::Result<()>;
}

impl<F> UnitComputation for F
where
    F: Fn(&SampleUnit, &Path, &mut FactSet) -> anyhow::Result<()> + Send,
{
    fn compute(
        &self,
        unit: &SampleUnit,
        report_dir: &Path,
        facts: &mut FactSet,
    ) -> anyhow::Result<()> {
        self(unit, report_dir, facts)
    }
}

/// Decides per unit whether to create a task.
///
/// Returning `Ok(None)` means the unit is intentionally skipped (wrong read
/// parity, excluded lane, and so on): logged by the caller, never an error.
pub trait UnitTaskFactory {
    fn create_task(
        &self,
        dataset: &FactSet,
        unit: &SampleUnit,
        report_dir: &Path,
        paired: bool,
    ) -> anyhow::Result<Option<AnalysisTask>>;
}

/// One run of a [`UnitComputation`] over one [`SampleUnit`].
pub struct AnalysisTask {
    unit: SampleUnit,
    report_dir: PathBuf,
    computation: Box<dyn UnitComputation>,
    facts: FactSet,
    executed: bool,
    success: bool,
    failure: Option<anyhow::Error>,
}

impl AnalysisTask {
    /// Creates a task. Fails when the unit has no input files; the engine
    /// filters those out before construction, so reaching this is a bug in
    /// the calling producer.
    pub fn new(
        unit: SampleUnit,
        report_dir: impl Into<PathBuf>,
        computation: Box<dyn UnitComputation>,
    ) -> Result<Self> {
        if unit.files().is_empty() {
            return Err(QcError::EmptyFileSet { unit: unit.key() });
        }
        Ok(AnalysisTask {
            unit,
            report_dir: report_dir.into(),
            computation,
            facts: FactSet::new(),
            executed: false,
            success: false,
            failure: None,
        })
    }

    /// The unit this task analyzes.
    pub fn unit(&self) -> &SampleUnit {
        &self.unit
    }

    /// Executes the computation exactly once. Errors and panics are captured
    /// on the task and never escape; a repeated call is a no-op.
    pub fn run(&mut self) {
        if self.executed {
            return;
        }
        self.executed = true;
        debug!("Start processing {}", self.unit);
        let start = Instant::now();
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            self.computation.compute(&self.unit, &self.report_dir, &mut self.facts)
        }));
        match outcome {
            Ok(Ok(())) => self.success = true,
            Ok(Err(error)) => self.failure = Some(error),
            Err(payload) => {
                let msg = payload
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| payload.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                self.failure = Some(anyhow!("computation panicked: {msg}"));
            }
        }
        if !self.success {
            // A failed unit contributes nothing to the dataset.
            self.facts = FactSet::new();
        }
        debug!(
            "End processing {} in {:.1}s (success: {})",
            self.unit,
            start.elapsed().as_secs_f64(),
            self.success
        );
    }

    /// True after a successful `run`.
    pub fn is_success(&self) -> bool {
        self.success
    }

    /// The facts produced by a successful run; empty before `run` or after a
    /// failure.
    pub fn facts(&self) -> &FactSet {
        &self.facts
    }

    /// Consumes the task, yielding its facts.
    pub fn into_facts(self) -> FactSet {
        self.facts
    }

    /// Takes the captured failure, if any.
    pub fn take_failure(&mut self) -> Option<anyhow::Error> {
        self.failure.take()
    }
}
