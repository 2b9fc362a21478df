//! End-to-end engine tests against the on-disk result cache.

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::bail;
use runqc_lib::cache::DiskResultCache;
use runqc_lib::engine::UnitEngine;
use runqc_lib::facts::FactSet;
use runqc_lib::sample::{EnumerationPolicy, SampleUnit};
use runqc_lib::task::{AnalysisTask, UnitTaskFactory};

use crate::helpers::{generate_run, RunFixture};

/// Factory that counts task creation and fails configured sample names.
struct CountingFactory {
    created: Arc<AtomicUsize>,
    failing: Vec<String>,
}

impl CountingFactory {
    fn new(failing: &[&str]) -> Self {
        CountingFactory {
            created: Arc::new(AtomicUsize::new(0)),
            failing: failing.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }
}

impl UnitTaskFactory for CountingFactory {
    fn create_task(
        &self,
        _dataset: &FactSet,
        unit: &SampleUnit,
        report_dir: &Path,
        _paired: bool,
    ) -> anyhow::Result<Option<AnalysisTask>> {
        self.created.fetch_add(1, Ordering::SeqCst);
        let fail = self.failing.iter().any(|s| unit.sample() == Some(s.as_str()));
        let task = AnalysisTask::new(
            unit.clone(),
            report_dir,
            Box::new(move |u: &SampleUnit, _: &Path, facts: &mut FactSet| {
                if fail {
                    bail!("unreadable FASTQ for {u}");
                }
                facts.put_int(format!("{}.file.count", u.fact_prefix("stats")), 1);
                Ok(())
            }),
        )?;
        Ok(Some(task))
    }
}

fn engine(fixture: &RunFixture, threads: usize) -> UnitEngine {
    let policy = EnumerationPolicy { include_undetermined: false, ..Default::default() };
    UnitEngine::new(
        "stats",
        fixture.fastq_dir.path(),
        fixture.report_dir.path(),
        threads,
        policy,
    )
    .with_shutdown_grace(Duration::from_secs(10))
}

/// 2 lanes x 3 samples x 1 non-indexed read at concurrency 4: 6 units run
/// and are cached; a re-run over the same tree executes zero tasks and
/// reproduces the same dataset.
#[test]
fn test_full_run_then_resume_from_cache() {
    let fixture = generate_run(2, &["S1", "S2", "S3"], 100);
    let cache = DiskResultCache::new(fixture.report_dir.path());

    let factory = CountingFactory::new(&[]);
    let mut dataset = fixture.dataset.clone();
    engine(&fixture, 4).run(&mut dataset, &cache, &factory).unwrap();

    assert_eq!(factory.created(), 6);
    assert_eq!(dataset.keys_with_prefix("stats.").count(), 6);
    assert_eq!(fixture.cache_entries().len(), 6);

    let factory = CountingFactory::new(&[]);
    let mut rerun = fixture.dataset.clone();
    engine(&fixture, 4).run(&mut rerun, &cache, &factory).unwrap();
    assert_eq!(factory.created(), 0);
    assert_eq!(rerun, dataset);
}

/// A failing unit in a serial run aborts before later units are created;
/// only entries completed before the failure are on disk; a later run with
/// the cause fixed recomputes only the uncached units.
#[test]
fn test_failure_leaves_partial_cache_then_selective_recompute() {
    let fixture = generate_run(2, &["S1", "S2", "S3"], 100);
    let cache = DiskResultCache::new(fixture.report_dir.path());

    let failing = CountingFactory::new(&["S2"]);
    let mut dataset = fixture.dataset.clone();
    let error = engine(&fixture, 1).run(&mut dataset, &cache, &failing).unwrap_err();
    assert!(format!("{error:#}").contains("unreadable FASTQ"));

    // lane1/S1 completed before lane1/S2 failed.
    assert_eq!(failing.created(), 2);
    let cached = fixture.cache_entries();
    assert_eq!(cached, vec!["stats_lane1.read1.S1.data"]);

    let fixed = CountingFactory::new(&[]);
    let mut dataset = fixture.dataset.clone();
    engine(&fixture, 1).run(&mut dataset, &cache, &fixed).unwrap();
    assert_eq!(fixed.created(), 5);
    assert_eq!(fixture.cache_entries().len(), 6);
    assert_eq!(dataset.keys_with_prefix("stats.").count(), 6);
}

/// In a parallel run the first failure is surfaced, failed or pending units
/// are never merged, and the merged dataset agrees with the cache contents.
#[test]
fn test_parallel_failure_merges_only_confirmed_units() {
    let fixture = generate_run(2, &["S1", "S2", "S3"], 100);
    let cache = DiskResultCache::new(fixture.report_dir.path());

    let factory = CountingFactory::new(&["S3"]);
    let mut dataset = fixture.dataset.clone();
    let error = engine(&fixture, 4).run(&mut dataset, &cache, &factory).unwrap_err();
    assert!(format!("{error:#}").contains("unreadable FASTQ"));

    let merged = dataset.keys_with_prefix("stats.").count();
    assert_eq!(merged, fixture.cache_entries().len());
    assert!(dataset.keys_with_prefix("stats.").all(|k| !k.contains(".sample.S3.")));
}
