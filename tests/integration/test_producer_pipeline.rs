//! Registry-driven producer pipeline tests using the built-in producers.

use runqc_lib::producers::builtin_registry;
use runqc_lib::producers::run_summary::SUMMARY_FILE;
use runqc_lib::settings::{QcContext, Settings};

use crate::helpers::{generate_run, RunFixture};

fn context(fixture: &RunFixture) -> QcContext {
    QcContext {
        run_id: "RUNTEST".to_string(),
        fastq_dir: fixture.fastq_dir.path().to_path_buf(),
        report_dir: fixture.report_dir.path().to_path_buf(),
        tmp_dir: fixture.tmp_dir.path().to_path_buf(),
    }
}

#[test]
fn test_summary_pulls_in_fastqstats_and_aggregates() {
    let fixture = generate_run(2, &["S1", "S2"], 50);
    let mut dataset = fixture.dataset.clone();

    // Requesting only the summary producer runs fastqstats first.
    let mut registry = builtin_registry().unwrap();
    registry
        .run_producers(&["runsummary"], &context(&fixture), &Settings::new(), &mut dataset)
        .unwrap();

    assert_eq!(dataset.keys_with_prefix("fastqstats.").count(), 4 * 4);
    assert_eq!(dataset.get_int("runsummary.unit.count").unwrap(), 4);
    assert_eq!(dataset.get_int("runsummary.total.file.count").unwrap(), 4);
    assert_eq!(dataset.get_int("runsummary.total.compressed.size").unwrap(), 200);
    // gzip inputs estimated at 7x the compressed size
    assert_eq!(dataset.get_int("runsummary.total.estimated.size").unwrap(), 1400);

    assert!(fixture.report_dir.path().join(SUMMARY_FILE).is_file());
    // End-of-run cleanup removed the per-unit cache entries and artifacts.
    assert!(fixture.cache_entries().is_empty());
    assert!(!fixture
        .report_dir
        .path()
        .join("Project_ProjX")
        .join("lane1.read1.S1-fastqstats.txt")
        .exists());
}

#[test]
fn test_successful_run_clears_cache_then_rerun_recomputes() {
    let fixture = generate_run(1, &["S1", "S2"], 50);

    let mut first = fixture.dataset.clone();
    let mut registry = builtin_registry().unwrap();
    registry
        .run_producers(&["runsummary"], &context(&fixture), &Settings::new(), &mut first)
        .unwrap();
    assert!(
        fixture.cache_entries().is_empty(),
        "cache entries remain after a fully successful run: {:?}",
        fixture.cache_entries()
    );

    // A later run starts from a clean tree and reproduces the same dataset.
    let mut second = fixture.dataset.clone();
    let mut registry = builtin_registry().unwrap();
    registry
        .run_producers(&["runsummary"], &context(&fixture), &Settings::new(), &mut second)
        .unwrap();
    assert_eq!(second, first);
}

#[test]
fn test_excluded_lane_is_skipped_everywhere() {
    let fixture = generate_run(2, &["S1"], 50);
    let mut settings = Settings::new();
    settings.set("qc.conf.fastqstats.excluded.lanes", "2");

    let mut dataset = fixture.dataset.clone();
    let mut registry = builtin_registry().unwrap();
    registry
        .run_producers(&["runsummary"], &context(&fixture), &settings, &mut dataset)
        .unwrap();

    assert_eq!(dataset.get_int("runsummary.unit.count").unwrap(), 1);
    assert!(dataset.keys_with_prefix("fastqstats.lane2.").next().is_none());
}

#[test]
fn test_invalid_settings_abort_before_any_unit() {
    let fixture = generate_run(1, &["S1"], 50);
    let mut settings = Settings::new();
    settings.set("qc.conf.threads", "0");

    let mut dataset = fixture.dataset.clone();
    let mut registry = builtin_registry().unwrap();
    let error = registry
        .run_producers(&["runsummary"], &context(&fixture), &settings, &mut dataset)
        .unwrap_err();
    assert!(format!("{error:#}").contains("qc.conf"));
    assert!(fixture.cache_entries().is_empty());
}
