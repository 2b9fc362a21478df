//! Integration tests for the collect and inspect commands.

use std::process::Command;

use runqc_lib::facts::FactSet;

use crate::helpers::{generate_run, RunFixture};

fn run_collect(fixture: &RunFixture, extra_args: &[&str]) -> std::process::ExitStatus {
    let run_data = fixture.write_run_data(fixture.tmp_dir.path());
    Command::new(env!("CARGO_BIN_EXE_runqc"))
        .args([
            "collect",
            "-d",
            run_data.to_str().unwrap(),
            "-f",
            fixture.fastq_dir.path().to_str().unwrap(),
            "-o",
            fixture.report_dir.path().to_str().unwrap(),
            "--tmp-dir",
            fixture.tmp_dir.path().to_str().unwrap(),
            "-t",
            "2",
        ])
        .args(extra_args)
        .status()
        .expect("Failed to run collect command")
}

#[test]
fn test_collect_writes_merged_dataset() {
    let fixture = generate_run(2, &["S1", "S2"], 50);
    let status = run_collect(&fixture, &[]);
    assert!(status.success(), "Collect command failed");

    let data_file = fixture.report_dir.path().join("data-RUNTEST.txt");
    assert!(data_file.is_file(), "Merged dataset not written");

    let merged = FactSet::load_file(&data_file).unwrap();
    // Input facts plus producer facts survive the round trip.
    assert_eq!(merged.get("run.id"), Some("RUNTEST"));
    assert_eq!(merged.get_int("runsummary.unit.count").unwrap(), 4);
    assert_eq!(merged.keys_with_prefix("fastqstats.").count(), 16);
    // End-of-run cleanup removed the per-unit cache entries.
    assert!(fixture.cache_entries().is_empty());
}

#[test]
fn test_collect_is_idempotent() {
    let fixture = generate_run(1, &["S1"], 50);
    assert!(run_collect(&fixture, &[]).success());
    let first =
        FactSet::load_file(&fixture.report_dir.path().join("data-RUNTEST.txt")).unwrap();

    assert!(run_collect(&fixture, &[]).success());
    let second =
        FactSet::load_file(&fixture.report_dir.path().join("data-RUNTEST.txt")).unwrap();
    assert_eq!(second, first);
}

#[test]
fn test_collect_clean_first_discards_stale_entries() {
    let fixture = generate_run(1, &["S1"], 50);
    // Leftover entry from an interrupted run, holding outdated facts.
    let project = fixture.report_dir.path().join("Project_ProjX");
    std::fs::create_dir_all(&project).unwrap();
    std::fs::write(
        project.join("fastqstats_lane1.read1.S1.data"),
        "fastqstats.lane1.sample.S1.read1.file.count=999\n",
    )
    .unwrap();

    assert!(run_collect(&fixture, &["--clean-first"]).success());
    let merged =
        FactSet::load_file(&fixture.report_dir.path().join("data-RUNTEST.txt")).unwrap();
    // The stale entry was discarded and the unit recomputed.
    assert_eq!(
        merged.get_int("fastqstats.lane1.sample.S1.read1.file.count").unwrap(),
        1
    );
}

#[test]
fn test_collect_single_producer_selection() {
    let fixture = generate_run(1, &["S1"], 50);
    let status = run_collect(&fixture, &["-p", "fastqstats"]);
    assert!(status.success());

    let merged =
        FactSet::load_file(&fixture.report_dir.path().join("data-RUNTEST.txt")).unwrap();
    assert!(merged.keys_with_prefix("fastqstats.").count() > 0);
    assert!(!merged.contains("runsummary.unit.count"));
}

#[test]
fn test_collect_missing_run_data_fails() {
    let fixture = generate_run(1, &["S1"], 50);
    let status = Command::new(env!("CARGO_BIN_EXE_runqc"))
        .args([
            "collect",
            "-d",
            fixture.tmp_dir.path().join("absent.txt").to_str().unwrap(),
            "-f",
            fixture.fastq_dir.path().to_str().unwrap(),
            "-o",
            fixture.report_dir.path().to_str().unwrap(),
        ])
        .status()
        .expect("Failed to run collect command");
    assert!(!status.success(), "Collect must fail on a missing run data file");
}

#[test]
fn test_inspect_filters_by_prefix() {
    let fixture = generate_run(1, &["S1"], 50);
    assert!(run_collect(&fixture, &[]).success());

    let output = Command::new(env!("CARGO_BIN_EXE_runqc"))
        .args([
            "inspect",
            "-i",
            fixture.report_dir.path().join("data-RUNTEST.txt").to_str().unwrap(),
            "--prefix",
            "runsummary.",
        ])
        .output()
        .expect("Failed to run inspect command");
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains("runsummary.unit.count=1"));
    assert!(!stdout.contains("fastqstats."));
}
