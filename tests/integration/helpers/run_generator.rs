//! Generates small demultiplexed run trees for integration tests.

#![allow(dead_code)]

use std::path::{Path, PathBuf};

use runqc_lib::facts::FactSet;
use tempfile::TempDir;

/// A run laid out on disk: fact dataset, FASTQ tree and report directory.
pub struct RunFixture {
    pub dataset: FactSet,
    pub fastq_dir: TempDir,
    pub report_dir: TempDir,
    pub tmp_dir: TempDir,
}

/// Builds a run with `lanes` lanes, the given samples per lane and one
/// non-indexed read. Every sample gets one gzip FASTQ file of
/// `file_size` bytes in project `ProjX`.
pub fn generate_run(lanes: usize, samples: &[&str], file_size: usize) -> RunFixture {
    let mut dataset = FactSet::new();
    dataset.put("run.id", "RUNTEST");
    dataset.put_int("run.info.flow.cell.lane.count", lanes as i64);
    dataset.put_int("run.info.read.count", 1);
    dataset.put_bool("run.info.read1.indexed", false);

    let fastq_dir = TempDir::new().unwrap();
    let project = fastq_dir.path().join("ProjX");
    std::fs::create_dir_all(&project).unwrap();

    for lane in 1..=lanes {
        dataset.put(format!("samplesheet.lane{lane}.samples"), samples.join(","));
        for (i, sample) in samples.iter().enumerate() {
            let sheet = format!("samplesheet.lane{lane}.sample.{sample}");
            dataset.put(format!("{sheet}.project"), "ProjX");
            dataset.put(format!("{sheet}.description"), "fixture sample");
            dataset.put(format!("{sheet}.index"), "ACGTACGT");
            dataset.put_int(
                format!("demux.lane{lane}.sample.{sample}.read1.raw.cluster.count"),
                1000,
            );
            std::fs::write(
                project.join(format!("{sample}_S{}_L{lane:03}_R1_001.fastq.gz", i + 1)),
                vec![0u8; file_size],
            )
            .unwrap();
        }
    }

    RunFixture {
        dataset,
        fastq_dir,
        report_dir: TempDir::new().unwrap(),
        tmp_dir: TempDir::new().unwrap(),
    }
}

impl RunFixture {
    /// Writes the dataset as a run data file and returns its path.
    pub fn write_run_data(&self, dir: &Path) -> PathBuf {
        let path = dir.join("run-data.txt");
        self.dataset.write_file(&path).unwrap();
        path
    }

    /// Cache entries present under the report tree, by file name.
    pub fn cache_entries(&self) -> Vec<String> {
        let mut entries = Vec::new();
        let Ok(subdirs) = std::fs::read_dir(self.report_dir.path()) else { return entries };
        for subdir in subdirs.flatten() {
            if !subdir.path().is_dir() {
                continue;
            }
            for entry in std::fs::read_dir(subdir.path()).unwrap().flatten() {
                let name = entry.file_name().to_string_lossy().into_owned();
                if name.ends_with(".data") {
                    entries.push(name);
                }
            }
        }
        entries.sort();
        entries
    }
}
