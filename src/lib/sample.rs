//! Sample units and their enumeration from run-wide facts.
//!
//! A [`SampleUnit`] is one (lane, read, sample-or-undetermined) combination
//! to analyze, together with its demultiplexed FASTQ files. The full unit
//! set for a run is derived once from the fact dataset; each engine caches
//! it for the run's lifetime.

use std::fmt;
use std::path::{Path, PathBuf};

use log::warn;

use crate::errors::Result;
use crate::facts::FactSet;

/// Directory name used for reads unassigned to any sample.
pub const UNDETERMINED_DIR: &str = "Undetermined_indices";

/// Sample-name sentinel used in demultiplexed FASTQ file names.
const UNDETERMINED_SAMPLE: &str = "Undetermined";

/// Immutable descriptor of one unit of analysis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleUnit {
    lane: usize,
    read: usize,
    /// `None` for the per-lane undetermined bucket.
    sample: Option<String>,
    project: Option<String>,
    description: String,
    barcode: String,
    files: Vec<PathBuf>,
}

impl SampleUnit {
    /// Builds a unit for an ordinary demultiplexed sample.
    pub fn new_sample(
        lane: usize,
        read: usize,
        sample: impl Into<String>,
        project: impl Into<String>,
        description: impl Into<String>,
        barcode: impl Into<String>,
        files: Vec<PathBuf>,
    ) -> Self {
        SampleUnit {
            lane,
            read,
            sample: Some(sample.into()),
            project: Some(project.into()),
            description: description.into(),
            barcode: barcode.into(),
            files,
        }
    }

    /// Builds a unit for a lane's undetermined bucket.
    pub fn new_undetermined(lane: usize, read: usize, files: Vec<PathBuf>) -> Self {
        SampleUnit {
            lane,
            read,
            sample: None,
            project: None,
            description: String::new(),
            barcode: String::new(),
            files,
        }
    }

    /// Lane number (1-based).
    pub fn lane(&self) -> usize {
        self.lane
    }

    /// Read number (1-based, as sequenced).
    pub fn read(&self) -> usize {
        self.read
    }

    /// Sample name, or `None` for the undetermined bucket.
    pub fn sample(&self) -> Option<&str> {
        self.sample.as_deref()
    }

    /// Project name, or `None` for the undetermined bucket.
    pub fn project(&self) -> Option<&str> {
        self.project.as_deref()
    }

    /// Free-form sample description from the sample sheet.
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Barcode sequence from the sample sheet.
    pub fn barcode(&self) -> &str {
        &self.barcode
    }

    /// Input files, in discovery order.
    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    /// True for the per-lane undetermined bucket.
    pub fn is_undetermined(&self) -> bool {
        self.sample.is_none()
    }

    /// Identity key, unique within a run: `lane{l}.read{r}.{sample}`.
    pub fn key(&self) -> String {
        format!(
            "lane{}.read{}.{}",
            self.lane,
            self.read,
            self.sample.as_deref().unwrap_or("undetermined")
        )
    }

    /// Fact-key prefix for this unit under a producer namespace:
    /// `{producer}.lane{l}.sample.{s}.read{r}`.
    pub fn fact_prefix(&self, producer: &str) -> String {
        format!(
            "{producer}.lane{}.sample.{}.read{}",
            self.lane,
            self.sample.as_deref().unwrap_or("undetermined"),
            self.read
        )
    }

    /// Report subdirectory name: `Project_{p}` or the undetermined sentinel.
    pub fn report_subdir(&self) -> String {
        match &self.project {
            Some(project) => format!("Project_{project}"),
            None => UNDETERMINED_DIR.to_string(),
        }
    }
}

impl fmt::Display for SampleUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.key())
    }
}

/// Which units enumeration includes.
#[derive(Debug, Clone, Copy)]
pub struct EnumerationPolicy {
    /// Include ordinary demultiplexed samples.
    pub include_samples: bool,
    /// Include each lane's undetermined bucket.
    pub include_undetermined: bool,
    /// Enumerate every non-indexed read, or only the first.
    pub all_reads: bool,
}

impl Default for EnumerationPolicy {
    fn default() -> Self {
        EnumerationPolicy { include_samples: true, include_undetermined: true, all_reads: true }
    }
}

/// Enumerates the complete, deduplicated unit set for a run.
///
/// Reads lane/read layout and per-lane sample lists from `dataset` and
/// locates each unit's FASTQ files under `fastq_dir`. A lane/sample/read
/// combination without demultiplexing counters in the dataset is excluded
/// with a warning; a unit whose files are simply absent on disk is kept with
/// an empty file list and skipped later by the engine.
pub fn enumerate_units(
    dataset: &FactSet,
    fastq_dir: &Path,
    policy: &EnumerationPolicy,
) -> Result<Vec<SampleUnit>> {
    let lane_count = dataset.get_int("run.info.flow.cell.lane.count")? as usize;
    let read_count = dataset.get_int("run.info.read.count")? as usize;

    let mut units = Vec::new();
    let mut seen = std::collections::HashSet::new();
    let mut data_read_ordinal = 0;

    for read in 1..=read_count {
        let indexed = dataset.get_bool(&format!("run.info.read{read}.indexed"))?;
        if indexed {
            continue;
        }
        data_read_ordinal += 1;
        if !policy.all_reads && data_read_ordinal > 1 {
            break;
        }

        for lane in 1..=lane_count {
            if policy.include_samples {
                let samples = dataset
                    .get(&format!("samplesheet.lane{lane}.samples"))
                    .unwrap_or_default()
                    .split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(String::from)
                    .collect::<Vec<_>>();

                for sample in samples {
                    let counter_key = format!(
                        "demux.lane{lane}.sample.{sample}.read{read}.raw.cluster.count"
                    );
                    if !dataset.contains(&counter_key) {
                        warn!(
                            "No demultiplexing counters for sample {sample} lane {lane} \
                             read {read}, excluded from analysis"
                        );
                        continue;
                    }
                    let sheet = format!("samplesheet.lane{lane}.sample.{sample}");
                    let project =
                        dataset.get(&format!("{sheet}.project")).unwrap_or_default().to_string();
                    let description = dataset
                        .get(&format!("{sheet}.description"))
                        .unwrap_or_default()
                        .to_string();
                    let barcode =
                        dataset.get(&format!("{sheet}.index")).unwrap_or_default().to_string();

                    let files =
                        find_fastq_files(&fastq_dir.join(&project), &sample, lane, read)?;
                    let unit = SampleUnit::new_sample(
                        lane,
                        read,
                        sample,
                        project,
                        description,
                        barcode,
                        files,
                    );
                    if seen.insert(unit.key()) {
                        units.push(unit);
                    }
                }
            }

            if policy.include_undetermined {
                let undetermined = dataset
                    .get_bool(&format!("demux.lane{lane}.undetermined"))
                    .unwrap_or(false);
                if undetermined {
                    let files =
                        find_fastq_files(fastq_dir, UNDETERMINED_SAMPLE, lane, read)?;
                    let unit = SampleUnit::new_undetermined(lane, read, files);
                    if seen.insert(unit.key()) {
                        units.push(unit);
                    }
                }
            }
        }
    }

    Ok(units)
}

/// Locates demultiplexed FASTQ files by the bcl2fastq2 naming convention
/// `{sample}_S{n}_L00{lane}_R{read}_{chunk}.fastq[.gz|.bz2]`, sorted by name.
fn find_fastq_files(
    dir: &Path,
    sample: &str,
    lane: usize,
    read: usize,
) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let prefix = format!("{sample}_S");
    let infix = format!("_L{lane:03}_R{read}_");
    let mut files = Vec::new();
    let entries = std::fs::read_dir(dir).map_err(|e| crate::errors::QcError::io(dir, e))?;
    for entry in entries {
        let entry = entry.map_err(|e| crate::errors::QcError::io(dir, e))?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.starts_with(&prefix) && name.contains(&infix) {
            files.push(entry.path());
        }
    }
    files.sort();
    Ok(files)
}
