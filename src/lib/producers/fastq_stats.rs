//! File-level FASTQ statistics, one unit at a time.
//!
//! For every sample unit this producer records file count, compressed size,
//! compression type and an estimated uncompressed size, and writes a small
//! per-unit report artifact. It is the simplest engine-driven producer and
//! the template for the heavier metric producers.

use std::fmt;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::Context;
use log::warn;

use crate::cache::{remove_producer_files, DiskResultCache};
use crate::engine::UnitEngine;
use crate::errors::Result;
use crate::facts::FactSet;
use crate::producer::Producer;
use crate::sample::{EnumerationPolicy, SampleUnit};
use crate::settings::{QcContext, Settings, CONF_PREFIX};
use crate::task::{AnalysisTask, UnitTaskFactory};

/// Producer name, also the fact namespace and cache-entry prefix.
pub const NAME: &str = "fastqstats";

/// Prefix of scratch files this producer may leave in the tmp directory.
const TMP_PREFIX: &str = "runqc_tmp_fastqstats_";

/// Compression of a FASTQ file, with the empirical uncompressed-size ratio
/// used to estimate disk needs without reading the file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionType {
    Gzip,
    Bzip2,
    None,
}

impl CompressionType {
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some("gz") => CompressionType::Gzip,
            Some("bz2") => CompressionType::Bzip2,
            _ => CompressionType::None,
        }
    }

    /// Estimated uncompressed-to-compressed size ratio.
    pub fn ratio(&self) -> f64 {
        match self {
            CompressionType::Gzip => 7.0,
            CompressionType::Bzip2 => 5.0,
            CompressionType::None => 1.0,
        }
    }
}

impl fmt::Display for CompressionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CompressionType::Gzip => "gzip",
            CompressionType::Bzip2 => "bzip2",
            CompressionType::None => "none",
        };
        write!(f, "{name}")
    }
}

/// Computes the per-unit statistics and writes the report artifact.
struct FastqStatsComputation;

impl crate::task::UnitComputation for FastqStatsComputation {
    fn compute(
        &self,
        unit: &SampleUnit,
        report_dir: &Path,
        facts: &mut FactSet,
    ) -> anyhow::Result<()> {
        let compression = CompressionType::from_path(&unit.files()[0]);
        let mut compressed_size = 0u64;
        for file in unit.files() {
            let metadata = std::fs::metadata(file)
                .with_context(|| format!("unable to stat {}", file.display()))?;
            compressed_size += metadata.len();
        }
        let estimated_size = (compressed_size as f64 * compression.ratio()) as u64;

        let prefix = unit.fact_prefix(NAME);
        facts.put_int(format!("{prefix}.file.count"), unit.files().len() as i64);
        facts.put_int(format!("{prefix}.compressed.size"), compressed_size as i64);
        facts.put(format!("{prefix}.compression.type"), compression.to_string());
        facts.put_int(format!("{prefix}.estimated.size"), estimated_size as i64);

        let artifact = report_dir.join(format!("{}-{NAME}.txt", unit.key()));
        let mut out = File::create(&artifact)
            .with_context(|| format!("unable to create {}", artifact.display()))?;
        writeln!(out, "unit\t{unit}")?;
        writeln!(out, "files\t{}", unit.files().len())?;
        writeln!(out, "compressed.size\t{compressed_size}")?;
        writeln!(out, "compression\t{compression}")?;
        writeln!(out, "estimated.size\t{estimated_size}")?;
        Ok(())
    }
}

/// Skips excluded lanes, otherwise hands every unit to the computation.
struct FastqStatsFactory {
    excluded_lanes: Vec<i64>,
}

impl UnitTaskFactory for FastqStatsFactory {
    fn create_task(
        &self,
        _dataset: &FactSet,
        unit: &SampleUnit,
        report_dir: &Path,
        _paired: bool,
    ) -> anyhow::Result<Option<AnalysisTask>> {
        if self.excluded_lanes.contains(&(unit.lane() as i64)) {
            return Ok(None);
        }
        let task = AnalysisTask::new(unit.clone(), report_dir, Box::new(FastqStatsComputation))?;
        Ok(Some(task))
    }
}

/// The `fastqstats` producer.
pub struct FastqStatsProducer {
    engine: Option<UnitEngine>,
    report_dir: PathBuf,
    tmp_dir: PathBuf,
    excluded_lanes: Vec<i64>,
}

impl FastqStatsProducer {
    pub fn new() -> Self {
        FastqStatsProducer {
            engine: None,
            report_dir: PathBuf::new(),
            tmp_dir: PathBuf::new(),
            excluded_lanes: Vec::new(),
        }
    }
}

impl Default for FastqStatsProducer {
    fn default() -> Self {
        FastqStatsProducer::new()
    }
}

impl Producer for FastqStatsProducer {
    fn name(&self) -> &'static str {
        NAME
    }

    fn configure(&mut self, context: &QcContext, settings: &Settings) -> Result<()> {
        let threads = settings.threads_for(NAME)?;
        let policy = EnumerationPolicy {
            include_samples: true,
            include_undetermined: settings
                .get_bool_or(&format!("{CONF_PREFIX}process.undetermined.samples"), true)?,
            all_reads: settings.get_bool_or(&format!("{CONF_PREFIX}process.all.reads"), true)?,
        };
        self.excluded_lanes =
            settings.get_int_list(&format!("{CONF_PREFIX}{NAME}.excluded.lanes"))?;
        self.report_dir = context.report_dir.clone();
        self.tmp_dir = context.tmp_dir.clone();
        if self.engine.is_none() {
            self.engine = Some(UnitEngine::new(
                NAME,
                &context.fastq_dir,
                &context.report_dir,
                threads,
                policy,
            ));
        }
        Ok(())
    }

    fn collect(&mut self, dataset: &mut FactSet) -> anyhow::Result<()> {
        let cache = DiskResultCache::new(&self.report_dir);
        let factory = FastqStatsFactory { excluded_lanes: self.excluded_lanes.clone() };
        let engine = self.engine.as_mut().expect("configure must run before collect");
        engine.run(dataset, &cache, &factory)
    }

    fn clear(&mut self) {
        // Superseded per-unit results first, then scratch files.
        remove_producer_files(&self.report_dir, NAME);
        let Ok(entries) = std::fs::read_dir(&self.tmp_dir) else { return };
        for entry in entries.flatten() {
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.starts_with(TMP_PREFIX) {
                if let Err(error) = std::fs::remove_file(entry.path()) {
                    warn!("Unable to remove {}: {error}", entry.path().display());
                }
            }
        }
    }
}
