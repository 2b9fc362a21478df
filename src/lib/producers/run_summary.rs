//! Run-wide aggregation of the per-unit FASTQ statistics.
//!
//! A summary producer: it runs after every per-unit producer, folds the
//! `fastqstats` facts into run-wide totals and writes one TSV row per unit.

use std::path::PathBuf;

use anyhow::Context;
use fgoxide::io::DelimFile;
use serde::Serialize;

use crate::errors::Result;
use crate::facts::FactSet;
use crate::producer::Producer;
use crate::producers::fastq_stats;
use crate::settings::{QcContext, Settings};

/// Producer name.
pub const NAME: &str = "runsummary";

/// File name of the TSV report under the report directory.
pub const SUMMARY_FILE: &str = "runqc_summary.tsv";

/// One row of the summary TSV.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct UnitSummary {
    pub lane: usize,
    pub sample: String,
    pub read: usize,
    pub file_count: i64,
    pub compressed_size: i64,
    pub compression: String,
    pub estimated_size: i64,
}

/// The `runsummary` producer.
pub struct RunSummaryProducer {
    report_dir: PathBuf,
}

impl RunSummaryProducer {
    pub fn new() -> Self {
        RunSummaryProducer { report_dir: PathBuf::new() }
    }
}

impl Default for RunSummaryProducer {
    fn default() -> Self {
        RunSummaryProducer::new()
    }
}

impl Producer for RunSummaryProducer {
    fn name(&self) -> &'static str {
        NAME
    }

    fn required_producers(&self) -> &[&'static str] {
        &[fastq_stats::NAME]
    }

    fn is_summary(&self) -> bool {
        true
    }

    fn configure(&mut self, context: &QcContext, _settings: &Settings) -> Result<()> {
        self.report_dir = context.report_dir.clone();
        Ok(())
    }

    fn collect(&mut self, dataset: &mut FactSet) -> anyhow::Result<()> {
        let mut rows = unit_summaries(dataset)?;
        rows.sort_by(|a, b| {
            (a.lane, &a.sample, a.read).cmp(&(b.lane, &b.sample, b.read))
        });

        let prefix = NAME;
        dataset.put_int(format!("{prefix}.unit.count"), rows.len() as i64);
        dataset.put_int(
            format!("{prefix}.total.file.count"),
            rows.iter().map(|r| r.file_count).sum(),
        );
        dataset.put_int(
            format!("{prefix}.total.compressed.size"),
            rows.iter().map(|r| r.compressed_size).sum(),
        );
        dataset.put_int(
            format!("{prefix}.total.estimated.size"),
            rows.iter().map(|r| r.estimated_size).sum(),
        );

        let path = self.report_dir.join(SUMMARY_FILE);
        DelimFile::default()
            .write_tsv(&path, rows)
            .with_context(|| format!("Failed to write run summary: {}", path.display()))
    }

    fn clear(&mut self) {
        // The summary TSV is a product, not a temporary; nothing to remove.
    }
}

/// Extracts one [`UnitSummary`] per `fastqstats` unit namespace found in
/// `dataset`.
fn unit_summaries(dataset: &FactSet) -> anyhow::Result<Vec<UnitSummary>> {
    let namespace = format!("{}.", fastq_stats::NAME);
    let marker = ".file.count";
    let mut rows = Vec::new();
    let unit_prefixes: Vec<String> = dataset
        .keys_with_prefix(&namespace)
        .filter(|k| k.ends_with(marker))
        .map(|k| k[..k.len() - marker.len()].to_string())
        .collect();
    for prefix in unit_prefixes {
        let ident = &prefix[namespace.len()..];
        let (lane, sample, read) = parse_unit_ident(ident)
            .with_context(|| format!("malformed fact namespace '{prefix}'"))?;
        rows.push(UnitSummary {
            lane,
            sample,
            read,
            file_count: dataset.get_int(&format!("{prefix}.file.count"))?,
            compressed_size: dataset.get_int(&format!("{prefix}.compressed.size"))?,
            compression: dataset.get_required(&format!("{prefix}.compression.type"))?.to_string(),
            estimated_size: dataset.get_int(&format!("{prefix}.estimated.size"))?,
        });
    }
    Ok(rows)
}

/// Parses `lane{l}.sample.{s}.read{r}`. The sample name may itself contain
/// dots, so the lane and read are taken from the ends.
fn parse_unit_ident(ident: &str) -> anyhow::Result<(usize, String, usize)> {
    let (lane_part, rest) =
        ident.split_once('.').context("missing lane segment")?;
    let (middle, read_part) =
        rest.rsplit_once('.').context("missing read segment")?;
    let lane = lane_part.strip_prefix("lane").context("missing lane segment")?.parse()?;
    let read = read_part.strip_prefix("read").context("missing read segment")?.parse()?;
    let sample = middle.strip_prefix("sample.").context("missing sample segment")?;
    Ok((lane, sample.to_string(), read))
}
