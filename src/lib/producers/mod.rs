//! Built-in producers.
//!
//! `fastqstats` drives the engine once per sample unit; `runsummary`
//! aggregates its facts into run-wide totals and a TSV report. The heavier
//! per-read metric and contamination producers plug into the same
//! [`Producer`](crate::producer::Producer) interface.

pub mod fastq_stats;
pub mod run_summary;

pub use fastq_stats::FastqStatsProducer;
pub use run_summary::RunSummaryProducer;

/// Builds the registry of built-in producers.
pub fn builtin_registry() -> crate::errors::Result<crate::producer::ProducerRegistry> {
    let mut registry = crate::producer::ProducerRegistry::new();
    registry.register(Box::new(FastqStatsProducer::new()))?;
    registry.register(Box::new(RunSummaryProducer::new()))?;
    Ok(registry)
}
