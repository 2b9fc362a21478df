//! Run the QC producers over a sequencing run and write the merged dataset.

use anyhow::{Context, Result};
use clap::Parser;
use log::info;

use runqc_lib::cache::remove_producer_files;
use runqc_lib::facts::FactSet;
use runqc_lib::logging::OperationTimer;
use runqc_lib::producers::builtin_registry;
use runqc_lib::settings::{QcContext, Settings, CONF_PREFIX};

use crate::commands::command::Command;
use crate::commands::common::{RunIoOptions, SettingsOptions};

/// Run producers over a demultiplexed run and collect their facts.
///
/// Completed sample units are persisted under the output directory, so an
/// interrupted run picks up where it stopped instead of recomputing.
#[derive(Debug, Parser)]
#[command(
    name = "collect",
    about = "\x1b[38;5;166m[QC]\x1b[0m      \x1b[36mRun QC producers over a sequencing run\x1b[0m",
    long_about = r#"
Run QC producers over a demultiplexed sequencing run.

Loads the run data file, runs the requested producers (plus their required
upstream producers) in dependency order with summary producers last, merges
every producer's facts into one dataset and writes it to the output
directory as data-<runid>.txt.

The first failing unit aborts the whole run; units completed before the
failure stay cached under the output directory, so the next run recomputes
only units without a cache entry. A fully successful run removes its
per-unit cache entries and artifacts at the end.

Example usage:
  runqc collect -d run-data.txt -f fastq/ -o report/
  runqc collect -d run-data.txt -f fastq/ -o report/ -p fastqstats -t 8
  runqc collect -d run-data.txt -f fastq/ -o report/ -c qc.conf --clean-first
"#
)]
pub struct Collect {
    /// Run input/output options
    #[command(flatten)]
    pub io: RunIoOptions,

    /// Settings options
    #[command(flatten)]
    pub settings: SettingsOptions,

    /// Producer to run (repeatable; default: all registered producers)
    #[arg(short = 'p', long = "producer")]
    pub producers: Vec<String>,

    /// Remove existing cache entries and report artifacts first
    #[arg(long = "clean-first", default_value = "false")]
    pub clean_first: bool,
}

impl Command for Collect {
    fn execute(&self, command_line: &str) -> Result<()> {
        self.io.validate()?;
        self.settings.validate()?;
        info!("Command line: {command_line}");

        let mut dataset = FactSet::load_file(&self.io.run_data)
            .with_context(|| format!("unable to load {}", self.io.run_data.display()))?;
        let run_id = dataset.get("run.id").unwrap_or("run").to_string();

        std::fs::create_dir_all(&self.io.output).with_context(|| {
            format!("unable to create output directory {}", self.io.output.display())
        })?;

        let mut settings = match &self.settings.conf {
            Some(conf) => Settings::load(conf)?,
            None => Settings::new(),
        };
        if let Some(threads) = self.settings.threads {
            settings.set(format!("{CONF_PREFIX}threads"), threads.to_string());
        }

        let context = QcContext {
            run_id: run_id.clone(),
            fastq_dir: self.io.fastq_dir.clone(),
            report_dir: self.io.output.clone(),
            tmp_dir: self.io.tmp_dir(),
        };

        let mut registry = builtin_registry()?;
        let requested: Vec<String> = if self.producers.is_empty() {
            registry.names().iter().map(|n| n.to_string()).collect()
        } else {
            self.producers.clone()
        };
        let requested: Vec<&str> = requested.iter().map(String::as_str).collect();

        if self.clean_first {
            info!("Removing previous results for: {}", requested.join(", "));
            for producer in &requested {
                remove_producer_files(&self.io.output, producer);
            }
        }

        let timer = OperationTimer::new(format!("QC collection for run {run_id}").as_str());
        registry.run_producers(&requested, &context, &settings, &mut dataset)?;

        let data_file = self.io.output.join(format!("data-{run_id}.txt"));
        dataset.write_file(&data_file)?;
        info!("Wrote merged dataset to {}", data_file.display());
        timer.log_completion(dataset.len() as u64);
        Ok(())
    }
}
