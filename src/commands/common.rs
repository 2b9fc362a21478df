//! Common CLI options shared across commands.
//!
//! This module provides shared argument structures that can be composed into
//! command structs using `#[command(flatten)]`.

use std::path::PathBuf;

use clap::Args;

use runqc_lib::validation::{validate_dir_exists, validate_file_exists};

/// Input/output options for commands that process a run.
#[derive(Debug, Clone, Args)]
pub struct RunIoOptions {
    /// Run data file (flat key=value facts)
    #[arg(short = 'd', long = "run-data")]
    pub run_data: PathBuf,

    /// Root of the demultiplexed FASTQ tree
    #[arg(short = 'f', long = "fastq-dir")]
    pub fastq_dir: PathBuf,

    /// Output report directory (created if missing)
    #[arg(short = 'o', long = "output")]
    pub output: PathBuf,

    /// Scratch directory for temporary files (defaults to the system tmp dir)
    #[arg(long = "tmp-dir")]
    pub tmp_dir: Option<PathBuf>,
}

impl RunIoOptions {
    /// Validates that the run data file and FASTQ directory exist.
    ///
    /// # Errors
    ///
    /// Returns an error if either input does not exist.
    pub fn validate(&self) -> anyhow::Result<()> {
        validate_file_exists(&self.run_data, "Run data file")?;
        validate_dir_exists(&self.fastq_dir, "FASTQ directory")?;
        Ok(())
    }

    /// The scratch directory, falling back to the system tmp dir.
    #[must_use]
    pub fn tmp_dir(&self) -> PathBuf {
        self.tmp_dir.clone().unwrap_or_else(std::env::temp_dir)
    }
}

/// Settings options shared by commands that run producers.
#[derive(Debug, Clone, Default, Args)]
pub struct SettingsOptions {
    /// Settings file (flat key=value, '#' comments)
    #[arg(short = 'c', long = "conf")]
    pub conf: Option<PathBuf>,

    /// Worker threads per producer (overrides the settings file)
    #[arg(short = 't', long = "threads")]
    pub threads: Option<usize>,
}

impl SettingsOptions {
    /// Validates the settings options.
    ///
    /// # Errors
    ///
    /// Returns an error if the settings file does not exist or the thread
    /// count is zero.
    pub fn validate(&self) -> anyhow::Result<()> {
        if let Some(conf) = &self.conf {
            validate_file_exists(conf, "Settings file")?;
        }
        if self.threads == Some(0) {
            anyhow::bail!("--threads must be >= 1");
        }
        Ok(())
    }
}
