//! Print facts from a run data file.

use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use runqc_lib::facts::FactSet;
use runqc_lib::validation::validate_file_exists;

use crate::commands::command::Command;

/// Print facts from a run data file, optionally filtered by key prefix.
#[derive(Debug, Parser)]
#[command(
    name = "inspect",
    about = "\x1b[38;5;166m[QC]\x1b[0m      \x1b[36mPrint facts from a run data file\x1b[0m",
    long_about = r#"
Print facts from a run data or cache file as key=value lines, in file order.

Example usage:
  runqc inspect -i report/data-RUN1.txt
  runqc inspect -i report/data-RUN1.txt --prefix fastqstats.lane1.
"#
)]
pub struct Inspect {
    /// Run data or cache file to read
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,

    /// Only print keys starting with this prefix
    #[arg(long = "prefix")]
    pub prefix: Option<String>,
}

impl Inspect {
    fn write_facts<W: Write>(&self, facts: &FactSet, out: &mut W) -> Result<()> {
        let prefix = self.prefix.as_deref().unwrap_or("");
        for (key, value) in facts.iter() {
            if key.starts_with(prefix) {
                writeln!(out, "{key}={value}")?;
            }
        }
        Ok(())
    }
}

impl Command for Inspect {
    fn execute(&self, _command_line: &str) -> Result<()> {
        validate_file_exists(&self.input, "Run data file")?;
        let facts = FactSet::load_file(&self.input)
            .with_context(|| format!("unable to load {}", self.input.display()))?;
        let stdout = std::io::stdout();
        self.write_facts(&facts, &mut stdout.lock())
    }
}
