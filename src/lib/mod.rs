#![deny(unsafe_code)]
// Clippy lint configuration for CI
// These lints are allowed because:
// - cast_*: Size estimates intentionally cast between numeric types
// - missing_*_doc: Documentation improvements tracked separately
// - needless_pass_by_value: Some APIs designed for ownership transfer
// - items_after_statements: Some test code uses late item declarations
// - unused_self: Trait implementations may not use self
// - unnecessary_wraps: Some Result returns are for API consistency
#![allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_possible_wrap,
    clippy::cast_sign_loss,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::needless_pass_by_value,
    clippy::items_after_statements,
    clippy::unused_self,
    clippy::unnecessary_wraps,
    clippy::uninlined_format_args
)]

//! # runqc - Sequencing-Run QC Engine Library
//!
//! This library coordinates many independent per-sample analyses over a
//! sequencing run: bounded parallelism, idempotent disk-backed persistence
//! and a fail-fast failure contract across the whole batch.
//!
//! ## Overview
//!
//! - **[`sample`]** - Sample units and their enumeration from run facts
//! - **[`facts`]** - The typed, insertion-ordered fact dataset
//! - **[`task`]** - Per-unit analysis tasks with captured failures
//! - **[`cache`]** - The disk-backed result cache behind a trait
//! - **[`executor`]** - Inline or pooled task submission
//! - **[`engine`]** - The execution coordinator
//! - **[`producer`]** - Producers, registry and dependency ordering
//! - **[`producers`]** - The built-in producers
//! - **[`settings`]** - Conf-file settings and per-run context
//! - **[`errors`]** - Structured error types
//! - **[`logging`]** - Formatting helpers and operation timers
//! - **[`validation`]** - Input validation with consistent messages
//!
//! ## Quick Start
//!
//! ```no_run
//! use runqc_lib::facts::FactSet;
//! use runqc_lib::producers::builtin_registry;
//! use runqc_lib::settings::{QcContext, Settings};
//!
//! # fn main() -> anyhow::Result<()> {
//! let mut dataset = FactSet::load_file(std::path::Path::new("run-data.txt"))?;
//! let context = QcContext {
//!     run_id: "RUN1".to_string(),
//!     fastq_dir: "fastq".into(),
//!     report_dir: "report".into(),
//!     tmp_dir: "tmp".into(),
//! };
//! let mut registry = builtin_registry()?;
//! registry.run_producers(&["runsummary"], &context, &Settings::new(), &mut dataset)?;
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod engine;
pub mod errors;
pub mod executor;
pub mod facts;
pub mod logging;
pub mod producer;
pub mod producers;
pub mod sample;
pub mod settings;
pub mod task;
pub mod validation;

// Re-export the types nearly every caller needs
pub use errors::{QcError, Result};
pub use facts::FactSet;
pub use sample::SampleUnit;
