//! CLI command implementations for runqc.
//!
//! This module contains all the command implementations for the runqc CLI
//! tool. Each submodule implements a specific command.
//!
//! - [`collect`] - Run QC producers over a demultiplexed run
//! - [`inspect`] - Print facts from a run data file

// Blanket clippy pedantic allows for command implementations.
#![allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_possible_wrap,
    clippy::cast_sign_loss,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::unused_self,
    clippy::unnecessary_wraps,
    clippy::needless_pass_by_value,
    clippy::must_use_candidate,
    clippy::uninlined_format_args
)]

pub mod collect;
pub mod command;
pub mod common;
pub mod inspect;
