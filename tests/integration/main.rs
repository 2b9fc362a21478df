//! Integration tests for the runqc library.
//!
//! These tests validate end-to-end workflows that span multiple modules,
//! ensuring that module interactions work correctly.

mod helpers;
mod test_collect_command;
mod test_engine_pipeline;
mod test_producer_pipeline;
