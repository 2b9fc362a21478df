//! Input validation utilities
//!
//! Common validation functions for command-line parameters and paths with
//! consistent error messages, built on the structured error types from
//! [`crate::errors`].

use std::path::Path;

use crate::errors::{QcError, Result};

/// Validate that a file exists
///
/// # Arguments
/// * `path` - Path to validate
/// * `description` - Human-readable description of the file (e.g., "Run data file")
///
/// # Errors
/// Returns an error if the file does not exist
///
/// # Example
/// ```
/// use runqc_lib::validation::validate_file_exists;
///
/// let result = validate_file_exists("/nonexistent/run-data.txt", "Run data file");
/// assert!(result.is_err());
/// ```
pub fn validate_file_exists<P: AsRef<Path>>(path: P, description: &str) -> Result<()> {
    let path_ref = path.as_ref();
    if !path_ref.is_file() {
        return Err(QcError::InvalidFileFormat {
            file_type: description.to_string(),
            path: path_ref.display().to_string(),
            reason: "File does not exist".to_string(),
        });
    }
    Ok(())
}

/// Validate that a directory exists
///
/// # Errors
/// Returns an error if the path is not an existing directory
pub fn validate_dir_exists<P: AsRef<Path>>(path: P, description: &str) -> Result<()> {
    let path_ref = path.as_ref();
    if !path_ref.is_dir() {
        return Err(QcError::InvalidFileFormat {
            file_type: description.to_string(),
            path: path_ref.display().to_string(),
            reason: "Directory does not exist".to_string(),
        });
    }
    Ok(())
}
