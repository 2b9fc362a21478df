//! Custom error types for runqc operations.

use thiserror::Error;

/// Result type alias for runqc operations
pub type Result<T> = std::result::Result<T, QcError>;

/// Error type for runqc operations
#[derive(Error, Debug)]
pub enum QcError {
    /// Invalid setting value provided
    #[error("Invalid setting '{key}': {reason}")]
    InvalidSetting {
        /// The setting key
        key: String,
        /// Explanation of why it's invalid
        reason: String,
    },

    /// A required fact is missing from the dataset
    #[error("Missing fact '{key}' in run dataset")]
    MissingFact {
        /// The fact key
        key: String,
    },

    /// A fact value could not be parsed as the requested type
    #[error("Fact '{key}': cannot parse '{value}' as {expected}")]
    FactType {
        /// The fact key
        key: String,
        /// The stored value
        value: String,
        /// The requested type name
        expected: &'static str,
    },

    /// A data or configuration file is malformed
    #[error("Invalid {file_type} file '{path}': {reason}")]
    InvalidFileFormat {
        /// Type of file (e.g. "run data", "settings")
        file_type: String,
        /// Path to the file
        path: String,
        /// Explanation of the problem
        reason: String,
    },

    /// An analysis task was constructed with no input files
    #[error("Sample unit '{unit}' has no input files")]
    EmptyFileSet {
        /// The sample unit identity key
        unit: String,
    },

    /// A producer was registered under an already-used name
    #[error("Producer '{name}' registered twice")]
    DuplicateProducer {
        /// The producer name
        name: String,
    },

    /// Producer dependencies could not be resolved
    #[error("Unable to resolve producer dependencies: {reason}")]
    ProducerDependencies {
        /// Explanation (missing name or cycle description)
        reason: String,
    },

    /// Wrapped I/O error with the path it occurred on
    #[error("I/O error on '{path}': {source}")]
    Io {
        /// Path being read or written
        path: String,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },
}

impl QcError {
    /// Attach a path to an `std::io::Error`.
    pub fn io(path: impl AsRef<std::path::Path>, source: std::io::Error) -> Self {
        QcError::Io { path: path.as_ref().display().to_string(), source }
    }
}
