//! Error types for eqlogger

use std::path::PathBuf;

use thiserror::Error;

/// Result type for log operations
pub type Result<T> = std::result::Result<T, LogError>;

#[derive(Error, Debug)]
pub enum LogError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A menu index outside `1..=len`
    #[error("Invalid selection: {index} (expected 1-{len})")]
    InvalidSelection { index: usize, len: usize },

    /// No eqlog_*.txt files recent enough
    #[error("No EQ logs found in {}", dir.display())]
    NoLogs { dir: PathBuf },

    /// Log has no timestamped lines at all
    #[error("No valid log entries found for {file}")]
    NoDates { file: String },
}
