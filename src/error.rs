//! Error types for the chartconv library

use std::io;

/// Library error type for chartconv operations
#[derive(Debug, thiserror::Error)]
pub enum ChartError {
    /// A track line carried a recognised marker but its fields did not parse
    #[error("malformed chart line {line_number} '{line}': {reason}")]
    MalformedLine {
        line_number: usize,
        line: String,
        reason: String,
    },

    /// The source MIDI file could not be read
    #[error("MIDI error: {0}")]
    MidiError(String),

    /// The reader produced nothing worth converting
    #[error("unusable song: {0}")]
    UnusableSong(String),

    /// Song metadata file error
    #[error("ini error: {0}")]
    IniError(String),

    /// Bad arguments given to the batch entry point
    #[error("invalid invocation: {0}")]
    InvalidInvocation(String),

    /// Configuration error
    #[error("configuration error: {0}")]
    ConfigError(String),

    /// I/O error
    #[error("I/O error: {0}")]
    IoError(String),
}

impl From<io::Error> for ChartError {
    fn from(error: io::Error) -> Self {
        Self::IoError(error.to_string())
    }
}
