//! Error types for the fraud-detection pipeline.
//!
//! Four kinds of failure exist, with very different policies:
//! - [`Error::FileNotFound`] / [`Error::InvalidContainer`] / [`Error::Io`] —
//!   input errors, the only failures surfaced to the caller of `analyze`.
//! - Module errors — an analysis module misbehaved. The orchestrator logs
//!   the error, discards the partial result and reports the module with
//!   confidence 0.0 so it carries no weight.
//! - External errors (network, timeout) — recovered locally into a
//!   low-severity flag by the external module, never propagated.
//! - Data errors (malformed dates, bad barcode payloads) — recovered into
//!   `None` at the site of the failure with a debug log.

/// Result type alias for pipeline operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can escape the pipeline.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The input file does not exist or is not readable.
    #[error("file not found: {0}")]
    FileNotFound(String),

    /// The file is not a parseable PDF container (bad magic or no usable
    /// cross-reference table).
    #[error("invalid PDF container: {0}")]
    InvalidContainer(String),

    /// Parse error at a specific byte offset inside the container.
    #[error("failed to parse object at byte {offset}: {reason}")]
    Parse {
        /// Byte offset where parsing failed
        offset: usize,
        /// Reason for the failure
        reason: String,
    },

    /// Referenced object missing from the cross-reference table.
    #[error("object not found: {0} {1} R")]
    ObjectNotFound(u32, u16),

    /// Stream decoding failure.
    #[error("stream decoding error: {0}")]
    Decode(String),

    /// A single analysis module failed; carries the module name.
    #[error("module '{module}' failed: {reason}")]
    Module {
        /// Name of the failing module
        module: String,
        /// What went wrong
        reason: String,
    },

    /// The analysis was cancelled before completion.
    #[error("analysis cancelled")]
    Cancelled,

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// True for failures of the input file itself (exit code 64 territory),
    /// as opposed to internal pipeline errors.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            Error::FileNotFound(_) | Error::InvalidContainer(_) | Error::Io(_)
        )
    }
}
