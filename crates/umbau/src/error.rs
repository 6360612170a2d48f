//! Error types for Umbau.
//!
//! All fallible operations return [`Result`], backed by [`UmbauError`].
//!
//! The conversion pipeline distinguishes two propagation classes:
//!
//! - **Request-level errors** (`Validation`, `UnsupportedFormat`, `Io`) are
//!   returned to the caller directly.
//! - **Attempt-level errors** (`Backend`, `Timeout`, `MalformedArchive`,
//!   `MissingDependency`) never escape the orchestrator; they are captured as
//!   data on the [`ConversionAttempt`](crate::types::ConversionAttempt) log
//!   and the chain moves on to the next backend.
//!
//! IO errors bubble up unchanged via `#[from]` so real system problems stay
//! visible to callers.

use thiserror::Error;

/// Result type alias using `UmbauError`.
pub type Result<T> = std::result::Result<T, UmbauError>;

/// Main error type for all Umbau operations.
#[derive(Debug, Error)]
pub enum UmbauError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Validation error: {message}")]
    Validation {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// No conversion rule and no applicable default chain for the input.
    ///
    /// The only configuration-class error surfaced at request time.
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// A single backend failed. Captured by the orchestrator, never fatal.
    #[error("Backend error: {message}")]
    Backend {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Every backend configured for an output extension failed.
    #[error("All backends failed for output '{output}' after {attempts} attempts")]
    ChainExhausted { output: String, attempts: usize },

    /// The MHTML structural parser could not make sense of the archive.
    /// Triggers the email-parser fallback in the mht chain.
    #[error("Malformed archive: {message}")]
    MalformedArchive {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// An external process exceeded its deadline. A `Backend`-class failure:
    /// the chain continues, the child process does not.
    #[error("Backend '{backend}' timed out after {seconds} seconds")]
    Timeout { backend: String, seconds: u64 },

    #[error("Missing dependency: {0}")]
    MissingDependency(String),

    #[error("{0}")]
    Other(String),
}

impl UmbauError {
    /// Create a Validation error.
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation {
            message: message.into(),
            source: None,
        }
    }

    /// Create a Backend error.
    pub fn backend<S: Into<String>>(message: S) -> Self {
        Self::Backend {
            message: message.into(),
            source: None,
        }
    }

    /// Create a Backend error with source.
    pub fn backend_with_source<S: Into<String>, E: std::error::Error + Send + Sync + 'static>(
        message: S,
        source: E,
    ) -> Self {
        Self::Backend {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a MalformedArchive error.
    pub fn malformed<S: Into<String>>(message: S) -> Self {
        Self::MalformedArchive {
            message: message.into(),
            source: None,
        }
    }

    /// Create a MalformedArchive error with source.
    pub fn malformed_with_source<S: Into<String>, E: std::error::Error + Send + Sync + 'static>(
        message: S,
        source: E,
    ) -> Self {
        Self::MalformedArchive {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// True for failures that should be recorded as a failed attempt and
    /// absorbed by the fallback chain rather than returned to the caller.
    pub fn is_attempt_level(&self) -> bool {
        matches!(
            self,
            Self::Backend { .. }
                | Self::Timeout { .. }
                | Self::MalformedArchive { .. }
                | Self::MissingDependency(_)
        )
    }
}
