//! Error types for the gatekeeper library.
//!
//! One variant per error kind named in the spec's error-handling design:
//! invalid input, parser failure, storage failure, corrupt persisted
//! signature, a signature/index width mismatch, and an unclassified
//! internal error. Every failure in the signature pipeline short-circuits
//! with the most specific of these.

use thiserror::Error;

/// Result type used throughout the gatekeeper crate.
pub type Result<T> = std::result::Result<T, GatekeeperError>;

/// Errors surfaced by the similarity engine.
#[derive(Error, Debug)]
pub enum GatekeeperError {
    /// The specification was empty, not an object, or otherwise malformed
    /// at a level the parser itself didn't reject (e.g. a threshold out of
    /// the accepted range when it wasn't eligible for clamping).
    #[error("invalid input: {message}")]
    InvalidInput {
        /// Human-readable explanation.
        message: String,
    },

    /// The underlying JSON/YAML parser rejected the document.
    #[error("unparseable specification: {message}")]
    ParseError {
        /// The underlying parser's message.
        message: String,
    },

    /// The durable signature store failed an operation.
    #[error("storage error: {message}")]
    StorageError {
        /// Human-readable explanation.
        message: String,
        /// Underlying driver error, if any.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A stored signature blob could not be decoded (wrong length or width).
    #[error("corrupt signature: {message}")]
    CorruptSignature {
        /// Human-readable explanation.
        message: String,
    },

    /// A signature passed to an index operation has the wrong width.
    #[error("signature length mismatch: expected {expected}, got {actual}")]
    LengthMismatch {
        /// Configured signature width (H).
        expected: usize,
        /// Width of the signature actually supplied.
        actual: usize,
    },

    /// Ruleset/runtime configuration is invalid.
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable explanation.
        message: String,
    },

    /// Anything unclassified.
    #[error("internal error: {message}")]
    Internal {
        /// Human-readable explanation.
        message: String,
    },
}

impl GatekeeperError {
    /// Build a [`GatekeeperError::InvalidInput`].
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// Build a [`GatekeeperError::ParseError`].
    pub fn parse_error(message: impl Into<String>) -> Self {
        Self::ParseError {
            message: message.into(),
        }
    }

    /// Build a [`GatekeeperError::StorageError`] with no underlying source.
    pub fn storage(message: impl Into<String>) -> Self {
        Self::StorageError {
            message: message.into(),
            source: None,
        }
    }

    /// Build a [`GatekeeperError::StorageError`] wrapping an underlying error.
    pub fn storage_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::StorageError {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Build a [`GatekeeperError::CorruptSignature`].
    pub fn corrupt_signature(message: impl Into<String>) -> Self {
        Self::CorruptSignature {
            message: message.into(),
        }
    }

    /// Build a [`GatekeeperError::LengthMismatch`].
    pub fn length_mismatch(expected: usize, actual: usize) -> Self {
        Self::LengthMismatch { expected, actual }
    }

    /// Build a [`GatekeeperError::Config`].
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Build a [`GatekeeperError::Internal`].
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}

impl From<serde_json::Error> for GatekeeperError {
    fn from(err: serde_json::Error) -> Self {
        Self::parse_error(format!("JSON parse failed: {err}"))
    }
}

impl From<serde_yaml::Error> for GatekeeperError {
    fn from(err: serde_yaml::Error) -> Self {
        Self::parse_error(format!("YAML parse failed: {err}"))
    }
}

impl From<rusqlite::Error> for GatekeeperError {
    fn from(err: rusqlite::Error) -> Self {
        Self::storage_with_source("sqlite operation failed", err)
    }
}

impl From<r2d2::Error> for GatekeeperError {
    fn from(err: r2d2::Error) -> Self {
        Self::storage_with_source("failed to acquire pooled connection", err)
    }
}

/// Extension trait for attaching ad hoc context to a `Result`.
pub trait ResultExt<T> {
    /// Replace the error with a [`GatekeeperError::Internal`] carrying both
    /// the supplied context and the original error's message.
    fn context(self, msg: &'static str) -> Result<T>;
}

impl<T, E> ResultExt<T> for std::result::Result<T, E>
where
    E: std::fmt::Display,
{
    fn context(self, msg: &'static str) -> Result<T> {
        self.map_err(|e| GatekeeperError::internal(format!("{msg}: {e}")))
    }
}
