#![allow(non_shorthand_field_patterns, unused_variables)]
#![doc = "Error taxonomy shared by the fetch, extraction, and batch layers."]
// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
//
// SPDX-License-Identifier: MIT

//! The derive emitted by [`masterror::Error`] expands pattern matches that
//! trigger the `non_shorthand_field_patterns` lint, and binds fields the
//! message does not print (`BatchFailed::failures`). Both lints are disabled
//! for the module to keep the generated implementations warning-free.
//!
//! Failures are split in three layers:
//!
//! * [`FetchError`] and [`ExtractionError`] describe a single sub-resource.
//! * [`TargetError`] describes why one target was dropped from a batch.
//! * [`Error`] is what the binary reports before exiting with status 1.

use std::path::{Path, PathBuf};

use crate::batch::TargetFailure;

/// Failure of a single HTTP fetch.
///
/// A `404 Not Found` response is deliberately absent from this enum: it is
/// reported as [`FetchOutcome::NotFound`](crate::FetchOutcome::NotFound).
#[derive(Debug, Clone, PartialEq, Eq, masterror::Error)]
pub enum FetchError {
    /// Network error, TLS failure, or timeout.
    #[error("request to {url} failed: {message}")]
    Transport {
        /// Requested URL.
        url:     String,
        /// Description reported by the transport.
        message: String
    },
    /// Non-success HTTP status other than 404.
    #[error("request to {url} returned HTTP {status}")]
    Status {
        /// Requested URL.
        url:    String,
        /// Numeric status code.
        status: u16
    },
    /// Response body that is not valid JSON.
    #[error("response from {url} is not valid JSON: {message}")]
    Body {
        /// Requested URL.
        url:     String,
        /// Decoder error message.
        message: String
    }
}

/// Failure to map a response tree onto a field set.
///
/// Every variant names the offending path so the cause can be logged next to
/// the target identifier.
#[derive(Debug, Clone, PartialEq, Eq, masterror::Error)]
pub enum ExtractionError {
    /// A required path does not exist in the response.
    #[error("required field `{path}` is missing")]
    Missing {
        /// Dotted path that could not be resolved.
        path: String
    },
    /// A path exists but holds a node of the wrong type.
    #[error("field `{path}` has type {found}, expected {expected}")]
    TypeMismatch {
        /// Dotted path of the mismatching node.
        path:     String,
        /// Type required by the field specification.
        expected: &'static str,
        /// Type actually present in the response.
        found:    &'static str
    },
    /// A list extraction was attempted on a non-array node.
    #[error("node at `{path}` is not an array")]
    NotAnArray {
        /// Path of the node.
        path: String
    },
    /// A field was requested that the field set never extracted.
    #[error("field `{name}` was not extracted")]
    UnknownField {
        /// Logical field name.
        name: String
    },
    /// The field path itself is malformed.
    #[error("invalid field path `{path}`")]
    InvalidPath {
        /// Offending path literal.
        path: String
    }
}

/// Reason a single target was excluded from the batch result.
#[derive(Debug, Clone, PartialEq, Eq, masterror::Error)]
pub enum TargetError {
    /// The identifier does not have the shape the analyzer expects.
    #[error("invalid target identifier `{identifier}`: {reason}")]
    InvalidIdentifier {
        /// Identifier as configured.
        identifier: String,
        /// Human readable explanation.
        reason:     &'static str
    },
    /// The primary resource could not be fetched.
    #[error("primary resource fetch failed: {source}")]
    Fetch {
        /// Underlying fetch failure.
        source: FetchError
    },
    /// The primary resource does not exist.
    #[error("primary resource {url} was not found")]
    NotFound {
        /// Requested URL.
        url: String
    },
    /// The primary resource lacked a required field.
    #[error("primary resource is malformed: {source}")]
    Extract {
        /// Underlying extraction failure.
        source: ExtractionError
    }
}

impl From<FetchError> for TargetError {
    fn from(source: FetchError) -> Self {
        Self::Fetch {
            source
        }
    }
}

impl From<ExtractionError> for TargetError {
    fn from(source: ExtractionError) -> Self {
        Self::Extract {
            source
        }
    }
}

/// Unified error type returned by configuration loading, the batch
/// orchestrator, and the CLI.
#[derive(Debug, masterror::Error)]
pub enum Error {
    /// Wraps I/O errors that occur while reading configuration or writing
    /// reports.
    #[error("failed to access {path:?}: {source}")]
    Io {
        /// Location of the file.
        path:   PathBuf,
        /// Underlying I/O error.
        source: std::io::Error
    },
    /// Wraps YAML decoding errors.
    #[error("failed to parse configuration: {source}")]
    Parse {
        /// Source decoding error from serde_yaml.
        source: serde_yaml::Error
    },
    /// Wraps serialization errors when writing the JSON report.
    #[error("failed to serialize report: {source}")]
    Serialize {
        /// Underlying serialization error.
        source: serde_json::Error
    },
    /// Returned when the configuration violates invariants.
    #[error("invalid configuration: {message}")]
    Validation {
        /// Human readable message describing the validation problem.
        message: String
    },
    /// The HTTP client could not be constructed.
    #[error("failed to build HTTP client: {message}")]
    Client {
        /// Description of the builder failure.
        message: String
    },
    /// Every target of the batch failed.
    #[error("no target succeeded ({attempted} attempted)")]
    BatchFailed {
        /// Number of targets attempted.
        attempted: usize,
        /// Per-target causes in input order.
        failures:  Vec<TargetFailure>
    },
    /// The notification sink rejected a line.
    #[error("failed to emit notification: {source}")]
    Notify {
        /// Underlying I/O error.
        source: std::io::Error
    }
}

impl Error {
    /// Constructs a validation error from the provided displayable value.
    ///
    /// # Parameters
    ///
    /// * `message` - Human-readable description of the validation failure.
    pub fn validation<M>(message: M) -> Self
    where
        M: Into<String>
    {
        Self::Validation {
            message: message.into()
        }
    }

    /// Constructs a client construction error.
    pub fn client<M>(message: M) -> Self
    where
        M: Into<String>
    {
        Self::Client {
            message: message.into()
        }
    }

    /// Formats the error for diagnostics without the variant name.
    ///
    /// The returned string matches the [`std::fmt::Display`] implementation.
    pub fn to_display_string(&self) -> String {
        format!("{self}")
    }
}

impl From<serde_yaml::Error> for Error {
    fn from(source: serde_yaml::Error) -> Self {
        Self::Parse {
            source
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(source: serde_json::Error) -> Self {
        Self::Serialize {
            source
        }
    }
}

/// Creates an [`Error::Io`] variant capturing the failing path and source.
///
/// # Parameters
///
/// * `path` - Location of the file that triggered the error.
/// * `source` - I/O error reported by the operating system.
pub fn io_error(path: &Path, source: std::io::Error) -> Error {
    Error::Io {
        path: path.to_path_buf(),
        source
    }
}
