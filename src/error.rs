//! Unified error types for license-tools.
//!
//! A single top-level error enum with per-subsystem kinds, so callers can
//! match broadly (did the expression engine fail? a remote lookup?) or
//! drill into the specific cause via `source()`.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for license-tools operations.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum LicenseToolsError {
    /// Errors raised while parsing a license expression
    #[error("invalid license expression `{expression}`")]
    Expression {
        expression: String,
        #[source]
        source: ExpressionError,
    },

    /// Errors during remote license discovery
    #[error("license discovery failed: {context}")]
    Finder {
        context: String,
        #[source]
        source: FinderErrorKind,
    },

    /// A license choice carried neither an id, a name, a URL nor an expression
    #[error("license data missing for entity `{bom_ref}` ({resource_name})")]
    LicenseData {
        bom_ref: String,
        resource_name: String,
    },

    /// IO errors with path context
    #[error("IO error at {path:?}: {message}")]
    Io {
        path: Option<PathBuf>,
        message: String,
        #[source]
        source: std::io::Error,
    },

    /// Policy configuration errors (malformed policy file, duplicate ids)
    #[error("invalid policy configuration: {0}")]
    PolicyConfig(String),
}

/// Specific expression parse errors.
///
/// The evaluator itself never fails; everything here is detected by the
/// parser before evaluation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ExpressionError {
    #[error("invalid conjunction `{token}` at token {index}: expected an operand")]
    InvalidConjunction { token: String, index: usize },

    #[error("unmatched `)` at token {index}")]
    UnmatchedRightParen { index: usize },

    #[error("unterminated group: expected `)` before end of expression")]
    UnterminatedGroup,
}

/// Specific remote-discovery error kinds.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum FinderErrorKind {
    #[error("network error: {0}")]
    Network(String),

    #[error("remote returned status {status} for {url}")]
    BadStatus { status: u16, url: String },

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("cache error: {0}")]
    Cache(String),

    #[error("no applicable license finder for purl `{0}`")]
    NotApplicable(String),
}

/// Convenient Result type for license-tools operations
pub type Result<T> = std::result::Result<T, LicenseToolsError>;

impl LicenseToolsError {
    /// Create an expression error, keeping the offending raw expression
    pub fn expression(expression: impl Into<String>, source: ExpressionError) -> Self {
        Self::Expression {
            expression: expression.into(),
            source,
        }
    }

    /// Create a finder error with context
    pub fn finder(context: impl Into<String>, source: FinderErrorKind) -> Self {
        Self::Finder {
            context: context.into(),
            source,
        }
    }

    /// Create an IO error with path context
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let message = source.to_string();
        Self::Io {
            path: Some(path.into()),
            message,
            source,
        }
    }
}

impl From<std::io::Error> for LicenseToolsError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            path: None,
            message: err.to_string(),
            source: err,
        }
    }
}
