//! Error types for `rdomock`
//!
//! Domain errors for fixture loading, command parsing, the session phase
//! machine and the stdio transport, folded into [`RdoMockError`] with a
//! process exit code mapping.
//!
//! A match miss is deliberately absent from this hierarchy: the matching
//! engine reports it as `None`, never as an error.

use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

// ============================================================================
// Exit Codes
// ============================================================================

/// Exit codes for `rdomock` CLI operations.
///
/// These codes follow Unix conventions.
pub struct ExitCode;

impl ExitCode {
    /// Successful execution
    pub const SUCCESS: i32 = 0;

    /// General error
    pub const ERROR: i32 = 1;

    /// Fixture error (unparseable file, validation failure)
    pub const CONFIG_ERROR: i32 = 2;

    /// I/O error (file not found, permission denied)
    pub const IO_ERROR: i32 = 3;

    /// Transport error (oversized line, broken pipe)
    pub const TRANSPORT_ERROR: i32 = 4;

    /// Session phase error (invalid transition)
    pub const PHASE_ERROR: i32 = 5;

    /// Usage error (invalid arguments, missing required options)
    pub const USAGE_ERROR: i32 = 64;

    /// Interrupted by SIGINT (Ctrl+C)
    pub const INTERRUPTED: i32 = 130;

    /// Terminated by SIGTERM
    pub const TERMINATED: i32 = 143;
}

// ============================================================================
// Top-Level Error
// ============================================================================

/// Top-level error type for `rdomock` operations.
///
/// Aggregates the domain-specific errors and maps each one to an exit code.
#[derive(Debug, Error)]
pub enum RdoMockError {
    /// Fixture loading or validation error
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Raw command could not be parsed
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// Transport layer error
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Session phase error
    #[error(transparent)]
    Phase(#[from] PhaseError),

    /// Invalid command-line usage detected after argument parsing
    #[error("usage error: {0}")]
    Usage(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl RdoMockError {
    /// Returns the appropriate exit code for this error.
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) | Self::Json(_) => ExitCode::CONFIG_ERROR,
            Self::Transport(_) => ExitCode::TRANSPORT_ERROR,
            Self::Phase(_) => ExitCode::PHASE_ERROR,
            Self::Usage(_) => ExitCode::USAGE_ERROR,
            Self::Protocol(_) => ExitCode::ERROR,
            Self::Io(_) => ExitCode::IO_ERROR,
        }
    }
}

// ============================================================================
// Configuration Errors
// ============================================================================

/// Fixture loading and validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// YAML or JSON parsing failed
    #[error("parse error in {path}: {message}")]
    ParseError {
        /// Path to the fixture file
        path: PathBuf,
        /// Line number where the error occurred (if available)
        line: Option<usize>,
        /// Error message from the parser
        message: String,
    },

    /// Fixture validation failed
    #[error("validation failed for {path}")]
    ValidationError {
        /// Path to the fixture file
        path: String,
        /// List of validation issues found
        errors: Vec<ValidationIssue>,
    },

    /// Referenced fixture file not found
    #[error("file not found: {path}")]
    MissingFile {
        /// Path to the missing file
        path: PathBuf,
    },

    /// File extension is not one the loader understands
    #[error("unsupported fixture format for {path} (expected .yaml, .yml or .json)")]
    UnsupportedFormat {
        /// Path to the fixture file
        path: PathBuf,
    },

    /// Field has an invalid value
    #[error("invalid value for '{field}': got '{value}', expected {expected}")]
    InvalidValue {
        /// Name of the field with invalid value
        field: String,
        /// The actual value provided
        value: String,
        /// Description of what was expected
        expected: String,
    },
}

// ============================================================================
// Validation Types
// ============================================================================

/// A single validation issue found while checking a fixture.
#[derive(Debug, Clone, Serialize)]
pub struct ValidationIssue {
    /// Path to the problematic field (e.g., "rdo[2].id")
    pub path: String,
    /// Description of the validation issue
    pub message: String,
    /// Severity level of the issue
    pub severity: Severity,
}

impl std::fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let prefix = match self.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        write!(f, "{}: {} at {}", prefix, self.message, self.path)
    }
}

/// Severity level for validation issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Prevents the fixture from being loaded
    Error,
    /// Reported, but the fixture still loads
    Warning,
}

// ============================================================================
// Protocol Errors
// ============================================================================

/// Errors raised while tokenizing a raw RDO command.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// The command contained no tokens
    #[error("empty command")]
    Empty,

    /// A double-quoted token was never closed
    #[error("unterminated quote starting at byte {offset}")]
    UnterminatedQuote {
        /// Byte offset of the opening quote
        offset: usize,
    },
}

// ============================================================================
// Transport Errors
// ============================================================================

/// Stdio transport errors.
#[derive(Debug, Error)]
pub enum TransportError {
    /// I/O error during transport operations
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Message exceeds size limit
    #[error("message too large: {size} bytes (limit: {limit})")]
    MessageTooLarge {
        /// Actual message size in bytes
        size: usize,
        /// Configured size limit in bytes
        limit: usize,
    },
}

// ============================================================================
// Phase Errors
// ============================================================================

/// Session phase machine errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PhaseError {
    /// Attempted a transition other than a single step forward
    #[error("invalid phase transition: {from} -> {to}")]
    InvalidTransition {
        /// Phase the session was in
        from: String,
        /// Phase that was requested
        to: String,
    },

    /// Phase name not recognized
    #[error("unknown phase: {0}")]
    Unknown(String),
}

// ============================================================================
// Result Type Alias
// ============================================================================

/// Result type alias for `rdomock` operations.
pub type Result<T> = std::result::Result<T, RdoMockError>;
