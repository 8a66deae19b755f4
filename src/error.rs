//! Error types for the PDF export engine.
//!
//! All fallible operations return [`Result<T>`] which uses [`Error`].
//! No error in this taxonomy is retried internally; every fatal path
//! performs cleanup (channel close, process terminate) before the error
//! reaches the caller.
//!
//! # Error Categories
//!
//! | Category | Variants |
//! |----------|----------|
//! | Process | [`Error::Spawn`], [`Error::ProcessCrashed`], [`Error::EndpointNotFound`] |
//! | Channel | [`Error::Connect`], [`Error::ChannelClosed`] |
//! | Protocol | [`Error::MalformedFrame`], [`Error::UnrecognizedFrame`], [`Error::ProtocolViolation`], [`Error::CommandFailed`], [`Error::InvalidPayload`] |
//! | Time | [`Error::Timeout`] |
//! | Facade | [`Error::Config`], [`Error::VersionProbe`], [`Error::Storage`] |
//! | External | [`Error::Io`], [`Error::Json`], [`Error::WebSocket`] |

// ============================================================================
// Imports
// ============================================================================

use std::io::Error as IoError;
use std::result::Result as StdResult;

use thiserror::Error;
use tokio_tungstenite::tungstenite::Error as WsError;

// ============================================================================
// Result Alias
// ============================================================================

/// Result type alias using crate [`enum@Error`].
pub type Result<T> = StdResult<T, Error>;

// ============================================================================
// Error Enum
// ============================================================================

/// Main error type for the crate.
///
/// Each variant includes relevant context for debugging. Protocol variants
/// carry the raw payload so a misbehaving browser can be diagnosed from the
/// error alone.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Process Errors
    // ========================================================================
    /// Browser binary missing, not executable, or the spawn itself failed.
    #[error("Failed to spawn browser: {message}")]
    Spawn {
        /// Description of the spawn failure.
        message: String,
    },

    /// The diagnostic stream ended before a control endpoint was announced.
    #[error("No DevTools endpoint found on the browser's diagnostic stream")]
    EndpointNotFound,

    /// The browser process exited without being asked to.
    #[error("Browser process crashed (exit code {code:?})")]
    ProcessCrashed {
        /// Exit code, if the process exited normally rather than by signal.
        code: Option<i32>,
    },

    // ========================================================================
    // Channel Errors
    // ========================================================================
    /// Control channel could not be opened.
    #[error("Connection failed: {message}")]
    Connect {
        /// Description of the connection error.
        message: String,
    },

    /// Control channel closed while in use.
    #[error("Channel closed")]
    ChannelClosed,

    // ========================================================================
    // Protocol Errors
    // ========================================================================
    /// Inbound frame was not a parseable JSON object.
    #[error("Malformed frame: {payload}")]
    MalformedFrame {
        /// Raw payload as received.
        payload: String,
    },

    /// Inbound frame parsed but matched no known frame shape.
    #[error("Unrecognized frame: {payload}")]
    UnrecognizedFrame {
        /// Raw payload as received.
        payload: String,
    },

    /// Frame received out of the expected sequence.
    ///
    /// Usually indicates a browser/protocol version mismatch.
    #[error("Protocol violation: {message}")]
    ProtocolViolation {
        /// Description of the violation.
        message: String,
    },

    /// The browser reported an application-level command failure.
    #[error("Command failed ({code}): {message}")]
    CommandFailed {
        /// Error code from the browser.
        code: i64,
        /// Error message from the browser, verbatim.
        message: String,
    },

    /// The final result payload could not be decoded.
    #[error("Invalid result payload: {message}")]
    InvalidPayload {
        /// Description of the decode failure.
        message: String,
    },

    // ========================================================================
    // Time Errors
    // ========================================================================
    /// No progress within the configured deadline.
    #[error("Timeout after {timeout_ms}ms: {operation}")]
    Timeout {
        /// Description of the operation that timed out.
        operation: String,
        /// Milliseconds waited before timeout.
        timeout_ms: u64,
    },

    // ========================================================================
    // Facade Errors
    // ========================================================================
    /// Exporter configuration is invalid or incomplete.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },

    /// The version probe ran but did not succeed.
    #[error("Version probe failed: {message}")]
    VersionProbe {
        /// Stderr of the probed binary, or a description of the failure.
        message: String,
    },

    /// Storage collaborator failure.
    #[error("Storage error: {message}")]
    Storage {
        /// Description of the storage failure.
        message: String,
    },

    // ========================================================================
    // External Errors
    // ========================================================================
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] IoError),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// WebSocket error.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] WsError),
}

// ============================================================================
// Error Constructors
// ============================================================================

impl Error {
    /// Creates a spawn error.
    #[inline]
    pub fn spawn(message: impl Into<String>) -> Self {
        Self::Spawn {
            message: message.into(),
        }
    }

    /// Creates a process crashed error.
    #[inline]
    pub fn process_crashed(code: Option<i32>) -> Self {
        Self::ProcessCrashed { code }
    }

    /// Creates a connection error.
    #[inline]
    pub fn connect(message: impl Into<String>) -> Self {
        Self::Connect {
            message: message.into(),
        }
    }

    /// Creates a malformed frame error from the raw payload.
    #[inline]
    pub fn malformed_frame(payload: impl Into<String>) -> Self {
        Self::MalformedFrame {
            payload: payload.into(),
        }
    }

    /// Creates an unrecognized frame error from the raw payload.
    #[inline]
    pub fn unrecognized_frame(payload: impl Into<String>) -> Self {
        Self::UnrecognizedFrame {
            payload: payload.into(),
        }
    }

    /// Creates a protocol violation error.
    #[inline]
    pub fn protocol_violation(message: impl Into<String>) -> Self {
        Self::ProtocolViolation {
            message: message.into(),
        }
    }

    /// Creates a command failure error.
    #[inline]
    pub fn command_failed(code: i64, message: impl Into<String>) -> Self {
        Self::CommandFailed {
            code,
            message: message.into(),
        }
    }

    /// Creates an invalid payload error.
    #[inline]
    pub fn invalid_payload(message: impl Into<String>) -> Self {
        Self::InvalidPayload {
            message: message.into(),
        }
    }

    /// Creates a timeout error.
    #[inline]
    pub fn timeout(operation: impl Into<String>, timeout_ms: u64) -> Self {
        Self::Timeout {
            operation: operation.into(),
            timeout_ms,
        }
    }

    /// Creates a configuration error.
    #[inline]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates a version probe error.
    #[inline]
    pub fn version_probe(message: impl Into<String>) -> Self {
        Self::VersionProbe {
            message: message.into(),
        }
    }

    /// Creates a storage error.
    #[inline]
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }
}

// ============================================================================
// Error Predicates
// ============================================================================

impl Error {
    /// Returns `true` if this is a timeout error.
    #[inline]
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    /// Returns `true` if this is a protocol-level error (decode failure,
    /// sequencing violation, or a browser-reported command failure).
    #[inline]
    #[must_use]
    pub fn is_protocol_error(&self) -> bool {
        matches!(
            self,
            Self::MalformedFrame { .. }
                | Self::UnrecognizedFrame { .. }
                | Self::ProtocolViolation { .. }
                | Self::CommandFailed { .. }
                | Self::InvalidPayload { .. }
        )
    }

    /// Returns `true` if this is a process lifecycle error.
    #[inline]
    #[must_use]
    pub fn is_process_error(&self) -> bool {
        matches!(
            self,
            Self::Spawn { .. } | Self::ProcessCrashed { .. } | Self::EndpointNotFound
        )
    }

    /// Returns `true` if this is a channel error.
    #[inline]
    #[must_use]
    pub fn is_channel_error(&self) -> bool {
        matches!(
            self,
            Self::Connect { .. } | Self::ChannelClosed | Self::WebSocket(_)
        )
    }
}

// ============================================================================
// Tests
// ============================================================================
