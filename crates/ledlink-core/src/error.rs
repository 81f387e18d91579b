//! Link error types with rich context

use thiserror::Error;

use crate::types::TimeoutDiagnostics;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Link error types organized by layer
#[derive(Debug, Error)]
pub enum Error {
    // ─────────────────────────────────────────────────────────────
    // Common/Infrastructure Errors
    // ─────────────────────────────────────────────────────────────
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // ─────────────────────────────────────────────────────────────
    // Connection Errors
    // ─────────────────────────────────────────────────────────────
    #[error("Not connected. Call connect() first.")]
    NotConnected,

    #[error("Endpoint not found: {message}")]
    EndpointNotFound { message: String },

    #[error("Transport failure: {message}")]
    TransportFailure { message: String },

    // ─────────────────────────────────────────────────────────────
    // Protocol Errors
    // ─────────────────────────────────────────────────────────────
    #[error("No OK/ERR response for {command:?}{diagnostics}")]
    Timeout {
        command: String,
        diagnostics: TimeoutDiagnostics,
    },

    #[error("Device rejected {command:?}: {reason}")]
    DeviceRejected { command: String, reason: String },

    #[error("Invalid argument: {message}")]
    InvalidArgument { message: String },

    // ─────────────────────────────────────────────────────────────
    // Configuration Errors
    // ─────────────────────────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },
}

// ─────────────────────────────────────────────────────────────────
// Convenience Constructors
// ─────────────────────────────────────────────────────────────────

impl Error {
    pub fn endpoint_not_found(message: impl Into<String>) -> Self {
        Self::EndpointNotFound {
            message: message.into(),
        }
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::TransportFailure {
            message: message.into(),
        }
    }

    pub fn rejected(command: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::DeviceRejected {
            command: command.into(),
            reason: reason.into(),
        }
    }

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Timeout error for `command`, carrying whatever the wire showed before the deadline.
    pub fn timeout(command: impl Into<String>, diagnostics: TimeoutDiagnostics) -> Self {
        Self::Timeout {
            command: command.into(),
            diagnostics,
        }
    }

    /// Rejection reason reported by the firmware, if this is a `DeviceRejected` error
    pub fn rejection_reason(&self) -> Option<&str> {
        match self {
            Error::DeviceRejected { reason, .. } => Some(reason),
            _ => None,
        }
    }

    /// A short, human-actionable suggestion for the operator
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Error::NotConnected => Some("Connect to the controller first."),
            Error::EndpointNotFound { .. } => {
                Some("Plug in the controller, then pick its serial port and connect again.")
            }
            Error::Timeout { .. } => {
                Some("The controller did not answer in time; check the cable or reconnect.")
            }
            Error::TransportFailure { .. } => Some(
                "Use the controller's LAN IP on the same network as this host, or reconnect.",
            ),
            _ => None,
        }
    }
}

// ─────────────────────────────────────────────────────────────────
// Error Context Extensions
// ─────────────────────────────────────────────────────────────────

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Add context with a closure (lazy evaluation)
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T, E: Into<Error>> ResultExt<T> for std::result::Result<T, E> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| {
            let err = e.into();
            tracing::error!("{}: {:?}", context.into(), err);
            err
        })
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| {
            let err = e.into();
            tracing::error!("{}: {:?}", f(), err);
            err
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_messages() {
        let err = Error::rejected("SET 99 1 2 3", "index out of range");
        assert_eq!(
            err.to_string(),
            "Device rejected \"SET 99 1 2 3\": index out of range"
        );

        let err = Error::NotConnected;
        assert!(err.to_string().contains("Not connected"));
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe closed");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_timeout_display_includes_diagnostics() {
        let diagnostics = TimeoutDiagnostics {
            last_line: Some("rst:0x1 (POWERON_RESET)".to_string()),
            last_non_terminal: Some("rst:0x1 (POWERON_RESET)".to_string()),
            raw_tail: b"ets Jun".to_vec(),
        };
        let err = Error::timeout("PING", diagnostics);
        let text = err.to_string();
        assert!(text.starts_with("No OK/ERR response for \"PING\""));
        assert!(text.contains("POWERON_RESET"));
        assert!(text.contains("raw_tail"));
    }

    #[test]
    fn test_timeout_display_without_diagnostics() {
        let err = Error::timeout("INFO", TimeoutDiagnostics::default());
        assert_eq!(err.to_string(), "No OK/ERR response for \"INFO\"");
    }

    #[test]
    fn test_rejection_reason() {
        let err = Error::rejected("SETN 40 0 0 0", "bad index");
        assert_eq!(err.rejection_reason(), Some("bad index"));
        assert_eq!(Error::NotConnected.rejection_reason(), None);
    }

    #[test]
    fn test_error_hints() {
        assert!(Error::endpoint_not_found("none")
            .hint()
            .unwrap()
            .contains("Plug in"));
        assert!(Error::NotConnected.hint().is_some());
        assert!(Error::config("bad").hint().is_none());
    }
}
